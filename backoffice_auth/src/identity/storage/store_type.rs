use chrono::{DateTime, Utc};

use crate::identity::email::{NormalizedEmail, normalize_email};
use crate::identity::errors::IdentityError;
use crate::identity::reconcile::ObservedIdentities;
use crate::identity::types::{AuthIdentity, BusinessIdentity};
use crate::storage::{Backend, DataConn};

use super::postgres::*;
use super::sqlite::*;

/// Stored email of a record, tagged with the table it came from.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct StoredEmail {
    pub(crate) id: String,
    pub(crate) email: String,
}

fn normalizes_to(stored: &str, email: &NormalizedEmail) -> bool {
    normalize_email(stored).is_ok_and(|n| n == email.as_str())
}

pub(crate) struct IdentityStore;

impl IdentityStore {
    pub(crate) async fn init(conn: &mut DataConn) -> Result<(), IdentityError> {
        let keyed = match conn.backend() {
            Backend::Sqlite(c) => {
                create_tables_sqlite(c).await?;
                backfill_email_keys_sqlite(c).await?
            }
            Backend::Postgres(c) => {
                create_tables_postgres(c).await?;
                backfill_email_keys_postgres(c).await?
            }
        };
        if keyed > 0 {
            tracing::info!(keyed, "Keyed identity records written without a lookup key");
        }
        Ok(())
    }

    /// Both record kinds whose stored email normalizes to `email`.
    ///
    /// Rows written outside this store have no lookup key yet, so they are fetched as
    /// candidates and matched here with the same normalizer that produced `email`.
    #[tracing::instrument(skip(conn), fields(email = %email))]
    pub(crate) async fn observe(
        conn: &mut DataConn,
        email: &NormalizedEmail,
    ) -> Result<ObservedIdentities, IdentityError> {
        let (mut auth, mut business) = match conn.backend() {
            Backend::Sqlite(c) => (
                find_auth_by_email_sqlite(c, email.as_str()).await?,
                find_business_by_email_sqlite(c, email.as_str()).await?,
            ),
            Backend::Postgres(c) => (
                find_auth_by_email_postgres(c, email.as_str()).await?,
                find_business_by_email_postgres(c, email.as_str()).await?,
            ),
        };
        auth.retain(|r| normalizes_to(&r.email, email));
        business.retain(|r| normalizes_to(&r.email, email));

        tracing::debug!(
            auth = auth.len(),
            business = business.len(),
            "Observed identity records"
        );

        Ok(ObservedIdentities { auth, business })
    }

    pub(crate) async fn get_auth_by_id(
        conn: &mut DataConn,
        id: &str,
    ) -> Result<Option<AuthIdentity>, IdentityError> {
        match conn.backend() {
            Backend::Sqlite(c) => get_auth_by_id_sqlite(c, id).await,
            Backend::Postgres(c) => get_auth_by_id_postgres(c, id).await,
        }
    }

    pub(crate) async fn get_business_by_id(
        conn: &mut DataConn,
        id: &str,
    ) -> Result<Option<BusinessIdentity>, IdentityError> {
        match conn.backend() {
            Backend::Sqlite(c) => get_business_by_id_sqlite(c, id).await,
            Backend::Postgres(c) => get_business_by_id_postgres(c, id).await,
        }
    }

    pub(crate) async fn insert_auth(
        conn: &mut DataConn,
        auth: &AuthIdentity,
    ) -> Result<(), IdentityError> {
        match conn.backend() {
            Backend::Sqlite(c) => insert_auth_sqlite(c, auth).await,
            Backend::Postgres(c) => insert_auth_postgres(c, auth).await,
        }
    }

    pub(crate) async fn update_auth(
        conn: &mut DataConn,
        auth: &AuthIdentity,
    ) -> Result<(), IdentityError> {
        match conn.backend() {
            Backend::Sqlite(c) => update_auth_sqlite(c, auth).await,
            Backend::Postgres(c) => update_auth_postgres(c, auth).await,
        }
    }

    pub(crate) async fn delete_auth(conn: &mut DataConn, id: &str) -> Result<(), IdentityError> {
        match conn.backend() {
            Backend::Sqlite(c) => delete_auth_sqlite(c, id).await,
            Backend::Postgres(c) => delete_auth_postgres(c, id).await,
        }
    }

    pub(crate) async fn touch_last_login(
        conn: &mut DataConn,
        id: &str,
        at: DateTime<Utc>,
    ) -> Result<(), IdentityError> {
        match conn.backend() {
            Backend::Sqlite(c) => touch_last_login_sqlite(c, id, at).await,
            Backend::Postgres(c) => touch_last_login_postgres(c, id, at).await,
        }
    }

    pub(crate) async fn insert_business(
        conn: &mut DataConn,
        business: &BusinessIdentity,
    ) -> Result<(), IdentityError> {
        match conn.backend() {
            Backend::Sqlite(c) => insert_business_sqlite(c, business).await,
            Backend::Postgres(c) => insert_business_postgres(c, business).await,
        }
    }

    pub(crate) async fn update_business(
        conn: &mut DataConn,
        business: &BusinessIdentity,
    ) -> Result<(), IdentityError> {
        match conn.backend() {
            Backend::Sqlite(c) => update_business_sqlite(c, business).await,
            Backend::Postgres(c) => update_business_postgres(c, business).await,
        }
    }

    pub(crate) async fn repoint_business(
        conn: &mut DataConn,
        from_id: &str,
        to_id: &str,
    ) -> Result<(), IdentityError> {
        match conn.backend() {
            Backend::Sqlite(c) => repoint_business_sqlite(c, from_id, to_id).await,
            Backend::Postgres(c) => repoint_business_postgres(c, from_id, to_id).await,
        }
    }

    pub(crate) async fn delete_business(
        conn: &mut DataConn,
        id: &str,
    ) -> Result<(), IdentityError> {
        match conn.backend() {
            Backend::Sqlite(c) => delete_business_sqlite(c, id).await,
            Backend::Postgres(c) => delete_business_postgres(c, id).await,
        }
    }

    /// Every stored email, auth records first.
    pub(crate) async fn list_emails(
        conn: &mut DataConn,
    ) -> Result<(Vec<StoredEmail>, Vec<StoredEmail>), IdentityError> {
        let (auth, business) = match conn.backend() {
            Backend::Sqlite(c) => list_emails_sqlite(c).await?,
            Backend::Postgres(c) => list_emails_postgres(c).await?,
        };
        let wrap = |rows: Vec<(String, String)>| {
            rows.into_iter()
                .map(|(id, email)| StoredEmail { id, email })
                .collect::<Vec<_>>()
        };
        Ok((wrap(auth), wrap(business)))
    }
}
