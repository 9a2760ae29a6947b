//! Identity reconciliation: one canonical identity per normalized email, persisted as an
//! authentication record and a business record that share an id.

mod email;
mod errors;
mod reconcile;
mod service;
mod storage;
mod types;

pub use email::{NormalizedEmail, normalize_email};
pub use errors::IdentityError;
pub use reconcile::{IdentityWrite, ObservedIdentities, ReconcilePlan, plan_reconciliation};
pub use service::{MalformedIdentity, ReconcileOutcome};
pub use types::{
    AuthIdentity, BusinessIdentity, Identity, IdentitySeed, ModulePermission, ModulePermissions,
    Role,
};

pub(crate) use service::{
    change_role, correct_email, ensure_identity, find_identity_by_email, list_malformed,
    load_identity, reconcile_in,
};
pub(crate) use storage::IdentityStore;
