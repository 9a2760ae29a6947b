mod postgres;
mod rows;
mod sqlite;
mod store_type;

pub(crate) use store_type::{IdentityStore, StoredEmail};
