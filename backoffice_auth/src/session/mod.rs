mod config;
mod errors;
mod main;
mod storage;
mod types;

pub use config::SessionConfig;
pub use errors::SessionError;
pub use main::{
    purge_expired_sessions, revoke_all_sessions, revoke_session, session_token_from_headers,
    validate_session,
};
pub use types::{IssuedSession, SessionUser};

pub(crate) use main::issue_session;
pub(crate) use storage::SessionStore;
