mod session;

pub use session::{
    purge_expired_sessions, revoke_all_sessions, revoke_session, session_token_from_headers,
    validate_session,
};

pub(crate) use session::issue_session;
