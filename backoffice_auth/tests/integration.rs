/// Integration tests for backoffice_auth
///
/// These drive complete flows through the public API against an in-memory database and
/// cache, with a software authenticator standing in for the browser.
mod common;

mod integration {
    pub mod authorization_flows;
    pub mod identity_flows;
    pub mod registration_flows;
    pub mod session_flows;
}
