pub mod authenticator;
pub mod setup;

pub use authenticator::MockAuthenticator;
pub use setup::*;
