pub mod session;
pub mod token_store;

pub use session::{Credentials, SessionManager, SessionToken};
