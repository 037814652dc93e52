pub mod loader;
pub mod refresh;

pub use loader::{InboxLoader, LoadPhase};
pub use refresh::{RefreshError, refresh};
