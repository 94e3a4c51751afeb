pub mod admin;
pub mod config_helpers;
pub mod error;
pub mod state;

pub use admin::Caller;
pub use error::AdminError;
pub use state::AppState;
