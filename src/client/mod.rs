// SmartMark client view-model
// One store per client instance; the other components read and dispatch into it.

pub mod commands;
pub mod session_store;
pub mod state;
pub mod store;
pub mod sync;
pub mod token_file;
pub mod view;

pub use commands::{CommandOutcome, Commands};
pub use state::{Action, AppState};
pub use store::Store;
pub use token_file::{TokenFile, TokenPersistence};
pub use view::{render, Screen};
