// SmartMark shared type definitions
// Each submodule defines types used across the backend and the client.

pub mod bookmark;
pub mod change;
pub mod errors;
pub mod session;
