//! SmartMark database layer.
//!
//! Provides SQLite connection management and schema migrations for the
//! local backend.
//!
//! # Usage
//!
//! ```no_run
//! use smartmark::database::Database;
//!
//! let db = Database::open("smartmark.db").expect("failed to open database");
//! let conn = db.connection();
//! # let _ = conn;
//! ```

pub mod connection;
pub mod migrations;

pub use connection::Database;
