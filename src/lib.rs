//! SmartMark: a personal bookmark manager with live-synchronized sessions.
//!
//! This library crate exposes all modules for use by the binary and integration tests.

pub mod app;
pub mod backend;
pub mod client;
pub mod config;
pub mod database;
pub mod rpc_handler;
pub mod services;
pub mod types;
