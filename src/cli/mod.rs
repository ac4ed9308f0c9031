//! Command-line interface module.
//!
//! Parses the server's arguments and runs it with the resulting settings.

pub mod commands;
pub mod handlers;

pub use handlers::handle_server;
