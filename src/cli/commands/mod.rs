pub mod config;
pub mod server;

pub use config::LoggingConfig;
pub use server::ServerCommand;
