use clap::Args;
use std::path::PathBuf;

use super::config::LoggingConfig;
use crate::config::Settings;

#[derive(Debug, Clone, Args)]
pub struct ServerCommand {
    /// TCP port to listen on; overrides the configured port
    #[arg(value_name = "PORT", value_parser = parse_port)]
    pub port: Option<u16>,

    /// Interface to bind
    #[arg(long, value_name = "HOST")]
    pub host: Option<String>,

    /// Path to a configuration file
    #[arg(short = 'c', long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub logging: LoggingConfig,
}

impl ServerCommand {
    /// Overlay command-line choices onto loaded settings
    pub fn apply(&self, settings: &mut Settings) {
        if let Some(port) = self.port {
            settings.server.port = port;
        }
        if let Some(host) = &self.host {
            settings.server.host = host.clone();
        }
        self.logging.apply(&mut settings.logging);
    }
}

/// Parse the positional port argument
pub fn parse_port(raw: &str) -> Result<u16, String> {
    raw.trim()
        .parse::<u16>()
        .map_err(|_| format!("port `{}` must be an integer between 0 and 65535", raw))
}
