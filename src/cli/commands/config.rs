use clap::Args;

use crate::config::LoggingSettings;

/// Logging options shared by every command
#[derive(Debug, Clone, Default, Args)]
pub struct LoggingConfig {
    /// Enable verbose logging (-v for debug, -vv for trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long = "log-level", env = "PREDICTD_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Log filter directives
    #[arg(long = "log-filter", env = "PREDICTD_LOG_FILTER")]
    pub log_filter: Option<String>,

    /// Write logs to a daily rolling file in this directory
    #[arg(long = "log-dir", value_name = "DIR")]
    pub log_dir: Option<std::path::PathBuf>,
}

impl LoggingConfig {
    /// Level requested on the command line, if any
    pub fn get_effective_level(&self) -> Option<&str> {
        match (self.verbose, self.log_level.as_deref()) {
            (0, level) => level,
            (1, _) => Some("debug"),
            _ => Some("trace"),
        }
    }

    /// Overlay command-line choices onto the configured logging settings
    pub fn apply(&self, settings: &mut LoggingSettings) {
        if let Some(level) = self.get_effective_level() {
            settings.level = level.to_string();
        }
        if let Some(filter) = &self.log_filter {
            settings.filter = Some(filter.clone());
        }
        if let Some(dir) = &self.log_dir {
            settings.dir = Some(dir.clone());
        }
    }
}
