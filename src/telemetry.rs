//! Diagnostic logging setup.

use anyhow::{Context, Result};
use tracing::level_filters::LevelFilter;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_log::LogTracer;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LoggingSettings;

const LOG_FILE_PREFIX: &str = "predictd";

/// Install the global subscriber.
///
/// Output goes to stderr, or to a daily rolling file when `settings.dir` is
/// set. The returned guard flushes the background writer on drop and must be
/// held for as long as the process logs.
pub fn init(settings: &LoggingSettings) -> Result<WorkerGuard> {
    let (writer, guard) = match &settings.dir {
        Some(dir) => {
            let appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .filename_prefix(LOG_FILE_PREFIX)
                .filename_suffix("log")
                .build(dir)
                .with_context(|| format!("Failed to open log directory {}", dir.display()))?;
            tracing_appender::non_blocking(appender)
        }
        None => tracing_appender::non_blocking(std::io::stderr()),
    };

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(build_filter(&settings.level, settings.filter.as_deref()))
        .with_writer(writer)
        .with_ansi(settings.dir.is_none())
        .with_target(true)
        .with_thread_ids(true)
        .with_level(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to install tracing subscriber")?;
    LogTracer::init().context("Failed to initialize log tracer")?;

    Ok(guard)
}

/// Filter with `level` as the default directive plus any extra directives.
/// Unparseable levels fall back to info; bad directives are skipped.
pub fn build_filter(level: &str, directives: Option<&str>) -> EnvFilter {
    let default = level.parse::<LevelFilter>().unwrap_or(LevelFilter::INFO);
    EnvFilter::builder()
        .with_default_directive(default.into())
        .parse_lossy(directives.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_uses_level() {
        assert_eq!(build_filter("debug", None).max_level_hint(), Some(LevelFilter::DEBUG));
        assert_eq!(build_filter("warn", None).max_level_hint(), Some(LevelFilter::WARN));
    }

    #[test]
    fn test_filter_falls_back_to_info() {
        assert_eq!(build_filter("loud", None).max_level_hint(), Some(LevelFilter::INFO));
    }

    #[test]
    fn test_filter_directives_raise_hint() {
        let filter = build_filter("info", Some("predictd_core::service=trace"));
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::TRACE));
    }
}
