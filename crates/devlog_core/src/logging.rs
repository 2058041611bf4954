//! Process logging.
//!
//! Interactive runs log to stdout only. Detached runs (containers, services)
//! also write a daily rotating file under the data directory, and fall back
//! to stdout alone when that directory cannot be used. The filter comes from
//! `DEVLOG_LOG`, then `RUST_LOG`, then a build-type default.

use std::io;
use std::path::{Path, PathBuf};

use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::EnvFilter;

/// Environment variable consulted before `RUST_LOG`.
pub const LOG_ENV: &str = "DEVLOG_LOG";

/// Where log lines go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogOutput {
    /// Colored stdout only
    Terminal,
    /// Plain stdout (INFO and above) plus a rotating file in the directory
    Rolling(PathBuf),
}

impl LogOutput {
    /// Pick the output for this process.
    pub fn detect(log_dir: PathBuf) -> Self {
        Self::choose(atty::is(atty::Stream::Stdout), log_dir)
    }

    fn choose(is_tty: bool, log_dir: PathBuf) -> Self {
        if is_tty {
            Self::Terminal
        } else {
            Self::Rolling(log_dir)
        }
    }
}

/// Keeps the file writer alive; dropping it flushes buffered lines.
pub struct LoggingGuard {
    _file_writer: Option<WorkerGuard>,
}

/// Install the global subscriber.
pub fn init_logging(output: LogOutput) -> LoggingGuard {
    let filter = env_filter();
    match output {
        LogOutput::Terminal => {
            tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
            LoggingGuard { _file_writer: None }
        }
        LogOutput::Rolling(dir) => match rolling_appender(&dir) {
            Ok(appender) => {
                let (file, guard) = tracing_appender::non_blocking(appender);
                tracing_subscriber::fmt()
                    .with_writer(io::stdout.with_max_level(Level::INFO).and(file))
                    .with_env_filter(filter)
                    .with_ansi(false)
                    .init();
                LoggingGuard { _file_writer: Some(guard) }
            }
            Err(e) => {
                eprintln!("devlog: file logging unavailable in {}: {e}", dir.display());
                tracing_subscriber::fmt().with_env_filter(filter).with_ansi(false).init();
                LoggingGuard { _file_writer: None }
            }
        },
    }
}

/// Install the subscriber for the default log directory.
pub fn init_logging_default() -> LoggingGuard {
    init_logging(LogOutput::detect(log_dir()))
}

fn rolling_appender(dir: &Path) -> Result<RollingFileAppender, Box<dyn std::error::Error>> {
    std::fs::create_dir_all(dir)?;
    Ok(RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("devlog")
        .filename_suffix("log")
        .build(dir)?)
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(default_log_filter()))
}

/// Filter used when neither variable is set.
pub fn default_log_filter() -> &'static str {
    if cfg!(debug_assertions) {
        "debug,devlog=trace,devlog_core=trace,tokio_postgres=warn,hyper=warn"
    } else {
        "info,tokio_postgres=warn,hyper=warn"
    }
}

/// `<data dir>/devlog/logs`, or `./logs` without a data directory.
pub fn log_dir() -> PathBuf {
    dirs::data_local_dir().map_or_else(|| PathBuf::from("logs"), |d| d.join("devlog").join("logs"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_choice() {
        let dir = PathBuf::from("/tmp/devlog-logs");
        assert_eq!(LogOutput::choose(true, dir.clone()), LogOutput::Terminal);
        assert_eq!(LogOutput::choose(false, dir.clone()), LogOutput::Rolling(dir));
    }

    #[test]
    fn test_default_filter_parses() {
        assert!(EnvFilter::try_new(default_log_filter()).is_ok());
    }

    #[test]
    fn test_rolling_appender_creates_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("nested").join("logs");
        rolling_appender(&dir).unwrap();
        assert!(dir.is_dir());
    }

    #[test]
    fn test_log_dir_suffix() {
        assert!(log_dir().ends_with("logs"));
    }
}
