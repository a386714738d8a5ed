use clap::{ArgGroup, Parser};
use std::fs::File;
use std::path::PathBuf;
use tracing::level_filters::LevelFilter;
use tracing::warn;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::format::Format;
use tracing_subscriber::{prelude::*, Registry};

pub const LOG_FILE_ENV: &str = "SPLUNK_SDK_LOG_FILE";

/// Logging for scripts run by the platform. Everything goes to stderr, which
/// the platform copies into its own internal log.
#[derive(Parser, Debug, Clone)]
#[clap(group = ArgGroup::new("logging"))]
pub struct LoggingOpts {
    /// A level of verbosity, and can be used multiple times
    #[arg(short, long, action = clap::ArgAction::Count, global(true))]
    pub verbose: u8,

    /// Also write the log to this file
    #[arg(long, global(true), env = LOG_FILE_ENV)]
    pub log_file: Option<PathBuf>,

    #[arg(skip = LevelFilter::WARN)]
    default_level: LevelFilter,
}

impl Default for LoggingOpts {
    fn default() -> Self {
        Self {
            verbose: 0,
            log_file: None,
            default_level: LevelFilter::WARN,
        }
    }
}

impl LoggingOpts {
    pub fn with_new_default(&self, new_default: LevelFilter) -> Self {
        Self {
            verbose: self.verbose,
            log_file: self.log_file.clone(),
            default_level: new_default,
        }
    }

    pub fn to_level_filter(&self) -> LevelFilter {
        match self.verbose {
            0 => self.default_level,
            1 => LevelFilter::INFO,
            2 => LevelFilter::DEBUG,
            _ => LevelFilter::TRACE,
        }
    }

    /// Installs the global subscriber. Keep the returned guard alive until
    /// exit, or buffered file output is lost. Does nothing when a subscriber
    /// is already installed.
    pub fn configure_logging(&self) -> Option<WorkerGuard> {
        let level_filter = self.to_level_filter();

        let stderr_output = tracing_subscriber::fmt::layer()
            .event_format(Format::default().with_target(true).compact())
            .with_ansi(false)
            .with_writer(std::io::stderr)
            .with_filter(level_filter);

        let mut file_error = None;
        let (file_output, guard) = match &self.log_file {
            Some(path) => match File::options().create(true).append(true).open(path) {
                Ok(file) => {
                    let (non_blocking, guard) = tracing_appender::non_blocking(file);
                    let layer = tracing_subscriber::fmt::layer()
                        .with_ansi(false)
                        .with_writer(non_blocking)
                        .with_filter(LevelFilter::DEBUG.max(level_filter));
                    (Some(layer), Some(guard))
                }
                Err(error) => {
                    file_error = Some((path.clone(), error));
                    (None, None)
                }
            },
            None => (None, None),
        };

        let subscriber = Registry::default().with(stderr_output).with(file_output);
        if tracing::subscriber::set_global_default(subscriber).is_err() {
            return None;
        }

        if let Some((path, error)) = file_error {
            warn!("Unable to open log file {}: {:?}", path.display(), error);
        }
        guard
    }
}
