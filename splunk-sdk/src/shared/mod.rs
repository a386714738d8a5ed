mod logging;

pub use logging::{LoggingOpts, LOG_FILE_ENV};

pub mod prelude {
    pub use super::LoggingOpts;
}
