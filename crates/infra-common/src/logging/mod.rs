//! Logging bootstrap

mod setup;

pub use setup::{setup_logging, parse_log_level, log_welcome, LoggingConfig};
