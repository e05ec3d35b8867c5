//! # Trellis infra-common
//!
//! Infrastructure shared by every Trellis service binary. At the moment this
//! is the logging bootstrap: each service calls [`logging::setup_logging`]
//! once at startup, before secrets are loaded or sockets are bound.

pub mod error;
pub mod logging;

pub use error::{Error, Result};
pub use logging::{setup_logging, parse_log_level, log_welcome, LoggingConfig};
