//! Infrastructure layer
//!
//! Configuration and logging for the command-line front end.

mod config;
mod logging;

pub use config::{CONFIG_FILE, Config, ConfigError, OutputFormat};
pub use logging::init_logging;
