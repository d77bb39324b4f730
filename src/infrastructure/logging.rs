//! Logging configuration
//!
//! Installs the global tracing subscriber. `RUST_LOG` wins over the level
//! passed in. Output goes to stderr so plans written to stdout stay parseable.

/// Initializes logging with the specified level
///
/// Does nothing if a subscriber is already installed.
pub fn init_logging(level: &str) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let _ = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_line_number(true)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logging_twice() {
        init_logging("debug");
        init_logging("info");
    }
}
