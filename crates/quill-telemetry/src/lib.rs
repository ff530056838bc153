//! Logging setup for Quill
//!
//! Installs a `tracing-subscriber` registry with an `EnvFilter` and either
//! human-readable or JSON line output.

use quill_config::{LogConfig, LogFormat};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Build the filter, falling back to `info` when the directives do not parse
pub fn filter(directives: &str) -> EnvFilter {
    EnvFilter::try_new(directives).unwrap_or_else(|e| {
        eprintln!("invalid log filter '{directives}': {e}, using 'info'");
        EnvFilter::new("info")
    })
}

/// Install the global subscriber
///
/// `filter_override` replaces the configured filter when given (e.g. from the
/// command line).
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn init(config: &LogConfig, filter_override: Option<&str>) -> anyhow::Result<()> {
    let filter = filter(filter_override.unwrap_or(&config.filter));

    let result = match config.format {
        LogFormat::Pretty => {
            let fmt_layer = tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .with_writer(std::io::stderr);

            tracing_subscriber::registry().with(filter).with(fmt_layer).try_init()
        }
        LogFormat::Json => {
            let fmt_layer = tracing_subscriber::fmt::layer()
                .json()
                .with_target(true)
                .with_current_span(false)
                .with_writer(std::io::stderr);

            tracing_subscriber::registry().with(filter).with(fmt_layer).try_init()
        }
    };

    result.map_err(|e| anyhow::anyhow!("failed to install log subscriber: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_filter_falls_back_to_info() {
        assert_eq!(filter("quill=loudest").to_string(), "info");
    }

    #[test]
    fn second_init_is_an_error_not_a_panic() {
        let config = LogConfig::default();
        let _ = init(&config, Some("warn"));

        assert!(init(&config, None).is_err());
    }
}
