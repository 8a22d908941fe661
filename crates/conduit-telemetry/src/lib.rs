//! Logging for conduit
//!
//! Installs a `tracing-subscriber` registry with an `EnvFilter` and a
//! formatting layer chosen by the `[logging]` config section.

use conduit_config::{LogFormat, LoggingConfig};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the global subscriber
///
/// The configured filter wins over `default_filter`. An invalid directive
/// falls back to `info` rather than failing startup.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed
pub fn init(config: Option<&LoggingConfig>, default_filter: &str) -> anyhow::Result<()> {
    let directive = filter_directive(config, default_filter);
    let filter = EnvFilter::try_new(directive).unwrap_or_else(|_| EnvFilter::new("info"));

    let format = config.map(|c| c.format).unwrap_or_default();
    let registry = tracing_subscriber::registry().with(filter);

    let result = match format {
        LogFormat::Pretty => {
            let fmt_layer = tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false);

            registry.with(fmt_layer).try_init()
        }
        LogFormat::Json => {
            let fmt_layer = tracing_subscriber::fmt::layer()
                .json()
                .with_target(true)
                .with_current_span(false)
                .with_span_list(false);

            registry.with(fmt_layer).try_init()
        }
    };

    result.map_err(|e| anyhow::anyhow!("failed to install log subscriber: {e}"))
}

fn filter_directive<'a>(config: Option<&'a LoggingConfig>, default_filter: &'a str) -> &'a str {
    config
        .and_then(|c| c.filter.as_deref())
        .filter(|f| !f.trim().is_empty())
        .unwrap_or(default_filter)
}
