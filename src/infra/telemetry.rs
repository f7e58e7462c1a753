//! Subscriber and metric description bootstrap for the binary.

use std::io;
use std::sync::Once;

use metrics::{Unit, describe_counter, describe_gauge, describe_histogram};
use tracing::Subscriber;
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    registry::LookupSpan,
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Environment variable holding filter directives for the titlekeeper logs.
pub const LOG_ENV: &str = "TITLEKEEPER_LOG";

/// Install the process-wide subscriber for titlekeeper.
///
/// Log lines go to stderr so `resolve` output on stdout stays machine
/// readable. Directives in [`LOG_ENV`] take precedence over `logging.level`.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    tracing_subscriber::registry()
        .with(filter(logging))
        .with(ErrorLayer::default())
        .with(fmt_layer(logging.format))
        .try_init()
        .map_err(|err| InfraError::telemetry(format!("subscriber already installed: {err}")))
}

fn filter(logging: &LoggingSettings) -> EnvFilter {
    EnvFilter::builder()
        .with_env_var(LOG_ENV)
        .with_default_directive(logging.level.into())
        .from_env_lossy()
}

fn fmt_layer<S>(format: LogFormat) -> Box<dyn Layer<S> + Send + Sync>
where
    S: Subscriber + for<'span> LookupSpan<'span>,
{
    match format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_writer(io::stderr)
            .with_current_span(true)
            .with_span_list(false)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_writer(io::stderr)
            .with_target(false)
            .boxed(),
    }
}

fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "titlekeeper_cache_hit_total",
            Unit::Count,
            "Total number of title cache hits."
        );
        describe_counter!(
            "titlekeeper_cache_miss_total",
            Unit::Count,
            "Total number of title cache misses."
        );
        describe_counter!(
            "titlekeeper_cache_evict_total",
            Unit::Count,
            "Total number of title cache evictions due to capacity."
        );
        describe_counter!(
            "titlekeeper_resolver_unresolved_total",
            Unit::Count,
            "Total number of resolver:unresolved notifications."
        );
        describe_gauge!(
            "titlekeeper_batch_pending",
            Unit::Count,
            "Current number of keys waiting in the canvas batch queue."
        );
        describe_histogram!(
            "titlekeeper_refresh_ms",
            Unit::Milliseconds,
            "Feature refresh latency in milliseconds."
        );
    });
}

#[cfg(test)]
mod tests {
    use serial_test::serial;
    use tracing::level_filters::LevelFilter;

    use super::*;

    fn logging(level: LevelFilter) -> LoggingSettings {
        LoggingSettings {
            level,
            format: LogFormat::Compact,
        }
    }

    #[test]
    #[serial]
    fn configured_level_applies_without_env_directives() {
        // SAFETY: serialized with every other test touching the environment.
        unsafe { std::env::remove_var(LOG_ENV) };

        let filter = filter(&logging(LevelFilter::WARN));

        assert_eq!(filter.max_level_hint(), Some(LevelFilter::WARN));
    }

    #[test]
    #[serial]
    fn env_directives_override_configured_level() {
        // SAFETY: serialized with every other test touching the environment.
        unsafe { std::env::set_var(LOG_ENV, "debug") };

        let filter = filter(&logging(LevelFilter::WARN));

        unsafe { std::env::remove_var(LOG_ENV) };
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::DEBUG));
    }

    #[test]
    #[serial]
    fn second_init_reports_telemetry_error() {
        let logging = logging(LevelFilter::WARN);

        let first = init(&logging);
        let second = init(&logging);

        assert!(first.is_ok() || matches!(first, Err(InfraError::Telemetry(_))));
        assert!(matches!(second, Err(InfraError::Telemetry(_))));
    }
}
