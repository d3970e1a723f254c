//! Log output setup
//!
//! Filters emit their lines on dedicated targets. Access log lines are
//! preformatted and written verbatim (no timestamp, level or target
//! decoration); everything else goes through the configured formatter.

use tracing::Subscriber;
use tracing_subscriber::{
    filter::filter_fn,
    fmt::{self, format::FmtSpan},
    registry::LookupSpan,
    EnvFilter, Layer,
};

use crate::config::{LogFormat, LoggingConfig};

pub const ACCESS_LOG_TARGET: &str = "access_log";
pub const EVENT_LOG_TARGET: &str = "event_log";
pub const COMMON_LOG_TARGET: &str = "common_log";

pub(crate) fn env_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level))
}

/// Formatter for application logs, skipping access log lines
pub(crate) fn application_layer<S>(
    format: &LogFormat,
) -> impl Layer<S> + Send + Sync + 'static
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    let layer = match format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_target(true)
            .with_span_events(FmtSpan::CLOSE)
            .boxed(),
        LogFormat::Pretty => fmt::layer()
            .pretty()
            .with_target(true)
            .with_span_events(FmtSpan::CLOSE)
            .boxed(),
    };

    layer.with_filter(filter_fn(|metadata| metadata.target() != ACCESS_LOG_TARGET))
}

/// Writes access log lines as-is
pub(crate) fn access_log_layer<S>() -> impl Layer<S> + Send + Sync + 'static
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fmt::layer()
        .without_time()
        .with_level(false)
        .with_target(false)
        .with_ansi(false)
        .with_filter(filter_fn(|metadata| metadata.target() == ACCESS_LOG_TARGET))
}
