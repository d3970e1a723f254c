//! OpenTelemetry distributed tracing setup

use opentelemetry::{trace::TracerProvider as _, KeyValue};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{
    runtime,
    trace::{RandomIdGenerator, Sampler, TracerProvider},
    Resource,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{LoggingConfig, TracingConfig};
use crate::infrastructure::logging::{access_log_layer, application_layer, env_filter};

/// Initialize logging with optional OpenTelemetry span export
pub fn init_tracing(logging_config: &LoggingConfig, tracing_config: &TracingConfig) {
    let provider = if tracing_config.enabled {
        match init_otel_tracing(tracing_config) {
            Ok(provider) => Some(provider),
            Err(e) => {
                eprintln!("Failed to initialize OpenTelemetry: {e}. Tracing disabled.");
                None
            }
        }
    } else {
        None
    };

    let telemetry_layer = provider.as_ref().map(|provider| {
        tracing_opentelemetry::layer().with_tracer(provider.tracer(tracing_config.service_name.clone()))
    });

    tracing_subscriber::registry()
        .with(env_filter(logging_config))
        .with(application_layer(&logging_config.format))
        .with(access_log_layer())
        .with(telemetry_layer)
        .init();

    match provider {
        Some(provider) => {
            opentelemetry::global::set_tracer_provider(provider);
            tracing::info!(
                "Tracing initialized with OpenTelemetry export to {}",
                tracing_config.otlp_endpoint
            );
        }
        None => tracing::info!("Tracing initialized (OpenTelemetry disabled)"),
    }
}

fn sampler(ratio: f64) -> Sampler {
    if ratio >= 1.0 {
        Sampler::AlwaysOn
    } else if ratio <= 0.0 {
        Sampler::AlwaysOff
    } else {
        Sampler::TraceIdRatioBased(ratio)
    }
}

fn init_otel_tracing(
    config: &TracingConfig,
) -> Result<TracerProvider, opentelemetry::trace::TraceError> {
    let resource = Resource::new(vec![KeyValue::new(
        "service.name",
        config.service_name.clone(),
    )]);

    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(&config.otlp_endpoint)
        .build()?;

    let provider = TracerProvider::builder()
        .with_sampler(sampler(config.sampling_ratio))
        .with_id_generator(RandomIdGenerator::default())
        .with_resource(resource)
        .with_batch_exporter(exporter, runtime::Tokio)
        .build();

    Ok(provider)
}

/// Shutdown tracing and flush pending spans
pub fn shutdown_tracing() {
    opentelemetry::global::shutdown_tracer_provider();
    tracing::info!("Tracing shutdown complete");
}
