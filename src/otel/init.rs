//! Subscriber setup: console logs plus optional OTLP trace export.

use crate::types::{Result, Text2SqlError};
use opentelemetry::trace::TracerProvider as _;
use opentelemetry::KeyValue;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::trace::TracerProvider;
use opentelemetry_sdk::{runtime, Resource};
use std::env;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Environment variable selecting JSON log lines (`json`) over plain text.
pub const LOG_FORMAT_ENV: &str = "TEXT2SQL_LOG_FORMAT";

/// Environment variable with the OTLP collector endpoint.
pub const OTLP_ENDPOINT_ENV: &str = "OTEL_EXPORTER_OTLP_ENDPOINT";

/// Flushes exported spans when dropped.
pub struct TracingGuard {
    provider: Option<TracerProvider>,
}

impl Drop for TracingGuard {
    fn drop(&mut self) {
        if let Some(provider) = self.provider.take() {
            if let Err(e) = provider.shutdown() {
                eprintln!("error shutting down tracer provider: {}", e);
            }
        }
    }
}

/// Install the global subscriber.
///
/// Log level comes from `RUST_LOG` (default `info`). When
/// `OTEL_EXPORTER_OTLP_ENDPOINT` is set, spans are also exported over
/// OTLP/gRPC. Must be called from within a Tokio runtime when exporting.
///
/// # Errors
///
/// Returns `Text2SqlError::ConfigError` if the exporter cannot be built or
/// a global subscriber is already installed
pub fn init_tracing(service_name: &str) -> Result<TracingGuard> {
    let json = env::var(LOG_FORMAT_ENV)
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    let fmt_layer = if json {
        tracing_subscriber::fmt::layer().json().boxed()
    } else {
        tracing_subscriber::fmt::layer().boxed()
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());

    let Some(endpoint) = env::var(OTLP_ENDPOINT_ENV).ok().filter(|e| !e.is_empty()) else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .try_init()
            .map_err(|e| Text2SqlError::config(format!("tracing init failed: {}", e)))?;
        tracing::info!(service = service_name, "logging initialized");
        return Ok(TracingGuard { provider: None });
    };

    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(&endpoint)
        .build()
        .map_err(|e| Text2SqlError::config(format!("OTLP exporter build failed: {}", e)))?;

    let provider = TracerProvider::builder()
        .with_batch_exporter(exporter, runtime::Tokio)
        .with_resource(Resource::new(vec![KeyValue::new(
            "service.name",
            service_name.to_string(),
        )]))
        .build();
    let telemetry =
        tracing_opentelemetry::layer().with_tracer(provider.tracer(service_name.to_string()));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .with(telemetry)
        .try_init()
        .map_err(|e| Text2SqlError::config(format!("tracing init failed: {}", e)))?;

    tracing::info!(service = service_name, %endpoint, "OTLP tracing initialized");

    Ok(TracingGuard {
        provider: Some(provider),
    })
}
