//! Tracing setup and the correlation context carried across service calls.
//!
//! Log lines go through a `fmt` layer. Spans are also bridged into an
//! OpenTelemetry tracer that exports over OTLP to the configured collector.

use opentelemetry::trace::{TraceError, TracerProvider as _};
use opentelemetry::{global, KeyValue};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::trace::{Config, Sampler, Tracer, TracerProvider};
use opentelemetry_sdk::{runtime, Resource};
use thiserror::Error;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::config::ObservabilityConfig;

mod context;

pub use context::{CallContext, BAGGAGE_HEADER, TRACEPARENT_HEADER};

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("failed to install tracing subscriber: {0}")]
    Subscriber(String),

    #[error("failed to build trace exporter: {0}")]
    Exporter(#[from] TraceError),
}

/// Handle to the tracer every [`CallContext`] starts its spans from.
#[derive(Clone)]
pub struct Telemetry {
    tracer: Tracer,
    // Set when this handle owns its provider instead of the global one.
    local_provider: Option<TracerProvider>,
}

impl Telemetry {
    /// Samples and correlates spans without exporting them anywhere.
    pub fn in_process(service: &'static str, sampler_ratio: f64) -> Self {
        let provider = TracerProvider::builder()
            .with_config(trace_config(service, sampler_ratio))
            .build();

        Self {
            tracer: provider.tracer(service),
            local_provider: Some(provider),
        }
    }

    pub fn tracer(&self) -> &Tracer {
        &self.tracer
    }

    /// Flushes pending spans to the collector.
    pub fn shutdown(self) {
        if self.local_provider.is_none() {
            global::shutdown_tracer_provider();
            tracing::info!("Trace provider shut down");
        }
    }
}

/// Traces started here are kept with probability `sampler_ratio`; traces
/// continued from a caller keep the caller's decision.
fn trace_config(service: &'static str, sampler_ratio: f64) -> Config {
    Config::default()
        .with_sampler(Sampler::ParentBased(Box::new(Sampler::TraceIdRatioBased(sampler_ratio))))
        .with_resource(Resource::new(vec![KeyValue::new("service.name", service)]))
}

/// Installs the global subscriber and the OTLP batch exporter.
/// Filter comes from `RUST_LOG`, `info` otherwise.
pub fn init_tracing(service: &'static str, config: &ObservabilityConfig) -> Result<Telemetry, TelemetryError> {
    let tracer = opentelemetry_otlp::new_pipeline()
        .tracing()
        .with_exporter(
            opentelemetry_otlp::new_exporter()
                .tonic()
                .with_endpoint(config.collector_endpoint.clone()),
        )
        .with_trace_config(trace_config(service, config.sampler_ratio))
        .install_batch(runtime::Tokio)?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .with(tracing_opentelemetry::layer().with_tracer(tracer.clone()))
        .try_init()
        .map_err(|e| TelemetryError::Subscriber(e.to_string()))?;

    tracing::info!(
        service,
        collector = %config.collector_endpoint,
        sampler_ratio = config.sampler_ratio,
        "Tracing initialised"
    );

    Ok(Telemetry {
        tracer,
        local_provider: None,
    })
}
