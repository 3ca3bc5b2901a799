//! Logging, span export and Prometheus metrics for the gateway.
//!
//! `init_observability` runs once per process. Later calls hand back the same
//! `Telemetry`, so tests may call it freely.
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use opentelemetry::KeyValue;
use opentelemetry::propagation::{Extractor, TextMapPropagator};
use opentelemetry::trace::TracerProvider;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::Resource;
use opentelemetry_sdk::propagation::TraceContextPropagator;
use opentelemetry_sdk::trace::SdkTracerProvider;
use std::sync::{Mutex, PoisonError};
use tracing_opentelemetry::OpenTelemetrySpanExt;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

pub const SERVICE_NAME: &str = "incommon-gateway";

/// Span export is switched on by setting this variable.
pub const OTLP_ENDPOINT_ENV: &str = "OTEL_EXPORTER_OTLP_ENDPOINT";

pub const TOKEN_RENEWALS_TOTAL: &str = "incommon_token_renewals_total";
pub const UPSTREAM_REQUESTS_TOTAL: &str = "incommon_upstream_requests_total";
pub const PERSON_REQUESTS_TOTAL: &str = "incommon_person_requests_total";

static TELEMETRY: Mutex<Option<Telemetry>> = Mutex::new(None);

/// Process-wide telemetry handles.
#[derive(Clone)]
pub struct Telemetry {
    metrics: PrometheusHandle,
    tracer_provider: Option<SdkTracerProvider>,
}

impl Telemetry {
    pub fn metrics(&self) -> &PrometheusHandle {
        &self.metrics
    }

    pub fn span_export_enabled(&self) -> bool {
        self.tracer_provider.is_some()
    }

    /// Flush buffered spans. A no-op when export is off.
    pub fn shutdown(&self) {
        if let Some(provider) = &self.tracer_provider {
            if let Err(err) = provider.shutdown() {
                tracing::warn!(error = %err, "span exporter shutdown failed");
            }
        }
    }
}

/// Install the log subscriber, the optional OTLP layer and the metrics
/// recorder.
///
/// # Errors
/// Fails only if another global metrics recorder is already installed.
pub fn init_observability(service_name: &str) -> Result<Telemetry, BuildError> {
    let mut slot = TELEMETRY.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(telemetry) = slot.as_ref() {
        return Ok(telemetry.clone());
    }

    let metrics = PrometheusBuilder::new().install_recorder()?;
    describe_gateway_metrics();

    let endpoint = otlp_endpoint();
    let (tracer_provider, export_error) = match endpoint.as_deref() {
        Some(endpoint) => match otlp_tracer_provider(service_name, endpoint) {
            Ok(provider) => (Some(provider), None),
            Err(err) => (None, Some(err)),
        },
        None => (None, None),
    };
    let otel_layer = tracer_provider.as_ref().map(|provider| {
        tracing_opentelemetry::layer().with_tracer(provider.tracer(service_name.to_string()))
    });
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(otel_layer)
        .try_init();

    match (&endpoint, &export_error) {
        (Some(endpoint), None) => tracing::info!(%endpoint, "exporting spans over OTLP"),
        (Some(endpoint), Some(err)) => {
            tracing::warn!(%endpoint, error = %err, "OTLP exporter unavailable, spans stay local")
        }
        _ => {}
    }

    let telemetry = Telemetry {
        metrics,
        tracer_provider,
    };
    *slot = Some(telemetry.clone());
    Ok(telemetry)
}

fn otlp_endpoint() -> Option<String> {
    std::env::var(OTLP_ENDPOINT_ENV)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn otlp_tracer_provider(
    service_name: &str,
    endpoint: &str,
) -> Result<SdkTracerProvider, Box<dyn std::error::Error + Send + Sync>> {
    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()?;
    let resource = Resource::builder_empty()
        .with_attributes(resource_attributes(service_name))
        .build();
    Ok(SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .with_resource(resource)
        .build())
}

fn resource_attributes(service_name: &str) -> Vec<KeyValue> {
    let mut attrs = vec![
        KeyValue::new("service.name", service_name.to_string()),
        KeyValue::new("service.version", env!("CARGO_PKG_VERSION")),
    ];
    let instance =
        std::env::var("INCOMMON_SERVICE_INSTANCE_ID").or_else(|_| std::env::var("HOSTNAME"));
    if let Ok(instance) = instance {
        attrs.push(KeyValue::new("service.instance.id", instance));
    }
    if let Ok(environment) = std::env::var("DEPLOYMENT_ENVIRONMENT") {
        attrs.push(KeyValue::new("deployment.environment", environment));
    }
    attrs
}

fn describe_gateway_metrics() {
    metrics::describe_counter!(
        TOKEN_RENEWALS_TOTAL,
        "Upstream access token renewals by outcome."
    );
    metrics::describe_counter!(
        UPSTREAM_REQUESTS_TOTAL,
        "Identity API calls by endpoint and outcome."
    );
    metrics::describe_counter!(
        PERSON_REQUESTS_TOTAL,
        "eduPerson assemblies by outcome."
    );
}

/// `http.request` span for an inbound request, parented on its
/// `traceparent` header when one is present.
pub fn request_span(request: &axum::http::Request<axum::body::Body>) -> tracing::Span {
    let span = tracing::info_span!(
        "http.request",
        method = %request.method(),
        path = %request.uri().path(),
    );
    span.set_parent(inbound_trace_context(request.headers()));
    span
}

fn inbound_trace_context(headers: &axum::http::HeaderMap) -> opentelemetry::Context {
    TraceContextPropagator::new().extract(&TraceHeaders(headers))
}

struct TraceHeaders<'a>(&'a axum::http::HeaderMap);

impl Extractor for TraceHeaders<'_> {
    fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key)?.to_str().ok()
    }

    fn keys(&self) -> Vec<&str> {
        self.0.keys().map(axum::http::HeaderName::as_str).collect()
    }
}

/// Router for the separate metrics listener.
pub fn metrics_router(telemetry: Telemetry) -> axum::Router {
    axum::Router::new().route(
        "/metrics",
        axum::routing::get(move || async move { telemetry.metrics().render() }),
    )
}
