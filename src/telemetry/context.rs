use std::borrow::Cow;
use std::collections::HashMap;
use std::convert::Infallible;

use async_trait::async_trait;
use axum::extract::{FromRef, FromRequestParts, MatchedPath};
use axum::http::{request::Parts, HeaderMap, HeaderName, HeaderValue};
use opentelemetry::baggage::BaggageExt;
use opentelemetry::propagation::{TextMapCompositePropagator, TextMapPropagator};
use opentelemetry::trace::{SpanKind, TraceContextExt, Tracer as _};
use opentelemetry::{Context, KeyValue};
use opentelemetry_sdk::propagation::{BaggagePropagator, TraceContextPropagator};
use tracing_opentelemetry::OpenTelemetrySpanExt;

use super::Telemetry;

pub const TRACEPARENT_HEADER: &str = "traceparent";
pub const BAGGAGE_HEADER: &str = "baggage";

/// Correlation metadata for one hop of a request.
///
/// Wraps an OpenTelemetry context holding the active span and the baggage
/// tags. The trace id survives every hop; each hop gets its own span. Nothing
/// in here may influence business decisions.
#[derive(Clone)]
pub struct CallContext {
    cx: Context,
    telemetry: Telemetry,
}

impl CallContext {
    /// Starts a new trace.
    pub fn root(telemetry: &Telemetry, name: impl Into<Cow<'static, str>>) -> Self {
        Self::start(telemetry, name, SpanKind::Internal, &Context::new())
    }

    /// Continues the caller's trace when a valid `traceparent` is present and
    /// picks up its `baggage`; starts a new trace otherwise.
    pub fn from_headers(headers: &HeaderMap, telemetry: &Telemetry, name: impl Into<Cow<'static, str>>) -> Self {
        let carrier: HashMap<String, String> = headers
            .iter()
            .filter_map(|(name, value)| Some((name.as_str().to_string(), value.to_str().ok()?.to_string())))
            .collect();
        let parent = propagator().extract_with_context(&Context::new(), &carrier);

        Self::start(telemetry, name, SpanKind::Server, &parent)
    }

    fn start(telemetry: &Telemetry, name: impl Into<Cow<'static, str>>, kind: SpanKind, parent: &Context) -> Self {
        let tracer = telemetry.tracer();
        let span = tracer.build_with_context(tracer.span_builder(name).with_kind(kind), parent);

        Self {
            cx: parent.with_span(span),
            telemetry: telemetry.clone(),
        }
    }

    /// Same trace and tags under a new client span. Used for outgoing calls.
    pub fn child(&self, name: impl Into<Cow<'static, str>>) -> Self {
        Self::start(&self.telemetry, name, SpanKind::Client, &self.cx)
    }

    /// Sets a baggage tag, replacing any earlier value for `key`, and records
    /// it on the current span.
    pub fn with_tag(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let tag = KeyValue::new(key.into(), value.into());
        self.cx.span().set_attribute(tag.clone());

        Self {
            cx: self.cx.with_baggage(vec![tag]),
            telemetry: self.telemetry,
        }
    }

    pub fn trace_id(&self) -> String {
        self.cx.span().span_context().trace_id().to_string()
    }

    pub fn span_id(&self) -> String {
        self.cx.span().span_context().span_id().to_string()
    }

    pub fn sampled(&self) -> bool {
        self.cx.span().span_context().is_sampled()
    }

    pub fn tag(&self, key: &str) -> Option<String> {
        self.cx.baggage().get(key.to_string()).map(|value| value.to_string())
    }

    pub fn otel_context(&self) -> &Context {
        &self.cx
    }

    /// `traceparent` and `baggage` headers for an outgoing request.
    pub fn to_headers(&self) -> HeaderMap {
        let mut carrier = HashMap::new();
        propagator().inject_context(&self.cx, &mut carrier);

        carrier
            .into_iter()
            .filter_map(|(name, value)| Some((HeaderName::try_from(name).ok()?, HeaderValue::try_from(value).ok()?)))
            .collect()
    }

    /// A `tracing` span parented to this context, for instrumenting futures.
    pub fn span(&self) -> tracing::Span {
        let span = tracing::info_span!("call", trace_id = %self.trace_id(), sampled = self.sampled());
        span.set_parent(self.cx.clone());
        span
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for CallContext
where
    S: Send + Sync,
    Telemetry: FromRef<S>,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let route = parts
            .extensions
            .get::<MatchedPath>()
            .map(|matched| matched.as_str().to_string())
            .unwrap_or_else(|| parts.uri.path().to_string());
        let name = format!("{} {}", parts.method, route);

        Ok(CallContext::from_headers(&parts.headers, &Telemetry::from_ref(state), name))
    }
}

fn propagator() -> TextMapCompositePropagator {
    TextMapCompositePropagator::new(vec![
        Box::new(TraceContextPropagator::new()),
        Box::new(BaggagePropagator::new()),
    ])
}
