//! Metrics middleware for inbound messages.
//!
//! Wraps each message in a `tracing` span and records a counter and a
//! duration histogram per operation through the `metrics` facade.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Instant;

use mcp_core::envelope::operation_of;
use mcp_core::Envelope;
use metrics::{counter, describe_counter, describe_histogram, histogram};
use serde_json::Value;
use tower::{Layer, Service};
use tracing::{info_span, Instrument};

use crate::service::operation::HubError;

pub const MESSAGES_TOTAL: &str = "mcp_hub_messages_total";
pub const MESSAGE_DURATION: &str = "mcp_hub_message_duration_seconds";

/// Registers metric descriptions. Call once after installing a recorder.
pub fn describe_metrics() {
    describe_counter!(MESSAGES_TOTAL, "Inbound messages by operation and outcome");
    describe_histogram!(MESSAGE_DURATION, "Time to answer an inbound message in seconds");
}

// ---------------------------------------------------------------------------
// MetricsLayer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct MetricsLayer;

impl<S> Layer<S> for MetricsLayer {
    type Service = MetricsService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        MetricsService { inner }
    }
}

// ---------------------------------------------------------------------------
// MetricsService
// ---------------------------------------------------------------------------

/// Service wrapper that records message duration and outcome.
#[derive(Debug, Clone)]
pub struct MetricsService<S> {
    inner: S,
}

impl<S> Service<Value> for MetricsService<S>
where
    S: Service<Value, Response = Envelope, Error = HubError> + Send,
    S::Future: Send + 'static,
{
    type Response = Envelope;
    type Error = HubError;
    type Future = Pin<Box<dyn Future<Output = Result<Envelope, HubError>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, raw: Value) -> Self::Future {
        let operation = operation_of(&raw).to_string();
        let message_id = raw
            .get("message_id")
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_string();

        let span = info_span!(
            "message",
            operation = %operation,
            message_id = %message_id,
            duration_ms = tracing::field::Empty,
            outcome = tracing::field::Empty,
        );

        let fut = self.inner.call(raw);

        Box::pin(
            async move {
                let start = Instant::now();
                let result = fut.await;
                let elapsed = start.elapsed();

                let outcome = match &result {
                    Ok(envelope) if envelope.is_error() => "error",
                    Ok(_) => "success",
                    Err(_) => "rejected",
                };

                #[allow(clippy::cast_possible_truncation)]
                let duration_ms = elapsed.as_millis() as u64;
                tracing::Span::current().record("duration_ms", duration_ms);
                tracing::Span::current().record("outcome", outcome);
                tracing::info!(
                    operation = %operation,
                    duration_ms,
                    outcome,
                    "message complete"
                );

                histogram!(MESSAGE_DURATION, "operation" => operation.clone())
                    .record(elapsed.as_secs_f64());
                let labels = [("operation", operation), ("outcome", outcome.to_string())];
                counter!(MESSAGES_TOTAL, &labels).increment(1);

                result
            }
            .instrument(span),
        )
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
