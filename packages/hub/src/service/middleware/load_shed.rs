//! Load-shedding middleware for inbound messages.
//!
//! Rejects messages when the hub is overloaded (in-flight count reaches
//! `max_concurrent_operations`) with `HubError::Overloaded`.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use mcp_core::Envelope;
use serde_json::Value;
use tokio::sync::Semaphore;
use tower::{Layer, Service};

use crate::service::operation::HubError;

// ---------------------------------------------------------------------------
// LoadShedLayer
// ---------------------------------------------------------------------------

/// Tower layer that limits concurrent messages via a semaphore.
///
/// When all permits are taken, incoming messages are rejected immediately
/// rather than queued.
#[derive(Debug, Clone)]
pub struct LoadShedLayer {
    semaphore: Arc<Semaphore>,
}

impl LoadShedLayer {
    #[must_use]
    pub fn new(max_concurrent: u32) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrent as usize)),
        }
    }
}

impl<S> Layer<S> for LoadShedLayer {
    type Service = LoadShedService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        LoadShedService {
            inner,
            semaphore: self.semaphore.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// LoadShedService
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct LoadShedService<S> {
    inner: S,
    semaphore: Arc<Semaphore>,
}

impl<S> Service<Value> for LoadShedService<S>
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
        let Ok(permit) = self.semaphore.clone().try_acquire_owned() else {
            return Box::pin(async { Err(HubError::Overloaded) });
        };

        let fut = self.inner.call(raw);
        Box::pin(async move {
            // Permit is held until the whole workflow finishes.
            let result = fut.await;
            drop(permit);
            result
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use mcp_core::{Party, Payload, ResponseBuilder};
    use serde_json::json;
    use tower::ServiceExt;

    use super::*;

    /// Answers every message after a fixed delay.
    struct SlowService {
        delay_ms: u64,
    }

    impl Service<Value> for SlowService {
        type Response = Envelope;
        type Error = HubError;
        type Future = Pin<Box<dyn Future<Output = Result<Envelope, HubError>> + Send>>;

        fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            Poll::Ready(Ok(()))
        }

        fn call(&mut self, raw: Value) -> Self::Future {
            let delay = self.delay_ms;
            Box::pin(async move {
                tokio::time::sleep(Duration::from_millis(delay)).await;
                let request = mcp_core::Correlation::from_raw(&raw);
                Ok(ResponseBuilder::hub().success(&request, Payload::new()))
            })
        }
    }

    fn message() -> Value {
        let envelope =
            Envelope::request(Party::service("api-gateway"), "list_models", Payload::new())
                .unwrap();
        serde_json::to_value(envelope).unwrap()
    }

    #[tokio::test]
    async fn allows_messages_under_limit() {
        let svc = LoadShedLayer::new(10).layer(SlowService { delay_ms: 1 });
        let resp = svc.oneshot(message()).await.unwrap();
        assert!(!resp.is_error());
    }

    #[tokio::test]
    async fn rejects_when_overloaded() {
        let mut svc = LoadShedLayer::new(1).layer(SlowService { delay_ms: 500 });

        let _ = ServiceExt::ready(&mut svc).await.unwrap();
        let _in_flight = tokio::spawn({
            let fut = svc.call(message());
            async move { fut.await }
        });

        tokio::time::sleep(Duration::from_millis(10)).await;

        let err = svc.call(json!({"operation": "list_models"})).await.unwrap_err();
        assert!(matches!(err, HubError::Overloaded));
        assert_eq!(err.status_code(), 503);
    }
}
