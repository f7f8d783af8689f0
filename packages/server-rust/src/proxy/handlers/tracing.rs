//! Invocation spans and metrics.
//!
//! Each invocation runs inside an `invocation` span that ends up carrying its
//! duration and outcome. Every completion bumps `invoker_invocations_total`
//! and records into `invoker_invocation_duration_seconds`.

use std::task::{Context, Poll};
use std::time::{Duration, Instant};

use invoker_core::{Invocation, Value};
use tower::{Layer, Service};
use tracing::{field, info_span, Instrument, Span};

use super::{millis, HandlerFuture};
use crate::proxy::InvocationError;

/// Wraps handlers in [`TracingService`].
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLayer;

impl<S> Layer<S> for TracingLayer {
    type Service = TracingService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        TracingService { inner }
    }
}

#[derive(Debug, Clone)]
pub struct TracingService<S> {
    inner: S,
}

impl<S> Service<Invocation> for TracingService<S>
where
    S: Service<Invocation, Response = Value, Error = InvocationError> + Send,
    S::Future: Send + 'static,
{
    type Response = Value;
    type Error = InvocationError;
    type Future = HandlerFuture;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, invocation: Invocation) -> Self::Future {
        let method = invocation.method;
        let span = info_span!(
            "invocation",
            contract = method.contract,
            method = method.name,
            call_id = invocation.call_id,
            trace_id = %invocation.context.trace_id,
            duration_ms = field::Empty,
            outcome = field::Empty,
        );
        let pending = self.inner.call(invocation);

        Box::pin(
            async move {
                let started = Instant::now();
                let result = pending.await;
                settle(method.contract, method.name, started.elapsed(), &result);
                result
            }
            .instrument(span),
        )
    }
}

/// Records one finished invocation on the current span and in metrics.
fn settle(
    contract: &'static str,
    method: &'static str,
    elapsed: Duration,
    result: &Result<Value, InvocationError>,
) {
    let outcome = if result.is_ok() { "ok" } else { "error" };
    let duration_ms = millis(elapsed);

    let span = Span::current();
    span.record("duration_ms", duration_ms);
    span.record("outcome", outcome);

    metrics::counter!(
        "invoker_invocations_total",
        "contract" => contract,
        "method" => method,
        "outcome" => outcome,
    )
    .increment(1);
    metrics::histogram!(
        "invoker_invocation_duration_seconds",
        "contract" => contract,
        "method" => method,
    )
    .record(elapsed.as_secs_f64());

    if let Err(error) = result {
        tracing::info!(duration_ms, %error, "invocation failed");
    } else {
        tracing::debug!(duration_ms, "invocation complete");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use invoker_core::{MethodSignature, RequestContext};
    use serde_json::json;
    use tower::ServiceExt;

    use super::*;

    fn greet(call_id: u64) -> Invocation {
        let sig = MethodSignature {
            contract: "Greeter",
            name: "greet",
            params: &["String"],
            returns: "String",
        };
        Invocation::new(call_id, sig, vec![json!("ada")], Arc::new(RequestContext::new()))
    }

    #[tokio::test]
    async fn result_is_untouched() {
        let echo = TracingLayer.layer(tower::service_fn(|inv: Invocation| async move {
            Ok::<_, InvocationError>(json!(inv.call_id))
        }));
        assert_eq!(echo.oneshot(greet(42)).await.unwrap(), json!(42));

        let failing = TracingLayer.layer(tower::service_fn(|_inv: Invocation| async {
            Err::<Value, _>(InvocationError::Overloaded)
        }));
        let err = failing.oneshot(greet(7)).await.unwrap_err();
        assert!(matches!(err, InvocationError::Overloaded));
    }
}
