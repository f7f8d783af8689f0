//! Per-invocation deadline.
//!
//! An invocation runs for at most its context's `call_timeout`, falling back
//! to the configured default, and otherwise fails with
//! `InvocationError::Timeout` carrying the deadline that was applied.

use std::task::{Context, Poll};
use std::time::Duration;

use invoker_core::{Invocation, Value};
use tower::{Layer, Service};

use super::{millis, HandlerFuture};
use crate::proxy::InvocationError;

/// Wraps handlers in [`TimeoutService`].
#[derive(Debug, Clone, Copy)]
pub struct TimeoutLayer {
    fallback: Duration,
}

impl TimeoutLayer {
    /// `fallback` applies to invocations whose context sets no timeout.
    #[must_use]
    pub fn new(fallback: Duration) -> Self {
        Self { fallback }
    }
}

impl<S> Layer<S> for TimeoutLayer {
    type Service = TimeoutService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        TimeoutService {
            inner,
            fallback: self.fallback,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TimeoutService<S> {
    inner: S,
    fallback: Duration,
}

impl<S> TimeoutService<S> {
    fn deadline_for(&self, invocation: &Invocation) -> Duration {
        invocation.context.call_timeout.unwrap_or(self.fallback)
    }
}

impl<S> Service<Invocation> for TimeoutService<S>
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
        let deadline = self.deadline_for(&invocation);
        let pending = self.inner.call(invocation);
        Box::pin(async move {
            tokio::time::timeout(deadline, pending)
                .await
                .unwrap_or(Err(InvocationError::Timeout {
                    timeout_ms: millis(deadline),
                }))
        })
    }
}

#[cfg(test)]
mod tests {
    use invoker_core::RequestContext;
    use tower::ServiceExt;

    use super::*;
    use crate::proxy::handlers::testing::{sleeper, wait_call};

    fn with_timeout(ms: u64) -> RequestContext {
        let mut ctx = RequestContext::new();
        ctx.call_timeout = Some(Duration::from_millis(ms));
        ctx
    }

    #[tokio::test(start_paused = true)]
    async fn fast_call_returns_inner_result() {
        let svc = TimeoutLayer::new(Duration::from_secs(1)).layer(sleeper(Duration::from_millis(10)));
        let out = svc.oneshot(wait_call(RequestContext::new())).await.unwrap();
        assert_eq!(out, Value::Null);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_call_fails_after_fallback() {
        let svc = TimeoutLayer::new(Duration::from_millis(50)).layer(sleeper(Duration::from_millis(200)));
        let err = svc.oneshot(wait_call(RequestContext::new())).await.unwrap_err();
        assert!(matches!(err, InvocationError::Timeout { timeout_ms: 50 }));
    }

    #[tokio::test(start_paused = true)]
    async fn context_timeout_wins_over_fallback() {
        let svc = TimeoutLayer::new(Duration::from_secs(5)).layer(sleeper(Duration::from_millis(200)));
        let err = svc.oneshot(wait_call(with_timeout(20))).await.unwrap_err();
        assert!(matches!(err, InvocationError::Timeout { timeout_ms: 20 }));

        let svc = TimeoutLayer::new(Duration::from_millis(20)).layer(sleeper(Duration::from_millis(200)));
        assert!(svc.oneshot(wait_call(with_timeout(1_000))).await.is_ok());
    }
}
