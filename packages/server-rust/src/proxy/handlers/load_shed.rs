//! Concurrency cap for invocations.
//!
//! At most `max_concurrent` invocations run at once; any invocation beyond
//! that fails straight away with `InvocationError::Overloaded` instead of
//! waiting. Permits belong to the layer, so every chain built from the same
//! descriptor draws on one pool.

use std::sync::Arc;
use std::task::{Context, Poll};

use invoker_core::{Invocation, Value};
use tokio::sync::Semaphore;
use tower::{Layer, Service};

use super::HandlerFuture;
use crate::proxy::InvocationError;

#[derive(Debug, Clone)]
pub struct LoadShedLayer {
    permits: Arc<Semaphore>,
}

impl LoadShedLayer {
    #[must_use]
    pub fn new(max_concurrent: u32) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(max_concurrent as usize)),
        }
    }

    /// Invocations that could start right now.
    #[must_use]
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }
}

impl<S> Layer<S> for LoadShedLayer {
    type Service = LoadShedService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        LoadShedService {
            inner,
            permits: Arc::clone(&self.permits),
        }
    }
}

/// Runs the inner handler only while holding a permit from the shared pool.
#[derive(Debug, Clone)]
pub struct LoadShedService<S> {
    inner: S,
    permits: Arc<Semaphore>,
}

impl<S> Service<Invocation> for LoadShedService<S>
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
        match Arc::clone(&self.permits).try_acquire_owned() {
            Ok(permit) => {
                let pending = self.inner.call(invocation);
                Box::pin(async move {
                    let _permit = permit;
                    pending.await
                })
            }
            Err(_) => {
                tracing::debug!(
                    contract = invocation.method.contract,
                    method = invocation.method.name,
                    "invocation shed"
                );
                Box::pin(async { Err(InvocationError::Overloaded) })
            }
        }
    }
}
