//! Terminal handler: locates a local service instance and dispatches to it.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use invoker_core::{Invocation, RequestContext, ServiceQuery, Value};
use tower::Service;
use tracing::trace;

use super::invocation::{BoxHandler, InvocationError};
use crate::traits::{DefaultHandlerFactory, LocalServiceLookup};

/// Dispatches invocations to the first local instance satisfying the proxy's
/// query.
///
/// The target is looked up on every call, so instances registered after the
/// proxy was created are picked up.
#[derive(Clone)]
pub struct DefaultMethodHandler {
    query: Arc<ServiceQuery>,
    lookup: Arc<dyn LocalServiceLookup>,
}

impl DefaultMethodHandler {
    #[must_use]
    pub fn new(context: &RequestContext, lookup: Arc<dyn LocalServiceLookup>) -> Self {
        Self {
            query: Arc::new(context.query()),
            lookup,
        }
    }

    /// The query used to locate targets.
    #[must_use]
    pub fn query(&self) -> &ServiceQuery {
        &self.query
    }
}

impl Service<Invocation> for DefaultMethodHandler {
    type Response = Value;
    type Error = InvocationError;
    type Future = Pin<Box<dyn Future<Output = Result<Value, InvocationError>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, invocation: Invocation) -> Self::Future {
        let target = self.lookup.lookup(&self.query).into_iter().next();
        let query = Arc::clone(&self.query);
        Box::pin(async move {
            let Some(target) = target else {
                return Err(InvocationError::NoTarget {
                    query: (*query).clone(),
                });
            };
            trace!(
                method = invocation.method.name,
                call_id = invocation.call_id,
                "dispatching to local service"
            );
            target.dispatch(invocation).await
        })
    }
}

/// Builds a [`DefaultMethodHandler`] per proxy over a shared lookup.
#[derive(Clone)]
pub struct LocalDefaultHandlerFactory {
    lookup: Arc<dyn LocalServiceLookup>,
}

impl LocalDefaultHandlerFactory {
    #[must_use]
    pub fn new(lookup: Arc<dyn LocalServiceLookup>) -> Self {
        Self { lookup }
    }
}

impl DefaultHandlerFactory for LocalDefaultHandlerFactory {
    fn create(&self, context: Arc<RequestContext>) -> anyhow::Result<BoxHandler> {
        if context.contract.is_empty() {
            anyhow::bail!("request context is not bound to a contract");
        }
        Ok(BoxHandler::new(DefaultMethodHandler::new(
            &context,
            Arc::clone(&self.lookup),
        )))
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use invoker_core::MethodSignature;
    use serde_json::json;
    use tower::ServiceExt;

    use super::*;
    use crate::registry::LocalServices;
    use crate::traits::Microservice;

    struct Fixed(&'static str);

    #[async_trait]
    impl Microservice for Fixed {
        async fn dispatch(&self, _invocation: Invocation) -> Result<Value, InvocationError> {
            Ok(json!(self.0))
        }
    }

    const SIG: MethodSignature = MethodSignature {
        contract: "Greeter",
        name: "greet",
        params: &[],
        returns: "String",
    };

    fn context() -> Arc<RequestContext> {
        Arc::new(RequestContext::new().bound_to("Greeter"))
    }

    #[tokio::test]
    async fn dispatches_to_first_matching_instance() {
        let services = Arc::new(LocalServices::new());
        services.register(ServiceQuery::new("Greeter", "Greeter"), Arc::new(Fixed("first")));
        services.register(ServiceQuery::new("Greeter", "Greeter"), Arc::new(Fixed("second")));

        let ctx = context();
        let handler = LocalDefaultHandlerFactory::new(services).create(Arc::clone(&ctx)).unwrap();
        let out = handler
            .oneshot(Invocation::new(1, SIG, vec![], ctx))
            .await
            .unwrap();
        assert_eq!(out, json!("first"));
    }

    #[tokio::test]
    async fn missing_target_reports_query() {
        let ctx = context();
        let handler = DefaultMethodHandler::new(&ctx, Arc::new(LocalServices::new()));
        let err = handler
            .oneshot(Invocation::new(1, SIG, vec![], ctx))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            InvocationError::NoTarget { ref query } if query.contract == "Greeter"
        ));
    }

    #[test]
    fn unbound_context_is_rejected() {
        let factory = LocalDefaultHandlerFactory::new(Arc::new(LocalServices::new()));
        assert!(factory.create(Arc::new(RequestContext::new())).is_err());
    }
}
