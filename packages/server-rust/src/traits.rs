use std::sync::Arc;

use async_trait::async_trait;
use invoker_core::{Invocation, RequestContext, ServiceQuery, Value};

use crate::proxy::{BoxHandler, HandlerDescriptor, InvocationError};

/// A locally hosted service instance, reachable through a single dispatch
/// entry point.
///
/// Identity matters: the handle registry treats two `Arc`s pointing at the same
/// instance as the same service, and two distinct instances as different
/// services even if they behave identically.
#[async_trait]
pub trait Microservice: Send + Sync + 'static {
    /// Executes the invoked method against the real implementation.
    async fn dispatch(&self, invocation: Invocation) -> Result<Value, InvocationError>;
}

/// Source of method-handler implementations.
/// Implementations: explicit registration list (`StaticHandlerSource`), tests.
pub trait HandlerSource: Send + Sync {
    /// Returns every handler registered for `handler_contract`, in discovery
    /// order. The order is only used to break priority ties.
    fn discover(&self, handler_contract: &str) -> anyhow::Result<Vec<HandlerDescriptor>>;
}

/// Builds the terminal handler of a chain for one proxy.
pub trait DefaultHandlerFactory: Send + Sync {
    /// Creates the handler that performs the actual dispatch for calls made
    /// through a proxy with the given context.
    fn create(&self, context: Arc<RequestContext>) -> anyhow::Result<BoxHandler>;
}

/// Lookup of the live service instances hosted by this process.
pub trait LocalServiceLookup: Send + Sync {
    /// Returns the local instances satisfying `query`, in a stable order.
    fn lookup(&self, query: &ServiceQuery) -> Vec<Arc<dyn Microservice>>;
}

/// Address under which this host exposes its services (`host:port`).
pub trait OriginAddress: Send + Sync {
    fn origin(&self) -> String;
}

impl OriginAddress for String {
    fn origin(&self) -> String {
        self.clone()
    }
}

impl OriginAddress for &'static str {
    fn origin(&self) -> String {
        (*self).to_string()
    }
}
