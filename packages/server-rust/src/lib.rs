//! Invoker server: proxies whose calls run through a prioritised handler
//! chain, and a registry exposing local service instances over HTTP.

pub mod client;
pub mod config;
pub mod network;
pub mod proxy;
pub mod registry;
pub mod traits;

pub use client::{ClientError, QueryClient};
pub use config::InvokerConfig;
pub use proxy::{
    builtin_handlers, HandlerDescriptor, InvocationError, LocalDefaultHandlerFactory,
    MicroserviceProxyFactory, ProxyError, ServiceContract, StaticHandlerSource,
};
pub use registry::{LocalServices, ServiceHandle, ServiceHandleRegistry};
pub use traits::{
    DefaultHandlerFactory, HandlerSource, LocalServiceLookup, Microservice, OriginAddress,
};

/// Re-exports used by [`service_contract!`] expansions in downstream crates.
#[doc(hidden)]
pub mod __private {
    pub use async_trait::async_trait;
    pub use futures_util::future::BoxFuture;
    pub use invoker_core::{Invocation, MethodSignature, Value};
}

#[cfg(test)]
mod tests {
    #[test]
    fn crate_loads() {
        // Empty body: if this test runs, the crate compiles and loads.
    }
}
