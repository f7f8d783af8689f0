//! Proxy creation.
//!
//! Rust has no runtime proxy generation, so every contract carries a
//! build-time generated proxy type (see [`service_contract!`](crate::service_contract)).
//! [`ProxyFactory`] validates the contract and binds a composed handler to a
//! fresh proxy instance; [`MicroserviceProxyFactory`] adds handler discovery
//! and chain assembly on top, which is what dependency wiring calls.
//!
//! Only the methods declared in the contract are intercepted. Helpers defined
//! outside the declaration (extension traits, inherent methods on the proxy)
//! run locally and never reach the handler chain.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures_util::future::BoxFuture;
use invoker_core::{Invocation, MethodSignature, RequestContext, Value};
use tower::ServiceExt;
use tracing::{debug, warn};

use super::catalog::HandlerCatalog;
use super::chain::{build_chain, ChainError};
use super::invocation::{BoxHandler, InvocationError};
use crate::traits::{DefaultHandlerFactory, HandlerSource};

// ---------------------------------------------------------------------------
// Contract description
// ---------------------------------------------------------------------------

/// Whether a contract can be proxied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContractKind {
    /// An interface-like contract: the proxy implements every method.
    Interface,
    /// A contract closed to substitution. Proxy creation is refused.
    Sealed,
}

/// Static description of a service contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContractDescriptor {
    pub name: &'static str,
    pub kind: ContractKind,
    pub methods: &'static [MethodSignature],
}

/// Implemented for `dyn Contract` by [`service_contract!`](crate::service_contract).
///
/// Ties the contract's trait object type to its descriptor, its generated
/// proxy, and the server-side dispatch into a real implementation.
pub trait ServiceContract: Send + Sync + 'static {
    const DESCRIPTOR: ContractDescriptor;

    /// Wraps `binding` in the generated proxy type.
    fn bind(binding: ProxyBinding) -> Arc<Self>;

    /// Decodes `invocation` and calls the matching method on `target`.
    fn dispatch<'a>(
        target: &'a Self,
        invocation: Invocation,
    ) -> BoxFuture<'a, Result<Value, InvocationError>>;
}

// ---------------------------------------------------------------------------
// ProxyBinding
// ---------------------------------------------------------------------------

/// What a generated proxy holds: its contract, its composed handler, and the
/// context it was created for. Lives exactly as long as the proxy.
pub struct ProxyBinding {
    contract: ContractDescriptor,
    handler: BoxHandler,
    context: Arc<RequestContext>,
    next_call_id: AtomicU64,
}

impl ProxyBinding {
    fn new(contract: ContractDescriptor, handler: BoxHandler, context: Arc<RequestContext>) -> Self {
        Self {
            contract,
            handler,
            context,
            next_call_id: AtomicU64::new(1),
        }
    }

    #[must_use]
    pub fn contract(&self) -> &ContractDescriptor {
        &self.contract
    }

    #[must_use]
    pub fn context(&self) -> &Arc<RequestContext> {
        &self.context
    }

    /// Routes one method call through the handler chain.
    ///
    /// The call runs in the caller's task; nothing is spawned.
    ///
    /// # Errors
    ///
    /// Returns whatever the chain returns.
    pub async fn invoke(
        &self,
        method: MethodSignature,
        args: Vec<Value>,
    ) -> Result<Value, InvocationError> {
        let call_id = self.next_call_id.fetch_add(1, Ordering::Relaxed);
        let invocation = Invocation::new(call_id, method, args, Arc::clone(&self.context));
        self.handler.clone().oneshot(invocation).await
    }
}

impl std::fmt::Debug for ProxyBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxyBinding")
            .field("contract", &self.contract.name)
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Proxy creation failures. Neither leaves anything behind.
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error("contract `{contract}` cannot be proxied: {reason}")]
    Configuration {
        contract: &'static str,
        reason: &'static str,
    },
    #[error("cannot create proxy for `{contract}`: {source}")]
    Creation {
        contract: &'static str,
        #[source]
        source: ChainError,
    },
}

// ---------------------------------------------------------------------------
// ProxyFactory
// ---------------------------------------------------------------------------

/// Binds composed handlers to generated proxies.
pub struct ProxyFactory;

impl ProxyFactory {
    /// Checks that `C` can be proxied.
    ///
    /// # Errors
    ///
    /// Returns [`ProxyError::Configuration`] for sealed or unnamed contracts.
    pub fn check<C: ServiceContract + ?Sized>() -> Result<(), ProxyError> {
        let descriptor = C::DESCRIPTOR;
        if descriptor.name.is_empty() {
            return Err(ProxyError::Configuration {
                contract: descriptor.name,
                reason: "contract has no name",
            });
        }
        if descriptor.kind == ContractKind::Sealed {
            return Err(ProxyError::Configuration {
                contract: descriptor.name,
                reason: "sealed contracts cannot be substituted by a proxy",
            });
        }
        Ok(())
    }

    /// Creates a proxy of `C` whose every contract method is routed to `handler`.
    ///
    /// # Errors
    ///
    /// Returns [`ProxyError::Configuration`] if `C` cannot be proxied.
    pub fn create_proxy<C: ServiceContract + ?Sized>(
        handler: BoxHandler,
        context: Arc<RequestContext>,
    ) -> Result<Arc<C>, ProxyError> {
        Self::check::<C>()?;
        Ok(C::bind(ProxyBinding::new(C::DESCRIPTOR, handler, context)))
    }
}

// ---------------------------------------------------------------------------
// MicroserviceProxyFactory
// ---------------------------------------------------------------------------

/// Creates ready-to-use proxies: discovered handlers (highest priority
/// outermost) around the default handler, bound to a generated proxy.
pub struct MicroserviceProxyFactory {
    catalog: HandlerCatalog,
    default_handlers: Arc<dyn DefaultHandlerFactory>,
}

impl MicroserviceProxyFactory {
    #[must_use]
    pub fn new(
        handlers: Arc<dyn HandlerSource>,
        default_handlers: Arc<dyn DefaultHandlerFactory>,
    ) -> Self {
        Self {
            catalog: HandlerCatalog::new(handlers),
            default_handlers,
        }
    }

    /// Creates a proxy of `C` for the given injection context.
    ///
    /// # Errors
    ///
    /// Returns [`ProxyError::Configuration`] if `C` cannot be proxied, or
    /// [`ProxyError::Creation`] if discovery or any handler construction fails.
    pub fn create_proxy<C: ServiceContract + ?Sized>(
        &self,
        request: RequestContext,
    ) -> Result<Arc<C>, ProxyError> {
        let contract = C::DESCRIPTOR.name;
        ProxyFactory::check::<C>()?;

        let context = Arc::new(request.bound_to(contract));
        let handler = self
            .catalog
            .handlers()
            .map_err(ChainError::Discovery)
            .and_then(|ordered| build_chain(&ordered, self.default_handlers.as_ref(), &context))
            .map_err(|source| {
                warn!(contract, error = %source, "proxy creation failed");
                ProxyError::Creation { contract, source }
            })?;

        debug!(contract, trace_id = %context.trace_id, "proxy created");
        ProxyFactory::create_proxy::<C>(handler, context)
    }
}
