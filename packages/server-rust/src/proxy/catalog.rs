//! Handler discovery and ordering.
//!
//! Handlers are discovered once per catalog, ordered by descending priority
//! (stable, so equal priorities keep discovery order), and published through a
//! one-time initialization cell. After that the ordered list is read without
//! locking.

use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use tracing::info;

use super::descriptor::HandlerDescriptor;
use crate::traits::HandlerSource;

/// Name of the handler contract that proxy method handlers are registered under.
pub const METHOD_HANDLER_CONTRACT: &str = "microservice-method-handler";

/// Orders descriptors for chain assembly: highest priority first, ties in
/// discovery order.
#[must_use]
pub fn order_handlers(mut descriptors: Vec<HandlerDescriptor>) -> Vec<HandlerDescriptor> {
    // `sort_by_key` is stable.
    descriptors.sort_by_key(|d| std::cmp::Reverse(d.priority()));
    descriptors
}

// ---------------------------------------------------------------------------
// StaticHandlerSource
// ---------------------------------------------------------------------------

/// Explicit registration list of handler implementations, keyed by handler
/// contract. Registration order is discovery order.
#[derive(Default)]
pub struct StaticHandlerSource {
    registrations: RwLock<HashMap<String, Vec<HandlerDescriptor>>>,
}

impl StaticHandlerSource {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler for `handler_contract`.
    pub fn register(&self, handler_contract: &str, descriptor: HandlerDescriptor) {
        self.registrations
            .write()
            .entry(handler_contract.to_string())
            .or_default()
            .push(descriptor);
    }

    /// Registers a proxy method handler.
    pub fn register_method_handler(&self, descriptor: HandlerDescriptor) {
        self.register(METHOD_HANDLER_CONTRACT, descriptor);
    }

    /// Builder-style variant of [`register_method_handler`](Self::register_method_handler).
    #[must_use]
    pub fn with_method_handler(self, descriptor: HandlerDescriptor) -> Self {
        self.register_method_handler(descriptor);
        self
    }
}

impl HandlerSource for StaticHandlerSource {
    fn discover(&self, handler_contract: &str) -> anyhow::Result<Vec<HandlerDescriptor>> {
        Ok(self
            .registrations
            .read()
            .get(handler_contract)
            .cloned()
            .unwrap_or_default())
    }
}

// ---------------------------------------------------------------------------
// HandlerCatalog
// ---------------------------------------------------------------------------

/// Discovers the method handlers once and hands out the ordered list.
pub struct HandlerCatalog {
    source: Arc<dyn HandlerSource>,
    handler_contract: String,
    ordered: OnceCell<Arc<[HandlerDescriptor]>>,
}

impl HandlerCatalog {
    /// Creates a catalog over the proxy method handlers of `source`.
    #[must_use]
    pub fn new(source: Arc<dyn HandlerSource>) -> Self {
        Self::for_contract(source, METHOD_HANDLER_CONTRACT)
    }

    /// Creates a catalog over an arbitrary handler contract.
    #[must_use]
    pub fn for_contract(source: Arc<dyn HandlerSource>, handler_contract: &str) -> Self {
        Self {
            source,
            handler_contract: handler_contract.to_string(),
            ordered: OnceCell::new(),
        }
    }

    /// Returns the ordered handlers, discovering them on first use.
    ///
    /// A failed discovery is not cached; the next call tries again.
    ///
    /// # Errors
    ///
    /// Returns the discovery error of the underlying source.
    pub fn handlers(&self) -> anyhow::Result<Arc<[HandlerDescriptor]>> {
        self.ordered
            .get_or_try_init(|| {
                let discovered = self.source.discover(&self.handler_contract)?;
                let ordered = order_handlers(discovered);
                info!(
                    contract = %self.handler_contract,
                    handlers = ?ordered.iter().map(HandlerDescriptor::name).collect::<Vec<_>>(),
                    "method handlers discovered"
                );
                Ok::<_, anyhow::Error>(ordered.into())
            })
            .map(Arc::clone)
    }
}
