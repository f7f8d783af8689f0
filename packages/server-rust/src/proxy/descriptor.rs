//! Discovered method-handler implementations.

use std::borrow::Cow;
use std::sync::Arc;

use invoker_core::{Invocation, Value};
use tower::{Layer, Service};

use super::chain::ChainError;
use super::invocation::{BoxHandler, InvocationError};

/// Priority of handlers that do not declare one.
pub const DEFAULT_PRIORITY: i32 = 100;

/// Constructs a handler around the next handler of the chain.
pub type HandlerFactory = Arc<dyn Fn(BoxHandler) -> anyhow::Result<BoxHandler> + Send + Sync>;

/// A method-handler implementation: its name, its declared priority, and how
/// to build it around the handler it wraps.
///
/// Descriptors are created once at discovery time and never mutated.
#[derive(Clone)]
pub struct HandlerDescriptor {
    name: Cow<'static, str>,
    priority: Option<i32>,
    factory: HandlerFactory,
}

impl HandlerDescriptor {
    /// Creates a descriptor without a declared priority.
    pub fn new<F>(name: impl Into<Cow<'static, str>>, factory: F) -> Self
    where
        F: Fn(BoxHandler) -> anyhow::Result<BoxHandler> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            priority: None,
            factory: Arc::new(factory),
        }
    }

    /// Creates a descriptor from a Tower layer. Construction never fails.
    pub fn from_layer<L>(name: impl Into<Cow<'static, str>>, layer: L) -> Self
    where
        L: Layer<BoxHandler> + Send + Sync + 'static,
        L::Service: Service<Invocation, Response = Value, Error = InvocationError>
            + Clone
            + Send
            + Sync
            + 'static,
        <L::Service as Service<Invocation>>::Future: Send + 'static,
    {
        Self::new(name, move |next| Ok(BoxHandler::new(layer.layer(next))))
    }

    /// Declares the priority. Higher values run earlier (further out).
    #[must_use]
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = Some(priority);
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The priority as declared, if any.
    #[must_use]
    pub fn declared_priority(&self) -> Option<i32> {
        self.priority
    }

    /// The priority used for ordering.
    #[must_use]
    pub fn priority(&self) -> i32 {
        self.priority.unwrap_or(DEFAULT_PRIORITY)
    }

    /// Builds this handler around `next`.
    ///
    /// # Errors
    ///
    /// Returns [`ChainError::HandlerConstruction`] naming this handler if its
    /// factory fails.
    pub fn construct(&self, next: BoxHandler) -> Result<BoxHandler, ChainError> {
        (self.factory)(next).map_err(|source| ChainError::HandlerConstruction {
            handler: self.name.to_string(),
            source,
        })
    }
}

impl std::fmt::Debug for HandlerDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerDescriptor")
            .field("name", &self.name)
            .field("priority", &self.priority)
            .finish_non_exhaustive()
    }
}
