//! HTTP handler definitions for the invoker surface.
//!
//! This module defines `AppState` (the shared state carried through axum
//! extractors) and re-exports the handler functions used by the router.

pub mod health;
pub mod query;

pub use health::{health_handler, liveness_handler, readiness_handler};
pub use query::query_handler;

use std::sync::Arc;
use std::time::Instant;

use super::ShutdownController;
use crate::config::InvokerConfig;
use crate::registry::ServiceHandleRegistry;
use crate::traits::LocalServiceLookup;

/// Shared application state passed to all axum handlers via `State` extraction.
#[derive(Clone)]
pub struct AppState {
    /// Handles exposed so far, per query.
    pub handles: Arc<ServiceHandleRegistry>,
    /// Instances hosted by this process.
    pub lookup: Arc<dyn LocalServiceLookup>,
    /// Lifecycle controller with health state and in-flight tracking.
    pub shutdown: Arc<ShutdownController>,
    pub invoker: Arc<InvokerConfig>,
    /// Used for uptime reporting.
    pub start_time: Instant,
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::registry::LocalServices;

    pub(crate) fn state_with(services: Arc<LocalServices>) -> AppState {
        AppState {
            handles: Arc::new(ServiceHandleRegistry::new(Arc::new("node-a:8080"))),
            lookup: services,
            shutdown: Arc::new(ShutdownController::new()),
            invoker: Arc::new(InvokerConfig::default()),
            start_time: Instant::now(),
        }
    }

    pub(crate) fn state() -> AppState {
        state_with(Arc::new(LocalServices::new()))
    }
}
