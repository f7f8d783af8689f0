//! In-process service instances.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use invoker_core::{Invocation, ServiceQuery, Value};
use parking_lot::RwLock;
use tracing::debug;

use crate::proxy::{InvocationError, ServiceContract};
use crate::traits::{LocalServiceLookup, Microservice};

/// Adapts a real implementation of contract `C` into a [`Microservice`]
/// through the contract's generated dispatch.
pub struct Exported<C: ServiceContract + ?Sized> {
    inner: Arc<C>,
}

impl<C: ServiceContract + ?Sized> Exported<C> {
    #[must_use]
    pub fn new(inner: Arc<C>) -> Self {
        Self { inner }
    }

    #[must_use]
    pub fn inner(&self) -> &Arc<C> {
        &self.inner
    }
}

#[async_trait]
impl<C: ServiceContract + ?Sized> Microservice for Exported<C> {
    async fn dispatch(&self, invocation: Invocation) -> Result<Value, InvocationError> {
        C::dispatch(&self.inner, invocation).await
    }
}

// ---------------------------------------------------------------------------
// LocalServices
// ---------------------------------------------------------------------------

/// Services hosted by this process, each offered under a query.
///
/// Lookups return matches in registration order. Registrations are never
/// removed.
///
/// Exporting the same implementation instance again, under any offer, reuses
/// its adapter, so the instance keeps a single identity towards the handle
/// registry.
#[derive(Default)]
pub struct LocalServices {
    entries: RwLock<Vec<(ServiceQuery, Arc<dyn Microservice>)>>,
    adapters: DashMap<(usize, &'static str), Arc<dyn Microservice>>,
}

impl LocalServices {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Offers `service` under `offered`.
    pub fn register(&self, offered: ServiceQuery, service: Arc<dyn Microservice>) {
        debug!(query = %offered, "local service registered");
        self.entries.write().push((offered, service));
    }

    /// Offers a real implementation of `C` under `name`, with the contract
    /// taken from `C`. Returns the registered instance.
    pub fn export<C: ServiceContract + ?Sized>(
        &self,
        name: impl Into<String>,
        service: Arc<C>,
    ) -> Arc<dyn Microservice> {
        self.export_as(ServiceQuery::new(name, C::DESCRIPTOR.name), service)
    }

    /// Like [`export`](Self::export) with a fully specified offer, qualifiers
    /// included.
    pub fn export_as<C: ServiceContract + ?Sized>(
        &self,
        offered: ServiceQuery,
        service: Arc<C>,
    ) -> Arc<dyn Microservice> {
        // Keyed by contract too: one allocation may implement several
        // contracts, each with its own dispatch.
        let key = (
            Arc::as_ptr(&service).cast::<()>() as usize,
            C::DESCRIPTOR.name,
        );
        let exported = Arc::clone(
            &*self
                .adapters
                .entry(key)
                .or_insert_with(|| Arc::new(Exported::new(service))),
        );
        self.register(offered, Arc::clone(&exported));
        exported
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl LocalServiceLookup for LocalServices {
    fn lookup(&self, query: &ServiceQuery) -> Vec<Arc<dyn Microservice>> {
        self.entries
            .read()
            .iter()
            .filter(|(offered, _)| query.is_satisfied_by(offered))
            .map(|(_, service)| Arc::clone(service))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use invoker_core::RequestContext;
    use serde_json::json;

    use super::*;
    use crate::registry::handle::instance_key;
    use crate::registry::ServiceHandleRegistry;

    crate::service_contract! {
        pub trait Counter as CounterProxy {
            fn bump(by: u32) -> u32;
        }
    }

    struct Fixed(u32);

    #[async_trait]
    impl Counter for Fixed {
        async fn bump(&self, by: u32) -> Result<u32, InvocationError> {
            Ok(self.0 + by)
        }
    }

    #[test]
    fn lookup_matches_name_contract_and_qualifier_subset() {
        let services = LocalServices::new();
        let plain = services.export("counter", Arc::new(Fixed(0)) as Arc<dyn Counter>);
        let blue = services.export_as(
            ServiceQuery::new("counter", "Counter").with_qualifier("blue"),
            Arc::new(Fixed(1)) as Arc<dyn Counter>,
        );
        services.export("other", Arc::new(Fixed(2)) as Arc<dyn Counter>);

        let all = services.lookup(&ServiceQuery::new("counter", "Counter"));
        let keys: Vec<usize> = all.iter().map(instance_key).collect();
        assert_eq!(keys, vec![instance_key(&plain), instance_key(&blue)]);

        let only_blue =
            services.lookup(&ServiceQuery::new("counter", "Counter").with_qualifier("blue"));
        assert_eq!(only_blue.len(), 1);
        assert_eq!(instance_key(&only_blue[0]), instance_key(&blue));

        assert!(services
            .lookup(&ServiceQuery::new("counter", "Gauge"))
            .is_empty());
        assert_eq!(services.len(), 3);
    }

    #[test]
    fn instance_exported_under_two_offers_gets_one_handle() {
        let services = LocalServices::new();
        let real: Arc<dyn Counter> = Arc::new(Fixed(0));
        let plain = services.export("counter", Arc::clone(&real));
        let eu = services.export_as(
            ServiceQuery::new("counter", "Counter").with_qualifier("eu"),
            Arc::clone(&real),
        );
        assert_eq!(instance_key(&plain), instance_key(&eu));

        let other = services.export("counter", Arc::new(Fixed(0)) as Arc<dyn Counter>);
        assert_ne!(instance_key(&plain), instance_key(&other));

        let registry = ServiceHandleRegistry::new(Arc::new("node-a:8080"));
        let handles = registry
            .assure_handles(&ServiceQuery::new("counter", "Counter"), &services)
            .unwrap();
        assert_eq!(handles.len(), 2);
        assert!(handles[0].is_for(&plain));
        assert!(handles[1].is_for(&other));
    }

    #[tokio::test]
    async fn exported_dispatches_through_contract() {
        let services = LocalServices::new();
        let svc = services.export("counter", Arc::new(Fixed(40)) as Arc<dyn Counter>);

        let method = <dyn Counter as ServiceContract>::DESCRIPTOR.methods[0];
        let out = svc
            .dispatch(Invocation::new(
                1,
                method,
                vec![json!(2)],
                Arc::new(RequestContext::new()),
            ))
            .await
            .unwrap();
        assert_eq!(out, json!(42));
    }
}
