//! Outbound handle to a local service instance.

use std::sync::Arc;

use invoker_core::{HandleId, HandleRecord, ServiceQuery};

use crate::traits::Microservice;

/// Identity of a service instance: the address of the shared allocation.
///
/// Stable for as long as any `Arc` to the instance is alive. Handles keep
/// theirs alive, so an address seen in a handle list is never reused.
pub(crate) fn instance_key(service: &Arc<dyn Microservice>) -> usize {
    Arc::as_ptr(service).cast::<()>() as usize
}

/// A local instance exposed under a query, stamped with the origin address
/// at creation time. Immutable once created.
pub struct ServiceHandle {
    id: HandleId,
    host: String,
    query: ServiceQuery,
    service: Arc<dyn Microservice>,
}

impl ServiceHandle {
    pub(crate) fn new(
        id: HandleId,
        host: String,
        query: ServiceQuery,
        service: Arc<dyn Microservice>,
    ) -> Self {
        Self {
            id,
            host,
            query,
            service,
        }
    }

    #[must_use]
    pub fn id(&self) -> HandleId {
        self.id
    }

    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    #[must_use]
    pub fn query(&self) -> &ServiceQuery {
        &self.query
    }

    /// The exposed instance.
    #[must_use]
    pub fn service(&self) -> &Arc<dyn Microservice> {
        &self.service
    }

    /// Returns `true` if this handle exposes exactly `service` (same
    /// instance, not merely an equal one).
    #[must_use]
    pub fn is_for(&self, service: &Arc<dyn Microservice>) -> bool {
        instance_key(&self.service) == instance_key(service)
    }

    /// What remote peers get to see of this handle.
    #[must_use]
    pub fn record(&self) -> HandleRecord {
        HandleRecord {
            id: self.id,
            host: self.host.clone(),
            query: self.query.clone(),
        }
    }
}

impl std::fmt::Debug for ServiceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceHandle")
            .field("id", &self.id)
            .field("host", &self.host)
            .field("query", &self.query)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use invoker_core::{Invocation, Value};

    use super::*;
    use crate::proxy::InvocationError;

    struct Noop;

    #[async_trait]
    impl Microservice for Noop {
        async fn dispatch(&self, _invocation: Invocation) -> Result<Value, InvocationError> {
            Ok(Value::Null)
        }
    }

    #[test]
    fn identity_is_per_instance() {
        let a: Arc<dyn Microservice> = Arc::new(Noop);
        let b: Arc<dyn Microservice> = Arc::new(Noop);
        let handle = ServiceHandle::new(
            HandleId(1),
            "node-a:8080".to_string(),
            ServiceQuery::new("noop", "Noop"),
            Arc::clone(&a),
        );

        assert!(handle.is_for(&a));
        assert!(handle.is_for(&Arc::clone(&a)));
        assert!(!handle.is_for(&b));
    }

    #[test]
    fn record_carries_id_host_and_query() {
        let handle = ServiceHandle::new(
            HandleId(3),
            "node-a:8080".to_string(),
            ServiceQuery::new("noop", "Noop").with_qualifier("blue"),
            Arc::new(Noop),
        );
        let record = handle.record();
        assert_eq!(record.id, HandleId(3));
        assert_eq!(record.host, "node-a:8080");
        assert!(record.query.qualifiers.contains("blue"));
    }
}
