//! Query-keyed index of exposed handles.
//!
//! Each query owns an append-only handle list behind its own mutex, stored in
//! a `DashMap`. Reconciling one query never blocks another, and the list of a
//! query is only ever read, diffed and extended inside its critical section,
//! so concurrent discovery passes cannot create duplicate handles.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use invoker_core::{HandleId, QueryError, ServiceQuery};
use parking_lot::Mutex;
use tracing::debug;

use super::handle::{instance_key, ServiceHandle};
use crate::traits::{LocalServiceLookup, Microservice, OriginAddress};

type HandleList = Arc<Mutex<Vec<Arc<ServiceHandle>>>>;

/// Registry failures. A failed call leaves the index untouched.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("invalid service query: {0}")]
    InvalidQuery(#[from] QueryError),
}

/// Process-wide index of exposed handles, keyed by query.
///
/// Grows monotonically: handles are never removed, even when the instance
/// they expose is no longer offered locally.
pub struct ServiceHandleRegistry {
    index: DashMap<ServiceQuery, HandleList>,
    origin: Arc<dyn OriginAddress>,
    next_id: AtomicU64,
}

impl ServiceHandleRegistry {
    /// Creates an empty registry stamping new handles with `origin`.
    #[must_use]
    pub fn new(origin: Arc<dyn OriginAddress>) -> Self {
        Self {
            index: DashMap::new(),
            origin,
            next_id: AtomicU64::new(1),
        }
    }

    /// Returns every handle known for `query`, first creating handles for
    /// those of `instances` not represented yet.
    ///
    /// New handles are appended in supply order. An instance supplied twice
    /// gets one handle.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::InvalidQuery`] for a malformed query; nothing
    /// is created in that case.
    pub fn resolve(
        &self,
        query: &ServiceQuery,
        instances: &[Arc<dyn Microservice>],
    ) -> Result<Vec<Arc<ServiceHandle>>, RegistryError> {
        query.validate()?;

        // Clone the list handle out so the map shard is not held while the
        // per-query mutex is.
        let list = Arc::clone(&*self.index.entry(query.clone()).or_default());
        let mut handles = list.lock();

        let mut known: HashSet<usize> = handles.iter().map(|h| instance_key(h.service())).collect();
        let mut created = 0usize;
        let mut origin: Option<String> = None;

        for instance in instances {
            if !known.insert(instance_key(instance)) {
                continue;
            }
            let host = origin.get_or_insert_with(|| self.origin.origin()).clone();
            let id = HandleId(self.next_id.fetch_add(1, Ordering::Relaxed));
            handles.push(Arc::new(ServiceHandle::new(
                id,
                host,
                query.clone(),
                Arc::clone(instance),
            )));
            created += 1;
        }

        if created > 0 {
            metrics::counter!("invoker_handles_created_total").increment(created as u64);
            debug!(
                query = %query,
                created,
                total = handles.len(),
                "service handles created"
            );
        }

        Ok(handles.clone())
    }

    /// Reconciles `query` against the instances `lookup` currently offers and
    /// returns the full handle list.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::InvalidQuery`] for a malformed query, before
    /// the lookup is consulted.
    pub fn assure_handles(
        &self,
        query: &ServiceQuery,
        lookup: &dyn LocalServiceLookup,
    ) -> Result<Vec<Arc<ServiceHandle>>, RegistryError> {
        query.validate()?;
        let instances = lookup.lookup(query);
        self.resolve(query, &instances)
    }

    /// Handles accumulated so far for `query`, without reconciling.
    #[must_use]
    pub fn handles(&self, query: &ServiceQuery) -> Vec<Arc<ServiceHandle>> {
        self.index
            .get(query)
            .map(|list| list.lock().clone())
            .unwrap_or_default()
    }

    /// Number of distinct queries seen.
    #[must_use]
    pub fn query_count(&self) -> usize {
        self.index.len()
    }

    /// Total number of handles across all queries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.index.iter().map(|entry| entry.value().lock().len()).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
