//! Wire form of an exposed service handle.

use serde::{Deserialize, Serialize};

use crate::query::ServiceQuery;

/// Process-unique identifier of an exposed handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HandleId(pub u64);

impl std::fmt::Display for HandleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "h{}", self.0)
    }
}

/// What a remote peer learns about a handle: where it lives and which query
/// it answers. The service instance itself never leaves the hosting process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandleRecord {
    /// Identifier assigned by the hosting registry.
    pub id: HandleId,
    /// Origin address (`host:port`) of the node that exposes the service.
    pub host: String,
    /// The query this handle was created for.
    pub query: ServiceQuery,
}
