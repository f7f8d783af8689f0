//! Service lookup criteria.
//!
//! A [`ServiceQuery`] describes which services a caller is interested in. It
//! doubles as the key under which exposed handles are accumulated, so two
//! queries with equal content are interchangeable.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Lookup criterion over service metadata.
///
/// Equality and hashing are by content. Qualifiers live in a `BTreeSet` so the
/// serialized form and the `Hash` value do not depend on insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ServiceQuery {
    /// Logical service name (e.g. `"orders"`).
    pub name: String,
    /// Name of the contract the service implements.
    pub contract: String,
    /// Additional qualifiers a matching service must carry.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub qualifiers: BTreeSet<String>,
}

/// Reasons a query is rejected before it reaches any shared state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    #[error("query has an empty service name")]
    EmptyName,
    #[error("query has an empty contract name")]
    EmptyContract,
    #[error("query qualifier is empty")]
    EmptyQualifier,
}

impl ServiceQuery {
    /// Creates a query without qualifiers.
    #[must_use]
    pub fn new(name: impl Into<String>, contract: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            contract: contract.into(),
            qualifiers: BTreeSet::new(),
        }
    }

    /// Adds a qualifier.
    #[must_use]
    pub fn with_qualifier(mut self, qualifier: impl Into<String>) -> Self {
        self.qualifiers.insert(qualifier.into());
        self
    }

    /// Checks that the query is usable as a lookup key.
    ///
    /// # Errors
    ///
    /// Returns a [`QueryError`] when the name, the contract or any qualifier
    /// is blank.
    pub fn validate(&self) -> Result<(), QueryError> {
        if self.name.trim().is_empty() {
            return Err(QueryError::EmptyName);
        }
        if self.contract.trim().is_empty() {
            return Err(QueryError::EmptyContract);
        }
        if self.qualifiers.iter().any(|q| q.trim().is_empty()) {
            return Err(QueryError::EmptyQualifier);
        }
        Ok(())
    }

    /// Returns `true` if a service offered under `offered` satisfies this query.
    ///
    /// Name and contract must be equal; every qualifier requested here must be
    /// carried by the offer. The offer may carry more.
    #[must_use]
    pub fn is_satisfied_by(&self, offered: &ServiceQuery) -> bool {
        self.name == offered.name
            && self.contract == offered.contract
            && self.qualifiers.is_subset(&offered.qualifiers)
    }
}

impl std::fmt::Display for ServiceQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}<{}>", self.name, self.contract)?;
        if !self.qualifiers.is_empty() {
            let joined: Vec<&str> = self.qualifiers.iter().map(String::as_str).collect();
            write!(f, "[{}]", joined.join(","))?;
        }
        Ok(())
    }
}
