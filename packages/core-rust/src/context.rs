use std::collections::BTreeSet;
use std::time::Duration;

use crate::query::ServiceQuery;

/// Originating context of a proxy: who asked for which service, and how.
///
/// Supplied by the dependency-wiring collaborator when a proxy is requested,
/// completed with the contract name by the proxy factory, and then shared
/// (read-only) by the default handler and every invocation through the proxy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    /// Contract the proxy implements. Filled in by the proxy factory.
    pub contract: String,
    /// Requested service name. Falls back to the contract name when absent.
    pub service_name: Option<String>,
    /// Qualifiers narrowing the set of acceptable services.
    pub qualifiers: BTreeSet<String>,
    /// Identifier of the component the proxy is injected into, if known.
    pub requester: Option<String>,
    /// Per-call timeout requested by the injection point.
    pub call_timeout: Option<Duration>,
    /// Trace identifier shared by all invocations through the proxy.
    pub trace_id: String,
}

impl RequestContext {
    /// Creates an empty context with a fresh trace id.
    #[must_use]
    pub fn new() -> Self {
        Self {
            contract: String::new(),
            service_name: None,
            qualifiers: BTreeSet::new(),
            requester: None,
            call_timeout: None,
            trace_id: uuid::Uuid::new_v4().to_string(),
        }
    }

    #[must_use]
    pub fn with_service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_qualifier(mut self, qualifier: impl Into<String>) -> Self {
        self.qualifiers.insert(qualifier.into());
        self
    }

    #[must_use]
    pub fn with_requester(mut self, requester: impl Into<String>) -> Self {
        self.requester = Some(requester.into());
        self
    }

    #[must_use]
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = Some(timeout);
        self
    }

    /// Returns the context bound to the given contract name.
    #[must_use]
    pub fn bound_to(mut self, contract: &str) -> Self {
        self.contract = contract.to_string();
        self
    }

    /// The query the default handler uses to locate the call target.
    #[must_use]
    pub fn query(&self) -> ServiceQuery {
        ServiceQuery {
            name: self
                .service_name
                .clone()
                .unwrap_or_else(|| self.contract.clone()),
            contract: self.contract.clone(),
            qualifiers: self.qualifiers.clone(),
        }
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_falls_back_to_contract_name() {
        let ctx = RequestContext::new().bound_to("Greeter");
        assert_eq!(ctx.query(), ServiceQuery::new("Greeter", "Greeter"));
    }

    #[test]
    fn query_carries_name_and_qualifiers() {
        let ctx = RequestContext::new()
            .with_service_name("greeter-eu")
            .with_qualifier("eu")
            .bound_to("Greeter");
        assert_eq!(
            ctx.query(),
            ServiceQuery::new("greeter-eu", "Greeter").with_qualifier("eu")
        );
    }

    #[test]
    fn new_contexts_get_distinct_trace_ids() {
        assert_ne!(RequestContext::new().trace_id, RequestContext::new().trace_id);
    }
}
