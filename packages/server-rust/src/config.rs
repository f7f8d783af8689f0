/// Node-level configuration for proxies and the handle registry.
///
/// Controls the built-in handlers' defaults and the path the invoker endpoint
/// is mounted under.
#[derive(Debug, Clone)]
pub struct InvokerConfig {
    /// Unique identifier for this node, used in log output.
    pub node_id: String,
    /// Call timeout in milliseconds when the proxy's context sets none.
    pub default_call_timeout_ms: u64,
    /// Maximum number of concurrent proxied invocations before load shedding.
    pub max_concurrent_invocations: u32,
    /// Path segment the invoker endpoint is mounted under (`/{path}/query`).
    pub invoker_path: String,
}

impl InvokerConfig {
    /// Route of the query endpoint, e.g. `/invoker/query`.
    #[must_use]
    pub fn query_route(&self) -> String {
        format!("/{}/query", self.invoker_path.trim_matches('/'))
    }
}

impl Default for InvokerConfig {
    fn default() -> Self {
        Self {
            node_id: String::new(),
            default_call_timeout_ms: 30_000,
            max_concurrent_invocations: 1000,
            invoker_path: "invoker".to_string(),
        }
    }
}
