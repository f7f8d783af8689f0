//! A single method call travelling through a handler chain.

use std::sync::Arc;

use crate::context::RequestContext;

/// Argument and result representation on the invocation path.
pub use serde_json::Value;

/// Static description of one contract method.
///
/// Generated alongside each contract; `params` and `returns` hold the Rust
/// type names as written in the contract declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MethodSignature {
    pub contract: &'static str,
    pub name: &'static str,
    pub params: &'static [&'static str],
    pub returns: &'static str,
}

impl std::fmt::Display for MethodSignature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}::{}({}) -> {}",
            self.contract,
            self.name,
            self.params.join(", "),
            self.returns
        )
    }
}

/// An intercepted call: which method, with which arguments, from which proxy.
#[derive(Debug, Clone)]
pub struct Invocation {
    /// Per-proxy sequence number, starting at 1.
    pub call_id: u64,
    pub method: MethodSignature,
    /// Arguments in declaration order.
    pub args: Vec<Value>,
    /// Context of the proxy the call was made through.
    pub context: Arc<RequestContext>,
}

impl Invocation {
    #[must_use]
    pub fn new(
        call_id: u64,
        method: MethodSignature,
        args: Vec<Value>,
        context: Arc<RequestContext>,
    ) -> Self {
        Self {
            call_id,
            method,
            args,
            context,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_display() {
        let sig = MethodSignature {
            contract: "Greeter",
            name: "greet",
            params: &["String", "u32"],
            returns: "String",
        };
        assert_eq!(sig.to_string(), "Greeter::greet(String, u32) -> String");
    }
}
