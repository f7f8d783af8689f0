//! Handler type and error taxonomy of the invocation path.

use invoker_core::{Invocation, MethodSignature, ServiceQuery, Value};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tower::util::BoxCloneSyncService;

/// A type-erased link of a handler chain.
///
/// Every handler, including the terminal one, is a `tower::Service` over
/// [`Invocation`]; boxing lets chains be assembled from descriptors at runtime.
pub type BoxHandler = BoxCloneSyncService<Invocation, Value, InvocationError>;

/// Errors surfaced to the caller of a proxied method.
#[derive(Debug, thiserror::Error)]
pub enum InvocationError {
    #[error("no local service satisfies {query}")]
    NoTarget { query: ServiceQuery },
    #[error("contract `{contract}` has no method `{method}`")]
    UnknownMethod { contract: String, method: String },
    #[error("missing argument `{argument}` for {method}")]
    MissingArgument {
        method: MethodSignature,
        argument: &'static str,
    },
    #[error("cannot convert {what}: {source}")]
    Codec {
        what: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("invocation timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
    #[error("too many concurrent invocations, try again later")]
    Overloaded,
    #[error("service failed: {0}")]
    Service(#[from] anyhow::Error),
}

/// Converts an argument or a return value into its invocation form.
///
/// # Errors
///
/// Returns [`InvocationError::Codec`] if the value cannot be represented.
pub fn encode_value<T: Serialize + ?Sized>(
    value: &T,
    what: &str,
) -> Result<Value, InvocationError> {
    serde_json::to_value(value).map_err(|source| InvocationError::Codec {
        what: what.to_string(),
        source,
    })
}

/// Converts an invocation value back into a typed argument or return value.
///
/// # Errors
///
/// Returns [`InvocationError::Codec`] if the value has the wrong shape.
pub fn decode_value<T: DeserializeOwned>(value: Value, what: &str) -> Result<T, InvocationError> {
    serde_json::from_value(value).map_err(|source| InvocationError::Codec {
        what: what.to_string(),
        source,
    })
}

/// Takes the next positional argument of `method` and decodes it.
///
/// # Errors
///
/// Returns [`InvocationError::MissingArgument`] when the caller supplied fewer
/// arguments than declared, or a codec error when the argument has the wrong
/// shape.
pub fn take_argument<T: DeserializeOwned>(
    args: &mut impl Iterator<Item = Value>,
    method: MethodSignature,
    argument: &'static str,
) -> Result<T, InvocationError> {
    let value = args
        .next()
        .ok_or(InvocationError::MissingArgument { method, argument })?;
    decode_value(value, argument)
}
