//! Built-in method handlers.
//!
//! These are ordinary Tower layers over [`Invocation`](invoker_core::Invocation),
//! registered through the same discovery path as any third-party handler:
//!
//! - [`load_shed`]: semaphore-based concurrency limiting (priority 300)
//! - [`timeout`]: per-invocation timeout enforcement (priority 200)
//! - [`tracing`]: spans and metrics per invocation (priority 100)
//!
//! Highest priority runs outermost, so overload is rejected before any timer
//! starts and the tracing span measures only the work below it.

pub mod load_shed;
pub mod timeout;
pub mod tracing;

use std::time::Duration;

use futures_util::future::BoxFuture;
use invoker_core::Value;

pub use load_shed::LoadShedLayer;
pub use timeout::TimeoutLayer;
pub use self::tracing::TracingLayer;

use super::descriptor::HandlerDescriptor;
use super::InvocationError;
use crate::config::InvokerConfig;

/// Response future of every built-in handler service.
pub type HandlerFuture = BoxFuture<'static, Result<Value, InvocationError>>;

/// Whole milliseconds in `duration`, saturating at `u64::MAX`.
pub(crate) fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

pub const LOAD_SHED_PRIORITY: i32 = 300;
pub const TIMEOUT_PRIORITY: i32 = 200;
pub const TRACING_PRIORITY: i32 = 100;

/// Descriptors of the built-in handlers configured from `config`.
#[must_use]
pub fn builtin_handlers(config: &InvokerConfig) -> Vec<HandlerDescriptor> {
    vec![
        HandlerDescriptor::from_layer(
            "load-shed",
            LoadShedLayer::new(config.max_concurrent_invocations),
        )
        .with_priority(LOAD_SHED_PRIORITY),
        HandlerDescriptor::from_layer(
            "timeout",
            TimeoutLayer::new(Duration::from_millis(config.default_call_timeout_ms)),
        )
        .with_priority(TIMEOUT_PRIORITY),
        HandlerDescriptor::from_layer("tracing", TracingLayer).with_priority(TRACING_PRIORITY),
    ]
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::proxy::order_handlers;

    #[test]
    fn millis_saturates() {
        assert_eq!(millis(Duration::from_millis(1500)), 1500);
        assert_eq!(millis(Duration::MAX), u64::MAX);
    }

    #[test]
    fn builtins_order_load_shed_timeout_tracing() {
        let ordered = order_handlers(builtin_handlers(&InvokerConfig::default()));
        let names: Vec<&str> = ordered.iter().map(HandlerDescriptor::name).collect();
        assert_eq!(names, vec!["load-shed", "timeout", "tracing"]);
    }
}
