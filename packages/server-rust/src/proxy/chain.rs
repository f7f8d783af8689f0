//! Handler chain assembly.
//!
//! A chain is built once per proxy: the terminal (default) handler first, then
//! each discovered handler wrapped around the previous result, lowest priority
//! first. The highest-priority handler therefore ends up outermost and sees
//! every call first. Each handler owns the next one and decides on its own
//! whether to forward, short-circuit or transform.

use std::sync::Arc;

use invoker_core::RequestContext;
use tracing::debug;

use super::descriptor::HandlerDescriptor;
use super::invocation::BoxHandler;
use crate::traits::DefaultHandlerFactory;

/// Failures while assembling a chain. Any of them aborts proxy creation.
#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    #[error("handler discovery failed: {0}")]
    Discovery(#[source] anyhow::Error),
    #[error("cannot construct default handler for `{contract}`: {source}")]
    DefaultHandler {
        contract: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("cannot construct handler `{handler}`: {source}")]
    HandlerConstruction {
        handler: String,
        #[source]
        source: anyhow::Error,
    },
}

/// Builds the composed handler for one proxy.
///
/// `ordered` must already be in execution order (outermost first), as produced
/// by [`order_handlers`](super::catalog::order_handlers).
///
/// # Errors
///
/// Returns the first construction failure. Handlers built before the failure
/// are dropped; nothing is returned that could be bound to a proxy.
pub fn build_chain(
    ordered: &[HandlerDescriptor],
    default_handlers: &dyn DefaultHandlerFactory,
    context: &Arc<RequestContext>,
) -> Result<BoxHandler, ChainError> {
    let terminal = default_handlers
        .create(Arc::clone(context))
        .map_err(|source| ChainError::DefaultHandler {
            contract: context.contract.clone(),
            source,
        })?;

    let chain = ordered
        .iter()
        .rev()
        .try_fold(terminal, |next, descriptor| descriptor.construct(next))?;

    debug!(
        contract = %context.contract,
        handlers = ordered.len(),
        "handler chain assembled"
    );
    Ok(chain)
}
