//! Handler-chain proxies.
//!
//! Creating a proxy runs through:
//!
//! 1. **Discovery** (`catalog`): handler descriptors from a `HandlerSource`,
//!    resolved once and ordered by priority
//! 2. **Chain assembly** (`chain`): descriptors folded around the default
//!    handler, highest priority outermost
//! 3. **Binding** (`factory`): the composed handler bound to the contract's
//!    generated proxy (`contract`)
//!
//! Every call on the proxy then becomes an `Invocation` travelling down the
//! chain to the default handler (`default_handler`), which dispatches it to a
//! local service instance.

pub mod catalog;
pub mod chain;
pub mod contract;
pub mod default_handler;
pub mod descriptor;
pub mod factory;
pub mod handlers;
pub mod invocation;

pub use catalog::{order_handlers, HandlerCatalog, StaticHandlerSource, METHOD_HANDLER_CONTRACT};
pub use chain::{build_chain, ChainError};
pub use default_handler::{DefaultMethodHandler, LocalDefaultHandlerFactory};
pub use handlers::builtin_handlers;
pub use descriptor::{HandlerDescriptor, HandlerFactory, DEFAULT_PRIORITY};
pub use factory::{
    ContractDescriptor, ContractKind, MicroserviceProxyFactory, ProxyBinding, ProxyError,
    ProxyFactory, ServiceContract,
};
pub use invocation::{decode_value, encode_value, take_argument, BoxHandler, InvocationError};
