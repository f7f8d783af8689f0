//! Invoker core: service queries, handle records, request contexts and the
//! invocation value model shared by proxies, handlers and the HTTP surface.

pub mod codec;
pub mod context;
pub mod handle;
pub mod invocation;
pub mod query;

pub use codec::{CodecError, Encoding};
pub use context::RequestContext;
pub use handle::{HandleId, HandleRecord};
pub use invocation::{Invocation, MethodSignature, Value};
pub use query::{QueryError, ServiceQuery};
