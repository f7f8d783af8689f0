//! Exposure of locally hosted services.
//!
//! [`LocalServices`] holds the instances this process hosts. The
//! [`ServiceHandleRegistry`] turns them into [`ServiceHandle`]s, one per
//! distinct instance per query, accumulated across discovery passes and
//! stamped with the origin address the node advertises.

pub mod handle;
pub mod index;
pub mod local;
pub mod origin;

pub use handle::ServiceHandle;
pub use index::{RegistryError, ServiceHandleRegistry};
pub use local::{Exported, LocalServices};
pub use origin::SharedOrigin;
