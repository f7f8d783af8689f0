//! Origin address that can be published after the listener is bound.

use arc_swap::ArcSwap;

use crate::traits::OriginAddress;

/// Origin address shared between the network module and the registry.
///
/// Starts with a configured value and is replaced once the real bound
/// address is known. Reads are lock-free.
#[derive(Debug)]
pub struct SharedOrigin {
    current: ArcSwap<String>,
}

impl SharedOrigin {
    #[must_use]
    pub fn new(initial: impl Into<String>) -> Self {
        Self {
            current: ArcSwap::from_pointee(initial.into()),
        }
    }

    /// Replaces the advertised address. Handles created earlier keep the
    /// address they were stamped with.
    pub fn set(&self, address: impl Into<String>) {
        self.current.store(std::sync::Arc::new(address.into()));
    }
}

impl OriginAddress for SharedOrigin {
    fn origin(&self) -> String {
        self.current.load().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_replaces_origin() {
        let origin = SharedOrigin::new("0.0.0.0:0");
        assert_eq!(origin.origin(), "0.0.0.0:0");
        origin.set("10.0.0.5:41234");
        assert_eq!(origin.origin(), "10.0.0.5:41234");
    }
}
