//! Identities for arena-managed GPU objects.
//!
//! Two kinds of identity exist side by side:
//! - *handles* (`RenderTarget`, `Texture`, ...) name an arena slot and are
//!   stable across `resize`
//! - [`ResourceId`]s name one physical GPU allocation and change whenever the
//!   allocation is replaced; bind-group caching keys on them

use std::sync::atomic::{AtomicU32, Ordering};

use slotmap::new_key_type;

new_key_type! {
    pub(crate) struct TargetKey;
    pub(crate) struct TextureKey;
    pub(crate) struct SamplerKey;
    pub(crate) struct StorageKey;
    pub(crate) struct ProgramKey;
}

/// Identifies the context that created a handle.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ContextId(u32);

impl ContextId {
    pub(crate) fn next() -> Self {
        static NEXT: AtomicU32 = AtomicU32::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// Identity of one physical GPU allocation.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId(u64);

/// Hands out [`ResourceId`]s for one context.
#[derive(Debug, Default)]
pub(crate) struct ResourceIds {
    next: u64,
}

impl ResourceIds {
    pub fn allocate(&mut self) -> ResourceId {
        self.next += 1;
        ResourceId(self.next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_ids_are_unique() {
        assert_ne!(ContextId::next(), ContextId::next());
    }

    #[test]
    fn resource_ids_increase() {
        let mut ids = ResourceIds::default();
        let a = ids.allocate();
        let b = ids.allocate();
        assert!(b > a);
    }
}
