//! Vertex identifiers.
//!
//! Every vertex in the graph is addressed by a niche-optimized IID. Type and
//! thing vertices live in separate ID spaces, so the two kinds are distinct
//! types and [`VertexIid`] unifies them where either may appear.

use std::num::NonZeroU64;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Identifier of a type vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(transparent)]
pub struct TypeIid(NonZeroU64);

/// Identifier of a thing vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(transparent)]
pub struct ThingIid(NonZeroU64);

impl TypeIid {
    /// Returns `None` if `raw` is zero.
    pub fn new(raw: u64) -> Option<Self> {
        NonZeroU64::new(raw).map(TypeIid)
    }

    pub fn get(self) -> u64 {
        self.0.get()
    }
}

impl ThingIid {
    /// Returns `None` if `raw` is zero.
    pub fn new(raw: u64) -> Option<Self> {
        NonZeroU64::new(raw).map(ThingIid)
    }

    pub fn get(self) -> u64 {
        self.0.get()
    }
}

impl std::fmt::Display for TypeIid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "type:{}", self.0)
    }
}

impl std::fmt::Display for ThingIid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "thing:{}", self.0)
    }
}

/// Either kind of vertex identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum VertexIid {
    Type(TypeIid),
    Thing(ThingIid),
}

impl From<TypeIid> for VertexIid {
    fn from(iid: TypeIid) -> Self {
        VertexIid::Type(iid)
    }
}

impl From<ThingIid> for VertexIid {
    fn from(iid: ThingIid) -> Self {
        VertexIid::Thing(iid)
    }
}

impl std::fmt::Display for VertexIid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VertexIid::Type(iid) => iid.fmt(f),
            VertexIid::Thing(iid) => iid.fmt(f),
        }
    }
}

/// Thread-safe IID allocator.
///
/// Produces monotonically increasing raw IDs starting from 1. Cloning a graph
/// clones the allocator at its current position so the copy keeps allocating
/// fresh IDs.
#[derive(Debug)]
pub(crate) struct IidAllocator {
    next: AtomicU64,
}

impl IidAllocator {
    pub(crate) fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    pub(crate) fn next_raw(&self) -> NonZeroU64 {
        let raw = self.next.fetch_add(1, Ordering::Relaxed);
        // Starts at 1 and would need 2^64 allocations to wrap.
        NonZeroU64::new(raw).unwrap_or(NonZeroU64::MIN)
    }

    pub(crate) fn next_type(&self) -> TypeIid {
        TypeIid(self.next_raw())
    }

    pub(crate) fn next_thing(&self) -> ThingIid {
        ThingIid(self.next_raw())
    }
}

impl Clone for IidAllocator {
    fn clone(&self) -> Self {
        Self {
            next: AtomicU64::new(self.next.load(Ordering::Relaxed)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iid_niche_optimization() {
        assert_eq!(
            std::mem::size_of::<Option<TypeIid>>(),
            std::mem::size_of::<TypeIid>()
        );
        assert_eq!(
            std::mem::size_of::<Option<ThingIid>>(),
            std::mem::size_of::<ThingIid>()
        );
    }

    #[test]
    fn zero_is_not_an_iid() {
        assert!(TypeIid::new(0).is_none());
        assert_eq!(ThingIid::new(7).unwrap().get(), 7);
    }

    #[test]
    fn allocator_is_sequential_and_clone_continues() {
        let alloc = IidAllocator::new();
        assert_eq!(alloc.next_type().get(), 1);
        assert_eq!(alloc.next_thing().get(), 2);

        let copy = alloc.clone();
        assert_eq!(copy.next_type().get(), 3);
        assert_eq!(alloc.next_type().get(), 3);
    }

    #[test]
    fn display_names_the_kind() {
        assert_eq!(TypeIid::new(4).unwrap().to_string(), "type:4");
        assert_eq!(
            VertexIid::from(ThingIid::new(9).unwrap()).to_string(),
            "thing:9"
        );
    }
}
