//! Per-transaction memo of materialized concept wrappers.

use dashmap::DashMap;

use crate::graph::{ThingIid, ThingVertex, TypeIid, TypeVertex};

use super::thing::Thing;
use super::types::ThingType;

/// IID → wrapper, one wrapper per IID for the life of a transaction.
///
/// Insertion is a single atomic compute-if-absent per IID: concurrent callers
/// materializing the same vertex all receive the instance of whichever call
/// won. Wrapper construction is pure, so a losing computation is simply
/// never run.
#[derive(Debug, Default)]
pub struct ConceptCache {
    types: DashMap<TypeIid, ThingType>,
    things: DashMap<ThingIid, Thing>,
}

impl ConceptCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_type(&self, iid: TypeIid) -> Option<ThingType> {
        self.types.get(&iid).map(|r| r.value().clone())
    }

    pub fn get_thing(&self, iid: ThingIid) -> Option<Thing> {
        self.things.get(&iid).map(|r| r.value().clone())
    }

    /// The cached wrapper for `vertex`, materializing it on first access.
    pub fn type_or_insert(&self, vertex: &TypeVertex) -> ThingType {
        self.types
            .entry(vertex.iid)
            .or_insert_with(|| ThingType::of(vertex))
            .value()
            .clone()
    }

    /// The cached wrapper for `vertex`, materializing it on first access.
    pub fn thing_or_insert(&self, vertex: &ThingVertex) -> Thing {
        self.things
            .entry(vertex.iid)
            .or_insert_with(|| Thing::of(vertex))
            .value()
            .clone()
    }

    pub fn type_count(&self) -> usize {
        self.types.len()
    }

    pub fn thing_count(&self) -> usize {
        self.things.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{ThingKind, TypeEncoding, Value};
    use std::sync::Arc;

    fn type_vertex(raw: u64, label: &str) -> TypeVertex {
        TypeVertex {
            iid: TypeIid::new(raw).unwrap(),
            label: label.to_owned(),
            encoding: TypeEncoding::Entity,
            value_type: None,
            is_abstract: false,
        }
    }

    #[test]
    fn repeated_access_returns_the_same_wrapper() {
        let cache = ConceptCache::new();
        let vertex = type_vertex(7, "person");
        let a = cache.type_or_insert(&vertex);
        let b = cache.type_or_insert(&vertex);
        assert!(a.ptr_eq(&b));
        assert_eq!(cache.type_count(), 1);
        assert!(cache.get_type(vertex.iid).unwrap().ptr_eq(&a));
    }

    #[test]
    fn racing_materializations_share_one_instance() {
        let cache = Arc::new(ConceptCache::new());
        let vertex = ThingVertex {
            iid: ThingIid::new(3).unwrap(),
            type_iid: TypeIid::new(1).unwrap(),
            kind: ThingKind::Attribute(Value::from("x")),
        };
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let vertex = vertex.clone();
                std::thread::spawn(move || cache.thing_or_insert(&vertex))
            })
            .collect();
        let things: Vec<Thing> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(things.iter().all(|t| t.ptr_eq(&things[0])));
        assert_eq!(cache.thing_count(), 1);
    }
}
