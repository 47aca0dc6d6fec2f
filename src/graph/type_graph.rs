//! Schema vertices: one vertex per type, addressed by label or IID.

use std::sync::RwLock;

use dashmap::DashMap;
use petgraph::Direction;
use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;

use crate::error::StoreError;

use super::iid::IidAllocator;
use super::{StoreResult, TypeEdge, TypeEncoding, TypeIid, TypeVertex, ValueType};

/// Type vertices and the `sub`/`owns` edges between them.
///
/// Labels are globally unique. Creation is double-checked under the write
/// lock so concurrent callers asking for the same label always end up with
/// the same vertex.
pub struct TypeGraph {
    graph: RwLock<DiGraph<TypeVertex, TypeEdge>>,
    /// TypeIid → NodeIndex.
    iid_index: DashMap<TypeIid, NodeIndex>,
    /// Label → TypeIid.
    label_index: DashMap<String, TypeIid>,
    allocator: IidAllocator,
}

impl TypeGraph {
    pub fn new() -> Self {
        Self {
            graph: RwLock::new(DiGraph::new()),
            iid_index: DashMap::new(),
            label_index: DashMap::new(),
            allocator: IidAllocator::new(),
        }
    }

    /// Look up a type vertex by label.
    pub fn get(&self, label: &str) -> Option<TypeVertex> {
        let iid = *self.label_index.get(label)?.value();
        self.vertex(iid).ok()
    }

    /// Look up a type vertex by IID.
    pub fn vertex(&self, iid: TypeIid) -> StoreResult<TypeVertex> {
        let idx = self.node(iid)?;
        let graph = self.graph.read().expect("type graph lock poisoned");
        graph
            .node_weight(idx)
            .cloned()
            .ok_or_else(|| StoreError::TypeNotFound {
                iid: iid.to_string(),
            })
    }

    /// Get the vertex labelled `label`, creating it if absent.
    ///
    /// Returns the vertex and whether it was created by this call. When the
    /// label already exists the stored vertex is returned untouched, whatever
    /// `encoding` and `value_type` were requested.
    pub fn get_or_create(
        &self,
        label: &str,
        encoding: TypeEncoding,
        value_type: Option<ValueType>,
        sup: Option<TypeIid>,
    ) -> (TypeVertex, bool) {
        if let Some(existing) = self.get(label) {
            return (existing, false);
        }
        let mut graph = self.graph.write().expect("type graph lock poisoned");
        // Double-check after acquiring write lock
        if let Some(iid) = self.label_index.get(label).map(|r| *r.value()) {
            if let Some(vertex) = self
                .iid_index
                .get(&iid)
                .and_then(|idx| graph.node_weight(*idx.value()).cloned())
            {
                return (vertex, false);
            }
        }

        let vertex = TypeVertex {
            iid: self.allocator.next_type(),
            label: label.to_owned(),
            encoding,
            value_type,
            is_abstract: false,
        };
        let idx = graph.add_node(vertex.clone());
        if let Some(sup_idx) = sup.and_then(|s| self.iid_index.get(&s).map(|r| *r.value())) {
            graph.add_edge(idx, sup_idx, TypeEdge::Sub);
        }
        self.iid_index.insert(vertex.iid, idx);
        self.label_index.insert(vertex.label.clone(), vertex.iid);
        tracing::debug!(label, iid = %vertex.iid, encoding = %encoding, "created type vertex");
        (vertex, true)
    }

    pub fn set_abstract(&self, iid: TypeIid, is_abstract: bool) -> StoreResult<()> {
        let idx = self.node(iid)?;
        let mut graph = self.graph.write().expect("type graph lock poisoned");
        if let Some(vertex) = graph.node_weight_mut(idx) {
            vertex.is_abstract = is_abstract;
        }
        Ok(())
    }

    /// Replace the supertype of `iid`.
    pub fn set_sup(&self, iid: TypeIid, sup: TypeIid) -> StoreResult<()> {
        let idx = self.node(iid)?;
        let sup_idx = self.node(sup)?;
        let mut graph = self.graph.write().expect("type graph lock poisoned");
        let doomed: Vec<_> = graph
            .edges_directed(idx, Direction::Outgoing)
            .filter(|e| *e.weight() == TypeEdge::Sub)
            .map(|e| e.id())
            .collect();
        remove_edges(&mut graph, doomed);
        graph.add_edge(idx, sup_idx, TypeEdge::Sub);
        Ok(())
    }

    /// Add an edge unless an identical one already exists.
    pub fn put_edge(&self, from: TypeIid, to: TypeIid, edge: TypeEdge) -> StoreResult<()> {
        let from_idx = self.node(from)?;
        let to_idx = self.node(to)?;
        let mut graph = self.graph.write().expect("type graph lock poisoned");
        let exists = graph
            .edges_connecting(from_idx, to_idx)
            .any(|e| *e.weight() == edge);
        if !exists {
            graph.add_edge(from_idx, to_idx, edge);
        }
        Ok(())
    }

    /// Remove every `edge`-kind edge from `from` to `to`.
    pub fn delete_edge(&self, from: TypeIid, to: TypeIid, edge: TypeEdge) -> StoreResult<()> {
        let from_idx = self.node(from)?;
        let to_idx = self.node(to)?;
        let mut graph = self.graph.write().expect("type graph lock poisoned");
        let doomed: Vec<_> = graph
            .edges_connecting(from_idx, to_idx)
            .filter(|e| *e.weight() == edge)
            .map(|e| e.id())
            .collect();
        remove_edges(&mut graph, doomed);
        Ok(())
    }

    /// Targets of outgoing `edge`-kind edges, in storage edge order.
    pub fn outs(&self, iid: TypeIid, edge: TypeEdge) -> StoreResult<Vec<TypeIid>> {
        self.neighbours(iid, edge, Direction::Outgoing)
    }

    /// Sources of incoming `edge`-kind edges, in storage edge order.
    pub fn ins(&self, iid: TypeIid, edge: TypeEdge) -> StoreResult<Vec<TypeIid>> {
        self.neighbours(iid, edge, Direction::Incoming)
    }

    /// Snapshot of every type vertex.
    pub fn vertices(&self) -> Vec<TypeVertex> {
        let graph = self.graph.read().expect("type graph lock poisoned");
        graph.node_weights().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.iid_index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.iid_index.is_empty()
    }

    fn node(&self, iid: TypeIid) -> StoreResult<NodeIndex> {
        self.iid_index
            .get(&iid)
            .map(|r| *r.value())
            .ok_or_else(|| StoreError::TypeNotFound {
                iid: iid.to_string(),
            })
    }

    fn neighbours(
        &self,
        iid: TypeIid,
        edge: TypeEdge,
        direction: Direction,
    ) -> StoreResult<Vec<TypeIid>> {
        let idx = self.node(iid)?;
        let graph = self.graph.read().expect("type graph lock poisoned");
        // petgraph walks a node's edge list newest first.
        let mut edges: Vec<_> = graph
            .edges_directed(idx, direction)
            .filter(|e| *e.weight() == edge)
            .map(|e| {
                let other = match direction {
                    Direction::Outgoing => e.target(),
                    Direction::Incoming => e.source(),
                };
                (e.id(), other)
            })
            .collect();
        edges.sort_by_key(|(id, _)| *id);
        Ok(edges
            .into_iter()
            .filter_map(|(_, other)| graph.node_weight(other).map(|v| v.iid))
            .collect())
    }
}

/// Remove edges highest index first: `remove_edge` moves the last edge into
/// the freed slot, which would invalidate any higher index still pending.
fn remove_edges(graph: &mut DiGraph<TypeVertex, TypeEdge>, mut doomed: Vec<EdgeIndex>) {
    doomed.sort_unstable_by(|a, b| b.cmp(a));
    for id in doomed {
        graph.remove_edge(id);
    }
}

impl Default for TypeGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for TypeGraph {
    fn clone(&self) -> Self {
        let graph = self.graph.read().expect("type graph lock poisoned");
        Self {
            graph: RwLock::new(graph.clone()),
            iid_index: self.iid_index.clone(),
            label_index: self.label_index.clone(),
            allocator: self.allocator.clone(),
        }
    }
}

impl std::fmt::Debug for TypeGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeGraph")
            .field("types", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn get_or_create_is_idempotent_per_label() {
        let types = TypeGraph::new();
        let (a, created_a) = types.get_or_create("person", TypeEncoding::Entity, None, None);
        let (b, created_b) = types.get_or_create("person", TypeEncoding::Relation, None, None);
        assert!(created_a);
        assert!(!created_b);
        assert_eq!(a.iid, b.iid);
        assert_eq!(b.encoding, TypeEncoding::Entity);
        assert_eq!(types.len(), 1);
    }

    #[test]
    fn concurrent_creation_yields_one_vertex() {
        let types = Arc::new(TypeGraph::new());
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let types = Arc::clone(&types);
                std::thread::spawn(move || {
                    types
                        .get_or_create("company", TypeEncoding::Entity, None, None)
                        .0
                        .iid
                })
            })
            .collect();
        let iids: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(iids.iter().all(|iid| *iid == iids[0]));
        assert_eq!(types.len(), 1);
    }

    #[test]
    fn set_sup_replaces_previous_edge() {
        let types = TypeGraph::new();
        let (root, _) = types.get_or_create("entity", TypeEncoding::Entity, None, None);
        let (animal, _) =
            types.get_or_create("animal", TypeEncoding::Entity, None, Some(root.iid));
        let (dog, _) = types.get_or_create("dog", TypeEncoding::Entity, None, Some(root.iid));

        types.set_sup(dog.iid, animal.iid).unwrap();
        assert_eq!(types.outs(dog.iid, TypeEdge::Sub).unwrap(), vec![animal.iid]);
        assert_eq!(types.ins(animal.iid, TypeEdge::Sub).unwrap(), vec![dog.iid]);
    }

    #[test]
    fn put_edge_is_idempotent_and_delete_removes() {
        let types = TypeGraph::new();
        let (person, _) = types.get_or_create("person", TypeEncoding::Entity, None, None);
        let (name, _) = types.get_or_create(
            "name",
            TypeEncoding::Attribute,
            Some(ValueType::String),
            None,
        );
        types.put_edge(person.iid, name.iid, TypeEdge::Owns).unwrap();
        types.put_edge(person.iid, name.iid, TypeEdge::Owns).unwrap();
        assert_eq!(types.outs(person.iid, TypeEdge::Owns).unwrap().len(), 1);

        types.delete_edge(person.iid, name.iid, TypeEdge::Owns).unwrap();
        assert!(types.outs(person.iid, TypeEdge::Owns).unwrap().is_empty());
    }

    #[test]
    fn unknown_iid_is_not_found() {
        let types = TypeGraph::new();
        let missing = TypeIid::new(99).unwrap();
        assert!(matches!(
            types.vertex(missing),
            Err(StoreError::TypeNotFound { .. })
        ));
    }
}
