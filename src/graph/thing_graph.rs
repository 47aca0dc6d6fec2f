//! Data vertices: entities, relations and attributes.

use std::sync::RwLock;

use dashmap::DashMap;
use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;

use crate::error::StoreError;

use super::iid::IidAllocator;
use super::value::ValueKey;
use super::{StoreResult, ThingEdge, ThingIid, ThingKind, ThingVertex, TypeIid, Value};

/// Thing vertices and the `has`/role-player edges between them.
///
/// Attribute vertices are unique per `(attribute type, value)`: putting the
/// same value twice returns the existing vertex.
pub struct ThingGraph {
    graph: RwLock<DiGraph<ThingVertex, ThingEdge>>,
    /// ThingIid → NodeIndex.
    iid_index: DashMap<ThingIid, NodeIndex>,
    /// (attribute type, value) → attribute vertex.
    attribute_index: DashMap<(TypeIid, ValueKey), ThingIid>,
    /// Type → direct instances, in creation order.
    instance_index: DashMap<TypeIid, Vec<ThingIid>>,
    allocator: IidAllocator,
}

impl ThingGraph {
    pub fn new() -> Self {
        Self {
            graph: RwLock::new(DiGraph::new()),
            iid_index: DashMap::new(),
            attribute_index: DashMap::new(),
            instance_index: DashMap::new(),
            allocator: IidAllocator::new(),
        }
    }

    /// Create a new entity vertex of the given type.
    pub fn create_entity(&self, type_iid: TypeIid) -> ThingVertex {
        let mut graph = self.graph.write().expect("thing graph lock poisoned");
        self.insert(&mut graph, type_iid, ThingKind::Entity)
    }

    /// Create a new relation vertex of the given type.
    pub fn create_relation(&self, type_iid: TypeIid) -> ThingVertex {
        let mut graph = self.graph.write().expect("thing graph lock poisoned");
        self.insert(&mut graph, type_iid, ThingKind::Relation)
    }

    /// Get the attribute vertex holding `value` for `type_iid`, creating it if absent.
    pub fn put_attribute(&self, type_iid: TypeIid, value: Value) -> ThingVertex {
        let key = (type_iid, value.key());
        if let Some(existing) = self.attribute(&key) {
            return existing;
        }
        let mut graph = self.graph.write().expect("thing graph lock poisoned");
        // Double-check after acquiring write lock
        if let Some(vertex) = self
            .attribute_index
            .get(&key)
            .and_then(|iid| self.iid_index.get(iid.value()).map(|r| *r.value()))
            .and_then(|idx| graph.node_weight(idx).cloned())
        {
            return vertex;
        }
        let vertex = self.insert(&mut graph, type_iid, ThingKind::Attribute(value));
        self.attribute_index.insert(key, vertex.iid);
        vertex
    }

    /// Look up the attribute vertex holding `value` for `type_iid`.
    pub fn get_attribute(&self, type_iid: TypeIid, value: &Value) -> Option<ThingVertex> {
        self.attribute(&(type_iid, value.key()))
    }

    pub fn vertex(&self, iid: ThingIid) -> StoreResult<ThingVertex> {
        let idx = self.node(iid)?;
        let graph = self.graph.read().expect("thing graph lock poisoned");
        graph
            .node_weight(idx)
            .cloned()
            .ok_or_else(|| StoreError::ThingNotFound {
                iid: iid.to_string(),
            })
    }

    /// Direct instances of a type, in creation order.
    pub fn instances(&self, type_iid: TypeIid) -> Vec<ThingIid> {
        self.instance_index
            .get(&type_iid)
            .map(|r| r.value().clone())
            .unwrap_or_default()
    }

    /// Add an edge unless an identical one already exists.
    pub fn put_edge(&self, from: ThingIid, to: ThingIid, edge: ThingEdge) -> StoreResult<()> {
        let from_idx = self.node(from)?;
        let to_idx = self.node(to)?;
        let mut graph = self.graph.write().expect("thing graph lock poisoned");
        let exists = graph
            .edges_connecting(from_idx, to_idx)
            .any(|e| *e.weight() == edge);
        if !exists {
            graph.add_edge(from_idx, to_idx, edge);
        }
        Ok(())
    }

    /// Targets of outgoing `edge`-kind edges, in insertion order.
    pub fn outs(&self, iid: ThingIid, edge: ThingEdge) -> StoreResult<Vec<ThingIid>> {
        self.neighbours(iid, edge, Direction::Outgoing)
    }

    /// Sources of incoming `edge`-kind edges, in insertion order.
    pub fn ins(&self, iid: ThingIid, edge: ThingEdge) -> StoreResult<Vec<ThingIid>> {
        self.neighbours(iid, edge, Direction::Incoming)
    }

    /// Snapshot of every thing vertex.
    pub fn vertices(&self) -> Vec<ThingVertex> {
        let graph = self.graph.read().expect("thing graph lock poisoned");
        graph.node_weights().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.iid_index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.iid_index.is_empty()
    }

    fn insert(
        &self,
        graph: &mut DiGraph<ThingVertex, ThingEdge>,
        type_iid: TypeIid,
        kind: ThingKind,
    ) -> ThingVertex {
        let vertex = ThingVertex {
            iid: self.allocator.next_thing(),
            type_iid,
            kind,
        };
        let idx = graph.add_node(vertex.clone());
        self.iid_index.insert(vertex.iid, idx);
        self.instance_index
            .entry(type_iid)
            .or_default()
            .push(vertex.iid);
        vertex
    }

    fn attribute(&self, key: &(TypeIid, ValueKey)) -> Option<ThingVertex> {
        let iid = *self.attribute_index.get(key)?.value();
        self.vertex(iid).ok()
    }

    fn node(&self, iid: ThingIid) -> StoreResult<NodeIndex> {
        self.iid_index
            .get(&iid)
            .map(|r| *r.value())
            .ok_or_else(|| StoreError::ThingNotFound {
                iid: iid.to_string(),
            })
    }

    fn neighbours(
        &self,
        iid: ThingIid,
        edge: ThingEdge,
        direction: Direction,
    ) -> StoreResult<Vec<ThingIid>> {
        let idx = self.node(iid)?;
        let graph = self.graph.read().expect("thing graph lock poisoned");
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

impl Default for ThingGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for ThingGraph {
    fn clone(&self) -> Self {
        let graph = self.graph.read().expect("thing graph lock poisoned");
        Self {
            graph: RwLock::new(graph.clone()),
            iid_index: self.iid_index.clone(),
            attribute_index: self.attribute_index.clone(),
            instance_index: self.instance_index.clone(),
            allocator: self.allocator.clone(),
        }
    }
}

impl std::fmt::Debug for ThingGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThingGraph")
            .field("things", &self.len())
            .finish()
    }
}
