//! In-memory vertex-encoded graph store.
//!
//! The concept layer never holds vertices; it addresses them by IID and reads
//! them through this module. The graph is split into three structures:
//!
//! - [`TypeGraph`]: schema vertices (types) and their `sub`/`owns` edges
//! - [`ThingGraph`]: data vertices (entities, relations, attributes) and their
//!   `has`/role-player edges
//! - [`RuleStructure`]: rules, stored with the schema
//!
//! Each structure is a `petgraph` graph behind a `RwLock` with `DashMap`
//! secondary indexes, so reads run concurrently and structural writes are
//! serialized. [`Graph`] is `Clone`: a write transaction works on a private
//! copy that replaces the committed graph only after validation.

pub mod iid;
pub mod rule_structure;
pub mod thing_graph;
pub mod type_graph;
pub mod value;

use serde::{Deserialize, Serialize};

use crate::error::StoreError;

pub use iid::{ThingIid, TypeIid, VertexIid};
pub use rule_structure::{RuleStructure, RuleVertex};
pub use thing_graph::ThingGraph;
pub use type_graph::TypeGraph;
pub use value::{Value, ValueType};

/// Result type for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// The kind of a type vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeEncoding {
    /// Only the root `thing` type carries this encoding.
    Thing,
    Entity,
    Relation,
    Attribute,
}

impl TypeEncoding {
    /// The well-known label of the root type of this kind.
    pub fn root_label(self) -> &'static str {
        match self {
            TypeEncoding::Thing => "thing",
            TypeEncoding::Entity => "entity",
            TypeEncoding::Relation => "relation",
            TypeEncoding::Attribute => "attribute",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            TypeEncoding::Thing => "ThingType",
            TypeEncoding::Entity => "EntityType",
            TypeEncoding::Relation => "RelationType",
            TypeEncoding::Attribute => "AttributeType",
        }
    }
}

impl std::fmt::Display for TypeEncoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Edges between type vertices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeEdge {
    /// Subtype → supertype.
    Sub,
    /// Owner type → attribute type.
    Owns,
    /// Owner type → attribute type, owned as a key.
    OwnsKey,
}

/// A snapshot of a type vertex.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeVertex {
    pub iid: TypeIid,
    pub label: String,
    pub encoding: TypeEncoding,
    /// Set for every attribute type except the root `attribute` type.
    pub value_type: Option<ValueType>,
    pub is_abstract: bool,
}

impl TypeVertex {
    pub fn is_root(&self) -> bool {
        self.label == self.encoding.root_label()
    }
}

/// The kind of a thing vertex. Attribute vertices carry their value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ThingKind {
    Entity,
    Relation,
    Attribute(Value),
}

impl ThingKind {
    pub fn name(&self) -> &'static str {
        match self {
            ThingKind::Entity => "Entity",
            ThingKind::Relation => "Relation",
            ThingKind::Attribute(_) => "Attribute",
        }
    }
}

/// Edges between thing vertices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ThingEdge {
    /// Owner → attribute.
    Has,
    /// Relation → player.
    RolePlayer,
}

/// A snapshot of a thing vertex.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThingVertex {
    pub iid: ThingIid,
    pub type_iid: TypeIid,
    pub kind: ThingKind,
}

/// The complete graph of one database snapshot.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    types: TypeGraph,
    things: ThingGraph,
    rules: RuleStructure,
}

impl Graph {
    /// Create an empty, unbootstrapped graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the four abstract root types if they are missing.
    ///
    /// Returns `true` if anything was created.
    pub fn bootstrap(&self) -> bool {
        let (thing, created) =
            self.types
                .get_or_create(TypeEncoding::Thing.root_label(), TypeEncoding::Thing, None, None);
        let mut any = created;
        for encoding in [
            TypeEncoding::Entity,
            TypeEncoding::Relation,
            TypeEncoding::Attribute,
        ] {
            let (_, created) =
                self.types
                    .get_or_create(encoding.root_label(), encoding, None, Some(thing.iid));
            any |= created;
        }
        if any {
            for vertex in self.types.vertices() {
                if vertex.is_root() {
                    // Root vertices were all fetched from this graph.
                    let _ = self.types.set_abstract(vertex.iid, true);
                }
            }
        }
        any
    }

    pub fn types(&self) -> &TypeGraph {
        &self.types
    }

    pub fn things(&self) -> &ThingGraph {
        &self.things
    }

    pub fn rules(&self) -> &RuleStructure {
        &self.rules
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bootstrap_creates_abstract_roots_once() {
        let graph = Graph::new();
        assert!(graph.bootstrap());
        assert!(!graph.bootstrap());

        let entity = graph.types().get("entity").unwrap();
        assert!(entity.is_root());
        assert!(entity.is_abstract);
        assert_eq!(entity.encoding, TypeEncoding::Entity);

        let thing = graph.types().get("thing").unwrap();
        let sups = graph.types().outs(entity.iid, TypeEdge::Sub).unwrap();
        assert_eq!(sups, vec![thing.iid]);
        assert!(graph.types().outs(thing.iid, TypeEdge::Sub).unwrap().is_empty());
    }

    #[test]
    fn clone_is_independent() {
        let graph = Graph::new();
        graph.bootstrap();
        let copy = graph.clone();
        let root = copy.types().get("entity").unwrap();
        copy.types()
            .get_or_create("person", TypeEncoding::Entity, None, Some(root.iid));

        assert!(copy.types().get("person").is_some());
        assert!(graph.types().get("person").is_none());
    }
}
