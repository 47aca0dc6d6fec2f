//! The concept layer: typed schema and data wrappers over graph vertices.
//!
//! A concept is either a type ([`ThingType`]) or a data instance ([`Thing`]).
//! Wrappers are materialized lazily through the transaction's
//! [`ConceptCache`] and carry only an IID plus immutable vertex metadata, so
//! they are cheap to clone and compare. All reads and writes of mutable state
//! take the transaction explicitly.
//!
//! ```text
//! Concept
//! ├── Type(ThingType)   Root | Entity | Relation | Attribute
//! └── Thing(Thing)      Entity | Relation | Attribute(Boolean | Long | Double | String | DateTime)
//! ```

pub mod attribute;
pub mod cache;
pub mod registry;
pub mod thing;
pub mod types;
pub mod validate;

use std::fmt;

use crate::error::ConceptError;
use crate::graph::VertexIid;

pub use attribute::{
    Attribute, AttributeValue, BooleanAttribute, DateTimeAttribute, DoubleAttribute,
    LongAttribute, Owners, StringAttribute, TypedAttribute,
};
pub use cache::ConceptCache;
pub use registry::Concepts;
pub use thing::{Entity, Relation, Thing, ThingConcept};
pub use types::{AttributeType, EntityType, RelationType, RootType, ThingType, TypeConcept};
pub use validate::{Violation, ViolationKind};

/// Anything a query variable can be bound to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Concept {
    Type(ThingType),
    Thing(Thing),
}

impl Concept {
    pub fn iid(&self) -> VertexIid {
        match self {
            Concept::Type(t) => t.iid().into(),
            Concept::Thing(t) => t.iid().into(),
        }
    }

    pub fn is_type(&self) -> bool {
        matches!(self, Concept::Type(_))
    }

    pub fn is_thing(&self) -> bool {
        matches!(self, Concept::Thing(_))
    }

    pub fn as_type(&self) -> Result<&ThingType, ConceptError> {
        match self {
            Concept::Type(t) => Ok(t),
            Concept::Thing(t) => Err(ConceptError::InvalidConceptCasting {
                from: t.kind_name().into(),
                to: "ThingType".into(),
            }),
        }
    }

    pub fn as_thing(&self) -> Result<&Thing, ConceptError> {
        match self {
            Concept::Thing(t) => Ok(t),
            Concept::Type(t) => Err(ConceptError::InvalidConceptCasting {
                from: t.encoding().to_string(),
                to: "Thing".into(),
            }),
        }
    }
}

impl fmt::Display for Concept {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Concept::Type(t) => write!(f, "type {t}"),
            Concept::Thing(t) => t.fmt(f),
        }
    }
}

impl From<ThingType> for Concept {
    fn from(t: ThingType) -> Self {
        Concept::Type(t)
    }
}

impl From<Thing> for Concept {
    fn from(t: Thing) -> Self {
        Concept::Thing(t)
    }
}

impl From<Entity> for Concept {
    fn from(e: Entity) -> Self {
        Concept::Thing(Thing::Entity(e))
    }
}

impl From<Relation> for Concept {
    fn from(r: Relation) -> Self {
        Concept::Thing(Thing::Relation(r))
    }
}

impl From<Attribute> for Concept {
    fn from(a: Attribute) -> Self {
        Concept::Thing(Thing::Attribute(a))
    }
}

impl From<EntityType> for Concept {
    fn from(t: EntityType) -> Self {
        Concept::Type(ThingType::Entity(t))
    }
}

impl From<RelationType> for Concept {
    fn from(t: RelationType) -> Self {
        Concept::Type(ThingType::Relation(t))
    }
}

impl From<AttributeType> for Concept {
    fn from(t: AttributeType) -> Self {
        Concept::Type(ThingType::Attribute(t))
    }
}
