//! Data concepts: entities, relations, and the [`Thing`] union over them and attributes.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::database::Transaction;
use crate::error::{ConceptError, DbResult};
use crate::graph::{ThingEdge, ThingIid, ThingKind, ThingVertex, TypeIid};

use super::attribute::Attribute;
use super::types::{ThingType, TypeConcept, ancestors, owned_iids};

/// Operations shared by entities, relations and attributes.
pub trait ThingConcept {
    fn iid(&self) -> ThingIid;
    fn type_iid(&self) -> TypeIid;
    fn to_thing(&self) -> Thing;

    fn get_type(&self, tx: &Transaction<'_>) -> DbResult<ThingType> {
        tx.concepts().type_by_iid(self.type_iid())
    }

    /// Attach `attribute` to this thing. The thing's type, or one of its
    /// supertypes, must own the attribute's type or one of its supertypes.
    fn has(&self, tx: &Transaction<'_>, attribute: &Attribute) -> DbResult<&Self>
    where
        Self: Sized,
    {
        let graph = tx.write_graph("has")?;
        let owned = owned_iids(graph, self.type_iid(), false)?;
        let attribute_type = attribute.type_iid();
        let mut lineage = vec![attribute_type];
        lineage.extend(ancestors(graph, attribute_type)?);
        if !lineage.iter().any(|iid| owned.contains(iid)) {
            let owner = self.get_type(tx)?;
            let attribute = attribute.get_type(tx)?;
            return Err(ConceptError::CannotOwn {
                owner: owner.label().to_owned(),
                attribute: attribute.label().to_owned(),
            }
            .into());
        }
        graph
            .things()
            .put_edge(self.iid(), attribute.iid(), ThingEdge::Has)?;
        Ok(self)
    }

    /// Every attribute this thing has, in edge order.
    fn attributes(&self, tx: &Transaction<'_>) -> DbResult<Vec<Attribute>> {
        tx.graph()
            .things()
            .outs(self.iid(), ThingEdge::Has)?
            .into_iter()
            .map(|iid| tx.concepts().get_thing(iid)?.into_attribute())
            .collect()
    }

    /// Relations in which this thing is a role player.
    fn relations(&self, tx: &Transaction<'_>) -> DbResult<Vec<Relation>> {
        tx.graph()
            .things()
            .ins(self.iid(), ThingEdge::RolePlayer)?
            .into_iter()
            .map(|iid| tx.concepts().get_thing(iid)?.into_relation())
            .collect()
    }
}

#[derive(Debug)]
struct ThingData {
    iid: ThingIid,
    type_iid: TypeIid,
}

macro_rules! thing_wrapper {
    ($name:ident, $variant:ident) => {
        #[derive(Clone)]
        pub struct $name {
            data: Arc<ThingData>,
        }

        impl $name {
            fn from_vertex(vertex: &ThingVertex) -> Self {
                Self {
                    data: Arc::new(ThingData {
                        iid: vertex.iid,
                        type_iid: vertex.type_iid,
                    }),
                }
            }

            /// Whether both handles share one materialized wrapper.
            pub fn ptr_eq(&self, other: &Self) -> bool {
                Arc::ptr_eq(&self.data, &other.data)
            }
        }

        impl ThingConcept for $name {
            fn iid(&self) -> ThingIid {
                self.data.iid
            }

            fn type_iid(&self) -> TypeIid {
                self.data.type_iid
            }

            fn to_thing(&self) -> Thing {
                Thing::$variant(self.clone())
            }
        }

        impl PartialEq for $name {
            fn eq(&self, other: &Self) -> bool {
                self.data.iid == other.data.iid
            }
        }

        impl Eq for $name {}

        impl Hash for $name {
            fn hash<H: Hasher>(&self, state: &mut H) {
                self.data.iid.hash(state);
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_struct(stringify!($name))
                    .field("iid", &self.data.iid)
                    .field("type", &self.data.type_iid)
                    .finish()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.data.iid)
            }
        }
    };
}

thing_wrapper!(Entity, Entity);
thing_wrapper!(Relation, Relation);

impl Relation {
    /// Add `player` as a role player of this relation.
    pub fn add_player<T: ThingConcept>(&self, tx: &Transaction<'_>, player: &T) -> DbResult<&Self> {
        let graph = tx.write_graph("add_player")?;
        graph
            .things()
            .put_edge(self.iid(), player.iid(), ThingEdge::RolePlayer)?;
        Ok(self)
    }

    pub fn players(&self, tx: &Transaction<'_>) -> DbResult<Vec<Thing>> {
        tx.graph()
            .things()
            .outs(self.iid(), ThingEdge::RolePlayer)?
            .into_iter()
            .map(|iid| tx.concepts().get_thing(iid))
            .collect()
    }
}

/// Any data instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Thing {
    Entity(Entity),
    Relation(Relation),
    Attribute(Attribute),
}

impl Thing {
    /// Wrap a thing vertex as the variant matching its kind.
    pub(crate) fn of(vertex: &ThingVertex) -> Thing {
        match &vertex.kind {
            ThingKind::Entity => Thing::Entity(Entity::from_vertex(vertex)),
            ThingKind::Relation => Thing::Relation(Relation::from_vertex(vertex)),
            ThingKind::Attribute(value) => Thing::Attribute(Attribute::of(vertex, value)),
        }
    }

    /// Whether both handles share one materialized wrapper.
    pub fn ptr_eq(&self, other: &Thing) -> bool {
        match (self, other) {
            (Thing::Entity(a), Thing::Entity(b)) => a.ptr_eq(b),
            (Thing::Relation(a), Thing::Relation(b)) => a.ptr_eq(b),
            (Thing::Attribute(a), Thing::Attribute(b)) => a.ptr_eq(b),
            _ => false,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Thing::Entity(_) => "Entity",
            Thing::Relation(_) => "Relation",
            Thing::Attribute(_) => "Attribute",
        }
    }

    pub fn is_entity(&self) -> bool {
        matches!(self, Thing::Entity(_))
    }

    pub fn is_relation(&self) -> bool {
        matches!(self, Thing::Relation(_))
    }

    pub fn is_attribute(&self) -> bool {
        matches!(self, Thing::Attribute(_))
    }

    pub fn as_entity(&self) -> Result<&Entity, ConceptError> {
        match self {
            Thing::Entity(e) => Ok(e),
            _ => Err(self.casting_error("Entity")),
        }
    }

    pub fn as_relation(&self) -> Result<&Relation, ConceptError> {
        match self {
            Thing::Relation(r) => Ok(r),
            _ => Err(self.casting_error("Relation")),
        }
    }

    pub fn as_attribute(&self) -> Result<&Attribute, ConceptError> {
        match self {
            Thing::Attribute(a) => Ok(a),
            _ => Err(self.casting_error("Attribute")),
        }
    }

    pub fn into_entity(self) -> DbResult<Entity> {
        match self {
            Thing::Entity(e) => Ok(e),
            other => Err(other.casting_error("Entity").into()),
        }
    }

    pub fn into_relation(self) -> DbResult<Relation> {
        match self {
            Thing::Relation(r) => Ok(r),
            other => Err(other.casting_error("Relation").into()),
        }
    }

    pub fn into_attribute(self) -> DbResult<Attribute> {
        match self {
            Thing::Attribute(a) => Ok(a),
            other => Err(other.casting_error("Attribute").into()),
        }
    }

    fn casting_error(&self, to: &str) -> ConceptError {
        ConceptError::InvalidConceptCasting {
            from: format!("{} {}", self.kind_name(), self.iid()),
            to: to.to_owned(),
        }
    }
}

impl ThingConcept for Thing {
    fn iid(&self) -> ThingIid {
        match self {
            Thing::Entity(e) => e.iid(),
            Thing::Relation(r) => r.iid(),
            Thing::Attribute(a) => a.iid(),
        }
    }

    fn type_iid(&self) -> TypeIid {
        match self {
            Thing::Entity(e) => e.type_iid(),
            Thing::Relation(r) => r.type_iid(),
            Thing::Attribute(a) => a.type_iid(),
        }
    }

    fn to_thing(&self) -> Thing {
        self.clone()
    }
}

impl fmt::Display for Thing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Thing::Entity(e) => e.fmt(f),
            Thing::Relation(r) => r.fmt(f),
            Thing::Attribute(a) => a.fmt(f),
        }
    }
}

impl From<Entity> for Thing {
    fn from(entity: Entity) -> Self {
        Thing::Entity(entity)
    }
}

impl From<Relation> for Thing {
    fn from(relation: Relation) -> Self {
        Thing::Relation(relation)
    }
}

impl From<Attribute> for Thing {
    fn from(attribute: Attribute) -> Self {
        Thing::Attribute(attribute)
    }
}
