//! Schema concepts: the root `thing` type, entity, relation and attribute types.
//!
//! Wrappers hold an IID plus the immutable parts of the vertex (label, kind,
//! value type). Everything mutable, such as the abstract flag, supertype and
//! ownerships, is read through the transaction on every call.

use std::collections::{BTreeSet, VecDeque};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::database::Transaction;
use crate::error::{ConceptError, DbResult};
use crate::graph::{
    Graph, StoreResult, TypeEdge, TypeEncoding, TypeIid, TypeVertex, Value, ValueType,
};

use super::attribute::Attribute;
use super::thing::{Entity, Relation, Thing};

#[derive(Debug)]
struct TypeData {
    iid: TypeIid,
    label: String,
    encoding: TypeEncoding,
    value_type: Option<ValueType>,
}

impl From<&TypeVertex> for TypeData {
    fn from(vertex: &TypeVertex) -> Self {
        Self {
            iid: vertex.iid,
            label: vertex.label.clone(),
            encoding: vertex.encoding,
            value_type: vertex.value_type,
        }
    }
}

/// Operations shared by every kind of type.
pub trait TypeConcept {
    fn iid(&self) -> TypeIid;
    fn label(&self) -> &str;
    fn encoding(&self) -> TypeEncoding;
    fn to_thing_type(&self) -> ThingType;

    fn is_root(&self) -> bool {
        self.label() == self.encoding().root_label()
    }

    /// Fresh snapshot of the underlying vertex.
    fn vertex(&self, tx: &Transaction<'_>) -> DbResult<TypeVertex> {
        Ok(tx.graph().types().vertex(self.iid())?)
    }

    fn is_abstract(&self, tx: &Transaction<'_>) -> DbResult<bool> {
        Ok(self.vertex(tx)?.is_abstract)
    }

    fn set_abstract(&self, tx: &Transaction<'_>, is_abstract: bool) -> DbResult<()> {
        let graph = tx.write_graph("set_abstract")?;
        if self.is_root() {
            return Err(ConceptError::RootModification {
                label: self.label().to_owned(),
                operation: "set_abstract".into(),
            }
            .into());
        }
        graph.types().set_abstract(self.iid(), is_abstract)?;
        Ok(())
    }

    /// The direct supertype, `None` only for the root `thing` type.
    fn sup(&self, tx: &Transaction<'_>) -> DbResult<Option<ThingType>> {
        let sups = tx.graph().types().outs(self.iid(), TypeEdge::Sub)?;
        sups.first()
            .map(|iid| tx.concepts().type_by_iid(*iid))
            .transpose()
    }

    /// Every supertype, nearest first.
    fn sups(&self, tx: &Transaction<'_>) -> DbResult<Vec<ThingType>> {
        ancestors(tx.graph(), self.iid())?
            .into_iter()
            .map(|iid| tx.concepts().type_by_iid(iid))
            .collect()
    }

    /// Every transitive subtype, breadth first.
    fn subs(&self, tx: &Transaction<'_>) -> DbResult<Vec<ThingType>> {
        descendants(tx.graph(), self.iid())?
            .into_iter()
            .map(|iid| tx.concepts().type_by_iid(iid))
            .collect()
    }

    /// Attribute types owned by this type or any supertype, keys included.
    fn owns(&self, tx: &Transaction<'_>) -> DbResult<Vec<AttributeType>> {
        owned_iids(tx.graph(), self.iid(), false)?
            .into_iter()
            .map(|iid| tx.concepts().type_by_iid(iid)?.into_attribute_type())
            .collect()
    }

    /// Attribute types owned as keys by this type or any supertype.
    fn keys(&self, tx: &Transaction<'_>) -> DbResult<Vec<AttributeType>> {
        owned_iids(tx.graph(), self.iid(), true)?
            .into_iter()
            .map(|iid| tx.concepts().type_by_iid(iid)?.into_attribute_type())
            .collect()
    }

    /// Declare that instances of this type may have `attribute`, optionally as a key.
    fn set_owns(
        &self,
        tx: &Transaction<'_>,
        attribute: &AttributeType,
        is_key: bool,
    ) -> DbResult<()> {
        let graph = tx.write_graph("set_owns")?;
        if self.is_root() {
            return Err(ConceptError::RootModification {
                label: self.label().to_owned(),
                operation: "set_owns".into(),
            }
            .into());
        }
        let value_type = attribute
            .value_type()
            .ok_or_else(|| ConceptError::NoValueType {
                label: attribute.label().to_owned(),
            })?;
        if is_key && !value_type.is_keyable() {
            return Err(ConceptError::InvalidKeyValueType {
                attribute: attribute.label().to_owned(),
                value_type: value_type.to_string(),
            }
            .into());
        }
        let (put, drop) = if is_key {
            (TypeEdge::OwnsKey, TypeEdge::Owns)
        } else {
            (TypeEdge::Owns, TypeEdge::OwnsKey)
        };
        graph.types().delete_edge(self.iid(), attribute.iid(), drop)?;
        graph.types().put_edge(self.iid(), attribute.iid(), put)?;
        tracing::debug!(owner = self.label(), attribute = attribute.label(), is_key, "set owns");
        Ok(())
    }

    /// Instances of this type and of every subtype.
    fn instances(&self, tx: &Transaction<'_>) -> DbResult<Vec<Thing>> {
        let mut types = vec![self.iid()];
        types.extend(descendants(tx.graph(), self.iid())?);
        types
            .into_iter()
            .flat_map(|iid| tx.graph().things().instances(iid))
            .map(|iid| tx.concepts().get_thing(iid))
            .collect()
    }
}

macro_rules! type_wrapper {
    ($(#[$meta:meta])* $name:ident, $variant:ident) => {
        $(#[$meta])*
        #[derive(Clone)]
        pub struct $name {
            data: Arc<TypeData>,
        }

        impl $name {
            fn from_vertex(vertex: &TypeVertex) -> Self {
                Self {
                    data: Arc::new(TypeData::from(vertex)),
                }
            }

            /// Whether both handles share one materialized wrapper.
            pub fn ptr_eq(&self, other: &Self) -> bool {
                Arc::ptr_eq(&self.data, &other.data)
            }
        }

        impl TypeConcept for $name {
            fn iid(&self) -> TypeIid {
                self.data.iid
            }

            fn label(&self) -> &str {
                &self.data.label
            }

            fn encoding(&self) -> TypeEncoding {
                self.data.encoding
            }

            fn to_thing_type(&self) -> ThingType {
                ThingType::$variant(self.clone())
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
                    .field("label", &self.data.label)
                    .finish()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.data.label)
            }
        }
    };
}

type_wrapper!(
    /// The root `thing` type, supertype of every other root.
    RootType,
    Root
);
type_wrapper!(EntityType, Entity);
type_wrapper!(RelationType, Relation);
type_wrapper!(
    /// An attribute type. Every attribute type except the root `attribute`
    /// has a fixed value type.
    AttributeType,
    Attribute
);

impl EntityType {
    /// Create a new entity of this type.
    pub fn create(&self, tx: &Transaction<'_>) -> DbResult<Entity> {
        let graph = tx.write_graph("create")?;
        ensure_concrete(tx, self)?;
        let vertex = graph.things().create_entity(self.iid());
        tx.concepts().thing_of(&vertex).into_entity()
    }

    pub fn set_sup(&self, tx: &Transaction<'_>, sup: &EntityType) -> DbResult<()> {
        set_sup_checked(tx, self, sup)
    }
}

impl RelationType {
    /// Create a new relation of this type. It needs at least one role player
    /// before commit.
    pub fn create(&self, tx: &Transaction<'_>) -> DbResult<Relation> {
        let graph = tx.write_graph("create")?;
        ensure_concrete(tx, self)?;
        let vertex = graph.things().create_relation(self.iid());
        tx.concepts().thing_of(&vertex).into_relation()
    }

    pub fn set_sup(&self, tx: &Transaction<'_>, sup: &RelationType) -> DbResult<()> {
        set_sup_checked(tx, self, sup)
    }
}

impl AttributeType {
    pub fn value_type(&self) -> Option<ValueType> {
        self.data.value_type
    }

    /// Get or create the attribute of this type holding `value`.
    pub fn put(&self, tx: &Transaction<'_>, value: impl Into<Value>) -> DbResult<Attribute> {
        let value = value.into();
        let graph = tx.write_graph("put")?;
        self.check_value(&value)?;
        ensure_concrete(tx, self)?;
        let vertex = graph.things().put_attribute(self.iid(), value);
        tx.concepts().thing_of(&vertex).into_attribute()
    }

    /// Look up the attribute of this type holding `value`.
    pub fn get(&self, tx: &Transaction<'_>, value: &Value) -> DbResult<Option<Attribute>> {
        self.check_value(value)?;
        tx.graph()
            .things()
            .get_attribute(self.iid(), value)
            .map(|vertex| tx.concepts().thing_of(&vertex).into_attribute())
            .transpose()
    }

    /// Change the supertype. A non-root supertype must share this type's value type.
    pub fn set_sup(&self, tx: &Transaction<'_>, sup: &AttributeType) -> DbResult<()> {
        if let Some(sup_value_type) = sup.value_type() {
            if Some(sup_value_type) != self.value_type() {
                return Err(ConceptError::InvalidSupertype {
                    label: self.label().to_owned(),
                    sup: sup.label().to_owned(),
                    reason: format!(
                        "value type {} differs from {}",
                        sup_value_type,
                        display_value_type(self.value_type())
                    ),
                }
                .into());
            }
        }
        set_sup_checked(tx, self, sup)
    }

    fn check_value(&self, value: &Value) -> DbResult<()> {
        let expected = self.value_type().ok_or_else(|| ConceptError::NoValueType {
            label: self.label().to_owned(),
        })?;
        if value.value_type() != expected {
            return Err(ConceptError::ValueTypeMismatch {
                label: self.label().to_owned(),
                expected: expected.to_string(),
                found: value.value_type().to_string(),
            }
            .into());
        }
        Ok(())
    }
}

/// Any type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ThingType {
    Root(RootType),
    Entity(EntityType),
    Relation(RelationType),
    Attribute(AttributeType),
}

impl ThingType {
    /// Wrap a type vertex as the variant matching its encoding.
    pub(crate) fn of(vertex: &TypeVertex) -> ThingType {
        match vertex.encoding {
            TypeEncoding::Thing => ThingType::Root(RootType::from_vertex(vertex)),
            TypeEncoding::Entity => ThingType::Entity(EntityType::from_vertex(vertex)),
            TypeEncoding::Relation => ThingType::Relation(RelationType::from_vertex(vertex)),
            TypeEncoding::Attribute => ThingType::Attribute(AttributeType::from_vertex(vertex)),
        }
    }

    /// Whether both handles share one materialized wrapper.
    pub fn ptr_eq(&self, other: &ThingType) -> bool {
        match (self, other) {
            (ThingType::Root(a), ThingType::Root(b)) => a.ptr_eq(b),
            (ThingType::Entity(a), ThingType::Entity(b)) => a.ptr_eq(b),
            (ThingType::Relation(a), ThingType::Relation(b)) => a.ptr_eq(b),
            (ThingType::Attribute(a), ThingType::Attribute(b)) => a.ptr_eq(b),
            _ => false,
        }
    }

    pub fn is_entity_type(&self) -> bool {
        matches!(self, ThingType::Entity(_))
    }

    pub fn is_relation_type(&self) -> bool {
        matches!(self, ThingType::Relation(_))
    }

    pub fn is_attribute_type(&self) -> bool {
        matches!(self, ThingType::Attribute(_))
    }

    pub fn as_root_type(&self) -> Result<&RootType, ConceptError> {
        match self {
            ThingType::Root(t) => Ok(t),
            _ => Err(self.casting_error(TypeEncoding::Thing)),
        }
    }

    pub fn as_entity_type(&self) -> Result<&EntityType, ConceptError> {
        match self {
            ThingType::Entity(t) => Ok(t),
            _ => Err(self.casting_error(TypeEncoding::Entity)),
        }
    }

    pub fn as_relation_type(&self) -> Result<&RelationType, ConceptError> {
        match self {
            ThingType::Relation(t) => Ok(t),
            _ => Err(self.casting_error(TypeEncoding::Relation)),
        }
    }

    pub fn as_attribute_type(&self) -> Result<&AttributeType, ConceptError> {
        match self {
            ThingType::Attribute(t) => Ok(t),
            _ => Err(self.casting_error(TypeEncoding::Attribute)),
        }
    }

    pub fn into_entity_type(self) -> DbResult<EntityType> {
        match self {
            ThingType::Entity(t) => Ok(t),
            other => Err(other.casting_error(TypeEncoding::Entity).into()),
        }
    }

    pub fn into_relation_type(self) -> DbResult<RelationType> {
        match self {
            ThingType::Relation(t) => Ok(t),
            other => Err(other.casting_error(TypeEncoding::Relation).into()),
        }
    }

    pub fn into_attribute_type(self) -> DbResult<AttributeType> {
        match self {
            ThingType::Attribute(t) => Ok(t),
            other => Err(other.casting_error(TypeEncoding::Attribute).into()),
        }
    }

    fn casting_error(&self, to: TypeEncoding) -> ConceptError {
        ConceptError::InvalidConceptCasting {
            from: format!("{} '{}'", self.encoding(), self.label()),
            to: to.to_string(),
        }
    }
}

impl TypeConcept for ThingType {
    fn iid(&self) -> TypeIid {
        match self {
            ThingType::Root(t) => t.iid(),
            ThingType::Entity(t) => t.iid(),
            ThingType::Relation(t) => t.iid(),
            ThingType::Attribute(t) => t.iid(),
        }
    }

    fn label(&self) -> &str {
        match self {
            ThingType::Root(t) => t.label(),
            ThingType::Entity(t) => t.label(),
            ThingType::Relation(t) => t.label(),
            ThingType::Attribute(t) => t.label(),
        }
    }

    fn encoding(&self) -> TypeEncoding {
        match self {
            ThingType::Root(t) => t.encoding(),
            ThingType::Entity(t) => t.encoding(),
            ThingType::Relation(t) => t.encoding(),
            ThingType::Attribute(t) => t.encoding(),
        }
    }

    fn to_thing_type(&self) -> ThingType {
        self.clone()
    }
}

impl fmt::Display for ThingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

fn ensure_concrete<T: TypeConcept>(tx: &Transaction<'_>, ty: &T) -> DbResult<()> {
    if ty.is_abstract(tx)? {
        return Err(ConceptError::AbstractInstantiation {
            label: ty.label().to_owned(),
        }
        .into());
    }
    Ok(())
}

fn set_sup_checked<T: TypeConcept>(tx: &Transaction<'_>, ty: &T, sup: &T) -> DbResult<()> {
    let graph = tx.write_graph("set_sup")?;
    if ty.is_root() {
        return Err(ConceptError::RootModification {
            label: ty.label().to_owned(),
            operation: "set_sup".into(),
        }
        .into());
    }
    if sup.iid() == ty.iid() || descendants(graph, ty.iid())?.contains(&sup.iid()) {
        return Err(ConceptError::InvalidSupertype {
            label: ty.label().to_owned(),
            sup: sup.label().to_owned(),
            reason: "the hierarchy would contain a cycle".into(),
        }
        .into());
    }
    graph.types().set_sup(ty.iid(), sup.iid())?;
    tracing::debug!(label = ty.label(), sup = sup.label(), "set supertype");
    Ok(())
}

fn display_value_type(value_type: Option<ValueType>) -> String {
    value_type.map_or_else(|| "none".to_owned(), |vt| vt.to_string())
}

/// Supertypes of `iid`, nearest first. Stops at the first repeated vertex so
/// a corrupt cyclic hierarchy still terminates.
pub(crate) fn ancestors(graph: &Graph, iid: TypeIid) -> StoreResult<Vec<TypeIid>> {
    let mut seen = BTreeSet::from([iid]);
    let mut chain = Vec::new();
    let mut current = iid;
    while let Some(sup) = graph.types().outs(current, TypeEdge::Sub)?.first().copied() {
        if !seen.insert(sup) {
            break;
        }
        chain.push(sup);
        current = sup;
    }
    Ok(chain)
}

/// Transitive subtypes of `iid`, breadth first.
pub(crate) fn descendants(graph: &Graph, iid: TypeIid) -> StoreResult<Vec<TypeIid>> {
    let mut seen = BTreeSet::from([iid]);
    let mut order = Vec::new();
    let mut queue = VecDeque::from([iid]);
    while let Some(current) = queue.pop_front() {
        for sub in graph.types().ins(current, TypeEdge::Sub)? {
            if seen.insert(sub) {
                order.push(sub);
                queue.push_back(sub);
            }
        }
    }
    Ok(order)
}

/// Attribute types owned by `iid` or its supertypes, without duplicates.
pub(crate) fn owned_iids(graph: &Graph, iid: TypeIid, keys_only: bool) -> StoreResult<Vec<TypeIid>> {
    let mut lineage = vec![iid];
    lineage.extend(ancestors(graph, iid)?);
    let mut seen = BTreeSet::new();
    let mut owned = Vec::new();
    for owner in lineage {
        let mut direct = graph.types().outs(owner, TypeEdge::OwnsKey)?;
        if !keys_only {
            direct.extend(graph.types().outs(owner, TypeEdge::Owns)?);
        }
        for attribute in direct {
            if seen.insert(attribute) {
                owned.push(attribute);
            }
        }
    }
    Ok(owned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{Database, DatabaseConfig, TransactionType};

    fn db() -> Database {
        Database::open(DatabaseConfig::default()).unwrap()
    }

    #[test]
    fn new_types_sub_their_root() {
        let db = db();
        let tx = db.transaction(TransactionType::Write).unwrap();
        let person = tx.concepts().put_entity_type("person").unwrap();
        let sup = person.sup(&tx).unwrap().unwrap();
        assert_eq!(sup.label(), "entity");
        let labels: Vec<_> = person
            .sups(&tx)
            .unwrap()
            .iter()
            .map(|t| t.label().to_owned())
            .collect();
        assert_eq!(labels, vec!["entity", "thing"]);
    }

    #[test]
    fn set_sup_rejects_cycles() {
        let db = db();
        let tx = db.transaction(TransactionType::Write).unwrap();
        let animal = tx.concepts().put_entity_type("animal").unwrap();
        let dog = tx.concepts().put_entity_type("dog").unwrap();
        dog.set_sup(&tx, &animal).unwrap();

        let err = animal.set_sup(&tx, &dog).unwrap_err();
        assert!(err.to_string().contains("cycle"));
        assert!(animal.set_sup(&tx, &animal).is_err());

        let subs = animal.subs(&tx).unwrap();
        assert_eq!(subs.len(), 1);
        assert_eq!(subs[0].label(), "dog");
    }

    #[test]
    fn attribute_subtypes_share_value_type() {
        let db = db();
        let tx = db.transaction(TransactionType::Write).unwrap();
        let concepts = tx.concepts();
        let name = concepts.put_attribute_type("name", ValueType::String).unwrap();
        let nickname = concepts.put_attribute_type("nickname", ValueType::String).unwrap();
        let age = concepts.put_attribute_type("age", ValueType::Long).unwrap();

        nickname.set_sup(&tx, &name).unwrap();
        let err = age.set_sup(&tx, &name).unwrap_err();
        assert!(err.to_string().contains("value type"));
    }

    #[test]
    fn owns_is_inherited_and_keys_are_restricted() {
        let db = db();
        let tx = db.transaction(TransactionType::Write).unwrap();
        let concepts = tx.concepts();
        let animal = concepts.put_entity_type("animal").unwrap();
        let dog = concepts.put_entity_type("dog").unwrap();
        dog.set_sup(&tx, &animal).unwrap();
        let name = concepts.put_attribute_type("name", ValueType::String).unwrap();
        let weight = concepts.put_attribute_type("weight", ValueType::Double).unwrap();

        animal.set_owns(&tx, &name, true).unwrap();
        dog.set_owns(&tx, &weight, false).unwrap();
        assert!(matches!(
            dog.set_owns(&tx, &weight, true),
            Err(crate::error::DbError::Concept(
                ConceptError::InvalidKeyValueType { .. }
            ))
        ));

        let owned: Vec<_> = dog.owns(&tx).unwrap().into_iter().map(|a| a.label().to_owned()).collect();
        assert_eq!(owned, vec!["weight", "name"]);
        let keys: Vec<_> = dog.keys(&tx).unwrap().into_iter().map(|a| a.label().to_owned()).collect();
        assert_eq!(keys, vec!["name"]);
    }

    #[test]
    fn abstract_types_cannot_be_instantiated() {
        let db = db();
        let tx = db.transaction(TransactionType::Write).unwrap();
        let shape = tx.concepts().put_entity_type("shape").unwrap();
        shape.set_abstract(&tx, true).unwrap();
        assert!(matches!(
            shape.create(&tx),
            Err(crate::error::DbError::Concept(
                ConceptError::AbstractInstantiation { .. }
            ))
        ));

        let root = tx.concepts().root_entity_type().unwrap().unwrap();
        assert!(root.create(&tx).is_err());
        assert!(root.set_abstract(&tx, false).is_err());
    }

    #[test]
    fn attribute_put_checks_value_kind() {
        let db = db();
        let tx = db.transaction(TransactionType::Write).unwrap();
        let age = tx
            .concepts()
            .put_attribute_type("age", ValueType::Long)
            .unwrap();
        let a = age.put(&tx, 30i64).unwrap();
        let b = age.put(&tx, 30i64).unwrap();
        assert_eq!(a, b);
        assert!(matches!(
            age.put(&tx, "thirty"),
            Err(crate::error::DbError::Concept(
                ConceptError::ValueTypeMismatch { .. }
            ))
        ));
        assert_eq!(age.get(&tx, &Value::Long(30)).unwrap(), Some(a));
        assert_eq!(age.get(&tx, &Value::Long(31)).unwrap(), None);
    }

    #[test]
    fn instances_include_subtypes() {
        let db = db();
        let tx = db.transaction(TransactionType::Write).unwrap();
        let animal = tx.concepts().put_entity_type("animal").unwrap();
        let dog = tx.concepts().put_entity_type("dog").unwrap();
        dog.set_sup(&tx, &animal).unwrap();
        animal.create(&tx).unwrap();
        dog.create(&tx).unwrap();

        assert_eq!(animal.instances(&tx).unwrap().len(), 2);
        assert_eq!(dog.instances(&tx).unwrap().len(), 1);
    }
}
