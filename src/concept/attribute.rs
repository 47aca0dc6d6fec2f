//! Attribute instances, one wrapper per value kind.
//!
//! [`TypedAttribute<V>`] gives typed access to the value; [`Attribute`] is the
//! closed union over the five kinds. Casting between kinds checks the variant
//! and fails with `InvalidConceptCasting` naming the requested kind.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use chrono::NaiveDateTime;

use crate::database::Transaction;
use crate::error::{ConceptError, DbResult};
use crate::graph::{ThingEdge, ThingIid, ThingVertex, TypeIid, Value, ValueType};

use super::thing::{Thing, ThingConcept};

mod sealed {
    pub trait Sealed {}
    impl Sealed for bool {}
    impl Sealed for i64 {}
    impl Sealed for f64 {}
    impl Sealed for String {}
    impl Sealed for chrono::NaiveDateTime {}
}

/// A Rust type that attribute values of one kind are stored as.
pub trait AttributeValue: sealed::Sealed + Clone + fmt::Debug + Send + Sync + 'static {
    const VALUE_TYPE: ValueType;

    fn wrap(attribute: TypedAttribute<Self>) -> Attribute;
    fn to_value(&self) -> Value;
}

impl AttributeValue for bool {
    const VALUE_TYPE: ValueType = ValueType::Boolean;

    fn wrap(attribute: TypedAttribute<Self>) -> Attribute {
        Attribute::Boolean(attribute)
    }

    fn to_value(&self) -> Value {
        Value::Boolean(*self)
    }
}

impl AttributeValue for i64 {
    const VALUE_TYPE: ValueType = ValueType::Long;

    fn wrap(attribute: TypedAttribute<Self>) -> Attribute {
        Attribute::Long(attribute)
    }

    fn to_value(&self) -> Value {
        Value::Long(*self)
    }
}

impl AttributeValue for f64 {
    const VALUE_TYPE: ValueType = ValueType::Double;

    fn wrap(attribute: TypedAttribute<Self>) -> Attribute {
        Attribute::Double(attribute)
    }

    fn to_value(&self) -> Value {
        Value::Double(*self)
    }
}

impl AttributeValue for String {
    const VALUE_TYPE: ValueType = ValueType::String;

    fn wrap(attribute: TypedAttribute<Self>) -> Attribute {
        Attribute::String(attribute)
    }

    fn to_value(&self) -> Value {
        Value::String(self.clone())
    }
}

impl AttributeValue for NaiveDateTime {
    const VALUE_TYPE: ValueType = ValueType::DateTime;

    fn wrap(attribute: TypedAttribute<Self>) -> Attribute {
        Attribute::DateTime(attribute)
    }

    fn to_value(&self) -> Value {
        Value::DateTime(*self)
    }
}

#[derive(Debug)]
struct AttributeData<V> {
    iid: ThingIid,
    type_iid: TypeIid,
    value: V,
}

/// An attribute whose value is statically known to be a `V`.
pub struct TypedAttribute<V> {
    data: Arc<AttributeData<V>>,
}

pub type BooleanAttribute = TypedAttribute<bool>;
pub type LongAttribute = TypedAttribute<i64>;
pub type DoubleAttribute = TypedAttribute<f64>;
pub type StringAttribute = TypedAttribute<String>;
pub type DateTimeAttribute = TypedAttribute<NaiveDateTime>;

impl<V: AttributeValue> TypedAttribute<V> {
    fn new(vertex: &ThingVertex, value: V) -> Self {
        Self {
            data: Arc::new(AttributeData {
                iid: vertex.iid,
                type_iid: vertex.type_iid,
                value,
            }),
        }
    }

    pub fn value(&self) -> &V {
        &self.data.value
    }

    pub fn value_type(&self) -> ValueType {
        V::VALUE_TYPE
    }

    /// Things that have this attribute.
    pub fn owners<'a>(&self, tx: &'a Transaction<'a>) -> DbResult<Owners<'a>> {
        Owners::of(tx, self.data.iid)
    }

    /// Whether both handles share one materialized wrapper.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }
}

impl<V: AttributeValue> ThingConcept for TypedAttribute<V> {
    fn iid(&self) -> ThingIid {
        self.data.iid
    }

    fn type_iid(&self) -> TypeIid {
        self.data.type_iid
    }

    fn to_thing(&self) -> Thing {
        Thing::Attribute(V::wrap(self.clone()))
    }
}

impl<V> Clone for TypedAttribute<V> {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
        }
    }
}

impl<V> PartialEq for TypedAttribute<V> {
    fn eq(&self, other: &Self) -> bool {
        self.data.iid == other.data.iid
    }
}

impl<V> Eq for TypedAttribute<V> {}

impl<V> Hash for TypedAttribute<V> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.data.iid.hash(state);
    }
}

impl<V: fmt::Debug> fmt::Debug for TypedAttribute<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attribute")
            .field("iid", &self.data.iid)
            .field("type", &self.data.type_iid)
            .field("value", &self.data.value)
            .finish()
    }
}

impl<V: AttributeValue> fmt::Display for TypedAttribute<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.data.iid, self.data.value.to_value())
    }
}

/// An attribute of any value kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Attribute {
    Boolean(BooleanAttribute),
    Long(LongAttribute),
    Double(DoubleAttribute),
    String(StringAttribute),
    DateTime(DateTimeAttribute),
}

impl Attribute {
    /// Wrap an attribute vertex as the variant matching its value kind.
    pub(crate) fn of(vertex: &ThingVertex, value: &Value) -> Attribute {
        match value {
            Value::Boolean(v) => Attribute::Boolean(TypedAttribute::new(vertex, *v)),
            Value::Long(v) => Attribute::Long(TypedAttribute::new(vertex, *v)),
            Value::Double(v) => Attribute::Double(TypedAttribute::new(vertex, *v)),
            Value::String(v) => Attribute::String(TypedAttribute::new(vertex, v.clone())),
            Value::DateTime(v) => Attribute::DateTime(TypedAttribute::new(vertex, *v)),
        }
    }

    pub fn value(&self) -> Value {
        match self {
            Attribute::Boolean(a) => a.value().to_value(),
            Attribute::Long(a) => a.value().to_value(),
            Attribute::Double(a) => a.value().to_value(),
            Attribute::String(a) => a.value().to_value(),
            Attribute::DateTime(a) => a.value().to_value(),
        }
    }

    pub fn value_type(&self) -> ValueType {
        match self {
            Attribute::Boolean(_) => ValueType::Boolean,
            Attribute::Long(_) => ValueType::Long,
            Attribute::Double(_) => ValueType::Double,
            Attribute::String(_) => ValueType::String,
            Attribute::DateTime(_) => ValueType::DateTime,
        }
    }

    /// Things that have this attribute.
    pub fn owners<'a>(&self, tx: &'a Transaction<'a>) -> DbResult<Owners<'a>> {
        Owners::of(tx, self.iid())
    }

    /// Whether both handles share one materialized wrapper.
    pub fn ptr_eq(&self, other: &Attribute) -> bool {
        match (self, other) {
            (Attribute::Boolean(a), Attribute::Boolean(b)) => a.ptr_eq(b),
            (Attribute::Long(a), Attribute::Long(b)) => a.ptr_eq(b),
            (Attribute::Double(a), Attribute::Double(b)) => a.ptr_eq(b),
            (Attribute::String(a), Attribute::String(b)) => a.ptr_eq(b),
            (Attribute::DateTime(a), Attribute::DateTime(b)) => a.ptr_eq(b),
            _ => false,
        }
    }

    pub fn as_boolean(&self) -> Result<&BooleanAttribute, ConceptError> {
        match self {
            Attribute::Boolean(a) => Ok(a),
            _ => Err(self.casting_error(ValueType::Boolean)),
        }
    }

    pub fn as_long(&self) -> Result<&LongAttribute, ConceptError> {
        match self {
            Attribute::Long(a) => Ok(a),
            _ => Err(self.casting_error(ValueType::Long)),
        }
    }

    pub fn as_double(&self) -> Result<&DoubleAttribute, ConceptError> {
        match self {
            Attribute::Double(a) => Ok(a),
            _ => Err(self.casting_error(ValueType::Double)),
        }
    }

    pub fn as_string(&self) -> Result<&StringAttribute, ConceptError> {
        match self {
            Attribute::String(a) => Ok(a),
            _ => Err(self.casting_error(ValueType::String)),
        }
    }

    pub fn as_date_time(&self) -> Result<&DateTimeAttribute, ConceptError> {
        match self {
            Attribute::DateTime(a) => Ok(a),
            _ => Err(self.casting_error(ValueType::DateTime)),
        }
    }

    fn casting_error(&self, to: ValueType) -> ConceptError {
        ConceptError::InvalidConceptCasting {
            from: format!("Attribute<{}>", self.value_type()),
            to: format!("Attribute<{to}>"),
        }
    }
}

impl ThingConcept for Attribute {
    fn iid(&self) -> ThingIid {
        match self {
            Attribute::Boolean(a) => a.iid(),
            Attribute::Long(a) => a.iid(),
            Attribute::Double(a) => a.iid(),
            Attribute::String(a) => a.iid(),
            Attribute::DateTime(a) => a.iid(),
        }
    }

    fn type_iid(&self) -> TypeIid {
        match self {
            Attribute::Boolean(a) => a.type_iid(),
            Attribute::Long(a) => a.type_iid(),
            Attribute::Double(a) => a.type_iid(),
            Attribute::String(a) => a.type_iid(),
            Attribute::DateTime(a) => a.type_iid(),
        }
    }

    fn to_thing(&self) -> Thing {
        Thing::Attribute(self.clone())
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Attribute::Boolean(a) => a.fmt(f),
            Attribute::Long(a) => a.fmt(f),
            Attribute::Double(a) => a.fmt(f),
            Attribute::String(a) => a.fmt(f),
            Attribute::DateTime(a) => a.fmt(f),
        }
    }
}

/// Lazy iterator over the owners of an attribute.
///
/// The owner IIDs are snapshotted when the iterator is created; each owner is
/// materialized through the transaction's concept cache as it is reached.
/// Cloning yields an independent iterator from the same position, so a fresh
/// traversal is always available from [`Attribute::owners`] or a clone taken
/// before iteration.
#[derive(Clone)]
pub struct Owners<'a> {
    tx: &'a Transaction<'a>,
    iids: Arc<[ThingIid]>,
    next: usize,
}

impl<'a> Owners<'a> {
    fn of(tx: &'a Transaction<'a>, attribute: ThingIid) -> DbResult<Self> {
        let iids = tx.graph().things().ins(attribute, ThingEdge::Has)?;
        Ok(Self {
            tx,
            iids: iids.into(),
            next: 0,
        })
    }
}

impl Iterator for Owners<'_> {
    type Item = DbResult<Thing>;

    fn next(&mut self) -> Option<Self::Item> {
        let iid = *self.iids.get(self.next)?;
        self.next += 1;
        Some(self.tx.concepts().get_thing(iid))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.iids.len() - self.next;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Owners<'_> {}

impl fmt::Debug for Owners<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Owners")
            .field("remaining", &(self.iids.len() - self.next))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::concept::TypeConcept;
    use crate::database::{Database, DatabaseConfig, TransactionType};

    #[test]
    fn typed_access_and_casting() {
        let db = Database::open(DatabaseConfig::default()).unwrap();
        let tx = db.transaction(TransactionType::Write).unwrap();
        let age = tx.concepts().put_attribute_type("age", ValueType::Long).unwrap();
        let attr = age.put(&tx, 42i64).unwrap();

        assert_eq!(*attr.as_long().unwrap().value(), 42);
        assert_eq!(attr.value(), Value::Long(42));
        assert_eq!(attr.value_type(), ValueType::Long);

        let failures = [
            ("boolean", attr.as_boolean().map(|_| ()).unwrap_err()),
            ("double", attr.as_double().map(|_| ()).unwrap_err()),
            ("string", attr.as_string().map(|_| ()).unwrap_err()),
            ("datetime", attr.as_date_time().map(|_| ()).unwrap_err()),
        ];
        for (kind, err) in failures {
            match err {
                ConceptError::InvalidConceptCasting { from, to } => {
                    assert_eq!(from, "Attribute<long>");
                    assert_eq!(to, format!("Attribute<{kind}>"));
                }
                other => panic!("expected InvalidConceptCasting, got {other:?}"),
            }
        }

        let again = age.put(&tx, 42i64).unwrap();
        assert!(again.as_long().unwrap().ptr_eq(attr.as_long().unwrap()));
        assert_eq!(attr.get_type(&tx).unwrap().label(), "age");
    }

    #[test]
    fn owners_is_lazy_and_restartable() {
        let db = Database::open(DatabaseConfig::default()).unwrap();
        let tx = db.transaction(TransactionType::Write).unwrap();
        let concepts = tx.concepts();
        let person = concepts.put_entity_type("person").unwrap();
        let name = concepts.put_attribute_type("name", ValueType::String).unwrap();
        person.set_owns(&tx, &name, false).unwrap();

        let shared = name.put(&tx, "sam").unwrap();
        let a = person.create(&tx).unwrap();
        let b = person.create(&tx).unwrap();
        a.has(&tx, &shared).unwrap();
        b.has(&tx, &shared).unwrap();

        let owners = shared.owners(&tx).unwrap();
        assert_eq!(owners.len(), 2);
        let first: Vec<Thing> = owners.clone().collect::<DbResult<_>>().unwrap();
        let second: Vec<Thing> = owners.collect::<DbResult<_>>().unwrap();
        assert_eq!(first, second);
        assert_eq!(first, vec![Thing::Entity(a), Thing::Entity(b)]);
    }

    #[test]
    fn attribute_without_owners_yields_nothing() {
        let db = Database::open(DatabaseConfig::default()).unwrap();
        let tx = db.transaction(TransactionType::Write).unwrap();
        let flag = tx.concepts().put_attribute_type("flag", ValueType::Boolean).unwrap();
        let attr = flag.put(&tx, true).unwrap();
        assert_eq!(attr.owners(&tx).unwrap().count(), 0);
        assert!(*attr.as_boolean().unwrap().value());
    }
}
