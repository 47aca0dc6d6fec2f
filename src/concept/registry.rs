//! Type registry: label-keyed get/put of types and IID-keyed materialization.

use crate::database::Transaction;
use crate::error::{ConceptError, DbResult};
use crate::graph::{ThingIid, ThingKind, ThingVertex, TypeEncoding, TypeIid, TypeVertex, ValueType};

use super::thing::Thing;
use super::types::{AttributeType, EntityType, RelationType, RootType, ThingType};
use super::validate::{Violation, fan_out};

/// Entry point to the concepts of one transaction.
///
/// Every wrapper handed out goes through the transaction's
/// [`ConceptCache`](super::ConceptCache), so asking twice for the same vertex
/// yields the same instance.
#[derive(Clone, Copy)]
pub struct Concepts<'a> {
    tx: &'a Transaction<'a>,
}

impl<'a> Concepts<'a> {
    pub(crate) fn new(tx: &'a Transaction<'a>) -> Self {
        Self { tx }
    }

    pub fn root_type(&self) -> DbResult<Option<RootType>> {
        self.get_type(TypeEncoding::Thing.root_label())
            .map(|t| t.as_root_type().cloned().map_err(Into::into))
            .transpose()
    }

    pub fn root_entity_type(&self) -> DbResult<Option<EntityType>> {
        self.get_entity_type(TypeEncoding::Entity.root_label())
    }

    pub fn root_relation_type(&self) -> DbResult<Option<RelationType>> {
        self.get_relation_type(TypeEncoding::Relation.root_label())
    }

    pub fn root_attribute_type(&self) -> DbResult<Option<AttributeType>> {
        self.get_attribute_type(TypeEncoding::Attribute.root_label())
    }

    /// Get or create the entity type `label`.
    pub fn put_entity_type(&self, label: &str) -> DbResult<EntityType> {
        self.put_type(label, TypeEncoding::Entity, None)?
            .into_entity_type()
    }

    /// Get or create the relation type `label`.
    pub fn put_relation_type(&self, label: &str) -> DbResult<RelationType> {
        self.put_type(label, TypeEncoding::Relation, None)?
            .into_relation_type()
    }

    /// Get or create the attribute type `label`.
    ///
    /// If the label already names an attribute type it is returned with its
    /// stored value type, whatever `value_type` was requested.
    pub fn put_attribute_type(&self, label: &str, value_type: ValueType) -> DbResult<AttributeType> {
        self.put_type(label, TypeEncoding::Attribute, Some(value_type))?
            .into_attribute_type()
    }

    /// [`put_attribute_type`](Self::put_attribute_type) with the value type given by name.
    pub fn put_attribute_type_named(&self, label: &str, kind: &str) -> DbResult<AttributeType> {
        let value_type =
            ValueType::from_name(kind).ok_or_else(|| ConceptError::UnsupportedOperation {
                operation: "put_attribute_type".into(),
                kind: kind.to_owned(),
            })?;
        self.put_attribute_type(label, value_type)
    }

    /// The type labelled `label`, of any kind.
    pub fn get_type(&self, label: &str) -> Option<ThingType> {
        self.tx
            .graph()
            .types()
            .get(label)
            .map(|vertex| self.type_of(&vertex))
    }

    pub fn get_entity_type(&self, label: &str) -> DbResult<Option<EntityType>> {
        self.get_type(label)
            .map(ThingType::into_entity_type)
            .transpose()
    }

    pub fn get_relation_type(&self, label: &str) -> DbResult<Option<RelationType>> {
        self.get_type(label)
            .map(ThingType::into_relation_type)
            .transpose()
    }

    pub fn get_attribute_type(&self, label: &str) -> DbResult<Option<AttributeType>> {
        self.get_type(label)
            .map(ThingType::into_attribute_type)
            .transpose()
    }

    pub fn type_by_iid(&self, iid: TypeIid) -> DbResult<ThingType> {
        if let Some(cached) = self.tx.cache().get_type(iid) {
            return Ok(cached);
        }
        let vertex = self.tx.graph().types().vertex(iid)?;
        Ok(self.type_of(&vertex))
    }

    pub fn get_thing(&self, iid: ThingIid) -> DbResult<Thing> {
        if let Some(cached) = self.tx.cache().get_thing(iid) {
            return Ok(cached);
        }
        let vertex = self.tx.graph().things().vertex(iid)?;
        Ok(self.thing_of(&vertex))
    }

    /// Check every type in the transaction's graph.
    pub fn validate_types(&self) -> DbResult<Vec<Violation>> {
        let tx = self.tx;
        let vertices = tx.graph().types().vertices();
        let count = vertices.len();
        let violations = fan_out(tx, vertices, |vertex| {
            tx.concepts().type_of(vertex).validate(tx)
        })?;
        tracing::debug!(types = count, violations = violations.len(), "validated types");
        Ok(violations)
    }

    /// Check every thing in the transaction's graph.
    pub fn validate_things(&self) -> DbResult<Vec<Violation>> {
        let tx = self.tx;
        let vertices = tx.graph().things().vertices();
        let count = vertices.len();
        let violations = fan_out(tx, vertices, |vertex| {
            tx.concepts().thing_of(vertex).validate(tx)
        })?;
        tracing::debug!(things = count, violations = violations.len(), "validated things");
        Ok(violations)
    }

    pub(crate) fn type_of(&self, vertex: &TypeVertex) -> ThingType {
        self.tx.cache().type_or_insert(vertex)
    }

    pub(crate) fn thing_of(&self, vertex: &ThingVertex) -> Thing {
        if let ThingKind::Attribute(value) = &vertex.kind {
            debug_assert!(
                self.tx
                    .graph()
                    .types()
                    .vertex(vertex.type_iid)
                    .map_or(true, |ty| ty.value_type == Some(value.value_type())),
                "attribute {} holds a {} value its type does not declare",
                vertex.iid,
                value.value_type()
            );
        }
        self.tx.cache().thing_or_insert(vertex)
    }

    fn put_type(
        &self,
        label: &str,
        encoding: TypeEncoding,
        value_type: Option<ValueType>,
    ) -> DbResult<ThingType> {
        if label.is_empty() || label.chars().any(char::is_whitespace) {
            return Err(ConceptError::InvalidLabel {
                label: label.to_owned(),
            }
            .into());
        }
        let graph = self.tx.write_graph("put_type")?;
        let sup = graph.types().get(encoding.root_label()).map(|root| root.iid);
        let (vertex, _) = graph.types().get_or_create(label, encoding, value_type, sup);
        Ok(self.type_of(&vertex))
    }
}

impl std::fmt::Debug for Concepts<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Concepts").finish_non_exhaustive()
    }
}
