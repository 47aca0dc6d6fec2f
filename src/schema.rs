//! TOML schema definitions.
//!
//! ```toml
//! [[attribute]]
//! label = "email"
//! value_type = "string"
//!
//! [[entity]]
//! label = "person"
//! keys = ["email"]
//!
//! [[entity]]
//! label = "employee"
//! sup = "person"
//!
//! [[relation]]
//! label = "employment"
//! abstract = true
//! ```
//!
//! Types are created first, then supertypes, abstract flags and ownerships
//! are applied, so a definition may refer to a type defined later in the file.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::concept::{AttributeType, TypeConcept};
use crate::database::Transaction;
use crate::error::{DbResult, SchemaError};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchemaDefinition {
    #[serde(default, rename = "attribute")]
    pub attributes: Vec<AttributeDefinition>,
    #[serde(default, rename = "entity")]
    pub entities: Vec<TypeDefinition>,
    #[serde(default, rename = "relation")]
    pub relations: Vec<TypeDefinition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AttributeDefinition {
    pub label: String,
    /// One of `boolean`, `long`, `double`, `string`, `datetime`.
    pub value_type: String,
    #[serde(default)]
    pub sup: Option<String>,
    #[serde(default, rename = "abstract")]
    pub is_abstract: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TypeDefinition {
    pub label: String,
    #[serde(default)]
    pub sup: Option<String>,
    #[serde(default, rename = "abstract")]
    pub is_abstract: bool,
    #[serde(default)]
    pub owns: Vec<String>,
    #[serde(default)]
    pub keys: Vec<String>,
}

/// Counts of what a schema definition declared.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaSummary {
    pub attribute_types: usize,
    pub entity_types: usize,
    pub relation_types: usize,
    pub ownerships: usize,
}

impl SchemaDefinition {
    pub fn from_toml_str(content: &str) -> Result<Self, SchemaError> {
        toml::from_str(content).map_err(|e| SchemaError::Parse {
            message: e.to_string(),
        })
    }

    pub fn from_file(path: &Path) -> Result<Self, SchemaError> {
        let content = std::fs::read_to_string(path).map_err(|e| SchemaError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_toml_str(&content)
    }

    /// Create every defined type in `tx`.
    pub fn apply(&self, tx: &Transaction<'_>) -> DbResult<SchemaSummary> {
        let concepts = tx.concepts();
        for def in &self.attributes {
            concepts.put_attribute_type_named(&def.label, &def.value_type)?;
        }
        for def in &self.entities {
            concepts.put_entity_type(&def.label)?;
        }
        for def in &self.relations {
            concepts.put_relation_type(&def.label)?;
        }

        for def in &self.attributes {
            let ty = attribute_type(tx, &def.label, &def.label)?;
            if let Some(sup) = &def.sup {
                ty.set_sup(tx, &attribute_type(tx, &def.label, sup)?)?;
            }
            if def.is_abstract {
                ty.set_abstract(tx, true)?;
            }
        }
        let mut ownerships = 0;
        for def in &self.entities {
            let ty = concepts
                .get_entity_type(&def.label)?
                .ok_or_else(|| unknown(&def.label, &def.label))?;
            if let Some(sup) = &def.sup {
                let sup = concepts
                    .get_entity_type(sup)?
                    .ok_or_else(|| unknown(&def.label, sup))?;
                ty.set_sup(tx, &sup)?;
            }
            ownerships += apply_common(tx, &ty, def)?;
        }
        for def in &self.relations {
            let ty = concepts
                .get_relation_type(&def.label)?
                .ok_or_else(|| unknown(&def.label, &def.label))?;
            if let Some(sup) = &def.sup {
                let sup = concepts
                    .get_relation_type(sup)?
                    .ok_or_else(|| unknown(&def.label, sup))?;
                ty.set_sup(tx, &sup)?;
            }
            ownerships += apply_common(tx, &ty, def)?;
        }

        let summary = SchemaSummary {
            attribute_types: self.attributes.len(),
            entity_types: self.entities.len(),
            relation_types: self.relations.len(),
            ownerships,
        };
        tracing::debug!(?summary, "applied schema definition");
        Ok(summary)
    }
}

fn apply_common<T: TypeConcept>(
    tx: &Transaction<'_>,
    ty: &T,
    def: &TypeDefinition,
) -> DbResult<usize> {
    if def.is_abstract {
        ty.set_abstract(tx, true)?;
    }
    for owned in &def.owns {
        ty.set_owns(tx, &attribute_type(tx, &def.label, owned)?, false)?;
    }
    for key in &def.keys {
        ty.set_owns(tx, &attribute_type(tx, &def.label, key)?, true)?;
    }
    Ok(def.owns.len() + def.keys.len())
}

fn attribute_type(tx: &Transaction<'_>, owner: &str, label: &str) -> DbResult<AttributeType> {
    tx.concepts()
        .get_attribute_type(label)?
        .ok_or_else(|| unknown(owner, label).into())
}

fn unknown(label: &str, reference: &str) -> SchemaError {
    SchemaError::UnknownType {
        label: label.to_owned(),
        reference: reference.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{Database, DatabaseConfig, TransactionType};
    use crate::error::{ConceptError, DbError};
    use crate::graph::ValueType;

    const SCHEMA: &str = r#"
        [[attribute]]
        label = "email"
        value_type = "string"

        [[attribute]]
        label = "age"
        value_type = "long"

        [[entity]]
        label = "employee"
        sup = "person"

        [[entity]]
        label = "person"
        owns = ["age"]
        keys = ["email"]

        [[relation]]
        label = "employment"
        abstract = true
    "#;

    #[test]
    fn applies_types_hierarchy_and_ownerships() {
        let db = Database::open(DatabaseConfig::default()).unwrap();
        let tx = db.transaction(TransactionType::Write).unwrap();
        let summary = SchemaDefinition::from_toml_str(SCHEMA)
            .unwrap()
            .apply(&tx)
            .unwrap();
        assert_eq!(summary.entity_types, 2);
        assert_eq!(summary.ownerships, 2);

        let employee = tx.concepts().get_entity_type("employee").unwrap().unwrap();
        assert_eq!(employee.sup(&tx).unwrap().unwrap().label(), "person");
        let keys: Vec<_> = employee.keys(&tx).unwrap().into_iter().map(|k| k.label().to_owned()).collect();
        assert_eq!(keys, vec!["email"]);
        let age = tx.concepts().get_attribute_type("age").unwrap().unwrap();
        assert_eq!(age.value_type(), Some(ValueType::Long));
        let employment = tx.concepts().get_relation_type("employment").unwrap().unwrap();
        assert!(employment.is_abstract(&tx).unwrap());
        tx.commit().unwrap();
    }

    #[test]
    fn unknown_references_are_reported() {
        let db = Database::open(DatabaseConfig::default()).unwrap();
        let tx = db.transaction(TransactionType::Write).unwrap();
        let def = SchemaDefinition::from_toml_str(
            r#"
            [[entity]]
            label = "person"
            owns = ["name"]
            "#,
        )
        .unwrap();
        let err = def.apply(&tx).unwrap_err();
        assert!(matches!(
            err,
            DbError::Schema(SchemaError::UnknownType { ref reference, .. }) if reference == "name"
        ));
    }

    #[test]
    fn unsupported_value_types_surface_as_unsupported_operation() {
        let db = Database::open(DatabaseConfig::default()).unwrap();
        let tx = db.transaction(TransactionType::Write).unwrap();
        let def = SchemaDefinition::from_toml_str(
            r#"
            [[attribute]]
            label = "price"
            value_type = "decimal"
            "#,
        )
        .unwrap();
        assert!(matches!(
            def.apply(&tx),
            Err(DbError::Concept(ConceptError::UnsupportedOperation { .. }))
        ));
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        assert!(matches!(
            SchemaDefinition::from_toml_str("[[entity]]\nname = 3"),
            Err(SchemaError::Parse { .. })
        ));
    }
}
