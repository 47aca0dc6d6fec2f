//! Commit-time consistency checks.
//!
//! Every type, thing and rule in the transaction's graph is checked by its
//! own `validate()`. Types and things fan out on the database's validation
//! pool, one task per vertex; each vertex is materialized through the
//! concept cache so concurrent checks share a single wrapper per IID.

use std::collections::BTreeSet;
use std::fmt;

use rayon::prelude::*;
use thiserror::Error;

use crate::database::Transaction;
use crate::error::DbResult;
use crate::graph::{
    Graph, RuleVertex, ThingEdge, TypeEdge, TypeEncoding, TypeIid, VertexIid,
};

use super::thing::{Thing, ThingConcept};
use super::types::{ThingType, TypeConcept, descendants, owned_iids};

/// A single consistency problem found during validation.
#[derive(Debug, Clone, PartialEq)]
pub struct Violation {
    /// `None` for rules, which are addressed by label.
    pub iid: Option<VertexIid>,
    pub label: String,
    pub kind: ViolationKind,
}

impl Violation {
    fn new(iid: impl Into<VertexIid>, label: &str, kind: ViolationKind) -> Self {
        Self {
            iid: Some(iid.into()),
            label: label.to_owned(),
            kind,
        }
    }

    fn rule(label: &str, kind: ViolationKind) -> Self {
        Self {
            iid: None,
            label: label.to_owned(),
            kind,
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.iid {
            Some(iid) => write!(f, "{} ({iid}): {}", self.label, self.kind),
            None => write!(f, "rule '{}': {}", self.label, self.kind),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ViolationKind {
    #[error("type has no supertype")]
    MissingSupertype,

    #[error("supertype chain contains a cycle")]
    CyclicHierarchy,

    #[error("supertype '{sup}' is a {sup_kind}, expected a {expected}")]
    SupertypeKindMismatch {
        sup: String,
        sup_kind: String,
        expected: String,
    },

    #[error("value type {found} differs from supertype '{sup}' value type {expected}")]
    SupertypeValueTypeMismatch {
        sup: String,
        expected: String,
        found: String,
    },

    #[error("key attribute type '{attribute}' has value type {value_type}, which cannot be a key")]
    InvalidKeyValueType { attribute: String, value_type: String },

    #[error("concrete type owns abstract attribute type '{attribute}'")]
    OwnsAbstractAttribute { attribute: String },

    #[error("instance of abstract type")]
    AbstractInstance,

    #[error("missing key '{attribute}'")]
    MissingKey { attribute: String },

    #[error("has {count} values for key '{attribute}'")]
    MultipleKeys { attribute: String, count: usize },

    #[error("relation has no role players")]
    NoRolePlayers,

    #[error("value kind {found} does not match declared value type {expected}")]
    ValueTypeMismatch { expected: String, found: String },

    #[error("`when` is empty")]
    EmptyWhen,

    #[error("`then` is empty")]
    EmptyThen,

    #[error("{variable} in `then` is not bound by `when`")]
    UnboundThenVariable { variable: String },

    #[error("unknown type label '{label}'")]
    UnknownTypeLabel { label: String },
}

impl ThingType {
    /// Check this type's hierarchy position and ownerships.
    pub fn validate(&self, tx: &Transaction<'_>) -> DbResult<Vec<Violation>> {
        let graph = tx.graph();
        let vertex = self.vertex(tx)?;
        let mut violations = Vec::new();
        let mut report =
            |kind: ViolationKind| violations.push(Violation::new(vertex.iid, &vertex.label, kind));

        let sups = graph.types().outs(vertex.iid, TypeEdge::Sub)?;
        match sups.first() {
            None if vertex.encoding != TypeEncoding::Thing => {
                report(ViolationKind::MissingSupertype)
            }
            None => {}
            Some(&sup_iid) => {
                let sup = graph.types().vertex(sup_iid)?;
                let expected = if vertex.is_root() {
                    TypeEncoding::Thing
                } else {
                    vertex.encoding
                };
                if sup.encoding != expected {
                    report(ViolationKind::SupertypeKindMismatch {
                        sup: sup.label.clone(),
                        sup_kind: sup.encoding.to_string(),
                        expected: expected.to_string(),
                    });
                } else if sup.value_type.is_some() && sup.value_type != vertex.value_type {
                    report(ViolationKind::SupertypeValueTypeMismatch {
                        sup: sup.label.clone(),
                        expected: display_opt(sup.value_type),
                        found: display_opt(vertex.value_type),
                    });
                }
            }
        }
        if has_cycle(graph, vertex.iid)? {
            report(ViolationKind::CyclicHierarchy);
        }

        for key in graph.types().outs(vertex.iid, TypeEdge::OwnsKey)? {
            let attribute = graph.types().vertex(key)?;
            if !attribute.value_type.is_some_and(|vt| vt.is_keyable()) {
                report(ViolationKind::InvalidKeyValueType {
                    attribute: attribute.label.clone(),
                    value_type: display_opt(attribute.value_type),
                });
            }
        }
        if !vertex.is_abstract {
            let mut owned = graph.types().outs(vertex.iid, TypeEdge::Owns)?;
            owned.extend(graph.types().outs(vertex.iid, TypeEdge::OwnsKey)?);
            for iid in owned {
                let attribute = graph.types().vertex(iid)?;
                if attribute.is_abstract {
                    report(ViolationKind::OwnsAbstractAttribute {
                        attribute: attribute.label.clone(),
                    });
                }
            }
        }
        Ok(violations)
    }
}

impl Thing {
    /// Check this thing against its type.
    pub fn validate(&self, tx: &Transaction<'_>) -> DbResult<Vec<Violation>> {
        let graph = tx.graph();
        let ty = graph.types().vertex(self.type_iid())?;
        let mut violations = Vec::new();
        let mut report =
            |kind: ViolationKind| violations.push(Violation::new(self.iid(), &ty.label, kind));

        if ty.is_abstract {
            report(ViolationKind::AbstractInstance);
        }

        let keys = owned_iids(graph, ty.iid, true)?;
        if !keys.is_empty() {
            let had = graph
                .things()
                .outs(self.iid(), ThingEdge::Has)?
                .into_iter()
                .map(|iid| graph.things().vertex(iid).map(|v| v.type_iid))
                .collect::<Result<Vec<_>, _>>()?;
            for key in keys {
                let mut accepted = descendants(graph, key)?;
                accepted.push(key);
                let count = had.iter().filter(|t| accepted.contains(t)).count();
                if count != 1 {
                    let attribute = graph.types().vertex(key)?.label;
                    report(if count == 0 {
                        ViolationKind::MissingKey { attribute }
                    } else {
                        ViolationKind::MultipleKeys { attribute, count }
                    });
                }
            }
        }

        match self {
            Thing::Relation(relation) => {
                let players = graph.things().outs(relation.iid(), ThingEdge::RolePlayer)?;
                if players.is_empty() {
                    report(ViolationKind::NoRolePlayers);
                }
            }
            Thing::Attribute(attribute) => {
                let found = attribute.value_type();
                if ty.value_type != Some(found) {
                    report(ViolationKind::ValueTypeMismatch {
                        expected: display_opt(ty.value_type),
                        found: found.to_string(),
                    });
                }
            }
            Thing::Entity(_) => {}
        }
        Ok(violations)
    }
}

/// Check a rule body against the schema in `graph`.
pub(crate) fn rule_violations(graph: &Graph, rule: &RuleVertex) -> Vec<Violation> {
    let mut violations = Vec::new();
    let mut report = |kind: ViolationKind| violations.push(Violation::rule(&rule.label, kind));
    if rule.when.is_empty() {
        report(ViolationKind::EmptyWhen);
    }
    if rule.then.is_empty() {
        report(ViolationKind::EmptyThen);
    }
    let bound = rule.when.variables();
    for variable in rule.then.variables().difference(&bound) {
        report(ViolationKind::UnboundThenVariable {
            variable: variable.to_string(),
        });
    }
    let labels: BTreeSet<&str> = rule
        .when
        .type_labels()
        .union(&rule.then.type_labels())
        .copied()
        .collect();
    for label in labels {
        if graph.types().get(label).is_none() {
            report(ViolationKind::UnknownTypeLabel {
                label: label.to_owned(),
            });
        }
    }
    violations
}

/// Run `check` once per item on the transaction's validation pool and
/// collect every violation. The first storage error aborts the pass.
pub(crate) fn fan_out<V, F>(tx: &Transaction<'_>, items: Vec<V>, check: F) -> DbResult<Vec<Violation>>
where
    V: Send + Sync,
    F: Fn(&V) -> DbResult<Vec<Violation>> + Send + Sync,
{
    let per_item = tx
        .pool()
        .install(|| items.par_iter().map(check).collect::<DbResult<Vec<_>>>())?;
    Ok(per_item.into_iter().flatten().collect())
}

/// Whether walking up from `iid` revisits a type.
fn has_cycle(graph: &Graph, iid: TypeIid) -> DbResult<bool> {
    let mut seen = BTreeSet::from([iid]);
    let mut current = iid;
    while let Some(&sup) = graph.types().outs(current, TypeEdge::Sub)?.first() {
        if !seen.insert(sup) {
            return Ok(true);
        }
        current = sup;
    }
    Ok(false)
}

fn display_opt(value_type: Option<crate::graph::ValueType>) -> String {
    value_type.map_or_else(|| "none".to_owned(), |vt| vt.to_string())
}
