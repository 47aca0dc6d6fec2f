//! Structured query patterns: variables, constraints and conjunctions.
//!
//! Patterns are produced by a query parser outside this crate. Rules store
//! them as their `when` and `then` bodies, and resolution uses the variables
//! they mention as [`ConceptMap`](crate::answer::ConceptMap) keys.

pub mod constraint;

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

pub use constraint::{Constraint, ThingConstraint, TypeConstraint};

/// A query variable name such as `$x`.
///
/// The leading `$` is not part of the name: `Variable::new("$x")` and
/// `Variable::new("x")` are the same variable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Variable(Arc<str>);

impl Variable {
    pub fn new(name: &str) -> Self {
        Variable(Arc::from(name.strip_prefix('$').unwrap_or(name)))
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Variable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "${}", self.0)
    }
}

impl From<&str> for Variable {
    fn from(name: &str) -> Self {
        Variable::new(name)
    }
}

impl From<String> for Variable {
    fn from(name: String) -> Self {
        Variable::new(&name)
    }
}

impl From<Variable> for String {
    fn from(var: Variable) -> Self {
        var.name().to_owned()
    }
}

/// An ordered conjunction of constraints.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Conjunction {
    constraints: Vec<Constraint>,
}

impl Conjunction {
    pub fn new(constraints: Vec<Constraint>) -> Self {
        Self { constraints }
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    /// Every variable mentioned by any constraint.
    pub fn variables(&self) -> BTreeSet<Variable> {
        self.constraints
            .iter()
            .flat_map(|c| c.variables())
            .collect()
    }

    /// Every type label mentioned by any constraint.
    pub fn type_labels(&self) -> BTreeSet<&str> {
        self.constraints
            .iter()
            .filter_map(|c| c.type_label())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }
}

impl FromIterator<Constraint> for Conjunction {
    fn from_iter<I: IntoIterator<Item = Constraint>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl std::fmt::Display for Conjunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self.constraints.iter().map(|c| c.to_string()).collect();
        write!(f, "{{ {}; }}", parts.join("; "))
    }
}
