//! Constraints on a single owner variable.

use std::collections::BTreeSet;

use crate::error::PatternError;
use crate::graph::Value;

use super::Variable;

/// A constraint on types or on things.
#[derive(Debug, Clone, PartialEq)]
pub enum Constraint {
    Type(TypeConstraint),
    Thing(ThingConstraint),
}

/// Constraints whose owner is a type variable.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeConstraint {
    /// `$t type <label>`
    Label { owner: Variable, label: String },
    /// `$t sub $u`
    Sub { owner: Variable, sup: Variable },
}

/// Constraints whose owner is a thing variable.
#[derive(Debug, Clone, PartialEq)]
pub enum ThingConstraint {
    /// `$x isa <label>`
    Isa { owner: Variable, type_label: String },
    /// `$x has $a`
    Has { owner: Variable, attribute: Variable },
    /// `$a == <value>`
    Value { owner: Variable, value: Value },
}

impl Constraint {
    pub fn label(owner: impl Into<Variable>, label: &str) -> Self {
        Constraint::Type(TypeConstraint::Label {
            owner: owner.into(),
            label: label.to_owned(),
        })
    }

    pub fn sub(owner: impl Into<Variable>, sup: impl Into<Variable>) -> Self {
        Constraint::Type(TypeConstraint::Sub {
            owner: owner.into(),
            sup: sup.into(),
        })
    }

    pub fn isa(owner: impl Into<Variable>, type_label: &str) -> Self {
        Constraint::Thing(ThingConstraint::Isa {
            owner: owner.into(),
            type_label: type_label.to_owned(),
        })
    }

    pub fn has(owner: impl Into<Variable>, attribute: impl Into<Variable>) -> Self {
        Constraint::Thing(ThingConstraint::Has {
            owner: owner.into(),
            attribute: attribute.into(),
        })
    }

    pub fn value(owner: impl Into<Variable>, value: impl Into<Value>) -> Self {
        Constraint::Thing(ThingConstraint::Value {
            owner: owner.into(),
            value: value.into(),
        })
    }

    pub fn owner(&self) -> &Variable {
        match self {
            Constraint::Type(c) => c.owner(),
            Constraint::Thing(c) => c.owner(),
        }
    }

    pub fn variables(&self) -> BTreeSet<Variable> {
        match self {
            Constraint::Type(c) => c.variables(),
            Constraint::Thing(c) => c.variables(),
        }
    }

    /// The type label this constraint refers to, if any.
    pub fn type_label(&self) -> Option<&str> {
        match self {
            Constraint::Type(TypeConstraint::Label { label, .. }) => Some(label),
            Constraint::Thing(ThingConstraint::Isa { type_label, .. }) => Some(type_label),
            _ => None,
        }
    }

    pub fn is_type(&self) -> bool {
        matches!(self, Constraint::Type(_))
    }

    pub fn is_thing(&self) -> bool {
        matches!(self, Constraint::Thing(_))
    }

    pub fn as_type(&self) -> Result<&TypeConstraint, PatternError> {
        match self {
            Constraint::Type(c) => Ok(c),
            Constraint::Thing(_) => Err(PatternError::InvalidCasting {
                from: "ThingConstraint".into(),
                to: "TypeConstraint".into(),
            }),
        }
    }

    pub fn as_thing(&self) -> Result<&ThingConstraint, PatternError> {
        match self {
            Constraint::Thing(c) => Ok(c),
            Constraint::Type(_) => Err(PatternError::InvalidCasting {
                from: "TypeConstraint".into(),
                to: "ThingConstraint".into(),
            }),
        }
    }
}

impl TypeConstraint {
    pub fn owner(&self) -> &Variable {
        match self {
            TypeConstraint::Label { owner, .. } | TypeConstraint::Sub { owner, .. } => owner,
        }
    }

    pub fn variables(&self) -> BTreeSet<Variable> {
        match self {
            TypeConstraint::Label { owner, .. } => BTreeSet::from([owner.clone()]),
            TypeConstraint::Sub { owner, sup } => BTreeSet::from([owner.clone(), sup.clone()]),
        }
    }
}

impl ThingConstraint {
    pub fn owner(&self) -> &Variable {
        match self {
            ThingConstraint::Isa { owner, .. }
            | ThingConstraint::Has { owner, .. }
            | ThingConstraint::Value { owner, .. } => owner,
        }
    }

    pub fn variables(&self) -> BTreeSet<Variable> {
        match self {
            ThingConstraint::Isa { owner, .. } | ThingConstraint::Value { owner, .. } => {
                BTreeSet::from([owner.clone()])
            }
            ThingConstraint::Has { owner, attribute } => {
                BTreeSet::from([owner.clone(), attribute.clone()])
            }
        }
    }
}

impl std::fmt::Display for Constraint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Constraint::Type(TypeConstraint::Label { owner, label }) => {
                write!(f, "{owner} type {label}")
            }
            Constraint::Type(TypeConstraint::Sub { owner, sup }) => write!(f, "{owner} sub {sup}"),
            Constraint::Thing(ThingConstraint::Isa { owner, type_label }) => {
                write!(f, "{owner} isa {type_label}")
            }
            Constraint::Thing(ThingConstraint::Has { owner, attribute }) => {
                write!(f, "{owner} has {attribute}")
            }
            Constraint::Thing(ThingConstraint::Value { owner, value }) => {
                write!(f, "{owner} == {value}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn casting_to_the_matching_kind_succeeds() {
        let isa = Constraint::isa("x", "person");
        assert!(isa.is_thing());
        assert!(!isa.is_type());
        assert!(matches!(isa.as_thing(), Ok(ThingConstraint::Isa { .. })));

        let sub = Constraint::sub("t", "u");
        assert!(matches!(sub.as_type(), Ok(TypeConstraint::Sub { .. })));
    }

    #[test]
    fn casting_to_the_wrong_kind_fails() {
        let has = Constraint::has("x", "n");
        let err = has.as_type().unwrap_err();
        assert!(err.to_string().contains("TypeConstraint"));

        let label = Constraint::label("t", "person");
        assert!(matches!(
            label.as_thing(),
            Err(PatternError::InvalidCasting { .. })
        ));
    }

    #[test]
    fn owner_and_variables() {
        let has = Constraint::has("$x", "$n");
        assert_eq!(has.owner(), &Variable::new("x"));
        assert_eq!(has.variables().len(), 2);
        assert_eq!(Constraint::isa("x", "person").type_label(), Some("person"));
        assert_eq!(has.type_label(), None);
    }
}
