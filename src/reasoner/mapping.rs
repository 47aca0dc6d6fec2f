//! Variable-space translations between a caller and a rule body.

use std::collections::{BTreeMap, BTreeSet};

use crate::answer::ConceptMap;
use crate::error::ReasonerError;
use crate::pattern::Variable;

/// Rewrites a rule-body answer back into caller variable-space.
///
/// Returns `None` when the answer does not correspond to this rule
/// invocation. Implemented for [`Mapping`], [`Unifier`] and any
/// `Fn(&ConceptMap) -> Option<ConceptMap>`.
pub trait UnTransform {
    fn un_transform(&self, body: &ConceptMap) -> Option<ConceptMap>;
}

impl<F> UnTransform for F
where
    F: Fn(&ConceptMap) -> Option<ConceptMap>,
{
    fn un_transform(&self, body: &ConceptMap) -> Option<ConceptMap> {
        self(body)
    }
}

/// A one-to-one rename of caller variables to rule-body variables.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Mapping {
    forward: BTreeMap<Variable, Variable>,
    reverse: BTreeMap<Variable, Variable>,
}

impl Mapping {
    /// Build a mapping from `(caller, body)` pairs. Fails if two caller
    /// variables share a body variable or one caller variable is renamed twice.
    pub fn new<I, A, B>(pairs: I) -> Result<Self, ReasonerError>
    where
        I: IntoIterator<Item = (A, B)>,
        A: Into<Variable>,
        B: Into<Variable>,
    {
        let mut forward: BTreeMap<Variable, Variable> = BTreeMap::new();
        let mut reverse: BTreeMap<Variable, Variable> = BTreeMap::new();
        for (caller, body) in pairs {
            let (caller, body): (Variable, Variable) = (caller.into(), body.into());
            if let Some(other) = reverse.get(&body) {
                if *other != caller {
                    return Err(ReasonerError::NonInjectiveMapping {
                        first: other.to_string(),
                        second: caller.to_string(),
                        target: body.to_string(),
                    });
                }
            }
            if let Some(other) = forward.get(&caller) {
                if *other != body {
                    return Err(ReasonerError::NonInjectiveMapping {
                        first: other.to_string(),
                        second: body.to_string(),
                        target: caller.to_string(),
                    });
                }
            }
            forward.insert(caller.clone(), body.clone());
            reverse.insert(body, caller);
        }
        Ok(Self { forward, reverse })
    }

    /// Caller-space bindings renamed into rule-body space. Unmapped caller
    /// variables are dropped.
    pub fn transform(&self, caller: &ConceptMap) -> ConceptMap {
        caller
            .iter()
            .filter_map(|(v, c)| self.forward.get(v).map(|b| (b.clone(), c.clone())))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.forward.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }
}

impl UnTransform for Mapping {
    /// Rule-internal variables are dropped; `None` if no variable maps back.
    fn un_transform(&self, body: &ConceptMap) -> Option<ConceptMap> {
        let caller: ConceptMap = body
            .iter()
            .filter_map(|(v, c)| self.reverse.get(v).map(|a| (a.clone(), c.clone())))
            .collect();
        (!caller.is_empty()).then_some(caller)
    }
}

/// A caller → rule-body unification in which one caller variable may stand
/// for several body variables.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Unifier {
    unifier: BTreeMap<Variable, BTreeSet<Variable>>,
}

impl Unifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `caller ↦ body`.
    pub fn with(mut self, caller: impl Into<Variable>, body: impl Into<Variable>) -> Self {
        self.unifier
            .entry(caller.into())
            .or_default()
            .insert(body.into());
        self
    }

    /// Caller-space bindings copied onto every unified body variable.
    pub fn unify(&self, caller: &ConceptMap) -> ConceptMap {
        caller
            .iter()
            .flat_map(|(v, c)| {
                self.unifier
                    .get(v)
                    .into_iter()
                    .flatten()
                    .map(move |b| (b.clone(), c.clone()))
            })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.unifier.is_empty()
    }
}

impl UnTransform for Unifier {
    /// Every bound body variable of a caller variable must hold the same
    /// concept, else `None`. Also `None` if nothing maps back.
    fn un_transform(&self, body: &ConceptMap) -> Option<ConceptMap> {
        let mut caller = Vec::new();
        for (variable, targets) in &self.unifier {
            let mut bound = targets.iter().filter_map(|t| body.get(t));
            if let Some(first) = bound.next() {
                if bound.any(|other| other != first) {
                    return None;
                }
                caller.push((variable.clone(), first.clone()));
            }
        }
        (!caller.is_empty()).then(|| caller.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::concept::Entity;
    use crate::database::{Database, DatabaseConfig, TransactionType};

    fn people(n: usize) -> Vec<Entity> {
        let db = Database::open(DatabaseConfig::default()).unwrap();
        let tx = db.transaction(TransactionType::Write).unwrap();
        let person = tx.concepts().put_entity_type("person").unwrap();
        (0..n).map(|_| person.create(&tx).unwrap()).collect()
    }

    #[test]
    fn mapping_must_be_injective() {
        let err = Mapping::new([("x", "a"), ("y", "a")]).unwrap_err();
        assert!(matches!(err, ReasonerError::NonInjectiveMapping { .. }));
        assert!(err.to_string().contains("$a"));
        assert!(Mapping::new([("x", "a"), ("x", "b")]).is_err());
        assert_eq!(Mapping::new([("x", "a"), ("x", "a")]).unwrap().len(), 1);
    }

    #[test]
    fn mapping_round_trips_and_drops_internal_variables() {
        let p = people(3);
        let mapping = Mapping::new([("x", "a")]).unwrap();
        let caller: ConceptMap = [("x", p[0].clone()), ("other", p[1].clone())]
            .into_iter()
            .collect();

        let body = mapping.transform(&caller);
        assert_eq!(body, [("a", p[0].clone())].into_iter().collect::<ConceptMap>());

        let answer: ConceptMap = [("a", p[0].clone()), ("internal", p[2].clone())]
            .into_iter()
            .collect();
        let back = mapping.un_transform(&answer).unwrap();
        assert_eq!(back, [("x", p[0].clone())].into_iter().collect::<ConceptMap>());

        let unrelated: ConceptMap = [("q", p[2].clone())].into_iter().collect();
        assert!(mapping.un_transform(&unrelated).is_none());
    }

    #[test]
    fn unifier_requires_agreement() {
        let p = people(2);
        let unifier = Unifier::new().with("x", "a").with("x", "b");
        let caller: ConceptMap = [("x", p[0].clone())].into_iter().collect();
        let body = unifier.unify(&caller);
        assert_eq!(body.len(), 2);

        let agree: ConceptMap = [("a", p[0].clone()), ("b", p[0].clone())].into_iter().collect();
        assert_eq!(unifier.un_transform(&agree), Some(caller));

        let disagree: ConceptMap = [("a", p[0].clone()), ("b", p[1].clone())].into_iter().collect();
        assert!(unifier.un_transform(&disagree).is_none());
    }

    #[test]
    fn closures_are_strategies() {
        let nothing = |_: &ConceptMap| -> Option<ConceptMap> { None };
        assert!(nothing.un_transform(&ConceptMap::new()).is_none());
    }
}
