//! Merge rule-body answers back into the caller's bindings.

use std::fmt;
use std::hash::{Hash, Hasher};

use crate::answer::ConceptMap;
use crate::error::ReasonerError;

use super::mapping::{Mapping, UnTransform, Unifier};

/// How un-transformed bindings combine with the caller's bindings on shared variables.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum MergePolicy {
    /// The rule answer wins.
    #[default]
    Overlay,
    /// A disagreement fails with `InconsistentBinding`.
    RejectConflicts,
}

/// One rule invocation's view of a caller answer.
///
/// Holds the caller's bindings (`original`), the same bindings in rule-body
/// variable-space (`transformed`) and the strategy that maps rule-body
/// answers back. Immutable once built; two aggregators are equal when their
/// `original` and `transformed` maps are, whatever the strategy.
#[derive(Clone)]
pub struct Aggregator<T = Mapping> {
    original: ConceptMap,
    transformed: ConceptMap,
    strategy: T,
    policy: MergePolicy,
}

impl<T: UnTransform> Aggregator<T> {
    pub fn new(original: ConceptMap, transformed: ConceptMap, strategy: T) -> Self {
        Self {
            original,
            transformed,
            strategy,
            policy: MergePolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: MergePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Translate `to_aggregate` into caller-space and merge it over `original`.
    ///
    /// `Ok(None)` means the answer does not belong to this invocation. An
    /// un-transformed answer that is empty, or that shares no variable with
    /// `original`, is an `IllegalState`.
    pub fn aggregate_with(
        &self,
        to_aggregate: &ConceptMap,
    ) -> Result<Option<Aggregated>, ReasonerError> {
        let Some(un_transformed) = self.strategy.un_transform(to_aggregate) else {
            return Ok(None);
        };
        if un_transformed.is_empty() {
            return Err(ReasonerError::IllegalState {
                message: format!("answer {to_aggregate} un-transformed to an empty binding"),
            });
        }
        if !un_transformed.variables().any(|v| self.original.contains(v)) {
            return Err(ReasonerError::IllegalState {
                message: format!(
                    "un-transformed answer {un_transformed} shares no variable with {}",
                    self.original
                ),
            });
        }
        if self.policy == MergePolicy::RejectConflicts {
            for (variable, concept) in un_transformed.iter() {
                if let Some(expected) = self.original.get(variable) {
                    if expected != concept {
                        return Err(ReasonerError::InconsistentBinding {
                            variable: variable.to_string(),
                            expected: expected.to_string(),
                            found: concept.to_string(),
                        });
                    }
                }
            }
        }
        Ok(Some(Aggregated {
            concept_map: self.original.overlay(&un_transformed),
            original: to_aggregate.clone(),
        }))
    }

    /// The caller's bindings in rule-body variable-space.
    pub fn map(&self) -> &ConceptMap {
        &self.transformed
    }

    pub fn original(&self) -> &ConceptMap {
        &self.original
    }

    pub fn strategy(&self) -> &T {
        &self.strategy
    }

    pub fn policy(&self) -> MergePolicy {
        self.policy
    }
}

impl Aggregator<Mapping> {
    /// Aggregator whose `transformed` map is `original` renamed by `mapping`.
    pub fn mapped(original: ConceptMap, mapping: Mapping) -> Self {
        let transformed = mapping.transform(&original);
        Self::new(original, transformed, mapping)
    }
}

impl Aggregator<Unifier> {
    /// Aggregator whose `transformed` map is `original` unified by `unifier`.
    pub fn unified(original: ConceptMap, unifier: Unifier) -> Self {
        let transformed = unifier.unify(&original);
        Self::new(original, transformed, unifier)
    }
}

impl<T> PartialEq for Aggregator<T> {
    fn eq(&self, other: &Self) -> bool {
        self.original == other.original && self.transformed == other.transformed
    }
}

impl<T> Eq for Aggregator<T> {}

impl<T> Hash for Aggregator<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.original.hash(state);
        self.transformed.hash(state);
    }
}

impl<T> fmt::Debug for Aggregator<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Aggregator")
            .field("original", &self.original)
            .field("transformed", &self.transformed)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

/// A merged caller-space answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Aggregated {
    concept_map: ConceptMap,
    original: ConceptMap,
}

impl Aggregated {
    pub fn concept_map(&self) -> &ConceptMap {
        &self.concept_map
    }

    /// The rule-body answer this was built from.
    pub fn original(&self) -> &ConceptMap {
        &self.original
    }

    pub fn into_concept_map(self) -> ConceptMap {
        self.concept_map
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::concept::{Concept, Entity};
    use crate::database::{Database, DatabaseConfig, TransactionType};
    use crate::pattern::Variable;
    use std::collections::hash_map::DefaultHasher;

    fn people(n: usize) -> Vec<Entity> {
        let db = Database::open(DatabaseConfig::default()).unwrap();
        let tx = db.transaction(TransactionType::Write).unwrap();
        let person = tx.concepts().put_entity_type("person").unwrap();
        (0..n).map(|_| person.create(&tx).unwrap()).collect()
    }

    fn map(pairs: &[(&str, &Entity)]) -> ConceptMap {
        pairs.iter().map(|(v, e)| (*v, (*e).clone())).collect()
    }

    #[test]
    fn rule_answer_overrides_shared_bindings() {
        let p = people(3);
        let (a, b, c) = (&p[0], &p[1], &p[2]);
        let mapping = Mapping::new([("x", "a"), ("y", "b")]).unwrap();
        let aggregator = Aggregator::mapped(map(&[("x", a), ("y", b)]), mapping);
        assert_eq!(aggregator.map(), &map(&[("a", a), ("b", b)]));

        let answer = map(&[("a", a), ("b", c)]);
        let aggregated = aggregator.aggregate_with(&answer).unwrap().unwrap();
        assert_eq!(aggregated.concept_map(), &map(&[("x", a), ("y", c)]));
        assert_eq!(aggregated.original(), &answer);
    }

    #[test]
    fn unrelated_answer_is_no_match() {
        let p = people(1);
        let aggregator = Aggregator::new(
            map(&[("x", &p[0])]),
            map(&[("a", &p[0])]),
            |_: &ConceptMap| -> Option<ConceptMap> { None },
        );
        assert_eq!(aggregator.aggregate_with(&map(&[("z", &p[0])])).unwrap(), None);
    }

    #[test]
    fn empty_un_transform_is_illegal_state() {
        let p = people(1);
        let aggregator = Aggregator::new(
            map(&[("x", &p[0])]),
            map(&[("a", &p[0])]),
            |_: &ConceptMap| -> Option<ConceptMap> { Some(ConceptMap::new()) },
        );
        let err = aggregator.aggregate_with(&map(&[("a", &p[0])])).unwrap_err();
        assert!(matches!(err, ReasonerError::IllegalState { .. }));
    }

    #[test]
    fn disconnected_un_transform_is_illegal_state() {
        let p = people(1);
        let aggregator = Aggregator::new(
            map(&[("x", &p[0])]),
            map(&[("a", &p[0])]),
            |m: &ConceptMap| -> Option<ConceptMap> {
                Some(m.iter().map(|(_, c)| ("elsewhere", c.clone())).collect())
            },
        );
        let err = aggregator.aggregate_with(&map(&[("a", &p[0])])).unwrap_err();
        assert!(err.to_string().contains("shares no variable"));
    }

    #[test]
    fn reject_conflicts_policy() {
        let p = people(3);
        let mapping = Mapping::new([("x", "a"), ("y", "b")]).unwrap();
        let aggregator = Aggregator::mapped(map(&[("x", &p[0]), ("y", &p[1])]), mapping)
            .with_policy(MergePolicy::RejectConflicts);

        let consistent = map(&[("a", &p[0]), ("b", &p[1])]);
        assert!(aggregator.aggregate_with(&consistent).unwrap().is_some());

        let conflicting = map(&[("a", &p[0]), ("b", &p[2])]);
        let err = aggregator.aggregate_with(&conflicting).unwrap_err();
        assert!(matches!(err, ReasonerError::InconsistentBinding { .. }));
    }

    #[test]
    fn unified_aggregation_adds_caller_bindings() {
        let p = people(2);
        let unifier = Unifier::new().with("x", "a").with("x", "b");
        let aggregator = Aggregator::unified(map(&[("x", &p[0])]), unifier);
        let answer = map(&[("a", &p[0]), ("b", &p[0]), ("hidden", &p[1])]);
        let merged = aggregator.aggregate_with(&answer).unwrap().unwrap().into_concept_map();
        assert_eq!(merged.len(), 1);
        assert_eq!(
            merged.get(&Variable::new("x")),
            Some(&Concept::from(p[0].clone()))
        );
    }

    #[test]
    fn equality_ignores_the_strategy() {
        let p = people(1);
        let original = map(&[("x", &p[0])]);
        let transformed = map(&[("a", &p[0])]);
        let one = Aggregator::new(original.clone(), transformed.clone(), Mapping::new([("x", "a")]).unwrap());
        let two = Aggregator::new(original, transformed, Mapping::new([("x", "a"), ("y", "b")]).unwrap());
        assert_eq!(one, two);

        let hash = |agg: &Aggregator| {
            let mut hasher = DefaultHasher::new();
            agg.hash(&mut hasher);
            hasher.finish()
        };
        assert_eq!(hash(&one), hash(&two));
    }
}
