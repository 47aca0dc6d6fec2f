//! Variable → concept bindings.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::concept::Concept;
use crate::pattern::Variable;

/// An immutable binding of query variables to concepts.
///
/// Iteration follows insertion order, but equality and hashing do not: two
/// maps with the same bindings are equal however they were built. Binding a
/// variable twice keeps its first position and the last concept.
#[derive(Clone, Default)]
pub struct ConceptMap {
    entries: Arc<[(Variable, Concept)]>,
}

impl ConceptMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, variable: &Variable) -> Option<&Concept> {
        self.entries
            .iter()
            .find(|(v, _)| v == variable)
            .map(|(_, c)| c)
    }

    pub fn contains(&self, variable: &Variable) -> bool {
        self.get(variable).is_some()
    }

    /// Variables in insertion order.
    pub fn variables(&self) -> impl Iterator<Item = &Variable> {
        self.entries.iter().map(|(v, _)| v)
    }

    pub fn concepts(&self) -> impl Iterator<Item = &Concept> {
        self.entries.iter().map(|(_, c)| c)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Variable, &Concept)> {
        self.entries.iter().map(|(v, c)| (v, c))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// A copy of `self` with every binding of `other` applied on top.
    pub fn overlay(&self, other: &ConceptMap) -> ConceptMap {
        self.iter()
            .chain(other.iter())
            .map(|(v, c)| (v.clone(), c.clone()))
            .collect()
    }

    fn sorted(&self) -> Vec<&(Variable, Concept)> {
        let mut sorted: Vec<_> = self.entries.iter().collect();
        sorted.sort_by(|a, b| a.0.cmp(&b.0));
        sorted
    }
}

impl<V, C> FromIterator<(V, C)> for ConceptMap
where
    V: Into<Variable>,
    C: Into<Concept>,
{
    fn from_iter<I: IntoIterator<Item = (V, C)>>(iter: I) -> Self {
        let mut entries: Vec<(Variable, Concept)> = Vec::new();
        for (variable, concept) in iter {
            let variable = variable.into();
            let concept = concept.into();
            match entries.iter_mut().find(|(v, _)| *v == variable) {
                Some(slot) => slot.1 = concept,
                None => entries.push((variable, concept)),
            }
        }
        Self {
            entries: entries.into(),
        }
    }
}

impl PartialEq for ConceptMap {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .all(|(v, c)| other.get(v).is_some_and(|o| o == c))
    }
}

impl Eq for ConceptMap {}

impl Hash for ConceptMap {
    fn hash<H: Hasher>(&self, state: &mut H) {
        let sorted = self.sorted();
        sorted.len().hash(state);
        for (variable, concept) in sorted {
            variable.hash(state);
            concept.hash(state);
        }
    }
}

impl fmt::Debug for ConceptMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl fmt::Display for ConceptMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.iter().map(|(v, c)| format!("{v}: {c}")).collect();
        write!(f, "{{ {} }}", parts.join(", "))
    }
}
