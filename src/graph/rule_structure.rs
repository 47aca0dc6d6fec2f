//! Rule storage, kept alongside the schema so rules commit with it.

use dashmap::DashMap;

use crate::pattern::Conjunction;

/// A stored rule.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleVertex {
    pub label: String,
    pub when: Conjunction,
    pub then: Conjunction,
}

/// Label → rule.
#[derive(Debug, Clone, Default)]
pub struct RuleStructure {
    rules: DashMap<String, RuleVertex>,
}

impl RuleStructure {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the rule labelled `label`.
    pub fn put(&self, label: &str, when: Conjunction, then: Conjunction) -> RuleVertex {
        let vertex = RuleVertex {
            label: label.to_owned(),
            when,
            then,
        };
        self.rules.insert(label.to_owned(), vertex.clone());
        vertex
    }

    pub fn get(&self, label: &str) -> Option<RuleVertex> {
        self.rules.get(label).map(|r| r.value().clone())
    }

    /// Remove a rule. Returns `true` if it existed.
    pub fn delete(&self, label: &str) -> bool {
        self.rules.remove(label).is_some()
    }

    /// Every rule, sorted by label.
    pub fn all(&self) -> Vec<RuleVertex> {
        let mut rules: Vec<_> = self.rules.iter().map(|r| r.value().clone()).collect();
        rules.sort_by(|a, b| a.label.cmp(&b.label));
        rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
