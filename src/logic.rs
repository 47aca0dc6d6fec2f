//! Rules: `when` / `then` pattern pairs stored with the schema.

use std::fmt;

use crate::database::Transaction;
use crate::error::{ConceptError, DbResult};
use crate::graph::RuleVertex;
use crate::concept::validate::{Violation, rule_violations};
use crate::pattern::Conjunction;

/// Rule registry of one transaction.
#[derive(Clone, Copy)]
pub struct Logic<'a> {
    tx: &'a Transaction<'a>,
}

impl<'a> Logic<'a> {
    pub(crate) fn new(tx: &'a Transaction<'a>) -> Self {
        Self { tx }
    }

    /// Define the rule `label`, replacing the bodies of any existing rule with that label.
    pub fn put_rule(&self, label: &str, when: Conjunction, then: Conjunction) -> DbResult<Rule> {
        if label.is_empty() || label.chars().any(char::is_whitespace) {
            return Err(ConceptError::InvalidLabel {
                label: label.to_owned(),
            }
            .into());
        }
        let graph = self.tx.write_graph("put_rule")?;
        let vertex = graph.rules().put(label, when, then);
        tracing::debug!(rule = label, "put rule");
        Ok(Rule::from(vertex))
    }

    pub fn get_rule(&self, label: &str) -> Option<Rule> {
        self.tx.graph().rules().get(label).map(Rule::from)
    }

    /// Every rule, sorted by label.
    pub fn rules(&self) -> Vec<Rule> {
        self.tx
            .graph()
            .rules()
            .all()
            .into_iter()
            .map(Rule::from)
            .collect()
    }

    /// Check every rule against the transaction's schema.
    pub fn validate_rules(&self) -> Vec<Violation> {
        self.rules()
            .iter()
            .flat_map(|rule| rule.validate(self.tx))
            .collect()
    }
}

impl fmt::Debug for Logic<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logic").finish_non_exhaustive()
    }
}

/// A rule as read from a transaction.
///
/// The bodies are those current when the rule was read; a later
/// [`Logic::put_rule`] with the same label is not reflected here.
#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    vertex: RuleVertex,
}

impl Rule {
    pub fn label(&self) -> &str {
        &self.vertex.label
    }

    pub fn when(&self) -> &Conjunction {
        &self.vertex.when
    }

    pub fn then(&self) -> &Conjunction {
        &self.vertex.then
    }

    /// Remove this rule from the transaction's graph.
    pub fn delete(&self, tx: &Transaction<'_>) -> DbResult<()> {
        let graph = tx.write_graph("delete_rule")?;
        if graph.rules().delete(self.label()) {
            tracing::debug!(rule = self.label(), "deleted rule");
        }
        Ok(())
    }

    pub fn is_deleted(&self, tx: &Transaction<'_>) -> bool {
        tx.graph().rules().get(self.label()).is_none()
    }

    pub fn validate(&self, tx: &Transaction<'_>) -> Vec<Violation> {
        rule_violations(tx.graph(), &self.vertex)
    }
}

impl From<RuleVertex> for Rule {
    fn from(vertex: RuleVertex) -> Self {
        Self { vertex }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "rule {}: when {} then {}",
            self.vertex.label, self.vertex.when, self.vertex.then
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{Database, DatabaseConfig, TransactionType};
    use crate::error::{DbError, ValidationError};
    use crate::graph::ValueType;
    use crate::pattern::Constraint;

    fn when() -> Conjunction {
        Conjunction::new(vec![
            Constraint::isa("x", "person"),
            Constraint::has("x", "n"),
        ])
    }

    fn then() -> Conjunction {
        Conjunction::new(vec![Constraint::has("x", "n")])
    }

    #[test]
    fn put_get_and_replace() {
        let db = Database::open(DatabaseConfig::default()).unwrap();
        let tx = db.transaction(TransactionType::Write).unwrap();
        let logic = tx.logic();
        let rule = logic.put_rule("copy-name", when(), then()).unwrap();
        assert_eq!(logic.get_rule("copy-name"), Some(rule.clone()));

        let replaced = logic
            .put_rule("copy-name", when(), Conjunction::new(vec![Constraint::isa("x", "person")]))
            .unwrap();
        assert_eq!(logic.rules(), vec![replaced.clone()]);
        assert_ne!(rule, replaced);
        assert_eq!(
            replaced.to_string(),
            "rule copy-name: when { $x isa person; $x has $n; } then { $x isa person; }"
        );
    }

    #[test]
    fn delete_marks_rule_deleted() {
        let db = Database::open(DatabaseConfig::default()).unwrap();
        let tx = db.transaction(TransactionType::Write).unwrap();
        let rule = tx.logic().put_rule("r", when(), then()).unwrap();
        assert!(!rule.is_deleted(&tx));
        rule.delete(&tx).unwrap();
        assert!(rule.is_deleted(&tx));
        assert!(tx.logic().get_rule("r").is_none());
    }

    #[test]
    fn rules_commit_with_the_schema() {
        let db = Database::open(DatabaseConfig::default()).unwrap();
        let tx = db.transaction(TransactionType::Write).unwrap();
        let person = tx.concepts().put_entity_type("person").unwrap();
        let name = tx.concepts().put_attribute_type("name", ValueType::String).unwrap();
        crate::concept::TypeConcept::set_owns(&person, &tx, &name, false).unwrap();
        tx.logic().put_rule("r", when(), then()).unwrap();
        tx.commit().unwrap();

        let read = db.transaction(TransactionType::Read).unwrap();
        assert_eq!(read.logic().rules().len(), 1);
        assert!(read.logic().put_rule("s", when(), then()).is_err());
    }

    #[test]
    fn unsafe_rules_block_commit() {
        let db = Database::open(DatabaseConfig::default()).unwrap();
        let tx = db.transaction(TransactionType::Write).unwrap();
        tx.logic()
            .put_rule("dangling", when(), Conjunction::new(vec![Constraint::has("y", "n")]))
            .unwrap();
        let err = tx.commit().unwrap_err();
        assert!(matches!(err, DbError::Validation(ValidationError::Rejected { .. })));
        let msg = err.to_string();
        assert!(msg.contains("rule 'dangling'"));
        assert!(msg.contains("unknown type label 'person'"));
        assert!(msg.contains("$y"));
    }
}
