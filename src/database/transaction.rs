//! Read and write transactions.

use std::sync::Arc;

use rayon::ThreadPool;
use serde::{Deserialize, Serialize};

use crate::concept::{ConceptCache, Concepts};
use crate::error::{DbResult, TransactionError, ValidationError};
use crate::graph::Graph;
use crate::logic::Logic;

use super::Database;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionType {
    Read,
    Write,
}

/// A unit of work against one graph snapshot.
///
/// Concepts obtained from a transaction are only meaningful inside it. A
/// write transaction that is dropped without a successful
/// [`commit`](Self::commit) discards its changes.
pub struct Transaction<'db> {
    db: &'db Database,
    kind: TransactionType,
    graph: Arc<Graph>,
    cache: ConceptCache,
}

impl<'db> Transaction<'db> {
    pub(super) fn new(db: &'db Database, kind: TransactionType, graph: Arc<Graph>) -> Self {
        Self {
            db,
            kind,
            graph,
            cache: ConceptCache::new(),
        }
    }

    pub fn kind(&self) -> TransactionType {
        self.kind
    }

    pub fn is_write(&self) -> bool {
        self.kind == TransactionType::Write
    }

    pub fn concepts(&self) -> Concepts<'_> {
        Concepts::new(self)
    }

    pub fn logic(&self) -> Logic<'_> {
        Logic::new(self)
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn cache(&self) -> &ConceptCache {
        &self.cache
    }

    /// The graph, if this transaction may write to it.
    pub(crate) fn write_graph(&self, operation: &str) -> Result<&Graph, TransactionError> {
        match self.kind {
            TransactionType::Write => Ok(&self.graph),
            TransactionType::Read => Err(TransactionError::ReadOnly {
                operation: operation.to_owned(),
            }),
        }
    }

    pub(crate) fn pool(&self) -> &ThreadPool {
        self.db.pool()
    }

    /// Validate every type, thing and rule and, if nothing is wrong, make
    /// this transaction's graph the committed one.
    pub fn commit(self) -> DbResult<()> {
        self.write_graph("commit")?;
        let mut violations = self.concepts().validate_types()?;
        violations.extend(self.concepts().validate_things()?);
        violations.extend(self.logic().validate_rules());
        if !violations.is_empty() {
            tracing::warn!(violations = violations.len(), "commit rejected");
            return Err(ValidationError::Rejected { violations }.into());
        }
        self.db.install(Arc::clone(&self.graph));
        tracing::info!(
            types = self.graph.types().len(),
            things = self.graph.things().len(),
            rules = self.graph.rules().len(),
            "committed"
        );
        Ok(())
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        if self.kind == TransactionType::Write {
            self.db.release_writer();
        }
    }
}

impl std::fmt::Debug for Transaction<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction")
            .field("kind", &self.kind)
            .field("cached_types", &self.cache.type_count())
            .field("cached_things", &self.cache.thing_count())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::concept::TypeConcept;
    use crate::database::DatabaseConfig;
    use crate::error::DbError;
    use crate::graph::ValueType;

    #[test]
    fn committed_changes_are_visible_to_new_transactions() {
        let db = Database::open(DatabaseConfig::default()).unwrap();
        let tx = db.transaction(TransactionType::Write).unwrap();
        tx.concepts().put_entity_type("person").unwrap();
        tx.commit().unwrap();

        let read = db.transaction(TransactionType::Read).unwrap();
        assert!(read.concepts().get_entity_type("person").unwrap().is_some());
    }

    #[test]
    fn dropped_writes_are_discarded() {
        let db = Database::open(DatabaseConfig::default()).unwrap();
        {
            let tx = db.transaction(TransactionType::Write).unwrap();
            tx.concepts().put_entity_type("person").unwrap();
        }
        let read = db.transaction(TransactionType::Read).unwrap();
        assert!(read.concepts().get_type("person").is_none());
    }

    #[test]
    fn rejected_commit_leaves_snapshot_unchanged() {
        let db = Database::open(DatabaseConfig::default()).unwrap();
        let tx = db.transaction(TransactionType::Write).unwrap();
        let person = tx.concepts().put_entity_type("person").unwrap();
        let email = tx.concepts().put_attribute_type("email", ValueType::String).unwrap();
        person.set_owns(&tx, &email, true).unwrap();
        person.create(&tx).unwrap();

        match tx.commit() {
            Err(DbError::Validation(ValidationError::Rejected { violations })) => {
                assert_eq!(violations.len(), 1);
                assert!(violations[0].to_string().contains("missing key 'email'"));
            }
            other => panic!("expected rejection, got {other:?}"),
        }
        let read = db.transaction(TransactionType::Read).unwrap();
        assert!(read.concepts().get_type("person").is_none());
        assert!(db.transaction(TransactionType::Write).is_ok());
    }

    #[test]
    fn read_transactions_cannot_write() {
        let db = Database::open(DatabaseConfig::default()).unwrap();
        let tx = db.transaction(TransactionType::Read).unwrap();
        let entity = tx.concepts().root_entity_type().unwrap().unwrap();
        let err = entity.set_abstract(&tx, false).unwrap_err();
        assert!(err.to_string().contains("set_abstract requires a write transaction"));
        assert!(matches!(
            tx.commit(),
            Err(DbError::Transaction(TransactionError::ReadOnly { .. }))
        ));
    }
}
