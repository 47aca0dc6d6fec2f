//! The database: committed graph snapshot, transactions and the validation pool.

pub mod config;
pub mod transaction;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::error::{ConfigError, DbResult, TransactionError};
use crate::graph::Graph;

pub use config::DatabaseConfig;
pub use transaction::{Transaction, TransactionType};

/// An embedded, in-memory concept database.
///
/// Readers share the committed snapshot. A single writer works on a private
/// copy that replaces the snapshot only when its commit passes validation.
pub struct Database {
    config: DatabaseConfig,
    committed: RwLock<Arc<Graph>>,
    writer: AtomicBool,
    pool: ThreadPool,
}

impl Database {
    /// Open a database, bootstrapping the root types unless disabled.
    pub fn open(config: DatabaseConfig) -> DbResult<Self> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(config.validation_threads)
            .thread_name(|i| format!("conceptdb-validate-{i}"))
            .build()
            .map_err(|e| ConfigError::ThreadPool {
                message: e.to_string(),
            })?;
        let graph = Graph::new();
        if config.bootstrap {
            graph.bootstrap();
        }
        tracing::info!(
            validation_threads = pool.current_num_threads(),
            bootstrap = config.bootstrap,
            "opened database"
        );
        Ok(Self {
            config,
            committed: RwLock::new(Arc::new(graph)),
            writer: AtomicBool::new(false),
            pool,
        })
    }

    /// Open a transaction. Only one write transaction may be open at a time.
    pub fn transaction(&self, kind: TransactionType) -> DbResult<Transaction<'_>> {
        let graph = match kind {
            TransactionType::Read => self.snapshot(),
            TransactionType::Write => {
                if self
                    .writer
                    .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                    .is_err()
                {
                    return Err(TransactionError::WriterActive.into());
                }
                Arc::new(self.snapshot().as_ref().clone())
            }
        };
        tracing::debug!(?kind, "opened transaction");
        Ok(Transaction::new(self, kind, graph))
    }

    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    /// The committed graph.
    pub fn snapshot(&self) -> Arc<Graph> {
        Arc::clone(&self.committed.read().expect("snapshot lock poisoned"))
    }

    pub(crate) fn install(&self, graph: Arc<Graph>) {
        *self.committed.write().expect("snapshot lock poisoned") = graph;
    }

    pub(crate) fn release_writer(&self) {
        self.writer.store(false, Ordering::Release);
    }

    pub(crate) fn pool(&self) -> &ThreadPool {
        &self.pool
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("config", &self.config)
            .field("writer_active", &self.writer.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;

    #[test]
    fn only_one_writer_at_a_time() {
        let db = Database::open(DatabaseConfig::default()).unwrap();
        let first = db.transaction(TransactionType::Write).unwrap();
        assert!(matches!(
            db.transaction(TransactionType::Write),
            Err(DbError::Transaction(TransactionError::WriterActive))
        ));
        assert!(db.transaction(TransactionType::Read).is_ok());
        drop(first);
        assert!(db.transaction(TransactionType::Write).is_ok());
    }

    #[test]
    fn validation_pool_honours_config() {
        let db = Database::open(DatabaseConfig {
            validation_threads: 2,
            ..DatabaseConfig::default()
        })
        .unwrap();
        assert_eq!(db.pool().current_num_threads(), 2);
    }

    #[test]
    fn bootstrap_can_be_disabled() {
        let db = Database::open(DatabaseConfig {
            bootstrap: false,
            ..DatabaseConfig::default()
        })
        .unwrap();
        assert!(db.snapshot().types().is_empty());
    }
}
