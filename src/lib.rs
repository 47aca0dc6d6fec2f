// thiserror's #[error("...{field}...")] format strings reference struct fields,
// but the compiler doesn't see through the derive macro and reports false positives.
#![allow(unused_assignments)]

//! # conceptdb
//!
//! An embedded, in-memory typed graph database: a schema-enforcing concept
//! layer over a property graph, plus the answer plumbing used to merge rule
//! answers back into caller bindings.
//!
//! ## Architecture
//!
//! - **Graph store** (`graph`): petgraph type and thing graphs with concurrent label/value indexes
//! - **Concepts** (`concept`): typed wrappers, the per-transaction cache and commit-time validation
//! - **Rules** (`logic`, `pattern`): `when`/`then` conjunctions stored with the schema
//! - **Answers** (`answer`, `reasoner`): concept maps, variable mappings and the aggregator
//! - **Database** (`database`): snapshot isolation with a single writer and a rayon validation pool
//!
//! ## Library usage
//!
//! ```no_run
//! use conceptdb::concept::{ThingConcept, TypeConcept};
//! use conceptdb::database::{Database, DatabaseConfig, TransactionType};
//! use conceptdb::graph::ValueType;
//!
//! let db = Database::open(DatabaseConfig::default()).unwrap();
//! let tx = db.transaction(TransactionType::Write).unwrap();
//! let person = tx.concepts().put_entity_type("person").unwrap();
//! let name = tx.concepts().put_attribute_type("name", ValueType::String).unwrap();
//! person.set_owns(&tx, &name, false).unwrap();
//! let alice = person.create(&tx).unwrap();
//! alice.has(&tx, &name.put(&tx, "alice").unwrap()).unwrap();
//! tx.commit().unwrap();
//! ```

pub mod answer;
pub mod concept;
pub mod database;
pub mod error;
pub mod graph;
pub mod logic;
pub mod pattern;
pub mod reasoner;
pub mod schema;

pub use answer::ConceptMap;
pub use concept::{Concept, Thing, ThingType};
pub use database::{Database, DatabaseConfig, Transaction, TransactionType};
pub use error::{DbError, DbResult};
