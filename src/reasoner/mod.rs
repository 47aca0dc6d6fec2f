//! Rule-resolution primitives.
//!
//! The search strategy deciding which rules to try lives outside this crate.
//! What is here is the per-invocation bookkeeping: translating bindings
//! between the caller's variables and a rule body's variables, and merging a
//! rule-body answer back into the caller's answer.

pub mod aggregator;
pub mod mapping;

pub use aggregator::{Aggregated, Aggregator, MergePolicy};
pub use mapping::{Mapping, UnTransform, Unifier};
