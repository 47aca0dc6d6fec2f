//! Query answers.

pub mod concept_map;

pub use concept_map::ConceptMap;
