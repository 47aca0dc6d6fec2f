//! Rich diagnostic error types for conceptdb.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]` derives,
//! providing error codes and help text so callers know which label, kind or
//! operation was at fault.

use miette::Diagnostic;
use thiserror::Error;

use crate::concept::validate::Violation;

/// Top-level error type for conceptdb.
///
/// Each variant wraps a subsystem-specific error, preserving the full
/// diagnostic chain through to the user.
#[derive(Debug, Error, Diagnostic)]
pub enum DbError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Concept(#[from] ConceptError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Pattern(#[from] PatternError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Reasoner(#[from] ReasonerError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Transaction(#[from] TransactionError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Schema(#[from] SchemaError),
}

// ---------------------------------------------------------------------------
// Store errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum StoreError {
    #[error("type vertex not found: {iid}")]
    #[diagnostic(
        code(conceptdb::store::type_not_found),
        help(
            "No type vertex with this IID exists in the transaction's graph snapshot. \
             IIDs are only meaningful inside the transaction that produced them."
        )
    )]
    TypeNotFound { iid: String },

    #[error("thing vertex not found: {iid}")]
    #[diagnostic(
        code(conceptdb::store::thing_not_found),
        help(
            "No thing vertex with this IID exists in the transaction's graph snapshot. \
             Concepts never cross transaction boundaries; re-read the thing in this transaction."
        )
    )]
    ThingNotFound { iid: String },
}

// ---------------------------------------------------------------------------
// Concept errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ConceptError {
    #[error("unsupported operation: {operation} does not accept value kind '{kind}'")]
    #[diagnostic(
        code(conceptdb::concept::unsupported_operation),
        help("Supported value kinds are: boolean, long, double, string, datetime.")
    )]
    UnsupportedOperation { operation: String, kind: String },

    #[error("invalid concept casting: cannot cast {from} to {to}")]
    #[diagnostic(
        code(conceptdb::concept::invalid_casting),
        help(
            "The concept is a different variant than the one requested. \
             Inspect it with the matching `is_*` method before casting."
        )
    )]
    InvalidConceptCasting { from: String, to: String },

    #[error("invalid type label: '{label}'")]
    #[diagnostic(
        code(conceptdb::concept::invalid_label),
        help("Type labels must be non-empty and must not contain whitespace.")
    )]
    InvalidLabel { label: String },

    #[error("cannot create an instance of abstract type '{label}'")]
    #[diagnostic(
        code(conceptdb::concept::abstract_instantiation),
        help("Unset the abstract flag, or instantiate a concrete subtype of '{label}'.")
    )]
    AbstractInstantiation { label: String },

    #[error("attribute type '{label}' holds {expected} values, got {found}")]
    #[diagnostic(
        code(conceptdb::concept::value_type_mismatch),
        help("Convert the value to the attribute type's declared value type.")
    )]
    ValueTypeMismatch {
        label: String,
        expected: String,
        found: String,
    },

    #[error("attribute type '{label}' has no value type")]
    #[diagnostic(
        code(conceptdb::concept::no_value_type),
        help("Only the root attribute type lacks a value type; put values on one of its subtypes.")
    )]
    NoValueType { label: String },

    #[error("type '{owner}' does not own attribute type '{attribute}'")]
    #[diagnostic(
        code(conceptdb::concept::cannot_own),
        help("Declare the ownership with `set_owns` on '{owner}' or one of its supertypes.")
    )]
    CannotOwn { owner: String, attribute: String },

    #[error("type '{label}' cannot have '{sup}' as supertype: {reason}")]
    #[diagnostic(
        code(conceptdb::concept::invalid_supertype),
        help("A supertype must be of the same kind, must not be a subtype of the type, and attribute supertypes must share its value type.")
    )]
    InvalidSupertype {
        label: String,
        sup: String,
        reason: String,
    },

    #[error("attribute type '{attribute}' with value type {value_type} cannot be used as a key")]
    #[diagnostic(
        code(conceptdb::concept::invalid_key_value_type),
        help("Key attribute types must hold long, string or datetime values.")
    )]
    InvalidKeyValueType {
        attribute: String,
        value_type: String,
    },

    #[error("root type '{label}' cannot be modified by {operation}")]
    #[diagnostic(
        code(conceptdb::concept::root_modification),
        help("Root types are bootstrapped by the database. Define a subtype instead.")
    )]
    RootModification { label: String, operation: String },
}

// ---------------------------------------------------------------------------
// Pattern errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum PatternError {
    #[error("invalid constraint casting: cannot cast {from} to {to}")]
    #[diagnostic(
        code(conceptdb::pattern::invalid_casting),
        help("Check `is_type()` / `is_thing()` before casting a constraint.")
    )]
    InvalidCasting { from: String, to: String },
}

// ---------------------------------------------------------------------------
// Reasoner errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ReasonerError {
    #[error("illegal state: {message}")]
    #[diagnostic(
        code(conceptdb::reasoner::illegal_state),
        help(
            "The variable mapping for a rule invocation produced an impossible answer. \
             This is an internal bug in the mapping strategy; report it with the rule and query."
        )
    )]
    IllegalState { message: String },

    #[error("variable mapping is not injective: {first} and {second} both map to {target}")]
    #[diagnostic(
        code(conceptdb::reasoner::non_injective_mapping),
        help("A mapping renames caller variables one-to-one. Use a Unifier when several body variables share one caller variable.")
    )]
    NonInjectiveMapping {
        first: String,
        second: String,
        target: String,
    },

    #[error("inconsistent binding for {variable}: caller bound {expected}, rule answer bound {found}")]
    #[diagnostic(
        code(conceptdb::reasoner::inconsistent_binding),
        help("Raised only under MergePolicy::RejectConflicts. Use MergePolicy::Overlay to let the rule answer win.")
    )]
    InconsistentBinding {
        variable: String,
        expected: String,
        found: String,
    },
}

// ---------------------------------------------------------------------------
// Transaction errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum TransactionError {
    #[error("{operation} requires a write transaction")]
    #[diagnostic(
        code(conceptdb::transaction::read_only),
        help("Open the transaction with TransactionType::Write.")
    )]
    ReadOnly { operation: String },

    #[error("another write transaction is already open")]
    #[diagnostic(
        code(conceptdb::transaction::writer_active),
        help("Commit or drop the open write transaction before starting a new one.")
    )]
    WriterActive,
}

// ---------------------------------------------------------------------------
// Validation errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ValidationError {
    #[error("commit rejected: {} violation(s)\n{}", .violations.len(), summarize(.violations))]
    #[diagnostic(
        code(conceptdb::validation::rejected),
        help("Fix every listed concept and commit again. The committed data is unchanged.")
    )]
    Rejected { violations: Vec<Violation> },
}

fn summarize(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(|v| format!("  - {v}"))
        .collect::<Vec<_>>()
        .join("\n")
}

// ---------------------------------------------------------------------------
// Config errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    #[diagnostic(
        code(conceptdb::config::io),
        help("Check that the file exists and is readable.")
    )]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {message}")]
    #[diagnostic(
        code(conceptdb::config::parse),
        help("The config is TOML with optional keys `validation_threads` and `bootstrap`.")
    )]
    Parse { message: String },

    #[error("failed to build the validation thread pool: {message}")]
    #[diagnostic(
        code(conceptdb::config::thread_pool),
        help("Lower `validation_threads`, or set it to 0 to use one thread per core.")
    )]
    ThreadPool { message: String },
}

// ---------------------------------------------------------------------------
// Schema definition errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum SchemaError {
    #[error("failed to read schema file {path}: {source}")]
    #[diagnostic(
        code(conceptdb::schema::io),
        help("Check that the file exists and is readable.")
    )]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid schema definition: {message}")]
    #[diagnostic(
        code(conceptdb::schema::parse),
        help("Schema files are TOML with [[attribute]], [[entity]] and [[relation]] tables.")
    )]
    Parse { message: String },

    #[error("type '{label}' refers to unknown type '{reference}'")]
    #[diagnostic(
        code(conceptdb::schema::unknown_type),
        help("Define '{reference}' in the same schema file, or create it before loading.")
    )]
    UnknownType { label: String, reference: String },
}

/// Convenience alias for functions returning conceptdb results.
pub type DbResult<T> = std::result::Result<T, DbError>;
