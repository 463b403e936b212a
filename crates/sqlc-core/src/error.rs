//! Error types for statement compilation.

use crate::condition::Operator;

/// Errors that can occur while compiling a statement.
///
/// All of them point at a statement-assembly mistake in the calling code;
/// none are recoverable by retrying.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompileError {
    /// Two joins were declared with the same alias.
    #[error("join alias already used: {alias} ({table})")]
    JoinAliasCollision {
        /// The colliding alias.
        alias: String,
        /// The table of the join that collided.
        table: String,
    },

    /// A join on-term uses an operator that has no inline form.
    #[error("unsupported operator {operator} in ON clause of join {alias}")]
    UnsupportedJoinOperator {
        /// Alias of the join.
        alias: String,
        /// The offending operator.
        operator: Operator,
    },

    /// Every letter `a..=z` is taken by a join alias.
    #[error("no free alias left for base table {0}")]
    AliasExhausted(String),

    /// Join on-conditions reference each other in a cycle.
    #[error("circular join dependency between aliases: {}", .0.join(", "))]
    CircularJoinDependency(Vec<String>),

    /// A union needs at least two member queries.
    #[error("union needs at least two queries, got {0}")]
    UnionMemberCount(usize),

    /// A bulk insert row does not match the column set of the first row.
    #[error("insert rows inconsistency at row {row}")]
    RowInconsistency {
        /// Zero-based index of the offending row.
        row: usize,
    },

    /// A bulk insert was compiled without any rows.
    #[error("bulk insert into {0} has no rows")]
    NoRows(String),

    /// A correlated JSON sub-select selects fewer than two fields.
    #[error("JSON sub-select {name} needs at least two fields, got {count}")]
    InsufficientJsonFields {
        /// Output name of the sub-select.
        name: String,
        /// Number of selected fields.
        count: usize,
    },

    /// A `JSON_TABLE` source lacks its document field or its columns.
    #[error("JSON table {0} needs a source field and at least one column")]
    IncompleteJsonTable(String),

    /// An insert or update has nothing to write.
    #[error("no fields to write into {0}")]
    EmptyFieldList(String),

    /// The same field appears twice in an insert or update field list.
    #[error("duplicate field: {0}")]
    DuplicateField(String),

    /// An explicit upsert field is not part of the inserted fields.
    #[error("invalid update duplicate field: {0}")]
    InvalidUpsertField(String),

    /// Two conditions on the same field cannot both apply.
    #[error("where clause operator incompatible on same field ({field}): {current} {new}")]
    IncompatibleOperator {
        /// Field both conditions filter on.
        field: String,
        /// Operator seen earlier.
        current: Operator,
        /// Operator that conflicts with it.
        new: Operator,
    },

    /// An `IN`/`NOT IN` condition was given an empty value list.
    #[error("empty value list for {operator} on field {field}")]
    EmptyInList {
        /// Field of the condition.
        field: String,
        /// `IN` or `NOT IN`.
        operator: Operator,
    },
}

/// Result type alias for compilation.
pub type Result<T> = std::result::Result<T, CompileError>;
