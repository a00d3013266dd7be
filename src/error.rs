//! Error types for record access operations.

/// Result alias used throughout the crate.
pub type Result<T, E = ModelError> = std::result::Result<T, E>;

/// Errors produced while building or executing generated statements.
///
/// Errors are returned to the immediate caller and never logged here. Mapping
/// them onto external status codes is the job of whatever transport sits on top.
#[derive(Debug, thiserror::Error)]
#[must_use = "record access errors should be handled"]
pub enum ModelError {
    /// The database handle was closed (or never opened) when it was needed.
    #[error("no database connection")]
    NoDatabaseConnection,

    /// Insert was called without any populated column.
    #[error("no insert record provided")]
    NoInsertRecordProvided,

    /// Update was called with an empty SET list.
    #[error("no update record provided")]
    NoUpdateRecordProvided,

    /// The operand does not fit the operator (e.g. `IN` with a scalar).
    #[error("invalid operand for `{field} {operator}`")]
    InvalidOperandKind { field: String, operator: String },

    /// Operator text that does not name a known operator.
    #[error("invalid sql operator: {0}")]
    UnsupportedOperator(String),

    /// A combinator on the first condition, or a missing one on a later condition.
    #[error("invalid combine for condition on `{field}`")]
    InvalidCombine { field: String },

    /// A column name that is not a plain identifier.
    #[error("invalid identifier: {0:?}")]
    InvalidIdentifier(String),

    /// A record type declares the same column twice.
    #[error("duplicate column: {0}")]
    DuplicateColumn(&'static str),

    /// A record type whose declared columns are all ignored.
    #[error("record declares no selectable columns")]
    NoSelectableColumns,

    /// Malformed sort entry.
    #[error("invalid sort entry: {0:?}")]
    InvalidSort(String),

    /// Limit outside `1..=MAX_LIMIT` (zero is accepted and means unbounded).
    #[error("limit must be a value 1 to {max}, got {0}", max = crate::model::MAX_LIMIT)]
    LimitOutOfRange(u32),

    /// Records in one batch populate different column sets.
    #[error("records in an insert batch populate different columns")]
    MismatchedColumns,

    /// The caller cancelled the context.
    #[error("operation cancelled")]
    Cancelled,

    /// The caller's deadline elapsed.
    #[error("deadline exceeded")]
    DeadlineExceeded,

    /// Zero rows where exactly one was expected.
    #[error("record not found")]
    NotFound,

    /// More than one row where exactly one was expected.
    #[error("found multiple records")]
    MultipleRecords,

    /// Timestamp components that do not form a valid instant.
    #[error("invalid timestamp: {secs}.{nsecs}")]
    InvalidTimestamp { secs: i64, nsecs: u32 },

    /// The driver rejected or failed the statement.
    ///
    /// Only the driver message is displayed; the statement text and bound values
    /// are left out.
    #[error("sql execution failed: {}", driver_message(.0))]
    Execution(#[from] rusqlite::Error),
}

/// Driver error text without the offending statement.
fn driver_message(err: &rusqlite::Error) -> String {
    match err {
        rusqlite::Error::SqlInputError { msg, .. } => msg.clone(),
        other => other.to_string(),
    }
}

impl ModelError {
    /// Returns whether the error was raised before any statement reached the database.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::NoInsertRecordProvided
                | Self::NoUpdateRecordProvided
                | Self::InvalidOperandKind { .. }
                | Self::UnsupportedOperator(_)
                | Self::InvalidCombine { .. }
                | Self::InvalidIdentifier(_)
                | Self::DuplicateColumn(_)
                | Self::NoSelectableColumns
                | Self::InvalidSort(_)
                | Self::LimitOutOfRange(_)
                | Self::MismatchedColumns
        )
    }
}
