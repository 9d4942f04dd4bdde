//! Error taxonomy for the storage engine.
//!
//! One enum covers every failure category the engine can surface: timeouts,
//! not-ready, busy/locked, SQL-level errors, I/O/corruption, queue-cleared,
//! and migration failures. Kept as a hand written enum with manual
//! `Display`/`Error` impls rather than a derive-macro error crate.

use std::fmt;

/// Errors produced by the storage engine.
#[derive(Debug)]
pub enum EngineError {
    /// A per-operation or queue-admission deadline expired. Never retried.
    Timeout { operation: String, elapsed_ms: u64 },

    /// The connection is absent and `graceful_degradation` is off.
    NotInitialized,

    /// `SQLITE_BUSY` / "database is locked" / "database is busy". Retryable.
    Busy(String),

    /// Syntax, constraint, or missing-table error from the driver. Not retryable.
    Sql(String),

    /// File-system or database corruption. Not retryable.
    Io(String),

    /// `close()` happened while this item was still pending in the write queue.
    QueueCleared,

    /// A migration failed partway through. `version`/`name` identify the
    /// migration that raised `cause`; the manager has already attempted the
    /// reverse sweep by the time this is returned.
    MigrationFailed {
        version: i64,
        name: String,
        cause: String,
    },

    /// `rollback_to` was asked to roll back a migration with no `down`.
    MissingDown { version: i64, name: String },

    /// A duplicate migration version was registered.
    DuplicateMigrationVersion(i64),

    /// `with_retry` exhausted its attempt budget.
    RetriesExhausted { attempts: u32, cause: Box<EngineError> },
}

impl EngineError {
    pub fn timeout(operation: impl Into<String>, elapsed_ms: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            elapsed_ms,
        }
    }

    /// Lowercased message used by the retry classifier.
    pub(crate) fn classifier_text(&self) -> String {
        self.to_string().to_lowercase()
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout {
                operation,
                elapsed_ms,
            } => write!(f, "operation '{operation}' timed out after {elapsed_ms}ms"),
            Self::NotInitialized => write!(f, "engine is not initialized"),
            Self::Busy(msg) => write!(f, "{msg}"),
            Self::Sql(msg) => write!(f, "{msg}"),
            Self::Io(msg) => write!(f, "{msg}"),
            Self::QueueCleared => write!(f, "queued operation cancelled: queue cleared"),
            Self::MigrationFailed {
                version,
                name,
                cause,
            } => write!(f, "migration {version} ({name}) failed: {cause}"),
            Self::MissingDown { version, name } => {
                write!(f, "migration {version} ({name}) has no down() to roll back")
            }
            Self::DuplicateMigrationVersion(v) => {
                write!(f, "duplicate migration version {v}")
            }
            Self::RetriesExhausted { attempts, cause } => {
                write!(f, "operation failed after {attempts} attempts: {cause}")
            }
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::RetriesExhausted { cause, .. } => Some(cause.as_ref()),
            _ => None,
        }
    }
}

/// Classifies a raw SQLite error message: case-insensitive substring match
/// against the busy/locked vocabulary.
pub(crate) fn message_is_retryable(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("sqlite_busy")
        || lower.contains("database is locked")
        || lower.contains("database is busy")
}

impl From<rusqlite::Error> for EngineError {
    fn from(err: rusqlite::Error) -> Self {
        let msg = err.to_string();
        if message_is_retryable(&msg) {
            Self::Busy(msg)
        } else {
            Self::Sql(msg)
        }
    }
}

impl From<std::io::Error> for EngineError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_busy_classification_is_case_insensitive() {
        assert!(message_is_retryable("SQLITE_BUSY: database is locked"));
        assert!(message_is_retryable("Database Is Locked"));
        assert!(message_is_retryable("the database is busy right now"));
        assert!(!message_is_retryable("syntax error near SELECT"));
        assert!(!message_is_retryable("UNIQUE constraint failed: t.id"));
    }

    #[test]
    fn test_from_rusqlite_error_classifies_busy() {
        let err = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(5), // SQLITE_BUSY
            Some("database is locked".to_string()),
        );
        assert!(matches!(EngineError::from(err), EngineError::Busy(_)));
    }

    #[test]
    fn test_retries_exhausted_message_format() {
        let err = EngineError::RetriesExhausted {
            attempts: 3,
            cause: Box::new(EngineError::Busy("database is locked".into())),
        };
        assert!(err.to_string().contains("after 3 attempts"));
    }
}
