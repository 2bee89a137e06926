//! Error kinds for the presence engine, following §7 of the design: ingest
//! malformations are not errors (they are silently dropped), but KV backend
//! failures and invariant breakage are unrecoverable and abort the daemon.

use std::fmt;

#[derive(Debug)]
pub enum EngineError {
    /// The durable KV backend reported a failure. Per §7, treated as an
    /// unrecoverable bug — the caller should log and abort.
    Store(String),
    /// An invariant the engine relies on was violated, e.g. `find_last_open`
    /// found no open interval for a person it was told to close.
    InvariantViolation(&'static str),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::Store(msg) => write!(f, "KV store error: {msg}"),
            EngineError::InvariantViolation(what) => {
                write!(f, "invariant violation: {what}")
            }
        }
    }
}

impl std::error::Error for EngineError {}

impl From<redb::Error> for EngineError {
    fn from(e: redb::Error) -> Self {
        EngineError::Store(e.to_string())
    }
}

impl From<redb::TransactionError> for EngineError {
    fn from(e: redb::TransactionError) -> Self {
        EngineError::Store(e.to_string())
    }
}

impl From<redb::TableError> for EngineError {
    fn from(e: redb::TableError) -> Self {
        EngineError::Store(e.to_string())
    }
}

impl From<redb::StorageError> for EngineError {
    fn from(e: redb::StorageError) -> Self {
        EngineError::Store(e.to_string())
    }
}

impl From<redb::CommitError> for EngineError {
    fn from(e: redb::CommitError) -> Self {
        EngineError::Store(e.to_string())
    }
}

impl From<redb::DatabaseError> for EngineError {
    fn from(e: redb::DatabaseError) -> Self {
        EngineError::Store(e.to_string())
    }
}
