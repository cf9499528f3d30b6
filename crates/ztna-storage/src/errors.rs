//! Storage error types.

use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    /// RocksDB reported a failure
    #[error("Database error: {0}")]
    Database(String),

    /// A key or value could not be encoded
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A stored value no longer matches its type (schema drift or corruption)
    #[error("Deserialization error: {0}")]
    Deserialization(String),

    /// Column family not registered in `all_column_families`
    #[error("Unknown column family: {0}")]
    UnknownColumnFamily(String),

    /// A thread panicked while holding the read-then-delete lock
    #[error("Storage lock poisoned")]
    LockPoisoned,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations
pub type Result<T> = std::result::Result<T, StorageError>;
