//! Error types for GroupKV
//!
//! Provides a unified error type for the shard engines and the sharding layer.

use std::fmt;

use thiserror::Error;

/// Result type alias using GroupKvError
pub type Result<T> = std::result::Result<T, GroupKvError>;

/// Unified error type for GroupKV operations
#[derive(Debug, Error)]
pub enum GroupKvError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Engine Errors
    // -------------------------------------------------------------------------
    /// Damaged on-disk state. Opening a shard that reports this triggers one
    /// recovery pass.
    #[error("Corruption detected: {0}")]
    Corruption(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Key not found")]
    KeyNotFound,

    // -------------------------------------------------------------------------
    // Sharding Errors
    // -------------------------------------------------------------------------
    #[error("Failed to open shard {shard}: {source}")]
    ShardOpen {
        shard: usize,
        #[source]
        source: Box<GroupKvError>,
    },

    #[error("Batch commit failed on shard {shard}: {source}")]
    Write {
        shard: usize,
        #[source]
        source: Box<GroupKvError>,
    },

    #[error("Unsupported operation: {0}")]
    Unsupported(&'static str),

    #[error("{} shard(s) failed: {}", .0.len(), ShardFailures(.0))]
    Close(Vec<ShardFailure>),

    // -------------------------------------------------------------------------
    // Serialization Errors
    // -------------------------------------------------------------------------
    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),

    // -------------------------------------------------------------------------
    // Producer Errors
    // -------------------------------------------------------------------------
    #[error("Record queue is closed")]
    QueueClosed,
}

impl GroupKvError {
    /// True for the distinguished corruption condition
    pub fn is_corruption(&self) -> bool {
        matches!(self, GroupKvError::Corruption(_))
    }

    /// True for a single-key miss
    pub fn is_not_found(&self) -> bool {
        matches!(self, GroupKvError::KeyNotFound)
    }

    /// Shard indexes named by an aggregate close error
    pub fn failed_shards(&self) -> Vec<usize> {
        match self {
            GroupKvError::Close(failures) => failures.iter().map(|f| f.shard).collect(),
            GroupKvError::ShardOpen { shard, .. } | GroupKvError::Write { shard, .. } => {
                vec![*shard]
            }
            _ => Vec::new(),
        }
    }
}

impl From<bincode::Error> for GroupKvError {
    fn from(e: bincode::Error) -> Self {
        GroupKvError::Serialization(e.to_string())
    }
}

/// One shard's failure inside an aggregate error
#[derive(Debug)]
pub struct ShardFailure {
    pub shard: usize,
    pub error: GroupKvError,
}

impl fmt::Display for ShardFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "shard {}: {}", self.shard, self.error)
    }
}

struct ShardFailures<'a>(&'a [ShardFailure]);

impl fmt::Display for ShardFailures<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, failure) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}", failure)?;
        }
        Ok(())
    }
}
