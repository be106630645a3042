//! # Error Types
//!
//! Errors raised by the storage path and by configuration loading.
//!
//! Storage errors fall into three groups:
//! * **Format errors** (`BadMagic`, `UnsupportedVersion`, `Corrupt`, `ShortRead`) are
//!   fatal for the single chunk or region being processed and are never replaced
//!   with default data.
//! * **I/O errors** (`Io`) are fatal for the operation in progress. Nothing retries.
//! * **Desynchronisation** (`Desynchronized`) is reported by a region whose in-memory
//!   seek table may no longer match the disk after a failed write. The region must
//!   be reloaded before it is used again.
//!
//! * **Panics** (`Panicked`) of a chunk task are caught on the worker and reported
//!   against the chunk it was working on.
//!
//! Lock-count violations in the region manager are programming errors and panic
//! instead of producing a value here.

use std::path::PathBuf;

use thiserror::Error;

/// Errors produced while reading or writing region files and chunk records.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("region file {path:?} has an invalid magic number")]
    BadMagic { path: PathBuf },

    #[error("region file version {found} is not supported (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },

    #[error("corrupt chunk data: {0}")]
    Corrupt(String),

    #[error("short read: needed {needed} bytes but only {available} were available")]
    ShortRead { needed: usize, available: usize },

    #[error("chunk payload needs {blocks} blocks which does not fit a seek table entry")]
    ChunkTooLarge { blocks: usize },

    #[error("region file {path:?} is out of sync with disk after a failed write")]
    Desynchronized { path: PathBuf },

    /// The worker processing a chunk panicked. Whatever the task was doing with
    /// the chunk did not happen.
    #[error("worker panicked: {0}")]
    Panicked(String),
}

/// Convenience alias used throughout the storage modules.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors produced while loading an [`EngineConfig`](crate::config::EngineConfig).
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}
