// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for td-core operations.

use thiserror::Error;

/// All possible errors that can occur in td-core operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("duplicate item id: {0}\n  hint: an item with this id is already stored")]
    DuplicateId(String),

    #[error("unknown item id: {0}")]
    UnknownId(String),

    #[error("storage read failed: {0}")]
    StorageReadFailed(String),

    #[error("storage write failed: {0}")]
    StorageWriteFailed(String),

    #[error("invalid importance: '{0}'\n  hint: valid values are: low, normal, high")]
    InvalidImportance(String),

    #[error("{0}")]
    InvalidInput(String),
}

impl Error {
    /// Wraps a storage error raised while reading.
    pub fn read(err: impl std::fmt::Display) -> Self {
        Error::StorageReadFailed(err.to_string())
    }

    /// Wraps a storage error raised while writing.
    pub fn write(err: impl std::fmt::Display) -> Self {
        Error::StorageWriteFailed(err.to_string())
    }
}

/// A specialized Result type for td-core operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
