//! Error types shared by the store and the command layer.
//!
//! The `Display` strings are what a client sees on the wire, so they carry
//! the Redis-style `ERR` / `WRONGTYPE` prefixes.

use std::sync::PoisonError;
use thiserror::Error;

/// Failures raised by a storage backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    /// A thread panicked while holding a shard lock.
    #[error("ERR storage lock poisoned")]
    LockPoisoned,

    /// Any other backend failure.
    #[error("ERR storage failure: {0}")]
    Backend(String),
}

/// Errors surfaced by commands.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Argument count or shape does not match the command's contract.
    #[error("ERR wrong number of arguments")]
    WrongArgsNumber,

    /// The key holds a value of a different kind than the operation expects.
    #[error("WRONGTYPE Operation against a key holding the wrong kind of value")]
    WrongTypeOp,

    /// A numeric argument could not be parsed.
    #[error("ERR value is not an integer or out of range")]
    InvalidInteger,

    /// No command is registered under this name.
    #[error("ERR unknown command '{0}'")]
    UnknownCommand(String),

    /// Passed through verbatim from the store.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl<T> From<PoisonError<T>> for Error {
    fn from(_: PoisonError<T>) -> Self {
        Error::Storage(StorageError::LockPoisoned)
    }
}

/// Result alias used across the store and command layer.
pub type Result<T> = std::result::Result<T, Error>;
