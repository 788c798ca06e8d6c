//! Command Layer
//!
//! This module maps command names and string arguments onto the storage
//! contract. Every command is a small stateless object holding a shared
//! handle to the store; all state lives in the store.
//!
//! ## Architecture
//!
//! ```text
//! Client Request
//!       │
//!       ▼
//! ┌─────────────────┐
//! │  RESP Parser    │  (protocol module)
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │ CommandHandler  │  name → Box<dyn Command>
//! └────────┬────────┘
//!          │ execute(args)
//!          ▼
//! ┌─────────────────┐
//! │  Set / Lpush /  │  validate arity, check kinds,
//! │  Hkeys / ...    │  build the new value
//! └────────┬────────┘
//!          │ get / put / lock
//!          ▼
//! ┌─────────────────┐
//! │    Storage      │  (storage module)
//! └─────────────────┘
//! ```
//!
//! ## Supported Commands
//!
//! - Strings: `SET`, `GET`, `STRLEN`
//! - Keys: `DEL`, `EXPIRE`, `TTL`, `PERSIST`, `KEYS`, `TYPE`
//! - Lists: `LPUSH`, `RPUSH`, `LPOP`, `RPOP`, `LLEN`, `LINDEX`, `LRANGE`
//! - Hashes: `HSET`, `HGET`, `HDEL`, `HKEYS`, `HVALS`
//! - Server: `PING`, `HELP`

pub mod handler;
pub mod hashes;
pub mod keys;
pub mod lists;
pub mod server;
pub mod strings;

use crate::error::{Error, Result};

pub use handler::CommandHandler;

/// Outcome of a single command call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandResult {
    /// Succeeded with nothing to report.
    Ok,
    String(String),
    Int(i64),
    List(Vec<String>),
    /// Key absent, expired, or nothing to return.
    Nil,
    Error(Error),
}

impl From<Error> for CommandResult {
    fn from(err: Error) -> Self {
        CommandResult::Error(err)
    }
}

impl From<Result<CommandResult>> for CommandResult {
    fn from(result: Result<CommandResult>) -> Self {
        result.unwrap_or_else(CommandResult::Error)
    }
}

/// A named operation over the store.
pub trait Command: Send + Sync {
    /// Canonical uppercase keyword.
    fn name(&self) -> &'static str;

    /// Usage line followed by a short description.
    fn help(&self) -> &'static str;

    /// Runs the command. Never panics on bad input; failures come back as
    /// [`CommandResult::Error`].
    fn execute(&self, args: &[String]) -> CommandResult;
}

/// Requires exactly `n` arguments.
pub(crate) fn exact(args: &[String], n: usize) -> Result<()> {
    if args.len() == n {
        Ok(())
    } else {
        Err(Error::WrongArgsNumber)
    }
}

/// Requires `n` or more arguments.
pub(crate) fn at_least(args: &[String], n: usize) -> Result<()> {
    if args.len() >= n {
        Ok(())
    } else {
        Err(Error::WrongArgsNumber)
    }
}

pub(crate) fn parse_int(arg: &str) -> Result<i64> {
    arg.parse().map_err(|_| Error::InvalidInteger)
}
