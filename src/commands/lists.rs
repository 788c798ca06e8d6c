//! List commands: `LPUSH`, `RPUSH`, `LPOP`, `RPOP`, `LLEN`, `LINDEX`, `LRANGE`.
//!
//! Pushes type-check the current value and build the merged list as two
//! separate store calls, so they run under the store-wide lock. Pops fit in a
//! single `put` updater. A list that becomes empty is removed from the store.

use crate::commands::{at_least, exact, parse_int, Command, CommandResult};
use crate::error::{Error, Result};
use crate::storage::{Storage, StorageGuard, Value, ValueData};
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum End {
    Head,
    Tail,
}

fn as_list(value: &Value) -> Result<&VecDeque<String>> {
    match value.data() {
        ValueData::List(items) => Ok(items),
        ValueData::String(_) | ValueData::Hash(_) => Err(Error::WrongTypeOp),
    }
}

/// Pushes `values` one at a time onto `end` of the list at `key`.
///
/// Each value becomes the new head (or tail), so `LPUSH k a b` onto `[x]`
/// gives `[b, a, x]`. An absent or expired key starts from an empty list.
/// The key's current expiry is kept.
fn push<S: Storage>(storage: &S, key: &str, values: &[String], end: End) -> Result<usize> {
    let mut guard = storage.lock()?;

    let (mut items, expires_at) = match guard.get(key)? {
        None => (VecDeque::new(), None),
        Some(value) => (as_list(&value)?.clone(), value.expires_at()),
    };

    for value in values {
        match end {
            End::Head => items.push_front(value.clone()),
            End::Tail => items.push_back(value.clone()),
        }
    }

    let len = items.len();
    let merged = Value::new(ValueData::List(items)).expiring_at(expires_at);
    guard.put(key.to_string(), |_| Ok(Some(merged)))?;

    trace!(key = %key, len = len, "Pushed to list");
    Ok(len)
}

/// Removes one element from `end` of the list at `key`.
fn pop<S: Storage>(storage: &S, key: &str, end: End) -> Result<Option<String>> {
    let mut popped = None;

    storage.put(key.to_string(), |current| {
        let Some(value) = current else {
            return Ok(None);
        };

        let mut items = as_list(value)?.clone();
        popped = match end {
            End::Head => items.pop_front(),
            End::Tail => items.pop_back(),
        };

        if items.is_empty() {
            Ok(None)
        } else {
            Ok(Some(
                Value::new(ValueData::List(items)).expiring_at(value.expires_at()),
            ))
        }
    })?;

    Ok(popped)
}

/// Resolves a possibly negative index against `len`.
fn resolve_index(index: i64, len: usize) -> i64 {
    if index < 0 {
        len as i64 + index
    } else {
        index
    }
}

/// LPUSH key value [value ...]
pub struct Lpush<S> {
    storage: Arc<S>,
}

impl<S> Lpush<S> {
    pub fn new(storage: Arc<S>) -> Self {
        Self { storage }
    }
}

impl<S: Storage> Lpush<S> {
    fn run(&self, args: &[String]) -> Result<CommandResult> {
        at_least(args, 2)?;
        push(self.storage.as_ref(), &args[0], &args[1..], End::Head)?;
        Ok(CommandResult::Ok)
    }
}

impl<S: Storage> Command for Lpush<S> {
    fn name(&self) -> &'static str {
        "LPUSH"
    }

    fn help(&self) -> &'static str {
        "Usage: LPUSH key value [value ...]
Prepend one or multiple values to a list."
    }

    fn execute(&self, args: &[String]) -> CommandResult {
        self.run(args).into()
    }
}

/// RPUSH key value [value ...]
pub struct Rpush<S> {
    storage: Arc<S>,
}

impl<S> Rpush<S> {
    pub fn new(storage: Arc<S>) -> Self {
        Self { storage }
    }
}

impl<S: Storage> Rpush<S> {
    fn run(&self, args: &[String]) -> Result<CommandResult> {
        at_least(args, 2)?;
        push(self.storage.as_ref(), &args[0], &args[1..], End::Tail)?;
        Ok(CommandResult::Ok)
    }
}

impl<S: Storage> Command for Rpush<S> {
    fn name(&self) -> &'static str {
        "RPUSH"
    }

    fn help(&self) -> &'static str {
        "Usage: RPUSH key value [value ...]
Append one or multiple values to a list."
    }

    fn execute(&self, args: &[String]) -> CommandResult {
        self.run(args).into()
    }
}

/// LPOP key
pub struct Lpop<S> {
    storage: Arc<S>,
}

impl<S> Lpop<S> {
    pub fn new(storage: Arc<S>) -> Self {
        Self { storage }
    }
}

impl<S: Storage> Lpop<S> {
    fn run(&self, args: &[String]) -> Result<CommandResult> {
        exact(args, 1)?;
        Ok(pop(self.storage.as_ref(), &args[0], End::Head)?
            .map(CommandResult::String)
            .unwrap_or(CommandResult::Nil))
    }
}

impl<S: Storage> Command for Lpop<S> {
    fn name(&self) -> &'static str {
        "LPOP"
    }

    fn help(&self) -> &'static str {
        "Usage: LPOP key
Removes and returns the first element of the list stored at key."
    }

    fn execute(&self, args: &[String]) -> CommandResult {
        self.run(args).into()
    }
}

/// RPOP key
pub struct Rpop<S> {
    storage: Arc<S>,
}

impl<S> Rpop<S> {
    pub fn new(storage: Arc<S>) -> Self {
        Self { storage }
    }
}

impl<S: Storage> Rpop<S> {
    fn run(&self, args: &[String]) -> Result<CommandResult> {
        exact(args, 1)?;
        Ok(pop(self.storage.as_ref(), &args[0], End::Tail)?
            .map(CommandResult::String)
            .unwrap_or(CommandResult::Nil))
    }
}

impl<S: Storage> Command for Rpop<S> {
    fn name(&self) -> &'static str {
        "RPOP"
    }

    fn help(&self) -> &'static str {
        "Usage: RPOP key
Removes and returns the last element of the list stored at key."
    }

    fn execute(&self, args: &[String]) -> CommandResult {
        self.run(args).into()
    }
}

/// LLEN key
pub struct Llen<S> {
    storage: Arc<S>,
}

impl<S> Llen<S> {
    pub fn new(storage: Arc<S>) -> Self {
        Self { storage }
    }
}

impl<S: Storage> Llen<S> {
    fn run(&self, args: &[String]) -> Result<CommandResult> {
        exact(args, 1)?;

        let len = match self.storage.get(&args[0])? {
            None => 0,
            Some(value) => as_list(&value)?.len(),
        };
        Ok(CommandResult::Int(len as i64))
    }
}

impl<S: Storage> Command for Llen<S> {
    fn name(&self) -> &'static str {
        "LLEN"
    }

    fn help(&self) -> &'static str {
        "Usage: LLEN key
Returns the length of the list stored at key."
    }

    fn execute(&self, args: &[String]) -> CommandResult {
        self.run(args).into()
    }
}

/// LINDEX key index
pub struct Lindex<S> {
    storage: Arc<S>,
}

impl<S> Lindex<S> {
    pub fn new(storage: Arc<S>) -> Self {
        Self { storage }
    }
}

impl<S: Storage> Lindex<S> {
    fn run(&self, args: &[String]) -> Result<CommandResult> {
        exact(args, 2)?;
        let index = parse_int(&args[1])?;

        let Some(value) = self.storage.get(&args[0])? else {
            return Ok(CommandResult::Nil);
        };
        let items = as_list(&value)?;

        let index = resolve_index(index, items.len());
        if index < 0 {
            return Ok(CommandResult::Nil);
        }

        Ok(items
            .get(index as usize)
            .map(|item| CommandResult::String(item.clone()))
            .unwrap_or(CommandResult::Nil))
    }
}

impl<S: Storage> Command for Lindex<S> {
    fn name(&self) -> &'static str {
        "LINDEX"
    }

    fn help(&self) -> &'static str {
        "Usage: LINDEX key index
Returns the element at index in the list stored at key.
Negative indices count from the tail, -1 being the last element."
    }

    fn execute(&self, args: &[String]) -> CommandResult {
        self.run(args).into()
    }
}

/// LRANGE key start stop
pub struct Lrange<S> {
    storage: Arc<S>,
}

impl<S> Lrange<S> {
    pub fn new(storage: Arc<S>) -> Self {
        Self { storage }
    }
}

impl<S: Storage> Lrange<S> {
    fn run(&self, args: &[String]) -> Result<CommandResult> {
        exact(args, 3)?;
        let start = parse_int(&args[1])?;
        let stop = parse_int(&args[2])?;

        let Some(value) = self.storage.get(&args[0])? else {
            return Ok(CommandResult::List(vec![]));
        };
        let items = as_list(&value)?;
        let len = items.len() as i64;

        // Both ends inclusive, clamped to the list
        let start = resolve_index(start, items.len()).max(0);
        let stop = resolve_index(stop, items.len()).min(len - 1);
        if start > stop {
            return Ok(CommandResult::List(vec![]));
        }

        Ok(CommandResult::List(
            items
                .iter()
                .skip(start as usize)
                .take((stop - start + 1) as usize)
                .cloned()
                .collect(),
        ))
    }
}

impl<S: Storage> Command for Lrange<S> {
    fn name(&self) -> &'static str {
        "LRANGE"
    }

    fn help(&self) -> &'static str {
        "Usage: LRANGE key start stop
Returns the elements between start and stop (inclusive) of the list stored at key."
    }

    fn execute(&self, args: &[String]) -> CommandResult {
        self.run(args).into()
    }
}
