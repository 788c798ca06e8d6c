//! String commands: `SET`, `GET`, `STRLEN`.

use crate::commands::{at_least, exact, Command, CommandResult};
use crate::error::{Error, Result};
use crate::storage::{Storage, Value, ValueData};
use std::sync::Arc;

/// SET key value [value ...]
pub struct Set<S> {
    storage: Arc<S>,
}

impl<S> Set<S> {
    pub fn new(storage: Arc<S>) -> Self {
        Self { storage }
    }
}

impl<S: Storage> Set<S> {
    fn run(&self, args: &[String]) -> Result<CommandResult> {
        at_least(args, 2)?;

        // Everything after the key is one space-joined value
        let value = args[1..].join(" ");
        self.storage
            .put(args[0].clone(), |_| Ok(Some(Value::string(value))))?;

        Ok(CommandResult::Ok)
    }
}

impl<S: Storage> Command for Set<S> {
    fn name(&self) -> &'static str {
        "SET"
    }

    fn help(&self) -> &'static str {
        "Usage: SET key value
Set key to hold the string value.
If key already holds a value, it is overwritten."
    }

    fn execute(&self, args: &[String]) -> CommandResult {
        self.run(args).into()
    }
}

/// GET key
pub struct Get<S> {
    storage: Arc<S>,
}

impl<S> Get<S> {
    pub fn new(storage: Arc<S>) -> Self {
        Self { storage }
    }
}

impl<S: Storage> Get<S> {
    fn run(&self, args: &[String]) -> Result<CommandResult> {
        exact(args, 1)?;

        match self.storage.get(&args[0])?.map(Value::into_data) {
            None => Ok(CommandResult::Nil),
            Some(ValueData::String(s)) => Ok(CommandResult::String(s)),
            Some(ValueData::List(_)) | Some(ValueData::Hash(_)) => Err(Error::WrongTypeOp),
        }
    }
}

impl<S: Storage> Command for Get<S> {
    fn name(&self) -> &'static str {
        "GET"
    }

    fn help(&self) -> &'static str {
        "Usage: GET key
Get the value of key. If the key does not exist nil is returned."
    }

    fn execute(&self, args: &[String]) -> CommandResult {
        self.run(args).into()
    }
}

/// STRLEN key
pub struct Strlen<S> {
    storage: Arc<S>,
}

impl<S> Strlen<S> {
    pub fn new(storage: Arc<S>) -> Self {
        Self { storage }
    }
}

impl<S: Storage> Strlen<S> {
    fn run(&self, args: &[String]) -> Result<CommandResult> {
        exact(args, 1)?;

        let len = match self.storage.get(&args[0])?.as_ref().map(Value::data) {
            None => 0,
            Some(ValueData::String(s)) => s.len(),
            Some(ValueData::List(_)) | Some(ValueData::Hash(_)) => return Err(Error::WrongTypeOp),
        };
        Ok(CommandResult::Int(len as i64))
    }
}

impl<S: Storage> Command for Strlen<S> {
    fn name(&self) -> &'static str {
        "STRLEN"
    }

    fn help(&self) -> &'static str {
        "Usage: STRLEN key
Returns the length of the string value stored at key."
    }

    fn execute(&self, args: &[String]) -> CommandResult {
        self.run(args).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::{args, backend_error, FailingStorage};
    use crate::storage::StorageEngine;
    use std::time::{Duration, Instant};

    fn storage() -> Arc<StorageEngine> {
        Arc::new(StorageEngine::from_entries([
            ("string", Value::string("value")),
            ("list", Value::list(["a"])),
            (
                "expired",
                Value::string("old").expiring_at(Some(Instant::now() - Duration::from_secs(1))),
            ),
        ]))
    }

    #[test]
    fn test_set_name_and_help() {
        let cmd = Set::new(storage());
        assert_eq!(cmd.name(), "SET");
        assert_eq!(
            cmd.help(),
            "Usage: SET key value\nSet key to hold the string value.\nIf key already holds a value, it is overwritten."
        );
    }

    #[test]
    fn test_set_joins_trailing_arguments() {
        let storage = storage();
        let cmd = Set::new(Arc::clone(&storage));

        assert_eq!(cmd.execute(&args(&["key", "hello", "big", "world"])), CommandResult::Ok);
        assert_eq!(
            storage.get("key").unwrap(),
            Some(Value::string("hello big world"))
        );
    }

    #[test]
    fn test_set_overwrites_any_kind_and_clears_ttl() {
        let storage = Arc::new(StorageEngine::from_entries([(
            "list",
            Value::list(["a"]).with_ttl(Duration::from_secs(60)),
        )]));
        let cmd = Set::new(Arc::clone(&storage));

        assert_eq!(cmd.execute(&args(&["list", "value"])), CommandResult::Ok);

        let stored = storage.get("list").unwrap().unwrap();
        assert_eq!(stored, Value::string("value"));
        assert_eq!(stored.expires_at(), None);
    }

    #[test]
    fn test_set_wrong_args_number() {
        let storage = storage();
        let cmd = Set::new(Arc::clone(&storage));
        for bad in [args(&[]), args(&["key"])] {
            assert_eq!(cmd.execute(&bad), CommandResult::Error(Error::WrongArgsNumber));
        }

        assert_eq!(storage.stats().put_ops, 0);
        assert_eq!(storage.get("key").unwrap(), None);
    }

    #[test]
    fn test_set_storage_error() {
        let cmd = Set::new(Arc::new(FailingStorage::failing_put(vec![])));
        assert_eq!(
            cmd.execute(&args(&["key", "value"])),
            CommandResult::Error(backend_error())
        );
    }

    #[test]
    fn test_get() {
        let cmd = Get::new(storage());

        assert_eq!(
            cmd.execute(&args(&["string"])),
            CommandResult::String("value".to_string())
        );
        assert_eq!(cmd.execute(&args(&["missing"])), CommandResult::Nil);
        assert_eq!(cmd.execute(&args(&["expired"])), CommandResult::Nil);
        assert_eq!(
            cmd.execute(&args(&["list"])),
            CommandResult::Error(Error::WrongTypeOp)
        );
        assert_eq!(
            cmd.execute(&args(&["a", "b"])),
            CommandResult::Error(Error::WrongArgsNumber)
        );
    }

    #[test]
    fn test_get_storage_error() {
        let cmd = Get::new(Arc::new(FailingStorage::failing_get()));
        assert_eq!(cmd.execute(&args(&["key"])), CommandResult::Error(backend_error()));
    }

    #[test]
    fn test_strlen() {
        let cmd = Strlen::new(storage());

        assert_eq!(cmd.execute(&args(&["string"])), CommandResult::Int(5));
        assert_eq!(cmd.execute(&args(&["missing"])), CommandResult::Int(0));
        assert_eq!(cmd.execute(&args(&["expired"])), CommandResult::Int(0));
        assert_eq!(
            cmd.execute(&args(&["list"])),
            CommandResult::Error(Error::WrongTypeOp)
        );
    }
}
