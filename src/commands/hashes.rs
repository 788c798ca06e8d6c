//! Hash commands: `HSET`, `HGET`, `HDEL`, `HKEYS`, `HVALS`.

use crate::commands::{at_least, exact, Command, CommandResult};
use crate::error::{Error, Result};
use crate::storage::{Storage, Value, ValueData};
use std::collections::HashMap;
use std::sync::Arc;

fn as_hash(value: &Value) -> Result<&HashMap<String, String>> {
    match value.data() {
        ValueData::Hash(fields) => Ok(fields),
        ValueData::String(_) | ValueData::List(_) => Err(Error::WrongTypeOp),
    }
}

/// HSET key field value
pub struct Hset<S> {
    storage: Arc<S>,
}

impl<S> Hset<S> {
    pub fn new(storage: Arc<S>) -> Self {
        Self { storage }
    }
}

impl<S: Storage> Hset<S> {
    fn run(&self, args: &[String]) -> Result<CommandResult> {
        exact(args, 3)?;
        let (field, value) = (&args[1], &args[2]);

        self.storage.put(args[0].clone(), |current| {
            let (mut fields, expires_at) = match current {
                None => (HashMap::new(), None),
                Some(existing) => (as_hash(existing)?.clone(), existing.expires_at()),
            };
            fields.insert(field.clone(), value.clone());

            Ok(Some(
                Value::new(ValueData::Hash(fields)).expiring_at(expires_at),
            ))
        })?;

        Ok(CommandResult::Ok)
    }
}

impl<S: Storage> Command for Hset<S> {
    fn name(&self) -> &'static str {
        "HSET"
    }

    fn help(&self) -> &'static str {
        "Usage: HSET key field value
Sets field in the hash stored at key to value."
    }

    fn execute(&self, args: &[String]) -> CommandResult {
        self.run(args).into()
    }
}

/// HGET key field
pub struct Hget<S> {
    storage: Arc<S>,
}

impl<S> Hget<S> {
    pub fn new(storage: Arc<S>) -> Self {
        Self { storage }
    }
}

impl<S: Storage> Hget<S> {
    fn run(&self, args: &[String]) -> Result<CommandResult> {
        exact(args, 2)?;

        let Some(value) = self.storage.get(&args[0])? else {
            return Ok(CommandResult::Nil);
        };

        Ok(as_hash(&value)?
            .get(&args[1])
            .map(|v| CommandResult::String(v.clone()))
            .unwrap_or(CommandResult::Nil))
    }
}

impl<S: Storage> Command for Hget<S> {
    fn name(&self) -> &'static str {
        "HGET"
    }

    fn help(&self) -> &'static str {
        "Usage: HGET key field
Returns the value associated with field in the hash stored at key."
    }

    fn execute(&self, args: &[String]) -> CommandResult {
        self.run(args).into()
    }
}

/// HDEL key field [field ...]
pub struct Hdel<S> {
    storage: Arc<S>,
}

impl<S> Hdel<S> {
    pub fn new(storage: Arc<S>) -> Self {
        Self { storage }
    }
}

impl<S: Storage> Hdel<S> {
    fn run(&self, args: &[String]) -> Result<CommandResult> {
        at_least(args, 2)?;
        let mut removed = 0;

        self.storage.put(args[0].clone(), |current| {
            let Some(existing) = current else {
                return Ok(None);
            };

            let mut fields = as_hash(existing)?.clone();
            removed = args[1..]
                .iter()
                .filter(|field| fields.remove(*field).is_some())
                .count();

            // An emptied hash does not survive
            if fields.is_empty() {
                Ok(None)
            } else {
                Ok(Some(
                    Value::new(ValueData::Hash(fields)).expiring_at(existing.expires_at()),
                ))
            }
        })?;

        Ok(CommandResult::Int(removed as i64))
    }
}

impl<S: Storage> Command for Hdel<S> {
    fn name(&self) -> &'static str {
        "HDEL"
    }

    fn help(&self) -> &'static str {
        "Usage: HDEL key field [field ...]
Removes the specified fields from the hash stored at key."
    }

    fn execute(&self, args: &[String]) -> CommandResult {
        self.run(args).into()
    }
}

/// HKEYS key
pub struct Hkeys<S> {
    storage: Arc<S>,
}

impl<S> Hkeys<S> {
    pub fn new(storage: Arc<S>) -> Self {
        Self { storage }
    }
}

impl<S: Storage> Hkeys<S> {
    fn run(&self, args: &[String]) -> Result<CommandResult> {
        exact(args, 1)?;

        match self.storage.get(&args[0])?.map(Value::into_data) {
            None => Ok(CommandResult::Nil),
            Some(ValueData::Hash(fields)) => Ok(CommandResult::List(fields.into_keys().collect())),
            Some(ValueData::String(_)) | Some(ValueData::List(_)) => Err(Error::WrongTypeOp),
        }
    }
}

impl<S: Storage> Command for Hkeys<S> {
    fn name(&self) -> &'static str {
        "HKEYS"
    }

    fn help(&self) -> &'static str {
        "Usage: HKEYS key
Returns all field names in the hash stored at key. Order of fields is not guaranteed"
    }

    fn execute(&self, args: &[String]) -> CommandResult {
        self.run(args).into()
    }
}

/// HVALS key
pub struct Hvals<S> {
    storage: Arc<S>,
}

impl<S> Hvals<S> {
    pub fn new(storage: Arc<S>) -> Self {
        Self { storage }
    }
}

impl<S: Storage> Hvals<S> {
    fn run(&self, args: &[String]) -> Result<CommandResult> {
        exact(args, 1)?;

        match self.storage.get(&args[0])?.map(Value::into_data) {
            None => Ok(CommandResult::List(vec![])),
            Some(ValueData::Hash(fields)) => Ok(CommandResult::List(fields.into_values().collect())),
            Some(ValueData::String(_)) | Some(ValueData::List(_)) => Err(Error::WrongTypeOp),
        }
    }
}

impl<S: Storage> Command for Hvals<S> {
    fn name(&self) -> &'static str {
        "HVALS"
    }

    fn help(&self) -> &'static str {
        "Usage: HVALS key
Returns all values in the hash stored at key."
    }

    fn execute(&self, args: &[String]) -> CommandResult {
        self.run(args).into()
    }
}
