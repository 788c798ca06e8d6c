//! Command dispatch
//!
//! [`CommandHandler`] owns one instance of every command, keyed by its
//! uppercase name, all sharing the same store. It is cheap to clone and is
//! handed to every connection.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     CommandHandler                          │
//! │                                                             │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐      │
//! │  │  execute()  │───>│ dispatch()  │───>│ dyn Command │      │
//! │  │  RESP args  │    │ name lookup │    │  execute()  │      │
//! │  └─────────────┘    └─────────────┘    └─────────────┘      │
//! │                                               │             │
//! │                                               ▼             │
//! │                                         impl Storage        │
//! └─────────────────────────────────────────────────────────────┘
//! ```

use crate::commands::hashes::{Hdel, Hget, Hkeys, Hset, Hvals};
use crate::commands::keys::{Del, Expire, Keys, Persist, Ttl, Type};
use crate::commands::lists::{Lindex, Llen, Lpop, Lpush, Lrange, Rpop, Rpush};
use crate::commands::server::Ping;
use crate::commands::strings::{Get, Set, Strlen};
use crate::commands::{Command, CommandResult};
use crate::error::Error;
use crate::protocol::RespValue;
use crate::storage::Storage;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{trace, warn};

const HELP: &str = "HELP";

/// Name-keyed registry of every supported command.
#[derive(Clone)]
pub struct CommandHandler {
    commands: Arc<HashMap<&'static str, Box<dyn Command>>>,
}

impl CommandHandler {
    /// Builds the full command set over `storage`.
    pub fn new<S: Storage + 'static>(storage: Arc<S>) -> Self {
        let commands: Vec<Box<dyn Command>> = vec![
            // Strings
            Box::new(Set::new(Arc::clone(&storage))),
            Box::new(Get::new(Arc::clone(&storage))),
            Box::new(Strlen::new(Arc::clone(&storage))),
            // Keys
            Box::new(Del::new(Arc::clone(&storage))),
            Box::new(Expire::new(Arc::clone(&storage))),
            Box::new(Ttl::new(Arc::clone(&storage))),
            Box::new(Persist::new(Arc::clone(&storage))),
            Box::new(Keys::new(Arc::clone(&storage))),
            Box::new(Type::new(Arc::clone(&storage))),
            // Lists
            Box::new(Lpush::new(Arc::clone(&storage))),
            Box::new(Rpush::new(Arc::clone(&storage))),
            Box::new(Lpop::new(Arc::clone(&storage))),
            Box::new(Rpop::new(Arc::clone(&storage))),
            Box::new(Llen::new(Arc::clone(&storage))),
            Box::new(Lindex::new(Arc::clone(&storage))),
            Box::new(Lrange::new(Arc::clone(&storage))),
            // Hashes
            Box::new(Hset::new(Arc::clone(&storage))),
            Box::new(Hget::new(Arc::clone(&storage))),
            Box::new(Hdel::new(Arc::clone(&storage))),
            Box::new(Hkeys::new(Arc::clone(&storage))),
            Box::new(Hvals::new(storage)),
            // Server
            Box::new(Ping::new()),
        ];

        let commands = commands
            .into_iter()
            .map(|command| (command.name(), command))
            .collect();

        Self {
            commands: Arc::new(commands),
        }
    }

    /// Looks up a command by name, case-insensitively.
    pub fn command(&self, name: &str) -> Option<&dyn Command> {
        self.commands
            .get(name.to_uppercase().as_str())
            .map(|command| command.as_ref())
    }

    /// Sorted names of all registered commands, `HELP` excluded.
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.commands.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Runs `name` with `args`.
    ///
    /// `HELP` lists every command; `HELP name` returns that command's usage.
    pub fn dispatch(&self, name: &str, args: &[String]) -> CommandResult {
        let name = name.to_uppercase();
        trace!(command = %name, args = args.len(), "Dispatching command");

        if name == HELP {
            return self.help(args);
        }

        let Some(command) = self.commands.get(name.as_str()) else {
            return Error::UnknownCommand(name).into();
        };

        let result = command.execute(args);
        if let CommandResult::Error(Error::Storage(e)) = &result {
            warn!(command = %name, error = %e, "Storage failure");
        }
        result
    }

    /// Runs a RESP request (an array of strings) and builds the reply.
    pub fn execute(&self, request: RespValue) -> RespValue {
        let parts = match request {
            RespValue::Array(parts) => parts,
            _ => return RespValue::error("ERR invalid command format"),
        };

        let mut words = Vec::with_capacity(parts.len());
        for part in &parts {
            match part.as_str() {
                Some(word) => words.push(word.to_string()),
                None => return RespValue::error("ERR invalid argument"),
            }
        }

        match words.split_first() {
            Some((name, args)) => self.dispatch(name, args).into(),
            None => RespValue::error("ERR empty command"),
        }
    }

    fn help(&self, args: &[String]) -> CommandResult {
        match args {
            [] => CommandResult::List(self.names().into_iter().map(String::from).collect()),
            [name] => match self.command(name) {
                Some(command) => CommandResult::String(command.help().to_string()),
                None => Error::UnknownCommand(name.to_uppercase()).into(),
            },
            _ => Error::WrongArgsNumber.into(),
        }
    }
}

impl std::fmt::Debug for CommandHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandHandler")
            .field("commands", &self.names())
            .finish()
    }
}
