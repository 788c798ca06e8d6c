//! Connection-level commands that do not touch the store.

use crate::commands::{Command, CommandResult};
use crate::error::Error;

/// PING [message]
#[derive(Debug, Default)]
pub struct Ping;

impl Ping {
    pub fn new() -> Self {
        Self
    }
}

impl Command for Ping {
    fn name(&self) -> &'static str {
        "PING"
    }

    fn help(&self) -> &'static str {
        "Usage: PING [message]
Returns PONG if no argument is provided, otherwise returns a copy of the argument."
    }

    fn execute(&self, args: &[String]) -> CommandResult {
        match args {
            [] => CommandResult::String("PONG".to_string()),
            [message] => CommandResult::String(message.clone()),
            _ => Error::WrongArgsNumber.into(),
        }
    }
}
