//! Key commands: `DEL`, `EXPIRE`, `TTL`, `PERSIST`, `KEYS`, `TYPE`.
//!
//! These work on any kind of value.

use crate::commands::{exact, parse_int, Command, CommandResult};
use crate::error::Result;
use crate::storage::{Storage, Value};
use std::sync::Arc;
use std::time::Duration;

/// DEL key
pub struct Del<S> {
    storage: Arc<S>,
}

impl<S> Del<S> {
    pub fn new(storage: Arc<S>) -> Self {
        Self { storage }
    }
}

impl<S: Storage> Del<S> {
    fn run(&self, args: &[String]) -> Result<CommandResult> {
        exact(args, 1)?;
        self.storage.delete(&args[0])?;
        Ok(CommandResult::Ok)
    }
}

impl<S: Storage> Command for Del<S> {
    fn name(&self) -> &'static str {
        "DEL"
    }

    fn help(&self) -> &'static str {
        "Usage: DEL key
Del the given key."
    }

    fn execute(&self, args: &[String]) -> CommandResult {
        self.run(args).into()
    }
}

/// EXPIRE key seconds
pub struct Expire<S> {
    storage: Arc<S>,
}

impl<S> Expire<S> {
    pub fn new(storage: Arc<S>) -> Self {
        Self { storage }
    }
}

impl<S: Storage> Expire<S> {
    fn run(&self, args: &[String]) -> Result<CommandResult> {
        exact(args, 2)?;
        let seconds = parse_int(&args[1])?;

        let mut applied = false;
        self.storage.put(args[0].clone(), |current| {
            let Some(value) = current else {
                return Ok(None);
            };
            applied = true;

            // A non-positive timeout expires the key right away
            if seconds <= 0 {
                return Ok(None);
            }
            Ok(Some(value.clone().with_ttl(Duration::from_secs(seconds as u64))))
        })?;

        Ok(CommandResult::Int(applied as i64))
    }
}

impl<S: Storage> Command for Expire<S> {
    fn name(&self) -> &'static str {
        "EXPIRE"
    }

    fn help(&self) -> &'static str {
        "Usage: EXPIRE key seconds
Set a timeout on key. After the timeout has expired, the key will automatically be deleted."
    }

    fn execute(&self, args: &[String]) -> CommandResult {
        self.run(args).into()
    }
}

/// TTL key
pub struct Ttl<S> {
    storage: Arc<S>,
}

impl<S> Ttl<S> {
    pub fn new(storage: Arc<S>) -> Self {
        Self { storage }
    }
}

impl<S: Storage> Ttl<S> {
    fn run(&self, args: &[String]) -> Result<CommandResult> {
        exact(args, 1)?;

        let ttl = match self.storage.get(&args[0])? {
            None => -2,
            Some(value) => match value.ttl() {
                None => -1,
                // Round to the nearest second
                Some(remaining) => ((remaining.as_millis() + 500) / 1000) as i64,
            },
        };
        Ok(CommandResult::Int(ttl))
    }
}

impl<S: Storage> Command for Ttl<S> {
    fn name(&self) -> &'static str {
        "TTL"
    }

    fn help(&self) -> &'static str {
        "Usage: TTL key
Returns the remaining time to live of a key in seconds.
Returns -2 if the key does not exist and -1 if it has no timeout."
    }

    fn execute(&self, args: &[String]) -> CommandResult {
        self.run(args).into()
    }
}

/// PERSIST key
pub struct Persist<S> {
    storage: Arc<S>,
}

impl<S> Persist<S> {
    pub fn new(storage: Arc<S>) -> Self {
        Self { storage }
    }
}

impl<S: Storage> Persist<S> {
    fn run(&self, args: &[String]) -> Result<CommandResult> {
        exact(args, 1)?;

        let mut cleared = false;
        self.storage.put(args[0].clone(), |current| {
            Ok(current.map(|value| {
                cleared = value.expires_at().is_some();
                value.clone().expiring_at(None)
            }))
        })?;

        Ok(CommandResult::Int(cleared as i64))
    }
}

impl<S: Storage> Command for Persist<S> {
    fn name(&self) -> &'static str {
        "PERSIST"
    }

    fn help(&self) -> &'static str {
        "Usage: PERSIST key
Remove the existing timeout on key."
    }

    fn execute(&self, args: &[String]) -> CommandResult {
        self.run(args).into()
    }
}

/// KEYS pattern
pub struct Keys<S> {
    storage: Arc<S>,
}

impl<S> Keys<S> {
    pub fn new(storage: Arc<S>) -> Self {
        Self { storage }
    }
}

impl<S: Storage> Keys<S> {
    fn run(&self, args: &[String]) -> Result<CommandResult> {
        exact(args, 1)?;

        let pattern = args[0].as_bytes();
        let mut keys: Vec<String> = self
            .storage
            .all()?
            .into_keys()
            .filter(|key| glob_match(pattern, key.as_bytes()))
            .collect();
        keys.sort_unstable();

        Ok(CommandResult::List(keys))
    }
}

impl<S: Storage> Command for Keys<S> {
    fn name(&self) -> &'static str {
        "KEYS"
    }

    fn help(&self) -> &'static str {
        "Usage: KEYS pattern
Returns all keys matching the glob-style pattern.
Supported: * ? [abc] [^abc] [a-z] and \\ to escape."
    }

    fn execute(&self, args: &[String]) -> CommandResult {
        self.run(args).into()
    }
}

/// TYPE key
pub struct Type<S> {
    storage: Arc<S>,
}

impl<S> Type<S> {
    pub fn new(storage: Arc<S>) -> Self {
        Self { storage }
    }
}

impl<S: Storage> Type<S> {
    fn run(&self, args: &[String]) -> Result<CommandResult> {
        exact(args, 1)?;

        let kind = self
            .storage
            .get(&args[0])?
            .as_ref()
            .map(|value| Value::kind(value).as_str())
            .unwrap_or("none");
        Ok(CommandResult::String(kind.to_string()))
    }
}

impl<S: Storage> Command for Type<S> {
    fn name(&self) -> &'static str {
        "TYPE"
    }

    fn help(&self) -> &'static str {
        "Usage: TYPE key
Returns the kind of value stored at key: string, list, hash or none."
    }

    fn execute(&self, args: &[String]) -> CommandResult {
        self.run(args).into()
    }
}

/// Glob-style matching with `*`, `?`, `[...]` classes and `\` escapes.
///
/// Star backtracking is iterative, so the cost stays linear in practice.
pub(crate) fn glob_match(pattern: &[u8], text: &[u8]) -> bool {
    let (mut p, mut t) = (0, 0);
    // Pattern index after the last `*`, and the text index it is anchored at
    let mut star: Option<(usize, usize)> = None;

    while t < text.len() {
        if p < pattern.len() {
            match pattern[p] {
                b'*' => {
                    star = Some((p + 1, t));
                    p += 1;
                    continue;
                }
                b'?' => {
                    p += 1;
                    t += 1;
                    continue;
                }
                b'[' => match match_class(&pattern[p + 1..], text[t]) {
                    Some((true, len)) => {
                        p += 1 + len;
                        t += 1;
                        continue;
                    }
                    Some((false, _)) => {}
                    // Unterminated class: a literal '['
                    None => {
                        if text[t] == b'[' {
                            p += 1;
                            t += 1;
                            continue;
                        }
                    }
                },
                b'\\' if p + 1 < pattern.len() => {
                    if pattern[p + 1] == text[t] {
                        p += 2;
                        t += 1;
                        continue;
                    }
                }
                c => {
                    if c == text[t] {
                        p += 1;
                        t += 1;
                        continue;
                    }
                }
            }
        }

        // Mismatch: let the last star swallow one more byte
        match star {
            Some((star_p, star_t)) => {
                p = star_p;
                t = star_t + 1;
                star = Some((star_p, star_t + 1));
            }
            None => return false,
        }
    }

    pattern[p..].iter().all(|&c| c == b'*')
}

/// Matches `c` against a class body (the bytes after `[`).
///
/// Returns whether it matched and how many bytes the body used, including
/// the closing `]`, or None if the class is never closed.
fn match_class(class: &[u8], c: u8) -> Option<(bool, usize)> {
    let (negate, mut i) = match class.first() {
        Some(b'^') => (true, 1),
        _ => (false, 0),
    };
    let mut matched = false;

    while i < class.len() {
        match class[i] {
            b']' => return Some((matched != negate, i + 1)),
            b'\\' if i + 1 < class.len() => {
                matched |= class[i + 1] == c;
                i += 2;
            }
            lo if i + 2 < class.len() && class[i + 1] == b'-' && class[i + 2] != b']' => {
                let hi = class[i + 2];
                matched |= (lo.min(hi)..=lo.max(hi)).contains(&c);
                i += 3;
            }
            other => {
                matched |= other == c;
                i += 1;
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::{args, backend_error, FailingStorage};
    use crate::error::Error;
    use crate::storage::StorageEngine;
    use std::time::Instant;

    fn expired(value: Value) -> Value {
        value.expiring_at(Some(Instant::now() - Duration::from_secs(1)))
    }

    fn storage() -> Arc<StorageEngine> {
        Arc::new(StorageEngine::from_entries([
            ("string", Value::string("value")),
            ("list", Value::list(["a", "b"])),
            ("hash", Value::hash([("field", "value")])),
            ("session", Value::string("token").with_ttl(Duration::from_secs(100))),
            ("expired", expired(Value::string("old"))),
        ]))
    }

    #[test]
    fn test_del_is_idempotent() {
        let storage = storage();
        let cmd = Del::new(Arc::clone(&storage));

        assert_eq!(cmd.execute(&args(&["list"])), CommandResult::Ok);
        assert_eq!(storage.get("list").unwrap(), None);
        assert_eq!(cmd.execute(&args(&["list"])), CommandResult::Ok);
        assert_eq!(cmd.execute(&args(&["never-existed"])), CommandResult::Ok);
    }

    #[test]
    fn test_del_wrong_args_number() {
        let cmd = Del::new(storage());
        assert_eq!(
            cmd.execute(&args(&[])),
            CommandResult::Error(Error::WrongArgsNumber)
        );
        assert_eq!(
            cmd.execute(&args(&["a", "b"])),
            CommandResult::Error(Error::WrongArgsNumber)
        );
    }

    #[test]
    fn test_del_storage_error() {
        let cmd = Del::new(Arc::new(FailingStorage::failing_put(vec![])));
        assert_eq!(cmd.execute(&args(&["key"])), CommandResult::Error(backend_error()));
    }

    #[test]
    fn test_expire_and_ttl() {
        let storage = storage();
        let expire = Expire::new(Arc::clone(&storage));
        let ttl = Ttl::new(Arc::clone(&storage));

        assert_eq!(ttl.execute(&args(&["string"])), CommandResult::Int(-1));
        assert_eq!(expire.execute(&args(&["string", "30"])), CommandResult::Int(1));
        assert_eq!(ttl.execute(&args(&["string"])), CommandResult::Int(30));

        // Value itself is untouched
        assert_eq!(
            storage.get("string").unwrap().map(Value::into_data),
            Some(crate::storage::ValueData::String("value".to_string()))
        );
    }

    #[test]
    fn test_expire_missing_and_expired_keys() {
        let cmd = Expire::new(storage());

        assert_eq!(cmd.execute(&args(&["missing", "10"])), CommandResult::Int(0));
        assert_eq!(cmd.execute(&args(&["expired", "10"])), CommandResult::Int(0));
    }

    #[test]
    fn test_expire_non_positive_deletes() {
        let storage = storage();
        let cmd = Expire::new(Arc::clone(&storage));

        assert_eq!(cmd.execute(&args(&["hash", "0"])), CommandResult::Int(1));
        assert_eq!(storage.get("hash").unwrap(), None);
    }

    #[test]
    fn test_expire_out_of_range_never_expires() {
        let storage = storage();
        let expire = Expire::new(Arc::clone(&storage));

        let max = i64::MAX.to_string();
        assert_eq!(expire.execute(&args(&["string", &max])), CommandResult::Int(1));
        assert_eq!(
            Ttl::new(storage).execute(&args(&["string"])),
            CommandResult::Int(-1)
        );
    }

    #[test]
    fn test_expire_invalid_seconds() {
        let storage = storage();
        let cmd = Expire::new(Arc::clone(&storage));

        assert_eq!(
            cmd.execute(&args(&["string", "soon"])),
            CommandResult::Error(Error::InvalidInteger)
        );
        assert_eq!(
            cmd.execute(&args(&["string"])),
            CommandResult::Error(Error::WrongArgsNumber)
        );
        assert_eq!(storage.stats().put_ops, 0);
    }

    #[test]
    fn test_ttl() {
        let cmd = Ttl::new(storage());

        assert_eq!(cmd.execute(&args(&["session"])), CommandResult::Int(100));
        assert_eq!(cmd.execute(&args(&["missing"])), CommandResult::Int(-2));
        assert_eq!(cmd.execute(&args(&["expired"])), CommandResult::Int(-2));
    }

    #[test]
    fn test_persist() {
        let storage = storage();
        let cmd = Persist::new(Arc::clone(&storage));

        assert_eq!(cmd.execute(&args(&["session"])), CommandResult::Int(1));
        assert_eq!(storage.get("session").unwrap().unwrap().expires_at(), None);

        assert_eq!(cmd.execute(&args(&["session"])), CommandResult::Int(0));
        assert_eq!(cmd.execute(&args(&["missing"])), CommandResult::Int(0));
        assert_eq!(cmd.execute(&args(&["expired"])), CommandResult::Int(0));
        assert_eq!(storage.get("expired").unwrap(), None);
    }

    #[test]
    fn test_keys() {
        let cmd = Keys::new(storage());

        assert_eq!(
            cmd.execute(&args(&["*"])),
            CommandResult::List(args(&["hash", "list", "session", "string"]))
        );
        assert_eq!(
            cmd.execute(&args(&["s*"])),
            CommandResult::List(args(&["session", "string"]))
        );
        assert_eq!(cmd.execute(&args(&["nothing*"])), CommandResult::List(vec![]));
    }

    #[test]
    fn test_keys_storage_error() {
        let cmd = Keys::new(Arc::new(FailingStorage::failing_get()));
        assert_eq!(cmd.execute(&args(&["*"])), CommandResult::Error(backend_error()));
    }

    #[test]
    fn test_type() {
        let cmd = Type::new(storage());

        for (key, kind) in [
            ("string", "string"),
            ("list", "list"),
            ("hash", "hash"),
            ("missing", "none"),
            ("expired", "none"),
        ] {
            assert_eq!(
                cmd.execute(&args(&[key])),
                CommandResult::String(kind.to_string())
            );
        }
    }

    #[test]
    fn test_glob_match() {
        let m = |p: &str, t: &str| glob_match(p.as_bytes(), t.as_bytes());

        assert!(m("h*llo", "hello"));
        assert!(m("h*llo", "hllo"));
        assert!(m("h*llo", "heeeello"));
        assert!(!m("h*llo", "world"));

        assert!(m("h?llo", "hallo"));
        assert!(!m("h?llo", "hllo"));

        assert!(m("*", ""));
        assert!(m("*", "anything"));
        assert!(!m("", "x"));

        assert!(m("h[ae]llo", "hello"));
        assert!(!m("h[ae]llo", "hillo"));
        assert!(m("h[^e]llo", "hallo"));
        assert!(!m("h[^e]llo", "hello"));
        assert!(m("key[0-9]", "key7"));
        assert!(!m("key[0-9]", "keyx"));

        assert!(m("a\\*b", "a*b"));
        assert!(!m("a\\*b", "axb"));
        assert!(m("a[b", "a[b"));
        assert!(m("*:*:end", "user:42:session:end"));
    }
}
