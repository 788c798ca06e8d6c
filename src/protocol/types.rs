//! RESP value model and serializer.
//!
//! Every RESP2 frame starts with a one-byte type prefix and ends with CRLF:
//!
//! | Type          | Wire form                          |
//! |---------------|------------------------------------|
//! | Simple string | `+OK\r\n`                          |
//! | Error         | `-ERR wrong number of arguments\r\n` |
//! | Integer       | `:42\r\n`                          |
//! | Bulk string   | `$5\r\nhello\r\n`                  |
//! | Null          | `$-1\r\n`                          |
//! | Array         | `*2\r\n$4\r\nLLEN\r\n$4\r\nlist\r\n` |

use crate::commands::CommandResult;
use bytes::Bytes;

pub const CRLF: &[u8] = b"\r\n";

/// Type prefix bytes.
pub mod prefix {
    pub const SIMPLE_STRING: u8 = b'+';
    pub const ERROR: u8 = b'-';
    pub const INTEGER: u8 = b':';
    pub const BULK_STRING: u8 = b'$';
    pub const ARRAY: u8 = b'*';
}

/// A single RESP frame, either parsed from a client or built as a reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RespValue {
    /// CR and LF are sent as spaces.
    SimpleString(String),
    /// CR and LF are sent as spaces.
    Error(String),
    Integer(i64),
    /// Binary-safe payload.
    BulkString(Bytes),
    /// Null bulk string (`$-1`) or null array (`*-1`).
    Null,
    Array(Vec<RespValue>),
}

impl RespValue {
    pub fn simple_string(s: impl Into<String>) -> Self {
        RespValue::SimpleString(s.into())
    }

    /// ```
    /// use nimbuskv::protocol::RespValue;
    ///
    /// let err = RespValue::error("ERR unknown command 'FOO'");
    /// assert_eq!(err.serialize(), b"-ERR unknown command 'FOO'\r\n");
    /// ```
    pub fn error(s: impl Into<String>) -> Self {
        RespValue::Error(s.into())
    }

    pub fn integer(n: i64) -> Self {
        RespValue::Integer(n)
    }

    pub fn bulk_string(data: impl Into<Bytes>) -> Self {
        RespValue::BulkString(data.into())
    }

    pub fn null() -> Self {
        RespValue::Null
    }

    pub fn array(values: Vec<RespValue>) -> Self {
        RespValue::Array(values)
    }

    /// `+OK`
    pub fn ok() -> Self {
        RespValue::simple_string("OK")
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.serialize_into(&mut buf);
        buf
    }

    /// Appends the wire form to `buf`, so replies can share one buffer.
    pub fn serialize_into(&self, buf: &mut Vec<u8>) {
        match self {
            RespValue::SimpleString(s) => write_text_line(buf, prefix::SIMPLE_STRING, s),
            RespValue::Error(s) => write_text_line(buf, prefix::ERROR, s),
            RespValue::Integer(n) => write_line(buf, prefix::INTEGER, n.to_string().as_bytes()),
            RespValue::BulkString(data) => {
                write_line(buf, prefix::BULK_STRING, data.len().to_string().as_bytes());
                buf.extend_from_slice(data);
                buf.extend_from_slice(CRLF);
            }
            RespValue::Null => write_line(buf, prefix::BULK_STRING, b"-1"),
            RespValue::Array(values) => {
                write_line(buf, prefix::ARRAY, values.len().to_string().as_bytes());
                for value in values {
                    value.serialize_into(buf);
                }
            }
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, RespValue::Error(_))
    }

    /// Text of a simple or bulk string; `None` for other frames or non-UTF-8
    /// payloads.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            RespValue::SimpleString(s) => Some(s),
            RespValue::BulkString(b) => std::str::from_utf8(b).ok(),
            _ => None,
        }
    }
}

fn write_line(buf: &mut Vec<u8>, prefix: u8, body: &[u8]) {
    buf.push(prefix);
    buf.extend_from_slice(body);
    buf.extend_from_slice(CRLF);
}

/// Line-framed text cannot carry CR or LF, or one reply would read as several.
fn write_text_line(buf: &mut Vec<u8>, prefix: u8, text: &str) {
    buf.push(prefix);
    buf.extend(text.bytes().map(|b| match b {
        b'\r' | b'\n' => b' ',
        b => b,
    }));
    buf.extend_from_slice(CRLF);
}

impl From<CommandResult> for RespValue {
    fn from(result: CommandResult) -> Self {
        match result {
            CommandResult::Ok => RespValue::ok(),
            CommandResult::String(s) => RespValue::bulk_string(s),
            CommandResult::Int(n) => RespValue::integer(n),
            CommandResult::List(items) => RespValue::array(
                items.into_iter().map(RespValue::bulk_string).collect(),
            ),
            CommandResult::Nil => RespValue::null(),
            CommandResult::Error(e) => RespValue::error(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, StorageError};

    #[test]
    fn test_scalar_serialize() {
        assert_eq!(RespValue::ok().serialize(), b"+OK\r\n");
        assert_eq!(RespValue::error("ERR boom").serialize(), b"-ERR boom\r\n");
        assert_eq!(RespValue::integer(-2).serialize(), b":-2\r\n");
        assert_eq!(RespValue::null().serialize(), b"$-1\r\n");
    }

    #[test]
    fn test_bulk_string_serialize() {
        assert_eq!(
            RespValue::bulk_string(Bytes::from("hello")).serialize(),
            b"$5\r\nhello\r\n"
        );
        assert_eq!(RespValue::bulk_string(Bytes::new()).serialize(), b"$0\r\n\r\n");
    }

    #[test]
    fn test_nested_array_serialize() {
        let value = RespValue::array(vec![
            RespValue::integer(1),
            RespValue::array(vec![RespValue::bulk_string("a"), RespValue::null()]),
        ]);
        assert_eq!(value.serialize(), b"*2\r\n:1\r\n*2\r\n$1\r\na\r\n$-1\r\n");
    }

    #[test]
    fn test_as_str() {
        assert_eq!(RespValue::bulk_string("GET").as_str(), Some("GET"));
        assert_eq!(RespValue::simple_string("OK").as_str(), Some("OK"));
        assert_eq!(RespValue::bulk_string(&b"\xff\xfe"[..]).as_str(), None);
        assert_eq!(RespValue::integer(1).as_str(), None);
    }

    #[test]
    fn test_from_command_result() {
        assert_eq!(RespValue::from(CommandResult::Ok), RespValue::ok());
        assert_eq!(
            RespValue::from(CommandResult::String("v".to_string())),
            RespValue::bulk_string("v")
        );
        assert_eq!(RespValue::from(CommandResult::Int(-1)), RespValue::integer(-1));
        assert_eq!(RespValue::from(CommandResult::Nil), RespValue::null());
        assert_eq!(
            RespValue::from(CommandResult::List(vec!["a".to_string(), "b".to_string()])),
            RespValue::array(vec![RespValue::bulk_string("a"), RespValue::bulk_string("b")])
        );
        assert_eq!(
            RespValue::from(CommandResult::List(vec![])).serialize(),
            b"*0\r\n"
        );
    }

    #[test]
    fn test_errors_keep_their_prefix() {
        assert_eq!(
            RespValue::from(CommandResult::Error(Error::WrongTypeOp)).serialize(),
            b"-WRONGTYPE Operation against a key holding the wrong kind of value\r\n".to_vec()
        );
        assert_eq!(
            RespValue::from(CommandResult::Error(StorageError::LockPoisoned.into())),
            RespValue::error("ERR storage lock poisoned")
        );
    }

    #[test]
    fn test_line_frames_never_split() {
        assert_eq!(
            RespValue::error("ERR unknown command 'X\r\n+OK'").serialize(),
            b"-ERR unknown command 'X  +OK'\r\n"
        );
        assert_eq!(RespValue::simple_string("a\nb").serialize(), b"+a b\r\n");
    }
}
