//! Incremental RESP parser.
//!
//! [`RespParser::parse`] looks at the front of a buffer and returns:
//! - `Ok(Some((value, consumed)))` when a whole frame is present,
//! - `Ok(None)` when the frame is cut short and more bytes are needed,
//! - `Err(ParseError)` when the bytes can never form a valid frame.
//!
//! Nothing is consumed on `Ok(None)`; the caller appends the next read and
//! calls again. Lines that do not start with a RESP prefix byte are parsed
//! as inline commands (`PING\r\n`, `SET k v\r\n`), as sent by telnet-style
//! clients.

use crate::protocol::types::{prefix, RespValue, CRLF};
use bytes::Bytes;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("invalid integer: {0:?}")]
    InvalidInteger(String),

    #[error("invalid UTF-8 in {0}")]
    InvalidUtf8(&'static str),

    /// Negative length other than the `-1` null marker.
    #[error("invalid length: {0}")]
    InvalidLength(i64),

    #[error("bulk string of {size} bytes exceeds limit of {max}")]
    BulkTooLarge { size: usize, max: usize },

    #[error("nesting deeper than {0} levels")]
    TooDeep(usize),

    #[error("protocol error: {0}")]
    Protocol(&'static str),
}

pub type ParseResult<T> = Result<T, ParseError>;

/// Largest accepted bulk string (512 MiB).
pub const MAX_BULK_SIZE: usize = 512 * 1024 * 1024;

pub const MAX_NESTING_DEPTH: usize = 32;

/// Frame parsed plus the offset just past it.
type Parsed = Option<(RespValue, usize)>;

/// Stateless apart from its limits; one per connection.
#[derive(Debug, Clone)]
pub struct RespParser {
    max_bulk_size: usize,
}

impl Default for RespParser {
    fn default() -> Self {
        Self::new()
    }
}

impl RespParser {
    pub fn new() -> Self {
        Self {
            max_bulk_size: MAX_BULK_SIZE,
        }
    }

    pub fn with_max_bulk_size(max_bulk_size: usize) -> Self {
        Self { max_bulk_size }
    }

    /// Parses one frame from the front of `buf`.
    pub fn parse(&self, buf: &[u8]) -> ParseResult<Parsed> {
        self.value_at(buf, 0, 0)
    }

    fn value_at(&self, buf: &[u8], pos: usize, depth: usize) -> ParseResult<Parsed> {
        if depth > MAX_NESTING_DEPTH {
            return Err(ParseError::TooDeep(MAX_NESTING_DEPTH));
        }
        let Some(&first) = buf.get(pos) else {
            return Ok(None);
        };

        match first {
            prefix::SIMPLE_STRING => match line_at(buf, pos + 1) {
                Some((line, next)) => {
                    let text = utf8(line, "simple string")?;
                    Ok(Some((RespValue::SimpleString(text), next)))
                }
                None => Ok(None),
            },
            prefix::ERROR => match line_at(buf, pos + 1) {
                Some((line, next)) => Ok(Some((RespValue::Error(utf8(line, "error")?), next))),
                None => Ok(None),
            },
            prefix::INTEGER => match line_at(buf, pos + 1) {
                Some((line, next)) => Ok(Some((RespValue::Integer(integer(line)?), next))),
                None => Ok(None),
            },
            prefix::BULK_STRING => self.bulk_at(buf, pos + 1),
            prefix::ARRAY => self.array_at(buf, pos + 1, depth),
            _ if depth == 0 => inline_at(buf, pos),
            _ => Err(ParseError::Protocol("unexpected byte inside array")),
        }
    }

    fn bulk_at(&self, buf: &[u8], pos: usize) -> ParseResult<Parsed> {
        let Some((line, start)) = line_at(buf, pos) else {
            return Ok(None);
        };

        let len = match integer(line)? {
            -1 => return Ok(Some((RespValue::Null, start))),
            n if n < 0 => return Err(ParseError::InvalidLength(n)),
            n => n as usize,
        };
        if len > self.max_bulk_size {
            return Err(ParseError::BulkTooLarge {
                size: len,
                max: self.max_bulk_size,
            });
        }

        let end = start + len;
        if buf.len() < end + CRLF.len() {
            return Ok(None);
        }
        if &buf[end..end + CRLF.len()] != CRLF {
            return Err(ParseError::Protocol("bulk string not terminated by CRLF"));
        }

        let data = Bytes::copy_from_slice(&buf[start..end]);
        Ok(Some((RespValue::BulkString(data), end + CRLF.len())))
    }

    fn array_at(&self, buf: &[u8], pos: usize, depth: usize) -> ParseResult<Parsed> {
        let Some((line, mut next)) = line_at(buf, pos) else {
            return Ok(None);
        };

        let count = match integer(line)? {
            -1 => return Ok(Some((RespValue::Null, next))),
            n if n < 0 => return Err(ParseError::InvalidLength(n)),
            n => n as usize,
        };

        // Cap the preallocation; the count comes from the client
        let mut items = Vec::with_capacity(count.min(1024));
        for _ in 0..count {
            match self.value_at(buf, next, depth + 1)? {
                Some((item, after)) => {
                    items.push(item);
                    next = after;
                }
                None => return Ok(None),
            }
        }

        Ok(Some((RespValue::Array(items), next)))
    }
}

/// Splits an inline command line on whitespace into an array of bulks.
fn inline_at(buf: &[u8], pos: usize) -> ParseResult<Parsed> {
    let Some((line, next)) = line_at(buf, pos) else {
        return Ok(None);
    };

    let line = std::str::from_utf8(line).map_err(|_| ParseError::InvalidUtf8("inline command"))?;
    let words: Vec<RespValue> = line
        .split_whitespace()
        .map(|word| RespValue::BulkString(Bytes::copy_from_slice(word.as_bytes())))
        .collect();

    if words.is_empty() {
        return Err(ParseError::Protocol("empty inline command"));
    }
    Ok(Some((RespValue::Array(words), next)))
}

/// The bytes from `pos` up to the next CRLF, and the offset after it.
fn line_at(buf: &[u8], pos: usize) -> Option<(&[u8], usize)> {
    let rest = buf.get(pos..)?;
    let end = rest.windows(CRLF.len()).position(|w| w == CRLF)?;
    Some((&rest[..end], pos + end + CRLF.len()))
}

fn utf8(line: &[u8], what: &'static str) -> ParseResult<String> {
    std::str::from_utf8(line)
        .map(str::to_string)
        .map_err(|_| ParseError::InvalidUtf8(what))
}

fn integer(line: &[u8]) -> ParseResult<i64> {
    let text = std::str::from_utf8(line).map_err(|_| ParseError::InvalidUtf8("integer"))?;
    text.parse()
        .map_err(|_| ParseError::InvalidInteger(text.to_string()))
}

/// Parses one frame with default limits.
pub fn parse_message(buf: &[u8]) -> ParseResult<Parsed> {
    RespParser::new().parse(buf)
}
