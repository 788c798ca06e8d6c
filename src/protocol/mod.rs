//! RESP wire format
//!
//! - `types`: the [`RespValue`] frame, its serializer, and the mapping from
//!   [`CommandResult`](crate::commands::CommandResult) to a reply frame.
//! - `parser`: incremental parser for client requests.
//!
//! ```
//! use nimbuskv::protocol::{parse_message, RespValue};
//!
//! let (request, consumed) = parse_message(b"*2\r\n$5\r\nHKEYS\r\n$1\r\nh\r\n")
//!     .unwrap()
//!     .unwrap();
//! assert_eq!(consumed, 22);
//! assert_eq!(request.serialize(), b"*2\r\n$5\r\nHKEYS\r\n$1\r\nh\r\n");
//!
//! assert_eq!(RespValue::ok().serialize(), b"+OK\r\n");
//! ```

pub mod parser;
pub mod types;

pub use parser::{parse_message, ParseError, ParseResult, RespParser};
pub use types::RespValue;
