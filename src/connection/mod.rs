//! Client connections
//!
//! The listener in `main.rs` accepts sockets and spawns one task per client.
//! Each task owns a [`ConnectionHandler`] and shares a clone of the
//! [`CommandHandler`](crate::commands::CommandHandler) plus the server-wide
//! [`ConnectionStats`].
//!
//! ```ignore
//! let storage = Arc::new(StorageEngine::new());
//! let commands = CommandHandler::new(storage);
//! let stats = Arc::new(ConnectionStats::new());
//!
//! loop {
//!     let (stream, addr) = listener.accept().await?;
//!     tokio::spawn(handle_connection(stream, addr, commands.clone(), Arc::clone(&stats)));
//! }
//! ```

pub mod handler;

pub use handler::{handle_connection, ConnectionError, ConnectionHandler, ConnectionStats};
