//! # NimbusKV
//!
//! An in-memory key-value store holding typed values (strings, lists and
//! hashes) with optional per-key expiration, driven by named commands and
//! served over RESP so any Redis client can talk to it.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                             NimbusKV                              │
//! │                                                                   │
//! │  ┌─────────────┐    ┌─────────────┐    ┌──────────────────────┐   │
//! │  │ TCP Server  │───>│ Connection  │───>│   CommandHandler     │   │
//! │  │ (main.rs)   │    │  Handler    │    │ name → dyn Command   │   │
//! │  └─────────────┘    └──────┬──────┘    └──────────┬───────────┘   │
//! │                            │                      │               │
//! │                     ┌──────▼──────┐               ▼               │
//! │                     │ RESP parser │    ┌──────────────────────┐   │
//! │                     └─────────────┘    │   impl Storage       │   │
//! │                                        │  ┌──────┐ ┌──────┐   │   │
//! │                                        │  │Shard0│ │ ...N │   │   │
//! │                                        │  │RwLock│ │RwLock│   │   │
//! │                                        │  └──────┘ └──────┘   │   │
//! │                                        └──────────────────────┘   │
//! └───────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```
//! use nimbuskv::commands::{CommandHandler, CommandResult};
//! use nimbuskv::storage::StorageEngine;
//! use std::sync::Arc;
//!
//! let commands = CommandHandler::new(Arc::new(StorageEngine::new()));
//! let args = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<Vec<_>>();
//!
//! commands.dispatch("LPUSH", &args(&["jobs", "b", "a"]));
//! assert_eq!(
//!     commands.dispatch("LPOP", &args(&["jobs"])),
//!     CommandResult::String("a".to_string())
//! );
//! ```
//!
//! ## Module Overview
//!
//! - [`storage`]: value model, the `Storage` contract, sharded engine
//! - [`commands`]: the `Command` trait, every command, the dispatcher
//! - [`protocol`]: RESP types and parser
//! - [`connection`]: per-client async loop
//! - [`config`]: flags and environment
//! - [`error`]: error taxonomy
//!
//! ## Expiration
//!
//! Expiry is lazy: an expired key is indistinguishable from an absent one
//! and is dropped the next time anything touches it.

pub mod commands;
pub mod config;
pub mod connection;
pub mod error;
pub mod protocol;
pub mod storage;

pub use commands::{Command, CommandHandler, CommandResult};
pub use config::{Config, ConfigError, Invocation};
pub use connection::{handle_connection, ConnectionStats};
pub use error::{Error, Result, StorageError};
pub use protocol::{ParseError, RespParser, RespValue};
pub use storage::{Storage, StorageEngine, StorageGuard, Value};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
