//! Stored values and their expiration metadata.
//!
//! Every key maps to exactly one [`Value`]: a tagged [`ValueData`] plus an
//! optional absolute expiration instant. Values are never mutated in place
//! inside the store; writers build a new `Value` and swap it in through
//! [`Storage::put`](crate::storage::Storage::put).

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::time::{Duration, Instant};

/// Keys are plain strings compared byte for byte.
pub type Key = String;

/// The payload of a stored value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueData {
    /// A single string.
    String(String),
    /// An insertion-ordered list with O(1) access at both ends.
    List(VecDeque<String>),
    /// Field → value mapping. Iteration order is not significant.
    Hash(HashMap<String, String>),
}

/// The kind of a [`ValueData`], without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    String,
    List,
    Hash,
}

impl ValueKind {
    /// The name reported by the `TYPE` command.
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueKind::String => "string",
            ValueKind::List => "list",
            ValueKind::Hash => "hash",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ValueData {
    pub fn kind(&self) -> ValueKind {
        match self {
            ValueData::String(_) => ValueKind::String,
            ValueData::List(_) => ValueKind::List,
            ValueData::Hash(_) => ValueKind::Hash,
        }
    }
}

/// A stored value with optional expiry time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Value {
    data: ValueData,
    /// When this value expires (None = never expires)
    expires_at: Option<Instant>,
}

impl Value {
    /// Creates a value without expiry.
    pub fn new(data: ValueData) -> Self {
        Self {
            data,
            expires_at: None,
        }
    }

    pub fn string(s: impl Into<String>) -> Self {
        Self::new(ValueData::String(s.into()))
    }

    pub fn list<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(ValueData::List(items.into_iter().map(Into::into).collect()))
    }

    pub fn hash<I, F, V>(fields: I) -> Self
    where
        I: IntoIterator<Item = (F, V)>,
        F: Into<String>,
        V: Into<String>,
    {
        Self::new(ValueData::Hash(
            fields
                .into_iter()
                .map(|(f, v)| (f.into(), v.into()))
                .collect(),
        ))
    }

    /// Sets the expiry `ttl` from now. A deadline too far out to represent
    /// means the value never expires.
    pub fn with_ttl(self, ttl: Duration) -> Self {
        let deadline = Instant::now().checked_add(ttl);
        self.expiring_at(deadline)
    }

    /// Sets (or clears, with `None`) the absolute expiry instant.
    pub fn expiring_at(mut self, expires_at: Option<Instant>) -> Self {
        self.expires_at = expires_at;
        self
    }

    pub fn kind(&self) -> ValueKind {
        self.data.kind()
    }

    pub fn data(&self) -> &ValueData {
        &self.data
    }

    pub fn into_data(self) -> ValueData {
        self.data
    }

    pub fn expires_at(&self) -> Option<Instant> {
        self.expires_at
    }

    /// Checks if this value has expired.
    ///
    /// A value whose expiry instant is at or before now counts as expired.
    #[inline]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }

    #[inline]
    pub(crate) fn is_expired_at(&self, now: Instant) -> bool {
        self.expires_at.map(|exp| now >= exp).unwrap_or(false)
    }

    /// Remaining time to live, or None if the value never expires.
    pub fn ttl(&self) -> Option<Duration> {
        self.expires_at
            .map(|exp| exp.saturating_duration_since(Instant::now()))
    }
}
