//! # Key Store Errors
//!
//! Errors surfaced by key lookup and identity refresh.

use thiserror::Error;

/// Errors from the key store.
///
/// `Clone` because one refresh result is shared by every concurrent caller
/// waiting on the same host.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum KeyStoreError {
    /// No key of `host` covers the requested instant, even after a refresh.
    #[error("No key for {host} valid at {at}")]
    KeyNotFound { host: String, at: u64 },

    /// The host is unknown and could not be resolved.
    #[error("Unknown host: {0}")]
    UnknownHost(String),

    /// The local identity has no key covering the current instant.
    #[error("No active signing key for {host} at {now}")]
    NoActiveKey { host: String, now: u64 },

    /// An identity document or configured key set is unusable.
    #[error("Invalid identity for {host}: {reason}")]
    InvalidIdentity { host: String, reason: String },

    /// Fetching the identity failed in a way worth retrying.
    #[error("Identity fetch for {host} failed: {reason}")]
    Transient { host: String, reason: String },
}

impl KeyStoreError {
    /// Whether the caller may retry the same request later.
    pub fn is_transient(&self) -> bool {
        matches!(self, KeyStoreError::Transient { .. })
    }
}
