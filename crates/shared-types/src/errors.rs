//! # Error Types
//!
//! Parsing errors for the shared wire model.

use thiserror::Error;

/// Errors raised while interpreting wire values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TypesError {
    /// The `messageType` string is not one of the closed set.
    #[error("Unknown message type: {0}")]
    UnknownMessageType(String),

    /// The party type is not operator, vendor or cmp.
    #[error("Unknown party type: {0}")]
    UnknownPartyType(String),

    /// A key window ends before (or when) it starts.
    #[error("Empty key window: start {start} >= end {end}")]
    EmptyKeyWindow { start: u64, end: u64 },
}
