//! # Signing Errors
//!
//! Canonicalization, signing and verification failures.

use cx_01_key_store::KeyStoreError;
use shared_types::MessageType;
use thiserror::Error;

/// A payload could not be canonicalized. Nothing is ever defaulted.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DefinitionError {
    /// A required field is empty or absent.
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    /// A text field contains the canonical separator.
    #[error("Field {0} contains the reserved separator character")]
    ForbiddenCharacter(&'static str),

    /// JSON data holds a NaN or infinite number.
    #[error("Non-finite number in JSON data")]
    NonFiniteNumber,

    /// The payload shape does not belong to the message type.
    #[error("Payload does not match message type {0}")]
    PayloadMismatch(MessageType),
}

/// Errors while producing a signature.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SigningError {
    #[error(transparent)]
    Definition(#[from] DefinitionError),

    #[error(transparent)]
    KeyStore(#[from] KeyStoreError),
}

/// Why a signed object was rejected.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum VerificationError {
    #[error(transparent)]
    Definition(#[from] DefinitionError),

    /// Signer key could not be resolved at the message timestamp.
    #[error(transparent)]
    KeyStore(#[from] KeyStoreError),

    /// Older than the accepted message age.
    #[error("Message timestamp {timestamp} expired (now {now})")]
    Expired { timestamp: u64, now: u64 },

    /// Further in the future than the accepted clock skew.
    #[error("Message timestamp {timestamp} is in the future (now {now})")]
    FutureDated { timestamp: u64, now: u64 },

    /// Signed by someone other than the expected party.
    #[error("Unexpected signer: expected {expected}, got {actual}")]
    UnexpectedSigner { expected: String, actual: String },

    /// Addressed to another party.
    #[error("Message addressed to {actual}, not {expected}")]
    UnexpectedReceiver { expected: String, actual: String },

    /// The signature does not match the canonical bytes under the resolved key.
    #[error("Signature verification failed for signer {signer}")]
    SignatureMismatch { signer: String },
}
