//! Crypto error types.

use thiserror::Error;

/// Cryptographic operation errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CryptoError {
    /// Signature verification failed
    #[error("Signature verification failed")]
    SignatureVerificationFailed,

    /// Signature is not 64 bytes of URL-safe base64
    #[error("Invalid signature encoding")]
    InvalidSignatureEncoding,

    /// Invalid public key (bad PEM, wrong curve, point not on curve)
    #[error("Invalid public key: {0}")]
    InvalidPublicKey(String),

    /// Invalid private key
    #[error("Invalid private key: {0}")]
    InvalidPrivateKey(String),

    /// Key could not be serialized
    #[error("Key encoding failed: {0}")]
    KeyEncoding(String),
}
