//! # Shared Crypto - Digital Signature Engine
//!
//! ## Components
//!
//! | Module | Algorithm | Use Case |
//! |--------|-----------|----------|
//! | `signatures` | capability trait | Pluggable sign/verify for the key store and verifier |
//! | `ecdsa` | ECDSA P-256 / SHA-256 | Signing every exchanged message |
//!
//! ## Security Properties
//!
//! - **P-256**: RFC 6979 deterministic nonces, low-S normalized output
//! - **Fixed encoding**: 64-byte `r‖s`, never DER, so a signature fits one URL
//!   parameter without ambiguity
//! - **Key pre-check**: foreign PEM keys are parsed and checked for curve and
//!   point validity before they are trusted

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod ecdsa;
pub mod errors;
pub mod signatures;

// Re-exports
pub use ecdsa::{P256KeyPair, P256PublicKey, P256Signature};
pub use errors::CryptoError;
pub use signatures::{DigitalSignature, EcdsaP256};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
