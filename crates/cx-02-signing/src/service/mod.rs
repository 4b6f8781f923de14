//! # Service Layer
//!
//! Wires definitions to keys: the signer produces signatures with the local
//! identity's active key, the verifier resolves counterparty keys from the
//! key store at the signed timestamp.

pub mod response;
pub mod seed;
pub mod signer;
pub mod verifier;

pub use response::ResponseBuilder;
pub use seed::SeedBuilder;
pub use signer::Signer;
pub use verifier::{Verifier, VerifierConfig};
