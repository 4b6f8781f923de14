//! # Signing Subsystem (CX-02)
//!
//! Canonical serialization, signing and verification of everything that
//! crosses a domain boundary in the exchange.
//!
//! ## Architecture
//!
//! - **Domain Layer** (`domain/`): canonical byte layout and the closed set
//!   of signing definitions. Pure, no keys, no I/O
//! - **Service Layer** (`service/`): signer, verifier, seed and response
//!   builders on top of the key store
//!
//! ## Security Notes
//!
//! - Signed sub-objects are covered by their signature string, so an
//!   identifier cannot be re-serialized differently between hops.
//! - The message type is part of every transport signature, so a read request
//!   cannot be replayed as a delete.
//! - Requests bind the caller (Origin or return URL); responses bind the
//!   receiver but not the transport.

pub mod domain;
pub mod service;

// Re-export public API
pub use domain::canonical::{canonical_json, CanonicalBytes, SEPARATOR};
pub use domain::definitions::{AsPayload, PayloadView, SigningContext, SigningDefinition, EMPTY_RESULT};
pub use domain::errors::{DefinitionError, SigningError, VerificationError};
pub use service::{ResponseBuilder, SeedBuilder, Signer, Verifier, VerifierConfig};
