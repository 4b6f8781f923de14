//! # Key Store (CX-01)
//!
//! Per-host public identities with time-windowed key rotation, plus this
//! node's own signing keys.
//!
//! ## Architecture
//!
//! - **Domain Layer** (`domain/`): identities, windows, errors. No I/O
//! - **Ports Layer** (`ports/`): the identity source the store depends on
//! - **Adapters** (`adapters/`): HTTP and in-memory identity sources
//! - **Service Layer** (`service.rs`): the cache with single-flight refresh
//!
//! ## Key Selection
//!
//! A message is checked with the key whose window `[start, end)` covers the
//! message's own timestamp, not the verifier's clock. Windows of one host
//! never overlap, so the choice is unambiguous.

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

// Re-export public API
pub use adapters::{HttpIdentityFetcher, StaticIdentityFetcher};
pub use domain::entities::{
    identity_from_document, Identity, IdentityOrigin, KeyWindow, LocalIdentity,
};
pub use domain::errors::KeyStoreError;
pub use ports::outbound::{FetchError, IdentityFetcher};
pub use service::{KeyStore, KeyStoreConfig};
