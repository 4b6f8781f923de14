//! # Outbound Ports (Driven Ports / SPI)
//!
//! How the key store obtains a counterparty's identity document.

use shared_types::IdentityDocument;
use thiserror::Error;

/// Error from an identity source.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The host does not publish an identity.
    #[error("No identity published by {0}")]
    NotFound(String),

    /// The document was retrieved but could not be parsed.
    #[error("Malformed identity document: {0}")]
    Malformed(String),

    /// Network or upstream failure.
    #[error("Communication error: {0}")]
    Network(String),
}

/// Source of identity documents.
///
/// Implementations must not retry internally; the key store owns timeouts.
#[async_trait::async_trait]
pub trait IdentityFetcher: Send + Sync {
    /// Fetch the current identity document of `host`.
    ///
    /// # Errors
    /// * `FetchError::NotFound` - the host has no identity
    /// * `FetchError::Malformed` - the response was not an identity document
    /// * `FetchError::Network` - the host could not be reached
    async fn fetch(&self, host: &str) -> Result<IdentityDocument, FetchError>;
}
