//! # Domain Entities
//!
//! Identities and their rotation windows.
//!
//! An identity snapshot is never edited after construction. The key store
//! swaps whole snapshots behind an `Arc`, so a reader holding one always sees
//! a consistent key set.

use super::errors::KeyStoreError;
use shared_crypto::DigitalSignature;
use shared_types::{IdentityDocument, KeyDocument, PartyType};
use std::sync::Arc;

// =============================================================================
// KEY WINDOWS
// =============================================================================

/// A key and the window `[start, end)` during which it is valid.
#[derive(Debug, Clone)]
pub struct KeyWindow<K> {
    pub start: u64,
    pub end: u64,
    pub key: K,
}

impl<K> KeyWindow<K> {
    pub fn new(start: u64, end: u64, key: K) -> Self {
        Self { start, end, key }
    }

    pub fn covers(&self, at: u64) -> bool {
        self.start <= at && at < self.end
    }
}

/// Sort windows by start and reject empty or overlapping ones.
pub fn validate_windows<K>(host: &str, windows: &mut [KeyWindow<K>]) -> Result<(), KeyStoreError> {
    windows.sort_by_key(|w| w.start);

    if let Some(empty) = windows.iter().find(|w| w.start >= w.end) {
        return Err(KeyStoreError::InvalidIdentity {
            host: host.to_string(),
            reason: format!("empty key window [{}, {})", empty.start, empty.end),
        });
    }

    for pair in windows.windows(2) {
        if pair[1].start < pair[0].end {
            return Err(KeyStoreError::InvalidIdentity {
                host: host.to_string(),
                reason: format!(
                    "overlapping key windows [{}, {}) and [{}, {})",
                    pair[0].start, pair[0].end, pair[1].start, pair[1].end
                ),
            });
        }
    }

    Ok(())
}

fn key_at<K>(windows: &[KeyWindow<K>], at: u64) -> Option<&K> {
    windows.iter().find(|w| w.covers(at)).map(|w| &w.key)
}

// =============================================================================
// COUNTERPARTY IDENTITIES
// =============================================================================

/// Where a cached identity came from. Only fetched identities are refreshed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityOrigin {
    /// This node's own identity.
    Local,
    /// Pinned from configuration.
    Static,
    /// Parsed from the host's identity document at the given time.
    Fetched { at: u64 },
}

/// Public identity of one host: its role and ordered, non-overlapping keys.
#[derive(Debug, Clone)]
pub struct Identity<K> {
    host: String,
    name: String,
    party_type: PartyType,
    windows: Vec<KeyWindow<K>>,
    origin: IdentityOrigin,
}

impl<K> Identity<K> {
    pub fn new(
        host: impl Into<String>,
        name: impl Into<String>,
        party_type: PartyType,
        mut windows: Vec<KeyWindow<K>>,
        origin: IdentityOrigin,
    ) -> Result<Self, KeyStoreError> {
        let host = host.into();
        validate_windows(&host, &mut windows)?;
        Ok(Self {
            host,
            name: name.into(),
            party_type,
            windows,
            origin,
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn party_type(&self) -> PartyType {
        self.party_type
    }

    pub fn origin(&self) -> IdentityOrigin {
        self.origin
    }

    pub fn windows(&self) -> &[KeyWindow<K>] {
        &self.windows
    }

    /// Key whose window covers `at`, if any.
    pub fn key_at(&self, at: u64) -> Option<&K> {
        key_at(&self.windows, at)
    }
}

/// Parse an identity document, pre-checking every key before it is trusted.
pub fn identity_from_document<E: DigitalSignature>(
    engine: &E,
    document: &IdentityDocument,
    origin: IdentityOrigin,
) -> Result<Identity<E::PublicKey>, KeyStoreError> {
    let windows = document
        .keys
        .iter()
        .map(|doc| {
            if !engine.is_valid_key(&doc.key) {
                return Err(KeyStoreError::InvalidIdentity {
                    host: document.host.clone(),
                    reason: format!("structurally invalid key for window starting {}", doc.start),
                });
            }
            let key = engine
                .parse_public_key(&doc.key)
                .map_err(|e| KeyStoreError::InvalidIdentity {
                    host: document.host.clone(),
                    reason: e.to_string(),
                })?;
            Ok(KeyWindow::new(doc.start, doc.end, key))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Identity::new(
        document.host.clone(),
        document.name.clone(),
        document.party_type,
        windows,
        origin,
    )
}

// =============================================================================
// LOCAL IDENTITY
// =============================================================================

/// This node's own identity, holding private keys.
#[derive(Debug)]
pub struct LocalIdentity<E: DigitalSignature> {
    host: String,
    name: String,
    party_type: PartyType,
    dpo_email: Option<String>,
    privacy_policy_url: Option<String>,
    windows: Vec<KeyWindow<Arc<E::PrivateKey>>>,
}

impl<E: DigitalSignature> LocalIdentity<E> {
    pub fn new(
        host: impl Into<String>,
        name: impl Into<String>,
        party_type: PartyType,
        keys: Vec<KeyWindow<E::PrivateKey>>,
    ) -> Result<Self, KeyStoreError> {
        let host = host.into();
        let mut windows: Vec<_> = keys
            .into_iter()
            .map(|w| KeyWindow::new(w.start, w.end, Arc::new(w.key)))
            .collect();
        validate_windows(&host, &mut windows)?;

        Ok(Self {
            host,
            name: name.into(),
            party_type,
            dpo_email: None,
            privacy_policy_url: None,
            windows,
        })
    }

    pub fn with_contact(mut self, dpo_email: Option<String>, privacy_policy_url: Option<String>) -> Self {
        self.dpo_email = dpo_email;
        self.privacy_policy_url = privacy_policy_url;
        self
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn party_type(&self) -> PartyType {
        self.party_type
    }

    /// Private key valid at `now`. A lapsed rotation is a configuration fault.
    pub fn signing_key(&self, now: u64) -> Result<Arc<E::PrivateKey>, KeyStoreError> {
        key_at(&self.windows, now)
            .cloned()
            .ok_or_else(|| KeyStoreError::NoActiveKey {
                host: self.host.clone(),
                now,
            })
    }

    /// Public view of this identity, as counterparties see it.
    pub fn public_identity(&self, engine: &E) -> Identity<E::PublicKey> {
        Identity {
            host: self.host.clone(),
            name: self.name.clone(),
            party_type: self.party_type,
            windows: self
                .windows
                .iter()
                .map(|w| KeyWindow::new(w.start, w.end, engine.public_key_of(&w.key)))
                .collect(),
            origin: IdentityOrigin::Local,
        }
    }

    /// Identity document served to counterparties.
    pub fn document(&self, engine: &E) -> Result<IdentityDocument, KeyStoreError> {
        let keys = self
            .windows
            .iter()
            .map(|w| {
                let pem = engine
                    .public_key_pem(&engine.public_key_of(&w.key))
                    .map_err(|e| KeyStoreError::InvalidIdentity {
                        host: self.host.clone(),
                        reason: e.to_string(),
                    })?;
                Ok(KeyDocument {
                    key: pem,
                    start: w.start,
                    end: w.end,
                })
            })
            .collect::<Result<Vec<_>, KeyStoreError>>()?;

        Ok(IdentityDocument {
            name: self.name.clone(),
            party_type: self.party_type,
            host: self.host.clone(),
            version: shared_types::PROTOCOL_VERSION.to_string(),
            dpo_email: self.dpo_email.clone(),
            privacy_policy_url: self.privacy_policy_url.clone(),
            keys,
        })
    }
}
