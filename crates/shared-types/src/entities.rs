//! # Domain Entities
//!
//! Identifiers, preferences and seeds as they travel on the wire.
//!
//! Identifiers and preferences are long-lived signed objects: each carries a
//! [`Source`] naming the party that signed it and when. They are later embedded,
//! by signature, inside request and response envelopes.

use crate::PROTOCOL_VERSION;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Identifier type issued by the operator for browser-scoped ids.
pub const BROWSER_ID_TYPE: &str = "paf_browser_id";

/// Consent state as an ordered map. Key order never depends on insertion.
pub type PreferenceData = BTreeMap<String, Value>;

// =============================================================================
// SIGNED SUB-OBJECTS
// =============================================================================

/// Provenance of a signed sub-object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    /// Host of the party that produced the signature.
    pub domain: String,
    /// Signing time (seconds).
    pub timestamp: u64,
    /// URL-safe base64 `r‖s` signature.
    pub signature: String,
}

/// Pseudonymous identifier, signed by the operator that issued it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identifier {
    pub version: String,
    #[serde(rename = "type")]
    pub id_type: String,
    pub value: String,
    /// Whether the operator has stored the id in its first-party cookie.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persisted: Option<bool>,
    pub source: Source,
}

/// Preferences before signing: what a sign-preferences call receives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnsignedPreferences {
    #[serde(default = "default_version")]
    pub version: String,
    pub data: PreferenceData,
}

/// Consent preferences, signed by the vendor or CMP that collected them.
///
/// The signature covers the identifiers the preferences were expressed
/// against, so preferences cannot be replayed onto another user's id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preferences {
    pub version: String,
    pub data: PreferenceData,
    pub source: Source,
}

/// The identity and consent state exchanged with the operator.
///
/// A user the operator has not seen before has identifiers but no
/// preferences yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdsAndPreferences {
    pub identifiers: Vec<Identifier>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferences: Option<Preferences>,
}

// =============================================================================
// SEEDS
// =============================================================================

/// A seed hop before signing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnsignedSeed {
    pub transaction_ids: Vec<String>,
    pub data: Value,
    pub signer_host: String,
    pub timestamp: u64,
}

/// One signed audit hop over a set of transaction ids.
///
/// A seed only asserts its own hop. Chains of seeds are assembled and ordered
/// by whoever collects them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Seed {
    version: String,
    transaction_ids: Vec<String>,
    data: Value,
    signer_host: String,
    timestamp: u64,
    signature: String,
}

impl Seed {
    /// Attach a signature to an unsigned hop.
    pub fn new(unsigned: UnsignedSeed, signature: String) -> Self {
        Self {
            version: PROTOCOL_VERSION.to_string(),
            transaction_ids: unsigned.transaction_ids,
            data: unsigned.data,
            signer_host: unsigned.signer_host,
            timestamp: unsigned.timestamp,
            signature,
        }
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn transaction_ids(&self) -> &[String] {
        &self.transaction_ids
    }

    pub fn data(&self) -> &Value {
        &self.data
    }

    pub fn signer_host(&self) -> &str {
        &self.signer_host
    }

    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    pub fn signature(&self) -> &str {
        &self.signature
    }
}

fn default_version() -> String {
    PROTOCOL_VERSION.to_string()
}
