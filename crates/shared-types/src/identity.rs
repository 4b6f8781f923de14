//! # Identity Documents
//!
//! The public description of a party: who it is and which keys it signs with
//! over which time windows. Served by every node at `/v1/identity` and parsed
//! by counterparties when they refresh their key stores.

use crate::errors::TypesError;
use crate::PROTOCOL_VERSION;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Role of a party in the exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartyType {
    Operator,
    Vendor,
    Cmp,
}

impl fmt::Display for PartyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PartyType::Operator => "operator",
            PartyType::Vendor => "vendor",
            PartyType::Cmp => "cmp",
        })
    }
}

impl FromStr for PartyType {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "operator" => Ok(PartyType::Operator),
            "vendor" => Ok(PartyType::Vendor),
            "cmp" => Ok(PartyType::Cmp),
            other => Err(TypesError::UnknownPartyType(other.to_string())),
        }
    }
}

/// One public key and the window `[start, end)` during which it is valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyDocument {
    /// SPKI PEM of a P-256 public key.
    pub key: String,
    pub start: u64,
    pub end: u64,
}

impl KeyDocument {
    pub fn new(key: impl Into<String>, start: u64, end: u64) -> Result<Self, TypesError> {
        if start >= end {
            return Err(TypesError::EmptyKeyWindow { start, end });
        }
        Ok(Self {
            key: key.into(),
            start,
            end,
        })
    }

    pub fn covers(&self, at: u64) -> bool {
        self.start <= at && at < self.end
    }
}

/// Public identity of a party.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityDocument {
    pub name: String,
    #[serde(rename = "type")]
    pub party_type: PartyType,
    pub host: String,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dpo_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub privacy_policy_url: Option<String>,
    pub keys: Vec<KeyDocument>,
}

fn default_version() -> String {
    PROTOCOL_VERSION.to_string()
}
