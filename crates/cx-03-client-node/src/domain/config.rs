//! Client node configuration with validation.
//!
//! Loaded once at startup. Every section has defaults so a file only needs to
//! name what differs, but `validate()` refuses to start a node without an own
//! identity, an operator and at least one allowed caller origin.

use serde::{Deserialize, Serialize};
use shared_types::{IdentityDocument, PartyType};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

/// Main client node configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// HTTP server configuration
    pub http: HttpConfig,
    /// Own identity and private keys
    pub identity: IdentityConfig,
    /// Operator this node talks to
    pub operator: OperatorConfig,
    /// Web origins allowed to call the proxy endpoints
    pub allowed_origins: Vec<String>,
    /// CORS configuration
    pub cors: CorsConfig,
    /// Key store and verification timings
    pub key_store: KeyStoreSettings,
    /// Counterparty identities pinned from configuration
    pub counterparties: Vec<IdentityDocument>,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            http: HttpConfig::default(),
            identity: IdentityConfig::default(),
            operator: OperatorConfig::default(),
            allowed_origins: Vec::new(),
            cors: CorsConfig::default(),
            key_store: KeyStoreSettings::default(),
            counterparties: Vec::new(),
        }
    }
}

impl NodeConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.identity.host.trim().is_empty() {
            return Err(ConfigError::MissingField("identity.host"));
        }
        if self.identity.keys.is_empty() {
            return Err(ConfigError::MissingField("identity.keys"));
        }
        for key in &self.identity.keys {
            key.validate()?;
        }

        if self.operator.host.trim().is_empty() {
            return Err(ConfigError::MissingField("operator.host"));
        }
        self.operator.base_url()?;

        if self.allowed_origins.is_empty() {
            return Err(ConfigError::MissingField("allowed_origins"));
        }
        for origin in &self.allowed_origins {
            if normalize_origin(origin).is_none() {
                return Err(ConfigError::InvalidOrigin(origin.clone()));
            }
        }

        if self.http.max_body_size == 0 {
            return Err(ConfigError::InvalidLimit(
                "max_body_size cannot be 0".into(),
            ));
        }
        if self.http.request_timeout.is_zero() {
            return Err(ConfigError::InvalidTimeout(
                "request_timeout cannot be 0".into(),
            ));
        }
        if self.key_store.fetch_timeout.is_zero() {
            return Err(ConfigError::InvalidTimeout(
                "fetch_timeout cannot be 0".into(),
            ));
        }
        if self.key_store.message_max_age_secs == 0 {
            return Err(ConfigError::InvalidTimeout(
                "message_max_age_secs cannot be 0".into(),
            ));
        }

        Ok(())
    }

    /// Get HTTP server bind address
    pub fn http_addr(&self) -> SocketAddr {
        SocketAddr::new(self.http.host, self.http.port)
    }
}

/// Scheme and host of `origin`, as a browser would send it in `Origin`.
///
/// Returns `None` for anything that is not an http(s) origin, or that carries
/// a path, query or fragment.
pub fn normalize_origin(origin: &str) -> Option<String> {
    let url = Url::parse(origin).ok()?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return None;
    }
    if url.path() != "/" || url.query().is_some() || url.fragment().is_some() {
        return None;
    }
    Some(url.origin().ascii_serialization())
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Bind address
    pub host: IpAddr,
    /// Port (default: 3000)
    pub port: u16,
    /// Largest accepted request body, in bytes
    pub max_body_size: usize,
    /// Upper bound on handling one request
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)),
            port: 3000,
            max_body_size: 64 * 1024,
            request_timeout: Duration::from_secs(10),
        }
    }
}

/// This node's identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    /// Host this node signs as
    pub host: String,
    /// Display name in the identity document
    pub name: String,
    #[serde(rename = "type")]
    pub party_type: PartyType,
    pub dpo_email: Option<String>,
    pub privacy_policy_url: Option<String>,
    /// Private keys with their validity windows
    pub keys: Vec<KeyConfig>,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            name: String::new(),
            party_type: PartyType::Vendor,
            dpo_email: None,
            privacy_policy_url: None,
            keys: Vec::new(),
        }
    }
}

/// One private key: inline PEM or a path to a PEM file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyConfig {
    pub private_key_pem: Option<String>,
    pub private_key_path: Option<PathBuf>,
    pub start: u64,
    pub end: u64,
}

impl KeyConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        match (&self.private_key_pem, &self.private_key_path) {
            (Some(_), Some(_)) => {
                return Err(ConfigError::InvalidKey(
                    "set private_key_pem or private_key_path, not both".into(),
                ))
            }
            (None, None) => {
                return Err(ConfigError::InvalidKey(
                    "private_key_pem or private_key_path is required".into(),
                ))
            }
            _ => {}
        }
        if self.start >= self.end {
            return Err(ConfigError::InvalidKey(format!(
                "empty key window [{}, {})",
                self.start, self.end
            )));
        }
        Ok(())
    }

    /// PEM text of the key, reading the file if configured by path.
    pub fn load_pem(&self) -> Result<String, ConfigError> {
        if let Some(pem) = &self.private_key_pem {
            return Ok(pem.clone());
        }
        let path = self
            .private_key_path
            .as_ref()
            .ok_or_else(|| ConfigError::InvalidKey("no key source configured".into()))?;
        std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
    }
}

/// Operator endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OperatorConfig {
    pub host: String,
    /// `https` in production; `http` for local development
    pub scheme: String,
}

impl Default for OperatorConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            scheme: "https".to_string(),
        }
    }
}

impl OperatorConfig {
    pub fn base_url(&self) -> Result<Url, ConfigError> {
        if !matches!(self.scheme.as_str(), "http" | "https") {
            return Err(ConfigError::Invalid(format!(
                "unsupported operator scheme: {}",
                self.scheme
            )));
        }
        Url::parse(&format!("{}://{}", self.scheme, self.host))
            .map_err(|e| ConfigError::Invalid(format!("operator host {}: {e}", self.host)))
    }
}

/// CORS configuration. Allowed origins come from `NodeConfig::allowed_origins`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    pub enabled: bool,
    pub allowed_methods: Vec<String>,
    pub allowed_headers: Vec<String>,
    pub expose_headers: Vec<String>,
    /// Preflight cache lifetime, in seconds
    pub max_age: u64,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            allowed_methods: vec![
                "GET".to_string(),
                "POST".to_string(),
                "DELETE".to_string(),
                "OPTIONS".to_string(),
            ],
            allowed_headers: vec!["Content-Type".to_string()],
            expose_headers: vec![],
            max_age: 3600,
        }
    }
}

/// Key store and verification timings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyStoreSettings {
    /// Upper bound on one identity document fetch
    #[serde(with = "humantime_serde")]
    pub fetch_timeout: Duration,
    /// Fetched identities older than this are refreshed before use
    pub identity_max_age_secs: u64,
    /// Misses on a recently fetched identity do not refetch
    pub min_refresh_interval_secs: u64,
    /// Oldest accepted transport message
    pub message_max_age_secs: u64,
    /// Tolerated clock difference for future-dated timestamps
    pub max_clock_skew_secs: u64,
    /// Fetch identity documents over plain http (local development only)
    pub insecure_http: bool,
}

impl Default for KeyStoreSettings {
    fn default() -> Self {
        Self {
            fetch_timeout: Duration::from_secs(5),
            identity_max_age_secs: 3_600,
            min_refresh_interval_secs: 30,
            message_max_age_secs: 300,
            max_clock_skew_secs: 30,
            insecure_http: false,
        }
    }
}

impl KeyStoreSettings {
    pub fn key_store_config(&self) -> cx_01_key_store::KeyStoreConfig {
        cx_01_key_store::KeyStoreConfig {
            fetch_timeout: self.fetch_timeout,
            max_age_secs: self.identity_max_age_secs,
            min_refresh_interval_secs: self.min_refresh_interval_secs,
        }
    }

    pub fn verifier_config(&self) -> cx_02_signing::VerifierConfig {
        cx_02_signing::VerifierConfig {
            max_age_secs: self.message_max_age_secs,
            max_skew_secs: self.max_clock_skew_secs,
        }
    }
}

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// A required setting is absent or empty
    #[error("missing configuration: {0}")]
    MissingField(&'static str),
    /// An allowed origin is not a bare http(s) origin
    #[error("invalid origin: {0}")]
    InvalidOrigin(String),
    /// A key entry is incomplete or has an empty window
    #[error("invalid key: {0}")]
    InvalidKey(String),
    /// Invalid size limit
    #[error("invalid limit: {0}")]
    InvalidLimit(String),
    /// Invalid timeout value
    #[error("invalid timeout: {0}")]
    InvalidTimeout(String),
    /// A file named in the configuration could not be read
    #[error("cannot read {path}: {reason}")]
    Io { path: String, reason: String },
    /// General configuration error
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Duration (de)serialization as `"5s"`, `"500ms"`, `"2m"` or plain seconds
mod humantime_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if duration.subsec_millis() == 0 {
            serializer.serialize_str(&format!("{}s", duration.as_secs()))
        } else {
            serializer.serialize_str(&format!("{}ms", duration.as_millis()))
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse_duration(&s).map_err(serde::de::Error::custom)
    }

    pub(super) fn parse_duration(s: &str) -> Result<Duration, &'static str> {
        let s = s.trim();
        if let Some(ms) = s.strip_suffix("ms") {
            ms.trim()
                .parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|_| "invalid milliseconds")
        } else if let Some(secs) = s.strip_suffix('s') {
            secs.trim()
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| "invalid seconds")
        } else if let Some(mins) = s.strip_suffix('m') {
            mins.trim()
                .parse::<u64>()
                .ok()
                .and_then(|m| m.checked_mul(60))
                .map(Duration::from_secs)
                .ok_or("invalid minutes")
        } else {
            s.parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| "invalid duration format")
        }
    }
}
