//! Web origins allowed to use this node.

use super::config::{normalize_origin, ConfigError};
use std::collections::BTreeSet;
use std::sync::Arc;
use url::Url;

/// Normalized set of allowed caller origins (`scheme://host[:port]`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowedOrigins(Arc<BTreeSet<String>>);

impl AllowedOrigins {
    pub fn new<I, S>(origins: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let set = origins
            .into_iter()
            .map(|o| {
                normalize_origin(o.as_ref()).ok_or_else(|| ConfigError::InvalidOrigin(o.as_ref().to_string()))
            })
            .collect::<Result<BTreeSet<_>, _>>()?;
        Ok(Self(Arc::new(set)))
    }

    /// Whether an `Origin` header value is allowed.
    pub fn allows(&self, origin: &str) -> bool {
        normalize_origin(origin).is_some_and(|o| self.0.contains(&o))
    }

    /// Whether the origin of `url` is allowed.
    pub fn allows_url(&self, url: &Url) -> bool {
        self.0.contains(&url.origin().ascii_serialization())
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
