//! HTTP identity source: `GET {scheme}://{host}/v1/identity`.

use crate::ports::outbound::{FetchError, IdentityFetcher};
use reqwest::StatusCode;
use shared_types::IdentityDocument;
use tracing::debug;

/// Path every node serves its identity document on.
pub const IDENTITY_PATH: &str = "/v1/identity";

/// Fetches identity documents over HTTP(S).
#[derive(Debug, Clone)]
pub struct HttpIdentityFetcher {
    client: reqwest::Client,
    scheme: &'static str,
}

impl HttpIdentityFetcher {
    /// HTTPS fetcher sharing `client`'s connection pool.
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            scheme: "https",
        }
    }

    /// Plain HTTP, for local development only.
    pub fn insecure(client: reqwest::Client) -> Self {
        Self {
            client,
            scheme: "http",
        }
    }

    pub fn identity_url(&self, host: &str) -> String {
        format!("{}://{}{}", self.scheme, host, IDENTITY_PATH)
    }
}

#[async_trait::async_trait]
impl IdentityFetcher for HttpIdentityFetcher {
    async fn fetch(&self, host: &str) -> Result<IdentityDocument, FetchError> {
        let url = self.identity_url(host);
        debug!(url = %url, "Requesting identity document");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        match response.status() {
            StatusCode::NOT_FOUND => return Err(FetchError::NotFound(host.to_string())),
            status if status.is_server_error() => {
                return Err(FetchError::Network(format!("{url} returned {status}")))
            }
            status if !status.is_success() => {
                return Err(FetchError::Malformed(format!("{url} returned {status}")))
            }
            _ => {}
        }

        response
            .json::<IdentityDocument>()
            .await
            .map_err(|e| FetchError::Malformed(e.to_string()))
    }
}
