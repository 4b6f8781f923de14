//! In-memory identity source.

use crate::ports::outbound::{FetchError, IdentityFetcher};
use dashmap::DashMap;
use shared_types::IdentityDocument;

/// Serves identity documents registered up front.
#[derive(Debug, Default)]
pub struct StaticIdentityFetcher {
    documents: DashMap<String, IdentityDocument>,
}

impl StaticIdentityFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace the document served for its host.
    pub fn insert(&self, document: IdentityDocument) {
        self.documents.insert(document.host.clone(), document);
    }

    pub fn remove(&self, host: &str) {
        self.documents.remove(host);
    }
}

impl FromIterator<IdentityDocument> for StaticIdentityFetcher {
    fn from_iter<I: IntoIterator<Item = IdentityDocument>>(iter: I) -> Self {
        let fetcher = Self::new();
        for document in iter {
            fetcher.insert(document);
        }
        fetcher
    }
}

#[async_trait::async_trait]
impl IdentityFetcher for StaticIdentityFetcher {
    async fn fetch(&self, host: &str) -> Result<IdentityDocument, FetchError> {
        self.documents
            .get(host)
            .map(|doc| doc.value().clone())
            .ok_or_else(|| FetchError::NotFound(host.to_string()))
    }
}
