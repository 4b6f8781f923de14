//! # Key Store Service
//!
//! Per-host identity cache in front of an [`IdentityFetcher`].
//!
//! ## Concurrency
//!
//! - Readers get an `Arc` snapshot and never block on a refresh in progress.
//! - At most one fetch per host is in flight. Concurrent callers await the
//!   same shared future; no map guard is held across the await.
//! - The fetch runs on its own task and clears its in-flight entry when it
//!   ends, so a caller that gives up waiting never strands the next one.
//! - A refresh replaces the whole snapshot, so lookups never see a partially
//!   updated key set.

use crate::domain::entities::{identity_from_document, Identity, IdentityOrigin, LocalIdentity};
use crate::domain::errors::KeyStoreError;
use crate::ports::outbound::{FetchError, IdentityFetcher};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::future::{BoxFuture, FutureExt, Shared};
use shared_crypto::{DigitalSignature, EcdsaP256};
use shared_types::{Clock, IdentityDocument};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

type Snapshot<K> = Arc<Identity<K>>;
type RefreshFuture<K> = Shared<BoxFuture<'static, Result<Snapshot<K>, KeyStoreError>>>;

/// Tuning for identity refresh.
#[derive(Debug, Clone)]
pub struct KeyStoreConfig {
    /// Upper bound on one identity fetch.
    pub fetch_timeout: Duration,
    /// Fetched identities older than this are refreshed before use.
    pub max_age_secs: u64,
    /// A miss on a fetched identity younger than this does not refetch.
    pub min_refresh_interval_secs: u64,
}

impl Default for KeyStoreConfig {
    fn default() -> Self {
        Self {
            fetch_timeout: Duration::from_secs(5),
            max_age_secs: 3_600,
            min_refresh_interval_secs: 30,
        }
    }
}

/// Identity cache and signing key holder for one node.
pub struct KeyStore<E: DigitalSignature = EcdsaP256> {
    engine: Arc<E>,
    local: LocalIdentity<E>,
    identities: Arc<DashMap<String, Snapshot<E::PublicKey>>>,
    inflight: Arc<DashMap<String, RefreshFuture<E::PublicKey>>>,
    fetcher: Arc<dyn IdentityFetcher>,
    clock: Arc<dyn Clock>,
    config: KeyStoreConfig,
}

impl<E: DigitalSignature> std::fmt::Debug for KeyStore<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyStore")
            .field("algorithm", &self.engine.algorithm())
            .field("host", &self.local.host())
            .field("cached_hosts", &self.identities.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<E: DigitalSignature> KeyStore<E> {
    pub fn new(
        engine: E,
        local: LocalIdentity<E>,
        fetcher: Arc<dyn IdentityFetcher>,
        clock: Arc<dyn Clock>,
        config: KeyStoreConfig,
    ) -> Self {
        let identities = DashMap::new();
        identities.insert(
            local.host().to_string(),
            Arc::new(local.public_identity(&engine)),
        );

        Self {
            engine: Arc::new(engine),
            local,
            identities: Arc::new(identities),
            inflight: Arc::new(DashMap::new()),
            fetcher,
            clock,
            config,
        }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn local(&self) -> &LocalIdentity<E> {
        &self.local
    }

    /// Host this node signs as.
    pub fn host(&self) -> &str {
        self.local.host()
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn now(&self) -> u64 {
        self.clock.now()
    }

    // =========================================================================
    // LOCAL IDENTITY
    // =========================================================================

    /// Private key for signing right now.
    pub fn signing_key(&self) -> Result<Arc<E::PrivateKey>, KeyStoreError> {
        self.local.signing_key(self.clock.now())
    }

    /// Document served at `/v1/identity`.
    pub fn self_document(&self) -> Result<IdentityDocument, KeyStoreError> {
        self.local.document(&self.engine)
    }

    // =========================================================================
    // COUNTERPARTIES
    // =========================================================================

    /// Pin a counterparty from configuration. Pinned identities are never refetched.
    pub fn pin(&self, document: &IdentityDocument) -> Result<(), KeyStoreError> {
        let identity = identity_from_document(&*self.engine, document, IdentityOrigin::Static)?;
        info!(host = %identity.host(), keys = identity.windows().len(), "Pinned identity");
        self.insert(identity);
        Ok(())
    }

    /// Replace the snapshot for the identity's host.
    pub fn insert(&self, identity: Identity<E::PublicKey>) {
        self.identities
            .insert(identity.host().to_string(), Arc::new(identity));
    }

    pub fn cached(&self, host: &str) -> Option<Snapshot<E::PublicKey>> {
        self.identities.get(host).map(|entry| Arc::clone(entry.value()))
    }

    /// Hosts with a cached identity.
    pub fn hosts(&self) -> Vec<String> {
        let mut hosts: Vec<String> = self.identities.iter().map(|e| e.key().clone()).collect();
        hosts.sort();
        hosts
    }

    /// Public key of `host` valid at `at`.
    ///
    /// A miss or a stale snapshot triggers one refresh. If that refresh fails
    /// transiently, a stale snapshot that still covers `at` is used.
    pub async fn public_key(&self, host: &str, at: u64) -> Result<E::PublicKey, KeyStoreError> {
        let now = self.clock.now();
        let cached = self.cached(host);

        if let Some(identity) = &cached {
            match identity.origin() {
                IdentityOrigin::Local | IdentityOrigin::Static => {
                    return identity.key_at(at).cloned().ok_or_else(|| key_not_found(host, at));
                }
                IdentityOrigin::Fetched { at: fetched_at } => {
                    let age = now.saturating_sub(fetched_at);
                    match identity.key_at(at) {
                        Some(key) if age <= self.config.max_age_secs => return Ok(key.clone()),
                        None if age < self.config.min_refresh_interval_secs => {
                            return Err(key_not_found(host, at));
                        }
                        _ => {}
                    }
                }
            }
        }

        match self.refresh(host).await {
            Ok(identity) => identity.key_at(at).cloned().ok_or_else(|| key_not_found(host, at)),
            Err(e) if e.is_transient() => {
                match cached.as_ref().and_then(|identity| identity.key_at(at)) {
                    Some(key) => {
                        warn!(host = %host, error = %e, "Refresh failed, using stale identity");
                        Ok(key.clone())
                    }
                    None => Err(e),
                }
            }
            Err(e) => Err(e),
        }
    }

    /// Fetch `host`'s identity now, joining a fetch already in flight.
    pub async fn refresh(&self, host: &str) -> Result<Snapshot<E::PublicKey>, KeyStoreError> {
        if host == self.local.host() {
            return self
                .cached(host)
                .ok_or_else(|| KeyStoreError::UnknownHost(host.to_string()));
        }

        let future = match self.inflight.entry(host.to_string()) {
            Entry::Occupied(entry) => {
                debug!(host = %host, "Joining in-flight identity fetch");
                entry.get().clone()
            }
            Entry::Vacant(entry) => {
                let future = self.spawn_refresh(host);
                entry.insert(future.clone());
                future
            }
        };

        future.await
    }

    fn spawn_refresh(&self, host: &str) -> RefreshFuture<E::PublicKey> {
        let fetch = self.fetch_identity(host);
        let inflight = Arc::clone(&self.inflight);
        let key = host.to_string();
        let task = tokio::spawn(async move {
            let result = fetch.await;
            inflight.remove(&key);
            result
        });

        let host = host.to_string();
        async move {
            task.await.unwrap_or_else(|e| {
                Err(KeyStoreError::Transient {
                    host,
                    reason: format!("identity fetch aborted: {e}"),
                })
            })
        }
        .boxed()
        .shared()
    }

    fn fetch_identity(&self, host: &str) -> BoxFuture<'static, Result<Snapshot<E::PublicKey>, KeyStoreError>> {
        let host = host.to_string();
        let engine = Arc::clone(&self.engine);
        let fetcher = Arc::clone(&self.fetcher);
        let identities = Arc::clone(&self.identities);
        let clock = Arc::clone(&self.clock);
        let timeout = self.config.fetch_timeout;

        async move {
            debug!(host = %host, "Fetching identity");

            let document = match tokio::time::timeout(timeout, fetcher.fetch(&host)).await {
                Ok(Ok(document)) => document,
                Ok(Err(e)) => return Err(fetch_error(&host, e)),
                Err(_) => {
                    return Err(KeyStoreError::Transient {
                        host,
                        reason: format!("timed out after {}ms", timeout.as_millis()),
                    })
                }
            };

            if document.host != host {
                return Err(KeyStoreError::InvalidIdentity {
                    reason: format!("document declares host {}", document.host),
                    host,
                });
            }

            let origin = IdentityOrigin::Fetched { at: clock.now() };
            let identity = Arc::new(identity_from_document(&*engine, &document, origin)?);
            identities.insert(host.clone(), Arc::clone(&identity));

            info!(
                host = %host,
                party = %identity.party_type(),
                keys = identity.windows().len(),
                "Identity refreshed"
            );
            Ok(identity)
        }
        .boxed()
    }
}

fn key_not_found(host: &str, at: u64) -> KeyStoreError {
    KeyStoreError::KeyNotFound {
        host: host.to_string(),
        at,
    }
}

fn fetch_error(host: &str, error: FetchError) -> KeyStoreError {
    match error {
        FetchError::NotFound(_) => KeyStoreError::UnknownHost(host.to_string()),
        FetchError::Malformed(reason) => KeyStoreError::InvalidIdentity {
            host: host.to_string(),
            reason,
        },
        FetchError::Network(reason) => KeyStoreError::Transient {
            host: host.to_string(),
            reason,
        },
    }
}
