//! A vendor client node and an operator, each with its own key store, that
//! find each other's identity documents through a shared in-memory fetcher.

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use cx_01_key_store::{KeyStore, KeyStoreConfig, KeyWindow, LocalIdentity, StaticIdentityFetcher};
use cx_02_signing::{ResponseBuilder, Signer, Verifier, VerifierConfig};
use cx_03_client_node::{
    build_router, AllowedOrigins, AppState, ClientNode, CorsConfig, HttpConfig, OperatorEndpoint,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use shared_crypto::{EcdsaP256, P256KeyPair};
use shared_types::{
    Identifier, IdentityDocument, ManualClock, PartyType, SignedMessage, BROWSER_ID_TYPE,
};
use std::sync::Arc;
use tower::ServiceExt;

pub const VENDOR: &str = "vendor.example";
pub const OPERATOR: &str = "operator.example";
pub const SITE: &str = "https://good.example";
pub const START: u64 = 1_000;

/// The operator side: signs identifiers and responses, verifies requests.
pub struct Operator {
    pub store: Arc<KeyStore>,
    pub signer: Signer,
    pub verifier: Verifier,
    pub responses: ResponseBuilder,
}

pub struct Exchange {
    pub clock: Arc<ManualClock>,
    pub fetcher: Arc<StaticIdentityFetcher>,
    pub node: Arc<ClientNode>,
    pub operator: Operator,
}

fn local(host: &str, party: PartyType, windows: Vec<(u64, u64)>) -> LocalIdentity<EcdsaP256> {
    let keys = windows
        .into_iter()
        .map(|(start, end)| KeyWindow::new(start, end, P256KeyPair::generate()))
        .collect();
    LocalIdentity::new(host, host, party, keys).unwrap()
}

impl Exchange {
    pub fn new() -> Self {
        Self::with_operator_windows(vec![(0, 100_000)])
    }

    /// Operator signing keys over the given `[start, end)` windows.
    pub fn with_operator_windows(windows: Vec<(u64, u64)>) -> Self {
        let clock = Arc::new(ManualClock::new(START));
        let fetcher = Arc::new(StaticIdentityFetcher::new());

        let store = |identity: LocalIdentity<EcdsaP256>| {
            Arc::new(KeyStore::new(
                EcdsaP256,
                identity,
                fetcher.clone(),
                clock.clone(),
                KeyStoreConfig::default(),
            ))
        };
        let vendor_store = store(local(VENDOR, PartyType::Vendor, vec![(0, 100_000)]));
        let operator_store = store(local(OPERATOR, PartyType::Operator, windows));

        fetcher.insert(vendor_store.self_document().unwrap());
        fetcher.insert(operator_store.self_document().unwrap());

        let node = ClientNode::new(
            vendor_store,
            OperatorEndpoint::https(OPERATOR).unwrap(),
            VerifierConfig::default(),
        );
        let signer = Signer::new(operator_store.clone());

        Self {
            clock,
            fetcher,
            node: Arc::new(node),
            operator: Operator {
                verifier: Verifier::new(operator_store.clone(), VerifierConfig::default()),
                responses: ResponseBuilder::new(signer.clone()),
                signer,
                store: operator_store,
            },
        }
    }

    pub fn router(&self) -> Router {
        build_router(
            AppState {
                node: self.node.clone(),
            },
            AllowedOrigins::new([SITE]).unwrap(),
            &CorsConfig::default(),
            &HttpConfig::default(),
        )
    }

    /// Operator-issued browser id.
    pub fn issue_identifier(&self, value: &str) -> Identifier {
        self.operator
            .signer
            .sign_identifier(BROWSER_ID_TYPE, value, Some(true))
            .unwrap()
    }

    /// Operator identity document, as served to counterparties.
    pub fn operator_document(&self) -> IdentityDocument {
        self.operator.store.self_document().unwrap()
    }
}

// =============================================================================
// HTTP HELPERS
// =============================================================================

/// JSON call to a proxy endpoint from `origin`.
pub async fn call(router: &Router, method: Method, uri: &str, origin: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::ORIGIN, origin);
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

/// Top-level navigation to a redirect endpoint. Returns status and `Location`.
pub async fn navigate(router: &Router, uri: &str, referer: &str) -> (StatusCode, Option<String>) {
    let request = Request::builder()
        .uri(uri)
        .header(header::REFERER, referer)
        .body(Body::empty())
        .unwrap();
    let response = router.clone().oneshot(request).await.unwrap();
    let location = response
        .headers()
        .get(header::LOCATION)
        .map(|v| v.to_str().unwrap().to_string());
    (response.status(), location)
}

/// Re-decode `message` after editing its JSON, as an attacker on the wire would.
pub fn tamper<T>(message: &SignedMessage<T>, edit: impl FnOnce(&mut Value)) -> SignedMessage<T>
where
    T: Serialize + DeserializeOwned,
{
    let mut json = serde_json::to_value(message).unwrap();
    edit(&mut json);
    serde_json::from_value(json).unwrap()
}
