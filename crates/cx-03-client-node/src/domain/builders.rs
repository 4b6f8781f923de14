//! # Request Builders
//!
//! Signed operator requests for each [`Operation`], over either transport.
//!
//! | Operation | REST | Redirect |
//! |-----------|------|----------|
//! | read | `GET /v1/ids-prefs` | `/v1/redirect/get-ids-prefs` |
//! | write | `POST /v1/ids-prefs` | `/v1/redirect/post-ids-prefs` |
//! | delete | `DELETE /v1/ids-prefs` | `/v1/redirect/delete-ids-prefs` |
//! | check-3pc | `GET /v1/3pc` | `/v1/redirect/3pc` |
//! | new-id | `GET /v1/new-id` | `/v1/redirect/new-id` |
//!
//! REST requests bind the caller's Origin; redirect requests bind the return
//! URL. A REST request without a body carries the signed message in its
//! `message` query parameter, the write request carries it as the body.

use super::error::{NodeError, NodeResult};
use axum::http::Method;
use cx_02_signing::{AsPayload, Signer};
use serde::Serialize;
use shared_crypto::{DigitalSignature, EcdsaP256};
use shared_types::{Operation, PreparedRequest, SignedMessage};
use tracing::debug;
use url::Url;

/// Query parameter holding a URL-encoded signed message.
pub const MESSAGE_PARAM: &str = "message";
/// Query parameter holding the caller's return URL.
pub const RETURN_URL_PARAM: &str = "returnUrl";

/// Operator REST path for `operation`.
pub fn rest_path(operation: Operation) -> &'static str {
    match operation {
        Operation::ReadIdsPrefs | Operation::WriteIdsPrefs | Operation::DeleteIdsPrefs => "/v1/ids-prefs",
        Operation::CheckThirdPartyCookie => "/v1/3pc",
        Operation::NewId => "/v1/new-id",
    }
}

/// HTTP method of the operator REST call for `operation`.
pub fn rest_method(operation: Operation) -> Method {
    match operation {
        Operation::WriteIdsPrefs => Method::POST,
        Operation::DeleteIdsPrefs => Method::DELETE,
        Operation::ReadIdsPrefs | Operation::CheckThirdPartyCookie | Operation::NewId => Method::GET,
    }
}

/// Operator redirect path for `operation`.
pub fn redirect_path(operation: Operation) -> &'static str {
    match operation {
        Operation::ReadIdsPrefs => "/v1/redirect/get-ids-prefs",
        Operation::WriteIdsPrefs => "/v1/redirect/post-ids-prefs",
        Operation::DeleteIdsPrefs => "/v1/redirect/delete-ids-prefs",
        Operation::CheckThirdPartyCookie => "/v1/redirect/3pc",
        Operation::NewId => "/v1/redirect/new-id",
    }
}

/// Where the operator lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperatorEndpoint {
    host: String,
    base_url: Url,
}

impl OperatorEndpoint {
    pub fn new(host: impl Into<String>, base_url: Url) -> Self {
        Self {
            host: host.into(),
            base_url,
        }
    }

    /// `https://{host}`.
    pub fn https(host: impl Into<String>) -> NodeResult<Self> {
        let host = host.into();
        let base_url = Url::parse(&format!("https://{host}"))?;
        Ok(Self::new(host, base_url))
    }

    /// Host that signs operator responses and receives our requests.
    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn url(&self, path: &str) -> Url {
        let mut url = self.base_url.clone();
        url.set_path(path);
        url.set_query(None);
        url
    }
}

/// Builds signed requests for one operation.
pub struct RequestBuilder<E: DigitalSignature = EcdsaP256> {
    operation: Operation,
    operator: OperatorEndpoint,
    signer: Signer<E>,
}

impl<E: DigitalSignature> std::fmt::Debug for RequestBuilder<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestBuilder")
            .field("operation", &self.operation)
            .field("operator", &self.operator.host)
            .finish()
    }
}

impl<E: DigitalSignature> RequestBuilder<E> {
    pub fn new(operation: Operation, operator: OperatorEndpoint, signer: Signer<E>) -> Self {
        Self {
            operation,
            operator,
            signer,
        }
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }

    pub fn rest_method(&self) -> Method {
        rest_method(self.operation)
    }

    pub fn rest_url(&self) -> Url {
        self.operator.url(rest_path(self.operation))
    }

    pub fn redirect_base_url(&self) -> Url {
        self.operator.url(redirect_path(self.operation))
    }

    fn sign<T: AsPayload>(&self, caller: &str, payload: T) -> NodeResult<SignedMessage<T>> {
        let message = self.signer.sign_message(
            self.operation.request_type(),
            self.operator.host(),
            Some(caller),
            payload,
        )?;
        Ok(message)
    }

    fn check_type<T>(&self, message: &SignedMessage<T>) -> NodeResult<()> {
        if message.message_type() != self.operation.request_type() {
            return Err(NodeError::validation(format!(
                "{} message cannot be sent as {}",
                message.message_type(),
                self.operation
            )));
        }
        Ok(())
    }

    // =========================================================================
    // REST
    // =========================================================================

    /// Sign a REST request on behalf of `origin`.
    pub fn build_rest_request<T: AsPayload>(&self, origin: &str, payload: T) -> NodeResult<SignedMessage<T>> {
        self.sign(origin, payload)
    }

    /// URL the browser calls with `message`.
    pub fn rest_request_url<T: Serialize>(&self, message: &SignedMessage<T>) -> NodeResult<Url> {
        self.check_type(message)?;
        let mut url = self.rest_url();
        if !self.operation.has_request_body() {
            let json = serde_json::to_string(message)?;
            url.query_pairs_mut().append_pair(MESSAGE_PARAM, &json);
        }
        Ok(url)
    }

    /// Signed request plus the URL to send it to.
    pub fn prepare_rest<T: AsPayload + Serialize>(
        &self,
        origin: &str,
        payload: T,
    ) -> NodeResult<PreparedRequest<T>> {
        let message = self.build_rest_request(origin, payload)?;
        let url = self.rest_request_url(&message)?;
        debug!(operation = %self.operation, origin = %origin, "Prepared REST request");
        Ok(PreparedRequest {
            url: url.to_string(),
            message,
        })
    }

    // =========================================================================
    // REDIRECT
    // =========================================================================

    /// Sign a redirect request whose response goes back to `return_url`.
    pub fn build_redirect_request<T: AsPayload>(
        &self,
        return_url: &Url,
        payload: T,
    ) -> NodeResult<SignedMessage<T>> {
        self.sign(return_url.as_str(), payload)
    }

    /// Operator URL with exactly one `message` and one `returnUrl` parameter.
    pub fn redirect_url<T: Serialize>(&self, message: &SignedMessage<T>, return_url: &Url) -> NodeResult<Url> {
        self.check_type(message)?;
        let json = serde_json::to_string(message)?;
        let mut url = self.redirect_base_url();
        url.query_pairs_mut()
            .append_pair(MESSAGE_PARAM, &json)
            .append_pair(RETURN_URL_PARAM, return_url.as_str());
        Ok(url)
    }
}
