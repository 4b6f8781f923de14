//! # Node Controller
//!
//! The operations a client node offers its web callers, independent of HTTP:
//! prepare signed operator requests, verify what the operator sent back,
//! sign preferences and create seeds.
//!
//! Responses are only trusted when the operator signed them, for this node,
//! as the response to the operation that was asked for.

use crate::domain::builders::{OperatorEndpoint, RequestBuilder};
use crate::domain::error::{NodeError, NodeResult};
use crate::domain::redirect_chain::{into_signed, ChainState, FailureReason, RedirectChain};
use cx_01_key_store::KeyStore;
use cx_02_signing::{AsPayload, SeedBuilder, Signer, Verifier, VerifierConfig};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared_crypto::{DigitalSignature, EcdsaP256};
use shared_types::{
    Identifier, IdentityDocument, IdsAndPreferences, Operation, OperatorEnvelope, Preferences,
    PreparedRequest, RedirectResponse, Seed, SignedMessage, UnsignedPreferences,
};
use std::sync::Arc;
use tracing::{debug, info};
use url::Url;

// =============================================================================
// INPUTS
// =============================================================================

/// A response relayed by the caller, from either transport.
///
/// Redirect responses always carry `code`, REST envelopes never do.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged, bound(deserialize = "T: serde::de::DeserializeOwned"))]
pub enum OperatorReply<T> {
    Redirect(RedirectResponse<T>),
    Rest(OperatorEnvelope<SignedMessage<T>>),
}

/// Preferences to sign, with the identifiers they apply to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignPreferencesRequest {
    pub identifiers: Vec<Identifier>,
    pub unsigned_preferences: UnsignedPreferences,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSeedRequest {
    pub transaction_ids: Vec<String>,
    #[serde(default)]
    pub data: Value,
}

// =============================================================================
// CONTROLLER
// =============================================================================

/// Client node operations on top of the key store.
pub struct ClientNode<E: DigitalSignature = EcdsaP256> {
    key_store: Arc<KeyStore<E>>,
    operator: OperatorEndpoint,
    signer: Signer<E>,
    verifier: Verifier<E>,
    seeds: SeedBuilder<E>,
}

impl<E: DigitalSignature> std::fmt::Debug for ClientNode<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientNode")
            .field("host", &self.host())
            .field("operator", &self.operator.host())
            .finish()
    }
}

impl<E: DigitalSignature> ClientNode<E> {
    pub fn new(key_store: Arc<KeyStore<E>>, operator: OperatorEndpoint, verifier_config: VerifierConfig) -> Self {
        let signer = Signer::new(Arc::clone(&key_store));
        Self {
            verifier: Verifier::new(Arc::clone(&key_store), verifier_config),
            seeds: SeedBuilder::new(signer.clone()),
            signer,
            operator,
            key_store,
        }
    }

    /// Host this node signs as.
    pub fn host(&self) -> &str {
        self.key_store.host()
    }

    pub fn operator(&self) -> &OperatorEndpoint {
        &self.operator
    }

    pub fn key_store(&self) -> &Arc<KeyStore<E>> {
        &self.key_store
    }

    pub fn verifier(&self) -> &Verifier<E> {
        &self.verifier
    }

    pub fn request_builder(&self, operation: Operation) -> RequestBuilder<E> {
        RequestBuilder::new(operation, self.operator.clone(), self.signer.clone())
    }

    // =========================================================================
    // OUTGOING REQUESTS
    // =========================================================================

    /// Signed REST request for `operation`, bound to `origin`.
    pub fn prepare_request<T: AsPayload + Serialize>(
        &self,
        operation: Operation,
        origin: &str,
        payload: T,
    ) -> NodeResult<PreparedRequest<T>> {
        let prepared = self.request_builder(operation).prepare_rest(origin, payload)?;
        info!(
            operation = %operation,
            origin = %origin,
            timestamp = prepared.message.timestamp(),
            "Signed operator request"
        );
        Ok(prepared)
    }

    /// Operator URL starting a redirect chain that ends at `return_url`.
    pub fn redirect_url<T: AsPayload + Serialize>(
        &self,
        operation: Operation,
        return_url: &Url,
        payload: T,
    ) -> NodeResult<Url> {
        let builder = self.request_builder(operation);
        let message = builder.build_redirect_request(return_url, payload)?;
        let url = builder.redirect_url(&message, return_url)?;

        info!(operation = %operation, return_url = %return_url, "Redirecting to operator");
        Ok(url)
    }

    // =========================================================================
    // INCOMING RESPONSES
    // =========================================================================

    /// Check that `message` is the operator's signed answer to `operation`,
    /// addressed to this node.
    pub async fn verify_response<T: AsPayload>(
        &self,
        operation: Operation,
        message: &SignedMessage<T>,
    ) -> NodeResult<()> {
        let expected = operation.response_type();
        if message.message_type() != expected {
            return Err(NodeError::validation(format!(
                "expected {expected}, got {}",
                message.message_type()
            )));
        }

        self.verifier
            .verify_message_from(message, self.operator.host(), None)
            .await?;
        Ok(())
    }

    /// Verify a read response and every identifier and preference inside it.
    pub async fn verify_read_response(
        &self,
        reply: OperatorReply<IdsAndPreferences>,
    ) -> NodeResult<IdsAndPreferences> {
        let operation = Operation::ReadIdsPrefs;

        match reply {
            OperatorReply::Rest(envelope) => {
                let message = envelope.into_result().map_err(|e| NodeError::OperatorError {
                    operation,
                    code: None,
                    message: e.message,
                })?;
                self.verify_read_message(message).await
            }
            OperatorReply::Redirect(response) => {
                // The browser is back at the return URL: this node's leg.
                let chain = RedirectChain::resume(operation, ChainState::Returned);
                let outcome = match into_signed(response) {
                    Ok(message) => self
                        .verify_read_message(message)
                        .await
                        .map_err(FailureReason::Verification),
                    Err(reason) => Err(reason),
                };
                chain.settle(outcome)
            }
        }
    }

    async fn verify_read_message(&self, message: SignedMessage<IdsAndPreferences>) -> NodeResult<IdsAndPreferences> {
        self.verify_response(Operation::ReadIdsPrefs, &message).await?;

        let body = message.into_payload();
        self.verify_operator_identifiers(&body.identifiers).await?;
        if let Some(preferences) = &body.preferences {
            self.verifier
                .verify_preferences(preferences, &body.identifiers)
                .await?;
        }

        debug!(
            identifiers = body.identifiers.len(),
            has_preferences = body.preferences.is_some(),
            "Read response verified"
        );
        Ok(body)
    }

    /// Identifiers are only ever issued by the operator.
    async fn verify_operator_identifiers(&self, identifiers: &[Identifier]) -> NodeResult<()> {
        for identifier in identifiers {
            if identifier.source.domain != self.operator.host() {
                return Err(NodeError::SignatureVerificationFailed(format!(
                    "identifier issued by {}, not the operator",
                    identifier.source.domain
                )));
            }
            self.verifier.verify_identifier(identifier).await?;
        }
        Ok(())
    }

    // =========================================================================
    // LOCAL SIGNING
    // =========================================================================

    /// Sign preferences against operator-issued identifiers.
    pub async fn sign_preferences(&self, request: SignPreferencesRequest) -> NodeResult<Preferences> {
        if request.identifiers.is_empty() {
            return Err(NodeError::validation("preferences need at least one identifier"));
        }
        self.verify_operator_identifiers(&request.identifiers).await?;

        let preferences = self
            .signer
            .sign_preferences(request.unsigned_preferences, &request.identifiers)?;
        info!(identifiers = request.identifiers.len(), "Signed preferences");
        Ok(preferences)
    }

    /// Seed over `transaction_ids` and `data`, signed now.
    pub fn create_seed(&self, request: CreateSeedRequest) -> NodeResult<Seed> {
        let count = request.transaction_ids.len();
        let seed = self.seeds.build_seed(request.transaction_ids, request.data)?;
        info!(transaction_ids = count, timestamp = seed.timestamp(), "Created seed");
        Ok(seed)
    }

    /// This node's public identity document.
    pub fn identity_document(&self) -> NodeResult<IdentityDocument> {
        Ok(self.key_store.self_document()?)
    }
}
