//! Client node error types and their HTTP rendering.
//!
//! Every failure that reaches a caller is rendered as
//! `{ "type": <kind>, "details": <text> }` with the status of its kind.

use super::config::ConfigError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use cx_01_key_store::KeyStoreError;
use cx_02_signing::{DefinitionError, SigningError, VerificationError};
use serde::{Deserialize, Serialize};
use shared_types::Operation;
use tracing::{error, warn};

/// Error kind names as they appear in the `type` field.
pub mod kinds {
    pub const VALIDATION_ERROR: &str = "ValidationError";
    pub const SIGNATURE_VERIFICATION_FAILED: &str = "SignatureVerificationFailed";
    pub const KEY_NOT_FOUND: &str = "KeyNotFound";
    pub const NO_ACTIVE_KEY: &str = "NoActiveKey";
    pub const ORIGIN_MISMATCH: &str = "OriginMismatch";
    pub const RETURN_URL_MISMATCH: &str = "ReturnUrlMismatch";
    pub const OPERATOR_ERROR: &str = "OperatorError";
    pub const NOT_FOUND: &str = "NotFound";
    pub const METHOD_NOT_ALLOWED: &str = "MethodNotAllowed";
    pub const TRANSIENT: &str = "Transient";
    pub const INTERNAL_ERROR: &str = "InternalError";
}

/// Failure of a client node operation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NodeError {
    /// Malformed input: missing field, bad URL, wrong payload shape.
    #[error("{0}")]
    Validation(String),

    /// A signature did not verify, or the message is stale, misaddressed or
    /// from the wrong signer.
    #[error("{0}")]
    SignatureVerificationFailed(String),

    /// No public key for the signer at the signed timestamp.
    #[error("{0}")]
    KeyNotFound(String),

    /// This node has no signing key for the current time.
    #[error("{0}")]
    NoActiveKey(String),

    /// The caller's Origin or Referer is not allowed.
    #[error("{0}")]
    OriginMismatch(String),

    /// The return URL does not belong to the calling site.
    #[error("{0}")]
    ReturnUrlMismatch(String),

    /// The operator answered with an error, relayed as-is. `code` is the
    /// status a redirect response carried; REST envelopes have none.
    #[error("{operation}: {message}")]
    OperatorError {
        operation: Operation,
        code: Option<u16>,
        message: String,
    },

    /// No route for the path.
    #[error("{0}")]
    NotFound(String),

    /// The path exists but not for this method.
    #[error("{0}")]
    MethodNotAllowed(String),

    /// A retryable fault, such as an identity fetch timing out.
    #[error("{0}")]
    Transient(String),

    #[error("{0}")]
    Internal(String),
}

impl NodeError {
    pub fn validation(details: impl Into<String>) -> Self {
        Self::Validation(details.into())
    }

    pub fn origin_mismatch(details: impl Into<String>) -> Self {
        Self::OriginMismatch(details.into())
    }

    pub fn return_url_mismatch(details: impl Into<String>) -> Self {
        Self::ReturnUrlMismatch(details.into())
    }

    pub fn internal(details: impl Into<String>) -> Self {
        Self::Internal(details.into())
    }

    /// Value of the `type` field.
    pub fn kind(&self) -> &'static str {
        match self {
            NodeError::Validation(_) => kinds::VALIDATION_ERROR,
            NodeError::SignatureVerificationFailed(_) => kinds::SIGNATURE_VERIFICATION_FAILED,
            NodeError::KeyNotFound(_) => kinds::KEY_NOT_FOUND,
            NodeError::NoActiveKey(_) => kinds::NO_ACTIVE_KEY,
            NodeError::OriginMismatch(_) => kinds::ORIGIN_MISMATCH,
            NodeError::ReturnUrlMismatch(_) => kinds::RETURN_URL_MISMATCH,
            NodeError::OperatorError { .. } => kinds::OPERATOR_ERROR,
            NodeError::NotFound(_) => kinds::NOT_FOUND,
            NodeError::MethodNotAllowed(_) => kinds::METHOD_NOT_ALLOWED,
            NodeError::Transient(_) => kinds::TRANSIENT,
            NodeError::Internal(_) => kinds::INTERNAL_ERROR,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            NodeError::Validation(_)
            | NodeError::SignatureVerificationFailed(_)
            | NodeError::KeyNotFound(_)
            | NodeError::ReturnUrlMismatch(_)
            | NodeError::OperatorError { .. } => StatusCode::BAD_REQUEST,
            NodeError::OriginMismatch(_) => StatusCode::FORBIDDEN,
            NodeError::NotFound(_) => StatusCode::NOT_FOUND,
            NodeError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            NodeError::Transient(_) => StatusCode::SERVICE_UNAVAILABLE,
            NodeError::NoActiveKey(_) | NodeError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn to_body(&self) -> ErrorResponse {
        ErrorResponse {
            kind: self.kind().to_string(),
            details: self.to_string(),
        }
    }
}

/// Wire shape of a failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    #[serde(rename = "type")]
    pub kind: String,
    pub details: String,
}

impl IntoResponse for NodeError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(kind = self.kind(), details = %self, "Request failed");
        } else {
            warn!(kind = self.kind(), details = %self, "Request rejected");
        }
        (status, Json(self.to_body())).into_response()
    }
}

// Conversions from library errors

impl From<KeyStoreError> for NodeError {
    fn from(e: KeyStoreError) -> Self {
        match e {
            KeyStoreError::KeyNotFound { .. }
            | KeyStoreError::UnknownHost(_)
            | KeyStoreError::InvalidIdentity { .. } => NodeError::KeyNotFound(e.to_string()),
            KeyStoreError::NoActiveKey { .. } => NodeError::NoActiveKey(e.to_string()),
            KeyStoreError::Transient { .. } => NodeError::Transient(e.to_string()),
        }
    }
}

impl From<DefinitionError> for NodeError {
    fn from(e: DefinitionError) -> Self {
        NodeError::Validation(e.to_string())
    }
}

impl From<SigningError> for NodeError {
    fn from(e: SigningError) -> Self {
        match e {
            SigningError::Definition(e) => e.into(),
            SigningError::KeyStore(e) => e.into(),
        }
    }
}

impl From<VerificationError> for NodeError {
    fn from(e: VerificationError) -> Self {
        match e {
            VerificationError::Definition(e) => e.into(),
            VerificationError::KeyStore(e) => e.into(),
            other => NodeError::SignatureVerificationFailed(other.to_string()),
        }
    }
}

impl From<url::ParseError> for NodeError {
    fn from(e: url::ParseError) -> Self {
        NodeError::Validation(format!("invalid URL: {e}"))
    }
}

impl From<serde_json::Error> for NodeError {
    fn from(e: serde_json::Error) -> Self {
        NodeError::Validation(format!("invalid JSON: {e}"))
    }
}

/// Result type for client node operations
pub type NodeResult<T> = Result<T, NodeError>;

/// Service-level errors (startup and serving, not per request)
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Own identity could not be built from the configured keys
    #[error("identity error: {0}")]
    Identity(#[from] KeyStoreError),

    /// Server socket bind error
    #[error("server bind error: {0}")]
    Bind(String),

    /// Server stopped with an error
    #[error("server error: {0}")]
    Server(String),
}
