//! # `SignedMessage` Envelope
//!
//! The wrapper for every request and response exchanged with the operator,
//! over both REST and redirect transports.
//!
//! ## Security Properties
//!
//! - **Versioning**: all messages carry a `version` for forward compatibility.
//! - **Signer Authority**: `signerHost` is the only source of truth for who
//!   signed; the verifier resolves the public key from it.
//! - **Audience Binding**: `receiverHost` is covered by the signature, so a
//!   request signed for one operator cannot be replayed against another.
//! - **Immutability**: fields are private. There is no way to edit a signed
//!   message in place.

use crate::errors::TypesError;
use crate::PROTOCOL_VERSION;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// =============================================================================
// OPERATIONS AND MESSAGE TYPES
// =============================================================================

/// Operations a vendor can ask the operator to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Operation {
    ReadIdsPrefs,
    WriteIdsPrefs,
    DeleteIdsPrefs,
    CheckThirdPartyCookie,
    NewId,
}

impl Operation {
    pub const ALL: [Operation; 5] = [
        Operation::ReadIdsPrefs,
        Operation::WriteIdsPrefs,
        Operation::DeleteIdsPrefs,
        Operation::CheckThirdPartyCookie,
        Operation::NewId,
    ];

    /// Envelope type of the request for this operation.
    pub fn request_type(self) -> MessageType {
        match self {
            Operation::ReadIdsPrefs => MessageType::ReadRequest,
            Operation::WriteIdsPrefs => MessageType::WriteRequest,
            Operation::DeleteIdsPrefs => MessageType::DeleteRequest,
            Operation::CheckThirdPartyCookie => MessageType::ThirdPartyCookieRequest,
            Operation::NewId => MessageType::NewIdRequest,
        }
    }

    /// Envelope type of the response for this operation.
    pub fn response_type(self) -> MessageType {
        match self {
            Operation::ReadIdsPrefs => MessageType::ReadResponse,
            Operation::WriteIdsPrefs => MessageType::WriteResponse,
            Operation::DeleteIdsPrefs => MessageType::DeleteResponse,
            Operation::CheckThirdPartyCookie => MessageType::ThirdPartyCookieResponse,
            Operation::NewId => MessageType::NewIdResponse,
        }
    }

    /// Whether the request carries an ids-and-preferences body.
    pub fn has_request_body(self) -> bool {
        matches!(self, Operation::WriteIdsPrefs)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Operation::ReadIdsPrefs => "read-ids-prefs",
            Operation::WriteIdsPrefs => "write-ids-prefs",
            Operation::DeleteIdsPrefs => "delete-ids-prefs",
            Operation::CheckThirdPartyCookie => "check-3pc",
            Operation::NewId => "new-id",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Closed set of envelope types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MessageType {
    ReadRequest,
    WriteRequest,
    DeleteRequest,
    ThirdPartyCookieRequest,
    NewIdRequest,
    ReadResponse,
    WriteResponse,
    DeleteResponse,
    ThirdPartyCookieResponse,
    NewIdResponse,
}

impl MessageType {
    pub fn operation(self) -> Operation {
        match self {
            MessageType::ReadRequest | MessageType::ReadResponse => Operation::ReadIdsPrefs,
            MessageType::WriteRequest | MessageType::WriteResponse => Operation::WriteIdsPrefs,
            MessageType::DeleteRequest | MessageType::DeleteResponse => Operation::DeleteIdsPrefs,
            MessageType::ThirdPartyCookieRequest | MessageType::ThirdPartyCookieResponse => {
                Operation::CheckThirdPartyCookie
            }
            MessageType::NewIdRequest | MessageType::NewIdResponse => Operation::NewId,
        }
    }

    pub fn is_request(self) -> bool {
        self.operation().request_type() == self
    }

    pub fn is_response(self) -> bool {
        !self.is_request()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MessageType::ReadRequest => "readRequest",
            MessageType::WriteRequest => "writeRequest",
            MessageType::DeleteRequest => "deleteRequest",
            MessageType::ThirdPartyCookieRequest => "thirdPartyCookieRequest",
            MessageType::NewIdRequest => "newIdRequest",
            MessageType::ReadResponse => "readResponse",
            MessageType::WriteResponse => "writeResponse",
            MessageType::DeleteResponse => "deleteResponse",
            MessageType::ThirdPartyCookieResponse => "thirdPartyCookieResponse",
            MessageType::NewIdResponse => "newIdResponse",
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageType {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Operation::ALL
            .iter()
            .flat_map(|op| [op.request_type(), op.response_type()])
            .find(|t| t.as_str() == s)
            .ok_or_else(|| TypesError::UnknownMessageType(s.to_string()))
    }
}

// =============================================================================
// ENVELOPE
// =============================================================================

/// Everything a signature covers, before the signature exists.
#[derive(Debug, Clone, PartialEq)]
pub struct UnsignedMessage<T> {
    pub message_type: MessageType,
    pub signer_host: String,
    pub receiver_host: String,
    pub timestamp: u64,
    pub payload: T,
}

/// A signed request or response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedMessage<T> {
    // =========================================================================
    // HEADER SECTION
    // =========================================================================
    version: String,
    message_type: MessageType,
    signer_host: String,
    receiver_host: String,
    timestamp: u64,

    // =========================================================================
    // SECURITY SECTION
    // =========================================================================
    /// URL-safe base64 `r‖s` over the canonical bytes of this message.
    signature: String,

    // =========================================================================
    // PAYLOAD SECTION
    // =========================================================================
    payload: T,
}

impl<T> SignedMessage<T> {
    /// Seal an unsigned message with its signature.
    pub fn new(unsigned: UnsignedMessage<T>, signature: String) -> Self {
        Self {
            version: PROTOCOL_VERSION.to_string(),
            message_type: unsigned.message_type,
            signer_host: unsigned.signer_host,
            receiver_host: unsigned.receiver_host,
            timestamp: unsigned.timestamp,
            signature,
            payload: unsigned.payload,
        }
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn message_type(&self) -> MessageType {
        self.message_type
    }

    pub fn signer_host(&self) -> &str {
        &self.signer_host
    }

    pub fn receiver_host(&self) -> &str {
        &self.receiver_host
    }

    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    pub fn signature(&self) -> &str {
        &self.signature
    }

    pub fn payload(&self) -> &T {
        &self.payload
    }

    pub fn into_payload(self) -> T {
        self.payload
    }
}

// =============================================================================
// TRANSPORT WRAPPERS
// =============================================================================

/// Error body returned by a counterpart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub message: String,
}

/// What the operator's REST API returns: either a response or an error,
/// accepted as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OperatorEnvelope<T> {
    Response { response: T },
    Error { error: ErrorBody },
}

impl<T> OperatorEnvelope<T> {
    pub fn into_result(self) -> Result<T, ErrorBody> {
        match self {
            OperatorEnvelope::Response { response } => Ok(response),
            OperatorEnvelope::Error { error } => Err(error),
        }
    }
}

/// What the operator appends to a `returnUrl` at the end of a redirect chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: serde::de::DeserializeOwned"))]
pub struct RedirectResponse<T> {
    /// HTTP-like status of the operator-side processing.
    pub code: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<SignedMessage<T>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

/// Payload of a REST call prepared by a vendor node: where to send the
/// signed message and the message itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreparedRequest<T> {
    pub url: String,
    pub message: SignedMessage<T>,
}
