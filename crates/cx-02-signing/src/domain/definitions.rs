//! # Signing Definitions
//!
//! One canonicalization rule per message family, as a closed set.
//!
//! | Definition | Covered fields, in order |
//! |------------|--------------------------|
//! | `Identifier` | signer, timestamp, type, value |
//! | `IdsAndPreferences` | signer, timestamp, identifier signatures, preference data |
//! | `Seed` | signer, timestamp, transaction ids, data |
//! | `RequestWithBody` | message type, signer, receiver, caller, body, timestamp |
//! | `RequestWithoutBody` | message type, signer, receiver, caller, timestamp |
//! | `Response` | message type, signer, receiver, result, timestamp |
//!
//! Signed sub-objects are covered by their signature string, never by their
//! re-serialized fields. The caller binding is the Origin for REST requests
//! and the return URL for redirect requests. Responses do not cover the
//! transport, so one response can travel by REST or by redirect.

use super::canonical::{CanonicalBytes, CanonicalWriter};
use super::errors::DefinitionError;
use serde_json::Value;
use shared_types::{Identifier, IdsAndPreferences, MessageType, PreferenceData};

/// Token covering results that carry no data.
pub const EMPTY_RESULT: &str = "empty";

/// Who signs, for whom, when, and on behalf of which caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SigningContext<'a> {
    pub signer: &'a str,
    pub receiver: Option<&'a str>,
    pub timestamp: u64,
    pub caller: Option<&'a str>,
}

impl<'a> SigningContext<'a> {
    /// Context for long-lived objects: identifiers, preferences, seeds.
    pub fn source(signer: &'a str, timestamp: u64) -> Self {
        Self {
            signer,
            receiver: None,
            timestamp,
            caller: None,
        }
    }

    /// Context for transport messages.
    pub fn transport(signer: &'a str, receiver: &'a str, timestamp: u64, caller: Option<&'a str>) -> Self {
        Self {
            signer,
            receiver: Some(receiver),
            timestamp,
            caller,
        }
    }
}

// =============================================================================
// PAYLOAD VIEWS
// =============================================================================

/// Borrowed view of a transport payload.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PayloadView<'a> {
    Empty,
    IdsAndPreferences(&'a IdsAndPreferences),
    Identifier(&'a Identifier),
}

/// Payload types that can travel inside a `SignedMessage`.
pub trait AsPayload {
    fn view(&self) -> PayloadView<'_>;
}

impl AsPayload for () {
    fn view(&self) -> PayloadView<'_> {
        PayloadView::Empty
    }
}

impl AsPayload for IdsAndPreferences {
    fn view(&self) -> PayloadView<'_> {
        PayloadView::IdsAndPreferences(self)
    }
}

impl AsPayload for Identifier {
    fn view(&self) -> PayloadView<'_> {
        PayloadView::Identifier(self)
    }
}

// =============================================================================
// DEFINITIONS
// =============================================================================

/// The canonicalization rule for one message family.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SigningDefinition<'a> {
    Identifier {
        id_type: &'a str,
        value: &'a str,
    },
    IdsAndPreferences {
        identifiers: &'a [Identifier],
        data: &'a PreferenceData,
    },
    Seed {
        transaction_ids: &'a [String],
        data: &'a Value,
    },
    RequestWithBody {
        message_type: MessageType,
        body: &'a IdsAndPreferences,
    },
    RequestWithoutBody {
        message_type: MessageType,
    },
    Response {
        message_type: MessageType,
        result: PayloadView<'a>,
    },
}

impl<'a> SigningDefinition<'a> {
    /// Pick the definition for a transport message, checking the payload shape.
    pub fn for_message(message_type: MessageType, payload: PayloadView<'a>) -> Result<Self, DefinitionError> {
        use MessageType::*;

        match (message_type, payload) {
            (WriteRequest, PayloadView::IdsAndPreferences(body)) => {
                Ok(SigningDefinition::RequestWithBody { message_type, body })
            }
            (ReadRequest | DeleteRequest | ThirdPartyCookieRequest | NewIdRequest, PayloadView::Empty) => {
                Ok(SigningDefinition::RequestWithoutBody { message_type })
            }
            (ReadResponse | WriteResponse, result @ PayloadView::IdsAndPreferences(_))
            | (DeleteResponse | ThirdPartyCookieResponse, result @ PayloadView::Empty)
            | (NewIdResponse, result @ PayloadView::Identifier(_)) => {
                Ok(SigningDefinition::Response { message_type, result })
            }
            _ => Err(DefinitionError::PayloadMismatch(message_type)),
        }
    }

    /// Transport messages are time-limited; the rest are long-lived.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            SigningDefinition::RequestWithBody { .. }
                | SigningDefinition::RequestWithoutBody { .. }
                | SigningDefinition::Response { .. }
        )
    }

    /// Serialize under this definition. Pure and deterministic.
    pub fn canonicalize(&self, ctx: &SigningContext<'_>) -> Result<CanonicalBytes, DefinitionError> {
        let mut w = CanonicalWriter::new();

        match *self {
            SigningDefinition::Identifier { id_type, value } => {
                w.text("signer", ctx.signer)?
                    .number(ctx.timestamp)
                    .text("type", id_type)?
                    .text("value", value)?;
            }
            SigningDefinition::IdsAndPreferences { identifiers, data } => {
                w.text("signer", ctx.signer)?.number(ctx.timestamp);
                write_identifier_signatures(&mut w, identifiers)?;
                w.json(&Value::Object(data.clone().into_iter().collect()))?;
            }
            SigningDefinition::Seed { transaction_ids, data } => {
                if transaction_ids.is_empty() {
                    return Err(DefinitionError::MissingField("transactionIds"));
                }
                w.text("signer", ctx.signer)?
                    .number(ctx.timestamp)
                    .list("transactionId", transaction_ids.iter().map(String::as_str))?
                    .json(data)?;
            }
            SigningDefinition::RequestWithBody { message_type, body } => {
                if body.preferences.is_none() {
                    return Err(DefinitionError::MissingField("preferences"));
                }
                write_transport_header(&mut w, message_type, ctx)?;
                w.text("caller", ctx.caller.unwrap_or_default())?;
                write_ids_and_preferences(&mut w, body)?;
                w.number(ctx.timestamp);
            }
            SigningDefinition::RequestWithoutBody { message_type } => {
                write_transport_header(&mut w, message_type, ctx)?;
                w.text("caller", ctx.caller.unwrap_or_default())?
                    .number(ctx.timestamp);
            }
            SigningDefinition::Response { message_type, result } => {
                write_transport_header(&mut w, message_type, ctx)?;
                match result {
                    PayloadView::Empty => {
                        w.token(EMPTY_RESULT);
                    }
                    PayloadView::IdsAndPreferences(body) => write_ids_and_preferences(&mut w, body)?,
                    PayloadView::Identifier(identifier) => {
                        w.text("identifier.signature", &identifier.source.signature)?;
                    }
                }
                w.number(ctx.timestamp);
            }
        }

        Ok(w.finish())
    }
}

fn write_transport_header(
    w: &mut CanonicalWriter,
    message_type: MessageType,
    ctx: &SigningContext<'_>,
) -> Result<(), DefinitionError> {
    w.token(message_type.as_str())
        .text("signer", ctx.signer)?
        .text("receiver", ctx.receiver.unwrap_or_default())?;
    Ok(())
}

fn write_identifier_signatures(w: &mut CanonicalWriter, identifiers: &[Identifier]) -> Result<(), DefinitionError> {
    w.list(
        "identifier.signature",
        identifiers.iter().map(|id| id.source.signature.as_str()),
    )?;
    Ok(())
}

fn write_ids_and_preferences(w: &mut CanonicalWriter, body: &IdsAndPreferences) -> Result<(), DefinitionError> {
    match &body.preferences {
        Some(preferences) => {
            w.text("preferences.signature", &preferences.source.signature)?;
        }
        None => {
            w.token(EMPTY_RESULT);
        }
    }
    write_identifier_signatures(w, &body.identifiers)
}
