//! Signing with the local identity.

use crate::domain::definitions::{AsPayload, SigningContext, SigningDefinition};
use crate::domain::errors::SigningError;
use cx_01_key_store::KeyStore;
use shared_crypto::{DigitalSignature, EcdsaP256};
use shared_types::{
    Identifier, MessageType, Preferences, SignedMessage, Source, UnsignedMessage,
    UnsignedPreferences, PROTOCOL_VERSION,
};
use std::sync::Arc;
use tracing::debug;

/// Signs messages and sub-objects as this node.
///
/// The timestamp is read once per signature and the key is chosen for that
/// same instant, so a signature is never made with a key whose window does
/// not cover its own timestamp.
pub struct Signer<E: DigitalSignature = EcdsaP256> {
    key_store: Arc<KeyStore<E>>,
}

impl<E: DigitalSignature> Clone for Signer<E> {
    fn clone(&self) -> Self {
        Self {
            key_store: Arc::clone(&self.key_store),
        }
    }
}

impl<E: DigitalSignature> std::fmt::Debug for Signer<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signer").field("host", &self.host()).finish()
    }
}

impl<E: DigitalSignature> Signer<E> {
    pub fn new(key_store: Arc<KeyStore<E>>) -> Self {
        Self { key_store }
    }

    pub fn key_store(&self) -> &Arc<KeyStore<E>> {
        &self.key_store
    }

    pub fn host(&self) -> &str {
        self.key_store.host()
    }

    fn sign(&self, definition: &SigningDefinition<'_>, ctx: &SigningContext<'_>) -> Result<String, SigningError> {
        let bytes = definition.canonicalize(ctx)?;
        let key = self.key_store.local().signing_key(ctx.timestamp)?;
        Ok(self.key_store.engine().sign(&key, bytes.as_bytes()))
    }

    /// Sign a transport message addressed to `receiver`.
    ///
    /// `caller` is the Origin for REST requests and the return URL for
    /// redirect requests; responses ignore it.
    pub fn sign_message<T: AsPayload>(
        &self,
        message_type: MessageType,
        receiver: &str,
        caller: Option<&str>,
        payload: T,
    ) -> Result<SignedMessage<T>, SigningError> {
        let timestamp = self.key_store.now();
        let definition = SigningDefinition::for_message(message_type, payload.view())?;
        let ctx = SigningContext::transport(self.host(), receiver, timestamp, caller);
        let signature = self.sign(&definition, &ctx)?;

        debug!(
            message_type = %message_type,
            receiver = %receiver,
            timestamp,
            "Signed message"
        );

        Ok(SignedMessage::new(
            UnsignedMessage {
                message_type,
                signer_host: self.host().to_string(),
                receiver_host: receiver.to_string(),
                timestamp,
                payload,
            },
            signature,
        ))
    }

    /// Issue a signed identifier (operator side).
    pub fn sign_identifier(
        &self,
        id_type: &str,
        value: &str,
        persisted: Option<bool>,
    ) -> Result<Identifier, SigningError> {
        let timestamp = self.key_store.now();
        let definition = SigningDefinition::Identifier { id_type, value };
        let signature = self.sign(&definition, &SigningContext::source(self.host(), timestamp))?;

        Ok(Identifier {
            version: PROTOCOL_VERSION.to_string(),
            id_type: id_type.to_string(),
            value: value.to_string(),
            persisted,
            source: self.source(timestamp, signature),
        })
    }

    /// Sign preferences expressed against `identifiers`.
    pub fn sign_preferences(
        &self,
        unsigned: UnsignedPreferences,
        identifiers: &[Identifier],
    ) -> Result<Preferences, SigningError> {
        let timestamp = self.key_store.now();
        let definition = SigningDefinition::IdsAndPreferences {
            identifiers,
            data: &unsigned.data,
        };
        let signature = self.sign(&definition, &SigningContext::source(self.host(), timestamp))?;

        Ok(Preferences {
            version: unsigned.version,
            data: unsigned.data,
            source: self.source(timestamp, signature),
        })
    }

    pub(crate) fn sign_seed_hop(
        &self,
        transaction_ids: &[String],
        data: &serde_json::Value,
        timestamp: u64,
    ) -> Result<String, SigningError> {
        let definition = SigningDefinition::Seed { transaction_ids, data };
        self.sign(&definition, &SigningContext::source(self.host(), timestamp))
    }

    fn source(&self, timestamp: u64, signature: String) -> Source {
        Source {
            domain: self.host().to_string(),
            timestamp,
            signature,
        }
    }
}
