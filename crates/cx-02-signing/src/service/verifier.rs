//! # Verifier
//!
//! Checks a signed object in four steps:
//!
//! 1. canonicalize the payload under its definition,
//! 2. apply the timestamp policy,
//! 3. resolve the signer's key valid at the signed timestamp,
//! 4. verify the curve signature over the canonical bytes.
//!
//! The timestamp is checked before the key lookup so that junk messages never
//! trigger an identity fetch.
//!
//! ## Timestamp policy
//!
//! Transport messages must fall within `[now - max_age, now + max_skew]`.
//! Identifiers, preferences and seeds are long-lived: they are only rejected
//! when dated further in the future than `max_skew`.

use crate::domain::definitions::{AsPayload, SigningContext, SigningDefinition};
use crate::domain::errors::VerificationError;
use cx_01_key_store::KeyStore;
use shared_crypto::{DigitalSignature, EcdsaP256};
use shared_types::{Identifier, IdsAndPreferences, Preferences, Seed, SignedMessage};
use std::sync::Arc;
use tracing::{debug, warn};

/// Tolerances applied to signed timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerifierConfig {
    /// Oldest accepted transport message, in seconds.
    pub max_age_secs: u64,
    /// Accepted clock drift into the future, in seconds.
    pub max_skew_secs: u64,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            max_age_secs: 300,
            max_skew_secs: 30,
        }
    }
}

/// Verifies signatures of counterparties (and of this node) against the key store.
pub struct Verifier<E: DigitalSignature = EcdsaP256> {
    key_store: Arc<KeyStore<E>>,
    config: VerifierConfig,
}

impl<E: DigitalSignature> Clone for Verifier<E> {
    fn clone(&self) -> Self {
        Self {
            key_store: Arc::clone(&self.key_store),
            config: self.config,
        }
    }
}

impl<E: DigitalSignature> std::fmt::Debug for Verifier<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Verifier")
            .field("host", &self.key_store.host())
            .field("config", &self.config)
            .finish()
    }
}

impl<E: DigitalSignature> Verifier<E> {
    pub fn new(key_store: Arc<KeyStore<E>>, config: VerifierConfig) -> Self {
        Self { key_store, config }
    }

    pub fn config(&self) -> &VerifierConfig {
        &self.config
    }

    // =========================================================================
    // TRANSPORT MESSAGES
    // =========================================================================

    /// Verify a message addressed to this node.
    pub async fn verify_message<T: AsPayload>(
        &self,
        message: &SignedMessage<T>,
        caller: Option<&str>,
    ) -> Result<(), VerificationError> {
        self.verify_message_to(message, caller, self.key_store.host())
            .await
    }

    /// Verify a message addressed to `receiver`.
    pub async fn verify_message_to<T: AsPayload>(
        &self,
        message: &SignedMessage<T>,
        caller: Option<&str>,
        receiver: &str,
    ) -> Result<(), VerificationError> {
        if message.receiver_host() != receiver {
            return Err(VerificationError::UnexpectedReceiver {
                expected: receiver.to_string(),
                actual: message.receiver_host().to_string(),
            });
        }

        let definition = SigningDefinition::for_message(message.message_type(), message.payload().view())?;
        let ctx = SigningContext::transport(
            message.signer_host(),
            message.receiver_host(),
            message.timestamp(),
            caller,
        );
        self.verify(&definition, &ctx, message.signature()).await
    }

    /// Verify a message addressed to this node and signed by `signer`.
    pub async fn verify_message_from<T: AsPayload>(
        &self,
        message: &SignedMessage<T>,
        signer: &str,
        caller: Option<&str>,
    ) -> Result<(), VerificationError> {
        if message.signer_host() != signer {
            return Err(VerificationError::UnexpectedSigner {
                expected: signer.to_string(),
                actual: message.signer_host().to_string(),
            });
        }
        self.verify_message(message, caller).await
    }

    // =========================================================================
    // LONG-LIVED OBJECTS
    // =========================================================================

    pub async fn verify_identifier(&self, identifier: &Identifier) -> Result<(), VerificationError> {
        let definition = SigningDefinition::Identifier {
            id_type: &identifier.id_type,
            value: &identifier.value,
        };
        let ctx = SigningContext::source(&identifier.source.domain, identifier.source.timestamp);
        self.verify(&definition, &ctx, &identifier.source.signature)
            .await
    }

    pub async fn verify_preferences(
        &self,
        preferences: &Preferences,
        identifiers: &[Identifier],
    ) -> Result<(), VerificationError> {
        let definition = SigningDefinition::IdsAndPreferences {
            identifiers,
            data: &preferences.data,
        };
        let ctx = SigningContext::source(&preferences.source.domain, preferences.source.timestamp);
        self.verify(&definition, &ctx, &preferences.source.signature)
            .await
    }

    /// Verify every identifier and, when present, the preferences bound to them.
    pub async fn verify_ids_and_preferences(&self, body: &IdsAndPreferences) -> Result<(), VerificationError> {
        for identifier in &body.identifiers {
            self.verify_identifier(identifier).await?;
        }
        match &body.preferences {
            Some(preferences) => self.verify_preferences(preferences, &body.identifiers).await,
            None => Ok(()),
        }
    }

    /// Verify one seed hop on its own.
    pub async fn verify_seed(&self, seed: &Seed) -> Result<(), VerificationError> {
        let definition = SigningDefinition::Seed {
            transaction_ids: seed.transaction_ids(),
            data: seed.data(),
        };
        let ctx = SigningContext::source(seed.signer_host(), seed.timestamp());
        self.verify(&definition, &ctx, seed.signature()).await
    }

    // =========================================================================
    // CORE
    // =========================================================================

    async fn verify(
        &self,
        definition: &SigningDefinition<'_>,
        ctx: &SigningContext<'_>,
        signature: &str,
    ) -> Result<(), VerificationError> {
        let bytes = definition.canonicalize(ctx)?;
        self.check_timestamp(definition.is_transport(), ctx.timestamp)?;

        let key = self.key_store.public_key(ctx.signer, ctx.timestamp).await?;

        if self.key_store.engine().verify(&key, bytes.as_bytes(), signature) {
            debug!(signer = %ctx.signer, timestamp = ctx.timestamp, "Signature verified");
            Ok(())
        } else {
            warn!(signer = %ctx.signer, timestamp = ctx.timestamp, "Signature rejected");
            Err(VerificationError::SignatureMismatch {
                signer: ctx.signer.to_string(),
            })
        }
    }

    fn check_timestamp(&self, transport: bool, timestamp: u64) -> Result<(), VerificationError> {
        let now = self.key_store.now();

        if timestamp > now.saturating_add(self.config.max_skew_secs) {
            return Err(VerificationError::FutureDated { timestamp, now });
        }
        if transport && timestamp < now.saturating_sub(self.config.max_age_secs) {
            return Err(VerificationError::Expired { timestamp, now });
        }
        Ok(())
    }
}
