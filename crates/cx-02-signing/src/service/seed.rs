//! One signed audit hop.

use super::signer::Signer;
use crate::domain::errors::SigningError;
use serde_json::Value;
use shared_crypto::{DigitalSignature, EcdsaP256};
use shared_types::{Seed, UnsignedSeed};
use tracing::info;

/// Builds seeds signed by this node.
///
/// Prior hops are neither read nor checked; assembling and validating a chain
/// of seeds is up to whoever collects them.
#[derive(Debug)]
pub struct SeedBuilder<E: DigitalSignature = EcdsaP256> {
    signer: Signer<E>,
}

impl<E: DigitalSignature> SeedBuilder<E> {
    pub fn new(signer: Signer<E>) -> Self {
        Self { signer }
    }

    /// Sign `(transaction_ids, data, now)`. The id order is preserved as given.
    pub fn build_seed(&self, transaction_ids: Vec<String>, data: Value) -> Result<Seed, SigningError> {
        let timestamp = self.signer.key_store().now();
        let signature = self.signer.sign_seed_hop(&transaction_ids, &data, timestamp)?;

        info!(
            signer = %self.signer.host(),
            transactions = transaction_ids.len(),
            timestamp,
            "Seed built"
        );

        Ok(Seed::new(
            UnsignedSeed {
                transaction_ids,
                data,
                signer_host: self.signer.host().to_string(),
                timestamp,
            },
            signature,
        ))
    }
}
