//! # Signature Capability
//!
//! The key store, signer and verifier only talk to this trait, so another
//! curve or algorithm can be dropped in without touching canonicalization or
//! key rotation.

use crate::ecdsa::{P256KeyPair, P256PublicKey, P256Signature};
use crate::CryptoError;
use std::fmt::Debug;

/// Sign and verify canonical bytes.
///
/// Signatures cross the wire as strings; the engine owns their encoding.
pub trait DigitalSignature: Send + Sync + Debug + 'static {
    /// Private key type held for the local identity.
    type PrivateKey: Send + Sync + Debug + 'static;
    /// Public key type cached per counterparty host.
    type PublicKey: Clone + Send + Sync + Debug + 'static;

    /// Short algorithm name, used in logs.
    fn algorithm(&self) -> &'static str;

    /// Sign `message` and return the wire encoding of the signature.
    fn sign(&self, key: &Self::PrivateKey, message: &[u8]) -> String;

    /// Check `signature` over `message`. Malformed encodings are `false`.
    fn verify(&self, key: &Self::PublicKey, message: &[u8], signature: &str) -> bool;

    /// Parse a PEM public key, rejecting anything structurally invalid.
    fn parse_public_key(&self, pem: &str) -> Result<Self::PublicKey, CryptoError>;

    /// Parse a PEM private key.
    fn parse_private_key(&self, pem: &str) -> Result<Self::PrivateKey, CryptoError>;

    /// Public half of a private key.
    fn public_key_of(&self, key: &Self::PrivateKey) -> Self::PublicKey;

    /// PEM encoding of a public key, for identity documents.
    fn public_key_pem(&self, key: &Self::PublicKey) -> Result<String, CryptoError>;

    /// Structural pre-check for keys arriving from outside the process.
    fn is_valid_key(&self, pem: &str) -> bool {
        self.parse_public_key(pem).is_ok()
    }
}

/// ECDSA over P-256 with fixed-length `r‖s` signatures.
#[derive(Debug, Default, Clone, Copy)]
pub struct EcdsaP256;

impl DigitalSignature for EcdsaP256 {
    type PrivateKey = P256KeyPair;
    type PublicKey = P256PublicKey;

    fn algorithm(&self) -> &'static str {
        "ES256"
    }

    fn sign(&self, key: &P256KeyPair, message: &[u8]) -> String {
        key.sign(message).to_encoded()
    }

    fn verify(&self, key: &P256PublicKey, message: &[u8], signature: &str) -> bool {
        match P256Signature::from_encoded(signature) {
            Ok(sig) => key.verify(message, &sig).is_ok(),
            Err(_) => false,
        }
    }

    fn parse_public_key(&self, pem: &str) -> Result<P256PublicKey, CryptoError> {
        P256PublicKey::from_pem(pem)
    }

    fn parse_private_key(&self, pem: &str) -> Result<P256KeyPair, CryptoError> {
        P256KeyPair::from_pem(pem)
    }

    fn public_key_of(&self, key: &P256KeyPair) -> P256PublicKey {
        key.public_key()
    }

    fn public_key_pem(&self, key: &P256PublicKey) -> Result<String, CryptoError> {
        key.to_pem()
    }
}
