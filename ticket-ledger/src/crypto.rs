//! Cryptographic operations for the ledger
//!
//! This module provides:
//! - ECDSA P-256 (secp256r1) verification with SHA-256 over the payload
//! - DER encodings at the boundary: SubjectPublicKeyInfo public keys and
//!   ASN.1 DER signatures, as produced by external wallet software
//! - SHA-256 digests for admission tokens and block contents
//!
//! Verification never panics: any malformed key, malformed signature, or
//! mismatched payload is a rejected signature.

use crate::types::{Address, TicketClass};
use crate::{Error, Result};
use p256::ecdsa::signature::{Signer, Verifier};
use p256::ecdsa::{Signature, SigningKey, VerifyingKey};
use p256::pkcs8::{DecodePublicKey, EncodePublicKey};
use rand::rngs::OsRng;
use rust_decimal::Decimal;
use sha2::{Digest, Sha256};
use std::fmt;
use uuid::Uuid;

/// A caller-supplied authorization: DER signature plus DER SPKI public key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedRequest {
    /// ASN.1 DER-encoded ECDSA signature over the operation payload
    pub signature: Vec<u8>,
    /// DER-encoded SubjectPublicKeyInfo of the signing key
    pub public_key: Vec<u8>,
}

/// Verify an ECDSA P-256/SHA-256 signature
///
/// Returns `false` for any failure: undecodable key, undecodable
/// signature, or a signature that does not match the payload.
pub fn verify_signature(payload: &[u8], signature_der: &[u8], public_key_der: &[u8]) -> bool {
    let verifying_key = match VerifyingKey::from_public_key_der(public_key_der) {
        Ok(key) => key,
        Err(_) => return false,
    };

    let signature = match Signature::from_der(signature_der) {
        Ok(sig) => sig,
        Err(_) => return false,
    };

    verifying_key.verify(payload, &signature).is_ok()
}

/// P-256 key pair standing in for external wallet software in demos and
/// tests; the engine itself only ever verifies
pub struct KeyPair {
    signing_key: SigningKey,
    verifying_key: VerifyingKey,
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("signing_key", &"<redacted>")
            .field("verifying_key", &self.verifying_key)
            .finish()
    }
}

impl KeyPair {
    /// Generate a new random key pair
    pub fn generate() -> Self {
        let signing_key = SigningKey::random(&mut OsRng);
        let verifying_key = *signing_key.verifying_key();

        Self {
            signing_key,
            verifying_key,
        }
    }

    /// Create from a 32-byte seed, for deterministic tests
    pub fn from_seed(seed: &[u8; 32]) -> Result<Self> {
        let signing_key =
            SigningKey::from_slice(seed).map_err(|e| Error::Crypto(e.to_string()))?;
        let verifying_key = *signing_key.verifying_key();

        Ok(Self {
            signing_key,
            verifying_key,
        })
    }

    /// Sign a payload, returning the ASN.1 DER-encoded signature
    pub fn sign(&self, payload: &[u8]) -> Vec<u8> {
        let signature: Signature = self.signing_key.sign(payload);
        signature.to_der().as_bytes().to_vec()
    }

    /// Public key as DER-encoded SubjectPublicKeyInfo
    pub fn public_key_der(&self) -> Vec<u8> {
        self.verifying_key
            .to_public_key_der()
            .expect("SPKI encoding of a valid key cannot fail")
            .into_vec()
    }

    /// Sign a payload and bundle it with the public key
    pub fn authorize(&self, payload: &[u8]) -> SignedRequest {
        SignedRequest {
            signature: self.sign(payload),
            public_key: self.public_key_der(),
        }
    }
}

/// Canonical payload signed to authorize a mint
pub fn mint_payload(event_id: &Uuid, buyer: &Address, class: TicketClass) -> Vec<u8> {
    format!("mint:{}:{}:{}", event_id, buyer, class.code()).into_bytes()
}

/// Canonical payload signed to authorize a transfer initiation
pub fn transfer_payload(
    ticket_id: &Uuid,
    from: &Address,
    to: &Address,
    price: &Decimal,
) -> Vec<u8> {
    format!("transfer:{}:{}:{}:{}", ticket_id, from, to, price).into_bytes()
}

/// Hash arbitrary bytes using SHA-256
pub fn hash_bytes(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Derive a ticket's admission token from its identifying fields
///
/// Collision-resistant and content-derived, so two tickets can never share
/// a token and a token cannot be forged without the ledger's view of the
/// ticket.
pub fn qr_token(
    ticket_id: &Uuid,
    event_id: &Uuid,
    owner: &Address,
    issued_at: chrono::DateTime<chrono::Utc>,
) -> String {
    let data = format!(
        "{}:{}:{}:{}",
        ticket_id,
        event_id,
        owner,
        issued_at.timestamp()
    );
    hex::encode(hash_bytes(data.as_bytes()))
}
