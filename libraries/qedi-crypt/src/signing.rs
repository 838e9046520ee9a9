use core::convert::TryFrom;
use std::fmt;
use std::str::FromStr;

use ed25519_consensus::{Signature as Ed25519Signature, SigningKey, VerificationKey};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_with::base64::Base64;
use serde_with::{Bytes, IfIsHumanReadable, serde_as};
use thiserror::Error;

use crate::encoding::{decode_base64, encode_base64};
use crate::hash::Digest;

/// Signature-scheme flag for Ed25519 keys.
pub const ED25519_FLAG: u8 = 0x00;
/// Signature-scheme flag for zkLogin authenticators.
pub const ZKLOGIN_FLAG: u8 = 0x05;

/// Intent prefix for transaction data: scope `TransactionData`, version 0, app `Sui`.
const TRANSACTION_INTENT: [u8; 3] = [0, 0, 0];

/// Ed25519 public key used for signing verification.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct SigningPublic(VerificationKey);

/// Ed25519 signing key used to produce signatures.
#[derive(Clone)]
pub struct SigningSecret(SigningKey);

/// Raw Ed25519 signature.
#[serde_as]
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Debug)]
pub struct Signature(#[serde_as(as = "IfIsHumanReadable<Base64, Bytes>")] [u8; 64]);

/// A complete ledger signature: scheme flag followed by scheme-specific bytes.
/// For Ed25519 that is `flag || signature || public key`.
#[derive(Clone, PartialEq, Eq)]
pub struct UserSignature(Vec<u8>);

/// Errors returned by signing operations.
#[derive(Debug, Error)]
pub enum SigningError {
    #[error("invalid public key bytes")]
    InvalidPublicKey,
    #[error("signature verification failed")]
    InvalidSignature,
    #[error("malformed user signature")]
    Malformed,
}

#[serde_as]
#[derive(Serialize, Deserialize)]
struct SigningPublicSerde(#[serde_as(as = "IfIsHumanReadable<Base64, Bytes>")] [u8; 32]);

#[serde_as]
#[derive(Serialize, Deserialize)]
struct SigningSecretSerde(#[serde_as(as = "IfIsHumanReadable<Base64, Bytes>")] [u8; 32]);

/// Digest a signer commits to when signing transaction bytes.
pub fn transaction_intent_digest(tx_bytes: &[u8]) -> Digest {
    Digest::digest_parts(&[&TRANSACTION_INTENT, tx_bytes])
}

impl SigningPublic {
    /// Build a public key from its 32-byte compressed form.
    pub fn from_bytes(bytes: [u8; 32]) -> Result<Self, SigningError> {
        VerificationKey::try_from(bytes)
            .map(Self)
            .map_err(|_| SigningError::InvalidPublicKey)
    }

    /// Serialize the public key as 32 bytes.
    pub fn to_bytes(&self) -> [u8; 32] {
        self.0.to_bytes()
    }

    /// Verify a signature over `msg` using this public key.
    pub fn verify(&self, signature: &Signature, msg: &[u8]) -> Result<(), SigningError> {
        let sig = Ed25519Signature::from(signature.0);
        self.0
            .verify(&sig, msg)
            .map_err(|_| SigningError::InvalidSignature)
    }

    /// The 32 address bytes owned by this key: `blake2b256(flag || pk)`.
    pub fn address_bytes(&self) -> [u8; 32] {
        Digest::digest_parts(&[&[ED25519_FLAG], &self.to_bytes()]).to_bytes()
    }
}

impl Serialize for SigningPublic {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        SigningPublicSerde(self.to_bytes()).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for SigningPublic {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let SigningPublicSerde(bytes) = SigningPublicSerde::deserialize(deserializer)?;
        SigningPublic::from_bytes(bytes).map_err(serde::de::Error::custom)
    }
}

impl SigningSecret {
    /// Generate a random signing secret.
    pub fn random() -> Self {
        Self(SigningKey::new(rand::thread_rng()))
    }

    /// Build a signing secret from 32 raw bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(SigningKey::from(bytes))
    }

    /// Serialize the signing secret as 32 bytes.
    pub fn to_bytes(&self) -> [u8; 32] {
        self.0.to_bytes()
    }

    /// Derive the matching public key for this secret.
    pub fn public_key(&self) -> SigningPublic {
        SigningPublic(self.0.verification_key())
    }

    /// Sign a message and return the signature.
    pub fn sign(&self, msg: &[u8]) -> Signature {
        Signature(self.0.sign(msg).to_bytes())
    }

    /// Sign BCS transaction bytes under the transaction intent, producing the
    /// flagged signature the ledger accepts.
    pub fn sign_transaction(&self, tx_bytes: &[u8]) -> UserSignature {
        let digest = transaction_intent_digest(tx_bytes);
        let signature = self.sign(&digest.to_bytes());
        UserSignature::ed25519(&signature, &self.public_key())
    }
}

impl fmt::Debug for SigningSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SigningSecret(REDACTED)")
    }
}

impl Serialize for SigningSecret {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        SigningSecretSerde(self.to_bytes()).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for SigningSecret {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let SigningSecretSerde(bytes) = SigningSecretSerde::deserialize(deserializer)?;
        Ok(SigningSecret::from_bytes(bytes))
    }
}

impl Signature {
    /// Build a signature from its 64-byte form.
    pub fn from_bytes(bytes: [u8; 64]) -> Self {
        Self(bytes)
    }

    /// Serialize the signature as 64 bytes.
    pub fn to_bytes(&self) -> [u8; 64] {
        self.0
    }
}

impl UserSignature {
    /// Assemble an Ed25519 user signature.
    pub fn ed25519(signature: &Signature, public: &SigningPublic) -> Self {
        let mut bytes = Vec::with_capacity(1 + 64 + 32);
        bytes.push(ED25519_FLAG);
        bytes.extend_from_slice(&signature.to_bytes());
        bytes.extend_from_slice(&public.to_bytes());
        Self(bytes)
    }

    /// Wrap already-flagged signature bytes.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The scheme flag, if any bytes are present.
    pub fn scheme(&self) -> Option<u8> {
        self.0.first().copied()
    }

    pub fn to_base64(&self) -> String {
        encode_base64(&self.0)
    }

    /// Split an Ed25519 user signature back into its signature and key.
    pub fn ed25519_parts(&self) -> Result<(Signature, SigningPublic), SigningError> {
        if self.0.len() != 1 + 64 + 32 || self.0[0] != ED25519_FLAG {
            return Err(SigningError::Malformed);
        }
        let mut sig = [0u8; 64];
        sig.copy_from_slice(&self.0[1..65]);
        let mut pk = [0u8; 32];
        pk.copy_from_slice(&self.0[65..]);
        Ok((Signature(sig), SigningPublic::from_bytes(pk)?))
    }

    /// Check an Ed25519 user signature against transaction bytes, returning the signer.
    pub fn verify_transaction(&self, tx_bytes: &[u8]) -> Result<SigningPublic, SigningError> {
        let (signature, public) = self.ed25519_parts()?;
        let digest = transaction_intent_digest(tx_bytes);
        public.verify(&signature, &digest.to_bytes())?;
        Ok(public)
    }
}

impl fmt::Display for UserSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base64())
    }
}

impl fmt::Debug for UserSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UserSignature([{} bytes])", self.0.len())
    }
}

impl FromStr for UserSignature {
    type Err = SigningError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decode_base64(s)
            .map(Self)
            .map_err(|_| SigningError::Malformed)
    }
}

impl Serialize for UserSignature {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if serializer.is_human_readable() {
            serializer.serialize_str(&self.to_base64())
        } else {
            serializer.serialize_bytes(&self.0)
        }
    }
}

impl<'de> Deserialize<'de> for UserSignature {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        if deserializer.is_human_readable() {
            let s = String::deserialize(deserializer)?;
            s.parse().map_err(serde::de::Error::custom)
        } else {
            Ok(Self(Vec::<u8>::deserialize(deserializer)?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ED25519_FLAG, Signature, SigningPublic, SigningSecret, UserSignature};

    #[test]
    fn serde_json_round_trip_and_verify() {
        let secret = SigningSecret::from_bytes([7u8; 32]);
        let public = secret.public_key();
        let msg = b"signing-round-trip";
        let signature = secret.sign(msg);

        let secret_json = serde_json::to_string(&secret).expect("secret to json");
        let public_json = serde_json::to_string(&public).expect("public to json");

        let secret_back: SigningSecret =
            serde_json::from_str(&secret_json).expect("secret from json");
        let public_back: SigningPublic =
            serde_json::from_str(&public_json).expect("public from json");

        assert_eq!(secret.to_bytes(), secret_back.to_bytes());
        assert_eq!(public.to_bytes(), public_back.to_bytes());
        public_back
            .verify(&signature, msg)
            .expect("signature verify");

        let signature_json = serde_json::to_string(&signature).expect("signature to json");
        let signature_back: Signature =
            serde_json::from_str(&signature_json).expect("signature from json");
        assert_eq!(signature.to_bytes(), signature_back.to_bytes());
    }

    #[test]
    fn transaction_signature_layout() {
        let secret = SigningSecret::from_bytes([3u8; 32]);
        let tx_bytes = b"pretend transaction data";
        let user_sig = secret.sign_transaction(tx_bytes);

        assert_eq!(user_sig.as_bytes().len(), 97);
        assert_eq!(user_sig.scheme(), Some(ED25519_FLAG));
        assert_eq!(&user_sig.as_bytes()[65..], &secret.public_key().to_bytes());

        let signer = user_sig.verify_transaction(tx_bytes).expect("verifies");
        assert_eq!(signer, secret.public_key());
        assert!(user_sig.verify_transaction(b"other bytes").is_err());
    }

    #[test]
    fn user_signature_base64_round_trip() {
        let secret = SigningSecret::from_bytes([5u8; 32]);
        let user_sig = secret.sign_transaction(b"abc");
        let text = user_sig.to_string();
        let back: UserSignature = text.parse().expect("parse");
        assert_eq!(back, user_sig);
        assert!("%%%".parse::<UserSignature>().is_err());
        assert!(UserSignature::from_bytes(Vec::new()).is_empty());
    }

    #[test]
    fn address_depends_on_key() {
        let a = SigningSecret::from_bytes([1u8; 32]).public_key();
        let b = SigningSecret::from_bytes([2u8; 32]).public_key();
        assert_eq!(a.address_bytes(), a.address_bytes());
        assert_ne!(a.address_bytes(), b.address_bytes());
    }
}
