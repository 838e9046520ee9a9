use std::fmt;
use std::str::FromStr;

use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest as _};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

type Blake2b256 = Blake2b<U32>;

/// Prefix the ledger mixes into transaction digests.
const TRANSACTION_DATA_PREFIX: &str = "TransactionData::";

/// Blake2b-256 output. Rendered as base58, which is how the ledger prints
/// transaction and object digests.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Digest([u8; 32]);

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DigestParseError;

impl Digest {
    /// Hash a message with Blake2b-256.
    pub fn digest(msg: &[u8]) -> Self {
        Self::digest_parts(&[msg])
    }

    /// Hash the concatenation of several byte strings without copying them together.
    pub fn digest_parts(parts: &[&[u8]]) -> Self {
        let mut hasher = Blake2b256::new();
        for part in parts {
            hasher.update(part);
        }
        let mut out = [0u8; 32];
        out.copy_from_slice(&hasher.finalize());
        Self(out)
    }

    /// The digest the ledger assigns to BCS-encoded transaction data.
    pub fn transaction(tx_bytes: &[u8]) -> Self {
        Self::digest_parts(&[TRANSACTION_DATA_PREFIX.as_bytes(), tx_bytes])
    }

    /// Generate a random digest value.
    pub fn random() -> Self {
        Self(rand::random())
    }

    /// Build a digest from its 32-byte form.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Serialize the digest as 32 bytes.
    pub fn to_bytes(&self) -> [u8; 32] {
        self.0
    }

    pub fn to_base58(&self) -> String {
        bs58::encode(self.0).into_string()
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base58())
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base58())
    }
}

impl FromStr for Digest {
    type Err = DigestParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = bs58::decode(s).into_vec().map_err(|_| DigestParseError)?;
        let bytes: [u8; 32] = bytes.try_into().map_err(|_| DigestParseError)?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for DigestParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid digest")
    }
}

impl std::error::Error for DigestParseError {}

// Binary encodings carry the digest as a length-prefixed byte vector, which is
// what the ledger's BCS layout expects for object and transaction digests.
impl Serialize for Digest {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if serializer.is_human_readable() {
            serializer.serialize_str(&self.to_base58())
        } else {
            serializer.serialize_bytes(&self.0)
        }
    }
}

impl<'de> Deserialize<'de> for Digest {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        if deserializer.is_human_readable() {
            let s = String::deserialize(deserializer)?;
            s.parse().map_err(serde::de::Error::custom)
        } else {
            let bytes = Vec::<u8>::deserialize(deserializer)?;
            let bytes: [u8; 32] = bytes
                .try_into()
                .map_err(|_| serde::de::Error::custom("digest must be 32 bytes"))?;
            Ok(Self(bytes))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Digest;

    #[test]
    fn empty_input_matches_blake2b_256() {
        assert_eq!(
            hex::encode(Digest::digest(b"").to_bytes()),
            "0e5751c026e543b2e8ab2eb06099daa1d1e5df47778f7787faab45cdf12fe3a8"
        );
    }

    #[test]
    fn parts_hash_like_concatenation() {
        assert_eq!(
            Digest::digest_parts(&[b"Transaction", b"Data::", b"xyz"]),
            Digest::digest(b"TransactionData::xyz")
        );
        assert_eq!(
            Digest::transaction(b"xyz"),
            Digest::digest(b"TransactionData::xyz")
        );
    }

    #[test]
    fn base58_text_and_length_prefixed_binary() {
        let digest = Digest::from_bytes([9u8; 32]);
        let text = digest.to_string();
        assert_eq!(text.parse::<Digest>().unwrap(), digest);
        assert_eq!(
            serde_json::to_string(&digest).unwrap(),
            format!("\"{text}\"")
        );

        let binary = bcs::to_bytes(&digest).unwrap();
        assert_eq!(binary.len(), 33);
        assert_eq!(binary[0], 32);
        assert_eq!(bcs::from_bytes::<Digest>(&binary).unwrap(), digest);
    }

    #[test]
    fn rejects_wrong_length() {
        assert!("3yZe7d".parse::<Digest>().is_err());
        assert!("not base58 0OIl".parse::<Digest>().is_err());
    }
}
