use std::fmt;
use std::str::FromStr;

use qedi_crypt::hash::Digest;
use qedi_crypt::signing::SigningPublic;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("invalid 32-byte hex identifier")]
pub struct HexIdError;

/// Defines a 32-byte ledger identifier: `0x`-prefixed hex in text, 32 raw
/// bytes in BCS.
macro_rules! hex_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name([u8; 32]);

        impl $name {
            pub const ZERO: Self = Self([0u8; 32]);

            pub const fn from_bytes(bytes: [u8; 32]) -> Self {
                Self(bytes)
            }

            /// An identifier whose last byte is `value`, like the well-known `0x6`.
            pub const fn from_low_byte(value: u8) -> Self {
                let mut bytes = [0u8; 32];
                bytes[31] = value;
                Self(bytes)
            }

            pub fn to_bytes(&self) -> [u8; 32] {
                self.0
            }

            /// Parse hex with or without the `0x` prefix; short forms are left-padded.
            pub fn parse(input: &str) -> Result<Self, HexIdError> {
                let hex_part = input
                    .strip_prefix("0x")
                    .or_else(|| input.strip_prefix("0X"))
                    .unwrap_or(input);
                if hex_part.is_empty() || hex_part.len() > 64 {
                    return Err(HexIdError);
                }
                let padded = format!("{hex_part:0>64}");
                let bytes = hex::decode(padded).map_err(|_| HexIdError)?;
                let bytes: [u8; 32] = bytes.try_into().map_err(|_| HexIdError)?;
                Ok(Self(bytes))
            }

            /// Shortened form for log lines: `0x123456...cdef`.
            pub fn abbreviated(&self) -> String {
                let full = self.to_string();
                format!("{}...{}", &full[..8], &full[full.len() - 4..])
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "0x{}", hex::encode(self.0))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "0x{}", hex::encode(self.0))
            }
        }

        impl FromStr for $name {
            type Err = HexIdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: Serializer,
            {
                if serializer.is_human_readable() {
                    serializer.serialize_str(&self.to_string())
                } else {
                    self.0.serialize(serializer)
                }
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: Deserializer<'de>,
            {
                if deserializer.is_human_readable() {
                    let s = String::deserialize(deserializer)?;
                    Self::parse(&s).map_err(serde::de::Error::custom)
                } else {
                    <[u8; 32]>::deserialize(deserializer).map(Self)
                }
            }
        }
    };
}

hex_id!(
    /// An account address on the ledger.
    SuiAddress
);

hex_id!(
    /// The id of an on-chain object.
    ObjectId
);

impl SuiAddress {
    /// The address controlled by an Ed25519 key.
    pub fn from_public_key(public: &SigningPublic) -> Self {
        Self(public.address_bytes())
    }
}

impl From<ObjectId> for SuiAddress {
    fn from(value: ObjectId) -> Self {
        Self(value.0)
    }
}

impl From<SuiAddress> for ObjectId {
    fn from(value: SuiAddress) -> Self {
        Self(value.0)
    }
}

/// A reference to a specific version of an owned object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectRef {
    pub object_id: ObjectId,
    pub version: u64,
    pub digest: Digest,
}
