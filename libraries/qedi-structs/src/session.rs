use std::fmt;
use std::str::FromStr;

use derivative::Derivative;
use qedi_crypt::signing::SigningSecret;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use crate::address::SuiAddress;

/// A social identity provider that can back a delegated login.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SocialProvider {
    Google,
    Facebook,
    Twitch,
}

impl SocialProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            SocialProvider::Google => "google",
            SocialProvider::Facebook => "facebook",
            SocialProvider::Twitch => "twitch",
        }
    }

    /// OAuth scopes requested from the provider.
    pub fn scopes(&self) -> &'static [&'static str] {
        match self {
            SocialProvider::Google => &["openid", "email", "profile"],
            SocialProvider::Facebook => &["email", "public_profile"],
            SocialProvider::Twitch => &["user:read:email"],
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("unknown auth method {0:?}")]
pub struct AuthMethodError(pub String);

impl FromStr for SocialProvider {
    type Err = AuthMethodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "google" => Ok(SocialProvider::Google),
            "facebook" => Ok(SocialProvider::Facebook),
            "twitch" => Ok(SocialProvider::Twitch),
            other => Err(AuthMethodError(other.to_string())),
        }
    }
}

/// How the active identity authenticated. Rendered as `wallet` or the
/// provider's name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AuthMethod {
    Wallet,
    Social(SocialProvider),
}

impl AuthMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthMethod::Wallet => "wallet",
            AuthMethod::Social(provider) => provider.as_str(),
        }
    }
}

impl fmt::Display for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuthMethod {
    type Err = AuthMethodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "wallet" {
            return Ok(AuthMethod::Wallet);
        }
        s.parse().map(AuthMethod::Social)
    }
}

impl Serialize for AuthMethod {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for AuthMethod {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Groth16 proof points as decimal strings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZkProofPoints {
    pub a: Vec<String>,
    pub b: Vec<Vec<String>>,
    pub c: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZkClaim {
    pub value: String,
    pub index_mod_4: u8,
}

/// Proof material returned by the identity provider. Field order matches the
/// ledger's authenticator layout, so the same struct is BCS-encoded into the
/// signature.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZkLoginInputs {
    pub proof_points: ZkProofPoints,
    pub iss_base64_details: ZkClaim,
    pub header_base64: String,
    pub address_seed: String,
}

/// What a delegated session needs to sign: the ephemeral key, the proof
/// binding it to the address, and the epoch after which the proof lapses.
#[derive(Clone, Derivative, Serialize, Deserialize)]
#[derivative(Debug)]
pub struct ZkLoginCredential {
    #[derivative(Debug(format_with = "qedi_crypt::redacted_debug"))]
    pub ephemeral_secret: SigningSecret,
    pub max_epoch: u64,
    pub inputs: ZkLoginInputs,
}

/// The currently authenticated identity.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Session {
    pub address: SuiAddress,
    pub auth_method: AuthMethod,
    pub credential: Option<ZkLoginCredential>,
}

impl Session {
    pub fn wallet(address: SuiAddress) -> Self {
        Self {
            address,
            auth_method: AuthMethod::Wallet,
            credential: None,
        }
    }

    pub fn delegated(
        address: SuiAddress,
        provider: SocialProvider,
        credential: ZkLoginCredential,
    ) -> Self {
        Self {
            address,
            auth_method: AuthMethod::Social(provider),
            credential: Some(credential),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs() -> ZkLoginInputs {
        ZkLoginInputs {
            proof_points: ZkProofPoints {
                a: vec!["1".into(), "2".into()],
                b: vec![vec!["3".into()]],
                c: vec!["4".into()],
            },
            iss_base64_details: ZkClaim {
                value: "iss".into(),
                index_mod_4: 1,
            },
            header_base64: "hdr".into(),
            address_seed: "42".into(),
        }
    }

    #[test]
    fn auth_method_is_a_plain_string() {
        assert_eq!(serde_json::to_string(&AuthMethod::Wallet).unwrap(), "\"wallet\"");
        assert_eq!(
            serde_json::from_str::<AuthMethod>("\"twitch\"").unwrap(),
            AuthMethod::Social(SocialProvider::Twitch)
        );
        assert!("myspace".parse::<AuthMethod>().is_err());
    }

    #[test]
    fn provider_inputs_use_camel_case() {
        let json = serde_json::to_value(inputs()).unwrap();
        assert_eq!(json["issBase64Details"]["indexMod4"], 1);
        assert_eq!(json["addressSeed"], "42");
    }

    #[test]
    fn delegated_session_survives_bcs() {
        let session = Session::delegated(
            SuiAddress::from_low_byte(7),
            SocialProvider::Google,
            ZkLoginCredential {
                ephemeral_secret: SigningSecret::from_bytes([3u8; 32]),
                max_epoch: 12,
                inputs: inputs(),
            },
        );
        let bytes = bcs::to_bytes(&session).unwrap();
        let back: Session = bcs::from_bytes(&bytes).unwrap();
        assert_eq!(back.address, session.address);
        assert_eq!(back.auth_method, session.auth_method);
        let credential = back.credential.unwrap();
        assert_eq!(credential.max_epoch, 12);
        assert_eq!(credential.ephemeral_secret.to_bytes(), [3u8; 32]);
    }

    #[test]
    fn credential_debug_hides_the_key() {
        let credential = ZkLoginCredential {
            ephemeral_secret: SigningSecret::from_bytes([3u8; 32]),
            max_epoch: 1,
            inputs: inputs(),
        };
        assert!(format!("{credential:?}").contains("REDACTED"));
    }
}
