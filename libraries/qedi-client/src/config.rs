use std::path::Path;

use anyhow::Context;
use qedi_structs::contract::ContractCoordinates;
use qedi_structs::network::Network;
use serde::{Deserialize, Serialize};
use url::Url;

pub const DEFAULT_GAS_BUDGET: u64 = 10_000_000;

fn default_gas_budget() -> u64 {
    DEFAULT_GAS_BUDGET
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub network: Network,
    /// Full node endpoint; the network's public node when unset.
    #[serde(default)]
    pub rpc_url: Option<Url>,
    pub contract: ContractCoordinates,
    #[serde(default = "default_gas_budget")]
    pub gas_budget: u64,
    #[serde(default)]
    pub sponsorship: Option<SponsorshipConfig>,
    #[serde(default)]
    pub social: Option<SocialConfig>,
}

impl Config {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config at {}", path.display()))?;
        toml::from_str(&raw).context("failed to parse client config")
    }

    pub fn rpc_url(&self) -> anyhow::Result<Url> {
        match &self.rpc_url {
            Some(url) => Ok(url.clone()),
            None => Url::parse(self.network.fullnode_url()).context("invalid fullnode url"),
        }
    }
}

/// Who pays for delegated-identity transactions.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum SponsorshipConfig {
    /// Go through a relay that holds the sponsor key.
    Relay { url: Url },
    /// Talk to the sponsorship service directly.
    Enoki(EnokiConfig),
}

pub const DEFAULT_SPONSOR_PATH: &str = "/v1/transaction-blocks/sponsor";
pub const DEFAULT_EXECUTE_PATH: &str = "/v1/transaction-blocks/sponsor/{digest}";

fn default_sponsor_path() -> String {
    DEFAULT_SPONSOR_PATH.into()
}

fn default_execute_path() -> String {
    DEFAULT_EXECUTE_PATH.into()
}

#[derive(Clone, Serialize, Deserialize, derivative::Derivative)]
#[derivative(Debug)]
pub struct EnokiConfig {
    pub url: Url,
    #[serde(default = "default_sponsor_path")]
    pub sponsor_path: String,
    /// `{digest}` is replaced with the sponsored digest.
    #[serde(default = "default_execute_path")]
    pub execute_path: String,
    #[serde(default)]
    #[derivative(Debug(format_with = "qedi_crypt::redacted_debug"))]
    pub api_key: String,
}

impl EnokiConfig {
    pub fn new(url: Url, api_key: impl Into<String>) -> Self {
        Self {
            url,
            sponsor_path: default_sponsor_path(),
            execute_path: default_execute_path(),
            api_key: api_key.into(),
        }
    }
}

/// Social login through the zkLogin provider service.
#[derive(Clone, Serialize, Deserialize, derivative::Derivative)]
#[derivative(Debug)]
pub struct SocialConfig {
    pub provider_url: Url,
    #[derivative(Debug(format_with = "qedi_crypt::redacted_debug"))]
    pub api_key: String,
    pub redirect_url: Url,
    #[serde(default)]
    pub google_client_id: Option<String>,
    #[serde(default)]
    pub facebook_client_id: Option<String>,
    #[serde(default)]
    pub twitch_client_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toml_with_relay_sponsorship() {
        let config: Config = toml::from_str(
            r#"
            network = "testnet"

            [contract]
            package_id = "0xabc"
            registry_id = "0xdef"

            [sponsorship]
            mode = "relay"
            url = "http://127.0.0.1:3001"
            "#,
        )
        .unwrap();
        assert_eq!(config.gas_budget, DEFAULT_GAS_BUDGET);
        assert!(matches!(config.sponsorship, Some(SponsorshipConfig::Relay { .. })));
        assert_eq!(
            config.rpc_url().unwrap().as_str(),
            "https://fullnode.testnet.sui.io/"
        );
    }

    #[test]
    fn enoki_paths_default() {
        let config: SponsorshipConfig = toml::from_str(
            r#"
            mode = "enoki"
            url = "https://api.enoki.mystenlabs.com"
            api_key = "secret"
            "#,
        )
        .unwrap();
        let SponsorshipConfig::Enoki(enoki) = config else {
            panic!("expected enoki config");
        };
        assert_eq!(enoki.sponsor_path, DEFAULT_SPONSOR_PATH);
        assert!(!format!("{enoki:?}").contains("secret"));
    }
}
