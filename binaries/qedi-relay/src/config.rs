use std::{fs, net::SocketAddr, path::PathBuf};

use anyhow::Context;
use clap::Parser;
use qedi_client::config::{DEFAULT_EXECUTE_PATH, DEFAULT_SPONSOR_PATH, EnokiConfig};
use qedi_structs::ObjectId;
use qedi_structs::contract::{ClickEntry, ContractCoordinates};
use qedi_structs::network::Network;
use serde::Deserialize;
use url::Url;

/// Environment variable consulted when the config file has no sponsor key.
pub const API_KEY_ENV: &str = "ENOKI_PRIVATE_KEY";

#[derive(Parser, Debug)]
#[command(name = "qedi-relay")]
pub struct Args {
    #[arg(long)]
    pub config: PathBuf,
}

#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default = "default_listen")]
    pub listen: SocketAddr,
    #[serde(default)]
    pub network: Network,
    #[serde(default)]
    pub rpc_url: Option<Url>,
    pub package_id: ObjectId,
    pub registry_id: ObjectId,
    #[serde(default)]
    pub click_entry: ClickEntry,
    pub sponsor: SponsorSection,
    /// 32 raw bytes; created on first start.
    pub system_key: PathBuf,
    /// Empty means any origin.
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct SponsorSection {
    pub url: Url,
    #[serde(default = "default_sponsor_path")]
    pub sponsor_path: String,
    #[serde(default = "default_execute_path")]
    pub execute_path: String,
    #[serde(default)]
    pub api_key: Option<String>,
}

fn default_listen() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 3001))
}

fn default_sponsor_path() -> String {
    DEFAULT_SPONSOR_PATH.into()
}

fn default_execute_path() -> String {
    DEFAULT_EXECUTE_PATH.into()
}

impl Config {
    pub fn load(path: &PathBuf) -> anyhow::Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        toml::from_str(&raw).with_context(|| format!("failed to parse config {}", path.display()))
    }

    pub fn contract(&self) -> ContractCoordinates {
        ContractCoordinates {
            package_id: self.package_id,
            registry_id: self.registry_id,
            click_entry: self.click_entry,
        }
    }

    pub fn rpc_url(&self) -> anyhow::Result<Url> {
        match &self.rpc_url {
            Some(url) => Ok(url.clone()),
            None => Url::parse(self.network.fullnode_url()).context("invalid fullnode url"),
        }
    }

    /// Sponsor settings with the API key taken from the file or, failing
    /// that, from the environment.
    pub fn enoki(&self) -> anyhow::Result<EnokiConfig> {
        let api_key = match &self.sponsor.api_key {
            Some(key) if !key.is_empty() => key.clone(),
            _ => std::env::var(API_KEY_ENV)
                .with_context(|| format!("no sponsor api_key in config and {API_KEY_ENV} unset"))?,
        };
        Ok(EnokiConfig {
            url: self.sponsor.url.clone(),
            sponsor_path: self.sponsor.sponsor_path.clone(),
            execute_path: self.sponsor.execute_path.clone(),
            api_key,
        })
    }
}
