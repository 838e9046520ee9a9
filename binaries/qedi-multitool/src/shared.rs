use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::Args;
use qedi_client::config::SponsorshipConfig;
use qedi_client::{
    Config, KeypairSigner, MemorySessionStore, PreparedTransaction, QediClient, RelayHttpSponsor,
    SponsorshipRelay,
};
use qedi_crypt::signing::SigningSecret;
use qedi_structs::transaction::ExecutedTransaction;
use qedi_structs::{ObjectId, QediError};
use qedi_structs::contract::ContractCoordinates;
use qedi_structs::network::Network;
use serde::{Deserialize, Serialize};
use url::Url;

#[derive(Args, Clone)]
pub struct GlobalArgs {
    /// Client config file; the flags below override it.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    #[arg(long, global = true)]
    pub network: Option<Network>,
    #[arg(long, global = true)]
    pub rpc_url: Option<Url>,
    #[arg(long, global = true)]
    pub package_id: Option<ObjectId>,
    #[arg(long, global = true)]
    pub registry_id: Option<ObjectId>,
    /// Route writes through this relay, which pays the gas.
    #[arg(long, global = true)]
    pub relay_url: Option<Url>,
    /// Key file written by `keygen --out`; signs every write.
    #[arg(long, global = true)]
    pub key: Option<PathBuf>,
}

/// On-disk form of a generated key.
#[derive(Serialize, Deserialize)]
pub struct KeyFile {
    pub address: qedi_structs::SuiAddress,
    pub secret: SigningSecret,
}

pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{json}");
    Ok(())
}

pub fn read_key_file(path: &Path) -> anyhow::Result<SigningSecret> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read key file {}", path.display()))?;
    let key: KeyFile = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse key file {}", path.display()))?;
    Ok(key.secret)
}

pub fn build_config(global: &GlobalArgs) -> anyhow::Result<Config> {
    let mut config = match &global.config {
        Some(path) => Config::load(path)?,
        None => {
            let package_id = global
                .package_id
                .context("missing --package-id (or --config)")?;
            let registry_id = global
                .registry_id
                .context("missing --registry-id (or --config)")?;
            Config {
                network: Network::default(),
                rpc_url: None,
                contract: ContractCoordinates::new(package_id, registry_id),
                gas_budget: qedi_client::config::DEFAULT_GAS_BUDGET,
                sponsorship: None,
                social: None,
            }
        }
    };
    if let Some(network) = global.network {
        config.network = network;
    }
    if let Some(rpc_url) = &global.rpc_url {
        config.rpc_url = Some(rpc_url.clone());
    }
    if let Some(package_id) = global.package_id {
        config.contract.package_id = package_id;
    }
    if let Some(registry_id) = global.registry_id {
        config.contract.registry_id = registry_id;
    }
    if let Some(url) = &global.relay_url {
        config.sponsorship = Some(SponsorshipConfig::Relay { url: url.clone() });
    }
    Ok(config)
}

/// A read/write client plus, when `--relay-url` is set, the relay that
/// sponsors writes signed with `--key`.
pub struct Tool {
    pub client: QediClient,
    sponsored: Option<SponsorshipRelay>,
    signer: Option<Arc<KeypairSigner>>,
}

impl Tool {
    pub async fn new(global: &GlobalArgs) -> anyhow::Result<Self> {
        let config = build_config(global)?;
        tracing::debug!(
            network = %config.network,
            package = %config.contract.package_id.abbreviated(),
            "client config"
        );
        let client = QediClient::new(&config, Arc::new(MemorySessionStore::new()))?;
        let signer = match &global.key {
            Some(path) => Some(Arc::new(KeypairSigner::new(read_key_file(path)?))),
            None => None,
        };
        if let Some(signer) = &signer {
            client.connect_wallet(signer.clone()).await;
        }
        let sponsored = global.relay_url.as_ref().map(|url| {
            SponsorshipRelay::new(Arc::new(RelayHttpSponsor::new(reqwest::Client::new(), url.clone())))
        });
        Ok(Self {
            client,
            sponsored,
            signer,
        })
    }

    /// Sponsored through the relay when one is configured, otherwise paid by
    /// the key's own gas.
    pub async fn submit(&self, tx: &PreparedTransaction) -> Result<ExecutedTransaction, QediError> {
        let signer = self
            .signer
            .as_ref()
            .ok_or_else(|| QediError::validation("write commands need --key"))?;
        match &self.sponsored {
            Some(relay) => {
                tracing::info!(action = tx.action.name(), "submitting through relay");
                relay.run(signer.as_ref(), tx).await
            }
            None => {
                tracing::info!(action = tx.action.name(), "submitting directly");
                self.client.submit(tx).await
            }
        }
    }

    /// A relay pays and signs clicks itself; without one the key pays.
    pub async fn record_click(
        &self,
        profile_id: ObjectId,
        link_index: u64,
    ) -> Result<ExecutedTransaction, QediError> {
        match &self.sponsored {
            Some(_) => self.client.record_click_anonymous(profile_id, link_index).await,
            None => self.client.record_click(profile_id, link_index).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use httpmock::{Method::POST, MockServer};
    use qedi_crypt::hash::Digest;

    #[derive(Parser)]
    struct Wrapper {
        #[command(flatten)]
        global: GlobalArgs,
    }

    #[test]
    fn flags_are_enough_without_a_config_file() {
        let args = Wrapper::parse_from([
            "qedi-multitool",
            "--package-id",
            "0xaa",
            "--registry-id",
            "0xbb",
            "--network",
            "devnet",
            "--relay-url",
            "http://localhost:3001",
        ]);
        let config = build_config(&args.global).unwrap();
        assert_eq!(config.network, Network::Devnet);
        assert_eq!(config.contract.package_id, ObjectId::from_low_byte(0xaa));
        assert!(matches!(config.sponsorship, Some(SponsorshipConfig::Relay { .. })));
    }

    #[test]
    fn contract_ids_are_required() {
        let args = Wrapper::parse_from(["qedi-multitool", "--package-id", "0xaa"]);
        assert!(build_config(&args.global).is_err());
    }

    #[test]
    fn key_file_roundtrip() {
        let secret = SigningSecret::from_bytes([5; 32]);
        let file = KeyFile {
            address: qedi_structs::SuiAddress::from_public_key(&secret.public_key()),
            secret,
        };
        let path = std::env::temp_dir().join(format!("qedi-multitool-key-{}", std::process::id()));
        std::fs::write(&path, serde_json::to_string(&file).unwrap()).unwrap();
        let back = read_key_file(&path).unwrap();
        assert_eq!(back.public_key(), file.secret.public_key());
        std::fs::remove_file(&path).unwrap();
    }

    #[tokio::test]
    async fn writes_need_a_key() {
        let args = Wrapper::parse_from(["qedi-multitool", "--package-id", "0xaa", "--registry-id", "0xbb"]);
        let tool = Tool::new(&args.global).await.unwrap();
        let tx = tool
            .client
            .builder()
            .record_click(ObjectId::from_low_byte(1), 0)
            .unwrap();
        assert!(matches!(tool.submit(&tx).await, Err(QediError::Validation(_))));
    }

    #[tokio::test]
    async fn relayed_clicks_use_the_click_endpoint() {
        let relay = MockServer::start_async().await;
        let track = relay
            .mock_async(|when, then| {
                when.method(POST).path("/api/track-click");
                then.status(200).json_body(serde_json::json!({"result": {
                    "digest": Digest::from_bytes([3; 32]).to_string(), "status": null, "effects": null,
                }}));
            })
            .await;
        let url = relay.base_url();
        let args = Wrapper::parse_from([
            "qedi-multitool",
            "--package-id",
            "0xaa",
            "--registry-id",
            "0xbb",
            "--relay-url",
            url.as_str(),
        ]);
        let tool = Tool::new(&args.global).await.unwrap();
        tool.record_click(ObjectId::from_low_byte(1), 0).await.unwrap();
        assert_eq!(track.hits_async().await, 1);
    }
}
