use std::sync::Arc;

use qedi_chain::ChainClient;
use qedi_client::{EnokiSponsor, KeypairSigner, SponsorshipRelay, TransactionBuilder};
use qedi_crypt::signing::SigningSecret;
use qedi_structs::contract::ContractCoordinates;
use qedi_structs::network::Network;

use crate::config::Config;

pub struct RelayState {
    pub network: Network,
    pub contract: ContractCoordinates,
    pub builder: TransactionBuilder,
    pub relay: SponsorshipRelay,
    /// Sender for clicks recorded on behalf of anonymous visitors.
    pub system_signer: KeypairSigner,
    pub allowed_origins: Vec<String>,
}

impl RelayState {
    pub fn new(config: &Config, system_key: SigningSecret) -> anyhow::Result<Arc<Self>> {
        let contract = config.contract();
        let chain = ChainClient::http(config.rpc_url()?);
        let sponsor = EnokiSponsor::new(reqwest::Client::new(), config.enoki()?, config.network, chain);
        Ok(Arc::new(Self {
            network: config.network,
            builder: TransactionBuilder::new(contract.clone()),
            contract,
            relay: SponsorshipRelay::new(Arc::new(sponsor)),
            system_signer: KeypairSigner::new(system_key),
            allowed_origins: config.allowed_origins.clone(),
        }))
    }
}
