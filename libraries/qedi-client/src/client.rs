use std::future::Future;
use std::sync::Arc;

use qedi_chain::ChainClient;
use qedi_structs::profile::{NewLink, Profile, ProfileDetails};
use qedi_structs::session::{AuthMethod, Session};
use qedi_structs::transaction::ExecutedTransaction;
use qedi_structs::{ObjectId, QediError, SuiAddress};
use thiserror::Error;
use url::Url;

use crate::builder::{PreparedTransaction, TransactionBuilder, parse_sui_amount};
use crate::config::{Config, SponsorshipConfig};
use crate::direct::DirectSubmitter;
use crate::identity::{IdentityResolver, SessionStore, Signer};
use crate::login::{EnokiIdentityProvider, IdentityProvider};
use crate::reader::ProfileReader;
use crate::relay::SponsorshipRelay;
use crate::signer::TransactionSigner;
use crate::sponsor::{EnokiSponsor, RelayHttpSponsor, SponsorService};

/// A sequential add stopped partway. Links before the failing one stay on-chain.
#[derive(Debug, Error)]
#[error("added {} link(s) before failing: {error}", committed.len())]
pub struct AddLinksError {
    pub committed: Vec<ExecutedTransaction>,
    pub error: QediError,
}

/// Submit one transaction per link, each only after the previous one has
/// executed, stopping at the first failure.
pub async fn submit_sequentially<F, Fut>(
    links: &[NewLink],
    mut submit: F,
) -> Result<Vec<ExecutedTransaction>, AddLinksError>
where
    F: FnMut(NewLink) -> Fut,
    Fut: Future<Output = Result<ExecutedTransaction, QediError>>,
{
    let mut committed = Vec::with_capacity(links.len());
    for link in links {
        match submit(link.clone()).await {
            Ok(executed) => committed.push(executed),
            Err(error) => return Err(AddLinksError { committed, error }),
        }
    }
    Ok(committed)
}

/// Everything a front end needs: identity, writes through whichever path the
/// identity calls for, and profile reads.
pub struct QediClient {
    builder: TransactionBuilder,
    identity: Arc<IdentityResolver>,
    direct: DirectSubmitter,
    sponsored: Option<SponsorshipRelay>,
    relay: Option<Arc<RelayHttpSponsor>>,
    reader: ProfileReader,
}

impl QediClient {
    pub fn new(config: &Config, store: Arc<dyn SessionStore>) -> anyhow::Result<Self> {
        let http = reqwest::Client::new();
        let chain = ChainClient::http(config.rpc_url()?);
        let provider = config.social.clone().map(|social| {
            Arc::new(EnokiIdentityProvider::new(http.clone(), social)) as Arc<dyn IdentityProvider>
        });
        let (sponsored, relay) = match &config.sponsorship {
            None => (None, None),
            Some(SponsorshipConfig::Relay { url }) => {
                let relay = Arc::new(RelayHttpSponsor::new(http.clone(), url.clone()));
                (
                    Some(SponsorshipRelay::new(relay.clone() as Arc<dyn SponsorService>)),
                    Some(relay),
                )
            }
            Some(SponsorshipConfig::Enoki(enoki)) => {
                let service = EnokiSponsor::new(http.clone(), enoki.clone(), config.network, chain.clone());
                (Some(SponsorshipRelay::new(Arc::new(service))), None)
            }
        };
        Ok(Self {
            builder: TransactionBuilder::new(config.contract.clone()),
            identity: Arc::new(IdentityResolver::new(store, provider)),
            direct: DirectSubmitter::new(chain.clone(), config.gas_budget),
            sponsored,
            relay,
            reader: ProfileReader::new(chain, config.contract.clone()),
        })
    }

    pub fn identity(&self) -> &Arc<IdentityResolver> {
        &self.identity
    }

    pub fn builder(&self) -> &TransactionBuilder {
        &self.builder
    }

    pub async fn connect_wallet(&self, signer: Arc<dyn TransactionSigner>) {
        self.identity.connect_wallet(signer).await
    }

    pub async fn login(&self, method: AuthMethod) -> Result<Option<Url>, QediError> {
        self.identity.login(method).await
    }

    pub async fn complete_login(&self, code: &str) -> Result<Session, QediError> {
        self.identity.complete_login(code).await
    }

    pub async fn logout(&self) -> Result<(), QediError> {
        self.identity.logout().await
    }

    async fn signer(&self) -> Result<Signer, QediError> {
        self.identity
            .active_signer()
            .await?
            .ok_or_else(|| QediError::auth("cannot submit", "no wallet connected and no active login"))
    }

    /// Route a built transaction: a wallet pays its own way, a delegated
    /// login goes through the sponsor.
    pub async fn submit(&self, tx: &PreparedTransaction) -> Result<ExecutedTransaction, QediError> {
        let signer = self.signer().await?;
        self.submit_as(signer, tx).await
    }

    async fn submit_as(
        &self,
        signer: Signer,
        tx: &PreparedTransaction,
    ) -> Result<ExecutedTransaction, QediError> {
        match signer {
            Signer::Direct(wallet) => self.direct.submit(wallet.as_ref(), tx).await,
            Signer::Delegated(delegated) => {
                let relay = self.sponsored.as_ref().ok_or_else(|| {
                    QediError::sponsor("cannot submit", "no sponsorship service configured")
                })?;
                relay.run(delegated.as_ref(), tx).await
            }
        }
    }

    pub async fn create_profile(
        &self,
        username: &str,
        details: &ProfileDetails,
    ) -> Result<ExecutedTransaction, QediError> {
        let tx = self.builder.create_profile(username, details)?;
        self.submit(&tx).await
    }

    pub async fn add_link(
        &self,
        profile_id: ObjectId,
        link: &NewLink,
    ) -> Result<ExecutedTransaction, QediError> {
        let tx = self.builder.add_link(profile_id, link)?;
        self.submit(&tx).await
    }

    /// All links in one transaction: either every link lands or none does.
    pub async fn add_links(
        &self,
        profile_id: ObjectId,
        links: &[NewLink],
    ) -> Result<ExecutedTransaction, QediError> {
        let tx = self.builder.add_links(profile_id, links)?;
        self.submit(&tx).await
    }

    /// One transaction per link. Not atomic: see [`AddLinksError`].
    pub async fn add_links_sequential(
        &self,
        profile_id: ObjectId,
        links: &[NewLink],
    ) -> Result<Vec<ExecutedTransaction>, AddLinksError> {
        submit_sequentially(links, |link| async move { self.add_link(profile_id, &link).await })
            .await
    }

    pub async fn update_profile(
        &self,
        profile_id: ObjectId,
        details: &ProfileDetails,
    ) -> Result<ExecutedTransaction, QediError> {
        let tx = self.builder.update_profile(profile_id, details)?;
        self.submit(&tx).await
    }

    /// Record a click as the active identity. A delegated login behind a
    /// relay goes through the relay's click endpoint, which pays and signs.
    pub async fn record_click(
        &self,
        profile_id: ObjectId,
        link_index: u64,
    ) -> Result<ExecutedTransaction, QediError> {
        let tx = self.builder.record_click(profile_id, link_index)?;
        match (self.signer().await?, &self.relay) {
            (Signer::Delegated(_), Some(relay)) => relay.track_click(profile_id, link_index).await,
            (signer, _) => self.submit_as(signer, &tx).await,
        }
    }

    /// Record a click for a visitor with no identity; the relay pays and signs.
    pub async fn record_click_anonymous(
        &self,
        profile_id: ObjectId,
        link_index: u64,
    ) -> Result<ExecutedTransaction, QediError> {
        let relay = self
            .relay
            .as_ref()
            .ok_or_else(|| QediError::sponsor("cannot record click", "no relay configured"))?;
        relay.track_click(profile_id, link_index).await
    }

    /// Send `amount` SUI to `recipient` from a connected wallet.
    pub async fn donate(
        &self,
        recipient: SuiAddress,
        amount: &str,
    ) -> Result<ExecutedTransaction, QediError> {
        let amount_mist = parse_sui_amount(amount)?;
        let tx = self.builder.donation(recipient, amount_mist)?;
        match self.signer().await? {
            Signer::Direct(wallet) => self.direct.submit(wallet.as_ref(), &tx).await,
            Signer::Delegated(_) => Err(QediError::validation(
                "donations need a connected wallet; sponsored gas cannot be donated",
            )),
        }
    }

    pub async fn profile_by_username(&self, username: &str) -> Result<Option<Profile>, QediError> {
        self.reader.by_username(username).await
    }

    pub async fn profile_by_id(&self, id: ObjectId) -> Result<Option<Profile>, QediError> {
        self.reader.by_id(id).await
    }

    pub async fn profiles_by_owner(&self, owner: SuiAddress) -> Result<Vec<Profile>, QediError> {
        self.reader.by_owner(owner).await
    }
}
