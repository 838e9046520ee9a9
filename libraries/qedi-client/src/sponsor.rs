use async_trait::async_trait;
use qedi_chain::{ChainClient, ChainError};
use qedi_crypt::encode_base64;
use qedi_crypt::hash::Digest;
use qedi_crypt::signing::UserSignature;
use qedi_structs::network::Network;
use qedi_structs::relay::{
    AddLinkRequest, AddLinksRequest, CreateProfileRequest, ErrorResponse, ExecuteRequest,
    ExecuteResponse, LinkBody, TrackClickRequest, UpdateProfileRequest,
};
use qedi_structs::transaction::{ExecutedTransaction, SponsoredTransaction, TransactionKind};
use qedi_structs::{ObjectId, QediError, SuiAddress};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use url::Url;

use crate::builder::{Action, PreparedTransaction};
use crate::config::EnokiConfig;

/// A party that pays gas for someone else's transaction.
#[async_trait]
pub trait SponsorService: Send + Sync + 'static {
    /// Step one: attach sponsor-paid gas and return the bytes to sign.
    async fn sponsor(
        &self,
        sender: SuiAddress,
        tx: &PreparedTransaction,
    ) -> Result<SponsoredTransaction, QediError>;

    /// Step three: submit the sender's signature for a sponsored digest.
    async fn execute(
        &self,
        digest: Digest,
        signature: &UserSignature,
    ) -> Result<ExecutedTransaction, QediError>;
}

#[derive(Deserialize)]
struct DataEnvelope<T> {
    data: T,
}

#[derive(Deserialize)]
struct ExecutedDigest {
    digest: Digest,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SponsorBody {
    network: Network,
    transaction_block_kind_bytes: String,
    sender: SuiAddress,
    allowed_move_call_targets: Vec<String>,
    allowed_addresses: Vec<SuiAddress>,
}

/// Talks to the sponsorship service directly with the private API key.
pub struct EnokiSponsor {
    http: reqwest::Client,
    config: EnokiConfig,
    network: Network,
    chain: ChainClient,
}

impl EnokiSponsor {
    pub fn new(http: reqwest::Client, config: EnokiConfig, network: Network, chain: ChainClient) -> Self {
        Self {
            http,
            config,
            network,
            chain,
        }
    }

    fn endpoint(&self, path: &str) -> Result<Url, QediError> {
        self.config
            .url
            .join(path)
            .map_err(|err| QediError::sponsor("bad sponsor url", err))
    }
}

#[async_trait]
impl SponsorService for EnokiSponsor {
    async fn sponsor(
        &self,
        sender: SuiAddress,
        tx: &PreparedTransaction,
    ) -> Result<SponsoredTransaction, QediError> {
        let pt = self.chain.resolve(&tx.plan).await?;
        let kind_bytes = TransactionKind::ProgrammableTransaction(pt)
            .to_bytes()
            .map_err(|err| QediError::sponsor("cannot encode transaction kind", err))?;
        let body = SponsorBody {
            network: self.network,
            transaction_block_kind_bytes: encode_base64(&kind_bytes),
            sender,
            allowed_move_call_targets: tx.allowed_targets(),
            allowed_addresses: vec![sender],
        };
        tracing::debug!(action = tx.action.name(), sender = %sender.abbreviated(), "requesting sponsorship");
        let resp = self
            .http
            .post(self.endpoint(&self.config.sponsor_path)?)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|err| QediError::sponsor("sponsor unreachable", err))?;
        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(QediError::sponsor(
                "sponsor rejected the transaction",
                format!("{status}: {text}"),
            ));
        }
        let envelope: DataEnvelope<SponsoredTransaction> = resp
            .json()
            .await
            .map_err(|err| QediError::sponsor("unreadable sponsor response", err))?;
        Ok(envelope.data)
    }

    async fn execute(
        &self,
        digest: Digest,
        signature: &UserSignature,
    ) -> Result<ExecutedTransaction, QediError> {
        let path = self
            .config
            .execute_path
            .replace("{digest}", &digest.to_string());
        let resp = self
            .http
            .post(self.endpoint(&path)?)
            .bearer_auth(&self.config.api_key)
            .json(&json!({"signature": signature.to_base64()}))
            .send()
            .await
            .map_err(|err| QediError::sponsor("sponsor unreachable", err))?;
        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            let details = format!("{status}: {text}");
            // Credential and quota refusals come from the sponsor, not the ledger.
            return Err(match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS => {
                    QediError::sponsor("sponsor refused execution", details)
                }
                _ => QediError::execution("sponsored execution failed", details),
            });
        }
        let envelope: DataEnvelope<ExecutedDigest> = resp
            .json()
            .await
            .map_err(|err| QediError::sponsor("unreadable sponsor response", err))?;
        let digest = envelope.data.digest;
        match self.chain.transaction_block(digest).await {
            Ok(executed) => Ok(executed),
            Err(err @ ChainError::Rejected(_)) => Err(err.into()),
            Err(err) => {
                tracing::warn!(%digest, error = %err, "effects not readable yet");
                Ok(ExecutedTransaction {
                    digest,
                    status: None,
                    effects: None,
                })
            }
        }
    }
}

/// Sponsorship through a relay's HTTP surface, for clients that do not hold
/// the sponsor key.
pub struct RelayHttpSponsor {
    http: reqwest::Client,
    base: Url,
}

impl RelayHttpSponsor {
    pub fn new(http: reqwest::Client, base: Url) -> Self {
        Self { http, base }
    }

    async fn post<T: DeserializeOwned>(&self, path: &str, body: &impl Serialize) -> Result<T, QediError> {
        let url = self
            .base
            .join(path)
            .map_err(|err| QediError::sponsor("bad relay url", err))?;
        let resp = self
            .http
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|err| QediError::sponsor("relay unreachable", err))?;
        if resp.status().is_success() {
            return resp
                .json()
                .await
                .map_err(|err| QediError::sponsor("unreadable relay response", err));
        }
        let status = resp.status();
        let text = resp.text().await.unwrap_or_default();
        Err(match serde_json::from_str::<ErrorResponse>(&text) {
            Ok(body) => relay_error(body),
            Err(_) => QediError::sponsor("relay request failed", format!("{status}: {text}")),
        })
    }

    /// Record a click with the relay paying and signing. Works without any
    /// identity.
    pub async fn track_click(
        &self,
        profile_id: ObjectId,
        link_index: u64,
    ) -> Result<ExecutedTransaction, QediError> {
        let body = TrackClickRequest {
            profile_id: Some(profile_id),
            link_index: Some(link_index),
        };
        let resp: ExecuteResponse = self.post("/api/track-click", &body).await?;
        Ok(resp.result)
    }
}

/// Rebuild the error a relay reported from its `{error, details}` body.
fn relay_error(body: ErrorResponse) -> QediError {
    let details = body.details;
    match body.error.as_str() {
        "validation_error" => QediError::Validation(details),
        "auth_error" => QediError::Auth(details),
        "signing_error" => QediError::Signing(details),
        "execution_error" => QediError::Execution(details),
        "chain_error" => QediError::Chain(details),
        "not_found" => QediError::NotFound(details),
        _ => QediError::Sponsor(details),
    }
}

fn link_body(link: &qedi_structs::profile::NewLink) -> LinkBody {
    LinkBody {
        title: Some(link.title.clone()),
        url: Some(link.url.clone()),
        icon: Some(link.icon.as_str().to_string()),
    }
}

#[async_trait]
impl SponsorService for RelayHttpSponsor {
    async fn sponsor(
        &self,
        sender: SuiAddress,
        tx: &PreparedTransaction,
    ) -> Result<SponsoredTransaction, QediError> {
        match &tx.action {
            Action::CreateProfile { username, details } => {
                let body = CreateProfileRequest {
                    sender: Some(sender),
                    username: Some(username.to_string()),
                    display_name: Some(details.display_name.clone()),
                    bio: Some(details.bio.clone()),
                    avatar_url: Some(details.avatar_url.clone()),
                    theme: Some(details.theme.clone()),
                };
                self.post("/api/create-profile", &body).await
            }
            Action::AddLink { profile_id, link } => {
                let body = AddLinkRequest {
                    sender: Some(sender),
                    profile_id: Some(*profile_id),
                    title: Some(link.title.clone()),
                    url: Some(link.url.clone()),
                    icon: Some(link.icon.as_str().to_string()),
                };
                self.post("/api/add-link", &body).await
            }
            Action::AddLinks { profile_id, links } => {
                let body = AddLinksRequest {
                    sender: Some(sender),
                    profile_id: Some(*profile_id),
                    links: Some(links.iter().map(link_body).collect()),
                };
                self.post("/api/add-links", &body).await
            }
            Action::UpdateProfile {
                profile_id,
                details,
            } => {
                let body = UpdateProfileRequest {
                    sender: Some(sender),
                    profile_id: Some(*profile_id),
                    display_name: Some(details.display_name.clone()),
                    bio: Some(details.bio.clone()),
                    avatar_url: Some(details.avatar_url.clone()),
                    theme: Some(details.theme.clone()),
                };
                self.post("/api/update-profile", &body).await
            }
            Action::RecordClick { .. } => Err(QediError::sponsor(
                "cannot sponsor through relay",
                "clicks are recorded with track_click",
            )),
            Action::Donation { .. } => Err(QediError::sponsor(
                "cannot sponsor through relay",
                "donations are paid from the sender's own gas coin",
            )),
        }
    }

    async fn execute(
        &self,
        digest: Digest,
        signature: &UserSignature,
    ) -> Result<ExecutedTransaction, QediError> {
        let body = ExecuteRequest {
            digest: Some(digest),
            signature: Some(signature.to_base64()),
        };
        let resp: ExecuteResponse = self.post("/api/execute-transaction", &body).await?;
        Ok(resp.result)
    }
}
