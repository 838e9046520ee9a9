use async_trait::async_trait;
use derivative::Derivative;
use qedi_crypt::encode_base64;
use qedi_crypt::signing::SigningSecret;
use qedi_structs::session::{SocialProvider, ZkLoginCredential, ZkLoginInputs};
use qedi_structs::{QediError, SuiAddress};
use serde::{Deserialize, Serialize};
use serde_json::json;
use url::Url;

use crate::config::SocialConfig;

/// A social login waiting for the provider to redirect back with a code.
#[derive(Clone, Derivative)]
#[derivative(Debug)]
pub struct PendingLogin {
    pub provider: SocialProvider,
    #[derivative(Debug(format_with = "qedi_crypt::redacted_debug"))]
    pub ephemeral_secret: SigningSecret,
    pub max_epoch: u64,
    /// Where to send the user to authorize.
    pub authorization_url: Url,
}

/// A finished login: the derived address and what is needed to sign for it.
#[derive(Clone, Debug)]
pub struct CompletedLogin {
    pub address: SuiAddress,
    pub credential: ZkLoginCredential,
}

/// The service that turns an OAuth authorization into a zkLogin identity.
#[async_trait]
pub trait IdentityProvider: Send + Sync + 'static {
    async fn begin(&self, provider: SocialProvider) -> Result<PendingLogin, QediError>;

    /// Exchange the authorization code. Must fail rather than hand back an
    /// identity it could not prove.
    async fn complete(&self, pending: &PendingLogin, code: &str) -> Result<CompletedLogin, QediError>;
}

#[derive(Deserialize)]
struct DataEnvelope<T> {
    data: T,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthUrlData {
    url: Url,
    max_epoch: u64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CallbackData {
    #[serde(default)]
    address: Option<SuiAddress>,
    #[serde(default)]
    proof: Option<ZkLoginInputs>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AuthUrlRequest<'a> {
    provider: &'a str,
    client_id: &'a str,
    redirect_url: &'a str,
    ephemeral_public_key: String,
    scopes: &'a [&'a str],
}

/// zkLogin over the provider service's REST interface.
pub struct EnokiIdentityProvider {
    http: reqwest::Client,
    config: SocialConfig,
}

impl EnokiIdentityProvider {
    pub fn new(http: reqwest::Client, config: SocialConfig) -> Self {
        Self { http, config }
    }

    fn client_id(&self, provider: SocialProvider) -> Result<&str, QediError> {
        let id = match provider {
            SocialProvider::Google => self.config.google_client_id.as_deref(),
            SocialProvider::Facebook => self.config.facebook_client_id.as_deref(),
            SocialProvider::Twitch => self.config.twitch_client_id.as_deref(),
        };
        id.ok_or_else(|| {
            QediError::auth("login unavailable", format!("no client id configured for {}", provider.as_str()))
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, QediError> {
        self.config
            .provider_url
            .join(path)
            .map_err(|err| QediError::auth("bad provider url", err))
    }

    async fn post<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        body: &impl Serialize,
    ) -> Result<T, QediError> {
        let resp = self
            .http
            .post(self.endpoint(path)?)
            .bearer_auth(&self.config.api_key)
            .json(body)
            .send()
            .await
            .map_err(|err| QediError::auth("identity provider unreachable", err))?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(QediError::auth("identity provider rejected the request", format!("{status}: {text}")));
        }
        let envelope: DataEnvelope<T> = resp
            .json()
            .await
            .map_err(|err| QediError::auth("unreadable identity provider response", err))?;
        Ok(envelope.data)
    }
}

#[async_trait]
impl IdentityProvider for EnokiIdentityProvider {
    async fn begin(&self, provider: SocialProvider) -> Result<PendingLogin, QediError> {
        let ephemeral_secret = SigningSecret::random();
        let request = AuthUrlRequest {
            provider: provider.as_str(),
            client_id: self.client_id(provider)?,
            redirect_url: self.config.redirect_url.as_str(),
            ephemeral_public_key: encode_base64(&ephemeral_secret.public_key().to_bytes()),
            scopes: provider.scopes(),
        };
        let data: AuthUrlData = self.post("/v1/zklogin/auth-url", &request).await?;
        tracing::debug!(provider = provider.as_str(), max_epoch = data.max_epoch, "social login started");
        Ok(PendingLogin {
            provider,
            ephemeral_secret,
            max_epoch: data.max_epoch,
            authorization_url: data.url,
        })
    }

    async fn complete(&self, pending: &PendingLogin, code: &str) -> Result<CompletedLogin, QediError> {
        if code.is_empty() {
            return Err(QediError::auth("login failed", "empty authorization code"));
        }
        let body = json!({
            "provider": pending.provider.as_str(),
            "code": code,
            "redirectUrl": self.config.redirect_url.as_str(),
            "ephemeralPublicKey": encode_base64(&pending.ephemeral_secret.public_key().to_bytes()),
            "maxEpoch": pending.max_epoch,
        });
        let data: CallbackData = self.post("/v1/zklogin/callback", &body).await?;
        let (Some(address), Some(inputs)) = (data.address, data.proof) else {
            return Err(QediError::auth(
                "login failed",
                "provider response lacks an address or proof",
            ));
        };
        tracing::info!(address = %address.abbreviated(), provider = pending.provider.as_str(), "social login completed");
        Ok(CompletedLogin {
            address,
            credential: ZkLoginCredential {
                ephemeral_secret: pending.ephemeral_secret.clone(),
                max_epoch: pending.max_epoch,
                inputs,
            },
        })
    }
}
