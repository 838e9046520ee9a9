//! JSON bodies of the relay's HTTP surface. Request fields are optional so a
//! missing field can be answered with a 400 naming it, instead of a generic
//! extractor rejection.

use qedi_crypt::hash::Digest;
use serde::{Deserialize, Serialize};

use crate::address::{ObjectId, SuiAddress};
use crate::error::QediError;
use crate::profile::{LinkIcon, NewLink, ProfileDetails};
use crate::transaction::ExecutedTransaction;

/// Pull a required field out of a request body.
pub fn required<T>(value: Option<T>, field: &str) -> Result<T, QediError> {
    value.ok_or_else(|| QediError::validation(format!("missing required field `{field}`")))
}

fn details(
    display_name: Option<String>,
    bio: Option<String>,
    avatar_url: Option<String>,
    theme: Option<String>,
) -> Result<ProfileDetails, QediError> {
    let mut details = ProfileDetails::new(required(display_name, "displayName")?);
    if let Some(bio) = bio {
        details.bio = bio;
    }
    if let Some(avatar_url) = avatar_url {
        details.avatar_url = avatar_url;
    }
    if let Some(theme) = theme.filter(|t| !t.is_empty()) {
        details.theme = theme;
    }
    Ok(details)
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProfileRequest {
    pub sender: Option<SuiAddress>,
    pub username: Option<String>,
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub theme: Option<String>,
}

impl CreateProfileRequest {
    pub fn details(&self) -> Result<ProfileDetails, QediError> {
        details(
            self.display_name.clone(),
            self.bio.clone(),
            self.avatar_url.clone(),
            self.theme.clone(),
        )
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub sender: Option<SuiAddress>,
    pub profile_id: Option<ObjectId>,
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub theme: Option<String>,
}

impl UpdateProfileRequest {
    pub fn details(&self) -> Result<ProfileDetails, QediError> {
        details(
            self.display_name.clone(),
            self.bio.clone(),
            self.avatar_url.clone(),
            self.theme.clone(),
        )
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddLinkRequest {
    pub sender: Option<SuiAddress>,
    pub profile_id: Option<ObjectId>,
    pub title: Option<String>,
    pub url: Option<String>,
    pub icon: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct LinkBody {
    pub title: Option<String>,
    pub url: Option<String>,
    pub icon: Option<String>,
}

impl LinkBody {
    pub fn into_link(self) -> Result<NewLink, QediError> {
        let icon = match self.icon.as_deref() {
            None | Some("") => LinkIcon::default(),
            Some(raw) => raw.parse().map_err(QediError::validation)?,
        };
        Ok(NewLink::new(
            required(self.title, "title")?,
            required(self.url, "url")?,
            icon,
        ))
    }
}

impl AddLinkRequest {
    pub fn link(&self) -> Result<NewLink, QediError> {
        LinkBody {
            title: self.title.clone(),
            url: self.url.clone(),
            icon: self.icon.clone(),
        }
        .into_link()
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddLinksRequest {
    pub sender: Option<SuiAddress>,
    pub profile_id: Option<ObjectId>,
    pub links: Option<Vec<LinkBody>>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ExecuteRequest {
    pub digest: Option<Digest>,
    /// Base64 user signature.
    pub signature: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackClickRequest {
    pub profile_id: Option<ObjectId>,
    pub link_index: Option<u64>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExecuteResponse {
    pub result: ExecutedTransaction,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub details: String,
}

impl From<&QediError> for ErrorResponse {
    fn from(err: &QediError) -> Self {
        Self {
            error: err.kind().to_string(),
            details: err.message().to_string(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
    pub network: String,
    pub package_id: ObjectId,
    pub registry_id: ObjectId,
    /// Unix milliseconds.
    pub timestamp: u64,
}
