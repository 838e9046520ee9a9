use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::address::{ObjectId, SuiAddress};
use crate::error::QediError;
use crate::username::Username;

/// Largest avatar payload the profile object can hold once encoded.
pub const AVATAR_MAX_BYTES: usize = 16 * 1024;

pub const DEFAULT_THEME: &str = "default";

/// The fixed icon vocabulary a link can carry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkIcon {
    #[default]
    Link,
    Twitter,
    Instagram,
    Youtube,
    Github,
    Linkedin,
    Website,
    Email,
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("unknown link icon {0:?}")]
pub struct LinkIconError(pub String);

impl LinkIcon {
    pub const ALL: [LinkIcon; 8] = [
        LinkIcon::Link,
        LinkIcon::Twitter,
        LinkIcon::Instagram,
        LinkIcon::Youtube,
        LinkIcon::Github,
        LinkIcon::Linkedin,
        LinkIcon::Website,
        LinkIcon::Email,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LinkIcon::Link => "link",
            LinkIcon::Twitter => "twitter",
            LinkIcon::Instagram => "instagram",
            LinkIcon::Youtube => "youtube",
            LinkIcon::Github => "github",
            LinkIcon::Linkedin => "linkedin",
            LinkIcon::Website => "website",
            LinkIcon::Email => "email",
        }
    }

    /// Icons read back from the chain are not trusted to be in the vocabulary.
    pub fn parse_lenient(raw: &str) -> Self {
        raw.trim().to_ascii_lowercase().parse().unwrap_or_default()
    }
}

impl fmt::Display for LinkIcon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LinkIcon {
    type Err = LinkIconError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LinkIcon::ALL
            .into_iter()
            .find(|icon| icon.as_str() == s)
            .ok_or_else(|| LinkIconError(s.to_string()))
    }
}

/// The editable text fields of a profile.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileDetails {
    pub display_name: String,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub avatar_url: String,
    #[serde(default = "default_theme")]
    pub theme: String,
}

fn default_theme() -> String {
    DEFAULT_THEME.to_string()
}

impl ProfileDetails {
    pub fn new(display_name: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            bio: String::new(),
            avatar_url: String::new(),
            theme: default_theme(),
        }
    }

    pub fn validate(&self) -> Result<(), QediError> {
        if self.display_name.trim().is_empty() {
            return Err(QediError::validation("display name must not be empty"));
        }
        if self.avatar_url.len() > AVATAR_MAX_BYTES {
            return Err(QediError::validation(format!(
                "avatar is {} bytes, at most {AVATAR_MAX_BYTES} fit on-chain",
                self.avatar_url.len()
            )));
        }
        Ok(())
    }
}

/// A link as submitted by its owner.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewLink {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub icon: LinkIcon,
}

impl NewLink {
    pub fn new(title: impl Into<String>, url: impl Into<String>, icon: LinkIcon) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            icon,
        }
    }

    pub fn validate(&self) -> Result<(), QediError> {
        if self.title.trim().is_empty() {
            return Err(QediError::validation("link title must not be empty"));
        }
        if self.url.trim().is_empty() {
            return Err(QediError::validation("link url must not be empty"));
        }
        Ok(())
    }
}

/// A link as stored in a profile.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Link {
    pub title: String,
    pub url: String,
    pub icon: LinkIcon,
    pub click_count: u64,
}

impl Link {
    /// The url with `https://` prepended when it carries no scheme.
    pub fn href(&self) -> String {
        normalize_url(&self.url)
    }
}

pub fn normalize_url(url: &str) -> String {
    let url = url.trim();
    if url.contains("://") || url.starts_with("mailto:") {
        url.to_string()
    } else {
        format!("https://{url}")
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: ObjectId,
    pub owner: Option<SuiAddress>,
    pub username: Username,
    pub display_name: String,
    pub bio: String,
    pub avatar_url: String,
    pub theme: String,
    pub links: Vec<Link>,
    pub total_clicks: u64,
    pub created_at: u64,
    pub updated_at: u64,
}
