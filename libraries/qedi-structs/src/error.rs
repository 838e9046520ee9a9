use std::fmt::Display;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Every failure an action can surface to its caller. None of these are
/// retried automatically; a retry is a fresh run of the whole action.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum QediError {
    /// Rejected locally before any network call.
    #[error("invalid input: {0}")]
    Validation(String),
    /// The social-login exchange failed.
    #[error("authentication failed: {0}")]
    Auth(String),
    /// The sponsorship service rejected the request or could not be reached.
    #[error("sponsorship failed: {0}")]
    Sponsor(String),
    /// The user declined to sign or the signer failed.
    #[error("signing failed: {0}")]
    Signing(String),
    /// The ledger rejected the transaction.
    #[error("transaction execution failed: {0}")]
    Execution(String),
    /// A direct read or write against the ledger RPC failed.
    #[error("chain request failed: {0}")]
    Chain(String),
    /// The requested profile does not exist.
    #[error("not found: {0}")]
    NotFound(String),
}

impl QediError {
    pub fn validation(message: impl Display) -> Self {
        Self::Validation(message.to_string())
    }

    pub fn auth(context: &str, err: impl Display) -> Self {
        Self::Auth(format!("{context}: {err}"))
    }

    pub fn sponsor(context: &str, err: impl Display) -> Self {
        Self::Sponsor(format!("{context}: {err}"))
    }

    pub fn signing(context: &str, err: impl Display) -> Self {
        Self::Signing(format!("{context}: {err}"))
    }

    pub fn execution(context: &str, err: impl Display) -> Self {
        Self::Execution(format!("{context}: {err}"))
    }

    pub fn chain(context: &str, err: impl Display) -> Self {
        Self::Chain(format!("{context}: {err}"))
    }

    /// Short machine-readable tag, used as the `error` field of relay responses.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::Auth(_) => "auth_error",
            Self::Sponsor(_) => "sponsor_error",
            Self::Signing(_) => "signing_error",
            Self::Execution(_) => "execution_error",
            Self::Chain(_) => "chain_error",
            Self::NotFound(_) => "not_found",
        }
    }

    /// The message without the category prefix.
    pub fn message(&self) -> &str {
        match self {
            Self::Validation(m)
            | Self::Auth(m)
            | Self::Sponsor(m)
            | Self::Signing(m)
            | Self::Execution(m)
            | Self::Chain(m)
            | Self::NotFound(m) => m,
        }
    }
}
