use qedi_structs::{ObjectId, QediError, SuiAddress};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChainError {
    #[error("full node unreachable: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },
    #[error("unexpected response: {0}")]
    Decode(String),
    #[error("object {0} not found")]
    ObjectNotFound(ObjectId),
    #[error("no gas coins owned by {0}")]
    NoGas(SuiAddress),
    #[error("bcs encoding failed: {0}")]
    Bcs(#[from] bcs::Error),
    /// The ledger accepted the request but refused the transaction.
    #[error("{0}")]
    Rejected(String),
}

impl From<serde_json::Error> for ChainError {
    fn from(err: serde_json::Error) -> Self {
        ChainError::Decode(err.to_string())
    }
}

impl From<ChainError> for QediError {
    fn from(err: ChainError) -> Self {
        match err {
            ChainError::Rejected(message) => QediError::execution("ledger rejected transaction", message),
            other => QediError::chain("full node request failed", other),
        }
    }
}
