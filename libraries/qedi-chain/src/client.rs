use std::sync::Arc;

use qedi_crypt::encode_base64;
use qedi_crypt::hash::Digest;
use qedi_crypt::signing::UserSignature;
use qedi_structs::transaction::{ExecutedTransaction, ExecutionStatus};
use qedi_structs::{ObjectId, SuiAddress};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use url::Url;

use crate::error::ChainError;
use crate::transport::{ChainTransport, HttpTransport};
use crate::types::{Coin, ObjectData, ObjectResponse, Page, TransactionBlockResponse};

const PAGE_LIMIT: u32 = 50;

fn object_options() -> Value {
    json!({"showType": true, "showOwner": true, "showContent": true})
}

/// One-shot requests against a full node. Nothing here retries.
#[derive(Clone)]
pub struct ChainClient {
    transport: Arc<dyn ChainTransport>,
}

impl ChainClient {
    pub fn new(transport: impl ChainTransport) -> Self {
        Self {
            transport: Arc::new(transport),
        }
    }

    pub fn http(endpoint: Url) -> Self {
        Self::new(HttpTransport::new(reqwest::Client::new(), endpoint))
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, ChainError> {
        let value = self.transport.call(method, params).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Fetch an object with its type, owner and content; `None` if it does not exist.
    pub async fn get_object(&self, id: ObjectId) -> Result<Option<ObjectData>, ChainError> {
        let resp: ObjectResponse = self
            .call("sui_getObject", json!([id, object_options()]))
            .await?;
        if resp.data.is_none() {
            tracing::debug!(object = %id.abbreviated(), error = ?resp.error, "object not readable");
        }
        Ok(resp.data)
    }

    /// Every object of `struct_type` owned by `owner`, across all pages.
    pub async fn get_owned_objects(
        &self,
        owner: SuiAddress,
        struct_type: &str,
    ) -> Result<Vec<ObjectData>, ChainError> {
        let query = json!({
            "filter": {"StructType": struct_type},
            "options": object_options(),
        });
        let mut out = Vec::new();
        let mut cursor = Value::Null;
        loop {
            let page: Page<ObjectResponse> = self
                .call(
                    "suix_getOwnedObjects",
                    json!([owner, query, cursor, PAGE_LIMIT]),
                )
                .await?;
            out.extend(page.data.into_iter().filter_map(|resp| resp.data));
            match page.next_cursor {
                Some(next) if page.has_next_page && !next.is_null() => cursor = next,
                _ => break,
            }
        }
        tracing::debug!(owner = %owner.abbreviated(), count = out.len(), "listed owned objects");
        Ok(out)
    }

    /// Read the dynamic field `name` of `parent`; `None` if the key is absent.
    pub async fn get_dynamic_field_object(
        &self,
        parent: ObjectId,
        name_type: &str,
        name_value: Value,
    ) -> Result<Option<ObjectData>, ChainError> {
        let resp: ObjectResponse = self
            .call(
                "suix_getDynamicFieldObject",
                json!([parent, {"type": name_type, "value": name_value}]),
            )
            .await?;
        Ok(resp.data)
    }

    pub async fn reference_gas_price(&self) -> Result<u64, ChainError> {
        let value: Value = self.call("suix_getReferenceGasPrice", json!([])).await?;
        match &value {
            Value::String(s) => s.parse().map_err(|_| ChainError::Decode(format!("gas price {s:?}"))),
            Value::Number(n) => n
                .as_u64()
                .ok_or_else(|| ChainError::Decode(format!("gas price {n}"))),
            other => Err(ChainError::Decode(format!("gas price {other}"))),
        }
    }

    /// All coins of `coin_type` (SUI when `None`) owned by `owner`.
    pub async fn get_coins(
        &self,
        owner: SuiAddress,
        coin_type: Option<&str>,
    ) -> Result<Vec<Coin>, ChainError> {
        let mut out = Vec::new();
        let mut cursor = Value::Null;
        loop {
            let page: Page<Coin> = self
                .call("suix_getCoins", json!([owner, coin_type, cursor, PAGE_LIMIT]))
                .await?;
            out.extend(page.data);
            match page.next_cursor {
                Some(next) if page.has_next_page && !next.is_null() => cursor = next,
                _ => break,
            }
        }
        Ok(out)
    }

    /// Submit signed transaction bytes and wait for certified effects. A
    /// rejection, either at submission or in the effects, is
    /// [`ChainError::Rejected`].
    pub async fn execute_transaction_block(
        &self,
        tx_bytes: &[u8],
        signatures: &[UserSignature],
    ) -> Result<ExecutedTransaction, ChainError> {
        let signatures: Vec<String> = signatures.iter().map(UserSignature::to_base64).collect();
        let params = json!([
            encode_base64(tx_bytes),
            signatures,
            {"showEffects": true},
            "WaitForEffectsCert",
        ]);
        let resp: TransactionBlockResponse =
            match self.call("sui_executeTransactionBlock", params).await {
                Ok(resp) => resp,
                Err(ChainError::Rpc { message, .. }) => return Err(ChainError::Rejected(message)),
                Err(err) => return Err(err),
            };
        into_executed(resp)
    }

    /// Read a transaction's effects after the fact.
    pub async fn transaction_block(&self, digest: Digest) -> Result<ExecutedTransaction, ChainError> {
        let resp: TransactionBlockResponse = self
            .call("sui_getTransactionBlock", json!([digest, {"showEffects": true}]))
            .await?;
        into_executed(resp)
    }
}

fn into_executed(resp: TransactionBlockResponse) -> Result<ExecutedTransaction, ChainError> {
    let status = resp.status();
    if let Some(ExecutionStatus::Failure { error }) = &status {
        tracing::warn!(digest = %resp.digest, error = %error, "transaction failed on-chain");
        return Err(ChainError::Rejected(error.clone()));
    }
    Ok(ExecutedTransaction {
        digest: resp.digest,
        status,
        effects: resp.effects,
    })
}
