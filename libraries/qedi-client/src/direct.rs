use qedi_chain::{ChainClient, ChainError};
use qedi_structs::transaction::{ExecutedTransaction, TransactionData};
use qedi_structs::{ObjectRef, QediError};

use crate::builder::PreparedTransaction;
use crate::signer::TransactionSigner;

/// The ledger caps how many coins can pay for one transaction.
const MAX_GAS_COINS: usize = 256;

/// Submits transactions paid from the sender's own coins.
#[derive(Clone)]
pub struct DirectSubmitter {
    chain: ChainClient,
    gas_budget: u64,
}

impl DirectSubmitter {
    pub fn new(chain: ChainClient, gas_budget: u64) -> Self {
        Self { chain, gas_budget }
    }

    /// Resolve, attach gas, sign and execute in one go.
    pub async fn submit(
        &self,
        signer: &dyn TransactionSigner,
        tx: &PreparedTransaction,
    ) -> Result<ExecutedTransaction, QediError> {
        let sender = signer.address();
        let pt = self.chain.resolve(&tx.plan).await?;
        let price = self.chain.reference_gas_price().await?;
        let coins = self.chain.get_coins(sender, None).await?;
        let payment = select_gas(
            coins.iter().map(|c| (c.object_ref(), c.balance)).collect(),
            self.gas_budget,
        )
        .ok_or(ChainError::NoGas(sender))?;

        let data = TransactionData::programmable(sender, payment, pt, self.gas_budget, price);
        let bytes = data
            .to_bytes()
            .map_err(|err| QediError::chain("cannot encode transaction", err))?;
        let signature = signer.sign_transaction(&bytes).await?;
        if signature.is_empty() {
            return Err(QediError::signing("cannot submit transaction", "signature is empty"));
        }
        let executed = self.chain.execute_transaction_block(&bytes, &[signature]).await?;
        tracing::info!(action = tx.action.name(), digest = %executed.digest, "transaction executed");
        Ok(executed)
    }
}

/// Largest coins first until the budget is covered.
fn select_gas(mut coins: Vec<(ObjectRef, u64)>, budget: u64) -> Option<Vec<ObjectRef>> {
    coins.sort_by(|a, b| b.1.cmp(&a.1));
    let mut total: u64 = 0;
    let mut picked = Vec::new();
    for (coin, balance) in coins.into_iter().take(MAX_GAS_COINS) {
        picked.push(coin);
        total = total.saturating_add(balance);
        if total >= budget {
            return Some(picked);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use httpmock::{Method::POST, MockServer};
    use qedi_crypt::hash::Digest;
    use qedi_crypt::signing::SigningSecret;
    use qedi_structs::contract::ContractCoordinates;
    use qedi_structs::ObjectId;
    use serde_json::json;
    use url::Url;

    use super::*;
    use crate::builder::TransactionBuilder;
    use crate::signer::KeypairSigner;

    fn coin(byte: u8) -> ObjectRef {
        ObjectRef {
            object_id: ObjectId::from_low_byte(byte),
            version: 1,
            digest: Digest::from_bytes([byte; 32]),
        }
    }

    #[test]
    fn gas_selection_prefers_large_coins() {
        let picked = select_gas(vec![(coin(1), 10), (coin(2), 500), (coin(3), 100)], 550).unwrap();
        assert_eq!(picked, vec![coin(2), coin(3)]);
        assert!(select_gas(vec![(coin(1), 10)], 11).is_none());
        assert!(select_gas(vec![], 1).is_none());
    }

    fn rpc_ok(result: serde_json::Value) -> serde_json::Value {
        json!({"jsonrpc": "2.0", "id": 1, "result": result})
    }

    #[tokio::test]
    async fn out_of_range_click_fails_on_chain() {
        let node = MockServer::start_async().await;
        let digest = Digest::from_bytes([2; 32]);
        node.mock_async(|when, then| {
            when.method(POST).body_contains("sui_getObject");
            then.status(200).json_body(rpc_ok(json!({"data": {
                "objectId": "0x33", "version": "4", "digest": digest.to_string(),
                "owner": {"Shared": {"initial_shared_version": 3}},
            }})));
        })
        .await;
        node.mock_async(|when, then| {
            when.method(POST).body_contains("suix_getReferenceGasPrice");
            then.status(200).json_body(rpc_ok(json!("1000")));
        })
        .await;
        node.mock_async(|when, then| {
            when.method(POST).body_contains("suix_getCoins");
            then.status(200).json_body(rpc_ok(json!({
                "data": [{
                    "coinType": "0x2::sui::SUI", "coinObjectId": "0x44", "version": "9",
                    "digest": digest.to_string(), "balance": "2000000000",
                }],
                "nextCursor": null, "hasNextPage": false,
            })));
        })
        .await;
        let execute = node
            .mock_async(|when, then| {
                when.method(POST).body_contains("sui_executeTransactionBlock");
                then.status(200).json_body(rpc_ok(json!({
                    "digest": digest.to_string(),
                    "effects": {"status": {
                        "status": "failure",
                        "error": "MoveAbort(MoveLocation { function_name: Some(\"click_link\") }, 2)",
                    }},
                })));
            })
            .await;

        let builder = TransactionBuilder::new(ContractCoordinates::new(
            ObjectId::from_low_byte(0xaa),
            ObjectId::from_low_byte(0xbb),
        ));
        // The profile has three links; index 7 still builds.
        let tx = builder.record_click(ObjectId::from_low_byte(0x33), 7).unwrap();
        let submitter = DirectSubmitter::new(ChainClient::http(Url::parse(&node.url("/")).unwrap()), 10_000_000);
        let signer = KeypairSigner::new(SigningSecret::from_bytes([5; 32]));
        let err = submitter.submit(&signer, &tx).await.unwrap_err();
        assert!(matches!(err, QediError::Execution(_)));
        assert!(err.message().contains("MoveAbort"));
        assert_eq!(execute.hits_async().await, 1);
    }
}
