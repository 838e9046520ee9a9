use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use nanorpc::{JrpcId, JrpcRequest, JrpcResponse, RpcTransport};
use serde_json::Value;
use url::Url;

use crate::error::ChainError;

/// Carries one JSON-RPC call to a full node.
#[async_trait]
pub trait ChainTransport: Send + Sync + 'static {
    async fn call(&self, method: &str, params: Value) -> Result<Value, ChainError>;
}

#[async_trait]
impl<T> ChainTransport for T
where
    T: RpcTransport<Error = ChainError> + Send + Sync + 'static,
{
    async fn call(&self, method: &str, params: Value) -> Result<Value, ChainError> {
        let params = match params {
            Value::Array(items) => items,
            Value::Null => Vec::new(),
            other => vec![other],
        };
        let req = JrpcRequest {
            jsonrpc: "2.0".into(),
            method: method.into(),
            params,
            id: JrpcId::Number(0),
        };
        let resp = self.call_raw(req).await?;
        if let Some(err) = resp.error {
            return Err(ChainError::Rpc {
                code: err.code,
                message: err.message,
            });
        }
        resp.result
            .ok_or_else(|| ChainError::Decode(format!("{method} returned neither result nor error")))
    }
}

/// JSON-RPC 2.0 over HTTP POST.
#[derive(Debug)]
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: Url,
    next_id: AtomicI64,
}

impl HttpTransport {
    pub fn new(client: reqwest::Client, endpoint: Url) -> Self {
        Self {
            client,
            endpoint,
            next_id: AtomicI64::new(1),
        }
    }
}

#[async_trait]
impl RpcTransport for HttpTransport {
    type Error = ChainError;

    async fn call_raw(&self, mut req: JrpcRequest) -> Result<JrpcResponse, Self::Error> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        req.id = JrpcId::Number(id);
        tracing::debug!(method = %req.method, id, "full node call");
        let resp = self
            .client
            .post(self.endpoint.clone())
            .json(&req)
            .send()
            .await?
            .error_for_status()?;
        let mut body: Value = resp.json().await?;
        // full nodes leave out `data` on most errors
        if let Some(Value::Object(err)) = body.get_mut("error") {
            err.entry("data").or_insert(Value::Null);
        }
        Ok(serde_json::from_value(body)?)
    }
}
