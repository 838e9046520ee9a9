use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::{
    Json,
    extract::{Request, State},
    http::{HeaderMap, HeaderValue, Method, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use qedi_client::TransactionSigner;
use qedi_crypt::signing::UserSignature;
use qedi_structs::QediError;
use qedi_structs::relay::{
    AddLinkRequest, AddLinksRequest, CreateProfileRequest, ErrorResponse, ExecuteRequest,
    ExecuteResponse, HealthResponse, TrackClickRequest, UpdateProfileRequest, required,
};
use qedi_structs::transaction::SponsoredTransaction;
use serde::de::DeserializeOwned;

use crate::state::RelayState;

/// A failure on its way to the caller: local validation is the caller's
/// fault (400), everything else is ours or upstream's (500).
pub struct ApiError(QediError);

impl From<QediError> for ApiError {
    fn from(err: QediError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0 {
            QediError::Validation(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!(kind = self.0.kind(), error = %self.0, "request failed");
        } else {
            tracing::debug!(error = %self.0, "rejected request");
        }
        (status, Json(ErrorResponse::from(&self.0))).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

fn parse_body<T: DeserializeOwned>(body: &Bytes) -> Result<T, ApiError> {
    serde_json::from_slice(body)
        .map_err(|err| ApiError(QediError::validation(format!("malformed request body: {err}"))))
}

pub async fn create_profile(
    State(state): State<Arc<RelayState>>,
    body: Bytes,
) -> ApiResult<SponsoredTransaction> {
    let req: CreateProfileRequest = parse_body(&body)?;
    let sender = required(req.sender, "sender")?;
    let username = required(req.username.clone(), "username")?;
    let tx = state.builder.create_profile(&username, &req.details()?)?;
    tracing::info!(sender = %sender.abbreviated(), %username, "sponsoring profile creation");
    let sponsored = state.relay.sponsor(sender, &tx).await?;
    Ok(Json(sponsored.into_transaction()))
}

pub async fn add_link(
    State(state): State<Arc<RelayState>>,
    body: Bytes,
) -> ApiResult<SponsoredTransaction> {
    let req: AddLinkRequest = parse_body(&body)?;
    let sender = required(req.sender, "sender")?;
    let profile_id = required(req.profile_id, "profileId")?;
    let tx = state.builder.add_link(profile_id, &req.link()?)?;
    tracing::info!(sender = %sender.abbreviated(), profile = %profile_id.abbreviated(), "sponsoring link");
    let sponsored = state.relay.sponsor(sender, &tx).await?;
    Ok(Json(sponsored.into_transaction()))
}

pub async fn add_links(
    State(state): State<Arc<RelayState>>,
    body: Bytes,
) -> ApiResult<SponsoredTransaction> {
    let req: AddLinksRequest = parse_body(&body)?;
    let sender = required(req.sender, "sender")?;
    let profile_id = required(req.profile_id, "profileId")?;
    let links = required(req.links, "links")?
        .into_iter()
        .map(|link| link.into_link())
        .collect::<Result<Vec<_>, _>>()?;
    let tx = state.builder.add_links(profile_id, &links)?;
    tracing::info!(
        sender = %sender.abbreviated(),
        profile = %profile_id.abbreviated(),
        count = links.len(),
        "sponsoring links"
    );
    let sponsored = state.relay.sponsor(sender, &tx).await?;
    Ok(Json(sponsored.into_transaction()))
}

pub async fn update_profile(
    State(state): State<Arc<RelayState>>,
    body: Bytes,
) -> ApiResult<SponsoredTransaction> {
    let req: UpdateProfileRequest = parse_body(&body)?;
    let sender = required(req.sender, "sender")?;
    let profile_id = required(req.profile_id, "profileId")?;
    let tx = state.builder.update_profile(profile_id, &req.details()?)?;
    tracing::info!(sender = %sender.abbreviated(), profile = %profile_id.abbreviated(), "sponsoring profile update");
    let sponsored = state.relay.sponsor(sender, &tx).await?;
    Ok(Json(sponsored.into_transaction()))
}

pub async fn execute_transaction(
    State(state): State<Arc<RelayState>>,
    body: Bytes,
) -> ApiResult<ExecuteResponse> {
    let req: ExecuteRequest = parse_body(&body)?;
    let digest = required(req.digest, "digest")?;
    let signature: UserSignature = required(req.signature, "signature")?
        .parse()
        .map_err(|_| QediError::validation("signature is not valid base64"))?;
    tracing::info!(%digest, "executing sponsored transaction");
    let result = state.relay.execute(digest, signature).await?;
    Ok(Json(ExecuteResponse { result }))
}

/// Clicks come from anonymous visitors, so the relay is the sender and runs
/// all three steps itself.
pub async fn track_click(
    State(state): State<Arc<RelayState>>,
    body: Bytes,
) -> ApiResult<ExecuteResponse> {
    let req: TrackClickRequest = parse_body(&body)?;
    let profile_id = required(req.profile_id, "profileId")?;
    let link_index = required(req.link_index, "linkIndex")?;
    let tx = state.builder.record_click(profile_id, link_index)?;
    tracing::info!(
        profile = %profile_id.abbreviated(),
        link_index,
        sender = %state.system_signer.address().abbreviated(),
        "tracking click"
    );
    let result = state.relay.run(&state.system_signer, &tx).await?;
    Ok(Json(ExecuteResponse { result }))
}

pub async fn health(State(state): State<Arc<RelayState>>) -> Json<HealthResponse> {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64;
    Json(HealthResponse {
        status: "OK".into(),
        message: "QEDI relay is running".into(),
        network: state.network.to_string(),
        package_id: state.contract.package_id,
        registry_id: state.contract.registry_id,
        timestamp,
    })
}

pub async fn log_requests(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let resp = next.run(req).await;
    tracing::info!(%method, %path, status = resp.status().as_u16(), "request");
    resp
}

fn allow_origin(state: &RelayState, headers: &HeaderMap) -> Option<HeaderValue> {
    if state.allowed_origins.is_empty() {
        return Some(HeaderValue::from_static("*"));
    }
    let origin = headers.get(header::ORIGIN)?;
    let allowed = state
        .allowed_origins
        .iter()
        .any(|o| origin.to_str().is_ok_and(|origin| origin == o));
    allowed.then(|| origin.clone())
}

/// Answers preflights and stamps CORS headers on every response.
pub async fn cors(State(state): State<Arc<RelayState>>, req: Request, next: Next) -> Response {
    let origin = allow_origin(&state, req.headers());
    let mut resp = if req.method() == Method::OPTIONS {
        StatusCode::OK.into_response()
    } else {
        next.run(req).await
    };
    let headers = resp.headers_mut();
    if let Some(origin) = origin {
        headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin);
    }
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type"),
    );
    resp
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use httpmock::{Method::POST, MockServer};
    use qedi_crypt::hash::Digest;
    use qedi_crypt::signing::SigningSecret;
    use qedi_structs::ObjectId;
    use serde_json::{Value, json};
    use tokio::net::TcpListener;

    use super::*;
    use crate::config::{Config, SponsorSection};

    fn config(sponsor: &MockServer, node: &MockServer) -> Config {
        Config {
            listen: "127.0.0.1:0".parse().unwrap(),
            network: qedi_structs::network::Network::Testnet,
            rpc_url: Some(node.url("/").parse().unwrap()),
            package_id: ObjectId::from_low_byte(0xaa),
            registry_id: ObjectId::from_low_byte(0xbb),
            click_entry: Default::default(),
            sponsor: SponsorSection {
                url: sponsor.base_url().parse().unwrap(),
                sponsor_path: "/v1/transaction-blocks/sponsor".into(),
                execute_path: "/v1/transaction-blocks/sponsor/{digest}".into(),
                api_key: Some("enoki_private_test".into()),
            },
            system_key: PathBuf::from("unused"),
            allowed_origins: vec![],
        }
    }

    async fn spawn(sponsor: &MockServer, node: &MockServer) -> String {
        let state = RelayState::new(&config(sponsor, node), SigningSecret::from_bytes([1; 32])).unwrap();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, crate::app(state)).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn rpc_ok(result: Value) -> Value {
        json!({"jsonrpc": "2.0", "id": 1, "result": result})
    }

    async fn mock_object(node: &MockServer, owner: Value) {
        node.mock_async(|when, then| {
            when.method(POST).body_contains("sui_getObject");
            then.status(200).json_body(rpc_ok(json!({"data": {
                "objectId": "0xbb", "version": "5", "digest": Digest::from_bytes([3; 32]).to_string(),
                "owner": owner,
            }})));
        })
        .await;
    }

    async fn post(base: &str, path: &str, body: Value) -> (u16, Value) {
        let resp = reqwest::Client::new()
            .post(format!("{base}{path}"))
            .json(&body)
            .send()
            .await
            .unwrap();
        let status = resp.status().as_u16();
        (status, resp.json().await.unwrap_or(Value::Null))
    }

    #[tokio::test]
    async fn health_echoes_configuration() {
        let (sponsor, node) = (MockServer::start_async().await, MockServer::start_async().await);
        let base = spawn(&sponsor, &node).await;
        let body: Value = reqwest::get(format!("{base}/health")).await.unwrap().json().await.unwrap();
        assert_eq!(body["status"], "OK");
        assert_eq!(body["network"], "testnet");
        assert_eq!(body["packageId"], ObjectId::from_low_byte(0xaa).to_string());
        assert_eq!(body["registryId"], ObjectId::from_low_byte(0xbb).to_string());
        assert!(body["timestamp"].as_u64().unwrap() > 0);
    }

    #[tokio::test]
    async fn preflight_is_answered() {
        let (sponsor, node) = (MockServer::start_async().await, MockServer::start_async().await);
        let base = spawn(&sponsor, &node).await;
        let resp = reqwest::Client::new()
            .request(reqwest::Method::OPTIONS, format!("{base}/api/create-profile"))
            .header("Origin", "http://localhost:5173")
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status().as_u16(), 200);
        assert_eq!(resp.headers()["access-control-allow-origin"], "*");
        assert_eq!(resp.headers()["access-control-allow-methods"], "GET, POST, OPTIONS");
    }

    #[tokio::test]
    async fn bad_input_is_a_400() {
        let (sponsor, node) = (MockServer::start_async().await, MockServer::start_async().await);
        let base = spawn(&sponsor, &node).await;

        let (status, body) = post(&base, "/api/create-profile", json!({"sender": "0x1", "displayName": "A"})).await;
        assert_eq!(status, 400);
        assert_eq!(body["error"], "validation_error");
        assert!(body["details"].as_str().unwrap().contains("username"));

        let (status, _) = post(
            &base,
            "/api/create-profile",
            json!({"sender": "0x1", "username": "ab", "displayName": "X"}),
        )
        .await;
        assert_eq!(status, 400);

        let resp = reqwest::Client::new()
            .post(format!("{base}/api/add-link"))
            .header("content-type", "application/json")
            .body("{not json")
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status().as_u16(), 400);

        let (status, _) = post(&base, "/api/track-click", json!({"profileId": "0x5"})).await;
        assert_eq!(status, 400);
    }

    #[tokio::test]
    async fn create_profile_returns_sponsored_bytes() {
        let (sponsor, node) = (MockServer::start_async().await, MockServer::start_async().await);
        mock_object(&node, json!({"Shared": {"initial_shared_version": 4}})).await;
        let digest = Digest::from_bytes([8; 32]);
        sponsor
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1/transaction-blocks/sponsor")
                    .body_contains("create_profile");
                then.status(200).json_body(json!({"data": {"digest": digest.to_string(), "bytes": "AAECAw=="}}));
            })
            .await;
        let base = spawn(&sponsor, &node).await;
        let (status, body) = post(
            &base,
            "/api/create-profile",
            json!({"sender": "0x1", "username": "alice", "displayName": "Alice", "bio": "hi"}),
        )
        .await;
        assert_eq!(status, 200);
        assert_eq!(body["digest"], digest.to_string());
        assert!(!body["bytes"].as_str().unwrap().is_empty());
    }

    #[tokio::test]
    async fn sponsor_rejection_is_a_500() {
        let (sponsor, node) = (MockServer::start_async().await, MockServer::start_async().await);
        mock_object(&node, json!({"AddressOwner": "0x1"})).await;
        sponsor
            .mock_async(|when, then| {
                when.method(POST).path("/v1/transaction-blocks/sponsor");
                then.status(400).body("move call target not allowed");
            })
            .await;
        let base = spawn(&sponsor, &node).await;
        let (status, body) = post(
            &base,
            "/api/add-link",
            json!({"sender": "0x1", "profileId": "0xbb", "title": "gh", "url": "github.com", "icon": "github"}),
        )
        .await;
        assert_eq!(status, 500);
        assert_eq!(body["error"], "sponsor_error");
        assert!(body["details"].as_str().unwrap().contains("not allowed"));
    }

    #[tokio::test]
    async fn empty_signature_never_reaches_the_sponsor() {
        let (sponsor, node) = (MockServer::start_async().await, MockServer::start_async().await);
        let execute = sponsor
            .mock_async(|when, then| {
                when.method(POST);
                then.status(200);
            })
            .await;
        let base = spawn(&sponsor, &node).await;
        let digest = Digest::from_bytes([8; 32]).to_string();

        let (status, body) = post(&base, "/api/execute-transaction", json!({"digest": digest, "signature": ""})).await;
        assert_eq!(status, 500);
        assert_eq!(body["error"], "signing_error");

        let (status, _) = post(
            &base,
            "/api/execute-transaction",
            json!({"digest": digest, "signature": "%%%"}),
        )
        .await;
        assert_eq!(status, 400);
        assert_eq!(execute.hits_async().await, 0);
    }

    #[tokio::test]
    async fn track_click_runs_the_whole_flow() {
        let (sponsor, node) = (MockServer::start_async().await, MockServer::start_async().await);
        mock_object(&node, json!({"Shared": {"initial_shared_version": 4}})).await;
        let digest = Digest::from_bytes([9; 32]);
        let system = qedi_structs::SuiAddress::from_public_key(&SigningSecret::from_bytes([1; 32]).public_key());
        sponsor
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1/transaction-blocks/sponsor")
                    .body_contains("click_link")
                    .body_contains(system.to_string());
                then.status(200).json_body(json!({"data": {"digest": digest.to_string(), "bytes": "AAECAw=="}}));
            })
            .await;
        let execute = sponsor
            .mock_async(|when, then| {
                when.method(POST).path(format!("/v1/transaction-blocks/sponsor/{digest}"));
                then.status(200).json_body(json!({"data": {"digest": digest.to_string()}}));
            })
            .await;
        node.mock_async(|when, then| {
            when.method(POST).body_contains("sui_getTransactionBlock");
            then.status(200).json_body(rpc_ok(json!({
                "digest": digest.to_string(),
                "effects": {"status": {"status": "success"}},
            })));
        })
        .await;
        let base = spawn(&sponsor, &node).await;
        let (status, body) = post(&base, "/api/track-click", json!({"profileId": "0xbb", "linkIndex": 0})).await;
        assert_eq!(status, 200);
        assert_eq!(body["result"]["digest"], digest.to_string());
        assert_eq!(execute.hits_async().await, 1);
    }
}
