mod config;
mod server;
mod state;

use std::{path::Path, sync::Arc};

use anyhow::Context;
use axum::{
    Router, middleware,
    routing::{get, post},
};
use clap::Parser;
use qedi_client::TransactionSigner;
use qedi_crypt::signing::SigningSecret;
use rand::RngCore;
use std::os::unix::fs::PermissionsExt;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use crate::{
    config::{Args, Config},
    state::RelayState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("qedi_relay=debug"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = Args::parse();
    let config = Config::load(&args.config)?;
    let system_key = load_secret_key(&config.system_key)?;
    let state = RelayState::new(&config, system_key)?;
    tracing::info!(
        network = %state.network,
        package = %state.contract.package_id.abbreviated(),
        registry = %state.contract.registry_id.abbreviated(),
        system_sender = %state.system_signer.address(),
        "starting relay"
    );

    let listener = TcpListener::bind(config.listen).await?;
    tracing::info!(listen = %config.listen, "relay listening");
    axum::serve(listener, app(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;
    Ok(())
}

pub fn app(state: Arc<RelayState>) -> Router {
    Router::new()
        .route("/health", get(server::health))
        .route("/api/create-profile", post(server::create_profile))
        .route("/api/add-link", post(server::add_link))
        .route("/api/add-links", post(server::add_links))
        .route("/api/update-profile", post(server::update_profile))
        .route("/api/execute-transaction", post(server::execute_transaction))
        .route("/api/track-click", post(server::track_click))
        .layer(middleware::from_fn_with_state(state.clone(), server::cors))
        .layer(middleware::from_fn(server::log_requests))
        .with_state(state)
}

fn load_secret_key(path: &Path) -> anyhow::Result<SigningSecret> {
    if !path.exists() {
        let mut bytes = [0u8; 32];
        rand::rng().fill_bytes(&mut bytes);
        std::fs::write(path, bytes)
            .with_context(|| format!("write system key {}", path.display()))?;
        let perms = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(path, perms)
            .with_context(|| format!("chmod system key {}", path.display()))?;
        tracing::info!(path = %path.display(), "generated system key");
    }
    let data = std::fs::read(path).with_context(|| format!("read system key {}", path.display()))?;
    let bytes: [u8; 32] = data
        .try_into()
        .map_err(|_| anyhow::anyhow!("system key must be exactly 32 raw bytes"))?;
    Ok(SigningSecret::from_bytes(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_key_is_generated_once_and_reused() {
        let path = std::env::temp_dir().join(format!("qedi-relay-key-{}", std::process::id()));
        let _ = std::fs::remove_file(&path);
        let first = load_secret_key(&path).unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);
        let second = load_secret_key(&path).unwrap();
        assert_eq!(first.public_key(), second.public_key());
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn short_key_files_are_rejected() {
        let path = std::env::temp_dir().join(format!("qedi-relay-short-{}", std::process::id()));
        std::fs::write(&path, [1u8; 16]).unwrap();
        assert!(load_secret_key(&path).is_err());
        std::fs::remove_file(&path).unwrap();
    }
}
