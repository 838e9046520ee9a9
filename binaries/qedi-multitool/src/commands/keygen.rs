use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use qedi_crypt::signing::{SigningPublic, SigningSecret};
use qedi_structs::SuiAddress;
use serde::Serialize;

use crate::shared::{KeyFile, print_json};

#[derive(Parser)]
pub struct Args {
    /// Also write the key to this file for use with `--key-file`.
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Serialize)]
struct Output {
    address: SuiAddress,
    public: SigningPublic,
    secret: SigningSecret,
}

pub async fn run(args: Args) -> anyhow::Result<()> {
    let secret = SigningSecret::random();
    let public = secret.public_key();
    let address = SuiAddress::from_public_key(&public);
    if let Some(path) = &args.out {
        let file = KeyFile {
            address,
            secret: secret.clone(),
        };
        std::fs::write(path, serde_json::to_string_pretty(&file)?)
            .with_context(|| format!("failed to write key file {}", path.display()))?;
        tracing::info!(path = %path.display(), %address, "wrote key file");
    }
    print_json(&Output {
        address,
        public,
        secret,
    })
}
