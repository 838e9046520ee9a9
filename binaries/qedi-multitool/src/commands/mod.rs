pub mod donate;
pub mod keygen;
pub mod profile;

use clap::Subcommand;

use crate::shared::GlobalArgs;

#[derive(Subcommand)]
pub enum Command {
    /// Generate an Ed25519 key and its address.
    Keygen(keygen::Args),
    /// Read and write LinkTree profiles.
    Profile(Box<profile::Args>),
    /// Send SUI from the key file's address.
    Donate(donate::Args),
}

impl Command {
    pub async fn run(self, global: &GlobalArgs) -> anyhow::Result<()> {
        match self {
            Command::Keygen(args) => keygen::run(args).await,
            Command::Profile(args) => profile::run(*args, global).await,
            Command::Donate(args) => donate::run(args, global).await,
        }
    }
}
