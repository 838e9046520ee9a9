//! Client side of QEDI: builds profile transactions, decides who signs and
//! who pays, and reads profiles back.

mod builder;
mod client;
pub mod config;
mod direct;
mod identity;
mod login;
pub mod reader;
mod relay;
mod signer;
pub mod sponsor;

pub use builder::{Action, MIST_PER_SUI, PreparedTransaction, TransactionBuilder, parse_sui_amount};
pub use client::{AddLinksError, QediClient, submit_sequentially};
pub use config::Config;
pub use direct::DirectSubmitter;
pub use identity::{
    Identity, IdentityResolver, MemorySessionStore, SessionListener, SessionStore, Signer,
    SqliteSessionStore,
};
pub use login::{CompletedLogin, EnokiIdentityProvider, IdentityProvider, PendingLogin};
pub use reader::ProfileReader;
pub use relay::{Signed, Sponsored, SponsorshipRelay};
pub use signer::{KeypairSigner, TransactionSigner, ZkLoginSigner};
pub use sponsor::{EnokiSponsor, RelayHttpSponsor, SponsorService};
