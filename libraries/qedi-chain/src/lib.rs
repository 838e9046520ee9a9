//! Read and write access to a Sui full node over JSON-RPC.

mod client;
mod error;
mod resolve;
mod transport;
pub mod types;

pub use client::ChainClient;
pub use error::ChainError;
pub use transport::{ChainTransport, HttpTransport};
