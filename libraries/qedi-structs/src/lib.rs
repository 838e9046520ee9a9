pub mod address;
pub mod contract;
pub mod error;
pub mod network;
pub mod profile;
pub mod relay;
pub mod session;
pub mod transaction;
pub mod username;

pub use address::{ObjectId, ObjectRef, SuiAddress};
pub use error::QediError;

#[allow(clippy::ptr_arg)]
fn debug_bytes_len(bytes: &Vec<u8>, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "[{} bytes]", bytes.len())
}
