use async_trait::async_trait;
use qedi_crypt::signing::{SigningSecret, UserSignature, ZKLOGIN_FLAG};
use qedi_structs::session::{ZkLoginCredential, ZkLoginInputs};
use qedi_structs::{QediError, SuiAddress};
use serde::Serialize;

/// Something that can sign transaction bytes for one address. Wallet
/// adapters implement this; signing may prompt the user and fail.
#[async_trait]
pub trait TransactionSigner: Send + Sync + 'static {
    fn address(&self) -> SuiAddress;

    async fn sign_transaction(&self, tx_bytes: &[u8]) -> Result<UserSignature, QediError>;
}

/// Signs with an Ed25519 key held in memory.
#[derive(Clone, Debug)]
pub struct KeypairSigner {
    secret: SigningSecret,
}

impl KeypairSigner {
    pub fn new(secret: SigningSecret) -> Self {
        Self { secret }
    }
}

#[async_trait]
impl TransactionSigner for KeypairSigner {
    fn address(&self) -> SuiAddress {
        SuiAddress::from_public_key(&self.secret.public_key())
    }

    async fn sign_transaction(&self, tx_bytes: &[u8]) -> Result<UserSignature, QediError> {
        Ok(self.secret.sign_transaction(tx_bytes))
    }
}

#[derive(Serialize)]
struct ZkLoginAuthenticator<'a> {
    inputs: &'a ZkLoginInputs,
    max_epoch: u64,
    user_signature: Vec<u8>,
}

/// Signs for a social-login address: the ephemeral key signs, and the proof
/// ties that key to the address until `max_epoch`.
#[derive(Clone, Debug)]
pub struct ZkLoginSigner {
    address: SuiAddress,
    credential: ZkLoginCredential,
}

impl ZkLoginSigner {
    pub fn new(address: SuiAddress, credential: ZkLoginCredential) -> Self {
        Self {
            address,
            credential,
        }
    }
}

#[async_trait]
impl TransactionSigner for ZkLoginSigner {
    fn address(&self) -> SuiAddress {
        self.address
    }

    async fn sign_transaction(&self, tx_bytes: &[u8]) -> Result<UserSignature, QediError> {
        let ephemeral = self.credential.ephemeral_secret.sign_transaction(tx_bytes);
        let authenticator = ZkLoginAuthenticator {
            inputs: &self.credential.inputs,
            max_epoch: self.credential.max_epoch,
            user_signature: ephemeral.as_bytes().to_vec(),
        };
        let body = bcs::to_bytes(&authenticator)
            .map_err(|err| QediError::signing("cannot encode zkLogin authenticator", err))?;
        let mut bytes = Vec::with_capacity(1 + body.len());
        bytes.push(ZKLOGIN_FLAG);
        bytes.extend_from_slice(&body);
        Ok(UserSignature::from_bytes(bytes))
    }
}
