//! The three-step sponsored flow: sponsor, sign, execute. Each step consumes
//! the previous step's output, so the order cannot be broken. Nothing here
//! retries; a failed attempt starts over from a freshly built transaction.

use std::sync::Arc;

use qedi_crypt::hash::Digest;
use qedi_crypt::signing::UserSignature;
use qedi_structs::transaction::{ExecutedTransaction, SponsoredTransaction};
use qedi_structs::{QediError, SuiAddress};

use crate::builder::PreparedTransaction;
use crate::signer::TransactionSigner;
use crate::sponsor::SponsorService;

#[derive(Clone)]
pub struct SponsorshipRelay {
    service: Arc<dyn SponsorService>,
}

/// Step one done: sponsor-paid bytes waiting for the sender's signature.
#[derive(Debug)]
pub struct Sponsored {
    tx: SponsoredTransaction,
}

/// Step two done: a non-empty signature over the sponsored bytes.
#[derive(Debug)]
pub struct Signed {
    digest: Digest,
    signature: UserSignature,
}

impl SponsorshipRelay {
    pub fn new(service: Arc<dyn SponsorService>) -> Self {
        Self { service }
    }

    pub async fn sponsor(
        &self,
        sender: SuiAddress,
        tx: &PreparedTransaction,
    ) -> Result<Sponsored, QediError> {
        let sponsored = self.service.sponsor(sender, tx).await?;
        if sponsored.bytes.is_empty() {
            return Err(QediError::sponsor(
                "sponsor returned no transaction",
                format!("digest {}", sponsored.digest),
            ));
        }
        tracing::debug!(action = tx.action.name(), digest = %sponsored.digest, "sponsored");
        Ok(Sponsored { tx: sponsored })
    }

    /// Step three for a signature obtained elsewhere, as the relay's execute
    /// endpoint receives it.
    pub async fn execute(
        &self,
        digest: Digest,
        signature: UserSignature,
    ) -> Result<ExecutedTransaction, QediError> {
        let signed = Signed::new(digest, signature)?;
        self.execute_signed(signed).await
    }

    pub async fn execute_signed(&self, signed: Signed) -> Result<ExecutedTransaction, QediError> {
        let executed = self.service.execute(signed.digest, &signed.signature).await?;
        tracing::info!(digest = %executed.digest, "sponsored transaction executed");
        Ok(executed)
    }

    /// Run all three steps with `signer` as the sender.
    pub async fn run(
        &self,
        signer: &dyn TransactionSigner,
        tx: &PreparedTransaction,
    ) -> Result<ExecutedTransaction, QediError> {
        let sponsored = self.sponsor(signer.address(), tx).await?;
        let signed = sponsored.sign(signer).await?;
        self.execute_signed(signed).await
    }
}

impl Sponsored {
    pub fn transaction(&self) -> &SponsoredTransaction {
        &self.tx
    }

    pub fn into_transaction(self) -> SponsoredTransaction {
        self.tx
    }

    pub async fn sign(self, signer: &dyn TransactionSigner) -> Result<Signed, QediError> {
        let signature = signer.sign_transaction(&self.tx.bytes).await?;
        Signed::new(self.tx.digest, signature)
    }
}

impl Signed {
    pub fn new(digest: Digest, signature: UserSignature) -> Result<Self, QediError> {
        if signature.is_empty() {
            return Err(QediError::signing(
                "cannot execute sponsored transaction",
                "signature is empty",
            ));
        }
        Ok(Self { digest, signature })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use qedi_structs::ObjectId;
    use qedi_structs::contract::ContractCoordinates;

    use super::*;
    use crate::builder::TransactionBuilder;

    #[derive(Default)]
    struct Log(Mutex<Vec<&'static str>>);

    impl Log {
        fn push(&self, event: &'static str) {
            self.0.lock().unwrap().push(event);
        }

        fn events(&self) -> Vec<&'static str> {
            self.0.lock().unwrap().clone()
        }
    }

    struct FakeSponsor {
        log: Arc<Log>,
        fail_sponsor: bool,
    }

    #[async_trait]
    impl SponsorService for FakeSponsor {
        async fn sponsor(
            &self,
            _sender: SuiAddress,
            _tx: &PreparedTransaction,
        ) -> Result<SponsoredTransaction, QediError> {
            self.log.push("sponsor");
            if self.fail_sponsor {
                return Err(QediError::sponsor("sponsor rejected", "target not allowed"));
            }
            Ok(SponsoredTransaction {
                digest: Digest::from_bytes([1; 32]),
                bytes: vec![1, 2, 3],
            })
        }

        async fn execute(
            &self,
            digest: Digest,
            signature: &UserSignature,
        ) -> Result<ExecutedTransaction, QediError> {
            assert!(!signature.is_empty());
            self.log.push("execute");
            Ok(ExecutedTransaction {
                digest,
                status: None,
                effects: None,
            })
        }
    }

    struct FakeSigner {
        log: Arc<Log>,
        signature: Result<Vec<u8>, ()>,
    }

    #[async_trait]
    impl TransactionSigner for FakeSigner {
        fn address(&self) -> SuiAddress {
            SuiAddress::from_low_byte(1)
        }

        async fn sign_transaction(&self, tx_bytes: &[u8]) -> Result<UserSignature, QediError> {
            assert_eq!(tx_bytes, &[1, 2, 3]);
            self.log.push("sign");
            match &self.signature {
                Ok(bytes) => Ok(UserSignature::from_bytes(bytes.clone())),
                Err(()) => Err(QediError::signing("wallet", "user rejected the request")),
            }
        }
    }

    fn setup(fail_sponsor: bool, signature: Result<Vec<u8>, ()>) -> (SponsorshipRelay, FakeSigner, Arc<Log>) {
        let log = Arc::new(Log::default());
        let relay = SponsorshipRelay::new(Arc::new(FakeSponsor {
            log: log.clone(),
            fail_sponsor,
        }));
        let signer = FakeSigner {
            log: log.clone(),
            signature,
        };
        (relay, signer, log)
    }

    fn tx() -> PreparedTransaction {
        TransactionBuilder::new(ContractCoordinates::new(
            ObjectId::from_low_byte(0xaa),
            ObjectId::from_low_byte(0xbb),
        ))
        .record_click(ObjectId::from_low_byte(3), 0)
        .unwrap()
    }

    #[tokio::test]
    async fn steps_run_in_order() {
        let (relay, signer, log) = setup(false, Ok(vec![0; 97]));
        let executed = relay.run(&signer, &tx()).await.unwrap();
        assert_eq!(executed.digest, Digest::from_bytes([1; 32]));
        assert_eq!(log.events(), vec!["sponsor", "sign", "execute"]);
    }

    #[tokio::test]
    async fn sponsor_failure_stops_before_signing() {
        let (relay, signer, log) = setup(true, Ok(vec![0; 97]));
        let err = relay.run(&signer, &tx()).await.unwrap_err();
        assert!(matches!(err, QediError::Sponsor(_)));
        assert_eq!(log.events(), vec!["sponsor"]);
    }

    #[tokio::test]
    async fn declined_signature_stops_before_execution() {
        let (relay, signer, log) = setup(false, Err(()));
        let err = relay.run(&signer, &tx()).await.unwrap_err();
        assert!(matches!(err, QediError::Signing(_)));
        assert_eq!(log.events(), vec!["sponsor", "sign"]);
    }

    #[tokio::test]
    async fn empty_signature_never_reaches_the_sponsor() {
        let (relay, signer, log) = setup(false, Ok(vec![]));
        let err = relay.run(&signer, &tx()).await.unwrap_err();
        assert!(matches!(err, QediError::Signing(_)));
        assert_eq!(log.events(), vec!["sponsor", "sign"]);

        let err = relay
            .execute(Digest::from_bytes([1; 32]), UserSignature::from_bytes(vec![]))
            .await
            .unwrap_err();
        assert!(matches!(err, QediError::Signing(_)));
        assert!(!log.events().contains(&"execute"));
    }
}
