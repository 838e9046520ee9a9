use std::sync::{Arc, Mutex};

use anyhow::Context;
use async_trait::async_trait;
use qedi_structs::session::{AuthMethod, Session, SocialProvider};
use qedi_structs::{QediError, SuiAddress};
use sqlx::SqlitePool;
use tokio::sync::RwLock;
use url::Url;

use crate::login::{IdentityProvider, PendingLogin};
use crate::signer::{TransactionSigner, ZkLoginSigner};

pub type SessionListener = Box<dyn Fn(Option<&Session>) + Send + Sync>;

/// Where the delegated session lives between runs.
#[async_trait]
pub trait SessionStore: Send + Sync + 'static {
    async fn get(&self) -> anyhow::Result<Option<Session>>;
    async fn set(&self, session: Session) -> anyhow::Result<()>;
    async fn clear(&self) -> anyhow::Result<()>;
    /// Register a callback run after every `set` or `clear`.
    fn on_change(&self, listener: SessionListener);
}

#[derive(Default)]
struct Listeners(Mutex<Vec<SessionListener>>);

impl Listeners {
    fn push(&self, listener: SessionListener) {
        if let Ok(mut listeners) = self.0.lock() {
            listeners.push(listener);
        }
    }

    fn notify(&self, session: Option<&Session>) {
        if let Ok(listeners) = self.0.lock() {
            for listener in listeners.iter() {
                listener(session);
            }
        }
    }
}

#[derive(Default)]
pub struct MemorySessionStore {
    session: RwLock<Option<Session>>,
    listeners: Listeners,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self) -> anyhow::Result<Option<Session>> {
        Ok(self.session.read().await.clone())
    }

    async fn set(&self, session: Session) -> anyhow::Result<()> {
        *self.session.write().await = Some(session.clone());
        self.listeners.notify(Some(&session));
        Ok(())
    }

    async fn clear(&self) -> anyhow::Result<()> {
        *self.session.write().await = None;
        self.listeners.notify(None);
        Ok(())
    }

    fn on_change(&self, listener: SessionListener) {
        self.listeners.push(listener);
    }
}

/// Keeps the session in a single-row sqlite table, BCS-encoded.
pub struct SqliteSessionStore {
    pool: SqlitePool,
    listeners: Listeners,
}

impl SqliteSessionStore {
    pub async fn new(pool: SqlitePool) -> anyhow::Result<Self> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS client_session (\
             id INTEGER PRIMARY KEY CHECK (id = 1), \
             session BLOB NOT NULL)",
        )
        .execute(&pool)
        .await?;
        Ok(Self {
            pool,
            listeners: Listeners::default(),
        })
    }
}

#[async_trait]
impl SessionStore for SqliteSessionStore {
    async fn get(&self) -> anyhow::Result<Option<Session>> {
        let row = sqlx::query_as::<_, (Vec<u8>,)>("SELECT session FROM client_session WHERE id = 1")
            .fetch_optional(&self.pool)
            .await?;
        let Some((bytes,)) = row else {
            return Ok(None);
        };
        let session = bcs::from_bytes(&bytes).context("stored session is corrupt")?;
        Ok(Some(session))
    }

    async fn set(&self, session: Session) -> anyhow::Result<()> {
        let bytes = bcs::to_bytes(&session)?;
        sqlx::query(
            "INSERT INTO client_session (id, session) VALUES (1, ?) \
             ON CONFLICT(id) DO UPDATE SET session = excluded.session",
        )
        .bind(bytes)
        .execute(&self.pool)
        .await?;
        self.listeners.notify(Some(&session));
        Ok(())
    }

    async fn clear(&self) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM client_session")
            .execute(&self.pool)
            .await?;
        self.listeners.notify(None);
        Ok(())
    }

    fn on_change(&self, listener: SessionListener) {
        self.listeners.push(listener);
    }
}

/// Who is acting right now.
#[derive(Clone, Debug)]
pub enum Identity {
    None,
    WalletConnected(SuiAddress),
    Delegated(Session),
}

impl Identity {
    pub fn address(&self) -> Option<SuiAddress> {
        match self {
            Identity::None => None,
            Identity::WalletConnected(address) => Some(*address),
            Identity::Delegated(session) => Some(session.address),
        }
    }
}

/// How the active identity signs, fixed when the identity is resolved.
#[derive(Clone)]
pub enum Signer {
    /// A connected wallet; pays its own gas.
    Direct(Arc<dyn TransactionSigner>),
    /// A social-login credential; needs a sponsor.
    Delegated(Arc<ZkLoginSigner>),
}

impl Signer {
    pub fn address(&self) -> SuiAddress {
        match self {
            Signer::Direct(signer) => signer.address(),
            Signer::Delegated(signer) => signer.address(),
        }
    }

    pub fn as_signer(&self) -> &dyn TransactionSigner {
        match self {
            Signer::Direct(signer) => signer.as_ref(),
            Signer::Delegated(signer) => signer.as_ref(),
        }
    }
}

/// Tracks the connected wallet and the stored delegated session, and decides
/// which one acts. A connected wallet always wins over a stored session.
pub struct IdentityResolver {
    store: Arc<dyn SessionStore>,
    provider: Option<Arc<dyn IdentityProvider>>,
    wallet: RwLock<Option<Arc<dyn TransactionSigner>>>,
    pending: tokio::sync::Mutex<Option<PendingLogin>>,
}

impl IdentityResolver {
    pub fn new(store: Arc<dyn SessionStore>, provider: Option<Arc<dyn IdentityProvider>>) -> Self {
        Self {
            store,
            provider,
            wallet: RwLock::new(None),
            pending: tokio::sync::Mutex::new(None),
        }
    }

    /// Called by the wallet adapter once a wallet connects.
    pub async fn connect_wallet(&self, signer: Arc<dyn TransactionSigner>) {
        tracing::debug!(address = %signer.address().abbreviated(), "wallet connected");
        *self.wallet.write().await = Some(signer);
    }

    pub async fn disconnect_wallet(&self) {
        *self.wallet.write().await = None;
    }

    async fn stored_session(&self) -> Result<Option<Session>, QediError> {
        let session = self
            .store
            .get()
            .await
            .map_err(|err| QediError::auth("cannot read session", err))?;
        // A session without a credential cannot sign, so it does not count.
        Ok(session.filter(|s| s.credential.is_some()))
    }

    pub async fn current_identity(&self) -> Result<Identity, QediError> {
        if let Some(wallet) = self.wallet.read().await.as_ref() {
            return Ok(Identity::WalletConnected(wallet.address()));
        }
        Ok(match self.stored_session().await? {
            Some(session) => Identity::Delegated(session),
            None => Identity::None,
        })
    }

    pub async fn requires_sponsorship(&self) -> Result<bool, QediError> {
        Ok(matches!(self.current_identity().await?, Identity::Delegated(_)))
    }

    /// The signer for the active identity, or `None` when nobody is signed in.
    pub async fn active_signer(&self) -> Result<Option<Signer>, QediError> {
        if let Some(wallet) = self.wallet.read().await.as_ref() {
            return Ok(Some(Signer::Direct(wallet.clone())));
        }
        let Some(session) = self.stored_session().await? else {
            return Ok(None);
        };
        let Some(credential) = session.credential else {
            return Ok(None);
        };
        Ok(Some(Signer::Delegated(Arc::new(ZkLoginSigner::new(
            session.address,
            credential,
        )))))
    }

    /// Start a login. Wallet logins happen in the wallet's own UI, so they
    /// return nothing; social logins return the URL to send the user to.
    pub async fn login(&self, method: AuthMethod) -> Result<Option<Url>, QediError> {
        let provider = match method {
            AuthMethod::Wallet => return Ok(None),
            AuthMethod::Social(provider) => provider,
        };
        let pending = self.begin_login(provider).await?;
        let url = pending.authorization_url.clone();
        *self.pending.lock().await = Some(pending);
        Ok(Some(url))
    }

    pub async fn begin_login(&self, provider: SocialProvider) -> Result<PendingLogin, QediError> {
        let service = self.identity_provider()?;
        service.begin(provider).await
    }

    /// Finish the login started by [`IdentityResolver::login`] with the code
    /// from the provider's redirect.
    pub async fn complete_login(&self, code: &str) -> Result<Session, QediError> {
        let pending = self
            .pending
            .lock()
            .await
            .take()
            .ok_or_else(|| QediError::auth("login failed", "no login in progress"))?;
        self.complete_pending(&pending, code).await
    }

    pub async fn complete_pending(&self, pending: &PendingLogin, code: &str) -> Result<Session, QediError> {
        let service = self.identity_provider()?;
        let done = service.complete(pending, code).await?;
        let session = Session::delegated(done.address, pending.provider, done.credential);
        self.store
            .set(session.clone())
            .await
            .map_err(|err| QediError::auth("cannot store session", err))?;
        Ok(session)
    }

    /// Drop the delegated session. A connected wallet is left alone.
    pub async fn logout(&self) -> Result<(), QediError> {
        self.store
            .clear()
            .await
            .map_err(|err| QediError::auth("cannot clear session", err))
    }

    fn identity_provider(&self) -> Result<&Arc<dyn IdentityProvider>, QediError> {
        self.provider
            .as_ref()
            .ok_or_else(|| QediError::auth("login unavailable", "no identity provider configured"))
    }
}
