use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, OnceCell};
use tracing::debug;

/// A resolved identity-provider session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub uid: String,
    pub email: String,
}

/// The identity/session seam. Providers publish every identity change,
/// including the initial resolution (signed-in or not), on the watch stream
/// returned by [`IdentityProvider::updates`].
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity>;

    async fn sign_up(&self, email: &str, password: &str) -> Result<Identity>;

    async fn sign_out(&self) -> Result<()>;

    /// Best-effort synchronous read; `None` before the first resolution.
    fn current(&self) -> Option<Identity>;

    fn updates(&self) -> watch::Receiver<Option<Identity>>;
}

/// Wraps a provider so page logic never acts on a stale or absent identity
/// during provider startup: callers await [`IdentityGate::await_initial`]
/// before branching on "not signed in".
pub struct IdentityGate {
    provider: Arc<dyn IdentityProvider>,
    init_timeout: Duration,
    initial: OnceCell<Option<Identity>>,
}

impl IdentityGate {
    pub fn new(provider: Arc<dyn IdentityProvider>, init_timeout: Duration) -> Self {
        Self {
            provider,
            init_timeout,
            initial: OnceCell::new(),
        }
    }

    /// Best-effort current identity.
    pub fn current(&self) -> Option<Identity> {
        self.provider.current()
    }

    /// Resolves exactly once, on the provider's first identity notification.
    /// A timeout or provider failure during startup reads as "no identity"
    /// rather than an error, and the resolution is cached: later sign-outs
    /// do not flip the initial answer.
    pub async fn await_initial(&self) -> Option<Identity> {
        self.initial
            .get_or_init(|| async {
                if let Some(identity) = self.provider.current() {
                    return Some(identity);
                }
                let mut updates = self.provider.updates();
                match tokio::time::timeout(self.init_timeout, updates.changed()).await {
                    Ok(Ok(())) => updates.borrow().clone(),
                    // Timed out or the provider dropped its sender; treat as
                    // signed out rather than hanging the page.
                    _ => {
                        debug!("initial identity resolution timed out");
                        None
                    }
                }
            })
            .await
            .clone()
    }

    /// Identity-change stream; receivers see every subsequent notification.
    pub fn subscribe(&self) -> watch::Receiver<Option<Identity>> {
        self.provider.updates()
    }
}
