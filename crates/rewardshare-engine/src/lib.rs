//! The rewardshare client core: registration and referrals, deposit and
//! withdrawal submission, the task lifecycle, and the admin moderation
//! workflow that moves funds between a user's balance buckets.
//!
//! All persistence goes through the [`rewardshare_store::RecordStore`] seam
//! and all authentication through the [`identity::IdentityProvider`] seam;
//! both external services are collaborators, not part of this crate.

pub mod accounts;
pub mod audit;
pub mod config;
pub mod error;
pub mod identity;
pub mod logging;
pub mod moderation;
pub mod tasks;
pub mod uploads;
pub mod wallet;

mod users;

pub use accounts::{AccountManager, RegistrationRequest};
pub use audit::AuditLog;
pub use config::EngineConfig;
pub use error::{EngineError, Result};
pub use identity::{Identity, IdentityGate, IdentityProvider};
pub use moderation::{AdminOverview, ModerationQueue};
pub use tasks::{TaskBrowse, TaskDraft, TaskManager, TaskSort};
pub use uploads::{ImageHost, ImggClient, ProofImage};
pub use wallet::{TaskHistoryEntry, WalletManager};

use rewardshare_store::RecordStore;
use std::sync::Arc;

/// Everything wired together over one store, one identity provider and one
/// image host.
pub struct Engine {
    pub identity: Arc<IdentityGate>,
    pub accounts: Arc<AccountManager>,
    pub wallet: Arc<WalletManager>,
    pub tasks: Arc<TaskManager>,
    pub moderation: Arc<ModerationQueue>,
    pub config: Arc<EngineConfig>,
}

impl Engine {
    pub fn new(
        store: Arc<dyn RecordStore>,
        identity_provider: Arc<dyn IdentityProvider>,
        uploads: Arc<dyn ImageHost>,
        config: EngineConfig,
    ) -> Self {
        let config = Arc::new(config);
        let audit = AuditLog::new(store.clone());

        let identity = Arc::new(IdentityGate::new(
            identity_provider.clone(),
            config.identity.init_timeout(),
        ));
        let accounts = Arc::new(AccountManager::new(
            store.clone(),
            identity_provider,
            config.clone(),
        ));
        let wallet = Arc::new(WalletManager::new(
            store.clone(),
            uploads.clone(),
            config.clone(),
        ));
        let tasks = Arc::new(TaskManager::new(
            store.clone(),
            uploads,
            audit.clone(),
            config.clone(),
        ));
        let moderation = Arc::new(ModerationQueue::new(store, audit, config.clone()));

        Self {
            identity,
            accounts,
            wallet,
            tasks,
            moderation,
            config,
        }
    }
}
