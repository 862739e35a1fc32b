//! User-record access shared by the workflow managers.

use crate::error::{EngineError, Result};
use rewardshare_ledger::BalanceDelta;
use rewardshare_store::{collections, from_record, RecordStore, StoreError, Update};
use rewardshare_types::User;
use tracing::info;

pub(crate) async fn load_user(store: &dyn RecordStore, uid: &str) -> Result<User> {
    let record = store
        .get(collections::USERS, uid)
        .await?
        .ok_or_else(|| EngineError::NotFound {
            collection: collections::USERS,
            id: uid.to_string(),
        })?;
    Ok(from_record(record)?)
}

/// The acting user must be an admin (tagged role or legacy flag).
pub(crate) async fn require_admin(store: &dyn RecordStore, admin_id: &str) -> Result<User> {
    let user = load_user(store, admin_id).await?;
    if !user.is_admin() {
        return Err(EngineError::PreconditionFailed(format!(
            "user {} is not an admin",
            admin_id
        )));
    }
    Ok(user)
}

/// Apply a ledger delta to a user document via atomic field increments.
pub(crate) async fn apply_delta(
    store: &dyn RecordStore,
    uid: &str,
    delta: &BalanceDelta,
) -> Result<()> {
    if delta.is_zero() {
        return Ok(());
    }

    let mut update = Update::new();
    for (field, value) in delta.entries() {
        update = update.increment(field, value);
    }

    store
        .update(collections::USERS, uid, update)
        .await
        .map_err(|e| match e {
            StoreError::NotFound { .. } => EngineError::NotFound {
                collection: collections::USERS,
                id: uid.to_string(),
            },
            other => other.into(),
        })?;

    info!(user = %uid, ?delta, "balance delta applied");
    Ok(())
}
