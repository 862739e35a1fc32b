use crate::error::Result;
use chrono::Utc;
use rewardshare_store::{collections, to_record, RecordStore};
use rewardshare_types::{AdminAction, AdminLog};
use std::sync::Arc;
use tracing::info;

/// Append-only moderation audit trail. Every admin decision lands here;
/// the core never reads the entries back.
#[derive(Clone)]
pub struct AuditLog {
    store: Arc<dyn RecordStore>,
}

impl AuditLog {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    pub async fn record(
        &self,
        admin_id: &str,
        action: AdminAction,
        target_id: &str,
        details: impl Into<String>,
    ) -> Result<String> {
        let entry = AdminLog {
            admin_id: admin_id.to_string(),
            action,
            target_id: target_id.to_string(),
            details: details.into(),
            timestamp: Utc::now(),
        };

        let id = self
            .store
            .create(collections::ADMIN_LOGS, to_record(&entry)?)
            .await?;

        info!(
            admin = %entry.admin_id,
            action = ?entry.action,
            target = %entry.target_id,
            "moderation decision logged"
        );
        Ok(id)
    }
}
