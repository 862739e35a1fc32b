use crate::audit::AuditLog;
use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::uploads::{validate_image, ImageHost, ProofImage};
use crate::users::{load_user, require_admin};
use chrono::Utc;
use rewardshare_ledger::{ensure_cost_covered, task_cost, BalanceDelta, BalanceSnapshot};
use rewardshare_store::{collections, from_record, to_record, Filter, RecordStore, Sort, Update};
use rewardshare_types::{AdminAction, Amount, ReviewStatus, Task, TaskProof, TaskStatus};
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone, Default)]
pub struct TaskDraft {
    pub title: String,
    pub description: String,
    pub task_type: String,
    pub link: String,
    pub reward: Amount,
    pub slots: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TaskSort {
    #[default]
    Newest,
    RewardHigh,
    RewardLow,
    SlotsLeft,
}

#[derive(Debug, Clone, Default)]
pub struct TaskBrowse {
    pub task_type: Option<String>,
    pub min_reward: Option<Amount>,
    pub sort: TaskSort,
    pub limit: Option<usize>,
}

/// Task creation, proof submission and browsing.
pub struct TaskManager {
    store: Arc<dyn RecordStore>,
    uploads: Arc<dyn ImageHost>,
    audit: AuditLog,
    config: Arc<EngineConfig>,
}

impl TaskManager {
    pub fn new(
        store: Arc<dyn RecordStore>,
        uploads: Arc<dyn ImageHost>,
        audit: AuditLog,
        config: Arc<EngineConfig>,
    ) -> Self {
        Self {
            store,
            uploads,
            audit,
            config,
        }
    }

    /// Create an advertiser task. The full cost (reward pool + platform fee)
    /// leaves the advertiser's locked balance up front via a guarded
    /// decrement, so an underfunded creation deducts nothing and writes no
    /// task. The cost is not escrowed: a later rejection does not refund it.
    pub async fn create_task(&self, advertiser_id: &str, draft: TaskDraft) -> Result<(String, Task)> {
        self.validate_draft(&draft)?;

        let user = load_user(self.store.as_ref(), advertiser_id).await?;
        if user.total_deposit < self.config.tasks.advertiser_min_deposit {
            return Err(EngineError::PreconditionFailed(format!(
                "advertiser requires {} in total deposits",
                self.config.tasks.advertiser_min_deposit
            )));
        }

        let cost = task_cost(draft.reward, draft.slots)?;
        ensure_cost_covered(&BalanceSnapshot::from(&user), cost.total)?;

        // The snapshot check above gives the friendly error; this guarded
        // decrement is what actually enforces the floor under concurrency.
        let mut charge = Update::new();
        for (field, value) in BalanceDelta::task_creation(cost.total).entries() {
            charge = charge.increment(field, value);
        }
        let charged = self
            .store
            .update_if(
                collections::USERS,
                advertiser_id,
                &[Filter::ge("lockedBalance", cost.total.rupiah() as i64)],
                charge,
            )
            .await?;
        if !charged {
            return Err(EngineError::PreconditionFailed(format!(
                "insufficient locked balance: needs {}",
                cost.total
            )));
        }

        let now = Utc::now();
        let task = Task {
            title: draft.title,
            description: draft.description.clone(),
            task_type: draft.task_type,
            // The original client reuses the description as instructions.
            instructions: draft.description,
            link: draft.link,
            reward: draft.reward,
            slots: draft.slots,
            available_slots: draft.slots,
            advertiser_id: advertiser_id.to_string(),
            advertiser_email: user.email,
            advertiser_name: user.username,
            status: TaskStatus::Pending,
            is_admin_task: false,
            estimated_time: "5-10 menit".to_string(),
            requirements: String::new(),
            fee: cost.fee,
            total_cost: cost.total,
            created_at: now,
            updated_at: now,
        };

        let id = self
            .store
            .create(collections::TASKS, to_record(&task)?)
            .await?;

        info!(
            advertiser = %advertiser_id,
            task = %id,
            cost = %cost.total,
            slots = task.slots,
            "advertiser task created"
        );
        Ok((id, task))
    }

    /// Admin-seeded task: free of charge and active immediately.
    pub async fn create_admin_task(&self, admin_id: &str, draft: TaskDraft) -> Result<(String, Task)> {
        self.validate_draft(&draft)?;
        let admin = require_admin(self.store.as_ref(), admin_id).await?;

        let now = Utc::now();
        let task = Task {
            title: draft.title,
            description: draft.description.clone(),
            task_type: draft.task_type,
            instructions: draft.description,
            link: draft.link,
            reward: draft.reward,
            slots: draft.slots,
            available_slots: draft.slots,
            advertiser_id: admin_id.to_string(),
            advertiser_email: admin.email,
            advertiser_name: admin.username,
            status: TaskStatus::Active,
            is_admin_task: true,
            estimated_time: "5-10 menit".to_string(),
            requirements: String::new(),
            fee: Amount::ZERO,
            total_cost: Amount::ZERO,
            created_at: now,
            updated_at: now,
        };

        let id = self
            .store
            .create(collections::TASKS, to_record(&task)?)
            .await?;
        self.audit
            .record(admin_id, AdminAction::CreateAdminTask, &id, task.title.clone())
            .await?;

        info!(admin = %admin_id, task = %id, "admin task created");
        Ok((id, task))
    }

    /// Submit proof of completion. The proof always enters review as
    /// `pending` with a zero reward; the payout is fixed at approval time.
    /// Submission reserves a slot immediately: the task's remaining slots
    /// drop by one, floored at zero, regardless of how review ends, and a
    /// task whose last slot is taken is closed to further browsing.
    pub async fn submit_proof(
        &self,
        user_id: &str,
        task_id: &str,
        description: &str,
        image: ProofImage,
    ) -> Result<(String, TaskProof)> {
        let task_record = self
            .store
            .get(collections::TASKS, task_id)
            .await?
            .ok_or_else(|| EngineError::NotFound {
                collection: collections::TASKS,
                id: task_id.to_string(),
            })?;
        let task: Task = from_record(task_record)?;

        let user = load_user(self.store.as_ref(), user_id).await?;

        validate_image(&image, &self.config.uploads)?;
        let proof_url = self.uploads.upload(&image).await?;

        let proof = TaskProof {
            task_id: task_id.to_string(),
            user_id: user_id.to_string(),
            user_email: user.email,
            user_name: user.username,
            proof_url,
            proof_description: description.to_string(),
            status: ReviewStatus::Pending,
            reward: Amount::ZERO,
            submitted_at: Utc::now(),
            reviewed_at: None,
            reviewed_by: None,
            rejection_reason: None,
        };

        let proof_id = self
            .store
            .create(collections::TASK_PROOFS, to_record(&proof)?)
            .await?;

        let remaining = task.available_slots.saturating_sub(1);
        let mut update = Update::new()
            .set("availableSlots", remaining)
            .set("updatedAt", json!(Utc::now()));
        if remaining == 0 && task.status == TaskStatus::Active {
            update = update.set("status", json!(TaskStatus::Closed));
        }
        self.store
            .update(collections::TASKS, task_id, update)
            .await?;

        info!(
            user = %user_id,
            task = %task_id,
            proof = %proof_id,
            slots_left = remaining,
            "task proof submitted"
        );
        Ok((proof_id, proof))
    }

    /// Active tasks the user has not already submitted a proof for. The
    /// one-proof-per-task rule lives here, in the browsing filter, and
    /// nowhere else.
    pub async fn available_tasks(
        &self,
        user_id: &str,
        browse: TaskBrowse,
    ) -> Result<Vec<(String, Task)>> {
        let mut filters = vec![Filter::eq("status", json!(TaskStatus::Active))];
        if let Some(task_type) = &browse.task_type {
            filters.push(Filter::eq("type", task_type.clone()));
        }
        if let Some(min_reward) = browse.min_reward {
            filters.push(Filter::ge("reward", min_reward.rupiah() as i64));
        }

        let sort = match browse.sort {
            TaskSort::Newest => Sort::desc("createdAt"),
            TaskSort::RewardHigh => Sort::desc("reward"),
            TaskSort::RewardLow => Sort::asc("reward"),
            TaskSort::SlotsLeft => Sort::desc("availableSlots"),
        };

        let rows = self
            .store
            .query(collections::TASKS, &filters, Some(sort), None)
            .await?;

        let submitted: HashSet<String> = self
            .store
            .query(
                collections::TASK_PROOFS,
                &[Filter::eq("userId", user_id)],
                None,
                None,
            )
            .await?
            .into_iter()
            .map(|(_, record)| from_record::<TaskProof>(record).map(|p| p.task_id))
            .collect::<rewardshare_store::Result<_>>()?;

        let mut tasks = Vec::new();
        for (id, record) in rows {
            if submitted.contains(&id) {
                continue;
            }
            tasks.push((id, from_record(record)?));
            if let Some(limit) = browse.limit {
                if tasks.len() == limit {
                    break;
                }
            }
        }
        Ok(tasks)
    }

    fn validate_draft(&self, draft: &TaskDraft) -> Result<()> {
        if draft.title.trim().is_empty()
            || draft.description.trim().is_empty()
            || draft.task_type.trim().is_empty()
        {
            return Err(EngineError::Validation(
                "task type, title and description are required".into(),
            ));
        }
        if draft.reward < self.config.tasks.min_reward {
            return Err(EngineError::Validation(format!(
                "reward must be at least {} per worker",
                self.config.tasks.min_reward
            )));
        }
        if draft.slots < self.config.tasks.min_slots || draft.slots > self.config.tasks.max_slots {
            return Err(EngineError::Validation(format!(
                "worker slots must be between {} and {}",
                self.config.tasks.min_slots, self.config.tasks.max_slots
            )));
        }
        Ok(())
    }
}
