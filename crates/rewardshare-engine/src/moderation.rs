use crate::audit::AuditLog;
use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::users::{apply_delta, load_user, require_admin};
use chrono::{Duration, Utc};
use rewardshare_ledger::{ensure_withdrawable, BalanceDelta, BalanceSnapshot};
use rewardshare_store::{collections, from_record, Filter, RecordStore, Sort, Update};
use rewardshare_types::{
    AdminAction, Amount, Deposit, ReviewStatus, Task, TaskProof, TaskStatus, Withdrawal,
};
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};

/// Admin dashboard totals.
#[derive(Debug, Clone, Default)]
pub struct AdminOverview {
    pub total_users: usize,
    pub active_users: usize,
    /// Summed main + referral balances across all users.
    pub total_balance: Amount,
    pub locked_balance: Amount,
    pub total_tasks: usize,
    pub active_tasks: usize,
    pub pending_deposits: usize,
    pub pending_advertiser_tasks: usize,
    pub pending_proofs: usize,
    pub pending_withdrawals: usize,
}

/// The admin decision state machine for deposits, withdrawals, task proofs
/// and advertiser-task activation.
///
/// Every decision claims its target with a compare-and-set on `status`
/// (from `pending` to a terminal state) before any balance is touched, so two
/// admins racing on one record produce exactly one credit: the loser gets
/// `AlreadyProcessed`. The claim, the balance increment and the audit
/// append are still separate writes; a crash in between leaves a
/// partially-applied record that needs manual reconciliation.
pub struct ModerationQueue {
    store: Arc<dyn RecordStore>,
    audit: AuditLog,
    config: Arc<EngineConfig>,
}

impl ModerationQueue {
    pub fn new(store: Arc<dyn RecordStore>, audit: AuditLog, config: Arc<EngineConfig>) -> Self {
        Self {
            store,
            audit,
            config,
        }
    }

    pub async fn approve_deposit(&self, deposit_id: &str, admin_id: &str) -> Result<()> {
        require_admin(self.store.as_ref(), admin_id).await?;
        let deposit: Deposit = self.fetch(collections::DEPOSITS, deposit_id).await?;
        ensure_pending(deposit.status, collections::DEPOSITS, deposit_id)?;

        let now = Utc::now();
        let locked_until = now + Duration::days(self.config.deposits.lock_days);
        self.claim(
            collections::DEPOSITS,
            deposit_id,
            Update::new()
                .set("status", json!(ReviewStatus::Approved))
                .set("approvedAt", json!(now))
                .set("approvedBy", admin_id)
                .set("lockedUntil", json!(locked_until)),
        )
        .await?;

        apply_delta(
            self.store.as_ref(),
            &deposit.user_id,
            &BalanceDelta::deposit_approval(deposit.amount),
        )
        .await?;

        self.audit
            .record(
                admin_id,
                AdminAction::ApproveDeposit,
                deposit_id,
                format!("{} {}", deposit.deposit_code, deposit.amount),
            )
            .await?;

        info!(deposit = %deposit_id, user = %deposit.user_id, amount = %deposit.amount, "deposit approved");
        Ok(())
    }

    pub async fn reject_deposit(
        &self,
        deposit_id: &str,
        admin_id: &str,
        reason: Option<&str>,
    ) -> Result<()> {
        require_admin(self.store.as_ref(), admin_id).await?;
        let deposit: Deposit = self.fetch(collections::DEPOSITS, deposit_id).await?;
        ensure_pending(deposit.status, collections::DEPOSITS, deposit_id)?;

        self.claim(
            collections::DEPOSITS,
            deposit_id,
            rejection_update(admin_id, reason, "rejectedAt", "rejectedBy"),
        )
        .await?;

        self.audit
            .record(
                admin_id,
                AdminAction::RejectDeposit,
                deposit_id,
                reason.unwrap_or_default().to_string(),
            )
            .await?;

        info!(deposit = %deposit_id, user = %deposit.user_id, "deposit rejected");
        Ok(())
    }

    /// The balance precondition is checked against a snapshot read right
    /// before the claim, then enforced again by a guarded decrement. When
    /// the decrement loses an interleaved race the claim is reverted, so an
    /// insufficient balance never strands an approved-but-unpaid record.
    pub async fn approve_withdrawal(&self, withdrawal_id: &str, admin_id: &str) -> Result<()> {
        require_admin(self.store.as_ref(), admin_id).await?;
        let withdrawal: Withdrawal = self.fetch(collections::WITHDRAWALS, withdrawal_id).await?;
        ensure_pending(withdrawal.status, collections::WITHDRAWALS, withdrawal_id)?;

        let user = load_user(self.store.as_ref(), &withdrawal.user_id).await?;
        ensure_withdrawable(&BalanceSnapshot::from(&user), withdrawal.amount)?;

        self.claim(
            collections::WITHDRAWALS,
            withdrawal_id,
            Update::new()
                .set("status", json!(ReviewStatus::Approved))
                .set("approvedAt", json!(Utc::now()))
                .set("approvedBy", admin_id),
        )
        .await?;

        let delta = BalanceDelta::withdrawal_approval(withdrawal.amount);
        let mut debit = Update::new();
        for (field, value) in delta.entries() {
            debit = debit.increment(field, value);
        }
        let debited = self
            .store
            .update_if(
                collections::USERS,
                &withdrawal.user_id,
                &[Filter::ge("mainBalance", withdrawal.amount.rupiah() as i64)],
                debit,
            )
            .await?;

        if !debited {
            // Lost a race since the snapshot read; release the claim.
            warn!(withdrawal = %withdrawal_id, user = %withdrawal.user_id, "balance changed under approval, releasing claim");
            self.store
                .update(
                    collections::WITHDRAWALS,
                    withdrawal_id,
                    Update::new()
                        .set("status", json!(ReviewStatus::Pending))
                        .set("approvedAt", json!(null))
                        .set("approvedBy", json!(null)),
                )
                .await?;
            return Err(EngineError::PreconditionFailed(format!(
                "insufficient main balance for withdrawal of {}",
                withdrawal.amount
            )));
        }

        self.audit
            .record(
                admin_id,
                AdminAction::ApproveWithdrawal,
                withdrawal_id,
                format!("{} {}", withdrawal.withdraw_code, withdrawal.amount),
            )
            .await?;

        info!(withdrawal = %withdrawal_id, user = %withdrawal.user_id, amount = %withdrawal.amount, "withdrawal approved");
        Ok(())
    }

    pub async fn reject_withdrawal(
        &self,
        withdrawal_id: &str,
        admin_id: &str,
        reason: Option<&str>,
    ) -> Result<()> {
        require_admin(self.store.as_ref(), admin_id).await?;
        let withdrawal: Withdrawal = self.fetch(collections::WITHDRAWALS, withdrawal_id).await?;
        ensure_pending(withdrawal.status, collections::WITHDRAWALS, withdrawal_id)?;

        self.claim(
            collections::WITHDRAWALS,
            withdrawal_id,
            rejection_update(admin_id, reason, "rejectedAt", "rejectedBy"),
        )
        .await?;

        self.audit
            .record(
                admin_id,
                AdminAction::RejectWithdrawal,
                withdrawal_id,
                reason.unwrap_or_default().to_string(),
            )
            .await?;

        info!(withdrawal = %withdrawal_id, user = %withdrawal.user_id, "withdrawal rejected");
        Ok(())
    }

    /// The payout is the task's reward field as read now, at approval time,
    /// not whatever it was when the proof was submitted.
    pub async fn approve_task_proof(&self, proof_id: &str, admin_id: &str) -> Result<Amount> {
        require_admin(self.store.as_ref(), admin_id).await?;
        let proof: TaskProof = self.fetch(collections::TASK_PROOFS, proof_id).await?;
        ensure_pending(proof.status, collections::TASK_PROOFS, proof_id)?;

        let task: Task = self.fetch(collections::TASKS, &proof.task_id).await?;
        let reward = task.reward;

        self.claim(
            collections::TASK_PROOFS,
            proof_id,
            Update::new()
                .set("status", json!(ReviewStatus::Approved))
                .set("reward", reward.rupiah())
                .set("reviewedAt", json!(Utc::now()))
                .set("reviewedBy", admin_id),
        )
        .await?;

        apply_delta(
            self.store.as_ref(),
            &proof.user_id,
            &BalanceDelta::task_proof_approval(reward),
        )
        .await?;

        self.audit
            .record(
                admin_id,
                AdminAction::ApproveTaskProof,
                proof_id,
                format!("task {} reward {}", proof.task_id, reward),
            )
            .await?;

        info!(proof = %proof_id, user = %proof.user_id, %reward, "task proof approved");
        Ok(reward)
    }

    pub async fn reject_task_proof(
        &self,
        proof_id: &str,
        admin_id: &str,
        reason: Option<&str>,
    ) -> Result<()> {
        require_admin(self.store.as_ref(), admin_id).await?;
        let proof: TaskProof = self.fetch(collections::TASK_PROOFS, proof_id).await?;
        ensure_pending(proof.status, collections::TASK_PROOFS, proof_id)?;

        self.claim(
            collections::TASK_PROOFS,
            proof_id,
            rejection_update(admin_id, reason, "reviewedAt", "reviewedBy"),
        )
        .await?;

        self.audit
            .record(
                admin_id,
                AdminAction::RejectTaskProof,
                proof_id,
                reason.unwrap_or_default().to_string(),
            )
            .await?;

        info!(proof = %proof_id, user = %proof.user_id, "task proof rejected");
        Ok(())
    }

    /// Activate a pending advertiser task so workers can see it.
    pub async fn activate_task(&self, task_id: &str, admin_id: &str) -> Result<()> {
        require_admin(self.store.as_ref(), admin_id).await?;
        let task: Task = self.fetch(collections::TASKS, task_id).await?;
        if task.status != TaskStatus::Pending {
            return Err(EngineError::AlreadyProcessed {
                collection: collections::TASKS,
                id: task_id.to_string(),
            });
        }

        self.claim(
            collections::TASKS,
            task_id,
            Update::new()
                .set("status", json!(TaskStatus::Active))
                .set("updatedAt", json!(Utc::now())),
        )
        .await?;

        self.audit
            .record(admin_id, AdminAction::ActivateTask, task_id, task.title.clone())
            .await?;

        info!(task = %task_id, advertiser = %task.advertiser_id, "task activated");
        Ok(())
    }

    /// Reject a pending advertiser task. The creation cost stays deducted:
    /// there is deliberately no refund path.
    pub async fn reject_task(
        &self,
        task_id: &str,
        admin_id: &str,
        reason: Option<&str>,
    ) -> Result<()> {
        require_admin(self.store.as_ref(), admin_id).await?;
        let task: Task = self.fetch(collections::TASKS, task_id).await?;
        if task.status != TaskStatus::Pending {
            return Err(EngineError::AlreadyProcessed {
                collection: collections::TASKS,
                id: task_id.to_string(),
            });
        }

        self.claim(
            collections::TASKS,
            task_id,
            Update::new()
                .set("status", json!(TaskStatus::Rejected))
                .set("updatedAt", json!(Utc::now())),
        )
        .await?;

        self.audit
            .record(
                admin_id,
                AdminAction::RejectTask,
                task_id,
                reason.unwrap_or_default().to_string(),
            )
            .await?;

        info!(task = %task_id, advertiser = %task.advertiser_id, "task rejected");
        Ok(())
    }

    /// Close an active task to further submissions.
    pub async fn close_task(&self, task_id: &str, admin_id: &str) -> Result<()> {
        require_admin(self.store.as_ref(), admin_id).await?;
        self.fetch::<Task>(collections::TASKS, task_id).await?;

        let closed = self
            .store
            .update_if(
                collections::TASKS,
                task_id,
                &[Filter::eq("status", json!(TaskStatus::Active))],
                Update::new()
                    .set("status", json!(TaskStatus::Closed))
                    .set("updatedAt", json!(Utc::now())),
            )
            .await?;
        if !closed {
            return Err(EngineError::AlreadyProcessed {
                collection: collections::TASKS,
                id: task_id.to_string(),
            });
        }

        self.audit
            .record(admin_id, AdminAction::CloseTask, task_id, String::new())
            .await?;
        Ok(())
    }

    pub async fn pending_deposits(&self, limit: Option<usize>) -> Result<Vec<(String, Deposit)>> {
        self.pending(collections::DEPOSITS, limit).await
    }

    pub async fn pending_withdrawals(
        &self,
        limit: Option<usize>,
    ) -> Result<Vec<(String, Withdrawal)>> {
        self.pending(collections::WITHDRAWALS, limit).await
    }

    pub async fn pending_task_proofs(
        &self,
        limit: Option<usize>,
    ) -> Result<Vec<(String, TaskProof)>> {
        let rows = self
            .store
            .query(
                collections::TASK_PROOFS,
                &[Filter::eq("status", json!(ReviewStatus::Pending))],
                Some(Sort::desc("submittedAt")),
                limit,
            )
            .await?;
        rows.into_iter()
            .map(|(id, record)| Ok((id, from_record(record)?)))
            .collect()
    }

    pub async fn pending_advertiser_tasks(
        &self,
        limit: Option<usize>,
    ) -> Result<Vec<(String, Task)>> {
        let rows = self
            .store
            .query(
                collections::TASKS,
                &[
                    Filter::eq("status", json!(TaskStatus::Pending)),
                    Filter::eq("isAdminTask", false),
                ],
                Some(Sort::desc("createdAt")),
                limit,
            )
            .await?;
        rows.into_iter()
            .map(|(id, record)| Ok((id, from_record(record)?)))
            .collect()
    }

    /// Dashboard totals: user and task counts, platform-wide balance sums,
    /// and the size of each pending queue.
    pub async fn overview(&self) -> Result<AdminOverview> {
        let users = self.store.query(collections::USERS, &[], None, None).await?;

        let mut overview = AdminOverview {
            total_users: users.len(),
            ..Default::default()
        };
        for (_, record) in users {
            let active = record
                .get("isActive")
                .and_then(serde_json::Value::as_bool)
                .unwrap_or(true);
            if active {
                overview.active_users += 1;
            }
            let field = |name: &str| {
                Amount::from_rupiah(
                    record
                        .get(name)
                        .and_then(serde_json::Value::as_u64)
                        .unwrap_or_default(),
                )
            };
            overview.total_balance = overview
                .total_balance
                .saturating_add(field("mainBalance"))
                .saturating_add(field("referralBalance"));
            overview.locked_balance = overview.locked_balance.saturating_add(field("lockedBalance"));
        }

        overview.total_tasks = self.store.count(collections::TASKS, &[]).await?;
        overview.active_tasks = self
            .store
            .count(
                collections::TASKS,
                &[Filter::eq("status", json!(TaskStatus::Active))],
            )
            .await?;

        let pending = json!(ReviewStatus::Pending);
        overview.pending_deposits = self
            .store
            .count(collections::DEPOSITS, &[Filter::eq("status", pending.clone())])
            .await?;
        overview.pending_withdrawals = self
            .store
            .count(
                collections::WITHDRAWALS,
                &[Filter::eq("status", pending.clone())],
            )
            .await?;
        overview.pending_proofs = self
            .store
            .count(collections::TASK_PROOFS, &[Filter::eq("status", pending)])
            .await?;
        overview.pending_advertiser_tasks = self
            .store
            .count(
                collections::TASKS,
                &[
                    Filter::eq("status", json!(TaskStatus::Pending)),
                    Filter::eq("isAdminTask", false),
                ],
            )
            .await?;

        Ok(overview)
    }

    async fn fetch<T: serde::de::DeserializeOwned>(
        &self,
        collection: &'static str,
        id: &str,
    ) -> Result<T> {
        let record = self
            .store
            .get(collection, id)
            .await?
            .ok_or_else(|| EngineError::NotFound {
                collection,
                id: id.to_string(),
            })?;
        Ok(from_record(record)?)
    }

    /// Compare-and-set claim: only a still-pending record can transition.
    async fn claim(&self, collection: &'static str, id: &str, update: Update) -> Result<()> {
        let claimed = self
            .store
            .update_if(
                collection,
                id,
                &[Filter::eq("status", json!(ReviewStatus::Pending))],
                update,
            )
            .await?;
        if !claimed {
            return Err(EngineError::AlreadyProcessed {
                collection,
                id: id.to_string(),
            });
        }
        Ok(())
    }

    async fn pending<T: serde::de::DeserializeOwned>(
        &self,
        collection: &'static str,
        limit: Option<usize>,
    ) -> Result<Vec<(String, T)>> {
        let rows = self
            .store
            .query(
                collection,
                &[Filter::eq("status", json!(ReviewStatus::Pending))],
                Some(Sort::desc("createdAt")),
                limit,
            )
            .await?;
        rows.into_iter()
            .map(|(id, record)| Ok((id, from_record(record)?)))
            .collect()
    }
}

fn ensure_pending(status: ReviewStatus, collection: &'static str, id: &str) -> Result<()> {
    if status != ReviewStatus::Pending {
        return Err(EngineError::AlreadyProcessed {
            collection,
            id: id.to_string(),
        });
    }
    Ok(())
}

fn rejection_update(
    admin_id: &str,
    reason: Option<&str>,
    at_field: &str,
    by_field: &str,
) -> Update {
    let mut update = Update::new()
        .set("status", json!(ReviewStatus::Rejected))
        .set(at_field, json!(Utc::now()))
        .set(by_field, admin_id);
    if let Some(reason) = reason {
        update = update.set("rejectionReason", reason);
    }
    update
}
