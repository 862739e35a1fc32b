use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::uploads::{validate_image, ImageHost, ProofImage};
use crate::users::load_user;
use chrono::Utc;
use rewardshare_store::{collections, from_record, to_record, Filter, RecordStore, Sort};
use rewardshare_types::{Amount, Deposit, Referral, ReviewStatus, Task, TaskProof, Withdrawal};
use std::sync::Arc;
use tracing::info;

/// A worker-side task-history row: the proof plus the task title it was
/// submitted against (absent when the task has since disappeared).
#[derive(Debug, Clone)]
pub struct TaskHistoryEntry {
    pub proof_id: String,
    pub proof: TaskProof,
    pub task_title: Option<String>,
}

/// Deposit and withdrawal submission plus the user-facing history reads.
pub struct WalletManager {
    store: Arc<dyn RecordStore>,
    uploads: Arc<dyn ImageHost>,
    config: Arc<EngineConfig>,
}

impl WalletManager {
    pub fn new(
        store: Arc<dyn RecordStore>,
        uploads: Arc<dyn ImageHost>,
        config: Arc<EngineConfig>,
    ) -> Self {
        Self {
            store,
            uploads,
            config,
        }
    }

    /// Submit a deposit for manual review. The transfer-proof image is
    /// validated and uploaded first; nothing is written when that fails.
    pub async fn submit_deposit(
        &self,
        user_id: &str,
        amount: Amount,
        method: &str,
        proof: ProofImage,
    ) -> Result<(String, Deposit)> {
        if amount < self.config.deposits.minimum {
            return Err(EngineError::Validation(format!(
                "minimum deposit is {}",
                self.config.deposits.minimum
            )));
        }
        if method.trim().is_empty() {
            return Err(EngineError::Validation("payment method is required".into()));
        }

        let user = load_user(self.store.as_ref(), user_id).await?;

        validate_image(&proof, &self.config.uploads)?;
        let proof_url = self.uploads.upload(&proof).await?;

        let deposit = Deposit {
            user_id: user_id.to_string(),
            user_email: user.email,
            user_name: user.username,
            method: method.to_string(),
            amount,
            proof_url,
            deposit_code: submission_code("DEP"),
            status: ReviewStatus::Pending,
            created_at: Utc::now(),
            approved_at: None,
            approved_by: None,
            rejected_at: None,
            rejected_by: None,
            rejection_reason: None,
            locked_until: None,
        };

        let id = self
            .store
            .create(collections::DEPOSITS, to_record(&deposit)?)
            .await?;

        info!(user = %user_id, deposit = %id, code = %deposit.deposit_code, %amount, "deposit submitted");
        Ok((id, deposit))
    }

    /// Submit a withdrawal for manual review. The balance is NOT checked
    /// here; it is checked against a fresh snapshot at approval time.
    pub async fn submit_withdrawal(
        &self,
        user_id: &str,
        amount: Amount,
        method: &str,
        account_number: &str,
    ) -> Result<(String, Withdrawal)> {
        let fee = self.config.withdrawals.fee;
        if amount <= fee {
            return Err(EngineError::Validation(format!(
                "withdrawal must exceed the {} fee",
                fee
            )));
        }
        if method.trim().is_empty() || account_number.trim().is_empty() {
            return Err(EngineError::Validation(
                "payment method and account number are required".into(),
            ));
        }

        let user = load_user(self.store.as_ref(), user_id).await?;

        let withdrawal = Withdrawal {
            user_id: user_id.to_string(),
            user_email: user.email,
            user_name: user.username,
            amount,
            fee,
            net_amount: amount.saturating_sub(fee),
            method: method.to_string(),
            account_number: account_number.to_string(),
            withdraw_code: submission_code("WD"),
            status: ReviewStatus::Pending,
            created_at: Utc::now(),
            approved_at: None,
            approved_by: None,
            rejected_at: None,
            rejected_by: None,
            rejection_reason: None,
        };

        let id = self
            .store
            .create(collections::WITHDRAWALS, to_record(&withdrawal)?)
            .await?;

        info!(user = %user_id, withdrawal = %id, %amount, "withdrawal submitted");
        Ok((id, withdrawal))
    }

    pub async fn deposit_history(
        &self,
        user_id: &str,
        limit: Option<usize>,
    ) -> Result<Vec<(String, Deposit)>> {
        let rows = self
            .store
            .query(
                collections::DEPOSITS,
                &[Filter::eq("userId", user_id)],
                Some(Sort::desc("createdAt")),
                limit,
            )
            .await?;
        rows.into_iter()
            .map(|(id, record)| Ok((id, from_record(record)?)))
            .collect()
    }

    pub async fn withdrawal_history(
        &self,
        user_id: &str,
        limit: Option<usize>,
    ) -> Result<Vec<(String, Withdrawal)>> {
        let rows = self
            .store
            .query(
                collections::WITHDRAWALS,
                &[Filter::eq("userId", user_id)],
                Some(Sort::desc("createdAt")),
                limit,
            )
            .await?;
        rows.into_iter()
            .map(|(id, record)| Ok((id, from_record(record)?)))
            .collect()
    }

    pub async fn referral_history(&self, user_id: &str) -> Result<Vec<(String, Referral)>> {
        let rows = self
            .store
            .query(
                collections::REFERRALS,
                &[Filter::eq("referrerId", user_id)],
                Some(Sort::desc("date")),
                None,
            )
            .await?;
        rows.into_iter()
            .map(|(id, record)| Ok((id, from_record(record)?)))
            .collect()
    }

    /// The worker's proof history joined with task titles.
    pub async fn task_history(&self, user_id: &str) -> Result<Vec<TaskHistoryEntry>> {
        let rows = self
            .store
            .query(
                collections::TASK_PROOFS,
                &[Filter::eq("userId", user_id)],
                Some(Sort::desc("submittedAt")),
                None,
            )
            .await?;

        let mut entries = Vec::with_capacity(rows.len());
        for (proof_id, record) in rows {
            let proof: TaskProof = from_record(record)?;
            let task_title = match self.store.get(collections::TASKS, &proof.task_id).await? {
                Some(task) => Some(from_record::<Task>(task)?.title),
                None => None,
            };
            entries.push(TaskHistoryEntry {
                proof_id,
                proof,
                task_title,
            });
        }
        Ok(entries)
    }
}

/// Submission reference code: prefix + the last 8 digits of the
/// unix-millisecond clock.
fn submission_code(prefix: &str) -> String {
    let millis = Utc::now().timestamp_millis().to_string();
    let tail = &millis[millis.len().saturating_sub(8)..];
    format!("{}{}", prefix, tail)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn submission_codes_carry_prefix_and_eight_digits() {
        let code = submission_code("DEP");
        assert!(code.starts_with("DEP"));
        assert_eq!(code.len(), 11);
        assert!(code[3..].bytes().all(|b| b.is_ascii_digit()));
    }
}
