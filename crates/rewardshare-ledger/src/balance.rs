use rewardshare_types::constants::{CHECKIN_REWARD, REFERRAL_REWARD};
use rewardshare_types::{Amount, User};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum LedgerError {
    #[error("insufficient main balance: has {has}, needs {needs}")]
    InsufficientMain { has: Amount, needs: Amount },

    #[error("insufficient locked balance: has {has}, needs {needs}")]
    InsufficientLocked { has: Amount, needs: Amount },

    #[error("amount arithmetic overflow")]
    Overflow,
}

/// A point-in-time read of one user's balance fields. Preconditions are
/// always checked against a snapshot read immediately before the mutation,
/// never against cached state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BalanceSnapshot {
    pub main_balance: Amount,
    pub locked_balance: Amount,
    pub referral_balance: Amount,
    pub total_deposit: Amount,
    pub total_withdrawn: Amount,
    pub total_earned: Amount,
}

impl From<&User> for BalanceSnapshot {
    fn from(user: &User) -> Self {
        Self {
            main_balance: user.main_balance,
            locked_balance: user.locked_balance,
            referral_balance: user.referral_balance,
            total_deposit: user.total_deposit,
            total_withdrawn: user.total_withdrawn,
            total_earned: user.total_earned,
        }
    }
}

/// The signed field deltas a moderation or registration event applies to a
/// user document. Deltas are applied through the store's atomic increment
/// mechanism, so concurrent events on one user compose without locks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceDelta {
    pub main_balance: i64,
    pub locked_balance: i64,
    pub referral_balance: i64,
    pub total_deposit: i64,
    pub total_withdrawn: i64,
    pub total_earned: i64,
    pub referral_count: i64,
}

impl BalanceDelta {
    /// Approved deposit: funds arrive locked, usable for task creation only.
    pub fn deposit_approval(amount: Amount) -> Self {
        Self {
            locked_balance: amount.as_delta(),
            total_deposit: amount.as_delta(),
            ..Self::default()
        }
    }

    /// Approved withdrawal: the gross amount leaves the main balance.
    /// Caller must have verified [`ensure_withdrawable`] against a fresh
    /// snapshot first.
    pub fn withdrawal_approval(amount: Amount) -> Self {
        Self {
            main_balance: -amount.as_delta(),
            total_withdrawn: amount.as_delta(),
            ..Self::default()
        }
    }

    /// Approved task proof: the task's reward at approval time.
    pub fn task_proof_approval(reward: Amount) -> Self {
        Self {
            main_balance: reward.as_delta(),
            total_earned: reward.as_delta(),
            ..Self::default()
        }
    }

    /// One-time referral credit on a referred registration.
    pub fn referral_credit() -> Self {
        Self {
            referral_balance: REFERRAL_REWARD.as_delta(),
            referral_count: 1,
            ..Self::default()
        }
    }

    /// Daily check-in bonus.
    pub fn check_in_credit() -> Self {
        Self {
            main_balance: CHECKIN_REWARD.as_delta(),
            total_earned: CHECKIN_REWARD.as_delta(),
            ..Self::default()
        }
    }

    /// Task creation: the full cost leaves the advertiser's locked balance.
    /// Caller must have verified [`ensure_cost_covered`] first.
    pub fn task_creation(total_cost: Amount) -> Self {
        Self {
            locked_balance: -total_cost.as_delta(),
            ..Self::default()
        }
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::default()
    }

    /// Non-zero deltas paired with their wire field names, ready to feed an
    /// increment-style update.
    pub fn entries(&self) -> Vec<(&'static str, i64)> {
        [
            ("mainBalance", self.main_balance),
            ("lockedBalance", self.locked_balance),
            ("referralBalance", self.referral_balance),
            ("totalDeposit", self.total_deposit),
            ("totalWithdrawn", self.total_withdrawn),
            ("totalEarned", self.total_earned),
            ("referralCount", self.referral_count),
        ]
        .into_iter()
        .filter(|(_, delta)| *delta != 0)
        .collect()
    }
}

/// Withdrawal approval precondition, checked at approval time (the balance
/// may have changed since submission).
pub fn ensure_withdrawable(snapshot: &BalanceSnapshot, amount: Amount) -> Result<(), LedgerError> {
    if snapshot.main_balance < amount {
        return Err(LedgerError::InsufficientMain {
            has: snapshot.main_balance,
            needs: amount,
        });
    }
    Ok(())
}

/// Task creation precondition on the advertiser's locked balance.
pub fn ensure_cost_covered(snapshot: &BalanceSnapshot, cost: Amount) -> Result<(), LedgerError> {
    if snapshot.locked_balance < cost {
        return Err(LedgerError::InsufficientLocked {
            has: snapshot.locked_balance,
            needs: cost,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deposit_approval_credits_locked_and_counter() {
        let delta = BalanceDelta::deposit_approval(Amount::from_rupiah(50_000));
        assert_eq!(delta.locked_balance, 50_000);
        assert_eq!(delta.total_deposit, 50_000);
        assert_eq!(delta.main_balance, 0);
        assert_eq!(delta.referral_balance, 0);
    }

    #[test]
    fn withdrawal_approval_debits_gross_amount() {
        let delta = BalanceDelta::withdrawal_approval(Amount::from_rupiah(30_000));
        assert_eq!(delta.main_balance, -30_000);
        assert_eq!(delta.total_withdrawn, 30_000);
        assert_eq!(delta.locked_balance, 0);
    }

    #[test]
    fn proof_approval_pays_into_main() {
        let delta = BalanceDelta::task_proof_approval(Amount::from_rupiah(1_000));
        assert_eq!(delta.main_balance, 1_000);
        assert_eq!(delta.total_earned, 1_000);
    }

    #[test]
    fn referral_credit_is_the_fixed_reward() {
        let delta = BalanceDelta::referral_credit();
        assert_eq!(delta.referral_balance, 250);
        assert_eq!(delta.referral_count, 1);
        assert_eq!(delta.main_balance, 0);
    }

    #[test]
    fn check_in_credit_is_the_fixed_bonus() {
        let delta = BalanceDelta::check_in_credit();
        assert_eq!(delta.main_balance, 150);
        assert_eq!(delta.total_earned, 150);
    }

    #[test]
    fn entries_skip_zero_fields() {
        let entries = BalanceDelta::deposit_approval(Amount::from_rupiah(1)).entries();
        assert_eq!(entries, vec![("lockedBalance", 1), ("totalDeposit", 1)]);
        assert!(BalanceDelta::default().is_zero());
    }

    #[test]
    fn withdrawable_requires_fresh_main_balance() {
        let snapshot = BalanceSnapshot {
            main_balance: Amount::from_rupiah(10_000),
            ..Default::default()
        };
        assert!(ensure_withdrawable(&snapshot, Amount::from_rupiah(10_000)).is_ok());
        assert_eq!(
            ensure_withdrawable(&snapshot, Amount::from_rupiah(30_000)),
            Err(LedgerError::InsufficientMain {
                has: Amount::from_rupiah(10_000),
                needs: Amount::from_rupiah(30_000),
            })
        );
    }

    #[test]
    fn cost_precondition_checks_locked_balance() {
        let snapshot = BalanceSnapshot {
            locked_balance: Amount::from_rupiah(11_999),
            ..Default::default()
        };
        assert!(ensure_cost_covered(&snapshot, Amount::from_rupiah(12_000)).is_err());
    }
}
