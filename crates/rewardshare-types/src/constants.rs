use crate::amount::Amount;

/// One-time reward credited to the referrer when a referred registration
/// completes with a valid code.
pub const REFERRAL_REWARD: Amount = Amount::from_rupiah(250);

/// Daily check-in bonus.
pub const CHECKIN_REWARD: Amount = Amount::from_rupiah(150);

/// Smallest accepted deposit.
pub const MIN_DEPOSIT: Amount = Amount::from_rupiah(30_000);

/// Flat withdrawal fee; the gross amount is deducted, the net is paid out.
pub const WITHDRAWAL_FEE: Amount = Amount::from_rupiah(2_000);

/// Cumulative deposits required before a user may create tasks.
pub const ADVERTISER_MIN_DEPOSIT: Amount = Amount::from_rupiah(50_000);

/// Smallest per-completion task reward.
pub const MIN_TASK_REWARD: Amount = Amount::from_rupiah(500);

pub const MIN_TASK_SLOTS: u32 = 1;
pub const MAX_TASK_SLOTS: u32 = 100;

/// Platform fee on task creation, percent of reward × slots, floored.
pub const PLATFORM_FEE_PERCENT: u64 = 20;

/// Days an approved deposit is nominally locked for.
pub const DEPOSIT_LOCK_DAYS: i64 = 3;

/// Referral codes are this many uppercase alphanumerics.
pub const REFERRAL_CODE_LEN: usize = 8;
