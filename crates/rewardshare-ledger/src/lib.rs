//! Pure balance-ledger rules: how moderation decisions, referrals and
//! check-ins mutate a user's balance fields. No I/O here. Callers read a
//! fresh snapshot, check preconditions, and apply the returned deltas
//! through the record store's atomic increments.

pub mod balance;
pub mod cost;

pub use balance::{
    ensure_cost_covered, ensure_withdrawable, BalanceDelta, BalanceSnapshot, LedgerError,
};
pub use cost::{task_cost, TaskCost};
