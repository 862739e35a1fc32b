//! Collection names shared by every component that touches the store.

pub const USERS: &str = "users";
pub const DEPOSITS: &str = "deposits";
pub const WITHDRAWALS: &str = "withdrawals";
pub const TASKS: &str = "tasks";
pub const TASK_PROOFS: &str = "taskProofs";
pub const REFERRALS: &str = "referrals";
pub const ADMIN_LOGS: &str = "adminLogs";
pub const CHECKINS: &str = "checkins";
