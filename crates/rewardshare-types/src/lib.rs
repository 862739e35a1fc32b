pub mod amount;
pub mod constants;
pub mod models;

pub use amount::Amount;
pub use models::{
    AdminAction, AdminLog, CheckIn, Deposit, DeviceInfo, Referral, ReviewStatus, Role, Task,
    TaskProof, TaskStatus, User, Withdrawal,
};
