use crate::amount::Amount;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Account role. Documents written by the legacy client carry a redundant
/// `isAdmin` boolean next to `role`; the enum is authoritative going forward
/// and the legacy flag is read-only compat (see [`User::is_admin`]).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

/// Review state shared by deposits, withdrawals and task proofs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ReviewStatus::Pending => "pending",
            ReviewStatus::Approved => "approved",
            ReviewStatus::Rejected => "rejected",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// Advertiser-created, awaiting admin activation.
    #[default]
    Pending,
    Active,
    Closed,
    Rejected,
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Active => "active",
            TaskStatus::Closed => "closed",
            TaskStatus::Rejected => "rejected",
        };
        write!(f, "{}", s)
    }
}

/// One-account-per-device heuristic captured at registration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    pub user_agent: String,
    pub platform: String,
}

impl DeviceInfo {
    pub fn new(user_agent: impl Into<String>, platform: impl Into<String>) -> Self {
        Self {
            user_agent: user_agent.into(),
            platform: platform.into(),
        }
    }

    /// Stable fingerprint used by the duplicate-device pre-check.
    pub fn fingerprint(&self) -> String {
        format!("{}|{}", self.user_agent, self.platform)
    }
}

fn default_true() -> bool {
    true
}

/// A user document, keyed in the store by the identity-provider subject.
///
/// The three balances are the only contended shared state in the system;
/// every mutation goes through the store's atomic increment mechanism.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub uid: String,
    pub email: String,
    pub username: String,
    pub referral_code: String,
    #[serde(default)]
    pub role: Role,
    // Legacy flag: deserialized for compat, never written back.
    #[serde(rename = "isAdmin", default, skip_serializing)]
    pub legacy_admin: bool,
    #[serde(default)]
    pub main_balance: Amount,
    #[serde(default)]
    pub referral_balance: Amount,
    #[serde(default)]
    pub locked_balance: Amount,
    #[serde(default)]
    pub total_earned: Amount,
    #[serde(default)]
    pub total_withdrawn: Amount,
    #[serde(default)]
    pub total_deposit: Amount,
    #[serde(default)]
    pub referral_count: u64,
    #[serde(default = "default_true")]
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub last_login: DateTime<Utc>,
    #[serde(default)]
    pub device_info: DeviceInfo,
    /// Flattened copy of the device fingerprint so the one-account-per-device
    /// pre-check can filter on it (the store only filters top-level fields).
    #[serde(default)]
    pub device_fingerprint: String,
}

impl User {
    /// Either the tagged role or the legacy boolean grants admin rights.
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin || self.legacy_admin
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deposit {
    pub user_id: String,
    pub user_email: String,
    pub user_name: String,
    pub method: String,
    pub amount: Amount,
    pub proof_url: String,
    pub deposit_code: String,
    pub status: ReviewStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub approved_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub approved_by: Option<String>,
    #[serde(default)]
    pub rejected_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub rejected_by: Option<String>,
    #[serde(default)]
    pub rejection_reason: Option<String>,
    /// Set on approval to approval time + the configured lock period.
    /// Informational only: nothing reads it back, and no sweep releases
    /// matured funds.
    #[serde(default)]
    pub locked_until: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Withdrawal {
    pub user_id: String,
    pub user_email: String,
    pub user_name: String,
    pub amount: Amount,
    /// Fixed platform fee. The gross `amount` is what leaves `mainBalance`;
    /// `netAmount` is display-only.
    pub fee: Amount,
    pub net_amount: Amount,
    pub method: String,
    pub account_number: String,
    pub withdraw_code: String,
    pub status: ReviewStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub approved_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub approved_by: Option<String>,
    #[serde(default)]
    pub rejected_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub rejected_by: Option<String>,
    #[serde(default)]
    pub rejection_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub title: String,
    pub description: String,
    #[serde(rename = "type")]
    pub task_type: String,
    pub instructions: String,
    #[serde(default)]
    pub link: String,
    /// Per-completion payout, read at proof-approval time.
    pub reward: Amount,
    pub slots: u32,
    /// Remaining slots; decremented on every proof submission, floored at 0.
    pub available_slots: u32,
    pub advertiser_id: String,
    pub advertiser_email: String,
    pub advertiser_name: String,
    pub status: TaskStatus,
    pub is_admin_task: bool,
    #[serde(default)]
    pub estimated_time: String,
    #[serde(default)]
    pub requirements: String,
    pub fee: Amount,
    pub total_cost: Amount,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskProof {
    pub task_id: String,
    pub user_id: String,
    pub user_email: String,
    pub user_name: String,
    pub proof_url: String,
    pub proof_description: String,
    pub status: ReviewStatus,
    /// Zero until approval; the approving admin stamps the task's current
    /// reward here.
    pub reward: Amount,
    pub submitted_at: DateTime<Utc>,
    #[serde(default)]
    pub reviewed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub reviewed_by: Option<String>,
    #[serde(default)]
    pub rejection_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Referral {
    pub referrer_id: String,
    pub referrer_email: String,
    pub referrer_name: String,
    pub referred_user_id: String,
    pub referred_email: String,
    pub referred_username: String,
    pub reward: Amount,
    pub date: DateTime<Utc>,
    pub status: String,
}

/// Moderation audit entry. Append-only; the core never reads these back.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminLog {
    pub admin_id: String,
    pub action: AdminAction,
    pub target_id: String,
    pub details: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AdminAction {
    ApproveDeposit,
    RejectDeposit,
    ApproveWithdrawal,
    RejectWithdrawal,
    ApproveTaskProof,
    RejectTaskProof,
    ActivateTask,
    RejectTask,
    CloseTask,
    CreateAdminTask,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckIn {
    pub user_id: String,
    /// UTC day key, `%Y-%m-%d`.
    pub date: String,
    pub reward: Amount,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn sample_user() -> User {
        User {
            uid: "u-1".into(),
            email: "a@b.c".into(),
            username: "worker".into(),
            referral_code: "AB12CD34".into(),
            role: Role::User,
            legacy_admin: false,
            main_balance: Amount::ZERO,
            referral_balance: Amount::ZERO,
            locked_balance: Amount::ZERO,
            total_earned: Amount::ZERO,
            total_withdrawn: Amount::ZERO,
            total_deposit: Amount::ZERO,
            referral_count: 0,
            is_active: true,
            created_at: Utc::now(),
            last_login: Utc::now(),
            device_info: DeviceInfo::new("agent", "linux"),
            device_fingerprint: "agent|linux".into(),
        }
    }

    #[test]
    fn legacy_admin_flag_is_read_but_never_written() {
        let json = serde_json::json!({
            "uid": "u-2",
            "email": "admin@rs.io",
            "username": "admin",
            "referralCode": "ZZZZ0000",
            "isAdmin": true,
            "createdAt": Utc::now(),
            "lastLogin": Utc::now(),
        });
        let user: User = serde_json::from_value(json).unwrap();
        assert_eq!(user.role, Role::User);
        assert!(user.is_admin());

        let out = serde_json::to_value(&user).unwrap();
        assert!(out.get("isAdmin").is_none());
        assert_eq!(out.get("role").unwrap(), "user");
    }

    #[test]
    fn tagged_role_grants_admin() {
        let mut user = sample_user();
        assert!(!user.is_admin());
        user.role = Role::Admin;
        assert!(user.is_admin());
    }

    #[test]
    fn user_fields_use_wire_names() {
        let out = serde_json::to_value(sample_user()).unwrap();
        assert!(out.get("mainBalance").is_some());
        assert!(out.get("lockedBalance").is_some());
        assert!(out.get("referralBalance").is_some());
        assert!(out.get("totalDeposit").is_some());
        assert_eq!(out["deviceInfo"]["userAgent"], "agent");
    }

    #[test]
    fn admin_action_serializes_camel_case() {
        let v = serde_json::to_value(AdminAction::ApproveDeposit).unwrap();
        assert_eq!(v, "approveDeposit");
    }

    #[test]
    fn missing_balances_default_to_zero() {
        let json = serde_json::json!({
            "uid": "u-3",
            "email": "x@y.z",
            "username": "sparse",
            "referralCode": "AAAA1111",
            "createdAt": Utc::now(),
            "lastLogin": Utc::now(),
        });
        let user: User = serde_json::from_value(json).unwrap();
        assert_eq!(user.main_balance, Amount::ZERO);
        assert!(user.is_active);
    }
}
