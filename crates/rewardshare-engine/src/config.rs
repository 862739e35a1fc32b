use anyhow::{Context, Result};
use rewardshare_types::constants;
use rewardshare_types::Amount;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Engine tunables. Every field has a platform default; deployments override
/// via a TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub deposits: DepositConfig,
    pub withdrawals: WithdrawalConfig,
    pub tasks: TaskConfig,
    pub identity: IdentityConfig,
    pub uploads: UploadConfig,
    pub registration: RegistrationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DepositConfig {
    pub minimum: Amount,
    /// Days an approved deposit is nominally locked for (`lockedUntil`).
    pub lock_days: i64,
}

impl Default for DepositConfig {
    fn default() -> Self {
        Self {
            minimum: constants::MIN_DEPOSIT,
            lock_days: constants::DEPOSIT_LOCK_DAYS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WithdrawalConfig {
    pub fee: Amount,
}

impl Default for WithdrawalConfig {
    fn default() -> Self {
        Self {
            fee: constants::WITHDRAWAL_FEE,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskConfig {
    pub min_reward: Amount,
    pub min_slots: u32,
    pub max_slots: u32,
    /// Cumulative deposits required before a user may create tasks.
    pub advertiser_min_deposit: Amount,
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self {
            min_reward: constants::MIN_TASK_REWARD,
            min_slots: constants::MIN_TASK_SLOTS,
            max_slots: constants::MAX_TASK_SLOTS,
            advertiser_min_deposit: constants::ADVERTISER_MIN_DEPOSIT,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    /// Bound on the wait for the provider's first identity notification.
    pub init_timeout_ms: u64,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            init_timeout_ms: 1_500,
        }
    }
}

impl IdentityConfig {
    pub fn init_timeout(&self) -> Duration {
        Duration::from_millis(self.init_timeout_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    pub max_bytes: u64,
    pub allowed_types: Vec<String>,
    pub endpoint: String,
    pub api_key: String,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_bytes: 5 * 1024 * 1024,
            allowed_types: vec![
                "image/jpeg".to_string(),
                "image/png".to_string(),
                "image/gif".to_string(),
            ],
            endpoint: "https://api.imgg.com/1/upload".to_string(),
            api_key: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrationConfig {
    /// One-account-per-device pre-check (advisory, same strength as the
    /// email/username pre-checks).
    pub enforce_device_policy: bool,
}

impl Default for RegistrationConfig {
    fn default() -> Self {
        Self {
            enforce_device_policy: true,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            deposits: DepositConfig::default(),
            withdrawals: WithdrawalConfig::default(),
            tasks: TaskConfig::default(),
            identity: IdentityConfig::default(),
            uploads: UploadConfig::default(),
            registration: RegistrationConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let config: Self = toml::from_str(&raw)
            .with_context(|| format!("failed to parse config file: {}", path.display()))?;
        info!(path = %path.display(), "engine config loaded");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_platform_constants() {
        let config = EngineConfig::default();
        assert_eq!(config.deposits.minimum, Amount::from_rupiah(30_000));
        assert_eq!(config.withdrawals.fee, Amount::from_rupiah(2_000));
        assert_eq!(config.tasks.advertiser_min_deposit, Amount::from_rupiah(50_000));
        assert_eq!(config.identity.init_timeout(), Duration::from_millis(1_500));
        assert!(config.registration.enforce_device_policy);
    }

    #[test]
    fn partial_toml_overrides_merge_with_defaults() {
        let config: EngineConfig = toml::from_str(
            r#"
            [deposits]
            minimum = 10000

            [identity]
            init_timeout_ms = 2000
            "#,
        )
        .unwrap();
        assert_eq!(config.deposits.minimum, Amount::from_rupiah(10_000));
        assert_eq!(config.deposits.lock_days, 3);
        assert_eq!(config.identity.init_timeout_ms, 2_000);
        assert_eq!(config.tasks.max_slots, 100);
    }
}
