use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::identity::IdentityProvider;
use crate::users::{apply_delta, load_user};
use chrono::Utc;
use rand::Rng;
use rewardshare_ledger::BalanceDelta;
use rewardshare_store::{collections, from_record, to_record, Filter, RecordStore, Update};
use rewardshare_types::constants::{CHECKIN_REWARD, REFERRAL_CODE_LEN, REFERRAL_REWARD};
use rewardshare_types::{Amount, CheckIn, DeviceInfo, Referral, Role, User};
use std::sync::Arc;
use tracing::{info, warn};

const REFERRAL_CODE_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

pub(crate) fn generate_referral_code() -> String {
    let mut rng = rand::thread_rng();
    (0..REFERRAL_CODE_LEN)
        .map(|_| {
            let idx = rng.gen_range(0..REFERRAL_CODE_CHARSET.len());
            REFERRAL_CODE_CHARSET[idx] as char
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct RegistrationRequest {
    pub email: String,
    pub username: String,
    pub password: String,
    pub confirm_password: String,
    pub referral_code: Option<String>,
    pub device: DeviceInfo,
}

/// Registration, login routing and the daily check-in bonus.
pub struct AccountManager {
    store: Arc<dyn RecordStore>,
    identity: Arc<dyn IdentityProvider>,
    config: Arc<EngineConfig>,
}

impl AccountManager {
    pub fn new(
        store: Arc<dyn RecordStore>,
        identity: Arc<dyn IdentityProvider>,
        config: Arc<EngineConfig>,
    ) -> Self {
        Self {
            store,
            identity,
            config,
        }
    }

    /// Create the identity-provider account and the user document, then
    /// credit the referrer if a valid code was supplied. Referral failures
    /// are logged and swallowed: registration must not fail because of them.
    pub async fn register(&self, request: RegistrationRequest) -> Result<User> {
        let email = request.email.trim().to_string();
        let username = request.username.trim().to_string();
        let referral_code = request
            .referral_code
            .as_deref()
            .map(|c| c.trim().to_uppercase())
            .filter(|c| !c.is_empty());

        validate_registration(&email, &username, &request.password, &request.confirm_password)?;

        // Pre-check uniqueness. These are advisory queries, not constraints:
        // two concurrent registrations can both pass them.
        if !self
            .store
            .query(collections::USERS, &[Filter::eq("email", email.clone())], None, Some(1))
            .await?
            .is_empty()
        {
            return Err(EngineError::Duplicate("email already registered".into()));
        }

        if !self
            .store
            .query(
                collections::USERS,
                &[Filter::eq("username", username.clone())],
                None,
                Some(1),
            )
            .await?
            .is_empty()
        {
            return Err(EngineError::Duplicate("username already taken".into()));
        }

        let fingerprint = request.device.fingerprint();
        if self.config.registration.enforce_device_policy
            && !self
                .store
                .query(
                    collections::USERS,
                    &[Filter::eq("deviceFingerprint", fingerprint.clone())],
                    None,
                    Some(1),
                )
                .await?
                .is_empty()
        {
            return Err(EngineError::Duplicate(
                "an account already exists on this device".into(),
            ));
        }

        let identity = self.identity.sign_up(&email, &request.password).await?;
        let now = Utc::now();

        let user = User {
            uid: identity.uid.clone(),
            email: email.clone(),
            username: username.clone(),
            // Uniqueness of generated codes is assumed, not checked.
            referral_code: generate_referral_code(),
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
            created_at: now,
            last_login: now,
            device_info: request.device,
            device_fingerprint: fingerprint,
        };

        self.store
            .create_with_id(collections::USERS, &identity.uid, to_record(&user)?)
            .await?;

        info!(user = %identity.uid, %username, "user registered");

        if let Some(code) = referral_code {
            if let Err(e) = self.credit_referrer(&code, &user).await {
                warn!(user = %identity.uid, code = %code, error = %e, "referral credit failed");
            }
        }

        Ok(user)
    }

    /// Resolve a referral code and apply the one-time credit. An unknown
    /// code is a no-op, not an error.
    async fn credit_referrer(&self, code: &str, referred: &User) -> Result<()> {
        let mut matches = self
            .store
            .query(
                collections::USERS,
                &[Filter::eq("referralCode", code)],
                None,
                Some(1),
            )
            .await?;

        let Some((referrer_id, record)) = matches.pop() else {
            return Ok(());
        };
        let referrer: User = from_record(record)?;

        apply_delta(self.store.as_ref(), &referrer_id, &BalanceDelta::referral_credit()).await?;

        let referral = Referral {
            referrer_id: referrer_id.clone(),
            referrer_email: referrer.email,
            referrer_name: referrer.username,
            referred_user_id: referred.uid.clone(),
            referred_email: referred.email.clone(),
            referred_username: referred.username.clone(),
            reward: REFERRAL_REWARD,
            date: Utc::now(),
            status: "completed".to_string(),
        };
        self.store
            .create(collections::REFERRALS, to_record(&referral)?)
            .await?;

        info!(referrer = %referral.referrer_id, referred = %referral.referred_user_id, "referral credited");
        Ok(())
    }

    /// Sign in and load the user document. A session whose document is
    /// missing is signed back out rather than left half-usable.
    pub async fn login(&self, email: &str, password: &str) -> Result<User> {
        let identity = self.identity.sign_in(email, password).await?;

        let user = match load_user(self.store.as_ref(), &identity.uid).await {
            Ok(user) => user,
            Err(e @ EngineError::NotFound { .. }) => {
                self.identity.sign_out().await?;
                return Err(e);
            }
            Err(e) => return Err(e),
        };

        self.store
            .update(
                collections::USERS,
                &identity.uid,
                Update::new().set("lastLogin", serde_json::json!(Utc::now())),
            )
            .await?;

        info!(user = %identity.uid, admin = user.is_admin(), "user logged in");
        Ok(user)
    }

    /// Daily check-in bonus, at most once per UTC day.
    pub async fn check_in(&self, user_id: &str) -> Result<Amount> {
        load_user(self.store.as_ref(), user_id).await?;

        let today = Utc::now().format("%Y-%m-%d").to_string();
        let already = self
            .store
            .count(
                collections::CHECKINS,
                &[
                    Filter::eq("userId", user_id),
                    Filter::eq("date", today.clone()),
                ],
            )
            .await?;
        if already > 0 {
            return Err(EngineError::AlreadyProcessed {
                collection: collections::CHECKINS,
                id: format!("{}:{}", user_id, today),
            });
        }

        apply_delta(self.store.as_ref(), user_id, &BalanceDelta::check_in_credit()).await?;

        let check_in = CheckIn {
            user_id: user_id.to_string(),
            date: today,
            reward: CHECKIN_REWARD,
            timestamp: Utc::now(),
        };
        self.store
            .create(collections::CHECKINS, to_record(&check_in)?)
            .await?;

        info!(user = %user_id, "daily check-in credited");
        Ok(CHECKIN_REWARD)
    }
}

fn validate_registration(
    email: &str,
    username: &str,
    password: &str,
    confirm_password: &str,
) -> Result<()> {
    if email.is_empty() || username.is_empty() || password.is_empty() {
        return Err(EngineError::Validation("all fields are required".into()));
    }
    if !email.contains('@') {
        return Err(EngineError::Validation("invalid email format".into()));
    }
    if password.len() < 6 {
        return Err(EngineError::Validation(
            "password must be at least 6 characters".into(),
        ));
    }
    if password != confirm_password {
        return Err(EngineError::Validation("passwords do not match".into()));
    }
    if username.len() < 3 {
        return Err(EngineError::Validation(
            "username must be at least 3 characters".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn referral_codes_are_eight_uppercase_alphanumerics() {
        for _ in 0..32 {
            let code = generate_referral_code();
            assert_eq!(code.len(), 8);
            assert!(code
                .bytes()
                .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit()));
        }
    }

    #[test]
    fn registration_validation_matrix() {
        let ok = validate_registration("a@b.c", "worker", "secret1", "secret1");
        assert!(ok.is_ok());

        for (email, username, password, confirm) in [
            ("", "worker", "secret1", "secret1"),
            ("a@b.c", "", "secret1", "secret1"),
            ("a@b.c", "worker", "", ""),
            ("not-an-email", "worker", "secret1", "secret1"),
            ("a@b.c", "worker", "12345", "12345"),
            ("a@b.c", "worker", "secret1", "secret2"),
            ("a@b.c", "ab", "secret1", "secret1"),
        ] {
            assert!(
                validate_registration(email, username, password, confirm).is_err(),
                "expected rejection for {email}/{username}"
            );
        }
    }
}
