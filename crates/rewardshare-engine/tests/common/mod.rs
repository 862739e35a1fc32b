#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use rewardshare_engine::{
    logging, Engine, EngineConfig, EngineError, Identity, IdentityProvider, ImageHost, ProofImage,
    Result,
};
use rewardshare_store::{collections, from_record, to_record, MemoryStore, RecordStore};
use rewardshare_types::{Amount, DeviceInfo, Role, User};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;

/// In-process identity provider: accounts live in a map, the current session
/// in a mutex, and every change is published on the watch channel.
pub struct FakeIdentityProvider {
    accounts: Mutex<HashMap<String, (String, Identity)>>,
    current: Mutex<Option<Identity>>,
    tx: watch::Sender<Option<Identity>>,
    next: AtomicUsize,
}

impl FakeIdentityProvider {
    pub fn new() -> Arc<Self> {
        let (tx, _) = watch::channel(None);
        Arc::new(Self {
            accounts: Mutex::new(HashMap::new()),
            current: Mutex::new(None),
            tx,
            next: AtomicUsize::new(1),
        })
    }

    fn set_current(&self, identity: Option<Identity>) {
        *self.current.lock().unwrap() = identity.clone();
        let _ = self.tx.send(identity);
    }
}

#[async_trait]
impl IdentityProvider for FakeIdentityProvider {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity> {
        let accounts = self.accounts.lock().unwrap();
        match accounts.get(email) {
            Some((stored, identity)) if stored == password => {
                let identity = identity.clone();
                drop(accounts);
                self.set_current(Some(identity.clone()));
                Ok(identity)
            }
            _ => Err(EngineError::Identity("invalid credentials".into())),
        }
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<Identity> {
        let mut accounts = self.accounts.lock().unwrap();
        if accounts.contains_key(email) {
            return Err(EngineError::Identity("email already in use".into()));
        }
        let n = self.next.fetch_add(1, Ordering::SeqCst);
        let identity = Identity {
            uid: format!("uid-{n}"),
            email: email.to_string(),
        };
        accounts.insert(email.to_string(), (password.to_string(), identity.clone()));
        drop(accounts);
        self.set_current(Some(identity.clone()));
        Ok(identity)
    }

    async fn sign_out(&self) -> Result<()> {
        self.set_current(None);
        Ok(())
    }

    fn current(&self) -> Option<Identity> {
        self.current.lock().unwrap().clone()
    }

    fn updates(&self) -> watch::Receiver<Option<Identity>> {
        self.tx.subscribe()
    }
}

/// Image host that never leaves the process.
pub struct FakeImageHost {
    uploads: AtomicUsize,
}

impl FakeImageHost {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            uploads: AtomicUsize::new(0),
        })
    }

    pub fn upload_count(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ImageHost for FakeImageHost {
    async fn upload(&self, _image: &ProofImage) -> Result<String> {
        let n = self.uploads.fetch_add(1, Ordering::SeqCst);
        Ok(format!("https://i.imgg.com/proof-{n}.jpg"))
    }
}

pub struct TestEnv {
    pub engine: Engine,
    pub store: Arc<MemoryStore>,
    pub identity: Arc<FakeIdentityProvider>,
    pub uploads: Arc<FakeImageHost>,
}

pub fn test_env() -> TestEnv {
    logging::init();
    let store = Arc::new(MemoryStore::new());
    let identity = FakeIdentityProvider::new();
    let uploads = FakeImageHost::new();
    let engine = Engine::new(
        store.clone(),
        identity.clone(),
        uploads.clone(),
        EngineConfig::default(),
    );
    TestEnv {
        engine,
        store,
        identity,
        uploads,
    }
}

pub fn base_user(uid: &str) -> User {
    let now = Utc::now();
    User {
        uid: uid.to_string(),
        email: format!("{uid}@rewardshare.test"),
        username: format!("user-{uid}"),
        referral_code: format!("CODE{:0>4}", &uid[uid.len().saturating_sub(4)..]),
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
        device_info: DeviceInfo::new("test-agent", "test-platform"),
        device_fingerprint: format!("test-agent|{uid}"),
    }
}

/// Seed a user document directly, bypassing registration.
pub async fn seed_user(store: &dyn RecordStore, uid: &str, tweak: impl FnOnce(&mut User)) -> User {
    let mut user = base_user(uid);
    tweak(&mut user);
    store
        .create_with_id(collections::USERS, uid, to_record(&user).unwrap())
        .await
        .unwrap();
    user
}

pub async fn seed_admin(store: &dyn RecordStore, uid: &str) -> User {
    seed_user(store, uid, |u| {
        u.role = Role::Admin;
        u.username = format!("admin-{uid}");
    })
    .await
}

pub async fn read_user(store: &dyn RecordStore, uid: &str) -> User {
    from_record(
        store
            .get(collections::USERS, uid)
            .await
            .unwrap()
            .expect("user record"),
    )
    .unwrap()
}

pub fn proof_image() -> ProofImage {
    ProofImage {
        file_name: "proof.jpg".into(),
        content_type: "image/jpeg".into(),
        bytes: vec![0xFF; 2048],
    }
}

pub fn rp(v: u64) -> Amount {
    Amount::from_rupiah(v)
}
