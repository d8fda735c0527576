//! In-memory stand-ins for the backend and the device
use std::{
    collections::{BTreeMap, HashSet},
    path::PathBuf,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey};
use uuid::Uuid;

use crate::{
    auth::{token::TokenPair, Session},
    backend::{
        AdminContacts, Approval, AuthUser, Backend, BackendError, Role, SignUpRequest, SignedIn,
        Store, UserProfile,
    },
    device::{
        biometric::{BiometricGate, BiometryType},
        storage::{PreferenceStore, StorageError},
    },
    receipt::{
        Receipt, ReceiptItem, ReceiptRenderer, RenderedImage, ShareError, ShareTarget,
    },
};

pub const SECRET: &[u8] = b"test-secret";

pub fn decoding_key() -> DecodingKey {
    DecodingKey::from_secret(SECRET)
}

struct Account {
    id: Uuid,
    email: String,
    password: String,
    confirmed: bool,
}

#[derive(Default)]
struct State {
    accounts: Vec<Account>,
    profiles: Vec<UserProfile>,
    roles: Vec<(Uuid, Role)>,
    stores: Vec<(Uuid, Store)>,
    contacts: BTreeMap<Uuid, AdminContacts>,
    calls: Vec<String>,
    role_failure: Option<fn() -> BackendError>,
    auth_delete_fails: bool,
}

/// Keeps accounts, profiles, roles and stores in memory and records every call
pub struct MemoryBackend {
    state: Mutex<State>,
    key: EncodingKey,
    created: AtomicUsize,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            key: EncodingKey::from_secret(SECRET),
            created: AtomicUsize::new(0),
        }
    }

    /// Later users are newer
    fn next_created_at(&self) -> DateTime<Utc> {
        let n = self.created.fetch_add(1, Ordering::SeqCst) as i64;
        Utc.with_ymd_and_hms(2026, 1, 1, 8, 0, 0).unwrap() + Duration::minutes(n)
    }

    /// Adds a confirmed account with a profile
    pub fn with_user(&self, email: &str, username: &str, password: &str, approved: bool) -> Uuid {
        let id = Uuid::new_v4();
        let created_at = self.next_created_at();
        let mut state = self.state.lock().unwrap();
        state.accounts.push(Account {
            id,
            email: email.to_string(),
            password: password.to_string(),
            confirmed: true,
        });
        state.profiles.push(UserProfile {
            user_id: id,
            email: email.to_string(),
            username: username.to_string(),
            whatsapp: Some("6281234567890".to_string()),
            is_approved: approved,
            created_at,
            approved_at: approved.then(|| created_at),
            approved_by: None,
        });
        if approved {
            state.roles.push((id, Role::User));
        }
        id
    }

    pub fn with_admin(&self, email: &str) -> Uuid {
        let id = self.with_user(email, "admin", "admin-password", true);
        self.state.lock().unwrap().roles.push((id, Role::Admin));
        id
    }

    pub fn unconfirm(&self, user_id: Uuid) {
        let mut state = self.state.lock().unwrap();
        for account in state.accounts.iter_mut().filter(|a| a.id == user_id) {
            account.confirmed = false;
        }
    }

    pub fn with_store(&self, owner: Uuid, name: &str) -> Store {
        let store = Store {
            id: Uuid::new_v4(),
            name: name.to_string(),
        };
        self.state
            .lock()
            .unwrap()
            .stores
            .push((owner, store.clone()));
        store
    }

    pub fn with_contacts(&self, user_id: Uuid, whatsapp: &str, instagram: &str) {
        self.state.lock().unwrap().contacts.insert(
            user_id,
            AdminContacts {
                admin_whatsapp: Some(whatsapp.to_string()),
                admin_instagram: Some(instagram.to_string()),
            },
        );
    }

    /// Role inserts fail with the given error from now on
    pub fn fail_role_insert(&self, error: fn() -> BackendError) {
        self.state.lock().unwrap().role_failure = Some(error);
    }

    pub fn fail_auth_delete(&self) {
        self.state.lock().unwrap().auth_delete_fails = true;
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn profile_of(&self, user_id: Uuid) -> Option<UserProfile> {
        self.state
            .lock()
            .unwrap()
            .profiles
            .iter()
            .find(|p| p.user_id == user_id)
            .cloned()
    }

    pub fn roles_of(&self, user_id: Uuid) -> Vec<Role> {
        self.state
            .lock()
            .unwrap()
            .roles
            .iter()
            .filter(|(id, _)| *id == user_id)
            .map(|(_, role)| *role)
            .collect()
    }

    pub fn has_account(&self, user_id: Uuid) -> bool {
        self.state
            .lock()
            .unwrap()
            .accounts
            .iter()
            .any(|a| a.id == user_id)
    }

    fn record(&self, call: String) {
        self.state.lock().unwrap().calls.push(call);
    }

    fn check_login(
        &self,
        email: &str,
        password: &str,
        remember_me: bool,
    ) -> Result<SignedIn, BackendError> {
        let state = self.state.lock().unwrap();
        let account = state
            .accounts
            .iter()
            .find(|a| a.email.eq_ignore_ascii_case(email) && a.password == password)
            .ok_or(BackendError::InvalidCredentials)?;
        if !account.confirmed {
            return Err(BackendError::EmailNotConfirmed);
        }
        let approved = state
            .profiles
            .iter()
            .any(|p| p.user_id == account.id && p.is_approved);
        if !approved {
            return Err(BackendError::AwaitingApproval);
        }
        let session = Session::new(account.id, remember_me, Utc::now());
        Ok(SignedIn {
            user: AuthUser {
                id: account.id,
                email: account.email.clone(),
            },
            tokens: TokenPair::new(session, &self.key)?,
        })
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn sign_in_with_email(
        &self,
        email: &str,
        password: &str,
        remember_me: bool,
    ) -> Result<SignedIn, BackendError> {
        self.record(format!("sign_in_with_email {} {}", email, remember_me));
        self.check_login(email, password, remember_me)
    }

    async fn sign_in_with_username(
        &self,
        username: &str,
        password: &str,
        remember_me: bool,
    ) -> Result<SignedIn, BackendError> {
        self.record(format!("sign_in_with_username {} {}", username, remember_me));
        let email = self
            .state
            .lock()
            .unwrap()
            .profiles
            .iter()
            .find(|p| p.username.eq_ignore_ascii_case(username))
            .map(|p| p.email.clone())
            .ok_or(BackendError::UnknownUsername)?;
        self.check_login(&email, password, remember_me)
    }

    async fn sign_up(&self, request: &SignUpRequest) -> Result<UserProfile, BackendError> {
        self.record(format!("sign_up {}", request.username));
        let created_at = self.next_created_at();
        let mut state = self.state.lock().unwrap();
        let taken = state.profiles.iter().any(|p| {
            p.email.eq_ignore_ascii_case(&request.email)
                || p.username.eq_ignore_ascii_case(&request.username)
        });
        if taken {
            return Err(BackendError::AlreadyRegistered);
        }
        let id = Uuid::new_v4();
        state.accounts.push(Account {
            id,
            email: request.email.clone(),
            password: request.password.clone(),
            confirmed: true,
        });
        let profile = UserProfile {
            user_id: id,
            email: request.email.clone(),
            username: request.username.clone(),
            whatsapp: Some(request.whatsapp.clone()),
            is_approved: false,
            created_at,
            approved_at: None,
            approved_by: None,
        };
        state.profiles.push(profile.clone());
        Ok(profile)
    }

    async fn list_profiles(&self) -> Result<Vec<UserProfile>, BackendError> {
        self.record("list_profiles".to_string());
        let mut profiles = self.state.lock().unwrap().profiles.clone();
        profiles.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(profiles)
    }

    async fn profile(&self, user_id: Uuid) -> Result<Option<UserProfile>, BackendError> {
        Ok(self.profile_of(user_id))
    }

    async fn update_approval(
        &self,
        user_id: Uuid,
        approval: Option<Approval>,
    ) -> Result<(), BackendError> {
        self.record(format!("update_approval {}", user_id));
        let mut state = self.state.lock().unwrap();
        let profile = state
            .profiles
            .iter_mut()
            .find(|p| p.user_id == user_id)
            .ok_or(BackendError::NotFound)?;
        profile.is_approved = approval.is_some();
        profile.approved_by = approval.map(|a| a.by);
        profile.approved_at = approval.map(|a| a.at);
        Ok(())
    }

    async fn insert_role(&self, user_id: Uuid, role: Role) -> Result<(), BackendError> {
        self.record(format!("insert_role {} {}", user_id, role.as_str()));
        let mut state = self.state.lock().unwrap();
        if let Some(error) = state.role_failure {
            return Err(error());
        }
        if state.roles.contains(&(user_id, role)) {
            return Err(BackendError::Duplicate);
        }
        state.roles.push((user_id, role));
        Ok(())
    }

    async fn roles(&self, user_id: Uuid) -> Result<Vec<Role>, BackendError> {
        Ok(self.roles_of(user_id))
    }

    async fn delete_profile(&self, user_id: Uuid) -> Result<(), BackendError> {
        self.record(format!("delete_profile {}", user_id));
        let mut state = self.state.lock().unwrap();
        let before = state.profiles.len();
        state.profiles.retain(|p| p.user_id != user_id);
        if state.profiles.len() == before {
            return Err(BackendError::NotFound);
        }
        Ok(())
    }

    async fn delete_auth_user(&self, user_id: Uuid) -> Result<(), BackendError> {
        self.record(format!("delete_auth_user {}", user_id));
        let mut state = self.state.lock().unwrap();
        if state.auth_delete_fails {
            return Err(BackendError::Other("user not allowed".to_string()));
        }
        state.accounts.retain(|a| a.id != user_id);
        Ok(())
    }

    async fn admin_contacts(&self, user_id: Uuid) -> Result<AdminContacts, BackendError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .contacts
            .get(&user_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn admin_contacts_by_email(&self, email: &str) -> Result<AdminContacts, BackendError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .profiles
            .iter()
            .find(|p| p.email.eq_ignore_ascii_case(email))
            .and_then(|p| state.contacts.get(&p.user_id))
            .cloned()
            .unwrap_or_default())
    }

    async fn save_admin_contacts(
        &self,
        user_id: Uuid,
        contacts: &AdminContacts,
    ) -> Result<(), BackendError> {
        self.record(format!("save_admin_contacts {}", user_id));
        self.state
            .lock()
            .unwrap()
            .contacts
            .insert(user_id, contacts.clone());
        Ok(())
    }

    async fn stores(&self, user_id: Uuid) -> Result<Vec<Store>, BackendError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .stores
            .iter()
            .filter(|(owner, _)| *owner == user_id)
            .map(|(_, store)| store.clone())
            .collect())
    }
}

/// Preferences in a shared map. Clones see the same values.
#[derive(Clone, Default)]
pub struct MemoryPreferences {
    values: Arc<Mutex<BTreeMap<String, String>>>,
    failing: Arc<Mutex<HashSet<String>>>,
}

impl MemoryPreferences {
    pub fn value(&self, key: &str) -> Option<String> {
        self.values.lock().unwrap().get(key).cloned()
    }

    pub fn insert(&self, key: &str, value: &str) {
        self.values
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
    }

    pub fn is_empty(&self) -> bool {
        self.values.lock().unwrap().is_empty()
    }

    /// Writes to ``key`` fail from now on
    pub fn fail_writes_to(&self, key: &str) {
        self.failing.lock().unwrap().insert(key.to_string());
    }
}

#[async_trait]
impl PreferenceStore for MemoryPreferences {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.value(key))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        if self.failing.lock().unwrap().contains(key) {
            return Err(StorageError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "read-only",
            )));
        }
        self.insert(key, value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.values.lock().unwrap().remove(key);
        Ok(())
    }
}

/// Answers the prompt the way it is told to and counts the prompts
#[derive(Clone)]
pub struct ScriptedBiometrics {
    pub available: bool,
    pub kind: Option<BiometryType>,
    pub verifies: bool,
    pub prompts: Arc<AtomicUsize>,
}

impl ScriptedBiometrics {
    pub fn available(verifies: bool) -> Self {
        Self {
            available: true,
            kind: Some(BiometryType::Fingerprint),
            verifies,
            prompts: Arc::default(),
        }
    }

    pub fn unavailable() -> Self {
        Self {
            available: false,
            kind: None,
            verifies: false,
            prompts: Arc::default(),
        }
    }
}

#[async_trait]
impl BiometricGate for ScriptedBiometrics {
    async fn is_available(&self) -> bool {
        self.available
    }

    async fn biometry_type(&self) -> Option<BiometryType> {
        self.kind
    }

    async fn authenticate(&self, _reason: &str) -> bool {
        self.prompts.fetch_add(1, Ordering::SeqCst);
        self.available && self.verifies
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShareEvent {
    Shared(String),
    Downloaded(String),
    Opened(String),
}

/// Records what a receipt share did
#[derive(Default)]
pub struct RecordingShareTarget {
    pub can_share: bool,
    pub share_fails: bool,
    pub events: Mutex<Vec<ShareEvent>>,
}

impl RecordingShareTarget {
    pub fn events(&self) -> Vec<ShareEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl ShareTarget for RecordingShareTarget {
    fn can_share_files(&self) -> bool {
        self.can_share
    }

    fn share_file(&self, image: &RenderedImage, _: &str, _: &str) -> Result<(), ShareError> {
        if self.share_fails {
            return Err(ShareError::Unsupported);
        }
        self.events
            .lock()
            .unwrap()
            .push(ShareEvent::Shared(image.file_name.clone()));
        Ok(())
    }

    fn download(&self, image: &RenderedImage) -> Result<PathBuf, ShareError> {
        self.events
            .lock()
            .unwrap()
            .push(ShareEvent::Downloaded(image.file_name.clone()));
        Ok(PathBuf::from("/downloads").join(&image.file_name))
    }

    fn open_url(&self, url: &str) -> Result<(), ShareError> {
        self.events
            .lock()
            .unwrap()
            .push(ShareEvent::Opened(url.to_string()));
        Ok(())
    }
}

pub struct FailingRenderer;

impl ReceiptRenderer for FailingRenderer {
    fn render(&self, _: &Receipt, _: Option<&str>) -> Result<RenderedImage, ShareError> {
        Err(ShareError::Render("no canvas".to_string()))
    }
}

pub fn receipt() -> Receipt {
    Receipt {
        id: "TRX-001".to_string(),
        timestamp: chrono::DateTime::parse_from_rfc3339("2026-10-19T14:05:09+07:00").unwrap(),
        items: vec![
            ReceiptItem {
                name: "Kopi Susu".to_string(),
                quantity: 2,
                sell_price: 15000,
                final_price: None,
            },
            ReceiptItem {
                name: "Roti Bakar".to_string(),
                quantity: 1,
                sell_price: 12000,
                final_price: Some(10000),
            },
        ],
        subtotal: 40000,
        discount: 5000,
        total: 35000,
    }
}
