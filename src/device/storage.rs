//! Device preferences
//!
//! A string key-value store standing in for the platform preference
//! store, and the typed view the login flow uses on top of it.
use std::{
    collections::BTreeMap,
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const REMEMBER_ME: &str = "kasirq_remember_me";
pub const SAVED_IDENTIFIER: &str = "kasirq_saved_identifier";
pub const BIOMETRIC_ENABLED: &str = "kasirq_biometric_enabled";
pub const SAVED_CREDENTIALS: &str = "kasirq_saved_credentials";
pub const SESSION: &str = "kasirq_session";
pub const CURRENT_STORE: &str = "kasirq_current_store";

/// Every key [``CredentialStore::clear_all``] removes
pub const ALL_KEYS: [&str; 6] = [
    REMEMBER_ME,
    SAVED_IDENTIFIER,
    BIOMETRIC_ENABLED,
    SAVED_CREDENTIALS,
    SESSION,
    CURRENT_STORE,
];

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("cannot access the preference file: {0}")]
    Io(#[from] std::io::Error),
    #[error("the preference file is corrupt: {0}")]
    Json(#[from] serde_json::Error),
}

/// String values only. Each call is atomic on its own, nothing else is.
#[async_trait]
pub trait PreferenceStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    async fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// A JSON object in a file. Every write replaces the whole file.
#[derive(Debug, Clone)]
pub struct FilePreferences {
    path: PathBuf,
}

impl FilePreferences {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<BTreeMap<String, String>, StorageError> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, map: &BTreeMap<String, String>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        // a crash mid-write leaves the old file intact
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(map)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

#[async_trait]
impl PreferenceStore for FilePreferences {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.read()?.remove(key))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut map = self.read()?;
        map.insert(key.to_string(), value.to_string());
        self.write(&map)
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut map = self.read()?;
        if map.remove(key).is_some() {
            self.write(&map)?;
        }
        Ok(())
    }
}

/// The last successful login, kept for biometric login.
///
/// Stored base64 encoded. That hides it from a casual look, nothing more.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredCredentials {
    pub identifier: String,
    pub password: String,
}

impl StoredCredentials {
    fn encode(&self) -> Result<String, StorageError> {
        Ok(STANDARD.encode(serde_json::to_vec(self)?))
    }

    fn decode(value: &str) -> Option<Self> {
        let bytes = STANDARD.decode(value).ok()?;
        serde_json::from_slice(&bytes).ok()
    }
}

/// The login state kept on the device
pub struct CredentialStore<P> {
    prefs: P,
}

impl<P: PreferenceStore> CredentialStore<P> {
    pub fn new(prefs: P) -> Self {
        Self { prefs }
    }

    async fn flag(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.prefs.get(key).await?.as_deref() == Some("true"))
    }

    async fn set_flag(&self, key: &str, value: bool) -> Result<(), StorageError> {
        self.prefs
            .set(key, if value { "true" } else { "false" })
            .await
    }

    pub async fn set_remember_me(&self, enabled: bool) -> Result<(), StorageError> {
        self.set_flag(REMEMBER_ME, enabled).await
    }

    pub async fn remember_me(&self) -> Result<bool, StorageError> {
        self.flag(REMEMBER_ME).await
    }

    pub async fn set_saved_identifier(&self, identifier: &str) -> Result<(), StorageError> {
        self.prefs.set(SAVED_IDENTIFIER, identifier).await
    }

    pub async fn saved_identifier(&self) -> Result<Option<String>, StorageError> {
        self.prefs.get(SAVED_IDENTIFIER).await
    }

    pub async fn set_biometric_enabled(&self, enabled: bool) -> Result<(), StorageError> {
        self.set_flag(BIOMETRIC_ENABLED, enabled).await
    }

    pub async fn biometric_enabled(&self) -> Result<bool, StorageError> {
        self.flag(BIOMETRIC_ENABLED).await
    }

    pub async fn save_credentials(
        &self,
        identifier: &str,
        password: &str,
    ) -> Result<(), StorageError> {
        let credentials = StoredCredentials {
            identifier: identifier.to_string(),
            password: password.to_string(),
        };
        self.prefs
            .set(SAVED_CREDENTIALS, &credentials.encode()?)
            .await
    }

    /// ``None`` if nothing is saved or the saved value can't be decoded
    pub async fn credentials(&self) -> Result<Option<StoredCredentials>, StorageError> {
        let value = self.prefs.get(SAVED_CREDENTIALS).await?;
        let credentials = value.as_deref().and_then(StoredCredentials::decode);
        if value.is_some() && credentials.is_none() {
            debug!("saved credentials are not decodable, ignoring them");
        }
        Ok(credentials)
    }

    /// The access token of the last login
    pub async fn set_session(&self, access_token: &str) -> Result<(), StorageError> {
        self.prefs.set(SESSION, access_token).await
    }

    pub async fn session(&self) -> Result<Option<String>, StorageError> {
        self.prefs.get(SESSION).await
    }

    pub async fn set_current_store(&self, store_id: &str) -> Result<(), StorageError> {
        self.prefs.set(CURRENT_STORE, store_id).await
    }

    pub async fn current_store(&self) -> Result<Option<String>, StorageError> {
        self.prefs.get(CURRENT_STORE).await
    }

    pub async fn clear_all(&self) -> Result<(), StorageError> {
        for key in ALL_KEYS {
            self.prefs.remove(key).await?;
        }
        Ok(())
    }
}
