use std::{
    fs::{create_dir_all, write},
    net::SocketAddr,
    path::PathBuf,
};

use directories::{ProjectDirs, UserDirs};
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};

use jsonwebtoken::{DecodingKey, EncodingKey};
use log::{debug, info};
use serde::{Deserialize, Deserializer};

use crate::device::biometric::BiometryType;

#[derive(Deserialize, Clone)]
pub struct Config {
    /// The uri to the hosted postgres database
    pub db_uri: String,
    /// the address the admin api should bind to
    pub listen: SocketAddr,
    /// HS256 secret for session tokens
    #[serde(deserialize_with = "deserialize_jwt_secret")]
    pub jwt_secret: (EncodingKey, DecodingKey),
    /// The admin whose profile holds the public contact info
    pub admin_email: String,
    /// Where the device preferences are stored
    #[serde(default)]
    pub preferences_path: Option<PathBuf>,
    /// Where downloaded receipt images end up
    #[serde(default)]
    pub download_dir: Option<PathBuf>,
    #[serde(default)]
    pub biometrics: BiometricsConfig,
    #[serde(default)]
    pub share: ShareConfig,
}

#[derive(Deserialize, Clone, Debug, Default)]
pub struct BiometricsConfig {
    /// External verifier command. Empty means there is no biometric hardware.
    #[serde(default)]
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub kind: Option<BiometryType>,
}

#[derive(Deserialize, Clone, Debug, Default)]
pub struct ShareConfig {
    /// Command used to open wa.me links
    #[serde(default)]
    pub opener: String,
    /// The store name printed on receipts. Without one the receipt has a
    /// generic header.
    #[serde(default)]
    pub store_name: Option<String>,
}

fn project_dirs() -> anyhow::Result<ProjectDirs> {
    ProjectDirs::from("rs", "kasirq", env!("CARGO_CRATE_NAME"))
        .ok_or_else(|| anyhow::anyhow!("cannot build project dir path"))
}

impl Config {
    /// Load the configuration
    ///
    /// The default path is `config.toml` inside the platform config dir.
    /// `KASIRQ_ADMIN_CONFIG` points to another file.
    pub fn load() -> anyhow::Result<Self> {
        let path: PathBuf = match std::env::var("KASIRQ_ADMIN_CONFIG") {
            Ok(path) => path.into(),
            Err(e) => {
                debug!("Cannot read env var for config path: {}", e);
                project_dirs()?.config_dir().join("config.toml")
            }
        };

        // write the sample config to the file only if it does not exist
        if !path.exists() {
            if let Some(parent) = path.parent() {
                create_dir_all(parent)?;
            }
            info!("Creating config with default options at {}", path.display());
            write(&path, include_str!("../../other/config.sample"))?;
        }

        info!("Reading config from {}", path.display());
        Ok(Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed("KASIRQ_ADMIN_"))
            .extract()?)
    }

    /// The file holding the device preferences
    pub fn preferences_path(&self) -> anyhow::Result<PathBuf> {
        match &self.preferences_path {
            Some(path) => Ok(path.clone()),
            None => Ok(project_dirs()?.data_dir().join("preferences.json")),
        }
    }

    /// The directory receipt images are downloaded to
    pub fn download_dir(&self) -> anyhow::Result<PathBuf> {
        if let Some(dir) = &self.download_dir {
            return Ok(dir.clone());
        }
        let user_dirs = UserDirs::new();
        match user_dirs.as_ref().and_then(UserDirs::download_dir) {
            Some(dir) => Ok(dir.to_path_buf()),
            None => Ok(project_dirs()?.data_dir().join("downloads")),
        }
    }
}

fn deserialize_jwt_secret<'de, D>(secret: D) -> Result<(EncodingKey, DecodingKey), D::Error>
where
    D: Deserializer<'de>,
{
    let secret = String::deserialize(secret)?;
    if secret.is_empty() {
        return Err(<D::Error as serde::de::Error>::custom("jwt_secret must not be empty"));
    }
    let encoding_key = EncodingKey::from_secret(secret.as_bytes());
    let decoding_key = DecodingKey::from_secret(secret.as_bytes());
    Ok((encoding_key, decoding_key))
}
