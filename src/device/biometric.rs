//! Biometric gate
//!
//! Asks the platform to verify the user before the saved credentials are used.
use std::{
    env,
    path::{Path, PathBuf},
    process::Command,
};

use async_trait::async_trait;
use log::{debug, error, warn};
use serde::Deserialize;

/// What kind of biometric the device offers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BiometryType {
    None,
    TouchId,
    FaceId,
    Fingerprint,
    Face,
    Iris,
}

/// Icon shown on the biometric login button
pub fn icon(kind: Option<BiometryType>) -> &'static str {
    match kind {
        Some(BiometryType::Fingerprint) => "👆",
        Some(BiometryType::Face) => "😊",
        Some(BiometryType::Iris) => "👁️",
        _ => "🔐",
    }
}

/// Label shown on the biometric login button
pub fn label(kind: Option<BiometryType>) -> &'static str {
    match kind {
        Some(BiometryType::Fingerprint) => "Fingerprint",
        Some(BiometryType::Face) => "Face ID",
        Some(BiometryType::Iris) => "Iris",
        _ => "Biometrik",
    }
}

/// The texts of the platform prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptCopy {
    pub reason: String,
    pub cancel_title: &'static str,
    pub ios_fallback_title: &'static str,
    pub android_title: &'static str,
    pub allow_device_credential: bool,
}

pub const DEFAULT_REASON: &str = "Login ke KasirQ";

impl PromptCopy {
    pub fn new(reason: &str) -> Self {
        Self {
            reason: reason.to_string(),
            cancel_title: "Batal",
            ios_fallback_title: "Gunakan Password",
            android_title: "Verifikasi Biometrik",
            allow_device_credential: true,
        }
    }
}

impl Default for PromptCopy {
    fn default() -> Self {
        Self::new(DEFAULT_REASON)
    }
}

#[async_trait]
pub trait BiometricGate: Send + Sync {
    async fn is_available(&self) -> bool;

    async fn biometry_type(&self) -> Option<BiometryType>;

    /// ``true`` only if the user was verified. Cancelling and failures look the same.
    async fn authenticate(&self, reason: &str) -> bool;
}

/// A host without a biometric runtime
#[derive(Debug, Default, Clone, Copy)]
pub struct HeadlessBiometrics;

#[async_trait]
impl BiometricGate for HeadlessBiometrics {
    async fn is_available(&self) -> bool {
        false
    }

    async fn biometry_type(&self) -> Option<BiometryType> {
        None
    }

    async fn authenticate(&self, _reason: &str) -> bool {
        false
    }
}

/// Verifies through an external command, e.g. ``fprintd-verify``.
///
/// The prompt copy is passed in ``KASIRQ_PROMPT_*`` environment variables.
/// Exit status 0 means verified.
#[derive(Debug, Clone)]
pub struct CommandBiometrics {
    command: PathBuf,
    args: Vec<String>,
    kind: BiometryType,
}

impl CommandBiometrics {
    /// ``None`` if no command is configured
    pub fn new(command: &str, args: Vec<String>, kind: Option<BiometryType>) -> Option<Self> {
        let command = command.trim();
        if command.is_empty() {
            return None;
        }
        Some(Self {
            command: PathBuf::from(command),
            args,
            kind: kind.unwrap_or(BiometryType::Fingerprint),
        })
    }

    /// The executable the command resolves to, looked up in ``PATH`` for bare names
    fn resolve(&self) -> Option<PathBuf> {
        if self.command.components().count() > 1 {
            return self.command.is_file().then(|| self.command.clone());
        }
        let path = env::var_os("PATH")?;
        env::split_paths(&path)
            .map(|dir| dir.join(&self.command))
            .find(|candidate| is_executable(candidate))
    }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

#[async_trait]
impl BiometricGate for CommandBiometrics {
    async fn is_available(&self) -> bool {
        let found = self.resolve().is_some();
        if !found {
            debug!("biometric verifier {} not found", self.command.display());
        }
        found
    }

    async fn biometry_type(&self) -> Option<BiometryType> {
        if self.is_available().await {
            Some(self.kind)
        } else {
            None
        }
    }

    async fn authenticate(&self, reason: &str) -> bool {
        let executable = match self.resolve() {
            Some(executable) => executable,
            None => return false,
        };
        let copy = PromptCopy::new(reason);
        // the verifier owns the terminal until the user is done
        let status = Command::new(&executable)
            .args(&self.args)
            .env("KASIRQ_PROMPT_REASON", &copy.reason)
            .env("KASIRQ_PROMPT_TITLE", copy.android_title)
            .env("KASIRQ_PROMPT_CANCEL", copy.cancel_title)
            .env("KASIRQ_PROMPT_FALLBACK", copy.ios_fallback_title)
            .status();
        match status {
            Ok(status) if status.success() => true,
            Ok(status) => {
                warn!("biometric verification failed: {}", status);
                false
            }
            Err(e) => {
                error!("cannot run {}: {}", executable.display(), e);
                false
            }
        }
    }
}
