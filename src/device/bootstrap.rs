//! Session bootstrap
//!
//! Everything between pressing "login" and landing on the dashboard:
//! sign in, biometric enrollment, saving the session and picking a store.
use std::sync::Arc;

use log::{debug, error, info, warn};

use super::{
    biometric::{BiometricGate, BiometryType, DEFAULT_REASON},
    storage::{CredentialStore, PreferenceStore, StorageError},
};
use crate::{
    auth::{
        signup::{SignUpForm, ValidationError},
        token::TokenPair,
        AuthMethod,
    },
    backend::{Backend, BackendError, SignedIn, Store},
};

pub const LOGIN_ERROR: &str = "Terjadi kesalahan saat login";
pub const MISSING_CREDENTIALS: &str = "Kredensial tidak ditemukan";
pub const LOGIN_FAILED: &str = "Login gagal";
pub const SIGN_UP_FAILED: &str = "Pendaftaran gagal";

/// Where a finished login lands
#[derive(Debug)]
pub enum Outcome {
    /// Reload into the app with the new session
    Redirect(Redirect),
    /// The account exists but is not approved yet
    WaitingApproval,
    /// The user dismissed the biometric prompt
    Cancelled,
    /// Stay on the login page and show ``message``
    Failed { message: String },
}

impl Outcome {
    fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
        }
    }
}

#[derive(Debug)]
pub struct Redirect {
    pub tokens: TokenPair,
    pub destination: Destination,
    pub enrollment: Enrollment,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    Dashboard(Store),
    /// The user has no store yet and has to create one
    SelectStore,
}

/// What happened to the saved login after a successful sign in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Enrollment {
    /// Biometric login was switched on and the credentials saved
    Enrolled,
    /// Biometric login was already on, the saved credentials were replaced
    Refreshed,
    /// No biometric hardware, only the identifier is remembered
    IdentifierOnly,
    Unchanged,
    /// Switching on biometric login failed, the login itself went through
    Failed,
}

/// Biometric login is switched on for a remembered login on capable hardware
/// the first time. Later remembered logins keep the saved credentials fresh.
pub fn decide_enrollment(remember_me: bool, available: bool, enabled: bool) -> Enrollment {
    match (remember_me, available, enabled) {
        (false, _, _) => Enrollment::Unchanged,
        (true, true, false) => Enrollment::Enrolled,
        (true, _, true) => Enrollment::Refreshed,
        (true, false, false) => Enrollment::IdentifierOnly,
    }
}

/// What the login page is pre-filled with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginForm {
    pub biometric_available: bool,
    pub biometric_enabled: bool,
    pub biometry_type: Option<BiometryType>,
    pub remember_me: bool,
    /// The last identifier, only when remember-me is on
    pub identifier: Option<String>,
}

/// The pre-filled login page. Needs no backend.
pub async fn login_form<P: PreferenceStore>(
    credentials: &CredentialStore<P>,
    biometrics: &dyn BiometricGate,
) -> Result<LoginForm, StorageError> {
    let biometric_available = biometrics.is_available().await;
    let (biometric_enabled, biometry_type) = if biometric_available {
        (
            credentials.biometric_enabled().await?,
            biometrics.biometry_type().await,
        )
    } else {
        (false, None)
    };
    let remember_me = credentials.remember_me().await?;
    let identifier = if remember_me {
        credentials.saved_identifier().await?
    } else {
        None
    };
    Ok(LoginForm {
        biometric_available,
        biometric_enabled,
        biometry_type,
        remember_me,
        identifier,
    })
}

/// Forgets everything saved on the device
pub async fn logout<P: PreferenceStore>(credentials: &CredentialStore<P>) -> Result<(), StorageError> {
    credentials.clear_all().await?;
    info!("logged out, device preferences cleared");
    Ok(())
}

pub struct Bootstrapper<P> {
    backend: Arc<dyn Backend>,
    credentials: CredentialStore<P>,
    biometrics: Box<dyn BiometricGate>,
}

impl<P: PreferenceStore> Bootstrapper<P> {
    pub fn new(
        backend: Arc<dyn Backend>,
        credentials: CredentialStore<P>,
        biometrics: Box<dyn BiometricGate>,
    ) -> Self {
        Self {
            backend,
            credentials,
            biometrics,
        }
    }

    async fn sign_in(
        &self,
        identifier: &str,
        password: &str,
        remember_me: bool,
    ) -> Result<SignedIn, BackendError> {
        match AuthMethod::for_identifier(identifier) {
            AuthMethod::Email => {
                self.backend
                    .sign_in_with_email(identifier, password, remember_me)
                    .await
            }
            AuthMethod::Username => {
                self.backend
                    .sign_in_with_username(identifier, password, remember_me)
                    .await
            }
        }
    }

    /// Login with identifier and password from the form
    pub async fn login(&self, identifier: &str, password: &str, remember_me: bool) -> Outcome {
        let identifier = identifier.trim();
        if identifier.is_empty() || password.is_empty() {
            return Outcome::failed(ValidationError::MissingCredentials.to_string());
        }

        let signed_in = match self.sign_in(identifier, password, remember_me).await {
            Ok(signed_in) => signed_in,
            Err(BackendError::AwaitingApproval) => {
                info!("{} is waiting for approval", identifier);
                return Outcome::WaitingApproval;
            }
            Err(e) => {
                debug!("login of {} failed: {}", identifier, e);
                return Outcome::failed(e.localized());
            }
        };

        let enrollment = match self.enroll(identifier, password, remember_me).await {
            Ok(enrollment) => enrollment,
            Err(e) => {
                error!("cannot save the login: {}", e);
                return Outcome::failed(LOGIN_ERROR);
            }
        };

        self.finish(signed_in, enrollment).await
    }

    async fn enroll(
        &self,
        identifier: &str,
        password: &str,
        remember_me: bool,
    ) -> Result<Enrollment, StorageError> {
        let available = self.biometrics.is_available().await;
        let enabled = available && self.credentials.biometric_enabled().await?;
        let enrollment = decide_enrollment(remember_me, available, enabled);
        match enrollment {
            Enrollment::Enrolled => {
                if let Err(e) = self.save_login(identifier, password, true).await {
                    warn!("cannot enable biometric login: {}", e);
                    return Ok(Enrollment::Failed);
                }
                info!("biometric login enabled for {}", identifier);
            }
            Enrollment::Refreshed => self.save_login(identifier, password, false).await?,
            Enrollment::IdentifierOnly => {
                self.credentials.set_saved_identifier(identifier).await?;
                self.credentials.set_remember_me(true).await?;
            }
            Enrollment::Unchanged | Enrollment::Failed => {}
        }
        Ok(enrollment)
    }

    async fn save_login(
        &self,
        identifier: &str,
        password: &str,
        enable_biometric: bool,
    ) -> Result<(), StorageError> {
        if enable_biometric {
            self.credentials.set_biometric_enabled(true).await?;
        }
        self.credentials.save_credentials(identifier, password).await?;
        self.credentials.set_saved_identifier(identifier).await?;
        self.credentials.set_remember_me(true).await
    }

    /// Login with the credentials saved by an earlier remembered login
    pub async fn biometric_login(&self) -> Outcome {
        if !self.biometrics.authenticate(DEFAULT_REASON).await {
            return Outcome::Cancelled;
        }

        let saved = match self.credentials.credentials().await {
            Ok(Some(saved)) => saved,
            Ok(None) => return Outcome::failed(MISSING_CREDENTIALS),
            Err(e) => {
                error!("cannot read the saved credentials: {}", e);
                return Outcome::failed(MISSING_CREDENTIALS);
            }
        };

        match self.sign_in(&saved.identifier, &saved.password, true).await {
            Ok(signed_in) => self.finish(signed_in, Enrollment::Unchanged).await,
            Err(e) => {
                warn!("biometric login of {} failed: {}", saved.identifier, e);
                Outcome::failed(LOGIN_FAILED)
            }
        }
    }

    /// Saves the session and picks the store to open
    async fn finish(&self, signed_in: SignedIn, enrollment: Enrollment) -> Outcome {
        let SignedIn { user, tokens } = signed_in;
        if let Err(e) = self.credentials.set_session(&tokens.access_token).await {
            error!("cannot save the session: {}", e);
            return Outcome::failed(LOGIN_ERROR);
        }

        let stores = match self.backend.stores(user.id).await {
            Ok(stores) => stores,
            Err(e) => {
                error!("cannot load the stores of {}: {}", user.id, e);
                return Outcome::failed(LOGIN_ERROR);
            }
        };

        let destination = match self.pick_store(stores).await {
            Ok(destination) => destination,
            Err(e) => {
                error!("cannot save the current store: {}", e);
                return Outcome::failed(LOGIN_ERROR);
            }
        };

        info!("{} logged in", user.email);
        Outcome::Redirect(Redirect {
            tokens,
            destination,
            enrollment,
        })
    }

    /// Keeps the saved store if it still exists, otherwise the first one
    async fn pick_store(&self, stores: Vec<Store>) -> Result<Destination, StorageError> {
        let saved = self.credentials.current_store().await?;
        let store = match saved {
            Some(id) => stores
                .iter()
                .find(|s| s.id.to_string() == id)
                .or_else(|| stores.first()),
            None => stores.first(),
        };
        match store {
            Some(store) => {
                self.credentials
                    .set_current_store(&store.id.to_string())
                    .await?;
                Ok(Destination::Dashboard(store.clone()))
            }
            None => Ok(Destination::SelectStore),
        }
    }

    /// Creates an account that waits for approval
    pub async fn sign_up(&self, form: SignUpForm) -> Outcome {
        let request = match form.validate() {
            Ok(request) => request,
            Err(e) => return Outcome::failed(e.to_string()),
        };
        match self.backend.sign_up(&request).await {
            Ok(profile) => {
                info!("{} signed up", profile.username);
                Outcome::WaitingApproval
            }
            Err(e) if e.is_duplicate() => Outcome::failed(e.localized()),
            Err(e) => {
                error!("sign up of {} failed: {}", request.username, e);
                Outcome::failed(SIGN_UP_FAILED)
            }
        }
    }
}
