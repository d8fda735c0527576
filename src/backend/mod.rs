//! Backend
//!
//! The hosted database and auth service. Everything the admin views and the
//! device flows need from it goes through the [`Backend`] trait.
use async_graphql::{Enum, InputObject, SimpleObject};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::token::TokenPair;

mod error;
mod postgres;

pub use error::BackendError;
pub(crate) use error::classify;
pub use postgres::PgBackend;

#[derive(Debug, Clone, Serialize, sqlx::FromRow, SimpleObject)]
#[graphql(complex)]
/// UserProfile
///
/// The application level user record. It is distinct from the account the
/// auth service keeps for the same user.
pub struct UserProfile {
    pub user_id: Uuid,
    pub email: String,
    pub username: String,
    /// The WhatsApp number given at sign up, normalized to a leading ``62``
    pub whatsapp: Option<String>,
    pub is_approved: bool,
    pub created_at: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
    /// The admin who approved this profile
    pub approved_by: Option<Uuid>,
}

impl UserProfile {
    pub fn state(&self) -> ProfileState {
        if self.is_approved {
            ProfileState::Approved
        } else {
            ProfileState::Pending
        }
    }
}

#[derive(Enum, Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ProfileState {
    /// Signed up, waiting for an admin
    Pending,
    /// Approved by an admin and able to log in
    Approved,
}

impl std::fmt::Display for ProfileState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => f.write_str("pending"),
            Self::Approved => f.write_str("approved"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
        }
    }

    pub fn parse(role: &str) -> Option<Self> {
        match role {
            "user" => Some(Self::User),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }
}

/// Who approved a profile and when
#[derive(Debug, Clone, Copy)]
pub struct Approval {
    pub by: Uuid,
    pub at: DateTime<Utc>,
}

/// The identity the auth service knows about
#[derive(Debug, Clone, SimpleObject)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
}

/// A successful sign in
#[derive(Debug)]
pub struct SignedIn {
    pub user: AuthUser,
    pub tokens: TokenPair,
}

#[derive(Debug, Clone)]
pub struct SignUpRequest {
    pub email: String,
    pub username: String,
    pub password: String,
    /// already normalized
    pub whatsapp: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, sqlx::FromRow, SimpleObject)]
#[graphql(complex)]
/// Contact info the admin publishes for registration requests
pub struct AdminContacts {
    pub admin_whatsapp: Option<String>,
    pub admin_instagram: Option<String>,
}

#[derive(InputObject)]
pub struct AdminContactsInput {
    pub whatsapp: String,
    pub instagram: String,
}

impl From<AdminContactsInput> for AdminContacts {
    fn from(input: AdminContactsInput) -> Self {
        fn trimmed(value: String) -> Option<String> {
            let value = value.trim();
            if value.is_empty() {
                None
            } else {
                Some(value.to_string())
            }
        }
        Self {
            admin_whatsapp: trimmed(input.whatsapp),
            admin_instagram: trimmed(input.instagram),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow, SimpleObject)]
/// A store owned by a user. The POS works on exactly one store at a time.
pub struct Store {
    pub id: Uuid,
    pub name: String,
}

/// Operations against the hosted backend.
///
/// There is no transaction spanning two calls. Callers that chain calls
/// (approval, rejection) have to live with partial failure.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Sign in with an email address. The session lifetime depends on ``remember_me``.
    async fn sign_in_with_email(
        &self,
        email: &str,
        password: &str,
        remember_me: bool,
    ) -> Result<SignedIn, BackendError>;

    /// Sign in with a username. Fails with [`BackendError::UnknownUsername`]
    /// if there is no profile with that name.
    async fn sign_in_with_username(
        &self,
        username: &str,
        password: &str,
        remember_me: bool,
    ) -> Result<SignedIn, BackendError>;

    /// Create the auth account together with an unapproved profile
    async fn sign_up(&self, request: &SignUpRequest) -> Result<UserProfile, BackendError>;

    /// All profiles, newest first
    async fn list_profiles(&self) -> Result<Vec<UserProfile>, BackendError>;

    async fn profile(&self, user_id: Uuid) -> Result<Option<UserProfile>, BackendError>;

    /// Sets (``Some``) or clears (``None``) the approval of a profile
    async fn update_approval(
        &self,
        user_id: Uuid,
        approval: Option<Approval>,
    ) -> Result<(), BackendError>;

    /// Fails with [`BackendError::Duplicate`] if the user already has the role
    async fn insert_role(&self, user_id: Uuid, role: Role) -> Result<(), BackendError>;

    async fn roles(&self, user_id: Uuid) -> Result<Vec<Role>, BackendError>;

    async fn delete_profile(&self, user_id: Uuid) -> Result<(), BackendError>;

    /// Deletes the account in the auth service
    async fn delete_auth_user(&self, user_id: Uuid) -> Result<(), BackendError>;

    async fn admin_contacts(&self, user_id: Uuid) -> Result<AdminContacts, BackendError>;

    /// The contacts of the admin with the given email. Empty if there's no such admin.
    async fn admin_contacts_by_email(&self, email: &str) -> Result<AdminContacts, BackendError>;

    async fn save_admin_contacts(
        &self,
        user_id: Uuid,
        contacts: &AdminContacts,
    ) -> Result<(), BackendError>;

    async fn stores(&self, user_id: Uuid) -> Result<Vec<Store>, BackendError>;
}
