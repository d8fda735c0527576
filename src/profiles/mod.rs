//! Profiles
//!
//! The admin's approval workflow over user profiles:
//!
//! ```text
//! pending --approve--> approved --suspend--> pending
//! pending --reject---> (deleted)
//! ```
//!
//! Every transition is a single-record write. Approval and rejection touch a
//! second record afterwards, without a transaction spanning both.
use async_graphql::{ComplexObject, SimpleObject};
use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use thiserror::Error;
use uuid::Uuid;

use crate::{
    backend::{
        AdminContacts, Approval, Backend, BackendError, ProfileState, Role, UserProfile,
    },
    whatsapp::wa_link,
};

mod graphql;

pub use graphql::{AdminEmail, ProfileMutations, ProfileQueries};

/// Pre-filled message for people asking the admin for an account
pub const REGISTRATION_MESSAGE: &str =
    "Halo, saya ingin mengajukan pendaftaran atau mencoba trial 1 bulan.";

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("no profile for user {0}")]
    UnknownProfile(Uuid),
    #[error("cannot {action} a {state} profile")]
    InvalidState {
        state: ProfileState,
        action: &'static str,
    },
    /// The profile update committed but the role insert did not
    #[error("profile of {user_id} approved but the default role was not granted: {source}")]
    RoleNotGranted {
        user_id: Uuid,
        #[source]
        source: BackendError,
    },
    #[error(transparent)]
    Backend(#[from] BackendError),
}

async fn load(backend: &dyn Backend, user_id: Uuid) -> Result<UserProfile, WorkflowError> {
    backend
        .profile(user_id)
        .await?
        .ok_or(WorkflowError::UnknownProfile(user_id))
}

fn expect_state(
    profile: &UserProfile,
    state: ProfileState,
    action: &'static str,
) -> Result<(), WorkflowError> {
    if profile.state() == state {
        Ok(())
    } else {
        Err(WorkflowError::InvalidState {
            state: profile.state(),
            action,
        })
    }
}

/// A profile that vanished between the read and the write
fn vanished(user_id: Uuid) -> impl FnOnce(BackendError) -> WorkflowError {
    move |e| match e {
        BackendError::NotFound => WorkflowError::UnknownProfile(user_id),
        e => e.into(),
    }
}

/// ``pending -> approved``
///
/// Records the approving admin and the time, then grants the default
/// ``user`` role. A role the user already has is fine. Any other role
/// failure leaves the profile approved and is returned as
/// [`WorkflowError::RoleNotGranted`].
pub async fn approve(
    backend: &dyn Backend,
    user_id: Uuid,
    actor: Uuid,
    now: DateTime<Utc>,
) -> Result<(), WorkflowError> {
    let profile = load(backend, user_id).await?;
    expect_state(&profile, ProfileState::Pending, "approve")?;

    backend
        .update_approval(user_id, Some(Approval { by: actor, at: now }))
        .await
        .map_err(vanished(user_id))?;
    info!("user {} approved by {}", user_id, actor);

    match backend.insert_role(user_id, Role::User).await {
        Ok(()) => Ok(()),
        Err(e) if e.is_duplicate() => {
            debug!("user {} already has the default role", user_id);
            Ok(())
        }
        Err(source) => {
            error!("granting the default role to {} failed: {}", user_id, source);
            Err(WorkflowError::RoleNotGranted { user_id, source })
        }
    }
}

/// ``pending -> deleted``
///
/// Deletes the profile, then tries to delete the auth account. The second
/// delete is best effort: its failure is logged and reported as ``false``.
pub async fn reject(backend: &dyn Backend, user_id: Uuid) -> Result<bool, WorkflowError> {
    let profile = load(backend, user_id).await?;
    expect_state(&profile, ProfileState::Pending, "reject")?;

    backend
        .delete_profile(user_id)
        .await
        .map_err(vanished(user_id))?;
    info!("profile of {} rejected and deleted", user_id);

    match backend.delete_auth_user(user_id).await {
        Ok(()) => Ok(true),
        Err(e) => {
            warn!("auth account of {} was not deleted: {}", user_id, e);
            Ok(false)
        }
    }
}

/// ``approved -> pending``
pub async fn suspend(backend: &dyn Backend, user_id: Uuid) -> Result<(), WorkflowError> {
    let profile = load(backend, user_id).await?;
    expect_state(&profile, ProfileState::Approved, "suspend")?;

    backend
        .update_approval(user_id, None)
        .await
        .map_err(vanished(user_id))?;
    info!("user {} suspended", user_id);
    Ok(())
}

/// Splits into (pending, approved), keeping the order
pub fn split_by_state(profiles: Vec<UserProfile>) -> (Vec<UserProfile>, Vec<UserProfile>) {
    profiles
        .into_iter()
        .partition(|p| p.state() == ProfileState::Pending)
}

/// Case-insensitive match on email and username, plain substring match on the WhatsApp number
pub fn matches_search(profile: &UserProfile, term: &str) -> bool {
    let term = term.trim();
    if term.is_empty() {
        return true;
    }
    let lower = term.to_lowercase();
    profile.email.to_lowercase().contains(&lower)
        || profile.username.to_lowercase().contains(&lower)
        || profile
            .whatsapp
            .as_deref()
            .map_or(false, |w| w.contains(term))
}

#[derive(Debug, Default, PartialEq, Eq, SimpleObject)]
/// Counters shown above the profile lists
pub struct ProfileStats {
    pub total: usize,
    pub pending: usize,
    pub approved: usize,
    pub with_whatsapp: usize,
}

impl ProfileStats {
    pub fn collect(profiles: &[UserProfile]) -> Self {
        profiles.iter().fold(Self::default(), |mut stats, p| {
            stats.total += 1;
            match p.state() {
                ProfileState::Pending => stats.pending += 1,
                ProfileState::Approved => stats.approved += 1,
            }
            if p.whatsapp.is_some() {
                stats.with_whatsapp += 1;
            }
            stats
        })
    }
}

#[ComplexObject]
impl UserProfile {
    /// ``pending`` or ``approved``
    #[graphql(name = "state")]
    async fn profile_state(&self) -> ProfileState {
        self.state()
    }

    /// Link to open a chat with the user
    async fn whatsapp_link(&self) -> Option<String> {
        self.whatsapp.as_deref().map(|w| wa_link(w, None))
    }
}

#[ComplexObject]
impl AdminContacts {
    /// Opens a chat with the admin, pre-filled with a registration request
    async fn whatsapp_link(&self) -> Option<String> {
        self.admin_whatsapp
            .as_deref()
            .map(|w| wa_link(w, Some(REGISTRATION_MESSAGE)))
    }

    async fn instagram_link(&self) -> Option<String> {
        self.admin_instagram
            .as_deref()
            .map(|handle| format!("https://instagram.com/{}", handle.trim_start_matches('@')))
    }
}
