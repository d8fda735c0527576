use crate::{
    auth::signup::ValidationError,
    backend::{BackendError, ProfileState},
    error_type,
    profiles::WorkflowError,
};
use async_graphql::Union;
use log::error;
use uuid::Uuid;

#[derive(Union, Debug)]
/// Every typed error an operation can return.\
/// Note: The ``description`` is meant for the end user and already
/// localized. An application may still match ``__typename`` and
/// display its own message.
pub enum Error {
    InvalidCredentials(InvalidCredentials),
    EmailNotConfirmed(EmailNotConfirmed),
    AwaitingApproval(AwaitingApproval),
    UnknownUsername(UnknownUsername),
    AlreadyRegistered(AlreadyRegistered),
    InvalidInput(InvalidInput),
    UnknownProfile(UnknownProfile),
    InvalidTransition(InvalidTransition),
    RoleNotGranted(RoleNotGranted),
    Unexpected(Unexpected),
}

error_type!(
    /// InvalidCredentials
    ///
    /// The email/username and password do not match an account.
    InvalidCredentials
);

error_type!(
    /// EmailNotConfirmed
    ///
    /// The account exists but the confirmation mail was not followed yet.
    EmailNotConfirmed
);

error_type!(
    /// AwaitingApproval
    ///
    /// The credentials are correct but no admin approved the profile yet.
    /// A client should show its waiting page instead of an error.
    AwaitingApproval
);

error_type!(
    /// UnknownUsername
    ///
    /// There is no profile with the supplied username.
    UnknownUsername
);

error_type!(
    /// AlreadyRegistered
    ///
    /// Another account already uses the email or the username.
    AlreadyRegistered
);

error_type!(
    /// InvalidInput
    ///
    /// The input was rejected before anything was sent to the backend.
    InvalidInput
);

error_type! {
    /// UnknownProfile
    ///
    /// There is no profile for the user. It might have been rejected in the meantime.
    struct UnknownProfile {
        user_id: Uuid,
    }
}

error_type! {
    /// InvalidTransition
    ///
    /// The profile is not in a state that allows the action,
    /// e.g. suspending a profile that is still pending.
    struct InvalidTransition {
        /// The state the profile is currently in
        state: ProfileState,
    }
}

error_type! {
    /// RoleNotGranted
    ///
    /// The profile was approved but the default role could not be inserted.
    /// The profile stays approved; the role has to be added by hand.
    struct RoleNotGranted {
        user_id: Uuid,
    }
}

error_type! {
    /// Unexpected
    ///
    /// An unexpected error. Probably something internal like a offline database
    Unexpected
}

impl From<BackendError> for Error {
    fn from(e: BackendError) -> Self {
        let description = e.localized().to_string();
        match e {
            BackendError::InvalidCredentials => {
                Self::InvalidCredentials(InvalidCredentials::new(description))
            }
            BackendError::EmailNotConfirmed => {
                Self::EmailNotConfirmed(EmailNotConfirmed::new(description))
            }
            BackendError::AwaitingApproval => {
                Self::AwaitingApproval(AwaitingApproval::new(description))
            }
            BackendError::UnknownUsername => {
                Self::UnknownUsername(UnknownUsername::new(description))
            }
            BackendError::AlreadyRegistered | BackendError::Duplicate => {
                Self::AlreadyRegistered(AlreadyRegistered {
                    description,
                    hint: Some("choose a different email or username".to_string()),
                })
            }
            e => {
                error!("unexpected backend error: {}", e);
                Self::Unexpected(Unexpected {
                    description: "Terjadi kesalahan, silakan coba lagi".to_string(),
                    hint: None,
                })
            }
        }
    }
}

impl From<ValidationError> for Error {
    fn from(e: ValidationError) -> Self {
        Self::InvalidInput(InvalidInput::new(e.to_string()))
    }
}

impl From<WorkflowError> for Error {
    fn from(e: WorkflowError) -> Self {
        match e {
            WorkflowError::UnknownProfile(user_id) => Self::UnknownProfile(UnknownProfile {
                description: "User tidak ditemukan".to_string(),
                hint: Some("refetch the profile list".to_string()),
                user_id,
            }),
            WorkflowError::InvalidState { state, action } => {
                Self::InvalidTransition(InvalidTransition {
                    description: format!("User berstatus {} tidak dapat di-{}", state, action),
                    hint: None,
                    state,
                })
            }
            WorkflowError::RoleNotGranted { user_id, source } => {
                error!("default role of {} not granted: {}", user_id, source);
                Self::RoleNotGranted(RoleNotGranted {
                    description: "User disetujui, tetapi gagal menambahkan role".to_string(),
                    hint: Some("add the user role by hand".to_string()),
                    user_id,
                })
            }
            WorkflowError::Backend(e) => e.into(),
        }
    }
}
