use thiserror::Error;

/// Failures reported by the hosted backend.
///
/// Each variant carries the Indonesian text shown to the user, see
/// [`BackendError::localized`].
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("invalid login credentials")]
    InvalidCredentials,
    #[error("email not confirmed")]
    EmailNotConfirmed,
    /// The account exists but an admin has not approved it yet
    #[error("akun masih menunggu persetujuan admin")]
    AwaitingApproval,
    #[error("username tidak ditemukan")]
    UnknownUsername,
    #[error("email or username already registered")]
    AlreadyRegistered,
    /// A unique constraint rejected the write
    #[error("duplicate key value violates unique constraint")]
    Duplicate,
    #[error("record not found")]
    NotFound,
    #[error("cannot issue session token: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    /// Failure of a collaborator that only reports text
    #[error("{0}")]
    Other(String),
}

impl BackendError {
    /// The message shown to the user after a failed login
    pub fn localized(&self) -> &'static str {
        match self {
            Self::InvalidCredentials => "Email/Username atau password salah",
            Self::EmailNotConfirmed => "Email belum dikonfirmasi. Silakan cek email Anda",
            Self::AwaitingApproval => "Akun Anda masih menunggu persetujuan admin",
            Self::UnknownUsername => "Username tidak ditemukan",
            Self::AlreadyRegistered | Self::Duplicate => "Email atau username sudah terdaftar",
            Self::NotFound => "Data tidak ditemukan",
            Self::Token(_) | Self::Database(_) | Self::Other(_) => "Login gagal",
        }
    }

    /// Whether the failure came from a unique constraint
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::Duplicate | Self::AlreadyRegistered)
    }
}

/// postgresql error code for unique violations
/// <https://www.postgresql.org/docs/current/errcodes-appendix.html>
const UNIQUE_VIOLATION: &str = "23505";

/// Maps a unique violation to `duplicate`, everything else stays a database error
pub(crate) fn classify(e: sqlx::Error, duplicate: BackendError) -> BackendError {
    let unique_violation = e
        .as_database_error()
        .and_then(|db| db.code())
        .map_or(false, |code| code == UNIQUE_VIOLATION);
    if unique_violation {
        return duplicate;
    }
    match e {
        sqlx::Error::RowNotFound => BackendError::NotFound,
        e => BackendError::Database(e),
    }
}
