//! Signup
//!
//! Validation of the sign up form before anything is sent to the backend.
use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;

use crate::{backend::SignUpRequest, whatsapp::normalize_phone};

/// A rejected form. The messages are shown to the user as is.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Email/username dan password wajib diisi")]
    MissingCredentials,
    #[error("Nomor WhatsApp wajib diisi")]
    MissingWhatsapp,
    #[error("Nomor WhatsApp tidak valid")]
    InvalidWhatsapp,
    #[error("Password tidak cocok")]
    PasswordMismatch,
    #[error("Password minimal 6 karakter")]
    PasswordTooShort,
    #[error("Format email tidak valid")]
    InvalidEmail,
    #[error("Username hanya boleh berisi huruf, angka, titik, strip dan garis bawah (3-32 karakter)")]
    InvalidUsername,
    #[error("Durasi perpanjangan tidak valid")]
    InvalidDuration,
}

pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone, Default)]
pub struct SignUpForm {
    pub email: String,
    pub username: String,
    pub password: String,
    pub confirm_password: String,
    pub whatsapp: String,
}

impl SignUpForm {
    /// Checks the form in the order the user sees the fields complain
    pub fn validate(self) -> Result<SignUpRequest, ValidationError> {
        lazy_static! {
            // no ``@``: usernames and emails are told apart by it on login
            static ref USERNAME: Regex = Regex::new(r"^[A-Za-z0-9_.\-]{3,32}$").unwrap();
        }

        if self.whatsapp.trim().is_empty() {
            return Err(ValidationError::MissingWhatsapp);
        }
        if self.password != self.confirm_password {
            return Err(ValidationError::PasswordMismatch);
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(ValidationError::PasswordTooShort);
        }
        let email = self.email.trim();
        if !email.contains('@') || email.starts_with('@') || email.ends_with('@') {
            return Err(ValidationError::InvalidEmail);
        }
        let username = self.username.trim();
        if !USERNAME.is_match(username) {
            return Err(ValidationError::InvalidUsername);
        }

        Ok(SignUpRequest {
            email: email.to_lowercase(),
            username: username.to_string(),
            password: self.password,
            whatsapp: normalize_phone(&self.whatsapp),
        })
    }
}
