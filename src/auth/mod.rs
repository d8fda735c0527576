//! Auth*entication*
//!
//! Sign in, sign up and the session tokens handed out afterwards.
use async_graphql::MergedObject;
pub mod authentication;
mod session;
pub mod signup;
pub mod token;
pub use session::Session;

#[derive(MergedObject, Default)]
pub struct AuthQueries(pub authentication::AuthenticationQuery);

#[derive(MergedObject, Default)]
pub struct AuthMutations(pub authentication::AuthenticationMutation);

/// How the auth service is asked to verify a login
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMethod {
    Email,
    Username,
}

impl AuthMethod {
    /// Anything with an ``@`` is an email address. Usernames can't contain one.
    pub fn for_identifier(identifier: &str) -> Self {
        if identifier.contains('@') {
            Self::Email
        } else {
            Self::Username
        }
    }
}
