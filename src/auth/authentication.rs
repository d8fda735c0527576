//! Auth*entication*
//!
//! Sign in and sign up over GraphQL. A successful sign in hands out a
//! [``TokenPair``], the access token goes into the ``Authorization`` header
//! of every following request.
use std::sync::Arc;

use async_graphql::{Context, InputObject, Object, Result};
use log::debug;

use super::{signup::SignUpForm, token::TokenPair, AuthMethod};
use crate::{
    ac::Permissions,
    backend::{Backend, Store, UserProfile},
    guards::{authenticated, require},
    result_type, tri,
};

result_type!(SignInResult, TokenPair);
result_type!(SignUpResult, UserProfile);

#[derive(InputObject)]
/// The sign up form as the user filled it in
pub struct SignUpInput {
    pub email: String,
    pub username: String,
    pub password: String,
    pub confirm_password: String,
    /// Any common notation, e.g. ``0812-3456-7890``
    pub whatsapp: String,
}

impl From<SignUpInput> for SignUpForm {
    fn from(input: SignUpInput) -> Self {
        Self {
            email: input.email,
            username: input.username,
            password: input.password,
            confirm_password: input.confirm_password,
            whatsapp: input.whatsapp,
        }
    }
}

#[derive(Default)]
pub struct AuthenticationQuery;

#[derive(Default)]
pub struct AuthenticationMutation;

#[Object]
impl AuthenticationMutation {
    /// Signs in with an email address or a username.
    ///
    /// A correct login of a profile that is not approved yet fails with
    /// ``AwaitingApproval``.
    async fn sign_in(
        &self,
        ctx: &Context<'_>,
        identifier: String,
        password: String,
        #[graphql(default)] remember_me: bool,
    ) -> SignInResult {
        let identifier = identifier.trim();
        if identifier.is_empty() || password.is_empty() {
            return crate::fallible::Error::from(
                super::signup::ValidationError::MissingCredentials,
            )
            .into();
        }

        let backend = ctx.data_unchecked::<Arc<dyn Backend>>();
        let method = AuthMethod::for_identifier(identifier);
        debug!("sign in via {:?}", method);
        let signed_in = tri!(match method {
            AuthMethod::Email => {
                backend
                    .sign_in_with_email(identifier, &password, remember_me)
                    .await
            }
            AuthMethod::Username => {
                backend
                    .sign_in_with_username(identifier, &password, remember_me)
                    .await
            }
        });
        signed_in.tokens.into()
    }

    /// Creates an account. It can't sign in before an admin approved it.
    async fn sign_up(&self, ctx: &Context<'_>, input: SignUpInput) -> SignUpResult {
        let request = tri!(SignUpForm::from(input).validate());
        let backend = ctx.data_unchecked::<Arc<dyn Backend>>();
        tri!(backend.sign_up(&request).await).into()
    }
}

#[Object]
impl AuthenticationQuery {
    /// The profile of the signed in user
    async fn me(&self, ctx: &Context<'_>) -> Result<UserProfile> {
        let claims = authenticated(ctx)?;
        let backend = ctx.data_unchecked::<Arc<dyn Backend>>();
        backend
            .profile(claims.user_id())
            .await?
            .ok_or_else(|| async_graphql::Error::new("profile not found"))
    }

    /// The stores of the signed in user
    async fn stores(&self, ctx: &Context<'_>) -> Result<Vec<Store>> {
        let claims = require(ctx, Permissions::STORE_USE).await?;
        let backend = ctx.data_unchecked::<Arc<dyn Backend>>();
        Ok(backend.stores(claims.user_id()).await?)
    }
}
