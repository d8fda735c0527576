use std::sync::Arc;

use async_graphql::{Context, Object, Result};
use chrono::Utc;
use uuid::Uuid;

use super::{matches_search, ProfileStats};
use crate::{
    ac::Permissions,
    backend::{AdminContacts, AdminContactsInput, Backend, ProfileState, UserProfile},
    guards::{require, PermissionCache},
    result_type, tri,
};

/// The email of the admin whose contacts are shown to people without an account
#[derive(Debug, Clone)]
pub struct AdminEmail(pub String);

result_type!(ProfilesResult, Vec<UserProfile>);
result_type!(ContactsResult, AdminContacts);

#[derive(Default)]
pub struct ProfileQueries;

#[derive(Default)]
pub struct ProfileMutations;

fn backend<'a>(ctx: &Context<'a>) -> &'a Arc<dyn Backend> {
    ctx.data_unchecked::<Arc<dyn Backend>>()
}

/// Drops the cached permissions of a user whose roles or approval changed
async fn forget_permissions(ctx: &Context<'_>, user_id: Uuid) {
    ctx.data_unchecked::<PermissionCache>()
        .invalidate(&user_id)
        .await;
}

#[Object]
impl ProfileQueries {
    /// All profiles, newest first. Optionally only those in ``state`` and
    /// those matching ``search``.
    async fn profiles(
        &self,
        ctx: &Context<'_>,
        state: Option<ProfileState>,
        search: Option<String>,
    ) -> Result<Vec<UserProfile>> {
        require(ctx, Permissions::PROFILE_READ).await?;
        let profiles = backend(ctx).list_profiles().await?;
        let term = search.unwrap_or_default();
        Ok(profiles
            .into_iter()
            .filter(|p| state.map_or(true, |s| p.state() == s))
            .filter(|p| matches_search(p, &term))
            .collect())
    }

    async fn profile_stats(&self, ctx: &Context<'_>) -> Result<ProfileStats> {
        require(ctx, Permissions::PROFILE_READ).await?;
        let profiles = backend(ctx).list_profiles().await?;
        Ok(ProfileStats::collect(&profiles))
    }

    /// Profiles that left a WhatsApp number, so the admin can reach out
    async fn user_contacts(
        &self,
        ctx: &Context<'_>,
        search: Option<String>,
    ) -> Result<Vec<UserProfile>> {
        require(ctx, Permissions::PROFILE_READ).await?;
        let profiles = backend(ctx).list_profiles().await?;
        let term = search.unwrap_or_default();
        Ok(profiles
            .into_iter()
            .filter(|p| p.whatsapp.is_some())
            .filter(|p| matches_search(p, &term))
            .collect())
    }

    /// The contacts of the signed in admin
    async fn admin_contacts(&self, ctx: &Context<'_>) -> Result<AdminContacts> {
        let claims = require(ctx, Permissions::CONTACTS_EDIT).await?;
        Ok(backend(ctx).admin_contacts(claims.user_id()).await?)
    }

    /// The contacts shown on the login page. Needs no authentication.
    async fn public_admin_contacts(&self, ctx: &Context<'_>) -> Result<AdminContacts> {
        let email = ctx.data_unchecked::<AdminEmail>();
        Ok(backend(ctx).admin_contacts_by_email(&email.0).await?)
    }
}

/// The profile list after a mutation, the way the admin view reloads it
async fn refetch(backend: &dyn Backend) -> ProfilesResult {
    tri!(backend.list_profiles().await).into()
}

#[Object]
impl ProfileMutations {
    /// Approves a pending profile and grants it the ``user`` role.
    /// Returns the refreshed profile list.
    async fn approve_user(&self, ctx: &Context<'_>, user_id: Uuid) -> Result<ProfilesResult> {
        let claims = require(ctx, Permissions::PROFILE_APPROVE).await?;
        let backend = backend(ctx).as_ref();
        Ok(
            match super::approve(backend, user_id, claims.user_id(), Utc::now()).await {
                Ok(()) => {
                    forget_permissions(ctx, user_id).await;
                    refetch(backend).await
                }
                Err(e) => crate::fallible::Error::from(e).into(),
            },
        )
    }

    /// Deletes a pending profile and its account.
    /// Returns the refreshed profile list.
    async fn reject_user(&self, ctx: &Context<'_>, user_id: Uuid) -> Result<ProfilesResult> {
        require(ctx, Permissions::PROFILE_REJECT).await?;
        let backend = backend(ctx).as_ref();
        Ok(match super::reject(backend, user_id).await {
            Ok(_) => {
                forget_permissions(ctx, user_id).await;
                refetch(backend).await
            }
            Err(e) => crate::fallible::Error::from(e).into(),
        })
    }

    /// Moves an approved profile back to pending.
    /// Returns the refreshed profile list.
    async fn suspend_user(&self, ctx: &Context<'_>, user_id: Uuid) -> Result<ProfilesResult> {
        require(ctx, Permissions::PROFILE_SUSPEND).await?;
        let backend = backend(ctx).as_ref();
        Ok(match super::suspend(backend, user_id).await {
            Ok(()) => {
                forget_permissions(ctx, user_id).await;
                refetch(backend).await
            }
            Err(e) => crate::fallible::Error::from(e).into(),
        })
    }

    /// Saves the contacts of the signed in admin. Blank values are cleared.
    async fn save_admin_contacts(
        &self,
        ctx: &Context<'_>,
        contacts: AdminContactsInput,
    ) -> Result<ContactsResult> {
        let claims = require(ctx, Permissions::CONTACTS_EDIT).await?;
        let contacts = AdminContacts::from(contacts);
        if let Err(e) = backend(ctx)
            .save_admin_contacts(claims.user_id(), &contacts)
            .await
        {
            return Ok(crate::fallible::Error::from(e).into());
        }
        Ok(contacts.into())
    }
}

