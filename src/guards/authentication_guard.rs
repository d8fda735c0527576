use std::{sync::Arc, time::Duration};

use async_graphql::Context;
use log::error;
use moka::future::Cache;
use uuid::Uuid;

use crate::{
    ac::{check_permission, Permissions},
    auth::token::Claims,
    backend::{Backend, BackendError},
};

/// Permissions per user, looked up from the user's roles
pub type PermissionCache = Cache<Uuid, Permissions>;

/// A role change is picked up after two minutes at the latest
pub fn permission_cache() -> PermissionCache {
    Cache::builder()
        .max_capacity(10_000)
        .time_to_live(Duration::from_secs(120))
        .build()
}

/// Returns the [``Claims``] of the request or fails if the request has no valid access token.
///
/// The claims are attached by the http handler after decoding the ``Authorization`` header.
pub fn authenticated(ctx: &Context<'_>) -> async_graphql::Result<Claims> {
    ctx.data::<Claims>()
        .map(Clone::clone)
        .map_err(|_| async_graphql::Error::new("not authenticated"))
}

/// The permissions of the authenticated user
pub async fn permissions(ctx: &Context<'_>, claims: &Claims) -> async_graphql::Result<Permissions> {
    let backend = ctx.data_unchecked::<Arc<dyn Backend>>().clone();
    let cache = ctx.data_unchecked::<PermissionCache>();
    let user_id = claims.user_id();
    cache
        .try_get_with(user_id, async move {
            backend
                .roles(user_id)
                .await
                .map(|roles| Permissions::for_roles(&roles))
        })
        .await
        .map_err(|e: Arc<BackendError>| {
            error!("cannot load roles of {}: {}", user_id, e);
            async_graphql::Error::new("cannot load permissions")
        })
}

/// Ensures the request is made by an authenticated user holding ``permission``
pub async fn require(
    ctx: &Context<'_>,
    permission: Permissions,
) -> async_graphql::Result<Claims> {
    let claims = authenticated(ctx)?;
    let granted = permissions(ctx, &claims).await?;
    if check_permission(granted, permission) {
        Ok(claims)
    } else {
        Err(async_graphql::Error::new("forbidden"))
    }
}
