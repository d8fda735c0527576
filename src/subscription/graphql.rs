use std::sync::Arc;

use async_graphql::{Context, Object, Result};
use chrono::Utc;
use uuid::Uuid;

use super::{extend, matches_search, Extension, Months, SubscriptionInfo, SubscriptionRow};
use crate::{
    ac::{check_permission, Permissions},
    backend::Backend,
    guards::{authenticated, permissions, require},
    profiles::AdminEmail,
    result_type, tri,
};

result_type!(ExtendResult, Extension);

#[derive(Default)]
pub struct SubscriptionQueries;

#[derive(Default)]
pub struct SubscriptionMutations;

#[Object]
impl SubscriptionQueries {
    /// The subscription of the signed in user. Admins have none.
    async fn my_subscription(&self, ctx: &Context<'_>) -> Result<Option<SubscriptionInfo>> {
        let claims = authenticated(ctx)?;
        if check_permission(
            permissions(ctx, &claims).await?,
            Permissions::SUBSCRIPTION_EXTEND,
        ) {
            return Ok(None);
        }
        let backend = ctx.data_unchecked::<Arc<dyn Backend>>();
        if backend.profile(claims.user_id()).await?.is_none() {
            return Ok(None);
        }
        // renewals are asked for at the admin's number
        let admin = ctx.data_unchecked::<AdminEmail>();
        let contacts = backend.admin_contacts_by_email(&admin.0).await?;
        Ok(Some(SubscriptionInfo::placeholder(
            Utc::now(),
            contacts.admin_whatsapp,
        )))
    }

    /// Every profile with its subscription status, newest first
    async fn subscriptions(
        &self,
        ctx: &Context<'_>,
        search: Option<String>,
    ) -> Result<Vec<SubscriptionRow>> {
        require(ctx, Permissions::SUBSCRIPTION_READ).await?;
        let backend = ctx.data_unchecked::<Arc<dyn Backend>>();
        let term = search.unwrap_or_default();
        Ok(backend
            .list_profiles()
            .await?
            .into_iter()
            .map(SubscriptionRow::from)
            .filter(|row| matches_search(row, &term))
            .collect())
    }
}

#[Object]
impl SubscriptionMutations {
    /// Extends a subscription by 1, 2, 3, 6 or 12 months.
    ///
    /// Nothing is stored until subscriptions exist in the database, the
    /// result always has the status ``PENDING_MIGRATION``.
    async fn extend_subscription(
        &self,
        ctx: &Context<'_>,
        user_id: Uuid,
        months: u32,
    ) -> Result<ExtendResult> {
        require(ctx, Permissions::SUBSCRIPTION_EXTEND).await?;
        let backend = ctx.data_unchecked::<Arc<dyn Backend>>();
        Ok(extend_checked(backend.as_ref(), user_id, months).await)
    }
}

async fn extend_checked(backend: &dyn Backend, user_id: Uuid, months: u32) -> ExtendResult {
    let months = tri!(Months::new(months));
    tri!(extend(backend, user_id, months).await).into()
}
