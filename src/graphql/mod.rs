use std::sync::Arc;

use async_graphql::{EmptySubscription, MergedObject, Schema};

use crate::{
    auth::{AuthMutations, AuthQueries},
    backend::Backend,
    guards::permission_cache,
    profiles::{AdminEmail, ProfileMutations, ProfileQueries},
    subscription::{SubscriptionMutations, SubscriptionQueries},
};

pub type GraphQLSchema = Schema<Queries, Mutations, EmptySubscription>;

#[derive(MergedObject, Default)]
pub struct Queries(AuthQueries, ProfileQueries, SubscriptionQueries);

#[derive(MergedObject, Default)]
pub struct Mutations(AuthMutations, ProfileMutations, SubscriptionMutations);

/// Builds the admin api on top of ``backend``.
///
/// Requests carry the caller's [``crate::auth::token::Claims``] as data.
/// Without them only the sign in and sign up mutations and the public
/// contacts work.
pub fn build_schema(backend: Arc<dyn Backend>, admin_email: &str) -> GraphQLSchema {
    GraphQLSchema::build(Queries::default(), Mutations::default(), EmptySubscription)
        .data(backend)
        .data(AdminEmail(admin_email.to_string()))
        .data(permission_cache())
        .finish()
}
