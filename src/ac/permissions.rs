use bitflags::bitflags;

use crate::backend::Role;

bitflags! {
    /// What a caller of the admin api may do
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Permissions: u64 {
        /// List profiles and their contact info
        const PROFILE_READ = 1 << 0;
        /// Approve a pending profile
        const PROFILE_APPROVE = 1 << 1;
        /// Reject (delete) a pending profile
        const PROFILE_REJECT = 1 << 2;
        /// Move an approved profile back to pending
        const PROFILE_SUSPEND = 1 << 3;
        /// Edit the contact info shown on the login page
        const CONTACTS_EDIT = 1 << 4;
        /// See the subscriptions of all users
        const SUBSCRIPTION_READ = 1 << 5;
        /// Extend a user's subscription
        const SUBSCRIPTION_EXTEND = 1 << 6;
        /// Work in the POS of an own store
        const STORE_USE = 1 << 7;
    }
}

impl Permissions {
    pub fn for_role(role: Role) -> Self {
        match role {
            Role::Admin => Self::all(),
            Role::User => Self::STORE_USE,
        }
    }

    /// The union of the permissions of all roles
    pub fn for_roles(roles: &[Role]) -> Self {
        roles
            .iter()
            .fold(Self::empty(), |sum, role| sum | Self::for_role(*role))
    }
}

/// This checks whether a given sum includes a permission
pub fn check_permission(sum: Permissions, permission: Permissions) -> bool {
    !permission.is_empty() && sum.contains(permission)
}
