//! Access control
pub mod permissions;

pub use permissions::{check_permission, Permissions};
