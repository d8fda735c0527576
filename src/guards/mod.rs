//! Guards used to check things before a resolver does any work
mod authentication_guard;

pub use authentication_guard::*;
