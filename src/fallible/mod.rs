//! This module keeps the different result types. These are needed, because GraphQL does not have generics,
//! so we cannot build something like
//!
//! ```text
//! struct<T, E> Result {
//!     ok: T,
//!     err: E,
//! }
//! ```
//!
//! We do it this way (instead of using [``async_graphql::Result``]) because these errors are typed.
//! They are for operations that *can* fail because of things the client does not know. For
//! example, when an admin approves a user, it can't know whether someone else rejected that
//! user a second earlier.
mod errors;

pub use errors::*;

/// result_type macro
///
/// This macro generates a struct which can be used as a result to have typed errors in GraphQL.
/// It automatically derives [``async_graphql::SimpleObject``]. It will create a struct with two
/// fields: a field ``ok`` with an ``Option<$ok>`` on it and a field ``err`` with a ``Option<$err>``.
///
/// # Example
///
/// ```text
/// result_type!(SignInResult, TokenPair);
/// // will expand to
/// pub struct SignInResult {
///     ok: Option<TokenPair>,
///     err: Option<crate::fallible::Error>,
/// }
/// ```
#[macro_export]
macro_rules! result_type {
    (
        $name:ident,
        $ok:ty,
        $err:ty $(,)?
    ) => {
        #[derive(async_graphql::SimpleObject)]
        /// Result type
        /// Every result type is built the same way
        /// it has a field ``ok`` which has some value on success
        /// and the ``err`` field which is the ``Error`` union.\
        /// The rule is: if there's an error, ``ok`` is null, ``err`` is some,
        /// if there is no error and the operation succeeds, ``err`` is none and
        /// ``ok`` is some.
        pub struct $name {
            pub ok: Option<$ok>,
            pub err: Option<$err>,
        }

        impl Default for $name {
            fn default() -> Self {
                Self {
                    ok: Option::default(),
                    err: Option::default(),
                }
            }
        }

        #[allow(dead_code)]
        impl $name {
            pub fn new(value: $ok) -> Self {
                Self {
                    ok: Some(value),
                    err: None,
                }
            }
        }

        impl From<$ok> for $name {
            fn from(ok: $ok) -> Self {
                Self {
                    ok: Some(ok),
                    err: None,
                }
            }
        }

        impl From<$err> for $name {
            fn from(err: $err) -> Self {
                Self {
                    ok: None,
                    err: Some(err),
                }
            }
        }
    };
    (
        $name:ident,
        $ok:ty $(,)?
    ) => {
        $crate::result_type!($name, $ok, $crate::fallible::Error);
    };
}

/// error type macro
///
/// This macro is used to avoid repeating error types.
///
/// **Note**: Be sure to register this type in the [``crate::fallible::Error``] union too.
///
/// # Example
///
/// ```text
/// error_type! {
///     struct SomeError {
///         extra_field: String,
///     }
/// }
/// ```
///
/// This has only the default fields
/// ```text
/// error_type!(OtherError);
/// ```
#[macro_export]
macro_rules! error_type {
    (
        $(#[$attr:meta])*
        struct $name:ident {
            $(
                $(#[$inner_attr:meta])*
                $field:ident: $field_type:ty,
            )*
        } $(,)?
    ) => {
        $(#[$attr])*
        #[derive(async_graphql::SimpleObject, Debug)]
        pub struct $name {
            /// What went wrong, already in the user's language
            pub description: String,
            /// A hint for the developer what they could do to prevent this error
            pub hint: Option<String>,
            $(
                $(#[$inner_attr])*
                pub $field: $field_type,
            )*
        }

        impl $name {
            #[allow(unused)]
            pub fn new (description: String, $($field: $field_type),*) -> Self {
                Self {
                    description,
                    hint: None,
                    $($field),*
                }
            }
        }
    };
    (
        $(#[$attr:meta])*
        struct $name:ident$(;)?
    ) => {
        $crate::error_type!($(#[$attr])* struct $name {});
    };

    (
        $(#[$attr:meta])*
        $name:ident
    ) => {
        $crate::error_type!(
            $(#[$attr])*
            struct $name
        );
    };
}

/// try_return
///
/// basically a copy of the ``try!`` macro, because we can't use ``?`` for early return
/// into a result type
#[macro_export]
macro_rules! tri {
    (
        $expr:expr $(,)?
    ) => {
        match $expr {
            Ok(val) => val,
            Err(err) => return $crate::fallible::Error::from(err).into(),
        }
    };
}
