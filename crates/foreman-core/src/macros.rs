// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Declarative macros for reducing boilerplate.

/// Define an opaque string-backed id newtype.
///
/// Unlike a generated id (nanoid-style), these wrap identifiers handed to us
/// by external systems (an agent binary's `session_id`, a chat adapter's
/// message/thread id, a human-chosen task name) — so there is no `new()`
/// constructor, only `from(impl Into<String>)`.
///
/// ```ignore
/// crate::opaque_id! {
///     /// Doc comment for the id type.
///     pub struct TaskName;
/// }
/// ```
#[macro_export]
macro_rules! opaque_id {
    ($(#[$meta:meta])* pub struct $name:ident;) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl<T: Into<String>> From<T> for $name {
            fn from(value: T) -> Self {
                Self(value.into())
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl PartialEq<str> for $name {
            fn eq(&self, other: &str) -> bool {
                self.0 == other
            }
        }
    };
}
