//! NewType wrappers for strong typing of the identifiers handed out by the service.
//!
//! These types prevent accidental mixing of semantically different strings
//! (e.g., passing a refresh token where a user name is expected).

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Macro to generate a NewType wrapper with standard trait implementations.
macro_rules! newtype_string {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new instance.
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Get the inner value as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume and return the inner String.
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }
    };
}

newtype_string!(
    /// Name of an authenticated user.
    ///
    /// This is the unique key of an identity: the value the credential
    /// providers look up and the `user` claim carried by access tokens.
    UserName
);

newtype_string!(
    /// Opaque refresh token identifier handed to clients.
    ///
    /// Rendered as a hyphenated random (v4) UUID, so 122 bits of it are random.
    RefreshId
);

impl RefreshId {
    /// Generate a fresh random identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_refresh_id_generate_is_uuid() {
        let id = RefreshId::generate();
        assert!(Uuid::parse_str(id.as_str()).is_ok());
        assert_ne!(id, RefreshId::generate());
    }

    #[test]
    fn test_user_name_serializes_transparently() {
        let name = UserName::new("alice");
        assert_eq!(serde_json::to_string(&name).unwrap(), "\"alice\"");
        let back: UserName = serde_json::from_str("\"alice\"").unwrap();
        assert_eq!(back, name);
    }

    #[test]
    fn test_borrow_allows_str_lookup() {
        let mut map = HashMap::new();
        map.insert(RefreshId::new("abc"), 1);
        assert_eq!(map.get("abc"), Some(&1));
    }
}
