//! Error types for authentication, token and configuration operations.
//!
//! Callers outside the core (HTTP layers, the CLI) decide the outward status:
//! [`SsoError::is_unauthorized`] and [`SsoError::is_internal`] give the
//! conventional classification.

use std::fmt;

/// Errors that can occur in the SSO service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SsoError {
    /// The user is unknown to the provider (or to every provider of a chain).
    UserNotFound,

    /// The user is known but the password was rejected.
    Unauthorized,

    /// The configuration is wrong. Fatal at startup and reload.
    BadConfiguration(String),

    /// The refresh token is not known to the engine.
    RefreshTokenNotFound,

    /// The refresh token is past its deadline; a full authentication is needed.
    RefreshTooOld,

    /// The request carries no Authorization header.
    NoAuthorization,

    /// The Authorization header is not a well formed bearer token.
    MalformedAuthorization,

    /// The token signature can not be verified with the public key.
    SignatureInvalid,

    /// The token payload can not be decoded into claims.
    TokenMalformed,

    /// The token is past its expiry.
    TokenTooOld,

    /// A remote end answered with an empty response.
    EmptyResponse,

    /// Network or protocol failure while talking to a directory server.
    Directory(String),

    /// The token could not be signed.
    Signing(String),
}

impl fmt::Display for SsoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UserNotFound => write!(f, "User not found"),
            Self::Unauthorized => write!(f, "Not authorized"),
            Self::BadConfiguration(msg) => write!(f, "The configuration is wrong: {}", msg),
            Self::RefreshTokenNotFound => write!(f, "The refresh token was not found"),
            Self::RefreshTooOld => write!(
                f,
                "The refresh token given was too old. Full connection is mandatory"
            ),
            Self::NoAuthorization => write!(f, "The request does not have a valid Authorization"),
            Self::MalformedAuthorization => {
                write!(f, "The Authorization of the request is malformed")
            }
            Self::SignatureInvalid => write!(f, "The signature of the token can not be verified"),
            Self::TokenMalformed => write!(f, "The token is malformed"),
            Self::TokenTooOld => write!(f, "The token is too old"),
            Self::EmptyResponse => write!(f, "The response from the server was empty"),
            Self::Directory(msg) => write!(f, "Directory error: {}", msg),
            Self::Signing(msg) => write!(f, "Unable to sign the token: {}", msg),
        }
    }
}

impl std::error::Error for SsoError {}

/// Result type for SSO operations.
pub type SsoResult<T> = Result<T, SsoError>;

impl From<ldap3::LdapError> for SsoError {
    fn from(err: ldap3::LdapError) -> Self {
        Self::Directory(err.to_string())
    }
}

impl SsoError {
    /// Create a configuration error.
    pub fn bad_configuration(msg: impl Into<String>) -> Self {
        Self::BadConfiguration(msg.into())
    }

    /// Errors conventionally answered with an "unauthorized" response.
    pub fn is_unauthorized(&self) -> bool {
        matches!(
            self,
            Self::UserNotFound | Self::Unauthorized | Self::RefreshTokenNotFound
        )
    }

    /// Errors conventionally answered with an internal-error response.
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            Self::BadConfiguration(_) | Self::Signing(_) | Self::Directory(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(SsoError::UserNotFound.to_string(), "User not found");
        assert_eq!(
            SsoError::bad_configuration("providers missing").to_string(),
            "The configuration is wrong: providers missing"
        );
        assert_eq!(SsoError::TokenTooOld.to_string(), "The token is too old");
    }

    #[test]
    fn test_unauthorized_classification() {
        assert!(SsoError::UserNotFound.is_unauthorized());
        assert!(SsoError::Unauthorized.is_unauthorized());
        assert!(SsoError::RefreshTokenNotFound.is_unauthorized());
        assert!(!SsoError::RefreshTooOld.is_unauthorized());
        assert!(!SsoError::SignatureInvalid.is_unauthorized());
    }

    #[test]
    fn test_internal_classification() {
        assert!(SsoError::bad_configuration("x").is_internal());
        assert!(SsoError::Signing("x".to_string()).is_internal());
        assert!(SsoError::Directory("x".to_string()).is_internal());
        assert!(!SsoError::UserNotFound.is_internal());
    }
}
