//! Bearer token validation for resource servers.
//!
//! A resource server holds only the public half of the signing key pair. It
//! reads the `Authorization` header of an inbound request, checks its shape
//! and hands the token to the codec for signature and expiry checks.

use http::HeaderMap;
use http::header::AUTHORIZATION;
use tracing::debug;

use crate::config::ValidatorConfiguration;
use crate::error::{SsoError, SsoResult};
use crate::providers::Identity;
use crate::token::{self, VerifyingKey, unix_now};

const BEARER_PREFIX: &str = "Bearer ";

/// Shortest header worth parsing.
const MIN_AUTHORIZATION_LENGTH: usize = 8;

#[derive(Debug, Clone)]
pub struct TokenValidator {
    public_key: VerifyingKey,
}

impl TokenValidator {
    pub fn new(configuration: &ValidatorConfiguration) -> SsoResult<Self> {
        let path = configuration.validate()?;
        Ok(Self {
            public_key: VerifyingKey::from_file(path)?,
        })
    }

    pub fn from_public_key_pem(pem: &[u8]) -> SsoResult<Self> {
        Ok(Self {
            public_key: VerifyingKey::from_pem(pem)?,
        })
    }

    /// Recover the identity asserted by the request's bearer token.
    pub fn identify(&self, headers: &HeaderMap) -> SsoResult<Identity> {
        self.identify_at(headers, unix_now())
    }

    pub fn identify_at(&self, headers: &HeaderMap, now: i64) -> SsoResult<Identity> {
        let authorization = match headers.get(AUTHORIZATION) {
            None => None,
            Some(value) => Some(
                value
                    .to_str()
                    .map_err(|_| SsoError::MalformedAuthorization)?,
            ),
        };
        self.identify_authorization(authorization, now)
    }

    /// Same as [`TokenValidator::identify_at`], from the raw header value.
    pub fn identify_authorization(
        &self,
        authorization: Option<&str>,
        now: i64,
    ) -> SsoResult<Identity> {
        let authorization = match authorization {
            Some(value) if !value.is_empty() => value,
            _ => return Err(SsoError::NoAuthorization),
        };

        if authorization.len() < MIN_AUTHORIZATION_LENGTH {
            return Err(SsoError::MalformedAuthorization);
        }
        let Some(token) = authorization.strip_prefix(BEARER_PREFIX) else {
            return Err(SsoError::MalformedAuthorization);
        };
        if token.split('.').count() != 3 {
            return Err(SsoError::MalformedAuthorization);
        }

        let claims = token::verify_at(token, &self.public_key, now).inspect_err(|e| {
            debug!("Rejected bearer token: {}", e);
        })?;
        Ok(claims.into_identity())
    }
}
