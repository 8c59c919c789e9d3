//! Token payload and issuance response.

use serde::{Deserialize, Serialize};

use crate::providers::Identity;
use crate::types::{RefreshId, UserName};

/// Value of `token_type` in every issuance response.
pub const TOKEN_TYPE_BEARER: &str = "bearer";

/// Claims carried by an access token.
///
/// Field names are a stable contract with external token consumers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    pub user: UserName,
    pub roles: Vec<String>,
    pub issuer: String,
    /// Seconds since the Unix epoch.
    pub expires_at: i64,
}

impl Claims {
    pub fn new(identity: &Identity, issuer: &str, expires_at: i64) -> Self {
        Self {
            user: identity.user_name().clone(),
            roles: identity.roles().to_vec(),
            issuer: issuer.to_string(),
            expires_at,
        }
    }

    pub fn into_identity(self) -> Identity {
        Identity::new(self.user, self.roles)
    }
}

/// Result of a successful authentication or refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticationResponse {
    pub token_type: String,
    pub access_token: String,
    pub refresh_token: RefreshId,
}

impl AuthenticationResponse {
    pub fn bearer(access_token: String, refresh_token: RefreshId) -> Self {
        Self {
            token_type: TOKEN_TYPE_BEARER.to_string(),
            access_token,
            refresh_token,
        }
    }
}
