//! RS512 signing and verification of access tokens.

use std::fmt;
use std::fs;
use std::path::Path;

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, crypto, decode, encode,
};
use tracing::{debug, error};

use crate::error::{SsoError, SsoResult};
use crate::providers::Identity;
use crate::token::{Claims, unix_now};

/// Signature scheme of every access token.
pub const SIGNING_ALGORITHM: Algorithm = Algorithm::RS512;

/// Private half of the signing key pair, held by the token engine.
pub struct SigningKey {
    key: EncodingKey,
}

impl SigningKey {
    /// Parse a PEM encoded RSA private key (PKCS#1 or PKCS#8).
    ///
    /// The key is used once on a throwaway message so that unusable key
    /// material is reported here and not on the first issuance.
    pub fn from_pem(pem: &[u8]) -> SsoResult<Self> {
        let key = EncodingKey::from_rsa_pem(pem).map_err(|e| {
            SsoError::bad_configuration(format!("Invalid RSA private key: {}", e))
        })?;
        crypto::sign(b"probe", &key, SIGNING_ALGORITHM).map_err(|e| {
            SsoError::bad_configuration(format!("Unusable RSA private key: {}", e))
        })?;
        Ok(Self { key })
    }

    pub fn from_file(path: &Path) -> SsoResult<Self> {
        let pem = fs::read(path).map_err(|e| {
            error!(
                "Configuration for SSO, attribute privateKeyPath is referencing an unreadable file: {}",
                path.display()
            );
            SsoError::bad_configuration(format!("Unable to read {}: {}", path.display(), e))
        })?;
        Self::from_pem(&pem).inspect_err(|_| {
            error!(
                "Configuration for SSO, attribute privateKeyPath is referencing a non-valid file: {}",
                path.display()
            );
        })
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SigningKey(<redacted>)")
    }
}

/// Public half of the signing key pair, held by token validators.
#[derive(Clone)]
pub struct VerifyingKey {
    key: DecodingKey,
}

impl VerifyingKey {
    /// Parse a PEM encoded RSA public key (SubjectPublicKeyInfo or PKCS#1).
    pub fn from_pem(pem: &[u8]) -> SsoResult<Self> {
        let key = DecodingKey::from_rsa_pem(pem).map_err(|e| {
            SsoError::bad_configuration(format!("Invalid RSA public key: {}", e))
        })?;
        Ok(Self { key })
    }

    pub fn from_file(path: &Path) -> SsoResult<Self> {
        let pem = fs::read(path).map_err(|e| {
            error!(
                "Configuration for validator, attribute publicKeyPath is referencing an unreadable file: {}",
                path.display()
            );
            SsoError::bad_configuration(format!("Unable to read {}: {}", path.display(), e))
        })?;
        Self::from_pem(&pem).inspect_err(|_| {
            error!(
                "Configuration for validator, attribute publicKeyPath is referencing a non-valid file: {}",
                path.display()
            );
        })
    }
}

impl fmt::Debug for VerifyingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("VerifyingKey(..)")
    }
}

/// Sign an access token for `identity`, valid for `seconds_to_live` from now.
pub fn sign(
    identity: &Identity,
    seconds_to_live: i64,
    issuer: &str,
    key: &SigningKey,
) -> SsoResult<String> {
    sign_at(identity, seconds_to_live, issuer, key, unix_now())
}

pub fn sign_at(
    identity: &Identity,
    seconds_to_live: i64,
    issuer: &str,
    key: &SigningKey,
    now: i64,
) -> SsoResult<String> {
    let expires_at = now.checked_add(seconds_to_live).ok_or_else(|| {
        error!("Token lifetime of {} seconds overflows the clock", seconds_to_live);
        SsoError::Signing(format!("lifetime {} out of range", seconds_to_live))
    })?;
    let claims = Claims::new(identity, issuer, expires_at);
    encode(&Header::new(SIGNING_ALGORITHM), &claims, &key.key).map_err(|e| {
        error!("Unable to sign generated token: {}", e);
        SsoError::Signing(e.to_string())
    })
}

/// Verify a token and return its claims.
pub fn verify(token: &str, key: &VerifyingKey) -> SsoResult<Claims> {
    verify_at(token, key, unix_now())
}

/// Verify a token against the clock value `now`.
///
/// The checks run in order: shape, signature, payload, expiry. A token whose
/// `expiresAt` equals `now` is still accepted.
pub fn verify_at(token: &str, key: &VerifyingKey, now: i64) -> SsoResult<Claims> {
    if token.split('.').count() != 3 {
        return Err(SsoError::TokenMalformed);
    }

    // Expiry is carried by `expiresAt`, not by the registered `exp` claim
    let mut validation = Validation::new(SIGNING_ALGORITHM);
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    let claims = decode::<Claims>(token, &key.key, &validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            ErrorKind::InvalidSignature => SsoError::SignatureInvalid,
            _ => {
                debug!("Undecodable token: {}", e);
                SsoError::TokenMalformed
            }
        })?;

    if claims.expires_at < now {
        return Err(SsoError::TokenTooOld);
    }

    Ok(claims)
}
