//! Access token encoding and verification.
//!
//! Access tokens are compact JWS strings (`header.payload.signature`, each
//! segment base64url encoded) signed with RS512. They are self-contained: the
//! engine keeps no record of the tokens it issued.

mod claims;
mod codec;

pub use claims::{AuthenticationResponse, Claims, TOKEN_TYPE_BEARER};
pub use codec::{SIGNING_ALGORITHM, SigningKey, VerifyingKey, sign, sign_at, verify, verify_at};

/// Wall clock, in seconds since the Unix epoch.
pub fn unix_now() -> i64 {
    chrono::Utc::now().timestamp()
}
