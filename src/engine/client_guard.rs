//! Client credentials protecting the service endpoints.

use sha2::{Digest, Sha256};

/// Expected client id and password, kept as SHA-256 digests.
#[derive(Clone)]
pub struct ClientGuard {
    id_digest: [u8; 32],
    password_digest: [u8; 32],
}

fn digest(value: &str) -> [u8; 32] {
    Sha256::digest(value.as_bytes()).into()
}

impl ClientGuard {
    pub fn new(client_id: &str, client_password: &str) -> Self {
        Self {
            id_digest: digest(client_id),
            password_digest: digest(client_password),
        }
    }

    /// Both the id and the password must match.
    pub fn check(&self, client_id: &str, client_password: &str) -> bool {
        let id_ok = digest(client_id) == self.id_digest;
        let password_ok = digest(client_password) == self.password_digest;
        id_ok & password_ok
    }
}

impl std::fmt::Debug for ClientGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ClientGuard(<redacted>)")
    }
}
