//! Ordered provider chain.

use tracing::debug;

use crate::config::{ProviderKind, ProviderSettings};
use crate::error::{SsoError, SsoResult};
use crate::providers::{Identity, Provider};

/// Providers tried strictly in configured order.
#[derive(Debug)]
pub struct ProviderChain {
    providers: Vec<Provider>,
}

impl ProviderChain {
    pub fn new(providers: Vec<Provider>) -> Self {
        Self { providers }
    }

    pub fn from_settings(settings: &[ProviderSettings]) -> Self {
        Self::new(settings.iter().map(Provider::from_settings).collect())
    }

    pub fn kinds(&self) -> Vec<ProviderKind> {
        self.providers.iter().map(Provider::kind).collect()
    }

    /// Return the identity from the first provider accepting the credentials.
    ///
    /// When every provider fails the result is always `UserNotFound`: a wrong
    /// password reported by one provider is not distinguishable from an
    /// unknown user once the chain has been exhausted.
    pub async fn authenticate(&self, user_name: &str, password: &str) -> SsoResult<Identity> {
        for provider in &self.providers {
            match provider.authenticate(user_name, password).await {
                Ok(identity) => {
                    debug!("User {} authenticated by {} provider", user_name, provider.kind());
                    return Ok(identity);
                }
                Err(e) => {
                    debug!(
                        "Provider {} did not authenticate {}: {}",
                        provider.kind(),
                        user_name,
                        e
                    );
                }
            }
        }
        Err(SsoError::UserNotFound)
    }
}
