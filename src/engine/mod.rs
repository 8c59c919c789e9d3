//! Token engine: authentication, issuance and refresh.
//!
//! The engine composes the provider chain, the signing key and the refresh
//! store:
//!
//! - `authenticate` checks credentials against the chain
//! - `enroll` issues an access token and a refresh token for an identity
//! - `refresh` redeems a refresh token for a new pair
//!
//! An engine is immutable apart from its refresh store. Reloading the
//! configuration builds a new engine with [`TokenEngine::rebuild`], which hands
//! the same store to the successor; [`EngineHandle`] swaps the current engine
//! atomically.

mod client_guard;
mod handle;
mod refresh_store;

pub use client_guard::ClientGuard;
pub use handle::EngineHandle;
pub use refresh_store::{RefreshRecord, RefreshStore};

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::{Configuration, EngineSettings, ProviderKind};
use crate::error::{SsoError, SsoResult};
use crate::providers::{Identity, ProviderChain};
use crate::token::{self, AuthenticationResponse, SigningKey, unix_now};

#[derive(Debug)]
pub struct TokenEngine {
    chain: ProviderChain,
    signing_key: SigningKey,
    refresh_store: Arc<RefreshStore>,
    issuer: String,
    token_seconds_to_live: i64,
    refresh_seconds_to_live: i64,
    rotate_refresh_tokens: bool,
    client_guard: Option<ClientGuard>,
}

impl TokenEngine {
    /// Build an engine with an empty refresh store.
    pub fn new(configuration: &Configuration) -> SsoResult<Self> {
        info!("Creating SSO engine");
        Self::build(configuration, Arc::new(RefreshStore::new()))
    }

    /// Build a successor of `previous` from a new configuration.
    ///
    /// Providers, keys and lifetimes come from `configuration`; the refresh
    /// store is the very same instance as the one of `previous`, so refresh
    /// tokens issued before the reload stay redeemable.
    pub fn rebuild(configuration: &Configuration, previous: &TokenEngine) -> SsoResult<Self> {
        info!("Rebuilding SSO engine, keeping the refresh tokens");
        Self::build(configuration, previous.refresh_store())
    }

    fn build(configuration: &Configuration, refresh_store: Arc<RefreshStore>) -> SsoResult<Self> {
        let settings = configuration.validate()?;
        Self::from_settings(settings, refresh_store)
    }

    pub fn from_settings(
        settings: EngineSettings,
        refresh_store: Arc<RefreshStore>,
    ) -> SsoResult<Self> {
        let signing_key = SigningKey::from_file(&settings.private_key_path)?;
        let chain = ProviderChain::from_settings(&settings.providers);
        let client_guard = settings
            .client_credentials
            .as_ref()
            .map(|(id, password)| ClientGuard::new(id, password));

        if settings.rotate_refresh_tokens {
            info!("Refresh tokens are single use (rotateRefreshTokens)");
        }

        Ok(Self {
            chain,
            signing_key,
            refresh_store,
            issuer: settings.issuer,
            token_seconds_to_live: settings.token_seconds_to_live,
            refresh_seconds_to_live: settings.refresh_seconds_to_live,
            rotate_refresh_tokens: settings.rotate_refresh_tokens,
            client_guard,
        })
    }

    /// The refresh store, shared with any successor engine.
    pub fn refresh_store(&self) -> Arc<RefreshStore> {
        self.refresh_store.clone()
    }

    pub fn provider_kinds(&self) -> Vec<ProviderKind> {
        self.chain.kinds()
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Validate the credentials against the configured providers, in order.
    pub async fn authenticate(&self, user_name: &str, password: &str) -> SsoResult<Identity> {
        self.chain.authenticate(user_name, password).await
    }

    /// Issue an access token and a refresh token for `identity`.
    pub async fn enroll(&self, identity: Identity) -> SsoResult<AuthenticationResponse> {
        self.enroll_at(identity, unix_now()).await
    }

    pub(crate) async fn enroll_at(
        &self,
        identity: Identity,
        now: i64,
    ) -> SsoResult<AuthenticationResponse> {
        let access_token = token::sign_at(
            &identity,
            self.token_seconds_to_live,
            &self.issuer,
            &self.signing_key,
            now,
        )?;

        let user_name = identity.user_name().clone();
        let refresh_token = self
            .refresh_store
            .put_at(identity, self.refresh_seconds_to_live, now)
            .await?;
        debug!("Issued tokens for {}", user_name);

        Ok(AuthenticationResponse::bearer(access_token, refresh_token))
    }

    /// Redeem a refresh token for a new access token and a new refresh token.
    pub async fn refresh(&self, refresh_token: &str) -> SsoResult<AuthenticationResponse> {
        self.refresh_at(refresh_token, unix_now()).await
    }

    pub(crate) async fn refresh_at(
        &self,
        refresh_token: &str,
        now: i64,
    ) -> SsoResult<AuthenticationResponse> {
        let identity = self
            .refresh_store
            .redeem(refresh_token, now, self.rotate_refresh_tokens)
            .await
            .inspect_err(|e| match e {
                SsoError::RefreshTokenNotFound => {
                    warn!("Unable to find the refresh token {}", refresh_token)
                }
                SsoError::RefreshTooOld => {
                    warn!("The refresh token is too old to be used {}", refresh_token)
                }
                _ => {}
            })?;

        self.enroll_at(identity, now).await
    }

    /// Check the client credentials of a request.
    ///
    /// Passes when no client credentials are configured.
    pub fn check_client(&self, credentials: Option<(&str, &str)>) -> SsoResult<()> {
        let Some(guard) = &self.client_guard else {
            return Ok(());
        };
        match credentials {
            Some((id, password)) if guard.check(id, password) => Ok(()),
            _ => Err(SsoError::NoAuthorization),
        }
    }

    /// Drop the refresh tokens past their deadline.
    pub async fn purge_expired_refresh_tokens(&self) -> usize {
        let purged = self.refresh_store.purge_expired(unix_now()).await;
        if purged > 0 {
            info!("Purged {} expired refresh tokens", purged);
        }
        purged
    }
}
