//! Shared handle on the current token engine.

use std::path::Path;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::{error, info};

use crate::config::Configuration;
use crate::engine::TokenEngine;
use crate::error::SsoResult;

/// Cloneable reference to the engine currently serving requests.
///
/// Callers take an `Arc<TokenEngine>` snapshot with [`EngineHandle::current`];
/// an operation that started on the old engine finishes there even if a
/// reload swaps the engine meanwhile.
#[derive(Debug, Clone)]
pub struct EngineHandle {
    current: Arc<RwLock<Arc<TokenEngine>>>,
    reload_lock: Arc<Mutex<()>>,
}

impl EngineHandle {
    pub fn new(engine: TokenEngine) -> Self {
        Self {
            current: Arc::new(RwLock::new(Arc::new(engine))),
            reload_lock: Arc::new(Mutex::new(())),
        }
    }

    pub async fn current(&self) -> Arc<TokenEngine> {
        self.current.read().await.clone()
    }

    /// Build a successor engine from `configuration` and install it.
    ///
    /// On failure the current engine keeps serving and the error is returned.
    pub async fn reload(&self, configuration: &Configuration) -> SsoResult<()> {
        // One rebuild at a time, so no successor is built from a stale engine
        let _guard = self.reload_lock.lock().await;

        let previous = self.current().await;
        let next = TokenEngine::rebuild(configuration, &previous).inspect_err(|e| {
            error!("Reload rejected, keeping the current engine: {}", e);
        })?;

        *self.current.write().await = Arc::new(next);
        info!("SSO engine reloaded");
        Ok(())
    }

    pub async fn reload_from_file(&self, path: &Path) -> SsoResult<()> {
        info!("Reloading configuration from {}", path.display());
        let configuration = Configuration::load(path)?;
        self.reload(&configuration).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::Identity;
    use crate::testing::Fixture;
    use serde_json::json;

    #[tokio::test]
    async fn test_reload_swaps_engine_and_keeps_store() {
        let fixture = Fixture::new();
        let engine = TokenEngine::new(&fixture.basic_configuration(json!({}))).unwrap();
        let handle = EngineHandle::new(engine);

        let before = handle.current().await;
        let issued = before.enroll(Identity::new("alice", vec![])).await.unwrap();

        let next = fixture.basic_configuration(json!({ "issuer": "reloaded" }));
        handle.reload(&next).await.unwrap();

        let after = handle.current().await;
        assert!(!Arc::ptr_eq(&before, &after));
        assert_eq!(after.issuer(), "reloaded");
        assert!(Arc::ptr_eq(&before.refresh_store(), &after.refresh_store()));
        assert!(after.refresh(issued.refresh_token.as_str()).await.is_ok());
    }

    #[tokio::test]
    async fn test_failed_reload_keeps_current_engine() {
        let fixture = Fixture::new();
        let engine = TokenEngine::new(&fixture.basic_configuration(json!({}))).unwrap();
        let handle = EngineHandle::new(engine);
        let before = handle.current().await;

        let broken = fixture.basic_configuration(json!({ "tokenSecondsToLive": 0 }));
        assert!(handle.reload(&broken).await.is_err());
        assert!(Arc::ptr_eq(&before, &handle.current().await));
    }

    #[tokio::test]
    async fn test_reload_from_file() {
        let fixture = Fixture::new();
        let engine = TokenEngine::new(&fixture.basic_configuration(json!({}))).unwrap();
        let handle = EngineHandle::new(engine);

        let path = fixture.write_config(json!({ "issuer": "from-file" }));
        handle.reload_from_file(&path).await.unwrap();
        assert_eq!(handle.current().await.issuer(), "from-file");

        assert!(
            handle
                .reload_from_file(Path::new("/nonexistent/sso.json"))
                .await
                .is_err()
        );
    }
}
