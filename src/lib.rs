// Core modules
pub mod config;
pub mod error;
pub mod types;

// Authentication, issuance and validation
pub mod engine;
pub mod providers;
pub mod token;
pub mod validator;

#[cfg(test)]
mod testing;

#[cfg(test)]
mod integration_tests;

// Re-export key types and functions
pub use config::{Configuration, ProviderKind, ValidatorConfiguration, resolve_config_path};
pub use engine::{EngineHandle, RefreshStore, TokenEngine};
pub use error::{SsoError, SsoResult};
pub use providers::{Identity, ProviderChain};
pub use token::{AuthenticationResponse, Claims};
pub use types::{RefreshId, UserName};
pub use validator::TokenValidator;

use std::path::Path;

/// Load the configuration at `path` and start an engine from it.
pub fn create_engine(path: &Path) -> SsoResult<EngineHandle> {
    let configuration = Configuration::load(path)?;
    let engine = TokenEngine::new(&configuration)?;
    Ok(EngineHandle::new(engine))
}
