//! Credential providers and the ordered provider chain.
//!
//! A provider verifies a user name / password pair against one identity
//! source and returns the user's [`Identity`]:
//!
//! - **Basic**: users, passwords and roles kept in the configuration
//! - **Directory**: an LDAP server, roles taken from group membership
//!
//! Provider kinds are resolved into [`Provider`] values when the configuration
//! is loaded, so the authentication path never looks at kind names.

mod basic;
mod chain;
mod directory;

pub use basic::BasicProvider;
pub use chain::ProviderChain;
pub use directory::{DIAL_TIMEOUT, DirectoryProvider, SEARCH_TIME_LIMIT_SECONDS};

use serde::{Deserialize, Serialize};

use crate::config::{ProviderKind, ProviderSettings};
use crate::error::SsoResult;
use crate::types::UserName;

/// A successfully authenticated user. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    user_name: UserName,
    roles: Vec<String>,
}

impl Identity {
    pub fn new(user_name: impl Into<UserName>, roles: Vec<String>) -> Self {
        Self {
            user_name: user_name.into(),
            roles,
        }
    }

    pub fn user_name(&self) -> &UserName {
        &self.user_name
    }

    pub fn roles(&self) -> &[String] {
        &self.roles
    }

    pub fn into_parts(self) -> (UserName, Vec<String>) {
        (self.user_name, self.roles)
    }
}

/// A configured credential provider.
#[derive(Debug)]
pub enum Provider {
    Basic(BasicProvider),
    Directory(DirectoryProvider),
}

impl Provider {
    pub fn from_settings(settings: &ProviderSettings) -> Self {
        match settings {
            ProviderSettings::Basic(cfg) => Self::Basic(BasicProvider::from_config(cfg)),
            ProviderSettings::Directory(cfg) => {
                Self::Directory(DirectoryProvider::new(cfg.clone()))
            }
        }
    }

    pub fn kind(&self) -> ProviderKind {
        match self {
            Self::Basic(_) => ProviderKind::Basic,
            Self::Directory(_) => ProviderKind::Directory,
        }
    }

    /// Verify the credentials against this provider.
    ///
    /// Fails with `UserNotFound` or `Unauthorized`; the directory provider may
    /// also fail with a `Directory` error for network or protocol problems.
    pub async fn authenticate(&self, user_name: &str, password: &str) -> SsoResult<Identity> {
        match self {
            Self::Basic(provider) => provider.authenticate(user_name, password),
            Self::Directory(provider) => provider.authenticate(user_name, password).await,
        }
    }
}
