//! Static-table credential provider.

use std::collections::HashMap;

use tracing::warn;

use crate::config::BasicConfiguration;
use crate::error::{SsoError, SsoResult};
use crate::providers::Identity;

#[derive(Debug, Clone)]
struct BasicUser {
    password: String,
    roles: Vec<String>,
}

/// Users, passwords and roles taken verbatim from the configuration.
#[derive(Debug, Clone, Default)]
pub struct BasicProvider {
    users: HashMap<String, BasicUser>,
}

impl BasicProvider {
    /// Build the user table.
    ///
    /// Null entries and entries without a user name are skipped with a
    /// warning. A missing password is an empty password.
    pub fn from_config(configuration: &BasicConfiguration) -> Self {
        let mut users = HashMap::new();

        for entry in configuration.users.iter().flatten() {
            let Some(entry) = entry else {
                warn!("Configuration for Basic, attribute users has a null entry. Skipping user.");
                continue;
            };
            let user_name = match entry.user_name.as_deref() {
                Some(name) if !name.trim().is_empty() => name.to_string(),
                _ => {
                    warn!(
                        "Configuration for Basic, attribute users has an entry with an empty/null value for userName. Skipping user."
                    );
                    continue;
                }
            };

            let mut roles = Vec::new();
            for role in entry.roles.iter().flatten() {
                match role {
                    Some(role) => roles.push(role.clone()),
                    None => warn!(
                        "Configuration for Basic, user {} has a null role. Skipping role.",
                        user_name
                    ),
                }
            }

            users.insert(
                user_name,
                BasicUser {
                    password: entry.password.clone().unwrap_or_default(),
                    roles,
                },
            );
        }

        Self { users }
    }

    pub fn authenticate(&self, user_name: &str, password: &str) -> SsoResult<Identity> {
        let user = self.users.get(user_name).ok_or(SsoError::UserNotFound)?;

        if user.password != password {
            return Err(SsoError::Unauthorized);
        }

        Ok(Identity::new(user_name, user.roles.clone()))
    }

    /// Number of usable users.
    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}
