//! LDAP directory credential provider.
//!
//! Authentication follows the usual search-then-bind pattern:
//!
//! 1. connect (bounded dial timeout), upgrading with StartTLS when `ssl` is set
//! 2. bind with the read-only identity if one is configured
//! 3. find the single `inetOrgPerson` entry whose `uid` is the user name
//! 4. re-bind as that entry with the supplied password
//! 5. collect the `cn` of every `posixGroup` listing the user as `memberUid`
//!
//! ## Security caveat
//!
//! The StartTLS upgrade does NOT validate the server certificate chain. The
//! connection is encrypted but the directory is not authenticated.

use std::time::Duration;

use ldap3::{
    Ldap, LdapConnAsync, LdapConnSettings, LdapResult, Scope, SearchEntry, SearchOptions,
    ldap_escape,
};
use tracing::{debug, warn};

use crate::config::DirectorySettings;
use crate::error::{SsoError, SsoResult};
use crate::providers::Identity;

/// Timeout for opening the connection to the directory.
pub const DIAL_TIMEOUT: Duration = Duration::from_secs(20);

/// Server-side time limit of each search, in seconds.
pub const SEARCH_TIME_LIMIT_SECONDS: i32 = 30;

/// Client-side bound on every request, a little above the server limit.
const OPERATION_TIMEOUT: Duration = Duration::from_secs(35);

#[derive(Debug, Clone)]
pub struct DirectoryProvider {
    settings: DirectorySettings,
}

impl DirectoryProvider {
    pub fn new(settings: DirectorySettings) -> Self {
        Self { settings }
    }

    pub fn url(&self) -> String {
        format!("ldap://{}:{}", self.settings.host, self.settings.port)
    }

    pub(crate) fn user_filter(user_name: &str) -> String {
        format!(
            "(&(objectClass=inetOrgPerson)(uid={}))",
            ldap_escape(user_name)
        )
    }

    pub(crate) fn group_filter(user_name: &str) -> String {
        format!(
            "(&(objectClass=posixGroup)(memberUid={}))",
            ldap_escape(user_name)
        )
    }

    pub async fn authenticate(&self, user_name: &str, password: &str) -> SsoResult<Identity> {
        let conn_settings = LdapConnSettings::new()
            .set_conn_timeout(DIAL_TIMEOUT)
            .set_starttls(self.settings.ssl)
            .set_no_tls_verify(self.settings.ssl);

        debug!("Connecting to directory {}", self.url());
        let (conn, mut ldap) = LdapConnAsync::with_settings(conn_settings, &self.url()).await?;
        ldap3::drive!(conn);

        let outcome = self.authenticate_on(&mut ldap, user_name, password).await;

        if let Err(e) = ldap.unbind().await {
            debug!("Directory unbind failed: {}", e);
        }

        outcome
    }

    async fn authenticate_on(
        &self,
        ldap: &mut Ldap,
        user_name: &str,
        password: &str,
    ) -> SsoResult<Identity> {
        if let Some(bind) = &self.settings.bind {
            ldap.with_timeout(OPERATION_TIMEOUT)
                .simple_bind(&bind.dn, &bind.password)
                .await?
                .success()?;
        }

        let (entries, _) = ldap
            .with_timeout(OPERATION_TIMEOUT)
            .with_search_options(SearchOptions::new().timelimit(SEARCH_TIME_LIMIT_SECONDS))
            .search(
                &self.settings.base_dn,
                Scope::Subtree,
                &Self::user_filter(user_name),
                vec!["dn"],
            )
            .await?
            .success()?;
        let entries = entries.into_iter().map(SearchEntry::construct).collect();
        let user_dn = single_user_dn(user_name, entries)?;

        refuse_empty_password(password)?;
        let bind = ldap
            .with_timeout(OPERATION_TIMEOUT)
            .simple_bind(&user_dn, password)
            .await?;
        check_user_bind(&user_dn, bind)?;

        let (groups, _) = ldap
            .with_timeout(OPERATION_TIMEOUT)
            .with_search_options(SearchOptions::new().timelimit(SEARCH_TIME_LIMIT_SECONDS))
            .search(
                &self.settings.base_dn,
                Scope::Subtree,
                &Self::group_filter(user_name),
                vec!["cn"],
            )
            .await?
            .success()?;
        let roles = group_roles(groups.into_iter().map(SearchEntry::construct).collect());

        Ok(Identity::new(user_name, roles))
    }
}

/// The DN of the only entry found for `user_name`.
fn single_user_dn(user_name: &str, entries: Vec<SearchEntry>) -> SsoResult<String> {
    if entries.len() != 1 {
        debug!(
            "Directory search for {} returned {} entries",
            user_name,
            entries.len()
        );
        return Err(SsoError::UserNotFound);
    }
    entries
        .into_iter()
        .next()
        .map(|entry| entry.dn)
        .ok_or(SsoError::UserNotFound)
}

/// An empty simple bind is an anonymous bind and would succeed.
fn refuse_empty_password(password: &str) -> SsoResult<()> {
    if password.is_empty() {
        return Err(SsoError::Unauthorized);
    }
    Ok(())
}

fn check_user_bind(user_dn: &str, bind: LdapResult) -> SsoResult<()> {
    bind.success().map(|_| ()).map_err(|e| {
        warn!("Directory refused the bind of {}: {}", user_dn, e);
        SsoError::Unauthorized
    })
}

/// Every `cn` value of every group, in search order.
fn group_roles(groups: Vec<SearchEntry>) -> Vec<String> {
    groups
        .into_iter()
        .flat_map(|mut entry| entry.attrs.remove("cn").unwrap_or_default())
        .collect()
}
