//! Configuration file model, loading and validation.
//!
//! The service reads a JSON document with an `sso` block and one block per
//! credential provider (`basic`, `ldap`). Validation turns the raw, all-optional
//! document into [`EngineSettings`], where the provider list has already been
//! resolved into concrete [`ProviderSettings`] in configured order.

use serde::Deserialize;
use std::{
    env, fmt, fs,
    path::{Path, PathBuf},
};
use tracing::{error, warn};

use crate::error::{SsoError, SsoResult};

/// Issuer written in every access token unless the configuration overrides it.
pub const DEFAULT_ISSUER: &str = "Easy SSO Server";

/// Environment variable naming the configuration file.
pub const CONFIG_ENV_VAR: &str = "SSO_CONFIG";

/// Configuration file used when neither a path nor the env var is given.
pub const DEFAULT_CONFIG_FILE: &str = "sso.json";

/// Upper bound of `tokenSecondsToLive` and `refreshSecondsToLive` (ten years).
pub const MAX_SECONDS_TO_LIVE: i64 = 10 * 365 * 24 * 60 * 60;

/// Maximum number of providers in a chain (one per kind).
pub const MAX_PROVIDERS: usize = 2;

/// Kind of credential provider, as named in the `providers` list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Basic,
    #[serde(alias = "ldap")]
    Directory,
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Basic => write!(f, "basic"),
            Self::Directory => write!(f, "directory"),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Configuration {
    pub sso: Option<SsoConfiguration>,
    pub ldap: Option<DirectoryConfiguration>,
    pub basic: Option<BasicConfiguration>,
}

/// General parameters of the token engine.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SsoConfiguration {
    pub client_id: Option<String>,
    pub client_password: Option<String>,
    pub private_key_path: Option<PathBuf>,
    pub token_seconds_to_live: Option<i64>,
    pub refresh_seconds_to_live: Option<i64>,
    pub providers: Option<Vec<ProviderKind>>,
    pub issuer: Option<String>,
    /// Invalidate a refresh token once it has been redeemed.
    #[serde(default)]
    pub rotate_refresh_tokens: bool,
}

/// Connection parameters of an LDAP directory.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DirectoryConfiguration {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub ssl: Option<bool>,
    #[serde(rename = "baseDN")]
    pub base_dn: Option<String>,
    #[serde(rename = "bindDN")]
    pub bind_dn: Option<String>,
    #[serde(rename = "bindPassword")]
    pub bind_password: Option<String>,
}

/// Users and roles kept directly in the configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BasicConfiguration {
    pub users: Option<Vec<Option<BasicUserConfiguration>>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BasicUserConfiguration {
    pub user_name: Option<String>,
    pub password: Option<String>,
    pub roles: Option<Vec<Option<String>>>,
}

/// Validated directory parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectorySettings {
    pub host: String,
    pub port: u16,
    pub ssl: bool,
    pub base_dn: String,
    /// Read-only identity used for the user search; anonymous when `None`.
    pub bind: Option<DirectoryBind>,
}

#[derive(Clone, PartialEq, Eq)]
pub struct DirectoryBind {
    pub dn: String,
    pub password: String,
}

impl fmt::Debug for DirectoryBind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectoryBind")
            .field("dn", &self.dn)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// One entry of the provider chain, resolved at configuration-load time.
#[derive(Debug, Clone)]
pub enum ProviderSettings {
    Basic(BasicConfiguration),
    Directory(DirectorySettings),
}

impl ProviderSettings {
    pub fn kind(&self) -> ProviderKind {
        match self {
            Self::Basic(_) => ProviderKind::Basic,
            Self::Directory(_) => ProviderKind::Directory,
        }
    }
}

/// Everything the token engine needs, checked and defaulted.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub private_key_path: PathBuf,
    pub token_seconds_to_live: i64,
    pub refresh_seconds_to_live: i64,
    pub issuer: String,
    pub rotate_refresh_tokens: bool,
    pub client_credentials: Option<(String, String)>,
    pub providers: Vec<ProviderSettings>,
}

fn bad_configuration(msg: impl Into<String>) -> SsoError {
    let msg = msg.into();
    error!("{}", msg);
    SsoError::BadConfiguration(msg)
}

impl Configuration {
    /// Parse a configuration document and expand `${VAR}` references.
    pub fn from_json(raw: &str) -> SsoResult<Self> {
        let cfg: Configuration = serde_json::from_str(raw)
            .map_err(|e| bad_configuration(format!("Unable to parse the configuration: {}", e)))?;
        Ok(cfg.expand())
    }

    /// Read and parse a configuration file.
    pub fn load(path: &Path) -> SsoResult<Self> {
        let raw = fs::read_to_string(path).map_err(|e| {
            bad_configuration(format!(
                "Unable to read the configuration file {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_json(&raw)
    }

    fn expand(mut self) -> Self {
        if let Some(sso) = self.sso.as_mut() {
            expand_opt(&mut sso.client_id);
            expand_opt(&mut sso.client_password);
            expand_opt(&mut sso.issuer);
            if let Some(path) = sso.private_key_path.as_mut() {
                *path = PathBuf::from(expand_env_vars(&path.to_string_lossy()));
            }
        }
        if let Some(ldap) = self.ldap.as_mut() {
            expand_opt(&mut ldap.host);
            expand_opt(&mut ldap.base_dn);
            expand_opt(&mut ldap.bind_dn);
            expand_opt(&mut ldap.bind_password);
        }
        if let Some(users) = self.basic.as_mut().and_then(|b| b.users.as_mut()) {
            for user in users.iter_mut().flatten() {
                expand_opt(&mut user.password);
            }
        }
        self
    }

    /// Check the whole configuration and resolve it into engine settings.
    pub fn validate(&self) -> SsoResult<EngineSettings> {
        let sso = self
            .sso
            .as_ref()
            .ok_or_else(|| bad_configuration("Configuration for SSO is missing"))?;

        let private_key_path = sso.private_key_path.clone().ok_or_else(|| {
            bad_configuration(
                "Configuration for SSO is missing the definition for privateKeyPath attribute",
            )
        })?;
        let token_seconds_to_live = sso.token_seconds_to_live.ok_or_else(|| {
            bad_configuration(
                "Configuration for SSO is missing the definition for tokenSecondsToLive attribute",
            )
        })?;
        let refresh_seconds_to_live = sso.refresh_seconds_to_live.ok_or_else(|| {
            bad_configuration(
                "Configuration for SSO is missing the definition for refreshSecondsToLive attribute",
            )
        })?;
        let kinds = match sso.providers.as_deref() {
            Some(kinds) if !kinds.is_empty() => kinds,
            _ => {
                return Err(bad_configuration(
                    "Configuration for SSO is missing the definition for providers attribute",
                ));
            }
        };
        if kinds.len() > MAX_PROVIDERS {
            return Err(bad_configuration(format!(
                "Configuration for SSO, attribute providers is limited to {} entries",
                MAX_PROVIDERS
            )));
        }
        if kinds.len() == 2 && kinds[0] == kinds[1] {
            return Err(bad_configuration(
                "Configuration for SSO, attribute providers must specify different provider for each entry",
            ));
        }

        let client_credentials = match (&sso.client_id, &sso.client_password) {
            (Some(id), Some(password)) => Some((id.clone(), password.clone())),
            (None, None) => None,
            (Some(_), None) => {
                return Err(bad_configuration(
                    "Configuration for SSO, a client id was given but without a client password",
                ));
            }
            (None, Some(_)) => {
                return Err(bad_configuration(
                    "Configuration for SSO, a client password was given but without a client id",
                ));
            }
        };

        if !private_key_path.exists() {
            return Err(bad_configuration(format!(
                "Configuration for SSO, attribute privateKeyPath is referencing a not existing file: {}",
                private_key_path.display()
            )));
        }
        if token_seconds_to_live <= 0 {
            return Err(bad_configuration(
                "Configuration for SSO, attribute tokenSecondsToLive must be greater than 0",
            ));
        }
        if refresh_seconds_to_live <= 0 {
            return Err(bad_configuration(
                "Configuration for SSO, attribute refreshSecondsToLive must be greater than 0",
            ));
        }
        if token_seconds_to_live > MAX_SECONDS_TO_LIVE
            || refresh_seconds_to_live > MAX_SECONDS_TO_LIVE
        {
            return Err(bad_configuration(format!(
                "Configuration for SSO, attributes tokenSecondsToLive and refreshSecondsToLive are limited to {} seconds",
                MAX_SECONDS_TO_LIVE
            )));
        }
        if refresh_seconds_to_live <= token_seconds_to_live {
            return Err(bad_configuration(
                "Configuration for SSO, attribute refreshSecondsToLive must be greater than tokenSecondsToLive",
            ));
        }

        // Optional blocks are validated when present, referenced or not
        let directory = self.ldap.as_ref().map(validate_directory).transpose()?;
        if let Some(basic) = &self.basic {
            validate_basic(basic)?;
        }

        let mut providers = Vec::with_capacity(kinds.len());
        for kind in kinds {
            let settings = match kind {
                ProviderKind::Basic => self.basic.clone().map(ProviderSettings::Basic),
                ProviderKind::Directory => directory.clone().map(ProviderSettings::Directory),
            };
            let settings = settings.ok_or_else(|| {
                bad_configuration(format!(
                    "Configuration for SSO, attribute providers is set to use the \"{}\" provider, but this provider is not defined in the configuration",
                    kind
                ))
            })?;
            providers.push(settings);
        }

        let issuer = sso
            .issuer
            .clone()
            .filter(|issuer| !issuer.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_ISSUER.to_string());

        Ok(EngineSettings {
            private_key_path,
            token_seconds_to_live,
            refresh_seconds_to_live,
            issuer,
            rotate_refresh_tokens: sso.rotate_refresh_tokens,
            client_credentials,
            providers,
        })
    }
}

fn validate_directory(cfg: &DirectoryConfiguration) -> SsoResult<DirectorySettings> {
    fn required<T: Clone>(value: &Option<T>, attribute: &str) -> SsoResult<T> {
        value.clone().ok_or_else(|| {
            bad_configuration(format!(
                "Configuration for LDAP is missing the definition for {} attribute",
                attribute
            ))
        })
    }

    let host = required(&cfg.host, "host")?;
    let port = required(&cfg.port, "port")?;
    let ssl = required(&cfg.ssl, "ssl")?;
    let base_dn = required(&cfg.base_dn, "baseDN")?;

    let bind = match (&cfg.bind_dn, &cfg.bind_password) {
        (Some(dn), Some(password)) if !dn.is_empty() => Some(DirectoryBind {
            dn: dn.clone(),
            password: password.clone(),
        }),
        (Some(dn), None) if !dn.is_empty() => {
            return Err(bad_configuration(
                "Configuration for LDAP, a bindDN was given but without a bindPassword",
            ));
        }
        (None, Some(password)) if !password.is_empty() => {
            return Err(bad_configuration(
                "Configuration for LDAP, a bindPassword was given but without a bindDN",
            ));
        }
        _ => None,
    };

    if host.trim().is_empty() {
        return Err(bad_configuration("Configuration for LDAP, attribute host is empty"));
    }

    Ok(DirectorySettings {
        host,
        port,
        ssl,
        base_dn,
        bind,
    })
}

fn validate_basic(cfg: &BasicConfiguration) -> SsoResult<()> {
    match &cfg.users {
        None => Err(bad_configuration(
            "Configuration for Basic is missing the definition for users attribute",
        )),
        Some(users) if users.is_empty() => Err(bad_configuration(
            "Configuration for Basic has an empty list of users",
        )),
        Some(users) => {
            if users.iter().flatten().all(|u| {
                u.user_name
                    .as_deref()
                    .is_none_or(|name| name.trim().is_empty())
            }) {
                warn!("Configuration for Basic does not define any usable user");
            }
            Ok(())
        }
    }
}

/// Configuration of a resource-server side token validator.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidatorConfiguration {
    pub public_key_path: Option<PathBuf>,
}

impl ValidatorConfiguration {
    pub fn new(public_key_path: impl Into<PathBuf>) -> Self {
        Self {
            public_key_path: Some(public_key_path.into()),
        }
    }

    pub fn load(path: &Path) -> SsoResult<Self> {
        let raw = fs::read_to_string(path).map_err(|e| {
            bad_configuration(format!(
                "Unable to read the validator configuration file {}: {}",
                path.display(),
                e
            ))
        })?;
        let mut cfg: ValidatorConfiguration = serde_json::from_str(&raw).map_err(|e| {
            bad_configuration(format!("Unable to parse the validator configuration: {}", e))
        })?;
        if let Some(path) = cfg.public_key_path.as_mut() {
            *path = PathBuf::from(expand_env_vars(&path.to_string_lossy()));
        }
        Ok(cfg)
    }

    /// Return the public key path once checked.
    pub fn validate(&self) -> SsoResult<&Path> {
        self.public_key_path.as_deref().ok_or_else(|| {
            bad_configuration(
                "Configuration for validator is missing the definition for publicKeyPath attribute",
            )
        })
    }
}

/// Find the configuration file: explicit path, then `SSO_CONFIG`, then `./sso.json`.
pub fn resolve_config_path(explicit: Option<&Path>) -> SsoResult<PathBuf> {
    if let Some(p) = explicit {
        return Ok(p.to_path_buf());
    }

    if let Ok(p) = env::var(CONFIG_ENV_VAR) {
        return Ok(PathBuf::from(p));
    }

    let candidate = PathBuf::from(DEFAULT_CONFIG_FILE);
    if candidate.exists() {
        return Ok(candidate);
    }

    Err(bad_configuration(format!(
        "Could not find {} (set {} or pass --config)",
        DEFAULT_CONFIG_FILE, CONFIG_ENV_VAR
    )))
}

fn expand_opt(value: &mut Option<String>) {
    if let Some(v) = value.as_mut() {
        *v = expand_env_vars(v);
    }
}

/// Replace `${NAME}` with the value of the environment variable `NAME`.
/// Unknown variables are left untouched.
fn expand_env_vars(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next(); // consume '{'
            let mut name = String::new();
            for c in chars.by_ref() {
                if c == '}' {
                    break;
                }
                name.push(c);
            }
            if let Ok(val) = env::var(&name) {
                out.push_str(&val);
            } else {
                out.push_str("${");
                out.push_str(&name);
                out.push('}');
            }
        } else {
            out.push(ch);
        }
    }

    out
}
