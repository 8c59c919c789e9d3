//! Key material and configuration builders shared by the unit tests.

use std::fs;
use std::path::PathBuf;

use serde_json::{Value, json};
use tempfile::TempDir;

use crate::config::Configuration;

pub const SIGNING_PRIVATE_PEM: &str = include_str!("../fixtures/signing_private.pem");
pub const SIGNING_PUBLIC_PEM: &str = include_str!("../fixtures/signing_public.pem");
pub const OTHER_PRIVATE_PEM: &str = include_str!("../fixtures/other_private.pem");
pub const OTHER_PUBLIC_PEM: &str = include_str!("../fixtures/other_public.pem");

/// A scratch directory holding the signing key and configuration files.
pub struct Fixture {
    dir: TempDir,
    private_key_path: PathBuf,
}

impl Fixture {
    pub const TOKEN_SECONDS: i64 = 60;
    pub const REFRESH_SECONDS: i64 = 600;

    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let private_key_path = dir.path().join("signing_private.pem");
        fs::write(&private_key_path, SIGNING_PRIVATE_PEM).unwrap();
        Self {
            dir,
            private_key_path,
        }
    }

    pub fn write_file(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    /// The `sso` block, with `overrides` merged over the defaults.
    pub fn sso_block(&self, providers: Value, overrides: Value) -> Value {
        let mut sso = json!({
            "privateKeyPath": self.private_key_path,
            "tokenSecondsToLive": Self::TOKEN_SECONDS,
            "refreshSecondsToLive": Self::REFRESH_SECONDS,
            "providers": providers,
        });
        if let (Some(sso), Value::Object(overrides)) = (sso.as_object_mut(), overrides) {
            sso.extend(overrides);
        }
        sso
    }

    pub fn basic_block() -> Value {
        json!({
            "users": [
                { "userName": "alice", "password": "wonderland", "roles": ["admin", "user"] },
                { "userName": "bob", "password": "pw", "roles": ["user"] }
            ]
        })
    }

    /// A directory nobody listens on.
    pub fn unreachable_directory_block() -> Value {
        json!({
            "host": "127.0.0.1",
            "port": 1,
            "ssl": false,
            "baseDN": "dc=example,dc=org"
        })
    }

    fn basic_document(&self, overrides: Value) -> Value {
        json!({
            "sso": self.sso_block(json!(["basic"]), overrides),
            "basic": Self::basic_block()
        })
    }

    /// Basic provider only.
    pub fn basic_configuration(&self, overrides: Value) -> Configuration {
        parse(self.basic_document(overrides))
    }

    /// Basic provider first, then an unreachable directory.
    pub fn chained_configuration(&self, overrides: Value) -> Configuration {
        parse(json!({
            "sso": self.sso_block(json!(["basic", "ldap"]), overrides),
            "basic": Self::basic_block(),
            "ldap": Self::unreachable_directory_block()
        }))
    }

    /// Write a basic-provider configuration file and return its path.
    pub fn write_config(&self, overrides: Value) -> PathBuf {
        self.write_file("sso.json", &self.basic_document(overrides).to_string())
    }
}

fn parse(document: Value) -> Configuration {
    Configuration::from_json(&document.to_string()).unwrap()
}
