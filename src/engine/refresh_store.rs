//! In-memory refresh token table.
//!
//! The store is shared (`Arc`) so that a reloaded engine keeps serving the
//! refresh tokens issued by its predecessor. All access goes through one
//! mutex; a redemption looks the record up, judges it and optionally removes
//! it under a single lock acquisition.

use std::collections::HashMap;

use tokio::sync::Mutex;

use crate::error::{SsoError, SsoResult};
use crate::providers::Identity;
use crate::token::unix_now;
use crate::types::RefreshId;

/// What the engine remembers about an issued refresh token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshRecord {
    identity: Identity,
    /// Seconds since the Unix epoch.
    expires_at: i64,
}

impl RefreshRecord {
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn expires_at(&self) -> i64 {
        self.expires_at
    }

    /// Redeemable while `now <= expires_at`.
    pub fn is_expired_at(&self, now: i64) -> bool {
        self.expires_at < now
    }
}

#[derive(Debug, Default)]
pub struct RefreshStore {
    records: Mutex<HashMap<RefreshId, RefreshRecord>>,
}

impl RefreshStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `identity` under a fresh identifier valid for `seconds_to_live`.
    pub async fn put(&self, identity: Identity, seconds_to_live: i64) -> SsoResult<RefreshId> {
        self.put_at(identity, seconds_to_live, unix_now()).await
    }

    pub async fn put_at(
        &self,
        identity: Identity,
        seconds_to_live: i64,
        now: i64,
    ) -> SsoResult<RefreshId> {
        let expires_at = now.checked_add(seconds_to_live).ok_or_else(|| {
            SsoError::bad_configuration(format!(
                "Refresh lifetime of {} seconds overflows the clock",
                seconds_to_live
            ))
        })?;

        let id = RefreshId::generate();
        let record = RefreshRecord {
            identity,
            expires_at,
        };
        self.records.lock().await.insert(id.clone(), record);
        Ok(id)
    }

    /// Look a record up. Expiry is not judged here.
    pub async fn get(&self, id: &str) -> Option<RefreshRecord> {
        self.records.lock().await.get(id).cloned()
    }

    /// Check that `id` is redeemable at `now` and return its identity.
    ///
    /// With `consume`, a redeemable record is removed in the same critical
    /// section, so concurrent redemptions of one identifier succeed once.
    pub async fn redeem(&self, id: &str, now: i64, consume: bool) -> SsoResult<Identity> {
        let mut records = self.records.lock().await;

        let record = records.get(id).ok_or(SsoError::RefreshTokenNotFound)?;
        if record.is_expired_at(now) {
            return Err(SsoError::RefreshTooOld);
        }

        if consume {
            records
                .remove(id)
                .map(|record| record.identity)
                .ok_or(SsoError::RefreshTokenNotFound)
        } else {
            Ok(record.identity.clone())
        }
    }

    /// Drop every record past its deadline; returns how many were dropped.
    pub async fn purge_expired(&self, now: i64) -> usize {
        let mut records = self.records.lock().await;
        let before = records.len();
        records.retain(|_, record| !record.is_expired_at(now));
        before - records.len()
    }

    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.lock().await.is_empty()
    }
}
