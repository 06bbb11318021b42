//! Key/value façade over the lease manager
//!
//! Reads are unauthenticated and never block; every mutation must present
//! a token that currently holds the key. The `ask_*` helpers convert
//! contention into a boolean, the `wait_*` helpers poll it out under a
//! deadline.

use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;

use keylease_common::{LeaseError, LeaseToken, unix_now};
use keylease_persistence::{RowPredicate, RowStore, RowUpdate};

use crate::config::KvProperties;
use crate::lease::LeaseManager;

/// Map operations guarded by lease tokens
pub struct KvStore {
    store: Arc<dyn RowStore>,
    leases: LeaseManager,
    props: KvProperties,
}

impl KvStore {
    pub fn new(store: Arc<dyn RowStore>) -> Self {
        Self::with_properties(store, KvProperties::default())
    }

    pub fn with_properties(store: Arc<dyn RowStore>, props: KvProperties) -> Self {
        let leases = LeaseManager::new(store.clone());
        Self {
            store,
            leases,
            props,
        }
    }

    /// The lease manager this façade mutates through
    pub fn leases(&self) -> &LeaseManager {
        &self.leases
    }

    pub fn properties(&self) -> &KvProperties {
        &self.props
    }

    /// Current value for `key`; readers never block
    ///
    /// `None` if the key does not exist or holds no value (a lock-only
    /// placeholder).
    pub async fn get(&self, key: &str) -> Result<Option<String>, LeaseError> {
        Ok(self.store.read(key).await?.and_then(|row| row.value))
    }

    /// Overwrite the value for `key`; `token` must currently hold the key
    ///
    /// The lease columns are left untouched. Fails with a token mismatch
    /// when the key is unlocked, held by someone else, or the token's
    /// lease has expired.
    pub async fn set(&self, key: &str, value: &str, token: LeaseToken) -> Result<(), LeaseError> {
        let now = unix_now();
        let affected = self
            .store
            .conditional_update(
                key,
                RowPredicate::HeldBy { token, now },
                RowUpdate::set_value(value),
            )
            .await?;
        if affected == 0 {
            return Err(LeaseError::TokenMismatch {
                key: key.to_string(),
            });
        }
        Ok(())
    }

    /// Remove the row for `key` entirely; `token` must currently hold it
    ///
    /// After deletion the key no longer exists, it is not merely emptied.
    pub async fn delete(&self, key: &str, token: LeaseToken) -> Result<(), LeaseError> {
        let now = unix_now();
        let affected = self
            .store
            .delete_where(key, RowPredicate::HeldBy { token, now })
            .await?;
        if affected == 0 {
            return Err(LeaseError::TokenMismatch {
                key: key.to_string(),
            });
        }
        Ok(())
    }

    /// Keys that currently carry a value, sorted
    ///
    /// Lock-only placeholder rows are not mapping entries and are skipped,
    /// consistent with `get`.
    pub async fn keys(&self) -> Result<Vec<String>, LeaseError> {
        let mut keys: Vec<String> = self
            .store
            .scan()
            .await?
            .into_iter()
            .filter(|row| row.value.is_some())
            .map(|row| row.key)
            .collect();
        keys.sort();
        Ok(keys)
    }

    /// Values of all keys that carry one, ordered by key
    pub async fn values(&self) -> Result<Vec<String>, LeaseError> {
        Ok(self.items().await?.into_iter().map(|(_, value)| value).collect())
    }

    /// All (key, value) pairs, ordered by key
    pub async fn items(&self) -> Result<Vec<(String, String)>, LeaseError> {
        let mut items: Vec<(String, String)> = self
            .store
            .scan()
            .await?
            .into_iter()
            .filter_map(|row| row.value.map(|value| (row.key, value)))
            .collect();
        items.sort();
        Ok(items)
    }

    /// Deserialize the value for `key`
    ///
    /// Malformed payloads surface as storage errors.
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, LeaseError> {
        match self.get(key).await? {
            Some(raw) => {
                let value = serde_json::from_str(&raw).map_err(anyhow::Error::from)?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    /// Serialize `value` and store it under `key`
    pub async fn set_json<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        token: LeaseToken,
    ) -> Result<(), LeaseError> {
        let raw = serde_json::to_string(value).map_err(anyhow::Error::from)?;
        self.set(key, &raw, token).await
    }

    /// Set `key` if it can be acquired right now
    ///
    /// `Ok(false)` when the key is contended; never a token mismatch or
    /// timeout. Storage errors still propagate.
    pub async fn ask_set(&self, key: &str, value: &str) -> Result<bool, LeaseError> {
        let lease = self.props.lease_duration();
        match self
            .leases
            .with_token(&[key], lease, |token| async move {
                self.set(key, value, token).await
            })
            .await?
        {
            Some(Ok(())) => Ok(true),
            // The lease was lost mid-write (expiry plus reacquisition);
            // the mutation did not happen.
            Some(Err(LeaseError::TokenMismatch { .. })) => Ok(false),
            Some(Err(err)) => Err(err),
            None => Ok(false),
        }
    }

    /// Delete `key` if it can be acquired right now
    ///
    /// `Ok(false)` when the key is contended or does not exist.
    pub async fn ask_del(&self, key: &str) -> Result<bool, LeaseError> {
        let lease = self.props.lease_duration();
        match self
            .leases
            .with_token(&[key], lease, |token| async move {
                self.delete(key, token).await
            })
            .await?
        {
            Some(Ok(())) => Ok(true),
            // The lease was granted on a row that vanished before the
            // delete; nothing happened.
            Some(Err(LeaseError::TokenMismatch { .. })) => Ok(false),
            Some(Err(err)) => Err(err),
            None => Ok(false),
        }
    }

    /// Set `key`, waiting out contention under the configured deadline
    pub async fn wait_set(&self, key: &str, value: &str) -> Result<(), LeaseError> {
        self.leases
            .wait_for_token(
                &[key],
                self.props.lease_duration(),
                self.props.poll_interval(),
                self.props.wait_timeout(),
                |token| async move { self.set(key, value, token).await },
            )
            .await?
    }

    /// Delete `key`, waiting out contention under the configured deadline
    pub async fn wait_del(&self, key: &str) -> Result<(), LeaseError> {
        self.leases
            .wait_for_token(
                &[key],
                self.props.lease_duration(),
                self.props.poll_interval(),
                self.props.wait_timeout(),
                |token| async move { self.delete(key, token).await },
            )
            .await?
    }
}
