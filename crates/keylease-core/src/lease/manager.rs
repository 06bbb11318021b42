//! Lease manager
//!
//! Grants, renews, and releases time-bounded exclusive leases backed by
//! conditional writes on the shared row store. The manager holds no
//! in-process lock; the storage layer's test-and-set is the only arbiter
//! of who holds a key, so any number of processes over the same table
//! contend correctly.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use keylease_common::{LeaseError, LeaseToken, unix_now};
use keylease_persistence::{LeaseRecord, RowPredicate, RowStore, RowUpdate};

use super::wait::poll_until;
use crate::metrics;

/// Grants time-bounded exclusive leases on keys
///
/// Construct one per row store handle. Per key, the lifecycle is
/// unlocked, then locked under a token until an expiry, then unlocked
/// again via release or lazily-observed expiry; re-acquisition by the
/// same token is a renewal.
#[derive(Clone)]
pub struct LeaseManager {
    store: Arc<dyn RowStore>,
}

impl LeaseManager {
    pub fn new(store: Arc<dyn RowStore>) -> Self {
        Self { store }
    }

    /// Try once to acquire every key in `keys` under a fresh token
    ///
    /// Returns `Ok(None)` without retrying if any key is held by an
    /// unexpired lease; in that case no key touched by this call stays
    /// acquired.
    pub async fn try_acquire(
        &self,
        keys: &[&str],
        lease_duration: Duration,
    ) -> Result<Option<LeaseToken>, LeaseError> {
        self.try_acquire_as(keys, LeaseToken::generate(), lease_duration)
            .await
    }

    /// Try once to acquire every key in `keys` under `token`
    ///
    /// Re-acquiring with a token that already holds a key extends its
    /// expiry, so renewal is this same call and never contends with
    /// itself. A failed call hands back every key it acquired, including
    /// keys the token held before the call; the caller must re-acquire.
    pub async fn try_acquire_as(
        &self,
        keys: &[&str],
        token: LeaseToken,
        lease_duration: Duration,
    ) -> Result<Option<LeaseToken>, LeaseError> {
        let mut acquired: Vec<&str> = Vec::with_capacity(keys.len());
        for &key in keys {
            match self.acquire_one(key, token, lease_duration).await {
                Ok(true) => acquired.push(key),
                Ok(false) => {
                    metrics::record_contended();
                    debug!(key = %key, "key is held, rolling back partial acquisition");
                    self.release(&acquired, token, lease_duration).await?;
                    return Ok(None);
                }
                Err(err) => {
                    // Hand back whatever this call took before propagating
                    // the storage failure.
                    if let Err(release_err) =
                        self.release(&acquired, token, lease_duration).await
                    {
                        warn!(error = %release_err, "rollback release failed after storage error");
                    }
                    return Err(err);
                }
            }
        }
        metrics::record_acquired();
        debug!(keys = ?keys, token = %token, "lease granted");
        Ok(Some(token))
    }

    async fn acquire_one(
        &self,
        key: &str,
        token: LeaseToken,
        lease_duration: Duration,
    ) -> Result<bool, LeaseError> {
        let now = unix_now();
        let until = now + lease_duration.as_secs_f64();
        let affected = self
            .store
            .conditional_update(
                key,
                RowPredicate::Acquirable { token, now },
                RowUpdate::grant(token, until),
            )
            .await?;
        if affected > 0 {
            return Ok(true);
        }
        // Zero rows matched: either the key does not exist yet, or a live
        // lease holds it. Insert-if-absent settles which, atomically.
        Ok(self
            .store
            .insert_if_absent(LeaseRecord::placeholder(key, token, until))
            .await?)
    }

    /// Release keys held under `token`
    ///
    /// Rows that no longer exist are skipped. A row whose expiry lies
    /// further out than `lease_duration` belongs to a holder that
    /// acquired after this lease expired; it is warned about and left
    /// locked. The stored value survives release. Contention never makes
    /// this fail, so it is safe to call on every exit path.
    pub async fn release(
        &self,
        keys: &[&str],
        token: LeaseToken,
        lease_duration: Duration,
    ) -> Result<(), LeaseError> {
        for &key in keys {
            let Some(record) = self.store.read(key).await? else {
                continue;
            };
            let now = unix_now();
            if record.locked_until - now > lease_duration.as_secs_f64() {
                warn!(
                    key = %key,
                    locked_until = record.locked_until,
                    "lease expired and the key was reacquired with a longer window, leaving it locked"
                );
                continue;
            }
            let affected = self
                .store
                .conditional_update(key, RowPredicate::TokenEquals(token), RowUpdate::unlock())
                .await?;
            if affected > 0 {
                metrics::record_released();
                debug!(key = %key, token = %token, "lease released");
            }
        }
        Ok(())
    }

    /// Extend the expiry of keys held under `token`
    ///
    /// Returns `true` only if every key was still held and got extended.
    /// Keys already lost stay lost; nothing is rolled back.
    pub async fn renew(
        &self,
        keys: &[&str],
        token: LeaseToken,
        lease_duration: Duration,
    ) -> Result<bool, LeaseError> {
        let mut all_extended = true;
        for &key in keys {
            let now = unix_now();
            let affected = self
                .store
                .conditional_update(
                    key,
                    RowPredicate::HeldBy { token, now },
                    RowUpdate::extend(now + lease_duration.as_secs_f64()),
                )
                .await?;
            all_extended &= affected > 0;
        }
        Ok(all_extended)
    }

    /// Run `op` while holding every key in `keys`
    ///
    /// Acquire-once: returns `Ok(None)` if any key is contended. The
    /// lease is released after `op` finishes, on both its success and
    /// error paths; a holder that dies mid-`op` is healed by expiry.
    pub async fn with_token<T, F, Fut>(
        &self,
        keys: &[&str],
        lease_duration: Duration,
        op: F,
    ) -> Result<Option<T>, LeaseError>
    where
        F: FnOnce(LeaseToken) -> Fut,
        Fut: Future<Output = T>,
    {
        let Some(token) = self.try_acquire(keys, lease_duration).await? else {
            return Ok(None);
        };
        let out = op(token).await;
        self.release(keys, token, lease_duration).await?;
        Ok(Some(out))
    }

    /// Run `op` while holding every key in `keys`, waiting out contention
    ///
    /// Retries acquisition every `poll_interval` until `timeout` elapses,
    /// with overshoot bounded by one interval. No lease is held while
    /// sleeping or after a timeout.
    pub async fn wait_for_token<T, F, Fut>(
        &self,
        keys: &[&str],
        lease_duration: Duration,
        poll_interval: Duration,
        timeout: Duration,
        op: F,
    ) -> Result<T, LeaseError>
    where
        F: FnOnce(LeaseToken) -> Fut,
        Fut: Future<Output = T>,
    {
        let started = Instant::now();
        let outcome = poll_until(poll_interval, timeout, || {
            self.try_acquire(keys, lease_duration)
        })
        .await?;
        let Some(token) = outcome else {
            metrics::record_wait_timeout();
            return Err(LeaseError::Timeout {
                keys: keys.iter().map(|key| key.to_string()).collect(),
                waited_ms: started.elapsed().as_millis() as u64,
            });
        };
        let out = op(token).await;
        self.release(keys, token, lease_duration).await?;
        Ok(out)
    }
}
