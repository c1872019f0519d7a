//! Revocation ledger for deliberately invalidated credentials.
//!
//! Keyed by the literal token string. Entries become dead weight once the
//! underlying credential has expired (an expired token is unverifiable
//! regardless of revocation state), so [`RevocationStore::purge_expired`]
//! bounds memory.
//!
//! Known limitation: the ledger is per-process. It does not survive a restart
//! and is not shared across replicas, so revocation is only guaranteed within
//! one running instance's lifetime.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};

/// Time source, injectable so expiry-based purge is deterministic in tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A single revocation record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevocationEntry {
    /// When the credential was revoked (logout time).
    pub revoked_at: DateTime<Utc>,
    /// The credential's original expiry; the entry is purgeable after this.
    pub expires_at: DateTime<Utc>,
}

/// Concurrency-safe set of revoked credentials.
///
/// `record` and `contains` may run from many requests at once; a `record`
/// that completes before a `contains` begins is visible to that call (the
/// write lock is released only after the entry is inserted).
pub struct RevocationStore {
    clock: Arc<dyn Clock>,
    entries: RwLock<HashMap<String, RevocationEntry>>,
}

impl RevocationStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Record a revocation for `token`, effective now.
    ///
    /// Revocation is irreversible and first-wins: re-recording an already
    /// revoked token leaves the original entry untouched.
    pub fn record(&self, token: &str, expires_at: DateTime<Utc>) {
        let revoked_at = self.clock.now();
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries
            .entry(token.to_string())
            .or_insert(RevocationEntry {
                revoked_at,
                expires_at,
            });
    }

    /// Is `token` revoked?
    pub fn contains(&self, token: &str) -> bool {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.contains_key(token)
    }

    /// Drop entries whose underlying credential expired before `now`.
    ///
    /// Returns the number of entries removed.
    pub fn purge_expired_before(&self, now: DateTime<Utc>) -> usize {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at >= now);
        before - entries.len()
    }

    /// [`Self::purge_expired_before`] at the injected clock's current time.
    pub fn purge_expired(&self) -> usize {
        self.purge_expired_before(self.clock.now())
    }

    pub fn len(&self) -> usize {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for RevocationStore {
    fn default() -> Self {
        Self::new()
    }
}
