//! Tiered Cache
//!
//! Read persistent → else read memory → else recompute → persist + memory.
//! One instance per data kind (prices, news, analysis), owned by the service
//! that serves that kind.
//!
//! Persistent-tier errors are logged and treated as "no entry". The memory
//! tier always accepts writes so the next read within its TTL is served
//! without recomputation.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use gold_core::{GoldError, GoldResult};
use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::storage::StoreError;

/// A cached payload with its capture time
#[derive(Debug, Clone, PartialEq)]
pub struct CachedEntry<T> {
    pub payload: T,
    pub captured_at: DateTime<Utc>,
}

impl<T> CachedEntry<T> {
    pub fn new(payload: T) -> Self {
        Self::at(payload, Utc::now())
    }

    pub fn at(payload: T, captured_at: DateTime<Utc>) -> Self {
        Self {
            payload,
            captured_at,
        }
    }

    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now.signed_duration_since(self.captured_at)
    }

    fn is_fresh(&self, ttl: Duration, now: DateTime<Utc>) -> bool {
        self.age(now) < ttl
    }
}

/// TTL policy for one data kind
#[derive(Debug, Clone, Copy)]
pub struct CachePolicy {
    pub persistent_ttl: Duration,
    pub memory_ttl: Duration,
    /// Persistent entries only count when captured on the current UTC day
    pub calendar_day: bool,
}

impl CachePolicy {
    pub fn prices(ttl: Duration) -> Self {
        Self {
            persistent_ttl: ttl,
            memory_ttl: ttl,
            calendar_day: false,
        }
    }

    pub fn news() -> Self {
        Self {
            persistent_ttl: Duration::minutes(30),
            memory_ttl: Duration::minutes(30),
            calendar_day: false,
        }
    }

    pub fn analysis() -> Self {
        Self {
            persistent_ttl: Duration::hours(24),
            memory_ttl: Duration::hours(1),
            calendar_day: true,
        }
    }

    /// Oldest capture time the persistent tier may serve at `now`
    pub fn persistent_cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let by_ttl = now - self.persistent_ttl;
        if !self.calendar_day {
            return by_ttl;
        }

        let start_of_day = now
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc())
            .unwrap_or(by_ttl);
        by_ttl.max(start_of_day)
    }
}

/// Which tier answered a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServedFrom {
    Persistent,
    Memory,
    /// Recomputed on this request
    Fresh,
}

impl ServedFrom {
    pub fn label(&self) -> &'static str {
        match self {
            ServedFrom::Persistent => "persistent_cache",
            ServedFrom::Memory => "memory_cache",
            ServedFrom::Fresh => "fresh",
        }
    }
}

/// Result of a cache read
#[derive(Debug, Clone, PartialEq)]
pub enum CacheLookup<T> {
    Hit {
        entry: CachedEntry<T>,
        from: ServedFrom,
    },
    Miss,
}

/// A persistent write failed; the memory tier still holds the value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistenceWarning {
    pub cache: &'static str,
    pub key: String,
    pub message: String,
}

/// Narrow read/write surface of a persistent store for one data kind
#[async_trait]
pub trait PersistentTier<T>: Send + Sync {
    /// Most recent entry for `key` captured at or after `newer_than`
    async fn load_latest(
        &self,
        key: &str,
        newer_than: DateTime<Utc>,
    ) -> Result<Option<CachedEntry<T>>, StoreError>;

    async fn store(&self, key: &str, entry: &CachedEntry<T>) -> Result<(), StoreError>;
}

/// Two-tier cache for one data kind
pub struct TieredCache<T> {
    name: &'static str,
    policy: CachePolicy,
    memory: RwLock<HashMap<String, CachedEntry<T>>>,
    persistent: Option<Arc<dyn PersistentTier<T>>>,
}

impl<T> TieredCache<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new(
        name: &'static str,
        policy: CachePolicy,
        persistent: Option<Arc<dyn PersistentTier<T>>>,
    ) -> Self {
        Self {
            name,
            policy,
            memory: RwLock::new(HashMap::new()),
            persistent,
        }
    }

    pub fn memory_only(name: &'static str, policy: CachePolicy) -> Self {
        Self::new(name, policy, None)
    }

    /// Persistent tier first, then memory
    pub async fn get(&self, key: &str) -> CacheLookup<T> {
        let now = Utc::now();

        if let Some(entry) = self.load_persistent(key, now).await {
            debug!(cache = self.name, key, "Persistent tier hit");
            self.remember_if_newer(key, &entry);
            return CacheLookup::Hit {
                entry,
                from: ServedFrom::Persistent,
            };
        }

        let memory_hit = self
            .memory
            .read()
            .get(key)
            .filter(|entry| entry.is_fresh(self.policy.memory_ttl, now))
            .cloned();

        match memory_hit {
            Some(entry) => {
                debug!(cache = self.name, key, "Memory tier hit");
                CacheLookup::Hit {
                    entry,
                    from: ServedFrom::Memory,
                }
            }
            None => {
                debug!(cache = self.name, key, "Cache miss");
                CacheLookup::Miss
            }
        }
    }

    /// Write to memory, then try the persistent tier
    pub async fn put(&self, key: &str, entry: CachedEntry<T>) -> Option<PersistenceWarning> {
        self.memory.write().insert(key.to_string(), entry.clone());

        let tier = self.persistent.as_ref()?;
        match tier.store(key, &entry).await {
            Ok(()) => None,
            Err(e) => {
                let warning = PersistenceWarning {
                    cache: self.name,
                    key: key.to_string(),
                    message: e.to_string(),
                };
                warn!(
                    cache = self.name,
                    key,
                    error = %warning.message,
                    "Persistent write failed, keeping memory entry"
                );
                Some(warning)
            }
        }
    }

    /// Clear the memory entry. Persistent data is left in place.
    pub fn invalidate(&self, key: &str) {
        if self.memory.write().remove(key).is_some() {
            info!(cache = self.name, key, "Memory entry invalidated");
        }
    }

    /// Memory entry regardless of TTL
    pub fn stale(&self, key: &str) -> Option<CachedEntry<T>> {
        self.memory.read().get(key).cloned()
    }

    /// Serve from cache unless `force_refresh`; otherwise recompute and store.
    ///
    /// Concurrent misses may each recompute; the last `put` wins.
    pub async fn get_or_recompute<F, Fut>(
        &self,
        key: &str,
        force_refresh: bool,
        recompute: F,
    ) -> GoldResult<(CachedEntry<T>, ServedFrom)>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = GoldResult<T>>,
    {
        if !force_refresh {
            if let CacheLookup::Hit { entry, from } = self.get(key).await {
                return Ok((entry, from));
            }
        }

        let payload = recompute().await.map_err(|e| {
            GoldError::recompute_failed(format!("{} ({}): {}", self.name, key, e))
        })?;

        let entry = CachedEntry::new(payload);
        self.put(key, entry.clone()).await;
        Ok((entry, ServedFrom::Fresh))
    }

    async fn load_persistent(&self, key: &str, now: DateTime<Utc>) -> Option<CachedEntry<T>> {
        let tier = self.persistent.as_ref()?;
        let cutoff = self.policy.persistent_cutoff(now);

        match tier.load_latest(key, cutoff).await {
            Ok(entry) => entry,
            Err(e) => {
                warn!(cache = self.name, key, error = %e, "Persistent read failed, treating as miss");
                None
            }
        }
    }

    /// Keep the memory slot populated so a degraded fallback exists after restart
    fn remember_if_newer(&self, key: &str, entry: &CachedEntry<T>) {
        let mut memory = self.memory.write();
        let newer = memory
            .get(key)
            .is_none_or(|current| current.captured_at < entry.captured_at);
        if newer {
            memory.insert(key.to_string(), entry.clone());
        }
    }
}
