use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::models::{CandidateMovie, CanonicalMovie};
use crate::query::QueryFingerprint;

const MAX_MEMORY_ENTRIES: usize = 10_000;

/// Generic TTL key-value store keyed by an opaque string. A zero TTL keeps
/// the value until it is evicted.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Option<String>;
    async fn set(&self, key: &str, value: String, ttl: Duration);
}

#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, (String, Option<DateTime<Utc>>)>>,
}

fn is_live(expires_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    expires_at.map_or(true, |exp| exp > now)
}

/// `None` for a zero TTL, which never expires.
fn expiry(ttl: Duration, now: DateTime<Utc>) -> Result<Option<DateTime<Utc>>, ()> {
    if ttl.is_zero() {
        return Ok(None);
    }
    TimeDelta::from_std(ttl)
        .ok()
        .and_then(|d| now.checked_add_signed(d))
        .map(Some)
        .ok_or(())
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        let now = Utc::now();
        self.entries
            .lock()
            .await
            .values()
            .filter(|(_, expires_at)| is_live(*expires_at, now))
            .count()
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn get(&self, key: &str) -> Option<String> {
        let now = Utc::now();
        let mut guard = self.entries.lock().await;
        let expired = match guard.get(key) {
            Some((value, expires_at)) if is_live(*expires_at, now) => return Some(value.clone()),
            Some(_) => true,
            None => false,
        };
        if expired {
            guard.remove(key);
        }
        None
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) {
        let now = Utc::now();
        let Ok(expires_at) = expiry(ttl, now) else {
            return;
        };
        let mut guard = self.entries.lock().await;
        guard.retain(|_, (_, exp)| is_live(*exp, now));
        if guard.len() >= MAX_MEMORY_ENTRIES {
            guard.clear();
        }
        guard.insert(key.to_string(), (value, expires_at));
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum CachePayload {
    Candidates(Vec<CandidateMovie>),
    Movie(Box<CanonicalMovie>),
}

#[derive(Debug, Serialize, Deserialize)]
struct CacheEntry {
    fingerprint: String,
    payload: CachePayload,
    expires_at: Option<DateTime<Utc>>,
}

/// Typed cache of resolved payloads on top of a [`CacheStore`].
///
/// When disabled every lookup misses and every store is dropped.
#[derive(Clone)]
pub struct ResultCache {
    store: Arc<dyn CacheStore>,
    enabled: bool,
}

impl ResultCache {
    pub fn new(store: Arc<dyn CacheStore>, enabled: bool) -> Self {
        Self { store, enabled }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub async fn lookup(&self, fingerprint: &QueryFingerprint) -> Option<CachePayload> {
        if !self.enabled {
            return None;
        }
        let raw = self.store.get(fingerprint.as_str()).await?;
        let entry: CacheEntry = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Discarding undecodable cache entry {}: {}", fingerprint, e);
                return None;
            }
        };
        if entry.fingerprint != fingerprint.as_str() || !is_live(entry.expires_at, Utc::now()) {
            debug!("Cache entry {} is stale or foreign", fingerprint);
            return None;
        }
        Some(entry.payload)
    }

    pub async fn store(&self, fingerprint: &QueryFingerprint, payload: CachePayload, ttl: Duration) {
        if !self.enabled {
            return;
        }
        let Ok(expires_at) = expiry(ttl, Utc::now()) else {
            warn!("Cache TTL {:?} out of range; not caching {}", ttl, fingerprint);
            return;
        };
        let entry = CacheEntry {
            fingerprint: fingerprint.as_str().to_string(),
            payload,
            expires_at,
        };
        match serde_json::to_string(&entry) {
            Ok(raw) => {
                self.store.set(fingerprint.as_str(), raw, ttl).await;
                match expires_at {
                    Some(_) => debug!("Cached {} for {}s", fingerprint, ttl.as_secs()),
                    None => debug!("Cached {} without expiry", fingerprint),
                }
            }
            Err(e) => warn!("Failed to serialize cache entry {}: {}", fingerprint, e),
        }
    }
}
