//! Two-tier config cache: an edge tier with fresh/stale semantics in front of
//! a fixed-TTL origin tier in front of the source-of-truth store.
//!
//! The edge tier serves fresh entries immediately, serves stale entries
//! immediately while dispatching a non-blocking background refresh, and treats
//! anything older as a miss. The origin tier absorbs request bursts between
//! edge refreshes. Reads never block on writes; a racing pair of background
//! refreshes is tolerated because refresh recomputes a deterministic value and
//! last-writer-wins on the cache key.
//!
//! A cache is constructed once per process (or edge node) and handed around as
//! an `Arc`; there is no hidden module-level state. Writes to test/flag
//! definitions must call [`ConfigCache::invalidate`], which drops the origin
//! entry immediately; edge entries age out by TTL (new variants becoming
//! visible within the stale window is a deliberate availability trade-off).
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Duration, Utc};

use crate::{
    config::{ConfigPayload, ProjectConfig},
    config_source::ConfigSource,
    Result,
};

/// Response header reporting which tier served a config read.
pub const CACHE_HEADER: &str = "x-abby-cache";

/// How a config read was served.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    /// Served from the edge tier within the fresh window.
    Hit,
    /// Served from the edge tier within the stale window; a background
    /// refresh was dispatched.
    Stale,
    /// Fell through the edge tier and was recomputed.
    Miss,
}

impl CacheState {
    /// Wire representation for the `x-abby-cache` header.
    pub fn as_str(self) -> &'static str {
        match self {
            CacheState::Hit => "HIT",
            CacheState::Stale => "STALE",
            CacheState::Miss => "MISS",
        }
    }
}

/// A cached value with its write timestamp. Freshness and staleness are
/// derived from the entry's age, never stored.
#[derive(Debug, Clone)]
struct CacheEntry<T> {
    value: T,
    stored_at: DateTime<Utc>,
}

impl<T> CacheEntry<T> {
    fn age(&self, now: DateTime<Utc>) -> Duration {
        now - self.stored_at
    }
}

/// Tuning for [`ConfigCache`].
#[derive(Debug, Clone)]
pub struct ConfigCacheConfig {
    /// Keyspace namespace for the edge tier.
    pub namespace: String,
    /// Edge entries younger than this are served without revalidation.
    pub fresh_for: Duration,
    /// Edge entries younger than this (but past the fresh window) are served
    /// while a background refresh runs. Older entries are misses.
    pub stale_for: Duration,
    /// Fixed TTL of the origin tier.
    pub origin_ttl: Duration,
}

impl Default for ConfigCacheConfig {
    fn default() -> ConfigCacheConfig {
        ConfigCacheConfig {
            namespace: "abby-config".to_owned(),
            fresh_for: Duration::seconds(60),
            stale_for: Duration::seconds(60 * 60),
            origin_ttl: Duration::seconds(10),
        }
    }
}

/// Two-tier cache serving assembled [`ConfigPayload`]s.
///
/// Methods that can trigger a background refresh must run inside a Tokio
/// runtime.
pub struct ConfigCache {
    edge: RwLock<HashMap<String, CacheEntry<Arc<ConfigPayload>>>>,
    origin: RwLock<HashMap<String, CacheEntry<Arc<ProjectConfig>>>>,
    source: Arc<dyn ConfigSource>,
    config: ConfigCacheConfig,
}

/// Cache key for a project/environment pair. Plain concatenation is
/// collision-free because project IDs are globally unique.
fn cache_key(project_id: &str, environment: &str) -> String {
    format!("{project_id}{environment}")
}

impl ConfigCache {
    /// Create a cache in front of the given source.
    pub fn new(source: Arc<dyn ConfigSource>, config: ConfigCacheConfig) -> Arc<ConfigCache> {
        Arc::new(ConfigCache {
            edge: RwLock::new(HashMap::new()),
            origin: RwLock::new(HashMap::new()),
            source,
            config,
        })
    }

    fn edge_key(&self, project_id: &str, environment: &str) -> String {
        format!("{}/{}", self.config.namespace, cache_key(project_id, environment))
    }

    /// Serve the config for a project/environment, reporting which tier
    /// answered.
    ///
    /// A full miss reads the source, assembles the public payload, and writes
    /// it back into both tiers before returning. A source failure propagates
    /// and nothing is cached, so the next request retries the fetch.
    pub async fn get(
        self: &Arc<Self>,
        project_id: &str,
        environment: &str,
    ) -> Result<(Arc<ConfigPayload>, CacheState)> {
        self.get_at(project_id, environment, Utc::now()).await
    }

    async fn get_at(
        self: &Arc<Self>,
        project_id: &str,
        environment: &str,
        now: DateTime<Utc>,
    ) -> Result<(Arc<ConfigPayload>, CacheState)> {
        let edge_key = self.edge_key(project_id, environment);

        let stale_value = {
            let edge = self
                .edge
                .read()
                .expect("thread holding edge cache lock should not panic");
            match edge.get(&edge_key) {
                Some(entry) if entry.age(now) < self.config.fresh_for => {
                    return Ok((entry.value.clone(), CacheState::Hit));
                }
                Some(entry) if entry.age(now) < self.config.stale_for => {
                    Some(entry.value.clone())
                }
                _ => None,
            }
        };

        if let Some(value) = stale_value {
            // Serve immediately; the refresh runs on its own and the caller
            // never waits for it. Two concurrent stale hits may both refresh;
            // both write the same recomputed value, so last-writer-wins.
            let this = Arc::clone(self);
            let project_id = project_id.to_owned();
            let environment = environment.to_owned();
            tokio::spawn(async move {
                if let Err(err) = this.refresh(&project_id, &environment, Utc::now()).await {
                    log::warn!(target: "abby",
                        "background config refresh for {project_id}/{environment} failed: {err}");
                }
            });
            return Ok((value, CacheState::Stale));
        }

        let payload = self.refresh(project_id, environment, now).await?;
        Ok((payload, CacheState::Miss))
    }

    /// Recompute the payload from the origin tier (or source) and overwrite
    /// the edge entry. Idempotent: the value is a deterministic function of
    /// durable state.
    async fn refresh(
        &self,
        project_id: &str,
        environment: &str,
        now: DateTime<Utc>,
    ) -> Result<Arc<ConfigPayload>> {
        let snapshot = self.load_origin(project_id, environment, now).await?;
        let payload = Arc::new(ConfigPayload::from_config(&snapshot));

        let mut edge = self
            .edge
            .write()
            .expect("thread holding edge cache lock should not panic");
        edge.insert(
            self.edge_key(project_id, environment),
            CacheEntry {
                value: payload.clone(),
                stored_at: now,
            },
        );
        Ok(payload)
    }

    /// Read through the origin tier; only a TTL-expired or absent entry
    /// reaches the source. Failures are never cached.
    async fn load_origin(
        &self,
        project_id: &str,
        environment: &str,
        now: DateTime<Utc>,
    ) -> Result<Arc<ProjectConfig>> {
        let key = cache_key(project_id, environment);

        {
            let origin = self
                .origin
                .read()
                .expect("thread holding origin cache lock should not panic");
            if let Some(entry) = origin.get(&key) {
                if entry.age(now) < self.config.origin_ttl {
                    return Ok(entry.value.clone());
                }
            }
        }

        let snapshot = Arc::new(self.source.load(project_id, environment).await?);

        let mut origin = self
            .origin
            .write()
            .expect("thread holding origin cache lock should not panic");
        origin.insert(
            key,
            CacheEntry {
                value: snapshot.clone(),
                stored_at: now,
            },
        );
        Ok(snapshot)
    }

    /// Write a payload directly into the edge tier.
    pub fn set(&self, project_id: &str, environment: &str, payload: Arc<ConfigPayload>) {
        let mut edge = self
            .edge
            .write()
            .expect("thread holding edge cache lock should not panic");
        edge.insert(
            self.edge_key(project_id, environment),
            CacheEntry {
                value: payload,
                stored_at: Utc::now(),
            },
        );
    }

    /// Drop the origin-tier entry for a project/environment.
    ///
    /// Called when test or flag definitions change. The edge tier is left to
    /// expire by TTL.
    pub fn invalidate(&self, project_id: &str, environment: &str) {
        let mut origin = self
            .origin
            .write()
            .expect("thread holding origin cache lock should not panic");
        origin.remove(&cache_key(project_id, environment));
        log::debug!(target: "abby", "invalidated origin cache for {project_id}/{environment}");
    }
}
