use std::str::FromStr;

use abby_core::cache::ConfigCacheConfig;
use abby_core::config_source::DEFAULT_BASE_URL;
use abby_core::events::EventPipelineConfig;
use dotenvy::dotenv;
use std::env;

/// Process configuration, read once from the environment at startup.
pub struct Config {
    pub port: u16,
    pub source_url: String,
    pub api_key: String,
    /// Where accepted events are delivered. Unset means log-only.
    pub ingestion_url: Option<String>,
    pub cache_fresh_seconds: i64,
    pub cache_stale_seconds: i64,
    pub origin_ttl_seconds: i64,
    pub event_workers: usize,
    pub event_queue_capacity: usize,
}

impl Config {
    pub fn from_env() -> Self {
        let _ = dotenv().is_ok();

        Self {
            port: env_or("PORT", 3000),
            source_url: env::var("ABBY_SOURCE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_owned()),
            api_key: env::var("ABBY_API_KEY").unwrap_or_default(),
            ingestion_url: env::var("ABBY_INGESTION_URL").ok(),
            cache_fresh_seconds: env_or("ABBY_CACHE_FRESH_SECONDS", 60),
            cache_stale_seconds: env_or("ABBY_CACHE_STALE_SECONDS", 3600),
            origin_ttl_seconds: env_or("ABBY_ORIGIN_TTL_SECONDS", 10),
            event_workers: env_or("ABBY_EVENT_WORKERS", 4),
            event_queue_capacity: env_or("ABBY_EVENT_QUEUE_CAPACITY", 1024),
        }
    }

    pub fn addr(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }

    pub fn cache_config(&self) -> ConfigCacheConfig {
        ConfigCacheConfig {
            fresh_for: chrono::Duration::seconds(self.cache_fresh_seconds),
            stale_for: chrono::Duration::seconds(self.cache_stale_seconds),
            origin_ttl: chrono::Duration::seconds(self.origin_ttl_seconds),
            ..ConfigCacheConfig::default()
        }
    }

    pub fn pipeline_config(&self) -> EventPipelineConfig {
        EventPipelineConfig {
            workers: self.event_workers,
            queue_capacity: self.event_queue_capacity,
            ..EventPipelineConfig::default()
        }
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}
