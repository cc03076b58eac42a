//! Source-of-truth access for project configuration.
//!
//! The cache only ever talks to a [`ConfigSource`]. [`HttpConfigSource`] is
//! the production implementation fetching snapshots over HTTP;
//! [`MemoryConfigSource`] backs tests and embedded use.
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use reqwest::{StatusCode, Url};

use crate::{config::ProjectConfig, Error, Result};

/// Reads environment-scoped project snapshots from the source-of-truth store.
#[async_trait]
pub trait ConfigSource: Send + Sync {
    /// Load the current snapshot for a project and environment.
    async fn load(&self, project_id: &str, environment: &str) -> Result<ProjectConfig>;
}

/// Configuration for [`HttpConfigSource`].
#[derive(Debug, Clone)]
pub struct HttpConfigSourceConfig {
    /// Base URL of the config service.
    pub base_url: String,
    /// API key authorizing the fetch.
    pub api_key: String,
}

/// Default base URL for the hosted config service.
pub const DEFAULT_BASE_URL: &str = "https://api.tryabby.com";

/// A client that fetches project configuration over HTTP.
pub struct HttpConfigSource {
    // Client holds a connection pool internally, so we're reusing the client
    // between requests.
    client: reqwest::Client,
    config: HttpConfigSourceConfig,
    /// If we receive a 401 Unauthorized error during a request, it means the
    /// API key is not valid. We cache this error so we don't issue additional
    /// requests to the server.
    unauthorized: AtomicBool,
}

impl HttpConfigSource {
    /// Create a fetcher for the given service.
    pub fn new(config: HttpConfigSourceConfig) -> HttpConfigSource {
        HttpConfigSource {
            client: reqwest::Client::new(),
            config,
            unauthorized: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl ConfigSource for HttpConfigSource {
    async fn load(&self, project_id: &str, environment: &str) -> Result<ProjectConfig> {
        if self.unauthorized.load(Ordering::Relaxed) {
            return Err(Error::Unauthorized);
        }

        let url = Url::parse_with_params(
            &format!(
                "{}/api/v1/config/{}/{}",
                self.config.base_url, project_id, environment
            ),
            &[("apiKey", &*self.config.api_key)],
        )
        .map_err(Error::InvalidBaseUrl)?;

        log::debug!(target: "abby", "fetching project configuration for {project_id}/{environment}");
        let response = self.client.get(url).send().await?;

        let response = response.error_for_status().map_err(|err| {
            match err.status() {
                Some(StatusCode::UNAUTHORIZED) => {
                    log::warn!(target: "abby", "client is not authorized. Check your API key");
                    self.unauthorized.store(true, Ordering::Relaxed);
                    Error::Unauthorized
                }
                Some(StatusCode::NOT_FOUND) => Error::UnknownProject(project_id.to_owned()),
                _ => {
                    log::warn!(target: "abby", "received non-200 response while fetching configuration: {err:?}");
                    Error::from(err)
                }
            }
        })?;

        let config = response.json().await?;

        log::debug!(target: "abby", "successfully fetched project configuration");

        Ok(config)
    }
}

/// In-memory config source seeded with fixed snapshots.
///
/// Counts loads and can be switched into a failing mode, which the cache
/// tests use to observe refresh and failure behavior.
#[derive(Default)]
pub struct MemoryConfigSource {
    configs: Mutex<HashMap<(String, String), ProjectConfig>>,
    loads: AtomicUsize,
    failing: AtomicBool,
}

impl MemoryConfigSource {
    /// Create an empty source.
    pub fn new() -> MemoryConfigSource {
        MemoryConfigSource::default()
    }

    /// Seed a snapshot for a project/environment pair.
    pub fn insert(&self, environment: &str, config: ProjectConfig) {
        let mut configs = self
            .configs
            .lock()
            .expect("thread holding config lock should not panic");
        configs.insert(
            (config.project_id.clone(), environment.to_owned()),
            config,
        );
    }

    /// Number of loads served (or failed) so far.
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    /// Make subsequent loads fail with an I/O error.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl ConfigSource for MemoryConfigSource {
    async fn load(&self, project_id: &str, environment: &str) -> Result<ProjectConfig> {
        self.loads.fetch_add(1, Ordering::SeqCst);

        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::from(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "config source unreachable",
            )));
        }

        let configs = self
            .configs
            .lock()
            .expect("thread holding config lock should not panic");
        if let Some(config) = configs.get(&(project_id.to_owned(), environment.to_owned())) {
            return Ok(config.clone());
        }
        if configs.keys().any(|(p, _)| p == project_id) {
            Err(Error::UnknownEnvironment {
                project_id: project_id.to_owned(),
                environment: environment.to_owned(),
            })
        } else {
            Err(Error::UnknownProject(project_id.to_owned()))
        }
    }
}
