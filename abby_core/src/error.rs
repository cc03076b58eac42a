use std::sync::Arc;

/// Crate-wide result alias.
///
/// The error variant is always the abby-specific [`Error`] enum.
pub type Result<T> = std::result::Result<T, Error>;

/// Enum representing possible errors that can occur in the abby core.
#[derive(thiserror::Error, Debug, Clone)]
#[non_exhaustive]
pub enum Error {
    /// Invalid base URL configuration.
    #[error("invalid base_url configuration")]
    InvalidBaseUrl(#[source] url::ParseError),

    /// The request was unauthorized, possibly due to an invalid API key.
    #[error("unauthorized, api_key is likely invalid")]
    Unauthorized,

    /// The config source has no configuration for the requested project.
    #[error("unknown project: {0}")]
    UnknownProject(String),

    /// The config source has no such environment for the project.
    #[error("unknown environment {environment:?} for project {project_id:?}")]
    UnknownEnvironment {
        /// Project the lookup was scoped to.
        project_id: String,
        /// The environment that wasn't found.
        environment: String,
    },

    /// The event queue is at capacity and cannot accept more events.
    #[error("event queue is full")]
    QueueFull,

    /// The event pipeline has been shut down and no longer accepts events.
    #[error("event pipeline is closed")]
    QueueClosed,

    /// The analytics sink rejected an event.
    #[error("event sink failure: {0}")]
    SinkFailure(String),

    /// An I/O error.
    #[error(transparent)]
    // std::io::Error is not clonable, so we're wrapping it in an Arc.
    Io(Arc<std::io::Error>),

    /// Network error.
    #[error(transparent)]
    Network(Arc<reqwest::Error>),
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Self::Io(Arc::new(value))
    }
}

impl From<reqwest::Error> for Error {
    fn from(value: reqwest::Error) -> Self {
        Error::Network(Arc::new(value.without_url()))
    }
}
