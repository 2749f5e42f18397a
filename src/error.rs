//! Error types for each pipeline stage.
//!
//! Every stage has its own error enum so callers can tell a transport fault
//! from a structural fault from a delivery fault. [`RunError`] aggregates them
//! for the outermost run scope.

use thiserror::Error;

/// Failure to obtain page markup.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("HTTP status {status} from {url}")]
    Status { status: u16, url: String },

    #[cfg_attr(not(feature = "browser"), allow(dead_code))]
    #[error("browser error: {0}")]
    Browser(String),

    #[cfg_attr(not(feature = "browser"), allow(dead_code))]
    #[error("navigation to {url} timed out after {secs}s")]
    Timeout { url: String, secs: u64 },
}

/// The page did not have the shape the extractor relies on.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("ranking container `{selector}` not found; page layout may have changed")]
    MissingContainer { selector: &'static str },
}

/// Failure to read, lock or write the persisted store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store is locked by another run: {path}")]
    Locked { path: String },

    #[error("store I/O error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("store serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Outcome of formatting that means "do not send".
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DigestError {
    #[error("digest is empty; nothing beyond the header")]
    Empty,
}

/// The messaging endpoint could not be reached or refused the message.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("telegram transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("telegram rejected message (status {status}): {description}")]
    Rejected { status: u16, description: String },
}

/// Invalid or incomplete configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("missing required setting: {0}")]
    Missing(&'static str),

    #[cfg_attr(feature = "browser", allow(dead_code))]
    #[error("fetch mode `browser` requires building with the `browser` feature")]
    BrowserUnavailable,
}

/// Any fault that ends a run.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Transport(#[from] FetchError),

    #[error(transparent)]
    Structure(#[from] ExtractError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Delivery(#[from] DeliveryError),
}

impl RunError {
    /// Short label used as a structured logging field.
    pub fn kind(&self) -> &'static str {
        match self {
            RunError::Transport(_) => "transport",
            RunError::Structure(_) => "structure",
            RunError::Store(_) => "store",
            RunError::Delivery(_) => "delivery",
        }
    }
}
