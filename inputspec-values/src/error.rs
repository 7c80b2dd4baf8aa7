//! Error types for value resolution

use inputspec_fields::{FieldsError, Protocol};
use thiserror::Error;

/// Result type for resolver operations
pub type Result<T> = std::result::Result<T, ResolverError>;

/// Failures of a single transport call.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The server answered with a non-success status
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    /// The request could not be sent or its body could not be read
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The endpoint address cannot be turned into a URL
    #[error("invalid url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// The transport cannot speak the domain's protocol
    #[error("unsupported protocol {0:?}")]
    UnsupportedProtocol(Protocol),

    /// Failure reported by a host-supplied [`Transport`](crate::Transport)
    /// that fits none of the variants above
    #[error("{0}")]
    Other(String),
}

/// Errors surfaced by the values resolver.
///
/// A search shorter than the domain's minimum length is not an error; it
/// resolves to an empty page.
#[derive(Debug, Error)]
pub enum ResolverError {
    /// The transport call failed
    #[error("fetch failure for {uri}: {source}")]
    FetchFailure {
        uri: String,
        #[source]
        source: TransportError,
    },

    /// The response body does not match the domain's response mapping
    #[error("could not parse values from {uri}: {reason}")]
    ParseFailure { uri: String, reason: String },

    /// The value domain descriptor is malformed
    #[error(transparent)]
    InvalidDomain(#[from] FieldsError),

    /// Resolver configuration could not be loaded
    #[error("configuration error: {0}")]
    Config(Box<figment::Error>),

    /// The resolver was shut down before the call completed
    #[error("values resolver has been shut down")]
    Shutdown,

    /// A debounced call ended without producing a result, e.g. because the
    /// transport or parser panicked
    #[error("resolution of {key} ended without a result")]
    Interrupted { key: String },
}

impl From<figment::Error> for ResolverError {
    fn from(err: figment::Error) -> Self {
        Self::Config(Box::new(err))
    }
}

impl ResolverError {
    /// Whether this is a transport or parse failure of a remote fetch.
    pub fn is_fetch_failure(&self) -> bool {
        matches!(self, Self::FetchFailure { .. } | Self::ParseFailure { .. })
    }
}
