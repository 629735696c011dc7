//! Typed errors for the flat-file store and the external model providers.
//!
//! Both kinds are recoverable: the pipeline applies a fallback policy on top
//! of them (empty collection, next provider). They exist so callers can tell
//! "no data" from "failed to load" and "exhausted provider" from
//! "misconfigured provider" when they care to.

use std::path::PathBuf;

use thiserror::Error;

/// Failure loading or saving a JSON array file.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{} does not contain a JSON array", path.display())]
    NotArray { path: PathBuf },

    #[error("failed to serialize records for {}: {source}", path.display())]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Failure obtaining a reply from a hosted completion provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("{provider}: no API key configured (set {env_var})")]
    NotConfigured {
        provider: &'static str,
        env_var: String,
    },

    #[error("{provider}: request failed: {source}")]
    Request {
        provider: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{provider}: API returned {status}: {body}")]
    Status {
        provider: &'static str,
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("{provider}: malformed response: missing choices[0].message.content")]
    MalformedResponse { provider: &'static str },

    #[error("{provider}: empty reply")]
    EmptyReply { provider: &'static str },
}

impl ProviderError {
    /// True when the provider was skipped because it has no credentials,
    /// as opposed to being tried and failing.
    pub fn is_not_configured(&self) -> bool {
        matches!(self, ProviderError::NotConfigured { .. })
    }
}
