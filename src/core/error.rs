use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::core::modlist::ProviderKind;

/// Failure while listing the files of one mod on one provider.
///
/// Captured per entry: it never aborts the run, it turns the entry's
/// `MatchResult` into quality `None`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    #[error("{provider}: API credential missing or rejected")]
    AuthMissing { provider: ProviderKind },

    #[error("{provider}: rate limited")]
    RateLimited {
        provider: ProviderKind,
        retry_after: Option<Duration>,
    },

    #[error("{provider}: project {id} not found")]
    NotFound { provider: ProviderKind, id: String },

    #[error("{provider}: transient failure: {reason}")]
    Transient {
        provider: ProviderKind,
        reason: String,
    },

    #[error("{provider}: malformed response: {reason}")]
    Malformed {
        provider: ProviderKind,
        reason: String,
    },

    #[error("{provider}: project {id} is {actual}, not {expected}")]
    IdMismatch {
        provider: ProviderKind,
        id: String,
        expected: String,
        actual: String,
    },
}

impl ProviderError {
    /// Only rate limiting and transient network failures are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ProviderError::RateLimited { .. } | ProviderError::Transient { .. }
        )
    }

    pub fn provider(&self) -> ProviderKind {
        match self {
            ProviderError::AuthMissing { provider }
            | ProviderError::RateLimited { provider, .. }
            | ProviderError::NotFound { provider, .. }
            | ProviderError::Transient { provider, .. }
            | ProviderError::Malformed { provider, .. }
            | ProviderError::IdMismatch { provider, .. } => *provider,
        }
    }

    /// Map a transport-level reqwest failure.
    pub fn from_reqwest(provider: ProviderKind, err: &reqwest::Error) -> Self {
        if err.is_decode() {
            ProviderError::Malformed {
                provider,
                reason: err.to_string(),
            }
        } else {
            ProviderError::Transient {
                provider,
                reason: err.to_string(),
            }
        }
    }

    /// Retries ran out: whatever the last failure was, it is now a transient one.
    pub fn escalate(self) -> Self {
        match self {
            ProviderError::RateLimited { provider, .. } => ProviderError::Transient {
                provider,
                reason: "rate limit persisted after retries".into(),
            },
            other => other,
        }
    }
}

/// Failure of a single file transfer.
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("transfer of {url} failed: {reason}")]
    Transient { url: String, reason: String },

    #[error("download of {url} refused with HTTP {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("{algorithm} mismatch for {path:?}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        path: PathBuf,
        algorithm: &'static str,
        expected: String,
        actual: String,
    },

    #[error("IO error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl DownloadError {
    /// Checksum and filesystem failures are recorded immediately.
    pub fn is_retryable(&self) -> bool {
        matches!(self, DownloadError::Transient { .. })
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        DownloadError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Fatal, run-level errors. Everything else is captured per entry or per job.
#[derive(Debug, Error)]
pub enum EngineError {
    // ── Configuration ───────────────────────────────────
    #[error("configuration file not found: {0:?}")]
    ConfigNotFound(PathBuf),

    #[error("invalid configuration in {path:?}: {source}")]
    ConfigParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid target game version: {0:?}")]
    InvalidTargetVersion(String),

    #[error("no API credential configured for any provider")]
    NoCredentials,

    // ── Mod list ────────────────────────────────────────
    #[error("the mod list is empty")]
    NoEntries,

    #[error("invalid mod entry #{index} ({name}): {reason}")]
    InvalidEntry {
        index: usize,
        name: String,
        reason: String,
    },

    // ── IO / network setup ──────────────────────────────
    #[error("IO error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("HTTP client setup failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("confirmation prompt failed: {0}")]
    Prompt(std::io::Error),
}

/// Convenience alias used throughout the crate.
pub type EngineResult<T> = Result<T, EngineError>;
