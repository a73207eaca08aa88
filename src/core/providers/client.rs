use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;

use super::{curseforge::CurseForgeClient, github::GitHubClient, modrinth::ModrinthClient};
use crate::core::config::ProviderConfig;
use crate::core::error::ProviderError;
use crate::core::matching::FileCandidate;
use crate::core::modlist::{ModEntry, ProviderKind};
use crate::core::retry::RetryPolicy;

/// Everything a provider client needs, shared by the three variants.
#[derive(Debug, Clone)]
pub struct ProviderContext {
    pub http: reqwest::Client,
    pub settings: ProviderConfig,
    pub retry: RetryPolicy,
    pub max_pages: u32,
}

impl ProviderContext {
    /// Credential for this provider or `AuthMissing`.
    pub fn credential(&self, kind: ProviderKind) -> Result<&str, ProviderError> {
        self.settings
            .api_key
            .as_deref()
            .ok_or(ProviderError::AuthMissing { provider: kind })
    }
}

/// Lists the files a provider offers for one mod, normalized to `FileCandidate`s.
#[async_trait]
pub trait ProviderClient: Send + Sync {
    fn kind(&self) -> ProviderKind;

    async fn list_candidates(&self, entry: &ModEntry) -> Result<Vec<FileCandidate>, ProviderError>;
}

/// Provider dispatch by kind, without `Box<dyn>`.
pub enum Provider {
    CurseForge(CurseForgeClient),
    GitHub(GitHubClient),
    Modrinth(ModrinthClient),
}

impl Provider {
    pub fn new(kind: ProviderKind, ctx: ProviderContext) -> Self {
        match kind {
            ProviderKind::CurseForge => Self::CurseForge(CurseForgeClient::new(ctx)),
            ProviderKind::GitHub => Self::GitHub(GitHubClient::new(ctx)),
            ProviderKind::Modrinth => Self::Modrinth(ModrinthClient::new(ctx)),
        }
    }

    pub fn kind(&self) -> ProviderKind {
        match self {
            Provider::CurseForge(c) => c.kind(),
            Provider::GitHub(c) => c.kind(),
            Provider::Modrinth(c) => c.kind(),
        }
    }

    pub async fn list_candidates(
        &self,
        entry: &ModEntry,
    ) -> Result<Vec<FileCandidate>, ProviderError> {
        match self {
            Provider::CurseForge(c) => c.list_candidates(entry).await,
            Provider::GitHub(c) => c.list_candidates(entry).await,
            Provider::Modrinth(c) => c.list_candidates(entry).await,
        }
    }
}

// ── Shared response handling ────────────────────────────

/// Turn a non-success response into the provider error taxonomy.
pub(crate) fn check_status(
    provider: ProviderKind,
    id: &str,
    response: Response,
) -> Result<Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    Err(classify_status(provider, id, status, response.headers()))
}

pub(crate) fn classify_status(
    provider: ProviderKind,
    id: &str,
    status: StatusCode,
    headers: &HeaderMap,
) -> ProviderError {
    let rate_limit_exhausted = headers
        .get("x-ratelimit-remaining")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.trim() == "0");

    match status {
        StatusCode::TOO_MANY_REQUESTS => ProviderError::RateLimited {
            provider,
            retry_after: retry_after(headers),
        },
        StatusCode::FORBIDDEN if rate_limit_exhausted => ProviderError::RateLimited {
            provider,
            retry_after: retry_after(headers),
        },
        // CurseForge answers a bad `x-api-key` with a plain 403.
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            ProviderError::AuthMissing { provider }
        }
        StatusCode::NOT_FOUND | StatusCode::GONE => ProviderError::NotFound {
            provider,
            id: id.to_string(),
        },
        StatusCode::REQUEST_TIMEOUT => ProviderError::Transient {
            provider,
            reason: format!("HTTP {status}"),
        },
        s if s.is_server_error() => ProviderError::Transient {
            provider,
            reason: format!("HTTP {status}"),
        },
        _ => ProviderError::Malformed {
            provider,
            reason: format!("unexpected HTTP {status}"),
        },
    }
}

/// `Retry-After` in seconds (only the delta form is honoured).
fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

/// Send a prepared GET, classify the status and decode JSON.
pub(crate) async fn fetch_json<T: DeserializeOwned>(
    provider: ProviderKind,
    id: &str,
    request: reqwest::RequestBuilder,
) -> Result<(T, HeaderMap), ProviderError> {
    let response = request
        .send()
        .await
        .map_err(|e| ProviderError::from_reqwest(provider, &e))?;
    let response = check_status(provider, id, response)?;
    let headers = response.headers().clone();
    let body = response
        .bytes()
        .await
        .map_err(|e| ProviderError::from_reqwest(provider, &e))?;
    let parsed = serde_json::from_slice(&body).map_err(|e| ProviderError::Malformed {
        provider,
        reason: e.to_string(),
    })?;
    Ok((parsed, headers))
}
