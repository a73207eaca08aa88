use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, LINK};
use serde::Deserialize;
use tracing::debug;

use super::client::{fetch_json, ProviderClient, ProviderContext};
use crate::core::error::ProviderError;
use crate::core::matching::model::push_unique;
use crate::core::matching::version::extract_versions;
use crate::core::matching::{FileCandidate, ReleaseChannel};
use crate::core::modlist::{LoaderType, ModEntry, ProviderKind};

const PER_PAGE: u32 = 100;
const API_VERSION: &str = "2022-11-28";

/// Jars published next to the real mod that are never what a player wants.
const AUXILIARY_JAR_SUFFIXES: [&str; 4] = ["-sources.jar", "-dev.jar", "-javadoc.jar", "-api.jar"];

#[derive(Debug, Clone, Deserialize)]
pub struct Release {
    pub tag_name: String,
    pub name: Option<String>,
    #[serde(default)]
    pub draft: bool,
    #[serde(default)]
    pub prerelease: bool,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub assets: Vec<Asset>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Asset {
    pub id: u64,
    pub name: String,
    pub size: u64,
    pub browser_download_url: String,
}

impl Asset {
    fn is_mod_jar(&self) -> bool {
        let lower = self.name.to_ascii_lowercase();
        lower.ends_with(".jar") && !AUXILIARY_JAR_SUFFIXES.iter().any(|s| lower.ends_with(s))
    }
}

/// Loader names appearing as words in free text (`"fabric-carpet-1.20.1"`).
fn detect_loaders(texts: &[&str]) -> Vec<LoaderType> {
    let mut loaders = Vec::new();
    for text in texts {
        for word in text.split(|c: char| !c.is_ascii_alphanumeric()) {
            if let Some(loader) = LoaderType::from_tag(word) {
                push_unique(&mut loaders, loader);
            }
        }
    }
    loaders
}

impl Release {
    /// GitHub has no structured game-version metadata. Versions come from the
    /// tag and release name; the asset name is only read when those carry
    /// none, since it usually embeds the mod's own version too. Loaders are
    /// detected in all three.
    pub fn into_candidates(self) -> Vec<FileCandidate> {
        if self.draft {
            return Vec::new();
        }

        let channel = if self.prerelease {
            ReleaseChannel::Alpha
        } else {
            ReleaseChannel::Release
        };
        let published_at = self.published_at.unwrap_or(self.created_at);
        let release_name = self.name.clone().unwrap_or_default();
        let mut release_versions = Vec::new();
        for text in [self.tag_name.as_str(), release_name.as_str()] {
            for version in extract_versions(text) {
                push_unique(&mut release_versions, version);
            }
        }

        self.assets
            .into_iter()
            .filter(Asset::is_mod_jar)
            .map(|asset| {
                let texts = [asset.name.as_str(), release_name.as_str(), self.tag_name.as_str()];
                let mut game_versions = release_versions.clone();
                if game_versions.is_empty() {
                    game_versions = extract_versions(&asset.name);
                }

                FileCandidate {
                    file_id: asset.id.to_string(),
                    loaders: detect_loaders(&texts),
                    game_versions,
                    published_at,
                    download_url: asset.browser_download_url,
                    size: asset.size,
                    checksum: None,
                    channel,
                    file_name: asset.name,
                }
            })
            .collect()
    }
}

/// `Link: <...page=3>; rel="next", <...>; rel="last"`
fn has_next_page(headers: &HeaderMap) -> bool {
    headers
        .get(LINK)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|link| link.contains("rel=\"next\""))
}

pub struct GitHubClient {
    ctx: ProviderContext,
}

impl GitHubClient {
    pub fn new(ctx: ProviderContext) -> Self {
        Self { ctx }
    }

    async fn fetch_page(
        &self,
        token: &str,
        entry: &ModEntry,
        page: u32,
    ) -> Result<(Vec<Release>, bool), ProviderError> {
        let url = format!("{}/repos/{}/releases", self.ctx.settings.base_url(), entry.id);
        let query = [("per_page", PER_PAGE), ("page", page)];
        let auth = format!("Bearer {token}");

        let label = format!("GitHub releases for {}", entry.id);
        let (url, auth) = (&url, &auth);
        self.ctx
            .retry
            .run(&label, move |_| {
                let request = self
                    .ctx
                    .http
                    .get(url.as_str())
                    .query(&query)
                    .header("Accept", "application/vnd.github+json")
                    .header("Authorization", auth.as_str())
                    .header("X-GitHub-Api-Version", API_VERSION);
                async move {
                    debug!("GET {} (page {})", url, page);
                    let (releases, headers) =
                        fetch_json::<Vec<Release>>(ProviderKind::GitHub, &entry.id, request).await?;
                    Ok((releases, has_next_page(&headers)))
                }
            })
            .await
            .map_err(ProviderError::escalate)
    }
}

#[async_trait]
impl ProviderClient for GitHubClient {
    fn kind(&self) -> ProviderKind {
        ProviderKind::GitHub
    }

    async fn list_candidates(&self, entry: &ModEntry) -> Result<Vec<FileCandidate>, ProviderError> {
        let token = self.ctx.credential(self.kind())?;

        let mut candidates = Vec::new();
        for page in 1..=self.ctx.max_pages {
            let (releases, more) = self.fetch_page(token, entry, page).await?;
            if releases.is_empty() {
                break;
            }
            candidates.extend(releases.into_iter().flat_map(Release::into_candidates));
            if !more {
                break;
            }
        }

        debug!("GitHub repo {}: {} candidate files", entry.id, candidates.len());
        Ok(candidates)
    }
}
