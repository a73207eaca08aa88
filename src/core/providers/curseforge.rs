use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, warn};

use super::client::{fetch_json, ProviderClient, ProviderContext};
use crate::core::config::VerifyIdPolicy;
use crate::core::error::ProviderError;
use crate::core::matching::model::push_unique;
use crate::core::matching::version::is_version_tag;
use crate::core::matching::{Checksum, FileCandidate, ReleaseChannel};
use crate::core::modlist::{LoaderType, ModEntry, ProviderKind};

const PAGE_SIZE: u64 = 50;
const FORGE_CDN: &str = "https://edge.forgecdn.net/files";
/// Edits tolerated between the user's URL and the project's own website URL.
const URL_TOLERANCE: usize = 2;

#[derive(Debug, Deserialize)]
pub struct FilesPage {
    #[serde(default)]
    pub data: Vec<CurseForgeFile>,
    pub pagination: Option<Pagination>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub index: u64,
    pub result_count: u64,
    pub total_count: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurseForgeFile {
    pub id: u64,
    pub file_name: String,
    /// 1 release, 2 beta, 3 alpha
    pub release_type: u8,
    pub file_date: DateTime<Utc>,
    pub file_length: u64,
    pub download_url: Option<String>,
    #[serde(default)]
    pub game_versions: Vec<String>,
    #[serde(default)]
    pub hashes: Vec<FileHash>,
    #[serde(default = "available")]
    pub is_available: bool,
}

fn available() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct ModDetails {
    pub data: ModData,
}

#[derive(Debug, Deserialize)]
pub struct ModData {
    #[serde(default)]
    pub links: ModLinks,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModLinks {
    pub website_url: Option<String>,
}

/// Levenshtein distance over characters.
fn edit_distance(a: &str, b: &str) -> usize {
    let b: Vec<char> = b.chars().collect();
    let mut previous: Vec<usize> = (0..=b.len()).collect();
    for (i, ca) in a.chars().enumerate() {
        let mut current = Vec::with_capacity(b.len() + 1);
        current.push(i + 1);
        for (j, cb) in b.iter().enumerate() {
            let substitution = previous[j] + usize::from(ca != *cb);
            current.push(substitution.min(previous[j + 1] + 1).min(current[j] + 1));
        }
        previous = current;
    }
    previous[b.len()]
}

#[derive(Debug, Clone, Deserialize)]
pub struct FileHash {
    pub value: String,
    /// 1 SHA-1, 2 MD5
    pub algo: u8,
}

impl CurseForgeFile {
    /// `downloadUrl` is null for mods whose authors opted out of third-party
    /// distribution; the CDN path is derivable from the file id.
    fn resolved_download_url(&self) -> String {
        if let Some(url) = self.download_url.as_deref().filter(|u| !u.is_empty()) {
            return url.to_string();
        }
        let encoded = self.file_name.replace('+', "%2B").replace(' ', "%20");
        format!(
            "{}/{}/{}/{}",
            FORGE_CDN,
            self.id / 1000,
            self.id % 1000,
            encoded
        )
    }

    /// `gameVersions` mixes game versions, loader names and environment tags
    /// (`"Client"`, `"Server"`, `"Java 17"`); split them apart.
    pub fn into_candidate(self) -> FileCandidate {
        let mut versions = Vec::new();
        let mut loaders = Vec::new();
        for tag in &self.game_versions {
            if let Some(loader) = LoaderType::from_tag(tag) {
                push_unique(&mut loaders, loader);
            } else if is_version_tag(tag) {
                push_unique(&mut versions, tag.trim().to_string());
            }
        }

        let checksum = self
            .hashes
            .iter()
            .find(|h| h.algo == 1)
            .map(|h| Checksum::Sha1(h.value.to_ascii_lowercase()))
            .or_else(|| {
                self.hashes
                    .iter()
                    .find(|h| h.algo == 2)
                    .map(|h| Checksum::Md5(h.value.to_ascii_lowercase()))
            });

        let channel = match self.release_type {
            1 => ReleaseChannel::Release,
            2 => ReleaseChannel::Beta,
            _ => ReleaseChannel::Alpha,
        };

        FileCandidate {
            file_id: self.id.to_string(),
            download_url: self.resolved_download_url(),
            file_name: self.file_name,
            game_versions: versions,
            loaders,
            published_at: self.file_date,
            size: self.file_length,
            checksum,
            channel,
        }
    }
}

pub struct CurseForgeClient {
    ctx: ProviderContext,
}

impl CurseForgeClient {
    pub fn new(ctx: ProviderContext) -> Self {
        Self { ctx }
    }

    async fn fetch_page(
        &self,
        api_key: &str,
        entry: &ModEntry,
        index: u64,
    ) -> Result<FilesPage, ProviderError> {
        let url = format!("{}/mods/{}/files", self.ctx.settings.base_url(), entry.id);
        let mut query = vec![
            ("index", index.to_string()),
            ("pageSize", PAGE_SIZE.to_string()),
        ];
        if let Some(loader) = entry.loader {
            query.push(("modLoaderType", loader.curseforge_id().to_string()));
        }

        let label = format!("CurseForge listing for {}", entry.id);
        let (url, query) = (&url, &query);
        self.ctx
            .retry
            .run(&label, move |_| {
                let request = self
                    .ctx
                    .http
                    .get(url.as_str())
                    .query(query)
                    .header("x-api-key", api_key)
                    .header("Accept", "application/json");
                async move {
                    debug!("GET {} (index {})", url, index);
                    fetch_json::<FilesPage>(ProviderKind::CurseForge, &entry.id, request)
                        .await
                        .map(|(page, _)| page)
                }
            })
            .await
            .map_err(ProviderError::escalate)
    }

    /// The project's own website URL, from `GET mods/{id}`.
    async fn website_url(&self, api_key: &str, entry: &ModEntry) -> Result<String, ProviderError> {
        let url = format!("{}/mods/{}", self.ctx.settings.base_url(), entry.id);
        let label = format!("CurseForge project {}", entry.id);
        let url = &url;
        let details = self
            .ctx
            .retry
            .run(&label, move |_| {
                let request = self
                    .ctx
                    .http
                    .get(url.as_str())
                    .header("x-api-key", api_key)
                    .header("Accept", "application/json");
                async move {
                    debug!("GET {}", url);
                    fetch_json::<ModDetails>(ProviderKind::CurseForge, &entry.id, request)
                        .await
                        .map(|(details, _)| details)
                }
            })
            .await
            .map_err(ProviderError::escalate)?;

        details
            .data
            .links
            .website_url
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty())
            .ok_or_else(|| ProviderError::Malformed {
                provider: ProviderKind::CurseForge,
                reason: format!("project {} has no website URL", entry.id),
            })
    }

    /// Check that the numeric id belongs to the page the user linked.
    ///
    /// A failed lookup always fails the entry; a mismatch fails it only under
    /// `VerifyIdPolicy::Error`.
    async fn verify_id(&self, api_key: &str, entry: &ModEntry) -> Result<(), ProviderError> {
        let policy = self.ctx.settings.verify_id;
        let Some(expected) = entry.source_url.as_deref().map(str::trim) else {
            return Ok(());
        };
        if policy == VerifyIdPolicy::Ignore {
            return Ok(());
        }

        let actual = self.website_url(api_key, entry).await?;
        let distance = edit_distance(&actual, expected);
        if distance <= URL_TOLERANCE {
            debug!("CurseForge project {} verified against {}", entry.id, expected);
            return Ok(());
        }

        let mismatch = ProviderError::IdMismatch {
            provider: ProviderKind::CurseForge,
            id: entry.id.clone(),
            expected: expected.to_string(),
            actual,
        };
        match policy {
            VerifyIdPolicy::Error => Err(mismatch),
            _ => {
                warn!("{}: {}", entry.name, mismatch);
                Ok(())
            }
        }
    }
}

#[async_trait]
impl ProviderClient for CurseForgeClient {
    fn kind(&self) -> ProviderKind {
        ProviderKind::CurseForge
    }

    async fn list_candidates(&self, entry: &ModEntry) -> Result<Vec<FileCandidate>, ProviderError> {
        let api_key = self.ctx.credential(self.kind())?;
        self.verify_id(api_key, entry).await?;

        let mut candidates = Vec::new();
        let mut index = 0;
        for _ in 0..self.ctx.max_pages {
            let page = self.fetch_page(api_key, entry, index).await?;
            let fetched = page.data.len() as u64;
            candidates.extend(
                page.data
                    .into_iter()
                    .filter(|f| f.is_available)
                    .map(CurseForgeFile::into_candidate),
            );

            let total = page.pagination.map_or(0, |p| p.total_count);
            index += fetched;
            if fetched == 0 || index >= total {
                break;
            }
        }

        debug!(
            "CurseForge project {}: {} candidate files",
            entry.id,
            candidates.len()
        );
        Ok(candidates)
    }
}
