use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::debug;

use super::client::{fetch_json, ProviderClient, ProviderContext};
use crate::core::error::ProviderError;
use crate::core::matching::model::push_unique;
use crate::core::matching::{Checksum, FileCandidate, ReleaseChannel};
use crate::core::modlist::{LoaderType, ModEntry, ProviderKind};

#[derive(Debug, Clone, Deserialize)]
pub struct ProjectVersion {
    pub id: String,
    pub version_number: String,
    #[serde(default)]
    pub game_versions: Vec<String>,
    #[serde(default)]
    pub loaders: Vec<String>,
    pub version_type: ReleaseChannel,
    pub date_published: DateTime<Utc>,
    #[serde(default)]
    pub files: Vec<VersionFile>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VersionFile {
    #[serde(default)]
    pub hashes: FileHashes,
    pub url: String,
    pub filename: String,
    #[serde(default)]
    pub primary: bool,
    pub size: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileHashes {
    pub sha1: Option<String>,
    pub sha512: Option<String>,
}

impl ProjectVersion {
    /// One candidate per version: its primary file, or the first one listed.
    pub fn into_candidate(self) -> Option<FileCandidate> {
        let primary = self.files.iter().position(|f| f.primary).unwrap_or(0);
        let file = self.files.into_iter().nth(primary)?;

        let mut loaders = Vec::new();
        for tag in &self.loaders {
            if let Some(loader) = LoaderType::from_tag(tag) {
                push_unique(&mut loaders, loader);
            }
        }

        let checksum = match (file.hashes.sha512, file.hashes.sha1) {
            (Some(sha512), _) => Some(Checksum::Sha512(sha512.to_ascii_lowercase())),
            (None, Some(sha1)) => Some(Checksum::Sha1(sha1.to_ascii_lowercase())),
            (None, None) => None,
        };

        let mut game_versions = Vec::new();
        for version in self.game_versions {
            push_unique(&mut game_versions, version);
        }

        Some(FileCandidate {
            file_id: self.id,
            file_name: file.filename,
            game_versions,
            loaders,
            published_at: self.date_published,
            download_url: file.url,
            size: file.size,
            checksum,
            channel: self.version_type,
        })
    }
}

pub struct ModrinthClient {
    ctx: ProviderContext,
}

impl ModrinthClient {
    pub fn new(ctx: ProviderContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl ProviderClient for ModrinthClient {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Modrinth
    }

    /// The version listing is not paginated: one request returns every version.
    async fn list_candidates(&self, entry: &ModEntry) -> Result<Vec<FileCandidate>, ProviderError> {
        let token = self.ctx.credential(self.kind())?;

        let url = format!("{}/project/{}/version", self.ctx.settings.base_url(), entry.id);
        let mut query = Vec::new();
        if let Some(loader) = entry.loader {
            query.push(("loaders", format!("[\"{loader}\"]")));
        }

        let label = format!("Modrinth versions for {}", entry.id);
        let (url, query) = (&url, &query);
        let versions = self
            .ctx
            .retry
            .run(&label, move |_| {
                let request = self
                    .ctx
                    .http
                    .get(url.as_str())
                    .query(query)
                    .header("Authorization", token)
                    .header("Accept", "application/json");
                async move {
                    debug!("GET {}", url);
                    fetch_json::<Vec<ProjectVersion>>(ProviderKind::Modrinth, &entry.id, request)
                        .await
                        .map(|(versions, _)| versions)
                }
            })
            .await
            .map_err(ProviderError::escalate)?;

        let candidates: Vec<FileCandidate> = versions
            .into_iter()
            .filter_map(ProjectVersion::into_candidate)
            .collect();
        debug!("Modrinth project {}: {} candidate files", entry.id, candidates.len());
        Ok(candidates)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn version(files: serde_json::Value) -> ProjectVersion {
        serde_json::from_value(json!({
            "id": "OihdIimA",
            "project_id": "AANobbMI",
            "name": "Sodium 0.5.8",
            "version_number": "mc1.20.1-0.5.8",
            "game_versions": ["1.20", "1.20.1", "1.20.1"],
            "loaders": ["fabric", "quilt", "iris"],
            "version_type": "beta",
            "date_published": "2024-03-14T18:00:00.000000Z",
            "downloads": 1000,
            "files": files
        }))
        .unwrap()
    }

    #[test]
    fn primary_file_wins_and_sha512_is_preferred() {
        let candidate = version(json!([
            {
                "hashes": {"sha1": "aaaa", "sha512": "BBBB"},
                "url": "https://cdn.modrinth.com/data/AANobbMI/versions/OihdIimA/sodium-sources.jar",
                "filename": "sodium-sources.jar",
                "primary": false,
                "size": 10
            },
            {
                "hashes": {"sha1": "cccc", "sha512": "DDDD"},
                "url": "https://cdn.modrinth.com/data/AANobbMI/versions/OihdIimA/sodium-fabric-0.5.8.jar",
                "filename": "sodium-fabric-0.5.8.jar",
                "primary": true,
                "size": 900_000
            }
        ]))
        .into_candidate()
        .unwrap();

        assert_eq!(candidate.file_id, "OihdIimA");
        assert_eq!(candidate.file_name, "sodium-fabric-0.5.8.jar");
        assert_eq!(candidate.size, 900_000);
        assert_eq!(candidate.checksum, Some(Checksum::Sha512("dddd".into())));
        assert_eq!(candidate.channel, ReleaseChannel::Beta);
        assert_eq!(candidate.game_versions, vec!["1.20", "1.20.1"]);
        assert_eq!(candidate.loaders, vec![LoaderType::Fabric, LoaderType::Quilt]);
    }

    #[test]
    fn falls_back_to_first_file_and_sha1() {
        let candidate = version(json!([
            {
                "hashes": {"sha1": "ABCD"},
                "url": "https://cdn.modrinth.com/x.jar",
                "filename": "x.jar",
                "size": 1
            }
        ]))
        .into_candidate()
        .unwrap();

        assert_eq!(candidate.file_name, "x.jar");
        assert_eq!(candidate.checksum, Some(Checksum::Sha1("abcd".into())));
    }

    #[test]
    fn version_without_files_is_dropped() {
        assert!(version(json!([])).into_candidate().is_none());
    }
}
