use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, info};

use crate::core::error::{EngineError, EngineResult};
use crate::core::matching::{GameVersion, ReleaseChannel};
use crate::core::modlist::{self, LoaderType, ModEntry, ModSpec, ProviderKind};
use crate::core::retry::RetryPolicy;

const APP_DIR_NAME: &str = "modsync";
const LOCAL_CONFIG_FILE: &str = "modsync.toml";

const CURSEFORGE_API: &str = "https://api.curseforge.com/v1";
const GITHUB_API: &str = "https://api.github.com";
const MODRINTH_API: &str = "https://api.modrinth.com/v2";

/// What to do when a CurseForge project id does not belong to the entry's URL.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerifyIdPolicy {
    #[default]
    Ignore,
    Warn,
    Error,
}

/// Connection settings for one provider, defaults filled in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    pub api_key: Option<String>,
    pub api_url: String,
    /// Parallel listings allowed against this provider.
    pub concurrency: usize,
    /// Only consulted by CurseForge.
    pub verify_id: VerifyIdPolicy,
}

impl ProviderConfig {
    pub fn defaults_for(kind: ProviderKind) -> Self {
        let (api_url, concurrency) = match kind {
            ProviderKind::CurseForge => (CURSEFORGE_API, 4),
            ProviderKind::GitHub => (GITHUB_API, 4),
            ProviderKind::Modrinth => (MODRINTH_API, 8),
        };
        Self {
            api_key: None,
            api_url: api_url.to_string(),
            concurrency,
            verify_id: VerifyIdPolicy::Ignore,
        }
    }

    pub fn base_url(&self) -> &str {
        self.api_url.trim_end_matches('/')
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadConfig {
    pub concurrency: usize,
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            concurrency: 5,
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
        }
    }
}

/// Immutable run configuration, built once at startup and passed explicitly.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub game_version: String,
    pub loader: Option<LoaderType>,
    pub output_dir: PathBuf,
    pub unattended: bool,
    pub overwrite: bool,
    pub min_channel: ReleaseChannel,
    /// Page cap for paginated listings (CurseForge, GitHub).
    pub max_pages: u32,
    pub download: DownloadConfig,
    pub curseforge: ProviderConfig,
    pub github: ProviderConfig,
    pub modrinth: ProviderConfig,
    pub mods: Vec<ModSpec>,
}

// ── On-disk shape ───────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    game_version: Option<String>,
    loader: Option<LoaderType>,
    output_dir: Option<PathBuf>,
    #[serde(default)]
    unattended: bool,
    #[serde(default)]
    overwrite: bool,
    min_channel: Option<ReleaseChannel>,
    max_pages: Option<u32>,
    mod_list: Option<PathBuf>,
    #[serde(default)]
    download: RawDownload,
    #[serde(default)]
    curseforge: RawProvider,
    #[serde(default)]
    github: RawProvider,
    #[serde(default)]
    modrinth: RawProvider,
    #[serde(default)]
    mods: Vec<ModSpec>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawDownload {
    concurrency: Option<usize>,
    max_attempts: Option<u32>,
    base_delay_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawProvider {
    api_key: Option<String>,
    api_url: Option<String>,
    concurrency: Option<usize>,
    verify_id: Option<VerifyIdPolicy>,
}

impl RawProvider {
    fn resolve(self, kind: ProviderKind) -> ProviderConfig {
        let defaults = ProviderConfig::defaults_for(kind);
        ProviderConfig {
            api_key: self.api_key.filter(|k| !k.trim().is_empty()),
            api_url: self.api_url.unwrap_or(defaults.api_url),
            concurrency: self.concurrency.unwrap_or(defaults.concurrency).max(1),
            verify_id: self.verify_id.unwrap_or(defaults.verify_id),
        }
    }
}

/// Command-line values that take precedence over the file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub game_version: Option<String>,
    pub output_dir: Option<PathBuf>,
    pub loader: Option<LoaderType>,
    pub unattended: bool,
}

impl EngineConfig {
    /// `./modsync.toml`, else `<config dir>/modsync/config.toml`.
    pub fn default_path() -> PathBuf {
        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.exists() {
            return local;
        }
        dirs::config_dir()
            .map(|dir| dir.join(APP_DIR_NAME).join("config.toml"))
            .unwrap_or(local)
    }

    pub fn load(path: &Path, overrides: ConfigOverrides) -> EngineResult<Self> {
        if !path.exists() {
            return Err(EngineError::ConfigNotFound(path.to_path_buf()));
        }
        let raw = std::fs::read_to_string(path).map_err(|source| EngineError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        let config = Self::parse(&raw, base_dir, overrides).map_err(|err| match err {
            EngineError::ConfigParse { path: p, source } if p.as_os_str().is_empty() => {
                EngineError::ConfigParse {
                    path: path.to_path_buf(),
                    source,
                }
            }
            other => other,
        })?;
        info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Parse and validate configuration text. Relative `mod_list` paths are
    /// resolved against `base_dir`.
    pub fn parse(raw: &str, base_dir: &Path, overrides: ConfigOverrides) -> EngineResult<Self> {
        let file: RawConfig = toml::from_str(raw).map_err(|source| EngineError::ConfigParse {
            path: PathBuf::new(),
            source,
        })?;

        let game_version = overrides
            .game_version
            .or(file.game_version)
            .map(|v| v.trim().to_string())
            .ok_or_else(|| EngineError::InvalidConfig("`game_version` is required".into()))?;
        if GameVersion::parse(&game_version).is_none() {
            return Err(EngineError::InvalidTargetVersion(game_version));
        }

        let mut mods = file.mods;
        if let Some(list) = file.mod_list {
            let list = if list.is_relative() {
                base_dir.join(list)
            } else {
                list
            };
            debug!("Reading mod list from {:?}", list);
            mods.extend(modlist::load_mod_list(&list)?);
        }

        let download = DownloadConfig {
            concurrency: file.download.concurrency.unwrap_or(5).max(1),
            max_attempts: file.download.max_attempts.unwrap_or(3).max(1),
            base_delay: Duration::from_millis(file.download.base_delay_ms.unwrap_or(500)),
        };

        Ok(Self {
            game_version,
            loader: overrides.loader.or(file.loader),
            output_dir: overrides
                .output_dir
                .or(file.output_dir)
                .unwrap_or_else(|| PathBuf::from("mods")),
            unattended: overrides.unattended || file.unattended,
            overwrite: file.overwrite,
            min_channel: file.min_channel.unwrap_or(ReleaseChannel::Beta),
            max_pages: file.max_pages.unwrap_or(10).max(1),
            download,
            curseforge: file.curseforge.resolve(ProviderKind::CurseForge),
            github: file.github.resolve(ProviderKind::GitHub),
            modrinth: file.modrinth.resolve(ProviderKind::Modrinth),
            mods,
        })
    }

    pub fn provider(&self, kind: ProviderKind) -> &ProviderConfig {
        match kind {
            ProviderKind::CurseForge => &self.curseforge,
            ProviderKind::GitHub => &self.github,
            ProviderKind::Modrinth => &self.modrinth,
        }
    }

    /// Retry policy shared by listings and transfers.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.download.max_attempts, self.download.base_delay)
    }

    /// Validated entries, in configuration order.
    pub fn entries(&self) -> EngineResult<Vec<ModEntry>> {
        modlist::build_entries(self.mods.clone(), self.loader)
    }

    /// Fatal pre-flight checks: runs before any network activity.
    ///
    /// Entries whose provider lacks a credential are *not* fatal; they fail
    /// individually with `AuthMissing` later.
    pub fn preflight(&self, entries: &[ModEntry]) -> EngineResult<()> {
        if entries.is_empty() {
            return Err(EngineError::NoEntries);
        }
        let any_credential = ProviderKind::ALL
            .iter()
            .any(|kind| self.provider(*kind).api_key.is_some());
        if !any_credential {
            return Err(EngineError::NoCredentials);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
game_version = "1.20.1"
loader = "fabric"
output_dir = "out"
max_pages = 3

[download]
concurrency = 2
base_delay_ms = 10

[curseforge]
api_key = "cf-key"
verify_id = "warn"

[modrinth]
api_key = "mr-key"
api_url = "http://localhost:9999/v2/"
concurrency = 2

[[mods]]
name = "Sodium"
url = "https://modrinth.com/mod/sodium"

[[mods]]
name = "JEI"
provider = "curseforge"
id = "238222"
loader = "forge"
"#;

    fn parse(raw: &str, overrides: ConfigOverrides) -> EngineResult<EngineConfig> {
        EngineConfig::parse(raw, Path::new("."), overrides)
    }

    #[test]
    fn parses_sample_with_defaults() {
        let config = parse(SAMPLE, ConfigOverrides::default()).unwrap();

        assert_eq!(config.game_version, "1.20.1");
        assert_eq!(config.loader, Some(LoaderType::Fabric));
        assert_eq!(config.output_dir, PathBuf::from("out"));
        assert_eq!(config.min_channel, ReleaseChannel::Beta);
        assert_eq!(config.max_pages, 3);
        assert_eq!(config.download.concurrency, 2);
        assert_eq!(config.download.max_attempts, 3);
        assert_eq!(config.download.base_delay, Duration::from_millis(10));

        assert_eq!(config.curseforge.api_key.as_deref(), Some("cf-key"));
        assert_eq!(config.curseforge.api_url, CURSEFORGE_API);
        assert_eq!(config.curseforge.verify_id, VerifyIdPolicy::Warn);
        assert_eq!(config.modrinth.verify_id, VerifyIdPolicy::Ignore);
        assert_eq!(config.github.api_key, None);
        assert_eq!(config.modrinth.base_url(), "http://localhost:9999/v2");
        assert_eq!(config.modrinth.concurrency, 2);

        let entries = config.entries().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].loader, Some(LoaderType::Fabric));
        assert_eq!(entries[1].loader, Some(LoaderType::Forge));
    }

    #[test]
    fn overrides_win() {
        let overrides = ConfigOverrides {
            game_version: Some("1.21".into()),
            output_dir: Some(PathBuf::from("elsewhere")),
            loader: Some(LoaderType::Quilt),
            unattended: true,
        };
        let config = parse(SAMPLE, overrides).unwrap();
        assert_eq!(config.game_version, "1.21");
        assert_eq!(config.output_dir, PathBuf::from("elsewhere"));
        assert_eq!(config.loader, Some(LoaderType::Quilt));
        assert!(config.unattended);
    }

    #[test]
    fn missing_or_bad_version_is_fatal() {
        let err = parse("[[mods]]\nname = \"x\"\nurl = \"https://modrinth.com/mod/x\"", ConfigOverrides::default())
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidConfig(_)));

        let err = parse("game_version = \"latest\"", ConfigOverrides::default()).unwrap_err();
        assert!(matches!(err, EngineError::InvalidTargetVersion(_)));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = parse("game_version = \"1.20.1\"\nthreads = 4", ConfigOverrides::default())
            .unwrap_err();
        assert!(matches!(err, EngineError::ConfigParse { .. }));
    }

    #[test]
    fn preflight_requires_entries_and_some_credential() {
        let config = parse(SAMPLE, ConfigOverrides::default()).unwrap();
        assert!(matches!(config.preflight(&[]), Err(EngineError::NoEntries)));
        assert!(config.preflight(&config.entries().unwrap()).is_ok());

        let no_keys = parse(
            "game_version = \"1.20.1\"\n[[mods]]\nname = \"Sodium\"\nurl = \"https://modrinth.com/mod/sodium\"",
            ConfigOverrides::default(),
        )
        .unwrap();
        let entries = no_keys.entries().unwrap();
        assert!(matches!(no_keys.preflight(&entries), Err(EngineError::NoCredentials)));
    }

    #[test]
    fn unknown_verify_policy_is_rejected() {
        let err = parse(
            "game_version = \"1.20.1\"\n[curseforge]\nverify_id = \"strict\"",
            ConfigOverrides::default(),
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::ConfigParse { .. }));
    }

    #[test]
    fn empty_api_key_counts_as_missing() {
        let config = parse(
            "game_version = \"1.20.1\"\n[github]\napi_key = \"  \"",
            ConfigOverrides::default(),
        )
        .unwrap();
        assert_eq!(config.github.api_key, None);
    }

    #[test]
    fn mod_list_file_is_appended() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("mods.toml"),
            "[[mods]]\nname = \"Carpet\"\nurl = \"https://github.com/gnembon/fabric-carpet\"\n",
        )
        .unwrap();
        let config_path = dir.path().join("modsync.toml");
        std::fs::write(
            &config_path,
            "game_version = \"1.20.1\"\nmod_list = \"mods.toml\"\n[github]\napi_key = \"gh\"\n",
        )
        .unwrap();

        let config = EngineConfig::load(&config_path, ConfigOverrides::default()).unwrap();
        let entries = config.entries().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, "gnembon/fabric-carpet");
    }

    #[test]
    fn missing_file_is_reported() {
        let err = EngineConfig::load(Path::new("/definitely/not/here.toml"), ConfigOverrides::default())
            .unwrap_err();
        assert!(matches!(err, EngineError::ConfigNotFound(_)));
    }
}
