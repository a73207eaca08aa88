// ─── Mod list ───
// Turns the user-facing mod list (inline `[[mods]]` tables or a separate TOML
// file) into validated `ModEntry` values.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use tracing::debug;

use super::model::{LoaderType, ModEntry, ProviderKind};
use crate::core::error::{EngineError, EngineResult};

static GITHUB_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"https?://(?:www\.)?github\.com/([^/\s#?]+)/([^/\s#?]+)").expect("valid regex")
});

static MODRINTH_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"https?://(?:www\.)?modrinth\.com/(?:mod|plugin)/([^/\s#?]+)").expect("valid regex")
});

/// A mod as written in the configuration, before validation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModSpec {
    pub name: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub provider: Option<ProviderKind>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub loader: Option<LoaderType>,
}

#[derive(Debug, Deserialize)]
struct ModListFile {
    #[serde(default)]
    mods: Vec<ModSpec>,
}

impl ModSpec {
    /// Validate into a `ModEntry`.
    ///
    /// An explicit `provider` + `id` wins; otherwise both are derived from
    /// `url`. CurseForge pages carry a slug the files API does not accept, so
    /// CurseForge entries always need the numeric `id`.
    pub fn into_entry(
        self,
        index: usize,
        default_loader: Option<LoaderType>,
    ) -> EngineResult<ModEntry> {
        let invalid = |reason: &str| EngineError::InvalidEntry {
            index,
            name: self.name.clone(),
            reason: reason.to_string(),
        };

        if self.name.trim().is_empty() {
            return Err(invalid("missing name"));
        }

        let provider = match (self.provider, self.url.as_deref()) {
            (Some(provider), _) => provider,
            (None, Some(url)) => {
                provider_from_url(url).ok_or_else(|| invalid("unrecognised mod URL"))?
            }
            (None, None) => return Err(invalid("needs either `provider` + `id` or `url`")),
        };

        let id = match (self.id.as_deref(), self.url.as_deref()) {
            (Some(id), _) if !id.trim().is_empty() => id.trim().to_string(),
            (_, Some(url)) => id_from_url(provider, url).ok_or_else(|| {
                invalid(&format!("cannot derive a {provider} id from the URL"))
            })?,
            _ => return Err(invalid("missing `id`")),
        };

        if provider == ProviderKind::CurseForge && id.parse::<u64>().is_err() {
            return Err(invalid("CurseForge ids must be numeric project ids"));
        }
        if provider == ProviderKind::GitHub && id.split('/').count() != 2 {
            return Err(invalid("GitHub ids must look like `owner/repo`"));
        }

        let entry = ModEntry::new(self.name.trim(), provider, id, self.loader.or(default_loader));
        Ok(match self.url.as_deref().map(str::trim) {
            Some(url) if !url.is_empty() => entry.with_source_url(url),
            _ => entry,
        })
    }
}

fn provider_from_url(url: &str) -> Option<ProviderKind> {
    if url.contains("curseforge.com") {
        Some(ProviderKind::CurseForge)
    } else if url.contains("github.com") {
        Some(ProviderKind::GitHub)
    } else if url.contains("modrinth.com") {
        Some(ProviderKind::Modrinth)
    } else {
        None
    }
}

fn id_from_url(provider: ProviderKind, url: &str) -> Option<String> {
    match provider {
        ProviderKind::GitHub => GITHUB_URL.captures(url).map(|c| {
            let repo = c[2].trim_end_matches(".git");
            format!("{}/{}", &c[1], repo)
        }),
        ProviderKind::Modrinth => MODRINTH_URL.captures(url).map(|c| c[1].to_string()),
        ProviderKind::CurseForge => None,
    }
}

/// Validate every spec, preserving order.
pub fn build_entries(
    specs: Vec<ModSpec>,
    default_loader: Option<LoaderType>,
) -> EngineResult<Vec<ModEntry>> {
    if specs.is_empty() {
        return Err(EngineError::NoEntries);
    }
    let entries = specs
        .into_iter()
        .enumerate()
        .map(|(index, spec)| spec.into_entry(index + 1, default_loader))
        .collect::<EngineResult<Vec<_>>>()?;
    debug!("Loaded {} mod entries", entries.len());
    Ok(entries)
}

/// Read the `[[mods]]` tables of a standalone mod list file.
pub fn load_mod_list(path: &Path) -> EngineResult<Vec<ModSpec>> {
    let raw = std::fs::read_to_string(path).map_err(|source| EngineError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let file: ModListFile = toml::from_str(&raw).map_err(|source| EngineError::ConfigParse {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(file.mods)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(name: &str, url: Option<&str>) -> ModSpec {
        ModSpec {
            name: name.into(),
            url: url.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn github_url_becomes_owner_repo() {
        let entry = spec("Carpet", Some("https://github.com/gnembon/fabric-carpet/releases"))
            .into_entry(1, None)
            .unwrap();
        assert_eq!(entry.provider, ProviderKind::GitHub);
        assert_eq!(entry.id, "gnembon/fabric-carpet");
    }

    #[test]
    fn github_url_drops_git_suffix() {
        let entry = spec("Malilib", Some("https://github.com/sakura-ryoko/malilib.git"))
            .into_entry(1, None)
            .unwrap();
        assert_eq!(entry.id, "sakura-ryoko/malilib");
    }

    #[test]
    fn modrinth_url_becomes_slug() {
        let entry = spec("Sodium", Some("https://modrinth.com/mod/sodium/versions"))
            .into_entry(1, Some(LoaderType::Fabric))
            .unwrap();
        assert_eq!(entry.provider, ProviderKind::Modrinth);
        assert_eq!(entry.id, "sodium");
        assert_eq!(entry.loader, Some(LoaderType::Fabric));
    }

    #[test]
    fn curseforge_url_needs_numeric_id() {
        let err = spec("JEI", Some("https://www.curseforge.com/minecraft/mc-mods/jei"))
            .into_entry(3, None)
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidEntry { index: 3, .. }));

        let mut with_id = spec("JEI", Some("https://www.curseforge.com/minecraft/mc-mods/jei"));
        with_id.id = Some("238222".into());
        let entry = with_id.into_entry(3, None).unwrap();
        assert_eq!(entry.provider, ProviderKind::CurseForge);
        assert_eq!(entry.id, "238222");
        assert_eq!(
            entry.source_url.as_deref(),
            Some("https://www.curseforge.com/minecraft/mc-mods/jei")
        );
    }

    #[test]
    fn entry_loader_overrides_default() {
        let s = ModSpec {
            name: "JEI".into(),
            provider: Some(ProviderKind::CurseForge),
            id: Some("238222".into()),
            loader: Some(LoaderType::Forge),
            ..Default::default()
        };
        let entry = s.into_entry(1, Some(LoaderType::Fabric)).unwrap();
        assert_eq!(entry.loader, Some(LoaderType::Forge));
    }

    #[test]
    fn empty_list_is_fatal() {
        assert!(matches!(build_entries(vec![], None), Err(EngineError::NoEntries)));
    }

    #[test]
    fn load_mod_list_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mods.toml");
        std::fs::write(
            &path,
            r#"
[[mods]]
name = "Sodium"
url = "https://modrinth.com/mod/sodium"

[[mods]]
name = "Carpet"
provider = "github"
id = "gnembon/fabric-carpet"
"#,
        )
        .unwrap();

        let specs = load_mod_list(&path).unwrap();
        let entries = build_entries(specs, None).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "Sodium");
        assert_eq!(entries[1].provider, ProviderKind::GitHub);
    }
}
