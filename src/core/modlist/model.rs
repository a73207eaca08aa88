use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Hosting service a mod is fetched from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    CurseForge,
    GitHub,
    Modrinth,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 3] = [
        ProviderKind::CurseForge,
        ProviderKind::GitHub,
        ProviderKind::Modrinth,
    ];
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderKind::CurseForge => write!(f, "CurseForge"),
            ProviderKind::GitHub => write!(f, "GitHub"),
            ProviderKind::Modrinth => write!(f, "Modrinth"),
        }
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "curseforge" | "cf" => Ok(ProviderKind::CurseForge),
            "github" | "gh" => Ok(ProviderKind::GitHub),
            "modrinth" | "mr" => Ok(ProviderKind::Modrinth),
            other => Err(format!("unknown provider '{other}'")),
        }
    }
}

/// Supported mod loaders — strongly typed, no magic strings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum LoaderType {
    Forge,
    Fabric,
    NeoForge,
    Quilt,
    LiteLoader,
}

impl LoaderType {
    /// Recognise a loader name as the providers spell it
    /// (`"Fabric"`, `"neoforge"`, `"NeoForge"`, `"liteloader"`, ...).
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "forge" => Some(LoaderType::Forge),
            "fabric" => Some(LoaderType::Fabric),
            "neoforge" | "neoforged" => Some(LoaderType::NeoForge),
            "quilt" => Some(LoaderType::Quilt),
            "liteloader" | "lite_loader" => Some(LoaderType::LiteLoader),
            _ => None,
        }
    }

    /// CurseForge `modLoaderType` numeric id.
    pub fn curseforge_id(self) -> u32 {
        match self {
            LoaderType::Forge => 1,
            LoaderType::LiteLoader => 3,
            LoaderType::Fabric => 4,
            LoaderType::Quilt => 5,
            LoaderType::NeoForge => 6,
        }
    }
}

impl fmt::Display for LoaderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoaderType::Forge => write!(f, "forge"),
            LoaderType::Fabric => write!(f, "fabric"),
            LoaderType::NeoForge => write!(f, "neoforge"),
            LoaderType::Quilt => write!(f, "quilt"),
            LoaderType::LiteLoader => write!(f, "liteloader"),
        }
    }
}

impl FromStr for LoaderType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LoaderType::from_tag(s).ok_or_else(|| format!("unknown loader '{s}'"))
    }
}

/// One mod to keep up to date, as handed to the engine.
///
/// `id` is whatever the provider needs to list files:
/// - CurseForge: numeric project id (`"238222"`)
/// - GitHub: `owner/repo`
/// - Modrinth: project slug or id
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModEntry {
    pub name: String,
    pub provider: ProviderKind,
    pub id: String,
    pub loader: Option<LoaderType>,
    /// The page the user pointed at, when the entry came with one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
}

impl ModEntry {
    pub fn new(
        name: impl Into<String>,
        provider: ProviderKind,
        id: impl Into<String>,
        loader: Option<LoaderType>,
    ) -> Self {
        Self {
            name: name.into(),
            provider,
            id: id.into(),
            loader,
            source_url: None,
        }
    }

    pub fn with_source_url(mut self, url: impl Into<String>) -> Self {
        self.source_url = Some(url.into());
        self
    }
}
