use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::version::VersionDistance;
use crate::core::error::ProviderError;
use crate::core::modlist::{LoaderType, ModEntry};

/// Stability channel a provider assigns to a file. Ordered from most to least stable.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReleaseChannel {
    #[default]
    Release,
    Beta,
    Alpha,
}

impl fmt::Display for ReleaseChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReleaseChannel::Release => write!(f, "release"),
            ReleaseChannel::Beta => write!(f, "beta"),
            ReleaseChannel::Alpha => write!(f, "alpha"),
        }
    }
}

/// Integrity information published alongside a file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(tag = "algorithm", content = "hex", rename_all = "lowercase")]
pub enum Checksum {
    Sha1(String),
    Sha512(String),
    Md5(String),
}

impl Checksum {
    pub fn algorithm(&self) -> &'static str {
        match self {
            Checksum::Sha1(_) => "SHA-1",
            Checksum::Sha512(_) => "SHA-512",
            Checksum::Md5(_) => "MD5",
        }
    }

    pub fn expected_hex(&self) -> &str {
        match self {
            Checksum::Sha1(h) | Checksum::Sha512(h) | Checksum::Md5(h) => h,
        }
    }
}

/// One downloadable file as reported by a provider, normalized.
///
/// `game_versions` keeps provider order with duplicates removed; `loaders`
/// is empty when the provider gives no loader information.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileCandidate {
    pub file_id: String,
    pub file_name: String,
    pub game_versions: Vec<String>,
    pub loaders: Vec<LoaderType>,
    pub published_at: DateTime<Utc>,
    pub download_url: String,
    pub size: u64,
    pub checksum: Option<Checksum>,
    pub channel: ReleaseChannel,
}

impl FileCandidate {
    /// No loader information means the file is not ruled out.
    pub fn supports_loader(&self, loader: LoaderType) -> bool {
        self.loaders.is_empty() || self.loaders.contains(&loader)
    }

    pub fn declares_version(&self, version: &str) -> bool {
        self.game_versions.iter().any(|v| v == version)
    }
}

/// Push `value` unless already present, keeping first-seen order.
pub(crate) fn push_unique<T: PartialEq>(list: &mut Vec<T>, value: T) {
    if !list.contains(&value) {
        list.push(value);
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum MatchQuality {
    Exact,
    Nearest,
    None,
}

impl fmt::Display for MatchQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchQuality::Exact => write!(f, "exact"),
            MatchQuality::Nearest => write!(f, "nearest"),
            MatchQuality::None => write!(f, "none"),
        }
    }
}

/// Outcome of matching one `ModEntry` against its candidates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchResult {
    pub entry: ModEntry,
    pub selected: Option<FileCandidate>,
    pub quality: MatchQuality,
    /// Set only for `Nearest`.
    pub distance: Option<VersionDistance>,
    /// The declared version that decided the match.
    pub matched_version: Option<String>,
    /// Why the provider could not be asked, when that is the reason for `None`.
    pub error: Option<ProviderError>,
}

impl MatchResult {
    pub fn exact(entry: ModEntry, file: FileCandidate, version: String) -> Self {
        Self {
            entry,
            selected: Some(file),
            quality: MatchQuality::Exact,
            distance: None,
            matched_version: Some(version),
            error: None,
        }
    }

    pub fn nearest(
        entry: ModEntry,
        file: FileCandidate,
        version: String,
        distance: VersionDistance,
    ) -> Self {
        Self {
            entry,
            selected: Some(file),
            quality: MatchQuality::Nearest,
            distance: Some(distance),
            matched_version: Some(version),
            error: None,
        }
    }

    pub fn no_match(entry: ModEntry) -> Self {
        Self {
            entry,
            selected: None,
            quality: MatchQuality::None,
            distance: None,
            matched_version: None,
            error: None,
        }
    }

    pub fn lookup_failed(entry: ModEntry, error: ProviderError) -> Self {
        Self {
            error: Some(error),
            ..Self::no_match(entry)
        }
    }

    pub fn is_downloadable(&self) -> bool {
        self.quality != MatchQuality::None && self.selected.is_some()
    }
}
