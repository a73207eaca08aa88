// ─── Game versions ───
// Numeric view of Minecraft version strings and the distance metric used when
// no file declares the target version exactly.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static DOTTED_VERSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[^\d.])(\d+\.\d+(?:\.\d+)*)").expect("valid regex")
});

/// `(major, minor, patch)`; a missing patch reads as 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GameVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl GameVersion {
    /// Parse `"1.20"`, `"1.20.1"`, `"1.20.1-pre2"`, `"1.21+build.3"`.
    ///
    /// Only the leading dotted-numeric part counts; anything after it is
    /// ignored. Strings without two or three numeric components
    /// (`"24w14a"`, `"Java 17"`, `"1.2.3.4"`) are unparsable.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        let end = raw
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(raw.len());
        let numeric = raw[..end].trim_end_matches('.');

        let parts: Vec<&str> = numeric.split('.').collect();
        if !(2..=3).contains(&parts.len()) {
            return None;
        }

        let mut nums = parts.iter().map(|p| p.parse::<u32>().ok());
        let major = nums.next()??;
        let minor = nums.next()??;
        let patch = match nums.next() {
            Some(p) => p?,
            None => 0,
        };

        Some(Self {
            major,
            minor,
            patch,
        })
    }

    pub fn distance(&self, other: &GameVersion) -> VersionDistance {
        VersionDistance {
            major: self.major.abs_diff(other.major),
            minor: self.minor.abs_diff(other.minor),
            patch: self.patch.abs_diff(other.patch),
        }
    }
}

impl fmt::Display for GameVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Component-wise absolute difference, ordered lexicographically
/// (major gap first, then minor, then patch).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VersionDistance {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl VersionDistance {
    pub const ZERO: VersionDistance = VersionDistance {
        major: 0,
        minor: 0,
        patch: 0,
    };
}

impl fmt::Display for VersionDistance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Δ{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Distance between `target` and `declared`; `None` stands for infinity.
pub fn version_distance(target: &GameVersion, declared: &str) -> Option<VersionDistance> {
    GameVersion::parse(declared).map(|v| target.distance(&v))
}

/// Whether a provider tag names a game version (as opposed to a loader,
/// environment or Java tag).
pub fn is_version_tag(tag: &str) -> bool {
    tag.trim().starts_with(|c: char| c.is_ascii_digit()) && GameVersion::parse(tag).is_some()
}

/// Pull game-version looking tokens out of free text such as a release tag
/// (`"v1.4.170+1.20.1"`, `"MC 1.20.x fix"`).
///
/// Accepted: `1.x[.y]` and year-based `YY.x[.y]` (`YY >= 25`). Tokens with
/// more than three components are rejected so build numbers like
/// `0.5.3.1` do not leak in.
pub fn extract_versions(text: &str) -> Vec<String> {
    let mut found: Vec<String> = Vec::new();
    for caps in DOTTED_VERSION.captures_iter(text) {
        let token = &caps[1];
        if token.split('.').count() > 3 {
            continue;
        }
        let Some(v) = GameVersion::parse(token) else {
            continue;
        };
        if (v.major == 1 || v.major >= 25) && !found.iter().any(|f| f == token) {
            found.push(token.to_string());
        }
    }
    found
}
