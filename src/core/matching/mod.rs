pub mod matcher;
pub mod model;
pub mod version;

pub use matcher::VersionMatcher;
pub use model::{Checksum, FileCandidate, MatchQuality, MatchResult, ReleaseChannel};
pub use version::{GameVersion, VersionDistance};
