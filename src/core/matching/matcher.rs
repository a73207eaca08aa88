use super::model::{FileCandidate, MatchResult, ReleaseChannel};
use super::version::{version_distance, GameVersion, VersionDistance};
use crate::core::modlist::ModEntry;

/// Picks the single best file for a mod. Pure: no I/O, no clock.
///
/// Precedence:
/// 1. drop files failing the entry's loader filter or below the minimum channel
/// 2. any file declaring the target verbatim → newest of those (`Exact`)
/// 3. otherwise the smallest numeric version distance, newest on ties (`Nearest`)
/// 4. nothing left or nothing parsable → `None`
///
/// Equal timestamps keep the candidate seen first.
#[derive(Debug, Clone)]
pub struct VersionMatcher {
    target: String,
    parsed_target: Option<GameVersion>,
    min_channel: ReleaseChannel,
}

impl VersionMatcher {
    pub fn new(target: impl Into<String>) -> Self {
        let target = target.into();
        let parsed_target = GameVersion::parse(&target);
        Self {
            target,
            parsed_target,
            min_channel: ReleaseChannel::Alpha,
        }
    }

    /// Least stable channel still accepted.
    pub fn with_min_channel(mut self, channel: ReleaseChannel) -> Self {
        self.min_channel = channel;
        self
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    fn admits(&self, entry: &ModEntry, candidate: &FileCandidate) -> bool {
        let loader_ok = entry
            .loader
            .map_or(true, |loader| candidate.supports_loader(loader));
        loader_ok && candidate.channel <= self.min_channel
    }

    /// Best `(distance, declared version)` for one candidate, or `None` if no
    /// declared version parses.
    fn closest_version<'a>(
        &self,
        target: &GameVersion,
        candidate: &'a FileCandidate,
    ) -> Option<(VersionDistance, &'a str)> {
        let mut best: Option<(VersionDistance, &str)> = None;
        for declared in &candidate.game_versions {
            if let Some(d) = version_distance(target, declared) {
                if best.map_or(true, |(b, _)| d < b) {
                    best = Some((d, declared.as_str()));
                }
            }
        }
        best
    }

    pub fn select(&self, entry: &ModEntry, candidates: &[FileCandidate]) -> MatchResult {
        let survivors: Vec<&FileCandidate> = candidates
            .iter()
            .filter(|c| self.admits(entry, c))
            .collect();

        let mut exact: Option<&FileCandidate> = None;
        for candidate in survivors.iter().copied() {
            if !candidate.declares_version(&self.target) {
                continue;
            }
            if exact.map_or(true, |best| candidate.published_at > best.published_at) {
                exact = Some(candidate);
            }
        }
        if let Some(file) = exact {
            return MatchResult::exact(entry.clone(), file.clone(), self.target.clone());
        }

        let Some(target) = self.parsed_target else {
            return MatchResult::no_match(entry.clone());
        };

        let mut nearest: Option<(VersionDistance, &str, &FileCandidate)> = None;
        for candidate in survivors.iter().copied() {
            let Some((distance, version)) = self.closest_version(&target, candidate) else {
                continue;
            };
            let better = match nearest {
                None => true,
                Some((best_distance, _, best)) => {
                    distance < best_distance
                        || (distance == best_distance && candidate.published_at > best.published_at)
                }
            };
            if better {
                nearest = Some((distance, version, candidate));
            }
        }

        match nearest {
            Some((distance, version, file)) => {
                MatchResult::nearest(entry.clone(), file.clone(), version.to_string(), distance)
            }
            None => MatchResult::no_match(entry.clone()),
        }
    }
}
