use std::fmt::Write as _;

use crate::core::matching::{MatchQuality, MatchResult};

const COL_MOD: usize = 28;
const COL_PROVIDER: usize = 10;
const COL_MATCH: usize = 8;
const COL_VERSION: usize = 18;
const COL_SIZE: usize = 10;

/// Shorten `text` to `width` characters, marking the cut with `...`.
pub fn truncate_with_ellipsis(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    if width <= 3 {
        return text.chars().take(width).collect();
    }
    let mut out: String = text.chars().take(width - 3).collect();
    out.push_str("...");
    out
}

/// `1536` → `"1.5 KiB"`.
pub fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", value, UNITS[unit])
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReportCounts {
    pub exact: usize,
    pub nearest: usize,
    pub none: usize,
}

impl ReportCounts {
    pub fn downloadable(&self) -> usize {
        self.exact + self.nearest
    }
}

/// The match table shown before anything is downloaded.
pub struct MatchReport<'a> {
    target: &'a str,
    results: &'a [MatchResult],
}

impl<'a> MatchReport<'a> {
    pub fn new(target: &'a str, results: &'a [MatchResult]) -> Self {
        Self { target, results }
    }

    pub fn results(&self) -> &'a [MatchResult] {
        self.results
    }

    pub fn counts(&self) -> ReportCounts {
        let mut counts = ReportCounts::default();
        for result in self.results {
            match result.quality {
                MatchQuality::Exact if result.is_downloadable() => counts.exact += 1,
                MatchQuality::Nearest if result.is_downloadable() => counts.nearest += 1,
                _ => counts.none += 1,
            }
        }
        counts
    }

    fn row(result: &MatchResult) -> String {
        let name = truncate_with_ellipsis(&result.entry.name, COL_MOD);
        let provider = result.entry.provider.to_string();

        let (Some(file), true) = (&result.selected, result.is_downloadable()) else {
            let reason = result
                .error
                .as_ref()
                .map(|e| e.to_string())
                .unwrap_or_else(|| "no compatible file".to_string());
            return format!(
                "{:<COL_MOD$} {:<COL_PROVIDER$} {:<COL_MATCH$} will be skipped: {}",
                name,
                provider,
                MatchQuality::None.to_string(),
                reason
            );
        };

        let version = result.matched_version.as_deref().unwrap_or("?");
        let version = match result.distance {
            Some(distance) => format!("{version} ({distance})"),
            None => version.to_string(),
        };

        format!(
            "{:<COL_MOD$} {:<COL_PROVIDER$} {:<COL_MATCH$} {:<COL_VERSION$} {:>COL_SIZE$} {}",
            name,
            provider,
            result.quality.to_string(),
            truncate_with_ellipsis(&version, COL_VERSION),
            human_size(file.size),
            file.file_name
        )
    }

    pub fn render(&self) -> String {
        let width = COL_MOD + COL_PROVIDER + COL_MATCH + COL_VERSION + COL_SIZE + 5 + 24;
        let separator = "-".repeat(width);

        let mut out = String::new();
        let _ = writeln!(out, "{separator}");
        let _ = writeln!(
            out,
            "{:<COL_MOD$} {:<COL_PROVIDER$} {:<COL_MATCH$} {:<COL_VERSION$} {:>COL_SIZE$} {}",
            "mod", "provider", "match", "version", "size", "file"
        );
        let _ = writeln!(out, "{separator}");
        for result in self.results {
            let _ = writeln!(out, "{}", Self::row(result));
        }
        let _ = writeln!(out, "{separator}");

        let counts = self.counts();
        let _ = writeln!(
            out,
            "Total mods: {}, target game version: {}.",
            self.results.len(),
            self.target
        );
        let _ = writeln!(out, "{} mod(s) match the game version exactly.", counts.exact);
        let _ = writeln!(
            out,
            "{} mod(s) have no exact match but a nearby version was found.",
            counts.nearest
        );
        let _ = writeln!(out, "{} mod(s) will be skipped.", counts.none);
        out
    }
}
