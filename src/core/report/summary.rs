use std::fmt::Write as _;

use super::table::{human_size, truncate_with_ellipsis};
use crate::core::orchestrator::{EntryOutcome, RunSummary};

/// Per-entry outcome lines followed by the totals.
pub fn render_summary(summary: &RunSummary) -> String {
    let mut out = String::new();
    for report in &summary.entries {
        let name = truncate_with_ellipsis(&report.entry.name, 28);
        let line = match &report.outcome {
            EntryOutcome::Downloaded {
                file_name, bytes, ..
            } => format!("[ok]      {name:<28} {file_name} ({})", human_size(*bytes)),
            EntryOutcome::DownloadFailed { file_name, reason } => {
                format!("[failed]  {name:<28} {file_name}: {reason}")
            }
            EntryOutcome::SkippedNoMatch { reason } => {
                format!("[skipped] {name:<28} no match: {reason}")
            }
            EntryOutcome::SkippedByUser => format!("[skipped] {name:<28} declined"),
            EntryOutcome::Skipped { reason } => format!("[skipped] {name:<28} {reason}"),
        };
        let _ = writeln!(out, "{line}");
    }

    let counts = summary.counts();
    let _ = writeln!(
        out,
        "Downloaded {} file(s), {} failed, {} without a match, {} skipped{}.",
        counts.downloaded,
        counts.failed,
        counts.no_match,
        counts.skipped,
        if counts.by_user > 0 {
            format!(", {} declined", counts.by_user)
        } else {
            String::new()
        }
    );
    out
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::core::modlist::{ModEntry, ProviderKind};
    use crate::core::orchestrator::EntryReport;
    use crate::core::report::Decision;

    #[test]
    fn every_entry_gets_a_line_and_totals_add_up() {
        let entry = |name: &str| ModEntry::new(name, ProviderKind::Modrinth, name, None);
        let summary = RunSummary {
            target: "1.20.1".into(),
            decision: Decision::Proceed,
            matches: vec![],
            downloads: vec![],
            entries: vec![
                EntryReport {
                    entry: entry("sodium"),
                    outcome: EntryOutcome::Downloaded {
                        file_name: "sodium.jar".into(),
                        dest: PathBuf::from("mods/sodium.jar"),
                        bytes: 2048,
                    },
                },
                EntryReport {
                    entry: entry("lithium"),
                    outcome: EntryOutcome::DownloadFailed {
                        file_name: "lithium.jar".into(),
                        reason: "HTTP 404".into(),
                    },
                },
                EntryReport {
                    entry: entry("iris"),
                    outcome: EntryOutcome::SkippedNoMatch {
                        reason: "no compatible file".into(),
                    },
                },
                EntryReport {
                    entry: entry("modmenu"),
                    outcome: EntryOutcome::Skipped {
                        reason: "already present".into(),
                    },
                },
            ],
        };

        let text = render_summary(&summary);
        assert_eq!(text.lines().count(), 5);
        assert!(text.contains("sodium.jar (2.0 KiB)"));
        assert!(text.contains("lithium.jar: HTTP 404"));
        assert!(text.contains("no match: no compatible file"));
        assert!(text.contains("already present"));
        assert!(text.ends_with("Downloaded 1 file(s), 1 failed, 1 without a match, 1 skipped.\n"));
    }

    #[test]
    fn declined_entries_are_listed() {
        let entry = |name: &str| ModEntry::new(name, ProviderKind::Modrinth, name, None);
        let summary = RunSummary {
            target: "1.20.1".into(),
            decision: Decision::Abort,
            matches: vec![],
            downloads: vec![],
            entries: vec![
                EntryReport {
                    entry: entry("sodium"),
                    outcome: EntryOutcome::SkippedByUser,
                },
                EntryReport {
                    entry: entry("abandoned"),
                    outcome: EntryOutcome::SkippedNoMatch {
                        reason: "no compatible file".into(),
                    },
                },
            ],
        };

        let text = render_summary(&summary);
        assert!(text.contains("[skipped] sodium"));
        assert_eq!(text.matches("declined").count(), 2);
        assert!(text.ends_with("0 skipped, 1 declined.\n"));
    }
}
