use std::path::PathBuf;

use crate::core::downloader::{DownloadResult, DownloadStatus};
use crate::core::matching::MatchResult;
use crate::core::modlist::ModEntry;
use crate::core::report::Decision;

/// Final state of one entry. Every entry gets exactly one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryOutcome {
    Downloaded {
        file_name: String,
        dest: PathBuf,
        bytes: u64,
    },
    DownloadFailed {
        file_name: String,
        reason: String,
    },
    SkippedNoMatch {
        reason: String,
    },
    SkippedByUser,
    /// Already present, or cancelled.
    Skipped {
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryReport {
    pub entry: ModEntry,
    pub outcome: EntryOutcome,
}

#[derive(Debug)]
pub struct RunSummary {
    pub target: String,
    pub decision: Decision,
    /// One per entry, in input order.
    pub matches: Vec<MatchResult>,
    /// One per confirmed job, in job order.
    pub downloads: Vec<DownloadResult>,
    /// One per entry, in input order.
    pub entries: Vec<EntryReport>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutcomeCounts {
    pub downloaded: usize,
    pub failed: usize,
    pub no_match: usize,
    pub by_user: usize,
    pub skipped: usize,
}

impl RunSummary {
    /// Fold matches and download results into one outcome per entry.
    ///
    /// `job_of[i]` is the index into `downloads` of entry `i`'s job, if it had one.
    pub(crate) fn assemble(
        target: String,
        decision: Decision,
        matches: Vec<MatchResult>,
        downloads: Vec<DownloadResult>,
        job_of: &[Option<usize>],
    ) -> Self {
        let entries = matches
            .iter()
            .zip(job_of.iter().copied())
            .map(|(result, job)| {
                let outcome = match (&result.selected, job.and_then(|j| downloads.get(j))) {
                    (None, _) => EntryOutcome::SkippedNoMatch {
                        reason: result
                            .error
                            .as_ref()
                            .map(|e| e.to_string())
                            .unwrap_or_else(|| "no compatible file".to_string()),
                    },
                    (Some(_), _) if decision == Decision::Abort => EntryOutcome::SkippedByUser,
                    (Some(_), Some(download)) => outcome_of(download),
                    (Some(file), None) => EntryOutcome::Skipped {
                        reason: format!("{} was not scheduled", file.file_name),
                    },
                };
                EntryReport {
                    entry: result.entry.clone(),
                    outcome,
                }
            })
            .collect();

        Self {
            target,
            decision,
            matches,
            downloads,
            entries,
        }
    }

    pub fn counts(&self) -> OutcomeCounts {
        let mut counts = OutcomeCounts::default();
        for report in &self.entries {
            match report.outcome {
                EntryOutcome::Downloaded { .. } => counts.downloaded += 1,
                EntryOutcome::DownloadFailed { .. } => counts.failed += 1,
                EntryOutcome::SkippedNoMatch { .. } => counts.no_match += 1,
                EntryOutcome::SkippedByUser => counts.by_user += 1,
                EntryOutcome::Skipped { .. } => counts.skipped += 1,
            }
        }
        counts
    }

    pub fn aborted(&self) -> bool {
        self.decision == Decision::Abort
    }
}

fn outcome_of(download: &DownloadResult) -> EntryOutcome {
    match download.status {
        DownloadStatus::Success => EntryOutcome::Downloaded {
            file_name: download.file_name.clone(),
            dest: download.dest.clone(),
            bytes: download.bytes_written,
        },
        DownloadStatus::Failed => EntryOutcome::DownloadFailed {
            file_name: download.file_name.clone(),
            reason: download
                .error
                .as_ref()
                .map(|e| e.to_string())
                .unwrap_or_else(|| "unknown error".to_string()),
        },
        DownloadStatus::Skipped => EntryOutcome::Skipped {
            reason: download
                .skip_reason
                .clone()
                .unwrap_or_else(|| "skipped".to_string()),
        },
    }
}
