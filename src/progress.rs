//! Terminal progress bars for the download stage.

use std::collections::HashMap;
use std::sync::Mutex;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

use crate::core::downloader::{DownloadResult, DownloadStatus, ProgressSink};

/// One bar per in-flight transfer, stacked with `MultiProgress`.
pub struct TerminalProgress {
    multi: MultiProgress,
    bars: Mutex<HashMap<usize, ProgressBar>>,
}

impl TerminalProgress {
    pub fn new() -> Self {
        Self {
            multi: MultiProgress::new(),
            bars: Mutex::new(HashMap::new()),
        }
    }

    fn create_download_bar(total: u64) -> ProgressBar {
        let pb = ProgressBar::new(total);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} {msg:30} [{bar:30.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec})")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("█▓░"),
        );
        pb
    }

    fn create_spinner() -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg:30} {bytes} ({bytes_per_sec})")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb
    }
}

impl Default for TerminalProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressSink for TerminalProgress {
    fn started(&self, job: usize, file_name: &str, total_bytes: Option<u64>) {
        let pb = match total_bytes {
            Some(t) if t > 0 => Self::create_download_bar(t),
            _ => Self::create_spinner(),
        };
        let pb = self.multi.add(pb);
        pb.set_message(file_name.to_string());

        if let Ok(mut bars) = self.bars.lock() {
            // A retry restarts the transfer: replace the previous bar.
            if let Some(old) = bars.insert(job, pb) {
                old.finish_and_clear();
            }
        }
    }

    fn advanced(&self, job: usize, bytes: u64) {
        if let Ok(bars) = self.bars.lock() {
            if let Some(pb) = bars.get(&job) {
                pb.inc(bytes);
            }
        }
    }

    fn finished(&self, job: usize, result: &DownloadResult) {
        let Some(pb) = self.bars.lock().ok().and_then(|mut bars| bars.remove(&job)) else {
            return;
        };
        match result.status {
            DownloadStatus::Success => pb.finish_with_message(result.file_name.clone()),
            DownloadStatus::Failed => pb.abandon_with_message(format!("{} (failed)", result.file_name)),
            DownloadStatus::Skipped => pb.finish_and_clear(),
        }
    }
}
