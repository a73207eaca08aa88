use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures_util::future::join_all;
use reqwest::Client;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::summary::RunSummary;
use crate::core::config::EngineConfig;
use crate::core::downloader::{DownloadJob, Downloader, ProgressSink};
use crate::core::error::EngineResult;
use crate::core::matching::{FileCandidate, MatchResult, VersionMatcher};
use crate::core::modlist::{ModEntry, ProviderKind};
use crate::core::providers::{Provider, ProviderContext};
use crate::core::report::{Confirm, Decision, MatchReport};
use crate::core::retry::RetryPolicy;

/// A provider client and the permits bounding its parallel listings.
struct ProviderLane {
    provider: Provider,
    permits: Semaphore,
}

/// Resolve → confirm → download, with per-stage concurrency limits.
pub struct Orchestrator {
    lanes: Vec<ProviderLane>,
    matcher: VersionMatcher,
    downloader: Downloader,
    output_dir: PathBuf,
}

impl Orchestrator {
    pub fn new(config: &EngineConfig, http: Client) -> Self {
        Self::with_retry(config, http, config.retry_policy())
    }

    /// Same as `new` with an explicit retry policy for listings and transfers.
    pub fn with_retry(config: &EngineConfig, http: Client, retry: RetryPolicy) -> Self {
        let lanes = ProviderKind::ALL
            .iter()
            .map(|&kind| {
                let settings = config.provider(kind).clone();
                let permits = Semaphore::new(settings.concurrency.max(1));
                let ctx = ProviderContext {
                    http: http.clone(),
                    settings,
                    retry: retry.clone(),
                    max_pages: config.max_pages,
                };
                ProviderLane {
                    provider: Provider::new(kind, ctx),
                    permits,
                }
            })
            .collect();

        let downloader = Downloader::new(http, retry)
            .with_concurrency(config.download.concurrency)
            .with_overwrite(config.overwrite);

        Self {
            lanes,
            matcher: VersionMatcher::new(config.game_version.clone())
                .with_min_channel(config.min_channel),
            downloader,
            output_dir: config.output_dir.clone(),
        }
    }

    pub fn with_progress(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.downloader = self.downloader.with_progress(sink);
        self
    }

    fn lane(&self, kind: ProviderKind) -> Option<&ProviderLane> {
        self.lanes.iter().find(|lane| lane.provider.kind() == kind)
    }

    // ── Resolution ──────────────────────────────────────

    async fn resolve_one(&self, entry: &ModEntry) -> MatchResult {
        let Some(lane) = self.lane(entry.provider) else {
            return MatchResult::no_match(entry.clone());
        };

        let listing = {
            // The semaphore is never closed, so acquiring cannot fail.
            let _permit = lane.permits.acquire().await.ok();
            lane.provider.list_candidates(entry).await
        };

        match listing {
            Ok(candidates) => {
                let result = self.matcher.select(entry, &candidates);
                debug!(
                    "{} ({}): {} candidates, match {}",
                    entry.name,
                    entry.provider,
                    candidates.len(),
                    result.quality
                );
                result
            }
            Err(err) => {
                warn!("{} ({}): lookup failed: {}", entry.name, entry.provider, err);
                MatchResult::lookup_failed(entry.clone(), err)
            }
        }
    }

    /// One `MatchResult` per entry, in entry order. Provider failures are
    /// captured per entry and never abort the batch.
    pub async fn resolve(&self, entries: &[ModEntry]) -> Vec<MatchResult> {
        info!(
            "Resolving {} mods against {}",
            entries.len(),
            self.matcher.target()
        );
        join_all(entries.iter().map(|entry| self.resolve_one(entry))).await
    }

    // ── Download planning ───────────────────────────────

    /// Jobs for every downloadable result, plus for each result the index of
    /// its job. Two files with the same name get distinct destinations.
    fn plan(&self, matches: &[MatchResult]) -> (Vec<DownloadJob>, Vec<Option<usize>>) {
        let mut jobs = Vec::new();
        let mut job_of = Vec::with_capacity(matches.len());
        let mut taken = HashSet::new();

        for result in matches {
            let file = match (&result.selected, result.is_downloadable()) {
                (Some(file), true) => file,
                _ => {
                    job_of.push(None);
                    continue;
                }
            };
            let dest = destination(&self.output_dir, &result.entry, file, &mut taken);
            job_of.push(Some(jobs.len()));
            jobs.push(DownloadJob::new(result.entry.clone(), file.clone(), dest));
        }
        (jobs, job_of)
    }

    // ── Full run ────────────────────────────────────────

    pub async fn run(
        &self,
        entries: &[ModEntry],
        confirm: &mut dyn Confirm,
        cancel: &CancellationToken,
    ) -> EngineResult<RunSummary> {
        let target = self.matcher.target().to_string();
        let matches = self.resolve(entries).await;

        let report = MatchReport::new(&target, &matches);
        let decision = if cancel.is_cancelled() {
            Decision::Proceed
        } else if report.counts().downloadable() == 0 {
            confirm.show(&report)?;
            Decision::Proceed
        } else {
            confirm.confirm(&report)?
        };

        if decision == Decision::Abort {
            info!("Download declined, nothing fetched");
            let job_of = vec![None; matches.len()];
            return Ok(RunSummary::assemble(
                target,
                decision,
                matches,
                Vec::new(),
                &job_of,
            ));
        }

        let (jobs, job_of) = self.plan(&matches);
        let downloads = self.downloader.download_batch(&jobs, cancel).await;
        info!("Finished {} downloads into {:?}", downloads.len(), self.output_dir);

        Ok(RunSummary::assemble(
            target, decision, matches, downloads, &job_of,
        ))
    }
}

/// Keep a file name safe to create on any platform.
fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    cleaned.trim().trim_start_matches('.').to_string()
}

fn destination(
    output_dir: &Path,
    entry: &ModEntry,
    file: &FileCandidate,
    taken: &mut HashSet<String>,
) -> PathBuf {
    let mod_name = sanitize_file_name(&entry.name);
    let mut name = sanitize_file_name(&file.file_name);
    if name.is_empty() {
        name = format!("{mod_name}.jar");
    }
    if taken.insert(name.clone()) {
        return output_dir.join(name);
    }
    let prefixed = format!("{mod_name}-{name}");
    if taken.insert(prefixed.clone()) {
        return output_dir.join(prefixed);
    }
    let mut n = 2;
    loop {
        let numbered = format!("{mod_name}-{n}-{name}");
        if taken.insert(numbered.clone()) {
            return output_dir.join(numbered);
        }
        n += 1;
    }
}
