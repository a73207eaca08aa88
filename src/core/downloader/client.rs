use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures_util::stream::{self, StreamExt};
use md5::Md5;
use reqwest::{Client, StatusCode};
use sha1::Sha1;
use sha2::{Digest, Sha512};
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::core::error::DownloadError;
use crate::core::matching::{Checksum, FileCandidate};
use crate::core::modlist::ModEntry;
use crate::core::retry::RetryPolicy;

pub const SKIP_ALREADY_PRESENT: &str = "already present";
pub const SKIP_CANCELLED: &str = "cancelled";

/// A confirmed selection and where it goes on disk.
#[derive(Debug, Clone)]
pub struct DownloadJob {
    pub entry: ModEntry,
    pub file: FileCandidate,
    pub dest: PathBuf,
}

impl DownloadJob {
    pub fn new(entry: ModEntry, file: FileCandidate, dest: PathBuf) -> Self {
        Self { entry, file, dest }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadStatus {
    Success,
    Failed,
    Skipped,
}

impl fmt::Display for DownloadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DownloadStatus::Success => write!(f, "success"),
            DownloadStatus::Failed => write!(f, "failed"),
            DownloadStatus::Skipped => write!(f, "skipped"),
        }
    }
}

/// Outcome of one `DownloadJob`.
#[derive(Debug)]
pub struct DownloadResult {
    pub mod_name: String,
    pub file_name: String,
    pub dest: PathBuf,
    pub status: DownloadStatus,
    pub bytes_written: u64,
    pub error: Option<DownloadError>,
    pub skip_reason: Option<String>,
}

impl DownloadResult {
    fn base(job: &DownloadJob, status: DownloadStatus) -> Self {
        Self {
            mod_name: job.entry.name.clone(),
            file_name: job.file.file_name.clone(),
            dest: job.dest.clone(),
            status,
            bytes_written: 0,
            error: None,
            skip_reason: None,
        }
    }

    pub fn success(job: &DownloadJob, bytes_written: u64) -> Self {
        Self {
            bytes_written,
            ..Self::base(job, DownloadStatus::Success)
        }
    }

    pub fn failed(job: &DownloadJob, error: DownloadError) -> Self {
        Self {
            error: Some(error),
            ..Self::base(job, DownloadStatus::Failed)
        }
    }

    pub fn skipped(job: &DownloadJob, reason: &str) -> Self {
        Self {
            skip_reason: Some(reason.to_string()),
            ..Self::base(job, DownloadStatus::Skipped)
        }
    }
}

/// Receives transfer progress. `job` is the job's position in the batch.
pub trait ProgressSink: Send + Sync {
    fn started(&self, job: usize, file_name: &str, total_bytes: Option<u64>);
    fn advanced(&self, job: usize, bytes: u64);
    fn finished(&self, job: usize, result: &DownloadResult);
}

/// Incremental digest matching the algorithm of the expected checksum.
enum StreamHasher {
    Sha1(Sha1),
    Sha512(Sha512),
    Md5(Md5),
}

impl StreamHasher {
    fn for_checksum(checksum: &Checksum) -> Self {
        match checksum {
            Checksum::Sha1(_) => StreamHasher::Sha1(Sha1::new()),
            Checksum::Sha512(_) => StreamHasher::Sha512(Sha512::new()),
            Checksum::Md5(_) => StreamHasher::Md5(Md5::new()),
        }
    }

    fn update(&mut self, chunk: &[u8]) {
        match self {
            StreamHasher::Sha1(h) => h.update(chunk),
            StreamHasher::Sha512(h) => h.update(chunk),
            StreamHasher::Md5(h) => h.update(chunk),
        }
    }

    fn finalize_hex(self) -> String {
        match self {
            StreamHasher::Sha1(h) => hex::encode(h.finalize()),
            StreamHasher::Sha512(h) => hex::encode(h.finalize()),
            StreamHasher::Md5(h) => hex::encode(h.finalize()),
        }
    }
}

/// `<dest>.<uuid>.part`, in the destination directory so the final rename
/// never crosses filesystems.
fn temp_path_for(dest: &Path) -> PathBuf {
    let name = dest
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    dest.with_file_name(format!("{}.{}.part", name, Uuid::new_v4().simple()))
}

/// Concurrent, checksum-validated downloader.
pub struct Downloader {
    client: Client,
    /// Maximum number of parallel transfers.
    concurrency: usize,
    retry: RetryPolicy,
    overwrite: bool,
    progress: Option<Arc<dyn ProgressSink>>,
}

impl Downloader {
    pub fn new(client: Client, retry: RetryPolicy) -> Self {
        Self {
            client,
            concurrency: 5,
            retry,
            overwrite: false,
            progress: None,
        }
    }

    pub fn with_concurrency(mut self, n: usize) -> Self {
        self.concurrency = n.max(1);
        self
    }

    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    pub fn with_progress(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.progress = Some(sink);
        self
    }

    // ── Single file download ────────────────────────────

    /// Fetch one job. Never returns an error: every outcome is a `DownloadResult`.
    pub async fn download(
        &self,
        index: usize,
        job: &DownloadJob,
        cancel: &CancellationToken,
    ) -> DownloadResult {
        let result = self.run_job(index, job, cancel).await;
        if let Some(sink) = &self.progress {
            sink.finished(index, &result);
        }
        result
    }

    async fn run_job(
        &self,
        index: usize,
        job: &DownloadJob,
        cancel: &CancellationToken,
    ) -> DownloadResult {
        if cancel.is_cancelled() {
            return DownloadResult::skipped(job, SKIP_CANCELLED);
        }
        if !self.overwrite && tokio::fs::try_exists(&job.dest).await.unwrap_or(false) {
            debug!("{:?} exists, not overwriting", job.dest);
            return DownloadResult::skipped(job, SKIP_ALREADY_PRESENT);
        }

        if let Some(parent) = job.dest.parent() {
            if let Err(e) = tokio::fs::create_dir_all(parent).await {
                return DownloadResult::failed(job, DownloadError::io(parent, e));
            }
        }

        let temp = temp_path_for(&job.dest);
        let label = format!("download of {}", job.file.file_name);
        let temp_ref = &temp;
        let transfer = self
            .retry
            .run(&label, move |_| self.fetch_to_temp(index, job, temp_ref));

        let outcome = tokio::select! {
            _ = cancel.cancelled() => None,
            res = transfer => Some(res),
        };

        match outcome {
            Some(Ok(bytes)) => match tokio::fs::rename(&temp, &job.dest).await {
                Ok(()) => {
                    debug!("Downloaded: {} -> {:?}", job.file.download_url, job.dest);
                    DownloadResult::success(job, bytes)
                }
                Err(e) => {
                    remove_temp(&temp).await;
                    DownloadResult::failed(job, DownloadError::io(&job.dest, e))
                }
            },
            Some(Err(err)) => {
                remove_temp(&temp).await;
                warn!("{} failed: {}", label, err);
                DownloadResult::failed(job, err)
            }
            None => {
                remove_temp(&temp).await;
                info!("{} cancelled", label);
                DownloadResult::skipped(job, SKIP_CANCELLED)
            }
        }
    }

    /// One attempt: stream the body into `temp` while hashing, then verify.
    async fn fetch_to_temp(
        &self,
        index: usize,
        job: &DownloadJob,
        temp: &Path,
    ) -> Result<u64, DownloadError> {
        let url = job.file.download_url.as_str();
        let transient = |reason: String| DownloadError::Transient {
            url: url.to_string(),
            reason,
        };

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| transient(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(
                if status.is_server_error()
                    || status == StatusCode::REQUEST_TIMEOUT
                    || status == StatusCode::TOO_MANY_REQUESTS
                {
                    transient(format!("HTTP {status}"))
                } else {
                    DownloadError::HttpStatus {
                        url: url.to_string(),
                        status: status.as_u16(),
                    }
                },
            );
        }

        if let Some(sink) = &self.progress {
            sink.started(index, &job.file.file_name, response.content_length());
        }

        let mut hasher = job.file.checksum.as_ref().map(StreamHasher::for_checksum);
        let mut written = 0u64;

        // Scoped so the handle is closed before the rename.
        {
            let mut file = tokio::fs::File::create(temp)
                .await
                .map_err(|e| DownloadError::io(temp, e))?;
            let mut body = response.bytes_stream();
            while let Some(chunk) = body.next().await {
                let chunk = chunk.map_err(|e| transient(e.to_string()))?;
                file.write_all(&chunk)
                    .await
                    .map_err(|e| DownloadError::io(temp, e))?;
                if let Some(h) = hasher.as_mut() {
                    h.update(&chunk);
                }
                written += chunk.len() as u64;
                if let Some(sink) = &self.progress {
                    sink.advanced(index, chunk.len() as u64);
                }
            }
            file.flush().await.map_err(|e| DownloadError::io(temp, e))?;
        }

        if let (Some(expected), Some(hasher)) = (&job.file.checksum, hasher) {
            let actual = hasher.finalize_hex();
            if !actual.eq_ignore_ascii_case(expected.expected_hex()) {
                return Err(DownloadError::ChecksumMismatch {
                    path: job.dest.clone(),
                    algorithm: expected.algorithm(),
                    expected: expected.expected_hex().to_string(),
                    actual,
                });
            }
        }

        Ok(written)
    }

    // ── Batch concurrent downloads ──────────────────────

    /// Download every job with at most `concurrency` transfers in flight.
    ///
    /// Results come back in job order regardless of completion order.
    pub async fn download_batch(
        &self,
        jobs: &[DownloadJob],
        cancel: &CancellationToken,
    ) -> Vec<DownloadResult> {
        info!(
            "Starting batch download: {} files, concurrency={}",
            jobs.len(),
            self.concurrency
        );

        let mut results: Vec<(usize, DownloadResult)> = stream::iter(jobs.iter().enumerate())
            .map(|(index, job)| async move { (index, self.download(index, job, cancel).await) })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        results.sort_by_key(|(index, _)| *index);
        results.into_iter().map(|(_, result)| result).collect()
    }
}

async fn remove_temp(temp: &Path) {
    if let Err(e) = tokio::fs::remove_file(temp).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!("Could not remove temporary file {:?}: {}", temp, e);
        }
    }
}
