pub mod client;

pub use client::{
    DownloadJob, DownloadResult, DownloadStatus, Downloader, ProgressSink, SKIP_ALREADY_PRESENT,
    SKIP_CANCELLED,
};
