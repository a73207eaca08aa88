pub mod engine;
pub mod summary;

pub use engine::Orchestrator;
pub use summary::{EntryOutcome, EntryReport, OutcomeCounts, RunSummary};
