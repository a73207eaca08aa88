pub mod confirm;
pub mod summary;
pub mod table;

pub use confirm::{Confirm, Decision, PromptConfirmer, Unattended};
pub use summary::render_summary;
pub use table::{human_size, MatchReport, ReportCounts};
