//! Submission orchestration: extraction, persistence, and the sync/async summary split.
//!
//! Documents whose extracted text is at most `AUTO_SUMMARY_MAX_CHAR` characters are summarized
//! inline and come back with a terminal summary. Longer documents get a `pending` summary and
//! a queued job that a [`crate::jobs::SummaryWorkerPool`] picks up later.

mod service;
mod types;

pub use service::{PipelineApi, SummaryPipeline};
pub(crate) use types::rfc3339;
pub use types::{PipelineError, StatusView, Submission, status_message};
