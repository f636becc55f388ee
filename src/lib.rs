#![deny(missing_docs)]

//! Core library for docsum: document text extraction and summarization with sync/async
//! job orchestration.

/// HTTP routing and REST handlers.
pub mod api;
/// Environment-driven configuration management.
pub mod config;
/// Text extraction from PDF, DOCX, and plain-text uploads.
pub mod extraction;
/// Background summary jobs and the worker pool.
pub mod jobs;
/// Structured logging and tracing setup.
pub mod logging;
/// Pipeline metrics helpers.
pub mod metrics;
/// Submission orchestration and status/retry operations.
pub mod pipeline;
/// Document and summary persistence.
pub mod storage;
/// Summarization engine, models, and fallback.
pub mod summarization;
