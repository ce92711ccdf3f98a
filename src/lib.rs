//! ClipFetch Library
//!
//! Clips a time range out of an online video by driving an external
//! retrieval tool and an external trim tool as supervised subprocesses.
//!
//! The crate follows a ports-and-adapters layout: `domain` holds the types
//! and pure rules, `ports` the traits at the process and naming seams,
//! `adapters` their implementations, `engine` the tool command lines,
//! progress extractors and error classifier, and `app` the job orchestrator.

pub mod adapters;
pub mod app;
pub mod cli;
pub mod domain;
pub mod engine;
pub mod error;
pub mod ports;
pub mod utils;

// Re-export commonly used types
pub use app::{ClipOrchestrator, JobOutcome, OrchestratorSettings};
pub use domain::errors::DomainError;
pub use domain::model::{ClipRequest, JobResult, JobSnapshot, JobStage};
pub use error::{ClipError, ClipResult};
