//! # Vidflow
//!
//! A durable-execution style orchestration core for video transcript
//! processing pipelines.
//!
//! A request (one video, one video fanned out across languages, or a
//! batch of videos) becomes a DAG of stage invocations (extract,
//! translate, summarize, translate-summary) which the orchestrator
//! drives with:
//!
//! - **Concurrent dispatch**: every node whose dependencies have
//!   succeeded runs as its own task; independent branches never block
//!   each other
//! - **Per-stage policy**: attempt timeouts, classified retries with
//!   backoff and jitter, and an overall execution deadline
//! - **Partial-failure tolerance**: a failed node only makes its
//!   dependents unreachable; completed work is never lost and the
//!   outcome is data, not an exception
//! - **Live partial state**: completed outputs are published atomically
//!   and queryable mid-flight
//! - **Replay idempotency**: nodes recorded in the history store are
//!   restored, never re-executed
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use vidflow::prelude::*;
//! use std::sync::Arc;
//!
//! let orchestrator = Orchestrator::new(Arc::new(TemplateStageProvider::new()));
//! let request: PipelineRequest = FanOutRequest::new("demo-001", ["es", "ja", "pt"]).into();
//!
//! let outcome = orchestrator.execute(&request).await?;
//! let report = assemble(&request, &outcome);
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, missing_docs, rust_2018_idioms)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod aggregate;
pub mod cancellation;
pub mod errors;
pub mod graph;
pub mod model;
pub mod observability;
pub mod policy;
pub mod scheduler;
pub mod stage;
pub mod state;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::aggregate::{
        assemble, LanguageArtifacts, LanguageReport, PipelineReport, UnitFailure, UnitOutcome,
        VideoReport,
    };
    pub use crate::cancellation::CancellationToken;
    pub use crate::errors::{
        FailureKind, NodeFailure, PipelineError, StageError, ValidationError,
    };
    pub use crate::graph::{NodeKey, NodeSpec, NodeStatus, PipelineGraph, StageAction, StageKind};
    pub use crate::model::{
        BatchRequest, FanOutRequest, PipelineRequest, SingleVideoRequest, StageArtifact, Summary,
        SummarySection, SummaryStrategy, Transcript, Translation,
    };
    pub use crate::policy::{BackoffStrategy, JitterStrategy, RetryPolicy};
    pub use crate::scheduler::{ExecutionOutcome, Orchestrator};
    pub use crate::stage::{
        Fault, FaultKind, FaultPlan, StageProvider, SummarizeSource, TemplateStageProvider,
    };
    pub use crate::state::{ExecutionSnapshot, HistoryStore, InMemoryHistoryStore, StateStore};
}

#[cfg(test)]
mod tests {
    #[test]
    fn library_compiles() {
        assert!(true);
    }
}
