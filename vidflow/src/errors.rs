//! Error taxonomy for the vidflow orchestration core.
//!
//! Validation errors reject a request before any node runs. Stage errors
//! are produced by stage functions and classified for retry. Pipeline
//! errors are the orchestrator's own infrastructure failures; a node's
//! failure is never one of them, it is data in the execution outcome.

use crate::graph::StageKind;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Classification of a terminal node failure, surfaced in outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The requested video has no known source content.
    NotFound,
    /// A transient failure (rate limit, flaky upstream) that exhausted retries.
    Transient,
    /// The stage function produced output that fails to parse.
    MalformedResponse,
    /// An attempt (or the whole execution) exceeded its wall-clock bound.
    Timeout,
    /// The node observed cancellation before completing.
    Cancelled,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "not_found"),
            Self::Transient => write!(f, "transient"),
            Self::MalformedResponse => write!(f, "malformed_response"),
            Self::Timeout => write!(f, "timeout"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Error raised when a request fails validation.
///
/// Validation happens before graph construction; a request that fails here
/// never executes a single stage function.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum ValidationError {
    /// A requested target language is outside the supported set.
    #[error("unsupported language '{language}'; supported: {}", supported.join(", "))]
    UnsupportedLanguage {
        /// The offending language code.
        language: String,
        /// The full supported set, for the caller's benefit.
        supported: Vec<String>,
    },

    /// A fan-out request listed no target languages.
    #[error("request contains no target languages")]
    EmptyTargetLanguages,

    /// A batch request listed no videos.
    #[error("batch request contains no videos")]
    EmptyBatch,

    /// A video id was empty or whitespace-only.
    #[error("video id cannot be empty or whitespace-only")]
    MissingVideoId,
}

/// Error produced by a stage function.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum StageError {
    /// The requested video has no known source content. Fatal for the node
    /// and its dependents.
    #[error("no source content for video '{video_id}'")]
    NotFound {
        /// The video that could not be found.
        video_id: String,
    },

    /// A transient failure; retryable up to the policy's attempt cap.
    #[error("transient failure: {message}")]
    Transient {
        /// What went wrong.
        message: String,
    },

    /// The stage function's output failed to parse into the expected
    /// structure. Retryable once; a retry may get a well-formed response.
    #[error("malformed stage response: {message}")]
    MalformedResponse {
        /// Why parsing failed.
        message: String,
    },

    /// The attempt exceeded its wall-clock bound. Retryable.
    #[error("attempt exceeded its {elapsed_ms}ms wall-clock bound")]
    Timeout {
        /// The bound that was exceeded, in milliseconds.
        elapsed_ms: u64,
    },

    /// The stage call observed cancellation and stopped.
    #[error("stage call observed cancellation")]
    Cancelled,
}

impl StageError {
    /// Creates a not-found error for a video.
    #[must_use]
    pub fn not_found(video_id: impl Into<String>) -> Self {
        Self::NotFound {
            video_id: video_id.into(),
        }
    }

    /// Creates a transient error.
    #[must_use]
    pub fn transient(message: impl Into<String>) -> Self {
        Self::Transient {
            message: message.into(),
        }
    }

    /// Creates a malformed-response error.
    #[must_use]
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedResponse {
            message: message.into(),
        }
    }

    /// Returns true if the error may be retried at all.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Transient { .. } | Self::MalformedResponse { .. } | Self::Timeout { .. }
        )
    }

    /// The failure kind reported when this error becomes terminal.
    #[must_use]
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::NotFound { .. } => FailureKind::NotFound,
            Self::Transient { .. } => FailureKind::Transient,
            Self::MalformedResponse { .. } => FailureKind::MalformedResponse,
            Self::Timeout { .. } => FailureKind::Timeout,
            Self::Cancelled => FailureKind::Cancelled,
        }
    }
}

/// Terminal failure record for one node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeFailure {
    /// Classification of the final failure.
    pub kind: FailureKind,
    /// Human-readable reason.
    pub message: String,
    /// The stage that failed.
    pub stage: StageKind,
    /// How many attempts ran before the node was declared failed.
    pub attempts: usize,
}

impl NodeFailure {
    /// Creates a new failure record.
    #[must_use]
    pub fn new(
        kind: FailureKind,
        message: impl Into<String>,
        stage: StageKind,
        attempts: usize,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            stage,
            attempts,
        }
    }
}

impl fmt::Display for NodeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} failed after {} attempt(s): {}",
            self.stage, self.attempts, self.message
        )
    }
}

/// The orchestrator's own error type.
///
/// Node failures are not pipeline errors; they surface as data in the
/// execution outcome. This type covers request rejection and genuine
/// infrastructure faults.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The request was rejected before any node ran.
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// A spawned node task aborted or panicked.
    #[error("node task aborted: {0}")]
    TaskJoin(String),

    /// An internal invariant was violated.
    #[error("internal error: {0}")]
    Internal(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_error_retryability() {
        assert!(StageError::transient("rate limited").is_retryable());
        assert!(StageError::malformed("no JSON").is_retryable());
        assert!(StageError::Timeout { elapsed_ms: 30_000 }.is_retryable());
        assert!(!StageError::not_found("missing-video").is_retryable());
        assert!(!StageError::Cancelled.is_retryable());
    }

    #[test]
    fn test_stage_error_kind() {
        assert_eq!(
            StageError::not_found("v").kind(),
            FailureKind::NotFound
        );
        assert_eq!(
            StageError::transient("x").kind(),
            FailureKind::Transient
        );
        assert_eq!(
            StageError::malformed("x").kind(),
            FailureKind::MalformedResponse
        );
    }

    #[test]
    fn test_validation_error_lists_supported_set() {
        let err = ValidationError::UnsupportedLanguage {
            language: "de".to_string(),
            supported: vec!["es".to_string(), "ja".to_string(), "pt".to_string()],
        };
        let message = err.to_string();
        assert!(message.contains("de"));
        assert!(message.contains("es, ja, pt"));
    }

    #[test]
    fn test_failure_kind_serializes_snake_case() {
        let json = serde_json::to_string(&FailureKind::MalformedResponse).unwrap();
        assert_eq!(json, r#""malformed_response""#);
    }

    #[test]
    fn test_node_failure_display() {
        let failure = NodeFailure::new(
            FailureKind::Transient,
            "rate limited",
            StageKind::Translate,
            3,
        );
        assert_eq!(
            failure.to_string(),
            "translate failed after 3 attempt(s): rate limited"
        );
    }
}
