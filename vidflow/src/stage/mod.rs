//! The stage-function boundary.
//!
//! Stage functions are external collaborators behind the [`StageProvider`]
//! trait: pure request -> response contracts the orchestrator drives. The
//! provider is an explicitly owned, injected dependency with its own scoped
//! lifecycle, never a process-wide singleton. Language validation happens
//! before dispatch; a provider never sees an unsupported target.

mod fault;
mod parser;
mod template;

pub use fault::{Fault, FaultKind, FaultPlan};
pub use parser::parse_summary;
pub use template::TemplateStageProvider;

use crate::errors::StageError;
use crate::model::{Summary, Transcript, Translation};
use async_trait::async_trait;

/// The text a summary is generated from: a transcript or a translation.
#[derive(Debug, Clone, Copy)]
pub enum SummarizeSource<'a> {
    /// Summarize the source-language transcript.
    Transcript(&'a Transcript),
    /// Summarize a translated transcript.
    Translation(&'a Translation),
}

impl SummarizeSource<'_> {
    /// The video the source text belongs to.
    #[must_use]
    pub fn video_id(&self) -> &str {
        match self {
            Self::Transcript(t) => &t.video_id,
            Self::Translation(t) => &t.video_id,
        }
    }

    /// The language of the source text (and of the resulting summary).
    #[must_use]
    pub fn language(&self) -> &str {
        match self {
            Self::Transcript(t) => &t.language,
            Self::Translation(t) => &t.language,
        }
    }

    /// The source text itself.
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Self::Transcript(t) => &t.text,
            Self::Translation(t) => &t.text,
        }
    }
}

/// Provider of the four stage functions.
#[async_trait]
pub trait StageProvider: Send + Sync {
    /// Produces the source-language transcript for a video.
    async fn extract(&self, video_id: &str) -> Result<Transcript, StageError>;

    /// Translates a transcript into a target language.
    async fn translate(
        &self,
        transcript: &Transcript,
        target_language: &str,
    ) -> Result<Translation, StageError>;

    /// Summarizes a transcript or translation into sections, in the
    /// source text's language.
    async fn summarize(&self, source: SummarizeSource<'_>) -> Result<Summary, StageError>;

    /// Translates an existing summary into a target language.
    async fn translate_summary(
        &self,
        summary: &Summary,
        target_language: &str,
    ) -> Result<Summary, StageError>;
}
