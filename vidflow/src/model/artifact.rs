//! Artifacts produced by pipeline stages.
//!
//! All artifacts are immutable once produced: a Succeeded node's output is
//! published once and never rewritten.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where a transcript came from and when it was produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provenance {
    /// The extraction backend, e.g. `"template"` or `"caption-service"`.
    pub source: String,
    /// When extraction completed.
    pub extracted_at: DateTime<Utc>,
}

impl Provenance {
    /// Creates provenance stamped with the current time.
    #[must_use]
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            extracted_at: Utc::now(),
        }
    }
}

/// A video's transcript, produced exactly once per video by extraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transcript {
    /// The video this transcript belongs to.
    pub video_id: String,
    /// The language the transcript is in.
    pub language: String,
    /// The transcript text.
    pub text: String,
    /// Where the transcript came from.
    pub provenance: Provenance,
}

/// A transcript translated into a target language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Translation {
    /// The video this translation belongs to.
    pub video_id: String,
    /// The language translated into.
    pub language: String,
    /// The translated text.
    pub text: String,
    /// The language translated from.
    pub source_language: String,
}

/// One titled section of a summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummarySection {
    /// Section heading.
    pub heading: String,
    /// Section body.
    pub text: String,
}

impl SummarySection {
    /// Creates a section.
    #[must_use]
    pub fn new(heading: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            heading: heading.into(),
            text: text.into(),
        }
    }
}

/// A structured summary of a transcript or translation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    /// The video this summary belongs to.
    pub video_id: String,
    /// The language the summary is in.
    pub language: String,
    /// Ordered sections: overview, key takeaways, follow-up actions.
    pub sections: Vec<SummarySection>,
}

impl Summary {
    /// A well-formed summary has exactly this many sections.
    pub const EXPECTED_SECTIONS: usize = 3;

    /// Returns true if the summary has the expected shape.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        self.sections.len() == Self::EXPECTED_SECTIONS
            && self
                .sections
                .iter()
                .all(|s| !s.heading.trim().is_empty() && !s.text.trim().is_empty())
    }
}

/// The uniform output type of a pipeline node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StageArtifact {
    /// Output of an extraction node.
    Transcript(Transcript),
    /// Output of a translation node.
    Translation(Translation),
    /// Output of a summarization or summary-translation node.
    Summary(Summary),
}

impl StageArtifact {
    /// The video this artifact belongs to.
    #[must_use]
    pub fn video_id(&self) -> &str {
        match self {
            Self::Transcript(t) => &t.video_id,
            Self::Translation(t) => &t.video_id,
            Self::Summary(s) => &s.video_id,
        }
    }

    /// The language the artifact is in.
    #[must_use]
    pub fn language(&self) -> &str {
        match self {
            Self::Transcript(t) => &t.language,
            Self::Translation(t) => &t.language,
            Self::Summary(s) => &s.language,
        }
    }

    /// Downcast to a transcript.
    #[must_use]
    pub fn as_transcript(&self) -> Option<&Transcript> {
        match self {
            Self::Transcript(t) => Some(t),
            _ => None,
        }
    }

    /// Downcast to a translation.
    #[must_use]
    pub fn as_translation(&self) -> Option<&Translation> {
        match self {
            Self::Translation(t) => Some(t),
            _ => None,
        }
    }

    /// Downcast to a summary.
    #[must_use]
    pub fn as_summary(&self) -> Option<&Summary> {
        match self {
            Self::Summary(s) => Some(s),
            _ => None,
        }
    }
}
