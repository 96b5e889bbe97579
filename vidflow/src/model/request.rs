//! Pipeline request shapes.

use super::language::SOURCE_LANGUAGE;
use serde::{Deserialize, Serialize};

/// Which graph shape a single-video pipeline uses.
///
/// Both orderings are valid pipelines; the request decides which one runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SummaryStrategy {
    /// extract -> translate -> summarize. The summary is produced from the
    /// translated transcript, in the target language.
    #[default]
    TranslateThenSummarize,
    /// extract -> {summarize(source), translate} -> translate-summary. The
    /// source-language summary is produced first, then translated; the
    /// transcript translation runs as a sibling.
    SummarizeThenTranslate,
}

/// Process one video into one target language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SingleVideoRequest {
    /// The video to process.
    pub video_id: String,
    /// The language the transcript is extracted in.
    pub source_language: String,
    /// The language to produce results in.
    pub target_language: String,
    /// Graph shape selector.
    #[serde(default)]
    pub strategy: SummaryStrategy,
    /// Optional free-text description, carried through for display.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl SingleVideoRequest {
    /// Creates a request with the default source language and strategy.
    #[must_use]
    pub fn new(video_id: impl Into<String>, target_language: impl Into<String>) -> Self {
        Self {
            video_id: video_id.into(),
            source_language: SOURCE_LANGUAGE.to_owned(),
            target_language: target_language.into(),
            strategy: SummaryStrategy::default(),
            description: None,
        }
    }

    /// Sets the graph shape.
    #[must_use]
    pub fn with_strategy(mut self, strategy: SummaryStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Process one video into several target languages, sharing one extraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FanOutRequest {
    /// The video to process.
    pub video_id: String,
    /// The language the transcript is extracted in.
    pub source_language: String,
    /// The languages to produce results in, in caller order.
    pub target_languages: Vec<String>,
}

impl FanOutRequest {
    /// Creates a fan-out request with the default source language.
    #[must_use]
    pub fn new(
        video_id: impl Into<String>,
        target_languages: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            video_id: video_id.into(),
            source_language: SOURCE_LANGUAGE.to_owned(),
            target_languages: target_languages.into_iter().map(Into::into).collect(),
        }
    }
}

/// Process several videos in one execution; videos are fully independent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchRequest {
    /// The videos to process, in caller order.
    pub videos: Vec<SingleVideoRequest>,
}

impl BatchRequest {
    /// Creates a batch request.
    #[must_use]
    pub fn new(videos: Vec<SingleVideoRequest>) -> Self {
        Self { videos }
    }
}

/// A pipeline request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PipelineRequest {
    /// One video, one language.
    SingleVideo(SingleVideoRequest),
    /// One video, many languages.
    FanOutLanguages(FanOutRequest),
    /// Many videos.
    Batch(BatchRequest),
}

impl PipelineRequest {
    /// How many videos the request covers.
    #[must_use]
    pub fn video_count(&self) -> usize {
        match self {
            Self::SingleVideo(_) | Self::FanOutLanguages(_) => 1,
            Self::Batch(batch) => batch.videos.len(),
        }
    }

    /// How many planned (video, language) units of work the request covers.
    #[must_use]
    pub fn unit_count(&self) -> usize {
        match self {
            Self::SingleVideo(_) => 1,
            Self::FanOutLanguages(fan_out) => fan_out.target_languages.len(),
            Self::Batch(batch) => batch.videos.len(),
        }
    }
}

impl From<SingleVideoRequest> for PipelineRequest {
    fn from(request: SingleVideoRequest) -> Self {
        Self::SingleVideo(request)
    }
}

impl From<FanOutRequest> for PipelineRequest {
    fn from(request: FanOutRequest) -> Self {
        Self::FanOutLanguages(request)
    }
}

impl From<BatchRequest> for PipelineRequest {
    fn from(request: BatchRequest) -> Self {
        Self::Batch(request)
    }
}
