//! Assembles caller-facing results from execution outcomes.
//!
//! Reports follow the caller-supplied ordering of videos and languages,
//! never completion order. For a partial outcome, each planned unit of
//! work exposes either its completed artifacts or a failure descriptor
//! pointing at the last artifact that was successfully produced.

use crate::errors::FailureKind;
use crate::graph::{NodeKey, StageKind};
use crate::model::{
    FanOutRequest, PipelineRequest, SingleVideoRequest, StageArtifact, Summary, SummaryStrategy,
    Transcript, Translation,
};
use crate::scheduler::ExecutionOutcome;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Final or partial result in the caller's shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineReport {
    /// The execution this report was assembled from.
    pub execution_id: Uuid,
    /// True when every planned node succeeded.
    pub complete: bool,
    /// Per-video results, in request order.
    pub videos: Vec<VideoReport>,
}

/// Result for one video.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoReport {
    /// The video this report covers.
    pub video_id: String,
    /// The extracted transcript, when extraction succeeded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcript: Option<Transcript>,
    /// The source-language summary, when the pipeline produced one before
    /// translating.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_summary: Option<Summary>,
    /// Extraction-level failure, when the video failed before any
    /// language work could start.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<UnitFailure>,
    /// Per-language results, in request order.
    pub languages: Vec<LanguageReport>,
}

/// Result for one (video, language) unit of work.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LanguageReport {
    /// The target language.
    pub language: String,
    /// What happened to this unit.
    pub outcome: UnitOutcome,
}

/// Per-unit outcome: completed, failed, or never reached.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum UnitOutcome {
    /// Every node in the unit succeeded.
    Completed(LanguageArtifacts),
    /// A node in the unit failed.
    Failed(UnitFailure),
    /// An ancestor outside the unit failed; the unit never ran.
    Unreachable,
}

impl UnitOutcome {
    /// Returns true for a completed unit.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }

    /// The failure descriptor, for failed units.
    #[must_use]
    pub fn as_failed(&self) -> Option<&UnitFailure> {
        match self {
            Self::Failed(failure) => Some(failure),
            _ => None,
        }
    }
}

/// Artifacts produced for one target language.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LanguageArtifacts {
    /// The translated transcript.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub translation: Option<Translation>,
    /// The summary in the target language.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<Summary>,
}

/// Failure descriptor for one unit of work.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitFailure {
    /// The stage that failed.
    pub stage: StageKind,
    /// Classification of the failure.
    pub kind: FailureKind,
    /// Human-readable reason.
    pub message: String,
    /// The last artifact successfully produced before the failure, e.g.
    /// a source-language summary that predates a failed translation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_artifact: Option<StageArtifact>,
}

/// Merges node outputs into the response shape the request implies.
#[must_use]
pub fn assemble(request: &PipelineRequest, outcome: &ExecutionOutcome) -> PipelineReport {
    let videos = match request {
        PipelineRequest::SingleVideo(single) => vec![assemble_single(single, outcome)],
        PipelineRequest::FanOutLanguages(fan_out) => vec![assemble_fan_out(fan_out, outcome)],
        PipelineRequest::Batch(batch) => batch
            .videos
            .iter()
            .map(|single| assemble_single(single, outcome))
            .collect(),
    };

    PipelineReport {
        execution_id: outcome.execution_id,
        complete: outcome.is_complete(),
        videos,
    }
}

fn assemble_single(request: &SingleVideoRequest, outcome: &ExecutionOutcome) -> VideoReport {
    let video_id = &request.video_id;
    let extract_key = NodeKey::extract(video_id);
    let transcript = outcome
        .artifact(&extract_key)
        .and_then(StageArtifact::as_transcript)
        .cloned();
    let failure = outcome.failure(&extract_key).map(|f| UnitFailure {
        stage: f.stage,
        kind: f.kind,
        message: f.message.clone(),
        last_artifact: None,
    });

    let (chain, source_summary) = match request.strategy {
        SummaryStrategy::TranslateThenSummarize => (
            vec![
                NodeKey::translate(video_id, &request.target_language),
                NodeKey::summarize(video_id, &request.target_language),
            ],
            None,
        ),
        SummaryStrategy::SummarizeThenTranslate => {
            let summarize_key = NodeKey::summarize(video_id, &request.source_language);
            let source_summary = outcome
                .artifact(&summarize_key)
                .and_then(StageArtifact::as_summary)
                .cloned();
            (
                vec![
                    summarize_key,
                    NodeKey::translate(video_id, &request.target_language),
                    NodeKey::translate_summary(video_id, &request.target_language),
                ],
                source_summary,
            )
        }
    };

    let unit = unit_outcome(
        &request.target_language,
        &chain,
        transcript.clone().map(StageArtifact::Transcript),
        outcome,
    );

    VideoReport {
        video_id: video_id.clone(),
        transcript,
        source_summary,
        failure,
        languages: vec![LanguageReport {
            language: request.target_language.clone(),
            outcome: unit,
        }],
    }
}

fn assemble_fan_out(request: &FanOutRequest, outcome: &ExecutionOutcome) -> VideoReport {
    let video_id = &request.video_id;
    let extract_key = NodeKey::extract(video_id);
    let transcript = outcome
        .artifact(&extract_key)
        .and_then(StageArtifact::as_transcript)
        .cloned();
    let failure = outcome.failure(&extract_key).map(|f| UnitFailure {
        stage: f.stage,
        kind: f.kind,
        message: f.message.clone(),
        last_artifact: None,
    });

    let languages = request
        .target_languages
        .iter()
        .map(|language| {
            let chain = [
                NodeKey::translate(video_id, language),
                NodeKey::summarize(video_id, language),
            ];
            LanguageReport {
                language: language.clone(),
                outcome: unit_outcome(
                    language,
                    &chain,
                    transcript.clone().map(StageArtifact::Transcript),
                    outcome,
                ),
            }
        })
        .collect();

    VideoReport {
        video_id: video_id.clone(),
        transcript,
        source_summary: None,
        failure,
        languages,
    }
}

fn unit_outcome(
    target_language: &str,
    chain: &[NodeKey],
    seed: Option<StageArtifact>,
    outcome: &ExecutionOutcome,
) -> UnitOutcome {
    let mut last_artifact = seed;
    let mut artifacts = LanguageArtifacts::default();
    let mut first_failure: Option<UnitFailure> = None;
    let mut saw_unreachable = false;

    for key in chain {
        if let Some(artifact) = outcome.artifact(key) {
            last_artifact = Some(artifact.clone());
            match artifact {
                StageArtifact::Translation(t) if t.language == target_language => {
                    artifacts.translation = Some(t.clone());
                }
                StageArtifact::Summary(s) if s.language == target_language => {
                    artifacts.summary = Some(s.clone());
                }
                _ => {}
            }
        } else if let Some(failure) = outcome.failure(key) {
            if first_failure.is_none() {
                first_failure = Some(UnitFailure {
                    stage: failure.stage,
                    kind: failure.kind,
                    message: failure.message.clone(),
                    last_artifact: None,
                });
            }
        } else {
            saw_unreachable = true;
        }
    }

    if let Some(mut failure) = first_failure {
        failure.last_artifact = last_artifact;
        return UnitOutcome::Failed(failure);
    }
    if saw_unreachable {
        return UnitOutcome::Unreachable;
    }
    UnitOutcome::Completed(artifacts)
}
