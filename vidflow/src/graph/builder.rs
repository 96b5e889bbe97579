//! Builds the dependency graph for a pipeline request.

use super::node::{NodeKey, NodeSpec, StageAction};
use crate::errors::ValidationError;
use crate::model::{language, FanOutRequest, PipelineRequest, SingleVideoRequest, SummaryStrategy};
use std::collections::{HashMap, HashSet};

/// A directed acyclic graph of stage invocations for one request.
///
/// Built once per request; the node set never changes during execution.
/// Cycles are impossible by construction: every stage consumes only
/// outputs of strictly earlier stage kinds.
#[derive(Debug, Clone, Default)]
pub struct PipelineGraph {
    nodes: HashMap<NodeKey, NodeSpec>,
    order: Vec<NodeKey>,
}

impl PipelineGraph {
    /// Number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns true if the graph has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Looks up a node by key.
    #[must_use]
    pub fn node(&self, key: &NodeKey) -> Option<&NodeSpec> {
        self.nodes.get(key)
    }

    /// Returns true if the key names a node in this graph.
    #[must_use]
    pub fn contains(&self, key: &NodeKey) -> bool {
        self.nodes.contains_key(key)
    }

    /// Node keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &NodeKey> {
        self.order.iter()
    }

    /// Node specs in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &NodeSpec> {
        self.order.iter().filter_map(|key| self.nodes.get(key))
    }

    /// Keys of nodes that directly depend on `key`.
    #[must_use]
    pub fn direct_dependents(&self, key: &NodeKey) -> Vec<NodeKey> {
        self.nodes()
            .filter(|spec| spec.dependencies.contains(key))
            .map(|spec| spec.key.clone())
            .collect()
    }

    /// Keys of all nodes reachable from `key` through dependency edges.
    #[must_use]
    pub fn transitive_dependents(&self, key: &NodeKey) -> Vec<NodeKey> {
        let mut seen: HashSet<NodeKey> = HashSet::new();
        let mut frontier = vec![key.clone()];
        let mut result = Vec::new();

        while let Some(current) = frontier.pop() {
            for dependent in self.direct_dependents(&current) {
                if seen.insert(dependent.clone()) {
                    result.push(dependent.clone());
                    frontier.push(dependent);
                }
            }
        }

        result
    }

    // Shared nodes (e.g. one extraction reused by several batch entries for
    // the same video) are inserted once; the first spec wins.
    fn insert(&mut self, spec: NodeSpec) {
        if !self.nodes.contains_key(&spec.key) {
            self.order.push(spec.key.clone());
            self.nodes.insert(spec.key.clone(), spec);
        }
    }
}

/// Builds the dependency graph for a request.
///
/// Pure and total over valid requests. Fails fast, before any node is
/// created, if a requested language is outside the supported set or the
/// request shape is malformed.
pub fn build(request: &PipelineRequest) -> Result<PipelineGraph, ValidationError> {
    validate(request)?;

    let mut graph = PipelineGraph::default();
    match request {
        PipelineRequest::SingleVideo(single) => add_single_video(&mut graph, single),
        PipelineRequest::FanOutLanguages(fan_out) => add_fan_out(&mut graph, fan_out),
        PipelineRequest::Batch(batch) => {
            for single in &batch.videos {
                add_single_video(&mut graph, single);
            }
        }
    }

    Ok(graph)
}

fn validate(request: &PipelineRequest) -> Result<(), ValidationError> {
    match request {
        PipelineRequest::SingleVideo(single) => validate_single(single),
        PipelineRequest::FanOutLanguages(fan_out) => {
            validate_video_id(&fan_out.video_id)?;
            if fan_out.target_languages.is_empty() {
                return Err(ValidationError::EmptyTargetLanguages);
            }
            for target in &fan_out.target_languages {
                language::validate_target(target)?;
            }
            Ok(())
        }
        PipelineRequest::Batch(batch) => {
            if batch.videos.is_empty() {
                return Err(ValidationError::EmptyBatch);
            }
            for single in &batch.videos {
                validate_single(single)?;
            }
            Ok(())
        }
    }
}

fn validate_single(request: &SingleVideoRequest) -> Result<(), ValidationError> {
    validate_video_id(&request.video_id)?;
    language::validate_target(&request.target_language)
}

fn validate_video_id(video_id: &str) -> Result<(), ValidationError> {
    if video_id.trim().is_empty() {
        Err(ValidationError::MissingVideoId)
    } else {
        Ok(())
    }
}

fn add_single_video(graph: &mut PipelineGraph, request: &SingleVideoRequest) {
    let extract = NodeKey::extract(&request.video_id);
    graph.insert(NodeSpec::new(
        extract.clone(),
        StageAction::Extract {
            video_id: request.video_id.clone(),
        },
    ));

    match request.strategy {
        SummaryStrategy::TranslateThenSummarize => {
            let translate = NodeKey::translate(&request.video_id, &request.target_language);
            graph.insert(
                NodeSpec::new(
                    translate.clone(),
                    StageAction::Translate {
                        source: extract.clone(),
                        target_language: request.target_language.clone(),
                    },
                )
                .with_dependency(extract),
            );

            let summarize = NodeKey::summarize(&request.video_id, &request.target_language);
            graph.insert(
                NodeSpec::new(
                    summarize,
                    StageAction::Summarize {
                        source: translate.clone(),
                    },
                )
                .with_dependency(translate),
            );
        }
        SummaryStrategy::SummarizeThenTranslate => {
            let summarize = NodeKey::summarize(&request.video_id, &request.source_language);
            graph.insert(
                NodeSpec::new(
                    summarize.clone(),
                    StageAction::Summarize {
                        source: extract.clone(),
                    },
                )
                .with_dependency(extract.clone()),
            );

            let translate = NodeKey::translate(&request.video_id, &request.target_language);
            graph.insert(
                NodeSpec::new(
                    translate.clone(),
                    StageAction::Translate {
                        source: extract.clone(),
                        target_language: request.target_language.clone(),
                    },
                )
                .with_dependency(extract),
            );

            let translate_summary =
                NodeKey::translate_summary(&request.video_id, &request.target_language);
            graph.insert(
                NodeSpec::new(
                    translate_summary,
                    StageAction::TranslateSummary {
                        summary: summarize.clone(),
                        target_language: request.target_language.clone(),
                    },
                )
                .with_dependency(summarize)
                .with_dependency(translate),
            );
        }
    }
}

fn add_fan_out(graph: &mut PipelineGraph, request: &FanOutRequest) {
    let extract = NodeKey::extract(&request.video_id);
    graph.insert(NodeSpec::new(
        extract.clone(),
        StageAction::Extract {
            video_id: request.video_id.clone(),
        },
    ));

    // Per-language chains share the extraction and nothing else.
    for target in &request.target_languages {
        let translate = NodeKey::translate(&request.video_id, target);
        graph.insert(
            NodeSpec::new(
                translate.clone(),
                StageAction::Translate {
                    source: extract.clone(),
                    target_language: target.clone(),
                },
            )
            .with_dependency(extract.clone()),
        );

        let summarize = NodeKey::summarize(&request.video_id, target);
        graph.insert(
            NodeSpec::new(
                summarize,
                StageAction::Summarize {
                    source: translate.clone(),
                },
            )
            .with_dependency(translate),
        );
    }
}
