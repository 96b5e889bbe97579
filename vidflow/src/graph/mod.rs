//! Dependency graph construction.
//!
//! A request becomes a DAG of stage invocations keyed by
//! `(video_id, stage_kind, language)`.

mod builder;
mod node;

pub use builder::{build, PipelineGraph};
pub use node::{NodeKey, NodeSpec, NodeStatus, StageAction, StageKind};
