//! Live execution state: the partial-state accessor.
//!
//! The orchestrator is the only writer; each node's publication is one
//! short write-lock insert, so a reader never observes a half-written
//! output. Snapshots are best-effort and eventually consistent with the
//! in-flight execution, and monotonic: a Succeeded record never changes
//! or disappears.

mod history;

pub use history::{replay_key, HistoryStore, InMemoryHistoryStore};

use crate::errors::NodeFailure;
use crate::graph::{NodeKey, NodeStatus, PipelineGraph};
use crate::model::StageArtifact;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// Record of a single node's progress.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeRecord {
    /// Current status.
    pub status: NodeStatus,
    /// Attempts made so far (0 while pending).
    pub attempts: usize,
    /// The published output, once Succeeded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<StageArtifact>,
    /// The terminal failure, once Failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<NodeFailure>,
    /// When the record last changed.
    pub updated_at: DateTime<Utc>,
}

impl NodeRecord {
    fn pending() -> Self {
        Self {
            status: NodeStatus::Pending,
            attempts: 0,
            output: None,
            failure: None,
            updated_at: Utc::now(),
        }
    }
}

#[derive(Debug, Default)]
struct ExecutionState {
    nodes: RwLock<HashMap<NodeKey, NodeRecord>>,
}

/// Thread-safe store of per-execution node state, queryable while the
/// execution is still running or after it failed mid-flight.
#[derive(Debug, Default)]
pub struct StateStore {
    executions: DashMap<Uuid, Arc<ExecutionState>>,
}

impl StateStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers every node of a freshly built graph as Pending.
    pub fn register(&self, execution_id: Uuid, graph: &PipelineGraph) {
        let state = Arc::new(ExecutionState::default());
        {
            let mut nodes = state.nodes.write();
            for key in graph.keys() {
                nodes.insert(key.clone(), NodeRecord::pending());
            }
        }
        self.executions.insert(execution_id, state);
    }

    /// Marks a node Running for the given attempt.
    pub(crate) fn mark_running(&self, execution_id: Uuid, key: &NodeKey, attempt: usize) {
        self.update(execution_id, key, |record| {
            record.status = NodeStatus::Running;
            record.attempts = attempt;
        });
    }

    /// Publishes a node's output. The record becomes Succeeded atomically;
    /// once published, the output is immutable.
    pub(crate) fn publish(
        &self,
        execution_id: Uuid,
        key: &NodeKey,
        artifact: StageArtifact,
        attempts: usize,
    ) {
        self.update(execution_id, key, |record| {
            if record.status == NodeStatus::Succeeded {
                return;
            }
            record.status = NodeStatus::Succeeded;
            record.attempts = attempts;
            record.output = Some(artifact);
            record.failure = None;
        });
    }

    /// Marks a node Failed with its terminal failure.
    pub(crate) fn mark_failed(&self, execution_id: Uuid, key: &NodeKey, failure: NodeFailure) {
        self.update(execution_id, key, |record| {
            if record.status == NodeStatus::Succeeded {
                return;
            }
            record.status = NodeStatus::Failed;
            record.attempts = failure.attempts;
            record.failure = Some(failure);
        });
    }

    /// Marks a node Unreachable: an ancestor failed, it will never run.
    pub(crate) fn mark_unreachable(&self, execution_id: Uuid, key: &NodeKey) {
        self.update(execution_id, key, |record| {
            if record.status.is_terminal() {
                return;
            }
            record.status = NodeStatus::Unreachable;
        });
    }

    /// Takes a point-in-time snapshot of an execution's node table.
    #[must_use]
    pub fn snapshot(&self, execution_id: Uuid) -> Option<ExecutionSnapshot> {
        let state = self.executions.get(&execution_id)?;
        let nodes = state.nodes.read().clone();
        Some(ExecutionSnapshot {
            execution_id,
            taken_at: Utc::now(),
            nodes,
        })
    }

    /// Returns one node's published output, if it has succeeded.
    ///
    /// Answers the query boundary directly: "give me the English summary
    /// even though translation failed", without waiting for the execution
    /// to finish.
    #[must_use]
    pub fn artifact(&self, execution_id: Uuid, key: &NodeKey) -> Option<StageArtifact> {
        let state = self.executions.get(&execution_id)?;
        let nodes = state.nodes.read();
        nodes.get(key).and_then(|record| record.output.clone())
    }

    /// Drops an execution's state.
    pub fn forget(&self, execution_id: Uuid) {
        self.executions.remove(&execution_id);
    }

    fn update(&self, execution_id: Uuid, key: &NodeKey, apply: impl FnOnce(&mut NodeRecord)) {
        if let Some(state) = self.executions.get(&execution_id) {
            let mut nodes = state.nodes.write();
            if let Some(record) = nodes.get_mut(key) {
                apply(record);
                record.updated_at = Utc::now();
            }
        }
    }
}

/// Point-in-time view of one execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionSnapshot {
    /// The execution this snapshot describes.
    pub execution_id: Uuid,
    /// When the snapshot was taken.
    pub taken_at: DateTime<Utc>,
    /// Per-node records at that instant.
    pub nodes: HashMap<NodeKey, NodeRecord>,
}

impl ExecutionSnapshot {
    /// A node's status at snapshot time.
    #[must_use]
    pub fn status(&self, key: &NodeKey) -> Option<NodeStatus> {
        self.nodes.get(key).map(|record| record.status)
    }

    /// A node's published output at snapshot time.
    #[must_use]
    pub fn artifact(&self, key: &NodeKey) -> Option<&StageArtifact> {
        self.nodes.get(key).and_then(|record| record.output.as_ref())
    }

    /// Keys of nodes that had succeeded by snapshot time.
    pub fn succeeded(&self) -> impl Iterator<Item = &NodeKey> {
        self.nodes
            .iter()
            .filter(|(_, record)| record.status == NodeStatus::Succeeded)
            .map(|(key, _)| key)
    }

    /// Counts nodes by terminal-ness: (succeeded, failed, unreachable, open).
    #[must_use]
    pub fn progress(&self) -> (usize, usize, usize, usize) {
        let mut succeeded = 0;
        let mut failed = 0;
        let mut unreachable = 0;
        let mut open = 0;
        for record in self.nodes.values() {
            match record.status {
                NodeStatus::Succeeded => succeeded += 1,
                NodeStatus::Failed => failed += 1,
                NodeStatus::Unreachable => unreachable += 1,
                NodeStatus::Pending | NodeStatus::Running => open += 1,
            }
        }
        (succeeded, failed, unreachable, open)
    }
}
