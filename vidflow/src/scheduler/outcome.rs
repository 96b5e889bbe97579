//! Execution outcomes.

use crate::errors::NodeFailure;
use crate::graph::NodeKey;
use crate::model::StageArtifact;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Terminal result of one pipeline execution.
///
/// Node failure is data, not control flow: a partial outcome carries
/// everything that succeeded alongside everything that did not. The
/// caller decides whether partial is acceptable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionOutcome {
    /// The execution this outcome describes.
    pub execution_id: Uuid,
    /// Outputs of every Succeeded node.
    pub outputs: HashMap<NodeKey, StageArtifact>,
    /// Terminal failures of every Failed node.
    pub failures: HashMap<NodeKey, NodeFailure>,
    /// Nodes never scheduled because an ancestor failed.
    pub unreachable: Vec<NodeKey>,
    /// Total wall-clock duration in milliseconds.
    pub duration_ms: f64,
}

impl ExecutionOutcome {
    /// Returns true if every node reachable from the request succeeded.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty() && self.unreachable.is_empty()
    }

    /// A succeeded node's output.
    #[must_use]
    pub fn artifact(&self, key: &NodeKey) -> Option<&StageArtifact> {
        self.outputs.get(key)
    }

    /// A failed node's terminal failure.
    #[must_use]
    pub fn failure(&self, key: &NodeKey) -> Option<&NodeFailure> {
        self.failures.get(key)
    }

    /// Returns true if the node was skipped because an ancestor failed.
    #[must_use]
    pub fn is_unreachable(&self, key: &NodeKey) -> bool {
        self.unreachable.contains(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::FailureKind;
    use crate::graph::StageKind;

    #[test]
    fn test_complete_outcome() {
        let outcome = ExecutionOutcome {
            execution_id: Uuid::new_v4(),
            outputs: HashMap::new(),
            failures: HashMap::new(),
            unreachable: Vec::new(),
            duration_ms: 1.0,
        };
        assert!(outcome.is_complete());
    }

    #[test]
    fn test_partial_outcome() {
        let translate = NodeKey::translate("demo-001", "ja");
        let summarize = NodeKey::summarize("demo-001", "ja");

        let mut failures = HashMap::new();
        failures.insert(
            translate.clone(),
            NodeFailure::new(
                FailureKind::Transient,
                "rate limited",
                StageKind::Translate,
                3,
            ),
        );

        let outcome = ExecutionOutcome {
            execution_id: Uuid::new_v4(),
            outputs: HashMap::new(),
            failures,
            unreachable: vec![summarize.clone()],
            duration_ms: 1.0,
        };

        assert!(!outcome.is_complete());
        assert_eq!(
            outcome.failure(&translate).map(|f| f.kind),
            Some(FailureKind::Transient)
        );
        assert!(outcome.is_unreachable(&summarize));
    }
}
