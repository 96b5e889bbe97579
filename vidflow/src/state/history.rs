//! Replay history: completed node outputs keyed by stable identity.
//!
//! A durable-execution substrate that restarts and replays must not
//! re-invoke stage functions for nodes that already succeeded. The
//! orchestrator consults this store before every node run; a hit restores
//! the recorded output instead of executing.

use crate::graph::NodeKey;
use crate::model::StageArtifact;
use async_trait::async_trait;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use uuid::Uuid;

/// Computes the replay key for a node within an execution.
///
/// Stable across process restarts: it hashes only the execution id and the
/// node's rendered identity.
#[must_use]
pub fn replay_key(execution_id: Uuid, key: &NodeKey) -> String {
    let combined = format!("{execution_id}:{key}");
    let digest = Sha256::digest(combined.as_bytes());
    format!("node:{}", hex::encode(&digest[..16]))
}

/// Storage backend for completed node outputs.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Gets a recorded output by replay key.
    async fn get(&self, key: &str) -> Option<StageArtifact>;

    /// Records an output. Later writes for the same key are ignored; a
    /// succeeded node's output is immutable.
    async fn put(&self, key: &str, artifact: StageArtifact);

    /// Drops all entries.
    async fn clear(&self);
}

/// In-memory history store.
#[derive(Debug, Default)]
pub struct InMemoryHistoryStore {
    entries: Mutex<HashMap<String, StageArtifact>>,
}

impl InMemoryHistoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of recorded outputs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Returns true if nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

#[async_trait]
impl HistoryStore for InMemoryHistoryStore {
    async fn get(&self, key: &str) -> Option<StageArtifact> {
        self.entries.lock().get(key).cloned()
    }

    async fn put(&self, key: &str, artifact: StageArtifact) {
        self.entries
            .lock()
            .entry(key.to_owned())
            .or_insert(artifact);
    }

    async fn clear(&self) {
        self.entries.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Provenance, Transcript};

    fn transcript(text: &str) -> StageArtifact {
        StageArtifact::Transcript(Transcript {
            video_id: "demo-001".to_string(),
            language: "en".to_string(),
            text: text.to_string(),
            provenance: Provenance::new("template"),
        })
    }

    fn text_of(artifact: &StageArtifact) -> &str {
        artifact.as_transcript().map_or("", |t| t.text.as_str())
    }

    #[test]
    fn test_replay_key_is_stable() {
        let id = Uuid::new_v4();
        let key = NodeKey::translate("demo-001", "es");

        assert_eq!(replay_key(id, &key), replay_key(id, &key));
        assert_ne!(
            replay_key(id, &key),
            replay_key(id, &NodeKey::translate("demo-001", "ja"))
        );
        assert_ne!(replay_key(id, &key), replay_key(Uuid::new_v4(), &key));
    }

    #[tokio::test]
    async fn test_store_roundtrip() {
        let store = InMemoryHistoryStore::new();
        assert!(store.is_empty());

        store.put("node:abc", transcript("hello")).await;
        assert_eq!(store.len(), 1);

        let recorded = store.get("node:abc").await.unwrap();
        assert_eq!(text_of(&recorded), "hello");
        assert_eq!(store.get("node:missing").await, None);
    }

    #[tokio::test]
    async fn test_first_write_wins() {
        let store = InMemoryHistoryStore::new();
        store.put("node:abc", transcript("first")).await;
        store.put("node:abc", transcript("second")).await;

        let recorded = store.get("node:abc").await.unwrap();
        assert_eq!(text_of(&recorded), "first");
    }
}
