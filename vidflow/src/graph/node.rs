//! Node identity and lifecycle types for the pipeline graph.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// One pipeline step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    /// Produce the source-language transcript for a video.
    Extract,
    /// Translate a transcript into a target language.
    Translate,
    /// Summarize a transcript or translation into sections.
    Summarize,
    /// Translate an already-produced summary into a target language.
    TranslateSummary,
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Extract => write!(f, "extract"),
            Self::Translate => write!(f, "translate"),
            Self::Summarize => write!(f, "summarize"),
            Self::TranslateSummary => write!(f, "translate_summary"),
        }
    }
}

impl FromStr for StageKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "extract" => Ok(Self::Extract),
            "translate" => Ok(Self::Translate),
            "summarize" => Ok(Self::Summarize),
            "translate_summary" => Ok(Self::TranslateSummary),
            other => Err(format!("unknown stage kind '{other}'")),
        }
    }
}

/// Stable identity of one stage invocation for a specific video/language.
///
/// The rendered form `video/stage[/language]` is stable across process
/// restarts and usable as an idempotency key by a durable-execution
/// substrate.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodeKey {
    /// The video this node works on.
    pub video_id: String,
    /// The stage this node runs.
    pub stage: StageKind,
    /// Target language, for language-scoped stages.
    pub language: Option<String>,
}

impl NodeKey {
    /// Key of the extraction node for a video.
    #[must_use]
    pub fn extract(video_id: impl Into<String>) -> Self {
        Self {
            video_id: video_id.into(),
            stage: StageKind::Extract,
            language: None,
        }
    }

    /// Key of the translation node for a (video, language) pair.
    #[must_use]
    pub fn translate(video_id: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            video_id: video_id.into(),
            stage: StageKind::Translate,
            language: Some(language.into()),
        }
    }

    /// Key of the summarization node for a (video, language) pair.
    #[must_use]
    pub fn summarize(video_id: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            video_id: video_id.into(),
            stage: StageKind::Summarize,
            language: Some(language.into()),
        }
    }

    /// Key of the summary-translation node for a (video, language) pair.
    #[must_use]
    pub fn translate_summary(video_id: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            video_id: video_id.into(),
            stage: StageKind::TranslateSummary,
            language: Some(language.into()),
        }
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.language {
            Some(language) => write!(f, "{}/{}/{}", self.video_id, self.stage, language),
            None => write!(f, "{}/{}", self.video_id, self.stage),
        }
    }
}

impl FromStr for NodeKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(3, '/');
        let video_id = parts
            .next()
            .filter(|p| !p.is_empty())
            .ok_or_else(|| format!("malformed node key '{s}'"))?;
        let stage = parts
            .next()
            .ok_or_else(|| format!("malformed node key '{s}'"))?
            .parse::<StageKind>()?;
        let language = parts.next().map(ToOwned::to_owned);

        Ok(Self {
            video_id: video_id.to_owned(),
            stage,
            language,
        })
    }
}

// Keys serialize as their rendered form so they can be used as JSON map keys.
impl Serialize for NodeKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for NodeKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(D::Error::custom)
    }
}

/// Execution status of a node.
///
/// A node transitions Pending -> Running -> {Succeeded | Failed} exactly
/// once per attempt; retries re-enter Running without creating a new node.
/// Unreachable marks nodes that were never scheduled because an ancestor
/// failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    /// Created, waiting for dependencies.
    #[default]
    Pending,
    /// An attempt is in flight.
    Running,
    /// The node produced its output; the output is now immutable.
    Succeeded,
    /// The node exhausted its attempts or hit a fatal error.
    Failed,
    /// An ancestor failed; this node was never scheduled.
    Unreachable,
}

impl NodeStatus {
    /// Returns true for states a node can never leave.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Unreachable)
    }
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Running => write!(f, "running"),
            Self::Succeeded => write!(f, "succeeded"),
            Self::Failed => write!(f, "failed"),
            Self::Unreachable => write!(f, "unreachable"),
        }
    }
}

/// The work a node performs and the upstream outputs it consumes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum StageAction {
    /// Extract the source transcript.
    Extract {
        /// The video to extract.
        video_id: String,
    },
    /// Translate the transcript produced by `source`.
    Translate {
        /// The extraction node whose transcript is translated.
        source: NodeKey,
        /// The language to translate into.
        target_language: String,
    },
    /// Summarize the output of `source` (a transcript or a translation).
    Summarize {
        /// The node whose text is summarized.
        source: NodeKey,
    },
    /// Translate the summary produced by `summary`.
    TranslateSummary {
        /// The summarization node whose output is translated.
        summary: NodeKey,
        /// The language to translate into.
        target_language: String,
    },
}

impl StageAction {
    /// The stage kind this action runs.
    #[must_use]
    pub fn stage(&self) -> StageKind {
        match self {
            Self::Extract { .. } => StageKind::Extract,
            Self::Translate { .. } => StageKind::Translate,
            Self::Summarize { .. } => StageKind::Summarize,
            Self::TranslateSummary { .. } => StageKind::TranslateSummary,
        }
    }
}

/// Specification of one node, fixed at graph-build time.
///
/// The node set for a request never changes during execution; the
/// video/language set is fixed when the graph is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeSpec {
    /// Stable identity.
    pub key: NodeKey,
    /// What the node runs.
    pub action: StageAction,
    /// Keys of nodes that must succeed before this one may start.
    pub dependencies: Vec<NodeKey>,
}

impl NodeSpec {
    /// Creates a node spec with no dependencies.
    #[must_use]
    pub fn new(key: NodeKey, action: StageAction) -> Self {
        Self {
            key,
            action,
            dependencies: Vec::new(),
        }
    }

    /// Adds a dependency.
    #[must_use]
    pub fn with_dependency(mut self, dep: NodeKey) -> Self {
        self.dependencies.push(dep);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_key_display_roundtrip() {
        let key = NodeKey::translate("demo-001", "es");
        assert_eq!(key.to_string(), "demo-001/translate/es");
        assert_eq!("demo-001/translate/es".parse::<NodeKey>().unwrap(), key);

        let extract = NodeKey::extract("demo-001");
        assert_eq!(extract.to_string(), "demo-001/extract");
        assert_eq!("demo-001/extract".parse::<NodeKey>().unwrap(), extract);
    }

    #[test]
    fn test_node_key_parse_rejects_garbage() {
        assert!("".parse::<NodeKey>().is_err());
        assert!("demo-001".parse::<NodeKey>().is_err());
        assert!("demo-001/unknown-stage".parse::<NodeKey>().is_err());
    }

    #[test]
    fn test_node_key_serializes_as_string() {
        let key = NodeKey::summarize("demo-001", "ja");
        let json = serde_json::to_string(&key).unwrap();
        assert_eq!(json, r#""demo-001/summarize/ja""#);

        let back: NodeKey = serde_json::from_str(&json).unwrap();
        assert_eq!(back, key);
    }

    #[test]
    fn test_node_status_terminal() {
        assert!(NodeStatus::Succeeded.is_terminal());
        assert!(NodeStatus::Failed.is_terminal());
        assert!(NodeStatus::Unreachable.is_terminal());
        assert!(!NodeStatus::Pending.is_terminal());
        assert!(!NodeStatus::Running.is_terminal());
    }

    #[test]
    fn test_stage_action_kind() {
        let action = StageAction::Translate {
            source: NodeKey::extract("v"),
            target_language: "es".to_string(),
        };
        assert_eq!(action.stage(), StageKind::Translate);
    }
}
