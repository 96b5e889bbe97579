//! The orchestrator: dependency-ordered concurrent graph execution.
//!
//! Nodes are dispatched the moment every dependency has succeeded, one
//! logical task per node. A node's failure only prevents its dependents
//! from becoming reachable; siblings and ancestors are untouched, and the
//! orchestrator returns a partial outcome rather than raising.

use super::outcome::ExecutionOutcome;
use crate::cancellation::CancellationToken;
use crate::errors::{FailureKind, NodeFailure, PipelineError, StageError};
use crate::graph::{self, NodeKey, NodeSpec, PipelineGraph, StageAction};
use crate::model::{PipelineRequest, StageArtifact};
use crate::policy::RetryPolicy;
use crate::stage::{StageProvider, SummarizeSource};
use crate::state::{replay_key, HistoryStore, InMemoryHistoryStore, StateStore};
use futures::stream::{FuturesUnordered, StreamExt};
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinHandle;
use uuid::Uuid;

type OutputMap = Arc<RwLock<HashMap<NodeKey, StageArtifact>>>;

enum NodeCompletion {
    Succeeded(StageArtifact),
    Failed(NodeFailure),
}

/// Drives pipeline graphs to completion.
///
/// Holds an injected stage provider with a scoped lifecycle; the
/// orchestrator owns no global state and can be created and dropped per
/// worker.
pub struct Orchestrator {
    provider: Arc<dyn StageProvider>,
    policy: RetryPolicy,
    state: Arc<StateStore>,
    history: Arc<dyn HistoryStore>,
}

impl Orchestrator {
    /// Creates an orchestrator with the default policy and fresh in-memory
    /// state and history stores.
    #[must_use]
    pub fn new(provider: Arc<dyn StageProvider>) -> Self {
        Self {
            provider,
            policy: RetryPolicy::default(),
            state: Arc::new(StateStore::new()),
            history: Arc::new(InMemoryHistoryStore::new()),
        }
    }

    /// Sets the retry policy.
    #[must_use]
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Uses a shared state store.
    #[must_use]
    pub fn with_state(mut self, state: Arc<StateStore>) -> Self {
        self.state = state;
        self
    }

    /// Uses a shared history store, enabling replay across restarts.
    #[must_use]
    pub fn with_history(mut self, history: Arc<dyn HistoryStore>) -> Self {
        self.history = history;
        self
    }

    /// The partial-state accessor for this orchestrator's executions.
    #[must_use]
    pub fn state(&self) -> Arc<StateStore> {
        Arc::clone(&self.state)
    }

    /// Validates a request, builds its graph and executes it.
    ///
    /// Returns `Err` only for rejected requests and infrastructure faults;
    /// stage failures surface inside the outcome.
    pub async fn execute(
        &self,
        request: &PipelineRequest,
    ) -> Result<ExecutionOutcome, PipelineError> {
        let built = graph::build(request)?;
        self.execute_graph(Uuid::new_v4(), &built).await
    }

    /// Runs a prebuilt graph under a fixed execution id.
    ///
    /// Re-entrant with respect to substrate replay: a node already recorded
    /// in the history store is restored without re-invoking its stage
    /// function.
    pub async fn execute_graph(
        &self,
        execution_id: Uuid,
        built: &PipelineGraph,
    ) -> Result<ExecutionOutcome, PipelineError> {
        let start = Instant::now();
        self.state.register(execution_id, built);

        let token = Arc::new(CancellationToken::new());
        let deadline_watcher = self.policy.execution_deadline.map(|deadline| {
            let token = Arc::clone(&token);
            tokio::spawn(async move {
                tokio::time::sleep(deadline).await;
                token.cancel("execution deadline exceeded");
            })
        });

        let outputs: OutputMap = Arc::default();
        let mut failures: HashMap<NodeKey, NodeFailure> = HashMap::new();
        let mut unreachable: Vec<NodeKey> = Vec::new();
        let mut terminal: HashSet<NodeKey> = HashSet::new();

        let mut in_degree: HashMap<NodeKey, usize> = built
            .nodes()
            .map(|spec| (spec.key.clone(), spec.dependencies.len()))
            .collect();

        let mut active: FuturesUnordered<JoinHandle<(NodeKey, NodeCompletion)>> =
            FuturesUnordered::new();
        for spec in built.nodes().filter(|spec| spec.dependencies.is_empty()) {
            tracing::debug!(node = %spec.key, "dispatching ready node");
            active.push(self.spawn_node(execution_id, spec.clone(), &outputs, &token));
        }

        let total = built.len();
        while terminal.len() < total {
            if active.is_empty() {
                if token.is_cancelled() {
                    // Nodes that never got scheduled are failed by the
                    // deadline, not unreachable.
                    let reason = token
                        .reason()
                        .unwrap_or_else(|| "execution cancelled".to_owned());
                    for key in built.keys() {
                        if terminal.contains(key) {
                            continue;
                        }
                        let failure =
                            NodeFailure::new(FailureKind::Timeout, reason.clone(), key.stage, 0);
                        self.state.mark_failed(execution_id, key, failure.clone());
                        failures.insert(key.clone(), failure);
                        terminal.insert(key.clone());
                    }
                    break;
                }
                return Err(PipelineError::Internal(format!(
                    "deadlocked graph: {} of {total} nodes finished with nothing in flight",
                    terminal.len()
                )));
            }

            let Some(joined) = active.next().await else {
                continue;
            };
            let (key, completion) = joined.map_err(|err| PipelineError::TaskJoin(err.to_string()))?;
            terminal.insert(key.clone());

            match completion {
                NodeCompletion::Succeeded(_) => {
                    // The task already published its output; unblock dependents.
                    for dependent in built.direct_dependents(&key) {
                        let Some(count) = in_degree.get_mut(&dependent) else {
                            continue;
                        };
                        *count = count.saturating_sub(1);
                        if *count == 0 && !terminal.contains(&dependent) && !token.is_cancelled() {
                            if let Some(spec) = built.node(&dependent) {
                                tracing::debug!(node = %spec.key, "dispatching ready node");
                                active.push(self.spawn_node(
                                    execution_id,
                                    spec.clone(),
                                    &outputs,
                                    &token,
                                ));
                            }
                        }
                    }
                }
                NodeCompletion::Failed(failure) => {
                    tracing::warn!(node = %key, kind = %failure.kind, "node failed");
                    if !token.is_cancelled() {
                        for skipped in built.transitive_dependents(&key) {
                            if terminal.insert(skipped.clone()) {
                                self.state.mark_unreachable(execution_id, &skipped);
                                unreachable.push(skipped);
                            }
                        }
                    }
                    failures.insert(key, failure);
                }
            }
        }

        if let Some(watcher) = deadline_watcher {
            watcher.abort();
        }

        let final_outputs = outputs.read().clone();
        let outcome = ExecutionOutcome {
            execution_id,
            outputs: final_outputs,
            failures,
            unreachable,
            duration_ms: start.elapsed().as_secs_f64() * 1000.0,
        };
        tracing::info!(
            execution = %execution_id,
            succeeded = outcome.outputs.len(),
            failed = outcome.failures.len(),
            unreachable = outcome.unreachable.len(),
            duration_ms = outcome.duration_ms,
            "execution finished"
        );
        Ok(outcome)
    }

    fn spawn_node(
        &self,
        execution_id: Uuid,
        spec: NodeSpec,
        outputs: &OutputMap,
        token: &Arc<CancellationToken>,
    ) -> JoinHandle<(NodeKey, NodeCompletion)> {
        let provider = Arc::clone(&self.provider);
        let policy = self.policy.clone();
        let state = Arc::clone(&self.state);
        let history = Arc::clone(&self.history);
        let outputs = Arc::clone(outputs);
        let token = Arc::clone(token);

        tokio::spawn(async move {
            let key = spec.key.clone();
            let completion = run_node(
                &*provider,
                &policy,
                &state,
                &*history,
                execution_id,
                &spec,
                &outputs,
                &token,
            )
            .await;
            (key, completion)
        })
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_node(
    provider: &dyn StageProvider,
    policy: &RetryPolicy,
    state: &StateStore,
    history: &dyn HistoryStore,
    execution_id: Uuid,
    spec: &NodeSpec,
    outputs: &OutputMap,
    token: &CancellationToken,
) -> NodeCompletion {
    let key = &spec.key;
    let replay = replay_key(execution_id, key);

    if let Some(artifact) = history.get(&replay).await {
        tracing::debug!(node = %key, "restored from history; stage function not re-invoked");
        outputs.write().insert(key.clone(), artifact.clone());
        state.publish(execution_id, key, artifact.clone(), 0);
        return NodeCompletion::Succeeded(artifact);
    }

    let mut attempts = 0_usize;
    loop {
        attempts += 1;
        state.mark_running(execution_id, key, attempts);

        let call = invoke(provider, &spec.action, outputs);
        let result = tokio::select! {
            attempt = tokio::time::timeout(policy.attempt_timeout, call) => {
                attempt.unwrap_or_else(|_| {
                    Err(StageError::Timeout {
                        elapsed_ms: u64::try_from(policy.attempt_timeout.as_millis())
                            .unwrap_or(u64::MAX),
                    })
                })
            }
            () = token.cancelled() => Err(StageError::Cancelled),
        };

        match result {
            Ok(artifact) => {
                // Publish before the orchestrator recomputes the ready set,
                // so observers see the output even if a sibling fails later.
                history.put(&replay, artifact.clone()).await;
                outputs.write().insert(key.clone(), artifact.clone());
                state.publish(execution_id, key, artifact.clone(), attempts);
                return NodeCompletion::Succeeded(artifact);
            }
            Err(StageError::Cancelled) => {
                return fail_cancelled(state, execution_id, key, token, attempts);
            }
            Err(err) => {
                let cap = policy.attempt_cap(&err);
                if !err.is_retryable() || attempts >= cap {
                    let failure = NodeFailure::new(err.kind(), err.to_string(), key.stage, attempts);
                    state.mark_failed(execution_id, key, failure.clone());
                    return NodeCompletion::Failed(failure);
                }

                let delay = policy.delay_for_attempt(attempts);
                tracing::debug!(
                    node = %key,
                    attempt = attempts,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    error = %err,
                    "retrying after failure"
                );
                tokio::select! {
                    () = tokio::time::sleep(delay) => {}
                    () = token.cancelled() => {
                        return fail_cancelled(state, execution_id, key, token, attempts);
                    }
                }
            }
        }
    }
}

// A node cancelled by the execution deadline reports failed-by-timeout,
// never unreachable.
fn fail_cancelled(
    state: &StateStore,
    execution_id: Uuid,
    key: &NodeKey,
    token: &CancellationToken,
    attempts: usize,
) -> NodeCompletion {
    let reason = token
        .reason()
        .unwrap_or_else(|| "execution cancelled".to_owned());
    let failure = NodeFailure::new(FailureKind::Timeout, reason, key.stage, attempts);
    state.mark_failed(execution_id, key, failure.clone());
    NodeCompletion::Failed(failure)
}

async fn invoke(
    provider: &dyn StageProvider,
    action: &StageAction,
    outputs: &OutputMap,
) -> Result<StageArtifact, StageError> {
    match action {
        StageAction::Extract { video_id } => provider
            .extract(video_id)
            .await
            .map(StageArtifact::Transcript),
        StageAction::Translate {
            source,
            target_language,
        } => {
            let upstream = upstream_artifact(outputs, source)?;
            let transcript = upstream.as_transcript().ok_or_else(|| {
                StageError::transient(format!("upstream '{source}' did not produce a transcript"))
            })?;
            provider
                .translate(transcript, target_language)
                .await
                .map(StageArtifact::Translation)
        }
        StageAction::Summarize { source } => {
            let upstream = upstream_artifact(outputs, source)?;
            let summarize_source = match &upstream {
                StageArtifact::Transcript(t) => SummarizeSource::Transcript(t),
                StageArtifact::Translation(t) => SummarizeSource::Translation(t),
                StageArtifact::Summary(_) => {
                    return Err(StageError::transient(format!(
                        "upstream '{source}' produced a summary, expected source text"
                    )))
                }
            };
            provider
                .summarize(summarize_source)
                .await
                .map(StageArtifact::Summary)
        }
        StageAction::TranslateSummary {
            summary,
            target_language,
        } => {
            let upstream = upstream_artifact(outputs, summary)?;
            let source_summary = upstream.as_summary().ok_or_else(|| {
                StageError::transient(format!("upstream '{summary}' did not produce a summary"))
            })?;
            provider
                .translate_summary(source_summary, target_language)
                .await
                .map(StageArtifact::Summary)
        }
    }
}

fn upstream_artifact(outputs: &OutputMap, key: &NodeKey) -> Result<StageArtifact, StageError> {
    outputs.read().get(key).cloned().ok_or_else(|| {
        StageError::transient(format!("output of upstream node '{key}' is not available"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SingleVideoRequest;
    use crate::stage::TemplateStageProvider;

    fn orchestrator() -> Orchestrator {
        Orchestrator::new(Arc::new(TemplateStageProvider::new())).with_policy(
            RetryPolicy::new()
                .with_base_delay_ms(1)
                .with_jitter(crate::policy::JitterStrategy::None),
        )
    }

    #[tokio::test]
    async fn test_single_video_executes_to_completion() {
        let request = SingleVideoRequest::new("demo-001", "es").into();
        let outcome = orchestrator().execute(&request).await.unwrap();

        assert!(outcome.is_complete());
        assert_eq!(outcome.outputs.len(), 3);
        assert!(outcome.artifact(&NodeKey::extract("demo-001")).is_some());
        assert!(outcome
            .artifact(&NodeKey::summarize("demo-001", "es"))
            .is_some());
    }

    #[tokio::test]
    async fn test_validation_failure_surfaces_as_error() {
        let request = SingleVideoRequest::new("demo-001", "de").into();
        let err = orchestrator().execute(&request).await.unwrap_err();

        assert!(matches!(err, PipelineError::Validation(_)));
    }

    #[tokio::test]
    async fn test_execute_graph_is_replay_idempotent() {
        let request = SingleVideoRequest::new("demo-001", "es").into();
        let built = graph::build(&request).unwrap();
        let orchestrator = orchestrator();
        let execution_id = Uuid::new_v4();

        let first = orchestrator
            .execute_graph(execution_id, &built)
            .await
            .unwrap();
        let second = orchestrator
            .execute_graph(execution_id, &built)
            .await
            .unwrap();

        assert!(first.is_complete());
        assert!(second.is_complete());

        // Replayed nodes restore recorded outputs verbatim.
        let extract = NodeKey::extract("demo-001");
        assert_eq!(first.artifact(&extract), second.artifact(&extract));
    }
}
