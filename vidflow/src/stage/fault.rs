//! Injectable faults for exercising failure paths.
//!
//! Faults live in the stage provider, not in business logic: a provider is
//! handed a [`FaultPlan`] at construction and consults it per call. Rules
//! can match a stage, a video, a language, and can fire a bounded number
//! of times before clearing.

use crate::graph::StageKind;
use parking_lot::Mutex;

/// Which failure a fault raises.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    /// Raise a transient error.
    Transient,
    /// Raise a not-found error.
    NotFound,
    /// Produce output the structured parser cannot parse.
    MalformedResponse,
    /// Never return, so the attempt's wall-clock bound trips.
    Hang,
}

/// A single fault rule.
#[derive(Debug, Clone)]
pub struct Fault {
    stage: StageKind,
    kind: FaultKind,
    video_id: Option<String>,
    language: Option<String>,
    remaining: Option<usize>,
}

impl Fault {
    /// Creates a rule that fires on every matching call.
    #[must_use]
    pub fn new(stage: StageKind, kind: FaultKind) -> Self {
        Self {
            stage,
            kind,
            video_id: None,
            language: None,
            remaining: None,
        }
    }

    /// Restricts the rule to one video.
    #[must_use]
    pub fn for_video(mut self, video_id: impl Into<String>) -> Self {
        self.video_id = Some(video_id.into());
        self
    }

    /// Restricts the rule to one language.
    #[must_use]
    pub fn for_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    /// Fires at most `times` times, then clears.
    #[must_use]
    pub fn times(mut self, times: usize) -> Self {
        self.remaining = Some(times);
        self
    }

    fn matches(&self, stage: StageKind, video_id: &str, language: Option<&str>) -> bool {
        if self.stage != stage {
            return false;
        }
        if let Some(ref want) = self.video_id {
            if want != video_id {
                return false;
            }
        }
        if let Some(ref want) = self.language {
            if language != Some(want.as_str()) {
                return false;
            }
        }
        true
    }
}

/// Fault configuration injected into a stage provider for testing.
#[derive(Debug, Default)]
pub struct FaultPlan {
    rules: Mutex<Vec<Fault>>,
}

impl FaultPlan {
    /// Creates an empty plan (no faults).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a rule.
    #[must_use]
    pub fn with_fault(self, fault: Fault) -> Self {
        self.rules.lock().push(fault);
        self
    }

    /// Consumes one firing of the first matching rule, if any.
    pub(crate) fn check(
        &self,
        stage: StageKind,
        video_id: &str,
        language: Option<&str>,
    ) -> Option<FaultKind> {
        let mut rules = self.rules.lock();
        for rule in rules.iter_mut() {
            if !rule.matches(stage, video_id, language) {
                continue;
            }
            match rule.remaining {
                Some(0) => continue,
                Some(ref mut n) => {
                    *n -= 1;
                    return Some(rule.kind);
                }
                None => return Some(rule.kind),
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_plan_never_fires() {
        let plan = FaultPlan::new();
        assert_eq!(plan.check(StageKind::Extract, "v", None), None);
    }

    #[test]
    fn test_stage_and_language_matching() {
        let plan = FaultPlan::new().with_fault(
            Fault::new(StageKind::Translate, FaultKind::Transient).for_language("ja"),
        );

        assert_eq!(
            plan.check(StageKind::Translate, "v", Some("ja")),
            Some(FaultKind::Transient)
        );
        assert_eq!(plan.check(StageKind::Translate, "v", Some("es")), None);
        assert_eq!(plan.check(StageKind::Summarize, "v", Some("ja")), None);
    }

    #[test]
    fn test_video_matching() {
        let plan = FaultPlan::new().with_fault(
            Fault::new(StageKind::Extract, FaultKind::NotFound).for_video("missing-video"),
        );

        assert_eq!(
            plan.check(StageKind::Extract, "missing-video", None),
            Some(FaultKind::NotFound)
        );
        assert_eq!(plan.check(StageKind::Extract, "other-video", None), None);
    }

    #[test]
    fn test_bounded_firing() {
        let plan = FaultPlan::new().with_fault(
            Fault::new(StageKind::Summarize, FaultKind::MalformedResponse).times(2),
        );

        assert!(plan.check(StageKind::Summarize, "v", Some("en")).is_some());
        assert!(plan.check(StageKind::Summarize, "v", Some("en")).is_some());
        assert!(plan.check(StageKind::Summarize, "v", Some("en")).is_none());
    }
}
