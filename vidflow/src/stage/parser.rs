//! Structured response parsing for summarization output.
//!
//! Model-backed summarizers return free text with a JSON payload embedded
//! somewhere inside it. This module owns the contract of turning that text
//! into a [`Summary`]; its heuristics can be hardened without touching the
//! orchestrator.

use crate::errors::StageError;
use crate::model::{Summary, SummarySection};
use regex::Regex;
use serde::Deserialize;
use std::sync::OnceLock;

#[derive(Debug, Deserialize)]
struct RawSummary {
    video_id: String,
    language: String,
    sections: Vec<RawSection>,
}

#[derive(Debug, Deserialize)]
struct RawSection {
    heading: String,
    text: String,
}

#[allow(clippy::unwrap_used)] // literal pattern, cannot fail
fn json_block() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?s)\{.*\}").unwrap())
}

/// Parses a model-style response into a [`Summary`].
///
/// Locates the outermost JSON object in the text, deserializes it and
/// enforces the three-section shape. Anything else is a
/// [`StageError::MalformedResponse`].
pub fn parse_summary(text: &str) -> Result<Summary, StageError> {
    let block = json_block()
        .find(text)
        .ok_or_else(|| StageError::malformed("response contains no JSON object"))?;

    let raw: RawSummary = serde_json::from_str(block.as_str())
        .map_err(|err| StageError::malformed(format!("invalid summary payload: {err}")))?;

    let summary = Summary {
        video_id: raw.video_id,
        language: raw.language,
        sections: raw
            .sections
            .into_iter()
            .map(|s| SummarySection::new(s.heading, s.text))
            .collect(),
    };

    if !summary.is_well_formed() {
        return Err(StageError::malformed(format!(
            "expected {} non-empty sections, got {}",
            Summary::EXPECTED_SECTIONS,
            summary.sections.len()
        )));
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn wrapped(payload: &serde_json::Value) -> String {
        format!("Here is the structured summary you asked for.\n{payload}\nLet me know if you need more detail.")
    }

    fn valid_payload() -> serde_json::Value {
        serde_json::json!({
            "video_id": "demo-001",
            "language": "en",
            "sections": [
                {"heading": "Overview", "text": "The video presents product updates."},
                {"heading": "Key takeaways", "text": "Recent progress was highlighted."},
                {"heading": "Follow-up actions", "text": "Schedule a review."},
            ],
        })
    }

    #[test]
    fn test_parses_embedded_json() {
        let summary = parse_summary(&wrapped(&valid_payload())).unwrap();

        assert_eq!(summary.video_id, "demo-001");
        assert_eq!(summary.language, "en");
        assert_eq!(summary.sections.len(), 3);
        assert_eq!(summary.sections[0].heading, "Overview");
    }

    #[test]
    fn test_parses_bare_json() {
        let summary = parse_summary(&valid_payload().to_string()).unwrap();
        assert_eq!(summary.sections.len(), 3);
    }

    #[test]
    fn test_rejects_prose_without_json() {
        let err = parse_summary("I could not produce a summary, sorry.").unwrap_err();
        assert!(matches!(err, StageError::MalformedResponse { .. }));
    }

    #[test]
    fn test_rejects_truncated_json() {
        let text = wrapped(&valid_payload());
        let truncated = &text[..text.len() / 2];
        let err = parse_summary(truncated).unwrap_err();
        assert!(matches!(err, StageError::MalformedResponse { .. }));
    }

    #[test]
    fn test_rejects_wrong_section_count() {
        let payload = serde_json::json!({
            "video_id": "demo-001",
            "language": "en",
            "sections": [
                {"heading": "Overview", "text": "Only one section."},
            ],
        });
        let err = parse_summary(&wrapped(&payload)).unwrap_err();
        assert!(matches!(err, StageError::MalformedResponse { .. }));
    }

    #[test]
    fn test_rejects_blank_sections() {
        let payload = serde_json::json!({
            "video_id": "demo-001",
            "language": "en",
            "sections": [
                {"heading": "Overview", "text": "Fine."},
                {"heading": "", "text": "Heading is missing."},
                {"heading": "Follow-up actions", "text": "Fine."},
            ],
        });
        let err = parse_summary(&wrapped(&payload)).unwrap_err();
        assert!(matches!(err, StageError::MalformedResponse { .. }));
    }
}
