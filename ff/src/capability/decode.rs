//! Decoding capability output into a stage's schema

use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;

use super::AgentOutput;

/// How much of a rejected output is kept in the error
const PREVIEW_CHARS: usize = 200;

/// Capability output did not match the expected schema
///
/// Not fatal on its own: the stage reports ERROR and the orchestrator
/// decides whether to re-enter it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("expected structured output, got free text: {0}")]
    NotStructured(String),

    #[error("output does not match schema: {0}")]
    Schema(String),

    #[error("output contains no {0}")]
    Empty(&'static str),
}

/// Decode agent output into `T`
///
/// Structured output is decoded directly. Free text is accepted only if it
/// is the schema's JSON, optionally wrapped in a fenced code block.
pub fn decode<T: DeserializeOwned>(output: AgentOutput) -> Result<T, DecodeError> {
    match output {
        AgentOutput::Structured(value) => {
            debug!("decode: structured output");
            serde_json::from_value(value).map_err(|e| DecodeError::Schema(e.to_string()))
        }
        AgentOutput::Text(text) => {
            debug!(text_len = text.len(), "decode: free text output");
            let candidate = strip_code_fence(&text);
            let value: serde_json::Value =
                serde_json::from_str(candidate).map_err(|_| DecodeError::NotStructured(preview(&text)))?;
            serde_json::from_value(value).map_err(|e| DecodeError::Schema(e.to_string()))
        }
    }
}

/// Return the body of a ```json fenced block, or the trimmed text
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(start) = trimmed.find("```") else {
        return trimmed;
    };
    let after = &trimmed[start + 3..];
    // skip the info string (e.g. "json") up to the first newline
    let body = match after.find('\n') {
        Some(nl) => &after[nl + 1..],
        None => after,
    };
    match body.find("```") {
        Some(end) => body[..end].trim(),
        None => body.trim(),
    }
}

fn preview(text: &str) -> String {
    let mut preview: String = text.chars().take(PREVIEW_CHARS).collect();
    if text.chars().count() > PREVIEW_CHARS {
        preview.push_str("...");
    }
    preview
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::{AcceptanceCriteriaOutput, ReviewOutput};
    use serde_json::json;

    #[test]
    fn test_decode_structured() {
        let out: ReviewOutput = decode(AgentOutput::Structured(json!({
            "feedback": "add edge case",
            "needs_review": true
        })))
        .unwrap();
        assert!(out.needs_review);
        assert_eq!(out.feedback, "add edge case");
    }

    #[test]
    fn test_decode_structured_schema_mismatch() {
        let result: Result<AcceptanceCriteriaOutput, _> =
            decode(AgentOutput::Structured(json!({ "criteria": ["x"] })));
        assert!(matches!(result, Err(DecodeError::Schema(_))));
    }

    #[test]
    fn test_decode_plain_json_text() {
        let out: AcceptanceCriteriaOutput =
            decode(AgentOutput::Text(r#"{"acceptance_criteria": ["a", "b"]}"#.to_string())).unwrap();
        assert_eq!(out.acceptance_criteria, vec!["a", "b"]);
    }

    #[test]
    fn test_decode_fenced_json_text() {
        let text = "Here you go:\n```json\n{\"feedback\": \"fine\"}\n```\n";
        let out: ReviewOutput = decode(AgentOutput::Text(text.to_string())).unwrap();
        assert_eq!(out.feedback, "fine");
        assert!(!out.needs_review);
    }

    #[test]
    fn test_decode_free_text_is_not_structured() {
        let result: Result<ReviewOutput, _> = decode(AgentOutput::Text("The criteria look fine to me.".to_string()));
        assert!(matches!(result, Err(DecodeError::NotStructured(ref s)) if s.contains("look fine")));
    }

    #[test]
    fn test_preview_truncates() {
        let long = "x".repeat(PREVIEW_CHARS + 50);
        let p = preview(&long);
        assert!(p.ends_with("..."));
        assert_eq!(p.chars().count(), PREVIEW_CHARS + 3);
    }
}
