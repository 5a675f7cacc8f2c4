// Copyright 2025 AgentEvals (https://github.com/agent-evals)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Judge response parsing.
//!
//! Judges are instructed to reply with `{"reasoning": ..., "score": 1..4}`
//! and nothing else, but models wrap JSON in markdown fences, narrate around
//! it, or answer in prose. Three layers recover from that, strictest first:
//!
//! 1. the whole reply is JSON;
//! 2. JSON extracted from a ```json fence or the outermost `{…}` span;
//! 3. a `Score: N` / `Rating: N` text pattern with labeled or leading prose
//!    as the reasoning.
//!
//! A reply no layer can interpret is a structured error. Callers must
//! surface that as a failing grade; the parser itself can never produce a
//! passing default.

use std::sync::OnceLock;

use serde_json::Value;
use thiserror::Error;

/// Maximum reasoning length retained from a judge reply
const MAX_REASONING_CHARS: usize = 2000;

/// Accepted spellings of the score field
const SCORE_FIELDS: [&str; 3] = ["score", "rating", "total_rating"];

/// Accepted spellings of the reasoning field
const REASONING_FIELDS: [&str; 4] = ["reasoning", "evaluation", "explanation", "rationale"];

/// A successfully parsed judge verdict
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JudgeVerdict {
    /// Non-empty reasoning, truncated to 2000 chars
    pub reasoning: String,

    /// Integer score in 1..=4
    pub score: u8,
}

/// Structured failure carrying the raw reply for diagnostics
#[derive(Debug, Error)]
#[error("could not parse judge response: {message}")]
pub struct JudgeParseError {
    pub message: String,
    pub raw: String,
}

impl JudgeParseError {
    fn new(message: impl Into<String>, raw: &str) -> Self {
        Self {
            message: message.into(),
            raw: raw.to_string(),
        }
    }
}

fn fence_pattern() -> &'static regex::Regex {
    static PATTERN: OnceLock<regex::Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        regex::RegexBuilder::new(r"```json\s*(.*?)```")
            .case_insensitive(true)
            .dot_matches_new_line(true)
            .build()
            .expect("static pattern")
    })
}

fn score_pattern() -> &'static regex::Regex {
    static PATTERN: OnceLock<regex::Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        // The full digit run is captured and validated in code: "Score: 10"
        // must not be read as a 1.
        regex::RegexBuilder::new(r"\b(?:score|rating)\s*[:=]?\s*(-?\d+(?:\.\d+)?)")
            .case_insensitive(true)
            .build()
            .expect("static pattern")
    })
}

fn reasoning_pattern() -> &'static regex::Regex {
    static PATTERN: OnceLock<regex::Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        regex::RegexBuilder::new(
            r"\b(?:reasoning|evaluation|explanation)\s*[:=]\s*(.+?)(?:\n\s*(?:score|rating)\b|$)",
        )
        .case_insensitive(true)
        .dot_matches_new_line(true)
        .build()
        .expect("static pattern")
    })
}

/// Parse free-form judge text into a verdict
pub fn parse_judge_response(text: &str) -> Result<JudgeVerdict, JudgeParseError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(JudgeParseError::new("judge response is empty", text));
    }

    // Layer 1: the whole reply is JSON
    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        if let Some(verdict) = verdict_from_json(&value) {
            return Ok(verdict);
        }
    }

    // Layer 2: JSON embedded in a fence or brace span
    if let Some(candidate) = extract_json_candidate(trimmed) {
        if let Ok(value) = serde_json::from_str::<Value>(&candidate) {
            if let Some(verdict) = verdict_from_json(&value) {
                return Ok(verdict);
            }
        }
    }

    // Layer 3: text pattern
    if let Some(verdict) = verdict_from_text(trimmed) {
        return Ok(verdict);
    }

    Err(JudgeParseError::new(
        "no layer could extract a reasoning and an integer score in 1-4",
        text,
    ))
}

/// Pull a JSON candidate out of surrounding prose
fn extract_json_candidate(text: &str) -> Option<String> {
    if let Some(captures) = fence_pattern().captures(text) {
        return Some(captures[1].trim().to_string());
    }

    // Outermost brace span: first '{' greedy to last '}'
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end > start {
        Some(text[start..=end].to_string())
    } else {
        None
    }
}

/// Shared validation over a parsed JSON value
fn verdict_from_json(value: &Value) -> Option<JudgeVerdict> {
    let object = value.as_object()?;

    let score_value = SCORE_FIELDS.iter().find_map(|field| object.get(*field))?;
    let score = integer_score(score_value)?;

    let reasoning_value = REASONING_FIELDS
        .iter()
        .find_map(|field| object.get(*field))?;
    let reasoning = normalize_reasoning(reasoning_value.as_str()?)?;

    Some(JudgeVerdict { reasoning, score })
}

/// A score is valid only as an integer (or integral float) in 1..=4
fn integer_score(value: &Value) -> Option<u8> {
    let number = value.as_f64()?;
    if number.fract() != 0.0 {
        return None;
    }
    let score = number as i64;
    (1..=4).contains(&score).then_some(score as u8)
}

fn normalize_reasoning(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.chars().take(MAX_REASONING_CHARS).collect())
}

/// Layer 3: recover a verdict from plain prose
fn verdict_from_text(text: &str) -> Option<JudgeVerdict> {
    let score_match = score_pattern().captures(text)?;
    let number: f64 = score_match[1].parse().ok()?;
    let score = integer_score(&Value::from(number))?;

    let reasoning = match reasoning_pattern().captures(text) {
        Some(captures) => normalize_reasoning(&captures[1]),
        None => {
            // Everything before the score line
            let score_start = score_match.get(0).map(|m| m.start()).unwrap_or(0);
            normalize_reasoning(&text[..score_start])
        }
    }?;

    Some(JudgeVerdict { reasoning, score })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strict_json() {
        let verdict = parse_judge_response(r#"{"reasoning":"x","score":3}"#).unwrap();
        assert_eq!(verdict.score, 3);
        assert_eq!(verdict.reasoning, "x");
    }

    #[test]
    fn test_fenced_json() {
        let verdict =
            parse_judge_response("```json\n{\"reasoning\":\"y\",\"score\":4}\n```").unwrap();
        assert_eq!(verdict.score, 4);
        assert_eq!(verdict.reasoning, "y");
    }

    #[test]
    fn test_embedded_json_without_fence() {
        let text = "Here is my evaluation:\n{\"reasoning\": \"solid answer\", \"score\": 2} hope that helps";
        let verdict = parse_judge_response(text).unwrap();
        assert_eq!(verdict.score, 2);
        assert_eq!(verdict.reasoning, "solid answer");
    }

    #[test]
    fn test_text_pattern() {
        let verdict = parse_judge_response("Reasoning: ok\nScore: 2").unwrap();
        assert_eq!(verdict.score, 2);
        assert_eq!(verdict.reasoning, "ok");
    }

    #[test]
    fn test_leading_prose_becomes_reasoning() {
        let verdict =
            parse_judge_response("The answer covers all key points.\n\nScore: 4").unwrap();
        assert_eq!(verdict.score, 4);
        assert_eq!(verdict.reasoning, "The answer covers all key points.");
    }

    #[test]
    fn test_score_ten_is_rejected_not_read_as_one() {
        let err = parse_judge_response("Score: 10").unwrap_err();
        assert!(!err.message.is_empty());
    }

    #[test]
    fn test_empty_input_fails_with_message() {
        let err = parse_judge_response("").unwrap_err();
        assert!(!err.message.is_empty());
        assert_eq!(err.raw, "");
    }

    #[test]
    fn test_score_out_of_range_fails() {
        assert!(parse_judge_response(r#"{"reasoning":"x","score":5}"#).is_err());
        assert!(parse_judge_response(r#"{"reasoning":"x","score":0}"#).is_err());
    }

    #[test]
    fn test_fractional_score_fails() {
        assert!(parse_judge_response(r#"{"reasoning":"x","score":3.5}"#).is_err());
        assert!(parse_judge_response("Reasoning: fine\nScore: 3.5").is_err());
    }

    #[test]
    fn test_integral_float_score_accepted() {
        let verdict = parse_judge_response(r#"{"reasoning":"x","score":3.0}"#).unwrap();
        assert_eq!(verdict.score, 3);
    }

    #[test]
    fn test_alternate_field_names() {
        let verdict = parse_judge_response(r#"{"rationale":"solid","rating":4}"#).unwrap();
        assert_eq!(verdict.score, 4);
        assert_eq!(verdict.reasoning, "solid");

        let verdict = parse_judge_response(r#"{"evaluation":"meh","total_rating":2}"#).unwrap();
        assert_eq!(verdict.score, 2);
    }

    #[test]
    fn test_empty_reasoning_fails() {
        assert!(parse_judge_response(r#"{"reasoning":"  ","score":3}"#).is_err());
        assert!(parse_judge_response("Score: 3").is_err());
    }

    #[test]
    fn test_reasoning_truncated_to_limit() {
        let long = "a".repeat(5000);
        let text = format!(r#"{{"reasoning":"{long}","score":1}}"#);
        let verdict = parse_judge_response(&text).unwrap();
        assert_eq!(verdict.reasoning.len(), MAX_REASONING_CHARS);
    }

    #[test]
    fn test_rating_label_in_text_layer() {
        let verdict = parse_judge_response("Evaluation: decent work\nRating: 3").unwrap();
        assert_eq!(verdict.score, 3);
        assert_eq!(verdict.reasoning, "decent work");
    }

    #[test]
    fn test_never_succeeds_outside_one_to_four() {
        for text in ["Score: 0", "Score: -2", "Score: 42", r#"{"reasoning":"x","score":99}"#] {
            assert!(parse_judge_response(text).is_err(), "input: {text}");
        }
    }

    #[test]
    fn test_multiline_labeled_reasoning_stops_at_score_line() {
        let text = "Reasoning: first line\nsecond line\nScore: 2";
        let verdict = parse_judge_response(text).unwrap();
        assert_eq!(verdict.reasoning, "first line\nsecond line");
        assert_eq!(verdict.score, 2);
    }

    #[test]
    fn test_error_carries_raw_text() {
        let err = parse_judge_response("total nonsense").unwrap_err();
        assert_eq!(err.raw, "total nonsense");
    }
}
