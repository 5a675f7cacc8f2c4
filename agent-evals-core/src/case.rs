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

//! Case definitions: one input with an optional ground-truth reference.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ToolCall;

/// Coarse scenario classification, used for per-category breakdowns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseCategory {
    HappyPath,
    EdgeCase,
    Adversarial,
    MultiStep,
    Regression,
}

impl CaseCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            CaseCategory::HappyPath => "happy_path",
            CaseCategory::EdgeCase => "edge_case",
            CaseCategory::Adversarial => "adversarial",
            CaseCategory::MultiStep => "multi_step",
            CaseCategory::Regression => "regression",
        }
    }
}

/// Ground-truth reference consumed by graders
///
/// A capability bag: each grader reads the fields it needs and ignores the
/// rest. Nothing here is required.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CaseExpected {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Map<String, Value>>,
}

impl CaseExpected {
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn with_tool_calls(mut self, calls: Vec<ToolCall>) -> Self {
        self.tool_calls = Some(calls);
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Map<String, Value>) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// One evaluation case: an input, an id, and optional expectations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Case {
    /// Unique within a loaded case set; duplicates are rejected at load time
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Input mapping handed verbatim to the target
    pub input: serde_json::Map<String, Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected: Option<CaseExpected>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<CaseCategory>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

impl Case {
    /// Create a case from an id and input mapping
    pub fn new(id: impl Into<String>, input: serde_json::Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            description: None,
            input,
            expected: None,
            category: None,
            tags: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_expected(mut self, expected: CaseExpected) -> Self {
        self.expected = Some(expected);
        self
    }

    pub fn with_category(mut self, category: CaseCategory) -> Self {
        self.category = Some(category);
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = Some(tags);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn input(pairs: &[(&str, Value)]) -> serde_json::Map<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_category_wire_format() {
        let json = serde_json::to_string(&CaseCategory::HappyPath).unwrap();
        assert_eq!(json, r#""happy_path""#);

        let parsed: CaseCategory = serde_json::from_str(r#""multi_step""#).unwrap();
        assert_eq!(parsed, CaseCategory::MultiStep);
    }

    #[test]
    fn test_case_round_trip() {
        let case = Case::new("C01", input(&[("query", json!("hi"))]))
            .with_expected(CaseExpected::from_text("hello"))
            .with_category(CaseCategory::EdgeCase)
            .with_tags(vec!["smoke".to_string()]);

        let encoded = serde_json::to_string(&case).unwrap();
        let back: Case = serde_json::from_str(&encoded).unwrap();
        assert_eq!(back, case);
    }

    #[test]
    fn test_unknown_category_rejected() {
        let parsed: Result<CaseCategory, _> = serde_json::from_str(r#""nonsense""#);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_case_rejects_unknown_keys() {
        let raw = r#"{"id": "C01", "input": {}, "grader": "nope"}"#;
        let parsed: Result<Case, _> = serde_json::from_str(raw);
        assert!(parsed.is_err());
    }
}
