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

//! Hallucinated-number detection.
//!
//! Every number the agent states in its response must be traceable to a
//! number somewhere in its tool results. This catches the classic failure
//! where a model invents a statistic that none of its lookups returned.

use agent_evals_core::{CaseExpected, GradeResult, TargetOutput};
use async_trait::async_trait;
use serde_json::Value;

use crate::{Grader, GraderContext};

/// Checks that every number in the output text is grounded in tool results
///
/// A text number is grounded when some number extracted recursively from any
/// tool call's result is within the relative tolerance. By default, small
/// integers (|n| < 10) and year-like integers (1900–2100) are skipped: they
/// are overwhelmingly list positions, counts, and dates rather than claims.
pub struct NoHallucinatedNumbers {
    tolerance: f64,
    skip_small_integers: bool,
    number_pattern: regex::Regex,
    name: String,
}

impl NoHallucinatedNumbers {
    pub fn new() -> Self {
        Self {
            tolerance: 0.005,
            skip_small_integers: true,
            number_pattern: regex::Regex::new(r"-?\d[\d,.]*\d|\d").expect("static pattern"),
            name: "noHallucinatedNumbers".to_string(),
        }
    }

    /// Relative tolerance for matching (default 0.005)
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Disable the small-integer and year skip rules
    pub fn with_skip_small_integers(mut self, skip: bool) -> Self {
        self.skip_small_integers = skip;
        self
    }

    /// Extract every parseable number from a piece of text
    fn extract_from_text(&self, text: &str) -> Vec<f64> {
        self.number_pattern
            .find_iter(text)
            .filter_map(|m| m.as_str().replace(',', "").parse::<f64>().ok())
            .collect()
    }

    /// Collect numbers from a tool result value: numbers directly, numbers
    /// embedded in strings, and everything reachable through arrays/objects
    fn collect_grounded(&self, value: &Value, into: &mut Vec<f64>) {
        match value {
            Value::Number(n) => {
                if let Some(f) = n.as_f64() {
                    into.push(f);
                }
            }
            Value::String(s) => into.extend(self.extract_from_text(s)),
            Value::Array(items) => {
                for item in items {
                    self.collect_grounded(item, into);
                }
            }
            Value::Object(map) => {
                for item in map.values() {
                    self.collect_grounded(item, into);
                }
            }
            Value::Bool(_) | Value::Null => {}
        }
    }

    fn should_skip(&self, n: f64) -> bool {
        if !self.skip_small_integers {
            return false;
        }
        let is_integer = n.fract() == 0.0;
        is_integer && (n.abs() < 10.0 || (1900.0..=2100.0).contains(&n))
    }

    fn is_grounded(&self, claimed: f64, sources: &[f64]) -> bool {
        sources.iter().any(|&source| {
            if claimed == 0.0 && source == 0.0 {
                return true;
            }
            let denom = claimed.abs().max(source.abs());
            (claimed - source).abs() / denom <= self.tolerance
        })
    }
}

impl Default for NoHallucinatedNumbers {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Grader for NoHallucinatedNumbers {
    fn name(&self) -> &str {
        &self.name
    }

    async fn grade(
        &self,
        output: &TargetOutput,
        _expected: Option<&CaseExpected>,
        _ctx: &GraderContext,
    ) -> GradeResult {
        let text = output.text.as_deref().unwrap_or_default();
        let claimed: Vec<f64> = self
            .extract_from_text(text)
            .into_iter()
            .filter(|&n| !self.should_skip(n))
            .collect();

        if claimed.is_empty() {
            return GradeResult::pass(&self.name, "no numbers to verify");
        }

        let mut sources = Vec::new();
        for call in output.tool_calls.as_deref().unwrap_or_default() {
            if let Some(result) = &call.result {
                self.collect_grounded(result, &mut sources);
            }
        }

        let ungrounded: Vec<f64> = claimed
            .iter()
            .copied()
            .filter(|&n| !self.is_grounded(n, &sources))
            .collect();

        let total = claimed.len();
        let grounded = total - ungrounded.len();
        let score = grounded as f64 / total as f64;

        if ungrounded.is_empty() {
            GradeResult::scored(
                &self.name,
                true,
                score,
                format!("all {total} numbers grounded in tool results"),
            )
        } else {
            let listed: Vec<String> = ungrounded.iter().map(|n| n.to_string()).collect();
            GradeResult::scored(
                &self.name,
                false,
                score,
                format!(
                    "{}/{} numbers not found in tool results: {}",
                    ungrounded.len(),
                    total,
                    listed.join(", ")
                ),
            )
            .with_metadata(serde_json::json!({
                "ungrounded": ungrounded,
                "total": total,
            }))
        }
    }
}
