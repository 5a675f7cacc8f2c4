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

//! The uniform result record every grader emits.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Outcome of one grader invocation
///
/// `pass` and `score` are independent: a grader may pass with a partial
/// score (e.g. most numbers grounded) or fail while still reporting how
/// close it came.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct GradeResult {
    /// Binary verdict for this grader
    pub pass: bool,

    /// Graded quality in [0, 1]
    pub score: f64,

    /// Human-readable explanation of the verdict
    pub reason: String,

    /// Name of the grader that produced this result, including factory
    /// parameters (e.g. `contains("Response")`)
    pub grader_name: String,

    /// Grader-specific extras (judge reasoning, per-item details, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl GradeResult {
    /// A passing result with full score
    pub fn pass(grader_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            pass: true,
            score: 1.0,
            reason: reason.into(),
            grader_name: grader_name.into(),
            metadata: None,
        }
    }

    /// A failing result with zero score
    pub fn fail(grader_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            pass: false,
            score: 0.0,
            reason: reason.into(),
            grader_name: grader_name.into(),
            metadata: None,
        }
    }

    /// A result with an explicit verdict and score
    pub fn scored(
        grader_name: impl Into<String>,
        pass: bool,
        score: f64,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            pass,
            score: score.clamp(0.0, 1.0),
            reason: reason.into(),
            grader_name: grader_name.into(),
            metadata: None,
        }
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}
