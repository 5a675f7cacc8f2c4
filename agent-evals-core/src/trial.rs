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

//! Trial records: the outcome of executing one case.

use serde::{Deserialize, Serialize};

use crate::{GradeResult, TargetOutput};

/// Terminal state of one case execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrialStatus {
    /// The case scored at or above its threshold
    Pass,
    /// The case ran but scored below threshold (or a required grader failed)
    Fail,
    /// The target threw or timed out; no grades were produced
    Error,
}

impl TrialStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrialStatus::Pass => "pass",
            TrialStatus::Fail => "fail",
            TrialStatus::Error => "error",
        }
    }

    /// Whether this status counts toward the passed tally
    pub fn is_pass(&self) -> bool {
        matches!(self, TrialStatus::Pass)
    }
}

/// Record of one case's execution: status, output, grades, aggregate score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Trial {
    pub case_id: String,

    pub status: TrialStatus,

    /// The target's output, or a synthesized one describing the failure
    pub output: TargetOutput,

    /// Grader results in declared grader order; empty for error trials
    pub grades: Vec<GradeResult>,

    /// Aggregate case score from the scoring step
    pub score: f64,

    /// Wall-clock duration of the target invocation in milliseconds
    pub duration_ms: u64,

    /// Position for multi-trial evaluations, when applicable
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trial_index: Option<u32>,
}

impl Trial {
    /// Build an error trial for a target that threw
    pub fn target_error(case_id: impl Into<String>, message: &str, duration_ms: u64) -> Self {
        Self::synthesized_error(case_id, format!("Target error: {message}"), duration_ms)
    }

    /// Build an error trial for a target that exceeded its timeout
    pub fn target_timeout(case_id: impl Into<String>, timeout_ms: u64, duration_ms: u64) -> Self {
        Self::synthesized_error(case_id, format!("Timeout after {timeout_ms}ms"), duration_ms)
    }

    fn synthesized_error(case_id: impl Into<String>, text: String, duration_ms: u64) -> Self {
        Self {
            case_id: case_id.into(),
            status: TrialStatus::Error,
            output: TargetOutput::from_text(text).with_latency_ms(duration_ms),
            grades: Vec::new(),
            score: 0.0,
            duration_ms,
            trial_index: None,
        }
    }

    pub fn with_trial_index(mut self, index: u32) -> Self {
        self.trial_index = Some(index);
        self
    }
}
