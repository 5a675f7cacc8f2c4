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

//! The persisted Run artifact and its aggregate summary.
//!
//! A Run is written as a single JSON document and read back for re-grading
//! and run-to-run comparison, so everything here is designed for byte-stable
//! serialization: camelCase keys, ordered maps, strict validation on both
//! write and read.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{Trial, TrialStatus, ValidationError};

/// Schema version stamped into every persisted Run
pub const SCHEMA_VERSION: &str = "1.0.0";

/// How the trials in a Run were produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunMode {
    /// Target invoked live for every case
    Live,
    /// Target outputs served from recorded fixtures
    Replay,
    /// Graders re-run over a stored Run's outputs; target never invoked
    JudgeOnly,
}

impl RunMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunMode::Live => "live",
            RunMode::Replay => "replay",
            RunMode::JudgeOnly => "judge-only",
        }
    }
}

/// One evaluated gate: what was measured against what threshold
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct GateCheck {
    /// Gate identifier (`passRate`, `maxCost`, `p95LatencyMs`)
    pub gate: String,

    pub pass: bool,

    /// Observed value from the summary
    pub actual: f64,

    /// Configured threshold
    pub threshold: f64,

    /// Human-readable explanation
    pub reason: String,
}

/// Outcome of evaluating every configured gate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct GateOutcome {
    /// Conjunction of all checks; vacuously true with no gates configured
    pub pass: bool,

    /// Per-gate results in evaluation order
    pub checks: Vec<GateCheck>,
}

impl GateOutcome {
    /// The outcome of an unconfigured gate set
    pub fn vacuous() -> Self {
        Self {
            pass: true,
            checks: Vec::new(),
        }
    }
}

impl Default for GateOutcome {
    fn default() -> Self {
        Self::vacuous()
    }
}

/// Per-category tallies, present only when at least one case is categorized
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CategorySummary {
    pub total: u64,
    pub passed: u64,
    pub failed: u64,
    pub errors: u64,
    pub pass_rate: f64,
}

impl CategorySummary {
    /// Record one trial outcome into this category's tallies
    pub fn record(&mut self, status: TrialStatus) {
        self.total += 1;
        match status {
            TrialStatus::Pass => self.passed += 1,
            TrialStatus::Fail => self.failed += 1,
            TrialStatus::Error => self.errors += 1,
        }
        self.pass_rate = self.passed as f64 / self.total as f64;
    }
}

/// Aggregate statistics over a Run's trials, fully determined by them
/// plus the gate configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RunSummary {
    pub total_cases: u64,
    pub passed: u64,
    pub failed: u64,
    pub errors: u64,

    /// `passed / totalCases`, 0 for an empty run
    pub pass_rate: f64,

    /// Sum of per-trial costs, treating missing cost as 0
    pub total_cost: f64,

    /// Wall-clock duration of the whole run in milliseconds
    pub total_duration_ms: u64,

    /// 95th percentile of trial latencies (nearest-rank, 0 for an empty run)
    pub p95_latency_ms: u64,

    /// Per-category tallies, ordered by category name for stable output
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub by_category: Option<BTreeMap<String, CategorySummary>>,

    pub gate_result: GateOutcome,
}

/// The persisted record of one suite execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Run {
    /// Artifact schema version; readers reject anything else
    pub schema_version: String,

    /// UUID assigned at run start
    pub id: String,

    pub suite_id: String,

    pub mode: RunMode,

    /// Trials in case-declaration order
    pub trials: Vec<Trial>,

    pub summary: RunSummary,

    /// ISO-8601 timestamp of run start
    pub timestamp: String,

    /// 16-hex-char digest over the suite structure (name, case ids, gates)
    pub config_hash: String,

    /// Version of the harness that produced this artifact
    pub framework_version: String,
}

impl Run {
    /// Structural validation applied on both write and read
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.schema_version != SCHEMA_VERSION {
            return Err(ValidationError::SchemaVersion {
                expected: SCHEMA_VERSION,
                found: self.schema_version.clone(),
            });
        }

        if chrono::DateTime::parse_from_rfc3339(&self.timestamp).is_err() {
            return Err(ValidationError::InvalidTimestamp {
                timestamp: self.timestamp.clone(),
            });
        }

        let s = &self.summary;
        if s.total_cases != s.passed + s.failed + s.errors {
            return Err(ValidationError::CountMismatch {
                total: s.total_cases,
                passed: s.passed,
                failed: s.failed,
                errors: s.errors,
            });
        }
        if s.total_cases != self.trials.len() as u64 {
            return Err(ValidationError::TrialCountMismatch {
                summary: s.total_cases,
                trials: self.trials.len(),
            });
        }
        if !(0.0..=1.0).contains(&s.pass_rate) {
            return Err(ValidationError::ScoreOutOfRange {
                field: "summary.passRate",
                value: s.pass_rate,
            });
        }
        if !s.total_cost.is_finite() || s.total_cost < 0.0 {
            return Err(ValidationError::NegativeCost { cost: s.total_cost });
        }

        for trial in &self.trials {
            if !(0.0..=1.0).contains(&trial.score) {
                return Err(ValidationError::ScoreOutOfRange {
                    field: "trial.score",
                    value: trial.score,
                });
            }
            trial.output.validate()?;
            for grade in &trial.grades {
                if !(0.0..=1.0).contains(&grade.score) {
                    return Err(ValidationError::ScoreOutOfRange {
                        field: "grade.score",
                        value: grade.score,
                    });
                }
            }
        }

        Ok(())
    }

    /// Trials keyed by case id, in declaration order
    pub fn trial_for(&self, case_id: &str) -> Option<&Trial> {
        self.trials.iter().find(|t| t.case_id == case_id)
    }
}
