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

//! # agent-evals core contracts
//!
//! Persisted shapes shared between the evaluation engine and anything that
//! stores, re-grades, or compares evaluation runs: target outputs, cases,
//! grades, trials, and the Run artifact itself.
//!
//! Everything here is a plain serde contract. The types serialize with
//! camelCase keys, reject unknown fields, and round-trip losslessly through
//! JSON — a Run written today must compare byte-for-byte against the same
//! Run re-serialized years later.

use thiserror::Error;

mod case;
mod grade;
mod output;
mod run;
mod trial;

pub use case::{Case, CaseCategory, CaseExpected};
pub use grade::GradeResult;
pub use output::{TargetOutput, TokenUsage, ToolCall};
pub use run::{
    CategorySummary, GateCheck, GateOutcome, Run, RunMode, RunSummary, SCHEMA_VERSION,
};
pub use trial::{Trial, TrialStatus};

/// Structural violations caught by contract validation
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("unsupported schema version: expected {expected}, found {found}")]
    SchemaVersion {
        expected: &'static str,
        found: String,
    },

    #[error("summary counts do not add up: total {total} != passed {passed} + failed {failed} + errors {errors}")]
    CountMismatch {
        total: u64,
        passed: u64,
        failed: u64,
        errors: u64,
    },

    #[error("summary.totalCases {summary} does not match trial count {trials}")]
    TrialCountMismatch { summary: u64, trials: usize },

    #[error("{field} out of range [0, 1]: {value}")]
    ScoreOutOfRange { field: &'static str, value: f64 },

    #[error("cost must be a non-negative finite number, got {cost}")]
    NegativeCost { cost: f64 },

    #[error("timestamp is not valid ISO-8601: {timestamp:?}")]
    InvalidTimestamp { timestamp: String },
}
