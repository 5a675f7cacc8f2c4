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

//! # agent-evals
//!
//! An evaluation harness for AI-agent workflows. Declare suites of cases,
//! point them at a target function, and get back a persisted Run with
//! per-case grades, aggregate statistics, and gate verdicts.
//!
//! ## Features
//!
//! - **Trait-based grader system**: deterministic checks, LLM-judge graders,
//!   and boolean composition behind one `Grader` trait
//! - **Fault-tolerant judge parsing**: three fallback layers that never
//!   silently pass on broken judge output
//! - **Byte-stable Run artifacts**: strict-schema JSON designed for
//!   re-grading and run-to-run comparison
//! - **Judge-only re-grading**: iterate on rubric criteria without re-paying
//!   target cost
//!
//! ## Example
//!
//! ```rust,ignore
//! use agent_evals::{FnTarget, GraderConfig, RunOptions, Runner, Suite};
//! use agent_evals::graders::{Contains, Latency, ToolCalled};
//! use agent_evals_core::TargetOutput;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let suite = Suite::new("smoke")
//!         .with_cases(vec![/* ... */])
//!         .with_default_graders(vec![
//!             GraderConfig::new(Contains::new("Response")),
//!             GraderConfig::new(ToolCalled::new("search")).required(),
//!             GraderConfig::new(Latency::new(1000)),
//!         ]);
//!
//!     let target = FnTarget::new(|input| async move {
//!         Ok(TargetOutput::from_text("Response for: hi").with_latency_ms(50))
//!     });
//!
//!     let run = Runner::new(RunOptions::default()).run(&suite, &target).await?;
//!     println!("pass rate: {}", run.summary.pass_rate);
//!     Ok(())
//! }
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

pub mod compare;
pub mod exit;
pub mod gates;
pub mod graders;
pub mod judge;
pub mod loader;
pub mod pipeline;
pub mod runner;
pub mod scoring;
pub mod store;
pub mod suite;

pub use agent_evals_core::{
    Case, CaseCategory, CaseExpected, CategorySummary, GateCheck, GateOutcome, GradeResult, Run,
    RunMode, RunSummary, TargetOutput, TokenUsage, ToolCall, Trial, TrialStatus, SCHEMA_VERSION,
};
pub use compare::{
    compare_runs, CaseDiff, CategoryDelta, CompareOptions, Direction, GateTransition, GraderDiff,
    RunComparison,
};
pub use gates::GateConfig;
pub use judge::{Judge, JudgeError, JudgeMessage, JudgeReply, JudgeRole};
pub use loader::load_cases;
pub use pipeline::{run_pipeline, PipelineOutcome};
pub use runner::{run_judge_only, CaseInput, FnTarget, RunOptions, Runner, Target};
pub use scoring::{score_case, CaseResult};
pub use store::{load_run, save_run, StoreError};
pub use suite::{CaseSource, Suite};

/// Core trait every grader implements
///
/// A grader inspects one target output (plus the case's optional expected
/// reference) and emits a [`GradeResult`]. Graders are pure except for the
/// judge handle carried in the context, never mutate their inputs, and never
/// fail out-of-band: judge transport errors and parse failures are reported
/// inside the result with `pass = false`.
#[async_trait]
pub trait Grader: Send + Sync {
    /// Stable grader name, including factory parameters
    /// (e.g. `contains("Response")`, `toolSequence([search, format], strict)`)
    fn name(&self) -> &str;

    /// Grade one output
    async fn grade(
        &self,
        output: &TargetOutput,
        expected: Option<&CaseExpected>,
        ctx: &GraderContext,
    ) -> GradeResult;
}

/// Ambient context injected into every grader invocation
///
/// The judge handle rides here rather than in global state; per-process
/// concerns like caching or rate limiting live inside the handle itself.
#[derive(Clone)]
pub struct GraderContext {
    pub case_id: String,
    pub suite_id: String,
    pub mode: RunMode,
    pub judge: Option<Arc<dyn Judge>>,
}

impl GraderContext {
    pub fn new(case_id: impl Into<String>, suite_id: impl Into<String>, mode: RunMode) -> Self {
        Self {
            case_id: case_id.into(),
            suite_id: suite_id.into(),
            mode,
            judge: None,
        }
    }

    pub fn with_judge(mut self, judge: Arc<dyn Judge>) -> Self {
        self.judge = Some(judge);
        self
    }
}

/// A grader bound to its scoring policy
///
/// `weight` scales the grader's contribution to the case score, `required`
/// short-circuits the case to a failure when the grader fails, and
/// `threshold` lowers (never raises) the case-level pass bar.
#[derive(Clone)]
pub struct GraderConfig {
    pub grader: Arc<dyn Grader>,
    pub weight: f64,
    pub required: bool,
    pub threshold: Option<f64>,
}

impl GraderConfig {
    /// Bind a grader with default policy (weight 1, not required)
    pub fn new(grader: impl Grader + 'static) -> Self {
        Self::from_arc(Arc::new(grader))
    }

    pub fn from_arc(grader: Arc<dyn Grader>) -> Self {
        Self {
            grader,
            weight: 1.0,
            required: false,
            threshold: None,
        }
    }

    /// Set the scoring weight; must be strictly positive
    pub fn with_weight(mut self, weight: f64) -> Result<Self, ConfigError> {
        if !weight.is_finite() || weight <= 0.0 {
            return Err(ConfigError::InvalidWeight { weight });
        }
        self.weight = weight;
        Ok(self)
    }

    /// Mark this grader as required: if it fails, the case fails with score 0
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Contribute a case-level pass threshold; must lie in [0, 1]
    pub fn with_threshold(mut self, threshold: f64) -> Result<Self, ConfigError> {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(ConfigError::InvalidThreshold { threshold });
        }
        self.threshold = Some(threshold);
        Ok(self)
    }
}

/// Configuration errors, all surfaced before any case executes
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid regex pattern {pattern:?}: {source}")]
    InvalidRegex {
        pattern: String,
        #[source]
        source: Box<regex::Error>,
    },

    #[error("unknown regex flag {flag:?} in {flags:?} (supported: i, m, s, x)")]
    InvalidRegexFlag { flags: String, flag: char },

    #[error("invalid JSON schema: {message}")]
    InvalidSchema { message: String },

    #[error("grader weight must be positive, got {weight}")]
    InvalidWeight { weight: f64 },

    #[error("grader threshold must be in [0, 1], got {threshold}")]
    InvalidThreshold { threshold: f64 },

    #[error("duplicate case id {id:?} in {path}{}", .line.map(|l| format!(" (line {l})")).unwrap_or_default())]
    DuplicateCaseId {
        id: String,
        path: String,
        line: Option<usize>,
    },

    #[error("duplicate case id {id:?} in suite cases")]
    DuplicateInlineCaseId { id: String },

    #[error("unsupported case file extension for {}: expected .jsonl, .yaml, or .yml", .path.display())]
    UnsupportedCaseFile { path: PathBuf },

    #[error("failed to read case file {}: {source}", .path.display())]
    CaseFileIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path} line {line}: {message}")]
    CaseLine {
        path: String,
        line: usize,
        message: String,
    },

    #[error("failed to parse {path}: {message}")]
    CaseFile { path: String, message: String },

    #[error("case file {path} must contain a top-level sequence of cases")]
    NotASequence { path: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graders::Contains;

    #[test]
    fn test_grader_config_defaults() {
        let config = GraderConfig::new(Contains::new("hi"));
        assert_eq!(config.weight, 1.0);
        assert!(!config.required);
        assert!(config.threshold.is_none());
    }

    #[test]
    fn test_invalid_weight_rejected_at_factory_time() {
        let err = GraderConfig::new(Contains::new("hi")).with_weight(0.0);
        assert!(matches!(err, Err(ConfigError::InvalidWeight { .. })));

        let err = GraderConfig::new(Contains::new("hi")).with_weight(-1.0);
        assert!(matches!(err, Err(ConfigError::InvalidWeight { .. })));
    }

    #[test]
    fn test_invalid_threshold_rejected_at_factory_time() {
        let err = GraderConfig::new(Contains::new("hi")).with_threshold(1.1);
        assert!(matches!(err, Err(ConfigError::InvalidThreshold { .. })));
    }
}
