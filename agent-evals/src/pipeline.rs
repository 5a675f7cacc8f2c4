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

//! The per-case grading pipeline.
//!
//! Runs the active grader list sequentially in declared order against one
//! target output, then hands the ordered results to scoring. A non-empty
//! case-level grader list replaces the suite defaults wholesale — the two
//! are never merged.

use agent_evals_core::{CaseExpected, GradeResult, TargetOutput};
use tracing::debug;

use crate::scoring::{score_case, CaseResult};
use crate::{GraderConfig, GraderContext};

/// Ordered grades plus the aggregate verdict for one case
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub grades: Vec<GradeResult>,
    pub result: CaseResult,
}

/// Grade one output through the active grader list
pub async fn run_pipeline(
    output: &TargetOutput,
    expected: Option<&CaseExpected>,
    case_graders: Option<&[GraderConfig]>,
    default_graders: &[GraderConfig],
    ctx: &GraderContext,
) -> PipelineOutcome {
    let active = match case_graders {
        Some(graders) if !graders.is_empty() => graders,
        _ => default_graders,
    };

    let mut grades = Vec::with_capacity(active.len());
    for config in active {
        let grade = config.grader.grade(output, expected, ctx).await;
        debug!(
            case_id = %ctx.case_id,
            grader = %grade.grader_name,
            pass = grade.pass,
            score = grade.score,
            "grader finished"
        );
        grades.push(grade);
    }

    let result = score_case(&grades, active);
    PipelineOutcome { grades, result }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graders::{Contains, Latency};
    use agent_evals_core::RunMode;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    fn ctx() -> GraderContext {
        GraderContext::new("C01", "suite", RunMode::Live)
    }

    fn output() -> TargetOutput {
        TargetOutput::from_text("Response ready").with_latency_ms(10)
    }

    #[tokio::test]
    async fn test_results_are_in_declaration_order() {
        let configs = vec![
            GraderConfig::new(Latency::new(1000)),
            GraderConfig::new(Contains::new("Response")),
        ];

        let outcome = run_pipeline(&output(), None, None, &configs, &ctx()).await;
        assert_eq!(outcome.grades[0].grader_name, "latency(1000)");
        assert_eq!(outcome.grades[1].grader_name, r#"contains("Response")"#);
        assert!(outcome.result.pass);
    }

    /// Grader that records its invocation order
    struct Ordered {
        name: String,
        log: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl crate::Grader for Ordered {
        fn name(&self) -> &str {
            &self.name
        }

        async fn grade(
            &self,
            _output: &TargetOutput,
            _expected: Option<&CaseExpected>,
            _ctx: &GraderContext,
        ) -> GradeResult {
            self.log.lock().unwrap().push(self.name.clone());
            GradeResult::pass(&self.name, "ok")
        }
    }

    #[tokio::test]
    async fn test_graders_execute_sequentially_in_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let configs: Vec<GraderConfig> = ["first", "second", "third"]
            .iter()
            .map(|name| {
                GraderConfig::new(Ordered {
                    name: name.to_string(),
                    log: log.clone(),
                })
            })
            .collect();

        run_pipeline(&output(), None, None, &configs, &ctx()).await;
        assert_eq!(*log.lock().unwrap(), vec!["first", "second", "third"]);
    }

    /// Grader counting invocations, for the replace-vs-merge contract
    struct Counting {
        name: String,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl crate::Grader for Counting {
        fn name(&self) -> &str {
            &self.name
        }

        async fn grade(
            &self,
            _output: &TargetOutput,
            _expected: Option<&CaseExpected>,
            _ctx: &GraderContext,
        ) -> GradeResult {
            self.calls.fetch_add(1, Ordering::SeqCst);
            GradeResult::fail(&self.name, "case grader fails")
        }
    }

    #[tokio::test]
    async fn test_case_graders_replace_suite_defaults() {
        let default_calls = Arc::new(AtomicUsize::new(0));
        let defaults = vec![GraderConfig::new(Counting {
            name: "default".to_string(),
            calls: default_calls.clone(),
        })];

        let case_calls = Arc::new(AtomicUsize::new(0));
        let case_graders = vec![GraderConfig::new(Counting {
            name: "case".to_string(),
            calls: case_calls.clone(),
        })];

        let outcome =
            run_pipeline(&output(), None, Some(&case_graders), &defaults, &ctx()).await;

        assert_eq!(case_calls.load(Ordering::SeqCst), 1);
        assert_eq!(default_calls.load(Ordering::SeqCst), 0, "no merge");
        assert_eq!(outcome.grades.len(), 1);
        assert_eq!(outcome.grades[0].grader_name, "case");
    }

    #[tokio::test]
    async fn test_empty_case_grader_list_falls_back_to_defaults() {
        let default_calls = Arc::new(AtomicUsize::new(0));
        let defaults = vec![GraderConfig::new(Counting {
            name: "default".to_string(),
            calls: default_calls.clone(),
        })];

        run_pipeline(&output(), None, Some(&[]), &defaults, &ctx()).await;
        assert_eq!(default_calls.load(Ordering::SeqCst), 1);
    }
}
