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

//! Suite execution.
//!
//! The runner drives cases through target + pipeline strictly sequentially,
//! in declaration order — that ordering is part of the public contract, not
//! an implementation detail. Each target invocation runs under a timeout;
//! a throw or timeout becomes an `error` trial and the run carries on.
//! Judge-only mode re-grades a stored Run's outputs without ever touching
//! the target.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};

use agent_evals_core::{
    Case, CaseCategory, CaseExpected, CategorySummary, Run, RunMode, RunSummary, TargetOutput,
    Trial, TrialStatus, SCHEMA_VERSION,
};
use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use futures::future::{BoxFuture, FutureExt};
use sha2::{Digest, Sha256};
use tracing::{info, warn};
use uuid::Uuid;

use crate::gates::{evaluate_gates, GateConfig};
use crate::judge::Judge;
use crate::pipeline::run_pipeline;
use crate::suite::Suite;
use crate::{ConfigError, GraderContext};

/// Input mapping handed to the target for one case
pub type CaseInput = serde_json::Map<String, serde_json::Value>;

/// The function under evaluation
///
/// Anything the target raises is isolated per case: the runner records an
/// `error` trial and moves on.
#[async_trait]
pub trait Target: Send + Sync {
    async fn invoke(&self, input: &CaseInput) -> anyhow::Result<TargetOutput>;
}

/// Adapts an async closure into a [`Target`]
pub struct FnTarget {
    f: Box<dyn Fn(CaseInput) -> BoxFuture<'static, anyhow::Result<TargetOutput>> + Send + Sync>,
}

impl FnTarget {
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn(CaseInput) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = anyhow::Result<TargetOutput>> + Send + 'static,
    {
        Self {
            f: Box::new(move |input| f(input).boxed()),
        }
    }
}

#[async_trait]
impl Target for FnTarget {
    async fn invoke(&self, input: &CaseInput) -> anyhow::Result<TargetOutput> {
        (self.f)(input.clone()).await
    }
}

/// Execution options for one run
#[derive(Clone)]
pub struct RunOptions {
    pub mode: RunMode,

    /// Per-case target timeout in milliseconds
    pub timeout_ms: u64,

    /// Judge handle injected into grader context
    pub judge: Option<Arc<dyn Judge>>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            mode: RunMode::Live,
            timeout_ms: 30_000,
            judge: None,
        }
    }
}

impl RunOptions {
    pub fn with_mode(mut self, mode: RunMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn with_judge(mut self, judge: Arc<dyn Judge>) -> Self {
        self.judge = Some(judge);
        self
    }
}

/// Executes suites into Run artifacts
pub struct Runner {
    options: RunOptions,
}

impl Runner {
    pub fn new(options: RunOptions) -> Self {
        Self { options }
    }

    /// Run every case of the suite against the target
    pub async fn run(&self, suite: &Suite, target: &dyn Target) -> Result<Run, ConfigError> {
        let cases = suite.resolve_cases()?;
        let run_id = Uuid::new_v4().to_string();
        let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        let started = Instant::now();
        let timeout = Duration::from_millis(self.options.timeout_ms);

        info!(suite_id = %suite.id, cases = cases.len(), run_id = %run_id, "starting run");

        let mut trials = Vec::with_capacity(cases.len());
        for case in &cases {
            let case_started = Instant::now();
            let invocation = tokio::time::timeout(timeout, target.invoke(&case.input)).await;
            let duration_ms = case_started.elapsed().as_millis() as u64;

            let trial = match invocation {
                Err(_) => {
                    warn!(case_id = %case.id, timeout_ms = self.options.timeout_ms, "target timed out");
                    Trial::target_timeout(&case.id, self.options.timeout_ms, duration_ms)
                }
                Ok(Err(err)) => {
                    warn!(case_id = %case.id, error = %err, "target failed");
                    Trial::target_error(&case.id, &format!("{err:#}"), duration_ms)
                }
                Ok(Ok(output)) => {
                    self.grade_case(suite, case, output, duration_ms).await
                }
            };

            info!(
                case_id = %case.id,
                status = trial.status.as_str(),
                score = trial.score,
                "case finished"
            );
            trials.push(trial);
        }

        let categories = category_lookup(&cases);
        let summary = compute_summary(
            &trials,
            &categories,
            started.elapsed().as_millis() as u64,
            suite.gates.as_ref(),
        );

        Ok(Run {
            schema_version: SCHEMA_VERSION.to_string(),
            id: run_id,
            suite_id: suite.id.clone(),
            mode: self.options.mode,
            trials,
            summary,
            timestamp,
            config_hash: config_hash(suite, &cases),
            framework_version: env!("CARGO_PKG_VERSION").to_string(),
        })
    }

    async fn grade_case(
        &self,
        suite: &Suite,
        case: &Case,
        output: TargetOutput,
        duration_ms: u64,
    ) -> Trial {
        let mut ctx = GraderContext::new(&case.id, &suite.id, self.options.mode);
        if let Some(judge) = &self.options.judge {
            ctx = ctx.with_judge(judge.clone());
        }

        // Case-level grader overrides are plumbed through the pipeline but
        // not yet exposed on Case itself; callers always pass None here.
        let outcome =
            run_pipeline(&output, case.expected.as_ref(), None, &suite.default_graders, &ctx)
                .await;

        let status = if outcome.result.pass {
            TrialStatus::Pass
        } else {
            TrialStatus::Fail
        };

        Trial {
            case_id: case.id.clone(),
            status,
            output,
            grades: outcome.grades,
            score: outcome.result.score,
            duration_ms,
            trial_index: None,
        }
    }
}

/// Re-grade a stored Run's outputs with the current suite configuration
///
/// The target is never invoked: each stored trial's preserved output goes
/// back through the pipeline with the current default graders, the current
/// expected values (looked up by case id), and the judge from `options`.
/// Output, duration, and trial index are carried over unchanged.
pub async fn run_judge_only(
    previous: &Run,
    suite: &Suite,
    options: &RunOptions,
) -> Result<Run, ConfigError> {
    let cases = suite.resolve_cases()?;
    let expected_by_id: HashMap<&str, &CaseExpected> = cases
        .iter()
        .filter_map(|c| c.expected.as_ref().map(|e| (c.id.as_str(), e)))
        .collect();

    let run_id = Uuid::new_v4().to_string();
    let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
    let started = Instant::now();

    info!(
        suite_id = %suite.id,
        previous_run = %previous.id,
        trials = previous.trials.len(),
        "starting judge-only re-grade"
    );

    let mut trials = Vec::with_capacity(previous.trials.len());
    for stored in &previous.trials {
        let mut ctx = GraderContext::new(&stored.case_id, &suite.id, RunMode::JudgeOnly);
        if let Some(judge) = &options.judge {
            ctx = ctx.with_judge(judge.clone());
        }

        let expected = expected_by_id.get(stored.case_id.as_str()).copied();
        let outcome =
            run_pipeline(&stored.output, expected, None, &suite.default_graders, &ctx).await;

        let status = if outcome.result.pass {
            TrialStatus::Pass
        } else {
            TrialStatus::Fail
        };

        trials.push(Trial {
            case_id: stored.case_id.clone(),
            status,
            output: stored.output.clone(),
            grades: outcome.grades,
            score: outcome.result.score,
            duration_ms: stored.duration_ms,
            trial_index: stored.trial_index,
        });
    }

    let categories = category_lookup(&cases);
    let summary = compute_summary(
        &trials,
        &categories,
        started.elapsed().as_millis() as u64,
        suite.gates.as_ref(),
    );

    Ok(Run {
        schema_version: SCHEMA_VERSION.to_string(),
        id: run_id,
        suite_id: suite.id.clone(),
        mode: RunMode::JudgeOnly,
        trials,
        summary,
        timestamp,
        config_hash: config_hash(suite, &cases),
        framework_version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

fn category_lookup(cases: &[Case]) -> HashMap<&str, CaseCategory> {
    cases
        .iter()
        .filter_map(|c| c.category.map(|cat| (c.id.as_str(), cat)))
        .collect()
}

fn compute_summary(
    trials: &[Trial],
    categories: &HashMap<&str, CaseCategory>,
    total_duration_ms: u64,
    gates: Option<&GateConfig>,
) -> RunSummary {
    let total_cases = trials.len() as u64;
    let passed = trials.iter().filter(|t| t.status == TrialStatus::Pass).count() as u64;
    let failed = trials.iter().filter(|t| t.status == TrialStatus::Fail).count() as u64;
    let errors = trials.iter().filter(|t| t.status == TrialStatus::Error).count() as u64;

    let pass_rate = if total_cases > 0 {
        passed as f64 / total_cases as f64
    } else {
        0.0
    };

    let total_cost = trials
        .iter()
        .map(|t| t.output.cost.unwrap_or(0.0))
        .sum::<f64>();

    let by_category = if categories.is_empty() {
        None
    } else {
        let mut map: BTreeMap<String, CategorySummary> = BTreeMap::new();
        for trial in trials {
            if let Some(category) = categories.get(trial.case_id.as_str()) {
                map.entry(category.as_str().to_string())
                    .or_default()
                    .record(trial.status);
            }
        }
        Some(map)
    };

    let mut summary = RunSummary {
        total_cases,
        passed,
        failed,
        errors,
        pass_rate,
        total_cost,
        total_duration_ms,
        p95_latency_ms: p95_latency(trials),
        by_category,
        gate_result: agent_evals_core::GateOutcome::vacuous(),
    };
    summary.gate_result = evaluate_gates(gates, &summary);
    summary
}

/// Nearest-rank p95: the value at index `ceil(0.95·n) − 1` of the sorted
/// ascending latencies, clamped to the valid range; 0 for an empty run
fn p95_latency(trials: &[Trial]) -> u64 {
    let mut latencies: Vec<u64> = trials.iter().map(|t| t.output.latency_ms).collect();
    if latencies.is_empty() {
        return 0;
    }
    latencies.sort_unstable();
    let n = latencies.len();
    let index = ((0.95 * n as f64).ceil() as usize)
        .saturating_sub(1)
        .min(n - 1);
    latencies[index]
}

/// Short stable digest over the suite structure
///
/// Covers suite name, case ids (in order), case count, and gates — NOT the
/// target identity. Extend the canonical document when replay or judge-only
/// staleness detection needs to notice a swapped target or model.
fn config_hash(suite: &Suite, cases: &[Case]) -> String {
    let canonical = serde_json::json!({
        "name": suite.id,
        "caseCount": cases.len(),
        "caseIds": cases.iter().map(|c| c.id.as_str()).collect::<Vec<_>>(),
        "gates": suite.gates,
    });
    let bytes = serde_json::to_vec(&canonical).unwrap_or_default();
    let digest = Sha256::digest(&bytes);
    hex::encode(digest)[..16].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graders::{Contains, Latency, SequenceMode, ToolCalled, ToolSequence};
    use crate::GraderConfig;
    use agent_evals_core::{GradeResult, ToolCall};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn case_with_query(id: &str, query: &str) -> Case {
        let mut input = serde_json::Map::new();
        input.insert("query".to_string(), json!(query));
        Case::new(id, input)
    }

    fn echo_target() -> FnTarget {
        FnTarget::new(|input| async move {
            let query = input["query"].as_str().unwrap_or_default().to_string();
            Ok(TargetOutput::from_text(format!("Response for: {query}"))
                .with_latency_ms(50)
                .with_cost(0.001)
                .with_tool_calls(vec![
                    ToolCall::new("search")
                        .with_args([("q".to_string(), json!(query))].into_iter().collect())
                        .with_result(json!({})),
                    ToolCall::new("format").with_result(json!({})),
                ]))
        })
    }

    /// Scenario: one case, deterministic graders, all gates green
    #[tokio::test]
    async fn test_happy_path_run() {
        let suite = Suite::new("smoke")
            .with_cases(vec![case_with_query("H01", "hi")])
            .with_default_graders(vec![
                GraderConfig::new(Contains::new("Response")),
                GraderConfig::new(ToolCalled::new("search")).required(),
                GraderConfig::new(ToolSequence::new(
                    vec!["search".to_string(), "format".to_string()],
                    SequenceMode::Strict,
                )),
                GraderConfig::new(Latency::new(1000)),
            ])
            .with_gates(
                GateConfig::default()
                    .with_pass_rate(1.0)
                    .with_max_cost(0.05)
                    .with_p95_latency_ms(2000.0),
            );

        let run = Runner::new(RunOptions::default())
            .run(&suite, &echo_target())
            .await
            .unwrap();

        assert_eq!(run.trials.len(), 1);
        assert_eq!(run.trials[0].status, TrialStatus::Pass);
        assert!(run.trials[0].score >= 0.5);
        assert_eq!(run.trials[0].grades.len(), 4);
        assert_eq!(run.summary.pass_rate, 1.0);
        assert!(run.summary.gate_result.pass);
        assert_eq!(run.schema_version, SCHEMA_VERSION);
        run.validate().unwrap();
    }

    /// Scenario: half the cases fail a required grader, the gate trips
    #[tokio::test]
    async fn test_gate_failure_reports_actual_and_threshold() {
        let suite = Suite::new("gated")
            .with_cases(vec![
                case_with_query("G01", "pass"),
                case_with_query("G02", "fail"),
            ])
            .with_default_graders(vec![GraderConfig::new(Contains::new("pass")).required()])
            .with_gates(GateConfig::default().with_pass_rate(0.95));

        let target = FnTarget::new(|input| async move {
            let query = input["query"].as_str().unwrap_or_default().to_string();
            Ok(TargetOutput::from_text(format!("Response for: {query}")).with_latency_ms(5))
        });

        let run = Runner::new(RunOptions::default())
            .run(&suite, &target)
            .await
            .unwrap();

        assert_eq!(run.summary.pass_rate, 0.5);
        assert!(!run.summary.gate_result.pass);

        let check = &run.summary.gate_result.checks[0];
        assert_eq!(check.gate, "passRate");
        assert_eq!(check.actual, 0.5);
        assert_eq!(check.threshold, 0.95);
    }

    /// Scenario: target exceeds the timeout, case becomes an error trial
    #[tokio::test]
    async fn test_target_timeout_becomes_error_trial() {
        let suite = Suite::new("slow")
            .with_cases(vec![case_with_query("T01", "hi")])
            .with_default_graders(vec![GraderConfig::new(Contains::new("Response"))]);

        let target = FnTarget::new(|_input| async move {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok(TargetOutput::from_text("too late"))
        });

        let run = Runner::new(RunOptions::default().with_timeout_ms(100))
            .run(&suite, &target)
            .await
            .unwrap();

        let trial = &run.trials[0];
        assert_eq!(trial.status, TrialStatus::Error);
        assert!(trial.output.text.as_deref().unwrap().contains("Timeout"));
        assert!(trial.grades.is_empty());
        assert_eq!(run.summary.errors, 1);
        assert_eq!(run.summary.passed, 0);
    }

    #[tokio::test]
    async fn test_target_error_becomes_error_trial() {
        let suite = Suite::new("broken")
            .with_cases(vec![case_with_query("E01", "hi")])
            .with_default_graders(vec![GraderConfig::new(Contains::new("Response"))]);

        let target =
            FnTarget::new(|_input| async move { anyhow::bail!("connection refused") });

        let run = Runner::new(RunOptions::default())
            .run(&suite, &target)
            .await
            .unwrap();

        let trial = &run.trials[0];
        assert_eq!(trial.status, TrialStatus::Error);
        assert!(trial
            .output
            .text
            .as_deref()
            .unwrap()
            .contains("Target error: connection refused"));
        assert_eq!(trial.score, 0.0);
        run.validate().unwrap();
    }

    /// Cases run sequentially in declaration order — contractual
    #[tokio::test]
    async fn test_cases_execute_sequentially_in_declaration_order() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let order_clone = order.clone();
        let in_flight = Arc::new(AtomicUsize::new(0));
        let in_flight_clone = in_flight.clone();

        let target = FnTarget::new(move |input| {
            let order = order_clone.clone();
            let in_flight = in_flight_clone.clone();
            async move {
                assert_eq!(in_flight.fetch_add(1, Ordering::SeqCst), 0, "overlap");
                tokio::time::sleep(Duration::from_millis(5)).await;
                order
                    .lock()
                    .unwrap()
                    .push(input["query"].as_str().unwrap().to_string());
                in_flight.fetch_sub(1, Ordering::SeqCst);
                Ok(TargetOutput::from_text("ok"))
            }
        });

        let suite = Suite::new("ordered").with_cases(vec![
            case_with_query("A", "first"),
            case_with_query("B", "second"),
            case_with_query("C", "third"),
        ]);

        let run = Runner::new(RunOptions::default())
            .run(&suite, &target)
            .await
            .unwrap();

        assert_eq!(*order.lock().unwrap(), vec!["first", "second", "third"]);
        let trial_ids: Vec<&str> = run.trials.iter().map(|t| t.case_id.as_str()).collect();
        assert_eq!(trial_ids, vec!["A", "B", "C"]);
    }

    #[tokio::test]
    async fn test_by_category_aggregation() {
        let mut happy = case_with_query("H1", "pass");
        happy.category = Some(CaseCategory::HappyPath);
        let mut adversarial = case_with_query("A1", "fail");
        adversarial.category = Some(CaseCategory::Adversarial);
        let uncategorized = case_with_query("U1", "pass");

        let suite = Suite::new("cats")
            .with_cases(vec![happy, adversarial, uncategorized])
            .with_default_graders(vec![GraderConfig::new(Contains::new("pass")).required()]);

        let target = FnTarget::new(|input| async move {
            let query = input["query"].as_str().unwrap_or_default().to_string();
            Ok(TargetOutput::from_text(query))
        });

        let run = Runner::new(RunOptions::default())
            .run(&suite, &target)
            .await
            .unwrap();

        let by_category = run.summary.by_category.as_ref().unwrap();
        assert_eq!(by_category.len(), 2);
        assert_eq!(by_category["happy_path"].passed, 1);
        assert_eq!(by_category["adversarial"].failed, 1);
        assert!(!by_category.contains_key("regression"));
    }

    #[tokio::test]
    async fn test_no_categories_means_no_breakdown() {
        let suite = Suite::new("plain")
            .with_cases(vec![case_with_query("P1", "hi")])
            .with_default_graders(vec![GraderConfig::new(Contains::new("Response"))]);

        let run = Runner::new(RunOptions::default())
            .run(&suite, &echo_target())
            .await
            .unwrap();
        assert!(run.summary.by_category.is_none());
    }

    /// Failing grader for the judge-only scenario
    struct AlwaysFail;

    #[async_trait]
    impl crate::Grader for AlwaysFail {
        fn name(&self) -> &str {
            "alwaysFail"
        }

        async fn grade(
            &self,
            _output: &TargetOutput,
            _expected: Option<&CaseExpected>,
            _ctx: &GraderContext,
        ) -> GradeResult {
            GradeResult::fail("alwaysFail", "always fails")
        }
    }

    /// Scenario: judge-only re-grade preserves outputs, swaps verdicts
    #[tokio::test]
    async fn test_judge_only_regrades_without_target() {
        // First, a live run that passes.
        let suite = Suite::new("regrade")
            .with_cases(vec![case_with_query("J01", "hi")])
            .with_default_graders(vec![GraderConfig::new(Contains::new("Hello"))]);

        let target = FnTarget::new(|_input| async move {
            Ok(TargetOutput::from_text("Hello world")
                .with_latency_ms(100)
                .with_cost(0.005))
        });

        let live = Runner::new(RunOptions::default())
            .run(&suite, &target)
            .await
            .unwrap();
        assert_eq!(live.trials[0].status, TrialStatus::Pass);

        // Re-grade with a swapped grader set; no target exists anymore.
        let regrade_suite = Suite::new("regrade")
            .with_cases(vec![case_with_query("J01", "hi")])
            .with_default_graders(vec![GraderConfig::new(AlwaysFail)]);

        let regraded = run_judge_only(&live, &regrade_suite, &RunOptions::default())
            .await
            .unwrap();

        assert_eq!(regraded.mode, RunMode::JudgeOnly);
        let trial = &regraded.trials[0];
        assert_eq!(trial.output, live.trials[0].output);
        assert_eq!(trial.duration_ms, live.trials[0].duration_ms);
        assert_eq!(trial.trial_index, live.trials[0].trial_index);
        assert_eq!(trial.status, TrialStatus::Fail);
        assert_eq!(trial.grades[0].grader_name, "alwaysFail");
        regraded.validate().unwrap();
    }

    #[tokio::test]
    async fn test_judge_only_uses_current_expected() {
        use crate::graders::ExactMatch;

        let suite = Suite::new("s")
            .with_cases(vec![case_with_query("C1", "hi")])
            .with_default_graders(vec![GraderConfig::new(Contains::new("Hello"))]);
        let target = FnTarget::new(|_input| async move {
            Ok(TargetOutput::from_text("Hello world").with_latency_ms(10))
        });
        let live = Runner::new(RunOptions::default())
            .run(&suite, &target)
            .await
            .unwrap();

        // A case id the stored run does not know about simply grades with
        // expected = None; the stored trial's case keeps its new expected.
        let mut updated_case = case_with_query("C1", "hi");
        updated_case.expected = Some(CaseExpected::from_text("Hello world"));
        let regrade_suite = Suite::new("s")
            .with_cases(vec![updated_case])
            .with_default_graders(vec![GraderConfig::new(ExactMatch::new("Hello world"))]);

        let regraded = run_judge_only(&live, &regrade_suite, &RunOptions::default())
            .await
            .unwrap();
        assert_eq!(regraded.trials[0].status, TrialStatus::Pass);
    }

    #[test]
    fn test_p95_latency_nearest_rank() {
        fn trial_with_latency(latency: u64) -> Trial {
            Trial {
                case_id: "c".to_string(),
                status: TrialStatus::Pass,
                output: TargetOutput::from_text("x").with_latency_ms(latency),
                grades: vec![],
                score: 1.0,
                duration_ms: latency,
                trial_index: None,
            }
        }

        assert_eq!(p95_latency(&[]), 0);
        assert_eq!(p95_latency(&[trial_with_latency(42)]), 42);

        // n = 10: index ceil(9.5) - 1 = 9 → the maximum
        let trials: Vec<Trial> = (1..=10).map(|i| trial_with_latency(i * 10)).collect();
        assert_eq!(p95_latency(&trials), 100);

        // n = 20: index ceil(19) - 1 = 18 → the 19th value
        let trials: Vec<Trial> = (1..=20).map(|i| trial_with_latency(i * 10)).collect();
        assert_eq!(p95_latency(&trials), 190);
    }

    #[tokio::test]
    async fn test_config_hash_is_stable_and_structure_sensitive() {
        let suite_a = Suite::new("s").with_cases(vec![case_with_query("a", "x")]);
        let suite_a_again = Suite::new("s").with_cases(vec![case_with_query("a", "y")]);
        let suite_b = Suite::new("s").with_cases(vec![case_with_query("b", "x")]);

        let target = FnTarget::new(|_| async move { Ok(TargetOutput::from_text("ok")) });
        let runner = Runner::new(RunOptions::default());

        let run_a = runner.run(&suite_a, &target).await.unwrap();
        let run_a_again = runner.run(&suite_a_again, &target).await.unwrap();
        let run_b = runner.run(&suite_b, &target).await.unwrap();

        assert_eq!(run_a.config_hash.len(), 16);
        assert!(run_a.config_hash.chars().all(|c| c.is_ascii_hexdigit()));
        // Inputs are not part of the hash, case ids are.
        assert_eq!(run_a.config_hash, run_a_again.config_hash);
        assert_ne!(run_a.config_hash, run_b.config_hash);
    }

    #[tokio::test]
    async fn test_total_cost_treats_missing_as_zero() {
        let suite = Suite::new("cost").with_cases(vec![
            case_with_query("C1", "a"),
            case_with_query("C2", "b"),
        ]);

        let target = FnTarget::new(|input| async move {
            let query = input["query"].as_str().unwrap_or_default();
            let output = TargetOutput::from_text("ok").with_latency_ms(1);
            Ok(if query == "a" {
                output.with_cost(0.25)
            } else {
                output
            })
        });

        let run = Runner::new(RunOptions::default())
            .run(&suite, &target)
            .await
            .unwrap();
        assert!((run.summary.total_cost - 0.25).abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_duplicate_case_ids_fail_before_any_execution() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        let target = FnTarget::new(move |_| {
            let calls = calls_clone.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(TargetOutput::from_text("ok"))
            }
        });

        let suite = Suite::new("dup")
            .with_cases(vec![case_with_query("X", "1"), case_with_query("X", "2")]);

        let result = Runner::new(RunOptions::default()).run(&suite, &target).await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
