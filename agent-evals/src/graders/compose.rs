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

//! Boolean grader composition.
//!
//! Composition lifts N graders into one with a precise score contract:
//! `all` takes the minimum sub-score, `any` the maximum, `not` inverts.
//! Sub-graders always all run (no short-circuit) so every grade is recorded
//! for observability, and sub-results ride along in the composed result's
//! metadata.

use std::sync::Arc;

use agent_evals_core::{CaseExpected, GradeResult, TargetOutput};
use async_trait::async_trait;

use crate::{Grader, GraderContext};

fn composed_name(op: &str, children: &[Arc<dyn Grader>]) -> String {
    let names: Vec<&str> = children.iter().map(|g| g.name()).collect();
    format!("{op}({})", names.join(", "))
}

fn children_metadata(results: &[GradeResult]) -> serde_json::Value {
    serde_json::to_value(results).unwrap_or(serde_json::Value::Null)
}

/// Passes when every sub-grader passes; score is the minimum sub-score
///
/// An empty list passes vacuously with score 1.
pub struct AllOf {
    graders: Vec<Arc<dyn Grader>>,
    name: String,
}

impl AllOf {
    pub fn new(graders: Vec<Arc<dyn Grader>>) -> Self {
        Self {
            name: composed_name("all", &graders),
            graders,
        }
    }
}

#[async_trait]
impl Grader for AllOf {
    fn name(&self) -> &str {
        &self.name
    }

    async fn grade(
        &self,
        output: &TargetOutput,
        expected: Option<&CaseExpected>,
        ctx: &GraderContext,
    ) -> GradeResult {
        if self.graders.is_empty() {
            return GradeResult::pass(&self.name, "no sub-graders (vacuous pass)");
        }

        let mut results = Vec::with_capacity(self.graders.len());
        for grader in &self.graders {
            results.push(grader.grade(output, expected, ctx).await);
        }

        let pass = results.iter().all(|r| r.pass);
        let score = results.iter().map(|r| r.score).fold(f64::INFINITY, f64::min);
        let failing: Vec<&str> = results
            .iter()
            .filter(|r| !r.pass)
            .map(|r| r.grader_name.as_str())
            .collect();
        let reason = if pass {
            format!("all {} sub-graders passed", results.len())
        } else {
            format!("failed sub-graders: {}", failing.join(", "))
        };

        GradeResult::scored(&self.name, pass, score, reason)
            .with_metadata(children_metadata(&results))
    }
}

/// Passes when at least one sub-grader passes; score is the maximum sub-score
///
/// An empty list fails with score 0.
pub struct AnyOf {
    graders: Vec<Arc<dyn Grader>>,
    name: String,
}

impl AnyOf {
    pub fn new(graders: Vec<Arc<dyn Grader>>) -> Self {
        Self {
            name: composed_name("any", &graders),
            graders,
        }
    }
}

#[async_trait]
impl Grader for AnyOf {
    fn name(&self) -> &str {
        &self.name
    }

    async fn grade(
        &self,
        output: &TargetOutput,
        expected: Option<&CaseExpected>,
        ctx: &GraderContext,
    ) -> GradeResult {
        if self.graders.is_empty() {
            return GradeResult::fail(&self.name, "no sub-graders (vacuous fail)");
        }

        let mut results = Vec::with_capacity(self.graders.len());
        for grader in &self.graders {
            results.push(grader.grade(output, expected, ctx).await);
        }

        let pass = results.iter().any(|r| r.pass);
        let score = results.iter().map(|r| r.score).fold(0.0, f64::max);
        let reason = if pass {
            let passing: Vec<&str> = results
                .iter()
                .filter(|r| r.pass)
                .map(|r| r.grader_name.as_str())
                .collect();
            format!("passed via: {}", passing.join(", "))
        } else {
            format!("none of {} sub-graders passed", results.len())
        };

        GradeResult::scored(&self.name, pass, score, reason)
            .with_metadata(children_metadata(&results))
    }
}

/// Inverts a grader: pass becomes fail and score becomes `1 − score`
pub struct Not {
    inner: Arc<dyn Grader>,
    name: String,
}

impl Not {
    pub fn new(inner: Arc<dyn Grader>) -> Self {
        Self {
            name: format!("not({})", inner.name()),
            inner,
        }
    }
}

#[async_trait]
impl Grader for Not {
    fn name(&self) -> &str {
        &self.name
    }

    async fn grade(
        &self,
        output: &TargetOutput,
        expected: Option<&CaseExpected>,
        ctx: &GraderContext,
    ) -> GradeResult {
        let inner = self.inner.grade(output, expected, ctx).await;
        GradeResult::scored(
            &self.name,
            !inner.pass,
            1.0 - inner.score,
            format!("inverted: {}", inner.reason),
        )
        .with_metadata(children_metadata(std::slice::from_ref(&inner)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graders::{Contains, Latency};
    use agent_evals_core::RunMode;

    fn ctx() -> GraderContext {
        GraderContext::new("C01", "suite", RunMode::Live)
    }

    fn output() -> TargetOutput {
        TargetOutput::from_text("Response ready").with_latency_ms(50)
    }

    /// Fixed-score grader for exercising the score contract
    struct Fixed {
        pass: bool,
        score: f64,
        name: String,
    }

    impl Fixed {
        fn new(pass: bool, score: f64) -> Self {
            Self {
                pass,
                score,
                name: format!("fixed({pass}, {score})"),
            }
        }
    }

    #[async_trait]
    impl Grader for Fixed {
        fn name(&self) -> &str {
            &self.name
        }

        async fn grade(
            &self,
            _output: &TargetOutput,
            _expected: Option<&CaseExpected>,
            _ctx: &GraderContext,
        ) -> GradeResult {
            GradeResult::scored(&self.name, self.pass, self.score, "fixed")
        }
    }

    #[tokio::test]
    async fn test_all_empty_passes_with_score_one() {
        let result = AllOf::new(vec![]).grade(&output(), None, &ctx()).await;
        assert!(result.pass);
        assert_eq!(result.score, 1.0);
    }

    #[tokio::test]
    async fn test_any_empty_fails_with_score_zero() {
        let result = AnyOf::new(vec![]).grade(&output(), None, &ctx()).await;
        assert!(!result.pass);
        assert_eq!(result.score, 0.0);
    }

    #[tokio::test]
    async fn test_all_score_is_minimum() {
        let grader = AllOf::new(vec![
            Arc::new(Fixed::new(true, 0.9)),
            Arc::new(Fixed::new(true, 0.4)),
            Arc::new(Fixed::new(true, 0.7)),
        ]);
        let result = grader.grade(&output(), None, &ctx()).await;
        assert!(result.pass);
        assert_eq!(result.score, 0.4);
    }

    #[tokio::test]
    async fn test_all_fails_when_any_child_fails() {
        let grader = AllOf::new(vec![
            Arc::new(Fixed::new(true, 1.0)),
            Arc::new(Fixed::new(false, 0.0)),
        ]);
        let result = grader.grade(&output(), None, &ctx()).await;
        assert!(!result.pass);
        assert!(result.reason.contains("fixed(false, 0)"));
    }

    #[tokio::test]
    async fn test_any_score_is_maximum() {
        let grader = AnyOf::new(vec![
            Arc::new(Fixed::new(false, 0.2)),
            Arc::new(Fixed::new(true, 0.8)),
        ]);
        let result = grader.grade(&output(), None, &ctx()).await;
        assert!(result.pass);
        assert_eq!(result.score, 0.8);
    }

    #[tokio::test]
    async fn test_not_inverts_pass_and_score() {
        let grader = Not::new(Arc::new(Fixed::new(true, 0.75)));
        let result = grader.grade(&output(), None, &ctx()).await;
        assert!(!result.pass);
        assert_eq!(result.score, 0.25);
    }

    #[tokio::test]
    async fn test_double_negation_restores_verdict_and_score() {
        for (pass, score) in [(true, 0.75), (false, 0.3), (true, 1.0), (false, 0.0)] {
            let inner = Fixed::new(pass, score);
            let direct = inner.grade(&output(), None, &ctx()).await;

            let doubled = Not::new(Arc::new(Not::new(Arc::new(Fixed::new(pass, score)))));
            let result = doubled.grade(&output(), None, &ctx()).await;

            assert_eq!(result.pass, direct.pass);
            assert!((result.score - direct.score).abs() < 1e-12);
        }
    }

    #[tokio::test]
    async fn test_composed_names_concatenate_children() {
        let grader = AllOf::new(vec![
            Arc::new(Contains::new("Response")),
            Arc::new(Latency::new(1000)),
        ]);
        assert_eq!(grader.name(), r#"all(contains("Response"), latency(1000))"#);

        let negated = Not::new(Arc::new(Contains::new("x")));
        assert_eq!(negated.name(), r#"not(contains("x"))"#);
    }

    #[tokio::test]
    async fn test_sub_results_preserved_in_declaration_order() {
        let grader = AllOf::new(vec![
            Arc::new(Fixed::new(true, 0.1)),
            Arc::new(Fixed::new(true, 0.2)),
        ]);
        let result = grader.grade(&output(), None, &ctx()).await;
        let children = result.metadata.unwrap();
        let scores: Vec<f64> = children
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["score"].as_f64().unwrap())
            .collect();
        assert_eq!(scores, vec![0.1, 0.2]);
    }
}
