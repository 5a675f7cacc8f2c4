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

//! Suite-level gates: declarative post-run checks on the aggregate summary.
//!
//! Gates decide the run's overall verdict (and the CLI's exit code) without
//! touching per-case results. All comparisons are inclusive at the boundary.

use agent_evals_core::{GateCheck, GateOutcome, RunSummary};
use serde::{Deserialize, Serialize};

/// Thresholds to enforce after a run; absent fields are not checked
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct GateConfig {
    /// Minimum pass rate in [0, 1]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pass_rate: Option<f64>,

    /// Maximum total cost in dollars
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_cost: Option<f64>,

    /// Maximum p95 latency in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub p95_latency_ms: Option<f64>,
}

/// Summary metrics a gate set is evaluated against
///
/// Fields are optional so a partial summary simply skips the matching gate
/// instead of erroring; a full [`RunSummary`] always provides all three.
#[derive(Debug, Clone, Copy, Default)]
pub struct GateMetrics {
    pub pass_rate: Option<f64>,
    pub total_cost: Option<f64>,
    pub p95_latency_ms: Option<f64>,
}

impl From<&RunSummary> for GateMetrics {
    fn from(summary: &RunSummary) -> Self {
        Self {
            pass_rate: Some(summary.pass_rate),
            total_cost: Some(summary.total_cost),
            p95_latency_ms: Some(summary.p95_latency_ms as f64),
        }
    }
}

impl GateConfig {
    pub fn with_pass_rate(mut self, threshold: f64) -> Self {
        self.pass_rate = Some(threshold);
        self
    }

    pub fn with_max_cost(mut self, threshold: f64) -> Self {
        self.max_cost = Some(threshold);
        self
    }

    pub fn with_p95_latency_ms(mut self, threshold: f64) -> Self {
        self.p95_latency_ms = Some(threshold);
        self
    }

    /// Evaluate every configured gate against the given metrics
    pub fn evaluate(&self, metrics: GateMetrics) -> GateOutcome {
        let mut checks = Vec::new();

        if let (Some(threshold), Some(actual)) = (self.pass_rate, metrics.pass_rate) {
            checks.push(check(
                "passRate",
                actual >= threshold,
                actual,
                threshold,
                format!("pass rate {:.1}% (threshold {:.1}%)", actual * 100.0, threshold * 100.0),
            ));
        }

        if let (Some(threshold), Some(actual)) = (self.max_cost, metrics.total_cost) {
            checks.push(check(
                "maxCost",
                actual <= threshold,
                actual,
                threshold,
                format!("total cost ${actual} (limit ${threshold})"),
            ));
        }

        if let (Some(threshold), Some(actual)) = (self.p95_latency_ms, metrics.p95_latency_ms) {
            checks.push(check(
                "p95LatencyMs",
                actual <= threshold,
                actual,
                threshold,
                format!("p95 latency {actual}ms (limit {threshold}ms)"),
            ));
        }

        GateOutcome {
            pass: checks.iter().all(|c| c.pass),
            checks,
        }
    }
}

fn check(gate: &str, pass: bool, actual: f64, threshold: f64, detail: String) -> GateCheck {
    GateCheck {
        gate: gate.to_string(),
        pass,
        actual,
        threshold,
        reason: format!("{}: {detail}", if pass { "passed" } else { "failed" }),
    }
}

/// Evaluate an optional gate config against a run summary
///
/// No config means no gates: a vacuous pass with an empty check list.
pub fn evaluate_gates(config: Option<&GateConfig>, summary: &RunSummary) -> GateOutcome {
    match config {
        Some(config) => config.evaluate(GateMetrics::from(summary)),
        None => GateOutcome::vacuous(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(pass_rate: f64, cost: f64, p95: f64) -> GateMetrics {
        GateMetrics {
            pass_rate: Some(pass_rate),
            total_cost: Some(cost),
            p95_latency_ms: Some(p95),
        }
    }

    #[test]
    fn test_unconfigured_gates_pass_vacuously() {
        let outcome = GateConfig::default().evaluate(metrics(0.0, 99.0, 99999.0));
        assert!(outcome.pass);
        assert!(outcome.checks.is_empty());
    }

    #[test]
    fn test_all_gates_pass() {
        let config = GateConfig::default()
            .with_pass_rate(1.0)
            .with_max_cost(0.05)
            .with_p95_latency_ms(2000.0);
        let outcome = config.evaluate(metrics(1.0, 0.001, 50.0));
        assert!(outcome.pass);
        assert_eq!(outcome.checks.len(), 3);
    }

    #[test]
    fn test_pass_rate_gate_reports_actual_and_threshold() {
        let config = GateConfig::default().with_pass_rate(0.95);
        let outcome = config.evaluate(metrics(0.5, 0.0, 0.0));
        assert!(!outcome.pass);

        let check = &outcome.checks[0];
        assert_eq!(check.gate, "passRate");
        assert_eq!(check.actual, 0.5);
        assert_eq!(check.threshold, 0.95);
        assert!(!check.pass);
    }

    #[test]
    fn test_boundaries_are_inclusive() {
        let config = GateConfig::default()
            .with_pass_rate(0.9)
            .with_max_cost(1.0)
            .with_p95_latency_ms(500.0);
        let outcome = config.evaluate(metrics(0.9, 1.0, 500.0));
        assert!(outcome.pass);
    }

    #[test]
    fn test_one_failure_fails_the_conjunction() {
        let config = GateConfig::default()
            .with_pass_rate(0.5)
            .with_max_cost(0.01);
        let outcome = config.evaluate(metrics(1.0, 5.0, 0.0));
        assert!(!outcome.pass);
        assert_eq!(outcome.checks.len(), 2);
        assert!(outcome.checks[0].pass);
        assert!(!outcome.checks[1].pass);
    }

    #[test]
    fn test_missing_metric_behaves_as_unconfigured() {
        let config = GateConfig::default()
            .with_pass_rate(0.9)
            .with_max_cost(0.01);
        let outcome = config.evaluate(GateMetrics {
            pass_rate: Some(1.0),
            total_cost: None,
            p95_latency_ms: None,
        });
        assert!(outcome.pass);
        assert_eq!(outcome.checks.len(), 1);
    }
}
