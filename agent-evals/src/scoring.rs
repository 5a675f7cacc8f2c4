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

//! Case scoring: turns ordered grader results into a per-case verdict.
//!
//! Two regimes. A failing `required` grader vetoes the case outright with
//! score 0. Otherwise the case score is the weighted mean of grader scores,
//! compared (inclusively) against the case threshold: the minimum of the
//! configured per-grader thresholds, 0.5 when none are set.

use agent_evals_core::GradeResult;

use crate::GraderConfig;

/// Default case-level pass threshold when no grader config sets one
pub const DEFAULT_CASE_THRESHOLD: f64 = 0.5;

/// Aggregate verdict for one case
#[derive(Debug, Clone, PartialEq)]
pub struct CaseResult {
    pub pass: bool,

    /// Weighted mean of grader scores, or 0 on a required failure
    pub score: f64,

    /// Names of every grader that failed, required or not
    pub failed_graders: Vec<String>,

    pub reason: String,
}

/// Score one case from its ordered grades and the matching configs
///
/// `grades[i]` must correspond to `configs[i]`; the pipeline guarantees
/// this by construction.
pub fn score_case(grades: &[GradeResult], configs: &[GraderConfig]) -> CaseResult {
    debug_assert_eq!(grades.len(), configs.len());

    let failed_graders: Vec<String> = grades
        .iter()
        .filter(|g| !g.pass)
        .map(|g| g.grader_name.clone())
        .collect();

    // A failed required grader vetoes the case regardless of weights.
    let first_required_failure = grades
        .iter()
        .zip(configs)
        .find(|(grade, config)| config.required && !grade.pass);
    if let Some((grade, _)) = first_required_failure {
        return CaseResult {
            pass: false,
            score: 0.0,
            failed_graders,
            reason: format!(
                "required grader {} failed: {}",
                grade.grader_name, grade.reason
            ),
        };
    }

    let total_weight: f64 = configs.iter().map(|c| c.weight).sum();
    let score = if grades.is_empty() || total_weight == 0.0 {
        1.0
    } else {
        let weighted_sum: f64 = grades
            .iter()
            .zip(configs)
            .map(|(grade, config)| grade.score * config.weight)
            .sum();
        weighted_sum / total_weight
    };

    let threshold = configs
        .iter()
        .filter_map(|c| c.threshold)
        .fold(f64::INFINITY, f64::min);
    let threshold = if threshold.is_finite() {
        threshold
    } else {
        DEFAULT_CASE_THRESHOLD
    };

    let pass = score >= threshold;
    let reason = if pass {
        format!("score {score:.3} >= threshold {threshold:.3}")
    } else {
        format!("score {score:.3} below threshold {threshold:.3}")
    };

    CaseResult {
        pass,
        score,
        failed_graders,
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graders::Contains;

    fn grade(name: &str, pass: bool, score: f64) -> GradeResult {
        GradeResult::scored(name, pass, score, "test")
    }

    fn config() -> GraderConfig {
        GraderConfig::new(Contains::new("x"))
    }

    #[test]
    fn test_empty_grader_list_passes_with_full_score() {
        let result = score_case(&[], &[]);
        assert!(result.pass);
        assert_eq!(result.score, 1.0);
        assert!(result.failed_graders.is_empty());
    }

    #[test]
    fn test_required_failure_zeroes_the_case() {
        let grades = vec![
            grade("a", true, 1.0),
            grade("b", false, 0.9),
            grade("c", true, 1.0),
        ];
        let configs = vec![config(), config().required(), config()];

        let result = score_case(&grades, &configs);
        assert!(!result.pass);
        assert_eq!(result.score, 0.0);
        assert!(result.reason.contains("required grader b failed"));
    }

    #[test]
    fn test_failed_graders_lists_every_failure() {
        let grades = vec![
            grade("a", false, 0.0),
            grade("b", false, 0.2),
            grade("c", true, 1.0),
        ];
        let configs = vec![config(), config().required(), config()];

        let result = score_case(&grades, &configs);
        assert_eq!(result.failed_graders, vec!["a", "b"]);
    }

    #[test]
    fn test_weighted_mean() {
        let grades = vec![grade("a", true, 1.0), grade("b", true, 0.5)];
        let configs = vec![
            config().with_weight(3.0).unwrap(),
            config().with_weight(1.0).unwrap(),
        ];

        let result = score_case(&grades, &configs);
        // (1.0 * 3 + 0.5 * 1) / 4 = 0.875
        assert!((result.score - 0.875).abs() < 1e-12);
        assert!(result.pass);
    }

    #[test]
    fn test_threshold_is_minimum_of_configured() {
        let grades = vec![grade("a", true, 0.4), grade("b", false, 0.4)];
        let configs = vec![
            config().with_threshold(0.9).unwrap(),
            config().with_threshold(0.3).unwrap(),
        ];

        // Mean score 0.4 >= min(0.9, 0.3) = 0.3
        let result = score_case(&grades, &configs);
        assert!(result.pass);
    }

    #[test]
    fn test_default_threshold_is_half() {
        let passing = score_case(&[grade("a", true, 0.5)], &[config()]);
        assert!(passing.pass, "0.5 ties the default threshold inclusively");

        let failing = score_case(&[grade("a", true, 0.49)], &[config()]);
        assert!(!failing.pass);
    }

    #[test]
    fn test_threshold_tie_passes() {
        let grades = vec![grade("a", true, 0.75)];
        let configs = vec![config().with_threshold(0.75).unwrap()];
        assert!(score_case(&grades, &configs).pass);
    }

    #[test]
    fn test_failing_grader_without_required_can_still_pass() {
        // pass and score are independent: a failed optional grader only
        // drags the weighted mean down.
        let grades = vec![grade("a", true, 1.0), grade("b", false, 0.0)];
        let configs = vec![config(), config()];

        let result = score_case(&grades, &configs);
        assert!(result.pass); // 0.5 >= 0.5
        assert_eq!(result.failed_graders, vec!["b"]);
    }
}
