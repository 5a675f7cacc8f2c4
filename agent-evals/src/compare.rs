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

//! Run-to-run comparison.
//!
//! Diffs two persisted Runs into per-case and per-grader deltas with a
//! regression/improvement classification, the regression signal that makes
//! archived Runs useful. Status transitions dominate: a case that stops
//! passing is a regression no matter how its score moved; between same-ish
//! statuses a thresholded score delta decides, so judge-score jitter below
//! the threshold reads as unchanged.

use std::collections::BTreeSet;
use std::collections::HashMap;

use agent_evals_core::{GradeResult, Run, Trial, TrialStatus};
use serde::{Deserialize, Serialize};

/// Options for [`compare_runs`]
#[derive(Debug, Clone, Copy)]
pub struct CompareOptions {
    /// Score deltas with absolute value at or below this read as unchanged
    pub score_threshold: f64,
}

impl Default for CompareOptions {
    fn default() -> Self {
        Self {
            score_threshold: 0.05,
        }
    }
}

/// Direction of a case or grader between two runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Added,
    Removed,
    Regression,
    Improvement,
    Unchanged,
}

/// Delta for one grader matched by name between paired trials
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraderDiff {
    pub grader_name: String,
    pub base_score: f64,
    pub compare_score: f64,
    pub score_delta: f64,
    pub direction: Direction,
}

/// Delta for one case across the two runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseDiff {
    pub case_id: String,
    pub direction: Direction,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_status: Option<TrialStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compare_status: Option<TrialStatus>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compare_score: Option<f64>,

    /// `compare − base`, present only for paired cases
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score_delta: Option<f64>,

    /// Grader-level deltas for paired cases
    pub graders: Vec<GraderDiff>,
}

/// Pass-rate movement for one category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryDelta {
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_pass_rate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compare_pass_rate: Option<f64>,
    /// Missing sides count as a pass rate of 0
    pub delta: f64,
}

/// Gate verdicts on both sides
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GateTransition {
    pub base_pass: bool,
    pub compare_pass: bool,
}

/// Aggregate movement between the two runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonSummary {
    /// Size of the union of case ids across both runs
    pub total_cases: u64,
    pub regressions: u64,
    pub improvements: u64,
    pub unchanged: u64,
    pub added: u64,
    pub removed: u64,
    pub cost_delta: f64,
    pub duration_delta_ms: i64,
}

/// The full diff between two runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunComparison {
    pub base_run_id: String,
    pub compare_run_id: String,
    pub cases: Vec<CaseDiff>,
    pub categories: Vec<CategoryDelta>,
    pub gates: GateTransition,
    pub summary: ComparisonSummary,
}

/// Diff two runs case by case
///
/// Cases appear in base declaration order, followed by compare-only cases
/// in their declaration order, so the diff itself is deterministic.
pub fn compare_runs(base: &Run, compare: &Run, options: &CompareOptions) -> RunComparison {
    let base_by_id: HashMap<&str, &Trial> =
        base.trials.iter().map(|t| (t.case_id.as_str(), t)).collect();
    let compare_by_id: HashMap<&str, &Trial> = compare
        .trials
        .iter()
        .map(|t| (t.case_id.as_str(), t))
        .collect();

    let mut cases = Vec::new();
    for trial in &base.trials {
        cases.push(diff_case(
            &trial.case_id,
            Some(trial),
            compare_by_id.get(trial.case_id.as_str()).copied(),
            options,
        ));
    }
    for trial in &compare.trials {
        if !base_by_id.contains_key(trial.case_id.as_str()) {
            cases.push(diff_case(&trial.case_id, None, Some(trial), options));
        }
    }

    let count = |direction: Direction| -> u64 {
        cases.iter().filter(|c| c.direction == direction).count() as u64
    };

    let summary = ComparisonSummary {
        total_cases: cases.len() as u64,
        regressions: count(Direction::Regression),
        improvements: count(Direction::Improvement),
        unchanged: count(Direction::Unchanged),
        added: count(Direction::Added),
        removed: count(Direction::Removed),
        cost_delta: compare.summary.total_cost - base.summary.total_cost,
        duration_delta_ms: compare.summary.total_duration_ms as i64
            - base.summary.total_duration_ms as i64,
    };

    RunComparison {
        base_run_id: base.id.clone(),
        compare_run_id: compare.id.clone(),
        cases,
        categories: category_deltas(base, compare),
        gates: GateTransition {
            base_pass: base.summary.gate_result.pass,
            compare_pass: compare.summary.gate_result.pass,
        },
        summary,
    }
}

fn diff_case(
    case_id: &str,
    base: Option<&Trial>,
    compare: Option<&Trial>,
    options: &CompareOptions,
) -> CaseDiff {
    match (base, compare) {
        (None, Some(compare)) => CaseDiff {
            case_id: case_id.to_string(),
            direction: Direction::Added,
            base_status: None,
            compare_status: Some(compare.status),
            base_score: None,
            compare_score: Some(compare.score),
            score_delta: None,
            graders: Vec::new(),
        },
        (Some(base), None) => CaseDiff {
            case_id: case_id.to_string(),
            direction: Direction::Removed,
            base_status: Some(base.status),
            compare_status: None,
            base_score: Some(base.score),
            compare_score: None,
            score_delta: None,
            graders: Vec::new(),
        },
        (Some(base), Some(compare)) => {
            let score_delta = compare.score - base.score;
            let direction = classify(base.status, compare.status, score_delta, options);
            CaseDiff {
                case_id: case_id.to_string(),
                direction,
                base_status: Some(base.status),
                compare_status: Some(compare.status),
                base_score: Some(base.score),
                compare_score: Some(compare.score),
                score_delta: Some(score_delta),
                graders: diff_graders(&base.grades, &compare.grades, options),
            }
        }
        (None, None) => unreachable!("diff_case requires at least one trial"),
    }
}

fn classify(
    base: TrialStatus,
    compare: TrialStatus,
    score_delta: f64,
    options: &CompareOptions,
) -> Direction {
    let base_pass = base == TrialStatus::Pass;
    let compare_pass = compare == TrialStatus::Pass;

    if base_pass && !compare_pass {
        return Direction::Regression;
    }
    if !base_pass && compare_pass {
        return Direction::Improvement;
    }

    // Same verdict side (including fail<->error): the score decides.
    classify_by_delta(score_delta, options)
}

fn classify_by_delta(score_delta: f64, options: &CompareOptions) -> Direction {
    if score_delta.abs() <= options.score_threshold {
        Direction::Unchanged
    } else if score_delta < 0.0 {
        Direction::Regression
    } else {
        Direction::Improvement
    }
}

/// Match grader results by name between paired trials
fn diff_graders(
    base: &[GradeResult],
    compare: &[GradeResult],
    options: &CompareOptions,
) -> Vec<GraderDiff> {
    let compare_by_name: HashMap<&str, &GradeResult> = compare
        .iter()
        .map(|g| (g.grader_name.as_str(), g))
        .collect();

    base.iter()
        .filter_map(|base_grade| {
            let compare_grade = compare_by_name.get(base_grade.grader_name.as_str())?;
            let score_delta = compare_grade.score - base_grade.score;
            Some(GraderDiff {
                grader_name: base_grade.grader_name.clone(),
                base_score: base_grade.score,
                compare_score: compare_grade.score,
                score_delta,
                direction: classify_by_delta(score_delta, options),
            })
        })
        .collect()
}

fn category_deltas(base: &Run, compare: &Run) -> Vec<CategoryDelta> {
    let empty = std::collections::BTreeMap::new();
    let base_categories = base.summary.by_category.as_ref().unwrap_or(&empty);
    let compare_categories = compare.summary.by_category.as_ref().unwrap_or(&empty);

    let names: BTreeSet<&String> =
        base_categories.keys().chain(compare_categories.keys()).collect();

    names
        .into_iter()
        .map(|name| {
            let base_rate = base_categories.get(name).map(|c| c.pass_rate);
            let compare_rate = compare_categories.get(name).map(|c| c.pass_rate);
            CategoryDelta {
                category: name.clone(),
                base_pass_rate: base_rate,
                compare_pass_rate: compare_rate,
                delta: compare_rate.unwrap_or(0.0) - base_rate.unwrap_or(0.0),
            }
        })
        .collect()
}
