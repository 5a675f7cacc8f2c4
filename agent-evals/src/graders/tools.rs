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

//! Tool-call graders: presence, ordering, and argument matching.

use std::collections::HashMap;

use agent_evals_core::{CaseExpected, GradeResult, TargetOutput, ToolCall};
use async_trait::async_trait;
use serde_json::Value;

use crate::{Grader, GraderContext};

fn calls(output: &TargetOutput) -> &[ToolCall] {
    output.tool_calls.as_deref().unwrap_or_default()
}

/// Passes when a tool with the given name was called at least once
///
/// An empty call list fails.
pub struct ToolCalled {
    tool: String,
    name: String,
}

impl ToolCalled {
    pub fn new(tool: impl Into<String>) -> Self {
        let tool = tool.into();
        Self {
            name: format!("toolCalled({tool})"),
            tool,
        }
    }
}

#[async_trait]
impl Grader for ToolCalled {
    fn name(&self) -> &str {
        &self.name
    }

    async fn grade(
        &self,
        output: &TargetOutput,
        _expected: Option<&CaseExpected>,
        _ctx: &GraderContext,
    ) -> GradeResult {
        if calls(output).iter().any(|c| c.name == self.tool) {
            GradeResult::pass(&self.name, format!("tool {} was called", self.tool))
        } else {
            GradeResult::fail(&self.name, format!("tool {} was not called", self.tool))
        }
    }
}

/// Passes when a tool with the given name was never called
///
/// An empty call list passes.
pub struct ToolNotCalled {
    tool: String,
    name: String,
}

impl ToolNotCalled {
    pub fn new(tool: impl Into<String>) -> Self {
        let tool = tool.into();
        Self {
            name: format!("toolNotCalled({tool})"),
            tool,
        }
    }
}

#[async_trait]
impl Grader for ToolNotCalled {
    fn name(&self) -> &str {
        &self.name
    }

    async fn grade(
        &self,
        output: &TargetOutput,
        _expected: Option<&CaseExpected>,
        _ctx: &GraderContext,
    ) -> GradeResult {
        if calls(output).iter().any(|c| c.name == self.tool) {
            GradeResult::fail(&self.name, format!("tool {} was called", self.tool))
        } else {
            GradeResult::pass(&self.name, format!("tool {} was not called", self.tool))
        }
    }
}

/// How an expected tool sequence is compared against the actual call trace
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceMode {
    /// Exact positional equality of the ordered name lists
    Strict,
    /// Same multiset of names, any order
    Unordered,
    /// Every expected name appears; actual may have extras
    Subset,
    /// Every actual name appears in expected; actual may do fewer steps
    Superset,
}

impl SequenceMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SequenceMode::Strict => "strict",
            SequenceMode::Unordered => "unordered",
            SequenceMode::Subset => "subset",
            SequenceMode::Superset => "superset",
        }
    }
}

/// Compares the ordered tool-name trace against an expected sequence
pub struct ToolSequence {
    expected: Vec<String>,
    mode: SequenceMode,
    name: String,
}

impl ToolSequence {
    pub fn new(expected: Vec<String>, mode: SequenceMode) -> Self {
        Self {
            name: format!("toolSequence([{}], {})", expected.join(", "), mode.as_str()),
            expected,
            mode,
        }
    }

    fn multiset(names: &[String]) -> HashMap<&str, usize> {
        let mut counts = HashMap::new();
        for name in names {
            *counts.entry(name.as_str()).or_insert(0) += 1;
        }
        counts
    }

    fn check(&self, actual: &[String]) -> (bool, String) {
        match self.mode {
            SequenceMode::Strict => {
                if actual.len() != self.expected.len() {
                    return (
                        false,
                        format!(
                            "expected {} calls, got {}",
                            self.expected.len(),
                            actual.len()
                        ),
                    );
                }
                match actual
                    .iter()
                    .zip(&self.expected)
                    .position(|(a, e)| a != e)
                {
                    None => (true, "call sequence matches exactly".to_string()),
                    Some(i) => (
                        false,
                        format!(
                            "call {} was {}, expected {}",
                            i, actual[i], self.expected[i]
                        ),
                    ),
                }
            }
            SequenceMode::Unordered => {
                if Self::multiset(actual) == Self::multiset(&self.expected) {
                    (true, "call multiset matches".to_string())
                } else {
                    (
                        false,
                        format!(
                            "call multiset differs: expected [{}], got [{}]",
                            self.expected.join(", "),
                            actual.join(", ")
                        ),
                    )
                }
            }
            SequenceMode::Subset => {
                let missing: Vec<&str> = self
                    .expected
                    .iter()
                    .filter(|e| !actual.contains(e))
                    .map(|e| e.as_str())
                    .collect();
                if missing.is_empty() {
                    (true, "all expected tools were called".to_string())
                } else {
                    (false, format!("missing expected tools: {}", missing.join(", ")))
                }
            }
            SequenceMode::Superset => {
                let extra: Vec<&str> = actual
                    .iter()
                    .filter(|a| !self.expected.contains(a))
                    .map(|a| a.as_str())
                    .collect();
                if extra.is_empty() {
                    (true, "no unexpected tools were called".to_string())
                } else {
                    (false, format!("unexpected tools called: {}", extra.join(", ")))
                }
            }
        }
    }
}

#[async_trait]
impl Grader for ToolSequence {
    fn name(&self) -> &str {
        &self.name
    }

    async fn grade(
        &self,
        output: &TargetOutput,
        _expected: Option<&CaseExpected>,
        _ctx: &GraderContext,
    ) -> GradeResult {
        let actual: Vec<String> = calls(output).iter().map(|c| c.name.clone()).collect();
        let (pass, reason) = self.check(&actual);
        if pass {
            GradeResult::pass(&self.name, reason)
        } else {
            GradeResult::fail(&self.name, reason)
        }
    }
}

/// How expected arguments are compared against a tool call's actual arguments
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgsMatchMode {
    /// Deep structural equality, including the key set
    Exact,
    /// Every expected key present with a deeply equal value
    Subset,
    /// Like subset, but string values match by substring
    Contains,
}

impl ArgsMatchMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArgsMatchMode::Exact => "exact",
            ArgsMatchMode::Subset => "subset",
            ArgsMatchMode::Contains => "contains",
        }
    }
}

/// Matches the arguments of the first call to a named tool
pub struct ToolArgsMatch {
    tool: String,
    expected: serde_json::Map<String, Value>,
    mode: ArgsMatchMode,
    name: String,
}

impl ToolArgsMatch {
    pub fn new(
        tool: impl Into<String>,
        expected: serde_json::Map<String, Value>,
        mode: ArgsMatchMode,
    ) -> Self {
        let tool = tool.into();
        Self {
            name: format!("toolArgsMatch({tool}, {})", mode.as_str()),
            tool,
            expected,
            mode,
        }
    }

    fn value_matches(&self, expected: &Value, actual: &Value) -> bool {
        if self.mode == ArgsMatchMode::Contains {
            if let (Value::String(e), Value::String(a)) = (expected, actual) {
                return a.contains(e.as_str());
            }
        }
        expected == actual
    }

    fn check(&self, actual: &serde_json::Map<String, Value>) -> (bool, String) {
        if self.mode == ArgsMatchMode::Exact {
            let extra: Vec<&str> = actual
                .keys()
                .filter(|k| !self.expected.contains_key(*k))
                .map(|k| k.as_str())
                .collect();
            if !extra.is_empty() {
                return (false, format!("unexpected arg keys: {}", extra.join(", ")));
            }
        }

        for (key, expected_value) in &self.expected {
            match actual.get(key) {
                None => return (false, format!("missing arg {key:?}")),
                Some(actual_value) => {
                    if !self.value_matches(expected_value, actual_value) {
                        return (
                            false,
                            format!(
                                "arg {key:?} mismatch: expected {expected_value}, got {actual_value}"
                            ),
                        );
                    }
                }
            }
        }
        (true, format!("args match ({})", self.mode.as_str()))
    }
}

#[async_trait]
impl Grader for ToolArgsMatch {
    fn name(&self) -> &str {
        &self.name
    }

    async fn grade(
        &self,
        output: &TargetOutput,
        _expected: Option<&CaseExpected>,
        _ctx: &GraderContext,
    ) -> GradeResult {
        let call = match calls(output).iter().find(|c| c.name == self.tool) {
            Some(call) => call,
            None => {
                return GradeResult::fail(&self.name, format!("tool {} was not called", self.tool))
            }
        };

        let empty = serde_json::Map::new();
        let actual = call.args.as_ref().unwrap_or(&empty);
        let (pass, reason) = self.check(actual);
        if pass {
            GradeResult::pass(&self.name, reason)
        } else {
            GradeResult::fail(&self.name, reason)
        }
    }
}
