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

//! Resource graders: latency, cost, and token budgets.
//!
//! Cost and token counts are optional in the target contract, so those
//! graders skip (pass) when the field is absent rather than punishing a
//! target that does not report them.

use agent_evals_core::{CaseExpected, GradeResult, TargetOutput};
use async_trait::async_trait;

use crate::{Grader, GraderContext};

/// Passes when the invocation latency is within a budget (inclusive)
pub struct Latency {
    max_ms: u64,
    name: String,
}

impl Latency {
    pub fn new(max_ms: u64) -> Self {
        Self {
            name: format!("latency({max_ms})"),
            max_ms,
        }
    }
}

#[async_trait]
impl Grader for Latency {
    fn name(&self) -> &str {
        &self.name
    }

    async fn grade(
        &self,
        output: &TargetOutput,
        _expected: Option<&CaseExpected>,
        _ctx: &GraderContext,
    ) -> GradeResult {
        if output.latency_ms <= self.max_ms {
            GradeResult::pass(
                &self.name,
                format!("latency {}ms <= {}ms", output.latency_ms, self.max_ms),
            )
        } else {
            GradeResult::fail(
                &self.name,
                format!("latency {}ms exceeds {}ms", output.latency_ms, self.max_ms),
            )
        }
    }
}

/// Passes when the invocation cost is within a dollar budget (inclusive)
///
/// Missing cost passes with a "not reported" note.
pub struct Cost {
    max_dollars: f64,
    name: String,
}

impl Cost {
    pub fn new(max_dollars: f64) -> Self {
        Self {
            name: format!("cost({max_dollars})"),
            max_dollars,
        }
    }
}

#[async_trait]
impl Grader for Cost {
    fn name(&self) -> &str {
        &self.name
    }

    async fn grade(
        &self,
        output: &TargetOutput,
        _expected: Option<&CaseExpected>,
        _ctx: &GraderContext,
    ) -> GradeResult {
        match output.cost {
            None => GradeResult::pass(&self.name, "cost not reported, skipping"),
            Some(cost) if cost <= self.max_dollars => GradeResult::pass(
                &self.name,
                format!("cost ${cost} <= ${}", self.max_dollars),
            ),
            Some(cost) => GradeResult::fail(
                &self.name,
                format!("cost ${cost} exceeds ${}", self.max_dollars),
            ),
        }
    }
}

/// Passes when total token usage (input + output) is within a budget
///
/// Missing token usage passes with a "not reported" note.
pub struct TokenCount {
    max_tokens: u64,
    name: String,
}

impl TokenCount {
    pub fn new(max_tokens: u64) -> Self {
        Self {
            name: format!("tokenCount({max_tokens})"),
            max_tokens,
        }
    }
}

#[async_trait]
impl Grader for TokenCount {
    fn name(&self) -> &str {
        &self.name
    }

    async fn grade(
        &self,
        output: &TargetOutput,
        _expected: Option<&CaseExpected>,
        _ctx: &GraderContext,
    ) -> GradeResult {
        match output.token_usage {
            None => GradeResult::pass(&self.name, "token usage not reported, skipping"),
            Some(usage) => {
                let total = usage.total();
                if total <= self.max_tokens {
                    GradeResult::pass(
                        &self.name,
                        format!("{total} tokens <= {}", self.max_tokens),
                    )
                } else {
                    GradeResult::fail(
                        &self.name,
                        format!("{total} tokens exceeds {}", self.max_tokens),
                    )
                }
            }
        }
    }
}
