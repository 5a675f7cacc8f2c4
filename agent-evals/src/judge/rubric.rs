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

//! Rubric-based judge graders.

use std::fmt::Write as _;
use std::sync::Arc;

use agent_evals_core::{CaseExpected, GradeResult, TargetOutput, ToolCall};
use async_trait::async_trait;

use super::{parse_judge_response, Judge, JudgeMessage};
use crate::{Grader, GraderContext};

/// A worked example appended to the system prompt for calibration
#[derive(Debug, Clone)]
pub struct CalibrationExample {
    pub output: String,
    pub score: u8,
    pub reasoning: String,
}

/// Grades output quality against free-form criteria via an LLM judge
///
/// The judge answers on a strict 4-point integer scale which maps onto the
/// unit interval (1 → 0.25, …, 4 → 1.0); the grade passes when the mapped
/// score reaches `pass_threshold`. Judge resolution order: the grader's own
/// judge if set, else the pipeline context's judge, else the grade fails.
pub struct LlmRubric {
    criteria: String,
    judge: Option<Arc<dyn Judge>>,
    pass_threshold: f64,
    examples: Vec<CalibrationExample>,
    name: String,
}

impl LlmRubric {
    pub fn new(criteria: impl Into<String>) -> Self {
        Self {
            criteria: criteria.into(),
            judge: None,
            pass_threshold: 0.75,
            examples: Vec::new(),
            name: "llmRubric".to_string(),
        }
    }

    /// Pin a judge, overriding whatever the pipeline context carries
    pub fn with_judge(mut self, judge: Arc<dyn Judge>) -> Self {
        self.judge = Some(judge);
        self
    }

    /// Minimum mapped score to pass (default 0.75, i.e. judge score 3)
    pub fn with_pass_threshold(mut self, threshold: f64) -> Self {
        self.pass_threshold = threshold;
        self
    }

    pub fn with_examples(mut self, examples: Vec<CalibrationExample>) -> Self {
        self.examples = examples;
        self
    }

    fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    fn system_message(&self) -> String {
        let mut prompt = format!(
            r#"You are an expert evaluator assessing the quality of an AI agent's response.

EVALUATION CRITERIA:
{criteria}

Score the response on a strict 4-point integer scale:
1 = poor: fails the criteria
2 = below average: partially meets the criteria with significant issues
3 = good: meets the criteria with only minor issues
4 = excellent: fully meets the criteria

Do NOT prefer longer responses over shorter ones. Judge only against the criteria.

Respond with JSON and nothing else:
{{"reasoning": "<your reasoning>", "score": <integer 1-4>}}"#,
            criteria = self.criteria
        );

        if !self.examples.is_empty() {
            prompt.push_str("\n\nCALIBRATION EXAMPLES:");
            for example in &self.examples {
                let _ = write!(
                    prompt,
                    "\n\nOutput: {}\nExpected score: {}\nExpected reasoning: {}",
                    example.output, example.score, example.reasoning
                );
            }
        }

        prompt
    }

    fn user_message(&self, output: &TargetOutput, expected: Option<&CaseExpected>) -> String {
        let mut prompt = String::from("<agent_output>\n");
        if let Some(text) = &output.text {
            prompt.push_str(text);
            prompt.push('\n');
        }
        if let Some(calls) = &output.tool_calls {
            if !calls.is_empty() {
                prompt.push_str("\nTool calls:\n");
                prompt.push_str(&format_tool_calls(calls));
            }
        }
        prompt.push_str("</agent_output>");

        if let Some(expected) = expected {
            prompt.push_str("\n\n<expected_reference>\n");
            if let Some(text) = &expected.text {
                prompt.push_str(text);
                prompt.push('\n');
            }
            if let Some(calls) = &expected.tool_calls {
                if !calls.is_empty() {
                    prompt.push_str("\nExpected tool calls:\n");
                    prompt.push_str(&format_tool_calls(calls));
                }
            }
            if let Some(metadata) = &expected.metadata {
                let _ = write!(
                    prompt,
                    "\nMetadata: {}\n",
                    serde_json::Value::Object(metadata.clone())
                );
            }
            prompt.push_str("</expected_reference>");
        }

        prompt
    }

    /// Build the two-message judge conversation for an output
    pub fn build_messages(
        &self,
        output: &TargetOutput,
        expected: Option<&CaseExpected>,
    ) -> Vec<JudgeMessage> {
        vec![
            JudgeMessage::system(self.system_message()),
            JudgeMessage::user(self.user_message(output, expected)),
        ]
    }
}

fn format_tool_calls(calls: &[ToolCall]) -> String {
    let mut text = String::new();
    for call in calls {
        let args = call
            .args
            .as_ref()
            .map(|a| serde_json::Value::Object(a.clone()).to_string())
            .unwrap_or_else(|| "{}".to_string());
        match &call.result {
            Some(result) => {
                let _ = writeln!(text, "- {}({args}) -> {result}", call.name);
            }
            None => {
                let _ = writeln!(text, "- {}({args})", call.name);
            }
        }
    }
    text
}

#[async_trait]
impl Grader for LlmRubric {
    fn name(&self) -> &str {
        &self.name
    }

    async fn grade(
        &self,
        output: &TargetOutput,
        expected: Option<&CaseExpected>,
        ctx: &GraderContext,
    ) -> GradeResult {
        let judge = match self.judge.as_ref().or(ctx.judge.as_ref()) {
            Some(judge) => judge,
            None => {
                return GradeResult::fail(
                    &self.name,
                    "No judge configured: set one on the grader or the run options",
                )
            }
        };

        let messages = self.build_messages(output, expected);
        let reply = match judge.complete(&messages).await {
            Ok(reply) => reply,
            Err(err) => {
                return GradeResult::fail(&self.name, format!("judge call failed: {err}"))
            }
        };

        let verdict = match parse_judge_response(&reply.text) {
            Ok(verdict) => verdict,
            Err(err) => {
                return GradeResult::fail(
                    &self.name,
                    format!("unparseable judge response: {}", err.message),
                )
                .with_metadata(serde_json::json!({"rawResponse": err.raw}))
            }
        };

        let score = f64::from(verdict.score) * 0.25;
        let pass = score >= self.pass_threshold;

        GradeResult::scored(
            &self.name,
            pass,
            score,
            format!("judge score {}/4: {}", verdict.score, verdict.reasoning),
        )
        .with_metadata(serde_json::json!({
            "reasoning": verdict.reasoning,
            "judgeScore": verdict.score,
            "judgeModelId": reply.model_id,
            "judgeCost": reply.cost,
        }))
    }
}

const FACTUALITY_CRITERIA: &str = "\
Evaluate the agent's response strictly against the expected reference answer:
- ACCURACY: every factual statement must agree with the reference
- COMPLETENESS: all key information from the reference must be present
- NO FABRICATION: the response must not add material claims the reference does not support";

/// Factuality grader: accuracy, completeness, and no fabrication relative
/// to the case's expected text
///
/// Fails outright when the case carries no `expected.text` — there is
/// nothing to be factual against.
pub struct Factuality {
    rubric: LlmRubric,
}

impl Factuality {
    pub fn new() -> Self {
        Self {
            rubric: LlmRubric::new(FACTUALITY_CRITERIA).with_name("factuality"),
        }
    }

    pub fn with_judge(mut self, judge: Arc<dyn Judge>) -> Self {
        self.rubric = self.rubric.with_judge(judge);
        self
    }

    pub fn with_pass_threshold(mut self, threshold: f64) -> Self {
        self.rubric = self.rubric.with_pass_threshold(threshold);
        self
    }
}

impl Default for Factuality {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Grader for Factuality {
    fn name(&self) -> &str {
        "factuality"
    }

    async fn grade(
        &self,
        output: &TargetOutput,
        expected: Option<&CaseExpected>,
        ctx: &GraderContext,
    ) -> GradeResult {
        let has_reference = expected
            .and_then(|e| e.text.as_deref())
            .is_some_and(|t| !t.is_empty());
        if !has_reference {
            return GradeResult::fail(
                "factuality",
                "expected.text is required for factuality grading",
            );
        }

        self.rubric.grade(output, expected, ctx).await
    }
}
