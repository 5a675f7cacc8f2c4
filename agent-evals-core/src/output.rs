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

//! Target output contracts: what a target invocation hands back to the harness.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ValidationError;

/// Token counts reported by a target invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TokenUsage {
    /// Input (prompt) tokens
    pub input: u64,

    /// Output (completion) tokens
    pub output: u64,
}

impl TokenUsage {
    pub fn new(input: u64, output: u64) -> Self {
        Self { input, output }
    }

    /// Total tokens across both directions
    pub fn total(&self) -> u64 {
        self.input + self.output
    }
}

/// One tool invocation recorded by the target
///
/// The position of a call within `TargetOutput::tool_calls` IS the call
/// sequence; there is no separate ordering field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToolCall {
    /// Tool name as the agent invoked it
    pub name: String,

    /// Arguments passed to the tool
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<serde_json::Map<String, Value>>,

    /// Whatever the tool returned
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
}

impl ToolCall {
    /// Create a named call with no args or result
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: None,
            result: None,
        }
    }

    pub fn with_args(mut self, args: serde_json::Map<String, Value>) -> Self {
        self.args = Some(args);
        self
    }

    pub fn with_result(mut self, result: Value) -> Self {
        self.result = Some(result);
        self
    }
}

/// Everything a single target invocation produced
///
/// Strictly validated: unknown keys are rejected on deserialization so a
/// drifting target contract fails loudly instead of silently dropping data.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TargetOutput {
    /// Final text response, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    /// Ordered tool call trace
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,

    /// Wall-clock latency of the invocation in milliseconds
    #[serde(default)]
    pub latency_ms: u64,

    /// Token counts, when the target reports them
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_usage: Option<TokenUsage>,

    /// Dollar cost of the invocation, when the target reports it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost: Option<f64>,

    /// Opaque provider payload, preserved but never interpreted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<Value>,
}

impl TargetOutput {
    /// Create an output carrying only a text response
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn with_tool_calls(mut self, calls: Vec<ToolCall>) -> Self {
        self.tool_calls = Some(calls);
        self
    }

    pub fn with_latency_ms(mut self, latency_ms: u64) -> Self {
        self.latency_ms = latency_ms;
        self
    }

    pub fn with_token_usage(mut self, usage: TokenUsage) -> Self {
        self.token_usage = Some(usage);
        self
    }

    pub fn with_cost(mut self, cost: f64) -> Self {
        self.cost = Some(cost);
        self
    }

    pub fn with_raw(mut self, raw: Value) -> Self {
        self.raw = Some(raw);
        self
    }

    /// Tool names in call order, empty when no calls were recorded
    pub fn tool_names(&self) -> Vec<&str> {
        self.tool_calls
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(|c| c.name.as_str())
            .collect()
    }

    /// Structural checks beyond what the type system enforces
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(cost) = self.cost {
            if !cost.is_finite() || cost < 0.0 {
                return Err(ValidationError::NegativeCost { cost });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_usage_total() {
        let usage = TokenUsage::new(120, 30);
        assert_eq!(usage.total(), 150);
    }

    #[test]
    fn test_tool_call_order_is_preserved() {
        let output = TargetOutput::from_text("done")
            .with_tool_calls(vec![ToolCall::new("search"), ToolCall::new("format")]);
        assert_eq!(output.tool_names(), vec!["search", "format"]);
    }

    #[test]
    fn test_output_round_trip() {
        let output = TargetOutput::from_text("Response for: hi")
            .with_latency_ms(50)
            .with_cost(0.001)
            .with_token_usage(TokenUsage::new(10, 5));

        let json = serde_json::to_string(&output).unwrap();
        let back: TargetOutput = serde_json::from_str(&json).unwrap();
        assert_eq!(back, output);
    }

    #[test]
    fn test_output_rejects_unknown_keys() {
        let json = r#"{"text": "hi", "latencyMs": 10, "surprise": true}"#;
        let parsed: Result<TargetOutput, _> = serde_json::from_str(json);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_output_uses_camel_case_keys() {
        let output = TargetOutput::from_text("hi").with_latency_ms(5);
        let json = serde_json::to_value(&output).unwrap();
        assert!(json.get("latencyMs").is_some());
        assert!(json.get("latency_ms").is_none());
    }

    #[test]
    fn test_negative_cost_rejected() {
        let output = TargetOutput::from_text("hi").with_cost(-0.5);
        assert!(output.validate().is_err());
    }
}
