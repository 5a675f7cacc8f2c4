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

//! JSON Schema grader.

use agent_evals_core::{CaseExpected, GradeResult, TargetOutput};
use async_trait::async_trait;
use serde_json::Value;

use crate::{ConfigError, Grader, GraderContext};

/// Passes when the output text parses as JSON and validates against a schema
///
/// The schema is compiled eagerly at construction. The failure reason
/// distinguishes empty output, non-JSON output, and schema violations so a
/// reader can tell a formatting regression from a contract regression.
pub struct JsonSchema {
    validator: jsonschema::Validator,
    name: String,
}

impl JsonSchema {
    pub fn new(schema: Value) -> Result<Self, ConfigError> {
        let validator =
            jsonschema::validator_for(&schema).map_err(|err| ConfigError::InvalidSchema {
                message: err.to_string(),
            })?;
        Ok(Self {
            validator,
            name: "jsonSchema".to_string(),
        })
    }
}

#[async_trait]
impl Grader for JsonSchema {
    fn name(&self) -> &str {
        &self.name
    }

    async fn grade(
        &self,
        output: &TargetOutput,
        _expected: Option<&CaseExpected>,
        _ctx: &GraderContext,
    ) -> GradeResult {
        let text = output.text.as_deref().unwrap_or_default().trim();
        if text.is_empty() {
            return GradeResult::fail(&self.name, "output text is empty");
        }

        let instance: Value = match serde_json::from_str(text) {
            Ok(value) => value,
            Err(err) => {
                return GradeResult::fail(&self.name, format!("output is not valid JSON: {err}"))
            }
        };

        let result = match self.validator.iter_errors(&instance).next() {
            None => GradeResult::pass(&self.name, "output validates against schema"),
            Some(err) => GradeResult::fail(
                &self.name,
                format!("schema violation at {}: {err}", err.instance_path()),
            ),
        };
        result
    }
}
