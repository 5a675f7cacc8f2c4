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

//! Suite definitions: cases, default graders, and gates bound together.

use std::collections::HashSet;
use std::path::PathBuf;

use agent_evals_core::Case;

use crate::gates::GateConfig;
use crate::{loader, ConfigError, GraderConfig};

/// Where a suite's cases come from
pub enum CaseSource {
    /// Cases declared in memory
    Inline(Vec<Case>),
    /// A `.jsonl` / `.yaml` / `.yml` file resolved at run time
    Path(PathBuf),
}

/// A named collection of cases with default graders and optional gates
pub struct Suite {
    pub id: String,
    pub cases: CaseSource,
    pub default_graders: Vec<GraderConfig>,
    pub gates: Option<GateConfig>,
}

impl Suite {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            cases: CaseSource::Inline(Vec::new()),
            default_graders: Vec::new(),
            gates: None,
        }
    }

    pub fn with_cases(mut self, cases: Vec<Case>) -> Self {
        self.cases = CaseSource::Inline(cases);
        self
    }

    pub fn with_case_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.cases = CaseSource::Path(path.into());
        self
    }

    pub fn with_default_graders(mut self, graders: Vec<GraderConfig>) -> Self {
        self.default_graders = graders;
        self
    }

    pub fn with_gates(mut self, gates: GateConfig) -> Self {
        self.gates = Some(gates);
        self
    }

    /// Materialize the case list, enforcing unique ids
    ///
    /// All configuration errors surface here, before any case executes.
    pub fn resolve_cases(&self) -> Result<Vec<Case>, ConfigError> {
        match &self.cases {
            CaseSource::Path(path) => loader::load_cases(path),
            CaseSource::Inline(cases) => {
                let mut seen = HashSet::new();
                for case in cases {
                    if !seen.insert(case.id.as_str()) {
                        return Err(ConfigError::DuplicateInlineCaseId {
                            id: case.id.clone(),
                        });
                    }
                }
                Ok(cases.clone())
            }
        }
    }
}
