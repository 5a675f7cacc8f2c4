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

//! Case file loading.
//!
//! JSONL: one case per line, blank lines and `//`/`#` comment lines skipped,
//! BOM tolerated, parse errors reported with their line number. YAML: the
//! document must be a top-level sequence of cases. Duplicate case ids are
//! rejected in both formats.

use std::collections::HashSet;
use std::path::Path;

use agent_evals_core::Case;

use crate::ConfigError;

/// Load cases from a `.jsonl`, `.yaml`, or `.yml` file
pub fn load_cases(path: &Path) -> Result<Vec<Case>, ConfigError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match extension.as_deref() {
        Some("jsonl") => load_jsonl(path),
        Some("yaml") | Some("yml") => load_yaml(path),
        _ => Err(ConfigError::UnsupportedCaseFile {
            path: path.to_path_buf(),
        }),
    }
}

fn read_file(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::CaseFileIo {
        path: path.to_path_buf(),
        source,
    })?;
    // Tolerate a UTF-8 BOM from Windows editors
    Ok(content
        .strip_prefix('\u{feff}')
        .map(str::to_string)
        .unwrap_or(content))
}

fn load_jsonl(path: &Path) -> Result<Vec<Case>, ConfigError> {
    let content = read_file(path)?;
    let display = path.display().to_string();

    let mut cases = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    for (index, line) in content.lines().enumerate() {
        let line_number = index + 1;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with("//") || trimmed.starts_with('#') {
            continue;
        }

        let case: Case =
            serde_json::from_str(trimmed).map_err(|err| ConfigError::CaseLine {
                path: display.clone(),
                line: line_number,
                message: err.to_string(),
            })?;

        if !seen.insert(case.id.clone()) {
            return Err(ConfigError::DuplicateCaseId {
                id: case.id,
                path: display,
                line: Some(line_number),
            });
        }
        cases.push(case);
    }

    Ok(cases)
}

fn load_yaml(path: &Path) -> Result<Vec<Case>, ConfigError> {
    let content = read_file(path)?;
    let display = path.display().to_string();

    let document: serde_yaml::Value =
        serde_yaml::from_str(&content).map_err(|err| ConfigError::CaseFile {
            path: display.clone(),
            message: err.to_string(),
        })?;

    if !document.is_sequence() {
        return Err(ConfigError::NotASequence { path: display });
    }

    let cases: Vec<Case> =
        serde_yaml::from_value(document).map_err(|err| ConfigError::CaseFile {
            path: display.clone(),
            message: err.to_string(),
        })?;

    let mut seen: HashSet<&str> = HashSet::new();
    for case in &cases {
        if !seen.insert(case.id.as_str()) {
            return Err(ConfigError::DuplicateCaseId {
                id: case.id.clone(),
                path: display,
                line: None,
            });
        }
    }

    Ok(cases)
}
