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

//! Run persistence.
//!
//! A Run is one pretty-printed JSON document, validated strictly on both
//! write and read: structural invariants plus unknown-key rejection. An
//! artifact that fails validation is never written, and a stored document
//! that fails validation is never handed to callers.

use std::path::Path;

use agent_evals_core::{Run, ValidationError};
use thiserror::Error;
use tracing::info;

/// Errors from reading or writing Run artifacts
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid run document: {0}")]
    Json(#[from] serde_json::Error),

    #[error("run failed validation: {0}")]
    Validation(#[from] ValidationError),
}

/// Serialize a Run to its canonical JSON document
pub fn to_json(run: &Run) -> Result<String, StoreError> {
    run.validate()?;
    let mut document = serde_json::to_string_pretty(run)?;
    document.push('\n');
    Ok(document)
}

/// Parse and validate a Run from its JSON document
pub fn from_json(document: &str) -> Result<Run, StoreError> {
    let run: Run = serde_json::from_str(document)?;
    run.validate()?;
    Ok(run)
}

/// Write a validated Run to disk
pub fn save_run(run: &Run, path: &Path) -> Result<(), StoreError> {
    let document = to_json(run)?;
    std::fs::write(path, document).map_err(|source| StoreError::Io {
        path: path.display().to_string(),
        source,
    })?;
    info!(run_id = %run.id, path = %path.display(), "run saved");
    Ok(())
}

/// Read and validate a Run from disk
pub fn load_run(path: &Path) -> Result<Run, StoreError> {
    let document = std::fs::read_to_string(path).map_err(|source| StoreError::Io {
        path: path.display().to_string(),
        source,
    })?;
    from_json(&document)
}
