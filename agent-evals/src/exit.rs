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

//! Process exit codes.
//!
//! The CLI front-end maps run outcomes onto these codes; they are part of
//! the observable contract (CI systems key off them), so they live here
//! rather than in the CLI.

use agent_evals_core::Run;

/// All gates passed
pub const SUCCESS: i32 = 0;

/// The run completed but a gate failed
pub const GATE_FAILED: i32 = 1;

/// Configuration error; no Run was produced
pub const CONFIG_ERROR: i32 = 2;

/// Runtime failure outside the per-case error isolation
pub const RUNTIME_ERROR: i32 = 3;

/// User abort (SIGINT convention: 128 + 2)
pub const INTERRUPTED: i32 = 130;

/// Exit code for a completed run: gates decide
pub fn exit_code_for_run(run: &Run) -> i32 {
    if run.summary.gate_result.pass {
        SUCCESS
    } else {
        GATE_FAILED
    }
}
