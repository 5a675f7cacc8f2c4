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

//! Built-in graders
//!
//! Each grader is a small struct constructed at configuration time; anything
//! that can be misconfigured (a bad regex, a bad schema) fails in the
//! constructor, never during grading. Deterministic graders are pure
//! functions over the target output; the judge-backed graders live in
//! [`crate::judge`].

pub mod compose;
pub mod numbers;
pub mod resource;
pub mod text;
pub mod tools;

mod json;

pub use compose::{AllOf, AnyOf, Not};
pub use json::JsonSchema;
pub use numbers::NoHallucinatedNumbers;
pub use resource::{Cost, Latency, TokenCount};
pub use text::{Contains, ExactMatch, NotContains, RegexMatch, SafetyKeywords};
pub use tools::{ArgsMatchMode, SequenceMode, ToolArgsMatch, ToolCalled, ToolNotCalled, ToolSequence};
