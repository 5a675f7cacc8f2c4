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

//! LLM-as-judge: the judge handle abstraction, rubric graders, and the
//! fault-tolerant response parser.
//!
//! A judge is a short-lived, stateless chat completion. Rubric graders build
//! a small message list, send it through the handle, and parse the reply.
//! Judge failures of any kind — transport, empty reply, unparseable text —
//! become failing grades; there is no code path that turns a broken judge
//! response into a pass.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod client;
pub mod parser;
pub mod rubric;

pub use client::{AnthropicJudge, CachedJudge, OpenAiJudge, ThrottledJudge};
pub use parser::{parse_judge_response, JudgeParseError, JudgeVerdict};
pub use rubric::{CalibrationExample, Factuality, LlmRubric};

/// Trait for judge handles used by rubric graders
#[async_trait]
pub trait Judge: Send + Sync {
    /// Send a message list and get the raw completion back
    async fn complete(&self, messages: &[JudgeMessage]) -> Result<JudgeReply, JudgeError>;

    /// Identifier of the underlying model
    fn model_id(&self) -> &str;
}

/// Speaker of one judge message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JudgeRole {
    System,
    User,
    Assistant,
}

impl JudgeRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            JudgeRole::System => "system",
            JudgeRole::User => "user",
            JudgeRole::Assistant => "assistant",
        }
    }
}

/// One turn in a judge conversation
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JudgeMessage {
    pub role: JudgeRole,
    pub content: String,
}

impl JudgeMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: JudgeRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: JudgeRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: JudgeRole::Assistant,
            content: content.into(),
        }
    }
}

/// Raw completion from a judge
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JudgeReply {
    /// Completion text, handed to the response parser
    pub text: String,

    /// Model that actually served the request, when known
    pub model_id: Option<String>,

    /// Dollar cost of this call, when the client can compute it
    pub cost: Option<f64>,
}

/// Errors from judge handles
#[derive(Debug, Error)]
pub enum JudgeError {
    #[error("API error: {0}")]
    ApiError(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
