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

//! Judge handle implementations.
//!
//! Thin chat-completion adapters for the two common providers, plus
//! composable wrappers for caching and rate limiting. Anything stateful a
//! deployment needs (caches, throttles) wraps the handle; the graders only
//! ever see `Arc<dyn Judge>`.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use super::{Judge, JudgeError, JudgeMessage, JudgeReply, JudgeRole};

/// OpenAI chat-completions judge
pub struct OpenAiJudge {
    api_key: String,
    model: String,
    base_url: String,
    client: reqwest::Client,
}

impl OpenAiJudge {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            api_key,
            model,
            base_url: "https://api.openai.com/v1".to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    /// Cost per token (input, output) for the configured model
    fn cost_per_token(&self) -> (f64, f64) {
        match self.model.as_str() {
            "gpt-4o" => (0.0000025, 0.000010),
            "gpt-4o-mini" => (0.00000015, 0.0000006),
            "gpt-4-turbo" => (0.000010, 0.000030),
            _ => (0.00000015, 0.0000006),
        }
    }
}

#[async_trait]
impl Judge for OpenAiJudge {
    async fn complete(&self, messages: &[JudgeMessage]) -> Result<JudgeReply, JudgeError> {
        let request = serde_json::json!({
            "model": self.model,
            "messages": messages
                .iter()
                .map(|m| serde_json::json!({"role": m.role.as_str(), "content": m.content}))
                .collect::<Vec<_>>(),
            "temperature": 0.0,
            "response_format": { "type": "json_object" }
        });

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await?;
            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                return Err(JudgeError::RateLimitExceeded);
            }
            return Err(JudgeError::ApiError(error_text));
        }

        let response_data: serde_json::Value = response.json().await?;

        let text = response_data["choices"][0]["message"]["content"]
            .as_str()
            .ok_or(JudgeError::InvalidResponse("Missing content".to_string()))?
            .to_string();

        let usage = &response_data["usage"];
        let (input_cost, output_cost) = self.cost_per_token();
        let cost = usage["prompt_tokens"].as_u64().unwrap_or(0) as f64 * input_cost
            + usage["completion_tokens"].as_u64().unwrap_or(0) as f64 * output_cost;

        Ok(JudgeReply {
            text,
            model_id: Some(self.model.clone()),
            cost: Some(cost),
        })
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}

/// Anthropic messages-API judge
///
/// System turns are folded into the request's `system` field; the remaining
/// turns are sent as messages.
pub struct AnthropicJudge {
    api_key: String,
    model: String,
    base_url: String,
    client: reqwest::Client,
}

impl AnthropicJudge {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            api_key,
            model,
            base_url: "https://api.anthropic.com/v1".to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    fn cost_per_token(&self) -> (f64, f64) {
        match self.model.as_str() {
            "claude-sonnet-4.5" | "claude-3-5-sonnet-20241022" => (0.000003, 0.000015),
            "claude-3-5-haiku-20241022" => (0.0000008, 0.000004),
            _ => (0.000003, 0.000015),
        }
    }
}

#[async_trait]
impl Judge for AnthropicJudge {
    async fn complete(&self, messages: &[JudgeMessage]) -> Result<JudgeReply, JudgeError> {
        let system: Vec<&str> = messages
            .iter()
            .filter(|m| m.role == JudgeRole::System)
            .map(|m| m.content.as_str())
            .collect();
        let turns: Vec<serde_json::Value> = messages
            .iter()
            .filter(|m| m.role != JudgeRole::System)
            .map(|m| serde_json::json!({"role": m.role.as_str(), "content": m.content}))
            .collect();

        let request = serde_json::json!({
            "model": self.model,
            "max_tokens": 4096,
            "system": system.join("\n\n"),
            "messages": turns,
            "temperature": 0.0
        });

        let response = self
            .client
            .post(format!("{}/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await?;
            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                return Err(JudgeError::RateLimitExceeded);
            }
            return Err(JudgeError::ApiError(error_text));
        }

        let response_data: serde_json::Value = response.json().await?;

        let text = response_data["content"][0]["text"]
            .as_str()
            .ok_or(JudgeError::InvalidResponse("Missing content".to_string()))?
            .to_string();

        let usage = &response_data["usage"];
        let (input_cost, output_cost) = self.cost_per_token();
        let cost = usage["input_tokens"].as_u64().unwrap_or(0) as f64 * input_cost
            + usage["output_tokens"].as_u64().unwrap_or(0) as f64 * output_cost;

        Ok(JudgeReply {
            text,
            model_id: Some(self.model.clone()),
            cost: Some(cost),
        })
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}

/// Caching wrapper: identical message lists are answered from memory
///
/// Judge calls are stateless and temperature-0, so replaying an identical
/// transcript through the same model is pure waste. Cached replies keep
/// their original cost field; callers who want marginal cost should read
/// the hit/miss stats.
pub struct CachedJudge {
    inner: Arc<dyn Judge>,
    cache: moka::future::Cache<u64, JudgeReply>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl CachedJudge {
    pub fn new(inner: Arc<dyn Judge>, ttl: Duration) -> Self {
        Self {
            inner,
            cache: moka::future::Cache::builder()
                .max_capacity(10_000)
                .time_to_live(ttl)
                .build(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    fn cache_key(&self, messages: &[JudgeMessage]) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.inner.model_id().hash(&mut hasher);
        messages.hash(&mut hasher);
        hasher.finish()
    }

    /// (hits, misses) since construction
    pub fn stats(&self) -> (u64, u64) {
        (
            self.hits.load(Ordering::Relaxed),
            self.misses.load(Ordering::Relaxed),
        )
    }
}

#[async_trait]
impl Judge for CachedJudge {
    async fn complete(&self, messages: &[JudgeMessage]) -> Result<JudgeReply, JudgeError> {
        let key = self.cache_key(messages);
        if let Some(reply) = self.cache.get(&key).await {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(reply);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let reply = self.inner.complete(messages).await?;
        self.cache.insert(key, reply.clone()).await;
        Ok(reply)
    }

    fn model_id(&self) -> &str {
        self.inner.model_id()
    }
}

/// Rate-limiting wrapper: enforces a minimum interval between calls
///
/// Throttling lives on the handle so it composes with any provider and
/// never alters the sequential case contract.
pub struct ThrottledJudge {
    inner: Arc<dyn Judge>,
    min_interval: Duration,
    last_call: parking_lot::Mutex<Option<Instant>>,
}

impl ThrottledJudge {
    pub fn new(inner: Arc<dyn Judge>, min_interval: Duration) -> Self {
        Self {
            inner,
            min_interval,
            last_call: parking_lot::Mutex::new(None),
        }
    }

    fn reserve_slot(&self) -> Duration {
        let mut last = self.last_call.lock();
        let now = Instant::now();
        let wait = match *last {
            Some(previous) => {
                let ready_at = previous + self.min_interval;
                ready_at.saturating_duration_since(now)
            }
            None => Duration::ZERO,
        };
        *last = Some(now + wait);
        wait
    }
}

#[async_trait]
impl Judge for ThrottledJudge {
    async fn complete(&self, messages: &[JudgeMessage]) -> Result<JudgeReply, JudgeError> {
        let wait = self.reserve_slot();
        if !wait.is_zero() {
            tokio::time::sleep(wait).await;
        }
        self.inner.complete(messages).await
    }

    fn model_id(&self) -> &str {
        self.inner.model_id()
    }
}
