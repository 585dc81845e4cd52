//! OpenRouter/OpenAI-compatible chat-completions backend for
//! [`ReasoningAgent`].
//!
//! One task run is a bounded loop: submit the directive with the worker's
//! capabilities as function tools, execute whatever the model elects to
//! invoke through the host, feed the outcomes back, and stop once the model
//! answers in plain text.

use reqwest::Client;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info, trace};

use crate::{
    AgentError, AgentFactory, AgentProfile, CapabilityCall, CapabilityHost, ReasoningAgent,
    Result, TaskOptions, WorkerDef,
};

const DEFAULT_MAX_ITERATIONS: u32 = 8;

/// A capability invocation paired with the engine's call id, so the outcome
/// can be threaded back into the conversation.
struct ToolInvocation {
    id: String,
    call: CapabilityCall,
}

/// Chat-completions reasoning engine for one persona.
pub struct OpenRouterAgent {
    client: Client,
    api_key: String,
    api_base: String,
    model: String,
    max_iterations: u32,
    profile: AgentProfile,
}

impl OpenRouterAgent {
    pub fn new(
        api_key: impl Into<String>,
        api_base: Option<String>,
        model: impl Into<String>,
        profile: AgentProfile,
    ) -> Self {
        let api_key = api_key.into();
        let is_openrouter = api_key.starts_with("sk-or-")
            || api_base
                .as_ref()
                .map(|b| b.contains("openrouter"))
                .unwrap_or(false);

        let api_base = api_base.unwrap_or_else(|| {
            if is_openrouter {
                "https://openrouter.ai/api/v1".to_string()
            } else {
                "https://api.openai.com/v1".to_string()
            }
        });

        Self {
            client: Client::new(),
            api_key,
            api_base,
            model: model.into(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
            profile,
        }
    }

    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    fn system_prompt(&self) -> String {
        format!(
            "You are {}.\nGoal: {}\n{}",
            self.profile.name, self.profile.goal, self.profile.description
        )
    }

    fn build_request(&self, worker: &WorkerDef, messages: &[Value]) -> Value {
        let tools: Vec<Value> = worker
            .capabilities
            .iter()
            .map(|c| {
                json!({
                    "type": "function",
                    "function": {
                        "name": c.name,
                        "description": c.description,
                        "parameters": c.parameters(),
                    }
                })
            })
            .collect();

        let mut body = json!({
            "model": self.model,
            "messages": messages,
        });
        if !tools.is_empty() {
            body["tools"] = json!(tools);
            body["tool_choice"] = json!("auto");
        }
        body
    }

    fn parse_response(json: Value) -> Result<(Option<String>, Vec<ToolInvocation>, Value)> {
        let message = json["choices"]
            .get(0)
            .map(|choice| choice["message"].clone())
            .ok_or_else(|| AgentError::InvalidResponse("no choices in response".to_string()))?;

        let content = message["content"].as_str().map(|s| s.to_string());

        let mut invocations = Vec::new();
        if let Some(calls) = message["tool_calls"].as_array() {
            for call in calls {
                let function = &call["function"];
                let arguments = function["arguments"]
                    .as_str()
                    .and_then(|s| serde_json::from_str(s).ok())
                    .unwrap_or_else(|| function["arguments"].clone());

                invocations.push(ToolInvocation {
                    id: call["id"].as_str().unwrap_or("").to_string(),
                    call: CapabilityCall::new(
                        function["name"].as_str().unwrap_or(""),
                        arguments,
                    ),
                });
            }
        }

        Ok((content, invocations, message))
    }

    async fn chat(&self, body: &Value) -> Result<Value> {
        let url = format!("{}/chat/completions", self.api_base);
        trace!("submitting chat request to {}", url);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await?;

        let status = response.status();
        let json: Value = response.json().await?;

        if !status.is_success() {
            let detail = json["error"]["message"]
                .as_str()
                .unwrap_or("unknown error")
                .to_string();
            return Err(AgentError::Task(format!("{}: {}", status, detail)));
        }

        Ok(json)
    }
}

#[async_trait::async_trait]
impl ReasoningAgent for OpenRouterAgent {
    async fn init(&self) -> Result<()> {
        if self.api_key.is_empty() {
            return Err(AgentError::NoApiKey);
        }
        debug!("{} ready (model {})", self.profile.name, self.model);
        Ok(())
    }

    async fn run_task(
        &self,
        worker_id: &str,
        prompt: &str,
        opts: TaskOptions,
        host: &dyn CapabilityHost,
    ) -> Result<()> {
        let worker = self
            .profile
            .worker(worker_id)
            .ok_or_else(|| AgentError::UnknownWorker(worker_id.to_string()))?;

        let mut messages = vec![
            json!({"role": "system", "content": self.system_prompt()}),
            json!({
                "role": "user",
                "content": format!("[{}] {}\n{}", worker.name, worker.description, prompt),
            }),
        ];

        for iteration in 1..=self.max_iterations {
            debug!("{} iteration {}", self.profile.name, iteration);

            let body = self.build_request(worker, &messages);
            let response = self.chat(&body).await?;
            let (content, invocations, raw_message) = Self::parse_response(response)?;

            if invocations.is_empty() {
                if opts.verbose {
                    info!(
                        "{} finished: {}",
                        self.profile.name,
                        content.as_deref().unwrap_or("(no content)")
                    );
                }
                return Ok(());
            }

            messages.push(raw_message);
            for invocation in invocations {
                let name = invocation.call.name.clone();
                let outcome = host.invoke(invocation.call).await;
                messages.push(json!({
                    "role": "tool",
                    "tool_call_id": invocation.id,
                    "name": name,
                    "content": serde_json::to_string(&outcome)?,
                }));
            }
        }

        Err(AgentError::MaxIterations)
    }
}

/// Builds [`OpenRouterAgent`]s, one per persona, honoring per-profile model
/// overrides.
pub struct OpenRouterFactory {
    api_key: String,
    api_base: Option<String>,
    default_model: String,
    max_iterations: u32,
}

impl OpenRouterFactory {
    pub fn new(api_key: impl Into<String>) -> Self {
        let api_key = api_key.into();
        let default_model = if api_key.starts_with("sk-or-") {
            "anthropic/claude-sonnet-4".to_string()
        } else {
            "gpt-4".to_string()
        };

        Self {
            api_key,
            api_base: None,
            default_model,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = Some(api_base.into());
        self
    }

    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }
}

impl AgentFactory for OpenRouterFactory {
    fn create(&self, profile: AgentProfile) -> Arc<dyn ReasoningAgent> {
        let model = profile
            .model
            .clone()
            .unwrap_or_else(|| self.default_model.clone());
        Arc::new(
            OpenRouterAgent::new(self.api_key.clone(), self.api_base.clone(), model, profile)
                .with_max_iterations(self.max_iterations),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ArgSpec, CapabilityDef};

    fn profile() -> AgentProfile {
        AgentProfile::new("Alice", "Win the duel", "Personality: `bold`").with_worker(
            WorkerDef::new("combat", "Combat", "Fight it out").with_capability(
                CapabilityDef::new("attack", "Strike a target")
                    .with_arg(ArgSpec::required("target", "who to hit")),
            ),
        )
    }

    #[test]
    fn test_new_with_openrouter_key() {
        let agent = OpenRouterAgent::new("sk-or-test123", None, "anthropic/claude-sonnet-4", profile());
        assert_eq!(agent.api_base, "https://openrouter.ai/api/v1");
    }

    #[test]
    fn test_new_with_openai_key() {
        let agent = OpenRouterAgent::new("sk-openai123", None, "gpt-4", profile());
        assert_eq!(agent.api_base, "https://api.openai.com/v1");
    }

    #[test]
    fn test_new_with_custom_base() {
        let agent = OpenRouterAgent::new(
            "some-key",
            Some("https://llm.internal/v1".to_string()),
            "local-model",
            profile(),
        );
        assert_eq!(agent.api_base, "https://llm.internal/v1");
    }

    #[test]
    fn test_build_request_includes_worker_tools() {
        let agent = OpenRouterAgent::new("sk-test", None, "gpt-4", profile());
        let worker = agent.profile.worker("combat").unwrap().clone();
        let messages = vec![json!({"role": "user", "content": "go"})];

        let body = agent.build_request(&worker, &messages);

        assert_eq!(body["model"], "gpt-4");
        assert_eq!(body["tool_choice"], "auto");
        let tools = body["tools"].as_array().unwrap();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0]["function"]["name"], "attack");
        assert_eq!(
            tools[0]["function"]["parameters"]["required"][0],
            "target"
        );
    }

    #[test]
    fn test_build_request_without_capabilities_has_no_tools() {
        let agent = OpenRouterAgent::new("sk-test", None, "gpt-4", profile());
        let worker = WorkerDef::new("idle", "Idle", "Nothing to do");
        let body = agent.build_request(&worker, &[]);
        assert!(body.get("tools").is_none());
        assert!(body.get("tool_choice").is_none());
    }

    #[test]
    fn test_parse_response_plain_text() {
        let response = json!({
            "choices": [{
                "message": {"role": "assistant", "content": "Done for this turn."},
                "finish_reason": "stop"
            }]
        });

        let (content, invocations, _) = OpenRouterAgent::parse_response(response).unwrap();
        assert_eq!(content.as_deref(), Some("Done for this turn."));
        assert!(invocations.is_empty());
    }

    #[test]
    fn test_parse_response_string_encoded_tool_arguments() {
        let response = json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": Value::Null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {
                            "name": "attack",
                            "arguments": "{\"target\": \"Bob\"}"
                        }
                    }]
                },
                "finish_reason": "tool_calls"
            }]
        });

        let (content, invocations, _) = OpenRouterAgent::parse_response(response).unwrap();
        assert!(content.is_none());
        assert_eq!(invocations.len(), 1);
        assert_eq!(invocations[0].id, "call_1");
        assert_eq!(invocations[0].call.name, "attack");
        assert_eq!(invocations[0].call.arg("target").as_deref(), Some("Bob"));
    }

    #[test]
    fn test_parse_response_missing_choices() {
        let result = OpenRouterAgent::parse_response(json!({"usage": {}}));
        assert!(matches!(result, Err(AgentError::InvalidResponse(_))));
    }

    #[tokio::test]
    async fn test_init_requires_api_key() {
        let agent = OpenRouterAgent::new("", None, "gpt-4", profile());
        assert!(matches!(agent.init().await, Err(AgentError::NoApiKey)));

        let agent = OpenRouterAgent::new("sk-test", None, "gpt-4", profile());
        assert!(agent.init().await.is_ok());
    }

    #[test]
    fn test_factory_honors_profile_model_override() {
        let factory = OpenRouterFactory::new("sk-or-test").with_default_model("fallback-model");

        // The factory output is opaque; verify the selection logic directly.
        let with_override = profile().with_model("special-model");
        let model = with_override
            .model
            .clone()
            .unwrap_or_else(|| factory.default_model.clone());
        assert_eq!(model, "special-model");

        let without = profile();
        let model = without
            .model
            .clone()
            .unwrap_or_else(|| factory.default_model.clone());
        assert_eq!(model, "fallback-model");
    }
}
