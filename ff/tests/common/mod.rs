//! Shared helpers for integration tests
#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{Value, json};

use featureforge::config::PipelineConfig;
use featureforge::llm::{CompletionRequest, CompletionResponse, LlmClient, LlmError};

/// LLM stand-in that answers by the submit tool a request offers
///
/// Every request offers exactly one `submit_*` tool. Responses are queued
/// per tool and served in order; the three review stages share
/// `submit_review`, so their responses follow review order.
#[derive(Default)]
pub struct ScriptedLlm {
    queues: Mutex<HashMap<String, VecDeque<CompletionResponse>>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedLlm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response for requests offering `submit_tool`
    pub fn on(self, submit_tool: &str, response: CompletionResponse) -> Self {
        self.queues
            .lock()
            .unwrap()
            .entry(submit_tool.to_string())
            .or_default()
            .push_back(response);
        self
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Requests that offered `submit_tool`
    pub fn requests_for(&self, submit_tool: &str) -> Vec<CompletionRequest> {
        self.requests()
            .into_iter()
            .filter(|r| submit_tool_of(r).as_deref() == Some(submit_tool))
            .collect()
    }

    /// Responses queued but never asked for
    pub fn unused(&self) -> usize {
        self.queues.lock().unwrap().values().map(|q| q.len()).sum()
    }
}

fn submit_tool_of(request: &CompletionRequest) -> Option<String> {
    request
        .tools
        .iter()
        .find(|t| t.name.starts_with("submit_"))
        .map(|t| t.name.clone())
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let tool = submit_tool_of(&request)
            .ok_or_else(|| LlmError::InvalidResponse("request offered no submit tool".to_string()))?;
        self.requests.lock().unwrap().push(request);
        self.queues
            .lock()
            .unwrap()
            .get_mut(&tool)
            .and_then(|q| q.pop_front())
            .ok_or_else(|| LlmError::InvalidResponse(format!("no scripted response for {}", tool)))
    }
}

pub fn submit(tool: &str, input: Value) -> CompletionResponse {
    CompletionResponse::tool_call(format!("tu_{}", tool), tool, input)
}

pub fn stories(titles: &[&str]) -> CompletionResponse {
    let stories: Vec<Value> = titles
        .iter()
        .map(|t| json!({ "title": t, "description": format!("As a customer I want {}", t), "story_points": 3 }))
        .collect();
    submit("submit_user_stories", json!({ "user_stories": stories }))
}

pub fn criteria(items: &[&str]) -> CompletionResponse {
    submit("submit_acceptance_criteria", json!({ "acceptance_criteria": items }))
}

pub fn tasks(titles: &[&str]) -> CompletionResponse {
    let tasks: Vec<Value> = titles
        .iter()
        .map(|t| json!({ "title": t, "description": format!("Implement {}", t) }))
        .collect();
    submit("submit_tasks", json!({ "tasks": tasks }))
}

pub fn review(needs_review: bool, feedback: &str) -> CompletionResponse {
    submit("submit_review", json!({ "feedback": feedback, "needs_review": needs_review }))
}

pub fn feature(title: &str) -> CompletionResponse {
    submit(
        "submit_feature",
        json!({ "title": title, "description": "Customers can sign in and out of the web app" }),
    )
}

/// Pipeline config with no backoff delay
pub fn test_config() -> PipelineConfig {
    let mut config = PipelineConfig::default();
    config.graph.decode_retry_backoff_ms = 0;
    config.max_tokens = 2048;
    config
}
