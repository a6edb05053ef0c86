//! Agent - the bounded tool-use loop behind every capability call

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use crate::config::ModelConfig;
use crate::llm::{CompletionRequest, CompletionResponse, ContentBlock, LlmClient, Message, StopReason};
use crate::tools::{ToolContext, ToolExecutor};

use super::{CapabilityError, OutputSchema, StepBudget};

/// What the capability produced
#[derive(Debug, Clone, PartialEq)]
pub enum AgentOutput {
    /// The model called the submit tool with this input
    Structured(Value),
    /// The model ended its turn with text instead
    Text(String),
}

/// One capability invocation
#[derive(Debug, Clone)]
pub struct AgentRequest {
    /// Stage name, for logs
    pub name: &'static str,
    pub system_prompt: String,
    pub messages: Vec<Message>,
    pub output: OutputSchema,
    pub model: ModelConfig,
}

/// Drives one LLM through context-tool round-trips until it submits
pub struct Agent {
    llm: Arc<dyn LlmClient>,
    tools: ToolExecutor,
    max_tool_turns: u32,
    max_tokens: u32,
}

impl Agent {
    /// Create an agent offering the standard read-only tools
    pub fn new(llm: Arc<dyn LlmClient>, max_tool_turns: u32, max_tokens: u32) -> Self {
        debug!(%max_tool_turns, %max_tokens, "Agent::new: called");
        Self {
            llm,
            tools: ToolExecutor::standard(),
            max_tool_turns,
            max_tokens,
        }
    }

    /// Run the tool-use loop for one request
    ///
    /// Returns as soon as the submit tool is called. Context-tool calls are
    /// executed and fed back. Each LLM turn and each tool call takes a step
    /// from `steps`.
    pub async fn invoke(
        &self,
        request: AgentRequest,
        ctx: &ToolContext,
        steps: &StepBudget,
    ) -> Result<AgentOutput, CapabilityError> {
        debug!(name = %request.name, submit = %request.output.tool_name, "Agent::invoke: called");
        let mut tool_defs = self.tools.definitions();
        tool_defs.push(request.output.tool_definition());

        let mut messages = request.messages;
        let mut text = String::new();

        for turn in 1..=self.max_tool_turns {
            steps.consume(request.name)?;

            let completion = CompletionRequest {
                system_prompt: request.system_prompt.clone(),
                messages: messages.clone(),
                tools: tool_defs.clone(),
                max_tokens: self.max_tokens,
                model: request.model.name.clone(),
                temperature: request.model.temperature,
            };
            let response = self.llm.complete(completion).await?;
            debug!(
                %turn,
                stop_reason = ?response.stop_reason,
                tool_calls = response.tool_calls.len(),
                "Agent::invoke: response received"
            );

            if let Some(call) = response
                .tool_calls
                .iter()
                .find(|c| c.name == request.output.tool_name)
            {
                debug!(name = %request.name, "Agent::invoke: submit tool called");
                return Ok(AgentOutput::Structured(call.input.clone()));
            }

            if let Some(content) = &response.content {
                text.push_str(content);
            }

            if !response.tool_calls.is_empty() {
                messages.push(build_assistant_message(&response));

                let mut results = Vec::with_capacity(response.tool_calls.len());
                for call in &response.tool_calls {
                    steps.consume(call.name.as_str())?;
                    let result = self.tools.execute(call, ctx).await;
                    results.push(ContentBlock::tool_result(&call.id, result.content, result.is_error));
                }
                messages.push(Message::user_blocks(results));
                // text around tool calls is commentary, not the answer
                text.clear();
                continue;
            }

            if response.stop_reason == StopReason::MaxTokens {
                if let Some(content) = &response.content {
                    messages.push(Message::assistant(content.clone()));
                }
                messages.push(Message::user(
                    "Continue from where you left off. Your previous response was truncated.",
                ));
                continue;
            }

            return Ok(AgentOutput::Text(text));
        }

        warn!(
            name = %request.name,
            max_tool_turns = self.max_tool_turns,
            "Agent::invoke: max tool turns reached without a submission"
        );
        Ok(AgentOutput::Text(text))
    }
}

/// Build assistant message from response
fn build_assistant_message(response: &CompletionResponse) -> Message {
    let mut blocks = Vec::new();

    if let Some(text) = &response.content {
        blocks.push(ContentBlock::text(text));
    }

    for call in &response.tool_calls {
        blocks.push(ContentBlock::ToolUse {
            id: call.id.clone(),
            name: call.name.clone(),
            input: call.input.clone(),
        });
    }

    Message::assistant_blocks(blocks)
}
