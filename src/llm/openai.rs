//! OpenAI chat-completion backend with function calling.

use super::{ChatBackend, ChatMessage, ChatOutcome, ToolInvocation, ToolSpec};
use crate::error::{Result, SvarError};
use crate::openai::create_client;
use async_openai::types::{
    ChatCompletionMessageToolCall, ChatCompletionRequestAssistantMessageArgs,
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestToolMessageArgs, ChatCompletionRequestUserMessageArgs,
    ChatCompletionTool, ChatCompletionToolType, CreateChatCompletionRequestArgs, FunctionCall,
    FunctionObject,
};
use async_trait::async_trait;
use tracing::debug;

/// Completion backend talking to the OpenAI chat API.
pub struct OpenAIBackend {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
}

impl OpenAIBackend {
    /// Create a backend for the given model.
    pub fn new(model: &str) -> Self {
        Self {
            client: create_client(),
            model: model.to_string(),
        }
    }
}

#[async_trait]
impl ChatBackend for OpenAIBackend {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolSpec],
    ) -> Result<ChatOutcome> {
        let request_messages = messages
            .iter()
            .map(to_request_message)
            .collect::<Result<Vec<_>>>()?;

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(request_messages)
            .tools(tools.iter().map(to_tool_definition).collect::<Vec<_>>())
            .build()
            .map_err(|e| SvarError::Agent(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| SvarError::OpenAI(format!("chat API error: {}", e)))?;

        let choice = response
            .choices
            .first()
            .ok_or_else(|| SvarError::Agent("no response from model".to_string()))?;

        // Non-empty tool_calls means the model wants tools run; anything
        // else is the final answer.
        if let Some(ref tool_calls) = choice.message.tool_calls {
            if !tool_calls.is_empty() {
                debug!("Model requested {} tool call(s)", tool_calls.len());
                return Ok(ChatOutcome::ToolCalls(
                    tool_calls
                        .iter()
                        .map(|tc| ToolInvocation {
                            call_id: tc.id.clone(),
                            name: tc.function.name.clone(),
                            arguments: tc.function.arguments.clone(),
                        })
                        .collect(),
                ));
            }
        }

        Ok(ChatOutcome::Text(
            choice.message.content.clone().unwrap_or_default(),
        ))
    }
}

fn to_request_message(message: &ChatMessage) -> Result<ChatCompletionRequestMessage> {
    let built = match message {
        ChatMessage::System(text) => ChatCompletionRequestSystemMessageArgs::default()
            .content(text.clone())
            .build()
            .map(Into::into),
        ChatMessage::User(text) => ChatCompletionRequestUserMessageArgs::default()
            .content(text.clone())
            .build()
            .map(Into::into),
        ChatMessage::Assistant(text) => ChatCompletionRequestAssistantMessageArgs::default()
            .content(text.clone())
            .build()
            .map(Into::into),
        ChatMessage::ToolRequest(invocations) => {
            ChatCompletionRequestAssistantMessageArgs::default()
                .tool_calls(
                    invocations
                        .iter()
                        .map(|inv| ChatCompletionMessageToolCall {
                            id: inv.call_id.clone(),
                            r#type: ChatCompletionToolType::Function,
                            function: FunctionCall {
                                name: inv.name.clone(),
                                arguments: inv.arguments.clone(),
                            },
                        })
                        .collect::<Vec<_>>(),
                )
                .build()
                .map(Into::into)
        }
        ChatMessage::ToolResult { call_id, content } => {
            ChatCompletionRequestToolMessageArgs::default()
                .tool_call_id(call_id.clone())
                .content(content.clone())
                .build()
                .map(Into::into)
        }
    };

    built.map_err(|e| SvarError::Agent(e.to_string()))
}

fn to_tool_definition(spec: &ToolSpec) -> ChatCompletionTool {
    ChatCompletionTool {
        r#type: ChatCompletionToolType::Function,
        function: FunctionObject {
            name: spec.name.to_string(),
            description: Some(spec.description.to_string()),
            parameters: Some(spec.parameters.clone()),
            strict: None,
        },
    }
}
