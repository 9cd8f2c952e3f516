// SPDX-FileCopyrightText: 2026 Zapflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! [`CompletionProvider`] implementation mapping the orchestrator's turn
//! model onto the Anthropic wire types.

use async_trait::async_trait;
use zapflow_core::types::{
    Completion, CompletionRequest, ContentPart, Role, ToolInvocation, TurnMessage,
};
use zapflow_core::{CompletionProvider, ZapflowError};

use crate::client::AnthropicClient;
use crate::types::{
    ApiContent, ApiContentBlock, ApiMessage, ImageSource, MessageRequest, ResponseContentBlock,
    ToolDefinition,
};

/// Anthropic-backed completion provider.
#[derive(Debug, Clone)]
pub struct AnthropicProvider {
    client: AnthropicClient,
}

impl AnthropicProvider {
    pub fn new(client: AnthropicClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CompletionProvider for AnthropicProvider {
    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<Completion, ZapflowError> {
        let api_request = to_api_request(&request);
        let response = self.client.complete_message(&api_request).await?;

        let mut text_blocks = Vec::new();
        let mut tool_calls = Vec::new();
        for block in response.content {
            match block {
                ResponseContentBlock::Text { text } => text_blocks.push(text),
                ResponseContentBlock::ToolUse { id, name, input } => {
                    tool_calls.push(ToolInvocation { id, name, input });
                }
            }
        }

        Ok(Completion {
            text: text_blocks.join("\n\n"),
            tool_calls,
            stop_reason: response.stop_reason,
        })
    }
}

/// Converts a provider-agnostic request into the Anthropic wire shape.
fn to_api_request(request: &CompletionRequest) -> MessageRequest {
    MessageRequest {
        model: request.model.clone(),
        messages: request.messages.iter().map(to_api_message).collect(),
        system: Some(request.system.clone()),
        max_tokens: request.max_tokens,
        temperature: request.temperature,
        tools: if request.tools.is_empty() {
            None
        } else {
            Some(
                request
                    .tools
                    .iter()
                    .map(|t| ToolDefinition {
                        name: t.name.clone(),
                        description: t.description.clone(),
                        input_schema: t.input_schema.clone(),
                    })
                    .collect(),
            )
        },
    }
}

fn to_api_message(turn: &TurnMessage) -> ApiMessage {
    let role = match turn.role {
        Role::User => "user",
        Role::Assistant => "assistant",
    };

    // Single plain-text turns collapse to the string form.
    if let [ContentPart::Text { text }] = turn.parts.as_slice() {
        return ApiMessage {
            role: role.to_string(),
            content: ApiContent::Text(text.clone()),
        };
    }

    let blocks = turn
        .parts
        .iter()
        .map(|part| match part {
            ContentPart::Text { text } => ApiContentBlock::Text { text: text.clone() },
            ContentPart::ImageUrl { url } => ApiContentBlock::Image {
                source: ImageSource::Url { url: url.clone() },
            },
            ContentPart::ToolUse { id, name, input } => ApiContentBlock::ToolUse {
                id: id.clone(),
                name: name.clone(),
                input: input.clone(),
            },
            ContentPart::ToolResult {
                tool_use_id,
                content,
                is_error,
            } => ApiContentBlock::ToolResult {
                tool_use_id: tool_use_id.clone(),
                content: content.clone(),
                is_error: if *is_error { Some(true) } else { None },
            },
        })
        .collect();

    ApiMessage {
        role: role.to_string(),
        content: ApiContent::Blocks(blocks),
    }
}
