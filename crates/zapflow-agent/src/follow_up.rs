// SPDX-FileCopyrightText: 2026 Zapflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Follow-up nudge generation.
//!
//! The scheduler that decides *when* a quiet lead gets a nudge is an
//! external collaborator; it calls this function when it fires. The nudge
//! is generated and delivered through the same loop and dispatcher as a
//! normal reply, so pacing, tooling, and persistence behave identically.

use std::sync::Arc;

use tracing::info;
use zapflow_core::types::{InvocationReport, InvocationStatus, TurnMessage};
use zapflow_core::ZapflowError;

use crate::context;
use crate::dispatch::Dispatcher;
use crate::pacing::Pacing;
use crate::run_loop::{self, LoopParams};
use crate::tools::ToolExecutor;
use crate::Orchestrator;

/// Instruction appended as the final user-role turn of a nudge generation.
const NUDGE_INSTRUCTION: &str = "\
The customer has gone quiet since the conversation above. Write ONE short, \
warm follow-up message that references something concrete from the \
conversation and gives them an easy way to pick it back up. Do not apologize \
for messaging, do not pressure, and do not repeat an earlier message verbatim.";

/// Generates and delivers a re-engagement nudge for a quiet lead.
pub async fn generate_follow_up(
    orchestrator: &Orchestrator,
    conversation_id: &str,
) -> Result<InvocationReport, ZapflowError> {
    let Some(lead) = orchestrator.leads.get(conversation_id).await? else {
        return Err(ZapflowError::Internal(format!(
            "no lead for conversation {conversation_id}"
        )));
    };

    if !lead.automation_enabled {
        info!(conversation_id, "automation disabled, skipping follow-up");
        return Ok(InvocationReport::skipped(
            InvocationStatus::SkippedAutomationDisabled,
        ));
    }

    let config = &orchestrator.config;
    let mut system = context::resolve_script(&config.agent).await;
    system.push_str(
        "\n\nYou are re-engaging a customer who stopped replying; this turn was \
         initiated by you, not them.",
    );

    let history = orchestrator
        .messages
        .recent(conversation_id, config.agent.history_window)
        .await?;
    let mut turns: Vec<TurnMessage> = Vec::new();
    for msg in &history {
        let role = match msg.direction {
            zapflow_core::types::Direction::Inbound => zapflow_core::types::Role::User,
            zapflow_core::types::Direction::Outbound => zapflow_core::types::Role::Assistant,
        };
        turns.push(TurnMessage {
            role,
            parts: vec![zapflow_core::types::ContentPart::Text {
                text: msg.text.clone().unwrap_or_default(),
            }],
        });
    }
    turns.push(TurnMessage::user_text(NUDGE_INSTRUCTION));

    let instance = lead
        .instance
        .clone()
        .unwrap_or_else(|| config.gateway.default_instance.clone());
    let pacing = Pacing::from_config(&config.pacing);

    let executor = ToolExecutor::new(
        conversation_id,
        &instance,
        Arc::clone(&orchestrator.messages),
        Arc::clone(&orchestrator.leads),
        Arc::clone(&orchestrator.gateway),
        Arc::clone(&orchestrator.notifier),
        config.media.catalog.clone(),
        pacing,
    );
    let dispatcher = Dispatcher::new(
        conversation_id,
        &instance,
        Arc::clone(&orchestrator.gateway),
        Arc::clone(&orchestrator.messages),
        pacing,
    );

    let log = run_loop::run(
        orchestrator.provider.as_ref(),
        &executor,
        &dispatcher,
        system,
        turns,
        &LoopParams {
            model: config.anthropic.model.clone(),
            max_tokens: config.anthropic.max_tokens,
            temperature: config.anthropic.temperature,
            max_iterations: config.agent.max_iterations,
        },
    )
    .await?;

    info!(conversation_id, iterations = log.iterations, "follow-up generated");
    Ok(InvocationReport::completed(log))
}
