// SPDX-FileCopyrightText: 2026 Zapflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The bounded agent loop.
//!
//! An explicit two-state machine with a hard iteration cap: the
//! termination guarantee is visible in the structure, not implied by an
//! open-ended `loop`. Visible text is dispatched before tools run so
//! delivery order matches what the customer reads.

use std::sync::OnceLock;

use regex::Regex;
use tracing::{debug, info};
use zapflow_core::types::{
    Completion, CompletionRequest, ContentPart, ExecutionLog, Role, StepLog, ToolSpec,
    TurnMessage,
};
use zapflow_core::{CompletionProvider, ZapflowError};

use crate::dispatch::Dispatcher;
use crate::tools::{self, ToolExecutor};

/// Loop state. Tool execution always re-enters `Running` so the model can
/// acknowledge results; only a tool-free natural finish (or the cap) stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Running,
    Stopped,
}

impl std::fmt::Display for LoopState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoopState::Running => write!(f, "running"),
            LoopState::Stopped => write!(f, "stopped"),
        }
    }
}

/// Model parameters for the loop's completion calls.
#[derive(Debug, Clone)]
pub struct LoopParams {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: Option<f32>,
    pub max_iterations: u32,
}

/// Strips bracket-delimited stage directions the model should not surface
/// to the end user (e.g. `[pauses]`, `[sends the brochure]`).
pub fn strip_stage_directions(text: &str) -> String {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"\[[^\[\]]*\]").expect("static regex compiles"));
    re.replace_all(text, "").trim().to_string()
}

/// Drives the completion/tool cycle until a finish condition or the cap.
pub async fn run(
    provider: &dyn CompletionProvider,
    executor: &ToolExecutor,
    dispatcher: &Dispatcher,
    system: String,
    mut turns: Vec<TurnMessage>,
    params: &LoopParams,
) -> Result<ExecutionLog, ZapflowError> {
    let tool_catalog: Vec<ToolSpec> = tools::catalog();
    let mut state = LoopState::Running;
    let mut log = ExecutionLog::default();

    while state == LoopState::Running && log.iterations < params.max_iterations {
        log.iterations += 1;
        debug!(iteration = log.iterations, "agent loop iteration");

        let completion = provider
            .complete(CompletionRequest {
                model: params.model.clone(),
                system: system.clone(),
                messages: turns.clone(),
                max_tokens: params.max_tokens,
                temperature: params.temperature,
                tools: tool_catalog.clone(),
            })
            .await?;

        let visible = strip_stage_directions(&completion.text);
        let mut step = StepLog {
            text_sent: false,
            tools_executed: Vec::new(),
        };

        // Visible text precedes its associated side effects in delivery order.
        if !visible.is_empty() {
            dispatcher.deliver(&visible).await?;
            step.text_sent = true;
        }

        append_assistant_turn(&mut turns, &completion);

        if completion.tool_calls.is_empty() {
            if completion.finished_naturally() {
                state = LoopState::Stopped;
            }
            log.steps.push(step);
            continue;
        }

        let mut results = Vec::with_capacity(completion.tool_calls.len());
        for invocation in &completion.tool_calls {
            let result = executor.execute(invocation, &turns).await;
            step.tools_executed.push(invocation.name.clone());
            results.push(ContentPart::ToolResult {
                tool_use_id: invocation.id.clone(),
                content: result,
                is_error: false,
            });
        }
        turns.push(TurnMessage {
            role: Role::User,
            parts: results,
        });

        // Tools always warrant another iteration regardless of finish reason.
        log.steps.push(step);
    }

    info!(
        iterations = log.iterations,
        state = %state,
        "agent loop finished"
    );
    Ok(log)
}

/// Records what the model produced this iteration so the next completion
/// call sees its own text and tool requests.
fn append_assistant_turn(turns: &mut Vec<TurnMessage>, completion: &Completion) {
    let mut parts = Vec::new();
    if !completion.text.trim().is_empty() {
        parts.push(ContentPart::Text {
            text: completion.text.clone(),
        });
    }
    for call in &completion.tool_calls {
        parts.push(ContentPart::ToolUse {
            id: call.id.clone(),
            name: call.name.clone(),
            input: call.input.clone(),
        });
    }
    if !parts.is_empty() {
        turns.push(TurnMessage {
            role: Role::Assistant,
            parts,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_directions_are_stripped() {
        assert_eq!(
            strip_stage_directions("[smiles warmly] Hello there!"),
            "Hello there!"
        );
        assert_eq!(
            strip_stage_directions("Sure! [sends the brochure] Here it is."),
            "Sure!  Here it is."
        );
        assert_eq!(strip_stage_directions("[typing...]"), "");
    }

    #[test]
    fn text_without_brackets_is_untouched() {
        assert_eq!(
            strip_stage_directions("Plain reply, nothing to remove."),
            "Plain reply, nothing to remove."
        );
    }

    #[test]
    fn loop_state_displays() {
        assert_eq!(LoopState::Running.to_string(), "running");
        assert_eq!(LoopState::Stopped.to_string(), "stopped");
    }

    #[test]
    fn assistant_turn_keeps_text_and_tool_order() {
        let mut turns = Vec::new();
        append_assistant_turn(
            &mut turns,
            &Completion {
                text: "sending now".into(),
                tool_calls: vec![zapflow_core::types::ToolInvocation {
                    id: "t1".into(),
                    name: "send_media".into(),
                    input: serde_json::json!({"kind": "brochure"}),
                }],
                stop_reason: Some("tool_use".into()),
            },
        );
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].role, Role::Assistant);
        assert_eq!(turns[0].parts.len(), 2);
        assert!(matches!(turns[0].parts[0], ContentPart::Text { .. }));
        assert!(matches!(turns[0].parts[1], ContentPart::ToolUse { .. }));
    }

    #[test]
    fn empty_completion_appends_nothing() {
        let mut turns = Vec::new();
        append_assistant_turn(
            &mut turns,
            &Completion {
                text: "  ".into(),
                tool_calls: vec![],
                stop_reason: Some("end_turn".into()),
            },
        );
        assert!(turns.is_empty());
    }
}
