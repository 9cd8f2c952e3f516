// SPDX-FileCopyrightText: 2026 Zapflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types used across adapter traits and the Zapflow orchestrator.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Direction of a stored conversation message.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Inbound,
    Outbound,
}

/// Kind of media attached to a message.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Audio,
    Video,
    Document,
}

/// One persisted unit of conversation, inbound or outbound.
///
/// Within a conversation, ordering decisions (coalescing, history windows)
/// are defined by `timestamp_ms`, never by insertion order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredMessage {
    /// Unique id (gateway-assigned, or generated for locally-produced messages).
    pub id: String,
    pub conversation_id: String,
    pub direction: Direction,
    pub text: Option<String>,
    pub media_url: Option<String>,
    pub media_kind: Option<MediaKind>,
    /// Unix epoch milliseconds; monotonically meaningful per conversation.
    pub timestamp_ms: i64,
    pub read: bool,
}

impl StoredMessage {
    /// Builds an outbound text message stamped with the given timestamp.
    pub fn outbound_text(
        id: String,
        conversation_id: &str,
        text: &str,
        timestamp_ms: i64,
    ) -> Self {
        Self {
            id,
            conversation_id: conversation_id.to_string(),
            direction: Direction::Outbound,
            text: Some(text.to_string()),
            media_url: None,
            media_kind: None,
            timestamp_ms,
            read: true,
        }
    }
}

/// Role tag on a turn passed to the completion provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// A typed content part within a turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    /// Hosted image reference; the provider decides how to deliver it to the model.
    ImageUrl { url: String },
    /// A tool invocation requested by the model (assistant turns only).
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },
    /// The executor's result for a prior tool invocation (user turns only).
    ToolResult {
        tool_use_id: String,
        content: String,
        is_error: bool,
    },
}

/// One role-tagged entry in the ephemeral agent turn.
///
/// Built fresh per invocation and discarded when the loop terminates;
/// never shared across invocations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnMessage {
    pub role: Role,
    pub parts: Vec<ContentPart>,
}

impl TurnMessage {
    pub fn user_text(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            parts: vec![ContentPart::Text { text: text.into() }],
        }
    }

    pub fn assistant_text(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            parts: vec![ContentPart::Text { text: text.into() }],
        }
    }

    /// Concatenated text of every `Text` and `ToolResult` part.
    ///
    /// Used by the media dedup scan to spot prior send markers in-flight.
    pub fn flat_text(&self) -> String {
        let mut out = String::new();
        for part in &self.parts {
            match part {
                ContentPart::Text { text } => out.push_str(text),
                ContentPart::ToolResult { content, .. } => out.push_str(content),
                _ => {}
            }
            out.push('\n');
        }
        out
    }
}

/// A tool made available to the model for one completion call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    /// JSON Schema describing the tool's input parameters.
    pub input_schema: serde_json::Value,
}

/// A request to the completion provider.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub model: String,
    pub system: String,
    pub messages: Vec<TurnMessage>,
    pub max_tokens: u32,
    pub temperature: Option<f32>,
    pub tools: Vec<ToolSpec>,
}

/// A tool invocation extracted from a completion.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolInvocation {
    pub id: String,
    pub name: String,
    pub input: serde_json::Value,
}

/// A full (non-streamed) completion from the provider.
#[derive(Debug, Clone)]
pub struct Completion {
    /// Concatenated text blocks. May be empty when the model only calls tools.
    pub text: String,
    /// Tool invocations in the order the model emitted them.
    pub tool_calls: Vec<ToolInvocation>,
    /// Provider finish reason (`end_turn`, `tool_use`, `max_tokens`, ...).
    pub stop_reason: Option<String>,
}

impl Completion {
    /// True when the finish reason indicates the model considers its reply done.
    pub fn finished_naturally(&self) -> bool {
        matches!(
            self.stop_reason.as_deref(),
            Some("end_turn") | Some("stop_sequence") | None
        )
    }
}

/// Content kind of the message that triggered an invocation.
///
/// Surfaced to the model in the temporal-context note so it cannot
/// hallucinate receipt of media it did not get.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum TriggerKind {
    Text,
    Image,
    Audio,
    Video,
    Document,
}

impl From<MediaKind> for TriggerKind {
    fn from(kind: MediaKind) -> Self {
        match kind {
            MediaKind::Image => TriggerKind::Image,
            MediaKind::Audio => TriggerKind::Audio,
            MediaKind::Video => TriggerKind::Video,
            MediaKind::Document => TriggerKind::Document,
        }
    }
}

/// A scored snippet returned by the knowledge retrieval service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snippet {
    pub content: String,
    /// Similarity score in [0, 1]; the assembler applies the threshold.
    pub score: f64,
}

/// Period of day for a scheduled visit.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum VisitPeriod {
    Morning,
    Afternoon,
}

/// Business event pushed to the human-notification collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationEvent {
    pub conversation_id: String,
    #[serde(flatten)]
    pub kind: NotificationKind,
}

/// What happened, with the fields a human summary needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum NotificationKind {
    ProposalFinalized { value: f64 },
    VisitScheduled { date: NaiveDate, period: VisitPeriod },
}

/// The invocation contract consumed from the webhook collaborator.
#[derive(Debug, Clone, Deserialize)]
pub struct InvocationRequest {
    pub conversation_id: String,
    /// Id of the inbound message that triggered this invocation.
    pub message_id: String,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub media_url: Option<String>,
    #[serde(default)]
    pub media_kind: Option<MediaKind>,
    /// Target outbound channel; falls back to the lead's instance, then config.
    #[serde(default)]
    pub instance: Option<String>,
}

/// Terminal status of one invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvocationStatus {
    Completed,
    AbortedMessageNotFound,
    SkippedNewerMessageExists,
    SkippedAutomationDisabled,
}

/// Observability record for one agent-loop step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepLog {
    pub text_sent: bool,
    pub tools_executed: Vec<String>,
}

/// Structured execution log returned to the invoker.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionLog {
    pub iterations: u32,
    pub steps: Vec<StepLog>,
}

/// Outcome of one orchestrator invocation, serialized as the response body.
#[derive(Debug, Clone, Serialize)]
pub struct InvocationReport {
    pub status: InvocationStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub steps: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log: Option<ExecutionLog>,
}

impl InvocationReport {
    pub fn completed(log: ExecutionLog) -> Self {
        Self {
            status: InvocationStatus::Completed,
            steps: Some(log.iterations),
            log: Some(log),
        }
    }

    pub fn skipped(status: InvocationStatus) -> Self {
        Self {
            status,
            steps: None,
            log: None,
        }
    }
}
