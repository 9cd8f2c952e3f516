// SPDX-FileCopyrightText: 2026 Zapflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tool executors: the side-effecting half of the agent loop.
//!
//! The tool catalog is a closed enum with an exhaustive-match executor;
//! unknown tool names are rejected defensively. Every failure (bad
//! arguments, business-rule violations, gateway errors) becomes a
//! textual tool result so the model can recover conversationally. Tools
//! never raise to the loop's caller.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Datelike, NaiveDate, Utc, Weekday};
use tracing::{info, warn};
use zapflow_config::model::MediaCatalogEntry;
use zapflow_core::types::{
    NotificationEvent, NotificationKind, StoredMessage, ToolInvocation, ToolSpec, TurnMessage,
    VisitPeriod,
};
use zapflow_core::{LeadStore, MessageStore, MessagingGateway, Notifier};

use crate::pacing::Pacing;

/// How many recent messages the media dedup scan inspects.
const DEDUP_HISTORY_WINDOW: u32 = 30;

/// A parsed request against the closed tool catalog.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolCall {
    SendMedia { kind: String },
    FinalizeProposal { value: f64 },
    ScheduleVisit { date: NaiveDate, period: VisitPeriod },
}

impl ToolCall {
    /// Parses a named invocation, rejecting unknown tools and malformed
    /// arguments with a descriptive message for the model.
    pub fn parse(name: &str, input: &serde_json::Value) -> Result<Self, String> {
        match name {
            "send_media" => {
                let kind = input
                    .get("kind")
                    .and_then(|v| v.as_str())
                    .ok_or("send_media requires a string 'kind' argument")?;
                Ok(ToolCall::SendMedia {
                    kind: kind.to_string(),
                })
            }
            "finalize_proposal" => {
                let value = match input.get("value") {
                    Some(v) if v.is_number() => v.as_f64(),
                    // Tolerate stringly-typed numbers with a decimal comma.
                    Some(v) => v
                        .as_str()
                        .and_then(|s| s.trim().replace(',', ".").parse::<f64>().ok()),
                    None => None,
                }
                .ok_or("finalize_proposal requires a numeric 'value' argument")?;
                if !value.is_finite() || value <= 0.0 {
                    return Err(format!(
                        "finalize_proposal 'value' must be a positive number, got {value}"
                    ));
                }
                Ok(ToolCall::FinalizeProposal { value })
            }
            "schedule_visit" => {
                let date_str = input
                    .get("date")
                    .and_then(|v| v.as_str())
                    .ok_or("schedule_visit requires a 'date' argument (YYYY-MM-DD)")?;
                let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
                    .map_err(|_| format!("'{date_str}' is not a valid YYYY-MM-DD date"))?;
                let period_str = input
                    .get("period")
                    .and_then(|v| v.as_str())
                    .ok_or("schedule_visit requires a 'period' argument (morning|afternoon)")?;
                let period = period_str
                    .parse::<VisitPeriod>()
                    .map_err(|_| format!("'{period_str}' is not a valid period (morning|afternoon)"))?;
                Ok(ToolCall::ScheduleVisit { date, period })
            }
            other => Err(format!("unknown tool '{other}'")),
        }
    }
}

/// The fixed tool catalog offered to the model on every iteration.
pub fn catalog() -> Vec<ToolSpec> {
    vec![
        ToolSpec {
            name: "send_media".to_string(),
            description: "Send the customer one of the fixed catalog media items \
                          (brochures, floor plans, video tours). Use the symbolic kind, \
                          not a URL."
                .to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "kind": {
                        "type": "string",
                        "description": "Symbolic catalog kind, e.g. 'brochure'"
                    }
                },
                "required": ["kind"]
            }),
        },
        ToolSpec {
            name: "finalize_proposal".to_string(),
            description: "Register that the customer accepted a proposal at the given \
                          value. Call only after the customer clearly agreed to a number."
                .to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "value": {
                        "type": "number",
                        "description": "Agreed proposal value"
                    }
                },
                "required": ["value"]
            }),
        },
        ToolSpec {
            name: "schedule_visit".to_string(),
            description: "Book an on-site visit. Visits run Monday to Saturday; \
                          Saturdays only in the morning."
                .to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "date": {
                        "type": "string",
                        "description": "Visit date in YYYY-MM-DD format"
                    },
                    "period": {
                        "type": "string",
                        "enum": ["morning", "afternoon"]
                    }
                },
                "required": ["date", "period"]
            }),
        },
    ]
}

/// Marker persisted (and scanned for) after a media dispatch.
pub fn media_marker(kind: &str) -> String {
    format!("(media sent: {kind})")
}

/// Executes parsed tool calls against the conversation's external state.
pub struct ToolExecutor {
    pub conversation_id: String,
    pub instance: String,
    messages: Arc<dyn MessageStore>,
    leads: Arc<dyn LeadStore>,
    gateway: Arc<dyn MessagingGateway>,
    notifier: Arc<dyn Notifier>,
    media_catalog: HashMap<String, MediaCatalogEntry>,
    pacing: Pacing,
}

impl ToolExecutor {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        conversation_id: &str,
        instance: &str,
        messages: Arc<dyn MessageStore>,
        leads: Arc<dyn LeadStore>,
        gateway: Arc<dyn MessagingGateway>,
        notifier: Arc<dyn Notifier>,
        media_catalog: HashMap<String, MediaCatalogEntry>,
        pacing: Pacing,
    ) -> Self {
        Self {
            conversation_id: conversation_id.to_string(),
            instance: instance.to_string(),
            messages,
            leads,
            gateway,
            notifier,
            media_catalog,
            pacing,
        }
    }

    /// Executes one invocation, returning the textual result fed back to
    /// the model. `turns` is the in-flight agent turn, scanned alongside
    /// recent history for dedup markers.
    pub async fn execute(&self, invocation: &ToolInvocation, turns: &[TurnMessage]) -> String {
        let call = match ToolCall::parse(&invocation.name, &invocation.input) {
            Ok(call) => call,
            Err(msg) => {
                warn!(tool = invocation.name.as_str(), error = msg.as_str(), "tool call rejected");
                return msg;
            }
        };

        match call {
            ToolCall::SendMedia { kind } => self.send_media(&kind, turns).await,
            ToolCall::FinalizeProposal { value } => self.finalize_proposal(value).await,
            ToolCall::ScheduleVisit { date, period } => {
                self.schedule_visit(date, period).await
            }
        }
    }

    async fn send_media(&self, kind: &str, turns: &[TurnMessage]) -> String {
        let marker = media_marker(kind);

        // Dedup against both the in-flight turn and recent history: the
        // loop always re-iterates after a tool, so the model may ask again.
        if turns.iter().any(|t| t.flat_text().contains(&marker)) {
            return format!(
                "The '{kind}' media was already sent in this reply. Do NOT send it again; \
                 refer to the one already delivered."
            );
        }
        match self
            .messages
            .recent(&self.conversation_id, DEDUP_HISTORY_WINDOW)
            .await
        {
            Ok(history) => {
                let already_sent = history
                    .iter()
                    .any(|m| m.text.as_deref().is_some_and(|t| t.contains(&marker)));
                if already_sent {
                    return format!(
                        "The '{kind}' media was already sent earlier in this conversation. \
                         Do NOT send it again; refer to the one already delivered."
                    );
                }
            }
            Err(e) => {
                warn!(error = %e, "dedup history scan failed, proceeding with send");
            }
        }

        let Some(entry) = self.media_catalog.get(kind) else {
            let known: Vec<&str> = self.media_catalog.keys().map(String::as_str).collect();
            return format!(
                "There is no '{kind}' media in the catalog. Available kinds: {}.",
                known.join(", ")
            );
        };

        tokio::time::sleep(self.pacing.media_delay()).await;

        if let Err(e) = self
            .gateway
            .send_media(
                &self.instance,
                &self.conversation_id,
                &entry.url,
                entry.kind,
                None,
            )
            .await
        {
            warn!(error = %e, kind, "media dispatch failed");
            return format!(
                "Sending the '{kind}' media failed ({e}). Apologize briefly and offer to \
                 try again later."
            );
        }

        let record = StoredMessage {
            id: uuid::Uuid::new_v4().to_string(),
            conversation_id: self.conversation_id.clone(),
            direction: zapflow_core::types::Direction::Outbound,
            text: Some(marker),
            media_url: Some(entry.url.clone()),
            media_kind: Some(entry.kind),
            timestamp_ms: Utc::now().timestamp_millis(),
            read: true,
        };
        if let Err(e) = self.messages.append(&record).await {
            warn!(error = %e, "failed to persist media marker");
        }

        info!(kind, "media dispatched");
        format!(
            "{} Continue the conversation naturally and do not send this media again.",
            media_marker(kind)
        )
    }

    async fn finalize_proposal(&self, value: f64) -> String {
        if let Err(e) = self
            .leads
            .record_proposal(&self.conversation_id, value)
            .await
        {
            warn!(error = %e, "proposal status update failed");
            return format!("Recording the proposal failed ({e}). Tell the customer a human \
                            will confirm it shortly.");
        }

        self.persist_marker(&format!("(proposal finalized: {value:.2})"))
            .await;
        self.spawn_notification(NotificationKind::ProposalFinalized { value });

        info!(value, "proposal finalized");
        format!(
            "Proposal registered at {value:.2}. Confirm it to the customer and explain the \
             next steps."
        )
    }

    async fn schedule_visit(&self, date: NaiveDate, period: VisitPeriod) -> String {
        match date.weekday() {
            Weekday::Sun => {
                return format!(
                    "Visits are not available on Sundays ({date}). Offer a weekday, or a \
                     Saturday morning instead."
                );
            }
            Weekday::Sat if period == VisitPeriod::Afternoon => {
                return format!(
                    "Saturday visits are only available in the morning ({date} afternoon is \
                     not bookable). Offer the Saturday morning or another day."
                );
            }
            _ => {}
        }

        if let Err(e) = self.leads.record_scheduled(&self.conversation_id).await {
            warn!(error = %e, "visit status update failed");
            return format!("Recording the visit failed ({e}). Tell the customer a human will \
                            confirm the booking shortly.");
        }

        self.persist_marker(&format!("(visit scheduled: {date} {period})"))
            .await;
        self.spawn_notification(NotificationKind::VisitScheduled { date, period });

        info!(%date, %period, "visit scheduled, automation disabled");
        format!(
            "Visit booked for {date} in the {period}. Confirm the booking warmly; a human \
             agent takes over from here."
        )
    }

    async fn persist_marker(&self, marker: &str) {
        let record = StoredMessage::outbound_text(
            uuid::Uuid::new_v4().to_string(),
            &self.conversation_id,
            marker,
            Utc::now().timestamp_millis(),
        );
        if let Err(e) = self.messages.append(&record).await {
            warn!(error = %e, marker, "failed to persist system marker");
        }
    }

    /// Fire-and-forget: the notification must not couple response latency
    /// to an unrelated collaborator. Failures are logged only.
    fn spawn_notification(&self, kind: NotificationKind) {
        let notifier = Arc::clone(&self.notifier);
        let event = NotificationEvent {
            conversation_id: self.conversation_id.clone(),
            kind,
        };
        tokio::spawn(async move {
            if let Err(e) = notifier.notify(&event).await {
                warn!(error = %e, "human notification failed");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_send_media() {
        let call = ToolCall::parse("send_media", &serde_json::json!({"kind": "brochure"}));
        assert_eq!(
            call.unwrap(),
            ToolCall::SendMedia {
                kind: "brochure".into()
            }
        );
    }

    #[test]
    fn parse_finalize_proposal_accepts_number_and_string() {
        let call = ToolCall::parse("finalize_proposal", &serde_json::json!({"value": 185000.0}));
        assert_eq!(call.unwrap(), ToolCall::FinalizeProposal { value: 185_000.0 });

        let call =
            ToolCall::parse("finalize_proposal", &serde_json::json!({"value": "185000,50"}));
        assert_eq!(call.unwrap(), ToolCall::FinalizeProposal { value: 185_000.5 });
    }

    #[test]
    fn parse_finalize_proposal_rejects_nonpositive() {
        assert!(ToolCall::parse("finalize_proposal", &serde_json::json!({"value": -5})).is_err());
        assert!(ToolCall::parse("finalize_proposal", &serde_json::json!({"value": 0})).is_err());
    }

    #[test]
    fn parse_schedule_visit() {
        let call = ToolCall::parse(
            "schedule_visit",
            &serde_json::json!({"date": "2026-08-14", "period": "morning"}),
        );
        assert_eq!(
            call.unwrap(),
            ToolCall::ScheduleVisit {
                date: NaiveDate::from_ymd_opt(2026, 8, 14).unwrap(),
                period: VisitPeriod::Morning,
            }
        );
    }

    #[test]
    fn parse_schedule_visit_bad_date() {
        let err = ToolCall::parse(
            "schedule_visit",
            &serde_json::json!({"date": "14/08/2026", "period": "morning"}),
        )
        .unwrap_err();
        assert!(err.contains("YYYY-MM-DD") || err.contains("not a valid"));
    }

    #[test]
    fn parse_unknown_tool_rejected() {
        let err = ToolCall::parse("delete_database", &serde_json::json!({})).unwrap_err();
        assert!(err.contains("unknown tool"));
    }

    #[test]
    fn catalog_is_the_fixed_three() {
        let names: Vec<String> = catalog().into_iter().map(|t| t.name).collect();
        assert_eq!(names, ["send_media", "finalize_proposal", "schedule_visit"]);
    }

    #[test]
    fn marker_format_is_stable() {
        // The dedup scan greps history for this exact shape.
        assert_eq!(media_marker("brochure"), "(media sent: brochure)");
    }
}
