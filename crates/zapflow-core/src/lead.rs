// SPDX-FileCopyrightText: 2026 Zapflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Lead state machine: the conversation's business status.
//!
//! Transitions are driven exclusively by the tool executors (-> proposal,
//! -> scheduled) and by the re-engagement rule applied before the agent
//! loop runs. No other component writes the status.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Business status of a conversation.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum LeadStatus {
    /// Initial stage: a counterparty we are still qualifying.
    #[strum(serialize = "prospect")]
    #[serde(rename = "prospect")]
    Prospect,
    /// A proposal was finalized and sent.
    #[strum(serialize = "proposal")]
    #[serde(rename = "proposal")]
    Proposal,
    /// A visit was scheduled; automation is switched off alongside.
    #[strum(serialize = "scheduled")]
    #[serde(rename = "scheduled")]
    Scheduled,
    /// Follow-up ladder, advanced by the external nudge scheduler.
    #[strum(serialize = "follow_up_1")]
    #[serde(rename = "follow_up_1")]
    FollowUp1,
    #[strum(serialize = "follow_up_2")]
    #[serde(rename = "follow_up_2")]
    FollowUp2,
    #[strum(serialize = "follow_up_3")]
    #[serde(rename = "follow_up_3")]
    FollowUp3,
    /// Terminal: the lead went cold.
    #[strum(serialize = "lost")]
    #[serde(rename = "lost")]
    Lost,
}

impl LeadStatus {
    /// True for any rung of the follow-up ladder.
    pub fn is_follow_up(&self) -> bool {
        matches!(
            self,
            LeadStatus::FollowUp1 | LeadStatus::FollowUp2 | LeadStatus::FollowUp3
        )
    }

    /// True when a fresh inbound message must reset the lead to [`LeadStatus::Prospect`]
    /// before the agent loop runs.
    pub fn requires_reengagement(&self) -> bool {
        self.is_follow_up() || *self == LeadStatus::Lost
    }
}

/// One lead per counterparty phone number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lead {
    /// The counterparty phone number; doubles as the gateway destination.
    pub conversation_id: String,
    pub status: LeadStatus,
    pub budget_value: Option<f64>,
    /// Outbound channel/number to use; `None` falls back to the configured default.
    pub instance: Option<String>,
    /// The AI on/off switch. Cleared by visit scheduling.
    pub automation_enabled: bool,
    pub notes: Option<String>,
    /// RFC 3339 timestamp of the last status write.
    pub updated_at: String,
}

impl Lead {
    /// A fresh prospect with automation enabled.
    pub fn new(conversation_id: &str, updated_at: String) -> Self {
        Self {
            conversation_id: conversation_id.to_string(),
            status: LeadStatus::Prospect,
            budget_value: None,
            instance: None,
            automation_enabled: true,
            notes: None,
            updated_at,
        }
    }
}
