// SPDX-FileCopyrightText: 2026 Zapflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The conversational agent orchestrator.
//!
//! One [`Orchestrator::handle`] call is one independent, stateless unit
//! of work: gate the invocation through the coalescing controller,
//! pre-process the input, assemble context, drive the bounded tool loop,
//! and report a structured outcome. Concurrent invocations for the same
//! conversation coordinate only through the shared message store.

pub mod coalesce;
pub mod context;
pub mod dispatch;
pub mod follow_up;
pub mod pacing;
pub mod run_loop;
pub mod tools;

use std::sync::Arc;

use tracing::{info, info_span, warn, Instrument};
use zapflow_config::ZapflowConfig;
use zapflow_core::types::{
    ContentPart, InvocationReport, InvocationRequest, InvocationStatus, MediaKind,
    StoredMessage, TriggerKind,
};
use zapflow_core::{
    CompletionProvider, DocumentExtractor, KnowledgeIndex, Lead, LeadStatus, LeadStore,
    MessageStore, MessagingGateway, Notifier, Transcriber, ZapflowError,
};

use crate::coalesce::GateDecision;
use crate::context::CurrentInput;
use crate::dispatch::Dispatcher;
use crate::pacing::Pacing;
use crate::run_loop::LoopParams;
use crate::tools::ToolExecutor;

/// The orchestrator's collaborators plus a per-invocation config snapshot.
pub struct Orchestrator {
    pub messages: Arc<dyn MessageStore>,
    pub leads: Arc<dyn LeadStore>,
    pub provider: Arc<dyn CompletionProvider>,
    pub gateway: Arc<dyn MessagingGateway>,
    pub notifier: Arc<dyn Notifier>,
    pub knowledge: Option<Arc<dyn KnowledgeIndex>>,
    pub transcriber: Option<Arc<dyn Transcriber>>,
    pub extractor: Option<Arc<dyn DocumentExtractor>>,
    pub config: ZapflowConfig,
}

impl Orchestrator {
    /// Handles one invocation end to end.
    ///
    /// Designed aborts (superseded, trigger not found, automation off)
    /// return `Ok` with a status marker; only unclassified failures
    /// surface as errors for the invoker's generic-500 path.
    pub async fn handle(
        &self,
        request: InvocationRequest,
    ) -> Result<InvocationReport, ZapflowError> {
        let span = info_span!("invocation", conversation_id = %request.conversation_id,
            message_id = %request.message_id);
        self.handle_inner(request).instrument(span).await
    }

    async fn handle_inner(
        &self,
        request: InvocationRequest,
    ) -> Result<InvocationReport, ZapflowError> {
        let lead = self.ensure_lead(&request).await?;

        if !lead.automation_enabled {
            info!("automation disabled for this lead, skipping");
            return Ok(InvocationReport::skipped(
                InvocationStatus::SkippedAutomationDisabled,
            ));
        }

        let debounce = std::time::Duration::from_secs(self.config.agent.debounce_secs);
        let trigger = match coalesce::gate(
            self.messages.as_ref(),
            &request.conversation_id,
            &request.message_id,
            debounce,
        )
        .await?
        {
            GateDecision::TriggerNotFound => {
                return Ok(InvocationReport::skipped(
                    InvocationStatus::AbortedMessageNotFound,
                ));
            }
            GateDecision::Superseded { newer_count } => {
                info!(newer_count, "yielding to a later invocation");
                return Ok(InvocationReport::skipped(
                    InvocationStatus::SkippedNewerMessageExists,
                ));
            }
            GateDecision::Proceed { trigger } => trigger,
        };

        // Re-engagement: a cold lead writing again starts over as a prospect.
        if lead.status.requires_reengagement() {
            info!(status = %lead.status, "re-engaging lead back to prospect");
            self.leads
                .set_status(&request.conversation_id, LeadStatus::Prospect)
                .await?;
        }

        self.messages
            .mark_read(&request.conversation_id, trigger.timestamp_ms)
            .await?;

        let input = self.preprocess(&request, &trigger).await;
        let assembled = context::assemble(
            self.messages.as_ref(),
            self.knowledge.as_deref(),
            &self.config,
            &request.conversation_id,
            &trigger,
            &input,
        )
        .await?;

        let instance = request
            .instance
            .clone()
            .or_else(|| lead.instance.clone())
            .unwrap_or_else(|| self.config.gateway.default_instance.clone());
        let pacing = Pacing::from_config(&self.config.pacing);

        let executor = ToolExecutor::new(
            &request.conversation_id,
            &instance,
            Arc::clone(&self.messages),
            Arc::clone(&self.leads),
            Arc::clone(&self.gateway),
            Arc::clone(&self.notifier),
            self.config.media.catalog.clone(),
            pacing,
        );
        let dispatcher = Dispatcher::new(
            &request.conversation_id,
            &instance,
            Arc::clone(&self.gateway),
            Arc::clone(&self.messages),
            pacing,
        );

        let log = run_loop::run(
            self.provider.as_ref(),
            &executor,
            &dispatcher,
            assembled.system,
            assembled.turns,
            &LoopParams {
                model: self.config.anthropic.model.clone(),
                max_tokens: self.config.anthropic.max_tokens,
                temperature: self.config.anthropic.temperature,
                max_iterations: self.config.agent.max_iterations,
            },
        )
        .await?;

        Ok(InvocationReport::completed(log))
    }

    /// Loads the lead, creating a fresh prospect on first contact.
    async fn ensure_lead(&self, request: &InvocationRequest) -> Result<Lead, ZapflowError> {
        if let Some(lead) = self.leads.get(&request.conversation_id).await? {
            return Ok(lead);
        }
        let lead = Lead::new(
            &request.conversation_id,
            chrono::Utc::now().to_rfc3339(),
        );
        self.leads.upsert(&lead).await?;
        info!("created new prospect lead");
        Ok(lead)
    }

    /// Turns the raw request into the model-facing input: audio/video are
    /// transcribed, documents extracted, images passed through for vision.
    /// Collaborator failures degrade to a bracketed placeholder rather
    /// than aborting the invocation.
    async fn preprocess(
        &self,
        request: &InvocationRequest,
        trigger: &StoredMessage,
    ) -> CurrentInput {
        let text = request
            .text
            .clone()
            .or_else(|| trigger.text.clone())
            .unwrap_or_default();
        let media_url = request
            .media_url
            .clone()
            .or_else(|| trigger.media_url.clone());
        let media_kind = request.media_kind.or(trigger.media_kind);

        match (media_kind, media_url) {
            (Some(MediaKind::Image), Some(url)) => CurrentInput {
                kind: TriggerKind::Image,
                parts: vec![
                    ContentPart::Text {
                        text: if text.is_empty() {
                            "[image received]".to_string()
                        } else {
                            text
                        },
                    },
                    ContentPart::ImageUrl { url },
                ],
            },
            (Some(kind @ (MediaKind::Audio | MediaKind::Video)), Some(url)) => {
                let transcript = match &self.transcriber {
                    Some(t) => t.transcribe(&url, kind).await.unwrap_or_else(|e| {
                        warn!(error = %e, "transcription failed, degrading input");
                        format!("[{kind} message could not be transcribed]")
                    }),
                    None => format!("[{kind} message received, transcription unavailable]"),
                };
                CurrentInput {
                    kind: kind.into(),
                    parts: vec![ContentPart::Text { text: transcript }],
                }
            }
            (Some(MediaKind::Document), Some(url)) => {
                let extracted = match &self.extractor {
                    Some(x) => x.extract_text(&url).await.unwrap_or_else(|e| {
                        warn!(error = %e, "document extraction failed, degrading input");
                        "[document could not be read]".to_string()
                    }),
                    None => "[document received, extraction unavailable]".to_string(),
                };
                let combined = if text.is_empty() {
                    extracted
                } else {
                    format!("{text}\n\n{extracted}")
                };
                CurrentInput {
                    kind: TriggerKind::Document,
                    parts: vec![ContentPart::Text { text: combined }],
                }
            }
            _ => CurrentInput {
                kind: TriggerKind::Text,
                parts: vec![ContentPart::Text {
                    text: if text.is_empty() {
                        "[empty message]".to_string()
                    } else {
                        text
                    },
                }],
            },
        }
    }
}
