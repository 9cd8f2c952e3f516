// SPDX-FileCopyrightText: 2026 Zapflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Context assembly: the ordered prompt for one agent invocation.
//!
//! Order: business script (self-healed) + temporal note + retrieved
//! knowledge, then the reconstructed history turns, then the current
//! pre-processed input. Pure read + compose; knowledge retrieval errors
//! are swallowed and logged, never propagated.

use chrono::{FixedOffset, Utc};
use tracing::{info, warn};
use zapflow_config::model::{AgentConfig, ZapflowConfig};
use zapflow_core::types::{
    ContentPart, Direction, MediaKind, Role, StoredMessage, TriggerKind, TurnMessage,
};
use zapflow_core::{KnowledgeIndex, MessageStore, ZapflowError};

/// Fallback business script used when none is configured or the stored
/// one is corrupted.
pub const DEFAULT_SCRIPT: &str = "\
You are a friendly, professional sales assistant answering WhatsApp \
messages for a real-estate developer. Reply in the customer's language, \
keep each message short and conversational, and never sound like a form \
letter. Qualify the customer's needs (budget, desired region, timeline), \
answer questions about the available units, and guide interested \
customers toward a proposal or an on-site visit. Use the available tools \
when the customer asks for materials, accepts a proposal value, or wants \
to book a visit. Never invent prices or availability you were not given.";

/// Substrings that identify a corrupted stored script: artifacts a
/// template-driven script store leaks when interpolation breaks.
const CORRUPTION_MARKERS: [&str; 2] = ["[object Object]", "{{ $json"];

/// True when the stored script matches a known-corrupted pattern.
pub fn is_corrupted(script: &str) -> bool {
    CORRUPTION_MARKERS.iter().any(|m| script.contains(m))
}

/// Resolves the business script: file > inline > default, then applies
/// the self-healing check. A corrupted script is replaced by the default
/// rather than used.
pub async fn resolve_script(config: &AgentConfig) -> String {
    let stored = load_stored_script(config).await;
    match stored {
        Some(script) if is_corrupted(&script) => {
            warn!("stored script matches corruption markers, substituting default");
            DEFAULT_SCRIPT.to_string()
        }
        Some(script) => script,
        None => DEFAULT_SCRIPT.to_string(),
    }
}

async fn load_stored_script(config: &AgentConfig) -> Option<String> {
    if let Some(ref path) = config.script_file {
        match tokio::fs::read_to_string(path).await {
            Ok(content) => {
                let trimmed = content.trim().to_string();
                if !trimmed.is_empty() {
                    info!(path = path.as_str(), "loaded script from file");
                    return Some(trimmed);
                }
            }
            Err(e) => {
                warn!(path = path.as_str(), error = %e, "failed to read script file, falling back");
            }
        }
    }
    config
        .script
        .as_ref()
        .filter(|s| !s.trim().is_empty())
        .cloned()
}

/// The current input after pre-processing (transcription/extraction done,
/// images left for the vision-capable model).
#[derive(Debug, Clone)]
pub struct CurrentInput {
    pub kind: TriggerKind,
    pub parts: Vec<ContentPart>,
}

/// Assembled context ready for the agent loop.
#[derive(Debug, Clone)]
pub struct AssembledContext {
    pub system: String,
    pub turns: Vec<TurnMessage>,
}

/// Builds the ordered context for one invocation.
pub async fn assemble(
    messages: &dyn MessageStore,
    knowledge: Option<&dyn KnowledgeIndex>,
    config: &ZapflowConfig,
    conversation_id: &str,
    trigger: &StoredMessage,
    input: &CurrentInput,
) -> Result<AssembledContext, ZapflowError> {
    let mut system = resolve_script(&config.agent).await;

    system.push_str("\n\n");
    system.push_str(&temporal_note(config.agent.utc_offset_hours, input.kind));

    if let Some(block) = knowledge_block(knowledge, config, input).await {
        system.push_str("\n\n");
        system.push_str(&block);
    }

    let history = messages
        .recent_before(
            conversation_id,
            trigger.timestamp_ms,
            config.agent.history_window,
        )
        .await?;

    let mut turns = history_turns(&history);
    turns.push(TurnMessage {
        role: Role::User,
        parts: input.parts.clone(),
    });

    Ok(AssembledContext { system, turns })
}

/// Current date/time in the operator's timezone plus the content kind of
/// the trigger, so the model cannot hallucinate media it did not receive.
fn temporal_note(utc_offset_hours: i32, kind: TriggerKind) -> String {
    let offset = FixedOffset::east_opt(utc_offset_hours * 3600)
        .unwrap_or_else(|| FixedOffset::east_opt(0).expect("zero offset is valid"));
    let now = Utc::now().with_timezone(&offset);
    let kind_phrase = match kind {
        TriggerKind::Text => "a text message",
        TriggerKind::Image => "an image (attached to their message)",
        TriggerKind::Audio => "a voice message (transcription included in their message)",
        TriggerKind::Video => "a video (transcription included in their message)",
        TriggerKind::Document => "a document (extracted text included in their message)",
    };
    format!(
        "Current date and time: {}. The customer's latest message is {}.",
        now.format("%A, %d %B %Y, %H:%M"),
        kind_phrase
    )
}

/// Retrieves up to `top_k` knowledge snippets when the query is
/// non-trivial and similarity clears the threshold. Failures are logged
/// and swallowed.
async fn knowledge_block(
    knowledge: Option<&dyn KnowledgeIndex>,
    config: &ZapflowConfig,
    input: &CurrentInput,
) -> Option<String> {
    let index = knowledge?;
    if !config.knowledge.enabled {
        return None;
    }

    let query = input.parts.iter().find_map(|p| match p {
        ContentPart::Text { text } => Some(text.as_str()),
        _ => None,
    })?;
    if query.chars().count() <= config.knowledge.min_query_len {
        return None;
    }

    let snippets = match index.search(query, config.knowledge.top_k).await {
        Ok(snippets) => snippets,
        Err(e) => {
            warn!(error = %e, "knowledge retrieval failed, continuing without it");
            return None;
        }
    };

    let relevant: Vec<_> = snippets
        .into_iter()
        .filter(|s| s.score >= config.knowledge.similarity_threshold)
        .take(config.knowledge.top_k as usize)
        .collect();
    if relevant.is_empty() {
        return None;
    }

    let mut block = String::from("Knowledge base entries relevant to this message:");
    for snippet in relevant {
        block.push_str("\n- ");
        block.push_str(&snippet.content);
    }
    Some(block)
}

/// Maps stored history onto role-tagged turns: inbound -> user, outbound
/// -> assistant, inbound images as multi-part content.
fn history_turns(history: &[StoredMessage]) -> Vec<TurnMessage> {
    history
        .iter()
        .map(|msg| {
            let role = match msg.direction {
                Direction::Inbound => Role::User,
                Direction::Outbound => Role::Assistant,
            };
            let parts = match (msg.direction, msg.media_kind, msg.media_url.as_deref()) {
                (Direction::Inbound, Some(MediaKind::Image), Some(url)) => vec![
                    ContentPart::Text {
                        text: msg
                            .text
                            .clone()
                            .unwrap_or_else(|| "[image received]".to_string()),
                    },
                    ContentPart::ImageUrl {
                        url: url.to_string(),
                    },
                ],
                (_, Some(kind), _) => vec![ContentPart::Text {
                    text: msg
                        .text
                        .clone()
                        .unwrap_or_else(|| format!("[{kind} message]")),
                }],
                _ => vec![ContentPart::Text {
                    text: msg.text.clone().unwrap_or_default(),
                }],
            };
            TurnMessage { role, parts }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use zapflow_core::types::Snippet;
    use zapflow_storage::SqliteStore;
    use zapflow_test_utils::StaticKnowledge;

    async fn test_store() -> (SqliteStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let config = zapflow_config::model::StorageConfig {
            database_path: dir.path().join("ctx.db").to_string_lossy().into_owned(),
            wal_mode: true,
        };
        (SqliteStore::open(&config).await.unwrap(), dir)
    }

    fn test_config() -> ZapflowConfig {
        ZapflowConfig::default()
    }

    fn text_input(text: &str) -> CurrentInput {
        CurrentInput {
            kind: TriggerKind::Text,
            parts: vec![ContentPart::Text { text: text.into() }],
        }
    }

    fn inbound(id: &str, text: &str, ts: i64) -> StoredMessage {
        StoredMessage {
            id: id.to_string(),
            conversation_id: "c1".to_string(),
            direction: Direction::Inbound,
            text: Some(text.to_string()),
            media_url: None,
            media_kind: None,
            timestamp_ms: ts,
            read: false,
        }
    }

    #[test]
    fn corruption_markers_detected() {
        assert!(is_corrupted("Hello [object Object] world"));
        assert!(is_corrupted("script with {{ $json.body.text }} leak"));
        assert!(!is_corrupted("a perfectly fine script"));
    }

    #[tokio::test]
    async fn corrupted_script_is_replaced_by_default() {
        let config = AgentConfig {
            script: Some("Greet the customer then [object Object] something".into()),
            ..Default::default()
        };
        let script = resolve_script(&config).await;
        assert_eq!(script, DEFAULT_SCRIPT);
        assert!(!is_corrupted(&script));
    }

    #[tokio::test]
    async fn inline_script_used_when_clean() {
        let config = AgentConfig {
            script: Some("Custom sales script.".into()),
            ..Default::default()
        };
        assert_eq!(resolve_script(&config).await, "Custom sales script.");
    }

    #[tokio::test]
    async fn script_file_takes_precedence() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("script.md");
        std::fs::write(&path, "File-based script.").unwrap();

        let config = AgentConfig {
            script: Some("Inline script.".into()),
            script_file: Some(path.to_string_lossy().into_owned()),
            ..Default::default()
        };
        assert_eq!(resolve_script(&config).await, "File-based script.");
    }

    #[tokio::test]
    async fn missing_script_falls_back_to_default() {
        let config = AgentConfig::default();
        assert_eq!(resolve_script(&config).await, DEFAULT_SCRIPT);
    }

    #[tokio::test]
    async fn assembled_system_never_contains_corruption_markers() {
        let (store, _dir) = test_store().await;
        let trigger = inbound("m1", "oi", 100);
        store.append(&trigger).await.unwrap();

        let mut config = test_config();
        config.agent.script =
            Some("Corrupted: {{ $json.message.content }} and [object Object]".into());

        let assembled = assemble(&store, None, &config, "c1", &trigger, &text_input("oi"))
            .await
            .unwrap();
        assert!(!assembled.system.contains("[object Object]"));
        assert!(!assembled.system.contains("{{ $json"));
        assert!(assembled.system.contains("Current date and time:"));
    }

    #[tokio::test]
    async fn temporal_note_names_the_trigger_kind() {
        let (store, _dir) = test_store().await;
        let trigger = inbound("m1", "look", 100);
        store.append(&trigger).await.unwrap();

        let input = CurrentInput {
            kind: TriggerKind::Image,
            parts: vec![
                ContentPart::Text {
                    text: "look".into(),
                },
                ContentPart::ImageUrl {
                    url: "https://cdn.example.com/p.jpg".into(),
                },
            ],
        };
        let assembled = assemble(&store, None, &test_config(), "c1", &trigger, &input)
            .await
            .unwrap();
        assert!(assembled.system.contains("an image"));
    }

    #[tokio::test]
    async fn history_excludes_trigger_and_orders_roles() {
        let (store, _dir) = test_store().await;
        store.append(&inbound("m1", "first", 100)).await.unwrap();
        store
            .append(&StoredMessage::outbound_text("m2".into(), "c1", "reply", 200))
            .await
            .unwrap();
        let trigger = inbound("m3", "second", 300);
        store.append(&trigger).await.unwrap();

        let assembled = assemble(
            &store,
            None,
            &test_config(),
            "c1",
            &trigger,
            &text_input("second"),
        )
        .await
        .unwrap();

        // Two history turns plus the current input.
        assert_eq!(assembled.turns.len(), 3);
        assert_eq!(assembled.turns[0].role, Role::User);
        assert_eq!(assembled.turns[1].role, Role::Assistant);
        assert_eq!(assembled.turns[2].role, Role::User);
        // The trigger text appears exactly once.
        let occurrences = assembled
            .turns
            .iter()
            .filter(|t| t.flat_text().contains("second"))
            .count();
        assert_eq!(occurrences, 1);
    }

    #[tokio::test]
    async fn inbound_image_history_becomes_multi_part() {
        let (store, _dir) = test_store().await;
        let mut img = inbound("m1", "what is this?", 100);
        img.media_url = Some("https://cdn.example.com/pic.jpg".into());
        img.media_kind = Some(MediaKind::Image);
        store.append(&img).await.unwrap();
        let trigger = inbound("m2", "so?", 200);
        store.append(&trigger).await.unwrap();

        let assembled = assemble(
            &store,
            None,
            &test_config(),
            "c1",
            &trigger,
            &text_input("so?"),
        )
        .await
        .unwrap();

        assert_eq!(assembled.turns[0].parts.len(), 2);
        assert!(matches!(
            assembled.turns[0].parts[1],
            ContentPart::ImageUrl { .. }
        ));
    }

    #[tokio::test]
    async fn knowledge_appended_above_threshold_only() {
        let (store, _dir) = test_store().await;
        let trigger = inbound("m1", "tell me about financing plans", 100);
        store.append(&trigger).await.unwrap();

        let knowledge = StaticKnowledge::new(vec![
            Snippet {
                content: "Financing up to 30 years".into(),
                score: 0.92,
            },
            Snippet {
                content: "Irrelevant trivia".into(),
                score: 0.10,
            },
        ]);

        let assembled = assemble(
            &store,
            Some(&knowledge as &dyn KnowledgeIndex),
            &test_config(),
            "c1",
            &trigger,
            &text_input("tell me about financing plans"),
        )
        .await
        .unwrap();

        assert!(assembled.system.contains("Financing up to 30 years"));
        assert!(!assembled.system.contains("Irrelevant trivia"));
    }

    #[tokio::test]
    async fn short_query_skips_retrieval() {
        let (store, _dir) = test_store().await;
        let trigger = inbound("m1", "oi", 100);
        store.append(&trigger).await.unwrap();

        let knowledge = StaticKnowledge::new(vec![Snippet {
            content: "Should not appear".into(),
            score: 0.99,
        }]);

        let assembled = assemble(
            &store,
            Some(&knowledge as &dyn KnowledgeIndex),
            &test_config(),
            "c1",
            &trigger,
            &text_input("oi"),
        )
        .await
        .unwrap();

        assert!(!assembled.system.contains("Should not appear"));
        assert_eq!(knowledge.calls(), 0);
    }

    #[tokio::test]
    async fn retrieval_failure_is_swallowed() {
        let (store, _dir) = test_store().await;
        let trigger = inbound("m1", "what are the payment conditions?", 100);
        store.append(&trigger).await.unwrap();

        let knowledge = StaticKnowledge::failing();

        let assembled = assemble(
            &store,
            Some(&knowledge as &dyn KnowledgeIndex),
            &test_config(),
            "c1",
            &trigger,
            &text_input("what are the payment conditions?"),
        )
        .await
        .unwrap();

        // Assembly succeeded despite the retrieval error.
        assert!(assembled.system.contains("Current date and time:"));
    }
}
