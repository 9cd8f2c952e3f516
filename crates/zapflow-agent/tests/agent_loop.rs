// SPDX-FileCopyrightText: 2026 Zapflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the agent loop, tool executors, and dispatcher,
//! run against a temp SQLite store and mock collaborators.

use std::time::Duration;

use zapflow_agent::dispatch::Dispatcher;
use zapflow_agent::pacing::Pacing;
use zapflow_agent::run_loop::{self, LoopParams};
use zapflow_agent::tools::{media_marker, ToolExecutor};
use zapflow_core::types::{StoredMessage, ToolInvocation, TurnMessage, VisitPeriod};
use zapflow_core::{LeadStatus, LeadStore, MessageStore};
use zapflow_test_utils::{ScriptedProvider, SentItem, TestHarness};

fn loop_params(max_iterations: u32) -> LoopParams {
    LoopParams {
        model: "claude-sonnet-4-20250514".to_string(),
        max_tokens: 256,
        temperature: None,
        max_iterations,
    }
}

fn executor_for(harness: &TestHarness, conversation_id: &str) -> ToolExecutor {
    ToolExecutor::new(
        conversation_id,
        "main",
        harness.store.clone(),
        harness.store.clone(),
        harness.gateway.clone(),
        harness.notifier.clone(),
        harness.config.media.catalog.clone(),
        Pacing::from_config(&harness.config.pacing),
    )
}

fn dispatcher_for(harness: &TestHarness, conversation_id: &str) -> Dispatcher {
    Dispatcher::new(
        conversation_id,
        "main",
        harness.gateway.clone(),
        harness.store.clone(),
        Pacing::from_config(&harness.config.pacing),
    )
}

async fn wait_until(mut check: impl FnMut() -> bool) {
    for _ in 0..200 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached in time");
}

// ---- Media dedup idempotence ----

#[tokio::test]
async fn duplicate_send_media_in_one_loop_dispatches_once() {
    let harness = TestHarness::builder()
        .with_completions(vec![
            ScriptedProvider::tool_call(
                "Here is the brochure!",
                "send_media",
                serde_json::json!({"kind": "brochure"}),
            ),
            ScriptedProvider::tool_call(
                "",
                "send_media",
                serde_json::json!({"kind": "brochure"}),
            ),
            ScriptedProvider::text("Anything else I can help with?"),
        ])
        .build()
        .await
        .unwrap();

    let log = run_loop::run(
        harness.provider.as_ref(),
        &executor_for(&harness, "c1"),
        &dispatcher_for(&harness, "c1"),
        "system".into(),
        vec![TurnMessage::user_text("can you send the brochure?")],
        &loop_params(5),
    )
    .await
    .unwrap();

    // Exactly one gateway media dispatch despite two tool calls.
    assert_eq!(harness.gateway.media_count(), 1);
    assert_eq!(log.iterations, 3);
    assert_eq!(log.steps[0].tools_executed, vec!["send_media"]);
    assert_eq!(log.steps[1].tools_executed, vec!["send_media"]);

    // Exactly one persisted media marker.
    let outbound = harness.outbound_messages("c1").await.unwrap();
    let markers: Vec<_> = outbound
        .iter()
        .filter(|m| {
            m.text
                .as_deref()
                .is_some_and(|t| t.contains(&media_marker("brochure")))
        })
        .collect();
    assert_eq!(markers.len(), 1);
    assert!(markers[0].media_url.is_some());
}

#[tokio::test]
async fn send_media_deduped_against_recent_history() {
    let harness = TestHarness::builder()
        .with_completions(vec![
            ScriptedProvider::tool_call(
                "",
                "send_media",
                serde_json::json!({"kind": "brochure"}),
            ),
            ScriptedProvider::text("You already have it!"),
        ])
        .build()
        .await
        .unwrap();

    // A prior invocation already sent this media.
    harness
        .store
        .append(&StoredMessage::outbound_text(
            "prior".into(),
            "c1",
            &media_marker("brochure"),
            100,
        ))
        .await
        .unwrap();

    run_loop::run(
        harness.provider.as_ref(),
        &executor_for(&harness, "c1"),
        &dispatcher_for(&harness, "c1"),
        "system".into(),
        vec![TurnMessage::user_text("send me the brochure again")],
        &loop_params(5),
    )
    .await
    .unwrap();

    assert_eq!(harness.gateway.media_count(), 0);
}

#[tokio::test]
async fn unknown_media_kind_reports_catalog_to_model() {
    let harness = TestHarness::builder().build().await.unwrap();
    let executor = executor_for(&harness, "c1");

    let result = executor
        .execute(
            &ToolInvocation {
                id: "t1".into(),
                name: "send_media".into(),
                input: serde_json::json!({"kind": "nonexistent"}),
            },
            &[],
        )
        .await;

    assert!(result.contains("no 'nonexistent' media"));
    assert_eq!(harness.gateway.media_count(), 0);
}

// ---- Iteration bound ----

#[tokio::test]
async fn loop_never_exceeds_iteration_cap() {
    // A model that calls tools forever.
    let completions = (0..20)
        .map(|_| {
            ScriptedProvider::tool_call(
                "",
                "send_media",
                serde_json::json!({"kind": "tour"}),
            )
        })
        .collect();
    let harness = TestHarness::builder()
        .with_completions(completions)
        .build()
        .await
        .unwrap();

    let log = run_loop::run(
        harness.provider.as_ref(),
        &executor_for(&harness, "c1"),
        &dispatcher_for(&harness, "c1"),
        "system".into(),
        vec![TurnMessage::user_text("hi")],
        &loop_params(5),
    )
    .await
    .unwrap();

    assert_eq!(log.iterations, 5);
    assert_eq!(harness.provider.calls(), 5);
    assert_eq!(log.steps.len(), 5);
}

#[tokio::test]
async fn tool_free_natural_finish_stops_after_one_iteration() {
    let harness = TestHarness::builder()
        .with_completions(vec![ScriptedProvider::text("Hello!")])
        .build()
        .await
        .unwrap();

    let log = run_loop::run(
        harness.provider.as_ref(),
        &executor_for(&harness, "c1"),
        &dispatcher_for(&harness, "c1"),
        "system".into(),
        vec![TurnMessage::user_text("oi")],
        &loop_params(5),
    )
    .await
    .unwrap();

    assert_eq!(log.iterations, 1);
    assert!(log.steps[0].text_sent);
    assert!(log.steps[0].tools_executed.is_empty());
}

// ---- Ordering ----

#[tokio::test]
async fn paragraphs_deliver_and_persist_in_order() {
    let harness = TestHarness::builder()
        .with_completions(vec![ScriptedProvider::text(
            "First paragraph.\n\nSecond paragraph.\n\nThird paragraph.",
        )])
        .build()
        .await
        .unwrap();

    run_loop::run(
        harness.provider.as_ref(),
        &executor_for(&harness, "c1"),
        &dispatcher_for(&harness, "c1"),
        "system".into(),
        vec![TurnMessage::user_text("tell me more")],
        &loop_params(5),
    )
    .await
    .unwrap();

    assert_eq!(
        harness.gateway.texts(),
        vec!["First paragraph.", "Second paragraph.", "Third paragraph."]
    );

    let outbound = harness.outbound_messages("c1").await.unwrap();
    let texts: Vec<&str> = outbound.iter().filter_map(|m| m.text.as_deref()).collect();
    assert_eq!(
        texts,
        vec!["First paragraph.", "Second paragraph.", "Third paragraph."]
    );
    // Persisted order is backed by strictly increasing timestamps.
    assert!(outbound.windows(2).all(|w| w[0].timestamp_ms < w[1].timestamp_ms));
}

#[tokio::test]
async fn text_is_dispatched_before_tool_side_effects() {
    let harness = TestHarness::builder()
        .with_completions(vec![
            ScriptedProvider::tool_call(
                "Sending the tour video now!",
                "send_media",
                serde_json::json!({"kind": "tour"}),
            ),
            ScriptedProvider::text("Enjoy!"),
        ])
        .build()
        .await
        .unwrap();

    run_loop::run(
        harness.provider.as_ref(),
        &executor_for(&harness, "c1"),
        &dispatcher_for(&harness, "c1"),
        "system".into(),
        vec![TurnMessage::user_text("show me around")],
        &loop_params(5),
    )
    .await
    .unwrap();

    let sent = harness.gateway.sent();
    assert!(matches!(&sent[0], SentItem::Text { text, .. } if text == "Sending the tour video now!"));
    assert!(matches!(&sent[1], SentItem::Media { .. }));
    assert!(matches!(&sent[2], SentItem::Text { text, .. } if text == "Enjoy!"));
}

// ---- Transport failure ----

#[tokio::test]
async fn gateway_failure_still_persists_outbound_history() {
    let harness = TestHarness::builder()
        .with_completions(vec![ScriptedProvider::text("One.\n\nTwo.")])
        .build()
        .await
        .unwrap();
    harness.gateway.set_failing(true);

    let log = run_loop::run(
        harness.provider.as_ref(),
        &executor_for(&harness, "c1"),
        &dispatcher_for(&harness, "c1"),
        "system".into(),
        vec![TurnMessage::user_text("hi")],
        &loop_params(5),
    )
    .await
    .unwrap();

    // Transport failed, but intent is recorded and the loop completed.
    assert_eq!(log.iterations, 1);
    let outbound = harness.outbound_messages("c1").await.unwrap();
    let texts: Vec<&str> = outbound.iter().filter_map(|m| m.text.as_deref()).collect();
    assert_eq!(texts, vec!["One.", "Two."]);
}

#[tokio::test]
async fn media_gateway_failure_becomes_tool_result_not_error() {
    let harness = TestHarness::builder()
        .with_completions(vec![
            ScriptedProvider::tool_call(
                "",
                "send_media",
                serde_json::json!({"kind": "brochure"}),
            ),
            ScriptedProvider::text("Sorry, I'll try again later."),
        ])
        .build()
        .await
        .unwrap();
    harness.gateway.set_failing(true);

    let log = run_loop::run(
        harness.provider.as_ref(),
        &executor_for(&harness, "c1"),
        &dispatcher_for(&harness, "c1"),
        "system".into(),
        vec![TurnMessage::user_text("brochure please")],
        &loop_params(5),
    )
    .await
    .unwrap();

    // The loop survived the failure and kept iterating.
    assert_eq!(log.iterations, 2);
    // No marker was persisted for the failed dispatch.
    let outbound = harness.outbound_messages("c1").await.unwrap();
    assert!(!outbound
        .iter()
        .any(|m| m.text.as_deref().is_some_and(|t| t.contains("(media sent:"))));
}

// ---- Scheduling rules ----

#[tokio::test]
async fn sunday_visits_always_rejected() {
    let harness = TestHarness::builder().build().await.unwrap();
    harness
        .store
        .upsert(&zapflow_core::Lead::new("c1", "2026-08-07T00:00:00Z".into()))
        .await
        .unwrap();
    let executor = executor_for(&harness, "c1");

    for period in ["morning", "afternoon"] {
        let result = executor
            .execute(
                &ToolInvocation {
                    id: format!("t-{period}"),
                    name: "schedule_visit".into(),
                    // 2026-08-09 is a Sunday.
                    input: serde_json::json!({"date": "2026-08-09", "period": period}),
                },
                &[],
            )
            .await;
        assert!(result.contains("Sundays"), "got: {result}");
    }

    let lead = LeadStore::get(harness.store.as_ref(), "c1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(lead.status, LeadStatus::Prospect);
    assert!(lead.automation_enabled);
    assert_eq!(harness.notifier.count(), 0);
}

#[tokio::test]
async fn saturday_afternoon_rejected_morning_allowed() {
    let harness = TestHarness::builder().build().await.unwrap();
    harness
        .store
        .upsert(&zapflow_core::Lead::new("c1", "2026-08-07T00:00:00Z".into()))
        .await
        .unwrap();
    let executor = executor_for(&harness, "c1");

    // 2026-08-08 is a Saturday.
    let rejected = executor
        .execute(
            &ToolInvocation {
                id: "t1".into(),
                name: "schedule_visit".into(),
                input: serde_json::json!({"date": "2026-08-08", "period": "afternoon"}),
            },
            &[],
        )
        .await;
    assert!(rejected.contains("morning"), "got: {rejected}");

    let accepted = executor
        .execute(
            &ToolInvocation {
                id: "t2".into(),
                name: "schedule_visit".into(),
                input: serde_json::json!({"date": "2026-08-08", "period": "morning"}),
            },
            &[],
        )
        .await;
    assert!(accepted.contains("booked"), "got: {accepted}");

    let lead = LeadStore::get(harness.store.as_ref(), "c1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(lead.status, LeadStatus::Scheduled);
    assert!(!lead.automation_enabled);

    wait_until(|| harness.notifier.count() == 1).await;
}

#[tokio::test]
async fn weekday_visit_schedules_and_notifies() {
    let harness = TestHarness::builder().build().await.unwrap();
    harness
        .store
        .upsert(&zapflow_core::Lead::new("c1", "2026-08-07T00:00:00Z".into()))
        .await
        .unwrap();
    let executor = executor_for(&harness, "c1");

    // 2026-08-10 is a Monday.
    let result = executor
        .execute(
            &ToolInvocation {
                id: "t1".into(),
                name: "schedule_visit".into(),
                input: serde_json::json!({"date": "2026-08-10", "period": "afternoon"}),
            },
            &[],
        )
        .await;
    assert!(result.contains("booked"), "got: {result}");

    let lead = LeadStore::get(harness.store.as_ref(), "c1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(lead.status, LeadStatus::Scheduled);
    assert!(!lead.automation_enabled);

    wait_until(|| harness.notifier.count() == 1).await;
    let events = harness.notifier.events();
    assert!(matches!(
        events[0].kind,
        zapflow_core::types::NotificationKind::VisitScheduled {
            period: VisitPeriod::Afternoon,
            ..
        }
    ));
}

// ---- Proposal finalization ----

#[tokio::test]
async fn finalize_proposal_updates_lead_and_notifies() {
    let harness = TestHarness::builder().build().await.unwrap();
    harness
        .store
        .upsert(&zapflow_core::Lead::new("c1", "2026-08-07T00:00:00Z".into()))
        .await
        .unwrap();
    let executor = executor_for(&harness, "c1");

    let result = executor
        .execute(
            &ToolInvocation {
                id: "t1".into(),
                name: "finalize_proposal".into(),
                input: serde_json::json!({"value": 325000.0}),
            },
            &[],
        )
        .await;
    assert!(result.contains("registered"), "got: {result}");

    let lead = LeadStore::get(harness.store.as_ref(), "c1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(lead.status, LeadStatus::Proposal);
    assert_eq!(lead.budget_value, Some(325_000.0));
    // Proposal does not switch automation off.
    assert!(lead.automation_enabled);

    wait_until(|| harness.notifier.count() == 1).await;

    // A system marker landed in history.
    let outbound = harness.outbound_messages("c1").await.unwrap();
    assert!(outbound
        .iter()
        .any(|m| m.text.as_deref().is_some_and(|t| t.contains("proposal finalized"))));
}

// ---- Stage-direction stripping through the loop ----

#[tokio::test]
async fn stage_directions_never_reach_the_gateway() {
    let harness = TestHarness::builder()
        .with_completions(vec![ScriptedProvider::text(
            "[checks the listings] We have two units available!",
        )])
        .build()
        .await
        .unwrap();

    run_loop::run(
        harness.provider.as_ref(),
        &executor_for(&harness, "c1"),
        &dispatcher_for(&harness, "c1"),
        "system".into(),
        vec![TurnMessage::user_text("any units left?")],
        &loop_params(5),
    )
    .await
    .unwrap();

    let texts = harness.gateway.texts();
    assert_eq!(texts.len(), 1);
    assert!(!texts[0].contains('['));
    assert!(texts[0].contains("two units available"));
}

// ---- Unknown tool defense ----

#[tokio::test]
async fn unknown_tool_name_is_rejected_with_result_string() {
    let harness = TestHarness::builder()
        .with_completions(vec![
            ScriptedProvider::tool_call("", "drop_tables", serde_json::json!({})),
            ScriptedProvider::text("Understood."),
        ])
        .build()
        .await
        .unwrap();

    let log = run_loop::run(
        harness.provider.as_ref(),
        &executor_for(&harness, "c1"),
        &dispatcher_for(&harness, "c1"),
        "system".into(),
        vec![TurnMessage::user_text("hi")],
        &loop_params(5),
    )
    .await
    .unwrap();

    // The loop fed the rejection back and continued normally.
    assert_eq!(log.iterations, 2);
    assert_eq!(harness.gateway.media_count(), 0);
}
