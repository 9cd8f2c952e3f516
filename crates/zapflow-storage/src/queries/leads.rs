// SPDX-FileCopyrightText: 2026 Zapflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Lead record operations.
//!
//! Mutations that pair the status with derived fields (budget, automation
//! switch) are single UPDATE statements: concurrent writers must never
//! observe a partially-applied transition.

use rusqlite::params;
use zapflow_core::lead::{Lead, LeadStatus};
use zapflow_core::ZapflowError;

use crate::database::{map_tr_err, Database};
use crate::queries::parse_col;

fn row_to_lead(row: &rusqlite::Row<'_>) -> Result<Lead, rusqlite::Error> {
    let status: String = row.get(1)?;
    Ok(Lead {
        conversation_id: row.get(0)?,
        status: parse_col::<LeadStatus>(1, &status)?,
        budget_value: row.get(2)?,
        instance: row.get(3)?,
        automation_enabled: row.get::<_, i64>(4)? != 0,
        notes: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Fetch a lead by conversation id.
pub async fn get_lead(
    db: &Database,
    conversation_id: &str,
) -> Result<Option<Lead>, ZapflowError> {
    let conversation_id = conversation_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT conversation_id, status, budget_value, instance,
                        automation_enabled, notes, updated_at
                 FROM leads WHERE conversation_id = ?1",
            )?;
            let mut rows = stmt.query_map(params![conversation_id], row_to_lead)?;
            match rows.next() {
                Some(row) => Ok(Some(row?)),
                None => Ok(None),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Insert or fully replace a lead record.
pub async fn upsert_lead(db: &Database, lead: &Lead) -> Result<(), ZapflowError> {
    let lead = lead.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO leads
                 (conversation_id, status, budget_value, instance, automation_enabled, notes, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT(conversation_id) DO UPDATE SET
                     status = excluded.status,
                     budget_value = excluded.budget_value,
                     instance = excluded.instance,
                     automation_enabled = excluded.automation_enabled,
                     notes = excluded.notes,
                     updated_at = excluded.updated_at",
                params![
                    lead.conversation_id,
                    lead.status.to_string(),
                    lead.budget_value,
                    lead.instance,
                    lead.automation_enabled as i64,
                    lead.notes,
                    lead.updated_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Status -> `proposal` together with the budget value, atomically.
pub async fn record_proposal(
    db: &Database,
    conversation_id: &str,
    value: f64,
) -> Result<(), ZapflowError> {
    let conversation_id = conversation_id.to_string();
    let now = now_rfc3339();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE leads SET status = 'proposal', budget_value = ?2, updated_at = ?3
                 WHERE conversation_id = ?1",
                params![conversation_id, value, now],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Status -> `scheduled` together with disabling automation, atomically.
pub async fn record_scheduled(
    db: &Database,
    conversation_id: &str,
) -> Result<(), ZapflowError> {
    let conversation_id = conversation_id.to_string();
    let now = now_rfc3339();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE leads SET status = 'scheduled', automation_enabled = 0, updated_at = ?2
                 WHERE conversation_id = ?1",
                params![conversation_id, now],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Bare status write, used by the re-engagement rule.
pub async fn set_status(
    db: &Database,
    conversation_id: &str,
    status: LeadStatus,
) -> Result<(), ZapflowError> {
    let conversation_id = conversation_id.to_string();
    let now = now_rfc3339();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE leads SET status = ?2, updated_at = ?3 WHERE conversation_id = ?1",
                params![conversation_id, status.to_string(), now],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}
