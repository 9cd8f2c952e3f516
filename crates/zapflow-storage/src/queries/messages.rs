// SPDX-FileCopyrightText: 2026 Zapflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message log operations.

use rusqlite::params;
use zapflow_core::types::{Direction, MediaKind, StoredMessage};
use zapflow_core::ZapflowError;

use crate::database::{map_tr_err, Database};
use crate::queries::parse_col;

const MESSAGE_COLUMNS: &str =
    "id, conversation_id, direction, text, media_url, media_kind, timestamp_ms, read_flag";

fn row_to_message(row: &rusqlite::Row<'_>) -> Result<StoredMessage, rusqlite::Error> {
    let direction: String = row.get(2)?;
    let media_kind: Option<String> = row.get(5)?;
    Ok(StoredMessage {
        id: row.get(0)?,
        conversation_id: row.get(1)?,
        direction: parse_col::<Direction>(2, &direction)?,
        text: row.get(3)?,
        media_url: row.get(4)?,
        media_kind: media_kind
            .as_deref()
            .map(|k| parse_col::<MediaKind>(5, k))
            .transpose()?,
        timestamp_ms: row.get(6)?,
        read: row.get::<_, i64>(7)? != 0,
    })
}

/// Append a message to the conversation log.
pub async fn insert_message(db: &Database, msg: &StoredMessage) -> Result<(), ZapflowError> {
    let msg = msg.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO messages
                 (id, conversation_id, direction, text, media_url, media_kind, timestamp_ms, read_flag)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    msg.id,
                    msg.conversation_id,
                    msg.direction.to_string(),
                    msg.text,
                    msg.media_url,
                    msg.media_kind.map(|k| k.to_string()),
                    msg.timestamp_ms,
                    msg.read as i64,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Fetch a message by id.
pub async fn get_message(
    db: &Database,
    id: &str,
) -> Result<Option<StoredMessage>, ZapflowError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = ?1"
            ))?;
            let mut rows = stmt.query_map(params![id], row_to_message)?;
            match rows.next() {
                Some(row) => Ok(Some(row?)),
                None => Ok(None),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Count inbound messages in a conversation with a strictly later timestamp.
///
/// This is the coalescing controller's supersession check.
pub async fn count_inbound_after(
    db: &Database,
    conversation_id: &str,
    timestamp_ms: i64,
) -> Result<u64, ZapflowError> {
    let conversation_id = conversation_id.to_string();
    db.connection()
        .call(move |conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM messages
                 WHERE conversation_id = ?1 AND direction = 'inbound' AND timestamp_ms > ?2",
                params![conversation_id, timestamp_ms],
                |row| row.get(0),
            )?;
            Ok(count as u64)
        })
        .await
        .map_err(map_tr_err)
}

/// Last `limit` messages of a conversation in chronological order.
pub async fn recent_messages(
    db: &Database,
    conversation_id: &str,
    limit: u32,
) -> Result<Vec<StoredMessage>, ZapflowError> {
    let conversation_id = conversation_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {MESSAGE_COLUMNS} FROM (
                     SELECT {MESSAGE_COLUMNS} FROM messages
                     WHERE conversation_id = ?1
                     ORDER BY timestamp_ms DESC LIMIT ?2
                 ) ORDER BY timestamp_ms ASC"
            ))?;
            let rows = stmt.query_map(params![conversation_id, limit], row_to_message)?;
            let mut messages = Vec::new();
            for row in rows {
                messages.push(row?);
            }
            Ok(messages)
        })
        .await
        .map_err(map_tr_err)
}

/// Last `limit` messages strictly older than `before_ms`, chronological.
///
/// Used by context assembly so the triggering message never appears twice.
pub async fn recent_messages_before(
    db: &Database,
    conversation_id: &str,
    before_ms: i64,
    limit: u32,
) -> Result<Vec<StoredMessage>, ZapflowError> {
    let conversation_id = conversation_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {MESSAGE_COLUMNS} FROM (
                     SELECT {MESSAGE_COLUMNS} FROM messages
                     WHERE conversation_id = ?1 AND timestamp_ms < ?2
                     ORDER BY timestamp_ms DESC LIMIT ?3
                 ) ORDER BY timestamp_ms ASC"
            ))?;
            let rows =
                stmt.query_map(params![conversation_id, before_ms, limit], row_to_message)?;
            let mut messages = Vec::new();
            for row in rows {
                messages.push(row?);
            }
            Ok(messages)
        })
        .await
        .map_err(map_tr_err)
}

/// Mark inbound messages up to and including `up_to_ms` as read.
pub async fn mark_read_up_to(
    db: &Database,
    conversation_id: &str,
    up_to_ms: i64,
) -> Result<(), ZapflowError> {
    let conversation_id = conversation_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE messages SET read_flag = 1
                 WHERE conversation_id = ?1 AND direction = 'inbound' AND timestamp_ms <= ?2",
                params![conversation_id, up_to_ms],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}
