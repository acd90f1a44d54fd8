//! Guardrail events repository.

use chrono::{DateTime, Utc};
use mirror_core::SafetyAction;
use rusqlite::{params, Connection, Row};
use sha2::{Digest, Sha256};

use crate::error::Result;
use crate::models::{NewStoredEvent, StoredEvent};

/// Maximum preview length in characters.
const PREVIEW_MAX_LEN: usize = 50;

/// Repository for guardrail event operations.
pub struct EventsRepo;

impl EventsRepo {
    /// Insert a new event.
    pub fn insert(conn: &Connection, event: NewStoredEvent) -> Result<i64> {
        conn.execute(
            "INSERT INTO guardrail_events
                 (rule_id, action, message, text_hash, text_preview, metadata, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                event.rule_id,
                event.action.as_str(),
                event.message,
                event.text_hash,
                event.text_preview,
                event.metadata.to_string(),
                event.created_at.to_rfc3339(),
            ],
        )?;

        Ok(conn.last_insert_rowid())
    }

    /// Get an event by ID.
    pub fn get_by_id(conn: &Connection, id: i64) -> Result<Option<StoredEvent>> {
        let mut stmt = conn.prepare(
            "SELECT id, rule_id, action, message, text_hash, text_preview, metadata, created_at
             FROM guardrail_events WHERE id = ?1",
        )?;

        let event = stmt.query_row([id], row_to_event).ok();
        Ok(event)
    }

    /// Get recent events with pagination.
    pub fn get_recent(conn: &Connection, limit: i64, offset: i64) -> Result<Vec<StoredEvent>> {
        let mut stmt = conn.prepare(
            "SELECT id, rule_id, action, message, text_hash, text_preview, metadata, created_at
             FROM guardrail_events ORDER BY created_at DESC, id DESC LIMIT ?1 OFFSET ?2",
        )?;

        let events = stmt
            .query_map([limit, offset], row_to_event)?
            .filter_map(|r| r.ok())
            .collect();

        Ok(events)
    }

    /// Count total events.
    pub fn count(conn: &Connection) -> Result<i64> {
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM guardrail_events", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Count events by action.
    pub fn count_by_action(conn: &Connection, action: SafetyAction) -> Result<i64> {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM guardrail_events WHERE action = ?1",
            [action.as_str()],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Delete events older than a given date.
    pub fn delete_older_than(conn: &Connection, before: DateTime<Utc>) -> Result<i64> {
        let deleted = conn.execute(
            "DELETE FROM guardrail_events WHERE created_at < ?1",
            [before.to_rfc3339()],
        )?;
        Ok(deleted as i64)
    }
}

fn row_to_event(row: &Row<'_>) -> rusqlite::Result<StoredEvent> {
    Ok(StoredEvent {
        id: row.get(0)?,
        rule_id: row.get(1)?,
        action: row
            .get::<_, String>(2)
            .ok()
            .and_then(|s| SafetyAction::parse(&s))
            .unwrap_or(SafetyAction::Allow),
        message: row.get(3)?,
        text_hash: row.get(4)?,
        text_preview: row.get(5)?,
        metadata: row
            .get::<_, String>(6)
            .ok()
            .and_then(|s| serde_json::from_str(&s).ok())
            .unwrap_or_else(|| serde_json::json!({})),
        created_at: parse_datetime(&row.get::<_, String>(7)?),
    })
}

/// Hash the evaluated text using SHA-256.
pub fn hash_text(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let result = hasher.finalize();
    hex::encode(result)
}

/// Create a preview from the text (control characters stripped, truncated).
pub fn create_preview(text: &str) -> String {
    let cleaned: Vec<char> = text.chars().filter(|c| !c.is_control()).collect();

    if cleaned.len() > PREVIEW_MAX_LEN {
        let truncated: String = cleaned[..PREVIEW_MAX_LEN].iter().collect();
        format!("{}...", truncated)
    } else {
        cleaned.into_iter().collect()
    }
}

/// Parse a datetime from SQLite format.
fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|dt| dt.and_utc())
        })
        .unwrap_or_else(|_| Utc::now())
}

// Hex encoding for the hash digest
mod hex {
    const HEX_CHARS: &[u8; 16] = b"0123456789abcdef";

    pub fn encode(bytes: impl AsRef<[u8]>) -> String {
        let bytes = bytes.as_ref();
        let mut hex = String::with_capacity(bytes.len() * 2);
        for &byte in bytes {
            hex.push(HEX_CHARS[(byte >> 4) as usize] as char);
            hex.push(HEX_CHARS[(byte & 0xf) as usize] as char);
        }
        hex
    }
}
