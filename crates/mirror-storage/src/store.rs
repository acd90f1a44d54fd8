//! High-level audit store.

use std::path::PathBuf;

use directories::ProjectDirs;
use serde_json::Value;
use tracing::info;

use mirror_core::{AuditError, AuditLogger, GuardrailEvent, SafetyAction};

use crate::error::{Result, StorageError};
use crate::models::{NewStoredEvent, RedactionPolicy, StoredEvent};
use crate::pool::ConnectionPool;
use crate::repository::{create_preview, hash_text, EventsRepo};

/// Durable sink for guardrail events.
///
/// Applies the configured [`RedactionPolicy`] before anything touches disk,
/// then implements [`AuditLogger`] so the pipeline can use it directly.
#[derive(Clone)]
pub struct AuditStore {
    pool: ConnectionPool,
    redaction: RedactionPolicy,
}

impl AuditStore {
    /// Create a store in the default app data directory.
    pub fn new() -> Result<Self> {
        Self::with_path(Self::default_db_path()?)
    }

    /// Create a store at a specific path.
    pub fn with_path(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        // Create parent directories if they don't exist
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        info!("Opening audit database at: {:?}", path);
        let pool = ConnectionPool::new(&path)?;

        Ok(Self {
            pool,
            redaction: RedactionPolicy::default(),
        })
    }

    /// Create an in-memory store (for testing).
    pub fn in_memory() -> Result<Self> {
        let pool = ConnectionPool::in_memory()?;
        Ok(Self {
            pool,
            redaction: RedactionPolicy::default(),
        })
    }

    /// Override the redaction policy.
    pub fn with_redaction(mut self, redaction: RedactionPolicy) -> Self {
        self.redaction = redaction;
        self
    }

    /// Get the default database path.
    pub fn default_db_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("com", "mirror", "mirror")
            .ok_or_else(|| StorageError::Config("Could not determine app data directory".into()))?;

        Ok(proj_dirs.data_dir().join("mirror.db"))
    }

    /// Persist one guardrail event.
    pub fn log_event(&self, event: &GuardrailEvent) -> Result<i64> {
        let conn = self.pool.get()?;

        let text_preview = match self.redaction {
            RedactionPolicy::Hashed => create_preview(&event.user_text),
            RedactionPolicy::Raw => event.user_text.clone(),
        };

        let record = NewStoredEvent {
            rule_id: event.rule_id.clone(),
            action: event.action,
            message: event.message.clone(),
            text_hash: hash_text(&event.user_text),
            text_preview,
            metadata: Value::Object(event.metadata.clone()),
            created_at: event.timestamp,
        };

        EventsRepo::insert(&conn, record)
    }

    /// Get an event by ID.
    pub fn get_event(&self, id: i64) -> Result<Option<StoredEvent>> {
        let conn = self.pool.get()?;
        EventsRepo::get_by_id(&conn, id)
    }

    /// Get recent events.
    pub fn recent_events(&self, limit: i64, offset: i64) -> Result<Vec<StoredEvent>> {
        let conn = self.pool.get()?;
        EventsRepo::get_recent(&conn, limit, offset)
    }

    /// Count total events.
    pub fn count_events(&self) -> Result<i64> {
        let conn = self.pool.get()?;
        EventsRepo::count(&conn)
    }

    /// Count events by action.
    pub fn count_events_by_action(&self, action: SafetyAction) -> Result<i64> {
        let conn = self.pool.get()?;
        EventsRepo::count_by_action(&conn, action)
    }
}

impl AuditLogger for AuditStore {
    fn record(&self, event: &GuardrailEvent) -> std::result::Result<(), AuditError> {
        self.log_event(event)
            .map(|_| ())
            .map_err(|e| AuditError::Sink(e.to_string()))
    }
}
