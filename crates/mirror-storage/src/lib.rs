//! Mirror Storage - SQLite audit trail.
//!
//! Durable sink for the guardrail events the safety pipeline emits. Privacy
//! preserving by default: rows carry a SHA-256 hash and a short preview of
//! the evaluated text, never the full message.
//!
//! # Example
//!
//! ```no_run
//! use mirror_core::{AuditLogger, GuardrailEvent, SafetyAction};
//! use mirror_storage::AuditStore;
//!
//! let store = AuditStore::in_memory().unwrap();
//! let event = GuardrailEvent::new(SafetyAction::Warn, "local rule matched", "user text")
//!     .with_rule_id("abuse-warn");
//! store.record(&event).unwrap();
//! ```

pub mod error;
pub mod models;
mod pool;
pub mod repository;
mod schema;
mod store;

pub use error::{Result, StorageError};
pub use models::{NewStoredEvent, RedactionPolicy, StoredEvent};
pub use pool::ConnectionPool;
pub use repository::{create_preview, hash_text, EventsRepo};
pub use store::AuditStore;
