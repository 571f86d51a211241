//! Store abstractions
//!
//! The store is the single source of truth for SMS sessions, the medicine
//! catalog and symptom-checker chat history. Handlers never cache sessions
//! in memory, so any number of server instances can share one store.

pub mod supabase;

use crate::sms::state::{LookupQuery, Session};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// Number of chat turns retained per symptom-checker session
pub const CHAT_HISTORY_LIMIT: usize = 10;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Request to store failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Store returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Malformed record: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("Invalid timestamp: {0}")]
    Timestamp(String),
    #[error("Store lock poisoned")]
    Poisoned,
}

pub type StoreResult<T> = Result<T, StoreError>;

/// One row of the `medicines` table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MedicineVariant {
    pub brand_name: String,
    #[serde(default)]
    pub generic_name: Option<String>,
    #[serde(default)]
    pub strength: Option<String>,
}

/// One result row of the nearby-pharmacy search procedure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PharmacyStockRecord {
    pub pharmacy_name: String,
    pub pharmacy_address: String,
    pub med_brand_name: String,
    pub med_strength: String,
    pub stock: i64,
    pub pharmacy_phone: String,
}

/// A single question/answer exchange in the symptom checker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    #[serde(default)]
    pub human: Option<String>,
    #[serde(default)]
    pub ai: Option<String>,
}

impl ChatTurn {
    pub fn new(human: impl Into<String>, ai: impl Into<String>) -> Self {
        Self {
            human: Some(human.into()),
            ai: Some(ai.into()),
        }
    }
}

/// Per-phone-number disambiguation sessions
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Fetch the session for a phone number, if one exists
    async fn get_session(&self, phone: &str) -> StoreResult<Option<Session>>;

    /// Insert or replace the session keyed by its phone number
    async fn upsert_session(&self, session: &Session) -> StoreResult<()>;

    /// Remove the session for a phone number (no-op when absent)
    async fn delete_session(&self, phone: &str) -> StoreResult<()>;
}

/// Read-only medicine and pharmacy lookups
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Case-insensitive substring match on brand or generic name
    async fn find_variants(&self, fragment: &str) -> StoreResult<Vec<MedicineVariant>>;

    /// Pharmacies near a pincode stocking the medicine
    async fn find_nearby(&self, query: &LookupQuery) -> StoreResult<Vec<PharmacyStockRecord>>;
}

/// Symptom-checker chat history
#[async_trait]
pub trait ChatHistoryStore: Send + Sync {
    async fn load_history(&self, session_id: &str) -> StoreResult<Vec<ChatTurn>>;

    /// Append a turn, keeping only the newest [`CHAT_HISTORY_LIMIT`] turns
    async fn append_turn(&self, session_id: &str, turn: ChatTurn) -> StoreResult<()>;
}

/// Combined storage trait for convenience
pub trait Store: SessionStore + CatalogStore + ChatHistoryStore {}
impl<T: SessionStore + CatalogStore + ChatHistoryStore> Store for T {}

/// Keep the newest `limit` turns
pub fn trim_history(history: &mut Vec<ChatTurn>, limit: usize) {
    if history.len() > limit {
        let excess = history.len() - limit;
        history.drain(..excess);
    }
}

// ============================================================================
// Arc implementations for trait objects
// ============================================================================

#[async_trait]
impl<T: SessionStore + ?Sized> SessionStore for Arc<T> {
    async fn get_session(&self, phone: &str) -> StoreResult<Option<Session>> {
        (**self).get_session(phone).await
    }

    async fn upsert_session(&self, session: &Session) -> StoreResult<()> {
        (**self).upsert_session(session).await
    }

    async fn delete_session(&self, phone: &str) -> StoreResult<()> {
        (**self).delete_session(phone).await
    }
}

#[async_trait]
impl<T: CatalogStore + ?Sized> CatalogStore for Arc<T> {
    async fn find_variants(&self, fragment: &str) -> StoreResult<Vec<MedicineVariant>> {
        (**self).find_variants(fragment).await
    }

    async fn find_nearby(&self, query: &LookupQuery) -> StoreResult<Vec<PharmacyStockRecord>> {
        (**self).find_nearby(query).await
    }
}

#[async_trait]
impl<T: ChatHistoryStore + ?Sized> ChatHistoryStore for Arc<T> {
    async fn load_history(&self, session_id: &str) -> StoreResult<Vec<ChatTurn>> {
        (**self).load_history(session_id).await
    }

    async fn append_turn(&self, session_id: &str, turn: ChatTurn) -> StoreResult<()> {
        (**self).append_turn(session_id, turn).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trim_history_keeps_newest() {
        let mut history: Vec<ChatTurn> = (0..13)
            .map(|i| ChatTurn::new(format!("q{i}"), format!("a{i}")))
            .collect();
        trim_history(&mut history, CHAT_HISTORY_LIMIT);
        assert_eq!(history.len(), 10);
        assert_eq!(history[0].human.as_deref(), Some("q3"));
        assert_eq!(history[9].human.as_deref(), Some("q12"));
    }

    #[test]
    fn test_variant_tolerates_null_strength() {
        let v: MedicineVariant =
            serde_json::from_str(r#"{"brand_name":"Crocin","strength":null}"#).unwrap();
        assert_eq!(v.strength, None);
        assert_eq!(v.generic_name, None);
    }
}
