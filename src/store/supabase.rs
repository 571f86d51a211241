//! Hosted store over the Supabase PostgREST API
//!
//! `PostgrestClient` exposes the generic table/procedure operations;
//! `SupabaseStore` implements the typed store traits on top of them.

use super::{
    trim_history, CatalogStore, ChatHistoryStore, ChatTurn, MedicineVariant, PharmacyStockRecord,
    SessionStore, StoreError, StoreResult, CHAT_HISTORY_LIMIT,
};
use crate::sms::state::{LookupQuery, Session};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;

const SESSION_TABLE: &str = "conversation_state";
const MEDICINE_TABLE: &str = "medicines";
const CHAT_TABLE: &str = "chat_history";
const NEARBY_PROCEDURE: &str = "get_nearby_pharmacies_sms";

/// Equality filter on one column
pub fn eq(column: &str, value: &str) -> (String, String) {
    (column.to_string(), format!("eq.{value}"))
}

/// Case-insensitive substring match on any of `columns`
///
/// The value is double-quoted so commas and parentheses in user text cannot
/// break out of the `or=(...)` group.
pub fn ilike_any(columns: &[&str], fragment: &str) -> (String, String) {
    let quoted = fragment.replace('\\', "\\\\").replace('"', "\\\"");
    let clauses: Vec<String> = columns
        .iter()
        .map(|c| format!("{c}.ilike.\"*{quoted}*\""))
        .collect();
    ("or".to_string(), format!("({})", clauses.join(",")))
}

/// Minimal PostgREST client: get, put (upsert), delete, query, call procedure
#[derive(Clone)]
pub struct PostgrestClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl PostgrestClient {
    pub fn new(project_url: &str, api_key: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");
        Self {
            client,
            base_url: format!("{}/rest/v1", project_url.trim_end_matches('/')),
            api_key: api_key.into(),
        }
    }

    fn authed(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/{table}", self.base_url)
    }

    /// Rows matching all filters
    pub async fn query<T: DeserializeOwned>(
        &self,
        table: &str,
        select: &str,
        filters: &[(String, String)],
    ) -> StoreResult<Vec<T>> {
        let request = self
            .authed(self.client.get(self.table_url(table)))
            .query(&[("select", select)])
            .query(filters);
        decode(checked(request.send().await?).await?).await
    }

    /// The single row whose `key_column` equals `key`
    pub async fn get<T: DeserializeOwned>(
        &self,
        table: &str,
        key_column: &str,
        key: &str,
    ) -> StoreResult<Option<T>> {
        let mut rows: Vec<T> = self.query(table, "*", &[eq(key_column, key)]).await?;
        Ok(if rows.is_empty() {
            None
        } else {
            Some(rows.swap_remove(0))
        })
    }

    /// Insert, or update the row that conflicts on `key_column`
    pub async fn put<T: Serialize + Sync>(
        &self,
        table: &str,
        key_column: &str,
        record: &T,
    ) -> StoreResult<()> {
        let request = self
            .authed(self.client.post(self.table_url(table)))
            .query(&[("on_conflict", key_column)])
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(record);
        checked(request.send().await?).await?;
        Ok(())
    }

    pub async fn delete(&self, table: &str, key_column: &str, key: &str) -> StoreResult<()> {
        let request = self
            .authed(self.client.delete(self.table_url(table)))
            .query(&[eq(key_column, key)]);
        checked(request.send().await?).await?;
        Ok(())
    }

    /// Call a database function through `/rpc/<name>`
    pub async fn call_procedure<T: DeserializeOwned>(
        &self,
        name: &str,
        args: &Value,
    ) -> StoreResult<Vec<T>> {
        let request = self
            .authed(self.client.post(format!("{}/rpc/{name}", self.base_url)))
            .json(args);
        decode(checked(request.send().await?).await?).await
    }
}

async fn checked(response: Response) -> StoreResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(StoreError::Status {
        status: status.as_u16(),
        body,
    })
}

async fn decode<T: DeserializeOwned>(response: Response) -> StoreResult<Vec<T>> {
    let body = response.text().await?;
    if body.trim().is_empty() {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_str(&body)?)
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatHistoryRow {
    session_id: String,
    #[serde(default)]
    history: Option<Vec<ChatTurn>>,
}

/// Store backed by a Supabase project
#[derive(Clone)]
pub struct SupabaseStore {
    client: PostgrestClient,
}

impl SupabaseStore {
    pub fn new(project_url: &str, api_key: impl Into<String>) -> Self {
        Self {
            client: PostgrestClient::new(project_url, api_key),
        }
    }
}

#[async_trait]
impl SessionStore for SupabaseStore {
    async fn get_session(&self, phone: &str) -> StoreResult<Option<Session>> {
        self.client.get(SESSION_TABLE, "user_phone", phone).await
    }

    async fn upsert_session(&self, session: &Session) -> StoreResult<()> {
        self.client.put(SESSION_TABLE, "user_phone", session).await
    }

    async fn delete_session(&self, phone: &str) -> StoreResult<()> {
        self.client.delete(SESSION_TABLE, "user_phone", phone).await
    }
}

#[async_trait]
impl CatalogStore for SupabaseStore {
    async fn find_variants(&self, fragment: &str) -> StoreResult<Vec<MedicineVariant>> {
        self.client
            .query(
                MEDICINE_TABLE,
                "brand_name,generic_name,strength",
                &[ilike_any(&["brand_name", "generic_name"], fragment)],
            )
            .await
    }

    async fn find_nearby(&self, query: &LookupQuery) -> StoreResult<Vec<PharmacyStockRecord>> {
        self.client
            .call_procedure(NEARBY_PROCEDURE, &nearby_args(query))
            .await
    }
}

#[async_trait]
impl ChatHistoryStore for SupabaseStore {
    async fn load_history(&self, session_id: &str) -> StoreResult<Vec<ChatTurn>> {
        let row: Option<ChatHistoryRow> = self.client.get(CHAT_TABLE, "session_id", session_id).await?;
        Ok(row.and_then(|r| r.history).unwrap_or_default())
    }

    async fn append_turn(&self, session_id: &str, turn: ChatTurn) -> StoreResult<()> {
        let mut history = self.load_history(session_id).await?;
        history.push(turn);
        trim_history(&mut history, CHAT_HISTORY_LIMIT);
        let row = ChatHistoryRow {
            session_id: session_id.to_string(),
            history: Some(history),
        };
        self.client.put(CHAT_TABLE, "session_id", &row).await
    }
}

fn nearby_args(query: &LookupQuery) -> Value {
    json!({
        "medicine_name_input": query.medicine,
        "strength_input": query.strength.as_filter(),
        "patient_pincode_input": query.pincode,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sms::state::Strength;

    #[test]
    fn test_eq_filter() {
        assert_eq!(
            eq("user_phone", "+919800000001"),
            ("user_phone".to_string(), "eq.+919800000001".to_string())
        );
    }

    #[test]
    fn test_ilike_any_quotes_value() {
        let (key, value) = ilike_any(&["brand_name", "generic_name"], "Para, (x) \"500\"");
        assert_eq!(key, "or");
        assert_eq!(
            value,
            r#"(brand_name.ilike."*Para, (x) \"500\"*",generic_name.ilike."*Para, (x) \"500\"*")"#
        );
    }

    #[test]
    fn test_nearby_args() {
        let args = nearby_args(&LookupQuery {
            medicine: "Crocin".to_string(),
            strength: Strength::Any,
            pincode: "411001".to_string(),
        });
        assert_eq!(
            args,
            json!({
                "medicine_name_input": "Crocin",
                "strength_input": "%",
                "patient_pincode_input": "411001",
            })
        );
    }

    #[test]
    fn test_session_row_shape() {
        let row = json!({
            "user_phone": "+919800000001",
            "context": {"medicine": "Crocin", "pincode": "411001"},
            "options_map": {"1": "250mg", "2": "500mg"},
            "expires_at": "2025-03-01T06:35:00+00:00"
        });
        let session: Session = serde_json::from_value(row).unwrap();
        assert_eq!(session.options_map.get("2"), Some("500mg"));

        let back = serde_json::to_value(&session).unwrap();
        assert_eq!(back["expires_at"], "2025-03-01T12:05:00+05:30");
        assert_eq!(back["context"]["pincode"], "411001");
    }

    #[test]
    fn test_chat_row_null_history() {
        let row: ChatHistoryRow =
            serde_json::from_str(r#"{"session_id":"s1","history":null}"#).unwrap();
        assert!(row.history.is_none());
    }
}
