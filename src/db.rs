//! Local SQLite store
//!
//! Implements the store traits against an embedded database with the same
//! tables as the hosted store. Used for local development and tests.

mod schema;

use schema::{NEARBY_PHARMACIES, SCHEMA};

use crate::sms::state::{parse_expiry, LookupQuery, OptionsMap, SearchContext, Session};
use crate::store::{
    trim_history, CatalogStore, ChatHistoryStore, ChatTurn, MedicineVariant, PharmacyStockRecord,
    SessionStore, StoreError, StoreResult, CHAT_HISTORY_LIMIT,
};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

/// Thread-safe database handle
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open or create database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    /// Open an in-memory database (for testing)
    #[allow(dead_code)] // Used in tests
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    fn run_migrations(&self) -> StoreResult<()> {
        let conn = self.lock()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    // ==================== Session Operations ====================

    pub fn get_session(&self, phone: &str) -> StoreResult<Option<Session>> {
        let conn = self.lock()?;
        let row = conn
            .query_row(
                "SELECT user_phone, context, options_map, expires_at
                 FROM conversation_state WHERE user_phone = ?1",
                params![phone],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                },
            )
            .optional()?;

        let Some((user_phone, context, options_map, expires_at)) = row else {
            return Ok(None);
        };
        let context: SearchContext = serde_json::from_str(&context)?;
        let options_map: OptionsMap = serde_json::from_str(&options_map)?;
        let expires_at = parse_expiry(&expires_at).map_err(StoreError::Timestamp)?;

        Ok(Some(Session {
            user_phone,
            context,
            options_map,
            expires_at,
        }))
    }

    /// Insert or replace the session for its phone number
    pub fn upsert_session(&self, session: &Session) -> StoreResult<()> {
        let context = serde_json::to_string(&session.context)?;
        let options_map = serde_json::to_string(&session.options_map)?;
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO conversation_state (user_phone, context, options_map, expires_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(user_phone) DO UPDATE SET
                context = excluded.context,
                options_map = excluded.options_map,
                expires_at = excluded.expires_at",
            params![
                session.user_phone,
                context,
                options_map,
                session.expires_at.to_rfc3339()
            ],
        )?;
        Ok(())
    }

    pub fn delete_session(&self, phone: &str) -> StoreResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "DELETE FROM conversation_state WHERE user_phone = ?1",
            params![phone],
        )?;
        Ok(())
    }

    // ==================== Catalog Operations ====================

    pub fn find_variants(&self, fragment: &str) -> StoreResult<Vec<MedicineVariant>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT brand_name, generic_name, strength FROM medicines
             WHERE brand_name LIKE '%' || ?1 || '%' ESCAPE '\\'
                OR generic_name LIKE '%' || ?1 || '%' ESCAPE '\\'
             ORDER BY id",
        )?;
        let rows = stmt.query_map(params![escape_like(fragment)], |row| {
            Ok(MedicineVariant {
                brand_name: row.get(0)?,
                generic_name: row.get(1)?,
                strength: row.get(2)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(StoreError::from)
    }

    pub fn find_nearby(&self, query: &LookupQuery) -> StoreResult<Vec<PharmacyStockRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(NEARBY_PHARMACIES)?;
        let rows = stmt.query_map(
            params![
                escape_like(&query.medicine),
                query.strength.as_filter(),
                query.pincode
            ],
            |row| {
                Ok(PharmacyStockRecord {
                    pharmacy_name: row.get(0)?,
                    pharmacy_address: row.get(1)?,
                    med_brand_name: row.get(2)?,
                    med_strength: row.get(3)?,
                    stock: row.get(4)?,
                    pharmacy_phone: row.get(5)?,
                })
            },
        )?;
        rows.collect::<Result<Vec<_>, _>>().map_err(StoreError::from)
    }

    #[allow(dead_code)] // Seeding helper, used in tests
    pub fn insert_medicine(
        &self,
        brand_name: &str,
        generic_name: Option<&str>,
        strength: Option<&str>,
    ) -> StoreResult<i64> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO medicines (brand_name, generic_name, strength) VALUES (?1, ?2, ?3)",
            params![brand_name, generic_name, strength],
        )?;
        Ok(conn.last_insert_rowid())
    }

    #[allow(dead_code)] // Seeding helper, used in tests
    pub fn insert_pharmacy(
        &self,
        name: &str,
        address: &str,
        pincode: &str,
        phone: &str,
    ) -> StoreResult<i64> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO pharmacies (name, address, pincode, phone) VALUES (?1, ?2, ?3, ?4)",
            params![name, address, pincode, phone],
        )?;
        Ok(conn.last_insert_rowid())
    }

    #[allow(dead_code)] // Seeding helper, used in tests
    pub fn set_stock(&self, pharmacy_id: i64, medicine_id: i64, stock: i64) -> StoreResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO pharmacy_stock (pharmacy_id, medicine_id, stock) VALUES (?1, ?2, ?3)
             ON CONFLICT(pharmacy_id, medicine_id) DO UPDATE SET stock = excluded.stock",
            params![pharmacy_id, medicine_id, stock],
        )?;
        Ok(())
    }

    // ==================== Chat History Operations ====================

    pub fn load_history(&self, session_id: &str) -> StoreResult<Vec<ChatTurn>> {
        let conn = self.lock()?;
        let raw: Option<String> = conn
            .query_row(
                "SELECT history FROM chat_history WHERE session_id = ?1",
                params![session_id],
                |row| row.get(0),
            )
            .optional()?;
        match raw {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => Ok(Vec::new()),
        }
    }

    pub fn append_turn(&self, session_id: &str, turn: ChatTurn) -> StoreResult<()> {
        let mut history = self.load_history(session_id)?;
        history.push(turn);
        trim_history(&mut history, CHAT_HISTORY_LIMIT);
        let json = serde_json::to_string(&history)?;

        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO chat_history (session_id, history) VALUES (?1, ?2)
             ON CONFLICT(session_id) DO UPDATE SET history = excluded.history",
            params![session_id, json],
        )?;
        Ok(())
    }
}

/// Escape LIKE metacharacters so user text matches literally
fn escape_like(fragment: &str) -> String {
    let mut escaped = String::with_capacity(fragment.len());
    for c in fragment.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

// ============================================================================
// Store trait adapters
// ============================================================================

#[async_trait]
impl SessionStore for Database {
    async fn get_session(&self, phone: &str) -> StoreResult<Option<Session>> {
        Database::get_session(self, phone)
    }

    async fn upsert_session(&self, session: &Session) -> StoreResult<()> {
        Database::upsert_session(self, session)
    }

    async fn delete_session(&self, phone: &str) -> StoreResult<()> {
        Database::delete_session(self, phone)
    }
}

#[async_trait]
impl CatalogStore for Database {
    async fn find_variants(&self, fragment: &str) -> StoreResult<Vec<MedicineVariant>> {
        Database::find_variants(self, fragment)
    }

    async fn find_nearby(&self, query: &LookupQuery) -> StoreResult<Vec<PharmacyStockRecord>> {
        Database::find_nearby(self, query)
    }
}

#[async_trait]
impl ChatHistoryStore for Database {
    async fn load_history(&self, session_id: &str) -> StoreResult<Vec<ChatTurn>> {
        Database::load_history(self, session_id)
    }

    async fn append_turn(&self, session_id: &str, turn: ChatTurn) -> StoreResult<()> {
        Database::append_turn(self, session_id, turn)
    }
}
