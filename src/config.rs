//! Runtime configuration from the environment

use std::path::PathBuf;

const DEFAULT_PORT: u16 = 8000;
const DEFAULT_CHAT_MODEL: &str = "gemini-1.5-flash";
const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-004";
const DEFAULT_KNOWLEDGE_DIR: &str = "rag/data";
const DEFAULT_INDEX_PATH: &str = "rag/index.json";

/// Where sessions, catalog and chat history live
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    Supabase { url: String, key: String },
    Sqlite { path: PathBuf },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub port: u16,
    pub store: StoreBackend,
    pub google_api_key: Option<String>,
    pub search_engine_id: Option<String>,
    pub chat_model: String,
    pub embedding_model: String,
    pub knowledge_dir: PathBuf,
    pub index_path: PathBuf,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; empty values count as unset
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port = get("HYDRAN_PORT")
            .and_then(|p| p.parse().ok())
            .unwrap_or(DEFAULT_PORT);

        let store = match (get("SUPABASE_URL"), get("SUPABASE_KEY")) {
            (Some(url), Some(key)) => StoreBackend::Supabase { url, key },
            _ => {
                let path = get("HYDRAN_DB_PATH").unwrap_or_else(|| {
                    let home = get("HOME").unwrap_or_else(|| "/tmp".to_string());
                    format!("{home}/.hydran/hydran.db")
                });
                StoreBackend::Sqlite {
                    path: PathBuf::from(path),
                }
            }
        };

        Self {
            port,
            store,
            google_api_key: get("GOOGLE_API_KEY"),
            search_engine_id: get("GOOGLE_CSE_ID"),
            chat_model: get("HYDRAN_CHAT_MODEL").unwrap_or_else(|| DEFAULT_CHAT_MODEL.to_string()),
            embedding_model: get("HYDRAN_EMBEDDING_MODEL")
                .unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string()),
            knowledge_dir: PathBuf::from(
                get("HYDRAN_KNOWLEDGE_DIR").unwrap_or_else(|| DEFAULT_KNOWLEDGE_DIR.to_string()),
            ),
            index_path: PathBuf::from(
                get("HYDRAN_INDEX_PATH").unwrap_or_else(|| DEFAULT_INDEX_PATH.to_string()),
            ),
        }
    }
}
