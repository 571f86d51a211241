//! HYDRAN telemedicine backend
//!
//! Serves the SMS pharmacy-stock webhook and the RAG symptom checker.

mod api;
mod config;
mod db;
mod llm;
mod sms;
mod store;
mod symptom;
mod tools;

#[cfg(test)]
mod testing;

use api::{create_router, AppState};
use config::{AppConfig, StoreBackend};
use db::Database;
use llm::{GeminiEmbedder, GeminiService, LlmService, LoggingService};
use sms::{SmsConversation, SystemClock};
use std::net::SocketAddr;
use std::sync::Arc;
use store::supabase::SupabaseStore;
use store::Store;
use symptom::{KnowledgeBase, SymptomAgent, SymptomChecker};
use tools::{GoogleSearch, KnowledgeSearchTool, ToolRegistry, WebSearchTool};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const CHAT_TEMPERATURE: f32 = 0.2;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // A missing .env file is fine
    dotenv::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hydran=info,tower_http=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    let config = AppConfig::from_env();
    let store = open_store(&config.store)?;
    let agent = build_agent(&config).await;

    let state = AppState::new(
        SmsConversation::new(store.clone(), Arc::new(SystemClock)),
        SymptomChecker::new(agent, Arc::new(store)),
    );

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("HYDRAN server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn open_store(backend: &StoreBackend) -> Result<Arc<dyn Store>, Box<dyn std::error::Error>> {
    match backend {
        StoreBackend::Supabase { url, key } => {
            tracing::info!(url = %url, "Using Supabase store");
            Ok(Arc::new(SupabaseStore::new(url, key.clone())))
        }
        StoreBackend::Sqlite { path } => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            tracing::info!(path = %path.display(), "Opening local database");
            Ok(Arc::new(Database::open(path)?))
        }
    }
}

/// Assemble the symptom agent from whatever is configured
///
/// Every failure here degrades the symptom checker instead of aborting
/// startup; the SMS webhook does not depend on it.
async fn build_agent(config: &AppConfig) -> Option<SymptomAgent> {
    let Some(api_key) = config.google_api_key.clone() else {
        tracing::warn!("GOOGLE_API_KEY not set. Symptom checker disabled.");
        return None;
    };

    let mut tools = ToolRegistry::new();

    let embedder = Arc::new(GeminiEmbedder::new(api_key.clone(), &config.embedding_model));
    match KnowledgeBase::open_or_build(&config.knowledge_dir, &config.index_path, embedder).await {
        Ok(Some(knowledge)) => {
            tools.register(Arc::new(KnowledgeSearchTool::new(Arc::new(knowledge))));
        }
        Ok(None) => {}
        Err(e) => tracing::error!(error = %e, "Failed to prepare knowledge base"),
    }

    match &config.search_engine_id {
        Some(engine_id) => {
            let search = GoogleSearch::new(api_key.clone(), engine_id.clone());
            tools.register(Arc::new(WebSearchTool::new(search)));
        }
        None => tracing::warn!("GOOGLE_CSE_ID not set. Web search disabled."),
    }

    let chat = GeminiService::new(api_key, &config.chat_model).with_temperature(CHAT_TEMPERATURE);
    let llm: Arc<dyn LlmService> = Arc::new(LoggingService::new(Arc::new(chat)));

    let Some(agent) = SymptomAgent::new(llm.clone(), tools) else {
        tracing::error!("No tools available. Symptom checker disabled.");
        return None;
    };
    tracing::info!(tools = ?agent.tool_names(), model = %config.chat_model, "Symptom agent ready");

    llm::health_check(llm.as_ref()).await;
    Some(agent)
}
