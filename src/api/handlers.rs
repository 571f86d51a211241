//! HTTP request handlers

use super::twiml::MessagingResponse;
use super::types::{QueryResponse, SmsReply, StatusResponse, UserQuery};
use super::AppState;
use crate::symptom::PROCESSING_FAILED;
use axum::{
    async_trait,
    extract::{FromRequest, Request, State},
    http::header,
    routing::{get, post},
    Form, Json, Router,
};

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health))
        // Messaging gateway webhook
        .route("/sms", post(receive_sms))
        // Symptom checker
        .route("/symptom_checker", post(symptom_checker))
        .route("/symptom_checker/", post(symptom_checker))
        .with_state(state)
}

async fn health() -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "API is running".to_string(),
    })
}

// ============================================================
// SMS Webhook
// ============================================================

/// Webhook payload, form-encoded or JSON
///
/// A body that cannot be read is answered with an empty reply document so
/// the gateway never sees an error status.
struct SmsWebhook(SmsReply);

#[async_trait]
impl<S> FromRequest<S> for SmsWebhook
where
    S: Send + Sync,
{
    type Rejection = MessagingResponse;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_json = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("application/json"));

        let parsed = if is_json {
            Json::<SmsReply>::from_request(req, state)
                .await
                .map(|Json(payload)| payload)
                .map_err(|e| e.body_text())
        } else {
            Form::<SmsReply>::from_request(req, state)
                .await
                .map(|Form(payload)| payload)
                .map_err(|e| e.body_text())
        };

        parsed.map(SmsWebhook).map_err(|error| {
            tracing::warn!(error = %error, "Unreadable SMS webhook body");
            MessagingResponse::empty()
        })
    }
}

async fn receive_sms(
    State(state): State<AppState>,
    SmsWebhook(payload): SmsWebhook,
) -> MessagingResponse {
    let reply = state.sms.handle(&payload.from, &payload.body).await;
    MessagingResponse::message(reply.to_string())
}

// ============================================================
// Symptom Checker
// ============================================================

/// Symptom checker request body
///
/// A body that is not a valid query still gets a 200 with the generic
/// processing error as its `response`.
struct SymptomQuery(UserQuery);

#[async_trait]
impl<S> FromRequest<S> for SymptomQuery
where
    S: Send + Sync,
{
    type Rejection = Json<QueryResponse>;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<UserQuery>::from_request(req, state).await {
            Ok(Json(query)) => Ok(SymptomQuery(query)),
            Err(e) => {
                tracing::warn!(error = %e.body_text(), "Unreadable symptom checker body");
                Err(Json(QueryResponse {
                    response: PROCESSING_FAILED.to_string(),
                }))
            }
        }
    }
}

async fn symptom_checker(
    State(state): State<AppState>,
    SymptomQuery(request): SymptomQuery,
) -> Json<QueryResponse> {
    let response = state
        .symptom
        .respond(&request.session_id, &request.query)
        .await;
    Json(QueryResponse { response })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::sms::clock::ManualClock;
    use crate::sms::state::parse_expiry;
    use crate::sms::SmsConversation;
    use crate::store::Store;
    use crate::symptom::{SymptomAgent, SymptomChecker, AGENT_UNAVAILABLE};
    use crate::testing::{EchoTool, MockLlmClient};
    use crate::tools::ToolRegistry;
    use axum::body::Body;
    use axum::http::{Request as HttpRequest, StatusCode};
    use http_body_util::BodyExt;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn state_with(db: &Database, agent: Option<SymptomAgent>) -> AppState {
        let store: Arc<dyn Store> = Arc::new(db.clone());
        let clock = Arc::new(ManualClock::new(
            parse_expiry("2025-03-01T12:00:00+05:30").unwrap(),
        ));
        AppState::new(
            SmsConversation::new(store.clone(), clock),
            SymptomChecker::new(agent, Arc::new(store)),
        )
    }

    fn seeded_db() -> Database {
        let db = Database::open_in_memory().unwrap();
        let med = db
            .insert_medicine("Crocin", Some("Paracetamol"), Some("500mg"))
            .unwrap();
        let pharmacy = db
            .insert_pharmacy("Apollo Pharmacy", "MG Road, Pune", "411001", "020-1111")
            .unwrap();
        db.set_stock(pharmacy, med, 12).unwrap();
        db
    }

    async fn send(app: Router, request: HttpRequest<Body>) -> (StatusCode, Option<String>, String) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .map(|v| v.to_str().unwrap().to_string());
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, content_type, String::from_utf8(bytes.to_vec()).unwrap())
    }

    fn post(uri: &str, content_type: &str, body: &str) -> HttpRequest<Body> {
        HttpRequest::post(uri)
            .header(header::CONTENT_TYPE, content_type)
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let app = create_router(state_with(&seeded_db(), None));
        let (status, _, body) = send(app, HttpRequest::get("/").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, r#"{"status":"API is running"}"#);
    }

    #[tokio::test]
    async fn test_sms_form_webhook() {
        let app = create_router(state_with(&seeded_db(), None));
        let (status, content_type, body) = send(
            app,
            post(
                "/sms",
                "application/x-www-form-urlencoded",
                "From=%2B919800000001&Body=Crocin+411001",
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(content_type.as_deref(), Some("application/xml"));
        assert!(body.contains("<Message>Available at:"), "{body}");
        assert!(body.contains("1. Apollo Pharmacy"));
    }

    #[tokio::test]
    async fn test_sms_json_webhook() {
        let app = create_router(state_with(&seeded_db(), None));
        let (status, _, body) = send(
            app,
            post(
                "/sms",
                "application/json",
                r#"{"From":"+919800000001","Body":"hello"}"#,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("Sorry, I couldn&apos;t understand."), "{body}");
    }

    #[tokio::test]
    async fn test_sms_malformed_body_gets_empty_reply() {
        let app = create_router(state_with(&seeded_db(), None));
        let (status, _, body) = send(app, post("/sms", "application/json", "{not json")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.ends_with("<Response />"));
    }

    #[tokio::test]
    async fn test_symptom_checker_routes() {
        let db = seeded_db();
        let app = create_router(state_with(&db, None));
        let (status, _, body) = send(
            app.clone(),
            post(
                "/symptom_checker",
                "application/json",
                r#"{"session_id":"s1","query":"fever"}"#,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let parsed: QueryResponse = serde_json::from_str(&body).unwrap();
        assert_eq!(parsed.response, AGENT_UNAVAILABLE);

        let (status, _, _) = send(
            app,
            post(
                "/symptom_checker/",
                "application/json",
                r#"{"session_id":"s1","query":"fever"}"#,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_symptom_checker_answers() {
        let db = seeded_db();
        let mock = Arc::new(MockLlmClient::new("mock"));
        mock.queue_text("Drink fluids. Source: conditions.csv");
        let mut tools = ToolRegistry::new();
        tools.register(Arc::new(EchoTool::new("local_knowledge_base")));
        let agent = SymptomAgent::new(mock, tools);

        let app = create_router(state_with(&db, agent));
        let (_, _, body) = send(
            app,
            post(
                "/symptom_checker",
                "application/json",
                r#"{"session_id":"s9","query":"I feel dehydrated"}"#,
            ),
        )
        .await;
        let parsed: QueryResponse = serde_json::from_str(&body).unwrap();
        assert_eq!(parsed.response, "Drink fluids. Source: conditions.csv");
        assert_eq!(db.load_history("s9").unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_symptom_checker_malformed_body() {
        let app = create_router(state_with(&seeded_db(), None));
        for (content_type, body) in [
            ("application/json", "{not json"),
            ("application/json", r#"{"query":"fever"}"#),
            ("text/plain", r#"{"session_id":"s1","query":"fever"}"#),
        ] {
            let (status, content_type_out, response) =
                send(app.clone(), post("/symptom_checker", content_type, body)).await;
            assert_eq!(status, StatusCode::OK, "{body}");
            assert_eq!(content_type_out.as_deref(), Some("application/json"));
            let parsed: QueryResponse = serde_json::from_str(&response).unwrap();
            assert_eq!(parsed.response, PROCESSING_FAILED);
        }
    }
}
