//! API request and response types

use serde::{Deserialize, Serialize};

/// Inbound SMS webhook payload
#[derive(Debug, Clone, Deserialize)]
pub struct SmsReply {
    #[serde(rename = "From")]
    pub from: String,
    #[serde(rename = "Body", default)]
    pub body: String,
}

/// Symptom checker request
#[derive(Debug, Deserialize)]
pub struct UserQuery {
    pub session_id: String,
    pub query: String,
}

/// Symptom checker response
#[derive(Debug, Serialize, Deserialize)]
pub struct QueryResponse {
    pub response: String,
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
}
