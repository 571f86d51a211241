//! HTTP API: SMS webhook and symptom checker

mod handlers;
mod twiml;
mod types;

pub use handlers::create_router;
pub use twiml::MessagingResponse;
#[allow(unused_imports)] // Public API re-exports
pub use types::*;

use crate::sms::SmsConversation;
use crate::store::Store;
use crate::symptom::SymptomChecker;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub sms: Arc<SmsConversation<Arc<dyn Store>>>,
    pub symptom: Arc<SymptomChecker>,
}

impl AppState {
    pub fn new(sms: SmsConversation<Arc<dyn Store>>, symptom: SymptomChecker) -> Self {
        Self {
            sms: Arc::new(sms),
            symptom: Arc::new(symptom),
        }
    }
}
