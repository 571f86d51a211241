//! SMS conversation executor
//!
//! Feeds events through the pure transition function and runs the resulting
//! effects against the store. Store failures are mapped to an apology here,
//! so callers always get a reply. Once a reply is decided, a failure in the
//! cleanup that follows it is logged and the reply still goes out.

use super::clock::Clock;
use super::effect::Phase;
use super::reply::Reply;
use super::transition::{transition, SmsContext};
use super::{Effect, Event};
use crate::store::{CatalogStore, SessionStore, StoreError};
use std::collections::VecDeque;
use std::sync::Arc;
use thiserror::Error;

/// Errors that end a conversation step early
#[derive(Debug, Error)]
pub enum ConversationError {
    #[error("store failure during {phase}: {source}")]
    Backend {
        phase: Phase,
        #[source]
        source: StoreError,
    },
    #[error("{phase} finished without a reply")]
    NoReply { phase: Phase },
}

impl ConversationError {
    pub fn phase(&self) -> Phase {
        match self {
            ConversationError::Backend { phase, .. } | ConversationError::NoReply { phase } => {
                *phase
            }
        }
    }

    /// The apology shown to the user for this failure
    pub fn reply(&self) -> Reply {
        match self.phase() {
            Phase::Selection => Reply::SelectionFailed,
            Phase::Search => Reply::SearchFailed,
        }
    }
}

/// Outcome of running a single effect
enum Step {
    Continue,
    Feed(Event),
    Done(Reply),
}

/// Handles inbound SMS messages against a store
pub struct SmsConversation<S> {
    store: S,
    clock: Arc<dyn Clock>,
}

impl<S> SmsConversation<S>
where
    S: SessionStore + CatalogStore,
{
    pub fn new(store: S, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    #[allow(dead_code)] // Useful for tests
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Process one inbound message and produce the reply to send back
    pub async fn handle(&self, phone: &str, body: &str) -> Reply {
        match self.run(phone, body.trim()).await {
            Ok(reply) => {
                tracing::info!(phone = %phone, outcome = reply.label(), "SMS handled");
                reply
            }
            Err(e) => {
                tracing::error!(phone = %phone, phase = %e.phase(), error = %e, "SMS handling failed");
                e.reply()
            }
        }
    }

    async fn run(&self, phone: &str, text: &str) -> Result<Reply, ConversationError> {
        let ctx = SmsContext::new(phone, self.clock.now());
        let mut phase = Phase::Search;
        let mut events = VecDeque::from([Event::Inbound {
            text: text.to_string(),
        }]);

        while let Some(event) = events.pop_front() {
            let mut decided: Option<Reply> = None;
            for effect in transition(&ctx, event) {
                if let Some(p) = effect.phase() {
                    phase = p;
                }
                match self.execute_effect(&ctx, effect).await {
                    Ok(Step::Continue) => {}
                    Ok(Step::Feed(next)) => events.push_back(next),
                    Ok(Step::Done(reply)) => decided = Some(reply),
                    Err(source) => match &decided {
                        Some(reply) => tracing::warn!(
                            phone = %ctx.phone,
                            outcome = reply.label(),
                            error = %source,
                            "Session cleanup failed after reply"
                        ),
                        None => return Err(ConversationError::Backend { phase, source }),
                    },
                }
            }
            if let Some(reply) = decided {
                return Ok(reply);
            }
        }

        Err(ConversationError::NoReply { phase })
    }

    async fn execute_effect(&self, ctx: &SmsContext, effect: Effect) -> Result<Step, StoreError> {
        match effect {
            Effect::LoadSession { selection } => {
                let session = self.store.get_session(&ctx.phone).await?;
                Ok(Step::Feed(Event::SessionLoaded { selection, session }))
            }
            Effect::FindVariants { search } => {
                let variants = self.store.find_variants(&search.medicine).await?;
                tracing::debug!(
                    medicine = %search.medicine,
                    variants = variants.len(),
                    "Medicine variants found"
                );
                Ok(Step::Feed(Event::VariantsFound { search, variants }))
            }
            Effect::FindNearby { query, selected } => {
                let records = self.store.find_nearby(&query).await?;
                tracing::debug!(
                    medicine = %query.medicine,
                    strength = %query.strength.as_filter(),
                    pincode = %query.pincode,
                    results = records.len(),
                    "Nearby pharmacy search finished"
                );
                Ok(Step::Feed(Event::PharmaciesFound {
                    query,
                    selected,
                    records,
                }))
            }
            Effect::SaveSession(session) => {
                self.store.upsert_session(&session).await?;
                tracing::debug!(phone = %ctx.phone, expires_at = %session.expires_at, "Session saved");
                Ok(Step::Continue)
            }
            Effect::DeleteSession => {
                self.store.delete_session(&ctx.phone).await?;
                Ok(Step::Continue)
            }
            Effect::Reply(reply) => Ok(Step::Done(reply)),
        }
    }
}
