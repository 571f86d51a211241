//! Pure state transition function
//!
//! Given the request context and an event, decides which store operations to
//! run and what to reply. All I/O happens in the executor.

use super::parse::{is_selection, parse_sms};
use super::reply::Reply;
use super::state::{LookupQuery, OptionsMap, SearchContext, Session, Strength};
use super::{Effect, Event};
use chrono::{DateTime, Duration, FixedOffset};

/// Lifetime of a strength disambiguation session
pub const SESSION_TTL_MINUTES: i64 = 5;

/// Per-request context
#[derive(Debug, Clone)]
pub struct SmsContext {
    pub phone: String,
    /// Request time in the fixed UTC+05:30 offset
    pub now: DateTime<FixedOffset>,
}

impl SmsContext {
    pub fn new(phone: impl Into<String>, now: DateTime<FixedOffset>) -> Self {
        Self {
            phone: phone.into(),
            now,
        }
    }
}

/// Where the caller stands, as far as the stored session tells
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    NoSession,
    AwaitingSelection(Session),
    Expired,
}

impl SessionState {
    pub fn classify(session: Option<Session>, now: DateTime<FixedOffset>) -> Self {
        match session {
            None => SessionState::NoSession,
            Some(s) if s.is_expired(now) => SessionState::Expired,
            Some(s) => SessionState::AwaitingSelection(s),
        }
    }
}

/// Pure transition function
///
/// The returned effects are executed in order. A session delete that
/// accompanies a reply comes after it, so a failed delete cannot cost the
/// user an answer that was already decided.
pub fn transition(ctx: &SmsContext, event: Event) -> Vec<Effect> {
    match event {
        Event::Inbound { text } => {
            if is_selection(&text) {
                return vec![Effect::LoadSession { selection: text }];
            }
            match parse_sms(&text) {
                Some((medicine, pincode)) if !medicine.is_empty() => vec![Effect::FindVariants {
                    search: SearchContext { medicine, pincode },
                }],
                _ => vec![Effect::Reply(Reply::CouldNotUnderstand)],
            }
        }

        Event::SessionLoaded { selection, session } => {
            match SessionState::classify(session, ctx.now) {
                SessionState::NoSession => vec![Effect::Reply(Reply::SelectionFailed)],
                SessionState::Expired => vec![
                    Effect::Reply(Reply::SessionExpired),
                    Effect::DeleteSession,
                ],
                SessionState::AwaitingSelection(session) => {
                    match session.options_map.get(&selection) {
                        None => vec![Effect::Reply(Reply::InvalidSelection)],
                        Some(strength) => vec![Effect::FindNearby {
                            query: LookupQuery {
                                medicine: session.context.medicine.clone(),
                                strength: Strength::Exact(strength.to_string()),
                                pincode: session.context.pincode.clone(),
                            },
                            selected: true,
                        }],
                    }
                }
            }
        }

        Event::VariantsFound { search, variants } => {
            let Some(first) = variants.first() else {
                return vec![Effect::Reply(Reply::NoMedicine {
                    medicine: search.medicine,
                })];
            };
            let brand_name = first.brand_name.clone();

            let options = OptionsMap::from_strengths(
                variants
                    .iter()
                    .filter_map(|v| v.strength.as_deref())
                    .filter(|s| !s.is_empty()),
            );

            if options.len() > 1 {
                let session = Session {
                    user_phone: ctx.phone.clone(),
                    context: search,
                    options_map: options.clone(),
                    expires_at: ctx.now + Duration::minutes(SESSION_TTL_MINUTES),
                };
                vec![
                    Effect::SaveSession(session),
                    Effect::Reply(Reply::StrengthMenu {
                        brand_name,
                        options,
                    }),
                ]
            } else {
                let strength = options
                    .get("1")
                    .map_or(Strength::Any, |s| Strength::Exact(s.to_string()));
                vec![Effect::FindNearby {
                    query: LookupQuery {
                        medicine: search.medicine,
                        strength,
                        pincode: search.pincode,
                    },
                    selected: false,
                }]
            }
        }

        Event::PharmaciesFound {
            query,
            selected,
            records,
        } => {
            let reply = if records.is_empty() {
                Reply::NoPharmacies {
                    medicine: query.medicine,
                    strength: selected.then(|| query.strength.as_filter().to_string()),
                    pincode: query.pincode,
                }
            } else {
                Reply::Pharmacies(records)
            };
            if selected {
                vec![Effect::Reply(reply), Effect::DeleteSession]
            } else {
                vec![Effect::Reply(reply)]
            }
        }
    }
}
