//! Effects produced by state transitions

use super::reply::Reply;
use super::state::{LookupQuery, SearchContext, Session};
use std::fmt;

/// Which half of the protocol a request is in; picks the failure apology
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Numeric reply to a strength menu
    Selection,
    /// Free-text medicine search
    Search,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Selection => f.write_str("selection"),
            Phase::Search => f.write_str("search"),
        }
    }
}

/// Effects to be executed after a state transition, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Read the caller's session; answers with `Event::SessionLoaded`
    LoadSession { selection: String },

    /// Look up medicine variants; answers with `Event::VariantsFound`
    FindVariants { search: SearchContext },

    /// Run the nearby-pharmacy search; answers with `Event::PharmaciesFound`
    FindNearby { query: LookupQuery, selected: bool },

    /// Upsert the caller's session
    SaveSession(Session),

    /// Remove the caller's session
    DeleteSession,

    /// Send this reply and finish
    Reply(Reply),
}

impl Effect {
    /// Phase implied by the first store read of a request
    pub fn phase(&self) -> Option<Phase> {
        match self {
            Effect::LoadSession { .. } => Some(Phase::Selection),
            Effect::FindVariants { .. } => Some(Phase::Search),
            _ => None,
        }
    }
}
