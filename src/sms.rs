//! SMS pharmacy-stock conversation
//!
//! A user texts "<medicine> <pincode>". When the medicine comes in several
//! strengths the reply is a numbered menu and a short-lived session is
//! stored for the phone number; the next numeric reply picks a strength.
//! Implements the Elm Architecture pattern with pure state transitions.

pub mod clock;
mod effect;
pub mod event;
mod executor;
pub mod format;
pub mod parse;
pub mod reply;
pub mod state;
pub(crate) mod transition;

#[cfg(test)]
mod proptests;

pub use clock::{Clock, SystemClock};
pub use effect::{Effect, Phase};
pub use event::Event;
pub use executor::{ConversationError, SmsConversation};
pub use reply::Reply;
pub use transition::transition;
