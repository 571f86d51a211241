//! Events that drive the SMS conversation

use super::state::{LookupQuery, SearchContext, Session};
use crate::store::{MedicineVariant, PharmacyStockRecord};

/// Events that trigger state transitions
#[derive(Debug, Clone)]
pub enum Event {
    /// A message arrived from the user (already trimmed)
    Inbound { text: String },

    /// The stored session for a numeric reply was read
    SessionLoaded {
        selection: String,
        session: Option<Session>,
    },

    /// Medicine variants matching a search were read
    VariantsFound {
        search: SearchContext,
        variants: Vec<MedicineVariant>,
    },

    /// The nearby-pharmacy search returned
    PharmaciesFound {
        query: LookupQuery,
        /// Whether the query came from a menu selection
        selected: bool,
        records: Vec<PharmacyStockRecord>,
    },
}
