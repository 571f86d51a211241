//! User-facing SMS replies

use super::format::format_pharmacy_results;
use super::state::OptionsMap;
use crate::store::PharmacyStockRecord;
use std::fmt;

/// Every text the SMS conversation can send back
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    CouldNotUnderstand,
    NoMedicine {
        medicine: String,
    },
    StrengthMenu {
        brand_name: String,
        options: OptionsMap,
    },
    NoPharmacies {
        medicine: String,
        strength: Option<String>,
        pincode: String,
    },
    Pharmacies(Vec<PharmacyStockRecord>),
    SessionExpired,
    InvalidSelection,
    /// Selection phase failed or no session was found
    SelectionFailed,
    /// Search phase hit a backend error
    SearchFailed,
}

impl Reply {
    /// Outcome label for structured logs
    pub fn label(&self) -> &'static str {
        match self {
            Reply::CouldNotUnderstand => "parse_failure",
            Reply::NoMedicine { .. } | Reply::NoPharmacies { .. } => "no_match",
            Reply::StrengthMenu { .. } => "strength_menu",
            Reply::Pharmacies(_) => "results",
            Reply::SessionExpired => "session_expired",
            Reply::InvalidSelection => "invalid_selection",
            Reply::SelectionFailed | Reply::SearchFailed => "backend_failure",
        }
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::CouldNotUnderstand => f.write_str(
                "Sorry, I couldn't understand. Please send in the format: 'Medicine Name Pincode', e.g., 'Paracetamol 411001'",
            ),
            Reply::NoMedicine { medicine } => {
                write!(f, "Sorry, no medicine found matching '{medicine}'.")
            }
            Reply::StrengthMenu {
                brand_name,
                options,
            } => {
                write!(f, "Please select a strength for {brand_name}:")?;
                for (num, strength) in options.iter() {
                    write!(f, "\n{num}. {strength}")?;
                }
                Ok(())
            }
            Reply::NoPharmacies {
                medicine,
                strength: Some(strength),
                pincode,
            } => write!(
                f,
                "No pharmacies found with '{medicine} {strength}' near {pincode}."
            ),
            Reply::NoPharmacies {
                medicine,
                strength: None,
                pincode,
            } => write!(f, "No pharmacies found with '{medicine}' near {pincode}."),
            Reply::Pharmacies(records) => f.write_str(&format_pharmacy_results(records)),
            Reply::SessionExpired => {
                f.write_str("Your session has expired. Please start a new search.")
            }
            Reply::InvalidSelection => f.write_str(
                "Invalid selection. Please reply with one of the numbers from the list.",
            ),
            Reply::SelectionFailed => f.write_str(
                "Sorry, something went wrong or your session expired. Please start a new search.",
            ),
            Reply::SearchFailed => {
                f.write_str("Sorry, an error occurred on our end. Please try again later.")
            }
        }
    }
}
