//! Pharmacy result rendering

use crate::store::PharmacyStockRecord;
use std::fmt::Write;

/// Render pharmacy records as a numbered list, in the order given
///
/// Callers handle the empty case themselves with a "no results" reply.
pub fn format_pharmacy_results(records: &[PharmacyStockRecord]) -> String {
    let mut reply = String::from("Available at:\n");
    for (i, pharmacy) in records.iter().enumerate() {
        let _ = write!(
            reply,
            "\n{}. {}\n   Addr: {}\n   Med: {} {}\n   Stock: {}\n   Ph: {}\n",
            i + 1,
            pharmacy.pharmacy_name,
            pharmacy.pharmacy_address,
            pharmacy.med_brand_name,
            pharmacy.med_strength,
            pharmacy.stock,
            pharmacy.pharmacy_phone,
        );
    }
    reply.trim().to_string()
}
