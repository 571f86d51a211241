//! Inbound SMS parsing

use regex::Regex;
use std::sync::OnceLock;

fn pincode_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\b\d{6}\b").expect("pincode pattern is valid"))
}

/// Split a search message into `(medicine_name, pincode)`
///
/// The pincode is the first standalone 6-digit token; the medicine name is
/// everything before it, trimmed. Returns `None` when no pincode is present.
/// The medicine name may be empty when the message starts with the pincode.
pub fn parse_sms(body: &str) -> Option<(String, String)> {
    let found = pincode_pattern().find(body)?;
    let medicine = body.get(..found.start()).unwrap_or_default().trim();
    Some((medicine.to_string(), found.as_str().to_string()))
}

/// Whether a message is a menu selection (non-empty, digits only)
pub fn is_selection(body: &str) -> bool {
    !body.is_empty() && body.chars().all(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_medicine_and_pincode() {
        assert_eq!(
            parse_sms("Paracetamol 411001"),
            Some(("Paracetamol".to_string(), "411001".to_string()))
        );
    }

    #[test]
    fn test_parse_without_pincode() {
        assert_eq!(parse_sms("just text"), None);
        assert_eq!(parse_sms(""), None);
    }

    #[test]
    fn test_parse_pincode_first_gives_empty_name() {
        assert_eq!(
            parse_sms("411001"),
            Some((String::new(), "411001".to_string()))
        );
        assert_eq!(
            parse_sms("411001 Paracetamol"),
            Some((String::new(), "411001".to_string()))
        );
    }

    #[test]
    fn test_parse_rejects_longer_digit_runs() {
        assert_eq!(parse_sms("Crocin 4110011"), None);
        assert_eq!(parse_sms("Crocin 41100"), None);
        assert_eq!(
            parse_sms("Crocin 4110011 or 560001"),
            Some(("Crocin 4110011 or".to_string(), "560001".to_string()))
        );
    }

    #[test]
    fn test_parse_keeps_inner_spacing_and_trims_edges() {
        assert_eq!(
            parse_sms("  Dolo 650  tablets   110011 please"),
            Some(("Dolo 650  tablets".to_string(), "110011".to_string()))
        );
    }

    #[test]
    fn test_parse_word_boundary_on_punctuation() {
        assert_eq!(
            parse_sms("Azithral,400001."),
            Some(("Azithral,".to_string(), "400001".to_string()))
        );
    }

    #[test]
    fn test_is_selection() {
        assert!(is_selection("1"));
        assert!(is_selection("042"));
        assert!(!is_selection(""));
        assert!(!is_selection("1a"));
        assert!(!is_selection("-1"));
        assert!(!is_selection("1 2"));
        // Only ASCII digits count as a menu choice
        assert!(!is_selection("४"));
        assert!(!is_selection("１"));
    }

    proptest! {
        #[test]
        fn prop_letters_only_never_parse(body in "[a-zA-Z ,.]{0,40}") {
            prop_assert_eq!(parse_sms(&body), None);
        }

        #[test]
        fn prop_name_then_pincode_roundtrips(
            name in "[A-Za-z][A-Za-z ]{0,20}[A-Za-z]",
            pincode in "[1-9][0-9]{5}",
        ) {
            let body = format!("{name} {pincode}");
            prop_assert_eq!(parse_sms(&body), Some((name, pincode)));
        }

        #[test]
        fn prop_parsed_pincode_is_six_digits(body in "\\PC{0,60}") {
            if let Some((name, pincode)) = parse_sms(&body) {
                prop_assert_eq!(pincode.chars().count(), 6);
                prop_assert_eq!(name.trim(), name.as_str());
            }
        }
    }
}
