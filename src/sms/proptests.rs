//! Property-based tests for the SMS conversation
//!
//! These tests verify key invariants hold across all possible inputs.

use super::reply::Reply;
use super::state::{ist, OptionsMap, SearchContext, Session};
use super::transition::{SmsContext, SESSION_TTL_MINUTES};
use super::*;
use crate::store::MedicineVariant;
use chrono::{Duration, TimeZone};
use proptest::prelude::*;

// ============================================================================
// Test Helpers
// ============================================================================

fn test_context() -> SmsContext {
    let now = ist()
        .with_ymd_and_hms(2025, 3, 1, 12, 0, 0)
        .single()
        .unwrap();
    SmsContext::new("+919800000001", now)
}

fn search() -> SearchContext {
    SearchContext {
        medicine: "Paracetamol".to_string(),
        pincode: "411001".to_string(),
    }
}

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_strength() -> impl Strategy<Value = Option<String>> {
    prop_oneof![
        Just(None),
        Just(Some(String::new())),
        "[0-9]{1,4}(mg|ml|mcg)".prop_map(Some),
    ]
}

fn arb_variants() -> impl Strategy<Value = Vec<MedicineVariant>> {
    prop::collection::vec(
        ("[A-Z][a-z]{2,8}", arb_strength()).prop_map(|(brand_name, strength)| MedicineVariant {
            brand_name,
            generic_name: None,
            strength,
        }),
        1..12,
    )
}

fn arb_session(now_offset_secs: i64) -> impl Strategy<Value = Session> {
    (
        prop::collection::vec("[0-9]{2,3}mg", 2..6),
        -600i64..600,
    )
        .prop_map(move |(strengths, delta)| Session {
            user_phone: "+919800000001".to_string(),
            context: search(),
            options_map: OptionsMap::from_strengths(strengths),
            expires_at: test_context().now + Duration::seconds(now_offset_secs + delta),
        })
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    /// Menu keys are 1..=N and values are the sorted, distinct strengths
    #[test]
    fn prop_options_map_sorted_unique(strengths in prop::collection::vec("[0-9a-z]{1,6}", 0..20)) {
        let options = OptionsMap::from_strengths(strengths.clone());
        let mut expected = strengths;
        expected.sort();
        expected.dedup();

        prop_assert_eq!(options.len(), expected.len());
        for (i, (key, value)) in options.iter().enumerate() {
            prop_assert_eq!(key, (i + 1).to_string());
            prop_assert_eq!(value, expected[i].as_str());
        }
    }

    /// A session is only stored when there is something to choose between
    #[test]
    fn prop_session_only_for_multiple_strengths(variants in arb_variants()) {
        let distinct: std::collections::BTreeSet<_> = variants
            .iter()
            .filter_map(|v| v.strength.clone())
            .filter(|s| !s.is_empty())
            .collect();
        let effects = transition(&test_context(), Event::VariantsFound {
            search: search(),
            variants,
        });

        let saved: Vec<_> = effects
            .iter()
            .filter_map(|e| match e {
                Effect::SaveSession(s) => Some(s),
                _ => None,
            })
            .collect();

        if distinct.len() >= 2 {
            prop_assert_eq!(saved.len(), 1);
            prop_assert_eq!(saved[0].options_map.len(), distinct.len());
            prop_assert!(!saved[0].options_map.is_empty());
            prop_assert_eq!(
                saved[0].expires_at,
                test_context().now + Duration::minutes(SESSION_TTL_MINUTES)
            );
            let is_menu = matches!(effects.last(), Some(Effect::Reply(Reply::StrengthMenu { .. })));
            prop_assert!(is_menu);
        } else {
            prop_assert!(saved.is_empty());
            let is_lookup = matches!(effects.as_slice(), [Effect::FindNearby { selected: false, .. }]);
            prop_assert!(is_lookup);
        }
    }

    /// Expired sessions are always deleted, whatever the selection
    #[test]
    fn prop_expired_session_always_deleted(
        session in arb_session(-700),
        selection in "[0-9]{1,3}",
    ) {
        let effects = transition(&test_context(), Event::SessionLoaded {
            selection,
            session: Some(session),
        });
        prop_assert_eq!(effects, vec![Effect::Reply(Reply::SessionExpired), Effect::DeleteSession]);
    }

    /// Live sessions are never touched by an invalid selection
    #[test]
    fn prop_live_session_selection(
        session in arb_session(700),
        selection in "[0-9]{1,2}",
    ) {
        let valid = session.options_map.get(&selection).is_some();
        let effects = transition(&test_context(), Event::SessionLoaded {
            selection,
            session: Some(session),
        });
        prop_assert!(!effects.contains(&Effect::DeleteSession));
        if valid {
            let is_lookup = matches!(effects.as_slice(), [Effect::FindNearby { selected: true, .. }]);
            prop_assert!(is_lookup);
        } else {
            prop_assert_eq!(effects, vec![Effect::Reply(Reply::InvalidSelection)]);
        }
    }

    /// Every transition either asks for exactly one read or ends with a reply
    #[test]
    fn prop_transition_shape(text in "\\PC{0,40}") {
        let effects = transition(&test_context(), Event::Inbound { text });
        prop_assert_eq!(effects.len(), 1);
        let ok = matches!(
            effects[0],
            Effect::LoadSession { .. } | Effect::FindVariants { .. } | Effect::Reply(Reply::CouldNotUnderstand)
        );
        prop_assert!(ok);
    }
}
