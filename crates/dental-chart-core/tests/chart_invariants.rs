//! Property tests for tooth identity and procedure status invariants.

use dental_chart_core::registry::normalize_tooth_identity;
use dental_chart_core::store::resolve_tooth;
use dental_chart_core::{ChartError, DentitionType, ErrorKind, ProcedureStatus, ToothRegistry};
use proptest::prelude::*;

fn identity_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        (0u32..40).prop_map(|n| n.to_string()),
        proptest::string::string_regex("[A-Za-z]").unwrap_or_else(|e| panic!("regex failed: {e}")),
        proptest::string::string_regex(" ?[0-9A-Za-z]{1,3} ?")
            .unwrap_or_else(|e| panic!("regex failed: {e}")),
    ]
}

fn dentition_strategy() -> impl Strategy<Value = Option<DentitionType>> {
    prop_oneof![
        Just(None),
        Just(Some(DentitionType::Permanent)),
        Just(Some(DentitionType::Primary)),
    ]
}

fn status_strategy() -> impl Strategy<Value = ProcedureStatus> {
    prop_oneof![
        Just(ProcedureStatus::Planned),
        Just(ProcedureStatus::InProgress),
        Just(ProcedureStatus::Completed),
        Just(ProcedureStatus::Cancelled),
    ]
}

fn is_primary_letter(identity: &str) -> bool {
    identity.len() == 1 && identity.chars().all(|c| ('A'..='T').contains(&c))
}

fn is_permanent_number(identity: &str) -> bool {
    identity.parse::<u32>().map_or(false, |n| (1..=32).contains(&n)) && !identity.starts_with('0')
}

/// Position along the lifecycle; never decreases.
fn rank(status: ProcedureStatus) -> u8 {
    match status {
        ProcedureStatus::Planned => 0,
        ProcedureStatus::InProgress => 1,
        ProcedureStatus::Completed | ProcedureStatus::Cancelled => 2,
    }
}

#[test]
fn test_registry_dentition_matches_identity() {
    for dentition in [DentitionType::Permanent, DentitionType::Primary] {
        for tooth in ToothRegistry::teeth_for(dentition) {
            assert_eq!(DentitionType::implied_by(&tooth.number), Some(tooth.dentition_type));
            assert_eq!(tooth.dentition_type == DentitionType::Primary, is_primary_letter(&tooth.number));
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 256, .. ProptestConfig::default() })]

    #[test]
    fn resolved_dentition_follows_identity(raw in identity_strategy(), supplied in dentition_strategy()) {
        let normalized = normalize_tooth_identity(&raw);
        match resolve_tooth(&raw, supplied) {
            Ok(tooth) => {
                prop_assert_eq!(&tooth.number, &normalized);
                prop_assert_eq!(tooth.dentition_type == DentitionType::Primary, is_primary_letter(&normalized));
                prop_assert!(is_primary_letter(&normalized) || is_permanent_number(&normalized));
                if let Some(supplied) = supplied {
                    prop_assert_eq!(supplied, tooth.dentition_type);
                }
            }
            Err(ChartError::DentitionMismatch { implied, supplied: given, .. }) => {
                prop_assert_ne!(implied, given);
            }
            Err(e) => {
                prop_assert_eq!(e.kind(), ErrorKind::NotFound);
                prop_assert!(!ToothRegistry::exists(&normalized));
            }
        }
    }

    #[test]
    fn status_never_leaves_terminal(requests in proptest::collection::vec(status_strategy(), 1..12)) {
        let mut current = ProcedureStatus::Planned;
        for next in requests {
            let was_terminal = current.is_terminal();
            match current.transition(next) {
                Ok(status) => {
                    prop_assert!(!was_terminal);
                    prop_assert!(rank(status) >= rank(current));
                    current = status;
                }
                Err(err) => {
                    prop_assert_eq!(err.from, current.as_str());
                    prop_assert!(was_terminal || rank(next) < rank(current));
                }
            }
        }
    }
}
