use chrono::{Duration, NaiveDate};
use proptest::prelude::*;
use serde_json::{json, Value};
use wiq_core::cache::{is_empty_field, CachedItem, WorkItemCache};
use wiq_core::rules::{ladder_points, AC_SUBSTANCE, DESCRIPTION_SUBSTANCE, DIMENSION_RULES};
use wiq_core::score::{is_prelim, score_text};
use wiq_core::types::Grade;
use wiq_core::work_item::FieldSet;

const FIELD_NAMES: &[&str] = &[
    "System.Title",
    "System.Description",
    "Microsoft.VSTS.Common.AcceptanceCriteria",
    "System.State",
    "System.CreatedBy",
];

const WORDS: &[&str] = &[
    "user", "must", "click", "verify", "error", "so", "that", "the", "report", "as", "a",
    "button", "given", "then", "timeout", "export", "data",
];

fn arb_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        Just(json!("")),
        Just(json!("   ")),
        "[a-z <>/]{1,16}".prop_map(Value::String),
        any::<u32>().prop_map(|n| json!(n)),
        Just(json!({"displayName": "Jane Doe"})),
    ]
}

fn arb_fields() -> impl Strategy<Value = FieldSet> {
    prop::collection::btree_map(
        prop::sample::select(FIELD_NAMES).prop_map(str::to_string),
        arb_value(),
        0..FIELD_NAMES.len(),
    )
}

fn arb_text(max_words: usize) -> impl Strategy<Value = String> {
    prop::collection::vec(prop::sample::select(WORDS), 0..max_words).prop_map(|w| w.join(" "))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(512))]

    // Scoring

    #[test]
    fn substance_ladders_are_monotone(a in 0usize..200, b in 0usize..200) {
        let (lo, hi) = (a.min(b), a.max(b));
        prop_assert!(ladder_points(DESCRIPTION_SUBSTANCE, lo) <= ladder_points(DESCRIPTION_SUBSTANCE, hi));
        prop_assert!(ladder_points(AC_SUBSTANCE, lo) <= ladder_points(AC_SUBSTANCE, hi));
        for rule in DIMENSION_RULES {
            prop_assert!(ladder_points(rule.ladder, lo) <= ladder_points(rule.ladder, hi));
        }
    }

    #[test]
    fn grade_is_monotone_in_score(a in 0u32..=100, b in 0u32..=100) {
        let (lo, hi) = (a.min(b), a.max(b));
        prop_assert!(Grade::from_score(lo) <= Grade::from_score(hi));
    }

    #[test]
    fn capping_never_raises_a_grade(
        title in arb_text(8),
        description in arb_text(70),
        ac in arb_text(70),
    ) {
        let b = score_text(&title, &description, &ac);
        prop_assert!(b.grade <= b.uncapped_grade);
        prop_assert!(b.score <= 100);
        prop_assert!(!b.rationale.is_empty());
    }

    #[test]
    fn no_content_scores_zero(title in arb_text(20)) {
        let b = score_text(&title, "", "");
        prop_assert_eq!(b.score, 0);
        prop_assert_eq!(b.grade, Grade::F);
    }

    #[test]
    fn prelim_iff_more_than_threshold(offset in -60i64..60, threshold in 0i64..30) {
        let today = NaiveDate::from_ymd_opt(2026, 1, 15).unwrap();
        let start = today + Duration::days(offset);
        prop_assert_eq!(is_prelim(Some(start), today, threshold), offset > threshold);
    }

    // Cache merge

    #[test]
    fn merge_is_idempotent(a in arb_fields(), b in arb_fields()) {
        let existing = CachedItem::new(1, a);
        prop_assert_eq!(existing.merge(&existing), existing.clone());

        let incoming = CachedItem::new(1, b);
        let once = existing.merge(&incoming);
        prop_assert_eq!(once.merge(&incoming), once);
    }

    #[test]
    fn merge_never_regresses_populated_fields(a in arb_fields(), b in arb_fields()) {
        let existing = CachedItem::new(1, a);
        let merged = existing.merge(&CachedItem::new(1, b.clone()));
        for (name, value) in &existing.fields {
            if !is_empty_field(name, value) {
                prop_assert_eq!(&merged.fields[name], value);
            }
        }
        for name in b.keys() {
            prop_assert!(merged.fields.contains_key(name));
        }
    }

    #[test]
    fn cache_json_roundtrips(items in prop::collection::vec((1u64..500, arb_fields()), 0..12)) {
        let mut cache = WorkItemCache::new();
        let batch = items
            .into_iter()
            .map(|(id, fields)| CachedItem::new(id, fields))
            .collect();
        cache.merge_batch(batch, &["System.Title".to_string()]);
        let json = cache.to_json().unwrap();
        let back = WorkItemCache::from_json(&json).unwrap();
        prop_assert_eq!(back, cache);
    }
}
