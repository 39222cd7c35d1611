//! Property-based checks of the universal matching invariants.

use proptest::prelude::*;

use chrono::NaiveDate;
use entities::{CompanyProfile, JobCounters, Location, Opportunity};
use govmatch::{ComponentWeights, ConfidenceLevel, QuickFilter};

fn component_names() -> Vec<String> {
    vec![
        "capacity_fit".into(),
        "certification_bonus".into(),
        "geographic_match".into(),
        "keyword_matching".into(),
        "naics_alignment".into(),
        "past_performance".into(),
        "recency_factor".into(),
        "semantic_similarity".into(),
    ]
}

fn arb_opportunity() -> impl Strategy<Value = Opportunity> {
    (
        "[a-z0-9]{4,16}",
        "[A-Za-z ]{0,40}",
        "[A-Za-z ]{0,80}",
        prop_oneof![Just(String::new()), "[0-9]{6}"],
    )
        .prop_map(|(id, title, description, naics)| Opportunity {
            notice_id: id,
            title,
            description,
            naics_code: naics,
            set_aside: String::new(),
            posted_date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            archive_date: NaiveDate::from_ymd_opt(2025, 12, 1).unwrap(),
            place_of_performance: None,
            contract_value: None,
            office: String::new(),
            department: String::new(),
        })
}

fn arb_company() -> impl Strategy<Value = CompanyProfile> {
    (
        "[a-z0-9]{4,16}",
        "[A-Za-z ]{0,60}",
        prop::collection::vec("[0-9]{6}", 0..4),
        prop::collection::vec("[A-Z]{2}", 0..3),
    )
        .prop_map(|(id, capability, naics, states)| CompanyProfile {
            company_id: id,
            tenant_id: "t-prop".into(),
            company_name: "Prop Co".into(),
            capability_statement: capability,
            naics_codes: naics,
            certifications: vec![],
            employee_count: None,
            revenue_range: None,
            locations: states
                .into_iter()
                .map(|state| Location {
                    state,
                    city: String::new(),
                })
                .collect(),
            past_performance: vec![],
            active: true,
        })
}

proptest! {
    /// Normalization always yields a unit-sum, non-negative vector.
    #[test]
    fn weights_normalize_to_unit_sum(raw in prop::collection::vec(-2.0f64..5.0, 8)) {
        let weights = ComponentWeights::from_pairs(
            component_names().into_iter().zip(raw),
        );
        let normalized = weights.normalized();
        prop_assert!((normalized.sum() - 1.0).abs() < 1e-6);
        for (_, w) in normalized.iter() {
            prop_assert!(*w >= 0.0);
        }
    }

    /// The weighted total of in-range scores stays in range.
    #[test]
    fn weighted_totals_stay_in_unit_interval(
        raw_weights in prop::collection::vec(0.0f64..5.0, 8),
        scores in prop::collection::vec(0.0f64..=1.0, 8),
    ) {
        let weights = ComponentWeights::from_pairs(
            component_names().into_iter().zip(raw_weights),
        ).normalized();
        let total: f64 = component_names()
            .iter()
            .zip(&scores)
            .map(|(name, score)| weights.get(name) * score)
            .sum();
        prop_assert!((0.0..=1.0 + 1e-9).contains(&total));
    }

    /// Confidence is a pure function of the score with fixed tier boundaries.
    #[test]
    fn confidence_is_pure_and_tiered(score in 0.0f64..=1.0) {
        let a = ConfidenceLevel::from_score(score);
        let b = ConfidenceLevel::from_score(score);
        prop_assert_eq!(a, b);
        let expected = if score >= 0.75 {
            ConfidenceLevel::High
        } else if score >= 0.50 {
            ConfidenceLevel::Medium
        } else {
            ConfidenceLevel::Low
        };
        prop_assert_eq!(a, expected);
    }

    /// Any content change to either entity or the weights changes the
    /// fingerprint.
    #[test]
    fn fingerprints_track_content(
        opp in arb_opportunity(),
        company in arb_company(),
        suffix in "[a-z]{1,8}",
    ) {
        let weights = ComponentWeights::from_pairs(
            component_names().into_iter().map(|n| (n, 0.125)),
        );
        let base = govmatch::fingerprint(&opp, &company, &weights).unwrap();
        prop_assert_eq!(base.len(), 32);

        let mut edited = opp.clone();
        edited.description = format!("{} {}", edited.description, suffix);
        let changed = govmatch::fingerprint(&edited, &company, &weights).unwrap();
        prop_assert_ne!(&base, &changed);

        let reweighted = ComponentWeights::from_pairs(
            component_names().into_iter().enumerate().map(|(i, n)| (n, 0.1 + i as f64 * 0.01)),
        );
        let with_new_weights =
            govmatch::fingerprint(&opp, &company, &reweighted).unwrap();
        prop_assert_ne!(&base, &with_new_weights);
    }

    /// The quick filter is deterministic and its report is internally
    /// consistent: a pair is a potential match iff every check passed.
    #[test]
    fn quick_filter_report_is_consistent(
        opp in arb_opportunity(),
        company in arb_company(),
    ) {
        let filter = QuickFilter::default();
        let today = NaiveDate::from_ymd_opt(2025, 7, 1).unwrap();
        let first = filter.evaluate(&opp, &company, today);
        let second = filter.evaluate(&opp, &company, today);
        prop_assert_eq!(&first, &second);

        let all_passed = first.checks.values().all(|c| c.passed);
        prop_assert_eq!(first.is_potential_match, all_passed);
        prop_assert!((0.0..=1.0).contains(&first.filter_score));
        for check in first.checks.values() {
            prop_assert!((0.0..=1.0).contains(&check.score));
        }
    }

    /// Counter arithmetic: as long as items settle at most once, the
    /// submitted = succeeded + failed + skipped + in_flight identity holds.
    #[test]
    fn counter_identity_holds(ops in prop::collection::vec(0u8..4, 0..200)) {
        let mut counters = JobCounters {
            total: ops.len() as u64,
            ..Default::default()
        };
        let mut started = 0u64;
        for op in ops {
            match op {
                0 => {
                    counters.submitted += 1;
                    started += 1;
                    counters.in_flight += 1;
                }
                1 if counters.in_flight > 0 => {
                    counters.in_flight -= 1;
                    counters.succeeded += 1;
                }
                2 if counters.in_flight > 0 => {
                    counters.in_flight -= 1;
                    counters.failed += 1;
                }
                3 if counters.in_flight > 0 => {
                    counters.in_flight -= 1;
                    counters.skipped += 1;
                }
                _ => {}
            }
            prop_assert!(counters.consistent());
            prop_assert!(counters.settled() + counters.in_flight == started);
        }
    }
}
