//! Place-of-performance proximity.

use std::time::Instant;

use async_trait::async_trait;
use serde_json::json;

use entities::{CompanyProfile, Opportunity};

use crate::context::ScoringContext;
use crate::{ComponentResult, ComponentScorer, ScoreError};

const SAME_STATE: f64 = 1.0;
const ADJACENT_STATE: f64 = 0.7;
/// Different region; remote delivery still possible.
const DISTANT_STATE: f64 = 0.4;

/// Land-border adjacency for US states plus DC. Pairs are listed once per
/// state for lookup convenience.
fn adjacent_states(state: &str) -> &'static [&'static str] {
    match state {
        "AL" => &["FL", "GA", "MS", "TN"],
        "AK" => &[],
        "AZ" => &["CA", "CO", "NM", "NV", "UT"],
        "AR" => &["LA", "MO", "MS", "OK", "TN", "TX"],
        "CA" => &["AZ", "NV", "OR"],
        "CO" => &["AZ", "KS", "NE", "NM", "OK", "UT", "WY"],
        "CT" => &["MA", "NY", "RI"],
        "DC" => &["MD", "VA"],
        "DE" => &["MD", "NJ", "PA"],
        "FL" => &["AL", "GA"],
        "GA" => &["AL", "FL", "NC", "SC", "TN"],
        "HI" => &[],
        "IA" => &["IL", "MN", "MO", "NE", "SD", "WI"],
        "ID" => &["MT", "NV", "OR", "UT", "WA", "WY"],
        "IL" => &["IA", "IN", "KY", "MO", "WI"],
        "IN" => &["IL", "KY", "MI", "OH"],
        "KS" => &["CO", "MO", "NE", "OK"],
        "KY" => &["IL", "IN", "MO", "OH", "TN", "VA", "WV"],
        "LA" => &["AR", "MS", "TX"],
        "MA" => &["CT", "NH", "NY", "RI", "VT"],
        "MD" => &["DC", "DE", "PA", "VA", "WV"],
        "ME" => &["NH"],
        "MI" => &["IN", "OH", "WI"],
        "MN" => &["IA", "ND", "SD", "WI"],
        "MO" => &["AR", "IA", "IL", "KS", "KY", "NE", "OK", "TN"],
        "MS" => &["AL", "AR", "LA", "TN"],
        "MT" => &["ID", "ND", "SD", "WY"],
        "NC" => &["GA", "SC", "TN", "VA"],
        "ND" => &["MN", "MT", "SD"],
        "NE" => &["CO", "IA", "KS", "MO", "SD", "WY"],
        "NH" => &["MA", "ME", "VT"],
        "NJ" => &["DE", "NY", "PA"],
        "NM" => &["AZ", "CO", "OK", "TX", "UT"],
        "NV" => &["AZ", "CA", "ID", "OR", "UT"],
        "NY" => &["CT", "MA", "NJ", "PA", "VT"],
        "OH" => &["IN", "KY", "MI", "PA", "WV"],
        "OK" => &["AR", "CO", "KS", "MO", "NM", "TX"],
        "OR" => &["CA", "ID", "NV", "WA"],
        "PA" => &["DE", "MD", "NJ", "NY", "OH", "WV"],
        "RI" => &["CT", "MA"],
        "SC" => &["GA", "NC"],
        "SD" => &["IA", "MN", "MT", "ND", "NE", "WY"],
        "TN" => &["AL", "AR", "GA", "KY", "MO", "MS", "NC", "VA"],
        "TX" => &["AR", "LA", "NM", "OK"],
        "UT" => &["AZ", "CO", "ID", "NM", "NV", "WY"],
        "VA" => &["DC", "KY", "MD", "NC", "TN", "WV"],
        "VT" => &["MA", "NH", "NY"],
        "WA" => &["ID", "OR"],
        "WI" => &["IA", "IL", "MI", "MN"],
        "WV" => &["KY", "MD", "OH", "PA", "VA"],
        "WY" => &["CO", "ID", "MT", "NE", "SD", "UT"],
        _ => &[],
    }
}

pub struct GeographicMatch;

#[async_trait]
impl ComponentScorer for GeographicMatch {
    fn name(&self) -> &'static str {
        "geographic_match"
    }

    fn default_weight(&self) -> f64 {
        0.05
    }

    async fn score(
        &self,
        _ctx: &ScoringContext,
        opportunity: &Opportunity,
        company: &CompanyProfile,
    ) -> Result<ComponentResult, ScoreError> {
        let started = Instant::now();

        let Some(opp_state) = opportunity.performance_state() else {
            return Ok(ComponentResult::ok(
                1.0,
                json!({ "reason": "no place-of-performance restriction" }),
                started,
            ));
        };
        let opp_state = opp_state.to_uppercase();
        let company_states = company.location_states();

        if company_states.iter().any(|s| *s == opp_state) {
            return Ok(ComponentResult::ok(
                SAME_STATE,
                json!({ "state": opp_state, "relation": "same_state" }),
                started,
            ));
        }

        let neighbors = adjacent_states(&opp_state);
        if company_states.iter().any(|s| neighbors.contains(&s.as_str())) {
            return Ok(ComponentResult::ok(
                ADJACENT_STATE,
                json!({ "state": opp_state, "relation": "adjacent_state" }),
                started,
            ));
        }

        Ok(ComponentResult::ok(
            DISTANT_STATE,
            json!({ "state": opp_state, "relation": "distant" }),
            started,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ScoringConfig;
    use chrono::NaiveDate;
    use entities::{Location, PlaceOfPerformance};
    use std::sync::Arc;
    use store::memory::MemoryVectorStore;

    fn ctx() -> ScoringContext {
        ScoringContext::new(
            Arc::new(MemoryVectorStore::new()),
            None,
            ScoringConfig::default(),
        )
    }

    fn opportunity(state: Option<&str>) -> Opportunity {
        Opportunity {
            notice_id: "n-1".into(),
            title: "Facilities support".into(),
            description: String::new(),
            naics_code: "561210".into(),
            set_aside: String::new(),
            posted_date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            archive_date: NaiveDate::from_ymd_opt(2025, 12, 1).unwrap(),
            place_of_performance: state.map(|s| PlaceOfPerformance {
                state: s.into(),
                city: String::new(),
            }),
            contract_value: None,
            office: String::new(),
            department: String::new(),
        }
    }

    fn company(states: &[&str]) -> CompanyProfile {
        CompanyProfile {
            company_id: "c-1".into(),
            tenant_id: "t-1".into(),
            company_name: "Acme".into(),
            capability_statement: String::new(),
            naics_codes: vec![],
            certifications: vec![],
            employee_count: None,
            revenue_range: None,
            locations: states
                .iter()
                .map(|s| Location {
                    state: s.to_string(),
                    city: String::new(),
                })
                .collect(),
            past_performance: vec![],
            active: true,
        }
    }

    #[test]
    fn adjacency_table_is_symmetric() {
        let states: Vec<&str> = [
            "AL", "AK", "AZ", "AR", "CA", "CO", "CT", "DC", "DE", "FL", "GA", "HI", "IA", "ID",
            "IL", "IN", "KS", "KY", "LA", "MA", "MD", "ME", "MI", "MN", "MO", "MS", "MT", "NC",
            "ND", "NE", "NH", "NJ", "NM", "NV", "NY", "OH", "OK", "OR", "PA", "RI", "SC", "SD",
            "TN", "TX", "UT", "VA", "VT", "WA", "WI", "WV", "WY",
        ]
        .to_vec();
        for state in &states {
            for neighbor in adjacent_states(state) {
                assert!(
                    adjacent_states(neighbor).contains(state),
                    "{state} -> {neighbor} is not symmetric"
                );
            }
        }
    }

    #[tokio::test]
    async fn no_restriction_scores_one() {
        let result = GeographicMatch
            .score(&ctx(), &opportunity(None), &company(&["MD"]))
            .await
            .unwrap();
        assert_eq!(result.score, 1.0);
    }

    #[tokio::test]
    async fn same_state_scores_one() {
        let result = GeographicMatch
            .score(&ctx(), &opportunity(Some("MD")), &company(&["MD", "TX"]))
            .await
            .unwrap();
        assert_eq!(result.score, 1.0);
        assert_eq!(result.detail["relation"], "same_state");
    }

    #[tokio::test]
    async fn adjacent_state_scores_point_seven() {
        let result = GeographicMatch
            .score(&ctx(), &opportunity(Some("VA")), &company(&["MD"]))
            .await
            .unwrap();
        assert!((result.score - 0.7).abs() < 1e-9);
    }

    #[tokio::test]
    async fn distant_state_scores_point_four() {
        let result = GeographicMatch
            .score(&ctx(), &opportunity(Some("CA")), &company(&["MD"]))
            .await
            .unwrap();
        assert!((result.score - 0.4).abs() < 1e-9);
    }

    #[tokio::test]
    async fn no_company_locations_score_distant() {
        let result = GeographicMatch
            .score(&ctx(), &opportunity(Some("CA")), &company(&[]))
            .await
            .unwrap();
        assert!((result.score - 0.4).abs() < 1e-9);
    }
}
