//! Pre-scoring quick filter.
//!
//! The filter rejects obvious non-matches before any scoring work is spent on
//! them. It runs five checks (industry, set-aside, geography, active,
//! value/capacity sanity), and a pair is a potential match only when every
//! check passes. The checks are deliberately asymmetric: a set-aside mismatch
//! is legally disqualifying and an archived notice cannot be bid, so those two
//! hard-fail; missing industry or geography data soft-passes so that thin
//! catalog rows are never silently dropped.
//!
//! Everything here is synchronous, allocation-light, and pure: the same
//! inputs always produce the same report.

pub mod config;

pub use config::{CapacityThresholds, QuickFilterConfig};

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use entities::{CompanyProfile, Opportunity};

/// Outcome of a single check.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CheckResult {
    pub passed: bool,
    /// Informational score in `[0, 1]`; the filter decision is `passed`.
    pub score: f64,
    pub detail: String,
}

impl CheckResult {
    fn pass(score: f64, detail: impl Into<String>) -> Self {
        Self {
            passed: true,
            score,
            detail: detail.into(),
        }
    }

    fn fail(detail: impl Into<String>) -> Self {
        Self {
            passed: false,
            score: 0.0,
            detail: detail.into(),
        }
    }
}

/// Full report for one screened pair.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FilterReport {
    pub is_potential_match: bool,
    /// Mean of the individual check scores; informational only.
    pub filter_score: f64,
    pub pass_reasons: Vec<String>,
    pub fail_reasons: Vec<String>,
    pub checks: BTreeMap<String, CheckResult>,
}

/// The quick filter.
#[derive(Debug, Clone, Default)]
pub struct QuickFilter {
    config: QuickFilterConfig,
}

impl QuickFilter {
    pub fn new(config: QuickFilterConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &QuickFilterConfig {
        &self.config
    }

    /// Screen one pair. `today` anchors the archive check so evaluations are
    /// reproducible in tests.
    pub fn evaluate(
        &self,
        opportunity: &Opportunity,
        company: &CompanyProfile,
        today: NaiveDate,
    ) -> FilterReport {
        let mut checks = BTreeMap::new();
        checks.insert("industry".to_string(), self.check_industry(opportunity, company));
        checks.insert(
            "set_aside".to_string(),
            self.check_set_aside(opportunity, company),
        );
        checks.insert(
            "geography".to_string(),
            self.check_geography(opportunity, company),
        );
        checks.insert("active".to_string(), self.check_active(opportunity, today));
        checks.insert(
            "value_capacity".to_string(),
            self.check_value_capacity(opportunity, company),
        );

        let is_potential_match = checks.values().all(|c| c.passed);
        let filter_score = checks.values().map(|c| c.score).sum::<f64>() / checks.len() as f64;

        let mut pass_reasons = Vec::new();
        let mut fail_reasons = Vec::new();
        for (name, check) in &checks {
            let line = format!("{name}: {}", check.detail);
            if check.passed {
                pass_reasons.push(line);
            } else {
                fail_reasons.push(line);
            }
        }

        FilterReport {
            is_potential_match,
            filter_score,
            pass_reasons,
            fail_reasons,
            checks,
        }
    }

    /// Industry alignment: 2-digit NAICS sector overlap, or capability-token
    /// overlap with the description. Missing data soft-passes.
    fn check_industry(&self, opportunity: &Opportunity, company: &CompanyProfile) -> CheckResult {
        if company.naics_codes.is_empty() || opportunity.naics_code.len() < 2 {
            return CheckResult::pass(
                self.config.missing_data_score,
                "industry data incomplete; not screened",
            );
        }
        let opp_sector = &opportunity.naics_code[..2];
        if company
            .naics_codes
            .iter()
            .any(|code| code.len() >= 2 && &code[..2] == opp_sector)
        {
            return CheckResult::pass(1.0, format!("NAICS sector {opp_sector} overlap"));
        }

        let description = opportunity.description.to_lowercase();
        let matched = self
            .industry_tokens(&company.capability_statement)
            .into_iter()
            .find(|token| description.contains(token.as_str()));
        match matched {
            Some(token) => CheckResult::pass(0.7, format!("capability term \"{token}\" in description")),
            None => CheckResult::fail("no NAICS sector or capability overlap"),
        }
    }

    /// Set-aside eligibility. Open solicitations pass; a restricted set-aside
    /// requires a qualifying certification.
    fn check_set_aside(&self, opportunity: &Opportunity, company: &CompanyProfile) -> CheckResult {
        let Some(class) = opportunity.set_aside_class() else {
            return CheckResult::pass(1.0, "open solicitation");
        };
        if company.certifications.is_empty() {
            return CheckResult::fail(format!(
                "restricted to {} but profile lists no certifications",
                class.token()
            ));
        }
        if company.holds_any_certification(class.qualifying_certifications()) {
            CheckResult::pass(1.0, format!("certified for {} set-aside", class.token()))
        } else {
            CheckResult::fail(format!("not certified for {} set-aside", class.token()))
        }
    }

    /// Geography alignment never rejects on its own: mismatches soft-pass at
    /// the configured reduced score.
    fn check_geography(&self, opportunity: &Opportunity, company: &CompanyProfile) -> CheckResult {
        let states = company.location_states();
        let Some(opp_state) = opportunity.performance_state() else {
            return CheckResult::pass(1.0, "no place-of-performance restriction");
        };
        if states.is_empty() {
            return CheckResult::pass(1.0, "no company locations on file");
        }
        let opp_state = opp_state.to_uppercase();
        if states.iter().any(|s| *s == opp_state) {
            return CheckResult::pass(1.0, format!("location in {opp_state}"));
        }
        let description = opportunity.description.to_lowercase();
        if self
            .config
            .remote_keywords
            .iter()
            .any(|kw| description.contains(kw.as_str()))
        {
            return CheckResult::pass(0.9, "remote/nationwide work indicated");
        }
        CheckResult::pass(
            self.config.geography_soft_score,
            format!("no location in {opp_state}; remote delivery possible"),
        )
    }

    fn check_active(&self, opportunity: &Opportunity, today: NaiveDate) -> CheckResult {
        if opportunity.is_archived(today) {
            CheckResult::fail(format!("archived on {}", opportunity.archive_date))
        } else {
            CheckResult::pass(1.0, "active")
        }
    }

    /// Flag extreme contract-value vs. company-size mismatches.
    fn check_value_capacity(
        &self,
        opportunity: &Opportunity,
        company: &CompanyProfile,
    ) -> CheckResult {
        let thresholds = &self.config.capacity;
        let (Some(value), Some(bucket)) =
            (opportunity.parsed_contract_value(), company.employee_count)
        else {
            return CheckResult::pass(1.0, "value or headcount unknown; not screened");
        };

        let small_company = bucket
            .max_employees()
            .is_some_and(|max| max <= thresholds.small_company_max_employees);
        if value > thresholds.large_contract_floor && small_company {
            let description = opportunity.description.to_lowercase();
            let partnering = self
                .config
                .partnering_keywords
                .iter()
                .any(|kw| description.contains(kw.as_str()));
            return if partnering {
                CheckResult::pass(
                    self.config.small_on_large_score,
                    "large contract but partnering language present",
                )
            } else {
                CheckResult::fail("contract value far exceeds company capacity")
            };
        }

        let large_company = bucket.min_employees() > thresholds.large_company_min_employees;
        if value < thresholds.small_contract_ceiling && large_company {
            return CheckResult::pass(
                self.config.small_on_large_score,
                "small contract for a large company",
            );
        }

        CheckResult::pass(1.0, "value within capacity")
    }

    fn industry_tokens(&self, capability_statement: &str) -> Vec<String> {
        capability_statement
            .to_lowercase()
            .split(|c: char| !c.is_ascii_alphanumeric())
            .filter(|t| t.len() >= self.config.industry_token_min_len)
            .filter(|t| !self.config.industry_stopwords.iter().any(|s| s == t))
            .map(str::to_string)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use entities::{EmployeeBucket, Location, PlaceOfPerformance};

    fn opportunity() -> Opportunity {
        Opportunity {
            notice_id: "n-1".into(),
            title: "IT modernization support".into(),
            description: "Enterprise IT modernization and software consulting".into(),
            naics_code: "541512".into(),
            set_aside: String::new(),
            posted_date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            archive_date: NaiveDate::from_ymd_opt(2025, 12, 1).unwrap(),
            place_of_performance: Some(PlaceOfPerformance {
                state: "VA".into(),
                city: "Arlington".into(),
            }),
            contract_value: None,
            office: String::new(),
            department: String::new(),
        }
    }

    fn company() -> CompanyProfile {
        CompanyProfile {
            company_id: "c-1".into(),
            tenant_id: "t-1".into(),
            company_name: "Acme Digital".into(),
            capability_statement: "Software consulting and cloud migration".into(),
            naics_codes: vec!["541511".into()],
            certifications: vec!["SDVOSB".into(), "Small Business".into()],
            employee_count: Some(EmployeeBucket::UpTo10),
            revenue_range: None,
            locations: vec![Location {
                state: "VA".into(),
                city: "Reston".into(),
            }],
            past_performance: vec![],
            active: true,
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 7, 1).unwrap()
    }

    #[test]
    fn aligned_pair_passes_all_checks() {
        let report = QuickFilter::default().evaluate(&opportunity(), &company(), today());
        assert!(report.is_potential_match, "failed: {:?}", report.fail_reasons);
        assert!(report.filter_score > 0.9);
        assert_eq!(report.checks.len(), 5);
        assert!(report.fail_reasons.is_empty());
    }

    #[test]
    fn restricted_set_aside_without_certification_fails() {
        let mut opp = opportunity();
        opp.set_aside = "8(a) Set-Aside".into();
        let report = QuickFilter::default().evaluate(&opp, &company(), today());
        assert!(!report.is_potential_match);
        assert!(!report.checks["set_aside"].passed);
        assert!(report
            .fail_reasons
            .iter()
            .any(|r| r.contains("not certified")));
    }

    #[test]
    fn set_aside_with_qualifying_certification_passes() {
        let mut opp = opportunity();
        opp.set_aside = "Service-Disabled Veteran-Owned Small Business Set-Aside".into();
        let report = QuickFilter::default().evaluate(&opp, &company(), today());
        assert!(report.checks["set_aside"].passed);
    }

    #[test]
    fn no_certifications_fails_restricted_set_aside() {
        let mut opp = opportunity();
        opp.set_aside = "Total Small Business Set-Aside".into();
        let mut profile = company();
        profile.certifications.clear();
        let report = QuickFilter::default().evaluate(&opp, &profile, today());
        assert!(!report.checks["set_aside"].passed);
    }

    #[test]
    fn archived_opportunity_fails_active_check() {
        let report = QuickFilter::default().evaluate(
            &opportunity(),
            &company(),
            NaiveDate::from_ymd_opt(2025, 12, 1).unwrap(),
        );
        assert!(!report.is_potential_match);
        assert!(!report.checks["active"].passed);
    }

    #[test]
    fn industry_mismatch_fails_when_data_present() {
        let mut opp = opportunity();
        opp.naics_code = "333613".into();
        opp.description = "Proposed procurement for a cylinder assembly".into();
        let report = QuickFilter::default().evaluate(&opp, &company(), today());
        assert!(!report.checks["industry"].passed);
    }

    #[test]
    fn industry_missing_data_soft_passes() {
        let mut opp = opportunity();
        opp.naics_code = String::new();
        let report = QuickFilter::default().evaluate(&opp, &company(), today());
        let check = &report.checks["industry"];
        assert!(check.passed);
        assert!((check.score - 0.5).abs() < 1e-9);
    }

    #[test]
    fn capability_token_rescues_industry_check() {
        let mut opp = opportunity();
        opp.naics_code = "336411".into();
        opp.description = "Support for avionics software consulting".into();
        let report = QuickFilter::default().evaluate(&opp, &company(), today());
        let check = &report.checks["industry"];
        assert!(check.passed);
        assert!((check.score - 0.7).abs() < 1e-9);
    }

    #[test]
    fn geography_mismatch_soft_passes() {
        let mut opp = opportunity();
        opp.place_of_performance = Some(PlaceOfPerformance {
            state: "CA".into(),
            city: "Sacramento".into(),
        });
        let report = QuickFilter::default().evaluate(&opp, &company(), today());
        let check = &report.checks["geography"];
        assert!(check.passed);
        assert!((check.score - 0.4).abs() < 1e-9);
    }

    #[test]
    fn remote_keyword_lifts_geography_score() {
        let mut opp = opportunity();
        opp.place_of_performance = Some(PlaceOfPerformance {
            state: "CA".into(),
            city: String::new(),
        });
        opp.description = "Nationwide IT support, remote work authorized".into();
        let report = QuickFilter::default().evaluate(&opp, &company(), today());
        assert!((report.checks["geography"].score - 0.9).abs() < 1e-9);
    }

    #[test]
    fn large_contract_small_company_fails_without_partnering() {
        let mut opp = opportunity();
        opp.contract_value = Some("$25,000,000".into());
        let report = QuickFilter::default().evaluate(&opp, &company(), today());
        assert!(!report.checks["value_capacity"].passed);

        opp.description = "Large program; teaming arrangements encouraged".into();
        let report = QuickFilter::default().evaluate(&opp, &company(), today());
        let check = &report.checks["value_capacity"];
        assert!(check.passed);
        assert!((check.score - 0.6).abs() < 1e-9);
    }

    #[test]
    fn small_contract_large_company_soft_passes() {
        let mut opp = opportunity();
        opp.contract_value = Some("$50,000".into());
        let mut profile = company();
        profile.employee_count = Some(EmployeeBucket::UpTo500);
        let report = QuickFilter::default().evaluate(&opp, &profile, today());
        let check = &report.checks["value_capacity"];
        assert!(check.passed);
        assert!((check.score - 0.6).abs() < 1e-9);
    }

    #[test]
    fn unparseable_value_is_not_screened() {
        let mut opp = opportunity();
        opp.contract_value = Some("TBD".into());
        let report = QuickFilter::default().evaluate(&opp, &company(), today());
        assert!(report.checks["value_capacity"].passed);
        assert!((report.checks["value_capacity"].score - 1.0).abs() < 1e-9);
    }

    #[test]
    fn evaluation_is_deterministic() {
        let filter = QuickFilter::default();
        let a = filter.evaluate(&opportunity(), &company(), today());
        let b = filter.evaluate(&opportunity(), &company(), today());
        assert_eq!(a, b);
    }
}
