//! Quick filter configuration.
//!
//! Every threshold the checks consult lives here rather than in code, so
//! operators can tune screening behavior per deployment. Defaults mirror the
//! production policy: $10M/$100k capacity bounds, 20/100 employee pivots.

use serde::{Deserialize, Serialize};

/// Contract-value vs. company-size sanity bounds, shared with the capacity
/// scorer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct CapacityThresholds {
    /// Contracts at or above this value are "large".
    #[serde(default = "default_large_contract_floor")]
    pub large_contract_floor: f64,
    /// Contracts below this value are "small".
    #[serde(default = "default_small_contract_ceiling")]
    pub small_contract_ceiling: f64,
    /// Companies at or below this headcount are "small".
    #[serde(default = "default_small_company_max")]
    pub small_company_max_employees: u32,
    /// Companies above this headcount are "large".
    #[serde(default = "default_large_company_min")]
    pub large_company_min_employees: u32,
}

impl Default for CapacityThresholds {
    fn default() -> Self {
        Self {
            large_contract_floor: default_large_contract_floor(),
            small_contract_ceiling: default_small_contract_ceiling(),
            small_company_max_employees: default_small_company_max(),
            large_company_min_employees: default_large_company_min(),
        }
    }
}

fn default_large_contract_floor() -> f64 {
    10_000_000.0
}

fn default_small_contract_ceiling() -> f64 {
    100_000.0
}

fn default_small_company_max() -> u32 {
    20
}

fn default_large_company_min() -> u32 {
    100
}

/// Tunables for the quick filter checks.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuickFilterConfig {
    #[serde(default)]
    pub capacity: CapacityThresholds,
    /// Description keywords that rescue a large-contract/small-company pair.
    #[serde(default = "default_partnering_keywords")]
    pub partnering_keywords: Vec<String>,
    /// Description keywords that neutralize a geography mismatch.
    #[serde(default = "default_remote_keywords")]
    pub remote_keywords: Vec<String>,
    /// Tokens ignored when matching capability text against descriptions.
    #[serde(default = "default_industry_stopwords")]
    pub industry_stopwords: Vec<String>,
    /// Minimum token length considered meaningful for industry matching.
    #[serde(default = "default_industry_token_min_len")]
    pub industry_token_min_len: usize,
    /// Score assigned when a geography mismatch soft-passes.
    #[serde(default = "default_geography_soft_score")]
    pub geography_soft_score: f64,
    /// Score assigned to a small-contract/large-company pair.
    #[serde(default = "default_small_on_large_score")]
    pub small_on_large_score: f64,
    /// Score assigned when a check cannot evaluate for lack of data.
    #[serde(default = "default_missing_data_score")]
    pub missing_data_score: f64,
}

impl Default for QuickFilterConfig {
    fn default() -> Self {
        Self {
            capacity: CapacityThresholds::default(),
            partnering_keywords: default_partnering_keywords(),
            remote_keywords: default_remote_keywords(),
            industry_stopwords: default_industry_stopwords(),
            industry_token_min_len: default_industry_token_min_len(),
            geography_soft_score: default_geography_soft_score(),
            small_on_large_score: default_small_on_large_score(),
            missing_data_score: default_missing_data_score(),
        }
    }
}

fn default_partnering_keywords() -> Vec<String> {
    ["partner", "partnering", "teaming", "subcontract", "joint venture"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_remote_keywords() -> Vec<String> {
    ["remote", "nationwide"].iter().map(|s| s.to_string()).collect()
}

fn default_industry_stopwords() -> Vec<String> {
    [
        "and", "the", "for", "with", "services", "service", "solutions", "company", "llc", "inc",
        "group", "general", "other", "support", "management",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_industry_token_min_len() -> usize {
    4
}

fn default_geography_soft_score() -> f64 {
    0.4
}

fn default_small_on_large_score() -> f64 {
    0.6
}

fn default_missing_data_score() -> f64 {
    0.5
}
