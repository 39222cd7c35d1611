//! Candidate-set filters applied when scanning the opportunity catalog.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::opportunity::Opportunity;

/// Declarative filters for a catalog scan. All clauses are conjunctive; an
/// empty filter matches every active opportunity.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct OpportunityFilters {
    /// Keep opportunities whose NAICS code starts with any of these prefixes.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub naics_prefix: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub posted_after: Option<NaiveDate>,
    /// Keep opportunities whose raw set-aside string contains any entry
    /// (case-insensitive).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub set_aside_in: Vec<String>,
    /// Keep opportunities whose place-of-performance state is listed.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub states: Vec<String>,
    /// Archived opportunities are excluded unless this is set.
    #[serde(default)]
    pub include_archived: bool,
}

impl OpportunityFilters {
    pub fn matches(&self, opp: &Opportunity, today: NaiveDate) -> bool {
        if !self.include_archived && opp.is_archived(today) {
            return false;
        }
        if !self.naics_prefix.is_empty()
            && !self
                .naics_prefix
                .iter()
                .any(|p| opp.naics_code.starts_with(p.as_str()))
        {
            return false;
        }
        if let Some(after) = self.posted_after {
            if opp.posted_date < after {
                return false;
            }
        }
        if !self.set_aside_in.is_empty() {
            let set_aside = opp.set_aside.to_uppercase();
            if !self
                .set_aside_in
                .iter()
                .any(|s| set_aside.contains(&s.to_uppercase()))
            {
                return false;
            }
        }
        if !self.states.is_empty() {
            match opp.performance_state() {
                Some(state) => {
                    let state = state.to_uppercase();
                    if !self.states.iter().any(|s| s.to_uppercase() == state) {
                        return false;
                    }
                }
                None => return false,
            }
        }
        true
    }
}
