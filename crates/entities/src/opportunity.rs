//! Contracting opportunities as produced by the catalog crawler.
//!
//! Opportunities are immutable within a crawl cycle. The matching layers only
//! ever read them, so the helpers here are cheap derived views: set-aside
//! classification, contract-value parsing, and the archive check.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::EntityError;

/// Place of performance for an opportunity.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlaceOfPerformance {
    /// Two-letter state code, uppercased (e.g. `MD`). Empty when unknown.
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub city: String,
}

/// A single contracting opportunity from the daily catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Opportunity {
    /// Unique notice identifier from the source catalog.
    pub notice_id: String,
    pub title: String,
    /// Long-form solicitation text.
    #[serde(default)]
    pub description: String,
    /// Six-digit NAICS code; empty string when the notice omits it.
    #[serde(default)]
    pub naics_code: String,
    /// Free-form set-aside string from the catalog (may be empty for open
    /// solicitations). Use [`Opportunity::set_aside_class`] for decisions.
    #[serde(default)]
    pub set_aside: String,
    pub posted_date: NaiveDate,
    /// Date after which the notice is archived and excluded from matching.
    pub archive_date: NaiveDate,
    #[serde(default)]
    pub place_of_performance: Option<PlaceOfPerformance>,
    /// Estimated contract value as published (e.g. `"$1,250,000"`).
    #[serde(default)]
    pub contract_value: Option<String>,
    #[serde(default)]
    pub office: String,
    #[serde(default)]
    pub department: String,
}

impl Opportunity {
    /// Fail fast on records the matching layers cannot key.
    pub fn validate(&self) -> Result<(), EntityError> {
        if self.notice_id.trim().is_empty() {
            return Err(EntityError::MissingId("notice_id"));
        }
        Ok(())
    }

    /// An opportunity is archived once the archive date has been reached.
    pub fn is_archived(&self, today: NaiveDate) -> bool {
        self.archive_date <= today
    }

    /// Parse the published contract value into a number, stripping currency
    /// formatting. Returns `None` when absent or unparseable.
    pub fn parsed_contract_value(&self) -> Option<f64> {
        let raw = self.contract_value.as_deref()?;
        let cleaned: String = raw
            .chars()
            .filter(|c| c.is_ascii_digit() || *c == '.')
            .collect();
        if cleaned.is_empty() {
            return None;
        }
        cleaned.parse::<f64>().ok()
    }

    /// Classify the free-form set-aside string, if any.
    pub fn set_aside_class(&self) -> Option<SetAsideClass> {
        SetAsideClass::parse(&self.set_aside)
    }

    /// State component of the place of performance, when present.
    pub fn performance_state(&self) -> Option<&str> {
        self.place_of_performance
            .as_ref()
            .map(|p| p.state.as_str())
            .filter(|s| !s.is_empty())
    }
}

/// Certified bidder classes used in set-aside restrictions.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SetAsideClass {
    SmallBusiness,
    Sdvosb,
    Vosb,
    Edwosb,
    Wosb,
    EightA,
    HubZone,
}

impl SetAsideClass {
    /// Parse a catalog set-aside string. The catalog publishes long phrases
    /// like `"Total Small Business Set-Aside (FAR 19.5)"`; classification is
    /// keyed on the distinguishing tokens. Order matters: `SDVOSB` contains
    /// `VOSB`, `EDWOSB` contains `WOSB`.
    pub fn parse(raw: &str) -> Option<Self> {
        let upper = raw.trim().to_uppercase();
        if upper.is_empty() {
            return None;
        }
        if upper.contains("SDVOSB") || upper.contains("SERVICE-DISABLED") {
            Some(SetAsideClass::Sdvosb)
        } else if upper.contains("EDWOSB") || upper.contains("ECONOMICALLY DISADVANTAGED WOMEN") {
            Some(SetAsideClass::Edwosb)
        } else if upper.contains("WOSB") || upper.contains("WOMEN-OWNED") {
            Some(SetAsideClass::Wosb)
        } else if upper.contains("VOSB") || upper.contains("VETERAN-OWNED") {
            Some(SetAsideClass::Vosb)
        } else if upper.contains("8(A)") || upper.contains("8A ") || upper == "8A" {
            Some(SetAsideClass::EightA)
        } else if upper.contains("HUBZONE") {
            Some(SetAsideClass::HubZone)
        } else if upper.contains("SMALL BUSINESS") {
            Some(SetAsideClass::SmallBusiness)
        } else {
            None
        }
    }

    /// Canonical certification token for this class.
    pub fn token(&self) -> &'static str {
        match self {
            SetAsideClass::SmallBusiness => "SMALL BUSINESS",
            SetAsideClass::Sdvosb => "SDVOSB",
            SetAsideClass::Vosb => "VOSB",
            SetAsideClass::Edwosb => "EDWOSB",
            SetAsideClass::Wosb => "WOSB",
            SetAsideClass::EightA => "8(A)",
            SetAsideClass::HubZone => "HUBZONE",
        }
    }

    /// Certification tokens that fully qualify a company for this set-aside.
    ///
    /// Socioeconomic certifications imply small-business status, and SDVOSB
    /// implies VOSB; an EDWOSB certification implies WOSB.
    pub fn qualifying_certifications(&self) -> &'static [&'static str] {
        match self {
            SetAsideClass::SmallBusiness => &[
                "SMALL BUSINESS",
                "SDVOSB",
                "VOSB",
                "WOSB",
                "EDWOSB",
                "8(A)",
                "HUBZONE",
            ],
            SetAsideClass::Sdvosb => &["SDVOSB"],
            SetAsideClass::Vosb => &["VOSB", "SDVOSB"],
            SetAsideClass::Edwosb => &["EDWOSB"],
            SetAsideClass::Wosb => &["WOSB", "EDWOSB"],
            SetAsideClass::EightA => &["8(A)"],
            SetAsideClass::HubZone => &["HUBZONE"],
        }
    }

    /// Certifications that are adjacent (partially qualifying) for advantage
    /// scoring: close enough to signal competitiveness without conferring
    /// eligibility on their own.
    pub fn adjacent_certifications(&self) -> &'static [&'static str] {
        match self {
            SetAsideClass::Sdvosb => &["VOSB"],
            SetAsideClass::Edwosb => &["WOSB"],
            SetAsideClass::EightA => &["SMALL BUSINESS"],
            SetAsideClass::HubZone => &["SMALL BUSINESS"],
            _ => &[],
        }
    }
}
