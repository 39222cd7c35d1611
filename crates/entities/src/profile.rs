//! Company profiles and their normalization helpers.

use serde::{Deserialize, Serialize};

use crate::error::EntityError;
use crate::validate_naics;

/// Maximum number of NAICS codes a profile may carry.
pub const MAX_NAICS_CODES: usize = 10;

/// A company location.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Location {
    /// Two-letter state code, uppercased.
    pub state: String,
    #[serde(default)]
    pub city: String,
}

/// One delivered contract in the company's history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PastPerformanceRecord {
    /// Awarding agency (e.g. `"DOD"`, `"GSA"`, `"Department of Veterans Affairs"`).
    pub agency: String,
    #[serde(default)]
    pub description: String,
    /// Year the work was performed.
    pub year: i32,
}

/// Bucketed employee count as collected by the profile intake form.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum EmployeeBucket {
    #[serde(rename = "1-10")]
    UpTo10,
    #[serde(rename = "11-50")]
    UpTo50,
    #[serde(rename = "51-100")]
    UpTo100,
    #[serde(rename = "101-500")]
    UpTo500,
    #[serde(rename = "500+")]
    Over500,
}

impl EmployeeBucket {
    pub fn parse(raw: &str) -> Result<Self, EntityError> {
        match raw.trim() {
            "1-10" => Ok(EmployeeBucket::UpTo10),
            "11-50" => Ok(EmployeeBucket::UpTo50),
            "51-100" => Ok(EmployeeBucket::UpTo100),
            "101-500" => Ok(EmployeeBucket::UpTo500),
            "500+" | ">500" => Ok(EmployeeBucket::Over500),
            other => Err(EntityError::InvalidEmployeeBucket(other.to_string())),
        }
    }

    /// Upper bound of the bucket; `None` for the open-ended top bucket.
    pub fn max_employees(&self) -> Option<u32> {
        match self {
            EmployeeBucket::UpTo10 => Some(10),
            EmployeeBucket::UpTo50 => Some(50),
            EmployeeBucket::UpTo100 => Some(100),
            EmployeeBucket::UpTo500 => Some(500),
            EmployeeBucket::Over500 => None,
        }
    }

    pub fn min_employees(&self) -> u32 {
        match self {
            EmployeeBucket::UpTo10 => 1,
            EmployeeBucket::UpTo50 => 11,
            EmployeeBucket::UpTo100 => 51,
            EmployeeBucket::UpTo500 => 101,
            EmployeeBucket::Over500 => 501,
        }
    }
}

/// Normalize a free-form certification label to its canonical token.
///
/// Profile intake accepts whatever the company typed; matching decisions
/// compare canonical tokens only. Unknown labels are uppercased and kept so
/// a new certification class degrades to exact-string matching rather than
/// disappearing.
pub fn normalize_certification(raw: &str) -> String {
    let upper = raw.trim().to_uppercase();
    if upper.contains("SDVOSB")
        || upper.contains("SERVICE-DISABLED")
        || upper.contains("DISABLED VETERAN")
    {
        "SDVOSB".to_string()
    } else if upper.contains("EDWOSB") {
        "EDWOSB".to_string()
    } else if upper.contains("WOSB") || upper.contains("WOMEN-OWNED") || upper.contains("WOMAN-OWNED")
    {
        "WOSB".to_string()
    } else if upper.contains("VOSB") || upper.contains("VETERAN-OWNED") {
        "VOSB".to_string()
    } else if upper.contains("8(A)") || upper == "8A" {
        "8(A)".to_string()
    } else if upper.contains("HUBZONE") {
        "HUBZONE".to_string()
    } else if upper.contains("SMALL BUSINESS") || upper.contains("SBA") {
        "SMALL BUSINESS".to_string()
    } else {
        upper
    }
}

/// A company profile, owned by a tenant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompanyProfile {
    /// Unique per tenant.
    pub company_id: String,
    pub tenant_id: String,
    pub company_name: String,
    /// Long-form capability statement used for text and semantic matching.
    #[serde(default)]
    pub capability_statement: String,
    /// Up to [`MAX_NAICS_CODES`] six-digit codes; the first is primary.
    #[serde(default)]
    pub naics_codes: Vec<String>,
    /// Raw certification labels as entered; compare via
    /// [`CompanyProfile::normalized_certifications`].
    #[serde(default)]
    pub certifications: Vec<String>,
    #[serde(default)]
    pub employee_count: Option<EmployeeBucket>,
    #[serde(default)]
    pub revenue_range: Option<String>,
    #[serde(default)]
    pub locations: Vec<Location>,
    #[serde(default)]
    pub past_performance: Vec<PastPerformanceRecord>,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl CompanyProfile {
    pub fn validate(&self) -> Result<(), EntityError> {
        if self.company_id.trim().is_empty() {
            return Err(EntityError::MissingId("company_id"));
        }
        if self.tenant_id.trim().is_empty() {
            return Err(EntityError::MissingId("tenant_id"));
        }
        if self.naics_codes.len() > MAX_NAICS_CODES {
            return Err(EntityError::TooManyNaics(self.naics_codes.len()));
        }
        for code in &self.naics_codes {
            validate_naics(code)?;
        }
        Ok(())
    }

    /// Primary NAICS code: the first listed, by convention.
    pub fn primary_naics(&self) -> Option<&str> {
        self.naics_codes.first().map(String::as_str)
    }

    /// Canonical certification tokens, deduplicated, sorted for determinism.
    pub fn normalized_certifications(&self) -> Vec<String> {
        let mut tokens: Vec<String> = self
            .certifications
            .iter()
            .map(|c| normalize_certification(c))
            .collect();
        tokens.sort();
        tokens.dedup();
        tokens
    }

    /// True when the profile carries any of the given canonical tokens.
    pub fn holds_any_certification(&self, tokens: &[&str]) -> bool {
        let held = self.normalized_certifications();
        tokens.iter().any(|t| held.iter().any(|h| h == t))
    }

    /// States the company operates in, uppercased.
    pub fn location_states(&self) -> Vec<String> {
        self.locations
            .iter()
            .map(|l| l.state.to_uppercase())
            .filter(|s| !s.is_empty())
            .collect()
    }
}
