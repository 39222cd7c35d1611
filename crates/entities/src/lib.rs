//! Core data model types for the GovMatch pipeline.
//!
//! Every downstream crate (filter, scoring, engine, batch, server) consumes
//! these types. Entities here are plain serde records plus the normalization
//! helpers the matching layers rely on: set-aside classification, NAICS
//! validation, employee-bucket parsing, and the confidence tiering applied to
//! final scores.
//!
//! Ownership is deliberately flat: a [`MatchResult`] references an opportunity
//! and a company by id only, so no entity graph cycles exist.

pub mod embedding;
pub mod error;
pub mod filters;
pub mod job;
pub mod matching;
pub mod opportunity;
pub mod profile;
pub mod schedule;
pub mod timefmt;

pub use embedding::Embedding;
pub use error::EntityError;
pub use filters::OpportunityFilters;
pub use job::{BatchJob, BatchJobConfig, JobCounters, JobOwner, JobState, OptimizerSnapshot};
pub use matching::{ComponentScore, ConfidenceLevel, MatchOutcomeStatus, MatchResult};
pub use opportunity::{Opportunity, PlaceOfPerformance, SetAsideClass};
pub use profile::{
    normalize_certification, CompanyProfile, EmployeeBucket, Location, PastPerformanceRecord,
};
pub use schedule::{ScheduleEntry, ScheduleSpec};

/// Default embedding dimensionality expected from the embedding service.
pub const DEFAULT_EMBEDDING_DIMENSION: usize = 1024;

/// Validate a NAICS code: exactly six ASCII digits.
pub fn validate_naics(code: &str) -> Result<(), EntityError> {
    if code.len() == 6 && code.bytes().all(|b| b.is_ascii_digit()) {
        Ok(())
    } else {
        Err(EntityError::InvalidNaics(code.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn naics_validation_accepts_six_digits() {
        assert!(validate_naics("541511").is_ok());
    }

    #[test]
    fn naics_validation_rejects_short_and_alpha() {
        assert!(validate_naics("5415").is_err());
        assert!(validate_naics("54151a").is_err());
        assert!(validate_naics("5415113").is_err());
    }
}
