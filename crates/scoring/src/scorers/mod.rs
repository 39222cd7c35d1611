//! The standard scoring components.

mod capacity;
mod certification;
mod geography;
mod keyword;
mod naics;
mod past_performance;
mod recency;
mod semantic;

pub use capacity::CapacityFit;
pub use certification::CertificationBonus;
pub use geography::GeographicMatch;
pub use keyword::KeywordMatching;
pub use naics::NaicsAlignment;
pub use past_performance::PastPerformance;
pub use recency::RecencyFactor;
pub use semantic::SemanticSimilarity;
