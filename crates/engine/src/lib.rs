//! Match orchestration for GovMatch.
//!
//! The [`MatchEngine`] ties the pipeline together: content fingerprinting and
//! result caching ([`fingerprint`], [`cache`]), the pre-scoring quick filter,
//! bounded concurrent execution of the scoring components, weighted
//! aggregation, and explanation building. Construction takes the adapter
//! handles; the engine itself holds no backend-specific code.

pub mod cache;
pub mod engine;
pub mod explain;
pub mod fingerprint;
pub mod types;

pub use cache::ResultCache;
pub use engine::MatchEngine;
pub use fingerprint::{canonical_json, fingerprint, short_hash, FINGERPRINT_LEN};
pub use types::{EngineConfig, EngineError, MatchRequest};
