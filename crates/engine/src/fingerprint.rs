//! Content fingerprints over match inputs.
//!
//! A fingerprint covers the ids *and* content digests of both entities plus
//! the weight vector, so a cached result is only ever served for byte-for-byte
//! identical inputs. Content digests hash a canonical JSON encoding with
//! recursively sorted object keys; serde field order is an implementation
//! detail and must not leak into cache identity.

use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

use entities::{CompanyProfile, Opportunity};
use scoring::ComponentWeights;

use crate::types::EngineError;

/// Hex length of the full fingerprint.
pub const FINGERPRINT_LEN: usize = 32;
/// Hex length of a per-entity content digest.
const SHORT_HASH_LEN: usize = 8;

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String((*key).clone()).to_string());
                out.push(':');
                write_canonical(&map[*key], out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        other => out.push_str(&other.to_string()),
    }
}

/// Canonical (sorted-key) JSON encoding of any serializable value.
pub fn canonical_json<T: Serialize>(value: &T) -> Result<String, EngineError> {
    let value = serde_json::to_value(value)
        .map_err(|e| EngineError::InvalidInput(format!("unencodable input: {e}")))?;
    let mut out = String::new();
    write_canonical(&value, &mut out);
    Ok(out)
}

/// First eight hex characters of the SHA-256 of the canonical encoding.
pub fn short_hash<T: Serialize>(value: &T) -> Result<String, EngineError> {
    let canonical = canonical_json(value)?;
    let digest = Sha256::digest(canonical.as_bytes());
    Ok(hex::encode(digest)[..SHORT_HASH_LEN].to_string())
}

/// The 32-character lowercase hex fingerprint for one evaluation.
pub fn fingerprint(
    opportunity: &Opportunity,
    company: &CompanyProfile,
    weights: &ComponentWeights,
) -> Result<String, EngineError> {
    let material = format!(
        "{}|{}|{}|{}|{}",
        opportunity.notice_id,
        company.company_id,
        short_hash(opportunity)?,
        short_hash(company)?,
        short_hash(weights)?,
    );
    let digest = Sha256::digest(material.as_bytes());
    Ok(hex::encode(digest)[..FINGERPRINT_LEN].to_string())
}
