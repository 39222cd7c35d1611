//! Fixed-dimension embedding vectors.
//!
//! The engine never generates embeddings; it holds read-only vectors fetched
//! from the vector store (or, as a fallback, the embedding service). Vectors
//! are expected unit-normalized, so cosine similarity reduces to a dot
//! product.

use serde::{Deserialize, Serialize};

use crate::error::EntityError;

/// An embedding vector of fixed dimension.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Embedding(pub Vec<f32>);

impl Embedding {
    pub fn dimension(&self) -> usize {
        self.0.len()
    }

    /// Check the vector against an expected dimension.
    pub fn check_dimension(&self, expected: usize) -> Result<(), EntityError> {
        if self.0.len() == expected {
            Ok(())
        } else {
            Err(EntityError::DimensionMismatch {
                expected,
                actual: self.0.len(),
            })
        }
    }

    pub fn l2_norm(&self) -> f32 {
        self.0.iter().map(|v| v * v).sum::<f32>().sqrt()
    }

    /// True when `‖v‖₂ = 1 ± eps`.
    pub fn is_unit_norm(&self, eps: f32) -> bool {
        (self.l2_norm() - 1.0).abs() <= eps
    }

    /// Rescale to unit norm in place. Zero vectors are left unchanged.
    pub fn normalize(&mut self) {
        let norm = self.l2_norm();
        if norm > f32::EPSILON {
            for v in &mut self.0 {
                *v /= norm;
            }
        }
    }

    /// Cosine similarity clamped to `[0, 1]`. Mismatched dimensions score 0;
    /// negative similarity is treated as no similarity for scoring purposes.
    pub fn cosine(&self, other: &Embedding) -> f32 {
        if self.0.len() != other.0.len() || self.0.is_empty() {
            return 0.0;
        }
        let dot: f32 = self.0.iter().zip(other.0.iter()).map(|(a, b)| a * b).sum();
        let denom = self.l2_norm() * other.l2_norm();
        if denom <= f32::EPSILON {
            return 0.0;
        }
        (dot / denom).clamp(0.0, 1.0)
    }
}

impl From<Vec<f32>> for Embedding {
    fn from(v: Vec<f32>) -> Self {
        Embedding(v)
    }
}
