//! Human-readable explanations attached to match results.

use std::collections::BTreeMap;

use entities::{ComponentScore, ConfidenceLevel};

/// Everything the explanation builder derives from a finished evaluation.
pub struct Explanation {
    pub match_reasons: Vec<String>,
    pub recommendations: Vec<String>,
    pub action_items: Vec<String>,
}

/// Top components surfaced as match reasons.
const REASON_COUNT: usize = 3;

/// Build the explanation for a scored (non-filtered) result. Reasons are the
/// top components by weighted contribution, ties broken by component name
/// ascending so repeated runs explain identically.
pub fn build(
    component_scores: &BTreeMap<String, ComponentScore>,
    confidence: ConfidenceLevel,
) -> Explanation {
    let mut ranked: Vec<(&String, &ComponentScore)> = component_scores.iter().collect();
    ranked.sort_by(|(name_a, a), (name_b, b)| {
        b.contribution()
            .partial_cmp(&a.contribution())
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| name_a.cmp(name_b))
    });

    let match_reasons = ranked
        .iter()
        .take(REASON_COUNT)
        .filter(|(_, c)| c.score > 0.0)
        .map(|(name, c)| reason_phrase(name, c.score))
        .collect();

    Explanation {
        match_reasons,
        recommendations: recommendations(component_scores, confidence),
        action_items: action_items(confidence),
    }
}

fn reason_phrase(component: &str, score: f64) -> String {
    let strength = if score >= 0.95 {
        "Exact"
    } else if score >= 0.7 {
        "Strong"
    } else if score >= 0.4 {
        "Moderate"
    } else {
        "Weak"
    };
    match component {
        "semantic_similarity" => format!("{strength} capability alignment with the solicitation"),
        "keyword_matching" => format!("{strength} keyword overlap with the solicitation"),
        "naics_alignment" => format!("{strength} NAICS alignment"),
        "past_performance" => format!("{strength} past performance record"),
        "certification_bonus" => "Set-aside certification advantage".to_string(),
        "geographic_match" => format!("{strength} geographic fit"),
        "capacity_fit" => format!("{strength} capacity fit"),
        "recency_factor" => format!("{strength} recent delivery history"),
        other => format!("{strength} {other} signal"),
    }
}

fn recommendations(
    component_scores: &BTreeMap<String, ComponentScore>,
    confidence: ConfidenceLevel,
) -> Vec<String> {
    let mut recs = Vec::new();

    if component_scores
        .get("semantic_similarity")
        .is_some_and(|c| c.status == "missing_embedding")
    {
        recs.push("Generate embeddings for the profile to enable semantic matching".to_string());
    }
    if component_scores
        .get("certification_bonus")
        .is_some_and(|c| c.score == 0.0)
    {
        recs.push("Add certifications to the company profile".to_string());
    }
    if component_scores
        .get("past_performance")
        .is_some_and(|c| c.score == 0.0)
    {
        recs.push("Record past performance history on the profile".to_string());
    }
    if confidence == ConfidenceLevel::Low && recs.is_empty() {
        recs.push("Broaden profile NAICS codes or capability statement".to_string());
    }
    recs
}

fn action_items(confidence: ConfidenceLevel) -> Vec<String> {
    match confidence {
        ConfidenceLevel::High => vec![
            "Review the full solicitation".to_string(),
            "Confirm registration and eligibility".to_string(),
            "Start a proposal outline".to_string(),
        ],
        ConfidenceLevel::Medium => vec![
            "Review the full solicitation".to_string(),
            "Assess teaming or subcontracting options".to_string(),
        ],
        ConfidenceLevel::Low => vec!["Monitor for better-fit opportunities".to_string()],
    }
}
