//! Tokenization shared by the text-driven scorers.
//!
//! Tokens are lowercased ASCII-alphanumeric runs. Stopwords and bare
//! six-digit numbers (NAICS codes embedded in descriptions) are dropped so
//! classification codes do not masquerade as shared vocabulary.

use std::collections::BTreeMap;

/// Common English and solicitation boilerplate terms excluded from overlap.
pub const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "has", "have", "in", "is",
    "it", "its", "may", "must", "no", "not", "of", "on", "or", "shall", "should", "that", "the",
    "this", "to", "will", "with", "we", "our", "all", "any", "per", "via",
];

fn is_stopword(token: &str) -> bool {
    STOPWORDS.contains(&token)
}

fn is_naics_like(token: &str) -> bool {
    token.len() == 6 && token.bytes().all(|b| b.is_ascii_digit())
}

/// Tokenize into lowercase terms, dropping stopwords, single characters, and
/// NAICS-shaped numbers.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|t| t.len() > 1)
        .filter(|t| !is_stopword(t))
        .filter(|t| !is_naics_like(t))
        .map(str::to_string)
        .collect()
}

/// Term frequencies over the token stream.
pub fn term_frequencies(tokens: &[String]) -> BTreeMap<&str, usize> {
    let mut freqs: BTreeMap<&str, usize> = BTreeMap::new();
    for token in tokens {
        *freqs.entry(token.as_str()).or_insert(0) += 1;
    }
    freqs
}

/// Frequency-weighted overlap of two token streams, normalized by the length
/// of the shorter one. Identical documents score 1.0; disjoint vocabulary
/// scores 0.0.
pub fn overlap_score(a: &[String], b: &[String]) -> (f64, Vec<String>) {
    if a.is_empty() || b.is_empty() {
        return (0.0, Vec::new());
    }
    let freq_a = term_frequencies(a);
    let freq_b = term_frequencies(b);
    let mut shared = Vec::new();
    let mut common = 0usize;
    for (token, count_a) in &freq_a {
        if let Some(count_b) = freq_b.get(token) {
            common += count_a.min(count_b);
            shared.push((*token).to_string());
        }
    }
    let shorter = a.len().min(b.len());
    ((common as f64 / shorter as f64).min(1.0), shared)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenize_lowercases_and_drops_noise() {
        let tokens = tokenize("The Cloud migration for NAICS 541511, per agency policy");
        assert_eq!(tokens, vec!["cloud", "migration", "naics", "agency", "policy"]);
    }

    #[test]
    fn naics_codes_are_stripped_but_other_numbers_kept() {
        let tokens = tokenize("contract 541511 covers 25 sites");
        assert!(!tokens.contains(&"541511".to_string()));
        assert!(tokens.contains(&"25".to_string()));
    }

    #[test]
    fn identical_documents_overlap_fully() {
        let a = tokenize("medical imaging systems integration");
        let (score, shared) = overlap_score(&a, &a);
        assert!((score - 1.0).abs() < 1e-9);
        assert_eq!(shared.len(), 4);
    }

    #[test]
    fn disjoint_documents_do_not_overlap() {
        let a = tokenize("medical imaging");
        let b = tokenize("asphalt paving");
        let (score, shared) = overlap_score(&a, &b);
        assert_eq!(score, 0.0);
        assert!(shared.is_empty());
    }

    #[test]
    fn empty_input_scores_zero() {
        let a = tokenize("");
        let b = tokenize("anything here");
        assert_eq!(overlap_score(&a, &b).0, 0.0);
    }

    #[test]
    fn overlap_normalizes_by_shorter_document() {
        let short = tokenize("network security monitoring");
        let long = tokenize(
            "network security monitoring plus unrelated terms about construction logistics staffing",
        );
        let (score, _) = overlap_score(&short, &long);
        assert!((score - 1.0).abs() < 1e-9);
    }
}
