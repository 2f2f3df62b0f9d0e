//! TF-IDF vectorizer for normalized clinical notes.
//!
//! Fitted once on the training corpus; vocabulary and idf weights are frozen
//! afterwards, so every transform has the same width.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::text::TextNormalizer;

/// Default vocabulary cap.
pub const DEFAULT_MAX_FEATURES: usize = 500;

/// Frozen vocabulary with smoothed inverse document frequencies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TfIdfVectorizer {
    /// Terms in column order (alphabetical).
    terms: Vec<String>,
    /// Inverse document frequency per term.
    idf: Vec<f64>,
    /// Number of documents seen during fitting.
    n_documents: usize,
    max_features: usize,
}

/// Word tokens of at least two characters.
fn tokens(normalized: &str) -> impl Iterator<Item = &str> {
    normalized
        .split_whitespace()
        .filter(|t| t.chars().count() >= 2)
}

impl TfIdfVectorizer {
    /// Fit on already-normalized documents.
    ///
    /// Keeps the `max_features` terms with the highest corpus frequency
    /// (ties broken alphabetically), indexed alphabetically.
    /// IDF = ln((1 + n) / (1 + df)) + 1
    #[must_use]
    pub fn fit<S: AsRef<str>>(documents: &[S], max_features: usize) -> Self {
        let mut term_frequency: HashMap<&str, usize> = HashMap::new();
        let mut document_frequency: HashMap<&str, usize> = HashMap::new();

        for doc in documents {
            let mut seen: Vec<&str> = Vec::new();
            for token in tokens(doc.as_ref()) {
                *term_frequency.entry(token).or_insert(0) += 1;
                if !seen.contains(&token) {
                    seen.push(token);
                    *document_frequency.entry(token).or_insert(0) += 1;
                }
            }
        }

        let mut ranked: Vec<(&str, usize)> = term_frequency.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        ranked.truncate(max_features);

        let mut terms: Vec<String> = ranked.into_iter().map(|(t, _)| t.to_string()).collect();
        terms.sort();

        let n = documents.len() as f64;
        let idf = terms
            .iter()
            .map(|t| {
                let df = document_frequency.get(t.as_str()).copied().unwrap_or(0) as f64;
                ((1.0 + n) / (1.0 + df)).ln() + 1.0
            })
            .collect();

        tracing::debug!(
            "Fitted TF-IDF vocabulary: {} terms from {} documents",
            terms.len(),
            documents.len()
        );

        Self {
            terms,
            idf,
            n_documents: documents.len(),
            max_features,
        }
    }

    /// Number of columns produced by [`transform`](Self::transform).
    #[must_use]
    pub fn vocabulary_size(&self) -> usize {
        self.terms.len()
    }

    #[must_use]
    pub fn vocabulary(&self) -> &[String] {
        &self.terms
    }

    #[must_use]
    pub fn idf(&self) -> &[f64] {
        &self.idf
    }

    #[must_use]
    pub fn n_documents(&self) -> usize {
        self.n_documents
    }

    #[must_use]
    pub fn max_features(&self) -> usize {
        self.max_features
    }

    /// Column index of a term.
    #[must_use]
    pub fn index_of(&self, term: &str) -> Option<usize> {
        self.terms.binary_search_by(|t| t.as_str().cmp(term)).ok()
    }

    /// Dense, L2-normalized TF-IDF row for already-normalized text.
    ///
    /// Unseen terms are ignored; the result always has `vocabulary_size()` entries.
    #[must_use]
    pub fn transform(&self, normalized: &str) -> Vec<f64> {
        let mut row = vec![0.0; self.terms.len()];
        for token in tokens(normalized) {
            if let Some(i) = self.index_of(token) {
                row[i] += 1.0;
            }
        }
        for (v, idf) in row.iter_mut().zip(&self.idf) {
            *v *= idf;
        }

        let norm = row.iter().map(|v| v * v).sum::<f64>().sqrt();
        if norm > 0.0 {
            row.iter_mut().for_each(|v| *v /= norm);
        }
        row
    }

    /// Normalize a raw note, then transform it.
    #[must_use]
    pub fn transform_raw(&self, normalizer: &TextNormalizer, raw: &str) -> Vec<f64> {
        self.transform(&normalizer.normalize(raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus() -> Vec<String> {
        vec![
            "straining void weak stream".to_string(),
            "complaint normal voiding pattern".to_string(),
            "sudden urge void".to_string(),
            "weak stream straining".to_string(),
        ]
    }

    #[test]
    fn test_vocabulary_is_sorted() {
        let v = TfIdfVectorizer::fit(&corpus(), DEFAULT_MAX_FEATURES);
        assert_eq!(v.vocabulary_size(), 10);
        assert!(v.vocabulary().windows(2).all(|w| w[0] < w[1]));
        assert_eq!(v.n_documents(), 4);
    }

    #[test]
    fn test_max_features_keeps_most_frequent() {
        let v = TfIdfVectorizer::fit(&corpus(), 3);
        assert_eq!(v.vocabulary_size(), 3);
        // straining, stream, void and weak each appear twice; weak loses the
        // alphabetical tie-break.
        assert_eq!(v.vocabulary(), &["straining", "stream", "void"]);
    }

    #[test]
    fn test_idf_weights() {
        let v = TfIdfVectorizer::fit(&corpus(), DEFAULT_MAX_FEATURES);
        let rare = v.idf()[v.index_of("sudden").expect("term")];
        let common = v.idf()[v.index_of("weak").expect("term")];
        assert!(rare > common);
        assert!((rare - ((5.0_f64 / 2.0).ln() + 1.0)).abs() < 1e-12);
    }

    #[test]
    fn test_transform_shape_invariance() {
        let v = TfIdfVectorizer::fit(&corpus(), DEFAULT_MAX_FEATURES);
        for text in ["", "   ", "entirely unseen words", "weak weak stream", "a b c"] {
            assert_eq!(v.transform(text).len(), v.vocabulary_size());
        }
        assert!(v.transform("").iter().all(|x| *x == 0.0));
    }

    #[test]
    fn test_transform_is_l2_normalized() {
        let v = TfIdfVectorizer::fit(&corpus(), DEFAULT_MAX_FEATURES);
        let row = v.transform("straining weak unknown");
        let norm = row.iter().map(|x| x * x).sum::<f64>().sqrt();
        assert!((norm - 1.0).abs() < 1e-12);
        assert_eq!(row[v.index_of("void").expect("term")], 0.0);
    }

    #[test]
    fn test_transform_raw_normalizes() {
        let v = TfIdfVectorizer::fit(&corpus(), DEFAULT_MAX_FEATURES);
        let n = TextNormalizer::new();
        assert_eq!(
            v.transform_raw(&n, "Straining, to VOID!"),
            v.transform("straining void")
        );
    }

    #[test]
    fn test_empty_corpus() {
        let docs: Vec<String> = Vec::new();
        let v = TfIdfVectorizer::fit(&docs, DEFAULT_MAX_FEATURES);
        assert_eq!(v.vocabulary_size(), 0);
        assert!(v.transform("anything").is_empty());
    }
}
