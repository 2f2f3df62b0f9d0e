//! Clinical note normalization.
//!
//! Pipeline: lowercase, strip punctuation, split on whitespace, drop English
//! stop words, reduce each token to its dictionary base form, join with single
//! spaces. The output is a fixed point: normalizing it again changes nothing.

use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

/// English stop words (apostrophe forms omitted: punctuation is stripped first).
const STOP_WORDS: &[&str] = &[
    "i", "me", "my", "myself", "we", "our", "ours", "ourselves", "you", "your", "yours",
    "yourself", "yourselves", "he", "him", "his", "himself", "she", "her", "hers", "herself",
    "it", "its", "itself", "they", "them", "their", "theirs", "themselves", "what", "which",
    "who", "whom", "this", "that", "these", "those", "am", "is", "are", "was", "were", "be",
    "been", "being", "have", "has", "had", "having", "do", "does", "did", "doing", "a", "an",
    "the", "and", "but", "if", "or", "because", "as", "until", "while", "of", "at", "by", "for",
    "with", "about", "against", "between", "into", "through", "during", "before", "after",
    "above", "below", "to", "from", "up", "down", "in", "out", "on", "off", "over", "under",
    "again", "further", "then", "once", "here", "there", "when", "where", "why", "how", "all",
    "any", "both", "each", "few", "more", "most", "other", "some", "such", "no", "nor", "not",
    "only", "own", "same", "so", "than", "too", "very", "s", "t", "can", "will", "just", "don",
    "should", "now", "d", "ll", "m", "o", "re", "ve", "y", "ain", "aren", "couldn", "didn",
    "doesn", "hadn", "hasn", "haven", "isn", "ma", "mightn", "mustn", "needn", "shan",
    "shouldn", "wasn", "weren", "won", "wouldn",
];

/// Irregular plurals that suffix rules get wrong.
const IRREGULAR: &[(&str, &str)] = &[
    ("men", "man"),
    ("women", "woman"),
    ("children", "child"),
    ("feet", "foot"),
    ("teeth", "tooth"),
    ("mice", "mouse"),
    ("geese", "goose"),
    ("data", "datum"),
    ("criteria", "criterion"),
    ("phenomena", "phenomenon"),
    ("bacteria", "bacterium"),
    ("diagnoses", "diagnosis"),
    ("prognoses", "prognosis"),
    ("analyses", "analysis"),
    ("crises", "crisis"),
    ("indices", "index"),
    ("appendices", "appendix"),
    ("aches", "ache"),
    ("headaches", "headache"),
    ("backaches", "backache"),
];

/// Words ending in a plural-looking suffix that are already base forms.
const INVARIANT: &[&str] = &["series", "species", "news", "physics", "diabetes", "feces"];

fn stop_words() -> &'static HashSet<&'static str> {
    static SET: OnceLock<HashSet<&'static str>> = OnceLock::new();
    SET.get_or_init(|| STOP_WORDS.iter().copied().collect())
}

fn irregular() -> &'static HashMap<&'static str, &'static str> {
    static MAP: OnceLock<HashMap<&'static str, &'static str>> = OnceLock::new();
    MAP.get_or_init(|| IRREGULAR.iter().copied().collect())
}

/// Whether a lowercase token is an English stop word.
#[must_use]
pub fn is_stop_word(token: &str) -> bool {
    stop_words().contains(token)
}

/// Reduce a lowercase noun to its singular base form.
///
/// Returns the token unchanged when the reduction would produce a stop word,
/// which keeps normalization idempotent.
#[must_use]
pub fn lemmatize(token: &str) -> String {
    let lemma = reduce(token);
    if lemma != token && is_stop_word(&lemma) {
        token.to_string()
    } else {
        lemma
    }
}

fn reduce(token: &str) -> String {
    if let Some(base) = irregular().get(token) {
        return (*base).to_string();
    }
    if INVARIANT.contains(&token) || token.chars().count() <= 3 {
        return token.to_string();
    }
    if token.ends_with("ss") || token.ends_with("us") || token.ends_with("is") {
        return token.to_string();
    }

    if let Some(stem) = token.strip_suffix("ies") {
        return if token.len() > 4 {
            format!("{stem}y")
        } else {
            format!("{stem}ie")
        };
    }
    if let Some(stem) = token.strip_suffix("es") {
        if ["ss", "x", "ch", "sh", "zz"].iter().any(|s| stem.ends_with(s)) {
            return stem.to_string();
        }
    }
    if let Some(stem) = token.strip_suffix('s') {
        return irregular()
            .get(stem)
            .map_or_else(|| stem.to_string(), |base| (*base).to_string());
    }
    token.to_string()
}

/// Canonicalizes free-text notes into a space-joined token stream.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextNormalizer;

impl TextNormalizer {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Normalize a note. Empty or whitespace-only input yields an empty string.
    #[must_use]
    pub fn normalize(&self, text: &str) -> String {
        let lowered = text.to_lowercase();
        let cleaned: String = lowered
            .chars()
            .filter(|c| c.is_alphanumeric() || c.is_whitespace())
            .collect();

        cleaned
            .split_whitespace()
            .filter(|token| !is_stop_word(token))
            .map(lemmatize)
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Normalize an optional note; a missing note is treated as empty.
    #[must_use]
    pub fn normalize_opt(&self, text: Option<&str>) -> String {
        text.map(|t| self.normalize(t)).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_pipeline() {
        let n = TextNormalizer::new();
        assert_eq!(
            n.normalize("Straining to void. Weak stream!"),
            "straining void weak stream"
        );
        assert_eq!(
            n.normalize("No complaints. Normal voiding pattern."),
            "complaint normal voiding pattern"
        );
        assert_eq!(
            n.normalize("Episodes of urge incontinence."),
            "episode urge incontinence"
        );
    }

    #[test]
    fn test_empty_input() {
        let n = TextNormalizer::new();
        assert_eq!(n.normalize(""), "");
        assert_eq!(n.normalize("   \t\n "), "");
        assert_eq!(n.normalize("... !!"), "");
        assert_eq!(n.normalize_opt(None), "");
    }

    #[test]
    fn test_lemmatize_rules() {
        assert_eq!(lemmatize("complaints"), "complaint");
        assert_eq!(lemmatize("frequencies"), "frequency");
        assert_eq!(lemmatize("ties"), "tie");
        assert_eq!(lemmatize("boxes"), "box");
        assert_eq!(lemmatize("stresses"), "stress");
        assert_eq!(lemmatize("diseases"), "disease");
        assert_eq!(lemmatize("sizes"), "size");
        assert_eq!(lemmatize("headaches"), "headache");
        assert_eq!(lemmatize("women"), "woman");
        assert_eq!(lemmatize("diagnoses"), "diagnosis");
        assert_eq!(lemmatize("prostatitis"), "prostatitis");
        assert_eq!(lemmatize("bladder"), "bladder");
        assert_eq!(lemmatize("gas"), "gas");
        // Reduction to a stop word is refused.
        assert_eq!(lemmatize("theses"), "theses");
    }

    #[test]
    fn test_normalization_is_idempotent() {
        let n = TextNormalizer::new();
        let notes = [
            "Frequent nocturia. Straining in the mornings.",
            "Sensation of incomplete emptying. Intermittent stream.",
            "Involuntary detrusor contractions. Sudden urge to void.",
            "Neurological condition present. Weak bladder muscles.",
            "Glasses, boxes, stresses, analyses; the theses & diagnoses!",
            "Ağrı ve yanma — kesik kesik işeme",
        ];
        for note in notes {
            let once = n.normalize(note);
            assert_eq!(n.normalize(&once), once, "not idempotent for {note:?}");
        }
    }

    #[test]
    fn test_stop_words() {
        assert!(is_stop_word("the"));
        assert!(is_stop_word("no"));
        assert!(!is_stop_word("stream"));
    }
}
