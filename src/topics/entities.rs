// TF-IDF entity extraction for individual messages.
//
// Uses the `keyword_extraction` crate with each sentence of the message as a
// separate document, so words repeated across sentences rank above one-offs.
// Scores are normalized into saliences that sum to 1.0 per message.

use std::sync::LazyLock;

use anyhow::Result;
use keyword_extraction::tf_idf::{TfIdf, TfIdfParams};
use regex_lite::Regex;
use stop_words::{get, LANGUAGE};
use tracing::debug;

use super::traits::EntityExtractor;
use crate::chat::models::Entity;

/// URLs and @mentions carry no topical signal.
static NOISE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https?://\S+|@[\w.]+").expect("noise pattern is valid"));

/// TF-IDF based entity extractor — runs locally, no API calls.
pub struct TfIdfEntityExtractor {
    /// How many entities to keep per message
    pub max_entities: usize,
    stop_words: Vec<String>,
}

impl Default for TfIdfEntityExtractor {
    fn default() -> Self {
        Self::new(5)
    }
}

impl TfIdfEntityExtractor {
    pub fn new(max_entities: usize) -> Self {
        Self {
            max_entities,
            stop_words: get(LANGUAGE::English),
        }
    }
}

impl EntityExtractor for TfIdfEntityExtractor {
    fn extract(&self, text: &str) -> Result<Vec<Entity>> {
        let cleaned = NOISE.replace_all(text, " ");
        let sentences = split_sentences(&cleaned);
        if sentences.is_empty() || self.max_entities == 0 {
            return Ok(Vec::new());
        }

        let params = TfIdfParams::UnprocessedDocuments(&sentences, &self.stop_words, None);
        let tfidf = TfIdf::new(params);
        let ranked: Vec<(String, f32)> = tfidf.get_ranked_word_scores(self.max_entities);

        let entities = to_entities(&ranked);
        debug!(
            sentences = sentences.len(),
            entities = entities.len(),
            "Extracted message entities"
        );
        Ok(entities)
    }
}

/// Split on sentence punctuation and line breaks, dropping empty pieces.
fn split_sentences(text: &str) -> Vec<String> {
    text.split(['.', '!', '?', '\n'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Normalize ranked keyword scores into saliences summing to 1.0.
///
/// A single-sentence message can score every keyword at zero (the IDF term
/// vanishes), in which case salience falls back to rank position.
fn to_entities(ranked: &[(String, f32)]) -> Vec<Entity> {
    let total: f64 = ranked.iter().map(|(_, s)| f64::from(s.max(0.0))).sum();

    let weights: Vec<f64> = if total > 0.0 && total.is_finite() {
        ranked
            .iter()
            .map(|(_, s)| f64::from(s.max(0.0)) / total)
            .collect()
    } else {
        let n = ranked.len();
        let rank_total = (n * (n + 1) / 2) as f64;
        (0..n).map(|i| (n - i) as f64 / rank_total).collect()
    };

    ranked
        .iter()
        .zip(weights)
        .map(|((name, _), salience)| Entity::new(name.clone(), salience))
        .collect()
}
