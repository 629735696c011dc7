//! Nearest-neighbor lookup over the historical-message corpus.
//!
//! The corpus is encoded wholesale by [`SimilarityIndex::refresh`]; queries
//! are encoded on demand and compared with cosine similarity. A match is
//! reported only when the best score is strictly above the threshold.
//! When several entries share the best score, the one earliest in the
//! corpus wins.

use anyhow::Result;

use crate::embedding::{cosine_similarity, encode_one, Encoder};
use crate::models::CorpusEntry;

/// The best corpus entry for a query.
#[derive(Debug, Clone, PartialEq)]
pub struct Match {
    /// Position of the entry in the corpus file.
    pub index: usize,
    pub score: f32,
    pub reply: String,
}

/// Corpus entries plus their embedding vectors.
pub struct SimilarityIndex {
    entries: Vec<CorpusEntry>,
    /// `(corpus index, vector)` for every entry that has key text.
    vectors: Vec<(usize, Vec<f32>)>,
    threshold: f32,
}

impl SimilarityIndex {
    /// Builds an index with no vectors yet; call [`refresh`](Self::refresh)
    /// before querying.
    pub fn new(entries: Vec<CorpusEntry>, threshold: f32) -> Self {
        Self {
            entries,
            vectors: Vec::new(),
            threshold,
        }
    }

    pub fn entries(&self) -> &[CorpusEntry] {
        &self.entries
    }

    /// Number of entries currently encoded.
    pub fn encoded_len(&self) -> usize {
        self.vectors.len()
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Appends an entry. Its vector is not computed until the next refresh.
    pub fn push(&mut self, entry: CorpusEntry) {
        self.entries.push(entry);
    }

    /// Re-encodes every entry. On failure the index is left with no vectors,
    /// so lookups report no match until a later refresh succeeds.
    pub async fn refresh(&mut self, encoder: &dyn Encoder) -> Result<()> {
        self.vectors.clear();

        let (positions, texts): (Vec<usize>, Vec<String>) = self
            .entries
            .iter()
            .enumerate()
            .filter_map(|(i, entry)| entry.key_text().map(|text| (i, text.to_string())))
            .unzip();

        if texts.is_empty() {
            return Ok(());
        }

        let encoded = encoder.encode(&texts).await?;
        if encoded.len() != texts.len() {
            anyhow::bail!(
                "encoder returned {} vectors for {} corpus entries",
                encoded.len(),
                texts.len()
            );
        }

        self.vectors = positions.into_iter().zip(encoded).collect();
        Ok(())
    }

    /// Finds the corpus entry closest to `query`.
    ///
    /// Returns `Ok(None)` without calling the encoder when nothing is
    /// encoded.
    pub async fn best_match(&self, query: &str, encoder: &dyn Encoder) -> Result<Option<Match>> {
        if self.vectors.is_empty() {
            return Ok(None);
        }

        let query_vec = encode_one(encoder, query).await?;
        Ok(self.best_match_vector(&query_vec))
    }

    /// Like [`best_match`](Self::best_match) for an already-encoded query.
    pub fn best_match_vector(&self, query_vec: &[f32]) -> Option<Match> {
        let (row, score) = best_row(query_vec, &self.vectors)?;
        if score <= self.threshold {
            return None;
        }

        let index = self.vectors[row].0;
        let reply = self.entries.get(index)?.reply_text()?.to_string();
        Some(Match {
            index,
            score,
            reply,
        })
    }
}

/// Row and score of the highest similarity; earliest row wins ties.
/// Non-finite scores (overflowing or degenerate vectors) never count.
fn best_row(query_vec: &[f32], vectors: &[(usize, Vec<f32>)]) -> Option<(usize, f32)> {
    let mut best: Option<(usize, f32)> = None;
    for (row, (_, vector)) in vectors.iter().enumerate() {
        let score = cosine_similarity(query_vec, vector);
        if !score.is_finite() {
            continue;
        }
        match best {
            Some((_, best_score)) if score <= best_score => {}
            _ => best = Some((row, score)),
        }
    }
    best
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::LogEntry;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Deterministic encoder for tests: one dimension per vocabulary word,
    /// counting occurrences. Unknown words contribute nothing.
    pub(crate) struct VocabEncoder {
        vocab: Vec<&'static str>,
        pub calls: AtomicUsize,
    }

    impl VocabEncoder {
        pub(crate) fn new(vocab: &[&'static str]) -> Self {
            Self {
                vocab: vocab.to_vec(),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Encoder for VocabEncoder {
        fn model_name(&self) -> &str {
            "vocab-test"
        }

        async fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(texts
                .iter()
                .map(|text| {
                    let lower = text.to_lowercase();
                    self.vocab
                        .iter()
                        .map(|word| lower.split_whitespace().filter(|w| w == word).count() as f32)
                        .collect()
                })
                .collect())
        }
    }

    fn corpus() -> Vec<CorpusEntry> {
        vec![
            CorpusEntry::Text("jam buka toko".to_string()),
            CorpusEntry::Other(serde_json::json!({"note": "skip"})),
            CorpusEntry::Exchange(LogEntry {
                user: "harga kopi".to_string(),
                ai: "Rp 20.000".to_string(),
            }),
        ]
    }

    #[tokio::test]
    async fn test_match_reports_corpus_index() {
        let encoder = VocabEncoder::new(&["jam", "buka", "toko", "harga", "kopi"]);
        let mut index = SimilarityIndex::new(corpus(), 0.5);
        index.refresh(&encoder).await.unwrap();
        assert_eq!(index.encoded_len(), 2);

        let hit = index.best_match("harga kopi", &encoder).await.unwrap().unwrap();
        assert_eq!(hit.index, 2, "index counts unencodable entries");
        assert_eq!(hit.reply, "Rp 20.000");
        assert!((hit.score - 1.0).abs() < 1e-6);

        let hit = index.best_match("toko buka jam", &encoder).await.unwrap().unwrap();
        assert_eq!(hit.index, 0);
        assert_eq!(hit.reply, "jam buka toko");
    }

    #[test]
    fn test_threshold_is_strict() {
        let index = SimilarityIndex {
            entries: vec![CorpusEntry::Text("a".to_string())],
            vectors: vec![(0, vec![1.0, 0.0, 0.0, 0.0])],
            threshold: 0.5,
        };

        // dot = 1, norms 2 and 1: exactly 0.5, which is not a hit.
        let at_threshold = [1.0, 1.0, 1.0, 1.0];
        assert_eq!(
            cosine_similarity(&at_threshold, &[1.0, 0.0, 0.0, 0.0]),
            0.5
        );
        assert!(index.best_match_vector(&at_threshold).is_none());

        assert!(index.best_match_vector(&[0.0, 1.0, 0.0, 0.0]).is_none());
        assert!(index.best_match_vector(&[0.9, 0.1, 0.0, 0.0]).is_some());
    }

    #[test]
    fn test_threshold_equal_score_rejected() {
        let index = SimilarityIndex {
            entries: vec![CorpusEntry::Text("a".to_string())],
            vectors: vec![(0, vec![1.0, 0.0])],
            threshold: 1.0,
        };
        // Identical direction scores 1.0, which does not exceed 1.0.
        assert!(index.best_match_vector(&[2.0, 0.0]).is_none());
    }

    #[test]
    fn test_ties_pick_first_index() {
        let index = SimilarityIndex {
            entries: vec![
                CorpusEntry::Text("first".to_string()),
                CorpusEntry::Text("second".to_string()),
            ],
            vectors: vec![(0, vec![1.0, 0.0]), (1, vec![1.0, 0.0])],
            threshold: 0.5,
        };
        let hit = index.best_match_vector(&[1.0, 0.0]).unwrap();
        assert_eq!(hit.index, 0);
        assert_eq!(hit.reply, "first");
    }

    #[test]
    fn test_non_finite_score_is_never_a_match() {
        let index = SimilarityIndex {
            entries: vec![
                CorpusEntry::Text("small".to_string()),
                CorpusEntry::Text("huge".to_string()),
            ],
            vectors: vec![(0, vec![1.0, 0.0]), (1, vec![1e30, 1e30])],
            threshold: 0.5,
        };
        // The huge norms overflow to infinity and the score to NaN.
        assert!(index.best_match_vector(&[0.0, 1e30]).is_none());

        let hit = index.best_match_vector(&[1.0, 0.0]).unwrap();
        assert_eq!(hit.index, 0);
        assert!(hit.score.is_finite());
    }

    #[tokio::test]
    async fn test_empty_corpus_skips_encoder() {
        let encoder = VocabEncoder::new(&["a"]);
        let mut index = SimilarityIndex::new(Vec::new(), 0.5);
        index.refresh(&encoder).await.unwrap();

        assert!(index.best_match("a", &encoder).await.unwrap().is_none());
        assert_eq!(encoder.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_push_then_refresh_encodes_new_entry() {
        let encoder = VocabEncoder::new(&["kopi", "teh"]);
        let mut index = SimilarityIndex::new(vec![CorpusEntry::Text("kopi".to_string())], 0.5);
        index.refresh(&encoder).await.unwrap();
        assert!(index.best_match("teh", &encoder).await.unwrap().is_none());

        index.push(CorpusEntry::Text("teh".to_string()));
        index.refresh(&encoder).await.unwrap();
        let hit = index.best_match("teh", &encoder).await.unwrap().unwrap();
        assert_eq!(hit.index, 1);
    }
}
