//! Historical-message corpus maintenance.
//!
//! `qnah corpus add` appends an entry to the corpus file and checks that the
//! updated corpus still encodes; `qnah corpus reindex` just encodes it. A
//! running server picks up corpus changes on restart.

use anyhow::{Context, Result};

use crate::config::Config;
use crate::embedding::create_encoder;
use crate::matcher::SimilarityIndex;
use crate::models::{CorpusEntry, LogEntry};
use crate::store;

/// Appends `text` (or the pair `text` → `answer`) to the corpus file.
pub async fn run_corpus_add(config: &Config, text: &str, answer: Option<&str>) -> Result<()> {
    let text = text.trim();
    if text.is_empty() {
        anyhow::bail!("corpus text must not be empty");
    }

    let path = &config.data.corpus_path;
    // A corrupt corpus must not be silently replaced by a one-entry file.
    let mut records = store::load_array(path)
        .with_context(|| format!("refusing to rewrite unreadable corpus {}", path.display()))?;

    let entry = match answer {
        Some(answer) => CorpusEntry::Exchange(LogEntry {
            user: text.to_string(),
            ai: answer.trim().to_string(),
        }),
        None => CorpusEntry::Text(text.to_string()),
    };
    // Existing records are written back exactly as read.
    records.push(serde_json::to_value(&entry)?);
    let index = records.len() - 1;

    store::save_array(path, &records)?;
    println!("Added corpus entry {} to {}", index, path.display());

    if config.embedding.is_enabled() {
        let encoded = encode_all(config, store::decode_records(records)).await?;
        println!("Encoded {} corpus entries", encoded);
    }

    Ok(())
}

/// Encodes the whole corpus and reports how many entries were encoded.
pub async fn run_corpus_reindex(config: &Config) -> Result<()> {
    let entries: Vec<CorpusEntry> =
        store::decode_records(store::load_or_empty(&config.data.corpus_path));
    let total = entries.len();
    let encoded = encode_all(config, entries).await?;
    println!("Encoded {} of {} corpus entries", encoded, total);
    Ok(())
}

async fn encode_all(config: &Config, entries: Vec<CorpusEntry>) -> Result<usize> {
    let encoder = create_encoder(&config.embedding)?;
    let mut index = SimilarityIndex::new(entries, config.retrieval.similarity_threshold);
    index
        .refresh(encoder.as_ref())
        .await
        .with_context(|| format!("failed to encode corpus with {}", encoder.model_name()))?;
    Ok(index.encoded_len())
}
