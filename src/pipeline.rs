//! Three-tier answer resolution.
//!
//! A message is answered by the first tier that produces a reply:
//!
//! 1. **Exact match** against the static Q&A table (case-insensitive,
//!    trimmed; first entry in file order wins).
//! 2. **Similarity** over the historical-message corpus.
//! 3. **External** completion, primary provider then secondary.
//! 4. **Fallback**: a fixed reply.
//!
//! Every resolved turn is appended to the caller's [`Conversation`] and to
//! the durable [`ExchangeLog`]. Blank input short-circuits with the "empty
//! message" reply and records nothing.

use anyhow::Result;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

use crate::config::{ChatConfig, Config};
use crate::embedding::{create_encoder, Encoder};
use crate::exchange_log::ExchangeLog;
use crate::matcher::{Match, SimilarityIndex};
use crate::models::{ConversationTurn, CorpusEntry, LogEntry, QnaEntry};
use crate::providers::ProviderChain;
use crate::session::Conversation;
use crate::store;

/// Which tier produced a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Empty,
    ExactMatch,
    Similarity,
    External,
    Fallback,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Empty => "empty",
            Tier::ExactMatch => "exact",
            Tier::Similarity => "similarity",
            Tier::External => "external",
            Tier::Fallback => "fallback",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub reply: String,
    pub tier: Tier,
    /// Corpus position of the matched entry; set only for [`Tier::Similarity`].
    pub index: Option<usize>,
}

/// Owns everything the pipeline reads or writes.
pub struct Resolver {
    qna: Vec<QnaEntry>,
    index: RwLock<SimilarityIndex>,
    encoder: Arc<dyn Encoder>,
    providers: ProviderChain,
    log: Mutex<ExchangeLog>,
    chat: ChatConfig,
}

impl Resolver {
    pub fn new(
        qna: Vec<QnaEntry>,
        index: SimilarityIndex,
        encoder: Arc<dyn Encoder>,
        providers: ProviderChain,
        log: ExchangeLog,
        chat: ChatConfig,
    ) -> Self {
        Self {
            qna,
            index: RwLock::new(index),
            encoder,
            providers,
            log: Mutex::new(log),
            chat,
        }
    }

    /// Loads the three data files, builds the encoder and providers, and
    /// encodes the corpus.
    ///
    /// Unreadable data files and a failing encoder are logged and tolerated;
    /// only an invalid encoder or HTTP client configuration is an error.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let qna: Vec<QnaEntry> = store::decode_records(store::load_or_empty(&config.data.qna_path));
        let corpus: Vec<CorpusEntry> =
            store::decode_records(store::load_or_empty(&config.data.corpus_path));
        let log = ExchangeLog::open(&config.data.log_path, config.log.max_entries);

        let encoder = create_encoder(&config.embedding)?;
        let providers = ProviderChain::from_config(&config.providers)?;

        let mut index = SimilarityIndex::new(corpus, config.retrieval.similarity_threshold);
        if let Err(e) = index.refresh(encoder.as_ref()).await {
            tracing::warn!(error = %e, "failed to encode corpus, similarity lookup disabled");
        }

        tracing::info!(
            qna = qna.len(),
            corpus = index.entries().len(),
            encoded = index.encoded_len(),
            log = log.len(),
            encoder = encoder.model_name(),
            "data loaded"
        );

        Ok(Self::new(qna, index, encoder, providers, log, config.chat.clone()))
    }

    pub fn qna_len(&self) -> usize {
        self.qna.len()
    }

    pub async fn log_len(&self) -> usize {
        self.log.lock().await.len()
    }

    pub async fn encoded_len(&self) -> usize {
        self.index.read().await.encoded_len()
    }

    /// Re-encodes the whole corpus. Returns the number of encoded entries.
    pub async fn refresh_index(&self) -> Result<usize> {
        let mut index = self.index.write().await;
        index.refresh(self.encoder.as_ref()).await?;
        Ok(index.encoded_len())
    }

    /// Resolves one chat message within `conversation`.
    pub async fn resolve(&self, conversation: &mut Conversation, message: &str) -> Resolution {
        let normalized = message.trim().to_lowercase();
        if normalized.is_empty() {
            return Resolution {
                reply: self.chat.empty_reply.clone(),
                tier: Tier::Empty,
                index: None,
            };
        }

        conversation.push(ConversationTurn::user(normalized.clone()));

        let resolution = self.run_tiers(conversation, &normalized).await;
        tracing::info!(tier = resolution.tier.as_str(), index = ?resolution.index, "resolved");

        conversation.push(ConversationTurn::assistant(resolution.reply.clone()));
        self.record(&normalized, &resolution.reply).await;
        resolution
    }

    async fn run_tiers(&self, conversation: &Conversation, normalized: &str) -> Resolution {
        if let Some(entry) = self.exact_match(normalized) {
            return Resolution {
                reply: entry.answer.clone(),
                tier: Tier::ExactMatch,
                index: None,
            };
        }

        if let Some(hit) = self.similar(normalized).await {
            return Resolution {
                reply: hit.reply,
                tier: Tier::Similarity,
                index: Some(hit.index),
            };
        }

        let messages = conversation.with_system(&self.chat.system_prompt);
        if let Some(reply) = self.providers.first_reply(&messages).await {
            return Resolution {
                reply,
                tier: Tier::External,
                index: None,
            };
        }

        Resolution {
            reply: self.chat.fallback_reply.clone(),
            tier: Tier::Fallback,
            index: None,
        }
    }

    fn exact_match(&self, normalized: &str) -> Option<&QnaEntry> {
        self.qna
            .iter()
            .find(|entry| entry.question.trim().to_lowercase() == normalized)
    }

    async fn similar(&self, normalized: &str) -> Option<Match> {
        let index = self.index.read().await;
        match index.best_match(normalized, self.encoder.as_ref()).await {
            Ok(hit) => hit,
            Err(e) => {
                tracing::warn!(error = %e, "similarity lookup failed, skipping tier");
                None
            }
        }
    }

    async fn record(&self, user: &str, reply: &str) {
        let mut log = self.log.lock().await;
        let entry = LogEntry {
            user: user.to_string(),
            ai: reply.to_string(),
        };
        if let Err(e) = log.append(entry).await {
            tracing::warn!(error = %e, "failed to persist exchange log");
        }
    }
}
