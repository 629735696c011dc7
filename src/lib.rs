//! # qna-harness
//!
//! A small chat backend that answers each message from the first tier that
//! can: a static Q&A table, an embedding-similarity lookup over past
//! exchanges, then a hosted LLM (primary provider, then secondary), with a
//! fixed fallback reply when all of them come up empty.
//!
//! ## Architecture
//!
//! ```text
//!                 POST /chat
//!                     │
//!                     ▼
//!             ┌───────────────┐      ┌──────────────┐
//!             │   Resolver    │─────▶│ ExchangeLog  │  log.json
//!             └───────┬───────┘      └──────────────┘
//!     ┌───────────────┼────────────────┬──────────────┐
//!     ▼               ▼                ▼              ▼
//! ┌────────┐   ┌─────────────┐   ┌───────────┐   ┌──────────┐
//! │ Q&A    │   │ Similarity  │   │ Provider  │   │ Fallback │
//! │ table  │   │ Index       │   │ Chain     │   │ reply    │
//! └────────┘   └─────────────┘   └───────────┘   └──────────┘
//!  qna.json     corpus.json       OpenAI → Groq
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! qnah status                       # inspect data files and providers
//! qnah ask "jam buka?"              # resolve one message
//! qnah corpus add "alamat toko"     # grow the similarity corpus
//! qnah serve                        # start the HTTP server
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration and environment overlay |
//! | [`models`] | Persisted records and conversation turns |
//! | [`store`] | Flat-file JSON array store |
//! | [`exchange_log`] | Durable log of resolved exchanges |
//! | [`embedding`] | Sentence-embedding encoders |
//! | [`matcher`] | Cosine-similarity lookup over the corpus |
//! | [`providers`] | Hosted chat-completion providers |
//! | [`session`] | Per-session transcripts |
//! | [`pipeline`] | The tiered resolver |
//! | [`server`] | HTTP server |

pub mod ask;
pub mod config;
pub mod corpus_cmd;
pub mod embedding;
pub mod error;
pub mod exchange_log;
pub mod matcher;
pub mod models;
pub mod pipeline;
pub mod providers;
pub mod server;
pub mod session;
pub mod status;
pub mod store;
