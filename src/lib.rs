//! # flatmatch
//!
//! A conversation-driven rental listing matcher.
//!
//! flatmatch turns a renter's chat into a stream of scored listings:
//! the conversation is condensed into an ideal listing and a summary,
//! the summary is embedded and used to retrieve candidates from a
//! vector store, hard constraints are filtered deterministically, and
//! the survivors are scored concurrently by a language model. Results
//! stream to the client over SSE as each score lands.
//!
//! ## Quick Start
//!
//! ### As a Server
//!
//! ```bash
//! OPENAI_API_KEY=sk-... flatmatch --qdrant-url http://localhost:6333
//! ```
//!
//! ### As a Library
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use flatmatch::prelude::*;
//!
//! # async fn run(provider: Arc<dyn MatchProvider>) -> Result<()> {
//! let store = Arc::new(MemoryStore::new());
//! let pipeline = MatchPipeline::new(provider, store, PipelineConfig::default());
//!
//! let conversation = vec![Message::user("Pet-friendly double in Hackney, up to £900")];
//! let prepared = pipeline.prepare(&conversation).await?;
//! let mut rx = pipeline.stream(prepared);
//! while let Some(event) = rx.recv().await {
//!     println!("{}", serde_json::to_string(&event)?);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Crate Structure
//!
//! - `flatmatch-core` - data model, filtering, and the match pipeline
//! - `flatmatch-provider` - OpenAI chat, vision and embedding client
//! - `flatmatch-store` - Qdrant adapter and in-memory store
//! - `flatmatch-api` - actix-web REST and SSE surface

// Re-export core types
pub use flatmatch_core::{
    filter_listings, matches_ideal, transcript, CandidateStore, Error, HardRule, IdealCriteria,
    Listing, ListingScore, MatchEvent, MatchPipeline, MatchProvider, Message, PipelineConfig,
    PreparedSearch, Result, Role, ScoredMatch,
};

// Re-export provider and stores
pub use flatmatch_provider::{OpenAiClient, OpenAiConfig};
pub use flatmatch_store::{MemoryStore, QdrantStore};

// Re-export API
pub use flatmatch_api::{AppState, RestApi};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        CandidateStore, Error, IdealCriteria, Listing, ListingScore, MatchEvent, MatchPipeline,
        MatchProvider, MemoryStore, Message, OpenAiClient, OpenAiConfig, PipelineConfig,
        QdrantStore, RestApi, Result, Role, ScoredMatch,
    };
}
