//! # flatmatch Core
//!
//! Core library for the flatmatch rental matcher.
//!
//! This crate provides the data model and the streaming match pipeline:
//!
//! - [`Message`] / [`transcript`] - the renter's conversation
//! - [`IdealCriteria`] - the synthesized ideal listing
//! - [`Listing`] - a candidate rental listing
//! - [`filter_listings`] - deterministic hard-constraint filtering
//! - [`MatchPipeline`] - prepare-then-stream match orchestration
//!
//! Model access and vector search are injected through the
//! [`MatchProvider`] and [`CandidateStore`] traits, so the pipeline can
//! be exercised without network access.

pub mod conversation;
pub mod error;
pub mod filter;
pub mod listing;
pub mod pipeline;

pub use conversation::{transcript, HardRule, Message, Role};
pub use error::{Error, Result};
pub use filter::{filter_listings, is_affirmative, matches_ideal};
pub use listing::{IdealCriteria, Listing, ListingScore, MatchEvent, ScoredMatch};
pub use pipeline::{CandidateStore, MatchPipeline, MatchProvider, PipelineConfig, PreparedSearch};
