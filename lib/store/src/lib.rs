//! Candidate listing stores.
//!
//! [`QdrantStore`] talks to a Qdrant-compatible search endpoint over
//! HTTP; [`MemoryStore`] keeps everything in process for tests and
//! local development. Both implement `CandidateStore`.

pub mod memory;
pub mod qdrant;

pub use memory::MemoryStore;
pub use qdrant::QdrantStore;
