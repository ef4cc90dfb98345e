//! # Third Voice Core
//!
//! Domain types, traits, and error definitions for the Third Voice analysis
//! engine. This crate has **zero framework dependencies**: it defines the
//! domain model that the provider, cache, and engine crates implement against.
//!
//! ## Design Philosophy
//!
//! Every external collaborator (LLM endpoint, cache store) is a trait here.
//! Implementations live in their respective crates, so the orchestrator can
//! be driven by stubs in tests and by real adapters in the binary.

pub mod analysis;
pub mod cache;
pub mod error;
pub mod message;
pub mod provider;

// Re-export key types at crate root for ergonomics
pub use analysis::{
    AnalysisRequest, AnalysisResult, Depth, Operation, ProviderDescriptor, RelationshipContext,
    ResultSource, Sentiment,
};
pub use cache::{CacheEntry, CacheStore};
pub use error::{Error, Result};
pub use message::{Message, Role};
pub use provider::{Provider, ProviderRequest, ProviderResponse, Usage};
