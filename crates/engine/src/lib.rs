//! The Third Voice analysis engine.
//!
//! Composes the pieces that turn a message into an [`AnalysisResult`]:
//!
//! - [`sanitizer`]: neutral placeholders for terms providers tend to refuse
//! - [`prompts`]: system prompt and user variants per operation and depth
//! - [`parser`]: embedded-JSON extraction and defaulting
//! - [`fallback`]: canned results when every model fails
//! - [`cache_key`]: request digest used by the cache
//! - [`orchestrator`]: the `process` entry point
//!
//! [`AnalysisResult`]: thirdvoice_core::AnalysisResult

pub mod cache_key;
pub mod fallback;
pub mod orchestrator;
pub mod parser;
pub mod prompts;
pub mod sanitizer;

pub use cache_key::{cache_key, request_key};
pub use fallback::fallback;
pub use orchestrator::Orchestrator;
pub use parser::{extract_json_object, parse, ParsedCompletion};
pub use prompts::{build_prompts, PromptSet};
pub use sanitizer::sanitize;
