//! LLM provider plumbing for Third Voice.
//!
//! All providers implement the `thirdvoice_core::Provider` trait. The
//! invoker walks the model table against a provider, one bounded attempt at
//! a time.

pub mod invoker;
pub mod openai_compat;
pub mod router;

pub use invoker::{Invocation, ModelInvoker};
pub use openai_compat::OpenAiCompatProvider;
pub use router::build_from_config;
