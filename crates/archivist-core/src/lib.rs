//! Retrieval-and-grounding pipeline over an external vector index and chat
//! model: section expansion, prompt assembly, answer generation, and
//! post-hoc image relevance filtering.

pub mod config;
pub mod context;
pub mod error;
pub mod expander;
pub mod image_filter;
pub mod keywords;
pub mod pipeline;
pub mod secret;

pub use error::PipelineError;
