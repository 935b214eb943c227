//! Vector index client for the archive corpus.
//!
//! The index itself is an external Qdrant service; this crate owns the record
//! types, the composite chunk key, the narrow [`store::ArchiveIndex`]
//! interface the pipeline depends on, and CSV ingestion.

pub mod error;
pub mod ingest;
pub mod key;
pub mod qdrant;
pub mod store;
pub mod types;

pub use error::IndexError;
pub use key::ChunkKey;
pub use store::ArchiveIndex;
pub use types::{ChunkHit, ChunkRecord, ImageHit, ImageRecord};
