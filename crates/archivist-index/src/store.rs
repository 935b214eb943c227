use crate::error::IndexError;
use crate::key::ChunkKey;
use crate::types::{ChunkHit, ChunkRecord, ImageHit, ImageRecord};

/// Narrow interface over the external vector index.
///
/// Similarity search returns hits in ranked order; point lookup answers
/// not-found with `Ok(None)`, never an error. Everything else (ranking,
/// storage, ANN structure) belongs to the service behind this trait.
pub trait ArchiveIndex: Send + Sync {
    /// Ensure both collections exist with the given vector size.
    ///
    /// Idempotent: no-op if a collection already exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the index cannot be reached or creation fails.
    fn ensure_collections(
        &self,
        vector_size: u64,
    ) -> impl Future<Output = Result<(), IndexError>> + Send;

    /// Nearest-neighbor search over the text collection.
    ///
    /// # Errors
    ///
    /// Returns an error if the search call fails.
    fn search_chunks(
        &self,
        vector: &[f32],
        limit: u64,
    ) -> impl Future<Output = Result<Vec<ChunkHit>, IndexError>> + Send;

    /// Point lookup of a chunk by composite key. Not-found is `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns an error only on transport failure.
    fn fetch_chunk(
        &self,
        key: &ChunkKey,
    ) -> impl Future<Output = Result<Option<ChunkRecord>, IndexError>> + Send;

    /// Nearest-neighbor search over the image collection.
    ///
    /// # Errors
    ///
    /// Returns an error if the search call fails.
    fn search_images(
        &self,
        vector: &[f32],
        limit: u64,
    ) -> impl Future<Output = Result<Vec<ImageHit>, IndexError>> + Send;

    /// # Errors
    ///
    /// Returns an error if the upsert fails.
    fn upsert_chunks(
        &self,
        records: Vec<(ChunkRecord, Vec<f32>)>,
    ) -> impl Future<Output = Result<(), IndexError>> + Send;

    /// # Errors
    ///
    /// Returns an error if the upsert fails.
    fn upsert_images(
        &self,
        records: Vec<(ImageRecord, Vec<f32>)>,
    ) -> impl Future<Output = Result<(), IndexError>> + Send;
}
