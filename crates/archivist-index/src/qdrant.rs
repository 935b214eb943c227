use std::collections::HashMap;
use std::fmt;

use qdrant_client::Qdrant;
use qdrant_client::qdrant::{
    CreateCollectionBuilder, Distance, GetPointsBuilder, PointId, PointStruct,
    SearchPointsBuilder, UpsertPointsBuilder, VectorParamsBuilder,
};
use uuid::Uuid;

use crate::error::IndexError;
use crate::key::ChunkKey;
use crate::store::ArchiveIndex;
use crate::types::{ChunkHit, ChunkRecord, ImageHit, ImageRecord};

pub struct QdrantArchive {
    client: Qdrant,
    chunks_collection: String,
    images_collection: String,
}

impl fmt::Debug for QdrantArchive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QdrantArchive")
            .field("chunks_collection", &self.chunks_collection)
            .field("images_collection", &self.images_collection)
            .finish_non_exhaustive()
    }
}

/// Qdrant point ids must be UUIDs or integers; derive a deterministic UUIDv5
/// from the record key so point lookup by composite id works.
fn point_id(record_id: &str) -> String {
    Uuid::new_v5(&Uuid::NAMESPACE_OID, record_id.as_bytes()).to_string()
}

fn to_payload(value: serde_json::Value) -> Result<HashMap<String, qdrant_client::qdrant::Value>, IndexError> {
    Ok(serde_json::from_value(value)?)
}

impl QdrantArchive {
    /// Create a new `QdrantArchive` connected to the given Qdrant URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the Qdrant client cannot be created.
    pub fn new(
        url: &str,
        chunks_collection: impl Into<String>,
        images_collection: impl Into<String>,
    ) -> Result<Self, IndexError> {
        let client = Qdrant::from_url(url).build()?;
        Ok(Self {
            client,
            chunks_collection: chunks_collection.into(),
            images_collection: images_collection.into(),
        })
    }

    async fn ensure_collection(&self, name: &str, vector_size: u64) -> Result<(), IndexError> {
        if self.client.collection_exists(name).await? {
            return Ok(());
        }

        self.client
            .create_collection(
                CreateCollectionBuilder::new(name)
                    .vectors_config(VectorParamsBuilder::new(vector_size, Distance::Cosine)),
            )
            .await?;

        Ok(())
    }

    fn chunk_point(record: &ChunkRecord, vector: Vec<f32>) -> Result<PointStruct, IndexError> {
        let id = record.key.to_string();
        let payload = to_payload(serde_json::json!({
            "id": id,
            "chapter": record.key.chapter,
            "section": record.key.section,
            "paragraph": record.key.paragraph,
            "content": record.content,
        }))?;
        Ok(PointStruct::new(point_id(&id), vector, payload))
    }

    fn image_point(record: &ImageRecord, vector: Vec<f32>) -> Result<PointStruct, IndexError> {
        let payload = to_payload(serde_json::json!({
            "id": record.id,
            "name": record.name,
            "path": record.path,
            "caption": record.caption,
        }))?;
        Ok(PointStruct::new(point_id(&record.id), vector, payload))
    }
}

impl ArchiveIndex for QdrantArchive {
    async fn ensure_collections(&self, vector_size: u64) -> Result<(), IndexError> {
        self.ensure_collection(&self.chunks_collection, vector_size)
            .await?;
        self.ensure_collection(&self.images_collection, vector_size)
            .await
    }

    async fn search_chunks(&self, vector: &[f32], limit: u64) -> Result<Vec<ChunkHit>, IndexError> {
        let results = self
            .client
            .search_points(
                SearchPointsBuilder::new(&self.chunks_collection, vector.to_vec(), limit)
                    .with_payload(true),
            )
            .await?;

        let hits = results
            .result
            .into_iter()
            .filter_map(|point| {
                let id = point.payload.get("id")?.as_str()?;
                let Ok(key) = id.parse::<ChunkKey>() else {
                    tracing::warn!(id, "dropping hit with malformed chunk id");
                    return None;
                };
                Some(ChunkHit {
                    key,
                    score: point.score,
                })
            })
            .collect();

        Ok(hits)
    }

    async fn fetch_chunk(&self, key: &ChunkKey) -> Result<Option<ChunkRecord>, IndexError> {
        let response = self
            .client
            .get_points(
                GetPointsBuilder::new(
                    &self.chunks_collection,
                    vec![PointId::from(point_id(&key.to_string()))],
                )
                .with_payload(true),
            )
            .await?;

        let Some(point) = response.result.into_iter().next() else {
            return Ok(None);
        };

        let Some(content) = point.payload.get("content").and_then(|v| v.as_str()) else {
            tracing::warn!(%key, "chunk payload missing content field");
            return Ok(None);
        };

        Ok(Some(ChunkRecord {
            key: key.clone(),
            content: content.to_owned(),
        }))
    }

    async fn search_images(&self, vector: &[f32], limit: u64) -> Result<Vec<ImageHit>, IndexError> {
        let results = self
            .client
            .search_points(
                SearchPointsBuilder::new(&self.images_collection, vector.to_vec(), limit)
                    .with_payload(true),
            )
            .await?;

        let hits = results
            .result
            .into_iter()
            .filter_map(|point| {
                let name = point.payload.get("name")?.as_str()?.to_owned();
                let caption = point
                    .payload
                    .get("caption")
                    .and_then(|v| v.as_str())
                    .map(ToOwned::to_owned)
                    .unwrap_or_default();
                Some(ImageHit {
                    name,
                    caption,
                    score: point.score,
                })
            })
            .collect();

        Ok(hits)
    }

    async fn upsert_chunks(&self, records: Vec<(ChunkRecord, Vec<f32>)>) -> Result<(), IndexError> {
        let points = records
            .into_iter()
            .map(|(record, vector)| Self::chunk_point(&record, vector))
            .collect::<Result<Vec<_>, _>>()?;

        self.client
            .upsert_points(UpsertPointsBuilder::new(&self.chunks_collection, points))
            .await?;

        Ok(())
    }

    async fn upsert_images(&self, records: Vec<(ImageRecord, Vec<f32>)>) -> Result<(), IndexError> {
        let points = records
            .into_iter()
            .map(|(record, vector)| Self::image_point(&record, vector))
            .collect::<Result<Vec<_>, _>>()?;

        self.client
            .upsert_points(UpsertPointsBuilder::new(&self.images_collection, points))
            .await?;

        Ok(())
    }
}
