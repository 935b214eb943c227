//! CSV ingestion for the text and image corpora.
//!
//! Text rows are `(chapter, section, paragraph, content)`; the record id
//! `chapter-section-paragraph` defines the chunk-id contract neighbor
//! expansion depends on. Image rows are `(name, path, _, _, caption)` with
//! ids assigned as `batch-ordinal` starting at 1.

use std::path::Path;

use archivist_llm::LlmProvider;

use crate::error::IndexError;
use crate::key::ChunkKey;
use crate::store::ArchiveIndex;
use crate::types::{ChunkRecord, ImageRecord};

const UPSERT_BATCH: usize = 64;

/// Read text corpus rows from a CSV file.
///
/// Rows with fewer than four fields or a non-numeric paragraph ordinal
/// (e.g. a header row) are skipped with a warning.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not valid CSV.
pub fn read_chunk_rows(path: &Path) -> Result<Vec<ChunkRecord>, IndexError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)?;

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row?;
        let (Some(chapter), Some(section), Some(paragraph), Some(content)) =
            (row.get(0), row.get(1), row.get(2), row.get(3))
        else {
            tracing::warn!("skipping row with fewer than four fields");
            continue;
        };
        let Ok(paragraph) = paragraph.trim().parse::<u32>() else {
            tracing::warn!(paragraph, "skipping row with non-numeric paragraph ordinal");
            continue;
        };
        records.push(ChunkRecord {
            key: ChunkKey::new(chapter.trim(), section.trim(), paragraph),
            content: content.to_owned(),
        });
    }
    Ok(records)
}

/// Read image corpus rows from a CSV file, assigning ids `batch-ordinal`.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not valid CSV.
pub fn read_image_rows(path: &Path, batch: u32) -> Result<Vec<ImageRecord>, IndexError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)?;

    let mut records = Vec::new();
    let mut ordinal = 1u32;
    for row in reader.records() {
        let row = row?;
        let (Some(name), Some(path), Some(caption)) = (row.get(0), row.get(1), row.get(4)) else {
            tracing::warn!("skipping image row with missing fields");
            continue;
        };
        records.push(ImageRecord {
            id: format!("{batch}-{ordinal}"),
            name: name.to_owned(),
            path: path.to_owned(),
            caption: caption.to_owned(),
        });
        ordinal += 1;
    }
    Ok(records)
}

/// Embed and upload text chunks, returning the count uploaded.
///
/// # Errors
///
/// Returns an error if any embedding call or upsert fails; ingestion is
/// fail-fast, nothing is silently dropped.
pub async fn ingest_chunks<P: LlmProvider, I: ArchiveIndex>(
    provider: &P,
    index: &I,
    records: Vec<ChunkRecord>,
) -> Result<usize, IndexError> {
    if records.is_empty() {
        return Ok(0);
    }

    let probe = provider.embed("probe").await?;
    index.ensure_collections(u64::try_from(probe.len())?).await?;

    let total = records.len();
    let mut batch = Vec::with_capacity(UPSERT_BATCH);
    for record in records {
        let vector = provider.embed(&record.content).await?;
        batch.push((record, vector));
        if batch.len() == UPSERT_BATCH {
            index.upsert_chunks(std::mem::take(&mut batch)).await?;
        }
    }
    if !batch.is_empty() {
        index.upsert_chunks(batch).await?;
    }

    tracing::info!(total, "ingested text chunks");
    Ok(total)
}

/// Embed and upload image records, returning the count uploaded.
///
/// # Errors
///
/// Returns an error if any embedding call or upsert fails.
pub async fn ingest_images<P: LlmProvider, I: ArchiveIndex>(
    provider: &P,
    index: &I,
    records: Vec<ImageRecord>,
) -> Result<usize, IndexError> {
    if records.is_empty() {
        return Ok(0);
    }

    let probe = provider.embed("probe").await?;
    index.ensure_collections(u64::try_from(probe.len())?).await?;

    let total = records.len();
    let mut batch = Vec::with_capacity(UPSERT_BATCH);
    for record in records {
        let vector = provider.embed(&record.embedding_text()).await?;
        batch.push((record, vector));
        if batch.len() == UPSERT_BATCH {
            index.upsert_images(std::mem::take(&mut batch)).await?;
        }
    }
    if !batch.is_empty() {
        index.upsert_images(batch).await?;
    }

    tracing::info!(total, "ingested image records");
    Ok(total)
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::sync::Mutex;

    use archivist_llm::{LlmError, Message};

    use super::*;
    use crate::types::{ChunkHit, ImageHit};

    fn write_csv(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn read_chunk_rows_parses_fields() {
        let file = write_csv("4,1,1,\"The college opened in 1887.\"\n4,1,2,Second paragraph.\n");
        let records = read_chunk_rows(file.path()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].key, ChunkKey::new("4", "1", 1));
        assert_eq!(records[0].content, "The college opened in 1887.");
        assert_eq!(records[1].key, ChunkKey::new("4", "1", 2));
    }

    #[test]
    fn read_chunk_rows_skips_header_row() {
        let file = write_csv("Chapter,Section,Paragraph,Content\n1,1,1,text\n");
        let records = read_chunk_rows(file.path()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].key, ChunkKey::new("1", "1", 1));
    }

    #[test]
    fn read_chunk_rows_skips_short_rows() {
        let file = write_csv("1,1\n1,1,1,kept\n");
        let records = read_chunk_rows(file.path()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].content, "kept");
    }

    #[test]
    fn read_image_rows_assigns_batch_ids() {
        let file = write_csv(
            "tower.jpg,./jpg/tower.jpg,x,y,The clock tower\nhall.jpg,./jpg/hall.jpg,x,y,None\n",
        );
        let records = read_image_rows(file.path(), 2).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, "2-1");
        assert_eq!(records[0].caption, "The clock tower");
        assert_eq!(records[1].id, "2-2");
        assert_eq!(records[1].caption, "None");
    }

    struct StubProvider;

    impl LlmProvider for StubProvider {
        async fn chat(&self, _messages: &[Message]) -> Result<String, LlmError> {
            Ok("unused".into())
        }

        async fn embed(&self, _text: &str) -> Result<Vec<f32>, LlmError> {
            Ok(vec![0.0; 4])
        }

        fn supports_embeddings(&self) -> bool {
            true
        }

        fn name(&self) -> &'static str {
            "stub"
        }
    }

    #[derive(Default)]
    struct RecordingIndex {
        ensured: Mutex<Option<u64>>,
        chunk_upserts: Mutex<Vec<usize>>,
        image_upserts: Mutex<Vec<usize>>,
    }

    impl ArchiveIndex for RecordingIndex {
        async fn ensure_collections(&self, vector_size: u64) -> Result<(), IndexError> {
            *self.ensured.lock().unwrap() = Some(vector_size);
            Ok(())
        }

        async fn search_chunks(
            &self,
            _vector: &[f32],
            _limit: u64,
        ) -> Result<Vec<ChunkHit>, IndexError> {
            Ok(Vec::new())
        }

        async fn fetch_chunk(&self, _key: &ChunkKey) -> Result<Option<ChunkRecord>, IndexError> {
            Ok(None)
        }

        async fn search_images(
            &self,
            _vector: &[f32],
            _limit: u64,
        ) -> Result<Vec<ImageHit>, IndexError> {
            Ok(Vec::new())
        }

        async fn upsert_chunks(
            &self,
            records: Vec<(ChunkRecord, Vec<f32>)>,
        ) -> Result<(), IndexError> {
            self.chunk_upserts.lock().unwrap().push(records.len());
            Ok(())
        }

        async fn upsert_images(
            &self,
            records: Vec<(ImageRecord, Vec<f32>)>,
        ) -> Result<(), IndexError> {
            self.image_upserts.lock().unwrap().push(records.len());
            Ok(())
        }
    }

    fn chunk(paragraph: u32) -> ChunkRecord {
        ChunkRecord {
            key: ChunkKey::new("1", "1", paragraph),
            content: format!("paragraph {paragraph}"),
        }
    }

    #[tokio::test]
    async fn ingest_chunks_batches_upserts() {
        let index = RecordingIndex::default();
        let records: Vec<ChunkRecord> = (1..=130).map(chunk).collect();

        let count = ingest_chunks(&StubProvider, &index, records).await.unwrap();

        assert_eq!(count, 130);
        assert_eq!(*index.ensured.lock().unwrap(), Some(4));
        assert_eq!(*index.chunk_upserts.lock().unwrap(), vec![64, 64, 2]);
    }

    #[tokio::test]
    async fn ingest_chunks_empty_is_noop() {
        let index = RecordingIndex::default();
        let count = ingest_chunks(&StubProvider, &index, Vec::new())
            .await
            .unwrap();
        assert_eq!(count, 0);
        assert!(index.ensured.lock().unwrap().is_none());
    }

    #[tokio::test]
    async fn ingest_images_uploads_all() {
        let index = RecordingIndex::default();
        let records = vec![
            ImageRecord {
                id: "1-1".into(),
                name: "a.jpg".into(),
                path: "./a.jpg".into(),
                caption: "A".into(),
            },
            ImageRecord {
                id: "1-2".into(),
                name: "b.jpg".into(),
                path: "./b.jpg".into(),
                caption: "None".into(),
            },
        ];

        let count = ingest_images(&StubProvider, &index, records).await.unwrap();

        assert_eq!(count, 2);
        assert_eq!(*index.image_upserts.lock().unwrap(), vec![2]);
    }

    struct FailingProvider;

    impl LlmProvider for FailingProvider {
        async fn chat(&self, _messages: &[Message]) -> Result<String, LlmError> {
            Err(LlmError::Other("chat failed".into()))
        }

        async fn embed(&self, _text: &str) -> Result<Vec<f32>, LlmError> {
            Err(LlmError::Other("embed failed".into()))
        }

        fn supports_embeddings(&self) -> bool {
            false
        }

        fn name(&self) -> &'static str {
            "fail"
        }
    }

    #[tokio::test]
    async fn ingest_chunks_fails_fast_on_embed_error() {
        let index = RecordingIndex::default();
        let result = ingest_chunks(&FailingProvider, &index, vec![chunk(1)]).await;
        assert!(result.is_err());
        assert!(index.chunk_upserts.lock().unwrap().is_empty());
    }
}
