//! Neighbor expansion of search hits.
//!
//! A similarity hit lands on one paragraph; its adjacent paragraphs usually
//! carry the surrounding argument. Expansion pulls in each hit's immediate
//! successor and predecessor in paragraph-ordinal space.

use std::collections::HashSet;
use std::fmt;

use archivist_index::{ArchiveIndex, ChunkKey};

use crate::error::PipelineError;

/// One chunk of grounding text, rendered into the prompt as
/// `"Source: <id>; Content: <text>"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroundedSource {
    pub key: ChunkKey,
    pub content: String,
}

impl fmt::Display for GroundedSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Source: {}; Content: {}", self.key, self.content)
    }
}

pub struct SectionExpander<'a, I: ArchiveIndex> {
    index: &'a I,
}

impl<'a, I: ArchiveIndex> SectionExpander<'a, I> {
    pub fn new(index: &'a I) -> Self {
        Self { index }
    }

    /// Expand ranked hits into a deduplicated, ordered grounding list.
    ///
    /// For each hit in rank order: the hit itself, then its successor, then
    /// its predecessor, each included only when present in the index and not
    /// already included. Output order is discovery order and is reproducible
    /// for a given input. Not-found lookups are the expected path and stay
    /// silent; transport errors propagate.
    ///
    /// # Errors
    ///
    /// Returns an error if a point lookup fails at the transport level.
    pub async fn expand(&self, hits: &[ChunkKey]) -> Result<Vec<GroundedSource>, PipelineError> {
        let mut seen = HashSet::new();
        let mut sources = Vec::new();

        for key in hits {
            self.push_if_found(key, &mut seen, &mut sources).await?;
            self.push_if_found(&key.successor(), &mut seen, &mut sources)
                .await?;
            if let Some(predecessor) = key.predecessor() {
                self.push_if_found(&predecessor, &mut seen, &mut sources)
                    .await?;
            }
        }

        Ok(sources)
    }

    async fn push_if_found(
        &self,
        key: &ChunkKey,
        seen: &mut HashSet<ChunkKey>,
        sources: &mut Vec<GroundedSource>,
    ) -> Result<(), PipelineError> {
        if seen.contains(key) {
            return Ok(());
        }
        match self.index.fetch_chunk(key).await? {
            Some(record) => {
                seen.insert(key.clone());
                sources.push(GroundedSource {
                    key: record.key,
                    content: record.content,
                });
            }
            None => tracing::debug!(%key, "no chunk at key"),
        }
        Ok(())
    }
}
