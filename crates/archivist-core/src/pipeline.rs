//! The per-query pipeline: embed, search, expand, answer, filter images.
//!
//! Strictly sequential; every step is a call to an external service. The
//! conversation context is the only mutable state and is committed once, at
//! the end, so a failed turn leaves no trace in the history.

use archivist_index::{ArchiveIndex, ChunkKey, ImageHit};
use archivist_llm::LlmProvider;

use crate::config::PipelineConfig;
use crate::context::ConversationContext;
use crate::error::PipelineError;
use crate::expander::{GroundedSource, SectionExpander};
use crate::image_filter::{FilterVerdict, ImageFilter};
use crate::keywords::extract_keywords;

/// Everything one successful turn produces. Ephemeral, never stored.
#[derive(Debug, Clone)]
pub struct TurnOutput {
    pub answer: String,
    pub sources: Vec<GroundedSource>,
    pub images: Vec<ImageHit>,
    pub keywords: Vec<String>,
}

pub struct ChatPipeline<P: LlmProvider, I: ArchiveIndex> {
    provider: P,
    index: I,
    config: PipelineConfig,
}

impl<P: LlmProvider, I: ArchiveIndex> ChatPipeline<P, I> {
    pub fn new(provider: P, index: I, config: PipelineConfig) -> Self {
        Self {
            provider,
            index,
            config,
        }
    }

    /// Run one query through the full pipeline.
    ///
    /// The context is mutated only on success: a turn that fails at any step
    /// commits nothing.
    ///
    /// # Errors
    ///
    /// Returns an error if an embedding, search, or chat call fails. The
    /// error is query-level; the caller may retry the same query against the
    /// unchanged context.
    pub async fn process_turn(
        &self,
        query: &str,
        ctx: &mut ConversationContext,
    ) -> Result<TurnOutput, PipelineError> {
        let query_vector = self.provider.embed(query).await?;
        let hits = self
            .index
            .search_chunks(&query_vector, self.config.text_top_k)
            .await?;
        let keys: Vec<ChunkKey> = hits.into_iter().map(|h| h.key).collect();
        tracing::debug!(hits = keys.len(), "text search complete");

        let sources = SectionExpander::new(&self.index).expand(&keys).await?;

        let user_turn = build_user_turn(query, &sources);
        let messages = ctx.with_user_turn(&user_turn);
        let answer = self.provider.chat(&messages).await?;

        let keywords = extract_keywords(&answer);
        let images = if keywords.is_empty() {
            tracing::debug!("no keyword line in answer, skipping image retrieval");
            Vec::new()
        } else {
            self.retrieve_images(&answer, &keywords).await?
        };

        ctx.commit_turn(user_turn, answer.clone());

        Ok(TurnOutput {
            answer,
            sources,
            images,
            keywords,
        })
    }

    async fn retrieve_images(
        &self,
        answer: &str,
        keywords: &[String],
    ) -> Result<Vec<ImageHit>, PipelineError> {
        let vector = self.provider.embed(&keywords.join(", ")).await?;
        let candidates = self
            .index
            .search_images(&vector, self.config.image_top_k)
            .await?;

        match ImageFilter::new(&self.provider)
            .filter(answer, &candidates)
            .await?
        {
            FilterVerdict::Accepted(names) => Ok(candidates
                .into_iter()
                .filter(|c| names.contains(&c.name))
                .collect()),
            FilterVerdict::Rejected(reason) => {
                tracing::warn!(%reason, "image filter reply unusable, dropping all candidates");
                Ok(Vec::new())
            }
        }
    }
}

/// The latest user turn carries the grounding verbatim: the query followed by
/// the rendered source strings, space-joined.
fn build_user_turn(query: &str, sources: &[GroundedSource]) -> String {
    if sources.is_empty() {
        return query.to_owned();
    }
    let grounding = sources
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ");
    format!("{query} {grounding}")
}
