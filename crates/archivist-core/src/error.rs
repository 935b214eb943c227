#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("LLM error: {0}")]
    Llm(#[from] archivist_llm::LlmError),

    #[error("index error: {0}")]
    Index(#[from] archivist_index::IndexError),
}
