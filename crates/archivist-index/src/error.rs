#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("Qdrant error: {0}")]
    Qdrant(#[from] Box<qdrant_client::QdrantError>),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("LLM error: {0}")]
    Llm(#[from] archivist_llm::LlmError),

    #[error("integer conversion: {0}")]
    IntConversion(#[from] std::num::TryFromIntError),

    #[error("{0}")]
    Other(String),
}

impl From<qdrant_client::QdrantError> for IndexError {
    fn from(e: qdrant_client::QdrantError) -> Self {
        Self::Qdrant(Box::new(e))
    }
}
