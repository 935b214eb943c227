use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::secret::Secret;

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(skip)]
    pub secrets: ResolvedSecrets,
}

/// LLM provider backend selector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    OpenAi,
    Azure,
}

impl ProviderKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Azure => "azure",
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct LlmConfig {
    #[serde(default)]
    pub provider: ProviderKind,
    /// OpenAI API base URL, or the Azure resource endpoint.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Chat model id, or the Azure chat deployment name.
    #[serde(default = "default_model")]
    pub model: String,
    /// Embedding model id, or the Azure embedding deployment name.
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
    /// Azure API version; ignored by the plain OpenAI backend.
    #[serde(default = "default_api_version")]
    pub api_version: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".into()
}

fn default_model() -> String {
    "gpt-4o-mini".into()
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".into()
}

fn default_api_version() -> String {
    "2024-02-01".into()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    1024
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::default(),
            base_url: default_base_url(),
            model: default_model(),
            embedding_model: default_embedding_model(),
            api_version: default_api_version(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct IndexConfig {
    #[serde(default = "default_index_url")]
    pub url: String,
    #[serde(default = "default_chunks_collection")]
    pub chunks_collection: String,
    #[serde(default = "default_images_collection")]
    pub images_collection: String,
}

fn default_index_url() -> String {
    "http://localhost:6334".into()
}

fn default_chunks_collection() -> String {
    "archive_chunks".into()
}

fn default_images_collection() -> String {
    "archive_images".into()
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            url: default_index_url(),
            chunks_collection: default_chunks_collection(),
            images_collection: default_images_collection(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PipelineConfig {
    #[serde(default = "default_top_k")]
    pub text_top_k: u64,
    #[serde(default = "default_top_k")]
    pub image_top_k: u64,
    /// Terms the model is told never to emit as answer keywords, typically
    /// the archive's own institution names.
    #[serde(default)]
    pub keyword_stoplist: Vec<String>,
}

fn default_top_k() -> u64 {
    5
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            text_top_k: default_top_k(),
            image_top_k: default_top_k(),
            keyword_stoplist: Vec::new(),
        }
    }
}

#[derive(Debug, Default)]
pub struct ResolvedSecrets {
    pub api_key: Option<Secret>,
}

impl Config {
    /// Load configuration from a TOML file with env var overrides.
    ///
    /// Falls back to defaults when the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str::<Self>(&content).context("failed to parse config file")?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("ARCHIVIST_LLM_PROVIDER") {
            match val.as_str() {
                "openai" => self.llm.provider = ProviderKind::OpenAi,
                "azure" => self.llm.provider = ProviderKind::Azure,
                other => tracing::warn!(provider = other, "unknown ARCHIVIST_LLM_PROVIDER value"),
            }
        }
        if let Ok(val) = std::env::var("ARCHIVIST_LLM_BASE_URL") {
            self.llm.base_url = val;
        }
        if let Ok(val) = std::env::var("ARCHIVIST_LLM_MODEL") {
            self.llm.model = val;
        }
        if let Ok(val) = std::env::var("ARCHIVIST_EMBEDDING_MODEL") {
            self.llm.embedding_model = val;
        }
        if let Ok(val) = std::env::var("ARCHIVIST_INDEX_URL") {
            self.index.url = val;
        }
    }

    /// Resolve the API key from the environment.
    ///
    /// Keys never live in the config file.
    pub fn resolve_secrets(&mut self) {
        if let Ok(val) = std::env::var("ARCHIVIST_API_KEY") {
            self.secrets.api_key = Some(Secret::new(val));
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use serial_test::serial;

    use super::*;

    #[test]
    fn defaults_when_file_missing() {
        let config = Config::load(Path::new("/does/not/exist.toml")).unwrap();
        assert_eq!(config.llm.provider, ProviderKind::OpenAi);
        assert_eq!(config.llm.base_url, "https://api.openai.com/v1");
        assert_eq!(config.pipeline.text_top_k, 5);
        assert_eq!(config.index.chunks_collection, "archive_chunks");
        assert!(config.pipeline.keyword_stoplist.is_empty());
        assert!(config.secrets.api_key.is_none());
    }

    #[test]
    fn parses_toml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[llm]
provider = "azure"
base_url = "https://example.openai.azure.com"
model = "summer"
embedding_model = "textembedding"

[index]
url = "http://qdrant:6334"

[pipeline]
text_top_k = 3
keyword_stoplist = ["Example University"]
"#
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.llm.provider, ProviderKind::Azure);
        assert_eq!(config.llm.model, "summer");
        assert_eq!(config.index.url, "http://qdrant:6334");
        assert_eq!(config.pipeline.text_top_k, 3);
        assert_eq!(config.pipeline.image_top_k, 5);
        assert_eq!(
            config.pipeline.keyword_stoplist,
            vec!["Example University".to_owned()]
        );
    }

    #[test]
    fn rejects_invalid_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[llm").unwrap();
        assert!(Config::load(file.path()).is_err());
    }

    #[test]
    #[serial]
    fn env_overrides_apply() {
        unsafe { std::env::set_var("ARCHIVIST_INDEX_URL", "http://override:6334") };
        let config = Config::load(Path::new("/does/not/exist.toml")).unwrap();
        unsafe { std::env::remove_var("ARCHIVIST_INDEX_URL") };
        assert_eq!(config.index.url, "http://override:6334");
    }

    #[test]
    #[serial]
    fn env_provider_override() {
        unsafe { std::env::set_var("ARCHIVIST_LLM_PROVIDER", "azure") };
        let config = Config::load(Path::new("/does/not/exist.toml")).unwrap();
        unsafe { std::env::remove_var("ARCHIVIST_LLM_PROVIDER") };
        assert_eq!(config.llm.provider, ProviderKind::Azure);
    }

    #[test]
    #[serial]
    fn resolve_secrets_reads_env() {
        let mut config = Config::default();
        unsafe { std::env::set_var("ARCHIVIST_API_KEY", "test-key") };
        config.resolve_secrets();
        unsafe { std::env::remove_var("ARCHIVIST_API_KEY") };
        assert_eq!(config.secrets.api_key.unwrap().expose(), "test-key");
    }

    #[test]
    fn provider_kind_display() {
        assert_eq!(ProviderKind::OpenAi.to_string(), "openai");
        assert_eq!(ProviderKind::Azure.to_string(), "azure");
    }
}
