use crate::key::ChunkKey;

/// A stored paragraph-level unit of source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkRecord {
    pub key: ChunkKey,
    pub content: String,
}

/// A stored archive photo with its caption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRecord {
    pub id: String,
    pub name: String,
    pub path: String,
    pub caption: String,
}

impl ImageRecord {
    /// Text that gets embedded for this record.
    #[must_use]
    pub fn embedding_text(&self) -> String {
        format!("{}. {}", self.name, self.caption)
    }

    #[must_use]
    pub fn display_title(&self) -> String {
        display_title(&self.name, &self.caption)
    }
}

/// A similarity-search hit against the text collection.
#[derive(Debug, Clone)]
pub struct ChunkHit {
    pub key: ChunkKey,
    pub score: f32,
}

/// A similarity-search hit against the image collection.
#[derive(Debug, Clone)]
pub struct ImageHit {
    pub name: String,
    pub caption: String,
    pub score: f32,
}

impl ImageHit {
    #[must_use]
    pub fn display_title(&self) -> String {
        display_title(&self.name, &self.caption)
    }
}

/// A literal `"None"` caption signals that no caption was recorded at
/// ingestion time; fall back to a title derived from the filename.
fn display_title(name: &str, caption: &str) -> String {
    if caption.is_empty() || caption == "None" {
        title_from_filename(name)
    } else {
        caption.to_owned()
    }
}

/// Derive a human-readable title from an image filename: strip the extension
/// and digits, replace separators with spaces, capitalize each word.
#[must_use]
pub fn title_from_filename(filename: &str) -> String {
    let stem = filename
        .rsplit_once('.')
        .map_or(filename, |(stem, _)| stem);
    let cleaned: String = stem
        .chars()
        .filter(|c| !c.is_ascii_digit())
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    cleaned
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().collect::<String>() + chars.as_str()
            })
        })
        .collect::<Vec<_>>()
        .join(" ")
}
