use std::fmt;
use std::str::FromStr;

/// Composite positional id of a stored paragraph chunk, rendered as
/// `"chapter-section-paragraph"`.
///
/// The paragraph ordinal is the basis of neighbor lookup: ordinals are
/// assumed contiguous from 1 within a (chapter, section) pair. Neighbor
/// arithmetic never inspects the chapter/section labels.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChunkKey {
    pub chapter: String,
    pub section: String,
    pub paragraph: u32,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("malformed chunk id: {0:?}")]
pub struct ParseChunkKeyError(String);

impl ChunkKey {
    #[must_use]
    pub fn new(chapter: impl Into<String>, section: impl Into<String>, paragraph: u32) -> Self {
        Self {
            chapter: chapter.into(),
            section: section.into(),
            paragraph,
        }
    }

    /// Key of the next paragraph in the same section.
    #[must_use]
    pub fn successor(&self) -> Self {
        Self {
            chapter: self.chapter.clone(),
            section: self.section.clone(),
            paragraph: self.paragraph + 1,
        }
    }

    /// Key of the previous paragraph in the same section.
    ///
    /// Returns `None` only when the ordinal would underflow below zero.
    /// Ordinal 0 itself is a representable key; stored ordinals start at 1,
    /// so looking it up simply comes back not-found.
    #[must_use]
    pub fn predecessor(&self) -> Option<Self> {
        self.paragraph.checked_sub(1).map(|paragraph| Self {
            chapter: self.chapter.clone(),
            section: self.section.clone(),
            paragraph,
        })
    }
}

impl fmt::Display for ChunkKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.chapter, self.section, self.paragraph)
    }
}

impl FromStr for ChunkKey {
    type Err = ParseChunkKeyError;

    /// Parse a `"chapter-section-paragraph"` id.
    ///
    /// The last `-`-separated field is the paragraph ordinal and the first is
    /// the chapter, so section labels may themselves contain dashes.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseChunkKeyError(s.to_owned());
        let (rest, paragraph) = s.rsplit_once('-').ok_or_else(err)?;
        let (chapter, section) = rest.split_once('-').ok_or_else(err)?;
        if chapter.is_empty() || section.is_empty() {
            return Err(err());
        }
        let paragraph = paragraph.parse::<u32>().map_err(|_| err())?;
        Ok(Self::new(chapter, section, paragraph))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_round_trip() {
        let key = ChunkKey::new("4", "2", 7);
        assert_eq!(key.to_string(), "4-2-7");
        assert_eq!("4-2-7".parse::<ChunkKey>().unwrap(), key);
    }

    #[test]
    fn parse_dashed_section_label() {
        let key = "intro-part-one-3".parse::<ChunkKey>().unwrap();
        assert_eq!(key.chapter, "intro");
        assert_eq!(key.section, "part-one");
        assert_eq!(key.paragraph, 3);
    }

    #[test]
    fn parse_rejects_malformed() {
        assert!("".parse::<ChunkKey>().is_err());
        assert!("1-2".parse::<ChunkKey>().is_err());
        assert!("1-2-x".parse::<ChunkKey>().is_err());
        assert!("-2-3".parse::<ChunkKey>().is_err());
        assert!("1--3".parse::<ChunkKey>().is_err());
    }

    #[test]
    fn successor_increments_paragraph_only() {
        let key = ChunkKey::new("1", "1", 1);
        let next = key.successor();
        assert_eq!(next, ChunkKey::new("1", "1", 2));
        assert_eq!(next.chapter, "1");
        assert_eq!(next.section, "1");
    }

    #[test]
    fn predecessor_reaches_ordinal_zero() {
        let key = ChunkKey::new("1", "1", 1);
        assert_eq!(key.predecessor(), Some(ChunkKey::new("1", "1", 0)));
    }

    #[test]
    fn predecessor_underflow_is_none() {
        let key = ChunkKey::new("1", "1", 0);
        assert_eq!(key.predecessor(), None);
    }
}
