//! Post-hoc relevance filtering of image candidates against a generated
//! answer.
//!
//! The judgment is delegated to the chat model, whose output is untrusted: a
//! model can hallucinate filenames. Every returned name is intersected with
//! the known candidate set before anything downstream sees it.

use std::collections::HashSet;

use archivist_index::ImageHit;
use archivist_llm::{LlmProvider, Message, Role};

use crate::error::PipelineError;

const FILTER_INSTRUCTION: &str = "\
Below is a section of text, followed by a list of images.\n\
If the text is not a historical answer, i.e. a description or explanation of \
historical events or people, return an empty string.\n\
Otherwise, based on the image titles and captions, filter and remove any \
images with titles, captions, or content that cannot be found or are not \
included in the text. For instance, if the text does not explicitly include \
the name 'James Cantlie', remove 'Sir James Cantlie.jpg' from the image \
list. Remove as many images as possible.\n\
Return only the filenames of the images, each separated by a newline.";

/// Outcome of the validation boundary around the model's filter reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterVerdict {
    /// Names that survived both the model's pruning and the intersection
    /// with the candidate set. May be empty.
    Accepted(Vec<String>),
    /// The reply was unusable: nothing it named is a known candidate.
    Rejected(String),
}

pub struct ImageFilter<'a, P: LlmProvider> {
    provider: &'a P,
}

impl<'a, P: LlmProvider> ImageFilter<'a, P> {
    pub fn new(provider: &'a P) -> Self {
        Self { provider }
    }

    /// Ask the model which candidates the answer text supports, then
    /// validate its reply against the candidate set.
    ///
    /// The returned subset preserves no particular order guarantee beyond
    /// the model's reply order; callers match names back to candidates.
    ///
    /// # Errors
    ///
    /// Returns an error if the chat call fails.
    pub async fn filter(
        &self,
        answer: &str,
        candidates: &[ImageHit],
    ) -> Result<FilterVerdict, PipelineError> {
        if candidates.is_empty() {
            return Ok(FilterVerdict::Accepted(Vec::new()));
        }

        let mut listing = String::new();
        for candidate in candidates {
            listing.push_str(&format!(
                "Image: {}; Caption: {}\n",
                candidate.name, candidate.caption
            ));
        }

        let messages = [
            Message::new(Role::System, FILTER_INSTRUCTION),
            Message::new(Role::User, format!("{answer}\n\n{listing}")),
        ];

        let reply = self.provider.chat(&messages).await?;
        Ok(validate(&reply, candidates))
    }
}

fn validate(reply: &str, candidates: &[ImageHit]) -> FilterVerdict {
    let known: HashSet<&str> = candidates.iter().map(|c| c.name.as_str()).collect();

    let mut kept: Vec<String> = Vec::new();
    let mut unknown = 0usize;
    for line in reply.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if known.contains(line) {
            if !kept.iter().any(|k| k == line) {
                kept.push(line.to_owned());
            }
        } else {
            tracing::warn!(name = line, "dropping filter result outside candidate set");
            unknown += 1;
        }
    }

    if kept.is_empty() && unknown > 0 {
        FilterVerdict::Rejected(format!(
            "{unknown} returned name(s), none in the candidate set"
        ))
    } else {
        FilterVerdict::Accepted(kept)
    }
}

#[cfg(test)]
mod tests {
    use archivist_llm::LlmError;

    use super::*;

    struct StubProvider {
        reply: String,
    }

    impl LlmProvider for StubProvider {
        async fn chat(&self, _messages: &[Message]) -> Result<String, LlmError> {
            Ok(self.reply.clone())
        }

        async fn embed(&self, _text: &str) -> Result<Vec<f32>, LlmError> {
            Err(LlmError::EmbedUnsupported { provider: "stub" })
        }

        fn supports_embeddings(&self) -> bool {
            false
        }

        fn name(&self) -> &'static str {
            "stub"
        }
    }

    fn candidate(name: &str, caption: &str) -> ImageHit {
        ImageHit {
            name: name.into(),
            caption: caption.into(),
            score: 0.9,
        }
    }

    #[tokio::test]
    async fn keeps_names_from_candidate_set() {
        let provider = StubProvider {
            reply: "tower.jpg\nhall.jpg".into(),
        };
        let candidates = vec![
            candidate("tower.jpg", "The clock tower"),
            candidate("hall.jpg", "The great hall"),
            candidate("portrait.jpg", "A portrait"),
        ];

        let verdict = ImageFilter::new(&provider)
            .filter("answer about the tower and the hall", &candidates)
            .await
            .unwrap();

        assert_eq!(
            verdict,
            FilterVerdict::Accepted(vec!["tower.jpg".into(), "hall.jpg".into()])
        );
    }

    #[tokio::test]
    async fn hallucinated_name_is_dropped() {
        let provider = StubProvider {
            reply: "tower.jpg\ninvented.jpg".into(),
        };
        let candidates = vec![candidate("tower.jpg", "The clock tower")];

        let verdict = ImageFilter::new(&provider)
            .filter("answer", &candidates)
            .await
            .unwrap();

        let FilterVerdict::Accepted(names) = verdict else {
            panic!("expected accepted verdict");
        };
        assert_eq!(names, vec!["tower.jpg".to_owned()]);
    }

    #[tokio::test]
    async fn unsupported_candidate_pruned_by_model() {
        // Answer never mentions Cantlie; a faithful model reply omits the
        // portrait, and the validated subset must too.
        let provider = StubProvider {
            reply: "old_campus.jpg".into(),
        };
        let candidates = vec![
            candidate("old_campus.jpg", "The old campus"),
            candidate("Sir James Cantlie.jpg", "James Cantlie portrait"),
        ];

        let verdict = ImageFilter::new(&provider)
            .filter("The campus buildings were completed in 1912. [2-1-1]", &candidates)
            .await
            .unwrap();

        let FilterVerdict::Accepted(names) = verdict else {
            panic!("expected accepted verdict");
        };
        assert!(!names.contains(&"Sir James Cantlie.jpg".to_owned()));
    }

    #[tokio::test]
    async fn all_unknown_names_reject() {
        let provider = StubProvider {
            reply: "ghost1.jpg\nghost2.jpg".into(),
        };
        let candidates = vec![candidate("tower.jpg", "The clock tower")];

        let verdict = ImageFilter::new(&provider)
            .filter("answer", &candidates)
            .await
            .unwrap();

        assert!(matches!(verdict, FilterVerdict::Rejected(_)));
    }

    #[tokio::test]
    async fn empty_reply_accepts_nothing() {
        let provider = StubProvider { reply: String::new() };
        let candidates = vec![candidate("tower.jpg", "The clock tower")];

        let verdict = ImageFilter::new(&provider)
            .filter("not a historical answer", &candidates)
            .await
            .unwrap();

        assert_eq!(verdict, FilterVerdict::Accepted(Vec::new()));
    }

    #[tokio::test]
    async fn empty_candidates_skip_model_call() {
        struct PanicProvider;

        impl LlmProvider for PanicProvider {
            async fn chat(&self, _messages: &[Message]) -> Result<String, LlmError> {
                panic!("filter must not call the model with no candidates");
            }

            async fn embed(&self, _text: &str) -> Result<Vec<f32>, LlmError> {
                Err(LlmError::EmbedUnsupported { provider: "stub" })
            }

            fn supports_embeddings(&self) -> bool {
                false
            }

            fn name(&self) -> &'static str {
                "panic"
            }
        }

        let verdict = ImageFilter::new(&PanicProvider)
            .filter("answer", &[])
            .await
            .unwrap();

        assert_eq!(verdict, FilterVerdict::Accepted(Vec::new()));
    }

    #[tokio::test]
    async fn duplicate_reply_lines_deduplicate() {
        let provider = StubProvider {
            reply: "tower.jpg\ntower.jpg".into(),
        };
        let candidates = vec![candidate("tower.jpg", "The clock tower")];

        let verdict = ImageFilter::new(&provider)
            .filter("answer", &candidates)
            .await
            .unwrap();

        assert_eq!(verdict, FilterVerdict::Accepted(vec!["tower.jpg".into()]));
    }

    #[test]
    fn validate_subset_property() {
        let candidates = vec![
            candidate("a.jpg", ""),
            candidate("b.jpg", ""),
        ];
        let verdict = validate("b.jpg\nz.jpg\na.jpg", &candidates);
        let FilterVerdict::Accepted(names) = verdict else {
            panic!("expected accepted verdict");
        };
        for name in &names {
            assert!(candidates.iter().any(|c| &c.name == name));
        }
    }
}
