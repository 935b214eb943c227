use archivist_llm::{Message, Role};

const GROUNDING_INSTRUCTION: &str = "\
You are a friendly and informative historian assistant that answers questions \
from the sources provided with each question. Be specific in your answers.\n\
Answer ONLY with the facts listed in the provided sources. If the question is \
not related to the sources, politely decline to answer. If there is not \
enough information in the sources, say you don't know. Do not generate \
answers that don't use the sources.\n\
Each source has an id followed by a semicolon and the actual information. \
Always include the source id for each fact you use, referenced in square \
brackets, e.g. [1-2-3]. Don't combine sources; list each id separately, \
e.g. [1-2-3][2-1-4].\n\
NEVER give out the original source text; always paraphrase.\n\
After answering, start a new line beginning with `Keywords: ` followed by \
3 keywords (names, places, etc.) describing your answer.";

/// Build the fixed system instruction, appending the keyword stoplist when
/// one is configured.
#[must_use]
pub fn build_system_prompt(keyword_stoplist: &[String]) -> String {
    let mut prompt = GROUNDING_INSTRUCTION.to_string();
    if !keyword_stoplist.is_empty() {
        prompt.push_str("\nDo NOT give any of these as keywords: ");
        prompt.push_str(&keyword_stoplist.join(", "));
        prompt.push('.');
    }
    prompt
}

/// Ordered role-tagged history of one chat session.
///
/// An explicit value owned by the caller: each turn reads it, and only a
/// fully successful turn commits to it. Lives for the session, never
/// persisted.
#[derive(Debug, Clone)]
pub struct ConversationContext {
    messages: Vec<Message>,
}

impl ConversationContext {
    #[must_use]
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self {
            messages: vec![Message::new(Role::System, system_prompt)],
        }
    }

    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Completed user/assistant exchanges so far.
    #[must_use]
    pub fn turn_count(&self) -> usize {
        (self.messages.len() - 1) / 2
    }

    /// Candidate message list for the next model call: the running history
    /// plus the new user turn. Does not mutate the context.
    #[must_use]
    pub fn with_user_turn(&self, content: &str) -> Vec<Message> {
        let mut messages = self.messages.clone();
        messages.push(Message::new(Role::User, content));
        messages
    }

    /// Commit a completed turn. Call only after every fallible step of the
    /// turn has succeeded.
    pub fn commit_turn(&mut self, user_turn: String, assistant_reply: String) {
        self.messages.push(Message::new(Role::User, user_turn));
        self.messages
            .push(Message::new(Role::Assistant, assistant_reply));
    }
}
