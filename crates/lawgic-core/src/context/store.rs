use crate::constants::chat::{GREETING_TEXT, HISTORY_KEY};
use crate::context::history::{decode_history, encode_history};
use crate::context::message::{ChatMessage, Sender};
use crate::context::storage::KeyValueStore;
use crate::error::LawgicError;
use crate::llm::Content;

/// Where the store persists and what it greets with.
#[derive(Debug, Clone)]
pub struct StoreOptions {
    pub key: String,
    pub greeting: String,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            key: HISTORY_KEY.to_string(),
            greeting: GREETING_TEXT.to_string(),
        }
    }
}

/// Owns the canonical message list and keeps the persisted slot in sync
/// with it. Never empty once initialized.
pub struct ConversationStore {
    storage: Box<dyn KeyValueStore>,
    options: StoreOptions,
    messages: Vec<ChatMessage>,
}

impl ConversationStore {
    /// Restore persisted history, or start from the greeting.
    ///
    /// A blob that fails validation is discarded as a whole; the fault is
    /// logged and never reported to the caller.
    pub fn initialize(storage: Box<dyn KeyValueStore>, options: StoreOptions) -> Self {
        let mut store = Self {
            storage,
            options,
            messages: Vec::new(),
        };

        match store.restore() {
            Ok(Some(messages)) if !messages.is_empty() => {
                tracing::debug!(count = messages.len(), "restored chat history");
                store.messages = messages;
            }
            Ok(_) => store.start_fresh(),
            Err(e) => {
                tracing::warn!("Failed to restore chat history, starting fresh: {e}");
                if let Err(e) = store.storage.remove(&store.options.key) {
                    tracing::warn!("Failed to clear invalid chat history: {e}");
                }
                store.start_fresh();
            }
        }

        store
    }

    fn restore(&self) -> Result<Option<Vec<ChatMessage>>, LawgicError> {
        match self.storage.get(&self.options.key)? {
            Some(raw) => decode_history(&raw).map(Some),
            None => Ok(None),
        }
    }

    fn start_fresh(&mut self) {
        self.messages = vec![ChatMessage::greeting(Some(&self.options.greeting))];
        if let Err(e) = self.persist() {
            tracing::warn!("Failed to persist greeting: {e}");
        }
    }

    fn persist(&self) -> Result<(), LawgicError> {
        let raw = encode_history(&self.messages)?;
        self.storage.set(&self.options.key, &raw)
    }

    /// Add a committed message and write the whole list through.
    ///
    /// The message stays in memory even if the write fails.
    pub fn append(&mut self, message: ChatMessage) -> Result<&[ChatMessage], LawgicError> {
        self.messages.push(message);
        self.persist()?;
        Ok(&self.messages)
    }

    /// Drop all history, persisted and in memory, back to the greeting.
    pub fn reset(&mut self) {
        if let Err(e) = self.storage.remove(&self.options.key) {
            tracing::warn!("Failed to clear chat history: {e}");
        }
        self.start_fresh();
        tracing::info!("chat history reset");
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn last_message(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    /// Prior turns as the model should see them: chronological, leading
    /// greeting excluded, text only.
    pub fn model_history(&self) -> Vec<Content> {
        let skip = usize::from(self.messages.first().is_some_and(ChatMessage::is_greeting));

        self.messages
            .iter()
            .skip(skip)
            .filter(|m| !m.text.trim().is_empty())
            .map(|m| match m.sender {
                Sender::User => Content::user(m.text.clone()),
                Sender::Bot => Content::model(m.text.clone()),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::storage::MemoryStore;
    use crate::llm::Role;

    #[test]
    fn test_model_history_skips_greeting_and_maps_roles() {
        let mut store = ConversationStore::initialize(Box::new(MemoryStore::new()), StoreOptions::default());
        store.append(ChatMessage::user("q1")).unwrap();
        store.append(ChatMessage::bot("a1")).unwrap();

        let history = store.model_history();
        assert_eq!(history, vec![Content::user("q1"), Content::model("a1")]);
        assert_eq!(history[1].role, Role::Model);
    }

    #[test]
    fn test_model_history_skips_blank_text() {
        let mut store = ConversationStore::initialize(Box::new(MemoryStore::new()), StoreOptions::default());
        store.append(ChatMessage::user("")).unwrap();
        store.append(ChatMessage::bot("a")).unwrap();
        assert_eq!(store.model_history(), vec![Content::model("a")]);
    }

    #[test]
    fn test_custom_greeting_and_key() {
        let storage = MemoryStore::new();
        let options = StoreOptions {
            key: "custom".into(),
            greeting: "Hello!".into(),
        };
        let store = ConversationStore::initialize(Box::new(storage.clone()), options);
        assert_eq!(store.messages()[0].text, "Hello!");
        assert!(storage.get("custom").unwrap().is_some());
        assert!(storage.get(HISTORY_KEY).unwrap().is_none());
    }
}
