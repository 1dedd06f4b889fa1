pub mod chat;
pub mod config;
pub mod constants;
pub mod context;
pub mod error;
pub mod llm;

// Re-export key types
pub use chat::{ChatController, ChatView, PendingAttachment, TurnEvent, TurnOutcome, TurnPhase};
pub use config::Settings;
pub use context::{ChatMessage, Citation, ConversationStore, KeyValueStore, MemoryStore, Sender};
pub use error::LawgicError;
pub use llm::{ChatSession, GeminiClient, ModelBackend, Part, PartialResponse, StreamEvent};
