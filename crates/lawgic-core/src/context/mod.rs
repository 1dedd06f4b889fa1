mod citations;
mod history;
mod message;
mod storage;
mod store;

pub use citations::dedup_citations;
pub use history::{decode_history, encode_history};
pub use message::{generate_id, AttachmentInfo, ChatMessage, Citation, Sender};
pub use storage::{FileStore, KeyValueStore, MemoryStore};
pub use store::{ConversationStore, StoreOptions};
