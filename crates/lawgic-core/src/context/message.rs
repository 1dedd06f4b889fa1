use crate::constants::chat::{GREETING_ID, GREETING_TEXT};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Bot,
}

/// Name and media type of a file the user attached to a turn.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AttachmentInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub mime_type: String,
}

/// A grounding source shown alongside a bot reply. Always has a uri.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Citation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub uri: String,
}

impl Citation {
    /// Title if the source has one, otherwise the uri.
    pub fn label(&self) -> &str {
        match self.title.as_deref() {
            Some(title) if !title.is_empty() => title,
            _ => &self.uri,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    pub id: String,
    pub text: String,
    pub sender: Sender,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment: Option<AttachmentInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub citations: Option<Vec<Citation>>,
}

impl ChatMessage {
    pub fn new(sender: Sender, text: impl Into<String>) -> Self {
        Self {
            id: generate_id(),
            text: text.into(),
            sender,
            timestamp: Utc::now(),
            attachment: None,
            citations: None,
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Sender::User, text)
    }

    pub fn bot(text: impl Into<String>) -> Self {
        Self::new(Sender::Bot, text)
    }

    /// The fixed welcome message that opens a fresh conversation.
    pub fn greeting(text: Option<&str>) -> Self {
        Self {
            id: GREETING_ID.to_string(),
            ..Self::bot(text.unwrap_or(GREETING_TEXT))
        }
    }

    pub fn with_attachment(mut self, attachment: AttachmentInfo) -> Self {
        self.attachment = Some(attachment);
        self
    }

    /// Attach citations; an empty list leaves the field unset.
    pub fn with_citations(mut self, citations: Vec<Citation>) -> Self {
        self.citations = (!citations.is_empty()).then_some(citations);
        self
    }

    pub fn is_greeting(&self) -> bool {
        self.id == GREETING_ID
    }

    pub fn citations(&self) -> &[Citation] {
        self.citations.as_deref().unwrap_or(&[])
    }
}

/// Unix milliseconds, zero padded so ids sort by creation time, plus a random
/// suffix so ids minted in the same millisecond stay distinct.
pub fn generate_id() -> String {
    let millis = Utc::now().timestamp_millis();
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("{millis:013}-{}", &suffix[..12])
}
