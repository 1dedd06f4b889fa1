use crate::error::LawgicError;
use serde::{Deserialize, Serialize};

/// Speaker of a content block as the model API names it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    /// Base64-encoded payload.
    pub data: String,
}

/// One element of a turn's input.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum Part {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn inline_data(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self::InlineData {
            inline_data: InlineData {
                mime_type: mime_type.into(),
                data: data.into(),
            },
        }
    }
}

/// A role-tagged block of parts, the unit of session history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Content {
    pub role: Role,
    pub parts: Vec<Part>,
}

impl Content {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            parts: vec![Part::text(text)],
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            parts: vec![Part::text(text)],
        }
    }
}

/// A grounding source as reported by the model. Either field may be missing.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CitationRecord {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub uri: Option<String>,
}

impl CitationRecord {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            title: None,
            uri: Some(uri.into()),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

/// One increment of a streamed reply.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartialResponse {
    pub text: Option<String>,
    pub citations: Vec<CitationRecord>,
}

impl PartialResponse {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            citations: Vec::new(),
        }
    }

    pub fn citations(citations: Vec<CitationRecord>) -> Self {
        Self {
            text: None,
            citations,
        }
    }
}

/// Events emitted during a streamed turn.
#[derive(Debug, Clone)]
pub enum StreamEvent {
    Partial(PartialResponse),
    Done,
    Error(String),
}

/// Tools the model may use while answering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelTool {
    GoogleSearch,
}

/// Everything fixed for the lifetime of a session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub model: String,
    pub system_instruction: Option<String>,
    pub tools: Vec<ModelTool>,
}

impl SessionConfig {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            system_instruction: None,
            tools: Vec::new(),
        }
    }

    pub fn with_system_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = Some(instruction.into());
        self
    }

    pub fn with_tool(mut self, tool: ModelTool) -> Self {
        if !self.tools.contains(&tool) {
            self.tools.push(tool);
        }
        self
    }
}

/// A stateful conversation with the model. Implementations keep their own
/// context: every completed turn becomes part of the history sent with the next.
#[async_trait::async_trait]
pub trait ChatSession: Send {
    /// Send one user turn and get the reply as a stream of events.
    async fn stream_turn(
        &mut self,
        parts: Vec<Part>,
    ) -> Result<futures::channel::mpsc::UnboundedReceiver<StreamEvent>, LawgicError>;
}

/// Creates sessions, optionally seeded with a replay of prior turns.
#[async_trait::async_trait]
pub trait ModelBackend: Send + Sync {
    async fn create_session(
        &self,
        config: &SessionConfig,
        history: Vec<Content>,
    ) -> Result<Box<dyn ChatSession>, LawgicError>;
}
