use crate::constants::endpoints::GEMINI_BASE_URL;
use crate::error::LawgicError;
use crate::llm::traits::*;
use futures::channel::mpsc;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, PoisonError};

/// Gemini REST backend. Sessions are client-side: each keeps the running
/// history and sends it with every turn.
#[derive(Clone)]
pub struct GeminiClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>) -> Result<Self, LawgicError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(LawgicError::Config(
                "Gemini API key is empty. Please configure it to use the chatbot.".into(),
            ));
        }
        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: GEMINI_BASE_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }
}

#[async_trait::async_trait]
impl ModelBackend for GeminiClient {
    async fn create_session(
        &self,
        config: &SessionConfig,
        history: Vec<Content>,
    ) -> Result<Box<dyn ChatSession>, LawgicError> {
        if config.model.trim().is_empty() {
            return Err(LawgicError::SessionInit("model name is empty".into()));
        }
        validate_history(&history)?;
        tracing::info!(model = %config.model, turns = history.len(), "Gemini session created");

        Ok(Box::new(GeminiSession {
            client: self.client.clone(),
            api_key: self.api_key.clone(),
            url: format!(
                "{}/models/{}:streamGenerateContent?alt=sse",
                self.base_url, config.model
            ),
            system_instruction: config.system_instruction.clone(),
            tools: config.tools.clone(),
            history: Arc::new(Mutex::new(history)),
        }))
    }
}

fn validate_history(history: &[Content]) -> Result<(), LawgicError> {
    for (index, content) in history.iter().enumerate() {
        if content.parts.is_empty() {
            return Err(LawgicError::SessionInit(format!(
                "history entry {index} has no parts"
            )));
        }
        let has_empty_text = content
            .parts
            .iter()
            .any(|p| matches!(p, Part::Text { text } if text.is_empty()));
        if has_empty_text {
            return Err(LawgicError::SessionInit(format!(
                "history entry {index} contains an empty text part"
            )));
        }
    }
    Ok(())
}

pub struct GeminiSession {
    client: reqwest::Client,
    api_key: String,
    url: String,
    system_instruction: Option<String>,
    tools: Vec<ModelTool>,
    history: Arc<Mutex<Vec<Content>>>,
}

impl GeminiSession {
    /// Snapshot of the context sent with the next turn.
    pub fn history(&self) -> Vec<Content> {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn build_request_body(&self, user: &Content) -> GenerateContentRequest {
        let mut contents = self.history();
        contents.push(user.clone());

        GenerateContentRequest {
            contents,
            system_instruction: self.system_instruction.as_ref().map(|text| SystemInstruction {
                parts: vec![Part::text(text.as_str())],
            }),
            tools: self
                .tools
                .iter()
                .map(|tool| match tool {
                    ModelTool::GoogleSearch => ToolSpec {
                        google_search: GoogleSearch {},
                    },
                })
                .collect(),
        }
    }
}

#[async_trait::async_trait]
impl ChatSession for GeminiSession {
    async fn stream_turn(
        &mut self,
        parts: Vec<Part>,
    ) -> Result<mpsc::UnboundedReceiver<StreamEvent>, LawgicError> {
        if parts.is_empty() {
            return Err(LawgicError::Model("turn has no parts".into()));
        }
        let user = Content {
            role: Role::User,
            parts,
        };
        let request_body = self.build_request_body(&user);

        let response = self
            .client
            .post(&self.url)
            .header("x-goog-api-key", &self.api_key)
            .header("content-type", "application/json")
            .json(&request_body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(LawgicError::Model(format!(
                "Gemini API error ({}): {}",
                status,
                api_error_message(&text)
            )));
        }

        let (tx, rx) = mpsc::unbounded();
        let history = Arc::clone(&self.history);

        let mut stream = response.bytes_stream();
        tokio::spawn(async move {
            use futures::StreamExt;
            let mut buffer: Vec<u8> = Vec::new();
            let mut reply = String::new();

            while let Some(chunk) = stream.next().await {
                let chunk = match chunk {
                    Ok(c) => c,
                    Err(e) => {
                        let _ = tx.unbounded_send(StreamEvent::Error(e.to_string()));
                        return;
                    }
                };

                buffer.extend_from_slice(&chunk);

                for data in drain_sse_data(&mut buffer) {
                    let event = match parse_chunk(&data) {
                        Ok(partial) => {
                            if let Some(ref text) = partial.text {
                                reply.push_str(text);
                            }
                            StreamEvent::Partial(partial)
                        }
                        Err(e) => {
                            let _ = tx.unbounded_send(StreamEvent::Error(e));
                            return;
                        }
                    };
                    // Receiver gone: the turn was abandoned, so the exchange
                    // must not enter the context.
                    if tx.unbounded_send(event).is_err() {
                        tracing::debug!("stream receiver dropped, abandoning turn");
                        return;
                    }
                }
            }

            // Only a complete exchange enters the context; an empty reply would
            // make the next request invalid.
            if !reply.is_empty() && !tx.is_closed() {
                let mut history = history.lock().unwrap_or_else(PoisonError::into_inner);
                history.push(user);
                history.push(Content::model(reply));
            }

            let _ = tx.unbounded_send(StreamEvent::Done);
        });

        Ok(rx)
    }
}

/// Pull every complete `data:` payload out of the buffer, leaving any
/// trailing partial line in place. Lines are decoded only once complete so a
/// multi-byte character split across network chunks survives.
fn drain_sse_data(buffer: &mut Vec<u8>) -> Vec<String> {
    let mut payloads = Vec::new();
    while let Some(line_end) = buffer.iter().position(|&b| b == b'\n') {
        let raw: Vec<u8> = buffer.drain(..=line_end).collect();
        let line = String::from_utf8_lossy(&raw);
        let line = line.trim();

        if let Some(data) = line.strip_prefix("data:") {
            let data = data.trim_start();
            if !data.is_empty() && data != "[DONE]" {
                payloads.push(data.to_string());
            }
        }
    }
    payloads
}

fn parse_chunk(data: &str) -> Result<PartialResponse, String> {
    let chunk: StreamChunk =
        serde_json::from_str(data).map_err(|e| format!("Failed to parse stream chunk: {e}"))?;

    if let Some(error) = chunk.error {
        return Err(error.describe());
    }

    let Some(candidate) = chunk.candidates.into_iter().next() else {
        return Ok(PartialResponse::default());
    };

    let text: String = candidate
        .content
        .map(|c| {
            c.parts
                .into_iter()
                .filter(|p| !p.thought.unwrap_or(false))
                .filter_map(|p| p.text)
                .collect()
        })
        .unwrap_or_default();

    let citations = candidate
        .grounding_metadata
        .map(|m| m.grounding_chunks.into_iter().filter_map(|c| c.web).collect())
        .unwrap_or_default();

    Ok(PartialResponse {
        text: (!text.is_empty()).then_some(text),
        citations,
    })
}

fn api_error_message(body: &str) -> String {
    serde_json::from_str::<ErrorWrapper>(body)
        .map(|wrapper| wrapper.error.describe())
        .unwrap_or_else(|_| body.to_string())
}

// ── Wire types ──────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<SystemInstruction>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<ToolSpec>,
}

#[derive(Debug, Serialize)]
struct SystemInstruction {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ToolSpec {
    google_search: GoogleSearch,
}

#[derive(Debug, Serialize)]
struct GoogleSearch {}

#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    error: Option<ErrorBody>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(default)]
    grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    thought: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroundingMetadata {
    #[serde(default)]
    grounding_chunks: Vec<GroundingChunk>,
}

#[derive(Debug, Deserialize)]
struct GroundingChunk {
    #[serde(default)]
    web: Option<CitationRecord>,
}

#[derive(Debug, Deserialize)]
struct ErrorWrapper {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    status: Option<String>,
}

impl ErrorBody {
    fn describe(&self) -> String {
        let message = self.message.clone().unwrap_or_else(|| "unknown error".into());
        match self.status.as_deref() {
            Some(status) if !status.is_empty() => format!("{status}: {message}"),
            _ => message,
        }
    }
}
