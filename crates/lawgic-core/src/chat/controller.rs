use crate::chat::attachment::PendingAttachment;
use crate::config::Settings;
use crate::constants::chat::{TURN_FAILED_ERROR, TURN_FAILED_TEXT};
use crate::context::{dedup_citations, ChatMessage, Citation, ConversationStore, KeyValueStore};
use crate::error::LawgicError;
use crate::llm::{ChatSession, ModelBackend, Part, SessionConfig, StreamEvent};
use futures::StreamExt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, MutexGuard, PoisonError};
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::Mutex;

/// State changes published while a turn runs - the shared CLI/UI interface.
#[derive(Debug, Clone)]
pub enum TurnEvent {
    /// The user's message was committed.
    UserMessage(ChatMessage),
    /// Everything the model has said so far in this turn.
    PartialText(String),
    /// Deduplicated sources seen so far in this turn.
    PartialCitations(Vec<Citation>),
    /// A bot message (reply or apology) was committed.
    Committed(ChatMessage),
    /// The turn failed; carries the user-visible error.
    Failed(String),
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    EmptyInput,
    TurnInFlight,
}

#[derive(Debug, Clone)]
pub enum TurnOutcome {
    /// Preconditions failed; nothing changed.
    Ignored(IgnoreReason),
    Completed(ChatMessage),
    /// The attachment could not be encoded; no request was made.
    AttachmentFailed(String),
    /// The model call or its stream failed.
    Failed(String),
}

impl TurnOutcome {
    pub fn is_ignored(&self) -> bool {
        matches!(self, TurnOutcome::Ignored(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnPhase {
    Idle,
    TurnInFlight,
    Error,
}

/// Everything a display layer needs to draw the conversation.
#[derive(Debug, Clone)]
pub struct ChatView {
    pub messages: Vec<ChatMessage>,
    pub partial_text: String,
    pub partial_citations: Vec<Citation>,
    pub in_flight: bool,
    pub last_error: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ControllerOptions {
    pub max_response_chars: Option<usize>,
    pub suggestions: Vec<String>,
}

#[derive(Debug, Default)]
struct LiveState {
    partial_text: String,
    partial_citations: Vec<Citation>,
    last_error: Option<String>,
}

struct ActiveSession {
    config: SessionConfig,
    handle: Box<dyn ChatSession>,
}

/// Drives conversation turns against one model session and commits the
/// results into the conversation store. One turn at a time.
pub struct ChatController {
    backend: Arc<dyn ModelBackend>,
    store: Mutex<ConversationStore>,
    session: Mutex<ActiveSession>,
    live: std::sync::Mutex<LiveState>,
    in_flight: AtomicBool,
    options: ControllerOptions,
}

/// Holds the single-flight flag; releasing it also clears the live buffers,
/// whichever way the turn ends.
struct FlightGuard<'a> {
    controller: &'a ChatController,
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.controller.clear_partial();
        self.controller.in_flight.store(false, Ordering::Release);
    }
}

impl ChatController {
    /// Restore the conversation from `storage` and open a session that has
    /// replayed it. Failing to open the session is fatal.
    pub async fn start(
        backend: Arc<dyn ModelBackend>,
        settings: &Settings,
        storage: Box<dyn KeyValueStore>,
    ) -> Result<Self, LawgicError> {
        let store = ConversationStore::initialize(storage, settings.store_options());
        let options = ControllerOptions {
            max_response_chars: settings.llm.max_response_chars,
            suggestions: settings.chat.suggestions.clone(),
        };
        Self::from_parts(backend, settings.session_config(), store, options).await
    }

    pub async fn from_parts(
        backend: Arc<dyn ModelBackend>,
        config: SessionConfig,
        store: ConversationStore,
        options: ControllerOptions,
    ) -> Result<Self, LawgicError> {
        let history = store.model_history();
        let replayed = history.len();
        let handle = backend
            .create_session(&config, history)
            .await
            .map_err(into_session_init)?;
        tracing::info!(model = %config.model, replayed, "chat session ready");

        Ok(Self {
            backend,
            store: Mutex::new(store),
            session: Mutex::new(ActiveSession { config, handle }),
            live: std::sync::Mutex::new(LiveState::default()),
            in_flight: AtomicBool::new(false),
            options,
        })
    }

    /// Run one turn, discarding incremental events.
    pub async fn send_turn(
        &self,
        user_text: &str,
        attachment: Option<PendingAttachment>,
    ) -> TurnOutcome {
        let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
        self.send_turn_with_events(user_text, attachment, tx).await
    }

    /// Run one turn, publishing TurnEvents through the channel.
    pub async fn send_turn_with_events(
        &self,
        user_text: &str,
        attachment: Option<PendingAttachment>,
        events: UnboundedSender<TurnEvent>,
    ) -> TurnOutcome {
        let text = user_text.trim();
        if text.is_empty() && attachment.is_none() {
            return TurnOutcome::Ignored(IgnoreReason::EmptyInput);
        }
        let Some(_guard) = self.try_begin() else {
            tracing::debug!("turn ignored: another turn is in flight");
            return TurnOutcome::Ignored(IgnoreReason::TurnInFlight);
        };

        let mut user_message = ChatMessage::user(text);
        if let Some(ref attachment) = attachment {
            user_message = user_message.with_attachment(attachment.info());
        }
        self.commit(user_message.clone()).await;
        let _ = events.send(TurnEvent::UserMessage(user_message));
        {
            let mut live = self.live();
            live.last_error = None;
            live.partial_text.clear();
            live.partial_citations.clear();
        }

        let mut parts = Vec::new();
        if !text.is_empty() {
            parts.push(Part::text(text));
        }
        if let Some(attachment) = attachment {
            match attachment.encode().await {
                Ok(part) => parts.push(part),
                Err(e) => {
                    let reason = match e {
                        LawgicError::Attachment { message, .. } => message,
                        other => other.to_string(),
                    };
                    tracing::warn!(file = %attachment.name, "Failed to process attachment: {reason}");
                    let error = format!("Failed to process file: {reason}");
                    let apology = ChatMessage::bot(format!(
                        "Sorry, I couldn't process the file \"{}\". Please try again.",
                        attachment.name
                    ));
                    self.fail_turn(apology, error.clone(), &events).await;
                    return TurnOutcome::AttachmentFailed(error);
                }
            }
        }

        match self.stream_reply(parts, &events).await {
            Ok((reply, citations)) => {
                self.clear_partial();
                let message = ChatMessage::bot(reply).with_citations(citations);
                self.commit(message.clone()).await;
                let _ = events.send(TurnEvent::Committed(message.clone()));
                let _ = events.send(TurnEvent::Finished);
                TurnOutcome::Completed(message)
            }
            Err(e) => {
                tracing::warn!("Turn failed: {e}");
                let cause = e.to_string();
                self.fail_turn(
                    ChatMessage::bot(TURN_FAILED_TEXT),
                    format!("{TURN_FAILED_ERROR} {cause}"),
                    &events,
                )
                .await;
                TurnOutcome::Failed(cause)
            }
        }
    }

    async fn stream_reply(
        &self,
        parts: Vec<Part>,
        events: &UnboundedSender<TurnEvent>,
    ) -> Result<(String, Vec<Citation>), LawgicError> {
        let mut stream = {
            let mut session = self.session.lock().await;
            session.handle.stream_turn(parts).await?
        };

        let mut text = String::new();
        let mut text_chars = 0usize;
        let mut records = Vec::new();

        while let Some(event) = stream.next().await {
            match event {
                StreamEvent::Partial(partial) => {
                    if let Some(fragment) = partial.text.filter(|t| !t.is_empty()) {
                        text_chars += fragment.chars().count();
                        if let Some(limit) = self.options.max_response_chars {
                            if text_chars > limit {
                                return Err(LawgicError::ResponseTooLarge(limit));
                            }
                        }
                        text.push_str(&fragment);
                        self.live().partial_text.clone_from(&text);
                        let _ = events.send(TurnEvent::PartialText(text.clone()));
                    }

                    if !partial.citations.is_empty() {
                        records.extend(partial.citations);
                        let citations = dedup_citations(&records);
                        self.live().partial_citations.clone_from(&citations);
                        let _ = events.send(TurnEvent::PartialCitations(citations));
                    }
                }
                StreamEvent::Done => break,
                StreamEvent::Error(err) => return Err(LawgicError::Model(err)),
            }
        }

        tracing::debug!(chars = text_chars, sources = records.len(), "stream finished");
        Ok((text, dedup_citations(&records)))
    }

    async fn fail_turn(
        &self,
        apology: ChatMessage,
        error: String,
        events: &UnboundedSender<TurnEvent>,
    ) {
        self.clear_partial();
        self.live().last_error = Some(error.clone());
        self.commit(apology.clone()).await;
        let _ = events.send(TurnEvent::Committed(apology));
        let _ = events.send(TurnEvent::Failed(error));
        let _ = events.send(TurnEvent::Finished);
    }

    async fn commit(&self, message: ChatMessage) {
        let mut store = self.store.lock().await;
        if let Err(e) = store.append(message) {
            tracing::warn!("Failed to persist chat history: {e}");
        }
    }

    /// Replace the session, replaying the committed history into the new one.
    /// On failure the previous session stays in place.
    pub async fn rebuild_session(&self, config: SessionConfig) -> Result<(), LawgicError> {
        let _guard = self.try_begin().ok_or(LawgicError::TurnInFlight)?;
        let history = self.store.lock().await.model_history();
        let handle = self
            .backend
            .create_session(&config, history)
            .await
            .map_err(into_session_init)?;
        tracing::info!(model = %config.model, "chat session rebuilt");
        *self.session.lock().await = ActiveSession { config, handle };
        Ok(())
    }

    /// Forget the conversation and start a fresh session.
    pub async fn reset_history(&self) -> Result<(), LawgicError> {
        let _guard = self.try_begin().ok_or(LawgicError::TurnInFlight)?;
        let config = self.session.lock().await.config.clone();
        let handle = self
            .backend
            .create_session(&config, Vec::new())
            .await
            .map_err(into_session_init)?;
        self.store.lock().await.reset();
        *self.session.lock().await = ActiveSession { config, handle };
        self.live().last_error = None;
        Ok(())
    }

    pub async fn view(&self) -> ChatView {
        let messages = self.messages().await;
        let live = self.live();
        ChatView {
            messages,
            partial_text: live.partial_text.clone(),
            partial_citations: live.partial_citations.clone(),
            in_flight: self.is_in_flight(),
            last_error: live.last_error.clone(),
        }
    }

    pub async fn messages(&self) -> Vec<ChatMessage> {
        self.store.lock().await.messages().to_vec()
    }

    pub async fn session_config(&self) -> SessionConfig {
        self.session.lock().await.config.clone()
    }

    pub fn phase(&self) -> TurnPhase {
        if self.is_in_flight() {
            TurnPhase::TurnInFlight
        } else if self.live().last_error.is_some() {
            TurnPhase::Error
        } else {
            TurnPhase::Idle
        }
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub fn last_error(&self) -> Option<String> {
        self.live().last_error.clone()
    }

    /// Hide the current error. Does not retry anything.
    pub fn dismiss_error(&self) {
        self.live().last_error = None;
    }

    pub fn suggestions(&self) -> &[String] {
        &self.options.suggestions
    }

    fn try_begin(&self) -> Option<FlightGuard<'_>> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| FlightGuard { controller: self })
    }

    fn clear_partial(&self) {
        let mut live = self.live();
        live.partial_text.clear();
        live.partial_citations.clear();
    }

    fn live(&self) -> MutexGuard<'_, LiveState> {
        self.live.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn into_session_init(e: LawgicError) -> LawgicError {
    match e {
        LawgicError::SessionInit(_) | LawgicError::Config(_) => e,
        other => LawgicError::SessionInit(other.to_string()),
    }
}
