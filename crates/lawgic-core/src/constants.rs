/// Lawgic centralized constants.
/// All fixed strings, identifiers and limits live here.
/// Never hardcode these values elsewhere.

// ─── Models ───────────────────────────────────────────────────────────────────

pub mod models {
    /// Default Gemini model used when settings do not name one.
    pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";
}

// ─── API Endpoints ────────────────────────────────────────────────────────────

pub mod endpoints {
    pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
}

// ─── Environment ──────────────────────────────────────────────────────────────

pub mod env {
    /// Environment variable the CLI reads the API key from by default.
    pub const DEFAULT_API_KEY_ENV: &str = "GEMINI_API_KEY";
}

// ─── Conversation ─────────────────────────────────────────────────────────────

pub mod chat {
    /// Key of the persisted history slot.
    pub const HISTORY_KEY: &str = "chat_history";

    /// Id of the synthetic greeting that opens every conversation.
    pub const GREETING_ID: &str = "initial-bot-greeting";

    pub const GREETING_TEXT: &str = "Welcome to Lawgic, your Legal Aid Assistant! How can I help you today? \n\nRemember: As an AI Legal Aid Assistant, the information I provide is for educational and informational purposes only. It is not legal advice and should not be substituted for consultation with a qualified legal professional in Bangladesh. For specific legal issues, please consult a lawyer.";

    pub const SYSTEM_INSTRUCTION: &str = "You are 'Lawgic', an AI Legal Aid Assistant specializing in the Constitution of Bangladesh and general Bangladeshi law.
Your purpose is to provide informative and clear explanations regarding these legal frameworks.
The user has already received an initial greeting message which includes the standard disclaimer: \"As an AI Legal Aid Assistant, the information I provide is for educational and informational purposes only. It is not legal advice and should not be substituted for consultation with a qualified legal professional in Bangladesh. For specific legal issues, please consult a lawyer.\"
Therefore, do NOT repeat this full disclaimer in your responses.
When providing information, if possible, cite relevant articles, sections, or names of laws (e.g., 'Article 27 of the Constitution of Bangladesh guarantees...').
If a question falls outside the scope of Bangladeshi law or requires specific legal advice (like predicting case outcomes or drafting legal documents), you should politely state that you cannot assist with that specific request and remind the user of the importance of consulting a qualified human lawyer for such matters.
If you use Google Search for grounding, rely on it to support your answer with up-to-date sources.";

    /// Appended as a bot message when a turn fails for any stream or model reason.
    pub const TURN_FAILED_TEXT: &str =
        "I encountered an issue. Please try again or rephrase your question.";

    /// Prefix of the user-visible error set when a turn fails.
    pub const TURN_FAILED_ERROR: &str =
        "Sorry, an error occurred while processing your request.";
}

// ─── Attachments ──────────────────────────────────────────────────────────────

pub mod attachments {
    /// Media types the model accepts as inline attachment data.
    pub const ACCEPTED_MIME_TYPES: &[&str] = &[
        "image/png",
        "image/jpeg",
        "image/webp",
        "application/pdf",
    ];

    /// Used when the media type cannot be guessed from the file name.
    pub const FALLBACK_MIME_TYPE: &str = "application/octet-stream";
}

// ─── Limits ───────────────────────────────────────────────────────────────────

pub mod limits {
    /// Characters of a message shown in `/history` listings before truncation.
    pub const HISTORY_PREVIEW_CHARS: usize = 80;
}
