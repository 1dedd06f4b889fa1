use crate::context::message::ChatMessage;
use crate::error::LawgicError;
use chrono::DateTime;
use serde_json::{Map, Value};

/// Serialize the full message list into the persisted record format.
pub fn encode_history(messages: &[ChatMessage]) -> Result<String, LawgicError> {
    Ok(serde_json::to_string(messages)?)
}

/// Parse and validate a persisted history blob.
///
/// Validation is all-or-nothing: one malformed record rejects the whole blob.
pub fn decode_history(raw: &str) -> Result<Vec<ChatMessage>, LawgicError> {
    let value: Value = serde_json::from_str(raw)
        .map_err(|e| LawgicError::History(format!("not valid JSON: {e}")))?;

    let records = value
        .as_array()
        .ok_or_else(|| LawgicError::History("expected a list of messages".into()))?;

    for (index, record) in records.iter().enumerate() {
        validate_record(record).map_err(|reason| {
            LawgicError::History(format!("record {index}: {reason}"))
        })?;
    }

    serde_json::from_value(value).map_err(|e| LawgicError::History(e.to_string()))
}

fn validate_record(record: &Value) -> Result<(), String> {
    let object = record.as_object().ok_or("not an object")?;

    string_field(object, "id")?;
    string_field(object, "text")?;

    match string_field(object, "sender")? {
        "user" | "bot" => {}
        other => return Err(format!("unknown sender `{other}`")),
    }

    let timestamp = string_field(object, "timestamp")?;
    DateTime::parse_from_rfc3339(timestamp)
        .map_err(|e| format!("`timestamp` is not an ISO-8601 time: {e}"))?;

    Ok(())
}

fn string_field<'a>(object: &'a Map<String, Value>, name: &str) -> Result<&'a str, String> {
    object
        .get(name)
        .and_then(Value::as_str)
        .ok_or_else(|| format!("`{name}` must be a string"))
}
