use crate::constants::attachments::{ACCEPTED_MIME_TYPES, FALLBACK_MIME_TYPE};
use crate::context::AttachmentInfo;
use crate::error::LawgicError;
use crate::llm::Part;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use std::path::PathBuf;

/// A user-selected file waiting to be sent with the next turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingAttachment {
    pub path: PathBuf,
    pub name: String,
    pub mime_type: String,
}

impl PendingAttachment {
    /// Describe the file at `path`, guessing its media type from the extension.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let mime_type = mime_guess::from_path(&path)
            .first()
            .map(|m| m.essence_str().to_string())
            .unwrap_or_else(|| FALLBACK_MIME_TYPE.to_string());

        Self {
            path,
            name,
            mime_type,
        }
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = mime_type.into();
        self
    }

    pub fn is_supported(&self) -> bool {
        ACCEPTED_MIME_TYPES.contains(&self.mime_type.as_str())
    }

    pub fn info(&self) -> AttachmentInfo {
        AttachmentInfo {
            name: self.name.clone(),
            mime_type: self.mime_type.clone(),
        }
    }

    /// Read the file and turn it into an inline-data part.
    pub async fn encode(&self) -> Result<Part, LawgicError> {
        if !self.is_supported() {
            return Err(LawgicError::attachment(
                &self.name,
                format!(
                    "unsupported file type {} (accepted: {})",
                    self.mime_type,
                    ACCEPTED_MIME_TYPES.join(", ")
                ),
            ));
        }

        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|e| LawgicError::attachment(&self.name, e.to_string()))?;

        Ok(Part::inline_data(
            self.mime_type.clone(),
            BASE64_STANDARD.encode(bytes),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_path_guesses_name_and_type() {
        let attachment = PendingAttachment::from_path("/tmp/docs/deed.PDF");
        assert_eq!(attachment.name, "deed.PDF");
        assert_eq!(attachment.mime_type, "application/pdf");
        assert!(attachment.is_supported());

        let unknown = PendingAttachment::from_path("notes.unknownext");
        assert_eq!(unknown.mime_type, FALLBACK_MIME_TYPE);
        assert!(!unknown.is_supported());
    }

    #[tokio::test]
    async fn test_encode_reads_and_base64s() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("scan.png");
        std::fs::write(&path, b"hello").unwrap();

        let part = PendingAttachment::from_path(&path).encode().await.unwrap();
        assert_eq!(part, Part::inline_data("image/png", "aGVsbG8="));
    }

    #[tokio::test]
    async fn test_encode_missing_file_is_attachment_error() {
        let err = PendingAttachment::from_path("/definitely/not/here.png")
            .encode()
            .await
            .unwrap_err();
        match err {
            LawgicError::Attachment { name, .. } => assert_eq!(name, "here.png"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_encode_rejects_unsupported_type() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, b"text").unwrap();

        let err = PendingAttachment::from_path(&path).encode().await.unwrap_err();
        assert!(err.to_string().contains("unsupported file type text/plain"));
    }
}
