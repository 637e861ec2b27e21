use std::path::Path;

use tracing::debug;

use crate::IntakeError;

const DOCX_MIME: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaType {
    Pdf,
    Docx,
    /// Legacy Word.
    Doc,
    PlainText,
    Other(String),
}

impl MediaType {
    pub fn from_mime(mime: &str) -> Self {
        let mime = mime.trim().to_ascii_lowercase();
        match mime.as_str() {
            "application/pdf" => Self::Pdf,
            DOCX_MIME => Self::Docx,
            "application/msword" => Self::Doc,
            m if m.starts_with("text/") => Self::PlainText,
            _ => Self::Other(mime),
        }
    }

    /// Guess from the file extension; unknown extensions become `Other`.
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        match ext.as_str() {
            "pdf" => Self::Pdf,
            "docx" => Self::Docx,
            "doc" => Self::Doc,
            "txt" | "text" | "md" => Self::PlainText,
            _ => Self::Other(ext),
        }
    }

    pub fn mime(&self) -> &str {
        match self {
            Self::Pdf => "application/pdf",
            Self::Docx => DOCX_MIME,
            Self::Doc => "application/msword",
            Self::PlainText => "text/plain",
            Self::Other(mime) => mime,
        }
    }
}

/// One file handed to intake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    pub filename: String,
    pub media_type: MediaType,
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn new(filename: impl Into<String>, media_type: MediaType, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            media_type,
            bytes,
        }
    }

    /// Read a local file, typing it by extension.
    pub async fn from_path(path: &Path) -> Result<Self, IntakeError> {
        let bytes = tokio::fs::read(path).await?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let media_type = MediaType::from_path(path);
        debug!(filename = %filename, mime = media_type.mime(), size = bytes.len(), "read upload");
        Ok(Self::new(filename, media_type, bytes))
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mime_mapping() {
        assert_eq!(MediaType::from_mime("application/pdf"), MediaType::Pdf);
        assert_eq!(MediaType::from_mime(DOCX_MIME), MediaType::Docx);
        assert_eq!(MediaType::from_mime("text/markdown"), MediaType::PlainText);
        assert_eq!(
            MediaType::from_mime("image/png"),
            MediaType::Other("image/png".into())
        );
    }

    #[test]
    fn extension_mapping_is_case_insensitive() {
        assert_eq!(MediaType::from_path(Path::new("Exam.PDF")), MediaType::Pdf);
        assert_eq!(MediaType::from_path(Path::new("outline.docx")), MediaType::Docx);
        assert_eq!(MediaType::from_path(Path::new("notes.txt")), MediaType::PlainText);
        assert_eq!(MediaType::from_path(Path::new("README")), MediaType::Other(String::new()));
    }

    #[tokio::test]
    async fn upload_from_path_reads_bytes() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("facts.txt");
        std::fs::write(&path, "Alice trespasses.").unwrap();
        let upload = Upload::from_path(&path).await.unwrap();
        assert_eq!(upload.filename, "facts.txt");
        assert_eq!(upload.media_type, MediaType::PlainText);
        assert_eq!(upload.size(), 17);
    }
}
