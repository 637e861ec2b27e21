//! Document-to-text extraction.

use std::io::ErrorKind;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info};

use crate::{IntakeError, MediaType, Upload};

/// Turns an uploaded document into plain text.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract(&self, upload: &Upload) -> Result<String, IntakeError>;
}

/// Plain text is decoded in-process; PDF and Word documents are piped
/// through external converters (stdin to stdout).
#[derive(Debug, Clone)]
pub struct DocumentExtractor {
    pdf_command: Vec<String>,
    word_command: Vec<String>,
}

impl Default for DocumentExtractor {
    fn default() -> Self {
        Self {
            pdf_command: ["pdftotext", "-", "-"].map(String::from).to_vec(),
            word_command: ["pandoc", "-f", "docx", "-t", "plain"].map(String::from).to_vec(),
        }
    }
}

impl DocumentExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pdf_command<I, S>(mut self, command: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.pdf_command = command.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_word_command<I, S>(mut self, command: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.word_command = command.into_iter().map(Into::into).collect();
        self
    }
}

async fn pipe_through(command: &[String], input: &[u8]) -> Result<String, IntakeError> {
    let Some((program, args)) = command.split_first() else {
        return Err(IntakeError::Command {
            program: String::new(),
            message: "no converter configured".into(),
        });
    };
    let failed = |message: String| IntakeError::Command {
        program: program.clone(),
        message,
    };

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| failed(e.to_string()))?;

    let mut stdin = child
        .stdin
        .take()
        .ok_or_else(|| failed("stdin unavailable".into()))?;
    let input = input.to_vec();
    let writer = tokio::spawn(async move {
        let written = stdin.write_all(&input).await;
        drop(stdin);
        written
    });

    let output = child.wait_with_output().await?;
    if let Ok(Err(e)) = writer.await
        && e.kind() != ErrorKind::BrokenPipe
    {
        return Err(e.into());
    }
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(failed(format!("{}: {}", output.status, stderr.trim())));
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

#[async_trait]
impl TextExtractor for DocumentExtractor {
    async fn extract(&self, upload: &Upload) -> Result<String, IntakeError> {
        let text = match &upload.media_type {
            MediaType::PlainText => String::from_utf8_lossy(&upload.bytes).into_owned(),
            MediaType::Pdf => pipe_through(&self.pdf_command, &upload.bytes).await?,
            MediaType::Docx | MediaType::Doc => {
                pipe_through(&self.word_command, &upload.bytes).await?
            }
            MediaType::Other(mime) => {
                return Err(IntakeError::UnsupportedMediaType(mime.clone()));
            }
        };
        info!(
            filename = %upload.filename,
            mime = upload.media_type.mime(),
            chars = text.len(),
            "extracted text"
        );
        debug!(excerpt = %text.chars().take(80).collect::<String>(), "extraction excerpt");
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn plain_text_is_decoded_lossily() {
        let upload = Upload::new("facts.txt", MediaType::PlainText, b"Bob\xffsues".to_vec());
        let text = DocumentExtractor::new().extract(&upload).await.unwrap();
        assert_eq!(text, "Bob\u{fffd}sues");
    }

    #[tokio::test]
    async fn unsupported_type_is_rejected() {
        let upload = Upload::new("photo.png", MediaType::from_mime("image/png"), vec![1, 2, 3]);
        let err = DocumentExtractor::new().extract(&upload).await.unwrap_err();
        assert!(matches!(err, IntakeError::UnsupportedMediaType(m) if m == "image/png"));
    }

    #[tokio::test]
    async fn converter_output_is_returned() {
        let extractor = DocumentExtractor::new().with_pdf_command(["cat"]);
        let upload = Upload::new("exam.pdf", MediaType::Pdf, b"Offer and acceptance".to_vec());
        assert_eq!(extractor.extract(&upload).await.unwrap(), "Offer and acceptance");
    }

    #[tokio::test]
    async fn missing_converter_is_a_command_error() {
        let extractor =
            DocumentExtractor::new().with_word_command(["casestudy-no-such-converter"]);
        let upload = Upload::new("brief.docx", MediaType::Docx, b"PK".to_vec());
        let err = extractor.extract(&upload).await.unwrap_err();
        assert!(matches!(err, IntakeError::Command { program, .. } if program == "casestudy-no-such-converter"));
    }

    #[tokio::test]
    async fn failing_converter_reports_status() {
        let extractor = DocumentExtractor::new().with_pdf_command(["false"]);
        let upload = Upload::new("exam.pdf", MediaType::Pdf, Vec::new());
        assert!(matches!(
            extractor.extract(&upload).await,
            Err(IntakeError::Command { .. })
        ));
    }
}
