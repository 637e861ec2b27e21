use casestudy_core::FactPattern;
use tracing::{info, warn};

use crate::{IntakeError, TextExtractor, Upload, UploadRouter};

/// A fact pattern typed or pasted by the student.
pub fn intake_paste(text: &str) -> Result<FactPattern, IntakeError> {
    Ok(FactPattern::pasted(text)?)
}

/// A fact pattern from an uploaded document.
pub async fn intake_upload(
    router: &UploadRouter,
    extractor: &dyn TextExtractor,
    upload: Upload,
) -> Result<FactPattern, IntakeError> {
    let route = router.route(upload).await;
    let upload = router.resolve(route).await?;
    let text = extractor.extract(&upload).await?;
    if text.trim().is_empty() {
        return Err(IntakeError::EmptyText(upload.filename));
    }
    let fact_pattern = FactPattern::uploaded(&text, upload.filename)?;
    info!(
        filename = fact_pattern.filename().unwrap_or_default(),
        chars = fact_pattern.text().len(),
        "fact pattern loaded"
    );
    Ok(fact_pattern)
}

/// Concatenate the text of several study files, each under a
/// `--- Content from {name} ---` header. Files that fail are skipped.
pub async fn combine_documents(
    extractor: &dyn TextExtractor,
    uploads: &[Upload],
) -> Result<String, IntakeError> {
    if uploads.is_empty() {
        return Err(IntakeError::NoFiles);
    }
    let mut combined = String::new();
    for upload in uploads {
        match extractor.extract(upload).await {
            Ok(text) if !text.trim().is_empty() => {
                combined.push_str(&format!(
                    "\n\n--- Content from {} ---\n{text}",
                    upload.filename
                ));
            }
            Ok(_) => warn!(filename = %upload.filename, "no text extracted, skipping"),
            Err(e) => warn!(filename = %upload.filename, error = %e, "extraction failed, skipping"),
        }
    }
    if combined.is_empty() {
        return Err(IntakeError::NoExtractableText);
    }
    Ok(combined)
}

/// The document's text, or a bracketed note saying it could not be read.
pub async fn extract_or_placeholder(extractor: &dyn TextExtractor, upload: &Upload) -> String {
    match extractor.extract(upload).await {
        Ok(text) if !text.trim().is_empty() => text,
        Ok(_) => format!("[Could not extract text from {}]", upload.filename),
        Err(e) => {
            warn!(filename = %upload.filename, error = %e, "extraction failed");
            format!("[Could not extract text from {}]", upload.filename)
        }
    }
}

/// `512 B`, `1.5 KB`, `4.0 MB`.
pub fn format_file_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * 1024;
    if bytes < KB {
        format!("{bytes} B")
    } else if bytes < MB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    }
}
