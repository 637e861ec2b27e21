//! Getting text into a session: pasted fact patterns, uploaded documents,
//! large-file spooling and document-to-text extraction.

mod error;
mod extract;
mod intake;
mod media;
mod storage;

pub use error::IntakeError;
pub use extract::{DocumentExtractor, TextExtractor};
pub use intake::{
    combine_documents, extract_or_placeholder, format_file_size, intake_paste, intake_upload,
};
pub use media::{MediaType, Upload};
pub use storage::{DIRECT_UPLOAD_LIMIT, LocalObjectStorage, ObjectStorage, UploadRoute, UploadRouter};
