//! Storage layer: saved study artifacts, in memory or in DuckDB.

mod error;
mod memory;
pub use error::StoreError;
pub use memory::MemoryStore;

#[cfg(feature = "duckdb")]
mod duck;
#[cfg(feature = "duckdb")]
pub use duck::DuckStore;

use casestudy_core::{ArtifactKind, NewArtifact, SavedArtifact};

/// Persistence for saved artifacts.
///
/// Ids are assigned on save, start at 1 and are never reused. Listings are
/// newest first, with ties broken by descending id.
pub trait ArtifactStore {
    fn save(&self, artifact: NewArtifact) -> Result<SavedArtifact, StoreError>;

    fn get(&self, id: i64) -> Result<SavedArtifact, StoreError>;

    /// Replace the title, summary and payload of an existing artifact.
    ///
    /// The id and creation time are kept. The kind cannot change.
    fn update(&self, id: i64, artifact: NewArtifact) -> Result<SavedArtifact, StoreError>;

    /// All artifacts, or only those of `kind`.
    fn list(&self, kind: Option<ArtifactKind>) -> Result<Vec<SavedArtifact>, StoreError>;

    /// Returns `false` when no artifact had this id.
    fn delete(&self, id: i64) -> Result<bool, StoreError>;
}
