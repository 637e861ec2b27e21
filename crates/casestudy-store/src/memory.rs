//! Ephemeral store used when no database path is configured.

use std::sync::{Mutex, MutexGuard};

use casestudy_core::{ArtifactKind, NewArtifact, SavedArtifact};
use chrono::Utc;
use tracing::info;

use crate::{ArtifactStore, StoreError};

#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    last_id: i64,
    artifacts: Vec<SavedArtifact>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, StoreError> {
        self.inner
            .lock()
            .map_err(|_| StoreError::Other("memory store lock poisoned".into()))
    }
}

impl ArtifactStore for MemoryStore {
    fn save(&self, artifact: NewArtifact) -> Result<SavedArtifact, StoreError> {
        let mut inner = self.lock()?;
        inner.last_id += 1;
        let saved = artifact.into_saved(inner.last_id, Utc::now());
        info!(id = saved.id, kind = %saved.kind(), "saved artifact");
        inner.artifacts.push(saved.clone());
        Ok(saved)
    }

    fn get(&self, id: i64) -> Result<SavedArtifact, StoreError> {
        self.lock()?
            .artifacts
            .iter()
            .find(|a| a.id == id)
            .cloned()
            .ok_or(StoreError::NotFound(id))
    }

    fn update(&self, id: i64, artifact: NewArtifact) -> Result<SavedArtifact, StoreError> {
        let mut inner = self.lock()?;
        let slot = inner
            .artifacts
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or(StoreError::NotFound(id))?;
        if slot.kind() != artifact.kind() {
            return Err(StoreError::KindChanged {
                id,
                stored: slot.kind(),
                given: artifact.kind(),
            });
        }
        *slot = artifact.into_saved(id, slot.created_at);
        info!(id, kind = %slot.kind(), "updated artifact");
        Ok(slot.clone())
    }

    fn list(&self, kind: Option<ArtifactKind>) -> Result<Vec<SavedArtifact>, StoreError> {
        let mut found: Vec<SavedArtifact> = self
            .lock()?
            .artifacts
            .iter()
            .filter(|a| kind.is_none_or(|k| a.kind() == k))
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(found)
    }

    fn delete(&self, id: i64) -> Result<bool, StoreError> {
        let mut inner = self.lock()?;
        let before = inner.artifacts.len();
        inner.artifacts.retain(|a| a.id != id);
        let removed = inner.artifacts.len() < before;
        if removed {
            info!(id, "deleted artifact");
        }
        Ok(removed)
    }
}
