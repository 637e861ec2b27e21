//! DuckDB-backed artifact store.

use std::path::Path;

use casestudy_core::{ArtifactData, ArtifactKind, NewArtifact, SavedArtifact};
use chrono::{DateTime, SecondsFormat, Utc};
use duckdb::{Connection, params};
use tracing::info;

use crate::{ArtifactStore, StoreError};

const SCHEMA: &str = "
CREATE SEQUENCE IF NOT EXISTS artifact_ids START 1;
CREATE TABLE IF NOT EXISTS artifacts (
    id         BIGINT PRIMARY KEY DEFAULT nextval('artifact_ids'),
    kind       VARCHAR NOT NULL,
    title      VARCHAR NOT NULL,
    summary    VARCHAR NOT NULL,
    created_at VARCHAR NOT NULL,
    data       VARCHAR NOT NULL
);
";

const SELECT_COLUMNS: &str = "SELECT id, title, summary, created_at, data FROM artifacts";

/// Saved artifacts in a single DuckDB table.
///
/// `created_at` is stored as fixed-width RFC 3339 text (microseconds, `Z`), so
/// string order is chronological. The payload is stored as the tagged JSON of
/// [`ArtifactData`]; the `kind` column duplicates its tag for filtering.
///
/// Use [`open`](Self::open) for an in-memory database and
/// [`open_persistent`](Self::open_persistent) for a file that survives restarts.
pub struct DuckStore {
    conn: Connection,
}

struct Row {
    id: i64,
    title: String,
    summary: String,
    created_at: String,
    data: String,
}

impl Row {
    fn read(row: &duckdb::Row<'_>) -> duckdb::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            title: row.get(1)?,
            summary: row.get(2)?,
            created_at: row.get(3)?,
            data: row.get(4)?,
        })
    }

    fn into_artifact(self) -> Result<SavedArtifact, StoreError> {
        let data: ArtifactData = serde_json::from_str(&self.data)?;
        let created_at = DateTime::parse_from_rfc3339(&self.created_at)?.with_timezone(&Utc);
        Ok(SavedArtifact {
            id: self.id,
            title: self.title,
            summary: self.summary,
            created_at,
            data,
        })
    }
}

impl DuckStore {
    /// Open an in-memory DuckDB database.
    pub fn open() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    /// Open or create a persistent DuckDB database at the given path.
    pub fn open_persistent(path: &Path) -> Result<Self, StoreError> {
        let store = Self::init(Connection::open(path)?)?;
        info!(path = %path.display(), "opened artifact database");
        Ok(store)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    /// Number of saved artifacts.
    pub fn count(&self) -> Result<usize, StoreError> {
        let count: i64 = self
            .conn
            .query_row("SELECT count(*)::BIGINT FROM artifacts", [], |row| row.get(0))?;
        usize::try_from(count).map_err(|_| StoreError::Other(format!("negative count {count}")))
    }

    fn query(&self, sql: &str, kind: Option<&str>) -> Result<Vec<SavedArtifact>, StoreError> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = match kind {
            Some(kind) => stmt
                .query_map(params![kind], Row::read)?
                .collect::<Result<Vec<_>, _>>()?,
            None => stmt.query_map([], Row::read)?.collect::<Result<Vec<_>, _>>()?,
        };
        rows.into_iter().map(Row::into_artifact).collect()
    }
}

impl ArtifactStore for DuckStore {
    fn save(&self, artifact: NewArtifact) -> Result<SavedArtifact, StoreError> {
        let created_at = Utc::now();
        let kind = artifact.kind();
        let data = serde_json::to_string(&artifact.data)?;
        let id: i64 = self.conn.query_row(
            "INSERT INTO artifacts (kind, title, summary, created_at, data)
             VALUES (?, ?, ?, ?, ?) RETURNING id",
            params![
                kind.as_str(),
                artifact.title,
                artifact.summary,
                created_at.to_rfc3339_opts(SecondsFormat::Micros, true),
                data,
            ],
            |row| row.get(0),
        )?;
        info!(id, kind = %kind, "saved artifact");
        Ok(artifact.into_saved(id, created_at))
    }

    fn get(&self, id: i64) -> Result<SavedArtifact, StoreError> {
        let mut stmt = self
            .conn
            .prepare(&format!("{SELECT_COLUMNS} WHERE id = ?"))?;
        let mut rows = stmt.query(params![id])?;
        let Some(row) = rows.next()? else {
            return Err(StoreError::NotFound(id));
        };
        Row::read(row)?.into_artifact()
    }

    fn update(&self, id: i64, artifact: NewArtifact) -> Result<SavedArtifact, StoreError> {
        let stored = self.get(id)?;
        if stored.kind() != artifact.kind() {
            return Err(StoreError::KindChanged {
                id,
                stored: stored.kind(),
                given: artifact.kind(),
            });
        }
        let data = serde_json::to_string(&artifact.data)?;
        self.conn.execute(
            "UPDATE artifacts SET title = ?, summary = ?, data = ? WHERE id = ?",
            params![artifact.title, artifact.summary, data, id],
        )?;
        info!(id, kind = %stored.kind(), "updated artifact");
        Ok(artifact.into_saved(id, stored.created_at))
    }

    fn list(&self, kind: Option<ArtifactKind>) -> Result<Vec<SavedArtifact>, StoreError> {
        let order = "ORDER BY created_at DESC, id DESC";
        match kind {
            Some(kind) => self.query(
                &format!("{SELECT_COLUMNS} WHERE kind = ? {order}"),
                Some(kind.as_str()),
            ),
            None => self.query(&format!("{SELECT_COLUMNS} {order}"), None),
        }
    }

    fn delete(&self, id: i64) -> Result<bool, StoreError> {
        let removed = self
            .conn
            .execute("DELETE FROM artifacts WHERE id = ?", params![id])?;
        if removed > 0 {
            info!(id, "deleted artifact");
        }
        Ok(removed > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use casestudy_core::{Flashcard, FlashcardDeck, Quiz, QuizQuestion};

    fn deck() -> NewArtifact {
        NewArtifact::flashcards(
            FlashcardDeck {
                flashcards: vec![Flashcard {
                    id: 1,
                    front: "Elements of battery".into(),
                    back: "Intent, harmful or offensive contact, causation".into(),
                    category: "Torts".into(),
                }],
            },
            None,
            vec!["torts-outline.pdf".into()],
        )
    }

    #[test]
    fn open_in_memory_is_empty() {
        let store = DuckStore::open().unwrap();
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn save_then_get_returns_same_payload() {
        let store = DuckStore::open().unwrap();
        let saved = store.save(deck()).unwrap();
        assert_eq!(saved.id, 1);
        let loaded = store.get(saved.id).unwrap();
        assert_eq!(loaded.title, "Flashcards - torts-outline.pdf");
        assert_eq!(loaded.data, saved.data);
        assert_eq!(loaded.kind(), ArtifactKind::Flashcard);
    }

    #[test]
    fn get_missing_is_not_found() {
        let store = DuckStore::open().unwrap();
        assert!(matches!(store.get(42), Err(StoreError::NotFound(42))));
    }

    #[test]
    fn list_filters_and_orders() {
        let store = DuckStore::open().unwrap();
        store.save(deck()).unwrap();
        store
            .save(NewArtifact::document("brief.pdf", "Analysis".into(), None))
            .unwrap();
        store.save(deck()).unwrap();

        let ids: Vec<i64> = store.list(None).unwrap().iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![3, 2, 1]);
        let decks = store.list(Some(ArtifactKind::Flashcard)).unwrap();
        assert_eq!(decks.len(), 2);
    }

    fn quiz() -> NewArtifact {
        NewArtifact::quiz(
            Quiz {
                questions: vec![QuizQuestion {
                    id: 1,
                    question: "Which tort requires intent?".into(),
                    options: vec![
                        "Negligence".into(),
                        "Battery".into(),
                        "Strict liability".into(),
                        "Nuisance".into(),
                    ],
                    correct_answer: 1,
                    explanation: "Battery is an intentional tort.".into(),
                    topic: Some("Torts".into()),
                }],
            },
            None,
            vec!["torts-outline.pdf".into()],
        )
    }

    #[test]
    fn scored_quiz_is_written_back_and_read() {
        let store = DuckStore::open().unwrap();
        let saved = store.save(quiz()).unwrap();

        let mut attempt = saved.clone().into_new();
        let ArtifactData::Quiz(data) = &mut attempt.data else {
            panic!("expected quiz payload");
        };
        data.submit(BTreeMap::from([(1, 1)])).unwrap();
        attempt.summary = data.summary();
        store.update(saved.id, attempt).unwrap();

        let loaded = store.get(saved.id).unwrap();
        assert_eq!(loaded.created_at, saved.created_at);
        assert_eq!(loaded.summary, "1 multiple-choice questions, scored 1/1");
        let ArtifactData::Quiz(data) = loaded.data else {
            panic!("expected quiz payload");
        };
        assert!(data.completed);
        assert_eq!(data.score, Some(1));
        assert_eq!(data.user_answers, BTreeMap::from([(1, 1)]));
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn update_refuses_kind_change_and_missing_id() {
        let store = DuckStore::open().unwrap();
        let saved = store.save(deck()).unwrap();
        assert!(matches!(
            store.update(saved.id, quiz()),
            Err(StoreError::KindChanged { .. })
        ));
        assert!(matches!(store.update(9, deck()), Err(StoreError::NotFound(9))));
    }

    #[test]
    fn delete_removes_once() {
        let store = DuckStore::open().unwrap();
        let saved = store.save(deck()).unwrap();
        assert!(store.delete(saved.id).unwrap());
        assert!(!store.delete(saved.id).unwrap());
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn persistent_store_survives_reopen() {
        let tmp = tempfile::TempDir::new().unwrap();
        let db_path = tmp.path().join("artifacts.duckdb");
        {
            let store = DuckStore::open_persistent(&db_path).unwrap();
            store.save(deck()).unwrap();
        }
        let store = DuckStore::open_persistent(&db_path).unwrap();
        assert_eq!(store.count().unwrap(), 1);
        let next = store.save(deck()).unwrap();
        assert_eq!(next.id, 2);
    }
}
