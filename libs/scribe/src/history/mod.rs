//! Recently recognised documents, kept in a small SQLite database.

use anyhow::{Context, Result};
use dirs::home_dir;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::image2text::{EngineKind, RecognitionResult};

pub const HISTORY_CAPACITY: usize = 50;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HistoryItem {
    pub id: String,
    /// Reference to the source image: a path, URL or data URI.
    pub original_image: String,
    pub processed_text: String,
    pub confidence: f64,
    pub engine: EngineKind,
    /// RFC 3339, UTC.
    pub timestamp: String,
}

impl HistoryItem {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let engine: String = row.get("engine")?;
        Ok(Self {
            id: row.get("id")?,
            original_image: row.get("original_image")?,
            processed_text: row.get("processed_text")?,
            confidence: row.get("confidence")?,
            engine: EngineKind::from(engine.as_str()),
            timestamp: row.get("timestamp")?,
        })
    }
}

pub struct HistoryStore {
    conn: Connection,
    capacity: usize,
}

/// `SCRIBESCAN_HISTORY_DB` when set, `~/.scribescan/history.db` otherwise.
pub fn get_history_path() -> Result<PathBuf> {
    if let Some(path) = std::env::var_os("SCRIBESCAN_HISTORY_DB").filter(|p| !p.is_empty()) {
        return Ok(PathBuf::from(path));
    }

    let mut path = home_dir().context("Unable to find home directory")?;
    path.push(".scribescan");
    path.push("history.db");
    Ok(path)
}

impl HistoryStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Unable to create directory {}", parent.display()))?;
        }
        let conn =
            Connection::open(path).with_context(|| format!("Unable to open history database {}", path.display()))?;
        log::debug!("Opened history database at {}", path.display());
        Self::with_connection(conn)
    }

    pub fn open_default() -> Result<Self> {
        Self::open(get_history_path()?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS history (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT NOT NULL UNIQUE,
                original_image TEXT NOT NULL,
                processed_text TEXT NOT NULL,
                confidence REAL NOT NULL,
                engine TEXT NOT NULL,
                timestamp TEXT NOT NULL
            )",
            [],
        )?;
        Ok(Self {
            conn,
            capacity: HISTORY_CAPACITY,
        })
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }

    /// Records a result as the newest entry and drops whatever falls past
    /// the capacity.
    pub fn add(&self, original_image: &str, result: &RecognitionResult) -> Result<HistoryItem> {
        let item = HistoryItem {
            id: uuid::Uuid::new_v4().to_string(),
            original_image: original_image.to_string(),
            processed_text: result.text.clone(),
            confidence: result.confidence,
            engine: result.engine,
            timestamp: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
        };

        self.conn.execute(
            "INSERT INTO history (id, original_image, processed_text, confidence, engine, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                item.id,
                item.original_image,
                item.processed_text,
                item.confidence,
                item.engine.to_string(),
                item.timestamp
            ],
        )?;

        let dropped = self.conn.execute(
            "DELETE FROM history WHERE seq NOT IN (SELECT seq FROM history ORDER BY seq DESC LIMIT ?1)",
            params![self.capacity as i64],
        )?;
        if dropped > 0 {
            log::debug!("Dropped {} old history entries", dropped);
        }

        Ok(item)
    }

    /// Newest first.
    pub fn list(&self) -> Result<Vec<HistoryItem>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, original_image, processed_text, confidence, engine, timestamp
             FROM history ORDER BY seq DESC",
        )?;
        let items = stmt
            .query_map([], HistoryItem::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(items)
    }

    pub fn get(&self, id: &str) -> Result<Option<HistoryItem>> {
        let item = self
            .conn
            .query_row(
                "SELECT id, original_image, processed_text, confidence, engine, timestamp
                 FROM history WHERE id = ?1",
                params![id],
                HistoryItem::from_row,
            )
            .optional()?;
        Ok(item)
    }

    /// Returns false when no entry had that id.
    pub fn remove(&self, id: &str) -> Result<bool> {
        let removed = self.conn.execute("DELETE FROM history WHERE id = ?1", params![id])?;
        Ok(removed > 0)
    }

    pub fn clear(&self) -> Result<usize> {
        Ok(self.conn.execute("DELETE FROM history", [])?)
    }

    pub fn len(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM history", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(text: &str) -> RecognitionResult {
        RecognitionResult::new(text, 88.0, EngineKind::Primary)
    }

    #[test]
    fn test_add_and_list_newest_first() {
        let store = HistoryStore::open_in_memory().unwrap();
        let first = store.add("/scans/a.png", &result("first")).unwrap();
        let second = store.add("/scans/b.png", &result("second")).unwrap();

        let items = store.list().unwrap();
        assert_eq!(items, vec![second, first]);
        assert_eq!(items[0].engine, EngineKind::Primary);
        assert_ne!(items[0].id, items[1].id);
    }

    #[test]
    fn test_capacity_keeps_newest() {
        let store = HistoryStore::open_in_memory().unwrap().with_capacity(3);
        for i in 0..5 {
            store.add("img", &result(&format!("note {}", i))).unwrap();
        }

        let texts: Vec<String> = store.list().unwrap().into_iter().map(|i| i.processed_text).collect();
        assert_eq!(texts, vec!["note 4", "note 3", "note 2"]);
    }

    #[test]
    fn test_default_capacity() {
        let store = HistoryStore::open_in_memory().unwrap();
        for i in 0..(HISTORY_CAPACITY + 5) {
            store.add("img", &result(&i.to_string())).unwrap();
        }
        assert_eq!(store.len().unwrap(), HISTORY_CAPACITY);
        assert_eq!(store.list().unwrap()[0].processed_text, (HISTORY_CAPACITY + 4).to_string());
    }

    #[test]
    fn test_get_remove_clear() {
        let store = HistoryStore::open_in_memory().unwrap();
        let kept = store.add("a", &result("kept")).unwrap();
        let gone = store.add("b", &RecognitionResult::new("gone", 40.0, EngineKind::Secondary)).unwrap();

        assert_eq!(store.get(&gone.id).unwrap().unwrap().engine, EngineKind::Secondary);
        assert!(store.remove(&gone.id).unwrap());
        assert!(!store.remove(&gone.id).unwrap());
        assert!(store.get(&gone.id).unwrap().is_none());
        assert_eq!(store.list().unwrap(), vec![kept]);

        assert_eq!(store.clear().unwrap(), 1);
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn test_file_backed_store_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("history.db");

        let id = {
            let store = HistoryStore::open(&path).unwrap();
            store.add("scan.jpg", &result("persisted")).unwrap().id
        };

        let reopened = HistoryStore::open(&path).unwrap();
        let item = reopened.get(&id).unwrap().unwrap();
        assert_eq!(item.processed_text, "persisted");
        assert_eq!(item.original_image, "scan.jpg");
    }
}
