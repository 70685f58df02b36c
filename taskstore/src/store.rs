//! Store - SQLite-indexed, JSONL-backed generic persistence

use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use rusqlite::{Connection, params};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::StoreError;
use crate::filter::Filter;
use crate::record::{Record, index_value_column};

/// A single entry in a collection's durability log.
#[derive(Debug, Serialize, serde::Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum LogEntry {
    Put { id: String, body: serde_json::Value },
    Delete { id: String },
}

/// Generic persistent store: one SQLite table plus one append-only JSONL
/// log per collection, under a single base directory.
pub struct Store {
    base_dir: PathBuf,
    conn: Mutex<Connection>,
}

impl Store {
    /// Open (creating if necessary) a store rooted at `base_dir`.
    pub fn open(base_dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let base_dir = base_dir.as_ref().to_path_buf();
        fs::create_dir_all(&base_dir)?;

        let conn = Connection::open(base_dir.join("index.sqlite3"))?;
        conn.pragma_update(None, "journal_mode", "WAL")?;

        Ok(Self {
            base_dir,
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory store (tests only - no durability log survives the process).
    pub fn open_in_memory(base_dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        Self::open(base_dir)
    }

    fn log_path(&self, collection: &str) -> PathBuf {
        self.base_dir.join(format!("{collection}.jsonl"))
    }

    fn append_log(&self, collection: &str, entry: &LogEntry) -> Result<(), StoreError> {
        let mut file = OpenOptions::new().create(true).append(true).open(self.log_path(collection))?;
        let line = serde_json::to_string(entry)?;
        writeln!(file, "{line}")?;
        file.sync_data()?;
        Ok(())
    }

    fn ensure_table(&self, collection: &str) -> Result<(), StoreError> {
        let conn = self.conn.lock().expect("store mutex poisoned");
        conn.execute(
            &format!(
                "CREATE TABLE IF NOT EXISTS \"{collection}\" (
                    id TEXT PRIMARY KEY,
                    updated_at INTEGER NOT NULL,
                    body TEXT NOT NULL
                )"
            ),
            [],
        )?;
        conn.execute(
            &format!(
                "CREATE TABLE IF NOT EXISTS \"{collection}__index\" (
                    id TEXT NOT NULL,
                    field TEXT NOT NULL,
                    value TEXT NOT NULL,
                    PRIMARY KEY (id, field)
                )"
            ),
            [],
        )?;
        conn.execute(
            &format!("CREATE INDEX IF NOT EXISTS \"{collection}__index_field_value\" ON \"{collection}__index\" (field, value)"),
            [],
        )?;
        Ok(())
    }

    fn upsert_row(&self, collection: &str, id: &str, updated_at: i64, body: &str, fields: &std::collections::HashMap<String, crate::record::IndexValue>) -> Result<(), StoreError> {
        let conn = self.conn.lock().expect("store mutex poisoned");
        conn.execute(
            &format!("INSERT INTO \"{collection}\" (id, updated_at, body) VALUES (?1, ?2, ?3) ON CONFLICT(id) DO UPDATE SET updated_at=excluded.updated_at, body=excluded.body"),
            params![id, updated_at, body],
        )?;
        conn.execute(&format!("DELETE FROM \"{collection}__index\" WHERE id = ?1"), params![id])?;
        for (field, value) in fields {
            conn.execute(
                &format!("INSERT INTO \"{collection}__index\" (id, field, value) VALUES (?1, ?2, ?3)"),
                params![id, field, index_value_column(value)],
            )?;
        }
        Ok(())
    }

    fn delete_row(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        let conn = self.conn.lock().expect("store mutex poisoned");
        conn.execute(&format!("DELETE FROM \"{collection}\" WHERE id = ?1"), params![id])?;
        conn.execute(&format!("DELETE FROM \"{collection}__index\" WHERE id = ?1"), params![id])?;
        Ok(())
    }

    /// Overwrite-or-insert a record. Atomic at the granularity of this one record:
    /// the durability log entry is fsynced before the index row is written, and
    /// the index write happens within a single SQLite statement execution.
    pub fn save<T: Record>(&self, record: &T) -> Result<(), StoreError> {
        self.ensure_table(T::collection())?;
        let id = record.id();
        let body = serde_json::to_value(record)?;

        self.append_log(T::collection(), &LogEntry::Put { id: id.clone(), body: body.clone() })?;

        let body_str = serde_json::to_string(&body)?;
        self.upsert_row(T::collection(), &id, record.updated_at(), &body_str, &record.indexed_fields())?;
        debug!(collection = T::collection(), %id, "taskstore: saved record");
        Ok(())
    }

    /// `update` is semantically identical to `save` - both are overwrite-or-insert.
    pub fn update<T: Record>(&self, record: &T) -> Result<(), StoreError> {
        self.save(record)
    }

    /// Load a single record by id.
    pub fn load<T: Record + DeserializeOwned>(&self, id: &str) -> Result<Option<T>, StoreError> {
        self.ensure_table(T::collection())?;
        let conn = self.conn.lock().expect("store mutex poisoned");
        let body: Option<String> = conn
            .query_row(
                &format!("SELECT body FROM \"{}\" WHERE id = ?1", T::collection()),
                params![id],
                |row| row.get(0),
            )
            .ok();

        match body {
            Some(b) => Ok(Some(serde_json::from_str(&b)?)),
            None => Ok(None),
        }
    }

    /// Load every record in the collection. Intended for startup initialization only.
    pub fn load_all<T: Record + DeserializeOwned>(&self) -> Result<Vec<T>, StoreError> {
        self.ensure_table(T::collection())?;
        let conn = self.conn.lock().expect("store mutex poisoned");
        let mut stmt = conn.prepare(&format!("SELECT body FROM \"{}\"", T::collection()))?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut out = Vec::new();
        for row in rows {
            let body: String = row?;
            out.push(serde_json::from_str(&body)?);
        }
        Ok(out)
    }

    /// List records matching every filter. Filters are evaluated against each
    /// record's declared `indexed_fields()`, so a field must be indexed to be
    /// filterable here.
    pub fn list<T: Record + DeserializeOwned>(&self, filters: &[Filter]) -> Result<Vec<T>, StoreError> {
        let all = self.load_all::<T>()?;
        Ok(all
            .into_iter()
            .filter(|record| {
                let indexed = record.indexed_fields();
                filters.iter().all(|f| match indexed.get(&f.field) {
                    Some(v) => matches_filter(v, f),
                    None => false,
                })
            })
            .collect())
    }

    /// Idempotent delete - succeeds whether or not the record exists.
    pub fn delete<T: Record>(&self, id: &str) -> Result<(), StoreError> {
        self.ensure_table(T::collection())?;
        self.append_log(T::collection(), &LogEntry::Delete { id: id.to_string() })?;
        self.delete_row(T::collection(), id)?;
        debug!(collection = T::collection(), %id, "taskstore: deleted record");
        Ok(())
    }

    /// Flush pending writes. The JSONL log is fsynced on every write already;
    /// this additionally checkpoints the SQLite WAL so the index file reflects
    /// all committed writes on disk.
    pub fn sync(&self) -> Result<(), StoreError> {
        let conn = self.conn.lock().expect("store mutex poisoned");
        conn.pragma_update(None, "wal_checkpoint", "PASSIVE")?;
        Ok(())
    }

    /// Replay a collection's JSONL log from scratch into the SQLite index,
    /// discarding and rebuilding any rows currently present. Returns the
    /// number of live records after replay. Used at startup to repair an
    /// index that is missing or out of sync with the log.
    pub fn rebuild_indexes<T: Record + DeserializeOwned>(&self) -> Result<usize, StoreError> {
        self.ensure_table(T::collection())?;
        {
            let conn = self.conn.lock().expect("store mutex poisoned");
            conn.execute(&format!("DELETE FROM \"{}\"", T::collection()), [])?;
            conn.execute(&format!("DELETE FROM \"{}__index\"", T::collection()), [])?;
        }

        let path = self.log_path(T::collection());
        if !path.exists() {
            return Ok(0);
        }

        let file = fs::File::open(&path)?;
        for (lineno, line) in BufReader::new(file).lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let entry: LogEntry = serde_json::from_str(&line).map_err(|e| StoreError::CorruptLog {
                collection: T::collection().to_string(),
                reason: format!("line {lineno}: {e}"),
            })?;

            match entry {
                LogEntry::Put { id, body } => {
                    let record: T = serde_json::from_value(body)?;
                    let body_str = serde_json::to_string(&record)?;
                    self.upsert_row(T::collection(), &id, record.updated_at(), &body_str, &record.indexed_fields())?;
                }
                LogEntry::Delete { id } => {
                    self.delete_row(T::collection(), &id)?;
                }
            }
        }

        let count = self.load_all::<T>()?.len();
        warn!(collection = T::collection(), %count, "taskstore: rebuilt index from durability log");
        Ok(count)
    }
}

fn matches_filter(value: &crate::record::IndexValue, filter: &Filter) -> bool {
    use crate::record::IndexValue::*;
    use std::cmp::Ordering;

    let ordering = match (value, &filter.value) {
        (Text(a), Text(b)) => a.partial_cmp(b),
        (Int(a), Int(b)) => a.partial_cmp(b),
        (Real(a), Real(b)) => a.partial_cmp(b),
        (Bool(a), Bool(b)) => a.partial_cmp(b),
        (Null, Null) => Some(Ordering::Equal),
        _ => None,
    };

    let Some(ordering) = ordering else { return false };

    match filter.op {
        crate::filter::FilterOp::Eq => ordering == Ordering::Equal,
        crate::filter::FilterOp::Ne => ordering != Ordering::Equal,
        crate::filter::FilterOp::Lt => ordering == Ordering::Less,
        crate::filter::FilterOp::Le => ordering != Ordering::Greater,
        crate::filter::FilterOp::Gt => ordering == Ordering::Greater,
        crate::filter::FilterOp::Ge => ordering != Ordering::Less,
    }
}

/// Current wall-clock time in epoch milliseconds.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
