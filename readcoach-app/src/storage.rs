use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Datelike, Duration, TimeZone, Utc};
use readcoach_core::{
    error::Result as CoreResult,
    sink::{ReadingData, SessionType},
    ReadingError, SessionLogSink, SessionRecord,
};
use rusqlite::{params, Connection};
use serde::Serialize;
use tracing::debug;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsBucket {
    pub date: String,
    pub sessions: usize,
    pub words: usize,
    pub avg_accuracy: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsPayload {
    pub range_days: usize,
    pub total_sessions: usize,
    pub total_words: usize,
    pub avg_accuracy: f64,
    pub buckets: Vec<StatsBucket>,
}

/// SQLite-backed reading history.
#[derive(Debug, Clone)]
pub struct LocalStore {
    db_path: PathBuf,
}

impl LocalStore {
    pub fn new(db_path: PathBuf) -> Result<Self, String> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| e.to_string())?;
        }
        let store = Self { db_path };
        store.init_schema()?;
        Ok(store)
    }

    fn open(&self) -> Result<Connection, String> {
        Connection::open(&self.db_path).map_err(|e| e.to_string())
    }

    fn init_schema(&self) -> Result<(), String> {
        let conn = self.open()?;
        conn.execute_batch(
            r#"
            PRAGMA journal_mode = WAL;
            CREATE TABLE IF NOT EXISTS reading_sessions (
              id TEXT PRIMARY KEY,
              created_at INTEGER NOT NULL,
              accuracy REAL NOT NULL,
              duration_ms INTEGER NOT NULL DEFAULT 0,
              total_words INTEGER NOT NULL DEFAULT 0,
              correct_words INTEGER NOT NULL DEFAULT 0,
              practice_words_json TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_sessions_created_at ON reading_sessions(created_at DESC);
            "#,
        )
        .map_err(|e| e.to_string())?;
        Ok(())
    }

    pub fn insert_session(&self, record: &SessionRecord) -> Result<(), String> {
        let practice_json =
            serde_json::to_string(&record.data.practice_words).map_err(|e| e.to_string())?;
        let conn = self.open()?;
        conn.execute(
            r#"
            INSERT INTO reading_sessions
            (id, created_at, accuracy, duration_ms, total_words, correct_words, practice_words_json)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                record.session_id,
                record.completed_at.timestamp(),
                record.accuracy,
                i64::try_from(record.duration_ms).unwrap_or(i64::MAX),
                record.data.total_words as i64,
                record.data.correct_words as i64,
                practice_json,
            ],
        )
        .map_err(|e| e.to_string())?;
        Ok(())
    }

    /// Most recent sessions first.
    pub fn recent_sessions(&self, limit: usize) -> Result<Vec<SessionRecord>, String> {
        let limit = limit.clamp(1, 5000);
        let conn = self.open()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, created_at, accuracy, duration_ms, total_words, correct_words, practice_words_json
                 FROM reading_sessions ORDER BY created_at DESC, rowid DESC LIMIT ?1",
            )
            .map_err(|e| e.to_string())?;
        let mut rows = stmt
            .query(params![limit as i64])
            .map_err(|e| e.to_string())?;

        let mut out = Vec::new();
        while let Some(row) = rows.next().map_err(|e| e.to_string())? {
            let practice_json: String = row.get(6).map_err(|e| e.to_string())?;
            let practice_words =
                serde_json::from_str::<Vec<String>>(&practice_json).unwrap_or_default();
            out.push(SessionRecord {
                session_type: SessionType::ReadingCoach,
                session_id: row.get(0).map_err(|e| e.to_string())?,
                completed_at: ts_to_datetime(row.get::<_, i64>(1).map_err(|e| e.to_string())?),
                accuracy: row.get(2).map_err(|e| e.to_string())?,
                duration_ms: row.get::<_, i64>(3).map_err(|e| e.to_string())?.max(0) as u64,
                data: ReadingData {
                    total_words: row.get::<_, i64>(4).map_err(|e| e.to_string())? as usize,
                    correct_words: row.get::<_, i64>(5).map_err(|e| e.to_string())? as usize,
                    practice_words,
                },
            });
        }
        Ok(out)
    }

    pub fn prune_history(&self, retention_days: usize) -> Result<usize, String> {
        if retention_days == 0 {
            return Ok(0);
        }
        let cutoff = Utc::now() - Duration::days(retention_days as i64);
        let conn = self.open()?;
        let changed = conn
            .execute(
                "DELETE FROM reading_sessions WHERE created_at < ?1",
                params![cutoff.timestamp()],
            )
            .map_err(|e| e.to_string())?;
        Ok(changed)
    }

    pub fn get_stats(&self, range_days: usize) -> Result<StatsPayload, String> {
        let range_days = range_days.clamp(1, 365);
        let cutoff = Utc::now() - Duration::days(range_days as i64);
        let conn = self.open()?;
        let mut stmt = conn
            .prepare(
                "SELECT created_at, total_words, accuracy
                 FROM reading_sessions
                 WHERE created_at >= ?1
                 ORDER BY created_at ASC",
            )
            .map_err(|e| e.to_string())?;
        let mut rows = stmt
            .query(params![cutoff.timestamp()])
            .map_err(|e| e.to_string())?;

        #[derive(Default)]
        struct DayAgg {
            sessions: usize,
            words: usize,
            accuracy_total: f64,
        }

        let mut buckets: BTreeMap<(i32, u32, u32), DayAgg> = BTreeMap::new();
        let mut total_sessions = 0usize;
        let mut total_words = 0usize;
        let mut accuracy_total = 0f64;

        while let Some(row) = rows.next().map_err(|e| e.to_string())? {
            let ts: i64 = row.get(0).map_err(|e| e.to_string())?;
            let words = row.get::<_, i64>(1).map_err(|e| e.to_string())?.max(0) as usize;
            let accuracy: f64 = row.get(2).map_err(|e| e.to_string())?;
            let dt = ts_to_datetime(ts);
            let day = buckets.entry((dt.year(), dt.month(), dt.day())).or_default();
            day.sessions += 1;
            day.words += words;
            day.accuracy_total += accuracy;

            total_sessions += 1;
            total_words += words;
            accuracy_total += accuracy;
        }

        let out_buckets = buckets
            .into_iter()
            .map(|((y, m, d), day)| StatsBucket {
                date: format!("{y:04}-{m:02}-{d:02}"),
                sessions: day.sessions,
                words: day.words,
                avg_accuracy: mean(day.accuracy_total, day.sessions),
            })
            .collect();

        Ok(StatsPayload {
            range_days,
            total_sessions,
            total_words,
            avg_accuracy: mean(accuracy_total, total_sessions),
            buckets: out_buckets,
        })
    }
}

/// `SessionLogSink` that writes finished sessions into the local store.
#[derive(Debug, Clone)]
pub struct SqliteSessionLog {
    store: LocalStore,
    history_enabled: bool,
}

impl SqliteSessionLog {
    pub fn new(store: LocalStore, history_enabled: bool) -> Self {
        Self {
            store,
            history_enabled,
        }
    }
}

impl SessionLogSink for SqliteSessionLog {
    fn append(&mut self, record: &SessionRecord) -> CoreResult<()> {
        if !self.history_enabled {
            debug!(session_id = %record.session_id, "history disabled — session not stored");
            return Ok(());
        }
        self.store
            .insert_session(record)
            .map_err(ReadingError::SessionLog)
    }
}

fn mean(total: f64, count: usize) -> f64 {
    if count == 0 {
        0.0
    } else {
        total / count as f64
    }
}

fn ts_to_datetime(ts: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(ts, 0).single().unwrap_or_else(Utc::now)
}
