use chrono::{DateTime, Local};
use clap::ValueEnum;
use rusqlite::{params, Connection};
use serde::Serialize;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;

use crate::error::{Error, Result};
use crate::result::ResultPayload;
use crate::snippet::Language;

/// Durations accepted for a stored session, in seconds.
pub const VALID_DURATIONS: [u32; 4] = [15, 30, 60, 120];

/// Receives the result of each finished session.
///
/// The session calls `submit` once and does not retry; an error is logged and
/// the session stays finished.
pub trait ResultSink {
    fn submit(&mut self, payload: &ResultPayload) -> Result<()>;
}

impl ResultSink for Vec<Box<dyn ResultSink>> {
    fn submit(&mut self, payload: &ResultPayload) -> Result<()> {
        let mut first_err = None;
        for sink in self.iter_mut() {
            if let Err(err) = sink.submit(payload) {
                first_err.get_or_insert(err);
            }
        }
        first_err.map_or(Ok(()), Err)
    }
}

/// Forwards results over a channel.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: Sender<ResultPayload>,
}

impl ChannelSink {
    pub fn new(tx: Sender<ResultPayload>) -> Self {
        Self { tx }
    }
}

impl ResultSink for ChannelSink {
    fn submit(&mut self, payload: &ResultPayload) -> Result<()> {
        self.tx
            .send(payload.clone())
            .map_err(|_| Error::SinkClosed)
    }
}

/// A stored session record.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredSession {
    pub id: i64,
    pub payload: ResultPayload,
    pub created_at: DateTime<Local>,
}

pub fn validate(payload: &ResultPayload) -> Result<()> {
    if !VALID_DURATIONS.contains(&payload.duration_secs) {
        return Err(Error::InvalidDuration(payload.duration_secs));
    }
    if payload.accuracy > 100 {
        return Err(Error::InvalidAccuracy(payload.accuracy));
    }
    Ok(())
}

/// Ordering of a history listing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum HistoryOrder {
    /// Most recently stored first.
    #[default]
    Newest,
    /// Highest wpm first, newest breaking ties.
    Top,
}

impl HistoryOrder {
    fn order_by(self) -> &'static str {
        match self {
            HistoryOrder::Newest => "id DESC",
            HistoryOrder::Top => "wpm DESC, id DESC",
        }
    }
}

/// Filters and ordering for [`SqliteStore::recent`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HistoryQuery {
    pub language: Option<Language>,
    pub user_id: Option<String>,
    pub order: HistoryOrder,
}

/// Averages for one language, rounded to one decimal.
#[derive(Clone, Debug, PartialEq)]
pub struct LanguageSummary {
    pub language: Language,
    pub total_sessions: i64,
    pub avg_wpm: f64,
    pub avg_raw_wpm: f64,
    pub avg_accuracy: f64,
    pub avg_errors: f64,
    pub top_wpm: u32,
}

/// Averages over every language; all zero when nothing is stored.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GlobalSummary {
    pub total_sessions: i64,
    pub avg_wpm: f64,
    pub avg_accuracy: f64,
    pub top_wpm: u32,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct StatsSummary {
    pub global: GlobalSummary,
    /// Highest average wpm first.
    pub by_language: Vec<LanguageSummary>,
}

fn language_column(idx: usize, value: String) -> rusqlite::Result<Language> {
    Language::from_str(&value, true).map_err(|_| {
        rusqlite::Error::InvalidColumnType(idx, "language".to_string(), rusqlite::types::Type::Text)
    })
}

/// SQLite-backed session history.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Opens (and creates if needed) the database at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS sessions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                language TEXT NOT NULL,
                duration INTEGER NOT NULL,
                wpm INTEGER NOT NULL,
                raw_wpm INTEGER NOT NULL,
                accuracy INTEGER NOT NULL,
                errors INTEGER NOT NULL,
                consistency INTEGER NOT NULL,
                snippet_id TEXT NOT NULL,
                elapsed_ms INTEGER NOT NULL,
                user_id TEXT,
                display_name TEXT NOT NULL,
                created_at TEXT NOT NULL
            )
            "#,
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_sessions_created_at ON sessions(created_at)",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_sessions_user ON sessions(user_id, created_at)",
            [],
        )?;

        Ok(Self { conn })
    }

    /// Inserts a session record and returns its row id.
    pub fn create_session(&self, payload: &ResultPayload) -> Result<i64> {
        validate(payload)?;

        self.conn.execute(
            r#"
            INSERT INTO sessions
            (language, duration, wpm, raw_wpm, accuracy, errors, consistency,
             snippet_id, elapsed_ms, user_id, display_name, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
            params![
                payload.language.to_string(),
                payload.duration_secs,
                payload.wpm,
                payload.raw_wpm,
                payload.accuracy,
                payload.errors,
                payload.consistency,
                payload.snippet_id,
                payload.elapsed_ms as i64,
                payload.user_id,
                payload.display_name,
                Local::now().to_rfc3339(),
            ],
        )?;

        Ok(self.conn.last_insert_rowid())
    }

    /// Up to `limit` sessions matching `query`, in the query's order.
    pub fn recent(&self, limit: usize, query: &HistoryQuery) -> Result<Vec<StoredSession>> {
        let sql = format!(
            r#"
            SELECT id, language, duration, wpm, raw_wpm, accuracy, errors, consistency,
                   snippet_id, elapsed_ms, user_id, display_name, created_at
            FROM sessions
            WHERE (?1 IS NULL OR language = ?1)
              AND (?2 IS NULL OR user_id = ?2)
            ORDER BY {}
            LIMIT ?3
            "#,
            query.order.order_by()
        );
        let mut stmt = self.conn.prepare(&sql)?;

        let language = query.language.map(|l| l.to_string());
        let rows = stmt.query_map(params![language, query.user_id, limit as i64], |row| {
            let language = language_column(1, row.get(1)?)?;

            let created_at: String = row.get(12)?;
            let created_at = DateTime::parse_from_rfc3339(&created_at)
                .map_err(|_| {
                    rusqlite::Error::InvalidColumnType(
                        12,
                        "created_at".to_string(),
                        rusqlite::types::Type::Text,
                    )
                })?
                .with_timezone(&Local);

            Ok(StoredSession {
                id: row.get(0)?,
                payload: ResultPayload {
                    language,
                    duration_secs: row.get(2)?,
                    wpm: row.get(3)?,
                    raw_wpm: row.get(4)?,
                    accuracy: row.get(5)?,
                    errors: row.get(6)?,
                    consistency: row.get(7)?,
                    snippet_id: row.get(8)?,
                    elapsed_ms: row.get::<_, i64>(9)? as u64,
                    user_id: row.get(10)?,
                    display_name: row.get(11)?,
                },
                created_at,
            })
        })?;

        let mut sessions = Vec::new();
        for session in rows {
            sessions.push(session?);
        }
        Ok(sessions)
    }

    /// Per-language and overall averages, optionally for one user only.
    pub fn stats(&self, user_id: Option<&str>) -> Result<StatsSummary> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT language,
                   COUNT(*),
                   ROUND(AVG(wpm), 1),
                   ROUND(AVG(raw_wpm), 1),
                   ROUND(AVG(accuracy), 1),
                   ROUND(AVG(errors), 1),
                   MAX(wpm)
            FROM sessions
            WHERE (?1 IS NULL OR user_id = ?1)
            GROUP BY language
            ORDER BY AVG(wpm) DESC
            "#,
        )?;

        let rows = stmt.query_map(params![user_id], |row| {
            Ok(LanguageSummary {
                language: language_column(0, row.get(0)?)?,
                total_sessions: row.get(1)?,
                avg_wpm: row.get(2)?,
                avg_raw_wpm: row.get(3)?,
                avg_accuracy: row.get(4)?,
                avg_errors: row.get(5)?,
                top_wpm: row.get(6)?,
            })
        })?;

        let mut by_language = Vec::new();
        for summary in rows {
            by_language.push(summary?);
        }

        let global = self.conn.query_row(
            r#"
            SELECT COUNT(*),
                   COALESCE(ROUND(AVG(wpm), 1), 0.0),
                   COALESCE(ROUND(AVG(accuracy), 1), 0.0),
                   COALESCE(MAX(wpm), 0)
            FROM sessions
            WHERE (?1 IS NULL OR user_id = ?1)
            "#,
            params![user_id],
            |row| {
                Ok(GlobalSummary {
                    total_sessions: row.get(0)?,
                    avg_wpm: row.get(1)?,
                    avg_accuracy: row.get(2)?,
                    top_wpm: row.get(3)?,
                })
            },
        )?;

        Ok(StatsSummary {
            global,
            by_language,
        })
    }

    pub fn count(&self) -> Result<i64> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM sessions", [], |row| row.get(0))?;
        Ok(count)
    }
}

impl ResultSink for SqliteStore {
    fn submit(&mut self, payload: &ResultPayload) -> Result<()> {
        self.create_session(payload).map(|_| ())
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CsvRow<'a> {
    date: String,
    language: Language,
    duration: u32,
    wpm: u32,
    raw_wpm: u32,
    accuracy: u32,
    errors: u32,
    consistency: u32,
    snippet_id: &'a str,
    elapsed_ms: u64,
    user_id: Option<&'a str>,
    display_name: &'a str,
}

impl<'a> CsvRow<'a> {
    fn new(payload: &'a ResultPayload) -> Self {
        Self {
            date: Local::now().to_rfc3339(),
            language: payload.language,
            duration: payload.duration_secs,
            wpm: payload.wpm,
            raw_wpm: payload.raw_wpm,
            accuracy: payload.accuracy,
            errors: payload.errors,
            consistency: payload.consistency,
            snippet_id: &payload.snippet_id,
            elapsed_ms: payload.elapsed_ms,
            user_id: payload.user_id.as_deref(),
            display_name: &payload.display_name,
        }
    }
}

/// Appends one CSV row per finished session.
#[derive(Debug, Clone)]
pub struct CsvLog {
    path: PathBuf,
}

impl CsvLog {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, payload: &ResultPayload) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        // The header only goes into a fresh file.
        let needs_header = !self.path.exists();

        let file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(&self.path)?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(needs_header)
            .from_writer(file);
        writer.serialize(CsvRow::new(payload))?;
        writer.flush()?;
        Ok(())
    }
}

impl ResultSink for CsvLog {
    fn submit(&mut self, payload: &ResultPayload) -> Result<()> {
        self.append(payload)
    }
}
