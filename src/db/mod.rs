pub mod queries;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OpenFlags, params};
use std::fs;
use std::path::Path;
use std::time::Duration;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct ClickEvent {
    pub id: i64,
    pub x: i64,
    pub y: i64,
    pub viewport_w: i64,
    pub viewport_h: i64,
    pub url: String,
    pub timestamp: DateTime<Utc>,
}

/// A validated click that has not been assigned an id or timestamp yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewClick {
    pub x: i64,
    pub y: i64,
    pub viewport_w: i64,
    pub viewport_h: i64,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlCount {
    pub url: String,
    pub count: i64,
}

#[derive(Debug, Clone)]
pub struct StorageSummary {
    pub total_clicks: i64,
    pub distinct_pages: i64,
    pub latest_click_at: Option<DateTime<Utc>>,
}

/// Handle to the click store. Opened per request and closed on drop.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Creates the database file if needed and applies the schema.
    ///
    /// Safe to run repeatedly; every statement is `IF NOT EXISTS`.
    pub fn migrate(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create DB directory: {}", parent.display()))?;
        }

        let mut conn = Connection::open(path)
            .with_context(|| format!("Failed to open SQLite DB: {}", path.display()))?;

        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get::<_, String>(0))
            .context("Failed to enable WAL journaling")?;

        let transaction = conn
            .transaction()
            .context("Failed to start schema transaction")?;

        queries::schema_statements()
            .iter()
            .try_for_each(|statement| {
                transaction
                    .execute(statement, [])
                    .context("Failed to initialize schema")
                    .map(|_| ())
            })?;

        transaction
            .commit()
            .context("Failed to commit schema transaction")?;

        Ok(())
    }

    /// Opens an already migrated database. Never creates the file.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_URI
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .with_context(|| format!("Failed to open SQLite DB: {}", path.display()))?;

        conn.busy_timeout(BUSY_TIMEOUT)
            .context("Failed to set SQLite busy timeout")?;

        Ok(Self { conn })
    }

    pub fn schema_ready(&self) -> Result<bool> {
        let count: i64 = self
            .conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'clicks'",
                [],
                |row| row.get(0),
            )
            .context("Failed to inspect schema")?;

        Ok(count == 1)
    }

    pub fn insert_click(&self, click: &NewClick) -> Result<i64> {
        self.conn
            .execute(
                "INSERT INTO clicks (x, y, viewport_w, viewport_h, url, timestamp) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    click.x,
                    click.y,
                    click.viewport_w,
                    click.viewport_h,
                    &click.url,
                    Utc::now()
                ],
            )
            .context("Failed to insert click")?;

        Ok(self.conn.last_insert_rowid())
    }

    pub fn clicks_for_url(&self, url: &str) -> Result<Vec<ClickEvent>> {
        let mut statement = self.conn.prepare(
            "SELECT id, x, y, viewport_w, viewport_h, url, timestamp
             FROM clicks
             WHERE url = ?1
             ORDER BY id ASC",
        )?;

        let rows = statement
            .query_map(params![url], |row| {
                Ok(ClickEvent {
                    id: row.get(0)?,
                    x: row.get(1)?,
                    y: row.get(2)?,
                    viewport_w: row.get(3)?,
                    viewport_h: row.get(4)?,
                    url: row.get(5)?,
                    timestamp: row.get(6)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to query clicks")?;

        Ok(rows)
    }

    pub fn click_counts(&self) -> Result<Vec<UrlCount>> {
        let mut statement = self.conn.prepare(
            "SELECT url, COUNT(id)
             FROM clicks
             GROUP BY url
             ORDER BY url ASC",
        )?;

        let rows = statement
            .query_map([], |row| {
                Ok(UrlCount {
                    url: row.get(0)?,
                    count: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to count clicks per url")?;

        Ok(rows)
    }

    pub fn delete_all(&mut self) -> Result<usize> {
        let transaction = self
            .conn
            .transaction()
            .context("Failed to start transaction")?;

        let deleted = transaction
            .execute("DELETE FROM clicks", [])
            .context("Failed to delete clicks")?;

        transaction
            .commit()
            .context("Failed to commit click deletion")?;

        Ok(deleted)
    }

    pub fn summary(&self) -> Result<StorageSummary> {
        self.conn
            .query_row(
                "SELECT COUNT(*), COUNT(DISTINCT url), MAX(timestamp) FROM clicks",
                [],
                |row| {
                    Ok(StorageSummary {
                        total_clicks: row.get(0)?,
                        distinct_pages: row.get(1)?,
                        latest_click_at: row.get(2)?,
                    })
                },
            )
            .context("Failed to summarize clicks")
    }
}
