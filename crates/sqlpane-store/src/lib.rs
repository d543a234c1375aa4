// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use rusqlite::{Connection, OptionalExtension, params};
use sqlpane_app::{ColumnWidths, PAGE_SIZE_CHOICES, WidthStore, is_valid_page_size};
use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

pub const APP_NAME: &str = "sqlpane";

const PAGE_SIZE_SETTING: &str = "grid.page_size";

const REQUIRED_SCHEMA: &[(&str, &[&str])] = &[
    ("column_widths", &["storage_key", "widths", "updated_at"]),
    ("settings", &["key", "value", "updated_at"]),
];

/// Local preferences: saved column widths per table and a few settings.
pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self> {
        let printable = path.to_string_lossy().to_string();
        validate_db_path(&printable)?;
        let conn = Connection::open(path)
            .with_context(|| format!("open preferences database at {}", path.display()))?;
        configure_connection(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("open in-memory database")?;
        configure_connection(&conn)?;
        Ok(Self { conn })
    }

    pub fn raw_connection(&self) -> &Connection {
        &self.conn
    }

    pub fn bootstrap(&self) -> Result<()> {
        if has_user_tables(&self.conn)? {
            validate_schema(&self.conn)?;
        } else {
            self.conn
                .execute_batch(include_str!("sql/schema.sql"))
                .context("create preferences schema")?;
        }
        Ok(())
    }

    pub fn load_column_widths(&self, storage_key: &str) -> Result<Option<ColumnWidths>> {
        let raw = self
            .conn
            .query_row(
                "SELECT widths FROM column_widths WHERE storage_key = ?",
                params![storage_key],
                |row| row.get::<_, String>(0),
            )
            .optional()
            .with_context(|| format!("read column widths for {storage_key}"))?;

        let Some(raw) = raw else {
            return Ok(None);
        };
        let mut widths: ColumnWidths = serde_json::from_str(&raw)
            .with_context(|| format!("decode column widths for {storage_key}"))?;
        widths.retain(|_, width| *width > 0);
        Ok(Some(widths))
    }

    /// Replaces whatever was stored for `storage_key`. Concurrent writers are
    /// not reconciled; the last save wins.
    pub fn save_column_widths(&self, storage_key: &str, widths: &ColumnWidths) -> Result<()> {
        let encoded = serde_json::to_string(widths)
            .with_context(|| format!("encode column widths for {storage_key}"))?;
        let now = now_rfc3339()?;
        self.conn
            .execute(
                "
                INSERT INTO column_widths (storage_key, widths, updated_at)
                VALUES (?, ?, ?)
                ON CONFLICT(storage_key) DO UPDATE SET
                  widths = excluded.widths,
                  updated_at = excluded.updated_at
                ",
                params![storage_key, encoded, now],
            )
            .with_context(|| format!("save column widths for {storage_key}"))?;
        tracing::debug!(storage_key, columns = widths.len(), "saved column widths");
        Ok(())
    }

    pub fn clear_column_widths(&self, storage_key: &str) -> Result<bool> {
        let removed = self
            .conn
            .execute(
                "DELETE FROM column_widths WHERE storage_key = ?",
                params![storage_key],
            )
            .with_context(|| format!("clear column widths for {storage_key}"))?;
        Ok(removed > 0)
    }

    pub fn list_width_keys(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT storage_key FROM column_widths ORDER BY storage_key ASC")
            .context("prepare width keys query")?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .context("query width keys")?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .context("collect width keys")
    }

    pub fn get_page_size(&self) -> Result<Option<usize>> {
        let Some(raw) = self.get_setting_raw(PAGE_SIZE_SETTING)? else {
            return Ok(None);
        };
        let page_size = raw
            .parse::<usize>()
            .ok()
            .filter(|size| is_valid_page_size(*size))
            .ok_or_else(|| {
                anyhow!(
                    "setting `{PAGE_SIZE_SETTING}` has invalid value `{raw}`; expected one of {}",
                    page_size_choices()
                )
            })?;
        Ok(Some(page_size))
    }

    pub fn put_page_size(&self, page_size: usize) -> Result<()> {
        if !is_valid_page_size(page_size) {
            bail!(
                "page size {page_size} is not supported; choose one of {}",
                page_size_choices()
            );
        }
        self.put_setting_raw(PAGE_SIZE_SETTING, &page_size.to_string())
    }

    fn get_setting_raw(&self, key: &str) -> Result<Option<String>> {
        self.conn
            .query_row(
                "SELECT value FROM settings WHERE key = ?",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()
            .with_context(|| format!("read setting {key}"))
    }

    fn put_setting_raw(&self, key: &str, value: &str) -> Result<()> {
        let now = now_rfc3339()?;
        self.conn
            .execute(
                "
                INSERT INTO settings (key, value, updated_at)
                VALUES (?, ?, ?)
                ON CONFLICT(key) DO UPDATE SET
                  value = excluded.value,
                  updated_at = excluded.updated_at
                ",
                params![key, value, now],
            )
            .with_context(|| format!("upsert setting {key}"))?;
        Ok(())
    }
}

impl WidthStore for Store {
    fn load_widths(&self, key: &str) -> Result<Option<ColumnWidths>> {
        self.load_column_widths(key)
    }

    fn save_widths(&self, key: &str, widths: &ColumnWidths) -> Result<()> {
        if widths.is_empty() {
            self.clear_column_widths(key)?;
            return Ok(());
        }
        self.save_column_widths(key, widths)
    }
}

pub fn default_db_path() -> Result<PathBuf> {
    if let Some(override_path) = env::var_os("SQLPANE_DB_PATH") {
        return Ok(PathBuf::from(override_path));
    }

    let data_root = dirs::data_local_dir().ok_or_else(|| {
        anyhow!("cannot resolve data directory; set SQLPANE_DB_PATH to a writable database path")
    })?;

    let app_dir = data_root.join(APP_NAME);
    fs::create_dir_all(&app_dir)
        .with_context(|| format!("create data directory {}", app_dir.display()))?;
    Ok(app_dir.join("sqlpane.db"))
}

pub fn validate_db_path(path: &str) -> Result<()> {
    if path.is_empty() {
        bail!("database path must not be empty");
    }
    if path == ":memory:" {
        return Ok(());
    }

    if let Some(index) = path.find("://")
        && index > 0
    {
        let scheme = &path[..index];
        if scheme.chars().all(char::is_alphabetic) {
            bail!(
                "database path {path:?} looks like a URI ({scheme}://); pass a filesystem path instead"
            );
        }
    }

    if path.starts_with("file:") {
        bail!("database path {path:?} uses file: URI syntax; pass a plain filesystem path");
    }

    if path.contains('?') {
        bail!(
            "database path {path:?} contains '?'; remove query parameters and use a plain file path"
        );
    }

    Ok(())
}

fn page_size_choices() -> String {
    PAGE_SIZE_CHOICES
        .iter()
        .map(usize::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn has_user_tables(conn: &Connection) -> Result<bool> {
    let count: i64 = conn
        .query_row(
            "
            SELECT COUNT(*)
            FROM sqlite_master
            WHERE type = 'table'
              AND name NOT LIKE 'sqlite_%'
            ",
            [],
            |row| row.get(0),
        )
        .context("count user tables")?;
    Ok(count > 0)
}

fn validate_schema(conn: &Connection) -> Result<()> {
    for (table, required_columns) in REQUIRED_SCHEMA {
        if !table_exists(conn, table)? {
            bail!(
                "database is missing required table `{table}`; point storage.db_path at a sqlpane preferences file"
            );
        }

        let columns = table_columns(conn, table)?;
        let missing: Vec<&str> = required_columns
            .iter()
            .copied()
            .filter(|column| !columns.contains(*column))
            .collect();

        if !missing.is_empty() {
            bail!(
                "table `{table}` is missing required columns: {}; delete the preferences file to recreate it",
                missing.join(", ")
            );
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> Result<bool> {
    let exists = conn
        .query_row(
            "
            SELECT EXISTS(
              SELECT 1
              FROM sqlite_master
              WHERE type = 'table' AND name = ?
            )
            ",
            params![table],
            |row| row.get::<_, i64>(0),
        )
        .with_context(|| format!("check table existence for {table}"))?;
    Ok(exists == 1)
}

fn table_columns(conn: &Connection, table: &str) -> Result<BTreeSet<String>> {
    let mut stmt = conn
        .prepare(&format!("PRAGMA table_info({table})"))
        .with_context(|| format!("inspect columns for {table}"))?;
    let rows = stmt
        .query_map([], |row| row.get::<_, String>(1))
        .with_context(|| format!("query column info for {table}"))?;

    rows.collect::<rusqlite::Result<BTreeSet<_>>>()
        .with_context(|| format!("collect columns for {table}"))
}

fn configure_connection(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA busy_timeout = 5000;
        ",
    )
    .context("configure sqlite pragmas")
}

fn now_rfc3339() -> Result<String> {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .context("format current timestamp")
}
