// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::Result;
use sqlpane_app::{ConnectionId, TableRef, WidthStore};
use sqlpane_store::{Store, validate_db_path};
use sqlpane_testkit::{column_widths, temp_db_path};

#[test]
fn validate_db_path_rejects_uri_forms() {
    assert!(validate_db_path("file:test.db").is_err());
    assert!(validate_db_path("https://example.com/db.sqlite").is_err());
    assert!(validate_db_path("db.sqlite?mode=ro").is_err());
    assert!(validate_db_path("").is_err());
    assert!(validate_db_path("/tmp/sqlpane.db").is_ok());
    assert!(validate_db_path(":memory:").is_ok());
}

#[test]
fn bootstrap_is_idempotent() -> Result<()> {
    let store = Store::open_memory()?;
    store.bootstrap()?;
    store.bootstrap()?;
    assert!(store.list_width_keys()?.is_empty());
    Ok(())
}

#[test]
fn bootstrap_rejects_schema_missing_required_column() -> Result<()> {
    let store = Store::open_memory()?;
    store.bootstrap()?;

    store.raw_connection().execute_batch(
        "
            DROP TABLE column_widths;
            CREATE TABLE column_widths (
              storage_key TEXT PRIMARY KEY,
              updated_at TEXT NOT NULL
            );
            ",
    )?;

    let err = store
        .bootstrap()
        .expect_err("schema validation should fail");
    let message = err.to_string();
    assert!(message.contains("table `column_widths` is missing required columns"));
    assert!(message.contains("widths"));
    Ok(())
}

#[test]
fn bootstrap_rejects_foreign_database() -> Result<()> {
    let store = Store::open_memory()?;
    store
        .raw_connection()
        .execute_batch("CREATE TABLE invoices (id INTEGER PRIMARY KEY);")?;

    let err = store
        .bootstrap()
        .expect_err("unrelated database should be refused");
    assert!(err.to_string().contains("missing required table `column_widths`"));
    Ok(())
}

#[test]
fn widths_persist_across_reopen() -> Result<()> {
    let (_dir, path) = temp_db_path()?;
    let key = TableRef::new(ConnectionId::new(2), "public", "customers").storage_key();

    {
        let store = Store::open(&path)?;
        store.bootstrap()?;
        store.save_widths(&key, &column_widths(&[("email", 28), ("name", 14)]))?;
    }

    let store = Store::open(&path)?;
    store.bootstrap()?;
    assert_eq!(
        store.load_widths(&key)?,
        Some(column_widths(&[("email", 28), ("name", 14)]))
    );
    assert_eq!(store.list_width_keys()?, vec!["2:public:customers".to_owned()]);
    Ok(())
}

#[test]
fn last_save_wins_and_keys_are_independent() -> Result<()> {
    let store = Store::open_memory()?;
    store.bootstrap()?;

    store.save_column_widths("1:public:orders", &column_widths(&[("total", 10)]))?;
    store.save_column_widths("1:public:orders", &column_widths(&[("status", 12)]))?;
    store.save_column_widths("1:sales:orders", &column_widths(&[("total", 20)]))?;

    assert_eq!(
        store.load_column_widths("1:public:orders")?,
        Some(column_widths(&[("status", 12)]))
    );
    assert_eq!(
        store.load_column_widths("1:sales:orders")?,
        Some(column_widths(&[("total", 20)]))
    );
    assert!(store.clear_column_widths("1:sales:orders")?);
    assert!(!store.clear_column_widths("1:sales:orders")?);
    assert_eq!(store.load_column_widths("1:sales:orders")?, None);
    Ok(())
}

#[test]
fn corrupt_widths_surface_an_error() -> Result<()> {
    let store = Store::open_memory()?;
    store.bootstrap()?;
    store.raw_connection().execute(
        "INSERT INTO column_widths (storage_key, widths, updated_at) VALUES ('k', 'not json', 'x')",
        [],
    )?;

    let err = store
        .load_column_widths("k")
        .expect_err("corrupt widths should fail to decode");
    assert!(err.to_string().contains("decode column widths for k"));
    Ok(())
}

#[test]
fn page_size_setting_is_validated() -> Result<()> {
    let store = Store::open_memory()?;
    store.bootstrap()?;

    assert_eq!(store.get_page_size()?, None);
    store.put_page_size(50)?;
    assert_eq!(store.get_page_size()?, Some(50));

    let err = store.put_page_size(30).expect_err("30 is not a choice");
    assert!(err.to_string().contains("10, 25, 50, 100"));
    assert_eq!(store.get_page_size()?, Some(50));

    store.raw_connection().execute(
        "UPDATE settings SET value = 'lots' WHERE key = 'grid.page_size'",
        [],
    )?;
    assert!(store.get_page_size().is_err());
    Ok(())
}
