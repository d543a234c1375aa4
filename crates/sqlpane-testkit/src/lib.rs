// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use serde_json::{Value, json};
use sqlpane_app::{ColumnDescriptor, ForeignKeyRef, Row, compare_values};
use std::collections::BTreeMap;
use std::path::PathBuf;
use time::macros::date;
use time::{Date, Duration};

pub const DEMO_SCHEMA: &str = "public";
pub const PLAN_COUNT: usize = 4;
pub const CUSTOMER_COUNT: usize = 137;
pub const ORDER_COUNT: usize = 260;

const PLAN_NAMES: [&str; PLAN_COUNT] = ["Starter", "Team", "Business", "Enterprise"];
const PLAN_PRICES: [f64; PLAN_COUNT] = [0.0, 29.5, 99.0, 449.99];

const FIRST_NAMES: [&str; 16] = [
    "Avery", "Jordan", "Taylor", "Riley", "Morgan", "Casey", "Alex", "Quinn", "Parker", "Drew",
    "Kai", "Elliot", "Robin", "Cameron", "Hayden", "Rowan",
];
const LAST_NAMES: [&str; 18] = [
    "Walker", "Martin", "Hill", "Evans", "Lopez", "Gray", "Ward", "Young", "Diaz", "Reed",
    "Campbell", "Turner", "Flores", "Bennett", "Price", "Morris", "Foster", "Brooks",
];
const COUNTRIES: [&str; 8] = ["US", "CA", "DE", "FR", "BR", "JP", "IN", "NZ"];
const ORDER_STATUSES: [&str; 4] = ["pending", "paid", "shipped", "refunded"];
const NOTE_WORDS: [&str; 12] = [
    "renewal", "discount", "migrated", "priority", "invoice", "trial", "upgrade", "support",
    "referral", "churn", "risk", "annual",
];

#[derive(Debug, Clone)]
struct DeterministicRng {
    state: u64,
}

impl DeterministicRng {
    fn new(seed: u64) -> Self {
        let mut state = seed ^ 0x9E37_79B9_7F4A_7C15;
        if state == 0 {
            state = 0xA409_3822_299F_31D0;
        }
        Self { state }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);

        let mut x = self.state;
        x ^= x >> 13;
        x ^= x << 7;
        x ^= x >> 17;
        x
    }

    fn int_n(&mut self, n: usize) -> usize {
        if n <= 1 {
            return 0;
        }
        (self.next_u64() % (n as u64)) as usize
    }

    fn bool(&mut self) -> bool {
        (self.next_u64() & 1) == 1
    }
}

/// Seeded generator for demo rows. Same seed, same rows.
#[derive(Debug, Clone)]
pub struct ShopFaker {
    rng: DeterministicRng,
    seed: u64,
}

impl ShopFaker {
    pub fn new(seed: u64) -> Self {
        let normalized = if seed == 0 { 1 } else { seed };
        Self {
            rng: DeterministicRng::new(normalized),
            seed: normalized,
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn int_n(&mut self, n: usize) -> usize {
        self.rng.int_n(n)
    }

    pub fn plan(&mut self, id: i64) -> Row {
        let index = (id as usize).saturating_sub(1) % PLAN_COUNT;
        Row::from_pairs([
            ("id", json!(id)),
            ("name", json!(PLAN_NAMES[index])),
            ("monthly_price", json!(PLAN_PRICES[index])),
            ("seats", json!(5_i64 * 4_i64.pow(index as u32))),
            ("archived", json!(false)),
        ])
    }

    pub fn customer(&mut self, id: i64) -> Row {
        let first = self.pick(&FIRST_NAMES);
        let last = self.pick(&LAST_NAMES);
        let plan_id = if self.rng.int_n(10) == 0 {
            Value::Null
        } else {
            json!(self.rng.int_n(PLAN_COUNT) as i64 + 1)
        };
        let notes = if self.rng.bool() {
            Value::Null
        } else {
            json!(self.sentence(2, 5))
        };
        Row::from_pairs([
            ("id", json!(id)),
            ("name", json!(format!("{first} {last}"))),
            (
                "email",
                json!(format!(
                    "{}.{}{}@example.com",
                    first.to_lowercase(),
                    last.to_lowercase(),
                    id
                )),
            ),
            ("country", json!(self.pick(&COUNTRIES))),
            ("plan_id", plan_id),
            ("signup_date", json!(self.date_between(date!(2021 - 01 - 01), 1400).to_string())),
            ("balance", json!(self.int_range_i64(-5_000, 250_000) as f64 / 100.0)),
            ("active", json!(self.rng.int_n(5) != 0)),
            ("notes", notes),
        ])
    }

    pub fn order(&mut self, id: i64, customer_count: usize) -> Row {
        let customer_id = self.rng.int_n(customer_count.max(1)) as i64 + 1;
        Row::from_pairs([
            ("id", json!(id)),
            ("customer_id", json!(customer_id)),
            ("total", json!(self.int_range_i64(500, 120_000) as f64 / 100.0)),
            ("status", json!(self.pick(&ORDER_STATUSES))),
            ("placed_on", json!(self.date_between(date!(2024 - 01 - 01), 540).to_string())),
        ])
    }

    fn pick<'a>(&mut self, items: &'a [&'a str]) -> &'a str {
        items[self.rng.int_n(items.len())]
    }

    fn int_range_i64(&mut self, min: i64, max: i64) -> i64 {
        if max <= min {
            return min;
        }
        let span = max - min + 1;
        min + (self.rng.next_u64() % (span as u64)) as i64
    }

    fn date_between(&mut self, start: Date, days: i64) -> Date {
        let offset = self.int_range_i64(0, days);
        start.checked_add(Duration::days(offset)).unwrap_or(start)
    }

    fn sentence(&mut self, min_words: usize, max_words: usize) -> String {
        let count = min_words + self.rng.int_n(max_words.saturating_sub(min_words) + 1);
        let mut parts = Vec::with_capacity(count);
        for _ in 0..count {
            parts.push(self.pick(&NOTE_WORDS).to_owned());
        }
        parts.join(" ")
    }
}

pub fn plan_columns() -> Vec<ColumnDescriptor> {
    vec![
        ColumnDescriptor::new("id", "integer").primary_key(),
        ColumnDescriptor::new("name", "text"),
        ColumnDescriptor::new("monthly_price", "numeric"),
        ColumnDescriptor::new("seats", "integer"),
        ColumnDescriptor::new("archived", "boolean"),
    ]
}

pub fn customer_columns() -> Vec<ColumnDescriptor> {
    vec![
        ColumnDescriptor::new("id", "integer").primary_key(),
        ColumnDescriptor::new("name", "text"),
        ColumnDescriptor::new("email", "text"),
        ColumnDescriptor::new("country", "text"),
        ColumnDescriptor::new("plan_id", "integer").foreign_key(reference("plans", "id")),
        ColumnDescriptor::new("signup_date", "date"),
        ColumnDescriptor::new("balance", "numeric"),
        ColumnDescriptor::new("active", "boolean"),
        ColumnDescriptor::new("notes", "text"),
    ]
}

pub fn order_columns() -> Vec<ColumnDescriptor> {
    vec![
        ColumnDescriptor::new("id", "integer").primary_key(),
        ColumnDescriptor::new("customer_id", "integer").foreign_key(reference("customers", "id")),
        ColumnDescriptor::new("total", "numeric"),
        ColumnDescriptor::new("status", "text"),
        ColumnDescriptor::new("placed_on", "date"),
    ]
}

fn reference(table: &str, column: &str) -> ForeignKeyRef {
    ForeignKeyRef {
        schema: DEMO_SCHEMA.to_owned(),
        table: table.to_owned(),
        column: column.to_owned(),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DemoTable {
    pub name: String,
    pub columns: Vec<ColumnDescriptor>,
    pub rows: Vec<Row>,
}

impl DemoTable {
    fn primary_key(&self) -> Result<&str> {
        self.columns
            .iter()
            .find(|column| column.is_primary_key)
            .map(|column| column.name.as_str())
            .with_context(|| format!("table {} has no primary key", self.name))
    }

    fn position_of(&self, key_column: &str, key: &Value) -> Option<usize> {
        self.rows
            .iter()
            .position(|row| row.get(key_column) == Some(key))
    }

    fn next_id(&self, key_column: &str) -> i64 {
        self.rows
            .iter()
            .filter_map(|row| row.get(key_column).and_then(Value::as_i64))
            .max()
            .unwrap_or(0)
            + 1
    }
}

/// In-memory tables with primary and foreign key checks, standing in for a
/// database backend.
#[derive(Debug, Clone, PartialEq)]
pub struct DemoDataset {
    tables: Vec<DemoTable>,
}

impl DemoDataset {
    pub fn generate(seed: u64) -> Self {
        let mut faker = ShopFaker::new(seed);
        let plans = (1..=PLAN_COUNT as i64).map(|id| faker.plan(id)).collect();
        let customers = (1..=CUSTOMER_COUNT as i64)
            .map(|id| faker.customer(id))
            .collect();
        let orders = (1..=ORDER_COUNT as i64)
            .map(|id| faker.order(id, CUSTOMER_COUNT))
            .collect();
        Self {
            tables: vec![
                DemoTable {
                    name: "customers".to_owned(),
                    columns: customer_columns(),
                    rows: customers,
                },
                DemoTable {
                    name: "orders".to_owned(),
                    columns: order_columns(),
                    rows: orders,
                },
                DemoTable {
                    name: "plans".to_owned(),
                    columns: plan_columns(),
                    rows: plans,
                },
            ],
        }
    }

    pub fn table_names(&self) -> Vec<&str> {
        self.tables.iter().map(|table| table.name.as_str()).collect()
    }

    pub fn table(&self, name: &str) -> Option<&DemoTable> {
        self.tables.iter().find(|table| table.name == name)
    }

    fn table_mut(&mut self, name: &str) -> Result<&mut DemoTable> {
        self.tables
            .iter_mut()
            .find(|table| table.name == name)
            .ok_or_else(|| anyhow!("relation {name} does not exist"))
    }

    /// Rows whose `column` equals `value` exactly.
    pub fn rows_matching(&self, table: &str, column: &str, value: &Value) -> Vec<Row> {
        self.table(table)
            .map(|table| {
                table
                    .rows
                    .iter()
                    .filter(|row| {
                        row.get(column)
                            .is_some_and(|cell| compare_values(cell, value).is_eq())
                    })
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Returns the new row's primary key. Missing columns become null and a
    /// missing key is assigned.
    pub fn insert(&mut self, table: &str, values: &Row) -> Result<Value> {
        let target = self.table_mut(table)?;
        let key_column = target.primary_key()?.to_owned();
        for column in values.columns() {
            if !target.columns.iter().any(|known| &known.name == column) {
                bail!("column {column} does not exist on {table}");
            }
        }
        let key = match values.get(&key_column) {
            Some(key) if !key.is_null() => key.clone(),
            _ => json!(target.next_id(&key_column)),
        };
        if target.position_of(&key_column, &key).is_some() {
            bail!("duplicate key value violates unique constraint on {table}.{key_column}");
        }
        let mut row = Row::new();
        for column in &target.columns {
            let value = values.get(&column.name).cloned().unwrap_or(Value::Null);
            row.insert(column.name.clone(), value);
        }
        row.insert(key_column, key.clone());
        target.rows.push(row);
        Ok(key)
    }

    pub fn update(&mut self, table: &str, key: &Value, column: &str, value: &Value) -> Result<()> {
        let target = self.table_mut(table)?;
        let key_column = target.primary_key()?.to_owned();
        if !target.columns.iter().any(|known| known.name == column) {
            bail!("column {column} does not exist on {table}");
        }
        if column == key_column && target.position_of(&key_column, value).is_some() {
            bail!("duplicate key value violates unique constraint on {table}.{key_column}");
        }
        let position = target
            .position_of(&key_column, key)
            .with_context(|| format!("no row in {table} with {key_column} = {key}"))?;
        target.rows[position].insert(column.to_owned(), value.clone());
        Ok(())
    }

    /// Fails without deleting anything if any key is missing or still
    /// referenced by another table.
    pub fn delete(&mut self, table: &str, keys: &[Value]) -> Result<usize> {
        for other in &self.tables {
            for column in &other.columns {
                let Some(reference) = &column.references else {
                    continue;
                };
                if reference.table != table {
                    continue;
                }
                if let Some(key) = keys.iter().find(|key| {
                    other
                        .rows
                        .iter()
                        .any(|row| row.get(&column.name) == Some(*key))
                }) {
                    bail!(
                        "{table} row {key} is still referenced from {}.{}",
                        other.name,
                        column.name
                    );
                }
            }
        }

        let target = self.table_mut(table)?;
        let key_column = target.primary_key()?.to_owned();
        for key in keys {
            if target.position_of(&key_column, key).is_none() {
                bail!("no row in {table} with {key_column} = {key}");
            }
        }
        let before = target.rows.len();
        target.rows.retain(|row| {
            row.get(&key_column)
                .is_none_or(|value| !keys.contains(value))
        });
        Ok(before - target.rows.len())
    }
}

pub fn temp_db_path() -> Result<(tempfile::TempDir, PathBuf)> {
    let dir = tempfile::tempdir().context("create temp dir")?;
    let db_path = dir.path().join("sqlpane.db");
    Ok((dir, db_path))
}

/// Column-name to value pairs as a row, for terse fixtures.
pub fn row(pairs: &[(&str, Value)]) -> Row {
    Row::from_pairs(pairs.iter().map(|(key, value)| (*key, value.clone())))
}

pub fn column_widths(pairs: &[(&str, u16)]) -> BTreeMap<String, u16> {
    pairs
        .iter()
        .map(|(column, width)| ((*column).to_owned(), *width))
        .collect()
}
