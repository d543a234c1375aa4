// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use sqlpane_app::{ColumnDescriptor, ColumnWidths, Row, WidthStore};

pub const MIN_SEED_WIDTH: u16 = 6;
pub const MAX_SEED_WIDTH: u16 = 40;
pub const MIN_COLUMN_WIDTH: u16 = 4;
pub const MAX_COLUMN_WIDTH: u16 = 80;
pub const SEED_SAMPLE_ROWS: usize = 50;

/// Initial width from the header (plus room for the sort marker) and the
/// first rows of data.
pub fn seed_width(column: &ColumnDescriptor, rows: &[Row]) -> u16 {
    let header = column.name.chars().count() + 2;
    let widest_cell = rows
        .iter()
        .take(SEED_SAMPLE_ROWS)
        .map(|row| row.display(&column.name).chars().count())
        .max()
        .unwrap_or(0);
    let width = header.max(widest_cell).min(usize::from(u16::MAX));
    (width as u16).clamp(MIN_SEED_WIDTH, MAX_SEED_WIDTH)
}

pub fn seed_widths(columns: &[ColumnDescriptor], rows: &[Row]) -> ColumnWidths {
    columns
        .iter()
        .map(|column| (column.name.clone(), seed_width(column, rows)))
        .collect()
}

/// Seeded widths plus the user's resizes. Only resizes are persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnWidthState {
    seeded: ColumnWidths,
    overrides: ColumnWidths,
}

impl ColumnWidthState {
    /// Seeds columns that have no width yet. Widths already seeded stay put
    /// so paging does not make the grid jump around.
    pub fn seed(&mut self, columns: &[ColumnDescriptor], rows: &[Row]) {
        for column in columns {
            if !self.seeded.contains_key(&column.name) {
                self.seeded
                    .insert(column.name.clone(), seed_width(column, rows));
            }
        }
    }

    pub fn width(&self, column: &str) -> u16 {
        self.overrides
            .get(column)
            .or_else(|| self.seeded.get(column))
            .copied()
            .unwrap_or(MIN_SEED_WIDTH)
    }

    /// Returns the new width.
    pub fn resize(&mut self, column: &str, delta: i32) -> u16 {
        let current = i32::from(self.width(column));
        let next = (current + delta)
            .clamp(i32::from(MIN_COLUMN_WIDTH), i32::from(MAX_COLUMN_WIDTH))
            as u16;
        self.overrides.insert(column.to_owned(), next);
        next
    }

    pub fn apply_overrides(&mut self, widths: ColumnWidths) {
        for (column, width) in widths {
            self.overrides
                .insert(column, width.clamp(MIN_COLUMN_WIDTH, MAX_COLUMN_WIDTH));
        }
    }

    pub fn reset(&mut self) {
        self.overrides.clear();
    }

    pub fn overrides(&self) -> &ColumnWidths {
        &self.overrides
    }
}

/// Stored widths for a table, or nothing if the store cannot be read.
pub fn load_saved_widths(store: &dyn WidthStore, key: &str) -> ColumnWidths {
    match store.load_widths(key) {
        Ok(widths) => widths.unwrap_or_default(),
        Err(error) => {
            tracing::warn!(key, error = %error, "could not load column widths");
            ColumnWidths::new()
        }
    }
}

pub fn save_widths(store: &dyn WidthStore, key: &str, widths: &ColumnWidths) -> bool {
    match store.save_widths(key, widths) {
        Ok(()) => true,
        Err(error) => {
            tracing::warn!(key, error = %error, "could not save column widths");
            false
        }
    }
}
