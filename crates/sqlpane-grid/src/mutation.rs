// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, bail};
use serde_json::Value;
use sqlpane_app::Row;

use crate::notify::{NoticeLevel, Notifications};

/// A row as the grid saw it when the user acted on it.
#[derive(Debug, Clone, PartialEq)]
pub struct RowTarget {
    pub row_index: usize,
    pub row: Row,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CellTarget {
    pub row_index: usize,
    pub column: String,
    pub row: Row,
}

/// Backend operations behind the grid's insert, edit, and delete actions.
/// Implementations resolve row identity from the row copies they receive.
pub trait RowMutations {
    fn insert_row(&mut self, values: &Row) -> Result<()>;
    fn update_cell(&mut self, target: &CellTarget, value: &Value) -> Result<()>;
    fn delete_rows(&mut self, targets: &[RowTarget]) -> Result<()>;
}

/// For grids over query results, which have no table to write back to.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadOnly;

impl RowMutations for ReadOnly {
    fn insert_row(&mut self, _values: &Row) -> Result<()> {
        bail!("this grid is read-only")
    }

    fn update_cell(&mut self, _target: &CellTarget, _value: &Value) -> Result<()> {
        bail!("this grid is read-only")
    }

    fn delete_rows(&mut self, _targets: &[RowTarget]) -> Result<()> {
        bail!("this grid is read-only")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    Insert,
    Update,
    Delete,
}

impl MutationKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Insert => "insert",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

/// Runs mutations and turns their outcome into a bool plus a notice.
/// Errors never escape to the caller. One flag covers all three kinds, so a
/// second mutation is refused while another is in flight.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MutationBridge {
    in_flight: Option<MutationKind>,
}

impl MutationBridge {
    pub fn is_mutating(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn in_flight(&self) -> Option<MutationKind> {
        self.in_flight
    }

    /// Marks a mutation as started. Returns false, with an error notice, if
    /// one is already running.
    pub fn begin(&mut self, kind: MutationKind, notices: &mut Notifications) -> bool {
        if let Some(running) = self.in_flight {
            notices.push(
                NoticeLevel::Error,
                format!("{} still in progress; try again shortly", running.label()),
            );
            return false;
        }
        self.in_flight = Some(kind);
        true
    }

    pub fn finish(
        &mut self,
        result: Result<()>,
        success: &str,
        notices: &mut Notifications,
    ) -> bool {
        let kind = self.in_flight.take();
        let label = kind.map_or("change", MutationKind::label);
        match result {
            Ok(()) => {
                tracing::info!(kind = label, "mutation succeeded");
                notices.push(NoticeLevel::Success, success);
                true
            }
            Err(error) => {
                tracing::warn!(kind = label, error = %error, "mutation failed");
                notices.push(NoticeLevel::Error, format!("{label} failed: {error:#}"));
                false
            }
        }
    }

    pub fn insert<M: RowMutations + ?Sized>(
        &mut self,
        mutations: &mut M,
        values: &Row,
        notices: &mut Notifications,
    ) -> bool {
        if !self.begin(MutationKind::Insert, notices) {
            return false;
        }
        let result = mutations.insert_row(values);
        self.finish(result, "row inserted", notices)
    }

    pub fn update<M: RowMutations + ?Sized>(
        &mut self,
        mutations: &mut M,
        target: &CellTarget,
        value: &Value,
        notices: &mut Notifications,
    ) -> bool {
        if !self.begin(MutationKind::Update, notices) {
            return false;
        }
        let result = mutations.update_cell(target, value);
        self.finish(result, &format!("{} updated", target.column), notices)
    }

    pub fn delete<M: RowMutations + ?Sized>(
        &mut self,
        mutations: &mut M,
        targets: &[RowTarget],
        notices: &mut Notifications,
    ) -> bool {
        if targets.is_empty() {
            notices.push(NoticeLevel::Info, "select rows to delete first");
            return false;
        }
        if !self.begin(MutationKind::Delete, notices) {
            return false;
        }
        let result = mutations.delete_rows(targets);
        let message = match targets.len() {
            1 => "1 row deleted".to_owned(),
            count => format!("{count} rows deleted"),
        };
        self.finish(result, &message, notices)
    }
}
