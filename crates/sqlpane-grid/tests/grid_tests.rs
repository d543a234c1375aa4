// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use serde_json::{Value, json};
use sqlpane_app::{Filter, FilterOperator, KeyKind, Row};
use sqlpane_grid::{
    CellRef, CellTarget, DataTable, Dialog, DialogKind, GridAxes, GridCommand, GridEvent,
    GridOptions, NoticeLevel, RowMutations, RowTarget,
};
use sqlpane_testkit::{DemoDataset, ORDER_COUNT, PLAN_COUNT};
use std::time::{Duration, Instant};

/// Routes grid mutations into one table of the demo dataset.
struct DemoBackend {
    dataset: DemoDataset,
    table: &'static str,
}

impl DemoBackend {
    fn new(table: &'static str) -> Self {
        Self {
            dataset: DemoDataset::generate(7),
            table,
        }
    }

    fn rows(&self) -> Vec<Row> {
        self.dataset
            .table(self.table)
            .map(|table| table.rows.clone())
            .unwrap_or_default()
    }

    fn grid(&self, page_size: usize) -> Result<DataTable> {
        let table = self
            .dataset
            .table(self.table)
            .with_context(|| format!("demo table {} missing", self.table))?;
        let mut grid = DataTable::new(
            self.table,
            table.columns.clone(),
            GridAxes::client_side(page_size),
            GridOptions::default(),
        );
        grid.set_rows(table.rows.clone(), None);
        Ok(grid)
    }
}

fn key_of(row: &Row) -> Result<Value> {
    row.get("id").cloned().context("row has no id")
}

impl RowMutations for DemoBackend {
    fn insert_row(&mut self, values: &Row) -> Result<()> {
        self.dataset.insert(self.table, values)?;
        Ok(())
    }

    fn update_cell(&mut self, target: &CellTarget, value: &Value) -> Result<()> {
        let key = key_of(&target.row)?;
        self.dataset
            .update(self.table, &key, &target.column, value)
    }

    fn delete_rows(&mut self, targets: &[RowTarget]) -> Result<()> {
        let keys = targets
            .iter()
            .map(|target| key_of(&target.row))
            .collect::<Result<Vec<_>>>()?;
        self.dataset.delete(self.table, &keys)?;
        Ok(())
    }
}

fn type_text(grid: &mut DataTable, backend: &mut DemoBackend, text: &str) {
    for ch in text.chars() {
        grid.dispatch(GridCommand::DialogInput(ch), backend);
    }
}

#[test]
fn client_side_grid_filters_sorts_and_pages_customers() -> Result<()> {
    let mut backend = DemoBackend::new("customers");
    let mut grid = backend.grid(10)?;
    let expected = backend
        .rows()
        .iter()
        .filter(|row| row.display("country") == "NZ")
        .count();
    assert!(expected > 0);

    let events = grid.dispatch(
        GridCommand::AddFilter(Filter::new("country", FilterOperator::Equals, "nz")),
        &mut backend,
    );
    assert!(matches!(events.first(), Some(GridEvent::FiltersChanged(_))));
    assert_eq!(grid.view().total, expected);
    assert_eq!(grid.total_pages(), expected.div_ceil(10));
    assert_eq!(grid.page_rows().len(), expected.min(10));
    assert!(
        grid.page_rows()
            .iter()
            .all(|row| row.display("country") == "NZ")
    );

    grid.dispatch(GridCommand::SortBy("balance".to_owned()), &mut backend);
    grid.dispatch(GridCommand::SortBy("balance".to_owned()), &mut backend);
    let balances = grid
        .page_rows()
        .iter()
        .filter_map(|row| row.get("balance").and_then(Value::as_f64))
        .collect::<Vec<_>>();
    assert!(balances.windows(2).all(|pair| pair[0] >= pair[1]));

    grid.dispatch(GridCommand::GoToPage(99), &mut backend);
    let last = grid.total_pages();
    assert_eq!(grid.pagination().page, last);
    assert_eq!(grid.page_rows().len(), expected - (last - 1) * 10);
    Ok(())
}

#[test]
fn deleting_a_referenced_customer_reports_the_failure() -> Result<()> {
    let mut backend = DemoBackend::new("customers");
    let mut grid = backend.grid(25)?;
    let orders = backend.dataset.table("orders").context("orders missing")?;
    let referenced = orders.rows[0]
        .get("customer_id")
        .cloned()
        .context("order without customer")?;
    grid.set_rows(
        backend.dataset.rows_matching("customers", "id", &referenced),
        None,
    );
    let before = backend.rows().len();

    grid.dispatch(GridCommand::ToggleRowSelection(0), &mut backend);
    grid.dispatch(GridCommand::OpenDeleteConfirm, &mut backend);
    assert_eq!(grid.dialog().map(Dialog::kind), Some(DialogKind::DeleteConfirm));
    let events = grid.dispatch(GridCommand::Confirm, &mut backend);

    assert!(!events.contains(&GridEvent::RefetchRequested));
    assert_eq!(backend.rows().len(), before);
    let notice = grid.notices().latest().context("expected a notice")?;
    assert_eq!(notice.level, NoticeLevel::Error);
    assert!(notice.message.contains("still referenced"), "{}", notice.message);
    assert_eq!(grid.selection().len(), 1);
    Ok(())
}

#[test]
fn deleting_selected_orders_refetches() -> Result<()> {
    let mut backend = DemoBackend::new("orders");
    let mut grid = backend.grid(25)?;

    grid.dispatch(GridCommand::ToggleRowSelection(0), &mut backend);
    grid.dispatch(GridCommand::ToggleRowSelection(1), &mut backend);
    grid.dispatch(GridCommand::OpenDeleteConfirm, &mut backend);
    let events = grid.dispatch(GridCommand::Confirm, &mut backend);

    assert!(events.contains(&GridEvent::RefetchRequested));
    assert_eq!(backend.rows().len(), ORDER_COUNT - 2);
    assert!(grid.selection().is_empty());
    let notice = grid.notices().latest().context("expected a notice")?;
    assert_eq!(notice.level, NoticeLevel::Success);
    assert_eq!(notice.message, "2 rows deleted");
    Ok(())
}

#[test]
fn key_columns_are_guarded_before_editing() -> Result<()> {
    let mut backend = DemoBackend::new("orders");
    let mut grid = backend.grid(25)?;

    let events = grid.dispatch(GridCommand::DoubleClick(CellRef::new(0, "id")), &mut backend);
    assert_eq!(events, vec![GridEvent::DialogOpened(DialogKind::KeyGuard)]);
    assert!(matches!(
        grid.dialog(),
        Some(Dialog::KeyGuard {
            kind: KeyKind::Primary,
            ..
        })
    ));
    grid.dispatch(GridCommand::Confirm, &mut backend);
    assert_eq!(grid.dialog().map(Dialog::kind), Some(DialogKind::Edit));
    grid.dispatch(GridCommand::Cancel, &mut backend);

    grid.dispatch(
        GridCommand::DoubleClick(CellRef::new(0, "customer_id")),
        &mut backend,
    );
    assert!(matches!(
        grid.dialog(),
        Some(Dialog::KeyGuard {
            kind: KeyKind::Foreign,
            ..
        })
    ));
    grid.dispatch(GridCommand::Cancel, &mut backend);
    assert!(grid.dialog().is_none());
    Ok(())
}

#[test]
fn editing_a_plain_cell_writes_through_to_the_backend() -> Result<()> {
    let mut backend = DemoBackend::new("orders");
    let mut grid = backend.grid(25)?;
    let key = key_of(grid.page_rows()[0])?;

    let events = grid.dispatch(GridCommand::DoubleClick(CellRef::new(0, "status")), &mut backend);
    assert_eq!(events, vec![GridEvent::DialogOpened(DialogKind::Edit)]);
    grid.dispatch(GridCommand::DialogClear, &mut backend);
    type_text(&mut grid, &mut backend, "refunded");
    let events = grid.dispatch(GridCommand::Confirm, &mut backend);
    assert!(events.contains(&GridEvent::RefetchRequested));

    let updated = backend.dataset.rows_matching("orders", "id", &key);
    assert_eq!(updated.len(), 1);
    assert_eq!(updated[0].get("status"), Some(&json!("refunded")));
    Ok(())
}

#[test]
fn single_click_on_foreign_key_offers_navigation() -> Result<()> {
    let mut backend = DemoBackend::new("orders");
    let mut grid = backend.grid(25)?;
    let start = Instant::now();

    let events = grid.dispatch(
        GridCommand::Click {
            cell: CellRef::new(0, "customer_id"),
            at: start,
        },
        &mut backend,
    );
    assert!(events.is_empty());
    assert!(grid.click_pending());

    let events = grid.dispatch(
        GridCommand::Tick(start + Duration::from_millis(300)),
        &mut backend,
    );
    assert_eq!(events, vec![GridEvent::DialogOpened(DialogKind::ForeignKeyMenu)]);

    grid.dispatch(GridCommand::DialogCycle(1), &mut backend);
    let events = grid.dispatch(GridCommand::Confirm, &mut backend);
    let Some(GridEvent::ForeignKeyNavigate { reference, value }) = events.last() else {
        panic!("expected navigation, got {events:?}");
    };
    assert_eq!(reference.table, "customers");
    assert_eq!(reference.column, "id");
    let targets = backend.dataset.rows_matching(&reference.table, &reference.column, value);
    assert_eq!(targets.len(), 1);
    Ok(())
}

#[test]
fn insert_dialog_adds_a_plan_and_reports_duplicates() -> Result<()> {
    let mut backend = DemoBackend::new("plans");
    let mut grid = backend.grid(10)?;

    grid.dispatch(GridCommand::OpenInsert, &mut backend);
    grid.dispatch(GridCommand::DialogNextField, &mut backend);
    type_text(&mut grid, &mut backend, "Team");
    let events = grid.dispatch(GridCommand::Confirm, &mut backend);
    assert!(events.contains(&GridEvent::RefetchRequested));
    let rows = backend.rows();
    assert_eq!(rows.len(), PLAN_COUNT + 1);
    assert_eq!(rows[PLAN_COUNT].display("name"), "Team");

    grid.dispatch(GridCommand::OpenInsert, &mut backend);
    type_text(&mut grid, &mut backend, "1");
    let events = grid.dispatch(GridCommand::Confirm, &mut backend);
    assert!(!events.contains(&GridEvent::RefetchRequested));
    let notice = grid.notices().latest().context("expected a notice")?;
    assert_eq!(notice.level, NoticeLevel::Error);
    assert!(notice.message.contains("duplicate key"), "{}", notice.message);
    assert_eq!(backend.rows().len(), PLAN_COUNT + 1);
    Ok(())
}
