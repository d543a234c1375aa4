// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde_json::Value;
use sqlpane_app::{
    ColumnDescriptor, ColumnWidths, EditForm, Filter, FilterOperator, ForeignKeyRef, InsertForm,
    KeyKind, Pagination, Row, Sort, display_value, is_valid_page_size, step_page_size,
};
use std::collections::BTreeSet;
use std::time::{Duration, Instant};

use crate::axis::GridAxes;
use crate::derive::{Derived, derive};
use crate::interaction::{CellInteraction, CellRef, DEFAULT_CLICK_DELAY, Gesture};
use crate::mutation::{CellTarget, MutationBridge, RowMutations, RowTarget};
use crate::notify::{DEFAULT_NOTICE_TTL, NoticeLevel, Notifications};
use crate::widths::ColumnWidthState;

pub const PRIMARY_KEY_WARNING: &str = "editing a primary key may affect row integrity";
pub const FOREIGN_KEY_WARNING: &str = "editing a foreign key may break relationships";

pub const fn key_guard_warning(kind: KeyKind) -> &'static str {
    match kind {
        KeyKind::Primary => PRIMARY_KEY_WARNING,
        KeyKind::Foreign => FOREIGN_KEY_WARNING,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridOptions {
    pub editable: bool,
    pub click_delay: Duration,
    pub notice_ttl: Duration,
}

impl Default for GridOptions {
    fn default() -> Self {
        Self {
            editable: true,
            click_delay: DEFAULT_CLICK_DELAY,
            notice_ttl: DEFAULT_NOTICE_TTL,
        }
    }
}

impl GridOptions {
    pub fn read_only() -> Self {
        Self {
            editable: false,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForeignKeyChoice {
    Copy,
    Navigate,
}

impl ForeignKeyChoice {
    pub const fn toggled(self) -> Self {
        match self {
            Self::Copy => Self::Navigate,
            Self::Navigate => Self::Copy,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Copy => "copy value",
            Self::Navigate => "open referenced row",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftField {
    Column,
    Operator,
    Value,
}

impl DraftField {
    const ORDER: [Self; 3] = [Self::Column, Self::Operator, Self::Value];

    fn step(self, delta: isize) -> Self {
        let current = Self::ORDER
            .iter()
            .position(|field| *field == self)
            .unwrap_or(0) as isize;
        Self::ORDER[(current + delta).rem_euclid(Self::ORDER.len() as isize) as usize]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterDraft {
    pub column: usize,
    pub operator: FilterOperator,
    pub value: String,
    pub focus: DraftField,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Dialog {
    KeyGuard {
        kind: KeyKind,
        target: CellTarget,
    },
    Edit {
        target: CellTarget,
        form: EditForm,
    },
    Insert {
        form: InsertForm,
        focus: usize,
    },
    DeleteConfirm {
        targets: Vec<RowTarget>,
    },
    ForeignKeyMenu {
        column: String,
        reference: ForeignKeyRef,
        value: Value,
        choice: ForeignKeyChoice,
    },
    FilterBuilder(FilterDraft),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogKind {
    KeyGuard,
    Edit,
    Insert,
    DeleteConfirm,
    ForeignKeyMenu,
    FilterBuilder,
}

impl Dialog {
    pub const fn kind(&self) -> DialogKind {
        match self {
            Self::KeyGuard { .. } => DialogKind::KeyGuard,
            Self::Edit { .. } => DialogKind::Edit,
            Self::Insert { .. } => DialogKind::Insert,
            Self::DeleteConfirm { .. } => DialogKind::DeleteConfirm,
            Self::ForeignKeyMenu { .. } => DialogKind::ForeignKeyMenu,
            Self::FilterBuilder(_) => DialogKind::FilterBuilder,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum GridCommand {
    MoveRow(isize),
    MoveColumn(isize),
    JumpFirstRow,
    JumpLastRow,
    NextPage,
    PreviousPage,
    GoToPage(usize),
    SetPageSize(usize),
    StepPageSize(isize),
    SortBy(String),
    SortCurrentColumn,
    ClearSort,
    AddFilter(Filter),
    RemoveLastFilter,
    ClearFilters,
    OpenFilterBuilder,
    ToggleRowSelection(usize),
    ToggleCurrentRow,
    SelectPage,
    ClearSelection,
    HideCurrentColumn,
    ShowAllColumns,
    ResizeColumn { column: String, delta: i32 },
    ResizeCurrentColumn(i32),
    ResetColumnWidths,
    Click { cell: CellRef, at: Instant },
    DoubleClick(CellRef),
    Tick(Instant),
    EditCurrent,
    CopyCurrent,
    FollowForeignKey,
    OpenInsert,
    OpenDeleteConfirm,
    DialogInput(char),
    DialogBackspace,
    DialogClear,
    DialogNextField,
    DialogPreviousField,
    DialogCycle(isize),
    Confirm,
    Cancel,
    Retry,
    DismissNotice(u64),
    DismissLatestNotice,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GridEvent {
    PageChanged(Pagination),
    SortChanged(Option<Sort>),
    FiltersChanged(Vec<Filter>),
    SelectionChanged(BTreeSet<usize>),
    CopyToClipboard(String),
    ForeignKeyNavigate { reference: ForeignKeyRef, value: Value },
    RefetchRequested,
    ColumnWidthsChanged(ColumnWidths),
    DialogOpened(DialogKind),
    DialogClosed,
}

/// The data grid. Rows and columns come from the caller; each query axis is
/// controlled or uncontrolled as fixed by the `GridAxes` it was built with.
#[derive(Debug, Clone)]
pub struct DataTable {
    title: String,
    columns: Vec<ColumnDescriptor>,
    rows: Vec<Row>,
    total_row_count: Option<usize>,
    loading: bool,
    error: Option<String>,
    axes: GridAxes,
    options: GridOptions,
    hidden: BTreeSet<String>,
    widths: ColumnWidthState,
    interaction: CellInteraction,
    dialog: Option<Dialog>,
    notices: Notifications,
    bridge: MutationBridge,
    cursor_row: usize,
    cursor_col: usize,
}

impl DataTable {
    pub fn new(
        title: impl Into<String>,
        columns: Vec<ColumnDescriptor>,
        axes: GridAxes,
        options: GridOptions,
    ) -> Self {
        Self {
            title: title.into(),
            columns,
            rows: Vec::new(),
            total_row_count: None,
            loading: false,
            error: None,
            axes,
            options,
            hidden: BTreeSet::new(),
            widths: ColumnWidthState::default(),
            interaction: CellInteraction::new(options.click_delay),
            dialog: None,
            notices: Notifications::new(options.notice_ttl),
            bridge: MutationBridge::default(),
            cursor_row: 0,
            cursor_col: 0,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|column| column.name == name)
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn total_row_count(&self) -> Option<usize> {
        self.total_row_count
    }

    pub fn axes(&self) -> &GridAxes {
        &self.axes
    }

    pub fn options(&self) -> GridOptions {
        self.options
    }

    pub fn pagination(&self) -> Pagination {
        *self.axes.pagination.value()
    }

    pub fn sort(&self) -> Option<&Sort> {
        self.axes.sort.value().as_ref()
    }

    pub fn filters(&self) -> &[Filter] {
        self.axes.filters.value()
    }

    pub fn selection(&self) -> &BTreeSet<usize> {
        self.axes.selection.value()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn dialog(&self) -> Option<&Dialog> {
        self.dialog.as_ref()
    }

    pub fn notices(&self) -> &Notifications {
        &self.notices
    }

    pub fn notify(&mut self, level: NoticeLevel, message: impl Into<String>) -> u64 {
        self.notices.push(level, message)
    }

    pub fn is_mutating(&self) -> bool {
        self.bridge.is_mutating()
    }

    pub fn click_pending(&self) -> bool {
        self.interaction.is_pending()
    }

    pub fn hidden_columns(&self) -> &BTreeSet<String> {
        &self.hidden
    }

    pub fn column_width(&self, column: &str) -> u16 {
        self.widths.width(column)
    }

    pub fn width_overrides(&self) -> &ColumnWidths {
        self.widths.overrides()
    }

    /// Display row and column index of the cursor.
    pub fn cursor(&self) -> (usize, usize) {
        (self.cursor_row, self.cursor_col)
    }

    pub fn current_column(&self) -> Option<&ColumnDescriptor> {
        self.columns.get(self.cursor_col)
    }

    pub fn view(&self) -> Derived {
        derive(
            &self.rows,
            self.filters(),
            self.sort(),
            self.pagination(),
            self.axes.control(),
            self.total_row_count,
        )
    }

    /// Rows on the current page, in display order.
    pub fn page_rows(&self) -> Vec<&Row> {
        self.view()
            .indices
            .into_iter()
            .filter_map(|index| self.rows.get(index))
            .collect()
    }

    pub fn total_pages(&self) -> usize {
        self.pagination().total_pages(self.view().total)
    }

    /// Column indices in display order, never empty while columns exist.
    pub fn visible_columns(&self) -> Vec<usize> {
        let visible = (0..self.columns.len())
            .filter(|index| !self.hidden.contains(&self.columns[*index].name))
            .collect::<Vec<_>>();
        if visible.is_empty() {
            (0..self.columns.len()).collect()
        } else {
            visible
        }
    }

    pub fn set_columns(&mut self, columns: Vec<ColumnDescriptor>) {
        self.columns = columns;
        self.hidden
            .retain(|name| self.columns.iter().any(|column| &column.name == name));
        self.widths.seed(&self.columns, &self.rows);
        self.clamp_cursor();
    }

    pub fn set_rows(&mut self, rows: Vec<Row>, total_row_count: Option<usize>) {
        self.widths.seed(&self.columns, &rows);
        self.rows = rows;
        self.total_row_count = total_row_count;
        self.loading = false;
        self.error = None;
        if !self.axes.pagination.is_controlled() {
            let clamped = self.pagination().clamped(self.view().total);
            if clamped != self.pagination() {
                self.axes.pagination.request(clamped);
                self.axes.selection.request(BTreeSet::new());
            }
        }
        let len = self.view().len();
        if self.selection().iter().any(|index| *index >= len) {
            let kept = self
                .selection()
                .iter()
                .copied()
                .filter(|index| *index < len)
                .collect();
            self.axes.selection.request(kept);
        }
        self.clamp_cursor();
    }

    pub fn set_loading(&mut self, loading: bool) {
        self.loading = loading;
    }

    pub fn set_error(&mut self, error: impl Into<String>) {
        self.loading = false;
        self.error = Some(error.into());
    }

    pub fn load_width_overrides(&mut self, widths: ColumnWidths) {
        self.widths.apply_overrides(widths);
    }

    pub fn sync_pagination(&mut self, pagination: Pagination) -> bool {
        let synced = self.axes.pagination.sync(pagination);
        self.clamp_cursor();
        synced
    }

    pub fn sync_sort(&mut self, sort: Option<Sort>) -> bool {
        self.axes.sort.sync(sort)
    }

    pub fn sync_filters(&mut self, filters: Vec<Filter>) -> bool {
        let synced = self.axes.filters.sync(filters);
        self.clamp_cursor();
        synced
    }

    pub fn sync_selection(&mut self, selection: BTreeSet<usize>) -> bool {
        self.axes.selection.sync(selection)
    }

    pub fn dispatch<M: RowMutations + ?Sized>(
        &mut self,
        command: GridCommand,
        mutations: &mut M,
    ) -> Vec<GridEvent> {
        let mut events = Vec::new();
        match command {
            GridCommand::MoveRow(delta) => self.move_row(delta),
            GridCommand::MoveColumn(delta) => self.move_column(delta),
            GridCommand::JumpFirstRow => self.cursor_row = 0,
            GridCommand::JumpLastRow => self.cursor_row = self.view().len().saturating_sub(1),
            GridCommand::NextPage => {
                let current = self.pagination();
                self.go_to_page(current.page.saturating_add(1), &mut events);
            }
            GridCommand::PreviousPage => {
                let current = self.pagination();
                self.go_to_page(current.page.saturating_sub(1), &mut events);
            }
            GridCommand::GoToPage(page) => self.go_to_page(page, &mut events),
            GridCommand::SetPageSize(page_size) => self.set_page_size(page_size, &mut events),
            GridCommand::StepPageSize(delta) => {
                let next = step_page_size(self.pagination().page_size, delta);
                self.set_page_size(next, &mut events);
            }
            GridCommand::SortBy(column) => self.sort_by(&column, &mut events),
            GridCommand::SortCurrentColumn => {
                if let Some(column) = self.current_column().map(|column| column.name.clone()) {
                    self.sort_by(&column, &mut events);
                }
            }
            GridCommand::ClearSort => {
                if self.sort().is_some() {
                    self.request_sort(None, &mut events);
                }
            }
            GridCommand::AddFilter(filter) => {
                let mut filters = self.filters().to_vec();
                filters.push(filter);
                self.request_filters(filters, &mut events);
            }
            GridCommand::RemoveLastFilter => {
                let mut filters = self.filters().to_vec();
                if filters.pop().is_some() {
                    self.request_filters(filters, &mut events);
                }
            }
            GridCommand::ClearFilters => {
                if !self.filters().is_empty() {
                    self.request_filters(Vec::new(), &mut events);
                }
            }
            GridCommand::OpenFilterBuilder => self.open_filter_builder(&mut events),
            GridCommand::ToggleRowSelection(row) => self.toggle_selection(row, &mut events),
            GridCommand::ToggleCurrentRow => self.toggle_selection(self.cursor_row, &mut events),
            GridCommand::SelectPage => self.select_page(&mut events),
            GridCommand::ClearSelection => self.clear_selection(&mut events),
            GridCommand::HideCurrentColumn => self.hide_current_column(),
            GridCommand::ShowAllColumns => {
                if !self.hidden.is_empty() {
                    self.hidden.clear();
                    self.notices.push(NoticeLevel::Info, "all columns shown");
                }
            }
            GridCommand::ResizeColumn { column, delta } => {
                self.resize_column(&column, delta, &mut events);
            }
            GridCommand::ResizeCurrentColumn(delta) => {
                if let Some(column) = self.current_column().map(|column| column.name.clone()) {
                    self.resize_column(&column, delta, &mut events);
                }
            }
            GridCommand::ResetColumnWidths => {
                self.widths.reset();
                events.push(GridEvent::ColumnWidthsChanged(ColumnWidths::new()));
            }
            GridCommand::Click { cell, at } => {
                if self.dialog.is_none()
                    && let Some(gesture) = self.interaction.click(cell, at)
                {
                    self.handle_gesture(gesture, &mut events);
                }
            }
            GridCommand::DoubleClick(cell) => {
                if self.dialog.is_none() {
                    let gesture = self.interaction.double_click(cell);
                    self.handle_gesture(gesture, &mut events);
                }
            }
            GridCommand::Tick(now) => {
                if let Some(gesture) = self.interaction.tick(now) {
                    self.handle_gesture(gesture, &mut events);
                }
                self.notices.expire(now);
            }
            GridCommand::EditCurrent => {
                if let Some(cell) = self.cursor_cell() {
                    self.on_double_click(cell, &mut events);
                }
            }
            GridCommand::CopyCurrent => {
                if let Some(cell) = self.cursor_cell() {
                    let value = self.cell_value(&cell);
                    self.copy_value(&cell.column, &value, &mut events);
                }
            }
            GridCommand::FollowForeignKey => self.follow_foreign_key(&mut events),
            GridCommand::OpenInsert => self.open_insert(&mut events),
            GridCommand::OpenDeleteConfirm => self.open_delete_confirm(&mut events),
            GridCommand::DialogInput(ch) => {
                if let Some(input) = self.active_input() {
                    input.push(ch);
                }
            }
            GridCommand::DialogBackspace => {
                if let Some(input) = self.active_input() {
                    input.pop();
                }
            }
            GridCommand::DialogClear => {
                if let Some(input) = self.active_input() {
                    input.clear();
                }
            }
            GridCommand::DialogNextField => self.step_dialog_field(1),
            GridCommand::DialogPreviousField => self.step_dialog_field(-1),
            GridCommand::DialogCycle(delta) => self.cycle_dialog_choice(delta),
            GridCommand::Confirm => self.confirm_dialog(mutations, &mut events),
            GridCommand::Cancel => {
                if self.dialog.take().is_some() {
                    self.interaction.cancel();
                    events.push(GridEvent::DialogClosed);
                }
            }
            GridCommand::Retry => {
                self.error = None;
                events.push(GridEvent::RefetchRequested);
            }
            GridCommand::DismissNotice(id) => {
                self.notices.dismiss(id);
            }
            GridCommand::DismissLatestNotice => {
                self.notices.dismiss_latest();
            }
        }
        events
    }

    fn move_row(&mut self, delta: isize) {
        let len = self.view().len();
        if len == 0 {
            self.cursor_row = 0;
            return;
        }
        let next = (self.cursor_row as isize + delta).clamp(0, len as isize - 1);
        self.cursor_row = next as usize;
    }

    fn move_column(&mut self, delta: isize) {
        let visible = self.visible_columns();
        if visible.is_empty() {
            return;
        }
        let position = visible
            .iter()
            .position(|index| *index == self.cursor_col)
            .unwrap_or(0) as isize;
        let next = (position + delta).clamp(0, visible.len() as isize - 1);
        self.cursor_col = visible[next as usize];
    }

    fn clamp_cursor(&mut self) {
        let len = self.view().len();
        self.cursor_row = self.cursor_row.min(len.saturating_sub(1));
        let visible = self.visible_columns();
        if !visible.contains(&self.cursor_col) {
            self.cursor_col = visible
                .iter()
                .copied()
                .find(|index| *index > self.cursor_col)
                .or_else(|| visible.last().copied())
                .unwrap_or(0);
        }
    }

    fn cursor_cell(&self) -> Option<CellRef> {
        let column = self.current_column()?;
        (self.cursor_row < self.view().len()).then(|| CellRef::new(self.cursor_row, &column.name))
    }

    fn focus_cell(&mut self, cell: &CellRef) {
        self.cursor_row = cell.row;
        if let Some(index) = self
            .columns
            .iter()
            .position(|column| column.name == cell.column)
        {
            self.cursor_col = index;
        }
    }

    fn cell_target(&self, cell: &CellRef) -> Option<CellTarget> {
        self.column(&cell.column)?;
        let source = self.view().source_index(cell.row)?;
        let row = self.rows.get(source)?;
        Some(CellTarget {
            row_index: cell.row,
            column: cell.column.clone(),
            row: row.clone(),
        })
    }

    fn cell_value(&self, cell: &CellRef) -> Value {
        self.cell_target(cell)
            .and_then(|target| target.row.get(&cell.column).cloned())
            .unwrap_or(Value::Null)
    }

    fn go_to_page(&mut self, page: usize, events: &mut Vec<GridEvent>) {
        let current = self.pagination();
        let last = self.total_pages();
        let next = current.with_page(page.clamp(1, last));
        self.request_pagination(next, events);
    }

    fn set_page_size(&mut self, page_size: usize, events: &mut Vec<GridEvent>) {
        if !is_valid_page_size(page_size) {
            self.notices.push(
                NoticeLevel::Error,
                format!("page size {page_size} is not one of the offered choices"),
            );
            return;
        }
        if page_size == self.pagination().page_size {
            return;
        }
        let next = self.pagination().with_page_size(page_size);
        self.request_pagination(next, events);
    }

    fn sort_by(&mut self, column: &str, events: &mut Vec<GridEvent>) {
        if self.column(column).is_none() {
            return;
        }
        let next = Sort::next(self.sort(), column);
        self.request_sort(Some(next), events);
    }

    fn request_pagination(&mut self, next: Pagination, events: &mut Vec<GridEvent>) {
        if next == self.pagination() {
            return;
        }
        let value = self.axes.pagination.request(next);
        events.push(GridEvent::PageChanged(value));
        self.cursor_row = 0;
        self.clear_selection(events);
    }

    fn request_sort(&mut self, next: Option<Sort>, events: &mut Vec<GridEvent>) {
        let value = self.axes.sort.request(next);
        events.push(GridEvent::SortChanged(value));
        self.clear_selection(events);
    }

    fn request_filters(&mut self, next: Vec<Filter>, events: &mut Vec<GridEvent>) {
        let value = self.axes.filters.request(next);
        events.push(GridEvent::FiltersChanged(value));
        let current = self.pagination();
        if current.page != 1 {
            self.request_pagination(current.with_page(1), events);
        }
        self.cursor_row = 0;
        self.clear_selection(events);
    }

    fn request_selection(&mut self, next: BTreeSet<usize>, events: &mut Vec<GridEvent>) {
        let value = self.axes.selection.request(next);
        events.push(GridEvent::SelectionChanged(value));
    }

    fn clear_selection(&mut self, events: &mut Vec<GridEvent>) {
        if !self.selection().is_empty() {
            self.request_selection(BTreeSet::new(), events);
        }
    }

    fn toggle_selection(&mut self, row: usize, events: &mut Vec<GridEvent>) {
        if row >= self.view().len() {
            return;
        }
        let mut next = self.selection().clone();
        if !next.remove(&row) {
            next.insert(row);
        }
        self.request_selection(next, events);
    }

    fn select_page(&mut self, events: &mut Vec<GridEvent>) {
        let all = (0..self.view().len()).collect::<BTreeSet<_>>();
        if all.is_empty() {
            return;
        }
        if *self.selection() == all {
            self.clear_selection(events);
        } else {
            self.request_selection(all, events);
        }
    }

    fn hide_current_column(&mut self) {
        let visible = self.visible_columns();
        if visible.len() <= 1 {
            self.notices.push(NoticeLevel::Info, "keep one column visible");
            return;
        }
        let Some(name) = self.current_column().map(|column| column.name.clone()) else {
            return;
        };
        self.hidden.insert(name.clone());
        self.clamp_cursor();
        self.notices
            .push(NoticeLevel::Info, format!("column hidden: {name}"));
    }

    fn resize_column(&mut self, column: &str, delta: i32, events: &mut Vec<GridEvent>) {
        if self.column(column).is_none() {
            return;
        }
        self.widths.resize(column, delta);
        events.push(GridEvent::ColumnWidthsChanged(self.widths.overrides().clone()));
    }

    fn handle_gesture(&mut self, gesture: Gesture, events: &mut Vec<GridEvent>) {
        match gesture {
            Gesture::SingleClick(cell) => self.on_single_click(cell, events),
            Gesture::DoubleClick(cell) => self.on_double_click(cell, events),
        }
    }

    fn on_single_click(&mut self, cell: CellRef, events: &mut Vec<GridEvent>) {
        if self.dialog.is_some() || self.cell_target(&cell).is_none() {
            return;
        }
        self.focus_cell(&cell);
        let value = self.cell_value(&cell);
        let reference = self
            .column(&cell.column)
            .filter(|column| column.is_foreign_key)
            .and_then(|column| column.references.clone());
        match reference {
            Some(reference) if !value.is_null() => self.open_dialog(
                Dialog::ForeignKeyMenu {
                    column: cell.column,
                    reference,
                    value,
                    choice: ForeignKeyChoice::Copy,
                },
                events,
            ),
            _ => self.copy_value(&cell.column, &value, events),
        }
    }

    fn on_double_click(&mut self, cell: CellRef, events: &mut Vec<GridEvent>) {
        if !self.options.editable || self.dialog.is_some() {
            return;
        }
        let Some(target) = self.cell_target(&cell) else {
            return;
        };
        self.focus_cell(&cell);
        let kind = self
            .column(&cell.column)
            .and_then(ColumnDescriptor::key_kind);
        match kind {
            Some(kind) => self.open_dialog(Dialog::KeyGuard { kind, target }, events),
            None => self.open_edit(target, events),
        }
    }

    fn copy_value(&mut self, column: &str, value: &Value, events: &mut Vec<GridEvent>) {
        events.push(GridEvent::CopyToClipboard(display_value(value)));
        self.notices
            .push(NoticeLevel::Info, format!("copied {column}"));
    }

    fn follow_foreign_key(&mut self, events: &mut Vec<GridEvent>) {
        let Some(cell) = self.cursor_cell() else {
            return;
        };
        let value = self.cell_value(&cell);
        let reference = self
            .column(&cell.column)
            .and_then(|column| column.references.clone());
        match reference {
            Some(reference) if !value.is_null() => {
                events.push(GridEvent::ForeignKeyNavigate { reference, value });
            }
            Some(_) => {
                self.notices
                    .push(NoticeLevel::Info, "no referenced row for an empty value");
            }
            None => {
                self.notices
                    .push(NoticeLevel::Info, format!("{} is not a foreign key", cell.column));
            }
        }
    }

    fn open_dialog(&mut self, dialog: Dialog, events: &mut Vec<GridEvent>) {
        self.interaction.cancel();
        events.push(GridEvent::DialogOpened(dialog.kind()));
        self.dialog = Some(dialog);
    }

    fn open_edit(&mut self, target: CellTarget, events: &mut Vec<GridEvent>) {
        let current = target
            .row
            .get(&target.column)
            .cloned()
            .unwrap_or(Value::Null);
        let form = EditForm::new(target.column.clone(), &current);
        self.open_dialog(Dialog::Edit { target, form }, events);
    }

    fn open_insert(&mut self, events: &mut Vec<GridEvent>) {
        if !self.require_editable() {
            return;
        }
        let form = InsertForm::for_columns(&self.columns);
        self.open_dialog(Dialog::Insert { form, focus: 0 }, events);
    }

    fn open_delete_confirm(&mut self, events: &mut Vec<GridEvent>) {
        if !self.require_editable() {
            return;
        }
        let view = self.view();
        let targets = self
            .selection()
            .iter()
            .filter_map(|display| {
                let source = view.source_index(*display)?;
                Some(RowTarget {
                    row_index: *display,
                    row: self.rows.get(source)?.clone(),
                })
            })
            .collect::<Vec<_>>();
        if targets.is_empty() {
            self.notices
                .push(NoticeLevel::Info, "select rows to delete first");
            return;
        }
        self.open_dialog(Dialog::DeleteConfirm { targets }, events);
    }

    fn open_filter_builder(&mut self, events: &mut Vec<GridEvent>) {
        if self.columns.is_empty() {
            return;
        }
        let draft = FilterDraft {
            column: self.cursor_col.min(self.columns.len() - 1),
            operator: FilterOperator::ILike,
            value: String::new(),
            focus: DraftField::Value,
        };
        self.open_dialog(Dialog::FilterBuilder(draft), events);
    }

    fn require_editable(&mut self) -> bool {
        if !self.options.editable {
            self.notices
                .push(NoticeLevel::Info, "this grid is read-only");
        }
        self.options.editable
    }

    fn active_input(&mut self) -> Option<&mut String> {
        match self.dialog.as_mut()? {
            Dialog::Edit { form, .. } => Some(&mut form.input),
            Dialog::Insert { form, focus } => {
                form.fields.get_mut(*focus).map(|field| &mut field.input)
            }
            Dialog::FilterBuilder(draft) if draft.focus == DraftField::Value => {
                Some(&mut draft.value)
            }
            _ => None,
        }
    }

    fn step_dialog_field(&mut self, delta: isize) {
        match self.dialog.as_mut() {
            Some(Dialog::Insert { form, focus }) if !form.fields.is_empty() => {
                let len = form.fields.len() as isize;
                *focus = (*focus as isize + delta).rem_euclid(len) as usize;
            }
            Some(Dialog::FilterBuilder(draft)) => draft.focus = draft.focus.step(delta),
            _ => {}
        }
    }

    fn cycle_dialog_choice(&mut self, delta: isize) {
        let column_count = self.columns.len();
        match self.dialog.as_mut() {
            Some(Dialog::ForeignKeyMenu { choice, .. }) => *choice = choice.toggled(),
            Some(Dialog::FilterBuilder(draft)) => match draft.focus {
                DraftField::Column if column_count > 0 => {
                    draft.column = (draft.column as isize + delta)
                        .rem_euclid(column_count as isize) as usize;
                }
                DraftField::Operator => draft.operator = draft.operator.rotate(delta),
                _ => {}
            },
            _ => {}
        }
    }

    fn confirm_dialog<M: RowMutations + ?Sized>(
        &mut self,
        mutations: &mut M,
        events: &mut Vec<GridEvent>,
    ) {
        let Some(dialog) = self.dialog.take() else {
            return;
        };
        match dialog {
            Dialog::KeyGuard { target, .. } => self.open_edit(target, events),
            Dialog::Edit { target, form } => {
                events.push(GridEvent::DialogClosed);
                let value = form.payload();
                if self
                    .bridge
                    .update(mutations, &target, &value, &mut self.notices)
                {
                    events.push(GridEvent::RefetchRequested);
                }
            }
            Dialog::Insert { form, focus } => match form.payload() {
                Ok(values) => {
                    events.push(GridEvent::DialogClosed);
                    if self.bridge.insert(mutations, &values, &mut self.notices) {
                        events.push(GridEvent::RefetchRequested);
                    }
                }
                Err(error) => {
                    self.notices.push(NoticeLevel::Error, error.to_string());
                    self.dialog = Some(Dialog::Insert { form, focus });
                }
            },
            Dialog::DeleteConfirm { targets } => {
                events.push(GridEvent::DialogClosed);
                if self.bridge.delete(mutations, &targets, &mut self.notices) {
                    self.clear_selection(events);
                    events.push(GridEvent::RefetchRequested);
                }
            }
            Dialog::ForeignKeyMenu {
                column,
                reference,
                value,
                choice,
            } => {
                events.push(GridEvent::DialogClosed);
                match choice {
                    ForeignKeyChoice::Copy => self.copy_value(&column, &value, events),
                    ForeignKeyChoice::Navigate => {
                        events.push(GridEvent::ForeignKeyNavigate { reference, value });
                    }
                }
            }
            Dialog::FilterBuilder(draft) => {
                let Some(column) = self.columns.get(draft.column).map(|column| column.name.clone())
                else {
                    events.push(GridEvent::DialogClosed);
                    return;
                };
                let filter = Filter::new(column.clone(), draft.operator, draft.value.trim());
                if !filter.is_active() {
                    self.notices
                        .push(NoticeLevel::Info, format!("enter a value to filter {column}"));
                    self.dialog = Some(Dialog::FilterBuilder(draft));
                    return;
                }
                events.push(GridEvent::DialogClosed);
                let mut filters = self.filters().to_vec();
                filters.push(filter);
                self.request_filters(filters, events);
            }
        }
    }
}
