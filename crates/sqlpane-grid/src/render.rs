// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table};
use sqlpane_app::{ColumnDescriptor, JobBoard, SortDirection, StreamStatus, display_value};

use crate::interaction::CellRef;
use crate::notify::NoticeLevel;
use crate::table::{DataTable, Dialog, DraftField, ForeignKeyChoice, key_guard_warning};

const SORT_ASC: &str = "↑";
const SORT_DESC: &str = "↓";
const MAX_VISIBLE_NOTICES: usize = 4;
pub const LOADING_TEXT: &str = "loading rows...";

pub fn header_label(table: &DataTable, column: &ColumnDescriptor) -> String {
    let mut label = column.name.clone();
    if column.is_primary_key {
        label.push_str(" PK");
    } else if column.is_foreign_key {
        label.push_str(" FK");
    }
    if let Some(sort) = table.sort()
        && sort.column == column.name
    {
        label.push(' ');
        label.push_str(match sort.direction {
            SortDirection::Asc => SORT_ASC,
            SortDirection::Desc => SORT_DESC,
        });
    }
    label
}

pub fn table_title(table: &DataTable) -> String {
    let mut parts = vec![table.title().to_owned()];
    if let Some(sort) = table.sort() {
        parts.push(format!("sort {} {}", sort.column, sort.direction.label()));
    }
    let filters = table.filters();
    if !filters.is_empty() {
        let described = filters
            .iter()
            .map(|filter| filter.describe())
            .collect::<Vec<_>>()
            .join(", ");
        parts.push(format!("where {described}"));
    }
    if !table.hidden_columns().is_empty() {
        parts.push(format!("{} hidden", table.hidden_columns().len()));
    }
    if table.is_loading() {
        parts.push("loading".to_owned());
    }
    if table.is_mutating() {
        parts.push("saving".to_owned());
    }
    parts.join(" · ")
}

pub fn footer_text(table: &DataTable) -> String {
    let pagination = table.pagination();
    let total = table.view().total;
    let mut text = format!(
        "page {} of {} · {} rows · size {}",
        pagination.page,
        pagination.total_pages(total),
        total,
        pagination.page_size
    );
    let selected = table.selection().len();
    if selected > 0 {
        text.push_str(&format!(" · {selected} selected"));
    }
    if pagination.has_previous() {
        text.push_str("  [p] prev");
    }
    if pagination.has_next(total) {
        text.push_str("  [n] next");
    }
    text
}

pub fn notice_lines(table: &DataTable) -> Vec<String> {
    let items = table.notices().items();
    let skip = items.len().saturating_sub(MAX_VISIBLE_NOTICES);
    items[skip..]
        .iter()
        .map(|notice| format!("[{}] {}", notice.level.label(), notice.message))
        .collect()
}

/// Title and body of the open dialog.
pub fn dialog_text(table: &DataTable, dialog: &Dialog) -> (String, String) {
    match dialog {
        Dialog::KeyGuard { kind, target } => (
            "careful".to_owned(),
            format!(
                "{}\n\ncolumn {} on row {}\n\n[y/enter] continue  [n/esc] cancel",
                key_guard_warning(*kind),
                target.column,
                target.row_index + 1
            ),
        ),
        Dialog::Edit { target, form } => (
            format!("edit {}", target.column),
            format!(
                "current: {}\nnew:     {}_\n\nblank saves NULL · [enter] save  [esc] cancel",
                target.row.display(&target.column),
                form.input
            ),
        ),
        Dialog::Insert { form, focus } => {
            let mut body = form
                .fields
                .iter()
                .enumerate()
                .map(|(index, field)| {
                    let marker = if index == *focus { ">" } else { " " };
                    format!("{marker} {} ({}): {}", field.column, field.data_type, field.input)
                })
                .collect::<Vec<_>>()
                .join("\n");
            body.push_str("\n\nblank fields use defaults · [tab] next  [enter] insert  [esc] cancel");
            ("insert row".to_owned(), body)
        }
        Dialog::DeleteConfirm { targets } => (
            "delete".to_owned(),
            format!(
                "delete {} selected row{}?\n\n[y/enter] delete  [n/esc] cancel",
                targets.len(),
                if targets.len() == 1 { "" } else { "s" }
            ),
        ),
        Dialog::ForeignKeyMenu {
            column,
            reference,
            value,
            choice,
        } => {
            let options = [ForeignKeyChoice::Copy, ForeignKeyChoice::Navigate]
                .iter()
                .map(|option| {
                    let marker = if option == choice { ">" } else { " " };
                    format!("{marker} {}", option.label())
                })
                .collect::<Vec<_>>()
                .join("\n");
            (
                format!("{column} → {reference}"),
                format!(
                    "value {}\n\n{options}\n\n[←/→] choose  [enter] go  [esc] cancel",
                    display_value(value)
                ),
            )
        }
        Dialog::FilterBuilder(draft) => {
            let column = table
                .columns()
                .get(draft.column)
                .map(|column| column.name.as_str())
                .unwrap_or_default();
            let marker = |field: DraftField| if draft.focus == field { ">" } else { " " };
            let value_line = if draft.operator.takes_value() {
                format!("{} value:    {}_", marker(DraftField::Value), draft.value)
            } else {
                format!("{} value:    (none)", marker(DraftField::Value))
            };
            (
                "add filter".to_owned(),
                format!(
                    "{} column:   {column}\n{} operator: {}\n{value_line}\n\n[tab] field  [←/→] change  [enter] apply  [esc] cancel",
                    marker(DraftField::Column),
                    marker(DraftField::Operator),
                    draft.operator.symbol()
                ),
            )
        }
    }
}

pub fn jobs_overlay_text(board: &JobBoard, stream: Option<StreamStatus>) -> String {
    let mut lines = vec![format!(
        "stream: {}",
        stream.map_or_else(|| "off".to_owned(), StreamStatus::label)
    )];
    if board.is_empty() {
        lines.push("no jobs".to_owned());
    } else {
        lines.extend(board.entries().iter().map(|entry| entry.summary()));
    }
    lines.push(String::new());
    lines.push("[J] close  [R] reconnect".to_owned());
    lines.join("\n")
}

pub fn help_overlay_text() -> String {
    [
        "move       arrows / h j k l, home/end",
        "pages      n next, p previous, + / - page size",
        "sort       s current column, S clear",
        "filter     f add, x remove last, F clear",
        "columns    c hide, C show all, < / > resize, = reset widths",
        "select     space row, a page, esc clear",
        "rows       i insert, e or enter edit, d delete selected",
        "cells      y copy, g follow foreign key",
        "other      r retry, J jobs, R reconnect jobs, ? help, q quit",
        "mouse      click copies, double click edits, header sorts, drag header edge resizes",
    ]
    .join("\n")
}

/// First row to draw so the cursor stays inside `capacity` lines.
pub fn row_offset(cursor: usize, capacity: usize) -> usize {
    if capacity == 0 {
        return cursor;
    }
    cursor.saturating_sub(capacity - 1)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpan {
    pub column: String,
    pub x: u16,
    pub width: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GridHit {
    Header { column: String },
    HeaderBorder { column: String },
    Cell(CellRef),
}

/// Screen positions of the grid's header and cells, for mouse hit testing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridGeometry {
    header_y: u16,
    first_row_y: u16,
    capacity: u16,
    row_offset: usize,
    row_count: usize,
    spans: Vec<ColumnSpan>,
}

impl GridGeometry {
    pub fn compute(area: Rect, table: &DataTable) -> Self {
        let inner = inner_area(area);
        let capacity = inner.height.saturating_sub(1);
        let right = inner.x.saturating_add(inner.width);
        let mut spans = Vec::new();
        let mut x = inner.x;
        for index in table.visible_columns() {
            if x >= right {
                break;
            }
            let column = &table.columns()[index];
            let width = table.column_width(&column.name).min(right - x);
            spans.push(ColumnSpan {
                column: column.name.clone(),
                x,
                width,
            });
            x = x.saturating_add(width).saturating_add(1);
        }
        Self {
            header_y: inner.y,
            first_row_y: inner.y.saturating_add(1),
            capacity,
            row_offset: row_offset(table.cursor().0, usize::from(capacity)),
            row_count: table.view().len(),
            spans,
        }
    }

    pub fn spans(&self) -> &[ColumnSpan] {
        &self.spans
    }

    pub fn hit(&self, x: u16, y: u16) -> Option<GridHit> {
        if y == self.header_y {
            if let Some(span) = self.spans.iter().find(|span| x == span.x + span.width) {
                return Some(GridHit::HeaderBorder {
                    column: span.column.clone(),
                });
            }
            return self
                .span_at(x)
                .map(|span| GridHit::Header {
                    column: span.column.clone(),
                });
        }
        if y < self.first_row_y || y >= self.first_row_y.saturating_add(self.capacity) {
            return None;
        }
        let row = self.row_offset + usize::from(y - self.first_row_y);
        if row >= self.row_count {
            return None;
        }
        self.span_at(x)
            .map(|span| GridHit::Cell(CellRef::new(row, &span.column)))
    }

    fn span_at(&self, x: u16) -> Option<&ColumnSpan> {
        self.spans
            .iter()
            .find(|span| x >= span.x && x < span.x + span.width)
    }
}

fn inner_area(area: Rect) -> Rect {
    Rect {
        x: area.x.saturating_add(1),
        y: area.y.saturating_add(1),
        width: area.width.saturating_sub(2),
        height: area.height.saturating_sub(2),
    }
}

/// Splits `area` into the bordered grid body and the footer line below it.
pub fn table_areas(area: Rect) -> (Rect, Rect) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(1)])
        .split(area);
    (layout[0], layout[1])
}

/// Grid body plus its one-line footer.
pub fn render_table(frame: &mut ratatui::Frame<'_>, area: Rect, table: &DataTable) {
    let (body, footer_area) = table_areas(area);

    let block = Block::default()
        .title(table_title(table))
        .borders(Borders::ALL);

    if let Some(error) = table.error() {
        let panel = Paragraph::new(format!("could not load rows\n\n{error}\n\n[r] retry"))
            .style(Style::default().fg(Color::Red))
            .block(block);
        frame.render_widget(panel, body);
    } else if table.is_loading() && table.rows().is_empty() {
        let spinner = Paragraph::new(LOADING_TEXT)
            .style(Style::default().fg(Color::Yellow))
            .block(block);
        frame.render_widget(spinner, body);
    } else {
        frame.render_widget(grid_widget(table, body, block), body);
    }

    let footer = Paragraph::new(footer_text(table)).style(Style::default().fg(Color::Gray));
    frame.render_widget(footer, footer_area);
}

fn grid_widget<'a>(table: &'a DataTable, area: Rect, block: Block<'a>) -> Table<'a> {
    let visible = table.visible_columns();
    let columns = table.columns();
    let (cursor_row, cursor_col) = table.cursor();
    let capacity = usize::from(inner_area(area).height.saturating_sub(1));
    let offset = row_offset(cursor_row, capacity);

    let widths = visible
        .iter()
        .map(|index| Constraint::Length(table.column_width(&columns[*index].name)))
        .collect::<Vec<_>>();

    let header = Row::new(visible.iter().map(|index| {
        let column = &columns[*index];
        let mut style = Style::default().add_modifier(Modifier::BOLD);
        if column.is_primary_key {
            style = style.fg(Color::Yellow);
        }
        Cell::from(header_label(table, column)).style(style)
    }));

    let selection = table.selection();
    let page = table.page_rows();
    let rows = page
        .into_iter()
        .enumerate()
        .skip(offset)
        .take(capacity.max(1))
        .map(|(display, row)| {
            let selected = selection.contains(&display);
            let cells = visible
                .iter()
                .map(|index| {
                    let column = &columns[*index];
                    let text = if row.is_null(&column.name) {
                        "NULL".to_owned()
                    } else {
                        row.display(&column.name)
                    };
                    let mut style = Style::default();
                    if row.is_null(&column.name) {
                        style = style.fg(Color::DarkGray);
                    } else if column.is_primary_key {
                        style = style.fg(Color::Yellow);
                    }
                    if selected {
                        style = style.bg(Color::Blue);
                    }
                    if display == cursor_row {
                        style = style.add_modifier(Modifier::REVERSED);
                        if *index == cursor_col {
                            style = style.add_modifier(Modifier::BOLD);
                        }
                    }
                    Cell::from(text).style(style)
                })
                .collect::<Vec<_>>();
            Row::new(cells)
        })
        .collect::<Vec<_>>();

    Table::new(rows, widths)
        .header(header)
        .column_spacing(1)
        .block(block)
}

pub fn render_dialog(frame: &mut ratatui::Frame<'_>, table: &DataTable) {
    let Some(dialog) = table.dialog() else {
        return;
    };
    let (title, body) = dialog_text(table, dialog);
    let area = centered_rect(60, 50, frame.area());
    frame.render_widget(Clear, area);
    let widget = Paragraph::new(body).block(
        Block::default()
            .title(title)
            .borders(Borders::ALL)
            .style(Style::default().fg(Color::Cyan)),
    );
    frame.render_widget(widget, area);
}

/// Toast stack in the top-right corner.
pub fn render_notices(frame: &mut ratatui::Frame<'_>, area: Rect, table: &DataTable) {
    let lines = notice_lines(table);
    if lines.is_empty() {
        return;
    }
    let width = lines
        .iter()
        .map(|line| line.chars().count() as u16 + 2)
        .max()
        .unwrap_or(0)
        .min(area.width);
    let height = (lines.len() as u16 + 2).min(area.height);
    let toast_area = Rect {
        x: area.x + area.width.saturating_sub(width),
        y: area.y,
        width,
        height,
    };
    let color = match table.notices().latest().map(|notice| notice.level) {
        Some(NoticeLevel::Error) => Color::Red,
        Some(NoticeLevel::Success) => Color::Green,
        _ => Color::White,
    };
    frame.render_widget(Clear, toast_area);
    let widget = Paragraph::new(lines.join("\n"))
        .style(Style::default().fg(color))
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(widget, toast_area);
}

pub fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
