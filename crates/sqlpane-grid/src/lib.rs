// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

pub mod axis;
pub mod derive;
pub mod interaction;
pub mod mutation;
pub mod notify;
pub mod render;
pub mod table;
pub mod widths;

pub use axis::{AxisControl, AxisState, GridAxes};
pub use derive::{Derived, derive};
pub use interaction::{CellInteraction, CellRef, DEFAULT_CLICK_DELAY, Gesture};
pub use mutation::{CellTarget, MutationBridge, MutationKind, ReadOnly, RowMutations, RowTarget};
pub use notify::{DEFAULT_NOTICE_TTL, MAX_ERROR_NOTICES, Notice, NoticeLevel, Notifications};
pub use table::{DataTable, Dialog, DialogKind, GridCommand, GridEvent, GridOptions};
pub use widths::{ColumnWidthState, load_saved_widths, save_widths};

use anyhow::{Context, Result};
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use crossterm::{execute, terminal};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Style};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};
use serde_json::Value;
use sqlpane_app::{
    AppCommand, AppState, ColumnDescriptor, ColumnWidths, DEFAULT_JOB_PRUNE_AFTER, Filter,
    ForeignKeyRef, JobBoard, JobFeed, Pagination, Row, SessionBus, SessionEvent, Sort,
    StreamStatus, TableRef, WidthStore,
};
use std::io;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::{Duration, Instant};

use crate::render::{
    GridGeometry, GridHit, centered_rect, help_overlay_text, jobs_overlay_text, render_dialog,
    render_notices, render_table, table_areas,
};

const POLL_INTERVAL: Duration = Duration::from_millis(50);
const STATUS_CLEAR_AFTER: Duration = Duration::from_secs(4);
const SCROLL_ROWS: isize = 3;
const RESIZE_STEP: i32 = 2;
const CLIPBOARD_PREVIEW_CHARS: usize = 40;

/// What the backend is asked for. Only controlled axes are sent; the grid
/// derives the uncontrolled ones itself.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PageRequest {
    pub filters: Vec<Filter>,
    pub sort: Option<Sort>,
    pub pagination: Option<Pagination>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PageResult {
    pub rows: Vec<Row>,
    pub total_count: Option<usize>,
}

/// Everything needed to build a grid for one table or result set.
#[derive(Debug, Clone, PartialEq)]
pub struct GridSpec {
    pub title: String,
    pub table: Option<TableRef>,
    pub columns: Vec<ColumnDescriptor>,
    pub axes: GridAxes,
    pub options: GridOptions,
}

#[derive(Debug, Clone, PartialEq)]
pub enum InternalEvent {
    ClearStatus {
        token: u64,
    },
    PageLoaded {
        request_id: u64,
        result: Result<PageResult, String>,
    },
    Jobs(JobFeed),
    Session(SessionEvent),
}

/// Host services behind an interactive grid.
pub trait GridRuntime: RowMutations {
    fn open_grid(&mut self) -> Result<GridSpec>;
    fn load_page(&mut self, request: &PageRequest) -> Result<PageResult>;
    fn spawn_page_load(
        &mut self,
        request_id: u64,
        request: PageRequest,
        tx: Sender<InternalEvent>,
    ) -> Result<()> {
        let result = self
            .load_page(&request)
            .map_err(|error| format!("{error:#}"));
        tx.send(InternalEvent::PageLoaded { request_id, result })
            .map_err(|_| anyhow::anyhow!("page event channel closed"))?;
        Ok(())
    }
    fn width_store(&self) -> Option<&dyn WidthStore> {
        None
    }
    fn page_size_changed(&mut self, _page_size: usize) {}
    /// Points the runtime at the referenced table. Returns false when the
    /// runtime cannot navigate, in which case the current grid stays open.
    fn follow_reference(&mut self, _reference: &ForeignKeyRef, _value: &Value) -> Result<bool> {
        Ok(false)
    }
    /// Starts, or restarts, the job stream. Returns false when there is none.
    fn start_job_stream(&mut self, _tx: Sender<InternalEvent>) -> Result<bool> {
        Ok(false)
    }
    fn session_bus(&self) -> Option<SessionBus> {
        None
    }
    /// How long finished jobs stay in the overlay.
    fn job_prune_after(&self) -> Duration {
        DEFAULT_JOB_PRUNE_AFTER
    }
}

pub fn page_request(table: &DataTable) -> PageRequest {
    let axes = table.axes();
    PageRequest {
        filters: if axes.filters.is_controlled() {
            table.filters().to_vec()
        } else {
            Vec::new()
        },
        sort: if axes.sort.is_controlled() {
            table.sort().cloned()
        } else {
            None
        },
        pagination: axes
            .pagination
            .is_controlled()
            .then(|| table.pagination()),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct DragState {
    column: String,
    last_x: u16,
}

struct ViewData {
    table: DataTable,
    storage_key: Option<String>,
    grid_area: Rect,
    jobs: JobBoard,
    job_stream: Option<StreamStatus>,
    latest_request: u64,
    clipboard: Option<String>,
    help_visible: bool,
    drag: Option<DragState>,
    pending_widths: Option<ColumnWidths>,
    reported_page_size: usize,
    status_token: u64,
}

impl ViewData {
    fn new(table: DataTable, storage_key: Option<String>, prune_after: Duration) -> Self {
        let reported_page_size = table.pagination().page_size;
        Self {
            table,
            storage_key,
            grid_area: Rect::default(),
            jobs: JobBoard::new(prune_after),
            job_stream: None,
            latest_request: 0,
            clipboard: None,
            help_visible: false,
            drag: None,
            pending_widths: None,
            reported_page_size,
            status_token: 0,
        }
    }
}

pub fn run_app<R: GridRuntime>(state: &mut AppState, runtime: &mut R) -> Result<()> {
    let mut view_data = open_view(state, runtime)?;
    let (internal_tx, internal_rx) = mpsc::channel();

    if let Some(bus) = runtime.session_bus() {
        forward_session_events(&bus, internal_tx.clone());
    }
    match runtime.start_job_stream(internal_tx.clone()) {
        Ok(true) => view_data.job_stream = Some(StreamStatus::Connecting),
        Ok(false) => {}
        Err(error) => tracing::warn!(error = %error, "job stream did not start"),
    }
    request_page(state, runtime, &mut view_data, &internal_tx);

    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, terminal::EnterAlternateScreen, EnableMouseCapture)
        .context("enter alternate screen")?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;

    let mut result = Ok(());
    loop {
        process_internal_events(state, &mut view_data, &internal_tx, &internal_rx);
        let now = Instant::now();
        dispatch_grid(
            state,
            runtime,
            &mut view_data,
            &internal_tx,
            GridCommand::Tick(now),
        );
        view_data.jobs.prune(now);

        if let Err(error) = terminal.draw(|frame| render(frame, state, &mut view_data)) {
            result = Err(error).context("draw frame");
            break;
        }

        let has_event = match event::poll(POLL_INTERVAL).context("poll event") {
            Ok(has_event) => has_event,
            Err(error) => {
                result = Err(error);
                break;
            }
        };
        if !has_event {
            continue;
        }
        match event::read().context("read event") {
            Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => {
                if handle_key_event(state, runtime, &mut view_data, &internal_tx, key) {
                    break;
                }
            }
            Ok(Event::Mouse(mouse)) => {
                handle_mouse_event(state, runtime, &mut view_data, &internal_tx, mouse);
            }
            Ok(_) => {}
            Err(error) => {
                result = Err(error);
                break;
            }
        }
    }

    disable_raw_mode().context("disable raw mode")?;
    execute!(io::stdout(), DisableMouseCapture, terminal::LeaveAlternateScreen)
        .context("leave alternate screen")?;
    result
}

fn open_view<R: GridRuntime>(state: &mut AppState, runtime: &mut R) -> Result<ViewData> {
    let spec = runtime.open_grid().context("open grid")?;
    let storage_key = spec.table.as_ref().map(TableRef::storage_key);
    if let Some(table) = spec.table.clone() {
        state.dispatch(AppCommand::OpenTable(table));
    }
    let mut table = DataTable::new(spec.title, spec.columns, spec.axes, spec.options);
    if let (Some(store), Some(key)) = (runtime.width_store(), storage_key.as_deref()) {
        table.load_width_overrides(load_saved_widths(store, key));
    }
    Ok(ViewData::new(table, storage_key, runtime.job_prune_after()))
}

fn forward_session_events(bus: &SessionBus, tx: Sender<InternalEvent>) {
    let events = bus.subscribe();
    thread::spawn(move || {
        for event in events {
            if tx.send(InternalEvent::Session(event)).is_err() {
                break;
            }
        }
    });
}

fn request_page<R: GridRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
) {
    if !state.session_active() {
        emit_status(state, view_data, tx, "session expired; sign in again and restart");
        return;
    }
    view_data.latest_request = view_data.latest_request.saturating_add(1);
    let request_id = view_data.latest_request;
    let request = page_request(&view_data.table);
    tracing::debug!(request_id, ?request, "requesting page");
    view_data.table.set_loading(true);
    if let Err(error) = runtime.spawn_page_load(request_id, request, tx.clone()) {
        view_data.table.set_error(format!("{error:#}"));
    }
}

fn process_internal_events(
    state: &mut AppState,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    rx: &Receiver<InternalEvent>,
) {
    while let Ok(event) = rx.try_recv() {
        match event {
            InternalEvent::ClearStatus { token } if token == view_data.status_token => {
                state.dispatch(AppCommand::ClearStatus);
            }
            InternalEvent::ClearStatus { .. } => {}
            InternalEvent::PageLoaded { request_id, .. }
                if request_id != view_data.latest_request =>
            {
                tracing::debug!(
                    request_id,
                    latest = view_data.latest_request,
                    "dropping stale page"
                );
            }
            InternalEvent::PageLoaded { result, .. } => match result {
                Ok(page) => view_data.table.set_rows(page.rows, page.total_count),
                Err(error) => view_data.table.set_error(error),
            },
            InternalEvent::Jobs(JobFeed::Update(update)) => {
                view_data.jobs.apply(update, Instant::now());
            }
            InternalEvent::Jobs(JobFeed::Status(status)) => {
                view_data.job_stream = Some(status);
                if let StreamStatus::GaveUp { attempts } = status {
                    emit_status(
                        state,
                        view_data,
                        tx,
                        format!("job stream offline after {attempts} attempts; press R to retry"),
                    );
                }
            }
            InternalEvent::Session(event) => {
                tracing::info!(?event, "session ended");
                state.dispatch(AppCommand::SessionExpired);
                view_data
                    .table
                    .notify(NoticeLevel::Error, "session expired; sign in again");
            }
        }
    }
}

fn schedule_status_clear(internal_tx: &Sender<InternalEvent>, token: u64) {
    let sender = internal_tx.clone();
    thread::spawn(move || {
        thread::sleep(STATUS_CLEAR_AFTER);
        let _ = sender.send(InternalEvent::ClearStatus { token });
    });
}

fn emit_status(
    state: &mut AppState,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    message: impl Into<String>,
) {
    state.dispatch(AppCommand::SetStatus(message.into()));
    view_data.status_token = view_data.status_token.saturating_add(1);
    schedule_status_clear(internal_tx, view_data.status_token);
}

fn dispatch_grid<R: GridRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    command: GridCommand,
) {
    let events = view_data.table.dispatch(command, runtime);
    apply_grid_events(state, runtime, view_data, tx, events);
}

/// Plays the caller's part for controlled axes: echo the new value back and
/// refetch. Several refetch triggers in one batch cost one request.
fn apply_grid_events<R: GridRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    events: Vec<GridEvent>,
) {
    let mut refetch = false;
    let mut navigate = None;
    for event in events {
        match event {
            GridEvent::PageChanged(pagination) => {
                if pagination.page_size != view_data.reported_page_size {
                    view_data.reported_page_size = pagination.page_size;
                    runtime.page_size_changed(pagination.page_size);
                }
                if view_data.table.axes().pagination.is_controlled() {
                    view_data.table.sync_pagination(pagination);
                    refetch = true;
                }
            }
            GridEvent::SortChanged(sort) => {
                if view_data.table.axes().sort.is_controlled() {
                    view_data.table.sync_sort(sort);
                    refetch = true;
                }
            }
            GridEvent::FiltersChanged(filters) => {
                if view_data.table.axes().filters.is_controlled() {
                    view_data.table.sync_filters(filters);
                    refetch = true;
                }
            }
            GridEvent::SelectionChanged(selection) => {
                if view_data.table.axes().selection.is_controlled() {
                    view_data.table.sync_selection(selection);
                }
            }
            GridEvent::CopyToClipboard(text) => {
                let preview = text.chars().take(CLIPBOARD_PREVIEW_CHARS).collect::<String>();
                view_data.clipboard = Some(text);
                emit_status(state, view_data, tx, format!("copied: {preview}"));
            }
            GridEvent::ForeignKeyNavigate { reference, value } => {
                navigate = Some((reference, value));
            }
            GridEvent::RefetchRequested => refetch = true,
            GridEvent::ColumnWidthsChanged(widths) => {
                if view_data.drag.is_some() {
                    view_data.pending_widths = Some(widths);
                } else {
                    persist_widths(runtime, view_data, &widths);
                }
            }
            GridEvent::DialogOpened(kind) => tracing::debug!(?kind, "dialog opened"),
            GridEvent::DialogClosed => tracing::debug!("dialog closed"),
        }
    }

    if let Some((reference, value)) = navigate {
        follow_reference(state, runtime, view_data, tx, &reference, &value);
    } else if refetch {
        request_page(state, runtime, view_data, tx);
    }
}

fn follow_reference<R: GridRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    reference: &ForeignKeyRef,
    value: &Value,
) {
    match runtime.follow_reference(reference, value) {
        Ok(true) => match open_view(state, runtime) {
            Ok(next) => {
                let previous = std::mem::replace(view_data, next);
                view_data.jobs = previous.jobs;
                view_data.job_stream = previous.job_stream;
                view_data.clipboard = previous.clipboard;
                view_data.status_token = previous.status_token;
                view_data.latest_request = previous.latest_request;
                request_page(state, runtime, view_data, tx);
            }
            Err(error) => emit_status(state, view_data, tx, format!("{error:#}")),
        },
        Ok(false) => emit_status(
            state,
            view_data,
            tx,
            format!("cannot open {reference} from here"),
        ),
        Err(error) => emit_status(
            state,
            view_data,
            tx,
            format!("could not follow {reference}: {error:#}"),
        ),
    }
}

fn persist_widths<R: GridRuntime>(runtime: &R, view_data: &mut ViewData, widths: &ColumnWidths) {
    let (Some(store), Some(key)) = (runtime.width_store(), view_data.storage_key.as_deref())
    else {
        return;
    };
    if !save_widths(store, key, widths) {
        view_data
            .table
            .notify(NoticeLevel::Error, "could not save column widths");
    }
}

fn restart_job_stream<R: GridRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
) {
    match runtime.start_job_stream(tx.clone()) {
        Ok(true) => {
            view_data.job_stream = Some(StreamStatus::Connecting);
            emit_status(state, view_data, tx, "job stream restarted");
        }
        Ok(false) => emit_status(state, view_data, tx, "no job stream for this session"),
        Err(error) => emit_status(state, view_data, tx, format!("job stream failed: {error:#}")),
    }
}

fn handle_key_event<R: GridRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> bool {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return true;
    }

    if view_data.help_visible {
        if matches!(key.code, KeyCode::Esc | KeyCode::Char('?')) {
            view_data.help_visible = false;
        }
        return false;
    }

    if state.jobs_overlay {
        match key.code {
            KeyCode::Esc | KeyCode::Char('J') => {
                state.dispatch(AppCommand::HideJobs);
            }
            KeyCode::Char('R') => restart_job_stream(state, runtime, view_data, internal_tx),
            _ => {}
        }
        return false;
    }

    if let Some(kind) = view_data.table.dialog().map(Dialog::kind) {
        if let Some(command) = dialog_command_for_key(kind, key) {
            dispatch_grid(state, runtime, view_data, internal_tx, command);
        }
        return false;
    }

    match key.code {
        KeyCode::Char('q') => return true,
        KeyCode::Char('?') => {
            view_data.help_visible = true;
            return false;
        }
        KeyCode::Char('J') => {
            state.dispatch(AppCommand::ShowJobs);
            return false;
        }
        KeyCode::Char('R') => {
            restart_job_stream(state, runtime, view_data, internal_tx);
            return false;
        }
        _ => {}
    }

    if let Some(command) = grid_command_for_key(key) {
        dispatch_grid(state, runtime, view_data, internal_tx, command);
    }
    false
}

pub fn grid_command_for_key(key: KeyEvent) -> Option<GridCommand> {
    match (key.code, key.modifiers) {
        (KeyCode::Char('j'), _) | (KeyCode::Down, _) => Some(GridCommand::MoveRow(1)),
        (KeyCode::Char('k'), _) | (KeyCode::Up, _) => Some(GridCommand::MoveRow(-1)),
        (KeyCode::Char('h'), _) | (KeyCode::Left, _) => Some(GridCommand::MoveColumn(-1)),
        (KeyCode::Char('l'), _) | (KeyCode::Right, _) => Some(GridCommand::MoveColumn(1)),
        (KeyCode::Home, _) => Some(GridCommand::JumpFirstRow),
        (KeyCode::End, _) => Some(GridCommand::JumpLastRow),
        (KeyCode::Char('n'), _) | (KeyCode::PageDown, _) => Some(GridCommand::NextPage),
        (KeyCode::Char('p'), _) | (KeyCode::PageUp, _) => Some(GridCommand::PreviousPage),
        (KeyCode::Char('+'), _) => Some(GridCommand::StepPageSize(1)),
        (KeyCode::Char('-'), _) => Some(GridCommand::StepPageSize(-1)),
        (KeyCode::Char('s'), _) => Some(GridCommand::SortCurrentColumn),
        (KeyCode::Char('S'), _) => Some(GridCommand::ClearSort),
        (KeyCode::Char('f'), _) => Some(GridCommand::OpenFilterBuilder),
        (KeyCode::Char('x'), _) => Some(GridCommand::RemoveLastFilter),
        (KeyCode::Char('F'), _) => Some(GridCommand::ClearFilters),
        (KeyCode::Char('c'), _) => Some(GridCommand::HideCurrentColumn),
        (KeyCode::Char('C'), _) => Some(GridCommand::ShowAllColumns),
        (KeyCode::Char('<'), _) => Some(GridCommand::ResizeCurrentColumn(-RESIZE_STEP)),
        (KeyCode::Char('>'), _) => Some(GridCommand::ResizeCurrentColumn(RESIZE_STEP)),
        (KeyCode::Char('='), _) => Some(GridCommand::ResetColumnWidths),
        (KeyCode::Char(' '), _) => Some(GridCommand::ToggleCurrentRow),
        (KeyCode::Char('a'), _) => Some(GridCommand::SelectPage),
        (KeyCode::Esc, _) => Some(GridCommand::ClearSelection),
        (KeyCode::Char('i'), _) => Some(GridCommand::OpenInsert),
        (KeyCode::Char('e'), _) | (KeyCode::Enter, _) => Some(GridCommand::EditCurrent),
        (KeyCode::Char('d'), _) => Some(GridCommand::OpenDeleteConfirm),
        (KeyCode::Char('y'), _) => Some(GridCommand::CopyCurrent),
        (KeyCode::Char('g'), _) => Some(GridCommand::FollowForeignKey),
        (KeyCode::Char('r'), _) => Some(GridCommand::Retry),
        (KeyCode::Backspace, _) => Some(GridCommand::DismissLatestNotice),
        _ => None,
    }
}

pub fn dialog_command_for_key(kind: DialogKind, key: KeyEvent) -> Option<GridCommand> {
    match (key.code, key.modifiers) {
        (KeyCode::Esc, _) => return Some(GridCommand::Cancel),
        (KeyCode::Enter, _) => return Some(GridCommand::Confirm),
        _ => {}
    }
    match kind {
        DialogKind::KeyGuard | DialogKind::DeleteConfirm => match key.code {
            KeyCode::Char('y') => Some(GridCommand::Confirm),
            KeyCode::Char('n') => Some(GridCommand::Cancel),
            _ => None,
        },
        DialogKind::ForeignKeyMenu => match key.code {
            KeyCode::Left | KeyCode::Right | KeyCode::Up | KeyCode::Down | KeyCode::Tab => {
                Some(GridCommand::DialogCycle(1))
            }
            _ => None,
        },
        DialogKind::Edit | DialogKind::Insert | DialogKind::FilterBuilder => {
            match (key.code, key.modifiers) {
                (KeyCode::Char('u'), modifiers) if modifiers.contains(KeyModifiers::CONTROL) => {
                    Some(GridCommand::DialogClear)
                }
                (KeyCode::Char(ch), _) => Some(GridCommand::DialogInput(ch)),
                (KeyCode::Backspace, _) => Some(GridCommand::DialogBackspace),
                (KeyCode::Tab, _) | (KeyCode::Down, _) => Some(GridCommand::DialogNextField),
                (KeyCode::BackTab, _) | (KeyCode::Up, _) => Some(GridCommand::DialogPreviousField),
                (KeyCode::Left, _) if kind == DialogKind::FilterBuilder => {
                    Some(GridCommand::DialogCycle(-1))
                }
                (KeyCode::Right, _) if kind == DialogKind::FilterBuilder => {
                    Some(GridCommand::DialogCycle(1))
                }
                _ => None,
            }
        }
    }
}

fn handle_mouse_event<R: GridRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    mouse: MouseEvent,
) {
    if view_data.help_visible || state.jobs_overlay {
        return;
    }
    let command = match mouse.kind {
        MouseEventKind::Down(MouseButton::Left) => {
            let geometry = GridGeometry::compute(view_data.grid_area, &view_data.table);
            match geometry.hit(mouse.column, mouse.row) {
                Some(GridHit::HeaderBorder { column }) => {
                    view_data.drag = Some(DragState {
                        column,
                        last_x: mouse.column,
                    });
                    None
                }
                Some(GridHit::Header { column }) => Some(GridCommand::SortBy(column)),
                Some(GridHit::Cell(cell)) => Some(GridCommand::Click {
                    cell,
                    at: Instant::now(),
                }),
                None => None,
            }
        }
        MouseEventKind::Drag(MouseButton::Left) => {
            view_data.drag.as_mut().and_then(|drag| {
                let delta = i32::from(mouse.column) - i32::from(drag.last_x);
                if delta == 0 {
                    return None;
                }
                drag.last_x = mouse.column;
                Some(GridCommand::ResizeColumn {
                    column: drag.column.clone(),
                    delta,
                })
            })
        }
        MouseEventKind::Up(MouseButton::Left) => {
            if view_data.drag.take().is_some()
                && let Some(widths) = view_data.pending_widths.take()
            {
                persist_widths(runtime, view_data, &widths);
            }
            None
        }
        MouseEventKind::ScrollDown => Some(GridCommand::MoveRow(SCROLL_ROWS)),
        MouseEventKind::ScrollUp => Some(GridCommand::MoveRow(-SCROLL_ROWS)),
        _ => None,
    };
    if let Some(command) = command {
        dispatch_grid(state, runtime, view_data, internal_tx, command);
    }
}

fn status_text(state: &AppState, view_data: &ViewData) -> String {
    if let Some(status) = &state.status_line {
        return status.clone();
    }
    let mut parts = Vec::new();
    if !state.session_active() {
        parts.push("session expired".to_owned());
    }
    let active = view_data.jobs.active_count();
    if active > 0 {
        parts.push(format!("{active} jobs running"));
    }
    if let Some(stream) = view_data.job_stream
        && stream != StreamStatus::Connected
    {
        parts.push(format!("jobs {}", stream.label()));
    }
    parts.push("? help  q quit".to_owned());
    parts.join(" · ")
}

fn render(frame: &mut ratatui::Frame<'_>, state: &AppState, view_data: &mut ViewData) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(4), Constraint::Length(1)])
        .split(frame.area());

    view_data.grid_area = table_areas(layout[0]).0;
    render_table(frame, layout[0], &view_data.table);

    let status = Paragraph::new(status_text(state, view_data))
        .style(Style::default().fg(Color::Yellow));
    frame.render_widget(status, layout[1]);

    render_notices(frame, layout[0], &view_data.table);
    render_dialog(frame, &view_data.table);

    if state.jobs_overlay {
        let area = centered_rect(70, 50, frame.area());
        frame.render_widget(Clear, area);
        let jobs = Paragraph::new(jobs_overlay_text(&view_data.jobs, view_data.job_stream))
            .block(Block::default().title("jobs").borders(Borders::ALL));
        frame.render_widget(jobs, area);
    }

    if view_data.help_visible {
        let area = centered_rect(80, 60, frame.area());
        frame.render_widget(Clear, area);
        let help = Paragraph::new(help_overlay_text())
            .block(Block::default().title("help").borders(Borders::ALL));
        frame.render_widget(help, area);
    }
}
