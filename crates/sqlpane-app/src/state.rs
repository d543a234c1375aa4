// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::TableRef;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Active,
    Expired,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppState {
    pub table: Option<TableRef>,
    pub jobs_overlay: bool,
    pub session: SessionState,
    pub status_line: Option<String>,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            table: None,
            jobs_overlay: false,
            session: SessionState::Active,
            status_line: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppCommand {
    OpenTable(TableRef),
    ShowJobs,
    HideJobs,
    SessionExpired,
    SetStatus(String),
    ClearStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    TableOpened(TableRef),
    JobsOverlayChanged(bool),
    SessionChanged(SessionState),
    StatusUpdated(String),
    StatusCleared,
}

impl AppState {
    pub fn dispatch(&mut self, command: AppCommand) -> Vec<AppEvent> {
        match command {
            AppCommand::OpenTable(table) => {
                let label = format!("opened {table}");
                self.table = Some(table.clone());
                vec![AppEvent::TableOpened(table), self.set_status(&label)]
            }
            AppCommand::ShowJobs => {
                self.jobs_overlay = true;
                vec![AppEvent::JobsOverlayChanged(true)]
            }
            AppCommand::HideJobs => {
                self.jobs_overlay = false;
                vec![AppEvent::JobsOverlayChanged(false)]
            }
            AppCommand::SessionExpired => {
                if self.session == SessionState::Expired {
                    return Vec::new();
                }
                self.session = SessionState::Expired;
                vec![
                    AppEvent::SessionChanged(self.session),
                    self.set_status("session expired; sign in again and restart"),
                ]
            }
            AppCommand::SetStatus(message) => vec![self.set_status(&message)],
            AppCommand::ClearStatus => {
                self.status_line = None;
                vec![AppEvent::StatusCleared]
            }
        }
    }

    pub fn session_active(&self) -> bool {
        self.session == SessionState::Active
    }

    fn set_status(&mut self, message: &str) -> AppEvent {
        self.status_line = Some(message.to_owned());
        AppEvent::StatusUpdated(message.to_owned())
    }
}
