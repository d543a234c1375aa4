// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::time::{Duration, Instant};

pub const DEFAULT_CLICK_DELAY: Duration = Duration::from_millis(250);

/// A cell on the current page: display row index plus column name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellRef {
    pub row: usize,
    pub column: String,
}

impl CellRef {
    pub fn new(row: usize, column: impl Into<String>) -> Self {
        Self {
            row,
            column: column.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Gesture {
    SingleClick(CellRef),
    DoubleClick(CellRef),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ClickState {
    Idle,
    Pending { cell: CellRef, armed_at: Instant },
}

/// Tells single from double clicks. A click arms a timer; a second click on
/// the same cell before it fires is a double click and the single never
/// happens. At most one timer is pending at a time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellInteraction {
    state: ClickState,
    delay: Duration,
}

impl Default for CellInteraction {
    fn default() -> Self {
        Self::new(DEFAULT_CLICK_DELAY)
    }
}

impl CellInteraction {
    pub fn new(delay: Duration) -> Self {
        Self {
            state: ClickState::Idle,
            delay,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.state, ClickState::Pending { .. })
    }

    pub fn click(&mut self, cell: CellRef, now: Instant) -> Option<Gesture> {
        match std::mem::replace(&mut self.state, ClickState::Idle) {
            ClickState::Pending {
                cell: pending,
                armed_at,
            } if pending == cell && now.saturating_duration_since(armed_at) < self.delay => {
                Some(Gesture::DoubleClick(cell))
            }
            ClickState::Pending { cell: pending, .. } => {
                self.state = ClickState::Pending {
                    cell,
                    armed_at: now,
                };
                Some(Gesture::SingleClick(pending))
            }
            ClickState::Idle => {
                self.state = ClickState::Pending {
                    cell,
                    armed_at: now,
                };
                None
            }
        }
    }

    /// A double click reported directly by the host. Cancels any pending
    /// single click.
    pub fn double_click(&mut self, cell: CellRef) -> Gesture {
        self.state = ClickState::Idle;
        Gesture::DoubleClick(cell)
    }

    /// Fires the pending single click once its delay has passed.
    pub fn tick(&mut self, now: Instant) -> Option<Gesture> {
        let ClickState::Pending { armed_at, .. } = &self.state else {
            return None;
        };
        if now.saturating_duration_since(*armed_at) < self.delay {
            return None;
        }
        match std::mem::replace(&mut self.state, ClickState::Idle) {
            ClickState::Pending { cell, .. } => Some(Gesture::SingleClick(cell)),
            ClickState::Idle => None,
        }
    }

    pub fn cancel(&mut self) {
        self.state = ClickState::Idle;
    }
}
