// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::time::{Duration, Instant};

pub const DEFAULT_NOTICE_TTL: Duration = Duration::from_secs(4);
/// Errors never expire, so only the newest few are kept.
pub const MAX_ERROR_NOTICES: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Error,
}

impl NoticeLevel {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Success => "ok",
            Self::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub id: u64,
    pub level: NoticeLevel,
    pub message: String,
    created_at: Instant,
}

/// Toasts shown over the grid, newest last.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notifications {
    items: Vec<Notice>,
    next_id: u64,
    ttl: Duration,
}

impl Default for Notifications {
    fn default() -> Self {
        Self::new(DEFAULT_NOTICE_TTL)
    }
}

impl Notifications {
    pub fn new(ttl: Duration) -> Self {
        Self {
            items: Vec::new(),
            next_id: 0,
            ttl,
        }
    }

    pub fn push(&mut self, level: NoticeLevel, message: impl Into<String>) -> u64 {
        self.push_at(level, message, Instant::now())
    }

    /// A repeated error replaces the earlier copy instead of stacking.
    pub fn push_at(&mut self, level: NoticeLevel, message: impl Into<String>, now: Instant) -> u64 {
        let message = message.into();
        if level == NoticeLevel::Error {
            self.items.retain(|notice| {
                notice.level != NoticeLevel::Error || notice.message != message
            });
        }
        self.next_id = self.next_id.saturating_add(1);
        self.items.push(Notice {
            id: self.next_id,
            level,
            message,
            created_at: now,
        });
        if level == NoticeLevel::Error {
            self.trim_errors();
        }
        self.next_id
    }

    fn trim_errors(&mut self) {
        let mut excess = self
            .count(NoticeLevel::Error)
            .saturating_sub(MAX_ERROR_NOTICES);
        self.items.retain(|notice| {
            if excess > 0 && notice.level == NoticeLevel::Error {
                excess -= 1;
                return false;
            }
            true
        });
    }

    pub fn dismiss(&mut self, id: u64) -> bool {
        let before = self.items.len();
        self.items.retain(|notice| notice.id != id);
        before != self.items.len()
    }

    pub fn dismiss_latest(&mut self) -> bool {
        self.items.pop().is_some()
    }

    /// Drops notices older than the TTL. Errors stay until dismissed.
    pub fn expire(&mut self, now: Instant) -> usize {
        let before = self.items.len();
        let ttl = self.ttl;
        self.items.retain(|notice| {
            notice.level == NoticeLevel::Error
                || now.saturating_duration_since(notice.created_at) < ttl
        });
        before - self.items.len()
    }

    pub fn items(&self) -> &[Notice] {
        &self.items
    }

    pub fn count(&self, level: NoticeLevel) -> usize {
        self.items
            .iter()
            .filter(|notice| notice.level == level)
            .count()
    }

    pub fn latest(&self) -> Option<&Notice> {
        self.items.last()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
