// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use time::OffsetDateTime;

use crate::JobId;

pub const DEFAULT_JOB_PRUNE_AFTER: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    SchemaSync,
    AiGeneration,
    Query,
    #[serde(other)]
    Other,
}

impl JobKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::SchemaSync => "schema sync",
            Self::AiGeneration => "ai query",
            Self::Query => "query",
            Self::Other => "job",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobUpdate {
    #[serde(rename = "jobId")]
    pub id: JobId,
    pub kind: JobKind,
    pub status: JobStatus,
    #[serde(default)]
    pub progress: Option<u8>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct JobEntry {
    pub update: JobUpdate,
    pub received_at: OffsetDateTime,
    finished_at: Option<Instant>,
}

impl JobEntry {
    pub fn summary(&self) -> String {
        let mut out = format!(
            "#{} {} {}",
            self.update.id,
            self.update.kind.label(),
            self.update.status.as_str()
        );
        if let Some(progress) = self.update.progress
            && !self.update.status.is_terminal()
        {
            out.push_str(&format!(" {}%", progress.min(100)));
        }
        if let Some(message) = &self.update.message
            && !message.is_empty()
        {
            out.push_str(" - ");
            out.push_str(message);
        }
        out
    }
}

/// In-memory list of server jobs in first-seen order. Jobs that reach a
/// terminal state are dropped `prune_after` later.
#[derive(Debug, Clone, PartialEq)]
pub struct JobBoard {
    entries: Vec<JobEntry>,
    prune_after: Duration,
}

impl Default for JobBoard {
    fn default() -> Self {
        Self::new(DEFAULT_JOB_PRUNE_AFTER)
    }
}

impl JobBoard {
    pub fn new(prune_after: Duration) -> Self {
        Self {
            entries: Vec::new(),
            prune_after,
        }
    }

    pub fn apply(&mut self, update: JobUpdate, now: Instant) {
        let finished_at = update.status.is_terminal().then_some(now);
        match self
            .entries
            .iter_mut()
            .find(|entry| entry.update.id == update.id)
        {
            Some(entry) => {
                entry.finished_at = match (entry.finished_at, finished_at) {
                    (Some(previous), Some(_)) => Some(previous),
                    (_, next) => next,
                };
                entry.update = update;
                entry.received_at = OffsetDateTime::now_utc();
            }
            None => self.entries.push(JobEntry {
                update,
                received_at: OffsetDateTime::now_utc(),
                finished_at,
            }),
        }
    }

    /// Returns how many entries were dropped.
    pub fn prune(&mut self, now: Instant) -> usize {
        let before = self.entries.len();
        let prune_after = self.prune_after;
        self.entries.retain(|entry| match entry.finished_at {
            Some(finished) => now.saturating_duration_since(finished) < prune_after,
            None => true,
        });
        before - self.entries.len()
    }

    pub fn entries(&self) -> &[JobEntry] {
        &self.entries
    }

    pub fn active_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| !entry.update.status.is_terminal())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Connection state of the job event stream as seen by the listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamStatus {
    Connecting,
    Connected,
    Reconnecting { attempt: u32, delay: Duration },
    GaveUp { attempts: u32 },
}

impl StreamStatus {
    pub fn label(self) -> String {
        match self {
            Self::Connecting => "connecting".to_owned(),
            Self::Connected => "live".to_owned(),
            Self::Reconnecting { attempt, delay } => {
                format!("reconnecting (attempt {attempt}, in {}ms)", delay.as_millis())
            }
            Self::GaveUp { attempts } => format!("offline after {attempts} attempts"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobFeed {
    Update(JobUpdate),
    Status(StreamStatus),
}

#[cfg(test)]
mod tests {
    use super::{JobBoard, JobKind, JobStatus, JobUpdate, StreamStatus};
    use crate::JobId;
    use std::time::{Duration, Instant};

    fn update(id: i64, status: JobStatus) -> JobUpdate {
        JobUpdate {
            id: JobId::new(id),
            kind: JobKind::SchemaSync,
            status,
            progress: Some(40),
            message: None,
        }
    }

    #[test]
    fn update_decodes_from_stream_payload() -> anyhow::Result<()> {
        let parsed: JobUpdate = serde_json::from_str(
            r#"{"jobId": 3, "kind": "ai_generation", "status": "processing", "progress": 10}"#,
        )?;
        assert_eq!(parsed.id, JobId::new(3));
        assert_eq!(parsed.kind, JobKind::AiGeneration);
        assert_eq!(parsed.status, JobStatus::Processing);
        assert_eq!(parsed.progress, Some(10));

        let unknown: JobUpdate =
            serde_json::from_str(r#"{"jobId": 4, "kind": "reindex", "status": "pending"}"#)?;
        assert_eq!(unknown.kind, JobKind::Other);
        Ok(())
    }

    #[test]
    fn apply_replaces_existing_job_in_place() {
        let now = Instant::now();
        let mut board = JobBoard::default();
        board.apply(update(1, JobStatus::Pending), now);
        board.apply(update(2, JobStatus::Pending), now);
        board.apply(update(1, JobStatus::Processing), now);

        let ids = board
            .entries()
            .iter()
            .map(|entry| entry.update.id.get())
            .collect::<Vec<_>>();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(board.entries()[0].update.status, JobStatus::Processing);
        assert_eq!(board.active_count(), 2);
    }

    #[test]
    fn terminal_jobs_are_pruned_after_delay() {
        let start = Instant::now();
        let mut board = JobBoard::new(Duration::from_secs(5));
        board.apply(update(1, JobStatus::Processing), start);
        board.apply(update(2, JobStatus::Completed), start);
        board.apply(update(3, JobStatus::Failed), start + Duration::from_secs(3));

        assert_eq!(board.prune(start + Duration::from_secs(4)), 0);
        assert_eq!(board.prune(start + Duration::from_secs(6)), 1);
        assert_eq!(board.entries().len(), 2);
        assert_eq!(board.prune(start + Duration::from_secs(9)), 1);
        assert_eq!(board.entries()[0].update.id, JobId::new(1));
    }

    #[test]
    fn repeated_terminal_updates_keep_first_finish_time() {
        let start = Instant::now();
        let mut board = JobBoard::new(Duration::from_secs(5));
        board.apply(update(1, JobStatus::Completed), start);
        board.apply(update(1, JobStatus::Completed), start + Duration::from_secs(4));
        assert_eq!(board.prune(start + Duration::from_secs(6)), 1);
    }

    #[test]
    fn summary_shows_progress_only_while_running() {
        let mut board = JobBoard::default();
        board.apply(update(9, JobStatus::Processing), Instant::now());
        assert_eq!(board.entries()[0].summary(), "#9 schema sync processing 40%");

        let mut done = update(9, JobStatus::Failed);
        done.message = Some("timeout".to_owned());
        board.apply(done, Instant::now());
        assert_eq!(board.entries()[0].summary(), "#9 schema sync failed - timeout");
    }

    #[test]
    fn stream_status_labels() {
        assert_eq!(StreamStatus::Connected.label(), "live");
        assert_eq!(
            StreamStatus::Reconnecting {
                attempt: 2,
                delay: Duration::from_millis(1000),
            }
            .label(),
            "reconnecting (attempt 2, in 1000ms)"
        );
        assert_eq!(
            StreamStatus::GaveUp { attempts: 8 }.label(),
            "offline after 8 attempts"
        );
    }
}
