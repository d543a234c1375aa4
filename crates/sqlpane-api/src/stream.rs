// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use sqlpane_app::{JobFeed, JobUpdate, StreamStatus};
use std::io::{self, BufRead};
use std::thread;
use std::time::Duration;

use crate::{Client, is_unauthorized};

pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(500);
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(30);
pub const DEFAULT_MAX_RETRIES: u32 = 8;

/// Server-sent job events. Each `data:` block is one `JobUpdate`; blocks that
/// do not decode are skipped.
pub struct JobStream {
    lines: Box<dyn Iterator<Item = io::Result<String>> + Send>,
    done: bool,
}

impl JobStream {
    pub(crate) fn new<I>(lines: I) -> Self
    where
        I: Iterator<Item = io::Result<String>> + Send + 'static,
    {
        Self {
            lines: Box::new(lines),
            done: false,
        }
    }

    pub fn from_reader<R: BufRead + Send + 'static>(reader: R) -> Self {
        Self::new(reader.lines())
    }

    fn decode(data: &[String]) -> Option<JobUpdate> {
        let payload = data.join("\n");
        match serde_json::from_str(&payload) {
            Ok(update) => Some(update),
            Err(error) => {
                tracing::warn!(error = %error, payload, "skipping malformed job event");
                None
            }
        }
    }
}

impl Iterator for JobStream {
    type Item = Result<JobUpdate>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let mut data = Vec::new();
        loop {
            let line = match self.lines.next() {
                None => {
                    self.done = true;
                    return (!data.is_empty()).then(|| Self::decode(&data)).flatten().map(Ok);
                }
                Some(Ok(line)) => line,
                Some(Err(error)) => {
                    self.done = true;
                    return Some(Err(error).context("read job event stream"));
                }
            };

            let line = line.trim_end_matches('\r');
            if line.is_empty() {
                if data.is_empty() {
                    continue;
                }
                if let Some(update) = Self::decode(&data) {
                    return Some(Ok(update));
                }
                data.clear();
                continue;
            }
            if let Some(value) = line.strip_prefix("data:") {
                data.push(value.strip_prefix(' ').unwrap_or(value).to_owned());
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub max_retries: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

impl ReconnectPolicy {
    /// `base * 2^attempt`, capped at `max_delay`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2_u32.checked_pow(attempt).unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectState {
    Connected,
    Disconnected { attempt: u32 },
    GaveUp { attempts: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconnector {
    policy: ReconnectPolicy,
    state: ReconnectState,
}

impl Reconnector {
    pub fn new(policy: ReconnectPolicy) -> Self {
        Self {
            policy,
            state: ReconnectState::Disconnected { attempt: 0 },
        }
    }

    pub fn state(&self) -> ReconnectState {
        self.state
    }

    pub fn policy(&self) -> ReconnectPolicy {
        self.policy
    }

    pub fn connected(&mut self) {
        self.state = ReconnectState::Connected;
    }

    /// Records a dropped or refused connection. Returns how long to wait
    /// before the next attempt, or `None` once retries are used up.
    pub fn failed(&mut self) -> Option<Duration> {
        let attempt = match self.state {
            ReconnectState::Connected => 0,
            ReconnectState::Disconnected { attempt } => attempt + 1,
            ReconnectState::GaveUp { .. } => return None,
        };
        if attempt >= self.policy.max_retries {
            self.state = ReconnectState::GaveUp { attempts: attempt };
            return None;
        }
        self.state = ReconnectState::Disconnected { attempt };
        Some(self.policy.delay_for(attempt))
    }

    pub fn give_up(&mut self) {
        let attempts = match self.state {
            ReconnectState::Disconnected { attempt } => attempt,
            ReconnectState::GaveUp { attempts } => attempts,
            ReconnectState::Connected => 0,
        };
        self.state = ReconnectState::GaveUp { attempts };
    }

    pub fn restart(&mut self) {
        self.state = ReconnectState::Disconnected { attempt: 0 };
    }
}

/// Keeps the job stream open until retries run out or `sink` returns false.
/// Runs on the calling thread; callers spawn it.
pub fn run_job_listener<F>(client: &Client, policy: ReconnectPolicy, mut sink: F)
where
    F: FnMut(JobFeed) -> bool,
{
    let mut reconnector = Reconnector::new(policy);
    if !sink(JobFeed::Status(StreamStatus::Connecting)) {
        return;
    }
    loop {
        match client.job_events() {
            Ok(stream) => {
                reconnector.connected();
                tracing::info!("job stream connected");
                if !sink(JobFeed::Status(StreamStatus::Connected)) {
                    return;
                }
                for item in stream {
                    match item {
                        Ok(update) => {
                            if !sink(JobFeed::Update(update)) {
                                return;
                            }
                        }
                        Err(error) => {
                            tracing::warn!(error = %error, "job stream read failed");
                            break;
                        }
                    }
                }
                tracing::info!("job stream closed");
            }
            Err(error) if is_unauthorized(&error) => {
                tracing::warn!(error = %error, "job stream rejected credentials");
                reconnector.give_up();
            }
            Err(error) => tracing::warn!(error = %error, "job stream connect failed"),
        }

        match reconnector.failed() {
            Some(delay) => {
                let attempt = match reconnector.state() {
                    ReconnectState::Disconnected { attempt } => attempt + 1,
                    _ => 1,
                };
                if !sink(JobFeed::Status(StreamStatus::Reconnecting { attempt, delay })) {
                    return;
                }
                thread::sleep(delay);
            }
            None => {
                let attempts = match reconnector.state() {
                    ReconnectState::GaveUp { attempts } => attempts,
                    _ => policy.max_retries,
                };
                tracing::info!(attempts, "job stream giving up");
                sink(JobFeed::Status(StreamStatus::GaveUp { attempts }));
                return;
            }
        }
    }
}
