//! Cross-Platform Run Event Logging
//!
//! Session and run milestones are written as structured [`RunEvent`]s to:
//! - Linux: journald/syslog
//! - macOS: Unified Log (os_log)
//! - elsewhere: tracing only
//!
//! Every event is mirrored to `tracing`, so it also lands in the run log file.
//!
//! Filter commands:
//! - Linux: `journalctl -t run_engine`
//! - macOS: `log show --predicate 'subsystem == "dev.mirror-runner"'`

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::status::Status;

/// Event IDs for filtering in system logs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u32)]
pub enum EventId {
    // Informational (1000-1099)
    SessionStart = 1000,
    SessionEnd = 1001,
    RunStart = 1010,
    RunWon = 1011,
    RunLost = 1012,
    ConnectionRestored = 1020,
    ReconnectDone = 1021,

    // Warnings (1100-1199)
    ConnectionLost = 1100,
    ReconnectStart = 1110,

    // Errors (1200-1299)
    RunErrored = 1200,
    MissingTemplate = 1210,

    // Critical (1300-1399)
    Maintenance = 1300,
    NotOperable = 1301,
}

/// Log severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Debug => write!(f, "DEBUG"),
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warning => write!(f, "WARNING"),
            LogLevel::Error => write!(f, "ERROR"),
            LogLevel::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// Structured log event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunEvent {
    pub timestamp: DateTime<Utc>,
    pub event_id: EventId,
    pub level: LogLevel,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl RunEvent {
    pub fn new(event_id: EventId, level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            event_id,
            level,
            message: message.into(),
            run: None,
            status: None,
            template: None,
            reason: None,
        }
    }

    /// `run` is 1-based.
    pub fn with_run(mut self, run: usize) -> Self {
        self.run = Some(run);
        self
    }

    pub fn with_status(mut self, status: Status) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = Some(template.into());
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        self.reason = Some(if reason.len() > 300 {
            reason.chars().take(300).collect()
        } else {
            reason
        });
        self
    }

    /// Format for syslog-style output
    pub fn to_syslog_format(&self) -> String {
        let mut parts = vec![
            format!("MIRROR[{}]", self.event_id as u32),
            format!("level={}", self.level),
        ];

        if let Some(run) = self.run {
            parts.push(format!("run={}", run));
        }
        if let Some(status) = self.status {
            parts.push(format!("status={}", status));
        }
        if let Some(ref template) = self.template {
            parts.push(format!("template={}", template));
        }
        if let Some(ref reason) = self.reason {
            let escaped = reason.replace('"', "\\\"").replace('\n', " ");
            parts.push(format!("reason=\"{}\"", escaped));
        }

        parts.push(format!("msg={}", self.message));
        parts.join(" ")
    }
}

fn mirror_to_tracing(event: &RunEvent, message: &str) {
    match event.level {
        LogLevel::Debug => tracing::debug!("{}", message),
        LogLevel::Info => tracing::info!("{}", message),
        LogLevel::Warning => tracing::warn!("{}", message),
        LogLevel::Error => tracing::error!("{}", message),
        LogLevel::Critical => tracing::error!(critical = true, "{}", message),
    }
}

// Platform-specific implementations
#[cfg(target_os = "linux")]
mod linux;
#[cfg(target_os = "macos")]
mod macos;

#[cfg(target_os = "linux")]
pub use linux::SystemLogger;
#[cfg(target_os = "macos")]
pub use macos::SystemLogger;

#[cfg(not(any(target_os = "linux", target_os = "macos")))]
mod fallback;
#[cfg(not(any(target_os = "linux", target_os = "macos")))]
pub use fallback::SystemLogger;

/// Convenience functions
impl SystemLogger {
    pub fn session_start(&self, runs: usize) {
        self.log(RunEvent::new(
            EventId::SessionStart,
            LogLevel::Info,
            format!("Session started: {} run(s) requested", runs),
        ));
    }

    pub fn session_end(&self, done: usize, wins: usize, losses: usize, errored: usize) {
        self.log(RunEvent::new(
            EventId::SessionEnd,
            LogLevel::Info,
            format!(
                "Session finished: {} run(s), {} won, {} lost, {} errored",
                done, wins, losses, errored
            ),
        ));
    }

    pub fn run_start(&self, run: usize, status: Status) {
        self.log(
            RunEvent::new(EventId::RunStart, LogLevel::Info, "Run started")
                .with_run(run)
                .with_status(status),
        );
    }

    pub fn run_finished(&self, run: usize, status: Status, won: bool) {
        let (id, msg) = if won {
            (EventId::RunWon, "Run won")
        } else {
            (EventId::RunLost, "Run lost")
        };
        self.log(RunEvent::new(id, LogLevel::Info, msg).with_run(run).with_status(status));
    }

    pub fn run_errored(&self, run: usize, status: Status, reason: &str) {
        self.log(
            RunEvent::new(EventId::RunErrored, LogLevel::Error, "Run aborted")
                .with_run(run)
                .with_status(status)
                .with_reason(reason),
        );
    }

    pub fn missing_template(&self, template: &str) {
        self.log(
            RunEvent::new(EventId::MissingTemplate, LogLevel::Error, "Template missing from bundle")
                .with_template(template),
        );
    }

    pub fn connection_lost(&self) {
        self.log(RunEvent::new(
            EventId::ConnectionLost,
            LogLevel::Warning,
            "Connection lost, router paused",
        ));
    }

    pub fn connection_restored(&self) {
        self.log(RunEvent::new(
            EventId::ConnectionRestored,
            LogLevel::Info,
            "Connection restored, router resumed",
        ));
    }

    pub fn reconnect_start(&self) {
        self.log(RunEvent::new(
            EventId::ReconnectStart,
            LogLevel::Warning,
            "Server error dialog, reconnecting",
        ));
    }

    pub fn reconnect_done(&self, attempts: u32) {
        self.log(RunEvent::new(
            EventId::ReconnectDone,
            LogLevel::Info,
            format!("Reconnected after {} attempt(s)", attempts),
        ));
    }

    pub fn maintenance(&self) {
        self.log(RunEvent::new(
            EventId::Maintenance,
            LogLevel::Critical,
            "Server maintenance, stopping",
        ));
    }

    pub fn not_operable(&self) {
        self.log(RunEvent::new(
            EventId::NotOperable,
            LogLevel::Critical,
            "Game is not operable, stopping",
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_syslog_format() {
        let event = RunEvent::new(EventId::RunErrored, LogLevel::Error, "Run aborted")
            .with_run(1)
            .with_status(Status::Burn)
            .with_reason("said \"no\"\nthen left");
        assert_eq!(
            event.to_syslog_format(),
            "MIRROR[1200] level=ERROR run=1 status=burn reason=\"said \\\"no\\\" then left\" msg=Run aborted"
        );
    }

    #[test]
    fn test_reason_truncated() {
        let event = RunEvent::new(EventId::RunErrored, LogLevel::Error, "x").with_reason("é".repeat(400));
        assert_eq!(event.reason.unwrap().chars().count(), 300);
    }
}
