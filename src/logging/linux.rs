//! Run events to journald through the syslog socket

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use syslog::{Facility, Formatter3164, Logger, LoggerBackend};

use super::{mirror_to_tracing, LogLevel, RunEvent};

type Syslog = Logger<LoggerBackend, Formatter3164>;

pub struct SystemLogger {
    /// `None` without a syslog socket (containers, CI).
    syslog: Mutex<Option<Syslog>>,
    write_failed: AtomicBool,
}

impl SystemLogger {
    pub fn new() -> Self {
        let formatter = Formatter3164 {
            facility: Facility::LOG_USER,
            hostname: None,
            process: "run_engine".into(),
            pid: std::process::id(),
        };
        Self {
            syslog: Mutex::new(syslog::unix(formatter).ok()),
            write_failed: AtomicBool::new(false),
        }
    }

    pub fn log(&self, event: RunEvent) {
        let line = event.to_syslog_format();
        self.send(event.level, &line);
        mirror_to_tracing(&event, &line);
    }

    fn send(&self, level: LogLevel, line: &str) {
        let mut guard = self.syslog.lock().unwrap_or_else(|e| e.into_inner());
        let Some(syslog) = guard.as_mut() else {
            return;
        };
        let sent = match level {
            LogLevel::Debug => syslog.debug(line),
            LogLevel::Info => syslog.info(line),
            LogLevel::Warning => syslog.warning(line),
            LogLevel::Error => syslog.err(line),
            LogLevel::Critical => syslog.crit(line),
        };
        if let Err(e) = sent {
            if !self.write_failed.swap(true, Ordering::Relaxed) {
                tracing::warn!(error = %e, "syslog write failed, events go to the run log only");
            }
        }
    }
}

impl Default for SystemLogger {
    fn default() -> Self {
        Self::new()
    }
}
