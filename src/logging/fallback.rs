//! Event logging for platforms without a system log backend

use super::{mirror_to_tracing, RunEvent};

pub struct SystemLogger;

impl SystemLogger {
    pub fn new() -> Self {
        SystemLogger
    }

    pub fn log(&self, event: RunEvent) {
        mirror_to_tracing(&event, &event.to_syslog_format());
    }
}

impl Default for SystemLogger {
    fn default() -> Self {
        Self::new()
    }
}
