//! macOS event logging via Unified Logging (os_log)
//!
//! View logs with:
//!   log stream --predicate 'subsystem == "dev.mirror-runner"'

use super::{mirror_to_tracing, LogLevel, RunEvent};
use oslog::OsLog;
use std::sync::OnceLock;

static LOGGER: OnceLock<OsLog> = OnceLock::new();

const SUBSYSTEM: &str = "dev.mirror-runner";
const CATEGORY: &str = "runs";

pub struct SystemLogger;

impl SystemLogger {
    pub fn new() -> Self {
        let _ = LOGGER.set(OsLog::new(SUBSYSTEM, CATEGORY));
        SystemLogger
    }

    pub fn log(&self, event: RunEvent) {
        let message = event.to_syslog_format();

        if let Some(logger) = LOGGER.get() {
            let level = match event.level {
                LogLevel::Debug => oslog::Level::Debug,
                LogLevel::Info => oslog::Level::Info,
                LogLevel::Warning => oslog::Level::Default,
                LogLevel::Error => oslog::Level::Error,
                LogLevel::Critical => oslog::Level::Fault,
            };
            logger.with_level(level, &message);
        }

        mirror_to_tracing(&event, &message);
    }
}

impl Default for SystemLogger {
    fn default() -> Self {
        Self::new()
    }
}
