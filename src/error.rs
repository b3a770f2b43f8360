//! Router-level error type.
//!
//! Each subsystem has its own `thiserror` enum; [`EngineError`] wraps them and
//! adds the dialog-driven outcomes that end a session.

use thiserror::Error;

use crate::config::ConfigError;
use crate::connection::ConnectionError;
use crate::input::InputError;
use crate::vision::VisionError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Server maintenance dialog shown. Stopping")]
    Maintenance,

    #[error("Game reported it is not operable. Stopping")]
    NotOperable,

    #[error("Vision: {0}")]
    Vision(#[from] VisionError),

    #[error("Input: {0}")]
    Input(#[from] InputError),

    #[error("Config: {0}")]
    Config(#[from] ConfigError),

    #[error("Connection: {0}")]
    Connection(#[from] ConnectionError),

    #[error("Run made no progress after {0} router steps")]
    Stalled(usize),
}

impl EngineError {
    /// Errors that end the whole session rather than the current run.
    pub fn is_fatal(&self) -> bool {
        match self {
            EngineError::Maintenance | EngineError::NotOperable => true,
            EngineError::Vision(e) => e.is_platform(),
            EngineError::Input(e) => e.is_platform(),
            EngineError::Connection(_) => true,
            EngineError::Config(_) | EngineError::Stalled(_) => false,
        }
    }

    /// Process exit code for a fatal error. Dialog-driven stops are clean exits.
    pub fn exit_code(&self) -> i32 {
        match self {
            EngineError::Maintenance | EngineError::NotOperable => 0,
            _ => 1,
        }
    }

    pub fn missing_template(&self) -> Option<&str> {
        match self {
            EngineError::Vision(VisionError::MissingTemplate(path)) => Some(path),
            _ => None,
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dialog_stops_exit_cleanly() {
        assert!(EngineError::Maintenance.is_fatal());
        assert_eq!(EngineError::Maintenance.exit_code(), 0);
        assert_eq!(EngineError::NotOperable.exit_code(), 0);
        assert_eq!(EngineError::Stalled(3).exit_code(), 1);
    }

    #[test]
    fn test_missing_template_is_per_run() {
        let err: EngineError = VisionError::MissingTemplate("pictures/x.png".into()).into();
        assert!(!err.is_fatal());
        assert_eq!(err.missing_template(), Some("pictures/x.png"));
    }

    #[test]
    fn test_platform_errors_end_session() {
        let err: EngineError = InputError::FeatureNotCompiled.into();
        assert!(err.is_fatal());
    }
}
