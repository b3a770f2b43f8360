//! Session driver
//!
//! Runs the requested number of mirror runs, one status per run from the
//! expanded rotation. Per-run failures are recorded and the next run starts;
//! fatal errors end the session.

use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::{debug, error, info, warn};

use crate::assets::{self, general};
use crate::bot::Bot;
use crate::config::rotation;
use crate::connection::{self, ReconnectContext, ReconnectPolicy};
use crate::error::{EngineError, EngineResult};
use crate::mirror::Mirror;
use crate::status::Status;

#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    Won,
    Lost,
    Errored(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunRecord {
    /// 1-based.
    pub run: usize,
    pub status: Status,
    pub outcome: RunOutcome,
}

#[derive(Debug, Clone, Default)]
pub struct EngineState {
    pub runs_requested: usize,
    pub runs_done: usize,
    pub wins: usize,
    pub losses: usize,
    pub errored: usize,
    pub rotation: Vec<Status>,
    pub history: Vec<RunRecord>,
}

impl EngineState {
    pub fn new(runs: usize, configured: &[Status]) -> Self {
        Self {
            runs_requested: runs,
            rotation: rotation::expand(configured, runs),
            ..Default::default()
        }
    }

    fn record(&mut self, record: RunRecord) {
        match record.outcome {
            RunOutcome::Won => self.wins += 1,
            RunOutcome::Lost => self.losses += 1,
            RunOutcome::Errored(_) => self.errored += 1,
        }
        self.runs_done += 1;
        self.history.push(record);
    }
}

/// How a session ended.
#[derive(Debug)]
pub struct SessionReport {
    pub state: EngineState,
    pub fatal: Option<EngineError>,
}

impl SessionReport {
    pub fn exit_code(&self) -> i32 {
        self.fatal.as_ref().map_or(0, |e| e.exit_code())
    }
}

/// Run `runs` mirror runs. `observe` sees the state after every run.
pub fn run_engine(
    bot: &mut Bot,
    runs: usize,
    error_dir: &Path,
    mut observe: impl FnMut(&EngineState),
) -> SessionReport {
    bot.events.session_start(runs);
    let configured = match bot.config.rotation() {
        Ok(r) => r,
        Err(e) => {
            error!(error = %e, "cannot read status rotation");
            return SessionReport {
                state: EngineState::new(0, &[]),
                fatal: Some(e.into()),
            };
        }
    };
    let mut state = EngineState::new(runs, &configured);
    info!(rotation = ?state.rotation, "rotation");
    let mut fatal = None;

    for index in 0..runs {
        let run = index + 1;
        let status = state.rotation[index];
        bot.events.run_start(run, status);

        let result = prepare(bot).and_then(|_| run_one(bot, status));
        let outcome = match result {
            Ok(won) => {
                bot.events.run_finished(run, status, won);
                if won {
                    RunOutcome::Won
                } else {
                    RunOutcome::Lost
                }
            }
            Err(e) if e.is_fatal() => {
                error!(run, error = %e, "fatal, stopping session");
                fatal = Some(e);
                break;
            }
            Err(e) => {
                record_failure(bot, run, status, &e, error_dir);
                RunOutcome::Errored(e.to_string())
            }
        };
        state.record(RunRecord { run, status, outcome });
        observe(&state);
    }

    bot.events
        .session_end(state.runs_done, state.wins, state.losses, state.errored);
    SessionReport { state, fatal }
}

/// Pick up config edits made since the last run.
fn prepare(bot: &mut Bot) -> EngineResult<()> {
    bot.config.reload_all()?;
    bot.refresh_vars()?;
    Ok(())
}

/// One run from the entry screen to the post-run screen. `true` on a win.
pub fn run_one(bot: &Bot, status: Status) -> EngineResult<bool> {
    let mut mirror = Mirror::new(bot, status);
    bot.gate.wait();
    mirror.setup()?;

    for step in 0..bot.max_steps {
        bot.gate.wait();
        let outcome = mirror.step()?;
        if outcome.done {
            debug!(step, won = outcome.win, "run finished");
            return Ok(outcome.win);
        }
        bot.gate.wait();
        supervise(bot)?;
    }
    Err(EngineError::Stalled(bot.max_steps))
}

/// Reconnect in the foreground if the server-error dialog is up.
pub fn supervise(bot: &Bot) -> EngineResult<()> {
    if !bot.exists(general::SERVER_ERROR)? {
        return Ok(());
    }
    warn!("server error dialog, reconnecting");
    bot.release()?;
    bot.gate.clear();
    let ctx = ReconnectContext {
        vision: bot.vision.as_ref(),
        input: &bot.input,
        clock: bot.clock.as_ref(),
        events: bot.events.as_ref(),
        reachability: bot.reachability.as_ref(),
        safe_rest: bot.layout().safe_rest,
    };
    let result = connection::reconnect(&ctx, ReconnectPolicy::from_vars(bot.vars()));
    bot.gate.set();
    result.map(|_| ())
}

fn record_failure(bot: &Bot, run: usize, status: Status, e: &EngineError, error_dir: &Path) {
    match e.missing_template() {
        Some(template) => bot.events.missing_template(template),
        None => bot.events.run_errored(run, status, &e.to_string()),
    }
    let path = screenshot_path(error_dir);
    match bot.vision.snapshot(&path) {
        Ok(()) => info!(path = %path.display(), "saved error screenshot"),
        Err(err) => warn!(error = %err, "could not save error screenshot"),
    }
    if let Err(err) = bot.release() {
        warn!(error = %err, "could not release mouse after error");
    }
}

/// Every template a session can ask for, status tables included.
pub fn required_templates() -> Vec<&'static str> {
    let mut all = assets::catalog();
    for status in Status::ALL {
        all.extend(status.assets().templates());
    }
    all
}

fn screenshot_path(dir: &Path) -> PathBuf {
    dir.join(format!("{}.png", Local::now().format("%Y%m%d_%H%M%S_%3f")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_counts_outcomes() {
        let mut state = EngineState::new(3, &[Status::Burn, Status::Poise]);
        assert_eq!(state.rotation, vec![Status::Burn, Status::Poise, Status::Burn]);
        state.record(RunRecord { run: 1, status: Status::Burn, outcome: RunOutcome::Won });
        state.record(RunRecord {
            run: 2,
            status: Status::Poise,
            outcome: RunOutcome::Errored("boom".into()),
        });
        assert_eq!((state.runs_done, state.wins, state.losses, state.errored), (2, 1, 0, 1));
    }

    #[test]
    fn test_report_exit_code() {
        let clean = SessionReport { state: EngineState::default(), fatal: None };
        assert_eq!(clean.exit_code(), 0);
        let maint = SessionReport {
            state: EngineState::default(),
            fatal: Some(EngineError::Maintenance),
        };
        assert_eq!(maint.exit_code(), 0);
        let stalled = SessionReport {
            state: EngineState::default(),
            fatal: Some(EngineError::Stalled(1)),
        };
        assert_eq!(stalled.exit_code(), 1);
    }

    #[test]
    fn test_required_templates_cover_status_tables() {
        let all = required_templates();
        for status in Status::ALL {
            for t in status.assets().templates() {
                assert!(all.contains(&t));
            }
        }
    }

    #[test]
    fn test_screenshot_named_by_time() {
        let path = screenshot_path(Path::new("error"));
        assert!(path.starts_with("error"));
        assert_eq!(path.extension().and_then(|e| e.to_str()), Some("png"));
    }
}
