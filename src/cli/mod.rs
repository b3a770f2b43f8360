//! Run Engine CLI
//!
//! Banner, colored status lines, the run progress bar and the session summary.

use console::{style, Style};
use indicatif::{ProgressBar, ProgressStyle};

use crate::engine::{EngineState, RunOutcome, RunRecord};

pub const BANNER_TEXT: &str = r#"
 ███    ███ ██ ██████  ██████   ██████  ██████
 ████  ████ ██ ██   ██ ██   ██ ██    ██ ██   ██
 ██ ████ ██ ██ ██████  ██████  ██    ██ ██████
 ██  ██  ██ ██ ██   ██ ██   ██ ██    ██ ██   ██
 ██      ██ ██ ██   ██ ██   ██  ██████  ██   ██
"#;

pub fn print_banner() {
    println!("{}", style(BANNER_TEXT).cyan().bold());
    println!(
        "{}",
        style("            ✦  D U N G E O N   R U N   E N G I N E  ✦")
            .yellow()
            .bold()
    );
    println!(
        "{}",
        style(format!("                        Version {}", env!("CARGO_PKG_VERSION")))
            .dim()
    );
    println!();
}

pub fn print_info(msg: &str) {
    println!("{} {}", style("ℹ").cyan(), msg);
}

pub fn print_success(msg: &str) {
    println!("{} {}", style("✓").green().bold(), msg);
}

pub fn print_error(msg: &str) {
    println!("{} {}", style("✗").red().bold(), msg);
}

pub fn print_warning(msg: &str) {
    println!("{} {}", style("⚠").yellow().bold(), msg);
}

fn outcome_style(outcome: &RunOutcome) -> Style {
    match outcome {
        RunOutcome::Won => Style::new().green(),
        RunOutcome::Lost => Style::new().yellow(),
        RunOutcome::Errored(_) => Style::new().red(),
    }
}

fn outcome_label(outcome: &RunOutcome) -> &'static str {
    match outcome {
        RunOutcome::Won => "WON",
        RunOutcome::Lost => "LOST",
        RunOutcome::Errored(_) => "ERRORED",
    }
}

/// One line per finished run.
pub fn describe_run(record: &RunRecord) -> String {
    let badge = format!("[{}]", outcome_label(&record.outcome));
    let mut line = format!(
        "Run {} ({}) {}",
        record.run,
        record.status,
        outcome_style(&record.outcome).apply_to(badge)
    );
    if let RunOutcome::Errored(reason) = &record.outcome {
        line.push_str(&format!(" {}", style(reason).dim()));
    }
    line
}

/// Progress bar counting finished runs.
pub struct RunProgress {
    bar: ProgressBar,
    shown: usize,
}

impl RunProgress {
    pub fn new(runs: usize) -> Self {
        let bar = ProgressBar::new(runs as u64);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.cyan} [{bar:30.cyan/blue}] {pos}/{len} runs {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("█▓░"),
        );
        Self { bar, shown: 0 }
    }

    /// Hidden bar, for `--json-logs` and tests.
    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
            shown: 0,
        }
    }

    pub fn update(&mut self, state: &EngineState) {
        for record in &state.history[self.shown..] {
            self.bar.println(describe_run(record));
        }
        self.shown = state.history.len();
        self.bar.set_position(state.runs_done as u64);
        self.bar.set_message(format!(
            "{} won, {} lost, {} errored",
            state.wins, state.losses, state.errored
        ));
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

pub fn print_summary(state: &EngineState) {
    println!();
    println!(
        "{}",
        style("════════════════════════════════════════════════════════════")
            .dim()
    );
    println!("{}", style("SESSION SUMMARY").cyan().bold());
    println!("Runs: {}/{}", state.runs_done, state.runs_requested);
    println!(
        "Won: {}  Lost: {}  Errored: {}",
        style(state.wins).green().bold(),
        style(state.losses).yellow(),
        style(state.errored).red()
    );
    println!(
        "{}",
        style("────────────────────────────────────────────────────────────")
            .dim()
    );
}

/// Report for `--check-assets`. True when nothing is missing.
pub fn print_asset_report(checked: usize, missing: &[String]) -> bool {
    if missing.is_empty() {
        print_success(&format!("All {} templates present", checked));
        return true;
    }
    print_error(&format!("{} of {} templates missing:", missing.len(), checked));
    let shown = missing.len().min(20);
    for path in &missing[..shown] {
        println!("  {}", style(path).dim());
    }
    if missing.len() > shown {
        println!("{}", style(format!("  ... ({} more)", missing.len() - shown)).dim());
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::Status;

    #[test]
    fn test_errored_run_line_carries_reason() {
        console::set_colors_enabled(false);
        let record = RunRecord {
            run: 2,
            status: Status::Burn,
            outcome: RunOutcome::Errored("Vision: template missing".into()),
        };
        let line = describe_run(&record);
        assert!(line.starts_with("Run 2 (burn) [ERRORED]"));
        assert!(line.ends_with("Vision: template missing"));
    }

    #[test]
    fn test_progress_tracks_history() {
        let mut progress = RunProgress::hidden();
        let mut state = EngineState::new(2, &[Status::Poise]);
        state.runs_done = 1;
        state.wins = 1;
        state.history.push(RunRecord { run: 1, status: Status::Poise, outcome: RunOutcome::Won });
        progress.update(&state);
        assert_eq!(progress.shown, 1);
        assert_eq!(progress.bar.position(), 1);
    }
}
