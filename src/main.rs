//! Mirror Runner - repeated Mirror Dungeon runs
//!
//! ```bash
//! run_engine 5
//! run_engine 3 --config-dir ./config --templates . --debug
//! run_engine 0 --check-assets
//! ```

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use mirror_runner::cli::{
    print_asset_report, print_banner, print_error, print_info, print_summary, print_success,
    print_warning, RunProgress,
};
use mirror_runner::clock::{Clock, SystemClock};
use mirror_runner::config::ConfigStore;
use mirror_runner::connection::{ConnectionMonitor, HttpProbe, Latch, Reachability};
use mirror_runner::engine::{self, run_engine};
use mirror_runner::input::{self, EnigoDriver, InputController, InputError};
use mirror_runner::logging::SystemLogger;
use mirror_runner::overlay::MatchOverlay;
use mirror_runner::vision::templates::TemplateLibrary;
use mirror_runner::vision::{ColorMode, ScreenSource, TemplateVision, Vision, VisionError, XcapScreen};
use mirror_runner::{Bot, BotParts};

const MONITOR_INTERVAL: Duration = Duration::from_secs(2);
const INTERRUPTED: i32 = 130;

#[derive(Parser)]
#[command(name = "run_engine")]
#[command(version)]
#[command(about = "Mirror Dungeon run engine - plays N dungeon runs through the game client")]
#[command(long_about = r#"
Drives the game client on the configured monitor through template matching and
synthetic input. Configuration lives in JSON files under the config directory;
edits to them apply from the next run on.

Examples:
  run_engine 5
  run_engine 3 --debug --log-file logs/today.log
  run_engine 0 --check-assets

Needs a build with `--features computer-use` for a real session.
"#)]
struct Args {
    /// Number of runs
    runs: usize,

    /// Directory holding the JSON configuration documents
    #[arg(long, default_value = "config", env = "MIRROR_CONFIG_DIR")]
    config_dir: PathBuf,

    /// Template bundle root (the directory that contains `pictures/`)
    #[arg(long, default_value = ".", env = "MIRROR_TEMPLATES")]
    templates: PathBuf,

    /// Append-only run log
    #[arg(long, default_value = "logs/run_engine.log")]
    log_file: PathBuf,

    /// Where error screenshots go
    #[arg(long, default_value = "error")]
    error_dir: PathBuf,

    /// Show debug output
    #[arg(long)]
    debug: bool,

    /// JSON log lines instead of text
    #[arg(long)]
    json_logs: bool,

    /// Check that every referenced template exists, then exit
    #[arg(long)]
    check_assets: bool,
}

fn main() {
    let args = Args::parse();

    if let Err(e) = init_logging(&args) {
        print_error(&format!("Logging setup failed: {:#}", e));
        std::process::exit(1);
    }
    install_interrupt_handler();

    if !args.json_logs {
        print_banner();
    }

    match run(&args) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            tracing::error!(error = %format!("{:#}", e), "session aborted");
            print_error(&format!("{:#}", e));
            std::process::exit(1);
        }
    }
}

fn run(args: &Args) -> Result<i32> {
    let library = TemplateLibrary::new(&args.templates);
    if args.check_assets {
        let wanted = engine::required_templates();
        let missing = library.verify(wanted.iter().copied());
        let ok = print_asset_report(wanted.len(), &missing);
        return Ok(if ok { 0 } else { 1 });
    }

    let config = Arc::new(ConfigStore::new(&args.config_dir));
    config
        .preload()
        .with_context(|| format!("Reading config from {}", args.config_dir.display()))?;
    let vars = config.shared_vars().context("Reading gui_config.json")?;
    print_info(&format!("Config: {}", args.config_dir.display()));

    let screen = match XcapScreen::open(vars.game_monitor) {
        Ok(screen) => screen,
        Err(VisionError::FeatureNotCompiled) => {
            print_error("Screen capture is not compiled in");
            print_info("Rebuild with: cargo build --release --features computer-use");
            return Ok(1);
        }
        Err(e) => return Err(e).context("Opening the game monitor"),
    };
    let geo = screen.geometry();
    let origin = screen.origin().offset(vars.x_offset, vars.y_offset);
    print_info(&format!(
        "Monitor {}: {}x{} ({:?})",
        vars.game_monitor,
        geo.width,
        geo.height,
        geo.aspect()
    ));

    let mut template_vision = TemplateVision::new(screen, library);
    if vars.convert_images_to_grayscale {
        template_vision = template_vision.with_default_mode(ColorMode::Gray);
    }
    if vars.debug_image_matches {
        template_vision = template_vision.with_overlay(MatchOverlay::new(origin));
    }
    let vision: Arc<dyn Vision> = Arc::new(template_vision);

    let driver = match EnigoDriver::new() {
        Ok(driver) => driver,
        Err(InputError::FeatureNotCompiled) => {
            print_error("Input synthesis is not compiled in");
            print_info("Rebuild with: cargo build --release --features computer-use");
            return Ok(1);
        }
        Err(e) => return Err(e).context("Starting input driver"),
    };

    let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());
    let gate = Arc::new(Latch::default());
    let events = Arc::new(SystemLogger::new());
    let input = InputController::new(Box::new(driver), geo.bounds(), origin, Arc::clone(&clock))
        .with_gate(Arc::clone(&gate));
    let reachability: Arc<dyn Reachability> = Arc::new(HttpProbe::default());

    let mut monitor = ConnectionMonitor::spawn(
        Arc::clone(&vision),
        Arc::clone(&gate),
        Arc::clone(&events),
        Arc::clone(&clock),
        MONITOR_INTERVAL,
    )
    .context("Starting connection monitor")?;

    let mut bot = Bot::new(BotParts {
        vision,
        input,
        config,
        clock,
        gate,
        events,
        reachability,
        vars,
        seed: None,
    });

    let mut progress = if args.json_logs {
        RunProgress::hidden()
    } else {
        RunProgress::new(args.runs)
    };
    let report = run_engine(&mut bot, args.runs, &args.error_dir, |state| progress.update(state));
    progress.finish();
    monitor.stop();

    if let Err(e) = bot.release() {
        warn!(error = %e, "could not release mouse at exit");
    }

    print_summary(&report.state);
    match &report.fatal {
        None => print_success("Session complete"),
        Some(e) if report.exit_code() == 0 => print_warning(&e.to_string()),
        Some(e) => print_error(&e.to_string()),
    }
    info!(
        done = report.state.runs_done,
        wins = report.state.wins,
        losses = report.state.losses,
        errored = report.state.errored,
        "session summary"
    );
    Ok(report.exit_code())
}

fn init_logging(args: &Args) -> Result<()> {
    let default_level = if args.debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let file = open_log_file(&args.log_file)?;

    let registry = tracing_subscriber::registry().with(filter);
    if args.json_logs {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(Mutex::new(file))
                    .with_ansi(false),
            )
            .try_init()?;
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(Mutex::new(file))
                    .with_ansi(false),
            )
            .try_init()?;
    }
    Ok(())
}

fn open_log_file(path: &Path) -> Result<std::fs::File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Creating log directory {}", parent.display()))?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Opening log file {}", path.display()))
}

/// Ctrl+C: let go of the mouse and leave with 130. Repeated signals are ignored.
fn install_interrupt_handler() {
    let fired = Arc::new(AtomicBool::new(false));
    let result = ctrlc::set_handler(move || {
        if fired.swap(true, Ordering::SeqCst) {
            return;
        }
        eprintln!();
        print_warning("Interrupted, releasing mouse");
        if let Err(e) = input::release_mouse_now() {
            warn!(error = %e, "could not release mouse");
        }
        std::process::exit(INTERRUPTED);
    });
    if let Err(e) = result {
        warn!(error = %e, "Ctrl+C handler not installed");
    }
}
