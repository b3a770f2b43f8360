//! Connection supervisor
//!
//! A [`Latch`] gates the router: set means the game is reachable and input may
//! flow, clear means the router is parked. [`ConnectionMonitor`] is the only
//! background thread; it watches for the connection-lost indicator and flips
//! the latch. Reconnecting after a server-error dialog is done in the
//! foreground by the router through [`reconnect`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::assets::general;
use crate::clock::Clock;
use crate::error::{EngineError, EngineResult};
use crate::geometry::Point;
use crate::input::InputController;
use crate::logging::SystemLogger;
use crate::vision::{Area, Query, Vision};

/// Give up on a reconnect after this long.
pub const RECONNECT_CAP: Duration = Duration::from_secs(30 * 60);
const REACHABILITY_BACKOFF: Duration = Duration::from_secs(1);
pub const DEFAULT_PROBE_URL: &str = "https://www.google.com/generate_204";

#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("Still disconnected after {0:?}")]
    ReconnectTimedOut(Duration),

    #[error("Failed to start connection monitor: {0}")]
    MonitorSpawn(String),
}

/// Set/clear readiness flag with blocking waits.
#[derive(Debug)]
pub struct Latch {
    state: Mutex<bool>,
    changed: Condvar,
}

impl Latch {
    pub fn new(set: bool) -> Self {
        Self {
            state: Mutex::new(set),
            changed: Condvar::new(),
        }
    }

    pub fn set(&self) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        *state = true;
        self.changed.notify_all();
    }

    pub fn clear(&self) {
        *self.state.lock().unwrap_or_else(|e| e.into_inner()) = false;
    }

    pub fn is_set(&self) -> bool {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Block until set. No timeout.
    pub fn wait(&self) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        while !*state {
            state = self.changed.wait(state).unwrap_or_else(|e| e.into_inner());
        }
    }
}

impl Default for Latch {
    fn default() -> Self {
        Self::new(true)
    }
}

/// Background watcher for the connection-lost indicator.
pub struct ConnectionMonitor {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl ConnectionMonitor {
    pub fn spawn(
        vision: Arc<dyn Vision>,
        gate: Arc<Latch>,
        events: Arc<SystemLogger>,
        clock: Arc<dyn Clock>,
        interval: Duration,
    ) -> Result<Self, ConnectionError> {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);

        let handle = std::thread::Builder::new()
            .name("connection-monitor".into())
            .spawn(move || {
                let lost = Query::new(general::CONNECTION_LOST);
                let mut paused = false;
                let mut warned = false;
                while !stop_flag.load(Ordering::SeqCst) {
                    match vision.exists(&lost) {
                        Ok(true) if !paused => {
                            gate.clear();
                            paused = true;
                            events.connection_lost();
                        }
                        Ok(false) if paused => {
                            gate.set();
                            paused = false;
                            events.connection_restored();
                        }
                        Ok(_) => {}
                        Err(e) if !warned => {
                            warn!(error = %e, "connection monitor probe failed");
                            warned = true;
                        }
                        Err(e) => debug!(error = %e, "connection monitor probe failed"),
                    }
                    clock.sleep(interval);
                }
            })
            .map_err(|e| ConnectionError::MonitorSpawn(e.to_string()))?;

        Ok(Self {
            stop,
            handle: Some(handle),
        })
    }

    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for ConnectionMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Whether the outside world answers.
pub trait Reachability: Send + Sync {
    fn reachable(&self) -> bool;
}

/// HEAD request against a well-known endpoint.
pub struct HttpProbe {
    client: reqwest::blocking::Client,
    url: String,
}

impl HttpProbe {
    pub fn new(url: impl Into<String>) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap_or_else(|_| reqwest::blocking::Client::new());
        Self {
            client,
            url: url.into(),
        }
    }
}

impl Default for HttpProbe {
    fn default() -> Self {
        Self::new(DEFAULT_PROBE_URL)
    }
}

impl Reachability for HttpProbe {
    fn reachable(&self) -> bool {
        match self.client.head(&self.url).send() {
            Ok(resp) => {
                let ok = resp.status().is_success() || resp.status().is_redirection();
                debug!(url = %self.url, status = %resp.status(), "reachability probe");
                ok
            }
            Err(e) => {
                debug!(url = %self.url, error = %e, "reachability probe failed");
                false
            }
        }
    }
}

/// How to retry after a server error.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReconnectPolicy {
    DelayAndRetry { delay: Duration },
    WhenReachable,
}

impl ReconnectPolicy {
    pub fn from_vars(vars: &crate::config::SharedVars) -> Self {
        if vars.reconnect_when_internet_reachable {
            ReconnectPolicy::WhenReachable
        } else {
            ReconnectPolicy::DelayAndRetry {
                delay: Duration::from_secs_f64(vars.reconnection_delay.max(0.0)),
            }
        }
    }
}

/// What [`reconnect`] needs from the engine.
pub struct ReconnectContext<'a> {
    pub vision: &'a dyn Vision,
    pub input: &'a InputController,
    pub clock: &'a dyn Clock,
    pub events: &'a SystemLogger,
    pub reachability: &'a dyn Reachability,
    pub safe_rest: Point,
}

/// Click retry until neither the server-error dialog nor the connection-lost
/// indicator is visible. Returns the number of retry clicks.
///
/// Runs with the connection gate lifted; the caller owns clearing and setting it.
pub fn reconnect(ctx: &ReconnectContext<'_>, policy: ReconnectPolicy) -> EngineResult<u32> {
    ctx.events.reconnect_start();
    let started = ctx.clock.now();
    let no_op = Query::new(general::NO_OP);
    let server_error = Query::new(general::SERVER_ERROR);
    let lost = Query::new(general::CONNECTION_LOST);
    let retry = Query::new(general::RETRY);

    ctx.input.with_gate_lifted(|| -> EngineResult<u32> {
        let mut attempts = 0u32;
        loop {
            if ctx.vision.exists(&no_op)? {
                if let Some(close) = ctx.vision.find(&Query::new(general::CLOSE), Area::Center)?.first() {
                    ctx.input.click(*close)?;
                }
                ctx.events.not_operable();
                return Err(EngineError::NotOperable);
            }

            if !ctx.vision.exists(&server_error)? && !ctx.vision.exists(&lost)? {
                ctx.events.reconnect_done(attempts);
                return Ok(attempts);
            }

            if ctx.clock.now().saturating_sub(started) > RECONNECT_CAP {
                return Err(ConnectionError::ReconnectTimedOut(RECONNECT_CAP).into());
            }

            match policy {
                ReconnectPolicy::DelayAndRetry { delay } => ctx.clock.sleep(delay),
                ReconnectPolicy::WhenReachable => {
                    if !ctx.reachability.reachable() {
                        debug!("internet unreachable, holding off retry");
                        ctx.clock.sleep(REACHABILITY_BACKOFF);
                        continue;
                    }
                }
            }

            if let Some(button) = ctx.vision.find(&retry, Area::Center)?.first() {
                attempts += 1;
                info!(attempt = attempts, "clicking retry");
                ctx.input.click(*button)?;
            }
            ctx.input.move_to(ctx.safe_rest)?;
            if policy == ReconnectPolicy::WhenReachable {
                ctx.clock.sleep(REACHABILITY_BACKOFF);
            }
        }
    })
}
