//! The engine's hands and eyes.
//!
//! [`Bot`] bundles vision, input, config and the clock, and offers the small
//! vocabulary every handler is written in: find, exists, click the match,
//! wait for something to appear, press a key, pause.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use once_cell::sync::OnceCell;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::{debug, trace};

use crate::assets::mirror;
use crate::clock::Clock;
use crate::config::{ConfigStore, SharedVars};
use crate::connection::{Latch, Reachability};
use crate::error::EngineResult;
use crate::geometry::{Geometry, Point, Rect};
use crate::input::{InputController, Key};
use crate::layout::Layout;
use crate::logging::SystemLogger;
use crate::vision::{Area, MatchBox, Query, Vision};

const POLL: Duration = Duration::from_millis(250);
const SLOW_PC_PAUSE: f64 = 0.5;

/// Router steps per run before the run is declared stuck.
pub const DEFAULT_MAX_STEPS: usize = 5_000;

pub struct Bot {
    pub vision: Arc<dyn Vision>,
    pub input: InputController,
    pub config: Arc<ConfigStore>,
    pub clock: Arc<dyn Clock>,
    pub gate: Arc<Latch>,
    pub events: Arc<SystemLogger>,
    pub reachability: Arc<dyn Reachability>,
    pub max_steps: usize,
    vars: SharedVars,
    layout: OnceCell<Layout>,
    rng: Mutex<StdRng>,
}

/// Everything a [`Bot`] is built from.
pub struct BotParts {
    pub vision: Arc<dyn Vision>,
    pub input: InputController,
    pub config: Arc<ConfigStore>,
    pub clock: Arc<dyn Clock>,
    pub gate: Arc<Latch>,
    pub events: Arc<SystemLogger>,
    pub reachability: Arc<dyn Reachability>,
    pub vars: SharedVars,
    pub seed: Option<u64>,
}

impl Bot {
    pub fn new(parts: BotParts) -> Self {
        let rng = match parts.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            vision: parts.vision,
            input: parts.input,
            config: parts.config,
            clock: parts.clock,
            gate: parts.gate,
            events: parts.events,
            reachability: parts.reachability,
            max_steps: DEFAULT_MAX_STEPS,
            vars: parts.vars,
            layout: OnceCell::new(),
            rng: Mutex::new(rng),
        }
    }

    pub fn geo(&self) -> Geometry {
        self.vision.geometry()
    }

    /// Fixed targets, computed on first use.
    pub fn layout(&self) -> &Layout {
        self.layout.get_or_init(|| Layout::compute(self.geo()))
    }

    pub fn vars(&self) -> &SharedVars {
        &self.vars
    }

    /// Re-read `SharedVars`; flags may change between runs.
    pub fn refresh_vars(&mut self) -> EngineResult<()> {
        self.vars = self.config.shared_vars()?;
        Ok(())
    }

    pub fn now(&self) -> Duration {
        self.clock.now()
    }

    pub fn sleep(&self, secs: f64) {
        self.clock.sleep_secs(secs);
    }

    /// Short settle delay, skipped on fast machines.
    pub fn pause(&self) {
        if !self.vars.good_pc_mode {
            self.sleep(SLOW_PC_PAUSE);
        }
    }

    // ========== Looking ==========

    pub fn boxes(&self, query: impl Into<Query>) -> EngineResult<Vec<MatchBox>> {
        Ok(self.vision.locate(&query.into())?)
    }

    pub fn find(&self, query: impl Into<Query>) -> EngineResult<Vec<Point>> {
        self.find_area(query, Area::Center)
    }

    pub fn find_area(&self, query: impl Into<Query>, area: Area) -> EngineResult<Vec<Point>> {
        Ok(self.vision.find(&query.into(), area)?)
    }

    pub fn exists(&self, query: impl Into<Query>) -> EngineResult<bool> {
        Ok(self.vision.exists(&query.into())?)
    }

    /// First of `templates` currently visible.
    pub fn first_visible<'t>(&self, templates: &[&'t str]) -> EngineResult<Option<&'t str>> {
        for &t in templates {
            if self.exists(t)? {
                return Ok(Some(t));
            }
        }
        Ok(None)
    }

    pub fn luminance(&self, at: Point) -> EngineResult<u8> {
        Ok(self.vision.luminance(at)?)
    }

    /// Poll until `query` is visible. `false` on timeout.
    pub fn wait_for(&self, query: impl Into<Query>, timeout: Duration) -> EngineResult<bool> {
        let query = query.into();
        let deadline = self.now() + timeout;
        loop {
            if self.vision.exists(&query)? {
                return Ok(true);
            }
            if self.now() >= deadline {
                debug!(template = %query.template, ?timeout, "gave up waiting");
                return Ok(false);
            }
            self.clock.sleep(POLL);
        }
    }

    /// Poll until `query` is gone. `false` on timeout.
    pub fn wait_gone(&self, query: impl Into<Query>, timeout: Duration) -> EngineResult<bool> {
        let query = query.into();
        let deadline = self.now() + timeout;
        loop {
            if !self.vision.exists(&query)? {
                return Ok(true);
            }
            if self.now() >= deadline {
                return Ok(false);
            }
            self.clock.sleep(POLL);
        }
    }

    /// Poll until any of `templates` shows; index of the first one seen.
    pub fn wait_any(&self, templates: &[&str], timeout: Duration) -> EngineResult<Option<usize>> {
        let deadline = self.now() + timeout;
        loop {
            for (i, &t) in templates.iter().enumerate() {
                if self.exists(t)? {
                    return Ok(Some(i));
                }
            }
            if self.now() >= deadline {
                return Ok(None);
            }
            self.clock.sleep(POLL);
        }
    }

    // ========== Acting ==========

    pub fn click(&self, at: Point) -> EngineResult<()> {
        Ok(self.input.click(at)?)
    }

    pub fn click_1440(&self, x: i32, y: i32) -> EngineResult<()> {
        self.click(self.geo().scale_1440p(x, y))
    }

    pub fn click_1080(&self, x: i32, y: i32) -> EngineResult<()> {
        self.click(self.geo().scale_1080p(x, y))
    }

    /// Click the first hit of `query`; `false` when nothing matched.
    pub fn click_matching(&self, query: impl Into<Query>) -> EngineResult<bool> {
        let query = query.into();
        match self.vision.find(&query, Area::Center)?.first() {
            Some(&p) => {
                trace!(template = %query.template, at = %p, "click match");
                self.click(p)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Keep trying to click `query` until it shows up or `timeout` passes.
    pub fn click_until(&self, query: impl Into<Query>, timeout: Duration) -> EngineResult<bool> {
        let query = query.into();
        let deadline = self.now() + timeout;
        loop {
            if self.click_matching(query.clone())? {
                return Ok(true);
            }
            if self.now() >= deadline {
                debug!(template = %query.template, "never became clickable");
                return Ok(false);
            }
            self.clock.sleep(POLL);
        }
    }

    pub fn press(&self, key: Key) -> EngineResult<()> {
        Ok(self.input.press(key)?)
    }

    pub fn enter(&self) -> EngineResult<()> {
        self.press(Key::Enter)
    }

    pub fn escape(&self) -> EngineResult<()> {
        self.press(Key::Escape)
    }

    pub fn scroll(&self, at: Point, steps: i32) -> EngineResult<()> {
        Ok(self.input.scroll(at, steps)?)
    }

    pub fn drag(&self, from: Point, to: Point) -> EngineResult<()> {
        Ok(self.input.drag(from, to)?)
    }

    pub fn mouse_down(&self, at: Point) -> EngineResult<()> {
        Ok(self.input.mouse_down(at)?)
    }

    pub fn release(&self) -> EngineResult<()> {
        Ok(self.input.release()?)
    }

    /// Click the empty spot at the top of the screen.
    pub fn rest(&self) -> EngineResult<()> {
        self.click(self.layout().safe_rest)
    }

    /// Dismiss "EGO gift get" popups, at most `max`. Returns how many.
    pub fn dismiss_gift_popups(&self, max: usize) -> EngineResult<usize> {
        let mut dismissed = 0;
        while dismissed < max && self.wait_for(mirror::EGO_GIFT_GET, Duration::from_millis(500))? {
            self.enter()?;
            self.sleep(0.5);
            dismissed += 1;
        }
        Ok(dismissed)
    }

    // ========== Choosing ==========

    pub fn pick<T: Copy>(&self, items: &[T]) -> Option<T> {
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        items.choose(&mut *rng).copied()
    }

    /// Points of `query` whose center lies inside `area`.
    pub fn find_within(&self, query: impl Into<Query>, area: Rect) -> EngineResult<Vec<Point>> {
        Ok(self.find(query)?.into_iter().filter(|p| area.contains(*p)).collect())
    }
}
