//! Scripted stage for driving the router without a game.
//!
//! A [`Stage`] is a shared screen model: which templates are visible where,
//! per-pixel luminance, and cues that edit the screen in reaction to input
//! ("clicking `enter` hides the entry screen and shows the squad menu").
//! [`StageVision`] and [`StageInput`] are the two views the engine sees; every
//! input is recorded so tests can assert on what was clicked.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::debug;

use crate::bot::{Bot, BotParts};
use crate::clock::{Clock, ManualClock};
use crate::config::ConfigStore;
use crate::connection::{Latch, Reachability};
use crate::geometry::{Geometry, Point, Rect};
use crate::input::{InputController, InputDriver, InputResult, Key, MouseButton, Press};
use crate::logging::SystemLogger;
use crate::vision::{MatchBox, Query, Vision, VisionError, VisionResult};

const DEFAULT_LUMINANCE: u8 = 128;
const DEFAULT_HALF: i32 = 20;

/// One recorded input, in desktop coordinates.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Move(Point),
    Click(Point),
    Down(Point),
    Up(Point),
    Scroll(Point, i32),
    Key(Key, Press),
}

/// What fires a cue.
#[derive(Debug, Clone, PartialEq)]
pub enum Trigger {
    /// A click landing on a visible box of this template.
    ClickOn(String),
    /// A click landing inside this rectangle.
    ClickIn(Rect),
    /// A key click (press and release).
    Key(Key),
    /// Any scroll.
    Scroll,
    /// This template probed at least this many times.
    Probed(String, usize),
}

/// Change applied to the screen when a cue fires.
#[derive(Debug, Clone, PartialEq)]
pub enum Edit {
    Show(String, Rect),
    Hide(String),
    Luminance(Point, u8),
}

impl Edit {
    pub fn show(template: &str, at: Point) -> Self {
        Edit::Show(template.to_string(), Rect::around(at, DEFAULT_HALF, DEFAULT_HALF))
    }

    pub fn hide(template: &str) -> Self {
        Edit::Hide(template.to_string())
    }
}

struct Cue {
    trigger: Trigger,
    edits: Vec<Edit>,
    repeat: bool,
    fired: bool,
}

struct StageState {
    geometry: Geometry,
    visible: HashMap<String, Vec<Rect>>,
    luminance: HashMap<Point, u8>,
    missing: HashSet<String>,
    cursor: Point,
    actions: Vec<Action>,
    probes: HashMap<String, usize>,
    snapshots: Vec<PathBuf>,
    cues: Vec<Cue>,
}

impl StageState {
    fn apply(&mut self, edits: &[Edit]) {
        for edit in edits {
            match edit {
                Edit::Show(t, r) => self.visible.entry(t.clone()).or_default().push(*r),
                Edit::Hide(t) => {
                    self.visible.remove(t);
                }
                Edit::Luminance(p, v) => {
                    self.luminance.insert(*p, *v);
                }
            }
        }
    }

    fn fire(&mut self, hit: impl Fn(&Trigger, &StageState) -> bool) {
        let mut pending = Vec::new();
        for (i, cue) in self.cues.iter().enumerate() {
            if (cue.repeat || !cue.fired) && hit(&cue.trigger, self) {
                pending.push(i);
            }
        }
        for i in pending {
            self.cues[i].fired = true;
            let edits = self.cues[i].edits.clone();
            debug!(trigger = ?self.cues[i].trigger, "stage cue");
            self.apply(&edits);
        }
    }

    fn clicked(&mut self, at: Point) {
        self.fire(|trigger, state| match trigger {
            Trigger::ClickOn(t) => state
                .visible
                .get(t)
                .is_some_and(|boxes| boxes.iter().any(|r| r.contains(at))),
            Trigger::ClickIn(r) => r.contains(at),
            _ => false,
        });
    }
}

/// Shared scripted screen.
#[derive(Clone)]
pub struct Stage {
    state: Arc<Mutex<StageState>>,
}

impl Stage {
    pub fn new(geometry: Geometry) -> Self {
        Self {
            state: Arc::new(Mutex::new(StageState {
                geometry,
                visible: HashMap::new(),
                luminance: HashMap::new(),
                missing: HashSet::new(),
                cursor: Point::default(),
                actions: Vec::new(),
                probes: HashMap::new(),
                snapshots: Vec::new(),
                cues: Vec::new(),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, StageState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn geometry(&self) -> Geometry {
        self.lock().geometry
    }

    // ========== Scripting ==========

    /// Show `template` as a 40x40 box centered on `at`.
    pub fn show(&self, template: &str, at: Point) -> &Self {
        self.show_rect(template, Rect::around(at, DEFAULT_HALF, DEFAULT_HALF))
    }

    pub fn show_rect(&self, template: &str, rect: Rect) -> &Self {
        self.lock().apply(&[Edit::Show(template.to_string(), rect)]);
        self
    }

    pub fn hide(&self, template: &str) -> &Self {
        self.lock().apply(&[Edit::hide(template)]);
        self
    }

    pub fn set_luminance(&self, at: Point, value: u8) -> &Self {
        self.lock().luminance.insert(at, value);
        self
    }

    /// Pretend `template` is absent from the bundle.
    pub fn remove_template(&self, template: &str) -> &Self {
        self.lock().missing.insert(template.to_string());
        self
    }

    /// Apply `edits` the first time `trigger` happens.
    pub fn once(&self, trigger: Trigger, edits: Vec<Edit>) -> &Self {
        self.push_cue(trigger, edits, false)
    }

    /// Apply `edits` every time `trigger` happens.
    pub fn always(&self, trigger: Trigger, edits: Vec<Edit>) -> &Self {
        self.push_cue(trigger, edits, true)
    }

    fn push_cue(&self, trigger: Trigger, edits: Vec<Edit>, repeat: bool) -> &Self {
        self.lock().cues.push(Cue {
            trigger,
            edits,
            repeat,
            fired: false,
        });
        self
    }

    // ========== Inspection ==========

    pub fn is_visible(&self, template: &str) -> bool {
        self.lock().visible.get(template).is_some_and(|b| !b.is_empty())
    }

    pub fn actions(&self) -> Vec<Action> {
        self.lock().actions.clone()
    }

    pub fn clicks(&self) -> Vec<Point> {
        self.actions()
            .into_iter()
            .filter_map(|a| match a {
                Action::Click(p) => Some(p),
                _ => None,
            })
            .collect()
    }

    /// Clicks that landed inside `rect`.
    pub fn clicks_in(&self, rect: Rect) -> usize {
        self.clicks().into_iter().filter(|p| rect.contains(*p)).count()
    }

    pub fn keys(&self) -> Vec<Key> {
        self.actions()
            .into_iter()
            .filter_map(|a| match a {
                Action::Key(k, Press::Click) => Some(k),
                _ => None,
            })
            .collect()
    }

    pub fn probes(&self, template: &str) -> usize {
        self.lock().probes.get(template).copied().unwrap_or(0)
    }

    pub fn snapshots(&self) -> Vec<PathBuf> {
        self.lock().snapshots.clone()
    }

    pub fn clear_actions(&self) {
        self.lock().actions.clear();
    }

    // ========== Views ==========

    pub fn vision(&self) -> StageVision {
        StageVision { stage: self.clone() }
    }

    pub fn input(&self) -> StageInput {
        StageInput { stage: self.clone() }
    }

    /// A bot wired to this stage with a virtual clock and a set gate.
    pub fn bot(&self, config: Arc<ConfigStore>) -> Bot {
        self.bot_with(config, Arc::new(Latch::new(true)), Arc::new(Unreachable))
    }

    pub fn bot_with(&self, config: Arc<ConfigStore>, gate: Arc<Latch>, reachability: Arc<dyn Reachability>) -> Bot {
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::new());
        let input = InputController::new(
            Box::new(self.input()),
            self.geometry().bounds(),
            Point::default(),
            Arc::clone(&clock),
        )
        .with_gate(Arc::clone(&gate));
        let vars = config.shared_vars().unwrap_or_default();
        Bot::new(BotParts {
            vision: Arc::new(self.vision()),
            input,
            config,
            clock,
            gate,
            events: Arc::new(SystemLogger::new()),
            reachability,
            vars,
            seed: Some(7),
        })
    }
}

/// Reachability stub that always says no.
pub struct Unreachable;

impl Reachability for Unreachable {
    fn reachable(&self) -> bool {
        false
    }
}

/// Reachability stub that always says yes.
pub struct Reachable;

impl Reachability for Reachable {
    fn reachable(&self) -> bool {
        true
    }
}

pub struct StageVision {
    stage: Stage,
}

impl Vision for StageVision {
    fn geometry(&self) -> Geometry {
        self.stage.geometry()
    }

    fn locate(&self, query: &Query) -> VisionResult<Vec<MatchBox>> {
        let mut state = self.stage.lock();
        if state.missing.contains(&query.template) {
            return Err(VisionError::MissingTemplate(query.template.clone()));
        }

        let count = {
            let n = state.probes.entry(query.template.clone()).or_insert(0);
            *n += 1;
            *n
        };
        let template = query.template.clone();
        state.fire(|trigger, _| matches!(trigger, Trigger::Probed(t, n) if *t == template && count >= *n));

        let mut boxes: Vec<MatchBox> = state
            .visible
            .get(&query.template)
            .map(|rects| {
                rects
                    .iter()
                    .filter(|r| query.region.map_or(true, |region| region.contains(r.center())))
                    .map(|&rect| MatchBox { rect, score: 1.0 })
                    .collect()
            })
            .unwrap_or_default();
        boxes.sort_by_key(|b| (b.rect.top, b.rect.left));
        Ok(boxes)
    }

    fn luminance(&self, at: Point) -> VisionResult<u8> {
        Ok(self
            .stage
            .lock()
            .luminance
            .get(&at)
            .copied()
            .unwrap_or(DEFAULT_LUMINANCE))
    }

    fn has_template(&self, template: &str) -> bool {
        !self.stage.lock().missing.contains(template)
    }

    fn snapshot(&self, path: &Path) -> VisionResult<()> {
        self.stage.lock().snapshots.push(path.to_path_buf());
        Ok(())
    }
}

pub struct StageInput {
    stage: Stage,
}

impl InputDriver for StageInput {
    fn move_to(&mut self, at: Point) -> InputResult<()> {
        let mut state = self.stage.lock();
        state.cursor = at;
        state.actions.push(Action::Move(at));
        Ok(())
    }

    fn button(&mut self, _button: MouseButton, press: Press) -> InputResult<()> {
        let mut state = self.stage.lock();
        let at = state.cursor;
        match press {
            Press::Click => {
                state.actions.push(Action::Click(at));
                state.clicked(at);
            }
            Press::Down => state.actions.push(Action::Down(at)),
            Press::Up => state.actions.push(Action::Up(at)),
        }
        Ok(())
    }

    fn scroll(&mut self, steps: i32) -> InputResult<()> {
        let mut state = self.stage.lock();
        let at = state.cursor;
        state.actions.push(Action::Scroll(at, steps));
        state.fire(|trigger, _| matches!(trigger, Trigger::Scroll));
        Ok(())
    }

    fn key(&mut self, key: Key, press: Press) -> InputResult<()> {
        let mut state = self.stage.lock();
        state.actions.push(Action::Key(key, press));
        if press == Press::Click {
            state.fire(|trigger, _| matches!(trigger, Trigger::Key(k) if *k == key));
        }
        Ok(())
    }
}
