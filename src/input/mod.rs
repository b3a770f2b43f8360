//! Input Module - Mouse, Keyboard, and Scroll Control
//!
//! The enigo backend requires the `input` feature flag: `--features input`.
//! Without it, [`EnigoDriver::new`] returns [`InputError::FeatureNotCompiled`].
//!
//! Router code talks to [`InputController`], which works in monitor-local
//! coordinates:
//! - every point is clamped to the game monitor before it is sent
//! - the monitor origin and the configured x/y offsets are added last
//! - nothing is sent while the connection gate is closed, unless the caller
//!   is the reconnect path running under [`InputController::with_gate_lifted`]

#[cfg(feature = "input")]
use enigo::{Enigo, Keyboard, Mouse, Settings};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::{debug, trace};

use crate::clock::Clock;
use crate::connection::Latch;
use crate::geometry::{Point, Rect};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

/// Click, or one half of a hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Press {
    Click,
    Down,
    Up,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Enter,
    Escape,
    Space,
    Char(char),
}

/// Input errors
#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("Input feature not compiled. Rebuild with --features input")]
    FeatureNotCompiled,

    #[error("Input initialization failed: {0}")]
    InitError(String),

    #[error("Mouse operation failed: {0}")]
    MouseError(String),

    #[error("Keyboard operation failed: {0}")]
    KeyboardError(String),

    #[error("Scroll operation failed: {0}")]
    ScrollError(String),
}

impl InputError {
    pub fn is_platform(&self) -> bool {
        matches!(self, InputError::FeatureNotCompiled | InputError::InitError(_))
    }
}

pub type InputResult<T> = Result<T, InputError>;

/// Raw event sink in desktop coordinates.
pub trait InputDriver {
    fn move_to(&mut self, at: Point) -> InputResult<()>;

    fn button(&mut self, button: MouseButton, press: Press) -> InputResult<()>;

    /// Positive steps scroll down.
    fn scroll(&mut self, steps: i32) -> InputResult<()>;

    fn key(&mut self, key: Key, press: Press) -> InputResult<()>;
}

/// OS input through enigo.
pub struct EnigoDriver {
    #[cfg(feature = "input")]
    enigo: Enigo,
}

impl EnigoDriver {
    #[cfg(feature = "input")]
    pub fn new() -> InputResult<Self> {
        let enigo = Enigo::new(&Settings::default()).map_err(|e| InputError::InitError(e.to_string()))?;
        Ok(Self { enigo })
    }

    #[cfg(not(feature = "input"))]
    pub fn new() -> InputResult<Self> {
        Err(InputError::FeatureNotCompiled)
    }
}

#[cfg(feature = "input")]
fn direction(press: Press) -> enigo::Direction {
    match press {
        Press::Click => enigo::Direction::Click,
        Press::Down => enigo::Direction::Press,
        Press::Up => enigo::Direction::Release,
    }
}

#[cfg(feature = "input")]
impl InputDriver for EnigoDriver {
    fn move_to(&mut self, at: Point) -> InputResult<()> {
        self.enigo
            .move_mouse(at.x, at.y, enigo::Coordinate::Abs)
            .map_err(|e| InputError::MouseError(e.to_string()))
    }

    fn button(&mut self, button: MouseButton, press: Press) -> InputResult<()> {
        let btn = match button {
            MouseButton::Left => enigo::Button::Left,
            MouseButton::Right => enigo::Button::Right,
            MouseButton::Middle => enigo::Button::Middle,
        };
        self.enigo
            .button(btn, direction(press))
            .map_err(|e| InputError::MouseError(e.to_string()))
    }

    fn scroll(&mut self, steps: i32) -> InputResult<()> {
        self.enigo
            .scroll(steps, enigo::Axis::Vertical)
            .map_err(|e| InputError::ScrollError(e.to_string()))
    }

    fn key(&mut self, key: Key, press: Press) -> InputResult<()> {
        let k = match key {
            Key::Enter => enigo::Key::Return,
            Key::Escape => enigo::Key::Escape,
            Key::Space => enigo::Key::Space,
            Key::Char(c) => enigo::Key::Unicode(c),
        };
        self.enigo
            .key(k, direction(press))
            .map_err(|e| InputError::KeyboardError(e.to_string()))
    }
}

#[cfg(not(feature = "input"))]
impl InputDriver for EnigoDriver {
    fn move_to(&mut self, _at: Point) -> InputResult<()> {
        Err(InputError::FeatureNotCompiled)
    }

    fn button(&mut self, _button: MouseButton, _press: Press) -> InputResult<()> {
        Err(InputError::FeatureNotCompiled)
    }

    fn scroll(&mut self, _steps: i32) -> InputResult<()> {
        Err(InputError::FeatureNotCompiled)
    }

    fn key(&mut self, _key: Key, _press: Press) -> InputResult<()> {
        Err(InputError::FeatureNotCompiled)
    }
}

/// Release the left button through a fresh driver. Used from the Ctrl+C handler.
pub fn release_mouse_now() -> InputResult<()> {
    EnigoDriver::new()?.button(MouseButton::Left, Press::Up)
}

const DRAG_STEPS: i32 = 12;
const DRAG_STEP_DELAY: Duration = Duration::from_millis(15);
const ACTION_DELAY: Duration = Duration::from_millis(30);

/// Monitor-local input on the game monitor.
pub struct InputController {
    driver: Mutex<Box<dyn InputDriver>>,
    bounds: Rect,
    origin: Point,
    gate: Option<Arc<Latch>>,
    gate_lifted: AtomicBool,
    held: AtomicBool,
    clock: Arc<dyn Clock>,
}

impl InputController {
    /// `bounds` is the monitor rectangle in monitor-local space, `origin`
    /// its top-left on the desktop plus any configured offset.
    pub fn new(driver: Box<dyn InputDriver>, bounds: Rect, origin: Point, clock: Arc<dyn Clock>) -> Self {
        Self {
            driver: Mutex::new(driver),
            bounds,
            origin,
            gate: None,
            gate_lifted: AtomicBool::new(false),
            held: AtomicBool::new(false),
            clock,
        }
    }

    pub fn with_gate(mut self, gate: Arc<Latch>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    pub fn is_held(&self) -> bool {
        self.held.load(Ordering::SeqCst)
    }

    /// Run `f` with the connection gate ignored. Reconnect needs to click
    /// while the router is paused.
    pub fn with_gate_lifted<T>(&self, f: impl FnOnce() -> T) -> T {
        let was = self.gate_lifted.swap(true, Ordering::SeqCst);
        let out = f();
        self.gate_lifted.store(was, Ordering::SeqCst);
        out
    }

    fn admit(&self) {
        if self.gate_lifted.load(Ordering::SeqCst) {
            return;
        }
        if let Some(gate) = &self.gate {
            if !gate.is_set() {
                debug!("input paused on connection gate");
                gate.wait();
            }
        }
    }

    fn desktop(&self, p: Point) -> Point {
        let local = self.bounds.clamp(p);
        if local != p {
            trace!(requested = %p, clamped = %local, "point clamped to monitor");
        }
        Point::new(local.x + self.origin.x, local.y + self.origin.y)
    }

    fn with_driver<T>(&self, f: impl FnOnce(&mut dyn InputDriver) -> InputResult<T>) -> InputResult<T> {
        let mut driver = self.driver.lock().unwrap_or_else(|e| e.into_inner());
        f(driver.as_mut())
    }

    // ========== Mouse Operations ==========

    pub fn move_to(&self, p: Point) -> InputResult<()> {
        self.admit();
        let at = self.desktop(p);
        self.with_driver(|d| d.move_to(at))
    }

    pub fn click(&self, p: Point) -> InputResult<()> {
        self.admit();
        let at = self.desktop(p);
        debug!(at = %p, "click");
        self.with_driver(|d| {
            d.move_to(at)?;
            d.button(MouseButton::Left, Press::Click)
        })?;
        self.clock.sleep(ACTION_DELAY);
        Ok(())
    }

    /// Press and hold the left button at `p`.
    pub fn mouse_down(&self, p: Point) -> InputResult<()> {
        self.admit();
        let at = self.desktop(p);
        self.with_driver(|d| {
            d.move_to(at)?;
            d.button(MouseButton::Left, Press::Down)
        })?;
        self.held.store(true, Ordering::SeqCst);
        Ok(())
    }

    pub fn mouse_up(&self) -> InputResult<()> {
        self.admit();
        self.with_driver(|d| d.button(MouseButton::Left, Press::Up))?;
        self.held.store(false, Ordering::SeqCst);
        Ok(())
    }

    /// Let go of a held button. Never waits on the gate.
    pub fn release(&self) -> InputResult<()> {
        if self.held.swap(false, Ordering::SeqCst) {
            debug!("releasing held mouse button");
            self.with_driver(|d| d.button(MouseButton::Left, Press::Up))?;
        }
        Ok(())
    }

    pub fn drag(&self, from: Point, to: Point) -> InputResult<()> {
        self.mouse_down(from)?;
        self.clock.sleep(DRAG_STEP_DELAY);
        for step in 1..=DRAG_STEPS {
            let p = Point::new(
                from.x + (to.x - from.x) * step / DRAG_STEPS,
                from.y + (to.y - from.y) * step / DRAG_STEPS,
            );
            self.move_to(p)?;
            self.clock.sleep(DRAG_STEP_DELAY);
        }
        self.mouse_up()?;
        debug!(from = %from, to = %to, "drag");
        Ok(())
    }

    /// Scroll at `at`; positive steps scroll down.
    pub fn scroll(&self, at: Point, steps: i32) -> InputResult<()> {
        self.admit();
        let at = self.desktop(at);
        self.with_driver(|d| {
            d.move_to(at)?;
            d.scroll(steps)
        })?;
        self.clock.sleep(ACTION_DELAY);
        Ok(())
    }

    // ========== Keyboard Operations ==========

    pub fn press(&self, key: Key) -> InputResult<()> {
        self.admit();
        debug!(?key, "key");
        self.with_driver(|d| d.key(key, Press::Click))?;
        self.clock.sleep(ACTION_DELAY);
        Ok(())
    }

    pub fn key_down(&self, key: Key) -> InputResult<()> {
        self.admit();
        self.with_driver(|d| d.key(key, Press::Down))
    }

    pub fn key_up(&self, key: Key) -> InputResult<()> {
        self.admit();
        self.with_driver(|d| d.key(key, Press::Up))
    }
}
