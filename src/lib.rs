//! Mirror Runner Library
//!
//! Screen-driven engine for repeated Mirror Dungeon runs: it looks at the game
//! through template matching, decides what screen it is on, and answers with
//! mouse and keyboard input.
//!
//! Platform capture and input are behind the `vision` / `input` features; the
//! scripted [`mock::Stage`] stands in for both in tests.

pub mod assets;
pub mod bot;
pub mod cli;
pub mod clock;
pub mod config;
pub mod connection;
pub mod engine;
pub mod error;
pub mod geometry;
pub mod input;
pub mod layout;
pub mod logging;
pub mod mirror;
pub mod mock;
pub mod overlay;
pub mod status;
pub mod vision;

pub use bot::{Bot, BotParts};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfigStore, SharedVars};
pub use connection::{ConnectionMonitor, HttpProbe, Latch, Reachability};
pub use engine::{run_engine, EngineState, RunOutcome, SessionReport};
pub use error::{EngineError, EngineResult};
pub use geometry::{Geometry, Point, Rect};
pub use input::{InputController, Key};
pub use logging::{EventId, LogLevel, RunEvent, SystemLogger};
pub use status::Status;
pub use vision::{Query, TemplateVision, Vision};
