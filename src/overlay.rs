//! Debug match overlay - outlines template hits on screen
//!
//! Enabled by `debug_image_matches`. Each hit opens a borderless, always-on-top
//! `yad` window over the match box for two seconds. On other platforms the box
//! is only logged.

use std::process::Command;
use std::sync::Mutex;
use std::thread;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::geometry::{Point, Rect};

const FLASH_FOR: Duration = Duration::from_secs(2);
/// Hits closer together than this reuse the previous window.
const MIN_GAP: Duration = Duration::from_millis(250);

pub struct MatchOverlay {
    /// Desktop position of the monitor's top-left corner.
    origin: Point,
    last_flash: Mutex<Option<Instant>>,
    has_yad: bool,
}

impl MatchOverlay {
    pub fn new(origin: Point) -> Self {
        Self {
            origin,
            last_flash: Mutex::new(None),
            has_yad: Self::detect_yad(),
        }
    }

    #[cfg(target_os = "linux")]
    fn detect_yad() -> bool {
        Command::new("which")
            .arg("yad")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    #[cfg(not(target_os = "linux"))]
    fn detect_yad() -> bool {
        false
    }

    pub fn is_drawing(&self) -> bool {
        self.has_yad
    }

    fn throttled(&self) -> bool {
        let mut last = self.last_flash.lock().unwrap_or_else(|e| e.into_inner());
        let now = Instant::now();
        if last.is_some_and(|t| now.duration_since(t) < MIN_GAP) {
            return true;
        }
        *last = Some(now);
        false
    }

    /// Outline `rect` (monitor-local). Fire-and-forget.
    pub fn flash(&self, rect: Rect) {
        debug!(
            left = rect.left,
            top = rect.top,
            right = rect.right,
            bottom = rect.bottom,
            "match box"
        );
        if !self.has_yad || self.throttled() {
            return;
        }

        let geometry = format!(
            "{}x{}+{}+{}",
            rect.width().max(1),
            rect.height().max(1),
            rect.left + self.origin.x,
            rect.top + self.origin.y
        );
        thread::spawn(move || {
            let child = Command::new("yad")
                .args([
                    "--no-buttons",
                    "--undecorated",
                    "--on-top",
                    "--skip-taskbar",
                    "--no-focus",
                    "--geometry",
                    &geometry,
                    "--back",
                    "#ff0000",
                    "--timeout",
                    "3",
                ])
                .env("DISPLAY", std::env::var("DISPLAY").unwrap_or(":0".into()))
                .spawn();
            if let Ok(mut child) = child {
                thread::sleep(FLASH_FOR);
                let _ = child.kill();
                let _ = child.wait();
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_flash_within_gap_is_throttled() {
        let overlay = MatchOverlay::new(Point::default());
        assert!(!overlay.throttled());
        assert!(overlay.throttled());
    }
}
