//! Vision Module - Screen Capture and Template Matching
//!
//! The capture backend requires the `vision` feature flag: `--features vision`.
//! Without it, [`XcapScreen`] returns [`VisionError::FeatureNotCompiled`] and the
//! router can only run against the scripted [`crate::mock`] stage.
//!
//! Every recognition in the engine is a template lookup: the router asks a
//! [`Vision`] implementation for the boxes of a [`Query`] and derives click
//! points from them. Coordinates are monitor-local.

pub mod matcher;
pub mod proximity;
pub mod templates;

use std::path::Path;
use std::sync::Arc;

use image::RgbaImage;
use tracing::{debug, trace};

#[cfg(feature = "vision")]
use xcap::Monitor;

use crate::geometry::{Geometry, Point, Rect};
use crate::overlay::MatchOverlay;
use templates::TemplateLibrary;

pub const DEFAULT_THRESHOLD: f32 = 0.8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorMode {
    #[default]
    Color,
    Gray,
}

/// Which point of a match box a caller wants back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Area {
    #[default]
    Center,
    Top,
    Bottom,
    Left,
    Right,
}

/// One template lookup. `mode: None` uses the session default.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub template: String,
    pub threshold: f32,
    pub mode: Option<ColorMode>,
    pub region: Option<Rect>,
}

impl Query {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            threshold: DEFAULT_THRESHOLD,
            mode: None,
            region: None,
        }
    }

    pub fn threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn gray(mut self) -> Self {
        self.mode = Some(ColorMode::Gray);
        self
    }

    pub fn color(mut self) -> Self {
        self.mode = Some(ColorMode::Color);
        self
    }

    pub fn region(mut self, region: Rect) -> Self {
        self.region = Some(region);
        self
    }
}

impl From<&str> for Query {
    fn from(template: &str) -> Self {
        Query::new(template)
    }
}

impl From<String> for Query {
    fn from(template: String) -> Self {
        Query::new(template)
    }
}

/// A template hit in monitor-local space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchBox {
    pub rect: Rect,
    pub score: f32,
}

impl MatchBox {
    pub fn center(&self) -> Point {
        self.rect.center()
    }

    pub fn point(&self, area: Area) -> Point {
        let c = self.rect.center();
        match area {
            Area::Center => c,
            Area::Top => Point::new(c.x, self.rect.top),
            Area::Bottom => Point::new(c.x, self.rect.bottom - 1),
            Area::Left => Point::new(self.rect.left, c.y),
            Area::Right => Point::new(self.rect.right - 1, c.y),
        }
    }
}

/// Vision errors
#[derive(Debug, thiserror::Error)]
pub enum VisionError {
    #[error("Vision feature not compiled. Rebuild with --features vision")]
    FeatureNotCompiled,

    #[error("No monitor at index {0}")]
    InvalidMonitor(usize),

    #[error("Screen capture failed: {0}")]
    CaptureError(String),

    #[error("Template not found: {0}")]
    MissingTemplate(String),

    #[error("Template {path} could not be decoded: {reason}")]
    DecodeError { path: String, reason: String },

    #[error("Failed to save frame: {0}")]
    SnapshotError(String),
}

impl VisionError {
    /// The capture backend itself is unusable.
    pub fn is_platform(&self) -> bool {
        matches!(
            self,
            VisionError::FeatureNotCompiled | VisionError::InvalidMonitor(_)
        )
    }
}

pub type VisionResult<T> = Result<T, VisionError>;

/// Screen recognition as seen by the router.
pub trait Vision: Send + Sync {
    fn geometry(&self) -> Geometry;

    /// Every NMS-filtered hit of `query`, in reading order.
    fn locate(&self, query: &Query) -> VisionResult<Vec<MatchBox>>;

    /// Luminance (0-255) of a single monitor-local pixel.
    fn luminance(&self, at: Point) -> VisionResult<u8>;

    fn has_template(&self, template: &str) -> bool;

    /// Write the current frame to `path` as PNG.
    fn snapshot(&self, path: &Path) -> VisionResult<()>;

    fn find(&self, query: &Query, area: Area) -> VisionResult<Vec<Point>> {
        Ok(self.locate(query)?.iter().map(|b| b.point(area)).collect())
    }

    fn exists(&self, query: &Query) -> VisionResult<bool> {
        Ok(!self.locate(query)?.is_empty())
    }
}

impl<V: Vision + ?Sized> Vision for Arc<V> {
    fn geometry(&self) -> Geometry {
        (**self).geometry()
    }

    fn locate(&self, query: &Query) -> VisionResult<Vec<MatchBox>> {
        (**self).locate(query)
    }

    fn luminance(&self, at: Point) -> VisionResult<u8> {
        (**self).luminance(at)
    }

    fn has_template(&self, template: &str) -> bool {
        (**self).has_template(template)
    }

    fn snapshot(&self, path: &Path) -> VisionResult<()> {
        (**self).snapshot(path)
    }
}

/// Source of full-monitor frames.
pub trait ScreenSource: Send + Sync {
    fn geometry(&self) -> Geometry;

    /// Top-left of the monitor in desktop space.
    fn origin(&self) -> Point;

    fn capture(&self) -> VisionResult<RgbaImage>;
}

/// One monitor captured with xcap. `index` is 1-based, as configured.
pub struct XcapScreen {
    index: usize,
    geometry: Geometry,
    origin: Point,
}

impl XcapScreen {
    #[cfg(feature = "vision")]
    pub fn open(index: usize) -> VisionResult<Self> {
        let monitor = Self::monitor(index)?;
        Ok(Self {
            index,
            geometry: Geometry::new(monitor.width(), monitor.height()),
            origin: Point::new(monitor.x(), monitor.y()),
        })
    }

    #[cfg(not(feature = "vision"))]
    pub fn open(_index: usize) -> VisionResult<Self> {
        Err(VisionError::FeatureNotCompiled)
    }

    #[cfg(feature = "vision")]
    fn monitor(index: usize) -> VisionResult<Monitor> {
        let monitors = Monitor::all().map_err(|e| VisionError::CaptureError(e.to_string()))?;
        index
            .checked_sub(1)
            .and_then(|i| monitors.into_iter().nth(i))
            .ok_or(VisionError::InvalidMonitor(index))
    }
}

impl ScreenSource for XcapScreen {
    fn geometry(&self) -> Geometry {
        self.geometry
    }

    fn origin(&self) -> Point {
        self.origin
    }

    #[cfg(feature = "vision")]
    fn capture(&self) -> VisionResult<RgbaImage> {
        let frame = Self::monitor(self.index)?
            .capture_image()
            .map_err(|e| VisionError::CaptureError(e.to_string()))?;
        let (width, height) = (frame.width(), frame.height());
        RgbaImage::from_raw(width, height, frame.into_raw())
            .ok_or_else(|| VisionError::CaptureError("frame buffer size mismatch".into()))
    }

    #[cfg(not(feature = "vision"))]
    fn capture(&self) -> VisionResult<RgbaImage> {
        Err(VisionError::FeatureNotCompiled)
    }
}

/// [`Vision`] backed by a real screen and a template bundle on disk.
pub struct TemplateVision<S> {
    source: S,
    library: TemplateLibrary,
    default_mode: ColorMode,
    overlay: Option<MatchOverlay>,
}

impl<S: ScreenSource> TemplateVision<S> {
    pub fn new(source: S, library: TemplateLibrary) -> Self {
        Self {
            source,
            library,
            default_mode: ColorMode::Color,
            overlay: None,
        }
    }

    pub fn with_default_mode(mut self, mode: ColorMode) -> Self {
        self.default_mode = mode;
        self
    }

    pub fn with_overlay(mut self, overlay: MatchOverlay) -> Self {
        self.overlay = Some(overlay);
        self
    }
}

impl<S: ScreenSource> Vision for TemplateVision<S> {
    fn geometry(&self) -> Geometry {
        self.source.geometry()
    }

    fn locate(&self, query: &Query) -> VisionResult<Vec<MatchBox>> {
        let frame = self.source.capture()?;
        let geometry = Geometry::new(frame.width(), frame.height());
        let prepared = self.library.prepared(&query.template, geometry)?;
        let threshold = prepared.threshold(query.threshold);
        let mode = query.mode.unwrap_or(self.default_mode);

        let mut boxes = match query.region {
            Some(region) => {
                let Some(clip) = region.intersect(&geometry.bounds()) else {
                    return Ok(Vec::new());
                };
                let crop = image::imageops::crop_imm(
                    &frame,
                    clip.left as u32,
                    clip.top as u32,
                    clip.width() as u32,
                    clip.height() as u32,
                )
                .to_image();
                let mut hits = matcher::match_template(&crop, &prepared.image, mode, threshold);
                for hit in &mut hits {
                    hit.rect = hit.rect.translate(clip.left, clip.top);
                }
                hits
            }
            None => matcher::match_template(&frame, &prepared.image, mode, threshold),
        };
        boxes.sort_by_key(|b| (b.rect.top, b.rect.left));

        if boxes.is_empty() {
            trace!(template = %query.template, "no match");
        } else {
            debug!(
                template = %query.template,
                hits = boxes.len(),
                best = boxes.iter().map(|b| b.score).fold(f32::MIN, f32::max),
                "match"
            );
            if let Some(overlay) = &self.overlay {
                for hit in &boxes {
                    overlay.flash(hit.rect);
                }
            }
        }
        Ok(boxes)
    }

    fn luminance(&self, at: Point) -> VisionResult<u8> {
        let frame = self.source.capture()?;
        let p = Rect::from_size(0, 0, frame.width(), frame.height()).clamp(at);
        Ok(matcher::luma(frame.get_pixel(p.x as u32, p.y as u32)).round() as u8)
    }

    fn has_template(&self, template: &str) -> bool {
        self.library.contains(template)
    }

    fn snapshot(&self, path: &Path) -> VisionResult<()> {
        let frame = self.source.capture()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| VisionError::SnapshotError(e.to_string()))?;
        }
        frame
            .save(path)
            .map_err(|e| VisionError::SnapshotError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    struct StillFrame(RgbaImage);

    impl ScreenSource for StillFrame {
        fn geometry(&self) -> Geometry {
            Geometry::new(self.0.width(), self.0.height())
        }

        fn origin(&self) -> Point {
            Point::default()
        }

        fn capture(&self) -> VisionResult<RgbaImage> {
            Ok(self.0.clone())
        }
    }

    fn checker(size: u32) -> RgbaImage {
        RgbaImage::from_fn(size, size, |x, y| {
            let v = if (x / 2 + y / 3) % 2 == 0 { 230 } else { 15 };
            Rgba([v, 255 - v, (x * 19 % 256) as u8, 255])
        })
    }

    /// Frame at 2560x1440 so 1440p-ref templates are used unscaled.
    fn vision_with_glyph_at(x: i64, y: i64) -> (tempfile::TempDir, TemplateVision<StillFrame>) {
        let dir = tempfile::tempdir().unwrap();
        let glyph = checker(16);
        let path = dir.path().join("pictures/mirror");
        std::fs::create_dir_all(&path).unwrap();
        glyph.save(path.join("glyph.png")).unwrap();

        let mut frame = RgbaImage::from_pixel(2560, 1440, Rgba([40, 40, 40, 255]));
        image::imageops::replace(&mut frame, &glyph, x, y);
        let vision = TemplateVision::new(StillFrame(frame), TemplateLibrary::new(dir.path()));
        (dir, vision)
    }

    #[test]
    fn test_region_hits_are_monitor_local() {
        let (_dir, vision) = vision_with_glyph_at(1000, 600);
        let query = Query::new("pictures/mirror/glyph.png").region(Rect::new(900, 500, 1200, 800));
        let hits = vision.locate(&query).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].rect, Rect::from_size(1000, 600, 16, 16));
        assert_eq!(hits[0].point(Area::Top), Point::new(1008, 600));
    }

    #[test]
    fn test_region_outside_glyph_finds_nothing() {
        let (_dir, vision) = vision_with_glyph_at(1000, 600);
        let query = Query::new("pictures/mirror/glyph.png").region(Rect::new(0, 0, 400, 400));
        assert!(!vision.exists(&query).unwrap());
    }

    #[test]
    fn test_missing_template_surfaces() {
        let (_dir, vision) = vision_with_glyph_at(0, 0);
        let err = vision.locate(&Query::new("pictures/none.png")).unwrap_err();
        assert!(matches!(err, VisionError::MissingTemplate(_)));
    }

    #[test]
    fn test_luminance_of_background() {
        let (_dir, vision) = vision_with_glyph_at(0, 0);
        assert_eq!(vision.luminance(Point::new(2000, 1000)).unwrap(), 40);
        // clamped onto the monitor
        assert_eq!(vision.luminance(Point::new(99_999, -5)).unwrap(), 40);
    }
}
