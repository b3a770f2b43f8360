//! Reference-space geometry
//!
//! Every click target and template is authored once at a reference resolution:
//! 2560x1440 for the legacy assets and 1920x1080 for everything under
//! `CustomAdded1080p`. The router never holds raw pixel coordinates; it asks
//! [`Geometry`] to scale a reference point to the live monitor.

use std::fmt;

/// A monitor-local pixel coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    pub fn distance(self, other: Point) -> f64 {
        let dx = (self.x - other.x) as f64;
        let dy = (self.y - other.y) as f64;
        (dx * dx + dy * dy).sqrt()
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Axis-aligned rectangle, `left`/`top` inclusive and `right`/`bottom` exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Rect {
    pub const fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self { left, top, right, bottom }
    }

    pub fn from_size(left: i32, top: i32, width: u32, height: u32) -> Self {
        Self::new(left, top, left + width as i32, top + height as i32)
    }

    /// Square of side `2 * half` centered on `center`.
    pub fn around(center: Point, half_width: i32, half_height: i32) -> Self {
        Self::new(
            center.x - half_width,
            center.y - half_height,
            center.x + half_width,
            center.y + half_height,
        )
    }

    pub fn width(&self) -> i32 {
        (self.right - self.left).max(0)
    }

    pub fn height(&self) -> i32 {
        (self.bottom - self.top).max(0)
    }

    pub fn area(&self) -> i64 {
        self.width() as i64 * self.height() as i64
    }

    pub fn center(&self) -> Point {
        Point::new(self.left + self.width() / 2, self.top + self.height() / 2)
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.left && p.x < self.right && p.y >= self.top && p.y < self.bottom
    }

    pub fn translate(&self, dx: i32, dy: i32) -> Self {
        Self::new(self.left + dx, self.top + dy, self.right + dx, self.bottom + dy)
    }

    pub fn intersect(&self, other: &Rect) -> Option<Rect> {
        let r = Rect::new(
            self.left.max(other.left),
            self.top.max(other.top),
            self.right.min(other.right),
            self.bottom.min(other.bottom),
        );
        (r.width() > 0 && r.height() > 0).then_some(r)
    }

    /// Intersection over union.
    pub fn iou(&self, other: &Rect) -> f32 {
        let inter = self.intersect(other).map(|r| r.area()).unwrap_or(0);
        let union = self.area() + other.area() - inter;
        if union <= 0 {
            return 0.0;
        }
        inter as f32 / union as f32
    }

    /// Clamp `p` into the rectangle (right/bottom edge pulled in by one pixel).
    pub fn clamp(&self, p: Point) -> Point {
        Point::new(
            p.x.clamp(self.left, (self.right - 1).max(self.left)),
            p.y.clamp(self.top, (self.bottom - 1).max(self.top)),
        )
    }
}

/// Resolution a template or coordinate was authored at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Reference {
    P1080,
    P1440,
}

impl Reference {
    pub const fn size(self) -> (u32, u32) {
        match self {
            Reference::P1080 => (1920, 1080),
            Reference::P1440 => (2560, 1440),
        }
    }
}

/// Supported aspect ratios. Navigation anchors differ per ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AspectRatio {
    FourThree,
    SixteenNine,
    SixteenTen,
    Other,
}

impl AspectRatio {
    pub fn classify(width: u32, height: u32) -> Self {
        if height == 0 {
            return AspectRatio::Other;
        }
        let ratio = width as f64 / height as f64;
        let close = |target: f64| (ratio - target).abs() < 0.02;
        if close(16.0 / 9.0) {
            AspectRatio::SixteenNine
        } else if close(16.0 / 10.0) {
            AspectRatio::SixteenTen
        } else if close(4.0 / 3.0) {
            AspectRatio::FourThree
        } else {
            AspectRatio::Other
        }
    }
}

/// The live monitor's resolution and every scaling rule derived from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Geometry {
    pub width: u32,
    pub height: u32,
}

impl Geometry {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn bounds(&self) -> Rect {
        Rect::from_size(0, 0, self.width, self.height)
    }

    pub fn aspect(&self) -> AspectRatio {
        AspectRatio::classify(self.width, self.height)
    }

    fn factors(&self, reference: Reference) -> (f64, f64) {
        let (rw, rh) = reference.size();
        (self.width as f64 / rw as f64, self.height as f64 / rh as f64)
    }

    /// Axis-independent x scale (stretches across 4:3 / 16:9 / 16:10).
    pub fn scale_x(&self, reference: Reference, x: i32) -> i32 {
        (x as f64 * self.factors(reference).0).round() as i32
    }

    /// Axis-independent y scale.
    pub fn scale_y(&self, reference: Reference, y: i32) -> i32 {
        (y as f64 * self.factors(reference).1).round() as i32
    }

    pub fn scale(&self, reference: Reference, x: i32, y: i32) -> Point {
        Point::new(self.scale_x(reference, x), self.scale_y(reference, y))
    }

    pub fn scale_1080p(&self, x: i32, y: i32) -> Point {
        self.scale(Reference::P1080, x, y)
    }

    pub fn scale_1440p(&self, x: i32, y: i32) -> Point {
        self.scale(Reference::P1440, x, y)
    }

    pub fn rect_1080p(&self, left: i32, top: i32, right: i32, bottom: i32) -> Rect {
        let a = self.scale_1080p(left, top);
        let b = self.scale_1080p(right, bottom);
        Rect::new(a.x, a.y, b.x, b.y)
    }

    pub fn rect_1440p(&self, left: i32, top: i32, right: i32, bottom: i32) -> Rect {
        let a = self.scale_1440p(left, top);
        let b = self.scale_1440p(right, bottom);
        Rect::new(a.x, a.y, b.x, b.y)
    }

    /// Aspect-preserving factor used for template resizing.
    pub fn uniform_factor(&self, reference: Reference) -> f64 {
        let (fx, fy) = self.factors(reference);
        fx.min(fy)
    }

    pub fn uniform_scale(&self, reference: Reference, x: i32, y: i32) -> Point {
        let s = self.uniform_factor(reference);
        Point::new((x as f64 * s).round() as i32, (y as f64 * s).round() as i32)
    }

    /// Inverse of [`Geometry::scale`], back to reference space.
    pub fn unscale(&self, reference: Reference, p: Point) -> (i32, i32) {
        let (fx, fy) = self.factors(reference);
        ((p.x as f64 / fx).round() as i32, (p.y as f64 / fy).round() as i32)
    }
}
