//! Proximity tests over match points and boxes.

use crate::geometry::{Point, Rect};

/// Euclidean proximity, strictly closer than `threshold`.
pub fn is_near(a: Point, b: Point, threshold: f64) -> bool {
    a.distance(b) < threshold
}

/// Same column within `tx` and same row within `ty`.
pub fn is_near_xy(a: Point, b: Point, tx: i32, ty: i32) -> bool {
    (a.x - b.x).abs() < tx && (a.y - b.y).abs() < ty
}

/// Append the points of `more` that are not already represented in `seen`.
pub fn merge_unique(seen: &mut Vec<Point>, more: impl IntoIterator<Item = Point>, tx: i32, ty: i32) {
    for p in more {
        if !seen.iter().any(|&s| is_near_xy(s, p, tx, ty)) {
            seen.push(p);
        }
    }
}

/// Growth applied to a box before a containment test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Expand {
    pub left: i32,
    pub right: i32,
    pub above: i32,
    pub below: i32,
}

impl Expand {
    pub const NONE: Expand = Expand { left: 0, right: 0, above: 0, below: 0 };

    pub fn apply(&self, rect: Rect) -> Rect {
        Rect::new(
            rect.left - self.left,
            rect.top - self.above,
            rect.right + self.right,
            rect.bottom + self.below,
        )
    }
}

pub fn inside_expanded(p: Point, rect: Rect, expand: Expand) -> bool {
    expand.apply(rect).contains(p)
}

/// Points not covered by any of `masks` (each grown by `expand`).
pub fn outside_all(points: Vec<Point>, masks: &[Rect], expand: Expand) -> Vec<Point> {
    points
        .into_iter()
        .filter(|&p| !masks.iter().any(|&m| inside_expanded(p, m, expand)))
        .collect()
}

/// Drop candidates sharing a column (within `radius_x`) with an owned marker.
///
/// Only applied while candidates outnumber markers, and never to the point of
/// leaving nothing to pick.
pub fn without_owned(candidates: Vec<Point>, owned: &[Point], radius_x: i32) -> Vec<Point> {
    if owned.is_empty() || candidates.len() <= owned.len() {
        return candidates;
    }
    let kept: Vec<Point> = candidates
        .iter()
        .copied()
        .filter(|c| !owned.iter().any(|o| (o.x - c.x).abs() < radius_x))
        .collect();
    if kept.is_empty() {
        candidates
    } else {
        kept
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_near_is_strict() {
        assert!(is_near(Point::new(0, 0), Point::new(3, 4), 5.1));
        assert!(!is_near(Point::new(0, 0), Point::new(3, 4), 5.0));
    }

    #[test]
    fn test_merge_unique_dedupes_same_row() {
        let mut seen = vec![Point::new(1500, 300), Point::new(1700, 300)];
        merge_unique(&mut seen, [Point::new(1505, 310), Point::new(1500, 700)], 10, 348);
        // (1505, 310) repeats the first row, (1500, 700) is one row further down
        assert_eq!(seen, vec![Point::new(1500, 300), Point::new(1700, 300), Point::new(1500, 700)]);
    }

    #[test]
    fn test_expanded_containment() {
        let rect = Rect::new(100, 100, 150, 150);
        let grow = Expand { left: 100, below: 100, ..Expand::NONE };
        assert!(inside_expanded(Point::new(20, 120), rect, grow));
        assert!(inside_expanded(Point::new(120, 240), rect, grow));
        assert!(!inside_expanded(Point::new(120, 60), rect, grow));
        assert!(!inside_expanded(Point::new(20, 120), rect, Expand::NONE));
    }

    #[test]
    fn test_owned_filter_keeps_something() {
        let owned = [Point::new(400, 200)];
        let packs = vec![Point::new(410, 500), Point::new(900, 500)];
        assert_eq!(without_owned(packs.clone(), &owned, 50), vec![Point::new(900, 500)]);

        // as many markers as candidates: untouched
        assert_eq!(without_owned(vec![Point::new(410, 500)], &owned, 50), vec![Point::new(410, 500)]);

        // everything owned: untouched rather than empty
        let owned = [Point::new(400, 200), Point::new(905, 200)];
        let packs = vec![Point::new(410, 500), Point::new(900, 500), Point::new(420, 520)];
        assert_eq!(without_owned(packs.clone(), &owned, 50), packs);
    }

    #[test]
    fn test_outside_all_masks() {
        let masks = [Rect::new(0, 0, 100, 100)];
        let kept = outside_all(vec![Point::new(50, 50), Point::new(150, 50)], &masks, Expand::NONE);
        assert_eq!(kept, vec![Point::new(150, 50)]);
    }
}
