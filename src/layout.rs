//! Fixed click targets, scaled once for the live monitor.

use crate::config::{Grace, Sinner};
use crate::geometry::{Geometry, Point};

const SINNER_COLUMNS: [i32; 6] = [435, 725, 1015, 1305, 1595, 1885];
const SINNER_ROWS: [i32; 2] = [620, 1010];
const GRACE_COLUMNS: [i32; 5] = [490, 885, 1280, 1675, 2070];
const GRACE_ROWS: [i32; 2] = [560, 1000];

#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    pub sinner_cells: [Point; 12],
    pub grace_buttons: [Point; 10],
    pub battle_button: Point,
    /// Empty spot that closes tooltips without triggering anything.
    pub safe_rest: Point,
}

impl Layout {
    pub fn compute(geo: Geometry) -> Self {
        let grid = |cols: &[i32], rows: &[i32], i: usize| {
            geo.scale_1440p(cols[i % cols.len()], rows[i / cols.len()])
        };
        Self {
            sinner_cells: std::array::from_fn(|i| grid(&SINNER_COLUMNS, &SINNER_ROWS, i)),
            grace_buttons: std::array::from_fn(|i| grid(&GRACE_COLUMNS, &GRACE_ROWS, i)),
            battle_button: geo.scale_1440p(2165, 1345),
            safe_rest: geo.scale_1440p(1280, 60),
        }
    }

    pub fn sinner(&self, sinner: Sinner) -> Point {
        self.sinner_cells[sinner.index()]
    }

    pub fn grace(&self, grace: Grace) -> Point {
        self.grace_buttons[grace.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_positions_at_reference() {
        let layout = Layout::compute(Geometry::new(2560, 1440));
        assert_eq!(layout.sinner(Sinner::Yisang), Point::new(435, 620));
        assert_eq!(layout.sinner(Sinner::Heathcliff), Point::new(435, 1010));
        assert_eq!(layout.sinner(Sinner::Gregor), Point::new(1885, 1010));
        assert_eq!(layout.grace(Grace::Themes), Point::new(2070, 560));
        assert_eq!(layout.grace(Grace::CostGift), Point::new(490, 1000));
    }

    #[test]
    fn test_scaled_for_1080p() {
        let layout = Layout::compute(Geometry::new(1920, 1080));
        assert_eq!(layout.battle_button, Point::new(1624, 1009));
    }
}
