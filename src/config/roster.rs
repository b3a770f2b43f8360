//! Named things that appear as keys in the config documents.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One of the twelve playable characters, in on-screen grid order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sinner {
    Yisang,
    Faust,
    Donquixote,
    Ryoshu,
    Meursault,
    Honglu,
    Heathcliff,
    Ishmael,
    Rodion,
    Sinclair,
    Outis,
    Gregor,
}

impl Sinner {
    pub const ALL: [Sinner; 12] = [
        Sinner::Yisang,
        Sinner::Faust,
        Sinner::Donquixote,
        Sinner::Ryoshu,
        Sinner::Meursault,
        Sinner::Honglu,
        Sinner::Heathcliff,
        Sinner::Ishmael,
        Sinner::Rodion,
        Sinner::Sinclair,
        Sinner::Outis,
        Sinner::Gregor,
    ];

    /// Position in the 6x2 selection grid.
    pub fn index(self) -> usize {
        self as usize
    }
}

/// Grace-of-stars choices, in on-screen order (two rows of five).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Grace {
    #[serde(rename = "cost")]
    Cost,
    #[serde(rename = "gift")]
    Gift,
    #[serde(rename = "stats")]
    Stats,
    #[serde(rename = "levels")]
    Levels,
    #[serde(rename = "themes")]
    Themes,
    #[serde(rename = "cost+gift")]
    CostGift,
    #[serde(rename = "generalist")]
    Generalist,
    #[serde(rename = "shop")]
    Shop,
    #[serde(rename = "resources")]
    Resources,
    #[serde(rename = "starlight")]
    Starlight,
}

impl Grace {
    pub fn index(self) -> usize {
        self as usize
    }
}

/// Floor 1..=5 of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Floor(u8);

impl Floor {
    pub const FIRST: Floor = Floor(1);
    pub const LAST: Floor = Floor(5);

    pub fn new(n: u8) -> Option<Self> {
        (1..=5).contains(&n).then_some(Floor(n))
    }

    pub fn number(self) -> u8 {
        self.0
    }

    /// Key used by the pack documents: `floor1` .. `floor5`.
    pub fn key(self) -> String {
        format!("floor{}", self.0)
    }

    pub fn is_last(self) -> bool {
        self == Floor::LAST
    }
}

impl fmt::Display for Floor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "floor {}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_floor_bounds() {
        assert!(Floor::new(0).is_none());
        assert!(Floor::new(6).is_none());
        assert_eq!(Floor::new(3).unwrap().key(), "floor3");
        assert!(Floor::new(5).unwrap().is_last());
    }

    #[test]
    fn test_grace_names() {
        let g: Grace = serde_json::from_str("\"cost+gift\"").unwrap();
        assert_eq!(g, Grace::CostGift);
        assert_eq!(Grace::Starlight.index(), 9);
    }

    #[test]
    fn test_sinner_grid_order() {
        let s: Sinner = serde_json::from_str("\"honglu\"").unwrap();
        assert_eq!(s.index(), 5);
        assert_eq!(Sinner::Gregor.index(), 11);
    }
}
