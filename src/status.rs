//! Status keywords and the per-status asset table.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Damage/affliction keyword a run is built around.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Burn,
    Bleed,
    Tremor,
    Rupture,
    Sinking,
    Poise,
    Charge,
    Slash,
    Pierce,
    Blunt,
}

impl Status {
    pub const ALL: [Status; 10] = [
        Status::Burn,
        Status::Bleed,
        Status::Tremor,
        Status::Rupture,
        Status::Sinking,
        Status::Poise,
        Status::Charge,
        Status::Slash,
        Status::Pierce,
        Status::Blunt,
    ];

    pub fn name(self) -> &'static str {
        self.assets().name
    }

    pub fn assets(self) -> &'static StatusAssets {
        &STATUS_TABLE[self as usize]
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for Status {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Status::ALL
            .iter()
            .copied()
            .find(|status| status.name() == wanted)
            .ok_or(UnknownStatus(s.to_string()))
    }
}

/// Everything the router needs to know about one status.
#[derive(Debug)]
pub struct StatusAssets {
    pub name: &'static str,
    pub gift: &'static str,
    pub squad: &'static str,
    pub pack: &'static str,
    pub reward: &'static str,
    pub market: &'static str,
    pub enhance: &'static str,
    pub fusion_button: &'static str,
    /// Gift glyph as drawn in the fusion pane.
    pub fusion_gift: &'static str,
    /// 1080p-ref offset from an enhance glyph to a pixel that is dark on empty slots.
    pub enhance_probe: (i32, i32),
}

impl StatusAssets {
    pub fn templates(&self) -> [&'static str; 8] {
        [
            self.gift,
            self.squad,
            self.pack,
            self.reward,
            self.market,
            self.enhance,
            self.fusion_button,
            self.fusion_gift,
        ]
    }
}

/// Enhance glyphs brighter than this at their probe pixel sit on a real gift.
pub const ENHANCE_PROBE_MIN: u8 = 21;
pub const WORDLESS_PROBE: (i32, i32) = (11, -54);
pub const WORDLESS_PROBE_MIN: u8 = 22;

macro_rules! status_assets {
    ($name:literal, $probe:expr) => {
        StatusAssets {
            name: $name,
            gift: concat!("pictures/mirror/gifts/", $name, ".png"),
            squad: concat!("pictures/CustomAdded1080p/mirror/squads/", $name, ".png"),
            pack: concat!("pictures/mirror/packs/status/", $name, ".png"),
            reward: concat!("pictures/mirror/rewards/", $name, ".png"),
            market: concat!("pictures/mirror/restshop/market/", $name, "_market.png"),
            enhance: concat!("pictures/mirror/restshop/enhance/", $name, "_enhance.png"),
            fusion_button: concat!("pictures/CustomAdded1080p/mirror/restshop/fusion/", $name, ".png"),
            fusion_gift: concat!("pictures/mirror/restshop/fusion/", $name, "_gift.png"),
            enhance_probe: $probe,
        }
    };
}

// Indexed by `Status as usize`.
static STATUS_TABLE: [StatusAssets; 10] = [
    status_assets!("burn", (12, -40)),
    status_assets!("bleed", (12, -42)),
    status_assets!("tremor", (13, -41)),
    status_assets!("rupture", (12, -43)),
    status_assets!("sinking", (11, -41)),
    status_assets!("poise", (12, -41)),
    status_assets!("charge", (12, -39)),
    status_assets!("slash", (13, -42)),
    status_assets!("pierce", (12, -40)),
    status_assets!("blunt", (11, -42)),
];
