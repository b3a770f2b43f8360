//! Runtime flags from `gui_config.json` → `SharedVars`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SharedVars {
    pub hard_mode: bool,
    pub skip_ego_check: bool,
    pub skip_ego_fusion: bool,
    pub skip_sinner_healing: bool,
    pub skip_ego_enhancing: bool,
    pub skip_ego_buying: bool,
    pub skip_restshop: bool,
    pub good_pc_mode: bool,
    pub prioritize_list_over_status: bool,
    pub convert_images_to_grayscale: bool,
    pub debug_image_matches: bool,
    pub reconnect_when_internet_reachable: bool,
    /// Seconds between reconnect attempts.
    pub reconnection_delay: f64,
    /// 1-based monitor index.
    pub game_monitor: usize,
    pub x_offset: i32,
    pub y_offset: i32,
}

impl Default for SharedVars {
    fn default() -> Self {
        Self {
            hard_mode: false,
            skip_ego_check: false,
            skip_ego_fusion: false,
            skip_sinner_healing: false,
            skip_ego_enhancing: false,
            skip_ego_buying: false,
            skip_restshop: false,
            good_pc_mode: false,
            prioritize_list_over_status: false,
            convert_images_to_grayscale: false,
            debug_image_matches: false,
            reconnect_when_internet_reachable: false,
            reconnection_delay: 6.0,
            game_monitor: 1,
            x_offset: 0,
            y_offset: 0,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct GuiConfig {
    #[serde(rename = "SharedVars", default)]
    pub shared_vars: SharedVars,
}
