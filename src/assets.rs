//! Template paths, relative to the bundle root.
//!
//! Paths under `CustomAdded1080p/` are authored at 1920x1080, paths under
//! `CustomFuse/` at the live resolution, everything else at 2560x1440.

pub mod general {
    pub const CONNECTION_LOST: &str = "pictures/general/connection.png";
    pub const SERVER_ERROR: &str = "pictures/general/server_error.png";
    pub const RETRY: &str = "pictures/general/retry.png";
    pub const NO_OP: &str = "pictures/general/no_op.png";
    pub const MAINTENANCE: &str = "pictures/general/maint.png";
    pub const CLOSE: &str = "pictures/general/close.png";
    pub const CONFIRM: &str = "pictures/general/confirm_w.png";
    pub const LOADING: &str = "pictures/general/loading.png";
}

pub mod mirror {
    pub const MD_ENTER: &str = "pictures/mirror/general/md_enter.png";
    pub const EXPLORE_REWARD: &str = "pictures/mirror/general/explore_reward.png";
    pub const CLAIM_REWARDS: &str = "pictures/mirror/general/claim_rewards.png";
    pub const GIVE_UP: &str = "pictures/mirror/general/give_up.png";
    pub const WEEKLY_PROMPT: &str = "pictures/mirror/general/weekly_reward.png";
    pub const PASS_PROMPT: &str = "pictures/CustomAdded1080p/mirror/general/pass_level.png";
    pub const RESUME: &str = "pictures/mirror/general/resume.png";
    pub const ENTER: &str = "pictures/mirror/general/enter.png";

    pub const DANTEH: &str = "pictures/mirror/general/danteh.png";
    pub const DANTEH_ZOOMED: &str = "pictures/CustomAdded1080p/mirror/general/danteh_zoomed.png";
    pub const EGO_GIFT_GET: &str = "pictures/mirror/general/ego_gift_get.png";
    pub const EVENT_EFFECT: &str = "pictures/mirror/general/event_effect.png";
    pub const EVENT_EFFECT_OPTION: &str = "pictures/mirror/general/event_effect_option.png";
    pub const VICTORY: &str = "pictures/mirror/general/victory.png";
    pub const DEFEAT: &str = "pictures/mirror/general/defeat.png";
}

pub mod setup {
    pub const SQUAD_MENU: &str = "pictures/CustomAdded1080p/mirror/squads/squad_menu.png";
    pub const GRACE_MENU: &str = "pictures/mirror/grace/grace_menu.png";
    pub const GRACE_CONFIRM: &str = "pictures/mirror/grace/enter.png";
    pub const GIFT_SELECT: &str = "pictures/mirror/general/gift_select.png";
}

pub mod squad {
    pub const CLEAR: &str = "pictures/mirror/squads/clear.png";
    pub const TO_BATTLE: &str = "pictures/mirror/squads/to_battle.png";
}

pub mod battle {
    pub const WINRATE: &str = "pictures/battle/winrate.png";
    pub const COG: &str = "pictures/battle/cog.png";
    pub const IN_PROGRESS: &str = "pictures/battle/in_progress.png";
    pub const HOPELESS: &str = "pictures/battle/hopeless.png";
    pub const STRUGGLING: &str = "pictures/battle/struggling.png";
    pub const SANITY: &str = "pictures/CustomAdded1080p/battle/sanity.png";
}

pub mod events {
    pub const SKIP: &str = "pictures/events/skip.png";
    pub const BADGE: &str = "pictures/mirror/events/event.png";
    pub const CONTINUE: &str = "pictures/events/continue.png";
    pub const PROCEED: &str = "pictures/events/proceed.png";
    pub const COMMENCE: &str = "pictures/events/commence.png";
    pub const COMMENCE_BATTLE: &str = "pictures/events/commence_battle.png";

    pub const LEVEL_UP: &str = "pictures/events/level_up.png";
    pub const SELECT_GAIN: &str = "pictures/events/select_gain.png";
    pub const PASS_GAIN_EGO: &str = "pictures/events/pass_gain_ego.png";
    pub const PASS_GAIN_CHECK: &str = "pictures/events/pass_gain_check.png";
    pub const PROCEED_GAIN: &str = "pictures/events/proceed_gain.png";
    pub const SELECT_RIGHT: &str = "pictures/events/select_right.png";
    pub const HELTERFLY: &str = "pictures/events/helterfly.png";
    pub const MIDWINTER: &str = "pictures/events/midwinter.png";
    pub const WIN_BATTLE: &str = "pictures/events/win_battle.png";
    pub const SKILL_CHECK: &str = "pictures/events/skill_check.png";
    pub const KQE: &str = "pictures/CustomAdded1080p/events/kqe.png";
    pub const SLOT_MACHINE: &str = "pictures/CustomAdded1080p/events/slot_machine.png";
    pub const VIOLET_HP: &str = "pictures/events/violet_hp.png";

    pub const VERY_HIGH: &str = "pictures/events/very_high.png";
    pub const HIGH: &str = "pictures/events/high.png";
    pub const NORMAL: &str = "pictures/events/normal.png";
    pub const LOW: &str = "pictures/events/low.png";
    pub const VERY_LOW: &str = "pictures/events/very_low.png";

    /// Success chances, best first.
    pub const CHANCES: [&str; 5] = [VERY_HIGH, HIGH, NORMAL, LOW, VERY_LOW];
}

pub mod encounters {
    pub const WOPPILY: &str = "pictures/events/woppily.png";
    pub const INVESTIGATE: &str = "pictures/events/investigate.png";
    pub const NO: &str = "pictures/events/no.png";
    pub const PINK_SHOES: &str = "pictures/events/pink_shoes.png";
    pub const REFUSE: &str = "pictures/events/refuse.png";
    pub const HOHENHEIM: &str = "pictures/events/hohenheim.png";
    pub const SHIELD_PASSIVE: &str = "pictures/events/shield_passive.png";
    pub const POISE_PASSIVE: &str = "pictures/events/poise_passive.png";
    pub const SP_PASSIVE: &str = "pictures/events/sp_passive.png";
    pub const DOOMSDAY: &str = "pictures/events/doomsday.png";
    pub const OFFER_CLAY: &str = "pictures/events/offer_clay.png";
    pub const OFFER_SINNER: &str = "pictures/events/offer_sinner.png";
    pub const TEDDY: &str = "pictures/events/teddy.png";
    pub const HUG_BEAR: &str = "pictures/events/hug_bear.png";
}

pub mod nav {
    pub const NAV_ENTER: &str = "pictures/mirror/general/nav_enter.png";
    pub const NODE: &str = "pictures/CustomAdded1080p/mirror/nav/node.png";
    pub const NODE_OCCUPIED: &str = "pictures/CustomAdded1080p/mirror/nav/node_occupied.png";
    pub const COMBAT_GLYPHS: [&str; 2] = [
        "pictures/mirror/nav/combat.png",
        "pictures/mirror/nav/combat_elite.png",
    ];
}

pub mod packs {
    pub const INPACK: &str = "pictures/mirror/packs/inpack.png";
    pub const REFRESH: &str = "pictures/mirror/packs/refresh.png";
    pub const OWNED: &str = "pictures/CustomAdded1080p/mirror/packs/owned.png";
    pub const SLOT: &str = "pictures/mirror/packs/slot.png";
    pub const NORMAL_BADGE: &str = "pictures/mirror/packs/normal.png";
    pub const HARD_BADGE: &str = "pictures/mirror/packs/hard.png";
    pub const FLOORS: [&str; 5] = [
        "pictures/mirror/packs/floor1.png",
        "pictures/mirror/packs/floor2.png",
        "pictures/mirror/packs/floor3.png",
        "pictures/mirror/packs/floor4.png",
        "pictures/mirror/packs/floor5.png",
    ];

    /// Named pack art lives per floor.
    pub fn named(floor: crate::config::Floor, name: &str) -> String {
        format!("pictures/mirror/packs/{}/{}.png", floor.key(), name)
    }
}

pub mod rewards {
    pub const REWARD_SELECT: &str = "pictures/mirror/general/reward_select.png";
    pub const EGO_GIFT: &str = "pictures/mirror/general/ego_gift.png";
    pub const ENCOUNTER_REWARD: &str = "pictures/mirror/general/encounter_reward.png";
    pub const COST_GIFT: &str = "pictures/mirror/rewards/cost_gift.png";
    pub const COST: &str = "pictures/mirror/rewards/cost.png";
    pub const GIFT: &str = "pictures/mirror/rewards/gift.png";
    pub const RESOURCE: &str = "pictures/mirror/rewards/resource.png";

    /// Encounter rewards, most wanted first.
    pub const ENCOUNTER_ORDER: [&str; 4] = [COST_GIFT, COST, GIFT, RESOURCE];
}

pub mod restshop {
    pub const SHOP: &str = "pictures/mirror/restshop/shop.png";
    pub const LEAVE: &str = "pictures/mirror/restshop/leave.png";
    pub const INSUFFICIENT: &str = "pictures/mirror/restshop/insufficient.png";

    pub const FUSE: &str = "pictures/mirror/restshop/fusion/fuse.png";
    pub const FUSE_MENU: &str = "pictures/mirror/restshop/fusion/fuse_menu.png";
    pub const FUSE_CONFIRM: &str = "pictures/mirror/restshop/fusion/fuse_confirm.png";
    pub const SORT: &str = "pictures/CustomAdded1080p/mirror/restshop/fusion/sort.png";
    pub const BY_KEYWORD: &str = "pictures/CustomAdded1080p/mirror/restshop/fusion/by_keyword.png";
    pub const VESTIGE: &str = "pictures/mirror/restshop/fusion/vestige.png";

    pub const HEAL: &str = "pictures/mirror/restshop/heal.png";
    pub const HEAL_ALL: &str = "pictures/mirror/restshop/heal_all.png";
    pub const RETURN: &str = "pictures/mirror/restshop/return.png";

    pub const ENHANCE: &str = "pictures/mirror/restshop/enhance/enhance.png";
    pub const POWER_UP: &str = "pictures/mirror/restshop/enhance/power_up.png";
    pub const FULLY_UPGRADED: &str = "pictures/CustomAdded1080p/mirror/restshop/enhance/fully_upgraded.png";
    pub const WORDLESS_ENHANCE: &str = "pictures/mirror/restshop/enhance/wordless.png";

    pub const MARKET_REFRESH: &str = "pictures/mirror/restshop/market/refresh.png";
    pub const PURCHASE: &str = "pictures/mirror/restshop/market/purchase.png";
    pub const REPLACE_SKILL: &str = "pictures/mirror/restshop/market/replace_skill.png";
    pub const WORDLESS_MARKET: &str = "pictures/mirror/restshop/market/wordless.png";

    /// Hand-cut fusion exception art, authored at the live resolution.
    pub fn fusion_exception(name: &str) -> String {
        format!("pictures/CustomFuse/{}.png", name)
    }
}

/// Every fixed template the engine references (status tables excluded).
pub fn catalog() -> Vec<&'static str> {
    let mut all = vec![
        general::CONNECTION_LOST,
        general::SERVER_ERROR,
        general::RETRY,
        general::NO_OP,
        general::MAINTENANCE,
        general::CLOSE,
        general::CONFIRM,
        general::LOADING,
        mirror::MD_ENTER,
        mirror::EXPLORE_REWARD,
        mirror::CLAIM_REWARDS,
        mirror::GIVE_UP,
        mirror::WEEKLY_PROMPT,
        mirror::PASS_PROMPT,
        mirror::RESUME,
        mirror::ENTER,
        mirror::DANTEH,
        mirror::DANTEH_ZOOMED,
        mirror::EGO_GIFT_GET,
        mirror::EVENT_EFFECT,
        mirror::EVENT_EFFECT_OPTION,
        mirror::VICTORY,
        mirror::DEFEAT,
        setup::SQUAD_MENU,
        setup::GRACE_MENU,
        setup::GRACE_CONFIRM,
        setup::GIFT_SELECT,
        squad::CLEAR,
        squad::TO_BATTLE,
        battle::WINRATE,
        battle::COG,
        battle::IN_PROGRESS,
        battle::HOPELESS,
        battle::STRUGGLING,
        battle::SANITY,
        events::SKIP,
        events::BADGE,
        events::CONTINUE,
        events::PROCEED,
        events::COMMENCE,
        events::COMMENCE_BATTLE,
        events::LEVEL_UP,
        events::SELECT_GAIN,
        events::PASS_GAIN_EGO,
        events::PASS_GAIN_CHECK,
        events::PROCEED_GAIN,
        events::SELECT_RIGHT,
        events::HELTERFLY,
        events::MIDWINTER,
        events::WIN_BATTLE,
        events::SKILL_CHECK,
        events::KQE,
        events::SLOT_MACHINE,
        events::VIOLET_HP,
        encounters::WOPPILY,
        encounters::INVESTIGATE,
        encounters::NO,
        encounters::PINK_SHOES,
        encounters::REFUSE,
        encounters::HOHENHEIM,
        encounters::SHIELD_PASSIVE,
        encounters::POISE_PASSIVE,
        encounters::SP_PASSIVE,
        encounters::DOOMSDAY,
        encounters::OFFER_CLAY,
        encounters::OFFER_SINNER,
        encounters::TEDDY,
        encounters::HUG_BEAR,
        nav::NAV_ENTER,
        nav::NODE,
        nav::NODE_OCCUPIED,
        packs::INPACK,
        packs::REFRESH,
        packs::OWNED,
        packs::SLOT,
        packs::NORMAL_BADGE,
        packs::HARD_BADGE,
        rewards::REWARD_SELECT,
        rewards::EGO_GIFT,
        rewards::ENCOUNTER_REWARD,
        restshop::SHOP,
        restshop::LEAVE,
        restshop::INSUFFICIENT,
        restshop::FUSE,
        restshop::FUSE_MENU,
        restshop::FUSE_CONFIRM,
        restshop::SORT,
        restshop::BY_KEYWORD,
        restshop::VESTIGE,
        restshop::HEAL,
        restshop::HEAL_ALL,
        restshop::RETURN,
        restshop::ENHANCE,
        restshop::POWER_UP,
        restshop::FULLY_UPGRADED,
        restshop::WORDLESS_ENHANCE,
        restshop::MARKET_REFRESH,
        restshop::PURCHASE,
        restshop::REPLACE_SKILL,
        restshop::WORDLESS_MARKET,
    ];
    all.extend(events::CHANCES);
    all.extend(nav::COMBAT_GLYPHS);
    all.extend(packs::FLOORS);
    all.extend(rewards::ENCOUNTER_ORDER);
    all.sort_unstable();
    all.dedup();
    all
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_paths_are_png_under_pictures() {
        let all = catalog();
        assert!(all.len() > 90);
        for path in all {
            assert!(path.starts_with("pictures/"), "{}", path);
            assert!(path.ends_with(".png"), "{}", path);
        }
    }

    #[test]
    fn test_dynamic_paths() {
        assert_eq!(
            packs::named(crate::config::Floor::new(4).unwrap(), "wrath"),
            "pictures/mirror/packs/floor4/wrath.png"
        );
        assert_eq!(restshop::fusion_exception("hat"), "pictures/CustomFuse/hat.png");
    }
}
