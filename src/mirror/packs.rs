//! Floor pack selection.

use std::time::Duration;

use tracing::{debug, info, warn};

use super::Mirror;
use crate::assets::packs;
use crate::bot::Bot;
use crate::config::Floor;
use crate::error::EngineResult;
use crate::geometry::{Point, Rect, Reference};
use crate::status::Status;
use crate::vision::proximity;

/// Refresh button darker than this has been used on this floor.
const REFRESH_DIM: u8 = 70;
const OWNED_RADIUS_X: i32 = 50;
const DRAG_FROM_ABOVE: i32 = 350;
/// Pierce pack art below this line (1440p); the status pack template false-matches above it.
const PIERCE_MIN_Y: i32 = 1092;
const MAX_REFRESHES: usize = 3;

/// What the pack screen offers right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackView {
    pub floor: Floor,
    pub exception_visible: bool,
    pub refresh_available: bool,
    pub prioritize_list: bool,
    pub priority_match: bool,
    pub status_visible: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackDecision {
    Refresh,
    Priority,
    Status,
}

pub fn decide_pack(view: &PackView) -> PackDecision {
    if view.exception_visible {
        return if view.refresh_available {
            PackDecision::Refresh
        } else {
            PackDecision::Priority
        };
    }
    if view.floor.is_last() {
        return PackDecision::Priority;
    }
    if view.prioritize_list && view.priority_match {
        return PackDecision::Priority;
    }
    if view.status_visible {
        return PackDecision::Status;
    }
    PackDecision::Priority
}

pub fn pack_selection(m: &mut Mirror<'_>) -> EngineResult<()> {
    select(m, 0)
}

fn select(m: &mut Mirror<'_>, refreshes: usize) -> EngineResult<()> {
    let bot = m.bot;
    let mut floor = identify_floor(bot, m.run.floor)?;
    if floor == Floor::FIRST && refreshes == 0 {
        // floor 1 opens with the credit animation
        bot.sleep(4.0);
    }
    if toggle_difficulty(bot)? {
        floor = identify_floor(bot, Some(floor))?;
    }
    m.run.floor = Some(floor);

    let refresh = refresh_button(bot)?;
    let excluded = bot.config.pack_exceptions(floor)?;
    let exceptions = visible_named(bot, floor, &excluded)?;
    let priority: Vec<String> = bot
        .config
        .pack_priority(floor)?
        .into_iter()
        .filter(|name| !excluded.contains(name))
        .collect();
    let priority_match = visible_named(bot, floor, &priority)?.into_iter().next();
    let status_pack = m.run.status.assets().pack;
    let status_visible = bot.vision.has_template(status_pack) && bot.exists(status_pack)?;

    let view = PackView {
        floor,
        exception_visible: !exceptions.is_empty(),
        refresh_available: refresh.is_some(),
        prioritize_list: bot.vars().prioritize_list_over_status,
        priority_match: priority_match.is_some(),
        status_visible,
    };
    let decision = decide_pack(&view);
    debug!(%floor, ?decision, ?exceptions, "pack screen");

    match decision {
        PackDecision::Refresh => {
            if let Some(button) = refresh {
                info!(%floor, "exception pack on offer, refreshing");
                bot.click(button)?;
                bot.sleep(2.0);
            }
            if refreshes + 1 < MAX_REFRESHES {
                return select(m, refreshes + 1);
            }
            Ok(())
        }
        PackDecision::Status => {
            if !choose_pack(bot, status_pack, m.run.status)? {
                fallback(bot, &exceptions)?;
            }
            Ok(())
        }
        PackDecision::Priority => {
            let chosen = match &priority_match {
                Some(template) => choose_pack(bot, template, m.run.status)?,
                None => false,
            };
            if !chosen {
                fallback(bot, &exceptions)?;
            }
            Ok(())
        }
    }
}

/// Read the floor badge. Keeps `last` when no badge matches.
fn identify_floor(bot: &Bot, last: Option<Floor>) -> EngineResult<Floor> {
    for (i, badge) in packs::FLOORS.iter().enumerate() {
        if bot.exists(*badge)? {
            if let Some(floor) = Floor::new(i as u8 + 1) {
                return Ok(floor);
            }
        }
    }
    let floor = last.unwrap_or(Floor::FIRST);
    warn!(%floor, "floor badge not recognized");
    Ok(floor)
}

/// Flip the normal/hard badge to match `hard_mode`. True when it was clicked.
fn toggle_difficulty(bot: &Bot) -> EngineResult<bool> {
    let unwanted = if bot.vars().hard_mode {
        packs::NORMAL_BADGE
    } else {
        packs::HARD_BADGE
    };
    if bot.click_matching(unwanted)? {
        info!(hard = bot.vars().hard_mode, "switching difficulty");
        bot.sleep(1.0);
        return Ok(true);
    }
    Ok(false)
}

/// The refresh button, if it is still lit.
fn refresh_button(bot: &Bot) -> EngineResult<Option<Point>> {
    let Some(&button) = bot.find(packs::REFRESH)?.first() else {
        return Ok(None);
    };
    let lum = bot.luminance(button)?;
    Ok((lum >= REFRESH_DIM).then_some(button))
}

/// Templates for `names` on `floor` that are currently on screen.
fn visible_named(bot: &Bot, floor: Floor, names: &[String]) -> EngineResult<Vec<String>> {
    let mut seen = Vec::new();
    for name in names {
        let template = packs::named(floor, name);
        if !bot.vision.has_template(&template) {
            warn!(pack = %name, %floor, "no art for pack, ignoring");
            continue;
        }
        if bot.exists(template.as_str())? {
            seen.push(template);
        }
    }
    Ok(seen)
}

/// Region a pack template is accepted in.
fn pack_strip(bot: &Bot, template: &str) -> Rect {
    let geo = bot.geo();
    let strip = geo.rect_1080p(315, 260, 1570, 800);
    if template == Status::Pierce.assets().pack {
        Rect::new(strip.left, geo.scale_y(Reference::P1440, PIERCE_MIN_Y), strip.right, geo.height as i32)
    } else {
        strip
    }
}

/// Pick one visible copy of `template` and drag it down to commit.
pub fn choose_pack(bot: &Bot, template: &str, status: Status) -> EngineResult<bool> {
    let strip = pack_strip(bot, template);
    let candidates: Vec<Point> = bot
        .find(template)?
        .into_iter()
        .filter(|p| strip.contains(*p))
        .collect();
    let owned = bot.find(packs::OWNED)?;
    let radius = bot.geo().scale_x(Reference::P1080, OWNED_RADIUS_X);
    let candidates = proximity::without_owned(candidates, &owned, radius);

    let Some(target) = bot.pick(&candidates) else {
        debug!(template, "pack not in strip");
        return Ok(false);
    };
    info!(template, %status, at = %target, "taking pack");
    drag_pack(bot, target)?;
    Ok(true)
}

fn drag_pack(bot: &Bot, target: Point) -> EngineResult<()> {
    let above = target.offset(0, -bot.geo().scale_y(Reference::P1440, DRAG_FROM_ABOVE));
    bot.drag(above, target)?;
    bot.sleep(5.0);
    Ok(())
}

/// Nothing preferred on offer: drag the first slot that is not an exception.
fn fallback(bot: &Bot, exceptions: &[String]) -> EngineResult<()> {
    let slots = bot.find(packs::SLOT)?;
    let mut excluded = Vec::new();
    for template in exceptions {
        excluded.extend(bot.find(template.as_str())?);
    }
    let radius = bot.geo().scale_x(Reference::P1080, OWNED_RADIUS_X);
    let slots = proximity::without_owned(slots, &excluded, radius);
    match slots.first() {
        Some(&slot) => {
            info!(at = %slot, "no preferred pack, taking first slot");
            drag_pack(bot, slot)
        }
        None => {
            debug!("no pack slots visible");
            bot.wait_gone(packs::INPACK, Duration::from_secs(1))?;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigStore;
    use crate::geometry::Geometry;
    use crate::mock::{Action, Stage};
    use std::sync::Arc;

    fn view(floor: u8) -> PackView {
        PackView {
            floor: Floor::new(floor).unwrap(),
            exception_visible: false,
            refresh_available: true,
            prioritize_list: false,
            priority_match: false,
            status_visible: false,
        }
    }

    #[test]
    fn test_exception_refreshes_then_falls_to_list() {
        let mut v = view(4);
        v.exception_visible = true;
        v.status_visible = true;
        assert_eq!(decide_pack(&v), PackDecision::Refresh);
        v.refresh_available = false;
        assert_eq!(decide_pack(&v), PackDecision::Priority);
    }

    #[test]
    fn test_last_floor_never_takes_status() {
        let mut v = view(5);
        v.status_visible = true;
        assert_eq!(decide_pack(&v), PackDecision::Priority);
        let mut v = view(3);
        v.status_visible = true;
        assert_eq!(decide_pack(&v), PackDecision::Status);
    }

    #[test]
    fn test_list_over_status_needs_a_match() {
        let mut v = view(2);
        v.status_visible = true;
        v.prioritize_list = true;
        assert_eq!(decide_pack(&v), PackDecision::Status);
        v.priority_match = true;
        assert_eq!(decide_pack(&v), PackDecision::Priority);
    }

    #[test]
    fn test_choose_pack_skips_owned_and_drags_from_above() {
        let dir = tempfile::tempdir().unwrap();
        let stage = Stage::new(Geometry::new(1920, 1080));
        let bot = stage.bot(Arc::new(ConfigStore::new(dir.path())));
        let pack = Status::Burn.assets().pack;
        stage.show(pack, Point::new(600, 500));
        stage.show(pack, Point::new(1200, 500));
        stage.show(packs::OWNED, Point::new(620, 300));
        // outside the strip
        stage.show(pack, Point::new(100, 500));

        assert!(choose_pack(&bot, pack, Status::Burn).unwrap());
        let actions = stage.actions();
        assert!(actions.contains(&Action::Down(Point::new(1200, 237))));
        assert!(actions.contains(&Action::Up(Point::new(1200, 500))));
    }

    #[test]
    fn test_pierce_pack_must_sit_low() {
        let dir = tempfile::tempdir().unwrap();
        let stage = Stage::new(Geometry::new(2560, 1440));
        let bot = stage.bot(Arc::new(ConfigStore::new(dir.path())));
        let pack = Status::Pierce.assets().pack;
        stage.show(pack, Point::new(1000, 600));
        assert!(!choose_pack(&bot, pack, Status::Pierce).unwrap());
        stage.show(pack, Point::new(1000, 1200));
        assert!(choose_pack(&bot, pack, Status::Pierce).unwrap());
    }
}
