//! Rest stop: fuse, heal, enhance, buy, leave.

use std::time::Duration;

use tracing::{debug, info, warn};

use super::Mirror;
use crate::assets::{general, restshop};
use crate::bot::Bot;
use crate::error::EngineResult;
use crate::geometry::{Point, Rect, Reference};
use crate::status::{Status, ENHANCE_PROBE_MIN, WORDLESS_PROBE, WORDLESS_PROBE_MIN};
use crate::vision::proximity::{self, Expand};

const MENU_TIMEOUT: Duration = Duration::from_millis(1500);
const SCROLL_WINDOWS: i32 = 5;
const MAX_FUSIONS: usize = 10;
const MAX_ENHANCE_PASSES: usize = 3;
const MAX_ENHANCE_ROUNDS: usize = 8;
const REFRESH_CYCLES: usize = 3;

/// Fusion pane (1440p): right of this x, above this y.
const FUSION_PANE: (i32, i32) = (1235, 800);
/// One gift row in the fusion pane (1440p).
const FUSION_ROW: (i32, i32) = (10, 348);
const ENHANCE_PANE_X: i32 = 1200;
/// "Fully upgraded" boxes grow this far left and down (1080p).
const UPGRADED_GROW: i32 = 100;
/// Market purchase area (1440p).
const MARKET_AREA: (i32, i32, i32, i32) = (1091, 434, 2322, 919);
/// Skill-replacement art false-matches here (1440p).
const MARKET_FALSE_HIT: (i32, i32) = (1300, 541);
const MARKET_FALSE_RADIUS: i32 = 30;
/// Pixel (1440p) that goes black once an item is sold.
const SOLD_PROBE: (i32, i32) = (25, 1);
const SOLD_MAX: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Funds {
    Available,
    Insufficient,
}

pub fn rest_shop(m: &mut Mirror<'_>) -> EngineResult<()> {
    let bot = m.bot;
    if bot.vars().skip_restshop {
        debug!("rest shop skipped");
    } else {
        shop(m)?;
    }
    leave(bot)
}

fn shop(m: &mut Mirror<'_>) -> EngineResult<()> {
    let bot = m.bot;
    let vars = bot.vars().clone();

    if !vars.skip_ego_fusion && fuse(m)? == Funds::Insufficient {
        return Ok(());
    }
    if !vars.skip_sinner_healing {
        heal(bot)?;
    }
    if !vars.skip_ego_enhancing && enhance(m)? == Funds::Insufficient {
        return Ok(());
    }
    if !vars.skip_ego_buying {
        buy(m)?;
    }
    Ok(())
}

fn leave(bot: &Bot) -> EngineResult<()> {
    bot.click_until(restshop::LEAVE, Duration::from_secs(3))?;
    bot.click_until(general::CONFIRM, Duration::from_secs(3))?;
    bot.sleep(1.0);
    Ok(())
}

/// Handle the "insufficient cost" dialog if it is up.
fn broke(bot: &Bot) -> EngineResult<bool> {
    if !bot.exists(restshop::INSUFFICIENT)? {
        return Ok(false);
    }
    info!("out of cost");
    if !bot.click_matching(general::CONFIRM)? {
        bot.escape()?;
    }
    bot.sleep(0.5);
    Ok(true)
}

fn close_menu(bot: &Bot) -> EngineResult<()> {
    if !bot.click_matching(restshop::RETURN)? {
        bot.escape()?;
    }
    bot.sleep(0.5);
    Ok(())
}

// ========== Fusion ==========

fn fuse(m: &mut Mirror<'_>) -> EngineResult<Funds> {
    let bot = m.bot;
    let status = m.run.status;
    if !bot.click_matching(restshop::FUSE)? {
        return Ok(Funds::Available);
    }
    if !bot.wait_for(restshop::FUSE_MENU, MENU_TIMEOUT)? {
        debug!("fusion menu never opened");
        return Ok(Funds::Available);
    }

    // the selector fades in after the menu animation
    bot.click_until(status.assets().fusion_button, Duration::from_secs(3))?;
    bot.click_until(general::CONFIRM, Duration::from_secs(2))?;
    if bot.click_matching(restshop::SORT)? {
        bot.sleep(0.3);
        bot.click_matching(restshop::BY_KEYWORD)?;
    }
    let pane = pane_anchor(bot);
    bot.scroll(pane, -10)?;

    let geo = bot.geo();
    let row = (
        geo.scale_x(Reference::P1440, FUSION_ROW.0),
        geo.scale_y(Reference::P1440, FUSION_ROW.1),
    );

    for _ in 0..MAX_FUSIONS {
        let mut picked: Vec<Point> = fusion_candidates(bot, status)?.into_iter().take(3).collect();
        if picked.is_empty() {
            break;
        }
        for &p in &picked {
            bot.click(p)?;
        }

        if picked.len() < 3 {
            bot.scroll(pane, SCROLL_WINDOWS)?;
            bot.sleep(0.5);
            let before = picked.len();
            proximity::merge_unique(&mut picked, fusion_candidates(bot, status)?, row.0, row.1);
            picked.truncate(3);
            for &p in &picked[before..] {
                bot.click(p)?;
            }
            if picked.len() < 3 {
                debug!(found = picked.len(), "not enough fodder to fuse");
                break;
            }
        }

        info!(%status, "fusing");
        bot.click_until(restshop::FUSE_CONFIRM, Duration::from_secs(2))?;
        bot.click_until(general::CONFIRM, Duration::from_secs(2))?;
        bot.sleep(1.0);
        if broke(bot)? {
            return Ok(Funds::Insufficient);
        }
        bot.dismiss_gift_popups(1)?;
    }

    close_menu(bot)?;
    Ok(Funds::Available)
}

fn pane_anchor(bot: &Bot) -> Point {
    bot.geo().scale_1440p(1800, 500)
}

/// Off-status gifts and vestiges in the fusion pane, minus protected gifts.
pub fn fusion_candidates(bot: &Bot, status: Status) -> EngineResult<Vec<Point>> {
    let geo = bot.geo();
    let min_x = geo.scale_x(Reference::P1440, FUSION_PANE.0);
    let max_y = geo.scale_y(Reference::P1440, FUSION_PANE.1);

    let mut points = Vec::new();
    for other in Status::ALL.iter().filter(|&&s| s != status) {
        points.extend(bot.find(other.assets().fusion_gift)?);
    }
    points.extend(bot.find(restshop::VESTIGE)?);
    points.retain(|p| p.x > min_x && p.y < max_y);

    let mut masks: Vec<Rect> = Vec::new();
    for name in bot.config.fusion_exceptions()? {
        let template = restshop::fusion_exception(&name);
        if !bot.vision.has_template(&template) {
            warn!(gift = %name, "no art for fusion exception");
            continue;
        }
        masks.extend(bot.boxes(template.as_str())?.into_iter().map(|b| b.rect));
    }
    Ok(proximity::outside_all(points, &masks, Expand::NONE))
}

// ========== Healing ==========

fn heal(bot: &Bot) -> EngineResult<()> {
    if !bot.click_until(restshop::HEAL, Duration::from_secs(2))? {
        return Ok(());
    }
    bot.click_until(restshop::HEAL_ALL, Duration::from_secs(2))?;
    bot.sleep(1.0);
    bot.click_until(restshop::RETURN, Duration::from_secs(2))?;
    Ok(())
}

// ========== Enhancement ==========

fn enhance(m: &mut Mirror<'_>) -> EngineResult<Funds> {
    let bot = m.bot;
    let status = m.run.status;
    if !bot.click_matching(restshop::ENHANCE)? {
        return Ok(Funds::Available);
    }
    bot.sleep(0.5);
    let pane = pane_anchor(bot);
    bot.scroll(pane, -10)?;

    for pass in 0..MAX_ENHANCE_PASSES {
        for _ in 0..MAX_ENHANCE_ROUNDS {
            let targets = enhance_targets(bot, status)?;
            if targets.is_empty() {
                break;
            }
            debug!(pass, count = targets.len(), "upgradeable gifts");
            for gift in targets {
                bot.click(gift)?;
                bot.sleep(0.3);
                bot.click_until(restshop::POWER_UP, Duration::from_secs(1))?;
                bot.click_matching(restshop::POWER_UP)?;
                bot.click_until(general::CONFIRM, Duration::from_secs(1))?;
                bot.sleep(0.5);
                if broke(bot)? {
                    close_menu(bot)?;
                    return Ok(Funds::Insufficient);
                }
            }
        }
        bot.scroll(pane, SCROLL_WINDOWS)?;
        bot.sleep(0.5);
    }

    close_menu(bot)?;
    Ok(Funds::Available)
}

/// Status and wordless gifts in the enhance pane that can still go up.
pub fn enhance_targets(bot: &Bot, status: Status) -> EngineResult<Vec<Point>> {
    let geo = bot.geo();
    let min_x = geo.scale_x(Reference::P1440, ENHANCE_PANE_X);
    let probe = |(dx, dy): (i32, i32)| {
        (geo.scale_x(Reference::P1080, dx), geo.scale_y(Reference::P1080, dy))
    };

    let mut targets = Vec::new();
    let passes = [
        (status.assets().enhance, probe(status.assets().enhance_probe), ENHANCE_PROBE_MIN),
        (restshop::WORDLESS_ENHANCE, probe(WORDLESS_PROBE), WORDLESS_PROBE_MIN),
    ];
    for (template, (dx, dy), min) in passes {
        for p in bot.find(template)? {
            if p.x > min_x && bot.luminance(p.offset(dx, dy))? > min {
                targets.push(p);
            }
        }
    }

    let grow = geo.scale_x(Reference::P1080, UPGRADED_GROW);
    let masks: Vec<Rect> = bot
        .boxes(restshop::FULLY_UPGRADED)?
        .into_iter()
        .map(|b| b.rect)
        .collect();
    let expand = Expand {
        left: grow,
        below: grow,
        ..Expand::NONE
    };
    Ok(proximity::outside_all(targets, &masks, expand))
}

// ========== Buying ==========

fn buy(m: &mut Mirror<'_>) -> EngineResult<Funds> {
    let bot = m.bot;
    let status = m.run.status;
    let geo = bot.geo();
    let sold = (
        geo.scale_x(Reference::P1440, SOLD_PROBE.0),
        geo.scale_y(Reference::P1440, SOLD_PROBE.1),
    );

    for cycle in 0..REFRESH_CYCLES {
        for item in market_items(bot, status)? {
            if bot.luminance(item.offset(sold.0, sold.1))? < SOLD_MAX {
                continue;
            }
            debug!(at = %item, "buying");
            bot.click(item)?;
            bot.sleep(0.5);
            if bot.exists(restshop::REPLACE_SKILL)? {
                bot.escape()?;
                bot.sleep(0.3);
            }
            bot.click_until(restshop::PURCHASE, Duration::from_secs(2))?;
            bot.click_until(general::CONFIRM, Duration::from_secs(2))?;
            bot.sleep(0.5);
            if broke(bot)? {
                return Ok(Funds::Insufficient);
            }
            bot.dismiss_gift_popups(1)?;
        }

        if cycle + 1 < REFRESH_CYCLES {
            if !bot.click_matching(restshop::MARKET_REFRESH)? {
                break;
            }
            bot.sleep(1.0);
            if broke(bot)? {
                return Ok(Funds::Insufficient);
            }
        }
    }
    Ok(Funds::Available)
}

/// Status and wordless market items inside the purchase area.
pub fn market_items(bot: &Bot, status: Status) -> EngineResult<Vec<Point>> {
    let geo = bot.geo();
    let (l, t, r, b) = MARKET_AREA;
    let area = geo.rect_1440p(l, t, r, b);
    let false_hit = geo.scale_1440p(MARKET_FALSE_HIT.0, MARKET_FALSE_HIT.1);
    let radius = geo.scale_x(Reference::P1440, MARKET_FALSE_RADIUS);

    let mut items = bot.find(status.assets().market)?;
    items.extend(bot.find(restshop::WORDLESS_MARKET)?);
    Ok(items
        .into_iter()
        .filter(|p| area.contains(*p) && p.x > area.left && p.y > area.top)
        .filter(|p| !proximity::is_near_xy(*p, false_hit, radius, radius))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigStore;
    use crate::geometry::Geometry;
    use crate::mock::Stage;
    use std::sync::Arc;

    fn stage() -> (tempfile::TempDir, Stage, Bot) {
        let dir = tempfile::tempdir().unwrap();
        let stage = Stage::new(Geometry::new(2560, 1440));
        let bot = stage.bot(Arc::new(ConfigStore::new(dir.path())));
        (dir, stage, bot)
    }

    #[test]
    fn test_enhance_targets_need_lit_probe_and_not_maxed() {
        let (_dir, stage, bot) = stage();
        let glyph = Status::Poise.assets().enhance;
        // probe (12,-41) at 1080p is (16,-55) at 1440p
        stage.show(glyph, Point::new(1500, 600));
        stage.set_luminance(Point::new(1516, 545), 40);
        stage.show(glyph, Point::new(1800, 600));
        stage.set_luminance(Point::new(1816, 545), 10);
        stage.show(glyph, Point::new(2100, 600));
        stage.set_luminance(Point::new(2116, 545), 40);
        stage.show_rect(restshop::FULLY_UPGRADED, Rect::new(2200, 500, 2260, 560));
        // left of the pane
        stage.show(glyph, Point::new(900, 600));
        stage.set_luminance(Point::new(916, 545), 40);

        let targets = enhance_targets(&bot, Status::Poise).unwrap();
        assert_eq!(targets, vec![Point::new(1500, 600)]);
    }

    #[test]
    fn test_market_items_clip_and_false_hit() {
        let (_dir, stage, bot) = stage();
        let glyph = Status::Burn.assets().market;
        stage.show(glyph, Point::new(1300, 541));
        stage.show(glyph, Point::new(1600, 700));
        stage.show(glyph, Point::new(2400, 700));
        stage.show(restshop::WORDLESS_MARKET, Point::new(1900, 800));
        assert_eq!(
            market_items(&bot, Status::Burn).unwrap(),
            vec![Point::new(1600, 700), Point::new(1900, 800)]
        );
    }

    #[test]
    fn test_sold_items_skipped_and_leave_confirmed() {
        let (_dir, stage, bot) = stage();
        let glyph = Status::Burn.assets().market;
        stage.show(glyph, Point::new(1600, 700));
        stage.set_luminance(Point::new(1625, 701), 0);
        stage.show(restshop::SHOP, Point::new(200, 100));
        stage.show(restshop::LEAVE, Point::new(2300, 1300));
        stage.show(general::CONFIRM, Point::new(1400, 900));

        let mut m = Mirror::new(&bot, Status::Burn);
        rest_shop(&mut m).unwrap();
        let clicks = stage.clicks();
        assert!(!clicks.contains(&Point::new(1600, 700)));
        assert_eq!(clicks[clicks.len() - 2..], [Point::new(2300, 1300), Point::new(1400, 900)]);
    }

    #[test]
    fn test_skip_restshop_leaves_at_once() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("gui_config.json"),
            r#"{"SharedVars": {"skip_restshop": true}}"#,
        )
        .unwrap();
        let stage = Stage::new(Geometry::new(2560, 1440));
        let bot = stage.bot(Arc::new(ConfigStore::new(dir.path())));
        stage.show(restshop::FUSE, Point::new(800, 800));
        stage.show(restshop::LEAVE, Point::new(2300, 1300));

        let mut m = Mirror::new(&bot, Status::Burn);
        rest_shop(&mut m).unwrap();
        assert_eq!(stage.clicks(), vec![Point::new(2300, 1300)]);
    }
}
