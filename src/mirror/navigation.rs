//! Next-node choice on the floor map.

use std::time::Duration;

use tracing::{debug, info, warn};

use super::Mirror;
use crate::assets::{mirror, nav};
use crate::bot::Bot;
use crate::error::EngineResult;
use crate::geometry::{AspectRatio, Point, Rect, Reference};
use crate::vision::proximity;
use crate::vision::Query;

const NODE_X: i32 = 1440;
const NODE_ROWS_16_10: [i32; 3] = [189, 607, 1036];
const NODE_ROWS: [i32; 3] = [263, 689, 1115];
const FOUR_THREE_SHIFT: i32 = 105;
/// Half-size (1440p) of the box searched for a node glyph.
const NODE_PROBE: i32 = 120;
const COMBAT_X: (i32, i32) = (1280, 1601);
const COMBAT_NEAR: (i32, i32) = (100, 200);
const CAMERA_DRAG: i32 = 100;

pub fn navigate(m: &mut Mirror<'_>) -> EngineResult<()> {
    navigate_with(m.bot, true)
}

fn navigate_with(bot: &Bot, drag_camera: bool) -> EngineResult<()> {
    if bot.click_matching(nav::NAV_ENTER)? {
        debug!("node already staged");
        bot.sleep(1.0);
        return Ok(());
    }
    if run_over(bot)? {
        return Ok(());
    }

    let marker = match bot.find(mirror::DANTEH)?.first() {
        Some(&p) => Some(p),
        None => bot.find(mirror::DANTEH_ZOOMED)?.first().copied(),
    };
    let Some(marker) = marker else {
        debug!("player marker not found");
        return Ok(());
    };

    let geo = bot.geo();
    if drag_camera && geo.aspect() == AspectRatio::SixteenNine {
        // costs at the top are hidden behind the header on 16:9
        bot.drag(marker, marker.offset(0, geo.scale_y(Reference::P1440, CAMERA_DRAG)))?;
        bot.sleep(0.5);
    }

    let nodes = node_candidates(bot)?;
    let combats = combat_glyphs(bot)?;
    let near = (
        geo.scale_x(Reference::P1440, COMBAT_NEAR.0),
        geo.scale_y(Reference::P1440, COMBAT_NEAR.1),
    );
    let ordered = order_nodes(nodes, &combats, near);
    debug!(?ordered, combats = combats.len(), "node order");

    for node in ordered {
        bot.click(node)?;
        if bot.wait_for(nav::NAV_ENTER, Duration::from_millis(1500))? {
            info!(at = %node, "moving to node");
            bot.click_matching(nav::NAV_ENTER)?;
            bot.sleep(1.0);
            return Ok(());
        }
        if run_over(bot)? {
            return Ok(());
        }
    }

    if drag_camera {
        return navigate_with(bot, false);
    }
    warn!("no node could be entered");
    Ok(())
}

fn run_over(bot: &Bot) -> EngineResult<bool> {
    Ok(bot.first_visible(&[mirror::VICTORY, mirror::DEFEAT])?.is_some())
}

/// Reference rows for the live aspect ratio, bound to the node column.
pub fn candidate_points(bot: &Bot) -> Vec<Point> {
    let geo = bot.geo();
    let aspect = geo.aspect();
    let rows = if aspect == AspectRatio::SixteenTen {
        NODE_ROWS_16_10
    } else {
        NODE_ROWS
    };
    let shift = if aspect == AspectRatio::FourThree { FOUR_THREE_SHIFT } else { 0 };
    rows.iter().map(|&y| geo.scale_1440p(NODE_X, y + shift)).collect()
}

/// Candidates that actually hold a node.
fn node_candidates(bot: &Bot) -> EngineResult<Vec<Point>> {
    let geo = bot.geo();
    let half = (
        geo.scale_x(Reference::P1440, NODE_PROBE),
        geo.scale_y(Reference::P1440, NODE_PROBE),
    );
    let mut nodes = Vec::new();
    for p in candidate_points(bot) {
        let around = Rect::around(p, half.0, half.1);
        let found = bot.exists(Query::new(nav::NODE).gray().region(around))?
            || bot.exists(Query::new(nav::NODE_OCCUPIED).gray().region(around))?;
        if found {
            nodes.push(p);
        }
    }
    Ok(nodes)
}

fn combat_glyphs(bot: &Bot) -> EngineResult<Vec<Point>> {
    let geo = bot.geo();
    let lo = geo.scale_x(Reference::P1440, COMBAT_X.0);
    let hi = geo.scale_x(Reference::P1440, COMBAT_X.1);
    let mut glyphs = Vec::new();
    for glyph in nav::COMBAT_GLYPHS {
        glyphs.extend(bot.find(glyph)?.into_iter().filter(|p| p.x > lo && p.x < hi));
    }
    Ok(glyphs)
}

/// Non-combat nodes first, each bucket in its original order.
pub fn order_nodes(nodes: Vec<Point>, combats: &[Point], near: (i32, i32)) -> Vec<Point> {
    let (combat, calm): (Vec<Point>, Vec<Point>) = nodes
        .into_iter()
        .partition(|&n| combats.iter().any(|&c| proximity::is_near_xy(n, c, near.0, near.1)));
    calm.into_iter().chain(combat).collect()
}
