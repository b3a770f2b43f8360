//! Pre-run stages: dungeon entry, starting squad, graces, starting gift.

use std::time::Duration;

use tracing::{debug, info, warn};

use super::Mirror;
use crate::assets::{general, mirror, setup};
use crate::bot::Bot;
use crate::error::EngineResult;
use crate::geometry::{Point, Reference};
use crate::status::Status;

/// Squad list scroll target (1440p).
const SQUAD_LIST: (i32, i32) = (300, 760);
const SQUAD_WINDOWS: usize = 4;
const SQUAD_WINDOW: i32 = 7;

/// Gift list scroll target (1440p).
const GIFT_LIST: (i32, i32) = (1000, 900);
const GIFT_CHOICE_X: i32 = 1640;
const GIFT_CHOICES: [i32; 3] = [235, 425, 615];
/// Sinking's sub-choices are listed in a different order.
const SINKING_CHOICES: [i32; 3] = [425, 615, 235];

const ENTRY_WAIT: Duration = Duration::from_secs(10);
const STAGE_WAIT: Duration = Duration::from_secs(15);

/// Get from the dungeon entry screen into a run, fresh or resumed.
pub fn enter(m: &mut Mirror<'_>) -> EngineResult<()> {
    let bot = m.bot;
    if bot.click_matching(mirror::MD_ENTER)? {
        bot.sleep(1.0);
    }

    if bot.exists(mirror::EXPLORE_REWARD)? {
        info!("previous explore reward pending");
        if !bot.click_matching(mirror::CLAIM_REWARDS)? {
            bot.click_matching(mirror::GIVE_UP)?;
        }
        bot.click_until(general::CONFIRM, Duration::from_secs(5))?;
        bot.sleep(1.0);
    }
    dismiss_prompts(bot)?;

    match bot.wait_any(&[mirror::RESUME, mirror::ENTER], ENTRY_WAIT)? {
        Some(0) => {
            bot.click_matching(mirror::RESUME)?;
            m.run.resumed = true;
            info!(status = %m.run.status, "resuming run");
        }
        Some(_) => {
            bot.click_matching(mirror::ENTER)?;
            info!(status = %m.run.status, "entering new run");
        }
        None => debug!("no entry button, assuming already inside"),
    }
    bot.sleep(1.0);
    bot.wait_gone(general::LOADING, Duration::from_secs(30))?;
    Ok(())
}

/// Weekly-reward and pass-level prompts.
pub fn dismiss_prompts(bot: &Bot) -> EngineResult<()> {
    for prompt in [mirror::WEEKLY_PROMPT, mirror::PASS_PROMPT] {
        if bot.exists(prompt)? {
            debug!(prompt, "dismissing prompt");
            if !bot.click_matching(general::CONFIRM)? {
                bot.escape()?;
            }
            bot.sleep(0.5);
        }
    }
    Ok(())
}

pub fn initial_squad_selection(m: &mut Mirror<'_>) -> EngineResult<()> {
    let bot = m.bot;
    let assets = m.run.status.assets();

    if !bot.vision.has_template(assets.squad) {
        warn!(
            status = %m.run.status,
            template = assets.squad,
            "no squad art for status, keeping current squad as poise"
        );
        bot.enter()?;
        m.run.status = Status::Poise;
    } else {
        let list = bot.geo().scale_1440p(SQUAD_LIST.0, SQUAD_LIST.1);
        bot.scroll(list, -30)?;
        bot.pause();

        let mut found = bot.click_matching(assets.squad)?;
        let mut window = 0;
        while !found && window < SQUAD_WINDOWS {
            bot.scroll(list, SQUAD_WINDOW)?;
            bot.sleep(0.3);
            found = bot.click_matching(assets.squad)?;
            window += 1;
        }
        if !found {
            warn!(status = %m.run.status, "named squad not in list, keeping current");
        }
        bot.sleep(0.5);
        bot.enter()?;
    }

    bot.wait_for(setup::GRACE_MENU, STAGE_WAIT)?;
    Ok(())
}

pub fn grace_of_stars(m: &mut Mirror<'_>) -> EngineResult<()> {
    let bot = m.bot;
    let buttons = match &m.run.grace_cache {
        Some(cached) => cached.clone(),
        None => {
            let layout = bot.layout();
            let buttons: Vec<Point> = bot
                .config
                .grace_order()?
                .into_iter()
                .map(|g| layout.grace(g))
                .collect();
            m.run.grace_cache = Some(buttons.clone());
            buttons
        }
    };

    debug!(count = buttons.len(), "picking graces");
    for button in buttons {
        bot.click(button)?;
        bot.sleep(0.2);
    }
    bot.click_until(setup::GRACE_CONFIRM, Duration::from_secs(5))?;
    if bot.wait_for(general::CONFIRM, Duration::from_secs(2))? {
        bot.click_matching(general::CONFIRM)?;
    }

    bot.wait_for(setup::GIFT_SELECT, STAGE_WAIT)?;
    Ok(())
}

pub fn gift_selection(m: &mut Mirror<'_>) -> EngineResult<()> {
    let bot = m.bot;
    let geo = bot.geo();
    let status = m.run.status;
    let gift = status.assets().gift;

    let Some(&anchor) = bot.find(setup::GIFT_SELECT)?.first() else {
        debug!("gift list anchor not found");
        return Ok(());
    };

    if !bot.exists(gift)? {
        bot.scroll(geo.scale_1440p(GIFT_LIST.0, GIFT_LIST.1), 5)?;
        bot.sleep(0.5);
    }
    if !bot.click_matching(gift)? {
        warn!(%status, "starting gift not found, taking the default");
    }
    bot.sleep(0.5);

    let offsets = if status == Status::Sinking {
        SINKING_CHOICES
    } else {
        GIFT_CHOICES
    };
    let x = geo.scale_x(Reference::P1440, GIFT_CHOICE_X);
    for dy in offsets {
        bot.click(Point::new(x, anchor.y + geo.scale_y(Reference::P1440, dy)))?;
        bot.sleep(0.3);
    }

    bot.enter()?;
    bot.sleep(1.0);
    bot.dismiss_gift_popups(3)?;
    Ok(())
}
