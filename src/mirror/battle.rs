//! Squad confirmation and the battle loop.

use std::time::Duration;

use tracing::{debug, info, warn};

use super::{events, Mirror};
use crate::assets::{battle, general, mirror, rewards, squad};
use crate::error::EngineResult;
use crate::geometry::{Point, Reference};
use crate::input::Key;
use crate::vision::Query;

const WINRATE_STUCK: Duration = Duration::from_secs(5);
const WINRATE_ABSENT: Duration = Duration::from_secs(10);
const BATTLE_CAP: Duration = Duration::from_secs(30 * 60);
const RELAXED: f32 = 0.7;

/// Clash glyphs above this line (1440p) belong to the enemy side.
const CLASH_MIN_Y: i32 = 1023;
const EGO_HOVER: (i32, i32) = (-55, 100);
const EGO_CLICK: (i32, i32) = (30, 30);
const SANITY_MIN: u8 = 100;

pub fn squad_then_battle(m: &mut Mirror<'_>) -> EngineResult<()> {
    squad_select(m)?;
    battle(m)?;
    check_loading(m)
}

pub fn battle_then_load(m: &mut Mirror<'_>) -> EngineResult<()> {
    battle(m)?;
    check_loading(m)
}

/// Pick sinners once per run, then head into battle.
pub fn squad_select(m: &mut Mirror<'_>) -> EngineResult<()> {
    let bot = m.bot;
    if !m.run.squad_set {
        match bot.config.squad(m.run.status)? {
            Some(sinners) => {
                info!(status = %m.run.status, count = sinners.len(), "setting squad");
                bot.click_matching(squad::CLEAR)?;
                bot.sleep(0.5);
                bot.click_until(general::CONFIRM, Duration::from_secs(2))?;
                bot.sleep(0.5);
                let layout = bot.layout();
                for sinner in sinners {
                    bot.click(layout.sinner(sinner))?;
                    bot.sleep(0.1);
                }
            }
            None => debug!(status = %m.run.status, "no squad order, keeping current squad"),
        }
        m.run.squad_set = true;
    }

    if !bot.click_matching(squad::TO_BATTLE)? {
        bot.click(bot.layout().battle_button)?;
    }
    bot.wait_for(battle::WINRATE, Duration::from_secs(15))?;
    Ok(())
}

/// Drive one battle until it loads out, an event interrupts for good, or the
/// encounter reward shows.
pub fn battle(m: &mut Mirror<'_>) -> EngineResult<()> {
    let bot = m.bot;
    let started = bot.now();
    let mut winrate_since: Option<Duration> = None;
    let mut last_winrate = bot.now();

    loop {
        let now = bot.now();
        if now.saturating_sub(started) > BATTLE_CAP {
            warn!("battle exceeded its time cap");
            bot.release()?;
            return Ok(());
        }

        if bot.exists(general::SERVER_ERROR)? {
            bot.release()?;
            return Ok(());
        }

        if bot.exists(general::LOADING)? && !bot.exists(battle::COG)? {
            bot.release()?;
            if bot.exists(battle::WINRATE)? {
                debug!("loading misread, still in battle");
                winrate_since = None;
                continue;
            }
            return Ok(());
        }

        if bot.exists(crate::assets::events::SKIP)? {
            bot.release()?;
            bot.click_matching(crate::assets::events::SKIP)?;
            bot.sleep(0.5);
            if bot.exists(crate::assets::events::BADGE)? {
                events::battle_check(m)?;
            } else if bot.exists(crate::assets::events::SKILL_CHECK)? {
                bot.click_matching(crate::assets::events::SKILL_CHECK)?;
                events::skill_check(m)?;
            } else {
                bot.click_matching(crate::assets::events::CONTINUE)?;
            }
            continue;
        }

        if bot.exists(battle::WINRATE)? {
            last_winrate = now;
            let since = *winrate_since.get_or_insert(now);
            bot.release()?;
            if now.saturating_sub(since) > WINRATE_STUCK {
                warn!("winrate screen not advancing");
                bot.click_matching(Query::new(battle::WINRATE).threshold(RELAXED))?;
                ego_check(m)?;
                bot.enter()?;
                winrate_since = None;
            } else {
                bot.press(Key::Char('p'))?;
                bot.pause();
                ego_check(m)?;
                bot.enter()?;
                bot.mouse_down(bot.layout().safe_rest)?;
                bot.sleep(1.0);
                if !bot.exists(battle::IN_PROGRESS)? {
                    bot.release()?;
                    bot.rest()?;
                }
            }
            continue;
        }
        winrate_since = None;

        if bot.exists(rewards::ENCOUNTER_REWARD)? {
            bot.release()?;
            return Ok(());
        }
        if bot.first_visible(&[mirror::VICTORY, mirror::DEFEAT])?.is_some() {
            bot.release()?;
            return Ok(());
        }
        if now.saturating_sub(last_winrate) > WINRATE_ABSENT {
            bot.release()?;
            bot.rest()?;
            last_winrate = now;
        }
        bot.sleep(0.5);
    }
}

/// Swap bad clashes for an EGO when one is affordable.
pub fn ego_check(m: &mut Mirror<'_>) -> EngineResult<()> {
    let bot = m.bot;
    if bot.vars().skip_ego_check {
        return Ok(());
    }
    let geo = bot.geo();
    let min_y = geo.scale_y(Reference::P1440, CLASH_MIN_Y);
    let mut clashes = bot.find(battle::HOPELESS)?;
    clashes.extend(bot.find(battle::STRUGGLING)?);
    clashes.retain(|p| p.y > min_y);

    let scaled = |(dx, dy): (i32, i32)| {
        Point::new(geo.scale_x(Reference::P1440, dx), geo.scale_y(Reference::P1440, dy))
    };
    let hover = scaled(EGO_HOVER);
    let click = scaled(EGO_CLICK);

    for clash in clashes {
        debug!(at = %clash, "bad clash");
        bot.mouse_down(clash.offset(hover.x, hover.y))?;
        bot.sleep(1.0);
        let mut usable = Vec::new();
        for icon in bot.find(battle::SANITY)? {
            if bot.luminance(icon)? > SANITY_MIN {
                usable.push(icon);
            }
        }
        bot.release()?;
        match bot.pick(&usable) {
            Some(ego) => {
                let target = ego.offset(click.x, click.y);
                bot.click(target)?;
                bot.sleep(0.5);
                bot.click(target)?;
            }
            None => bot.rest()?,
        }
    }

    for _ in 0..3 {
        bot.press(Key::Char('p'))?;
        bot.pause();
    }
    Ok(())
}

/// Sit out the loading screen that follows a battle.
pub fn check_loading(m: &mut Mirror<'_>) -> EngineResult<()> {
    let bot = m.bot;
    bot.release()?;
    if bot.wait_for(general::LOADING, Duration::from_secs(3))? {
        bot.wait_gone(general::LOADING, Duration::from_secs(30))?;
        bot.sleep(1.0);
    }
    Ok(())
}
