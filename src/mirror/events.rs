//! Event screens, skill checks and the named battle-gated encounters.

use std::time::Duration;

use tracing::{debug, info, warn};

use super::{battle, Mirror};
use crate::assets::{encounters, events};
use crate::error::EngineResult;
use crate::vision::Query;

const CHANCE_THRESHOLD: f32 = 0.9;
/// Click target (1440p) that advances result text without hitting a button.
const STABLE: (i32, i32) = (1280, 1240);
/// Choice list scroll target (1440p).
const CHOICE_LIST: (i32, i32) = (1700, 900);
const RESOLVE_TIMEOUT: Duration = Duration::from_secs(60);
const MAX_CHAINED_CHECKS: usize = 5;
const DIM: u8 = 70;

/// Whether [`battle_check`] took care of the screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encounter {
    Handled,
    Unhandled,
}

/// Reward choices, checked before the known-answer events.
const GAIN_CHOICES: [&str; 5] = [
    events::LEVEL_UP,
    events::SELECT_GAIN,
    events::PASS_GAIN_EGO,
    events::PASS_GAIN_CHECK,
    events::PROCEED_GAIN,
];

/// Everything else that leads to a skill check or a reward.
const OTHER_CHOICES: [&str; 4] = [
    events::WIN_BATTLE,
    events::SKILL_CHECK,
    events::KQE,
    events::SLOT_MACHINE,
];

pub fn event_choice(m: &mut Mirror<'_>) -> EngineResult<()> {
    let bot = m.bot;
    skip_text(m)?;

    if let Some(choice) = bot.first_visible(&GAIN_CHOICES)? {
        debug!(choice, "event choice");
        bot.click_matching(choice)?;
        return follow_up(m);
    }

    if bot.first_visible(&[events::HELTERFLY, events::MIDWINTER])?.is_some() {
        debug!("known event, answer is on the right");
        bot.click_matching(events::SELECT_RIGHT)?;
        return follow_up(m);
    }

    if let Some(choice) = bot.first_visible(&OTHER_CHOICES)? {
        debug!(choice, "event choice");
        bot.click_matching(choice)?;
        return follow_up(m);
    }

    if bot.click_matching(events::PROCEED)? || bot.click_matching(events::CONTINUE)? {
        bot.sleep(1.0);
        return Ok(());
    }

    if battle_check(m)? == Encounter::Unhandled {
        battle::battle(m)?;
    }
    Ok(())
}

/// Click through event text.
fn skip_text(m: &Mirror<'_>) -> EngineResult<()> {
    for _ in 0..3 {
        if !m.bot.click_matching(events::SKIP)? {
            break;
        }
        m.bot.sleep(0.3);
    }
    Ok(())
}

/// After a choice: a skill check if one opened, else collect the result.
fn follow_up(m: &mut Mirror<'_>) -> EngineResult<()> {
    let bot = m.bot;
    bot.sleep(1.0);
    skip_text(m)?;
    if bot.first_visible(&events::CHANCES)?.is_some() {
        return skill_check(m);
    }
    if bot.click_matching(events::COMMENCE_BATTLE)? {
        return Ok(());
    }
    if bot.click_matching(events::PROCEED)? || bot.click_matching(events::CONTINUE)? {
        bot.sleep(0.5);
    }
    bot.dismiss_gift_popups(1)?;
    Ok(())
}

pub fn skill_check(m: &mut Mirror<'_>) -> EngineResult<()> {
    let mut depth = 0;
    loop {
        let chained = run_check(m)?;
        depth += 1;
        if !chained || depth >= MAX_CHAINED_CHECKS {
            if chained {
                warn!(depth, "skill checks keep chaining, returning to router");
            }
            return Ok(());
        }
    }
}

/// One skill check. True when another one follows.
fn run_check(m: &mut Mirror<'_>) -> EngineResult<bool> {
    let bot = m.bot;
    skip_text(m)?;

    let mut picked = None;
    for chance in events::CHANCES {
        if bot.click_matching(Query::new(chance).threshold(CHANCE_THRESHOLD))? {
            picked = Some(chance);
            break;
        }
    }
    let Some(chance) = picked else {
        debug!("no success chance on screen");
        return Ok(false);
    };
    info!(chance, "skill check");

    bot.click_until(events::COMMENCE, Duration::from_secs(3))?;
    bot.sleep(3.0);
    bot.click_1440(STABLE.0, STABLE.1)?;

    let deadline = bot.now() + RESOLVE_TIMEOUT;
    loop {
        if bot.click_matching(events::PROCEED)?
            || bot.click_matching(events::CONTINUE)?
            || bot.click_matching(events::COMMENCE_BATTLE)?
        {
            break;
        }
        if bot.now() >= deadline {
            warn!("skill check result never resolved");
            break;
        }
        bot.click_1440(STABLE.0, STABLE.1)?;
        bot.sleep(1.0);
    }
    bot.sleep(1.0);

    if bot.exists(events::SKIP)? {
        return Ok(true);
    }
    if bot.exists(events::VIOLET_HP)? {
        bot.click_until(events::CONTINUE, Duration::from_secs(5))?;
        return Ok(false);
    }
    bot.dismiss_gift_popups(1)?;
    Ok(false)
}

/// The five named encounters that would otherwise look like a plain battle.
pub fn battle_check(m: &mut Mirror<'_>) -> EngineResult<Encounter> {
    let bot = m.bot;

    if bot.exists(encounters::WOPPILY)? {
        info!("woppily");
        if !bot.click_matching(encounters::INVESTIGATE)? {
            bot.click_matching(encounters::NO)?;
        }
        follow_up(m)?;
        return Ok(Encounter::Handled);
    }

    if bot.exists(encounters::PINK_SHOES)? {
        info!("pink shoes");
        bot.click_matching(encounters::REFUSE)?;
        follow_up(m)?;
        return Ok(Encounter::Handled);
    }

    if bot.exists(encounters::HOHENHEIM)? {
        info!("hohenheim");
        if !bot.click_matching(encounters::SHIELD_PASSIVE)? && !bot.click_matching(encounters::POISE_PASSIVE)? {
            bot.scroll(bot.geo().scale_1440p(CHOICE_LIST.0, CHOICE_LIST.1), 5)?;
            bot.sleep(0.5);
            bot.click_matching(encounters::SP_PASSIVE)?;
        }
        follow_up(m)?;
        return Ok(Encounter::Handled);
    }

    if let Some(&anchor) = bot.find(encounters::DOOMSDAY)?.first() {
        info!("doomsday clock");
        if bot.luminance(anchor)? < DIM {
            bot.click_matching(encounters::OFFER_CLAY)?;
            follow_up(m)?;
        } else {
            bot.click_matching(encounters::OFFER_SINNER)?;
            bot.sleep(1.0);
            skill_check(m)?;
        }
        return Ok(Encounter::Handled);
    }

    if bot.exists(encounters::TEDDY)? {
        info!("teddy bear");
        bot.click_matching(encounters::HUG_BEAR)?;
        bot.sleep(0.5);
        bot.click_until(events::PROCEED, Duration::from_secs(3))?;
        bot.sleep(1.0);
        skill_check(m)?;
        return Ok(Encounter::Handled);
    }

    Ok(Encounter::Unhandled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bot::Bot;
    use crate::config::ConfigStore;
    use crate::geometry::{Geometry, Point};
    use crate::mock::{Edit, Stage, Trigger};
    use crate::status::Status;
    use std::sync::Arc;

    fn stage() -> (tempfile::TempDir, Stage, Bot) {
        let dir = tempfile::tempdir().unwrap();
        let stage = Stage::new(Geometry::new(2560, 1440));
        let bot = stage.bot(Arc::new(ConfigStore::new(dir.path())));
        (dir, stage, bot)
    }

    #[test]
    fn test_skill_check_takes_best_chance() {
        let (_dir, stage, bot) = stage();
        stage.show(events::LOW, Point::new(1600, 900));
        stage.show(events::HIGH, Point::new(1600, 600));
        stage.show(events::COMMENCE, Point::new(2000, 1200));
        stage.once(
            Trigger::ClickOn(events::COMMENCE.into()),
            vec![
                Edit::hide(events::LOW),
                Edit::hide(events::HIGH),
                Edit::hide(events::COMMENCE),
                Edit::show(events::PROCEED, Point::new(2000, 1300)),
            ],
        );
        stage.once(Trigger::ClickOn(events::PROCEED.into()), vec![Edit::hide(events::PROCEED)]);

        let mut m = Mirror::new(&bot, Status::Burn);
        skill_check(&mut m).unwrap();
        let clicks = stage.clicks();
        assert_eq!(clicks[0], Point::new(1600, 600));
        assert_eq!(clicks[1], Point::new(2000, 1200));
        assert_eq!(*clicks.last().unwrap(), Point::new(2000, 1300));
    }

    #[test]
    fn test_known_event_picks_right_answer() {
        let (_dir, stage, bot) = stage();
        stage.show(events::HELTERFLY, Point::new(600, 400));
        stage.show(events::SELECT_RIGHT, Point::new(1900, 700));
        stage.show(events::WIN_BATTLE, Point::new(1900, 900));
        let mut m = Mirror::new(&bot, Status::Burn);
        event_choice(&mut m).unwrap();
        assert_eq!(stage.clicks().first(), Some(&Point::new(1900, 700)));
    }

    #[test]
    fn test_gain_choices_come_before_known_answers() {
        let (_dir, stage, bot) = stage();
        stage.show(events::MIDWINTER, Point::new(600, 400));
        stage.show(events::SELECT_RIGHT, Point::new(1900, 700));
        stage.show(events::PROCEED_GAIN, Point::new(1900, 900));
        let mut m = Mirror::new(&bot, Status::Burn);
        event_choice(&mut m).unwrap();
        assert_eq!(stage.clicks().first(), Some(&Point::new(1900, 900)));
        assert!(!stage.clicks().contains(&Point::new(1900, 700)));
    }

    #[test]
    fn test_unknown_encounter_is_unhandled() {
        let (_dir, _stage, bot) = stage();
        let mut m = Mirror::new(&bot, Status::Burn);
        assert_eq!(battle_check(&mut m).unwrap(), Encounter::Unhandled);
    }

    #[test]
    fn test_pink_shoes_refused() {
        let (_dir, stage, bot) = stage();
        stage.show(encounters::PINK_SHOES, Point::new(600, 400));
        stage.show(encounters::REFUSE, Point::new(1900, 800));
        let mut m = Mirror::new(&bot, Status::Burn);
        assert_eq!(battle_check(&mut m).unwrap(), Encounter::Handled);
        assert_eq!(stage.clicks(), vec![Point::new(1900, 800)]);
    }
}
