//! Post-floor reward screens.

use std::time::Duration;

use tracing::{debug, info};

use super::Mirror;
use crate::assets::{general, rewards};
use crate::error::EngineResult;

pub fn reward_select(m: &mut Mirror<'_>) -> EngineResult<()> {
    let bot = m.bot;
    let gifts = bot.find(rewards::EGO_GIFT)?;

    let choice = if gifts.len() == 3 {
        match bot.find(m.run.status.assets().reward)?.first() {
            Some(&p) => Some(p),
            None => bot.pick(&gifts),
        }
    } else {
        gifts.first().copied()
    };

    match choice {
        Some(p) => {
            debug!(at = %p, offered = gifts.len(), "taking reward");
            bot.click(p)?;
            bot.sleep(0.5);
        }
        None => debug!("no gift reward on offer"),
    }

    bot.enter()?;
    bot.sleep(1.0);
    bot.enter()?;
    Ok(())
}

pub fn encounter_reward_select(m: &mut Mirror<'_>) -> EngineResult<()> {
    let bot = m.bot;
    let Some(chosen) = bot.first_visible(&rewards::ENCOUNTER_ORDER)? else {
        debug!("encounter reward screen without a known reward");
        return Ok(());
    };
    info!(reward = chosen, "encounter reward");
    bot.click_matching(chosen)?;
    bot.sleep(0.5);
    bot.click_until(general::CONFIRM, Duration::from_secs(3))?;
    bot.sleep(1.0);

    // some rewards ask twice
    if bot.click_matching(general::CONFIRM)? {
        bot.sleep(0.5);
    }
    bot.dismiss_gift_popups(1)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bot::Bot;
    use crate::config::ConfigStore;
    use crate::geometry::{Geometry, Point};
    use crate::input::Key;
    use crate::mock::Stage;
    use crate::status::Status;
    use std::sync::Arc;

    fn stage() -> (tempfile::TempDir, Stage, Bot) {
        let dir = tempfile::tempdir().unwrap();
        let stage = Stage::new(Geometry::new(2560, 1440));
        let bot = stage.bot(Arc::new(ConfigStore::new(dir.path())));
        (dir, stage, bot)
    }

    #[test]
    fn test_status_reward_preferred_among_three() {
        let (_dir, stage, bot) = stage();
        for x in [800, 1280, 1760] {
            stage.show(rewards::EGO_GIFT, Point::new(x, 700));
        }
        stage.show(Status::Bleed.assets().reward, Point::new(1760, 760));
        let mut m = Mirror::new(&bot, Status::Bleed);
        reward_select(&mut m).unwrap();
        assert_eq!(stage.clicks(), vec![Point::new(1760, 760)]);
        assert_eq!(stage.keys(), vec![Key::Enter, Key::Enter]);
    }

    #[test]
    fn test_encounter_reward_order() {
        let (_dir, stage, bot) = stage();
        stage.show(rewards::RESOURCE, Point::new(500, 700));
        stage.show(rewards::COST, Point::new(1500, 700));
        let mut m = Mirror::new(&bot, Status::Burn);
        encounter_reward_select(&mut m).unwrap();
        assert_eq!(stage.clicks().first(), Some(&Point::new(1500, 700)));
    }
}
