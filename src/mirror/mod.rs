//! Mirror router
//!
//! One run is `setup` followed by repeated `step` calls. Each step classifies
//! the screen against [`ROUTES`] (first match wins), runs that handler, then
//! probes for the end-of-run screens.

pub mod battle;
pub mod events;
pub mod navigation;
pub mod packs;
pub mod restshop;
pub mod rewards;
pub mod setup;

use std::time::Duration;

use tracing::{debug, info, trace};

use crate::assets::{general, mirror};
use crate::bot::Bot;
use crate::config::Floor;
use crate::error::{EngineError, EngineResult};
use crate::geometry::Point;
use crate::status::Status;
use crate::vision::Query;

/// Per-run state, dropped when the run ends.
#[derive(Debug, Clone, PartialEq)]
pub struct RunState {
    pub status: Status,
    /// Sinners were picked once this run; later squad screens keep them.
    pub squad_set: bool,
    pub grace_cache: Option<Vec<Point>>,
    pub floor: Option<Floor>,
    pub resumed: bool,
    pub won: Option<bool>,
}

impl RunState {
    pub fn new(status: Status) -> Self {
        Self {
            status,
            squad_set: false,
            grace_cache: None,
            floor: None,
            resumed: false,
            won: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StepOutcome {
    pub win: bool,
    pub done: bool,
}

pub struct Mirror<'b> {
    pub bot: &'b Bot,
    pub run: RunState,
}

pub type Handler = fn(&mut Mirror<'_>) -> EngineResult<()>;

/// A screen the router recognizes and what to do about it.
pub struct Route {
    pub name: &'static str,
    pub template: &'static str,
    pub threshold: f32,
    pub handler: Handler,
}

/// Screen classifiers in priority order.
pub static ROUTES: [Route; 11] = [
    Route { name: "maintenance", template: general::MAINTENANCE, threshold: 0.8, handler: maintenance },
    Route { name: "event", template: crate::assets::events::SKIP, threshold: 0.8, handler: events::event_choice },
    Route { name: "navigation", template: mirror::DANTEH, threshold: 0.8, handler: navigation::navigate },
    Route { name: "squad", template: crate::assets::squad::CLEAR, threshold: 0.8, handler: battle::squad_then_battle },
    Route { name: "rest_shop", template: crate::assets::restshop::SHOP, threshold: 0.8, handler: restshop::rest_shop },
    Route { name: "gift_get", template: mirror::EGO_GIFT_GET, threshold: 0.8, handler: dismiss_gift },
    Route { name: "reward", template: crate::assets::rewards::REWARD_SELECT, threshold: 0.8, handler: rewards::reward_select },
    Route { name: "encounter_reward", template: crate::assets::rewards::ENCOUNTER_REWARD, threshold: 0.8, handler: rewards::encounter_reward_select },
    Route { name: "pack", template: crate::assets::packs::INPACK, threshold: 0.8, handler: packs::pack_selection },
    Route { name: "battle", template: crate::assets::battle::WINRATE, threshold: 0.8, handler: battle::battle_then_load },
    Route { name: "event_effect", template: mirror::EVENT_EFFECT, threshold: 0.8, handler: event_effect },
];

const SETTLE: Duration = Duration::from_secs(15);
const POST_SCREEN: Duration = Duration::from_secs(10);

impl<'b> Mirror<'b> {
    pub fn new(bot: &'b Bot, status: Status) -> Self {
        Self {
            bot,
            run: RunState::new(status),
        }
    }

    pub fn status(&self) -> Status {
        self.run.status
    }

    /// First route whose template is on screen.
    pub fn classify(&self) -> EngineResult<Option<&'static Route>> {
        for route in ROUTES.iter() {
            if self.bot.exists(Query::new(route.template).threshold(route.threshold))? {
                return Ok(Some(route));
            }
        }
        Ok(None)
    }

    /// Enter the dungeon and run whichever pre-run stages are on screen.
    pub fn setup(&mut self) -> EngineResult<()> {
        setup::enter(self)?;
        self.bot.wait_any(
            &[
                crate::assets::setup::SQUAD_MENU,
                crate::assets::setup::GRACE_MENU,
                crate::assets::setup::GIFT_SELECT,
                mirror::DANTEH,
                crate::assets::packs::INPACK,
                crate::assets::events::SKIP,
                crate::assets::battle::WINRATE,
            ],
            SETTLE,
        )?;

        if self.bot.exists(crate::assets::setup::SQUAD_MENU)? {
            setup::initial_squad_selection(self)?;
        }
        if self.bot.exists(crate::assets::setup::GRACE_MENU)? {
            setup::grace_of_stars(self)?;
        }
        if self.bot.exists(crate::assets::setup::GIFT_SELECT)? {
            setup::gift_selection(self)?;
        }
        Ok(())
    }

    /// One classify-and-handle tick, then the end-of-run probe.
    pub fn step(&mut self) -> EngineResult<StepOutcome> {
        match self.classify()? {
            Some(route) => {
                debug!(route = route.name, status = %self.run.status, "dispatch");
                (route.handler)(self)?;
            }
            None => trace!("no known screen"),
        }
        self.probe_end()
    }

    fn probe_end(&mut self) -> EngineResult<StepOutcome> {
        if self.bot.exists(mirror::VICTORY)? {
            return self.finish_run(true);
        }
        if self.bot.exists(mirror::DEFEAT)? {
            return self.finish_run(false);
        }
        Ok(StepOutcome::default())
    }

    /// Dismiss the victory/defeat screens. Done only once the indicator is gone.
    fn finish_run(&mut self, won: bool) -> EngineResult<StepOutcome> {
        let bot = self.bot;
        let indicator = if won { mirror::VICTORY } else { mirror::DEFEAT };
        info!(won, status = %self.run.status, "run over, claiming");

        if !bot.click_matching(indicator)? {
            bot.enter()?;
        }
        bot.sleep(1.0);

        let exit = if won { mirror::CLAIM_REWARDS } else { mirror::GIVE_UP };
        if bot.click_until(exit, POST_SCREEN)? {
            bot.click_until(general::CONFIRM, Duration::from_secs(5))?;
        }
        setup::dismiss_prompts(bot)?;

        let done = bot.wait_gone(indicator, POST_SCREEN)?;
        if done {
            self.run.won = Some(won);
        }
        Ok(StepOutcome { win: won, done })
    }
}

fn maintenance(m: &mut Mirror<'_>) -> EngineResult<()> {
    m.bot.click_matching(general::CLOSE)?;
    m.bot.events.maintenance();
    Err(EngineError::Maintenance)
}

fn dismiss_gift(m: &mut Mirror<'_>) -> EngineResult<()> {
    m.bot.enter()?;
    m.bot.sleep(0.5);
    Ok(())
}

/// Event-effect prompt: any option will do.
fn event_effect(m: &mut Mirror<'_>) -> EngineResult<()> {
    let options = m.bot.find(mirror::EVENT_EFFECT_OPTION)?;
    if let Some(choice) = m.bot.pick(&options) {
        m.bot.click(choice)?;
        m.bot.sleep(0.5);
    }
    m.bot.click_until(general::CONFIRM, Duration::from_secs(3))?;
    m.bot.sleep(1.0);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigStore;
    use crate::geometry::Geometry;
    use crate::mock::{Edit, Stage, Trigger};
    use std::sync::Arc;

    fn stage() -> (tempfile::TempDir, Stage, Bot) {
        let dir = tempfile::tempdir().unwrap();
        let stage = Stage::new(Geometry::new(2560, 1440));
        let bot = stage.bot(Arc::new(ConfigStore::new(dir.path())));
        (dir, stage, bot)
    }

    #[test]
    fn test_route_priority_order() {
        let names: Vec<_> = ROUTES.iter().map(|r| r.name).collect();
        assert_eq!(
            names,
            vec![
                "maintenance",
                "event",
                "navigation",
                "squad",
                "rest_shop",
                "gift_get",
                "reward",
                "encounter_reward",
                "pack",
                "battle",
                "event_effect"
            ]
        );
    }

    #[test]
    fn test_first_match_wins() {
        let (_dir, stage, bot) = stage();
        stage.show(mirror::DANTEH, Point::new(500, 500));
        stage.show(crate::assets::battle::WINRATE, Point::new(900, 900));
        let m = Mirror::new(&bot, Status::Burn);
        assert_eq!(m.classify().unwrap().map(|r| r.name), Some("navigation"));

        stage.show(crate::assets::events::SKIP, Point::new(100, 100));
        assert_eq!(m.classify().unwrap().map(|r| r.name), Some("event"));
    }

    #[test]
    fn test_maintenance_is_fatal() {
        let (_dir, stage, bot) = stage();
        stage.show(general::MAINTENANCE, Point::new(1280, 720));
        let mut m = Mirror::new(&bot, Status::Burn);
        assert!(matches!(m.step(), Err(EngineError::Maintenance)));
    }

    #[test]
    fn test_step_reports_done_after_post_screen() {
        let (_dir, stage, bot) = stage();
        stage.show(mirror::VICTORY, Point::new(1280, 400));
        stage.once(
            Trigger::ClickOn(mirror::VICTORY.into()),
            vec![Edit::hide(mirror::VICTORY), Edit::show(mirror::CLAIM_REWARDS, Point::new(1280, 1200))],
        );
        stage.once(
            Trigger::ClickOn(mirror::CLAIM_REWARDS.into()),
            vec![Edit::hide(mirror::CLAIM_REWARDS), Edit::show(general::CONFIRM, Point::new(1400, 1000))],
        );
        stage.once(Trigger::ClickOn(general::CONFIRM.into()), vec![Edit::hide(general::CONFIRM)]);

        let mut m = Mirror::new(&bot, Status::Burn);
        let outcome = m.step().unwrap();
        assert_eq!(outcome, StepOutcome { win: true, done: true });
        assert_eq!(m.run.won, Some(true));
        assert_eq!(stage.clicks().len(), 3);
    }

    #[test]
    fn test_idle_step_is_not_done() {
        let (_dir, _stage, bot) = stage();
        let mut m = Mirror::new(&bot, Status::Poise);
        assert_eq!(m.step().unwrap(), StepOutcome::default());
    }
}
