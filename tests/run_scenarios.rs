//! End-to-end runs against the scripted stage.
//!
//! Each test scripts the screens a real session would see and asserts on the
//! recorded input.

use std::sync::Arc;

use mirror_runner::assets::{battle, general, mirror, nav, packs, restshop, setup, squad};
use mirror_runner::config::{ConfigStore, Floor, Grace, Sinner};
use mirror_runner::connection::Latch;
use mirror_runner::engine::{self, run_engine, RunOutcome};
use mirror_runner::error::EngineError;
use mirror_runner::geometry::{Geometry, Point, Rect};
use mirror_runner::input::Key;
use mirror_runner::mirror::Mirror;
use mirror_runner::mock::{Action, Edit, Reachable, Stage, Trigger};
use mirror_runner::status::Status;
use mirror_runner::Bot;

fn world(files: &[(&str, &str)]) -> (tempfile::TempDir, Stage, Bot) {
    let dir = tempfile::tempdir().unwrap();
    for (name, body) in files {
        std::fs::write(dir.path().join(format!("{}.json", name)), body).unwrap();
    }
    let stage = Stage::new(Geometry::new(2560, 1440));
    let bot = stage.bot(Arc::new(ConfigStore::new(dir.path())));
    (dir, stage, bot)
}

fn near(p: Point) -> Rect {
    Rect::around(p, 10, 10)
}

#[test]
fn fresh_burn_run_is_won() {
    let (dir, stage, mut bot) = world(&[
        ("status_selection", r#"{"1": "burn"}"#),
        ("squad_order", r#"{"burn": {"yisang": 1, "faust": 2}}"#),
        (
            "grace_selection",
            r#"{"order": {"levels": 1, "stats": 2, "themes": 3, "cost+gift": 4, "generalist": 5}}"#,
        ),
    ]);
    let burn = Status::Burn.assets();
    let safe_rest = bot.layout().safe_rest;

    // entry
    stage.show(mirror::ENTER, Point::new(1280, 1000));
    stage.once(
        Trigger::ClickOn(mirror::ENTER.into()),
        vec![Edit::hide(mirror::ENTER), Edit::show(setup::SQUAD_MENU, Point::new(1280, 100))],
    );
    // the burn squad only shows after one scroll window
    stage.once(
        Trigger::Probed(burn.squad.into(), 2),
        vec![Edit::show(burn.squad, Point::new(300, 900))],
    );
    stage.once(
        Trigger::ClickOn(burn.squad.into()),
        vec![
            Edit::hide(setup::SQUAD_MENU),
            Edit::show(setup::GRACE_MENU, Point::new(1280, 100)),
            Edit::show(setup::GRACE_CONFIRM, Point::new(2300, 1350)),
        ],
    );
    stage.once(
        Trigger::ClickOn(setup::GRACE_CONFIRM.into()),
        vec![
            Edit::hide(setup::GRACE_MENU),
            Edit::hide(setup::GRACE_CONFIRM),
            Edit::show(setup::GIFT_SELECT, Point::new(1280, 300)),
            Edit::show(burn.gift, Point::new(800, 600)),
        ],
    );
    stage.once(
        Trigger::ClickOn(burn.gift.into()),
        vec![
            Edit::hide(setup::GIFT_SELECT),
            Edit::hide(burn.gift),
            Edit::show(packs::INPACK, Point::new(1280, 100)),
            Edit::show(packs::FLOORS[0], Point::new(200, 100)),
            Edit::show(burn.pack, Point::new(1000, 700)),
        ],
    );
    // the pack drag lands us on the squad screen
    stage.once(
        Trigger::Probed(mirror::VICTORY.into(), 1),
        vec![
            Edit::hide(packs::INPACK),
            Edit::hide(burn.pack),
            Edit::show(squad::CLEAR, Point::new(2000, 1200)),
            Edit::show(squad::TO_BATTLE, Point::new(2165, 1345)),
        ],
    );
    stage.once(
        Trigger::ClickOn(squad::TO_BATTLE.into()),
        vec![
            Edit::hide(squad::CLEAR),
            Edit::hide(squad::TO_BATTLE),
            Edit::show(battle::WINRATE, Point::new(2200, 1300)),
        ],
    );
    stage.once(
        Trigger::ClickIn(near(safe_rest)),
        vec![Edit::hide(battle::WINRATE), Edit::show(mirror::VICTORY, Point::new(1280, 400))],
    );
    stage.once(
        Trigger::ClickOn(mirror::VICTORY.into()),
        vec![Edit::hide(mirror::VICTORY), Edit::show(mirror::CLAIM_REWARDS, Point::new(1280, 1200))],
    );
    stage.once(
        Trigger::ClickOn(mirror::CLAIM_REWARDS.into()),
        vec![Edit::hide(mirror::CLAIM_REWARDS), Edit::show(general::CONFIRM, Point::new(1400, 1000))],
    );
    stage.once(Trigger::ClickOn(general::CONFIRM.into()), vec![Edit::hide(general::CONFIRM)]);

    let errors = dir.path().join("error");
    let mut seen = Vec::new();
    let report = run_engine(&mut bot, 1, &errors, |state| seen.push(state.runs_done));

    assert!(report.fatal.is_none());
    assert_eq!(report.exit_code(), 0);
    assert_eq!((report.state.wins, report.state.losses, report.state.errored), (1, 0, 0));
    assert_eq!(report.state.history[0].status, Status::Burn);
    assert_eq!(report.state.history[0].outcome, RunOutcome::Won);
    assert_eq!(seen, vec![1]);

    let actions = stage.actions();
    let squad_click = actions
        .iter()
        .position(|a| *a == Action::Click(Point::new(300, 900)))
        .unwrap();
    assert!(actions[..squad_click]
        .iter()
        .any(|a| matches!(a, Action::Scroll(_, 7))));

    let layout = bot.layout();
    let graces: Vec<Point> = [Grace::Levels, Grace::Stats, Grace::Themes, Grace::CostGift, Grace::Generalist]
        .iter()
        .map(|&g| layout.grace(g))
        .collect();
    let clicks = stage.clicks();
    let grace_clicks: Vec<Point> = clicks.iter().copied().filter(|p| graces.contains(p)).collect();
    assert_eq!(grace_clicks, graces);

    assert!(actions.contains(&Action::Down(Point::new(1000, 350))));
    assert!(actions.contains(&Action::Up(Point::new(1000, 700))));
    assert_eq!(clicks.iter().filter(|&&p| p == layout.sinner(Sinner::Yisang)).count(), 1);
    assert!(stage.snapshots().is_empty());
    assert!(!bot.input.is_held());
}

#[test]
fn resumed_run_goes_straight_to_navigation() {
    let (_dir, stage, bot) = world(&[("squad_order", r#"{"burn": {"yisang": 1}}"#)]);
    stage.show(mirror::RESUME, Point::new(1280, 900));
    stage.once(
        Trigger::ClickOn(mirror::RESUME.into()),
        vec![
            Edit::hide(mirror::RESUME),
            Edit::show(mirror::DANTEH, Point::new(1000, 700)),
            Edit::show(nav::NODE, Point::new(1440, 263)),
        ],
    );
    stage.once(
        Trigger::ClickIn(near(Point::new(1440, 263))),
        vec![Edit::hide(mirror::DANTEH), Edit::show(nav::NAV_ENTER, Point::new(2200, 1300))],
    );

    let mut m = Mirror::new(&bot, Status::Burn);
    m.setup().unwrap();
    assert!(m.run.resumed);
    assert!(stage.keys().is_empty());
    assert_eq!(m.classify().unwrap().map(|r| r.name), Some("navigation"));

    let outcome = m.step().unwrap();
    assert!(!outcome.done);
    assert_eq!(
        stage.clicks(),
        vec![Point::new(1280, 900), Point::new(1440, 263), Point::new(2200, 1300)]
    );
    assert_eq!(stage.probes(setup::GRACE_CONFIRM), 0);
    assert!(m.run.grace_cache.is_none());
}

#[test]
fn server_error_mid_battle_reconnects_and_keeps_squad() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("squad_order.json"),
        r#"{"burn": {"yisang": 1, "faust": 2}}"#,
    )
    .unwrap();
    let stage = Stage::new(Geometry::new(2560, 1440));
    let gate = Arc::new(Latch::new(true));
    let bot = stage.bot_with(
        Arc::new(ConfigStore::new(dir.path())),
        Arc::clone(&gate),
        Arc::new(Reachable),
    );
    let safe_rest = bot.layout().safe_rest;
    let retry = Point::new(1280, 800);

    stage.show(squad::CLEAR, Point::new(2000, 1200));
    stage.show(squad::TO_BATTLE, Point::new(2165, 1345));
    stage.always(
        Trigger::ClickOn(squad::TO_BATTLE.into()),
        vec![
            Edit::hide(squad::CLEAR),
            Edit::hide(squad::TO_BATTLE),
            Edit::show(battle::WINRATE, Point::new(2200, 1300)),
        ],
    );
    stage.once(
        Trigger::ClickIn(near(safe_rest)),
        vec![Edit::show(general::SERVER_ERROR, Point::new(1280, 600)), Edit::show(general::RETRY, retry)],
    );
    stage.once(
        Trigger::ClickOn(general::RETRY.into()),
        vec![Edit::hide(general::SERVER_ERROR), Edit::hide(general::RETRY)],
    );

    let mut m = Mirror::new(&bot, Status::Burn);
    m.step().unwrap();
    assert!(m.run.squad_set);
    assert!(stage.is_visible(general::SERVER_ERROR));
    assert!(!bot.input.is_held());

    engine::supervise(&bot).unwrap();
    assert!(gate.is_set());
    assert!(!stage.is_visible(general::SERVER_ERROR));
    assert!(stage.clicks().contains(&retry));

    // back on the squad screen after the reconnect; the battle ends this time
    stage.hide(battle::WINRATE);
    stage.show(squad::CLEAR, Point::new(2000, 1200));
    stage.show(squad::TO_BATTLE, Point::new(2165, 1345));
    stage.once(
        Trigger::ClickIn(near(safe_rest)),
        vec![
            Edit::hide(battle::WINRATE),
            Edit::show(mirror_runner::assets::rewards::ENCOUNTER_REWARD, Point::new(1280, 300)),
        ],
    );
    m.step().unwrap();

    let layout = bot.layout();
    let clicks = stage.clicks();
    assert_eq!(clicks.iter().filter(|&&p| p == layout.sinner(Sinner::Yisang)).count(), 1);
    assert_eq!(clicks.iter().filter(|&&p| p == layout.sinner(Sinner::Faust)).count(), 1);
    assert_eq!(clicks.iter().filter(|&&p| p == Point::new(2165, 1345)).count(), 2);
    assert!(!bot.input.is_held());
}

#[test]
fn floor_four_exception_refreshes_once() {
    let (_dir, stage, bot) = world(&[("pack_exceptions", r#"{"floor4": ["wrath"]}"#)]);
    let floor = Floor::new(4).unwrap();
    let wrath = packs::named(floor, "wrath");
    let refresh = Point::new(2300, 200);
    let burn_pack = Status::Burn.assets().pack;

    stage.show(packs::INPACK, Point::new(1280, 100));
    stage.show(packs::FLOORS[3], Point::new(200, 100));
    stage.show(packs::REFRESH, refresh);
    stage.show(&wrath, Point::new(900, 700));
    stage.once(
        Trigger::ClickOn(packs::REFRESH.into()),
        vec![
            Edit::hide(&wrath),
            Edit::Luminance(refresh, 30),
            Edit::show(burn_pack, Point::new(1500, 700)),
        ],
    );

    let mut m = Mirror::new(&bot, Status::Burn);
    m.step().unwrap();

    assert_eq!(stage.clicks_in(near(refresh)), 1);
    assert_eq!(m.run.floor, Some(floor));
    let actions = stage.actions();
    assert!(actions.contains(&Action::Down(Point::new(1500, 350))));
    assert!(actions.contains(&Action::Up(Point::new(1500, 700))));
    assert!(!actions.iter().any(|a| matches!(a, Action::Down(p) if p.x == 900)));
}

#[test]
fn fusion_skips_masked_gifts_and_never_fuses_two() {
    let (_dir, stage, bot) = world(&[
        (
            "gui_config",
            r#"{"SharedVars": {"skip_sinner_healing": true, "skip_ego_enhancing": true, "skip_ego_buying": true}}"#,
        ),
        ("fusion_exceptions", r#"["protected"]"#),
    ]);
    let open = Point::new(1500, 300);
    let masked = [Point::new(1700, 300), Point::new(1900, 300)];
    let vestige = Point::new(1500, 600);
    let fuse_confirm = Point::new(2000, 1300);

    stage.show(restshop::SHOP, Point::new(200, 200));
    stage.show(restshop::FUSE, Point::new(400, 1200));
    stage.show(restshop::LEAVE, Point::new(2300, 1300));
    stage.show(restshop::FUSE_CONFIRM, fuse_confirm);
    stage.once(
        Trigger::ClickOn(restshop::FUSE.into()),
        vec![
            Edit::show(restshop::FUSE_MENU, Point::new(1280, 100)),
            Edit::show(Status::Bleed.assets().fusion_gift, open),
            Edit::show(Status::Tremor.assets().fusion_gift, masked[0]),
            Edit::show(Status::Rupture.assets().fusion_gift, masked[1]),
            Edit::show(restshop::VESTIGE, vestige),
        ],
    );
    stage.show_rect(&restshop::fusion_exception("protected"), Rect::new(1650, 250, 1950, 350));

    let mut m = Mirror::new(&bot, Status::Burn);
    assert_eq!(m.classify().unwrap().map(|r| r.name), Some("rest_shop"));
    m.step().unwrap();

    let clicks = stage.clicks();
    assert!(clicks.contains(&open));
    assert!(clicks.contains(&vestige));
    assert!(!clicks.iter().any(|p| masked.contains(p)));
    assert!(!clicks.contains(&fuse_confirm));
    assert!(clicks.contains(&Point::new(2300, 1300)));
    assert!(stage.keys().contains(&Key::Escape));
}

#[test]
fn rotation_cycles_across_runs() {
    let (dir, stage, mut bot) = world(&[("status_selection", r#"{"selected_statuses": ["burn", "poise"]}"#)]);
    bot.max_steps = 1;

    let errors = dir.path().join("error");
    let report = run_engine(&mut bot, 3, &errors, |_| {});

    let statuses: Vec<Status> = report.state.history.iter().map(|r| r.status).collect();
    assert_eq!(statuses, vec![Status::Burn, Status::Poise, Status::Burn]);
    assert_eq!(report.state.errored, 3);
    assert!(report
        .state
        .history
        .iter()
        .all(|r| matches!(&r.outcome, RunOutcome::Errored(reason) if reason.contains("no progress"))));
    assert_eq!(report.exit_code(), 0);
    let shots = stage.snapshots();
    assert_eq!(shots.len(), 3);
    assert!(shots.iter().all(|p| p.starts_with(&errors)));
}

#[test]
fn maintenance_stops_the_session_cleanly() {
    let (dir, stage, mut bot) = world(&[]);
    stage.show(general::MAINTENANCE, Point::new(1280, 720));
    stage.show(general::CLOSE, Point::new(1280, 900));

    let report = run_engine(&mut bot, 2, &dir.path().join("error"), |_| {});

    assert!(matches!(report.fatal, Some(EngineError::Maintenance)));
    assert_eq!(report.exit_code(), 0);
    assert_eq!(report.state.runs_done, 0);
    assert_eq!(stage.clicks(), vec![Point::new(1280, 900)]);
}

#[test]
fn missing_template_fails_only_the_run() {
    let (dir, stage, mut bot) = world(&[]);
    stage.remove_template(mirror::MD_ENTER);
    bot.max_steps = 1;

    let report = run_engine(&mut bot, 2, &dir.path().join("error"), |_| {});

    assert!(report.fatal.is_none());
    assert_eq!(report.state.errored, 2);
    assert_eq!(stage.snapshots().len(), 2);
}
