//! Shared scenario builders and helpers for unit and integration tests.

use crate::config::EngineConfig;
use crate::engine::{Engine, GameEvent};
use crate::id::ResourceId;
use crate::model::layout::{FarmLayout, Tile};
use crate::model::player::{PlayerId, Roster};
use crate::model::tag::OwnerTag;
use crate::model::territory::HostMode;
use crate::notify::Notification;
use crate::session::Session;
use crate::territory::{assign_quadrants, lock};

pub const HOST: PlayerId = PlayerId(1);
pub const ANN: PlayerId = PlayerId(2);
pub const BEN: PlayerId = PlayerId(3);

/// Host plus Ann (SW cabin). The standard two-player scenario.
pub fn two_player_roster() -> Roster {
    let mut roster = Roster::new(HOST, "Host");
    roster.join(ANN, "Ann", Some(Tile::new(17, 43)));
    roster
}

/// Host, Ann (SW), Ben (SE).
pub fn three_player_roster() -> Roster {
    let mut roster = two_player_roster();
    roster.join(BEN, "Ben", Some(Tile::new(59, 43)));
    roster
}

/// A session locked in the given mode with assignments computed.
pub fn locked_session(roster: Roster, mode: HostMode) -> Session {
    let players = roster.online_count();
    let mut session = Session::new(roster, FarmLayout::four_corners());
    lock(&mut session.territory, mode, players, 0).unwrap();
    assign_quadrants(&mut session.territory, &session.roster, &session.layout);
    session
}

/// Host-side engine over a fresh two-player session (unlocked).
pub fn host_engine() -> Engine {
    let session = Session::new(two_player_roster(), FarmLayout::four_corners());
    Engine::host(session, EngineConfig::default())
}

pub fn tick_n(engine: &mut Engine, n: u64) {
    for _ in 0..n {
        engine.handle(GameEvent::Tick);
    }
}

/// Run enough ticks to pass the day settle window.
pub fn settle(engine: &mut Engine) {
    let ticks = engine.config.day_settle_ticks;
    tick_n(engine, ticks);
}

/// Create a tagged stack in a player's inventory.
pub fn owned_stack(
    session: &mut Session,
    owner: PlayerId,
    item: &str,
    count: u32,
    unit_value: i64,
) -> ResourceId {
    let id = session.farm.new_stack(item, count, unit_value);
    session
        .farm
        .stack_mut(id)
        .unwrap()
        .attrs
        .set_owner(OwnerTag::Player(owner));
    session.farm.inventories.entry(owner).or_default().push(id);
    id
}

/// Create a common-tagged stack in a player's inventory.
pub fn common_stack(
    session: &mut Session,
    holder: PlayerId,
    item: &str,
    count: u32,
    unit_value: i64,
) -> ResourceId {
    let id = session.farm.new_stack(item, count, unit_value);
    session
        .farm
        .stack_mut(id)
        .unwrap()
        .attrs
        .set_owner(OwnerTag::Common);
    session.farm.inventories.entry(holder).or_default().push(id);
    id
}

/// Check if any notification matches the predicate.
pub fn has_notification(notes: &[Notification], predicate: impl Fn(&Notification) -> bool) -> bool {
    notes.iter().any(predicate)
}
