#![allow(dead_code)]

use fencerow::testutil::*;
use fencerow::{Engine, EngineConfig, FarmLayout, GameEvent, HostMode, PlayerId, Session, Tile};

/// Host engine, locked and past the day settle window, notifications
/// drained.
pub fn ready_engine(mode: HostMode) -> Engine {
    let mut engine = host_engine();
    engine.lock_territory(mode).unwrap();
    engine.drain_notifications();
    settle(&mut engine);
    engine
}

/// Follower engine for Ann over the standard two-player roster.
pub fn follower_engine() -> Engine {
    let session = Session::new(two_player_roster(), FarmLayout::four_corners());
    Engine::follower(session, EngineConfig::default(), ANN)
}

pub fn plant(engine: &mut Engine, player: PlayerId, tile: Tile, seed: &str, regrows: bool) {
    engine.handle(GameEvent::SeedPlanted {
        player,
        tile,
        seed: seed.to_string(),
        regrows,
    });
}

/// A tile deep inside Ann's SW quadrant.
pub fn sw_tile() -> Tile {
    Tile::new(20, 50)
}

/// A tile inside the SE quadrant (shared in the two-player scenarios).
pub fn se_tile() -> Tile {
    Tile::new(60, 50)
}
