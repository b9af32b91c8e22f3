use serde::{Deserialize, Serialize};

pub const TICKS_PER_SECOND: u64 = 60;
pub const DAYS_PER_SEASON: u32 = 28;

const SEASONS: [&str; 4] = ["spring", "summer", "fall", "winter"];

/// In-world time as seen by the engine: a raw tick counter and an absolute
/// day counter (day 0 is spring 1 of year 1).
///
/// The embedder drives both through [`crate::engine::GameEvent`]s; the clock
/// never advances on its own.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameClock {
    pub tick: u64,
    pub day: u32,
}

impl GameClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance_tick(&mut self) {
        self.tick += 1;
    }

    pub fn season(&self) -> &'static str {
        SEASONS[((self.day / DAYS_PER_SEASON) % 4) as usize]
    }

    /// 1-based day within the current season.
    pub fn day_of_season(&self) -> u32 {
        self.day % DAYS_PER_SEASON + 1
    }

    /// Date text for user-facing messages, e.g. "spring 1".
    pub fn date_label(&self) -> String {
        format!("{} {}", self.season(), self.day_of_season())
    }
}
