use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::layout::Quadrant;
use super::player::PlayerId;

/// How the host participates in territory ownership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum HostMode {
    /// Host claims a private quadrant like everyone else. Only offered
    /// while a quadrant remains free for them (3 players or fewer).
    #[default]
    Private,
    /// Host works the shared quadrant and takes a percentage of each other
    /// player's private shipping revenue instead of land.
    Landlord,
}

/// Replicated host → follower message announcing the one-way lock.
/// Applied verbatim; idempotent on repeat delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerritoryLocked {
    pub mode: HostMode,
    pub player_count: usize,
}

/// The territory assignment state machine's state.
///
/// Two states: unlocked (initial) and locked (terminal). Once `locked` is
/// set, `mode`, `assignments` and `shared` are immutable for the rest of the
/// session. NE sits in `shared` regardless of lock state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerritoryState {
    pub mode: HostMode,
    pub locked: bool,
    pub locked_player_count: usize,
    /// Absolute day the lock happened, for save bookkeeping.
    pub lock_day: u32,
    pub assignments: BTreeMap<PlayerId, Quadrant>,
    pub shared: BTreeSet<Quadrant>,
    /// True once at least one assignment pass has completed. Enforcement
    /// stays inert while false so followers are not denied during the sync
    /// race window on join. Process-local, never persisted.
    #[serde(skip)]
    pub initialized: bool,
}

impl TerritoryState {
    pub fn new() -> Self {
        Self {
            mode: HostMode::default(),
            locked: false,
            locked_player_count: 0,
            lock_day: 0,
            assignments: BTreeMap::new(),
            shared: BTreeSet::from([Quadrant::NE]),
            initialized: false,
        }
    }

    pub fn is_shared(&self, quadrant: Quadrant) -> bool {
        quadrant == Quadrant::NE || self.shared.contains(&quadrant)
    }

    pub fn assigned(&self, player: PlayerId) -> Option<Quadrant> {
        self.assignments.get(&player).copied()
    }

    /// The player assigned to a quadrant, if any. Shared quadrants have no
    /// owner.
    pub fn owner_of(&self, quadrant: Quadrant) -> Option<PlayerId> {
        self.assignments
            .iter()
            .find(|(_, q)| **q == quadrant)
            .map(|(p, _)| *p)
    }

    /// True if the quadrant is shared, or assigned to this player.
    pub fn player_owns_quadrant(&self, player: PlayerId, quadrant: Quadrant) -> bool {
        self.is_shared(quadrant) || self.assigned(player) == Some(quadrant)
    }
}

impl Default for TerritoryState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ne_shared_even_if_removed_from_set() {
        let mut state = TerritoryState::new();
        state.shared.clear();
        assert!(state.is_shared(Quadrant::NE));
        assert!(!state.is_shared(Quadrant::SW));
    }

    #[test]
    fn ownership_requires_assignment_or_share() {
        let mut state = TerritoryState::new();
        state.assignments.insert(PlayerId(2), Quadrant::SW);
        assert!(state.player_owns_quadrant(PlayerId(2), Quadrant::SW));
        assert!(!state.player_owns_quadrant(PlayerId(3), Quadrant::SW));
        assert!(state.player_owns_quadrant(PlayerId(3), Quadrant::NE));
        assert_eq!(state.owner_of(Quadrant::SW), Some(PlayerId(2)));
        assert_eq!(state.owner_of(Quadrant::SE), None);
    }

    #[test]
    fn initialized_flag_not_persisted() {
        let mut state = TerritoryState::new();
        state.initialized = true;
        let json = serde_json::to_string(&state).unwrap();
        let back: TerritoryState = serde_json::from_str(&json).unwrap();
        assert!(!back.initialized);
    }
}
