//! Boundary enforcement: keeps players out of quadrants they do not own by
//! reverting movement onto restricted passage tiles.

use std::collections::BTreeMap;

use crate::model::layout::{FarmLayout, Quadrant, Tile};
use crate::model::player::{PlayerId, Roster};
use crate::model::territory::TerritoryState;
use crate::notify::{Notification, NotificationKind, Severity};

/// A blocked passage attempt: where to put the player back, and a denial
/// message if this player's cooldown has elapsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blocked {
    pub quadrant: Quadrant,
    pub revert_to: Option<Tile>,
    pub notification: Option<Notification>,
}

/// Per-process boundary tracker. Holds the flattened passage map plus the
/// last tile each player was seen on outside any restricted passage, and
/// message cooldowns so denials do not spam.
#[derive(Debug, Clone)]
pub struct BoundaryEnforcer {
    passage_map: BTreeMap<Tile, Quadrant>,
    last_valid: BTreeMap<PlayerId, Tile>,
    cooldowns: BTreeMap<PlayerId, u64>,
    cooldown_ticks: u64,
}

impl BoundaryEnforcer {
    pub fn new(layout: &FarmLayout, cooldown_ticks: u64) -> Self {
        let passage_map = layout.passage_map();
        tracing::debug!(tiles = passage_map.len(), "passage tile map built");
        Self {
            passage_map,
            last_valid: BTreeMap::new(),
            cooldowns: BTreeMap::new(),
            cooldown_ticks,
        }
    }

    /// Count down active message cooldowns. Called once per tick.
    pub fn tick_cooldowns(&mut self) {
        for remaining in self.cooldowns.values_mut() {
            *remaining = remaining.saturating_sub(1);
        }
    }

    /// Check one player's tile. Returns a block verdict when the player is
    /// standing on a passage into a quadrant they do not own; otherwise
    /// records the tile as their last valid position.
    ///
    /// Inert until the state machine has completed an assignment pass —
    /// otherwise every player would be wrongly denied during the sync race
    /// window on join.
    pub fn check(
        &mut self,
        territory: &TerritoryState,
        roster: &Roster,
        player: PlayerId,
        tile: Tile,
    ) -> Option<Blocked> {
        if !territory.initialized {
            return None;
        }

        let Some(&target) = self.passage_map.get(&tile) else {
            self.last_valid.insert(player, tile);
            return None;
        };

        if territory.player_owns_quadrant(player, target) {
            self.last_valid.insert(player, tile);
            return None;
        }

        let owner = territory.owner_of(target);
        let notification = if self.cooldowns.get(&player).copied().unwrap_or(0) == 0 {
            self.cooldowns.insert(player, self.cooldown_ticks);
            let message = match owner {
                Some(id) => format!("You cannot enter {}'s farm!", roster.display_name(id)),
                None => "This area is restricted.".to_string(),
            };
            Some(Notification::new(
                NotificationKind::AccessDenied { owner },
                Severity::Warn,
                message,
            ))
        } else {
            None
        };

        tracing::debug!(
            player = %player,
            quadrant = ?target,
            owner = ?owner,
            "blocked passage attempt"
        );

        Some(Blocked {
            quadrant: target,
            revert_to: self.last_valid.get(&player).copied(),
            notification,
        })
    }

    pub fn is_restricted(&self, territory: &TerritoryState, player: PlayerId, tile: Tile) -> bool {
        territory.initialized
            && self
                .passage_map
                .get(&tile)
                .is_some_and(|&q| !territory.player_owns_quadrant(player, q))
    }
}
