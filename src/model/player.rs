use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::layout::Tile;

/// Stable unique identifier for a session participant.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct PlayerId(pub u64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerInfo {
    pub name: String,
    pub online: bool,
    /// Upper-left tile of the cabin this player claimed, if any. The host
    /// has no cabin; their territory comes from the host mode instead.
    pub cabin: Option<Tile>,
}

/// The set of known participants, with a distinguished authoritative host.
///
/// Players who disconnect stay in the roster (marked offline) — their
/// territory claim survives the session, only their revenue share lapses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roster {
    pub host: PlayerId,
    pub players: BTreeMap<PlayerId, PlayerInfo>,
}

impl Roster {
    pub fn new(host: PlayerId, host_name: impl Into<String>) -> Self {
        let mut players = BTreeMap::new();
        players.insert(
            host,
            PlayerInfo {
                name: host_name.into(),
                online: true,
                cabin: None,
            },
        );
        Self { host, players }
    }

    pub fn join(&mut self, id: PlayerId, name: impl Into<String>, cabin: Option<Tile>) {
        let entry = self.players.entry(id).or_insert(PlayerInfo {
            name: name.into(),
            online: true,
            cabin,
        });
        entry.online = true;
        if cabin.is_some() {
            entry.cabin = cabin;
        }
    }

    pub fn leave(&mut self, id: PlayerId) {
        if let Some(info) = self.players.get_mut(&id) {
            info.online = false;
        }
    }

    pub fn is_host(&self, id: PlayerId) -> bool {
        id == self.host
    }

    pub fn contains(&self, id: PlayerId) -> bool {
        self.players.contains_key(&id)
    }

    pub fn name_of(&self, id: PlayerId) -> Option<&str> {
        self.players.get(&id).map(|p| p.name.as_str())
    }

    /// Display name for messages; falls back like the in-game UI does.
    pub fn display_name(&self, id: PlayerId) -> &str {
        self.name_of(id).unwrap_or("another player")
    }

    pub fn online(&self) -> impl Iterator<Item = PlayerId> + '_ {
        self.players
            .iter()
            .filter(|(_, info)| info.online)
            .map(|(id, _)| *id)
    }

    pub fn online_count(&self) -> usize {
        self.online().count()
    }
}
