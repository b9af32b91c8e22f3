use std::collections::BTreeMap;

use crate::ledger::TrustLedger;
use crate::model::clock::GameClock;
use crate::model::farm::Farm;
use crate::model::layout::{FarmLayout, Tile};
use crate::model::player::{PlayerId, Roster};
use crate::model::territory::TerritoryState;
use crate::pasture::PastureMap;

/// The shared session state: everything the ownership engine knows about
/// one save, replicated across participants by the embedder's fabric.
///
/// This is the explicit context object threaded through every component —
/// there is no hidden global state anywhere in the crate.
#[derive(Debug, Clone)]
pub struct Session {
    pub clock: GameClock,
    pub roster: Roster,
    pub layout: FarmLayout,
    pub farm: Farm,
    pub territory: TerritoryState,
    pub trust: TrustLedger,
    pub pastures: PastureMap,
    pub wallets: BTreeMap<PlayerId, i64>,
    pub positions: BTreeMap<PlayerId, Tile>,
}

impl Session {
    pub fn new(roster: Roster, layout: FarmLayout) -> Self {
        Self {
            clock: GameClock::new(),
            roster,
            layout,
            farm: Farm::new(),
            territory: TerritoryState::new(),
            trust: TrustLedger::new(),
            pastures: PastureMap::new(),
            wallets: BTreeMap::new(),
            positions: BTreeMap::new(),
        }
    }

    pub fn wallet(&self, player: PlayerId) -> i64 {
        self.wallets.get(&player).copied().unwrap_or(0)
    }

    pub fn credit(&mut self, player: PlayerId, amount: i64) {
        *self.wallets.entry(player).or_insert(0) += amount;
    }

    /// Debit up to `amount`, never below zero. Returns what was actually
    /// taken.
    pub fn debit_up_to(&mut self, player: PlayerId, amount: i64) -> i64 {
        let wallet = self.wallets.entry(player).or_insert(0);
        let taken = amount.min(*wallet).max(0);
        *wallet -= taken;
        taken
    }

    pub fn position(&self, player: PlayerId) -> Option<Tile> {
        self.positions.get(&player).copied()
    }
}
