//! Territory assignment state machine: Unlocked → Locked, quadrant
//! assignment, and host-to-follower replication.

use crate::error::EngineError;
use crate::model::layout::{FarmLayout, Quadrant};
use crate::model::player::Roster;
use crate::model::territory::{HostMode, TerritoryLocked, TerritoryState};

/// Modes the host may choose at this roster size. Private needs a free
/// quadrant for the host, so it disappears at 4 players.
pub fn available_modes(player_count: usize) -> Vec<HostMode> {
    let mut modes = Vec::new();
    if player_count <= 3 {
        modes.push(HostMode::Private);
    }
    modes.push(HostMode::Landlord);
    modes
}

/// Lock the state machine. Host-side only; valid once, from Unlocked.
pub fn lock(
    state: &mut TerritoryState,
    mode: HostMode,
    player_count: usize,
    current_day: u32,
) -> Result<TerritoryLocked, EngineError> {
    if state.locked {
        return Err(EngineError::AlreadyLocked);
    }
    if !available_modes(player_count).contains(&mode) {
        return Err(EngineError::ModeUnavailable {
            mode,
            players: player_count,
        });
    }

    state.mode = mode;
    state.locked = true;
    state.locked_player_count = player_count;
    state.lock_day = current_day;
    tracing::info!(?mode, player_count, current_day, "territory locked");

    Ok(TerritoryLocked { mode, player_count })
}

/// Apply a replicated lock on a follower, verbatim. Idempotent: repeat
/// delivery of the same message is a no-op, and a follower that is somehow
/// already locked never recomputes.
pub fn apply_lock_message(state: &mut TerritoryState, msg: TerritoryLocked, current_day: u32) {
    if state.locked {
        return;
    }
    state.mode = msg.mode;
    state.locked = true;
    state.locked_player_count = msg.player_count;
    state.lock_day = current_day;
    tracing::info!(mode = ?msg.mode, player_count = msg.player_count, "territory lock applied from host");
}

/// Recompute quadrant assignments from the roster. Deterministic: the same
/// roster and mode always produce the same result, so the host can re-run
/// this on every roster change pre-lock.
///
/// A claimant keeps their quadrant while offline — territory claims come
/// from the cabin, not the connection.
pub fn assign_quadrants(state: &mut TerritoryState, roster: &Roster, layout: &FarmLayout) {
    state.assignments.clear();
    state.shared.clear();
    state.shared.insert(Quadrant::NE);

    for (&id, info) in &roster.players {
        if roster.is_host(id) {
            continue;
        }
        if let Some(quadrant) = info.cabin.and_then(|tile| layout.cabin_quadrant(tile)) {
            state.assignments.insert(id, quadrant);
            tracing::debug!(player = %id, ?quadrant, "claimant assigned");
        }
    }

    match state.mode {
        HostMode::Private => {
            state.assignments.insert(roster.host, layout.host_quadrant);
            tracing::debug!(host = %roster.host, quadrant = ?layout.host_quadrant, "host assigned (private mode)");
        }
        HostMode::Landlord => {
            // Landlord host works the shared quadrant; no private claim.
        }
    }

    for quadrant in Quadrant::CLAIMABLE {
        if !state.assignments.values().any(|q| *q == quadrant) {
            state.shared.insert(quadrant);
        }
    }

    state.initialized = true;
    tracing::info!(
        assignments = state.assignments.len(),
        shared = state.shared.len(),
        "assignment pass complete"
    );
}

/// Soft join guard: once locked, the session is full at the locked count.
/// The transport cannot refuse a connection, only warn.
pub fn can_player_join(state: &TerritoryState, current_players: usize) -> bool {
    !state.locked || current_players < state.locked_player_count
}
