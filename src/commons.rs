//! Common goods: tagging produce from shared ground, restricting it to
//! shared containers, and splitting its sale proceeds at end of day.

use std::collections::BTreeMap;

use crate::config::EngineConfig;
use crate::id::ResourceId;
use crate::model::farm::ObjectKind;
use crate::model::layout::{FarmLayout, Tile};
use crate::model::player::PlayerId;
use crate::model::tag::{EntityRef, OwnerTag};
use crate::model::territory::{HostMode, TerritoryState};
use crate::notify::{Notification, NotificationKind, Severity};
use crate::resolver::{self, Decision};
use crate::session::Session;

/// A tile is common when it lies in the permanently shared quadrant or any
/// currently-shared quadrant.
pub fn is_common_tile(layout: &FarmLayout, territory: &TerritoryState, tile: Tile) -> bool {
    territory.is_shared(layout.quadrant_at(tile))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepositOutcome {
    Deposited,
    /// Chest access denied by ownership enforcement.
    Denied { owner: Option<PlayerId> },
    /// Common goods may only go into common containers.
    NotCommonContainer,
    NoChest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShipOutcome {
    Shipped,
    /// The item belongs to someone else.
    Denied { owner: Option<PlayerId> },
    /// Common goods ship only through the common bin; private goods only
    /// through a bin whose quadrant the shipper may use.
    WrongBin,
}

/// Mark or unmark a chest as a common container.
pub fn designate_common_chest(
    session: &mut Session,
    tile: Tile,
    common: bool,
) -> Option<Notification> {
    let chest = session
        .farm
        .object_at_mut(tile)
        .filter(|o| o.kind == ObjectKind::Chest)?;
    if common {
        chest.attrs.replace_owner(OwnerTag::Common);
    } else {
        chest.attrs.clear_owner();
    }
    let id = chest.id;
    tracing::info!(?tile, common, "chest designation changed");
    Some(Notification::new(
        NotificationKind::CommonChestDesignated { chest: id, common },
        Severity::Info,
        if common {
            "Chest designated as common storage."
        } else {
            "Chest is no longer common storage."
        },
    ))
}

/// Ids of every chest currently designated common, for the persisted
/// registry blob.
pub fn common_chest_ids(session: &Session) -> Vec<ResourceId> {
    session
        .farm
        .objects
        .values()
        .filter(|o| o.kind == ObjectKind::Chest && o.attrs.is_common())
        .map(|o| o.id)
        .collect()
}

/// Seed the permanently shared quadrant's common chest if nothing occupies
/// its layout spot yet. Host-side, at session start.
pub fn seed_common_chest(session: &mut Session) {
    let Some(&tile) = session
        .layout
        .common_chests
        .get(&session.layout.common_bin_quadrant())
    else {
        return;
    };
    if session.farm.object_at(tile).is_some() {
        return;
    }
    session.farm.place_object(tile, ObjectKind::Chest);
    designate_common_chest(session, tile, true);
}

/// Deposit a stack into a chest, enforcing chest access and the common
/// goods channel restriction. On rejection the item stays with the actor.
pub fn deposit(
    session: &mut Session,
    config: &EngineConfig,
    actor: PlayerId,
    chest_tile: Tile,
    stack: ResourceId,
) -> DepositOutcome {
    let Some(chest) = session.farm.object_at(chest_tile) else {
        return DepositOutcome::NoChest;
    };
    if chest.kind != ObjectKind::Chest {
        return DepositOutcome::NoChest;
    }
    let chest_is_common = chest.attrs.is_common();

    if config.enforce_chest_ownership {
        if let Decision::Denied { owner } = resolver::authorize_chest(
            &session.farm,
            &session.trust,
            session.clock.day,
            actor,
            EntityRef::Object { tile: chest_tile },
        ) {
            return DepositOutcome::Denied { owner };
        }
    }

    let stack_is_common = session
        .farm
        .stack(stack)
        .is_some_and(|s| s.attrs.is_common());
    if stack_is_common && !chest_is_common {
        tracing::debug!(?chest_tile, "blocked common item from private chest");
        return DepositOutcome::NotCommonContainer;
    }

    session.farm.remove_from_inventory(actor, stack);
    let Some(incoming) = session.farm.stack(stack).cloned() else {
        return DepositOutcome::NoChest;
    };
    // Merge into a compatible stack already in the chest, if any
    let contents = session
        .farm
        .object_at(chest_tile)
        .map(|c| c.contents.clone())
        .unwrap_or_default();
    for id in contents {
        let Some(existing) = session.farm.stack(id) else {
            continue;
        };
        if crate::chain::can_merge(existing, &incoming) {
            if let Some(existing) = session.farm.stack_mut(id) {
                existing.count += incoming.count;
            }
            session.farm.stacks.remove(&stack);
            return DepositOutcome::Deposited;
        }
    }
    if let Some(chest) = session.farm.object_at_mut(chest_tile) {
        chest.contents.push(stack);
    }
    DepositOutcome::Deposited
}

/// Withdraw a stack from a chest into the actor's holdings.
pub fn withdraw(
    session: &mut Session,
    config: &EngineConfig,
    actor: PlayerId,
    chest_tile: Tile,
    stack: ResourceId,
) -> Decision {
    if config.enforce_chest_ownership {
        let decision = resolver::authorize_chest(
            &session.farm,
            &session.trust,
            session.clock.day,
            actor,
            EntityRef::Object { tile: chest_tile },
        );
        if !decision.is_allowed() {
            return decision;
        }
    }
    let removed = match session.farm.object_at_mut(chest_tile) {
        Some(chest) => {
            let before = chest.contents.len();
            chest.contents.retain(|id| *id != stack);
            chest.contents.len() != before
        }
        None => false,
    };
    if removed {
        let mut no_pending = None;
        crate::chain::receive_stack(session, &mut no_pending, actor, stack);
    }
    Decision::Allowed
}

/// Put a stack into a quadrant's shipping bin.
pub fn ship(
    session: &mut Session,
    actor: PlayerId,
    quadrant: crate::model::layout::Quadrant,
    stack: ResourceId,
) -> ShipOutcome {
    let Some(item) = session.farm.stack(stack) else {
        return ShipOutcome::WrongBin;
    };

    match item.attrs.owner() {
        Some(OwnerTag::Common) => {
            if quadrant != session.layout.common_bin_quadrant() {
                tracing::debug!(?quadrant, "blocked common item from private shipping bin");
                return ShipOutcome::WrongBin;
            }
        }
        Some(OwnerTag::Player(owner)) if owner != actor => {
            return ShipOutcome::Denied { owner: Some(owner) };
        }
        _ => {
            // The actor's own (or untagged) item: the bin must be in a
            // quadrant they may use. Inert until assignment has run.
            if session.territory.initialized
                && !session.territory.player_owns_quadrant(actor, quadrant)
            {
                return ShipOutcome::WrongBin;
            }
        }
    }

    session.farm.remove_from_inventory(actor, stack);
    session
        .farm
        .shipping
        .entry(quadrant)
        .or_default()
        .push(stack);
    ShipOutcome::Shipped
}

/// End-of-day settlement: sell everything in the bins, split common
/// proceeds evenly across online players (remainder to the host), and in
/// Landlord mode transfer the configured percentage of each non-host
/// player's private revenue to the host.
pub fn end_of_day(session: &mut Session, config: &EngineConfig) -> Vec<Notification> {
    let mut notes = Vec::new();
    let mut common_total: i64 = 0;
    let mut private_revenue: BTreeMap<PlayerId, i64> = BTreeMap::new();

    let bins: Vec<_> = std::mem::take(&mut session.farm.shipping).into_iter().collect();
    for (quadrant, ids) in bins {
        for id in ids {
            let Some(stack) = session.farm.stacks.remove(&id) else {
                continue;
            };
            let value = stack.total_value();
            match stack.attrs.owner() {
                Some(OwnerTag::Common) => common_total += value,
                Some(OwnerTag::Player(p)) => {
                    *private_revenue.entry(p).or_insert(0) += value;
                }
                None => {
                    // Legacy untagged shipment: revenue follows the bin
                    let beneficiary = session
                        .territory
                        .owner_of(quadrant)
                        .unwrap_or(session.roster.host);
                    *private_revenue.entry(beneficiary).or_insert(0) += value;
                }
            }
        }
    }

    for (&player, &revenue) in &private_revenue {
        session.credit(player, revenue);
    }

    if common_total > 0 {
        let online: Vec<PlayerId> = session.roster.online().collect();
        let count = online.len().max(1) as i64;
        let per_player = common_total / count;
        let remainder = common_total % count;
        for player in online {
            session.credit(player, per_player);
        }
        session.credit(session.roster.host, remainder);
        tracing::info!(common_total, per_player, remainder, "common revenue distributed");
        notes.push(Notification::new(
            NotificationKind::CommonRevenueDistributed {
                total: common_total,
                per_player,
            },
            Severity::Info,
            format!("Common goods sold for {common_total}g — {per_player}g to each player."),
        ));
    }

    let landlord = session.territory.locked && session.territory.mode == HostMode::Landlord;
    if landlord {
        let host = session.roster.host;
        let mut total_cut = 0;
        for (&player, &revenue) in &private_revenue {
            if player == host || revenue <= 0 {
                continue;
            }
            let cut = revenue * i64::from(config.landlord_cut_percent) / 100;
            let taken = session.debit_up_to(player, cut);
            session.credit(host, taken);
            total_cut += taken;
            tracing::debug!(player = %player, taken, "landlord cut collected");
        }
        if total_cut > 0 {
            notes.push(Notification::new(
                NotificationKind::LandlordCut { total: total_cut },
                Severity::Info,
                format!("Landlord income: {total_cut}g"),
            ));
        }
    }

    notes
}
