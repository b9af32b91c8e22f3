//! Production-chain propagation: the rules that carry an owner tag from a
//! source resource onto everything derived from it.
//!
//! The delicate part is harvest ordering. The host game's stacking logic
//! would merge owner-less harvest output into the picking player's existing
//! stacks before anything could tag it, so the crop's owner is resolved
//! *before* the output item exists, parked as a pending owner, and consumed
//! at the first point the item enters a player's holdings.

use crate::commons;
use crate::config::EngineConfig;
use crate::id::ResourceId;
use crate::model::farm::{CropPatch, ItemStack, ObjectKind, PlantedTree};
use crate::model::layout::Tile;
use crate::model::player::PlayerId;
use crate::model::tag::{EntityKind, EntityRef, OwnerTag};
use crate::model::trust::PermissionCategory;
use crate::resolver::{self, Decision};
use crate::session::Session;

/// Outcome of a destructive tool action on a tagged resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrikeOutcome {
    Denied { owner: Option<PlayerId> },
    /// The strike landed and the resource is gone; its tag went with it.
    Removed,
    /// The strike landed but the resource survives.
    Struck,
}

/// Outcome of collecting a machine's finished output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectOutcome {
    Denied { owner: Option<PlayerId> },
    Collected(ResourceId),
    NothingReady,
}

/// Tag soil and crop at planting time. Fertilizer application re-enters
/// this same call, and regrowth keeps the crop instance, so both tags are
/// vacant-only writes — the original planter is never overwritten.
pub fn plant(session: &mut Session, planter: PlayerId, tile: Tile, seed: &str, regrows: bool) {
    let patch = session.farm.soil.entry(tile).or_default();
    patch.attrs.set_owner(OwnerTag::Player(planter));

    if patch.crop.is_none() {
        patch.crop = Some(CropPatch {
            seed: seed.to_string(),
            regrows,
            attrs: Default::default(),
        });
    }
    if let Some(crop) = &mut patch.crop {
        if crop.attrs.set_owner(OwnerTag::Player(planter)) {
            tracing::debug!(planter = %planter, ?tile, seed, "soil + crop tagged");
        }
    }
}

/// Tag a newly planted tree with its planter.
pub fn plant_tree(session: &mut Session, planter: PlayerId, tile: Tile) {
    let tree = session.farm.trees.entry(tile).or_insert_with(PlantedTree::default);
    if tree.attrs.set_owner(OwnerTag::Player(planter)) {
        tracing::debug!(planter = %planter, ?tile, "tree tagged");
    }
}

/// Resolve who owns the output of a harvest at this tile, *before* the
/// output item exists. Common-area tiles yield common produce regardless of
/// who planted.
pub fn begin_harvest(session: &Session, tile: Tile) -> Option<OwnerTag> {
    if commons::is_common_tile(&session.layout, &session.territory, tile) {
        return Some(OwnerTag::Common);
    }
    resolver::resolve_owner(&session.farm, EntityRef::Crop { tile })
}

/// Settle the soil after a harvest. Regrowing crops stay (soil stays
/// owned); a consumed crop clears the soil tag so the tile is open for
/// anyone to replant.
pub fn finish_harvest(session: &mut Session, tile: Tile) {
    let Some(patch) = session.farm.soil.get_mut(&tile) else {
        return;
    };
    let consumed = patch.crop.as_ref().is_some_and(|crop| !crop.regrows);
    if consumed {
        patch.crop = None;
        patch.attrs.clear_owner();
        tracing::debug!(?tile, "crop consumed, soil now open");
    }
}

/// Stamp ownership on a stack entering a player's holdings, then place it
/// in their inventory. A pending harvest owner takes precedence; anything
/// arriving untagged through other paths (foraging, fishing, mining)
/// belongs to the receiver. Returns the id the items ended up under, which
/// differs from `stack` when they merged into an existing stack.
pub fn receive_stack(
    session: &mut Session,
    pending: &mut Option<OwnerTag>,
    receiver: PlayerId,
    stack: ResourceId,
) -> ResourceId {
    if let Some(item) = session.farm.stack_mut(stack) {
        if item.attrs.owner().is_none() {
            let tag = pending.take().unwrap_or(OwnerTag::Player(receiver));
            item.attrs.set_owner(tag);
            tracing::debug!(stack = %stack, ?tag, "stack tagged before stacking");
        }
    }
    add_to_holdings(session, receiver, stack)
}

/// Two stacks may merge only when they hold the same item and the same tag
/// state — both untagged, or both tagged identically. Common never merges
/// with owned, and different owners never merge, preserving per-owner stack
/// identity.
pub fn can_merge(a: &ItemStack, b: &ItemStack) -> bool {
    a.item == b.item && a.attrs.owner() == b.attrs.owner()
}

/// Insert a stack into a player's inventory, merging into an existing
/// compatible stack when one exists. Returns the surviving stack id.
fn add_to_holdings(session: &mut Session, receiver: PlayerId, stack: ResourceId) -> ResourceId {
    let Some(incoming) = session.farm.stack(stack).cloned() else {
        return stack;
    };
    let held = session.farm.inventory(receiver).to_vec();
    for id in held {
        let Some(existing) = session.farm.stack(id) else {
            continue;
        };
        if can_merge(existing, &incoming) {
            if let Some(existing) = session.farm.stack_mut(id) {
                existing.count += incoming.count;
            }
            session.farm.stacks.remove(&stack);
            return id;
        }
    }
    session
        .farm
        .inventories
        .entry(receiver)
        .or_default()
        .push(stack);
    stack
}

/// Duplicate a stack, preserving its entire attribute bag. External
/// automation tooling creates fresh stacks that would otherwise drop the
/// owner tag.
pub fn clone_stack(session: &mut Session, source: ResourceId) -> Option<ResourceId> {
    let original = session.farm.stack(source)?.clone();
    let id = session.farm.id_gen.next_id();
    session.farm.stacks.insert(
        id,
        ItemStack {
            id,
            attrs: original.attrs.clone(),
            ..original
        },
    );
    Some(id)
}

/// Authorize and apply a destructive tool action. An authorized strike that
/// leaves the resource absent clears its tag with it.
pub fn tool_strike(
    session: &mut Session,
    config: &EngineConfig,
    actor: PlayerId,
    target: EntityRef,
    destroys: bool,
) -> StrikeOutcome {
    let Some(kind) = resolver::entity_kind(&session.farm, target) else {
        return StrikeOutcome::Struck;
    };

    let decision = match kind {
        EntityKind::Soil | EntityKind::Crop | EntityKind::Tree => {
            authorize_if(config.enforce_crop_ownership, || {
                resolver::authorize(
                    &session.farm,
                    &session.trust,
                    session.clock.day,
                    actor,
                    target,
                    PermissionCategory::Crops,
                )
            })
        }
        EntityKind::Machine => authorize_if(config.enforce_machine_ownership, || {
            resolver::authorize(
                &session.farm,
                &session.trust,
                session.clock.day,
                actor,
                target,
                PermissionCategory::Machines,
            )
        }),
        EntityKind::Chest => authorize_if(config.enforce_chest_ownership, || {
            resolver::authorize_chest(
                &session.farm,
                &session.trust,
                session.clock.day,
                actor,
                target,
            )
        }),
        EntityKind::Building => authorize_if(config.enforce_building_ownership, || {
            resolver::authorize(
                &session.farm,
                &session.trust,
                session.clock.day,
                actor,
                target,
                PermissionCategory::Buildings,
            )
        }),
        // Loose stacks are not strikeable
        EntityKind::ItemStack => Decision::Allowed,
    };

    if let Decision::Denied { owner } = decision {
        tracing::debug!(actor = %actor, ?target, ?owner, "tool strike blocked");
        return StrikeOutcome::Denied { owner };
    }

    if !destroys {
        return StrikeOutcome::Struck;
    }

    match target {
        EntityRef::Soil { tile } => {
            session.farm.soil.remove(&tile);
        }
        EntityRef::Crop { tile } => {
            if let Some(patch) = session.farm.soil.get_mut(&tile) {
                patch.crop = None;
                // Crop is absent after the strike, so the tile opens up
                patch.attrs.clear_owner();
            }
        }
        EntityRef::Tree { tile } => {
            session.farm.trees.remove(&tile);
        }
        EntityRef::Object { tile } => {
            session.farm.objects.remove(&tile);
        }
        EntityRef::Building { id } => {
            session.farm.buildings.remove(&id);
            session.pastures.remove_building(id);
        }
        EntityRef::Stack { .. } => {}
    }
    StrikeOutcome::Removed
}

fn authorize_if(enforced: bool, check: impl FnOnce() -> Decision) -> Decision {
    if enforced { check() } else { Decision::Allowed }
}

/// Drop an input item into a machine. On success the machine remembers the
/// input's resolved owner (the acting player for untagged input) so its
/// output can inherit it, and the input stack is consumed.
pub fn machine_load(
    session: &mut Session,
    config: &EngineConfig,
    actor: PlayerId,
    tile: Tile,
    input: ResourceId,
) -> Decision {
    let target = EntityRef::Object { tile };
    if session
        .farm
        .object_at(tile)
        .is_none_or(|o| o.kind != ObjectKind::Machine)
    {
        return Decision::Allowed;
    }

    let decision = authorize_if(config.enforce_machine_ownership, || {
        resolver::authorize(
            &session.farm,
            &session.trust,
            session.clock.day,
            actor,
            target,
            PermissionCategory::Machines,
        )
    });
    if !decision.is_allowed() {
        return decision;
    }

    let input_owner = resolver::resolve_owner(&session.farm, EntityRef::Stack { id: input })
        .unwrap_or(OwnerTag::Player(actor));
    session.farm.remove_from_inventory(actor, input);
    session.farm.stacks.remove(&input);
    if let Some(machine) = session.farm.object_at_mut(tile) {
        machine.attrs.replace_owner(input_owner);
        tracing::debug!(?tile, owner = ?input_owner, "machine took input");
    }
    Decision::Allowed
}

/// A machine finished processing: park the (untagged) output on the
/// machine. The periodic sweep stamps it before anyone can collect.
pub fn machine_produce(session: &mut Session, tile: Tile, item: &str, count: u32, unit_value: i64) {
    let id = session.farm.id_gen.next_id();
    if let Some(machine) = session.farm.object_at_mut(tile) {
        if machine.kind == ObjectKind::Machine {
            machine.held_output = Some(ItemStack {
                id,
                item: item.to_string(),
                count,
                unit_value,
                attrs: Default::default(),
            });
        }
    }
}

/// Periodic scan: stamp any untagged machine output with the machine's
/// stored input owner. Runs on an interval rather than per interaction so
/// it holds no matter how a collection is triggered. Returns how many
/// outputs were tagged.
pub fn sweep_machine_outputs(session: &mut Session) -> usize {
    let mut tagged = 0;
    for (tile, object) in &mut session.farm.objects {
        if object.kind != ObjectKind::Machine {
            continue;
        }
        let Some(owner) = object.attrs.owner() else {
            continue;
        };
        let Some(output) = &mut object.held_output else {
            continue;
        };
        if output.attrs.set_owner(owner) {
            tagged += 1;
            tracing::debug!(?tile, ?owner, item = %output.item, "machine output pre-tagged");
        }
    }
    tagged
}

/// Collect a machine's finished output into the actor's holdings.
pub fn collect_output(
    session: &mut Session,
    config: &EngineConfig,
    actor: PlayerId,
    tile: Tile,
) -> CollectOutcome {
    let decision = authorize_if(config.enforce_machine_ownership, || {
        resolver::authorize(
            &session.farm,
            &session.trust,
            session.clock.day,
            actor,
            EntityRef::Object { tile },
            PermissionCategory::Machines,
        )
    });
    if let Decision::Denied { owner } = decision {
        return CollectOutcome::Denied { owner };
    }

    let Some(machine) = session.farm.object_at_mut(tile) else {
        return CollectOutcome::NothingReady;
    };
    let machine_owner = machine.attrs.owner();
    let Some(mut output) = machine.held_output.take() else {
        return CollectOutcome::NothingReady;
    };

    // The sweep normally got here first; stamp defensively if not.
    if let Some(owner) = machine_owner {
        output.attrs.set_owner(owner);
    }

    let id = output.id;
    session.farm.stacks.insert(id, output);
    let mut no_pending = None;
    let held = receive_stack(session, &mut no_pending, actor, id);
    CollectOutcome::Collected(held)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::layout::FarmLayout;
    use crate::model::player::Roster;
    use crate::model::territory::HostMode;
    use crate::territory::{assign_quadrants, lock};

    const HOST: PlayerId = PlayerId(1);
    const ANN: PlayerId = PlayerId(2);

    /// Host (NW, private) + Ann (SW). SE and NE are shared.
    fn session() -> Session {
        let mut roster = Roster::new(HOST, "Host");
        roster.join(ANN, "Ann", Some(Tile::new(17, 43)));
        let mut session = Session::new(roster, FarmLayout::four_corners());
        lock(&mut session.territory, HostMode::Private, 2, 0).unwrap();
        assign_quadrants(&mut session.territory, &session.roster, &session.layout);
        session
    }

    fn sw_tile() -> Tile {
        Tile::new(20, 50)
    }

    #[test]
    fn fertilizer_replant_keeps_original_tags() {
        let mut session = session();
        plant(&mut session, ANN, sw_tile(), "parsnip", false);
        // Fertilizer application re-enters plant() as a different player
        plant(&mut session, HOST, sw_tile(), "fertilizer", false);

        let patch = &session.farm.soil[&sw_tile()];
        assert_eq!(patch.attrs.owner(), Some(OwnerTag::Player(ANN)));
        assert_eq!(
            patch.crop.as_ref().unwrap().attrs.owner(),
            Some(OwnerTag::Player(ANN))
        );
    }

    #[test]
    fn harvest_tags_item_to_planter_not_picker() {
        let mut session = session();
        plant(&mut session, ANN, sw_tile(), "parsnip", false);

        let mut pending = begin_harvest(&session, sw_tile());
        assert_eq!(pending, Some(OwnerTag::Player(ANN)));

        // The host is the one who walks over and picks it up
        let stack = session.farm.new_stack("parsnip", 1, 35);
        receive_stack(&mut session, &mut pending, HOST, stack);
        finish_harvest(&mut session, sw_tile());

        assert_eq!(
            session.farm.stack(stack).unwrap().attrs.owner(),
            Some(OwnerTag::Player(ANN))
        );
        assert!(session.farm.inventory_contains(HOST, stack));
        // Single-yield crop: soil reverts to open
        let patch = &session.farm.soil[&sw_tile()];
        assert!(patch.crop.is_none());
        assert_eq!(patch.attrs.owner(), None);
    }

    #[test]
    fn regrowing_crop_keeps_soil_owned() {
        let mut session = session();
        plant(&mut session, ANN, sw_tile(), "strawberry", true);
        let mut pending = begin_harvest(&session, sw_tile());
        let stack = session.farm.new_stack("strawberry", 1, 120);
        receive_stack(&mut session, &mut pending, ANN, stack);
        finish_harvest(&mut session, sw_tile());

        let patch = &session.farm.soil[&sw_tile()];
        assert!(patch.crop.is_some());
        assert_eq!(patch.attrs.owner(), Some(OwnerTag::Player(ANN)));
    }

    #[test]
    fn untagged_acquisition_tags_receiver() {
        let mut session = session();
        let stack = session.farm.new_stack("chanterelle", 1, 160);
        let mut pending = None;
        receive_stack(&mut session, &mut pending, HOST, stack);
        assert_eq!(
            session.farm.stack(stack).unwrap().attrs.owner(),
            Some(OwnerTag::Player(HOST))
        );
    }

    #[test]
    fn harvest_in_shared_quadrant_yields_common_produce() {
        let mut session = session();
        let se_tile = Tile::new(60, 50); // SE is shared in this setup
        plant(&mut session, ANN, se_tile, "parsnip", false);
        assert_eq!(begin_harvest(&session, se_tile), Some(OwnerTag::Common));
    }

    #[test]
    fn merge_rules_preserve_stack_identity() {
        let mut session = session();
        let a = session.farm.new_stack("parsnip", 2, 35);
        let b = session.farm.new_stack("parsnip", 3, 35);
        let mut pending = Some(OwnerTag::Player(ANN));
        receive_stack(&mut session, &mut pending, HOST, a);
        let mut pending = None;
        receive_stack(&mut session, &mut pending, HOST, b);

        // Ann's harvest and the host's own parsnips stay separate
        assert_eq!(session.farm.inventory(HOST).len(), 2);

        // Another stack of Ann's merges into the first
        let c = session.farm.new_stack("parsnip", 5, 35);
        let mut pending = Some(OwnerTag::Player(ANN));
        receive_stack(&mut session, &mut pending, HOST, c);
        assert_eq!(session.farm.inventory(HOST).len(), 2);
        assert_eq!(session.farm.stack(a).unwrap().count, 7);
    }

    #[test]
    fn common_never_merges_with_owned() {
        let mut session = session();
        let a = session.farm.new_stack("potato", 1, 80);
        let b = session.farm.new_stack("potato", 1, 80);
        let mut pending = Some(OwnerTag::Common);
        receive_stack(&mut session, &mut pending, HOST, a);
        let mut pending = None;
        receive_stack(&mut session, &mut pending, HOST, b);
        assert_eq!(session.farm.inventory(HOST).len(), 2);
    }

    #[test]
    fn clone_preserves_owner_tag() {
        let mut session = session();
        let source = session.farm.new_stack("wine", 1, 400);
        session
            .farm
            .stack_mut(source)
            .unwrap()
            .attrs
            .set_owner(OwnerTag::Player(ANN));

        let copy = clone_stack(&mut session, source).unwrap();
        assert_ne!(copy, source);
        assert_eq!(
            session.farm.stack(copy).unwrap().attrs.owner(),
            Some(OwnerTag::Player(ANN))
        );
    }

    #[test]
    fn strike_denied_for_stranger_allowed_for_owner() {
        let mut session = session();
        let config = EngineConfig::default();
        plant(&mut session, ANN, sw_tile(), "parsnip", false);

        let crop = EntityRef::Crop { tile: sw_tile() };
        assert_eq!(
            tool_strike(&mut session, &config, HOST, crop, true),
            StrikeOutcome::Denied { owner: Some(ANN) }
        );
        assert!(session.farm.soil[&sw_tile()].crop.is_some());

        // Owner scythes their own crop down: crop gone, soil open
        assert_eq!(
            tool_strike(&mut session, &config, ANN, crop, true),
            StrikeOutcome::Removed
        );
        let patch = &session.farm.soil[&sw_tile()];
        assert!(patch.crop.is_none());
        assert_eq!(patch.attrs.owner(), None);
    }

    #[test]
    fn strike_toggle_disables_enforcement() {
        let mut session = session();
        let config = EngineConfig {
            enforce_crop_ownership: false,
            ..Default::default()
        };
        plant(&mut session, ANN, sw_tile(), "parsnip", false);
        assert_eq!(
            tool_strike(
                &mut session,
                &config,
                HOST,
                EntityRef::Crop { tile: sw_tile() },
                false
            ),
            StrikeOutcome::Struck
        );
    }

    #[test]
    fn machine_chain_carries_input_owner_to_output() {
        let mut session = session();
        let config = EngineConfig::default();
        let keg = Tile::new(60, 50);
        session.farm.place_object(keg, ObjectKind::Machine);

        // Ann's grapes, loaded by the host (untagged shared-area machine)
        let grapes = session.farm.new_stack("grapes", 1, 80);
        session
            .farm
            .stack_mut(grapes)
            .unwrap()
            .attrs
            .set_owner(OwnerTag::Player(ANN));
        session
            .farm
            .inventories
            .entry(HOST)
            .or_default()
            .push(grapes);

        assert!(machine_load(&mut session, &config, HOST, keg, grapes).is_allowed());
        assert!(session.farm.stack(grapes).is_none());
        assert_eq!(
            session.farm.object_at(keg).unwrap().attrs.owner(),
            Some(OwnerTag::Player(ANN))
        );

        machine_produce(&mut session, keg, "wine", 1, 400);
        assert_eq!(sweep_machine_outputs(&mut session), 1);
        // Sweep is idempotent
        assert_eq!(sweep_machine_outputs(&mut session), 0);

        // The machine now counts as Ann's; the host cannot collect
        assert_eq!(
            collect_output(&mut session, &config, HOST, keg),
            CollectOutcome::Denied { owner: Some(ANN) }
        );
        let CollectOutcome::Collected(output) = collect_output(&mut session, &config, ANN, keg)
        else {
            panic!("collection should succeed");
        };
        assert_eq!(
            session.farm.stack(output).unwrap().attrs.owner(),
            Some(OwnerTag::Player(ANN))
        );
    }

    #[test]
    fn untagged_input_falls_back_to_acting_player() {
        let mut session = session();
        let config = EngineConfig::default();
        let keg = Tile::new(60, 50);
        session.farm.place_object(keg, ObjectKind::Machine);
        let hops = session.farm.new_stack("hops", 1, 25);
        session.farm.inventories.entry(ANN).or_default().push(hops);

        machine_load(&mut session, &config, ANN, keg, hops);
        assert_eq!(
            session.farm.object_at(keg).unwrap().attrs.owner(),
            Some(OwnerTag::Player(ANN))
        );
    }

    #[test]
    fn output_collection_blocked_without_machine_trust() {
        let mut session = session();
        let config = EngineConfig::default();
        let keg = Tile::new(20, 52); // Ann's SW quadrant
        session.farm.place_object(keg, ObjectKind::Machine);
        session
            .farm
            .object_at_mut(keg)
            .unwrap()
            .attrs
            .set_owner(OwnerTag::Player(ANN));
        machine_produce(&mut session, keg, "wine", 1, 400);
        sweep_machine_outputs(&mut session);

        assert_eq!(
            collect_output(&mut session, &config, HOST, keg),
            CollectOutcome::Denied { owner: Some(ANN) }
        );
    }
}
