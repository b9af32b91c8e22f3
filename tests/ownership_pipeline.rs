mod common;

use common::*;
use fencerow::chain::{CollectOutcome, StrikeOutcome};
use fencerow::engine::HarvestOutcome;
use fencerow::model::farm::ObjectKind;
use fencerow::testutil::*;
use fencerow::{EntityRef, GameEvent, HostMode, OwnerTag, PermissionSet};

#[test]
fn produce_follows_planter_from_seed_to_sale() {
    let mut engine = ready_engine(HostMode::Private);
    plant(&mut engine, ANN, sw_tile(), "parsnip", false);

    // Ann harvests her own crop; the stack carries her tag
    let HarvestOutcome::Harvested(stack) = engine.try_harvest(ANN, sw_tile(), "parsnip", 1, 35)
    else {
        panic!("owner harvest should succeed");
    };
    assert_eq!(
        engine.session.farm.stack(stack).unwrap().attrs.owner(),
        Some(OwnerTag::Player(ANN))
    );

    // Ship it from her own bin and settle the day: revenue is hers
    engine.try_ship(ANN, fencerow::Quadrant::SW, stack);
    engine.handle(GameEvent::DayEnding);
    assert_eq!(engine.session.wallet(ANN), 35);
    assert_eq!(engine.session.wallet(HOST), 0);
}

#[test]
fn harvester_identity_does_not_leak_onto_produce() {
    let mut engine = ready_engine(HostMode::Private);
    plant(&mut engine, ANN, sw_tile(), "parsnip", false);
    engine
        .grant_trust(
            ANN,
            HOST,
            Some(0),
            PermissionSet {
                crops: true,
                ..Default::default()
            },
        )
        .unwrap();

    // The host picks Ann's crop; the item still resolves to Ann
    let HarvestOutcome::Harvested(stack) = engine.try_harvest(HOST, sw_tile(), "parsnip", 1, 35)
    else {
        panic!("trusted harvest should succeed");
    };
    assert_eq!(
        engine.session.farm.stack(stack).unwrap().attrs.owner(),
        Some(OwnerTag::Player(ANN))
    );
    assert!(engine.session.farm.inventory_contains(HOST, stack));
}

#[test]
fn forage_tags_to_whoever_picked_it_up() {
    let mut engine = ready_engine(HostMode::Private);
    let stack = engine.receive_item(HOST, "chanterelle", 1, 160);
    assert_eq!(
        engine.session.farm.stack(stack).unwrap().attrs.owner(),
        Some(OwnerTag::Player(HOST))
    );
}

#[test]
fn differently_owned_stacks_never_merge() {
    let mut engine = ready_engine(HostMode::Private);
    plant(&mut engine, ANN, sw_tile(), "parsnip", false);
    engine
        .grant_trust(ANN, HOST, Some(0), PermissionSet::all())
        .unwrap();

    // Host picks Ann's parsnip, then forages one of his own
    let HarvestOutcome::Harvested(anns) = engine.try_harvest(HOST, sw_tile(), "parsnip", 1, 35)
    else {
        panic!();
    };
    let own = engine.receive_item(HOST, "parsnip", 1, 35);

    assert_ne!(anns, own);
    assert_eq!(engine.session.farm.inventory(HOST).len(), 2);

    // A second of his own merges into the first
    let merged = engine.receive_item(HOST, "parsnip", 2, 35);
    assert_eq!(merged, own);
    assert_eq!(engine.session.farm.stack(own).unwrap().count, 3);
}

#[test]
fn machine_output_inherits_input_owner_through_sweep() {
    let mut engine = ready_engine(HostMode::Private);
    let keg = se_tile(); // shared ground, anyone may use it
    engine.handle(GameEvent::ObjectPlaced {
        player: HOST,
        tile: keg,
        kind: ObjectKind::Machine,
    });

    // The host feeds Ann's grapes into his own keg; the machine now
    // remembers Ann as the produce owner
    let grapes = fencerow::testutil::owned_stack(&mut engine.session, HOST, "grapes", 1, 80);
    engine
        .session
        .farm
        .stack_mut(grapes)
        .unwrap()
        .attrs
        .replace_owner(OwnerTag::Player(ANN));
    assert!(engine.try_load_machine(HOST, keg, grapes).is_allowed());
    assert_eq!(
        engine.session.farm.object_at(keg).unwrap().attrs.owner(),
        Some(OwnerTag::Player(ANN))
    );

    engine.handle(GameEvent::MachineProduced {
        tile: keg,
        item: "wine".to_string(),
        count: 1,
        unit_value: 400,
    });

    // The periodic sweep tags the output before anyone collects
    let sweep = engine.config.machine_sweep_interval;
    tick_n(&mut engine, sweep);
    let held = engine
        .session
        .farm
        .object_at(keg)
        .unwrap()
        .held_output
        .as_ref()
        .unwrap();
    assert_eq!(held.attrs.owner(), Some(OwnerTag::Player(ANN)));

    // The machine follows its input owner now: the host is locked out,
    // and Ann's collection yields wine tagged to her.
    assert_eq!(
        engine.try_collect_output(HOST, keg),
        CollectOutcome::Denied { owner: Some(ANN) }
    );
    let CollectOutcome::Collected(wine) = engine.try_collect_output(ANN, keg) else {
        panic!("owner collection should succeed");
    };
    assert_eq!(
        engine.session.farm.stack(wine).unwrap().attrs.owner(),
        Some(OwnerTag::Player(ANN))
    );
}

#[test]
fn cloned_stacks_keep_their_tags() {
    let mut engine = ready_engine(HostMode::Private);
    let stack = fencerow::testutil::owned_stack(&mut engine.session, ANN, "wine", 5, 400);
    let clone = engine.clone_stack(stack).unwrap();
    assert_eq!(
        engine.session.farm.stack(clone).unwrap().attrs.owner(),
        Some(OwnerTag::Player(ANN))
    );
}

#[test]
fn strike_rules_follow_ownership_and_trust() {
    let mut engine = ready_engine(HostMode::Private);
    plant(&mut engine, ANN, sw_tile(), "parsnip", false);
    let crop = EntityRef::Crop { tile: sw_tile() };

    // Stranger blocked, with a denial notification naming Ann
    assert_eq!(
        engine.try_strike(HOST, crop, true),
        StrikeOutcome::Denied { owner: Some(ANN) }
    );
    let notes = engine.drain_notifications();
    assert!(has_notification(&notes, |n| n.message.contains("Ann")));

    // Owner clears her own crop; the soil opens up for anyone
    assert_eq!(engine.try_strike(ANN, crop, true), StrikeOutcome::Removed);
    let patch = &engine.session.farm.soil[&sw_tile()];
    assert!(patch.crop.is_none());
    assert_eq!(patch.attrs.owner(), None);

    // Host can now plant the freed tile
    plant(&mut engine, HOST, sw_tile(), "kale", false);
    assert_eq!(
        engine.session.farm.soil[&sw_tile()].attrs.owner(),
        Some(OwnerTag::Player(HOST))
    );
}

#[test]
fn chest_allow_list_gates_specific_chests() {
    let mut engine = ready_engine(HostMode::Private);
    let chest_tile = sw_tile();
    engine.handle(GameEvent::ObjectPlaced {
        player: ANN,
        tile: chest_tile,
        kind: ObjectKind::Chest,
    });
    let chest_id = engine.session.farm.object_at(chest_tile).unwrap().id;

    assert!(!engine.try_open_chest(HOST, chest_tile).is_allowed());

    engine.grant_chest_access(ANN, HOST, chest_id).unwrap();
    assert!(engine.try_open_chest(HOST, chest_tile).is_allowed());

    engine.revoke_chest_access(ANN, HOST, chest_id);
    assert!(!engine.try_open_chest(HOST, chest_tile).is_allowed());
}
