use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::layout::{Quadrant, Tile};
use super::player::PlayerId;
use super::tag::AttrBag;
use crate::id::{IdGenerator, ResourceId};

/// A crop growing in a soil patch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CropPatch {
    pub seed: String,
    /// Regrowing crops survive harvest; single-yield crops are consumed.
    pub regrows: bool,
    pub attrs: AttrBag,
}

/// A tilled soil tile, optionally holding a crop.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SoilPatch {
    pub attrs: AttrBag,
    pub crop: Option<CropPatch>,
}

/// A planted (wild or fruit) tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlantedTree {
    pub attrs: AttrBag,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    Machine,
    Chest,
}

/// A placed world object. Machines hold their pending output inline so the
/// output sweep can tag it before any player collects it; chests hold stack
/// ids into [`Farm::stacks`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacedObject {
    pub id: ResourceId,
    pub kind: ObjectKind,
    pub attrs: AttrBag,
    pub held_output: Option<ItemStack>,
    pub contents: Vec<ResourceId>,
}

impl PlacedObject {
    pub fn new(id: ResourceId, kind: ObjectKind) -> Self {
        Self {
            id,
            kind,
            attrs: AttrBag::new(),
            held_output: None,
            contents: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildingKind {
    Cabin,
    Coop,
    Barn,
    Shed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Building {
    pub id: ResourceId,
    pub kind: BuildingKind,
    pub tile: Tile,
    pub attrs: AttrBag,
}

/// A stack of identical items with a per-unit sale value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemStack {
    pub id: ResourceId,
    pub item: String,
    pub count: u32,
    pub unit_value: i64,
    pub attrs: AttrBag,
}

impl ItemStack {
    pub fn total_value(&self) -> i64 {
        self.unit_value * i64::from(self.count)
    }
}

/// The mutable farm world as far as ownership is concerned: soil, trees,
/// placed objects, buildings, item stacks, inventories and shipping bins.
///
/// Everything else about these resources (sprites, growth timers, machine
/// recipes) belongs to the host game; this model carries only what the tag
/// rules and enforcement points consult.
#[derive(Debug, Clone, Default)]
pub struct Farm {
    pub soil: BTreeMap<Tile, SoilPatch>,
    pub trees: BTreeMap<Tile, PlantedTree>,
    pub objects: BTreeMap<Tile, PlacedObject>,
    pub buildings: BTreeMap<ResourceId, Building>,
    pub stacks: BTreeMap<ResourceId, ItemStack>,
    pub inventories: BTreeMap<PlayerId, Vec<ResourceId>>,
    pub shipping: BTreeMap<Quadrant, Vec<ResourceId>>,
    pub id_gen: IdGenerator,
}

impl Farm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn object_at(&self, tile: Tile) -> Option<&PlacedObject> {
        self.objects.get(&tile)
    }

    pub fn object_at_mut(&mut self, tile: Tile) -> Option<&mut PlacedObject> {
        self.objects.get_mut(&tile)
    }

    pub fn stack(&self, id: ResourceId) -> Option<&ItemStack> {
        self.stacks.get(&id)
    }

    pub fn stack_mut(&mut self, id: ResourceId) -> Option<&mut ItemStack> {
        self.stacks.get_mut(&id)
    }

    /// Create a new, untagged stack.
    pub fn new_stack(&mut self, item: impl Into<String>, count: u32, unit_value: i64) -> ResourceId {
        let id = self.id_gen.next_id();
        self.stacks.insert(
            id,
            ItemStack {
                id,
                item: item.into(),
                count,
                unit_value,
                attrs: AttrBag::new(),
            },
        );
        id
    }

    pub fn place_object(&mut self, tile: Tile, kind: ObjectKind) -> ResourceId {
        let id = self.id_gen.next_id();
        self.objects.insert(tile, PlacedObject::new(id, kind));
        id
    }

    pub fn add_building(&mut self, kind: BuildingKind, tile: Tile) -> ResourceId {
        let id = self.id_gen.next_id();
        self.buildings.insert(
            id,
            Building {
                id,
                kind,
                tile,
                attrs: AttrBag::new(),
            },
        );
        id
    }

    pub fn inventory(&self, player: PlayerId) -> &[ResourceId] {
        self.inventories
            .get(&player)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn inventory_contains(&self, player: PlayerId, stack: ResourceId) -> bool {
        self.inventory(player).contains(&stack)
    }

    /// Remove a stack id from a player's inventory. Returns whether it was
    /// actually held.
    pub fn remove_from_inventory(&mut self, player: PlayerId, stack: ResourceId) -> bool {
        let Some(items) = self.inventories.get_mut(&player) else {
            return false;
        };
        let before = items.len();
        items.retain(|id| *id != stack);
        items.len() != before
    }

    pub fn shipped(&self, quadrant: Quadrant) -> &[ResourceId] {
        self.shipping
            .get(&quadrant)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}
