//! Pasture zones: square protection regions around animal buildings so
//! other players cannot till or tear up grazing land next to someone's coop
//! or barn.

use std::collections::BTreeMap;

use crate::config::EngineConfig;
use crate::id::ResourceId;
use crate::ledger::TrustLedger;
use crate::model::farm::{Building, BuildingKind};
use crate::model::layout::Tile;
use crate::model::player::PlayerId;
use crate::model::trust::PermissionCategory;
use crate::resolver::Decision;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PastureZone {
    pub building: ResourceId,
    pub owner: Option<PlayerId>,
    pub center: Tile,
    /// Half the zone edge length; the zone is a square around the center.
    pub half_extent: i32,
}

impl PastureZone {
    pub fn contains(&self, tile: Tile) -> bool {
        (tile.x - self.center.x).abs() <= self.half_extent
            && (tile.y - self.center.y).abs() <= self.half_extent
    }
}

#[derive(Debug, Clone, Default)]
pub struct PastureMap {
    zones: BTreeMap<ResourceId, PastureZone>,
}

impl PastureMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a zone for an animal building. Other building kinds get no
    /// zone. The zone's owner is the building's purchaser.
    pub fn add_building(&mut self, building: &Building, config: &EngineConfig) {
        let size = match building.kind {
            BuildingKind::Coop => config.coop_pasture_size,
            BuildingKind::Barn => config.barn_pasture_size,
            BuildingKind::Cabin | BuildingKind::Shed => return,
        };
        let owner = building.attrs.owner().and_then(|t| t.player());
        self.zones.insert(
            building.id,
            PastureZone {
                building: building.id,
                owner,
                center: building.tile,
                half_extent: size / 2,
            },
        );
        tracing::debug!(building = %building.id, ?owner, size, "pasture zone created");
    }

    pub fn remove_building(&mut self, building: ResourceId) {
        if self.zones.remove(&building).is_some() {
            tracing::debug!(building = %building, "pasture zone removed");
        }
    }

    pub fn zone_at(&self, tile: Tile) -> Option<&PastureZone> {
        self.zones.values().find(|z| z.contains(tile))
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }
}

/// Authorize tilling / destructive ground work at a tile. Outside any zone,
/// or inside an ownerless zone, anyone may act; inside an owned zone the
/// actor needs to be the owner or hold an Animals grant.
pub fn authorize_ground_work(
    pastures: &PastureMap,
    ledger: &TrustLedger,
    current_day: u32,
    actor: PlayerId,
    tile: Tile,
) -> Decision {
    match pastures.zone_at(tile).and_then(|z| z.owner) {
        None => Decision::Allowed,
        Some(owner) => {
            if ledger.has_permission(owner, actor, PermissionCategory::Animals, current_day) {
                Decision::Allowed
            } else {
                Decision::Denied { owner: Some(owner) }
            }
        }
    }
}
