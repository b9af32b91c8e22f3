//! Ownership resolver — the single source of truth for "who owns this".
//!
//! Every enforcement point (harvesting, tool strikes, machine use, chest
//! access, shipping) goes through this module; nothing else reads tags
//! directly off the attribute bags, so two code paths can never disagree
//! about the same resource.

use crate::ledger::TrustLedger;
use crate::model::farm::{Farm, ObjectKind};
use crate::model::player::PlayerId;
use crate::model::tag::{EntityKind, EntityRef, OwnerTag};
use crate::model::trust::PermissionCategory;

/// What the resolved tag means for an acting player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Untagged / legacy resource: anyone may act.
    Open,
    /// Shared resource: anyone may act.
    Common,
    /// Only the owner or a trusted grantee may act.
    Owned(PlayerId),
}

/// Outcome of an authorization check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed,
    Denied { owner: Option<PlayerId> },
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allowed)
    }
}

/// Resolve the effective owner tag of an entity, applying the kind-specific
/// fallback order (a crop falls back to its soil).
///
/// A reference that no longer points at anything resolves to `None`: stale
/// references fail open rather than wedging the host game.
pub fn resolve_owner(farm: &Farm, entity: EntityRef) -> Option<OwnerTag> {
    match entity {
        EntityRef::Soil { tile } => farm.soil.get(&tile)?.attrs.owner(),
        EntityRef::Crop { tile } => {
            let patch = farm.soil.get(&tile)?;
            match &patch.crop {
                Some(crop) => crop.attrs.owner().or_else(|| patch.attrs.owner()),
                None => patch.attrs.owner(),
            }
        }
        EntityRef::Tree { tile } => farm.trees.get(&tile)?.attrs.owner(),
        EntityRef::Object { tile } => farm.objects.get(&tile)?.attrs.owner(),
        EntityRef::Building { id } => match farm.buildings.get(&id) {
            Some(building) => building.attrs.owner(),
            None => {
                tracing::warn!(%id, "owner lookup on unknown building; treating as open");
                None
            }
        },
        EntityRef::Stack { id } => match farm.stacks.get(&id) {
            Some(stack) => stack.attrs.owner(),
            None => {
                tracing::warn!(%id, "owner lookup on unknown stack; treating as open");
                None
            }
        },
    }
}

pub fn access(farm: &Farm, entity: EntityRef) -> Access {
    match resolve_owner(farm, entity) {
        None => Access::Open,
        Some(OwnerTag::Common) => Access::Common,
        Some(OwnerTag::Player(id)) => Access::Owned(id),
    }
}

/// The entity kind behind a reference, resolving placed objects to machine
/// or chest.
pub fn entity_kind(farm: &Farm, entity: EntityRef) -> Option<EntityKind> {
    match entity {
        EntityRef::Soil { .. } => Some(EntityKind::Soil),
        EntityRef::Crop { .. } => Some(EntityKind::Crop),
        EntityRef::Tree { .. } => Some(EntityKind::Tree),
        EntityRef::Object { tile } => match farm.object_at(tile)?.kind {
            ObjectKind::Machine => Some(EntityKind::Machine),
            ObjectKind::Chest => Some(EntityKind::Chest),
        },
        EntityRef::Building { .. } => Some(EntityKind::Building),
        EntityRef::Stack { .. } => Some(EntityKind::ItemStack),
    }
}

/// Authorize an action in a trust category: open and common resources allow
/// anyone; owned resources allow the owner and grantees holding the
/// category.
pub fn authorize(
    farm: &Farm,
    ledger: &TrustLedger,
    current_day: u32,
    actor: PlayerId,
    entity: EntityRef,
    category: PermissionCategory,
) -> Decision {
    match access(farm, entity) {
        Access::Open | Access::Common => Decision::Allowed,
        Access::Owned(owner) => {
            if ledger.has_permission(owner, actor, category, current_day) {
                Decision::Allowed
            } else {
                Decision::Denied { owner: Some(owner) }
            }
        }
    }
}

/// Authorize chest access. Chests do not use a category: access is owner,
/// common designation, or the per-chest allow-list.
pub fn authorize_chest(
    farm: &Farm,
    ledger: &TrustLedger,
    current_day: u32,
    actor: PlayerId,
    entity: EntityRef,
) -> Decision {
    let EntityRef::Object { tile } = entity else {
        tracing::warn!(?entity, "chest authorization on non-object reference");
        return Decision::Allowed;
    };
    let Some(object) = farm.object_at(tile) else {
        return Decision::Allowed;
    };
    match access(farm, entity) {
        Access::Open | Access::Common => Decision::Allowed,
        Access::Owned(owner) => {
            if owner == actor || ledger.has_chest_access(owner, actor, object.id, current_day) {
                Decision::Allowed
            } else {
                Decision::Denied { owner: Some(owner) }
            }
        }
    }
}
