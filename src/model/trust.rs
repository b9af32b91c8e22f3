use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::player::PlayerId;
use crate::id::ResourceId;

/// Categories a trust grant can cover. Chests are not a category — they use
/// a per-chest allow-list on the grant instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionCategory {
    Crops,
    Machines,
    Animals,
    Buildings,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionSet {
    pub crops: bool,
    pub machines: bool,
    pub animals: bool,
    pub buildings: bool,
}

impl PermissionSet {
    pub fn all() -> Self {
        Self {
            crops: true,
            machines: true,
            animals: true,
            buildings: true,
        }
    }

    pub fn allows(&self, category: PermissionCategory) -> bool {
        match category {
            PermissionCategory::Crops => self.crops,
            PermissionCategory::Machines => self.machines,
            PermissionCategory::Animals => self.animals,
            PermissionCategory::Buildings => self.buildings,
        }
    }
}

/// A time-boxed, revocable permission from a resource owner to another
/// player. At most one record exists per (grantor, grantee) pair — category
/// changes and chest grants merge into the same record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustGrant {
    pub grantee: PlayerId,
    /// Absolute day the grant was (last) issued.
    pub granted_on_day: u32,
    /// Days until expiration; 0 never expires.
    pub expiration_days: u32,
    pub permissions: PermissionSet,
    /// Specific chests the grantee may open regardless of categories.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub chests: BTreeSet<ResourceId>,
}

impl TrustGrant {
    pub fn expired(&self, current_day: u32) -> bool {
        self.expiration_days > 0
            && current_day.saturating_sub(self.granted_on_day) >= self.expiration_days
    }
}
