//! Trust ledger: per-owner grants to other players, with category
//! permissions, per-chest allow-lists and day-based expiration.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::id::ResourceId;
use crate::model::player::PlayerId;
use crate::model::trust::{PermissionCategory, PermissionSet, TrustGrant};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrustLedger {
    grants: BTreeMap<PlayerId, Vec<TrustGrant>>,
}

impl TrustLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Grant (or refresh) trust from `grantor` to `grantee`. Idempotent:
    /// an existing record is updated in place, never duplicated; its chest
    /// allow-list survives the update.
    pub fn grant(
        &mut self,
        grantor: PlayerId,
        grantee: PlayerId,
        expiration_days: u32,
        permissions: PermissionSet,
        current_day: u32,
    ) -> Result<(), EngineError> {
        if grantor == grantee {
            return Err(EngineError::invalid_grant("cannot grant trust to yourself"));
        }

        let records = self.grants.entry(grantor).or_default();
        if let Some(existing) = records.iter_mut().find(|g| g.grantee == grantee) {
            existing.granted_on_day = current_day;
            existing.expiration_days = expiration_days;
            existing.permissions = permissions;
            tracing::debug!(%grantor, %grantee, expiration_days, "trust updated");
        } else {
            records.push(TrustGrant {
                grantee,
                granted_on_day: current_day,
                expiration_days,
                permissions,
                chests: Default::default(),
            });
            tracing::debug!(%grantor, %grantee, expiration_days, "trust granted");
        }
        Ok(())
    }

    /// Remove the whole trust record for the pair. Returns whether one
    /// existed.
    pub fn revoke(&mut self, grantor: PlayerId, grantee: PlayerId) -> bool {
        let Some(records) = self.grants.get_mut(&grantor) else {
            return false;
        };
        let before = records.len();
        records.retain(|g| g.grantee != grantee);
        records.len() != before
    }

    /// Allow `grantee` to open one specific chest. Creates a record with no
    /// category permissions if none exists yet.
    pub fn grant_chest(
        &mut self,
        grantor: PlayerId,
        grantee: PlayerId,
        chest: ResourceId,
        expiration_days: u32,
        current_day: u32,
    ) -> Result<(), EngineError> {
        if grantor == grantee {
            return Err(EngineError::invalid_grant("cannot grant trust to yourself"));
        }

        let records = self.grants.entry(grantor).or_default();
        if let Some(existing) = records.iter_mut().find(|g| g.grantee == grantee) {
            existing.chests.insert(chest);
        } else {
            let mut grant = TrustGrant {
                grantee,
                granted_on_day: current_day,
                expiration_days,
                permissions: PermissionSet::default(),
                chests: Default::default(),
            };
            grant.chests.insert(chest);
            records.push(grant);
        }
        Ok(())
    }

    pub fn revoke_chest(&mut self, grantor: PlayerId, grantee: PlayerId, chest: ResourceId) -> bool {
        self.grants
            .get_mut(&grantor)
            .and_then(|records| records.iter_mut().find(|g| g.grantee == grantee))
            .is_some_and(|g| g.chests.remove(&chest))
    }

    pub fn grant_for(&self, grantor: PlayerId, grantee: PlayerId) -> Option<&TrustGrant> {
        self.grants
            .get(&grantor)?
            .iter()
            .find(|g| g.grantee == grantee)
    }

    /// Whether `accessor` may act on `owner`'s resources in this category.
    /// Owners always pass their own check.
    pub fn has_permission(
        &self,
        owner: PlayerId,
        accessor: PlayerId,
        category: PermissionCategory,
        current_day: u32,
    ) -> bool {
        if owner == accessor {
            return true;
        }
        self.grant_for(owner, accessor)
            .is_some_and(|g| !g.expired(current_day) && g.permissions.allows(category))
    }

    /// Whether `accessor` may open this specific chest of `owner`'s.
    pub fn has_chest_access(
        &self,
        owner: PlayerId,
        accessor: PlayerId,
        chest: ResourceId,
        current_day: u32,
    ) -> bool {
        if owner == accessor {
            return true;
        }
        self.grant_for(owner, accessor)
            .is_some_and(|g| !g.expired(current_day) && g.chests.contains(&chest))
    }

    /// Drop every expired grant, for all grantors. Returns the removed
    /// (grantor, grantee) pairs so the caller can notify. Run once per
    /// in-world day.
    pub fn prune_expired(&mut self, current_day: u32) -> Vec<(PlayerId, PlayerId)> {
        let mut removed = Vec::new();
        for (grantor, records) in &mut self.grants {
            records.retain(|g| {
                if g.expired(current_day) {
                    tracing::debug!(grantor = %grantor, grantee = %g.grantee, "trust expired");
                    removed.push((*grantor, g.grantee));
                    false
                } else {
                    true
                }
            });
        }
        self.grants.retain(|_, records| !records.is_empty());
        removed
    }

    pub fn outgoing(&self, grantor: PlayerId) -> &[TrustGrant] {
        self.grants
            .get(&grantor)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OWNER: PlayerId = PlayerId(1);
    const GUEST: PlayerId = PlayerId(2);

    fn crops_only() -> PermissionSet {
        PermissionSet {
            crops: true,
            ..Default::default()
        }
    }

    #[test]
    fn grant_then_check_round_trip() {
        let mut ledger = TrustLedger::new();
        ledger.grant(OWNER, GUEST, 7, crops_only(), 0).unwrap();
        assert!(ledger.has_permission(OWNER, GUEST, PermissionCategory::Crops, 0));
        assert!(!ledger.has_permission(OWNER, GUEST, PermissionCategory::Machines, 0));
    }

    #[test]
    fn revoke_then_check_returns_false() {
        let mut ledger = TrustLedger::new();
        ledger.grant(OWNER, GUEST, 0, crops_only(), 0).unwrap();
        assert!(ledger.revoke(OWNER, GUEST));
        assert!(!ledger.has_permission(OWNER, GUEST, PermissionCategory::Crops, 0));
        assert!(!ledger.revoke(OWNER, GUEST));
    }

    #[test]
    fn self_grant_rejected() {
        let mut ledger = TrustLedger::new();
        assert!(matches!(
            ledger.grant(OWNER, OWNER, 7, crops_only(), 0),
            Err(EngineError::InvalidGrant { .. })
        ));
        assert!(matches!(
            ledger.grant_chest(OWNER, OWNER, ResourceId(1), 7, 0),
            Err(EngineError::InvalidGrant { .. })
        ));
    }

    #[test]
    fn owner_always_passes_own_check() {
        let ledger = TrustLedger::new();
        assert!(ledger.has_permission(OWNER, OWNER, PermissionCategory::Buildings, 99));
        assert!(ledger.has_chest_access(OWNER, OWNER, ResourceId(5), 99));
    }

    #[test]
    fn regrant_updates_in_place() {
        let mut ledger = TrustLedger::new();
        ledger
            .grant_chest(OWNER, GUEST, ResourceId(9), 0, 0)
            .unwrap();
        ledger.grant(OWNER, GUEST, 3, PermissionSet::all(), 5).unwrap();
        assert_eq!(ledger.outgoing(OWNER).len(), 1);
        let grant = ledger.grant_for(OWNER, GUEST).unwrap();
        assert_eq!(grant.granted_on_day, 5);
        assert_eq!(grant.expiration_days, 3);
        // Chest allow-list survives the category update
        assert!(grant.chests.contains(&ResourceId(9)));
    }

    #[test]
    fn expiration_boundary() {
        let mut ledger = TrustLedger::new();
        ledger.grant(OWNER, GUEST, 7, crops_only(), 10).unwrap();
        assert!(ledger.has_permission(OWNER, GUEST, PermissionCategory::Crops, 16));
        assert!(!ledger.has_permission(OWNER, GUEST, PermissionCategory::Crops, 17));
    }

    #[test]
    fn prune_removes_only_expired_and_reports_pairs() {
        let mut ledger = TrustLedger::new();
        ledger.grant(OWNER, GUEST, 7, crops_only(), 0).unwrap();
        ledger
            .grant(OWNER, PlayerId(3), 0, crops_only(), 0)
            .unwrap();
        ledger
            .grant(PlayerId(3), GUEST, 2, crops_only(), 0)
            .unwrap();

        let removed = ledger.prune_expired(7);
        assert_eq!(removed, vec![(OWNER, GUEST), (PlayerId(3), GUEST)]);
        assert!(ledger.grant_for(OWNER, GUEST).is_none());
        assert!(ledger.grant_for(OWNER, PlayerId(3)).is_some());

        // Idempotent on re-run
        assert!(ledger.prune_expired(7).is_empty());
    }

    #[test]
    fn chest_access_expires_with_the_record() {
        let mut ledger = TrustLedger::new();
        ledger
            .grant_chest(OWNER, GUEST, ResourceId(4), 2, 0)
            .unwrap();
        assert!(ledger.has_chest_access(OWNER, GUEST, ResourceId(4), 1));
        assert!(!ledger.has_chest_access(OWNER, GUEST, ResourceId(4), 2));
        assert!(!ledger.has_chest_access(OWNER, GUEST, ResourceId(5), 1));
    }
}
