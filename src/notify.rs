use serde::{Deserialize, Serialize};

use crate::id::ResourceId;
use crate::model::player::PlayerId;
use crate::model::territory::HostMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warn,
    Error,
}

/// What happened, for consumers that want to react beyond showing text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NotificationKind {
    /// An action was blocked by ownership enforcement.
    AccessDenied { owner: Option<PlayerId> },
    TrustGranted { grantor: PlayerId, grantee: PlayerId },
    TrustRevoked { grantor: PlayerId, grantee: PlayerId },
    TrustExpired { grantor: PlayerId, grantee: PlayerId },
    TerritoryLocked { mode: HostMode, player_count: usize },
    CommonRevenueDistributed { total: i64, per_player: i64 },
    LandlordCut { total: i64 },
    JoinWarning,
    CommonChestDesignated { chest: ResourceId, common: bool },
}

/// A user-facing message handed to the embedder's notification UI.
/// The engine never renders anything itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub severity: Severity,
    pub message: String,
}

impl Notification {
    pub fn new(kind: NotificationKind, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity,
            message: message.into(),
        }
    }
}
