use thiserror::Error;

use crate::model::territory::HostMode;

/// Errors surfaced by fallible engine operations.
///
/// Enforcement denials are not errors — they are normal outcomes reported
/// through [`crate::notify::Notification`]s. Deserialization failures are
/// recovered internally by defaulting and are never surfaced here.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// A trust grant that can never be valid (self-trust, unknown player).
    #[error("invalid trust grant: {reason}")]
    InvalidGrant { reason: String },

    /// The territory state machine is already locked; the transition is
    /// one-way for the life of the session.
    #[error("territory is already locked")]
    AlreadyLocked,

    /// The requested host mode is not offered at this roster size.
    #[error("{mode:?} mode is unavailable with {players} players")]
    ModeUnavailable { mode: HostMode, players: usize },

    /// A host-only mutation was attempted on a non-authoritative process.
    #[error("only the authoritative host may {action}")]
    NotAuthority { action: &'static str },
}

impl EngineError {
    pub(crate) fn invalid_grant(reason: impl Into<String>) -> Self {
        EngineError::InvalidGrant {
            reason: reason.into(),
        }
    }
}
