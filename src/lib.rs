pub mod boundary;
pub mod chain;
pub mod commons;
pub mod config;
pub mod engine;
pub mod error;
pub mod id;
pub mod ledger;
pub mod model;
pub mod notify;
pub mod pasture;
pub mod persist;
pub mod resolver;
pub mod session;
pub mod territory;
pub mod testutil;

pub use config::EngineConfig;
pub use engine::{Engine, GameEvent};
pub use error::EngineError;
pub use id::{IdGenerator, ResourceId};
pub use ledger::TrustLedger;
pub use model::{
    EntityRef, FarmLayout, GameClock, HostMode, OwnerTag, PermissionCategory, PermissionSet,
    PlayerId, Quadrant, Roster, TerritoryLocked, TerritoryState, Tile, TrustGrant,
};
pub use notify::{Notification, NotificationKind, Severity};
pub use session::Session;
