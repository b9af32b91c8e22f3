pub mod clock;
pub mod farm;
pub mod layout;
pub mod player;
pub mod tag;
pub mod territory;
pub mod trust;

pub use clock::GameClock;
pub use farm::{Building, BuildingKind, CropPatch, Farm, ItemStack, ObjectKind, PlacedObject};
pub use layout::{FarmLayout, Passage, Quadrant, Tile};
pub use player::{PlayerId, PlayerInfo, Roster};
pub use tag::{AttrBag, EntityKind, EntityRef, OwnerTag};
pub use territory::{HostMode, TerritoryLocked, TerritoryState};
pub use trust::{PermissionCategory, PermissionSet, TrustGrant};
