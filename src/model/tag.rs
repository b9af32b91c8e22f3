use std::collections::BTreeMap;

use serde::de;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::layout::Tile;
use super::player::PlayerId;
use crate::id::ResourceId;

/// Attribute-bag key holding the owner marker.
pub const OWNER_KEY: &str = "fencerow.owner";

const COMMON_VALUE: &str = "common";

/// The authoritative ownership marker on a resource.
///
/// Absence of a tag (`Option::None` everywhere in the API) means
/// "pre-existing/legacy, treat as open" — it is a meaningful third state,
/// not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OwnerTag {
    /// Shared produce; proceeds split among all active players.
    Common,
    Player(PlayerId),
}

impl OwnerTag {
    pub fn encode(&self) -> String {
        match self {
            OwnerTag::Common => COMMON_VALUE.to_string(),
            OwnerTag::Player(id) => id.0.to_string(),
        }
    }

    /// Parse a stored marker. Malformed values decode to `None` so a
    /// corrupted bag degrades to "untagged" instead of failing.
    pub fn decode(raw: &str) -> Option<OwnerTag> {
        if raw == COMMON_VALUE {
            return Some(OwnerTag::Common);
        }
        raw.parse::<u64>().ok().map(|id| OwnerTag::Player(PlayerId(id)))
    }

    pub fn player(&self) -> Option<PlayerId> {
        match self {
            OwnerTag::Player(id) => Some(*id),
            OwnerTag::Common => None,
        }
    }

    pub fn is_common(&self) -> bool {
        matches!(self, OwnerTag::Common)
    }
}

impl Serialize for OwnerTag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.encode())
    }
}

impl<'de> Deserialize<'de> for OwnerTag {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        OwnerTag::decode(&s).ok_or_else(|| de::Error::custom(format!("invalid owner tag {s:?}")))
    }
}

/// The kinds of entity that can carry an owner tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Soil,
    Crop,
    Tree,
    Machine,
    Chest,
    Building,
    ItemStack,
}

/// Address of a taggable entity, decided at creation time and dispatched by
/// pattern matching — never by runtime type inspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EntityRef {
    Soil { tile: Tile },
    Crop { tile: Tile },
    Tree { tile: Tile },
    /// A placed machine or chest; which one is a farm lookup.
    Object { tile: Tile },
    Building { id: ResourceId },
    Stack { id: ResourceId },
}

/// Per-entity string key/value attachment. Every taggable kind carries its
/// own bag (no shared table); the owner marker lives under [`OWNER_KEY`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttrBag(BTreeMap<String, String>);

impl AttrBag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) {
        self.0.remove(key);
    }

    pub fn owner(&self) -> Option<OwnerTag> {
        self.get(OWNER_KEY).and_then(OwnerTag::decode)
    }

    /// Write the owner marker only if none is present. Returns whether it
    /// wrote. Callers that intend replacement use [`AttrBag::replace_owner`].
    pub fn set_owner(&mut self, tag: OwnerTag) -> bool {
        if self.0.contains_key(OWNER_KEY) {
            return false;
        }
        self.0.insert(OWNER_KEY.to_string(), tag.encode());
        true
    }

    /// Explicitly overwrite the owner marker (machine re-load, common
    /// designation). Distinct from [`AttrBag::set_owner`] on purpose.
    pub fn replace_owner(&mut self, tag: OwnerTag) {
        self.0.insert(OWNER_KEY.to_string(), tag.encode());
    }

    pub fn clear_owner(&mut self) {
        self.0.remove(OWNER_KEY);
    }

    pub fn is_common(&self) -> bool {
        self.owner().is_some_and(|t| t.is_common())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_round_trips_through_encoding() {
        for tag in [OwnerTag::Common, OwnerTag::Player(PlayerId(77))] {
            assert_eq!(OwnerTag::decode(&tag.encode()), Some(tag));
        }
    }

    #[test]
    fn malformed_marker_decodes_to_none() {
        assert_eq!(OwnerTag::decode(""), None);
        assert_eq!(OwnerTag::decode("not-a-player"), None);
        assert_eq!(OwnerTag::decode("-3"), None);
    }

    #[test]
    fn set_owner_never_overwrites() {
        let mut bag = AttrBag::new();
        assert!(bag.set_owner(OwnerTag::Player(PlayerId(1))));
        assert!(!bag.set_owner(OwnerTag::Player(PlayerId(2))));
        assert_eq!(bag.owner(), Some(OwnerTag::Player(PlayerId(1))));
    }

    #[test]
    fn replace_owner_is_explicit() {
        let mut bag = AttrBag::new();
        bag.set_owner(OwnerTag::Player(PlayerId(1)));
        bag.replace_owner(OwnerTag::Common);
        assert_eq!(bag.owner(), Some(OwnerTag::Common));
        assert!(bag.is_common());
    }

    #[test]
    fn clear_owner_returns_bag_to_open() {
        let mut bag = AttrBag::new();
        bag.set_owner(OwnerTag::Player(PlayerId(1)));
        bag.clear_owner();
        assert_eq!(bag.owner(), None);
        assert!(bag.set_owner(OwnerTag::Player(PlayerId(2))));
    }

    #[test]
    fn at_most_one_tag_state_active() {
        let mut bag = AttrBag::new();
        bag.set_owner(OwnerTag::Common);
        assert!(bag.is_common());
        assert_eq!(bag.owner().and_then(|t| t.player()), None);
        bag.replace_owner(OwnerTag::Player(PlayerId(4)));
        assert!(!bag.is_common());
        assert_eq!(bag.owner().and_then(|t| t.player()), Some(PlayerId(4)));
    }

    #[test]
    fn serde_as_plain_string() {
        let json = serde_json::to_string(&OwnerTag::Common).unwrap();
        assert_eq!(json, "\"common\"");
        let json = serde_json::to_string(&OwnerTag::Player(PlayerId(12))).unwrap();
        assert_eq!(json, "\"12\"");
        let back: OwnerTag = serde_json::from_str("\"12\"").unwrap();
        assert_eq!(back, OwnerTag::Player(PlayerId(12)));
        assert!(serde_json::from_str::<OwnerTag>("\"bogus\"").is_err());
    }
}
