//! Persistence: keyed opaque blobs handed to the embedder's save surface,
//! plus a filesystem snapshot for inspection and tests.
//!
//! Loading never fails: a missing or corrupt blob falls back to its default
//! value with a warning. Breaking the host game over a bad save record is
//! the one thing this layer must never do.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::commons;
use crate::id::ResourceId;
use crate::ledger::TrustLedger;
use crate::model::farm::Farm;
use crate::model::tag::{EntityRef, OwnerTag};
use crate::model::territory::TerritoryState;
use crate::session::Session;

/// Blob keys, namespaced so they can share the embedder's key/value surface
/// with anything else.
pub mod keys {
    pub const TERRITORY: &str = "fencerow/territory";
    pub const TRUST: &str = "fencerow/trust";
    pub const COMMON_CHESTS: &str = "fencerow/common-chests";
    pub const TAGS: &str = "fencerow/tags";
}

/// The keyed storage surface the embedder provides. Values are opaque to
/// the transport.
pub trait BlobStore {
    fn read(&self, key: &str) -> Option<String>;
    fn write(&mut self, key: &str, value: String);
}

#[derive(Debug, Clone, Default)]
pub struct MemoryBlobStore {
    blobs: BTreeMap<String, String>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BlobStore for MemoryBlobStore {
    fn read(&self, key: &str) -> Option<String> {
        self.blobs.get(key).cloned()
    }

    fn write(&mut self, key: &str, value: String) {
        self.blobs.insert(key.to_string(), value);
    }
}

/// One persisted owner tag: which entity, which tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagRecord {
    pub entity: EntityRef,
    pub tag: OwnerTag,
}

/// Write every persisted blob for a session.
pub fn save(store: &mut dyn BlobStore, session: &Session) {
    write_json(store, keys::TERRITORY, &session.territory);
    write_json(store, keys::TRUST, &session.trust);
    write_json(store, keys::COMMON_CHESTS, &commons::common_chest_ids(session));
    write_json(store, keys::TAGS, &collect_tags(&session.farm));
}

pub fn load_territory(store: &dyn BlobStore) -> TerritoryState {
    decode_or_default(keys::TERRITORY, store.read(keys::TERRITORY))
}

pub fn load_trust(store: &dyn BlobStore) -> TrustLedger {
    decode_or_default(keys::TRUST, store.read(keys::TRUST))
}

pub fn load_common_chests(store: &dyn BlobStore) -> Vec<ResourceId> {
    decode_or_default(keys::COMMON_CHESTS, store.read(keys::COMMON_CHESTS))
}

pub fn load_tags(store: &dyn BlobStore) -> Vec<TagRecord> {
    decode_or_default(keys::TAGS, store.read(keys::TAGS))
}

fn write_json<T: Serialize>(store: &mut dyn BlobStore, key: &str, value: &T) {
    match serde_json::to_string(value) {
        Ok(json) => store.write(key, json),
        Err(err) => tracing::warn!(key, %err, "failed to serialize blob; skipping write"),
    }
}

fn decode_or_default<T: DeserializeOwned + Default>(key: &str, raw: Option<String>) -> T {
    let Some(json) = raw else {
        return T::default();
    };
    match serde_json::from_str(&json) {
        Ok(value) => value,
        Err(err) => {
            tracing::warn!(key, %err, "corrupt persisted blob; falling back to default");
            T::default()
        }
    }
}

/// Extract every owner tag on the farm as flat records.
pub fn collect_tags(farm: &Farm) -> Vec<TagRecord> {
    let mut records = Vec::new();
    for (&tile, patch) in &farm.soil {
        if let Some(tag) = patch.attrs.owner() {
            records.push(TagRecord {
                entity: EntityRef::Soil { tile },
                tag,
            });
        }
        if let Some(tag) = patch.crop.as_ref().and_then(|c| c.attrs.owner()) {
            records.push(TagRecord {
                entity: EntityRef::Crop { tile },
                tag,
            });
        }
    }
    for (&tile, tree) in &farm.trees {
        if let Some(tag) = tree.attrs.owner() {
            records.push(TagRecord {
                entity: EntityRef::Tree { tile },
                tag,
            });
        }
    }
    for (&tile, object) in &farm.objects {
        if let Some(tag) = object.attrs.owner() {
            records.push(TagRecord {
                entity: EntityRef::Object { tile },
                tag,
            });
        }
    }
    for (&id, building) in &farm.buildings {
        if let Some(tag) = building.attrs.owner() {
            records.push(TagRecord {
                entity: EntityRef::Building { id },
                tag,
            });
        }
    }
    for (&id, stack) in &farm.stacks {
        if let Some(tag) = stack.attrs.owner() {
            records.push(TagRecord {
                entity: EntityRef::Stack { id },
                tag,
            });
        }
    }
    records
}

/// Re-apply persisted tag records onto a rebuilt farm. Restoring a snapshot
/// is an explicit overwrite; records pointing at entities that no longer
/// exist are skipped with a warning.
pub fn apply_tags(farm: &mut Farm, records: &[TagRecord]) {
    for record in records {
        let applied = match record.entity {
            EntityRef::Soil { tile } => farm
                .soil
                .get_mut(&tile)
                .map(|p| p.attrs.replace_owner(record.tag))
                .is_some(),
            EntityRef::Crop { tile } => farm
                .soil
                .get_mut(&tile)
                .and_then(|p| p.crop.as_mut())
                .map(|c| c.attrs.replace_owner(record.tag))
                .is_some(),
            EntityRef::Tree { tile } => farm
                .trees
                .get_mut(&tile)
                .map(|t| t.attrs.replace_owner(record.tag))
                .is_some(),
            EntityRef::Object { tile } => farm
                .objects
                .get_mut(&tile)
                .map(|o| o.attrs.replace_owner(record.tag))
                .is_some(),
            EntityRef::Building { id } => farm
                .buildings
                .get_mut(&id)
                .map(|b| b.attrs.replace_owner(record.tag))
                .is_some(),
            EntityRef::Stack { id } => farm
                .stacks
                .get_mut(&id)
                .map(|s| s.attrs.replace_owner(record.tag))
                .is_some(),
        };
        if !applied {
            tracing::warn!(entity = ?record.entity, "tag record targets a missing entity; skipped");
        }
    }
}

/// Dump a session's persisted blobs as files in a directory: JSON for the
/// structured records, JSONL (one record per line) for the tag list.
pub fn snapshot_to_dir(session: &Session, output_dir: &Path) -> io::Result<()> {
    fs::create_dir_all(output_dir)?;

    write_json_file(&output_dir.join("territory.json"), &session.territory)?;
    write_json_file(&output_dir.join("trust.json"), &session.trust)?;
    write_json_file(
        &output_dir.join("common_chests.json"),
        &commons::common_chest_ids(session),
    )?;

    let mut writer = BufWriter::new(File::create(output_dir.join("tags.jsonl"))?);
    for record in collect_tags(&session.farm) {
        serde_json::to_writer(&mut writer, &record)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()
}

fn write_json_file<T: Serialize>(path: &Path, value: &T) -> io::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::farm::ObjectKind;
    use crate::model::layout::{FarmLayout, Tile};
    use crate::model::player::{PlayerId, Roster};
    use crate::model::tag::OwnerTag;
    use crate::model::territory::HostMode;
    use crate::territory::lock;

    fn session_with_state() -> Session {
        let mut roster = Roster::new(PlayerId(1), "Host");
        roster.join(PlayerId(2), "Ann", Some(Tile::new(17, 43)));
        let mut session = Session::new(roster, FarmLayout::four_corners());
        lock(&mut session.territory, HostMode::Landlord, 2, 4).unwrap();

        crate::chain::plant(&mut session, PlayerId(2), Tile::new(20, 50), "parsnip", false);
        let chest_tile = Tile::new(60, 50);
        session.farm.place_object(chest_tile, ObjectKind::Chest);
        commons::designate_common_chest(&mut session, chest_tile, true);
        let stack = session.farm.new_stack("wine", 1, 400);
        session
            .farm
            .stack_mut(stack)
            .unwrap()
            .attrs
            .set_owner(OwnerTag::Player(PlayerId(2)));
        session
    }

    #[test]
    fn blobs_round_trip() {
        let session = session_with_state();
        let mut store = MemoryBlobStore::new();
        save(&mut store, &session);

        assert_eq!(load_territory(&store), session.territory);
        assert_eq!(load_trust(&store), session.trust);
        assert_eq!(load_common_chests(&store).len(), 1);
        let tags = load_tags(&store);
        assert_eq!(tags, collect_tags(&session.farm));
        // soil + crop + chest + stack
        assert_eq!(tags.len(), 4);
    }

    #[test]
    fn corrupt_blob_falls_back_to_default() {
        let mut store = MemoryBlobStore::new();
        store.write(keys::TERRITORY, "{not json".to_string());
        store.write(keys::TRUST, "[[]]".to_string());
        assert_eq!(load_territory(&store), TerritoryState::new());
        assert_eq!(load_trust(&store), TrustLedger::new());
    }

    #[test]
    fn missing_blob_is_default() {
        let store = MemoryBlobStore::new();
        assert_eq!(load_territory(&store), TerritoryState::new());
        assert!(load_tags(&store).is_empty());
    }

    #[test]
    fn tags_reapply_onto_rebuilt_farm() {
        let session = session_with_state();
        let records = collect_tags(&session.farm);

        // A rebuilt farm with the same shape but no tags
        let mut farm = Farm::new();
        farm.soil.insert(Tile::new(20, 50), Default::default());
        farm.soil.get_mut(&Tile::new(20, 50)).unwrap().crop = Some(
            crate::model::farm::CropPatch {
                seed: "parsnip".to_string(),
                regrows: false,
                attrs: Default::default(),
            },
        );

        apply_tags(&mut farm, &records);
        assert_eq!(
            farm.soil[&Tile::new(20, 50)].attrs.owner(),
            Some(OwnerTag::Player(PlayerId(2)))
        );
        // Records for entities the rebuilt farm lacks are skipped quietly
    }

    #[test]
    fn snapshot_writes_expected_files() {
        let session = session_with_state();
        let dir = tempfile::tempdir().unwrap();
        snapshot_to_dir(&session, dir.path()).unwrap();

        for name in ["territory.json", "trust.json", "common_chests.json", "tags.jsonl"] {
            assert!(dir.path().join(name).exists(), "{name} missing");
        }
        let tags = fs::read_to_string(dir.path().join("tags.jsonl")).unwrap();
        assert_eq!(tags.lines().count(), 4);
    }
}
