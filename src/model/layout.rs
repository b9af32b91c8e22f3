use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A tile position on the farm map.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct Tile {
    pub x: i32,
    pub y: i32,
}

impl Tile {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// One of the four fixed territories of the shared farm.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Quadrant {
    /// Northeast — the permanently shared farmhouse quadrant.
    NE,
    NW,
    SW,
    SE,
}

impl Quadrant {
    pub const ALL: [Quadrant; 4] = [Quadrant::NE, Quadrant::NW, Quadrant::SW, Quadrant::SE];

    /// The three quadrants a player can claim; NE is never claimable.
    pub const CLAIMABLE: [Quadrant; 3] = [Quadrant::NW, Quadrant::SW, Quadrant::SE];
}

/// A passage point between quadrants that needs boundary enforcement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Passage {
    /// The quadrant this passage leads into.
    pub target: Quadrant,
    pub tiles: Vec<Tile>,
    pub label: String,
    /// Whether an obstacle blocks this passage at game start.
    pub initially_blocked: bool,
}

/// Static map data: passage tiles, container positions, and the coordinate
/// splits that classify tiles and cabins into quadrants.
///
/// The default mirrors the four-corner map this engine was built for; other
/// maps supply their own value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FarmLayout {
    pub passages: Vec<Passage>,
    pub shipping_bins: BTreeMap<Quadrant, Tile>,
    pub common_chests: BTreeMap<Quadrant, Tile>,
    /// Quadrant the host receives in Private mode.
    pub host_quadrant: Quadrant,
    /// Tiles west of `split.x` / north of `split.y` classify as west/north.
    pub split: Tile,
    /// Cabin classification uses a different north threshold than open tiles.
    pub cabin_split: Tile,
}

impl FarmLayout {
    /// The four-corner map: NE farmhouse quadrant, three claimable quadrants
    /// with deterministic cabin spots, passages between them.
    pub fn four_corners() -> Self {
        let passages = vec![
            Passage {
                target: Quadrant::SW,
                label: "SW main passage".to_string(),
                tiles: tile_range(29, 33, 43, 43),
                initially_blocked: false,
            },
            Passage {
                target: Quadrant::SW,
                label: "SW south passage".to_string(),
                tiles: vec![Tile::new(38, 57)],
                initially_blocked: false,
            },
            Passage {
                target: Quadrant::SW,
                label: "SW west passage".to_string(),
                tiles: tile_range(11, 12, 42, 42),
                initially_blocked: true,
            },
            Passage {
                target: Quadrant::SE,
                label: "SE main passage".to_string(),
                tiles: tile_range(47, 50, 43, 43),
                initially_blocked: false,
            },
            Passage {
                target: Quadrant::SE,
                label: "SE south passage".to_string(),
                tiles: vec![Tile::new(42, 57)],
                initially_blocked: false,
            },
            Passage {
                target: Quadrant::SE,
                label: "SE east passage".to_string(),
                tiles: tile_range(70, 71, 42, 42),
                initially_blocked: true,
            },
            Passage {
                target: Quadrant::NW,
                label: "NW main passage".to_string(),
                tiles: tile_range(32, 36, 29, 30),
                initially_blocked: false,
            },
            Passage {
                target: Quadrant::NW,
                label: "NW north passage".to_string(),
                tiles: tile_range(39, 39, 14, 15),
                initially_blocked: false,
            },
            Passage {
                target: Quadrant::NW,
                label: "NW west passage".to_string(),
                tiles: tile_range(11, 12, 35, 35),
                initially_blocked: true,
            },
        ];

        let shipping_bins = BTreeMap::from([
            // Common shipping bin near the farmhouse
            (Quadrant::NE, Tile::new(71, 14)),
            (Quadrant::NW, Tile::new(22, 10)),
            (Quadrant::SW, Tile::new(22, 45)),
            (Quadrant::SE, Tile::new(64, 45)),
        ]);

        // Chest spots sit below each cabin footprint, outside the 5x3 shell.
        let common_chests = BTreeMap::from([
            (Quadrant::NE, Tile::new(69, 14)),
            (Quadrant::NW, Tile::new(17, 11)),
            (Quadrant::SW, Tile::new(17, 46)),
            (Quadrant::SE, Tile::new(59, 46)),
        ]);

        Self {
            passages,
            shipping_bins,
            common_chests,
            host_quadrant: Quadrant::NW,
            split: Tile::new(40, 36),
            cabin_split: Tile::new(40, 30),
        }
    }

    /// Flattened lookup of every passage tile to its target quadrant.
    pub fn passage_map(&self) -> BTreeMap<Tile, Quadrant> {
        let mut map = BTreeMap::new();
        for passage in &self.passages {
            for &tile in &passage.tiles {
                map.insert(tile, passage.target);
            }
        }
        map
    }

    /// Classify an open tile into its quadrant.
    pub fn quadrant_at(&self, tile: Tile) -> Quadrant {
        let north = tile.y < self.split.y;
        let west = tile.x < self.split.x;
        match (north, west) {
            (true, false) => Quadrant::NE,
            (true, true) => Quadrant::NW,
            (false, true) => Quadrant::SW,
            (false, false) => Quadrant::SE,
        }
    }

    /// Which claimable quadrant a cabin at this tile marks. The NE corner
    /// holds the farmhouse, not a cabin, so it maps to no claim.
    pub fn cabin_quadrant(&self, tile: Tile) -> Option<Quadrant> {
        let north = tile.y < self.cabin_split.y;
        let west = tile.x < self.cabin_split.x;
        match (north, west) {
            (true, true) => Some(Quadrant::NW),
            (false, true) => Some(Quadrant::SW),
            (false, false) => Some(Quadrant::SE),
            (true, false) => None,
        }
    }

    /// The quadrant whose shipping bin accepts common goods.
    pub fn common_bin_quadrant(&self) -> Quadrant {
        Quadrant::NE
    }
}

fn tile_range(x1: i32, x2: i32, y1: i32, y2: i32) -> Vec<Tile> {
    let mut tiles = Vec::new();
    for x in x1..=x2 {
        for y in y1..=y2 {
            tiles.push(Tile::new(x, y));
        }
    }
    tiles
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passage_map_covers_every_passage_tile() {
        let layout = FarmLayout::four_corners();
        let map = layout.passage_map();
        let total: usize = layout.passages.iter().map(|p| p.tiles.len()).sum();
        assert_eq!(map.len(), total, "no passage tiles overlap on this map");
        assert_eq!(map.get(&Tile::new(30, 43)), Some(&Quadrant::SW));
        assert_eq!(map.get(&Tile::new(39, 14)), Some(&Quadrant::NW));
        assert_eq!(map.get(&Tile::new(42, 57)), Some(&Quadrant::SE));
    }

    #[test]
    fn open_tiles_classify_by_split() {
        let layout = FarmLayout::four_corners();
        assert_eq!(layout.quadrant_at(Tile::new(60, 10)), Quadrant::NE);
        assert_eq!(layout.quadrant_at(Tile::new(10, 10)), Quadrant::NW);
        assert_eq!(layout.quadrant_at(Tile::new(10, 50)), Quadrant::SW);
        assert_eq!(layout.quadrant_at(Tile::new(60, 50)), Quadrant::SE);
    }

    #[test]
    fn cabins_map_to_their_quadrants() {
        let layout = FarmLayout::four_corners();
        assert_eq!(layout.cabin_quadrant(Tile::new(17, 8)), Some(Quadrant::NW));
        assert_eq!(layout.cabin_quadrant(Tile::new(17, 43)), Some(Quadrant::SW));
        assert_eq!(layout.cabin_quadrant(Tile::new(59, 43)), Some(Quadrant::SE));
        // Farmhouse corner is not claimable
        assert_eq!(layout.cabin_quadrant(Tile::new(59, 8)), None);
    }
}
