//! Board model: tiles, buildings, roads, harbors and the robber.
//!
//! Positions are opaque [`PointRef`]/[`TileRef`] values; every geometric
//! question (which points are neighbours, which tiles touch a point) goes
//! through a [`Topology`]. The board only records what sits where.

use crate::player::ResourceHand;
use crate::topology::{PointRef, RoadSpan, TileRef, Topology};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;
use std::str::FromStr;

/// Player identifier (0-based, dense)
pub type PlayerId = u8;

/// Resource card kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Resource {
    Brick,
    Lumber,
    Ore,
    Grain,
    Wool,
}

impl Resource {
    /// All resource types
    pub const ALL: [Resource; 5] = [
        Resource::Brick,
        Resource::Lumber,
        Resource::Ore,
        Resource::Grain,
        Resource::Wool,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Resource::Brick => "brick",
            Resource::Lumber => "lumber",
            Resource::Ore => "ore",
            Resource::Grain => "grain",
            Resource::Wool => "wool",
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when a resource name is not recognised
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownResource(pub String);

impl fmt::Display for UnknownResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown resource '{}'", self.0)
    }
}

impl std::error::Error for UnknownResource {}

impl FromStr for Resource {
    type Err = UnknownResource;

    /// Accepts the canonical names plus the common table-talk aliases
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "brick" | "clay" => Ok(Resource::Brick),
            "lumber" | "wood" => Ok(Resource::Lumber),
            "ore" | "stone" => Ok(Resource::Ore),
            "grain" | "wheat" => Ok(Resource::Grain),
            "wool" | "sheep" => Ok(Resource::Wool),
            _ => Err(UnknownResource(s.to_string())),
        }
    }
}

/// Type of hex tile on the board
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TileType {
    /// Produces a resource when its number is rolled
    Resource(Resource),
    Desert,
}

/// A single hex tile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tile {
    pub id: TileRef,
    pub tile_type: TileType,
    /// Dice number that triggers production (None for the desert)
    pub dice_number: Option<u8>,
}

impl Tile {
    pub fn new_resource(id: TileRef, resource: Resource, dice_number: u8) -> Self {
        Self {
            id,
            tile_type: TileType::Resource(resource),
            dice_number: Some(dice_number),
        }
    }

    pub fn desert(id: TileRef) -> Self {
        Self {
            id,
            tile_type: TileType::Desert,
            dice_number: None,
        }
    }

    pub fn resource(&self) -> Option<Resource> {
        match self.tile_type {
            TileType::Resource(r) => Some(r),
            TileType::Desert => None,
        }
    }
}

/// Harbor types for maritime trading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Harbor {
    /// 3:1 trade any resource
    Generic,
    /// 2:1 trade for a specific resource
    Specific(Resource),
}

impl Harbor {
    /// The exchange rate for this harbor
    pub fn rate(&self) -> u32 {
        match self {
            Harbor::Generic => 3,
            Harbor::Specific(_) => 2,
        }
    }
}

/// A harbor and the two coastal points that use it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HarborPlacement {
    pub points: [PointRef; 2],
    pub harbor: Harbor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BuildingKind {
    Settlement,
    City,
}

impl BuildingKind {
    pub fn victory_points(&self) -> u32 {
        match self {
            BuildingKind::Settlement => 1,
            BuildingKind::City => 2,
        }
    }

    /// Cards produced per matching roll
    pub fn resource_multiplier(&self) -> u32 {
        match self {
            BuildingKind::Settlement => 1,
            BuildingKind::City => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Building {
    pub kind: BuildingKind,
    pub owner: PlayerId,
    pub location: PointRef,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Road {
    pub owner: PlayerId,
    pub span: RoadSpan,
}

/// Terrain and harbor arrangement a board is built from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardLayout {
    pub tiles: Vec<Tile>,
    pub harbors: Vec<HarborPlacement>,
}

/// Beginner arrangement, tiles in row-major order
const STANDARD_TERRAIN: [(Option<Resource>, Option<u8>); 19] = [
    (Some(Resource::Ore), Some(10)),
    (Some(Resource::Wool), Some(2)),
    (Some(Resource::Lumber), Some(9)),
    (Some(Resource::Grain), Some(12)),
    (Some(Resource::Brick), Some(6)),
    (Some(Resource::Wool), Some(4)),
    (Some(Resource::Brick), Some(10)),
    (Some(Resource::Grain), Some(9)),
    (Some(Resource::Lumber), Some(11)),
    (None, None),
    (Some(Resource::Lumber), Some(3)),
    (Some(Resource::Ore), Some(8)),
    (Some(Resource::Lumber), Some(8)),
    (Some(Resource::Ore), Some(3)),
    (Some(Resource::Grain), Some(4)),
    (Some(Resource::Wool), Some(5)),
    (Some(Resource::Brick), Some(5)),
    (Some(Resource::Grain), Some(6)),
    (Some(Resource::Wool), Some(11)),
];

const STANDARD_HARBORS: [([u16; 2], Harbor); 9] = [
    ([1, 2], Harbor::Generic),
    ([4, 5], Harbor::Specific(Resource::Grain)),
    ([15, 16], Harbor::Specific(Resource::Ore)),
    ([27, 38], Harbor::Generic),
    ([46, 47], Harbor::Specific(Resource::Wool)),
    ([52, 53], Harbor::Generic),
    ([49, 50], Harbor::Generic),
    ([29, 39], Harbor::Specific(Resource::Brick)),
    ([8, 18], Harbor::Specific(Resource::Lumber)),
];

impl BoardLayout {
    /// The fixed beginner board
    pub fn standard() -> Self {
        let tiles = STANDARD_TERRAIN
            .iter()
            .enumerate()
            .map(|(i, &(resource, number))| {
                let id = TileRef(i as u8 + 1);
                match (resource, number) {
                    (Some(r), Some(n)) => Tile::new_resource(id, r, n),
                    _ => Tile::desert(id),
                }
            })
            .collect();
        Self {
            tiles,
            harbors: standard_harbors(),
        }
    }

    /// Standard terrain and number tokens, shuffled independently
    pub fn shuffled<R: Rng>(rng: &mut R) -> Self {
        let mut terrain: Vec<Option<Resource>> =
            STANDARD_TERRAIN.iter().map(|&(r, _)| r).collect();
        let mut numbers: Vec<u8> = STANDARD_TERRAIN.iter().filter_map(|&(_, n)| n).collect();
        terrain.shuffle(rng);
        numbers.shuffle(rng);

        let mut numbers = numbers.into_iter();
        let tiles = terrain
            .into_iter()
            .enumerate()
            .map(|(i, resource)| {
                let id = TileRef(i as u8 + 1);
                match (resource, resource.and_then(|_| numbers.next())) {
                    (Some(r), Some(n)) => Tile::new_resource(id, r, n),
                    _ => Tile::desert(id),
                }
            })
            .collect();

        Self {
            tiles,
            harbors: standard_harbors(),
        }
    }
}

fn standard_harbors() -> Vec<HarborPlacement> {
    STANDARD_HARBORS
        .iter()
        .map(|&([a, b], harbor)| HarborPlacement {
            points: [PointRef(a), PointRef(b)],
            harbor,
        })
        .collect()
}

/// The game board
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    tiles: BTreeMap<TileRef, Tile>,
    buildings: BTreeMap<PointRef, Building>,
    roads: Vec<Road>,
    harbors: Vec<HarborPlacement>,
    robber: TileRef,
}

impl Board {
    /// Build a board from a layout; the robber starts on the desert
    pub fn new(layout: BoardLayout) -> Self {
        let robber = layout
            .tiles
            .iter()
            .find(|t| t.tile_type == TileType::Desert)
            .or_else(|| layout.tiles.first())
            .map(|t| t.id)
            .unwrap_or(TileRef(1));

        Self {
            tiles: layout.tiles.into_iter().map(|t| (t.id, t)).collect(),
            buildings: BTreeMap::new(),
            roads: Vec::new(),
            harbors: layout.harbors,
            robber,
        }
    }

    pub fn standard() -> Self {
        Self::new(BoardLayout::standard())
    }

    pub fn tile(&self, id: TileRef) -> Option<&Tile> {
        self.tiles.get(&id)
    }

    pub fn tiles(&self) -> impl Iterator<Item = &Tile> {
        self.tiles.values()
    }

    pub fn robber(&self) -> TileRef {
        self.robber
    }

    pub fn building_at(&self, point: PointRef) -> Option<&Building> {
        self.buildings.get(&point)
    }

    pub fn buildings(&self) -> impl Iterator<Item = &Building> {
        self.buildings.values()
    }

    pub fn road_at(&self, span: RoadSpan) -> Option<&Road> {
        self.roads.iter().find(|r| r.span == span)
    }

    pub fn roads(&self) -> &[Road] {
        &self.roads
    }

    pub fn harbors(&self) -> &[HarborPlacement] {
        &self.harbors
    }

    /// Harbors this player has a building on
    pub fn player_harbors(&self, player: PlayerId) -> Vec<Harbor> {
        self.harbors
            .iter()
            .filter(|h| {
                h.points
                    .iter()
                    .any(|p| self.building_at(*p).is_some_and(|b| b.owner == player))
            })
            .map(|h| h.harbor)
            .collect()
    }

    /// No building on the point or on any neighbouring point
    pub fn satisfies_distance_rule(&self, point: PointRef, topology: &dyn Topology) -> bool {
        self.building_at(point).is_none()
            && topology
                .adjacent_points(point)
                .into_iter()
                .all(|p| self.building_at(p).is_none())
    }

    pub fn has_road_touching(&self, point: PointRef, player: PlayerId) -> bool {
        self.roads
            .iter()
            .any(|r| r.owner == player && r.span.touches(point))
    }

    /// Whether a new road on `span` would join the player's network.
    ///
    /// An endpoint counts if the player builds there, or if the player has
    /// another road there and no opponent building sits on it.
    pub fn road_connects(&self, span: RoadSpan, player: PlayerId) -> bool {
        span.endpoints().into_iter().any(|point| {
            match self.building_at(point) {
                Some(b) if b.owner == player => true,
                Some(_) => false,
                None => self.has_road_touching(point, player),
            }
        })
    }

    /// Distinct owners of buildings on the corners of a tile
    pub fn players_adjacent_to_tile(
        &self,
        tile: TileRef,
        topology: &dyn Topology,
    ) -> BTreeSet<PlayerId> {
        self.buildings
            .values()
            .filter(|b| topology.adjacent_tiles(b.location).contains(&tile))
            .map(|b| b.owner)
            .collect()
    }

    /// Cards each player is owed for a roll, ignoring the robbed tile
    pub fn production(&self, roll: u8, topology: &dyn Topology) -> BTreeMap<PlayerId, ResourceHand> {
        let mut owed: BTreeMap<PlayerId, ResourceHand> = BTreeMap::new();
        for building in self.buildings.values() {
            for tile_id in topology.adjacent_tiles(building.location) {
                if tile_id == self.robber {
                    continue;
                }
                let Some(tile) = self.tile(tile_id) else {
                    continue;
                };
                if tile.dice_number != Some(roll) {
                    continue;
                }
                if let Some(resource) = tile.resource() {
                    owed.entry(building.owner)
                        .or_default()
                        .add(resource, building.kind.resource_multiplier());
                }
            }
        }
        owed
    }

    /// One card per resource tile touching the point
    pub fn starting_resources(&self, point: PointRef, topology: &dyn Topology) -> ResourceHand {
        let mut hand = ResourceHand::new();
        for tile_id in topology.adjacent_tiles(point) {
            if let Some(resource) = self.tile(tile_id).and_then(Tile::resource) {
                hand.add(resource, 1);
            }
        }
        hand
    }

    /// Length of the player's longest continuous road.
    ///
    /// A road cannot be continued through a point holding an opponent's
    /// building, and no road segment is counted twice.
    pub fn longest_road(&self, player: PlayerId) -> u32 {
        let own: Vec<RoadSpan> = self
            .roads
            .iter()
            .filter(|r| r.owner == player)
            .map(|r| r.span)
            .collect();

        let mut best = 0;
        let mut visited = HashSet::new();
        for span in &own {
            for start in span.endpoints() {
                visited.insert(*span);
                let Some(far) = span.other_end(start) else {
                    continue;
                };
                let length = 1 + self.extend_road(player, &own, far, &mut visited);
                visited.remove(span);
                best = best.max(length);
            }
        }
        best
    }

    fn extend_road(
        &self,
        player: PlayerId,
        own: &[RoadSpan],
        at: PointRef,
        visited: &mut HashSet<RoadSpan>,
    ) -> u32 {
        if self.building_at(at).is_some_and(|b| b.owner != player) {
            return 0;
        }

        let mut best = 0;
        for span in own {
            if visited.contains(span) {
                continue;
            }
            let Some(next) = span.other_end(at) else {
                continue;
            };
            visited.insert(*span);
            best = best.max(1 + self.extend_road(player, own, next, visited));
            visited.remove(span);
        }
        best
    }

    // ==================== Mutation ====================
    // Callers validate first; these only record the outcome.

    pub fn place_building(&mut self, building: Building) {
        self.buildings.insert(building.location, building);
    }

    pub fn upgrade_to_city(&mut self, point: PointRef) {
        if let Some(b) = self.buildings.get_mut(&point) {
            b.kind = BuildingKind::City;
        }
    }

    pub fn place_road(&mut self, road: Road) {
        self.roads.push(road);
    }

    pub fn move_robber(&mut self, tile: TileRef) {
        self.robber = tile;
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::standard()
    }
}
