//! Board topology: building sites, tiles and the adjacency between them.
//!
//! The rules engine never computes geometry. It asks a [`Topology`] which
//! points a road may join, which points neighbour a site, and which tiles a
//! site touches. [`StandardTopology`] is the 19-tile, 54-point board laid out
//! in rows of 3-4-5-4-3 tiles (7-9-11-11-9-7 points), numbered row by row
//! starting at 1.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A building site (a corner shared by up to three tiles)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PointRef(pub u16);

impl fmt::Display for PointRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "point {}", self.0)
    }
}

/// A hex tile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TileRef(pub u8);

impl fmt::Display for TileRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tile {}", self.0)
    }
}

/// An undirected pair of points a road runs between.
///
/// Endpoints are stored in ascending order so `(a, b)` and `(b, a)` compare
/// equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RoadSpan {
    a: PointRef,
    b: PointRef,
}

impl RoadSpan {
    pub fn new(first: PointRef, second: PointRef) -> Self {
        if first <= second {
            Self { a: first, b: second }
        } else {
            Self { a: second, b: first }
        }
    }

    pub fn endpoints(&self) -> [PointRef; 2] {
        [self.a, self.b]
    }

    pub fn touches(&self, point: PointRef) -> bool {
        self.a == point || self.b == point
    }

    /// The endpoint that is not `point`, if `point` is an endpoint at all
    pub fn other_end(&self, point: PointRef) -> Option<PointRef> {
        if self.a == point {
            Some(self.b)
        } else if self.b == point {
            Some(self.a)
        } else {
            None
        }
    }

    pub fn is_degenerate(&self) -> bool {
        self.a == self.b
    }
}

impl fmt::Display for RoadSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "road {}-{}", self.a.0, self.b.0)
    }
}

/// Row/index position of a point or tile, as used by display layers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridCoord {
    pub row: u8,
    pub index: u8,
}

/// Pure, deterministic adjacency lookups over a board.
///
/// Implementations must not have side effects; the engine may call any of
/// these any number of times while validating a single action.
pub trait Topology {
    /// Position of a point, or `None` if the point is not on this board
    fn resolve_point(&self, point: PointRef) -> Option<GridCoord>;

    /// Position of a tile, or `None` if the tile is not on this board
    fn resolve_tile(&self, tile: TileRef) -> Option<GridCoord>;

    /// Whether a road may run directly between two points
    fn is_road_adjacent(&self, a: PointRef, b: PointRef) -> bool;

    /// Points one road away from `point`
    fn adjacent_points(&self, point: PointRef) -> Vec<PointRef>;

    /// Tiles touching `point`
    fn adjacent_tiles(&self, point: PointRef) -> Vec<TileRef>;

    /// Every point on the board
    fn points(&self) -> Vec<PointRef>;

    /// Every tile on the board
    fn tiles(&self) -> Vec<TileRef>;

    fn contains_point(&self, point: PointRef) -> bool {
        self.resolve_point(point).is_some()
    }

    fn contains_tile(&self, tile: TileRef) -> bool {
        self.resolve_tile(tile).is_some()
    }
}

const POINT_ROWS: [u8; 6] = [7, 9, 11, 11, 9, 7];
const TILE_ROWS: [u8; 5] = [3, 4, 5, 4, 3];

/// The standard 19-tile board, built from row tables
#[derive(Debug, Clone)]
pub struct StandardTopology {
    point_coords: Vec<GridCoord>,
    tile_coords: Vec<GridCoord>,
    /// Six corners of each tile, clockwise from the top-left
    tile_rings: Vec<[PointRef; 6]>,
    point_neighbors: Vec<Vec<PointRef>>,
    point_tiles: Vec<Vec<TileRef>>,
}

impl StandardTopology {
    pub fn new() -> Self {
        let mut point_coords = Vec::new();
        for (row, &count) in POINT_ROWS.iter().enumerate() {
            for index in 0..count {
                point_coords.push(GridCoord {
                    row: row as u8,
                    index,
                });
            }
        }

        let point_count = point_coords.len();
        let mut tile_coords = Vec::new();
        let mut tile_rings = Vec::new();
        let mut point_neighbors: Vec<Vec<PointRef>> = vec![Vec::new(); point_count];
        let mut point_tiles: Vec<Vec<TileRef>> = vec![Vec::new(); point_count];

        for (row, &count) in TILE_ROWS.iter().enumerate() {
            for index in 0..count {
                // The upper half widens downwards, the lower half narrows, so the
                // corner rows are offset differently on each side of the middle.
                let (top_start, bottom_start) = match row {
                    0 | 1 => (2 * index, 2 * index + 1),
                    2 => (2 * index, 2 * index),
                    _ => (2 * index + 1, 2 * index),
                };
                let top = |k: u8| point_at(row as u8, top_start + k);
                let bottom = |k: u8| point_at(row as u8 + 1, bottom_start + k);
                let ring = [top(0), top(1), top(2), bottom(2), bottom(1), bottom(0)];

                let tile = TileRef(tile_coords.len() as u8 + 1);
                tile_coords.push(GridCoord {
                    row: row as u8,
                    index,
                });

                for (i, &point) in ring.iter().enumerate() {
                    let next = ring[(i + 1) % ring.len()];
                    link(&mut point_neighbors, point, next);
                    link(&mut point_neighbors, next, point);
                    point_tiles[slot(point)].push(tile);
                }
                tile_rings.push(ring);
            }
        }

        for neighbors in &mut point_neighbors {
            neighbors.sort();
        }

        Self {
            point_coords,
            tile_coords,
            tile_rings,
            point_neighbors,
            point_tiles,
        }
    }

    /// Corners of a tile, clockwise from the top-left
    pub fn tile_corners(&self, tile: TileRef) -> Option<[PointRef; 6]> {
        let idx = (tile.0 as usize).checked_sub(1)?;
        self.tile_rings.get(idx).copied()
    }

    /// Every road span on the board
    pub fn road_spans(&self) -> Vec<RoadSpan> {
        let mut spans = Vec::new();
        for (idx, neighbors) in self.point_neighbors.iter().enumerate() {
            let point = PointRef(idx as u16 + 1);
            for &other in neighbors {
                if point < other {
                    spans.push(RoadSpan::new(point, other));
                }
            }
        }
        spans
    }

    fn point_slot(&self, point: PointRef) -> Option<usize> {
        let idx = (point.0 as usize).checked_sub(1)?;
        (idx < self.point_coords.len()).then_some(idx)
    }
}

impl Default for StandardTopology {
    fn default() -> Self {
        Self::new()
    }
}

impl Topology for StandardTopology {
    fn resolve_point(&self, point: PointRef) -> Option<GridCoord> {
        self.point_slot(point).map(|idx| self.point_coords[idx])
    }

    fn resolve_tile(&self, tile: TileRef) -> Option<GridCoord> {
        let idx = (tile.0 as usize).checked_sub(1)?;
        self.tile_coords.get(idx).copied()
    }

    fn is_road_adjacent(&self, a: PointRef, b: PointRef) -> bool {
        self.point_slot(a)
            .is_some_and(|idx| self.point_neighbors[idx].contains(&b))
    }

    fn adjacent_points(&self, point: PointRef) -> Vec<PointRef> {
        self.point_slot(point)
            .map(|idx| self.point_neighbors[idx].clone())
            .unwrap_or_default()
    }

    fn adjacent_tiles(&self, point: PointRef) -> Vec<TileRef> {
        self.point_slot(point)
            .map(|idx| self.point_tiles[idx].clone())
            .unwrap_or_default()
    }

    fn points(&self) -> Vec<PointRef> {
        (1..=self.point_coords.len() as u16).map(PointRef).collect()
    }

    fn tiles(&self) -> Vec<TileRef> {
        (1..=self.tile_coords.len() as u8).map(TileRef).collect()
    }
}

fn point_at(row: u8, index: u8) -> PointRef {
    let offset: u16 = POINT_ROWS[..row as usize].iter().map(|&n| n as u16).sum();
    PointRef(offset + index as u16 + 1)
}

fn slot(point: PointRef) -> usize {
    point.0 as usize - 1
}

fn link(neighbors: &mut [Vec<PointRef>], from: PointRef, to: PointRef) {
    let list = &mut neighbors[slot(from)];
    if !list.contains(&to) {
        list.push(to);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_board_sizes() {
        let topo = StandardTopology::new();
        assert_eq!(topo.points().len(), 54);
        assert_eq!(topo.tiles().len(), 19);
        assert_eq!(topo.road_spans().len(), 72);
    }

    #[test]
    fn test_every_point_has_two_or_three_neighbors() {
        let topo = StandardTopology::new();
        for point in topo.points() {
            let degree = topo.adjacent_points(point).len();
            assert!((2..=3).contains(&degree), "{point} has {degree} neighbours");
            let tiles = topo.adjacent_tiles(point).len();
            assert!((1..=3).contains(&tiles), "{point} touches {tiles} tiles");
        }
    }

    #[test]
    fn test_adjacency_is_symmetric() {
        let topo = StandardTopology::new();
        for point in topo.points() {
            for other in topo.adjacent_points(point) {
                assert!(topo.is_road_adjacent(other, point));
            }
        }
    }

    #[test]
    fn test_center_tile_corners_touch_three_tiles() {
        let topo = StandardTopology::new();
        let corners = topo.tile_corners(TileRef(10)).unwrap();
        for corner in corners {
            assert_eq!(topo.adjacent_tiles(corner).len(), 3);
            assert!(topo.adjacent_tiles(corner).contains(&TileRef(10)));
        }
    }

    #[test]
    fn test_first_point_is_a_corner_of_first_tile_only() {
        let topo = StandardTopology::new();
        assert_eq!(topo.adjacent_tiles(PointRef(1)), vec![TileRef(1)]);
        assert_eq!(topo.adjacent_points(PointRef(1)), vec![PointRef(2), PointRef(9)]);
        assert_eq!(
            topo.resolve_point(PointRef(1)),
            Some(GridCoord { row: 0, index: 0 })
        );
    }

    #[test]
    fn test_unknown_refs_resolve_to_none() {
        let topo = StandardTopology::new();
        assert!(topo.resolve_point(PointRef(0)).is_none());
        assert!(topo.resolve_point(PointRef(55)).is_none());
        assert!(topo.resolve_tile(TileRef(20)).is_none());
        assert!(topo.adjacent_points(PointRef(99)).is_empty());
        assert!(!topo.is_road_adjacent(PointRef(1), PointRef(99)));
    }

    #[test]
    fn test_road_span_is_undirected() {
        assert_eq!(
            RoadSpan::new(PointRef(3), PointRef(2)),
            RoadSpan::new(PointRef(2), PointRef(3))
        );
        let span = RoadSpan::new(PointRef(5), PointRef(4));
        assert_eq!(span.other_end(PointRef(4)), Some(PointRef(5)));
        assert_eq!(span.other_end(PointRef(9)), None);
    }
}
