//! Tile-path search and dynamic obstacle tracking.
//!
//! The search treats the grid and category tables as a stable snapshot for
//! the duration of one call; mutations only enter through `apply` or the
//! occupancy methods between ticks.

use std::cmp::Ordering;
use std::collections::{BTreeSet, BinaryHeap};

use gridpath_core::{EntityId, TileCoord};

use crate::category::CategoryTable;
use crate::grid::{offset_within, TileGrid, CARDINAL_OFFSETS, OCTILE_OFFSETS};

const SQRT_2: f64 = std::f64::consts::SQRT_2;

/// Registry of which entities currently reserve which tiles.
///
/// Entries are opaque identifiers, never entity references; the navigation
/// system adds them when an entity starts occupying a tile and removes them
/// when it vacates, always as matched pairs within one tick.
#[derive(Clone, Debug, Default)]
pub(crate) struct OccupancyIndex {
    columns: u32,
    rows: u32,
    cells: Vec<Vec<EntityId>>,
    ignorable: BTreeSet<EntityId>,
}

impl OccupancyIndex {
    pub(crate) fn new(columns: u32, rows: u32) -> Self {
        let capacity = u64::from(columns) * u64::from(rows);
        Self {
            columns,
            rows,
            cells: vec![Vec::new(); usize::try_from(capacity).unwrap_or(0)],
            ignorable: BTreeSet::new(),
        }
    }

    pub(crate) fn occupy(&mut self, entity: EntityId, coord: TileCoord) {
        if let Some(index) = self.index(coord) {
            let cell = &mut self.cells[index];
            if let Err(position) = cell.binary_search(&entity) {
                cell.insert(position, entity);
            }
        }
    }

    /// Removes a reservation; releasing without a matching occupy is a
    /// contract violation that fails fast in debug builds.
    pub(crate) fn release(&mut self, entity: EntityId, coord: TileCoord) {
        if let Some(index) = self.index(coord) {
            let cell = &mut self.cells[index];
            match cell.binary_search(&entity) {
                Ok(position) => {
                    let _ = cell.remove(position);
                }
                Err(_) => {
                    debug_assert!(
                        false,
                        "release without matching occupy: entity {} at {:?}",
                        entity.get(),
                        coord
                    );
                }
            }
        }
    }

    pub(crate) fn set_ignorable(&mut self, entity: EntityId, ignorable: bool) {
        if ignorable {
            let _ = self.ignorable.insert(entity);
        } else {
            let _ = self.ignorable.remove(&entity);
        }
    }

    pub(crate) fn occupants(&self, coord: TileCoord) -> &[EntityId] {
        self.index(coord).map_or(&[], |index| &self.cells[index])
    }

    /// Reports whether a tile is reserved by an entity other than `ignoring`
    /// that is not marked ignorable.
    pub(crate) fn occupied_by_other(&self, coord: TileCoord, ignoring: Option<EntityId>) -> bool {
        self.occupants(coord)
            .iter()
            .any(|occupant| Some(*occupant) != ignoring && !self.ignorable.contains(occupant))
    }

    fn index(&self, coord: TileCoord) -> Option<usize> {
        if coord.column() < self.columns && coord.row() < self.rows {
            let row = usize::try_from(coord.row()).ok()?;
            let column = usize::try_from(coord.column()).ok()?;
            let width = usize::try_from(self.columns).ok()?;
            Some(row * width + column)
        } else {
            None
        }
    }
}

/// Reports whether a tile cannot be entered by the provided entity.
///
/// Out-of-bounds coordinates, missing tiles, tiles without a category and
/// blocking categories are all blocked; so are tiles reserved by a different
/// non-ignorable entity.
pub(crate) fn is_blocked(
    grid: &TileGrid,
    categories: &CategoryTable,
    occupancy: &OccupancyIndex,
    coord: TileCoord,
    ignoring: Option<EntityId>,
) -> bool {
    let Some(tile) = grid.get(coord) else {
        return true;
    };
    let Some(category) = tile.category() else {
        return true;
    };
    let Some(data) = categories.path_data(category) else {
        return true;
    };
    if data.is_blocking() {
        return true;
    }
    occupancy.occupied_by_other(coord, ignoring)
}

#[derive(Clone, Copy, Debug)]
struct OpenNode {
    f: f64,
    seq: u64,
    coord: TileCoord,
}

impl PartialEq for OpenNode {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for OpenNode {}

impl Ord for OpenNode {
    // Reversed so the max-heap pops the lowest f-score; equal scores pop in
    // discovery order (FIFO) for deterministic tie-breaking.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .f
            .total_cmp(&self.f)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for OpenNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A* search over 4- or 8-connected neighbors.
///
/// Returns the waypoints from start (exclusive) to goal (inclusive), or
/// `None` when no route exists. `None` is a normal outcome, never an error.
/// A maximum-expansion guard bounded by the grid's node count aborts the
/// search on pathological inputs instead of looping.
pub(crate) fn compute_path(
    grid: &TileGrid,
    categories: &CategoryTable,
    occupancy: &OccupancyIndex,
    entity: EntityId,
    start: TileCoord,
    goal: TileCoord,
    diagonal: bool,
) -> Option<Vec<TileCoord>> {
    let dimensions = grid.dimensions();
    if !dimensions.contains(start) || !dimensions.contains(goal) {
        return None;
    }
    if start == goal {
        return Some(Vec::new());
    }
    if is_blocked(grid, categories, occupancy, goal, Some(entity)) {
        return None;
    }

    let min_cost = categories.min_traversable_cost()?;
    let heuristic = |coord: TileCoord| {
        if diagonal {
            coord.euclidean_distance(goal) * min_cost
        } else {
            f64::from(coord.manhattan_distance(goal)) * min_cost
        }
    };

    let node_count = dimensions.tile_count();
    let columns = usize::try_from(dimensions.columns()).ok()?;
    let index_of = |coord: TileCoord| -> usize {
        coord.row() as usize * columns + coord.column() as usize
    };

    let mut g_score = vec![f64::INFINITY; node_count];
    let mut came_from: Vec<Option<TileCoord>> = vec![None; node_count];
    let mut closed = vec![false; node_count];
    let mut open = BinaryHeap::new();
    let mut seq: u64 = 0;
    let mut expansions: usize = 0;

    g_score[index_of(start)] = 0.0;
    open.push(OpenNode {
        f: heuristic(start),
        seq,
        coord: start,
    });

    let offsets: &[(i64, i64)] = if diagonal {
        &OCTILE_OFFSETS
    } else {
        &CARDINAL_OFFSETS
    };

    while let Some(node) = open.pop() {
        let current_index = index_of(node.coord);
        if closed[current_index] {
            continue;
        }
        closed[current_index] = true;

        expansions += 1;
        if expansions > node_count {
            return None;
        }

        if node.coord == goal {
            return Some(reconstruct(&came_from, &index_of, start, goal));
        }

        let current_g = g_score[current_index];

        for offset in offsets {
            let Some(neighbor) = offset_within(node.coord, *offset, dimensions) else {
                continue;
            };
            let Some(tile) = grid.get(neighbor) else {
                continue;
            };
            let Some(category) = tile.category() else {
                continue;
            };
            let Some(data) = categories.path_data(category) else {
                continue;
            };
            if data.is_blocking() {
                continue;
            }

            let diagonal_step = offset.0 != 0 && offset.1 != 0;
            if diagonal_step && !data.has_diagonal() {
                continue;
            }

            if occupancy.occupied_by_other(neighbor, Some(entity)) {
                continue;
            }

            // Diagonal steps scale by sqrt(2) so the Euclidean heuristic
            // stays admissible under per-category costs.
            let step = if diagonal_step {
                data.cost() * SQRT_2
            } else {
                data.cost()
            };

            let neighbor_index = index_of(neighbor);
            let tentative = current_g + step;
            if tentative < g_score[neighbor_index] {
                g_score[neighbor_index] = tentative;
                came_from[neighbor_index] = Some(node.coord);
                seq += 1;
                open.push(OpenNode {
                    f: tentative + heuristic(neighbor),
                    seq,
                    coord: neighbor,
                });
            }
        }
    }

    None
}

fn reconstruct(
    came_from: &[Option<TileCoord>],
    index_of: &impl Fn(TileCoord) -> usize,
    start: TileCoord,
    goal: TileCoord,
) -> Vec<TileCoord> {
    let mut path = vec![goal];
    let mut current = goal;
    while current != start {
        let Some(previous) = came_from[index_of(current)] else {
            break;
        };
        if previous != start {
            path.push(previous);
        }
        current = previous;
    }
    path.reverse();
    path
}

/// Searches an expanding ring for a free anchor tile around a footprint.
///
/// Rings are visited in deterministic order, clockwise from north, so
/// placement is reproducible for a fixed map state. Returns `None` when the
/// radius is exhausted.
pub(crate) fn free_tile_around(
    grid: &TileGrid,
    categories: &CategoryTable,
    occupancy: &OccupancyIndex,
    entity: EntityId,
    anchor: TileCoord,
    width: u32,
    height: u32,
    radius: u32,
) -> Option<TileCoord> {
    for ring in 0..=radius {
        let mut found = None;
        visit_ring(anchor, ring, |candidate| {
            if found.is_none()
                && footprint_free(grid, categories, occupancy, entity, candidate, width, height)
            {
                found = Some(candidate);
            }
        });
        if found.is_some() {
            return found;
        }
    }
    None
}

fn footprint_free(
    grid: &TileGrid,
    categories: &CategoryTable,
    occupancy: &OccupancyIndex,
    entity: EntityId,
    anchor: TileCoord,
    width: u32,
    height: u32,
) -> bool {
    for dy in 0..height.max(1) {
        for dx in 0..width.max(1) {
            let Some(column) = anchor.column().checked_add(dx) else {
                return false;
            };
            let Some(row) = anchor.row().checked_add(dy) else {
                return false;
            };
            let coord = TileCoord::new(column, row);
            if is_blocked(grid, categories, occupancy, coord, Some(entity)) {
                return false;
            }
        }
    }
    true
}

/// Visits the Chebyshev ring at the provided radius, clockwise from north.
fn visit_ring(anchor: TileCoord, radius: u32, mut visit: impl FnMut(TileCoord)) {
    let column = i64::from(anchor.column());
    let row = i64::from(anchor.row());
    let r = i64::from(radius);

    if r == 0 {
        visit(anchor);
        return;
    }

    let mut emit = |c: i64, w: i64| {
        if c >= 0 && w >= 0 {
            if let (Ok(c), Ok(w)) = (u32::try_from(c), u32::try_from(w)) {
                visit(TileCoord::new(c, w));
            }
        }
    };

    // North tile first, then east edge, south edge, west edge, and the
    // remainder of the north edge back toward the start.
    for c in column..=column + r {
        emit(c, row - r);
    }
    for w in (row - r + 1)..=(row + r) {
        emit(column + r, w);
    }
    for c in ((column - r)..=(column + r - 1)).rev() {
        emit(c, row + r);
    }
    for w in ((row - r)..=(row + r - 1)).rev() {
        emit(column - r, w);
    }
    for c in (column - r + 1)..=(column - 1) {
        emit(c, row - r);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ring_zero_visits_only_the_anchor() {
        let mut visited = Vec::new();
        visit_ring(TileCoord::new(3, 3), 0, |coord| visited.push(coord));
        assert_eq!(visited, vec![TileCoord::new(3, 3)]);
    }

    #[test]
    fn ring_one_starts_north_and_runs_clockwise() {
        let mut visited = Vec::new();
        visit_ring(TileCoord::new(3, 3), 1, |coord| visited.push(coord));
        assert_eq!(visited.len(), 8);
        assert_eq!(visited[0], TileCoord::new(3, 2));
        assert_eq!(visited[1], TileCoord::new(4, 2));
        assert_eq!(visited[2], TileCoord::new(4, 3));
        assert_eq!(visited[3], TileCoord::new(4, 4));
        assert_eq!(visited[4], TileCoord::new(3, 4));
        assert_eq!(visited[5], TileCoord::new(2, 4));
        assert_eq!(visited[6], TileCoord::new(2, 3));
        assert_eq!(visited[7], TileCoord::new(2, 2));
    }

    #[test]
    fn ring_clips_negative_coordinates() {
        let mut visited = Vec::new();
        visit_ring(TileCoord::new(0, 0), 1, |coord| visited.push(coord));
        assert_eq!(
            visited,
            vec![
                TileCoord::new(1, 0),
                TileCoord::new(1, 1),
                TileCoord::new(0, 1),
            ]
        );
    }

    #[test]
    fn occupancy_tracks_matched_pairs() {
        let mut occupancy = OccupancyIndex::new(4, 4);
        let alice = EntityId::new(1);
        let bob = EntityId::new(2);
        let tile = TileCoord::new(2, 2);

        occupancy.occupy(alice, tile);
        assert!(occupancy.occupied_by_other(tile, Some(bob)));
        assert!(!occupancy.occupied_by_other(tile, Some(alice)));

        occupancy.release(alice, tile);
        assert!(!occupancy.occupied_by_other(tile, Some(bob)));
        assert!(occupancy.occupants(tile).is_empty());
    }

    #[test]
    fn ignorable_entities_never_block() {
        let mut occupancy = OccupancyIndex::new(4, 4);
        let ghost = EntityId::new(7);
        let tile = TileCoord::new(1, 1);

        occupancy.occupy(ghost, tile);
        occupancy.set_ignorable(ghost, true);
        assert!(!occupancy.occupied_by_other(tile, None));

        occupancy.set_ignorable(ghost, false);
        assert!(occupancy.occupied_by_other(tile, None));
    }

    #[test]
    #[should_panic(expected = "release without matching occupy")]
    #[cfg(debug_assertions)]
    fn unmatched_release_fails_fast_in_debug() {
        let mut occupancy = OccupancyIndex::new(4, 4);
        occupancy.release(EntityId::new(9), TileCoord::new(0, 0));
    }
}
