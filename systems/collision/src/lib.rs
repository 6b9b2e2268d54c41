#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Axis-separated tile collision resolution.
//!
//! Movement is resolved one axis at a time: the X axis fully first, then the
//! Y axis using the already-resolved X. The ordering matters: an entity
//! running up a ramp must have its vertical clamp evaluated at the
//! horizontal position it actually reaches, otherwise it sticks on the
//! vertical check halfway up the slope.

use gridpath_core::{Axis, ConstraintSide, EntityId, Event, GridDimensions, TileCoord};
use gridpath_map::{query, Map};

/// Outcome of resolving a movement against the map's collision formulas.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ResolvedMove {
    /// Horizontal world position after clamping.
    pub x: f64,
    /// Vertical world position after clamping.
    pub y: f64,
}

#[derive(Clone, Copy, Debug)]
struct Candidate {
    value: f64,
    distance: f64,
    tile: TileCoord,
}

/// Resolves entity movement against per-tile collision formulas.
#[derive(Clone, Copy, Debug, Default)]
pub struct TileCollisionResolver;

impl TileCollisionResolver {
    /// Creates a resolver.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Clamps a movement from `old` to `new` against the map's formulas.
    ///
    /// Each crossed collision boundary clamps the position on its axis and
    /// emits [`Event::TileCollided`]. Positions are world coordinates; the
    /// caller is responsible for keeping them inside the map.
    pub fn resolve(
        &self,
        map: &Map,
        entity: EntityId,
        old: (f64, f64),
        new: (f64, f64),
        out: &mut Vec<Event>,
    ) -> ResolvedMove {
        let x = self.resolve_axis(map, entity, Axis::X, old, (new.0, old.1), out);
        let y = self.resolve_axis(map, entity, Axis::Y, (x, old.1), (x, new.1), out);
        ResolvedMove { x, y }
    }

    /// Resolves one axis of a movement along the swept segment.
    ///
    /// Returns the clamped coordinate on the requested axis.
    fn resolve_axis(
        &self,
        map: &Map,
        entity: EntityId,
        axis: Axis,
        from: (f64, f64),
        to: (f64, f64),
        out: &mut Vec<Event>,
    ) -> f64 {
        let dimensions = query::dimensions(map);
        let (origin, target) = match axis {
            Axis::X => (from.0, to.0),
            Axis::Y => (from.1, to.1),
        };
        if origin == target {
            return target;
        }

        let best = self.nearest_crossing(map, dimensions, axis, from, to, origin, target);
        match best {
            Some(candidate) => {
                out.push(Event::TileCollided {
                    entity,
                    axis,
                    tile: candidate.tile,
                });
                candidate.value
            }
            None => target,
        }
    }

    /// Scans half-tile samples along the segment for the crossed boundary
    /// nearest to the approach origin. Strict comparison keeps the first
    /// producer on ties, which is the earlier sample and, within one tile,
    /// the formula declared first.
    #[allow(clippy::too_many_arguments)]
    fn nearest_crossing(
        &self,
        map: &Map,
        dimensions: GridDimensions,
        axis: Axis,
        from: (f64, f64),
        to: (f64, f64),
        origin: f64,
        target: f64,
    ) -> Option<Candidate> {
        let half_tile = match axis {
            Axis::X => f64::from(dimensions.tile_width()) / 2.0,
            Axis::Y => f64::from(dimensions.tile_height()) / 2.0,
        };
        let length = (target - origin).abs();
        let steps = (length / half_tile).ceil().max(1.0) as u32;

        let mut best: Option<Candidate> = None;
        for step in 0..=steps {
            let t = f64::from(step) / f64::from(steps);
            let point = (
                from.0 + (to.0 - from.0) * t,
                from.1 + (to.1 - from.1) * t,
            );
            let Some((tile, lx, ly)) = locate(dimensions, point) else {
                continue;
            };

            for formula in query::formulas(map, tile) {
                if suppressed(map, dimensions, tile, formula) {
                    continue;
                }
                let Some(local) = formula.compute(axis, lx, ly) else {
                    continue;
                };
                let value = match axis {
                    Axis::X => f64::from(tile.column()) * f64::from(dimensions.tile_width()) + local,
                    Axis::Y => f64::from(tile.row()) * f64::from(dimensions.tile_height()) + local,
                };
                if !crosses(origin, target, value) {
                    continue;
                }
                let distance = (value - origin).abs();
                if best.map_or(true, |current| distance < current.distance) {
                    best = Some(Candidate {
                        value,
                        distance,
                        tile,
                    });
                }
            }
        }
        best
    }
}

/// Reports whether the movement from `origin` to `target` crosses `value`.
///
/// The origin itself is excluded: a clamp leaves the entity exactly on the
/// boundary, and a movement departing from that value must not collide with
/// it again.
fn crosses(origin: f64, target: f64, value: f64) -> bool {
    if target > origin {
        origin < value && value <= target
    } else {
        target <= value && value < origin
    }
}

/// Tile containing a world point plus the tile-local offsets.
fn locate(dimensions: GridDimensions, point: (f64, f64)) -> Option<(TileCoord, u32, u32)> {
    if point.0 < 0.0 || point.1 < 0.0 {
        return None;
    }
    let tile_width = f64::from(dimensions.tile_width());
    let tile_height = f64::from(dimensions.tile_height());
    let column = (point.0 / tile_width).floor();
    let row = (point.1 / tile_height).floor();
    let tile = TileCoord::new(column as u32, row as u32);
    if !dimensions.contains(tile) {
        return None;
    }
    let lx = ((point.0 - column * tile_width) as u32).min(dimensions.tile_width() - 1);
    let ly = ((point.1 - row * tile_height) as u32).min(dimensions.tile_height() - 1);
    Some((tile, lx, ly))
}

/// Reports whether a formula is suppressed by its neighbor constraints.
///
/// A constraint lists excluded categories per side; when the neighbor on a
/// listed side belongs to one of them, the formula does not contribute.
fn suppressed(
    map: &Map,
    dimensions: GridDimensions,
    tile: TileCoord,
    formula: &gridpath_core::CollisionFormula,
) -> bool {
    if formula.constraint().is_empty() {
        return false;
    }
    for side in ConstraintSide::ALL {
        let excluded = formula.constraint().excluded(side);
        if excluded.is_empty() {
            continue;
        }
        let Some(neighbor) = neighbor_of(dimensions, tile, side) else {
            continue;
        };
        if let Some(name) = query::category_name(map, neighbor) {
            if excluded.iter().any(|category| category == name) {
                return true;
            }
        }
    }
    false
}

fn neighbor_of(
    dimensions: GridDimensions,
    tile: TileCoord,
    side: ConstraintSide,
) -> Option<TileCoord> {
    let (column, row) = (i64::from(tile.column()), i64::from(tile.row()));
    let (column, row) = match side {
        ConstraintSide::North => (column, row - 1),
        ConstraintSide::South => (column, row + 1),
        ConstraintSide::East => (column + 1, row),
        ConstraintSide::West => (column - 1, row),
    };
    if column < 0 || row < 0 {
        return None;
    }
    let neighbor = TileCoord::new(u32::try_from(column).ok()?, u32::try_from(row).ok()?);
    dimensions.contains(neighbor).then_some(neighbor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridpath_core::{Command, Event, GridDimensions, TileCoord};
    use gridpath_map::config::{
        CategoryConfig, ConstraintConfig, FormulaConfig, FunctionConfig, GroupConfig, MapConfig,
        RangeConfig, TileRefConfig,
    };
    use gridpath_map::{apply, Map};

    const GROUND: u32 = 0;
    const WALL: u32 = 1;
    const RAMP: u32 = 2;

    fn full_range(axis: Axis) -> RangeConfig {
        RangeConfig {
            axis,
            min_x: 0,
            max_x: 15,
            min_y: 0,
            max_y: 15,
        }
    }

    fn config(wall_constraints: Vec<ConstraintConfig>) -> MapConfig {
        MapConfig {
            groups: vec![
                GroupConfig {
                    name: "floor".into(),
                    tiles: vec![TileRefConfig {
                        sheet: 0,
                        number: GROUND,
                    }],
                },
                GroupConfig {
                    name: "rock".into(),
                    tiles: vec![TileRefConfig {
                        sheet: 0,
                        number: WALL,
                    }],
                },
                GroupConfig {
                    name: "incline".into(),
                    tiles: vec![TileRefConfig {
                        sheet: 0,
                        number: RAMP,
                    }],
                },
            ],
            categories: vec![
                CategoryConfig {
                    name: "ground".into(),
                    cost: 1.0,
                    blocking: false,
                    diagonal: true,
                    groups: vec!["floor".into()],
                    formulas: vec![FormulaConfig {
                        name: "top".into(),
                        range: full_range(Axis::Y),
                        function: FunctionConfig::Constant { value: 0.0 },
                        constraints: Vec::new(),
                    }],
                },
                CategoryConfig {
                    name: "wall".into(),
                    cost: 0.0,
                    blocking: true,
                    diagonal: false,
                    groups: vec!["rock".into()],
                    formulas: vec![FormulaConfig {
                        name: "left".into(),
                        range: full_range(Axis::X),
                        function: FunctionConfig::Constant { value: 0.0 },
                        constraints: wall_constraints,
                    }],
                },
                CategoryConfig {
                    name: "ramp".into(),
                    cost: 1.0,
                    blocking: false,
                    diagonal: false,
                    groups: vec!["incline".into()],
                    formulas: vec![FormulaConfig {
                        name: "slope".into(),
                        range: full_range(Axis::Y),
                        function: FunctionConfig::Linear { a: -1.0, b: Some(15.0) },
                        constraints: Vec::new(),
                    }],
                },
            ],
        }
    }

    fn place(map: &mut Map, at: TileCoord, number: u32) {
        let mut events = Vec::new();
        apply(
            map,
            Command::PlaceTile {
                at,
                sheet: 0,
                number,
            },
            &mut events,
        );
        assert_eq!(events, vec![Event::TileChanged { at }]);
    }

    fn empty_map() -> Map {
        Map::with_config(GridDimensions::new(8, 8, 16, 16), &config(Vec::new())).expect("config")
    }

    fn entity() -> EntityId {
        EntityId::new(1)
    }

    #[test]
    fn falling_entity_clamps_on_the_ground_surface() {
        let mut map = empty_map();
        place(&mut map, TileCoord::new(0, 2), GROUND);

        let mut events = Vec::new();
        let resolved =
            TileCollisionResolver::new().resolve(&map, entity(), (8.0, 24.0), (8.0, 40.0), &mut events);

        // The ground surface sits at the top edge of row 2, world y = 32.
        assert_eq!(resolved, ResolvedMove { x: 8.0, y: 32.0 });
        assert_eq!(
            events,
            vec![Event::TileCollided {
                entity: entity(),
                axis: Axis::Y,
                tile: TileCoord::new(0, 2),
            }]
        );
    }

    #[test]
    fn retreating_from_a_clamped_boundary_moves_freely() {
        let mut map = empty_map();
        place(&mut map, TileCoord::new(2, 1), WALL);
        let resolver = TileCollisionResolver::new();

        // First frame: the approach clamps on the wall edge at x = 32.
        let mut events = Vec::new();
        let clamped = resolver.resolve(&map, entity(), (20.0, 24.0), (40.0, 24.0), &mut events);
        assert_eq!(clamped.x, 32.0);
        assert_eq!(events.len(), 1);

        // Next frame: starting exactly on the boundary, a retreat must not
        // collide with it again.
        events.clear();
        let resolved = resolver.resolve(&map, entity(), (clamped.x, 24.0), (20.0, 24.0), &mut events);
        assert_eq!(resolved, ResolvedMove { x: 20.0, y: 24.0 });
        assert!(events.is_empty());
    }

    #[test]
    fn jumping_off_a_surface_is_not_clamped() {
        let mut map = empty_map();
        place(&mut map, TileCoord::new(0, 2), GROUND);

        // Resting on the ground surface at y = 32, an upward movement
        // departs from the boundary value and stays free.
        let mut events = Vec::new();
        let resolved = TileCollisionResolver::new().resolve(
            &map,
            entity(),
            (8.0, 32.0),
            (8.0, 16.0),
            &mut events,
        );

        assert_eq!(resolved, ResolvedMove { x: 8.0, y: 16.0 });
        assert!(events.is_empty());
    }

    #[test]
    fn movement_away_from_a_surface_is_untouched() {
        let mut map = empty_map();
        place(&mut map, TileCoord::new(0, 2), GROUND);

        let mut events = Vec::new();
        let resolved =
            TileCollisionResolver::new().resolve(&map, entity(), (8.0, 40.0), (8.0, 44.0), &mut events);

        assert_eq!(resolved, ResolvedMove { x: 8.0, y: 44.0 });
        assert!(events.is_empty());
    }

    #[test]
    fn horizontal_movement_clamps_on_the_wall_edge() {
        let mut map = empty_map();
        place(&mut map, TileCoord::new(2, 1), WALL);

        let mut events = Vec::new();
        let resolved =
            TileCollisionResolver::new().resolve(&map, entity(), (20.0, 24.0), (40.0, 24.0), &mut events);

        // The wall's boundary sits at the left edge of column 2, world x = 32.
        assert_eq!(resolved, ResolvedMove { x: 32.0, y: 24.0 });
        assert_eq!(
            events,
            vec![Event::TileCollided {
                entity: entity(),
                axis: Axis::X,
                tile: TileCoord::new(2, 1),
            }]
        );
    }

    #[test]
    fn nearest_boundary_to_the_origin_wins() {
        let mut map = empty_map();
        place(&mut map, TileCoord::new(2, 1), WALL);
        place(&mut map, TileCoord::new(3, 1), WALL);

        let mut events = Vec::new();
        let resolved =
            TileCollisionResolver::new().resolve(&map, entity(), (20.0, 24.0), (60.0, 24.0), &mut events);

        // Both walls produce a crossed boundary (32 and 48); the nearer one
        // clamps the movement.
        assert_eq!(resolved.x, 32.0);
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn vertical_clamp_uses_the_already_resolved_horizontal_position() {
        let mut map = empty_map();
        place(&mut map, TileCoord::new(1, 1), RAMP);

        // The ramp surface is y = 16 + (15 - lx). At the resolved x = 28
        // (lx = 12) the surface sits at 19; at the old x = 20 (lx = 4) it
        // would sit at 27 and the movement would miss it entirely.
        let mut events = Vec::new();
        let resolved =
            TileCollisionResolver::new().resolve(&map, entity(), (20.0, 17.0), (28.0, 21.0), &mut events);

        assert_eq!(resolved, ResolvedMove { x: 28.0, y: 19.0 });
        assert_eq!(
            events,
            vec![Event::TileCollided {
                entity: entity(),
                axis: Axis::Y,
                tile: TileCoord::new(1, 1),
            }]
        );
    }

    #[test]
    fn constraints_suppress_interior_edges() {
        let constraint = ConstraintConfig {
            side: gridpath_core::ConstraintSide::West,
            categories: vec!["wall".into()],
        };
        let mut map = Map::with_config(
            GridDimensions::new(8, 8, 16, 16),
            &config(vec![constraint]),
        )
        .expect("config");
        place(&mut map, TileCoord::new(2, 1), WALL);
        place(&mut map, TileCoord::new(3, 1), WALL);

        // Column 3's left edge touches another wall, so its formula is
        // suppressed and a movement crossing only that edge passes through.
        let mut events = Vec::new();
        let resolved =
            TileCollisionResolver::new().resolve(&map, entity(), (44.0, 24.0), (52.0, 24.0), &mut events);
        assert_eq!(resolved.x, 52.0);
        assert!(events.is_empty());

        // Column 2's west neighbor is empty, so its edge still collides.
        let resolved =
            TileCollisionResolver::new().resolve(&map, entity(), (20.0, 24.0), (40.0, 24.0), &mut events);
        assert_eq!(resolved.x, 32.0);
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn still_movement_produces_no_collisions() {
        let mut map = empty_map();
        place(&mut map, TileCoord::new(0, 0), GROUND);

        let mut events = Vec::new();
        let resolved =
            TileCollisionResolver::new().resolve(&map, entity(), (8.0, 8.0), (8.0, 8.0), &mut events);

        assert_eq!(resolved, ResolvedMove { x: 8.0, y: 8.0 });
        assert!(events.is_empty());
    }
}
