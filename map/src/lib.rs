#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative tile map for the Gridpath engine.
//!
//! The map owns the tile grid, the category tables derived from group
//! configuration, and the occupancy index tracking which entities reserve
//! which tiles. Editor adapters and the network layer mutate it exclusively
//! through [`apply`], entity systems query it through [`query`] and the
//! search operations, and the navigation system maintains reservations
//! through the occupancy methods. All mutations happen between simulation
//! ticks, so a full search observes a stable grid snapshot.

pub mod config;
pub mod persist;

mod category;
mod grid;
mod path;

use gridpath_core::{Command, EntityId, Event, GridDimensions, TileChangeError, TileCoord};

use crate::category::CategoryTable;
use crate::config::{ConfigError, MapConfig};
use crate::grid::TileGrid;
use crate::path::OccupancyIndex;
use crate::persist::MapSnapshot;

pub use crate::category::CategoryId;
pub use crate::grid::Tile;

/// Authoritative map state: grid, categories and occupancy.
#[derive(Clone, Debug)]
pub struct Map {
    pub(crate) grid: TileGrid,
    pub(crate) categories: CategoryTable,
    pub(crate) occupancy: OccupancyIndex,
}

impl Map {
    /// Creates an empty map with the provided layout and no categories.
    #[must_use]
    pub fn new(dimensions: GridDimensions) -> Self {
        Self {
            grid: TileGrid::new(dimensions),
            categories: CategoryTable::empty(),
            occupancy: OccupancyIndex::new(dimensions.columns(), dimensions.rows()),
        }
    }

    /// Creates an empty map with categories imported from configuration.
    pub fn with_config(
        dimensions: GridDimensions,
        config: &MapConfig,
    ) -> Result<Self, ConfigError> {
        let mut map = Self::new(dimensions);
        map.import_config(config)?;
        Ok(map)
    }

    /// Restores a map from a snapshot plus its configuration document.
    ///
    /// Snapshot records outside the declared grid are a load-time
    /// configuration error, surfaced immediately rather than defaulted.
    pub fn from_snapshot(snapshot: &MapSnapshot, config: &MapConfig) -> Result<Self, ConfigError> {
        let mut map = Self::with_config(snapshot.dimensions, config)?;
        for record in &snapshot.tiles {
            let at = TileCoord::new(record.column, record.row);
            let category = map.categories.resolve(record.sheet, record.number);
            if !map
                .grid
                .set(at, Some(Tile::new(record.sheet, record.number, category)))
            {
                return Err(ConfigError::TileOutOfBounds {
                    column: record.column,
                    row: record.row,
                });
            }
        }
        Ok(map)
    }

    /// Replaces the category tables and re-resolves placed tiles.
    pub fn import_config(&mut self, config: &MapConfig) -> Result<(), ConfigError> {
        let table = config::build_table(config, self.grid.dimensions())?;
        self.categories = table;
        let categories = &self.categories;
        self.grid
            .update_categories(|sheet, number| categories.resolve(sheet, number));
        Ok(())
    }

    /// Reserves the provided tiles for an entity.
    pub fn occupy(&mut self, entity: EntityId, tiles: &[TileCoord]) {
        for tile in tiles {
            self.occupancy.occupy(entity, *tile);
        }
    }

    /// Releases reservations previously made through [`Map::occupy`].
    ///
    /// Releasing a tile that was never occupied is a contract violation and
    /// fails fast in debug builds.
    pub fn release(&mut self, entity: EntityId, tiles: &[TileCoord]) {
        for tile in tiles {
            self.occupancy.release(entity, *tile);
        }
    }

    /// Marks an entity whose reservations never block other searches.
    pub fn set_ignorable(&mut self, entity: EntityId, ignorable: bool) {
        self.occupancy.set_ignorable(entity, ignorable);
    }

    /// Computes a path from start (exclusive) to goal (inclusive).
    ///
    /// `None` is the NOT_FOUND outcome: no route exists, the goal blocks, or
    /// the search guard tripped. Callers treat it as a normal result.
    #[must_use]
    pub fn compute_path(
        &self,
        entity: EntityId,
        start: TileCoord,
        goal: TileCoord,
        diagonal: bool,
    ) -> Option<Vec<TileCoord>> {
        path::compute_path(
            &self.grid,
            &self.categories,
            &self.occupancy,
            entity,
            start,
            goal,
            diagonal,
        )
    }

    /// Reports whether a tile cannot be entered, ignoring the given entity's
    /// own reservations.
    #[must_use]
    pub fn is_blocked(&self, coord: TileCoord, ignoring: Option<EntityId>) -> bool {
        path::is_blocked(&self.grid, &self.categories, &self.occupancy, coord, ignoring)
    }

    /// Finds a free anchor tile for a footprint around the provided anchor.
    #[must_use]
    pub fn free_tile_around(
        &self,
        entity: EntityId,
        anchor: TileCoord,
        width: u32,
        height: u32,
        radius: u32,
    ) -> Option<TileCoord> {
        path::free_tile_around(
            &self.grid,
            &self.categories,
            &self.occupancy,
            entity,
            anchor,
            width,
            height,
            radius,
        )
    }
}

/// Applies the provided command to the map, mutating state deterministically.
pub fn apply(map: &mut Map, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::ConfigureGrid { dimensions } => {
            // Changing the tile size invalidates bound collision geometry
            // wholesale, so the map returns to an unconfigured state and the
            // caller re-imports configuration afterwards.
            *map = Map::new(dimensions);
            out_events.push(Event::GridConfigured { dimensions });
        }
        Command::PlaceTile { at, sheet, number } => {
            let category = map.categories.resolve(sheet, number);
            if map.grid.set(at, Some(Tile::new(sheet, number, category))) {
                out_events.push(Event::TileChanged { at });
            } else {
                out_events.push(Event::TileChangeRejected {
                    at,
                    reason: TileChangeError::OutOfBounds,
                });
            }
        }
        Command::ClearTile { at } => {
            if map.grid.set(at, None) {
                out_events.push(Event::TileChanged { at });
            } else {
                out_events.push(Event::TileChangeRejected {
                    at,
                    reason: TileChangeError::OutOfBounds,
                });
            }
        }
        Command::SaveFormula { category, formula } => {
            let name = formula.name().to_owned();
            let saved = formula
                .bind(&map.grid.dimensions())
                .and_then(|bound| map.categories.save_formula(&category, bound));
            match saved {
                Ok(()) => out_events.push(Event::FormulaSaved { category, name }),
                Err(reason) => out_events.push(Event::FormulaRejected {
                    category,
                    name,
                    reason,
                }),
            }
        }
        Command::DropFormula { category, name } => {
            match map.categories.drop_formula(&category, &name) {
                Ok(()) => out_events.push(Event::FormulaDropped { category, name }),
                Err(reason) => out_events.push(Event::FormulaRejected {
                    category,
                    name,
                    reason,
                }),
            }
        }
    }
}

/// Query functions that provide read-only access to the map state.
pub mod query {
    use gridpath_core::{CollisionFormula, EntityId, GridDimensions, PathData, TileCoord};

    use super::{Map, Tile};

    /// Layout of the map's tile grid.
    #[must_use]
    pub fn dimensions(map: &Map) -> GridDimensions {
        map.grid.dimensions()
    }

    /// Tile at the provided coordinate; `None` beyond the map edges.
    #[must_use]
    pub fn tile(map: &Map, at: TileCoord) -> Option<Tile> {
        map.grid.get(at).copied()
    }

    /// Category label resolved for the tile at the coordinate.
    #[must_use]
    pub fn category_name(map: &Map, at: TileCoord) -> Option<&str> {
        let tile = map.grid.get(at)?;
        map.categories.name(tile.category()?)
    }

    /// Traversal data of the tile's category, if any.
    #[must_use]
    pub fn path_data(map: &Map, at: TileCoord) -> Option<PathData> {
        let tile = map.grid.get(at)?;
        map.categories.path_data(tile.category()?)
    }

    /// Collision formulas applicable to the tile at the coordinate.
    #[must_use]
    pub fn formulas(map: &Map, at: TileCoord) -> &[CollisionFormula] {
        map.grid
            .get(at)
            .and_then(Tile::category)
            .map_or(&[], |category| map.categories.formulas(category))
    }

    /// Entities currently reserving the tile at the coordinate.
    #[must_use]
    pub fn occupants(map: &Map, at: TileCoord) -> &[EntityId] {
        map.occupancy.occupants(at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridpath_core::{
        Axis, CollisionConstraint, CollisionFormula, CollisionFunction, CollisionRange,
        FormulaChangeError,
    };

    use crate::config::{CategoryConfig, GroupConfig, TileRefConfig};

    fn dimensions() -> GridDimensions {
        GridDimensions::new(6, 6, 16, 16)
    }

    fn basic_config() -> MapConfig {
        MapConfig {
            groups: vec![
                GroupConfig {
                    name: "grass".into(),
                    tiles: vec![TileRefConfig { sheet: 0, number: 0 }],
                },
                GroupConfig {
                    name: "rock".into(),
                    tiles: vec![TileRefConfig { sheet: 0, number: 1 }],
                },
            ],
            categories: vec![
                CategoryConfig {
                    name: "ground".into(),
                    cost: 1.0,
                    blocking: false,
                    diagonal: true,
                    groups: vec!["grass".into()],
                    formulas: Vec::new(),
                },
                CategoryConfig {
                    name: "wall".into(),
                    cost: 0.0,
                    blocking: true,
                    diagonal: false,
                    groups: vec!["rock".into()],
                    formulas: Vec::new(),
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

    #[test]
    fn configure_grid_resets_the_map() {
        let mut map = Map::with_config(dimensions(), &basic_config()).expect("config");
        place(&mut map, TileCoord::new(1, 1), 0);

        let mut events = Vec::new();
        let next = GridDimensions::new(3, 3, 8, 8);
        apply(
            &mut map,
            Command::ConfigureGrid { dimensions: next },
            &mut events,
        );

        assert_eq!(events, vec![Event::GridConfigured { dimensions: next }]);
        assert_eq!(query::dimensions(&map), next);
        assert!(query::tile(&map, TileCoord::new(1, 1)).is_none());
    }

    #[test]
    fn placing_a_tile_resolves_its_category() {
        let mut map = Map::with_config(dimensions(), &basic_config()).expect("config");
        place(&mut map, TileCoord::new(2, 3), 0);
        place(&mut map, TileCoord::new(2, 4), 1);

        assert_eq!(query::category_name(&map, TileCoord::new(2, 3)), Some("ground"));
        assert_eq!(query::category_name(&map, TileCoord::new(2, 4)), Some("wall"));
        assert!(!map.is_blocked(TileCoord::new(2, 3), None));
        assert!(map.is_blocked(TileCoord::new(2, 4), None));
    }

    #[test]
    fn out_of_bounds_mutations_are_rejected() {
        let mut map = Map::new(dimensions());
        let mut events = Vec::new();
        let outside = TileCoord::new(9, 9);
        apply(
            &mut map,
            Command::PlaceTile {
                at: outside,
                sheet: 0,
                number: 0,
            },
            &mut events,
        );

        assert_eq!(
            events,
            vec![Event::TileChangeRejected {
                at: outside,
                reason: TileChangeError::OutOfBounds,
            }]
        );
    }

    #[test]
    fn unknown_tile_references_stay_impassable() {
        let mut map = Map::with_config(dimensions(), &basic_config()).expect("config");
        place(&mut map, TileCoord::new(0, 0), 42);

        assert_eq!(query::category_name(&map, TileCoord::new(0, 0)), None);
        assert!(map.is_blocked(TileCoord::new(0, 0), None));
    }

    #[test]
    fn importing_config_re_resolves_placed_tiles() {
        let mut map = Map::new(dimensions());
        let mut events = Vec::new();
        apply(
            &mut map,
            Command::PlaceTile {
                at: TileCoord::new(1, 1),
                sheet: 0,
                number: 0,
            },
            &mut events,
        );
        assert_eq!(query::category_name(&map, TileCoord::new(1, 1)), None);

        map.import_config(&basic_config()).expect("config");
        assert_eq!(query::category_name(&map, TileCoord::new(1, 1)), Some("ground"));
    }

    #[test]
    fn formula_commands_round_trip_through_events() {
        let mut map = Map::with_config(dimensions(), &basic_config()).expect("config");
        let formula = CollisionFormula::new(
            "top",
            CollisionRange::new(Axis::Y, 0, 15, 0, 15),
            CollisionFunction::Linear { a: 0.0, b: 0.0 },
            CollisionConstraint::none(),
        );

        let mut events = Vec::new();
        apply(
            &mut map,
            Command::SaveFormula {
                category: "ground".into(),
                formula: formula.clone(),
            },
            &mut events,
        );
        assert_eq!(
            events,
            vec![Event::FormulaSaved {
                category: "ground".into(),
                name: "top".into(),
            }]
        );

        place(&mut map, TileCoord::new(0, 0), 0);
        assert_eq!(query::formulas(&map, TileCoord::new(0, 0)).len(), 1);

        events.clear();
        apply(
            &mut map,
            Command::DropFormula {
                category: "ground".into(),
                name: "top".into(),
            },
            &mut events,
        );
        assert_eq!(
            events,
            vec![Event::FormulaDropped {
                category: "ground".into(),
                name: "top".into(),
            }]
        );
        assert!(query::formulas(&map, TileCoord::new(0, 0)).is_empty());
    }

    #[test]
    fn invalid_formula_commands_surface_reasons() {
        let mut map = Map::with_config(dimensions(), &basic_config()).expect("config");
        let formula = CollisionFormula::new(
            "broken",
            CollisionRange::new(Axis::Y, 0, 99, 0, 15),
            CollisionFunction::Constant { value: 0.0 },
            CollisionConstraint::none(),
        );

        let mut events = Vec::new();
        apply(
            &mut map,
            Command::SaveFormula {
                category: "ground".into(),
                formula,
            },
            &mut events,
        );
        assert_eq!(
            events,
            vec![Event::FormulaRejected {
                category: "ground".into(),
                name: "broken".into(),
                reason: FormulaChangeError::InvalidRange,
            }]
        );

        events.clear();
        apply(
            &mut map,
            Command::DropFormula {
                category: "lava".into(),
                name: "top".into(),
            },
            &mut events,
        );
        assert_eq!(
            events,
            vec![Event::FormulaRejected {
                category: "lava".into(),
                name: "top".into(),
                reason: FormulaChangeError::UnknownCategory,
            }]
        );
    }

    #[test]
    fn snapshot_round_trips_through_the_codec() {
        let mut map = Map::with_config(dimensions(), &basic_config()).expect("config");
        place(&mut map, TileCoord::new(1, 2), 0);
        place(&mut map, TileCoord::new(3, 4), 1);

        let encoded = persist::snapshot(&map).encode();
        let decoded = persist::MapSnapshot::decode(&encoded).expect("decode");
        let restored = Map::from_snapshot(&decoded, &basic_config()).expect("restore");

        assert_eq!(
            query::category_name(&restored, TileCoord::new(1, 2)),
            Some("ground")
        );
        assert_eq!(
            query::category_name(&restored, TileCoord::new(3, 4)),
            Some("wall")
        );
    }
}
