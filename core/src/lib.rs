#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Gridpath engine.
//!
//! This crate defines the message surface that connects editor adapters, the
//! authoritative map, and per-entity systems. Adapters submit [`Command`]
//! values describing desired map mutations, the map executes those commands
//! via its `apply` entry point, and then broadcasts [`Event`] values for
//! observers to react to deterministically. Entity systems query immutable
//! map views and report their own outcomes through the same [`Event`] stream.

pub mod formula;

use serde::{Deserialize, Serialize};

pub use formula::{
    CollisionConstraint, CollisionFormula, CollisionFunction, CollisionRange, ConstraintSide,
};

/// Axis selector used by collision ranges and collision notifications.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    /// Horizontal axis; formulas on this axis produce an X coordinate.
    X,
    /// Vertical axis; formulas on this axis produce a Y coordinate.
    Y,
}

/// Unique identifier assigned to a pathfindable entity.
///
/// The map's occupancy index stores these opaque identifiers instead of
/// entity references, keeping the entity/map relation one-directional.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(u32);

impl EntityId {
    /// Creates a new entity identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Location of a single grid tile expressed as column and row coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileCoord {
    column: u32,
    row: u32,
}

impl TileCoord {
    /// Creates a new tile coordinate.
    #[must_use]
    pub const fn new(column: u32, row: u32) -> Self {
        Self { column, row }
    }

    /// Zero-based column index of the tile.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }

    /// Zero-based row index of the tile.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.row
    }

    /// Computes the Manhattan distance between two tile coordinates.
    #[must_use]
    pub fn manhattan_distance(self, other: TileCoord) -> u32 {
        self.column.abs_diff(other.column) + self.row.abs_diff(other.row)
    }

    /// Computes the Euclidean distance between two tile coordinates.
    #[must_use]
    pub fn euclidean_distance(self, other: TileCoord) -> f64 {
        let dc = f64::from(self.column.abs_diff(other.column));
        let dr = f64::from(self.row.abs_diff(other.row));
        (dc * dc + dr * dr).sqrt()
    }
}

/// Describes the discrete tile layout of a map.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GridDimensions {
    columns: u32,
    rows: u32,
    tile_width: u32,
    tile_height: u32,
}

impl GridDimensions {
    /// Creates a new grid layout description.
    #[must_use]
    pub const fn new(columns: u32, rows: u32, tile_width: u32, tile_height: u32) -> Self {
        Self {
            columns,
            rows,
            tile_width,
            tile_height,
        }
    }

    /// Number of tile columns laid out in the grid.
    #[must_use]
    pub const fn columns(&self) -> u32 {
        self.columns
    }

    /// Number of tile rows laid out in the grid.
    #[must_use]
    pub const fn rows(&self) -> u32 {
        self.rows
    }

    /// Width of a single tile measured in world units.
    #[must_use]
    pub const fn tile_width(&self) -> u32 {
        self.tile_width
    }

    /// Height of a single tile measured in world units.
    #[must_use]
    pub const fn tile_height(&self) -> u32 {
        self.tile_height
    }

    /// Reports whether the provided coordinate lies within the grid bounds.
    #[must_use]
    pub const fn contains(&self, coord: TileCoord) -> bool {
        coord.column() < self.columns && coord.row() < self.rows
    }

    /// Total number of tiles addressable by the grid.
    #[must_use]
    pub fn tile_count(&self) -> usize {
        let count = u64::from(self.columns) * u64::from(self.rows);
        usize::try_from(count).unwrap_or(usize::MAX)
    }
}

/// Traversal data associated with a tile category.
///
/// Categories absent from the pathfinding configuration default to
/// impassable, so a missing entry never silently becomes walkable.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PathData {
    cost: f64,
    blocking: bool,
    diagonal: bool,
}

impl PathData {
    /// Creates new traversal data with explicit field values.
    #[must_use]
    pub const fn new(cost: f64, blocking: bool, diagonal: bool) -> Self {
        Self {
            cost,
            blocking,
            diagonal,
        }
    }

    /// Cost of entering a tile of this category.
    #[must_use]
    pub const fn cost(&self) -> f64 {
        self.cost
    }

    /// Reports whether tiles of this category block movement entirely.
    #[must_use]
    pub const fn is_blocking(&self) -> bool {
        self.blocking
    }

    /// Reports whether diagonal steps may enter tiles of this category.
    #[must_use]
    pub const fn has_diagonal(&self) -> bool {
        self.diagonal
    }
}

/// Commands that express all permissible map mutations.
///
/// Editor panels and the network layer submit commands; both are required to
/// do so between simulation ticks so searches observe a stable grid snapshot.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Configures the map's tile grid using the provided layout.
    ConfigureGrid {
        /// Dimensions and tile size of the new grid.
        dimensions: GridDimensions,
    },
    /// Places or replaces the tile at the provided coordinate.
    PlaceTile {
        /// Coordinate of the tile to mutate.
        at: TileCoord,
        /// Sheet identifier of the tile's source image.
        sheet: u32,
        /// Index of the tile within its sheet.
        number: u32,
    },
    /// Removes the tile at the provided coordinate.
    ClearTile {
        /// Coordinate of the tile to clear.
        at: TileCoord,
    },
    /// Adds or replaces a collision formula on a category.
    SaveFormula {
        /// Name of the category receiving the formula.
        category: String,
        /// Formula to store; bound against the map's tile size on save.
        formula: CollisionFormula,
    },
    /// Removes a named collision formula from a category.
    DropFormula {
        /// Name of the category losing the formula.
        category: String,
        /// Name of the formula to remove.
        name: String,
    },
}

/// Events broadcast after processing commands or entity updates.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Indicates that the map adopted a new grid layout.
    GridConfigured {
        /// Layout that became active.
        dimensions: GridDimensions,
    },
    /// Confirms that a tile was placed, replaced or cleared.
    TileChanged {
        /// Coordinate of the mutated tile.
        at: TileCoord,
    },
    /// Reports that a tile mutation request was rejected.
    TileChangeRejected {
        /// Coordinate provided in the request.
        at: TileCoord,
        /// Specific reason the mutation failed.
        reason: TileChangeError,
    },
    /// Confirms that a collision formula was stored on a category.
    FormulaSaved {
        /// Category that received the formula.
        category: String,
        /// Name of the stored formula.
        name: String,
    },
    /// Confirms that a collision formula was removed from a category.
    FormulaDropped {
        /// Category that lost the formula.
        category: String,
        /// Name of the removed formula.
        name: String,
    },
    /// Reports that a formula mutation request was rejected.
    FormulaRejected {
        /// Category provided in the request.
        category: String,
        /// Name of the formula in the request.
        name: String,
        /// Specific reason the mutation failed.
        reason: FormulaChangeError,
    },
    /// Confirms that an entity accepted a freshly computed path.
    PathAssigned {
        /// Entity that received the path.
        entity: EntityId,
        /// Final tile of the accepted path.
        goal: TileCoord,
        /// Number of waypoints composing the path.
        length: usize,
    },
    /// Confirms that an entity finished a step between two tiles.
    EntityMoved {
        /// Entity that advanced.
        entity: EntityId,
        /// Tile the entity occupied before moving.
        from: TileCoord,
        /// Tile the entity occupies after completing the step.
        to: TileCoord,
    },
    /// Announces that an entity reached the final waypoint of its path.
    DestinationReached {
        /// Entity that arrived.
        entity: EntityId,
        /// Tile where the entity stopped.
        at: TileCoord,
    },
    /// Reports that no route exists between an entity and its goal.
    DestinationUnreachable {
        /// Entity whose request failed.
        entity: EntityId,
        /// Goal tile provided in the request.
        goal: TileCoord,
    },
    /// Reports that an entity abandoned its path after repeated re-routes.
    PathBlocked {
        /// Entity that gave up.
        entity: EntityId,
        /// Tile the entity occupied when it stopped.
        at: TileCoord,
    },
    /// Reports that a movement was clamped against a tile collision.
    TileCollided {
        /// Entity whose movement was clamped.
        entity: EntityId,
        /// Axis on which the collision was resolved.
        axis: Axis,
        /// Tile that produced the collision value.
        tile: TileCoord,
    },
}

/// Reasons a tile mutation request may be rejected by the map.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TileChangeError {
    /// The requested coordinate lies beyond the configured grid bounds.
    OutOfBounds,
}

/// Reasons a formula mutation request may be rejected by the map.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FormulaChangeError {
    /// No category with the provided name exists.
    UnknownCategory,
    /// The formula range does not fit within the map's tile size.
    InvalidRange,
    /// The formula function contains a non-finite coefficient after binding.
    NonFiniteFunction,
    /// No formula with the provided name exists on the category.
    MissingFormula,
}
