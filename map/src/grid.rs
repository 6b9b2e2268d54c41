//! Dense tile storage backing the authoritative map.

use gridpath_core::{GridDimensions, TileCoord};

use crate::category::CategoryId;

/// Single placed tile.
///
/// The `(sheet, number)` identity is immutable once placed; the category is
/// resolved from the group tables when the tile enters the grid and only
/// changes through map edit commands, never through gameplay.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Tile {
    sheet: u32,
    number: u32,
    category: Option<CategoryId>,
}

impl Tile {
    /// Creates a new tile with a resolved category.
    #[must_use]
    pub(crate) const fn new(sheet: u32, number: u32, category: Option<CategoryId>) -> Self {
        Self {
            sheet,
            number,
            category,
        }
    }

    /// Sheet identifier of the tile's source image.
    #[must_use]
    pub const fn sheet(&self) -> u32 {
        self.sheet
    }

    /// Index of the tile within its sheet.
    #[must_use]
    pub const fn number(&self) -> u32 {
        self.number
    }

    /// Category resolved for the tile, if its reference belongs to a group.
    #[must_use]
    pub const fn category(&self) -> Option<CategoryId> {
        self.category
    }
}

/// Row-major tile array with fixed pixel tile size.
#[derive(Clone, Debug)]
pub(crate) struct TileGrid {
    dimensions: GridDimensions,
    tiles: Vec<Option<Tile>>,
}

impl TileGrid {
    pub(crate) fn new(dimensions: GridDimensions) -> Self {
        Self {
            dimensions,
            tiles: vec![None; dimensions.tile_count()],
        }
    }

    pub(crate) const fn dimensions(&self) -> GridDimensions {
        self.dimensions
    }

    /// Tile at the provided coordinate; `None` beyond the map edges.
    pub(crate) fn get(&self, coord: TileCoord) -> Option<&Tile> {
        self.index(coord)
            .and_then(|index| self.tiles.get(index))
            .and_then(Option::as_ref)
    }

    /// Stores or clears the tile at the coordinate; `false` when out of bounds.
    pub(crate) fn set(&mut self, coord: TileCoord, tile: Option<Tile>) -> bool {
        match self.index(coord) {
            Some(index) => {
                if let Some(slot) = self.tiles.get_mut(index) {
                    *slot = tile;
                    true
                } else {
                    false
                }
            }
            None => false,
        }
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (TileCoord, &Tile)> {
        let columns = self.dimensions.columns();
        self.tiles.iter().enumerate().filter_map(move |(i, slot)| {
            let tile = slot.as_ref()?;
            let index = u32::try_from(i).ok()?;
            Some((TileCoord::new(index % columns, index / columns), tile))
        })
    }

    pub(crate) fn update_categories<F>(&mut self, mut resolve: F)
    where
        F: FnMut(u32, u32) -> Option<CategoryId>,
    {
        for slot in &mut self.tiles {
            if let Some(tile) = slot {
                *tile = Tile::new(tile.sheet, tile.number, resolve(tile.sheet, tile.number));
            }
        }
    }

    fn index(&self, coord: TileCoord) -> Option<usize> {
        if self.dimensions.contains(coord) {
            let row = usize::try_from(coord.row()).ok()?;
            let column = usize::try_from(coord.column()).ok()?;
            let width = usize::try_from(self.dimensions.columns()).ok()?;
            Some(row * width + column)
        } else {
            None
        }
    }
}

/// Offsets of the four cardinal neighbors, clockwise from north.
pub(crate) const CARDINAL_OFFSETS: [(i64, i64); 4] = [(0, -1), (1, 0), (0, 1), (-1, 0)];

/// Offsets of the eight neighbors, clockwise from north.
pub(crate) const OCTILE_OFFSETS: [(i64, i64); 8] = [
    (0, -1),
    (1, -1),
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
    (-1, -1),
];

/// Applies a signed offset to a coordinate, bounded by the grid dimensions.
pub(crate) fn offset_within(
    coord: TileCoord,
    offset: (i64, i64),
    dimensions: GridDimensions,
) -> Option<TileCoord> {
    let column = i64::from(coord.column()) + offset.0;
    let row = i64::from(coord.row()) + offset.1;
    if column < 0 || row < 0 {
        return None;
    }
    let column = u32::try_from(column).ok()?;
    let row = u32::try_from(row).ok()?;
    let candidate = TileCoord::new(column, row);
    dimensions.contains(candidate).then_some(candidate)
}
