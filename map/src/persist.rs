//! Single-line snapshot codec for the tile grid.
//!
//! The encoded form is `gridmap:v1:{columns}x{rows}:<payload>` where the
//! payload is base64-wrapped JSON carrying the tile size and per-tile
//! records. Consumers treat the stream as opaque; only this module knows
//! the layout.

use std::{error::Error, fmt};

use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine as _};
use gridpath_core::{GridDimensions, TileCoord};
use serde::{Deserialize, Serialize};

use crate::Map;

const SNAPSHOT_DOMAIN: &str = "gridmap";
const SNAPSHOT_VERSION: &str = "v1";

/// Identifier prefix emitted before the encoded snapshot payload.
pub const SNAPSHOT_HEADER: &str = "gridmap:v1";
/// Delimiter used to separate the prefix, grid dimensions and payload.
const FIELD_DELIMITER: char = ':';

/// Snapshot of a tile grid suitable for persistence or transfer.
#[derive(Clone, Debug, PartialEq)]
pub struct MapSnapshot {
    /// Layout of the captured grid.
    pub dimensions: GridDimensions,
    /// Tiles present in the grid when the snapshot was taken.
    pub tiles: Vec<TileRecord>,
}

/// Per-tile record captured within a snapshot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileRecord {
    /// Sheet identifier of the tile's source image.
    pub sheet: u32,
    /// Index of the tile within its sheet.
    pub number: u32,
    /// Column of the tile in the grid.
    pub column: u32,
    /// Row of the tile in the grid.
    pub row: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
struct SerializablePayload {
    tile_width: u32,
    tile_height: u32,
    tiles: Vec<TileRecord>,
}

/// Captures a snapshot of the provided map's tile grid.
#[must_use]
pub fn snapshot(map: &Map) -> MapSnapshot {
    let dimensions = map.grid.dimensions();
    let tiles = map
        .grid
        .iter()
        .map(|(coord, tile)| TileRecord {
            sheet: tile.sheet(),
            number: tile.number(),
            column: coord.column(),
            row: coord.row(),
        })
        .collect();
    MapSnapshot { dimensions, tiles }
}

impl MapSnapshot {
    /// Encodes the snapshot into a single-line string.
    #[must_use]
    pub fn encode(&self) -> String {
        let payload = SerializablePayload {
            tile_width: self.dimensions.tile_width(),
            tile_height: self.dimensions.tile_height(),
            tiles: self.tiles.clone(),
        };
        let json = serde_json::to_vec(&payload).expect("snapshot serialization never fails");
        let encoded = STANDARD_NO_PAD.encode(json);
        format!(
            "{SNAPSHOT_HEADER}:{}x{}:{encoded}",
            self.dimensions.columns(),
            self.dimensions.rows()
        )
    }

    /// Decodes a snapshot from its string representation.
    pub fn decode(value: &str) -> Result<Self, SnapshotError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(SnapshotError::EmptyPayload);
        }

        let mut parts = trimmed.split(FIELD_DELIMITER);
        let domain = parts.next().ok_or(SnapshotError::MissingPrefix)?;
        let version = parts.next().ok_or(SnapshotError::MissingVersion)?;
        let dimensions = parts.next().ok_or(SnapshotError::MissingDimensions)?;
        let payload = parts.next().ok_or(SnapshotError::MissingPayload)?;

        if domain != SNAPSHOT_DOMAIN {
            return Err(SnapshotError::InvalidPrefix(domain.to_owned()));
        }
        if version != SNAPSHOT_VERSION {
            return Err(SnapshotError::UnsupportedVersion(version.to_owned()));
        }

        let (columns, rows) = parse_dimensions(dimensions)?;
        let bytes = STANDARD_NO_PAD
            .decode(payload.as_bytes())
            .map_err(SnapshotError::InvalidEncoding)?;
        let decoded: SerializablePayload =
            serde_json::from_slice(&bytes).map_err(SnapshotError::InvalidPayload)?;

        Ok(Self {
            dimensions: GridDimensions::new(columns, rows, decoded.tile_width, decoded.tile_height),
            tiles: decoded.tiles,
        })
    }

    /// Convenience lookup of the record stored for a coordinate.
    #[must_use]
    pub fn record_at(&self, coord: TileCoord) -> Option<&TileRecord> {
        self.tiles
            .iter()
            .find(|record| record.column == coord.column() && record.row == coord.row())
    }
}

/// Errors that can occur while decoding snapshot strings.
#[derive(Debug)]
pub enum SnapshotError {
    /// The provided string was empty or contained only whitespace.
    EmptyPayload,
    /// The prefix segment was missing from the encoded snapshot.
    MissingPrefix,
    /// The encoded snapshot did not contain a version segment.
    MissingVersion,
    /// The encoded snapshot did not include grid dimensions.
    MissingDimensions,
    /// The encoded snapshot did not include the payload segment.
    MissingPayload,
    /// The encoded snapshot used an unexpected prefix segment.
    InvalidPrefix(String),
    /// The encoded snapshot used an unsupported version identifier.
    UnsupportedVersion(String),
    /// The grid dimensions could not be parsed from the encoded snapshot.
    InvalidDimensions(String),
    /// The base64 payload could not be decoded.
    InvalidEncoding(base64::DecodeError),
    /// The decoded payload could not be deserialised.
    InvalidPayload(serde_json::Error),
}

impl fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyPayload => write!(f, "snapshot payload was empty"),
            Self::MissingPrefix => write!(f, "snapshot string is missing the prefix"),
            Self::MissingVersion => write!(f, "snapshot string is missing the version"),
            Self::MissingDimensions => write!(f, "snapshot string is missing the grid dimensions"),
            Self::MissingPayload => write!(f, "snapshot string is missing the payload"),
            Self::InvalidPrefix(prefix) => write!(f, "snapshot prefix '{prefix}' is not supported"),
            Self::UnsupportedVersion(version) => {
                write!(f, "snapshot version '{version}' is not supported")
            }
            Self::InvalidDimensions(dimensions) => {
                write!(f, "could not parse grid dimensions '{dimensions}'")
            }
            Self::InvalidEncoding(error) => {
                write!(f, "could not decode snapshot payload: {error}")
            }
            Self::InvalidPayload(error) => {
                write!(f, "could not parse snapshot payload: {error}")
            }
        }
    }
}

impl Error for SnapshotError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidEncoding(error) => Some(error),
            Self::InvalidPayload(error) => Some(error),
            _ => None,
        }
    }
}

fn parse_dimensions(dimensions: &str) -> Result<(u32, u32), SnapshotError> {
    let (columns, rows) = dimensions
        .split_once(['x', 'X'])
        .ok_or_else(|| SnapshotError::InvalidDimensions(dimensions.to_owned()))?;

    let columns = columns
        .trim()
        .parse::<u32>()
        .map_err(|_| SnapshotError::InvalidDimensions(dimensions.to_owned()))?;
    let rows = rows
        .trim()
        .parse::<u32>()
        .map_err(|_| SnapshotError::InvalidDimensions(dimensions.to_owned()))?;

    if columns == 0 || rows == 0 {
        return Err(SnapshotError::InvalidDimensions(dimensions.to_owned()));
    }

    Ok((columns, rows))
}
