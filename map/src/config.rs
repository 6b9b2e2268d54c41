//! Import of group, category and collision formula configuration.
//!
//! The on-disk syntax is JSON; the contract of this module is the in-memory
//! shape after a successful import. Every validation failure is fatal: a map
//! with silently defaulted collision geometry would corrupt gameplay, so the
//! table is only built when the whole document is consistent.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use gridpath_core::{
    Axis, CollisionConstraint, CollisionFormula, CollisionFunction, CollisionRange,
    ConstraintSide, FormulaChangeError, GridDimensions, PathData,
};

use crate::category::{CategoryDef, CategoryTable};

/// Root configuration document for a map.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MapConfig {
    /// Tile groups mapping tile references to semantic names.
    pub groups: Vec<GroupConfig>,
    /// Categories mapping groups to traversal data and formulas.
    pub categories: Vec<CategoryConfig>,
}

/// Named group of tile references.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GroupConfig {
    /// Semantic name of the group.
    pub name: String,
    /// Tile references belonging to the group.
    pub tiles: Vec<TileRefConfig>,
}

/// Reference to a tile identity within a sheet.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileRefConfig {
    /// Sheet identifier of the tile's source image.
    pub sheet: u32,
    /// Index of the tile within its sheet.
    pub number: u32,
}

/// Category declaration combining traversal data, groups and formulas.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CategoryConfig {
    /// Name of the category.
    pub name: String,
    /// Cost of entering tiles of this category.
    pub cost: f64,
    /// Whether tiles of this category block movement entirely.
    pub blocking: bool,
    /// Whether diagonal steps may enter tiles of this category.
    #[serde(default)]
    pub diagonal: bool,
    /// Groups whose tiles belong to this category.
    pub groups: Vec<String>,
    /// Collision formulas applied to tiles of this category.
    #[serde(default)]
    pub formulas: Vec<FormulaConfig>,
}

/// Raw collision formula as declared in configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FormulaConfig {
    /// Name under which the formula is declared.
    pub name: String,
    /// Tile-local range over which the formula applies.
    pub range: RangeConfig,
    /// Function producing the collision boundary.
    pub function: FunctionConfig,
    /// Per-side neighbor exclusions, empty by default.
    #[serde(default)]
    pub constraints: Vec<ConstraintConfig>,
}

/// Raw range declaration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeConfig {
    /// Axis on which the formula produces a coordinate.
    pub axis: Axis,
    /// Lower horizontal bound.
    pub min_x: u32,
    /// Upper horizontal bound.
    pub max_x: u32,
    /// Lower vertical bound.
    pub min_y: u32,
    /// Upper vertical bound.
    pub max_y: u32,
}

/// Raw function declaration.
///
/// A linear function may omit `b`, which is the clamp sentinel resolved to
/// `tile size - 1` when the formula binds against the map's tile size.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FunctionConfig {
    /// Linear boundary `a * input + b`.
    Linear {
        /// Slope applied to the input coordinate.
        a: f64,
        /// Offset; absent means "clamp to tile size minus one".
        #[serde(default)]
        b: Option<f64>,
    },
    /// Constant boundary independent of the input coordinate.
    Constant {
        /// Boundary value produced for every input.
        value: f64,
    },
}

/// Raw constraint declaration for a single side.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConstraintConfig {
    /// Side of the tile whose neighbor is inspected.
    pub side: ConstraintSide,
    /// Categories suppressing the formula when found on that side.
    pub categories: Vec<String>,
}

/// Fatal errors raised while importing configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The document could not be parsed at all.
    #[error("could not parse map configuration: {0}")]
    Malformed(#[from] serde_json::Error),
    /// A category name appears more than once.
    #[error("category '{0}' is declared more than once")]
    DuplicateCategory(String),
    /// Too many categories for the interned index space.
    #[error("too many categories declared")]
    TooManyCategories,
    /// A category references a group the document does not declare.
    #[error("category '{category}' references undeclared group '{group}'")]
    UnknownGroup {
        /// Category holding the dangling reference.
        category: String,
        /// Group name that is missing.
        group: String,
    },
    /// A tile reference is claimed by two different categories.
    #[error("tile {sheet}/{number} is claimed by both '{first}' and '{second}'")]
    AmbiguousTileRef {
        /// Sheet identifier of the contested tile.
        sheet: u32,
        /// Tile number of the contested tile.
        number: u32,
        /// Category that registered the tile first.
        first: String,
        /// Category that attempted to register it again.
        second: String,
    },
    /// A category declares a negative traversal cost.
    #[error("category '{category}' declares negative cost {cost}")]
    NegativeCost {
        /// Offending category.
        category: String,
        /// Declared cost value.
        cost: f64,
    },
    /// A formula name appears more than once within a category.
    #[error("formula '{formula}' is declared more than once on category '{category}'")]
    DuplicateFormula {
        /// Category holding the duplicate.
        category: String,
        /// Duplicated formula name.
        formula: String,
    },
    /// A formula failed to bind against the map's tile size.
    #[error("formula '{formula}' on category '{category}' is invalid: {reason:?}")]
    InvalidFormula {
        /// Category holding the formula.
        category: String,
        /// Name of the invalid formula.
        formula: String,
        /// Binding failure reported by the formula model.
        reason: FormulaChangeError,
    },
    /// A snapshot tile lies outside the declared grid bounds.
    #[error("snapshot tile at {column},{row} lies outside the grid")]
    TileOutOfBounds {
        /// Column of the offending record.
        column: u32,
        /// Row of the offending record.
        row: u32,
    },
}

/// Parses a configuration document from its JSON representation.
pub fn import(document: &str) -> Result<MapConfig, ConfigError> {
    Ok(serde_json::from_str(document)?)
}

/// Builds the category table, binding formulas against the tile size.
pub(crate) fn build_table(
    config: &MapConfig,
    dimensions: GridDimensions,
) -> Result<CategoryTable, ConfigError> {
    let mut table = CategoryTable::empty();

    for category in &config.categories {
        if !(category.cost >= 0.0) {
            return Err(ConfigError::NegativeCost {
                category: category.name.clone(),
                cost: category.cost,
            });
        }

        let mut formulas = Vec::with_capacity(category.formulas.len());
        for declared in &category.formulas {
            if formulas
                .iter()
                .any(|existing: &CollisionFormula| existing.name() == declared.name)
            {
                return Err(ConfigError::DuplicateFormula {
                    category: category.name.clone(),
                    formula: declared.name.clone(),
                });
            }
            let formula = lower_formula(declared);
            let bound = formula
                .bind(&dimensions)
                .map_err(|reason| ConfigError::InvalidFormula {
                    category: category.name.clone(),
                    formula: declared.name.clone(),
                    reason,
                })?;
            formulas.push(bound);
        }

        let def = CategoryDef::new(
            category.name.clone(),
            PathData::new(category.cost, category.blocking, category.diagonal),
            formulas,
        );
        let Some(id) = table.insert(def) else {
            return Err(duplicate_or_overflow(&table, &category.name));
        };

        for group_name in &category.groups {
            let group = config
                .groups
                .iter()
                .find(|group| &group.name == group_name)
                .ok_or_else(|| ConfigError::UnknownGroup {
                    category: category.name.clone(),
                    group: group_name.clone(),
                })?;
            for tile in &group.tiles {
                if !table.register_tile(tile.sheet, tile.number, id) {
                    let first = table
                        .resolve(tile.sheet, tile.number)
                        .and_then(|owner| table.name(owner))
                        .unwrap_or_default()
                        .to_owned();
                    return Err(ConfigError::AmbiguousTileRef {
                        sheet: tile.sheet,
                        number: tile.number,
                        first,
                        second: category.name.clone(),
                    });
                }
            }
        }
    }

    Ok(table)
}

fn duplicate_or_overflow(table: &CategoryTable, name: &str) -> ConfigError {
    if table.id_of(name).is_some() {
        ConfigError::DuplicateCategory(name.to_owned())
    } else {
        ConfigError::TooManyCategories
    }
}

fn lower_formula(declared: &FormulaConfig) -> CollisionFormula {
    let range = CollisionRange::new(
        declared.range.axis,
        declared.range.min_x,
        declared.range.max_x,
        declared.range.min_y,
        declared.range.max_y,
    );
    let function = match declared.function {
        FunctionConfig::Linear { a, b } => CollisionFunction::Linear {
            a,
            b: b.unwrap_or(f64::NAN),
        },
        FunctionConfig::Constant { value } => CollisionFunction::Constant { value },
    };
    let mut constraint = CollisionConstraint::none();
    for entry in &declared.constraints {
        for category in &entry.categories {
            constraint.add(entry.side, category.clone());
        }
    }
    CollisionFormula::new(declared.name.clone(), range, function, constraint)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dimensions() -> GridDimensions {
        GridDimensions::new(10, 10, 16, 16)
    }

    fn ground_category() -> CategoryConfig {
        CategoryConfig {
            name: "ground".into(),
            cost: 1.0,
            blocking: false,
            diagonal: true,
            groups: vec!["grass".into()],
            formulas: Vec::new(),
        }
    }

    fn grass_group() -> GroupConfig {
        GroupConfig {
            name: "grass".into(),
            tiles: vec![TileRefConfig { sheet: 0, number: 4 }],
        }
    }

    #[test]
    fn import_parses_a_minimal_document() {
        let document = r#"{
            "groups": [{ "name": "grass", "tiles": [{ "sheet": 0, "number": 4 }] }],
            "categories": [{
                "name": "ground",
                "cost": 1.0,
                "blocking": false,
                "diagonal": true,
                "groups": ["grass"],
                "formulas": [{
                    "name": "top",
                    "range": { "axis": "Y", "min_x": 0, "max_x": 15, "min_y": 0, "max_y": 15 },
                    "function": { "linear": { "a": 0.0 } }
                }]
            }]
        }"#;

        let config = import(document).expect("parse");
        let table = build_table(&config, dimensions()).expect("build");
        let id = table.id_of("ground").expect("category");
        assert_eq!(table.resolve(0, 4), Some(id));
        assert_eq!(table.formulas(id).len(), 1);
    }

    #[test]
    fn unknown_group_reference_is_fatal() {
        let config = MapConfig {
            groups: Vec::new(),
            categories: vec![ground_category()],
        };

        assert!(matches!(
            build_table(&config, dimensions()),
            Err(ConfigError::UnknownGroup { .. })
        ));
    }

    #[test]
    fn duplicate_category_is_fatal() {
        let config = MapConfig {
            groups: vec![grass_group()],
            categories: vec![ground_category(), ground_category()],
        };

        assert!(matches!(
            build_table(&config, dimensions()),
            Err(ConfigError::DuplicateCategory(name)) if name == "ground"
        ));
    }

    #[test]
    fn negative_cost_is_fatal() {
        let mut category = ground_category();
        category.cost = -2.0;
        let config = MapConfig {
            groups: vec![grass_group()],
            categories: vec![category],
        };

        assert!(matches!(
            build_table(&config, dimensions()),
            Err(ConfigError::NegativeCost { .. })
        ));
    }

    #[test]
    fn tile_claimed_by_two_categories_is_fatal() {
        let mut wall = ground_category();
        wall.name = "wall".into();
        wall.blocking = true;
        let config = MapConfig {
            groups: vec![grass_group()],
            categories: vec![ground_category(), wall],
        };

        assert!(matches!(
            build_table(&config, dimensions()),
            Err(ConfigError::AmbiguousTileRef { .. })
        ));
    }

    #[test]
    fn malformed_formula_range_is_fatal() {
        let mut category = ground_category();
        category.formulas.push(FormulaConfig {
            name: "broken".into(),
            range: RangeConfig {
                axis: Axis::Y,
                min_x: 0,
                max_x: 99,
                min_y: 0,
                max_y: 15,
            },
            function: FunctionConfig::Constant { value: 0.0 },
            constraints: Vec::new(),
        });
        let config = MapConfig {
            groups: vec![grass_group()],
            categories: vec![category],
        };

        assert!(matches!(
            build_table(&config, dimensions()),
            Err(ConfigError::InvalidFormula {
                reason: FormulaChangeError::InvalidRange,
                ..
            })
        ));
    }

    #[test]
    fn omitted_linear_offset_binds_to_tile_size() {
        let mut category = ground_category();
        category.formulas.push(FormulaConfig {
            name: "top".into(),
            range: RangeConfig {
                axis: Axis::Y,
                min_x: 0,
                max_x: 15,
                min_y: 0,
                max_y: 15,
            },
            function: FunctionConfig::Linear { a: 0.0, b: None },
            constraints: Vec::new(),
        });
        let config = MapConfig {
            groups: vec![grass_group()],
            categories: vec![category],
        };

        let table = build_table(&config, dimensions()).expect("build");
        let id = table.id_of("ground").expect("category");
        let value = table.formulas(id)[0]
            .compute(Axis::Y, 3, 0)
            .expect("in range");
        assert!((value - 15.0).abs() < f64::EPSILON);
    }
}
