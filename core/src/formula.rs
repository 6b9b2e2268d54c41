//! Collision formula model and pure per-tile evaluation.
//!
//! A formula describes one collision boundary inside a tile: a declared range
//! of tile-local positions, a function producing the boundary coordinate on
//! the output axis, and an optional constraint suppressing the formula next
//! to excluded neighbor categories. Formulas are immutable and shared by
//! reference across all tiles of the same category.

use serde::{Deserialize, Serialize};

use crate::{Axis, FormulaChangeError, GridDimensions};

/// Tile-local range over which a formula applies.
///
/// Bounds are offsets in `[0, tile size)` on both axes; the output axis
/// selects whether evaluation produces an X or a Y coordinate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollisionRange {
    output: Axis,
    min_x: u32,
    max_x: u32,
    min_y: u32,
    max_y: u32,
}

impl CollisionRange {
    /// Creates a new range with explicit bounds.
    #[must_use]
    pub const fn new(output: Axis, min_x: u32, max_x: u32, min_y: u32, max_y: u32) -> Self {
        Self {
            output,
            min_x,
            max_x,
            min_y,
            max_y,
        }
    }

    /// Axis on which the formula produces a coordinate.
    #[must_use]
    pub const fn output(&self) -> Axis {
        self.output
    }

    /// Lower horizontal bound of the range.
    #[must_use]
    pub const fn min_x(&self) -> u32 {
        self.min_x
    }

    /// Upper horizontal bound of the range.
    #[must_use]
    pub const fn max_x(&self) -> u32 {
        self.max_x
    }

    /// Lower vertical bound of the range.
    #[must_use]
    pub const fn min_y(&self) -> u32 {
        self.min_y
    }

    /// Upper vertical bound of the range.
    #[must_use]
    pub const fn max_y(&self) -> u32 {
        self.max_y
    }

    /// Reports whether the provided local column lies inside the range.
    #[must_use]
    pub const fn contains_x(&self, lx: u32) -> bool {
        lx >= self.min_x && lx <= self.max_x
    }

    /// Reports whether the provided local row lies inside the range.
    #[must_use]
    pub const fn contains_y(&self, ly: u32) -> bool {
        ly >= self.min_y && ly <= self.max_y
    }
}

/// Function computing the collision boundary from a tile-local input.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum CollisionFunction {
    /// Linear boundary `a * input + b`.
    ///
    /// Before binding, `b` may be NaN as a sentinel meaning "clamp to
    /// tile size minus one"; [`CollisionFormula::bind`] resolves it against
    /// the map's actual tile size, so evaluation never observes NaN.
    Linear {
        /// Slope applied to the input coordinate.
        a: f64,
        /// Offset added to the scaled input.
        b: f64,
    },
    /// Constant boundary independent of the input coordinate.
    Constant {
        /// Boundary value produced for every input.
        value: f64,
    },
}

impl CollisionFunction {
    /// Evaluates the function for the provided tile-local input.
    #[must_use]
    pub fn evaluate(&self, input: f64) -> f64 {
        match self {
            Self::Linear { a, b } => a * input + b,
            Self::Constant { value } => *value,
        }
    }
}

/// Side of a tile used to locate the neighbor a constraint inspects.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConstraintSide {
    /// Neighbor toward decreasing row indices.
    North,
    /// Neighbor toward increasing row indices.
    South,
    /// Neighbor toward increasing column indices.
    East,
    /// Neighbor toward decreasing column indices.
    West,
}

impl ConstraintSide {
    /// All sides in deterministic evaluation order.
    pub const ALL: [ConstraintSide; 4] = [Self::North, Self::South, Self::East, Self::West];
}

/// Per-side category exclusions suppressing a formula's contribution.
///
/// When the neighbor on a listed side belongs to one of the excluded
/// categories, the formula is ignored for that tile. This prevents
/// double-counting collision edges between adjacent same-group tiles.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollisionConstraint {
    north: Vec<String>,
    south: Vec<String>,
    east: Vec<String>,
    west: Vec<String>,
}

impl CollisionConstraint {
    /// Creates a constraint with no exclusions.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Adds an excluded category on the provided side.
    pub fn add(&mut self, side: ConstraintSide, category: impl Into<String>) {
        self.side_mut(side).push(category.into());
    }

    /// Categories excluded on the provided side.
    #[must_use]
    pub fn excluded(&self, side: ConstraintSide) -> &[String] {
        match side {
            ConstraintSide::North => &self.north,
            ConstraintSide::South => &self.south,
            ConstraintSide::East => &self.east,
            ConstraintSide::West => &self.west,
        }
    }

    /// Reports whether the constraint excludes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.north.is_empty() && self.south.is_empty() && self.east.is_empty() && self.west.is_empty()
    }

    fn side_mut(&mut self, side: ConstraintSide) -> &mut Vec<String> {
        match side {
            ConstraintSide::North => &mut self.north,
            ConstraintSide::South => &mut self.south,
            ConstraintSide::East => &mut self.east,
            ConstraintSide::West => &mut self.west,
        }
    }
}

/// Named collision formula combining range, function and constraint.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CollisionFormula {
    name: String,
    range: CollisionRange,
    function: CollisionFunction,
    constraint: CollisionConstraint,
}

impl CollisionFormula {
    /// Creates a new formula with explicit parts.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        range: CollisionRange,
        function: CollisionFunction,
        constraint: CollisionConstraint,
    ) -> Self {
        Self {
            name: name.into(),
            range,
            function,
            constraint,
        }
    }

    /// Name under which the formula was declared.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Range over which the formula applies.
    #[must_use]
    pub const fn range(&self) -> &CollisionRange {
        &self.range
    }

    /// Function producing the collision boundary.
    #[must_use]
    pub const fn function(&self) -> &CollisionFunction {
        &self.function
    }

    /// Constraint suppressing the formula next to excluded neighbors.
    #[must_use]
    pub const fn constraint(&self) -> &CollisionConstraint {
        &self.constraint
    }

    /// Binds the formula against the map's tile size.
    ///
    /// Validates the range against the tile bounds and resolves the NaN
    /// offset sentinel to `tile size - 1` on the output axis. The returned
    /// formula is safe to evaluate: it never yields NaN.
    pub fn bind(&self, dimensions: &GridDimensions) -> Result<Self, FormulaChangeError> {
        let range = &self.range;
        if range.min_x > range.max_x || range.min_y > range.max_y {
            return Err(FormulaChangeError::InvalidRange);
        }
        if range.max_x >= dimensions.tile_width() || range.max_y >= dimensions.tile_height() {
            return Err(FormulaChangeError::InvalidRange);
        }

        let clamp = match range.output {
            Axis::X => f64::from(dimensions.tile_width() - 1),
            Axis::Y => f64::from(dimensions.tile_height() - 1),
        };

        let function = match self.function {
            CollisionFunction::Linear { a, b } => {
                if !a.is_finite() {
                    return Err(FormulaChangeError::NonFiniteFunction);
                }
                let b = if b.is_nan() { clamp } else { b };
                if !b.is_finite() {
                    return Err(FormulaChangeError::NonFiniteFunction);
                }
                CollisionFunction::Linear { a, b }
            }
            CollisionFunction::Constant { value } => {
                let value = if value.is_nan() { clamp } else { value };
                if !value.is_finite() {
                    return Err(FormulaChangeError::NonFiniteFunction);
                }
                CollisionFunction::Constant { value }
            }
        };

        Ok(Self {
            name: self.name.clone(),
            range: self.range,
            function,
            constraint: self.constraint.clone(),
        })
    }

    /// Evaluates the collision boundary for a tile-local position.
    ///
    /// Returns the coordinate implied by the function on the requested axis,
    /// or `None` when the formula targets the other axis, the local position
    /// falls outside the declared range, or the computed value escapes the
    /// range on the output axis.
    #[must_use]
    pub fn compute(&self, axis: Axis, lx: u32, ly: u32) -> Option<f64> {
        if self.range.output != axis {
            return None;
        }

        match axis {
            Axis::Y => {
                if !self.range.contains_x(lx) {
                    return None;
                }
                let value = self.function.evaluate(f64::from(lx));
                if value < f64::from(self.range.min_y) || value > f64::from(self.range.max_y) {
                    return None;
                }
                Some(value)
            }
            Axis::X => {
                if !self.range.contains_y(ly) {
                    return None;
                }
                let value = self.function.evaluate(f64::from(ly));
                if value < f64::from(self.range.min_x) || value > f64::from(self.range.max_x) {
                    return None;
                }
                Some(value)
            }
        }
    }
}
