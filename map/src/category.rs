//! Tile category tables mapping tile identities to traversal and collision data.

use std::collections::HashMap;

use gridpath_core::{CollisionFormula, FormulaChangeError, PathData};

/// Interned index of a tile category.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CategoryId(u16);

impl CategoryId {
    #[must_use]
    pub(crate) const fn new(value: u16) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u16 {
        self.0
    }
}

/// Definition of a single category: name, traversal data, bound formulas.
#[derive(Clone, Debug)]
pub(crate) struct CategoryDef {
    name: String,
    path: PathData,
    formulas: Vec<CollisionFormula>,
}

impl CategoryDef {
    pub(crate) fn new(name: String, path: PathData, formulas: Vec<CollisionFormula>) -> Self {
        Self {
            name,
            path,
            formulas,
        }
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) const fn path(&self) -> PathData {
        self.path
    }

    pub(crate) fn formulas(&self) -> &[CollisionFormula] {
        &self.formulas
    }
}

/// Category registry with tile-reference resolution.
///
/// Lookups run on every search expansion, so tile references resolve through
/// a prebuilt `(sheet, number)` index instead of group name comparisons.
#[derive(Clone, Debug, Default)]
pub(crate) struct CategoryTable {
    defs: Vec<CategoryDef>,
    by_name: HashMap<String, CategoryId>,
    by_tile: HashMap<(u32, u32), CategoryId>,
}

impl CategoryTable {
    pub(crate) fn empty() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, def: CategoryDef) -> Option<CategoryId> {
        if self.by_name.contains_key(def.name()) {
            return None;
        }
        let id = CategoryId::new(u16::try_from(self.defs.len()).ok()?);
        let _ = self.by_name.insert(def.name().to_owned(), id);
        self.defs.push(def);
        Some(id)
    }

    pub(crate) fn register_tile(&mut self, sheet: u32, number: u32, id: CategoryId) -> bool {
        match self.by_tile.insert((sheet, number), id) {
            None => true,
            Some(previous) if previous == id => true,
            Some(previous) => {
                let _ = self.by_tile.insert((sheet, number), previous);
                false
            }
        }
    }

    /// Category resolved for a tile reference, if it belongs to any group.
    pub(crate) fn resolve(&self, sheet: u32, number: u32) -> Option<CategoryId> {
        self.by_tile.get(&(sheet, number)).copied()
    }

    pub(crate) fn id_of(&self, name: &str) -> Option<CategoryId> {
        self.by_name.get(name).copied()
    }

    pub(crate) fn name(&self, id: CategoryId) -> Option<&str> {
        self.defs.get(usize::from(id.get())).map(CategoryDef::name)
    }

    /// Traversal data of a category; absent entries stay impassable.
    pub(crate) fn path_data(&self, id: CategoryId) -> Option<PathData> {
        self.defs.get(usize::from(id.get())).map(CategoryDef::path)
    }

    pub(crate) fn formulas(&self, id: CategoryId) -> &[CollisionFormula] {
        self.defs
            .get(usize::from(id.get()))
            .map_or(&[], CategoryDef::formulas)
    }

    /// Cheapest cost among non-blocking categories, used as heuristic scale.
    pub(crate) fn min_traversable_cost(&self) -> Option<f64> {
        self.defs
            .iter()
            .filter(|def| !def.path.is_blocking())
            .map(|def| def.path.cost())
            .fold(None, |best, cost| match best {
                None => Some(cost),
                Some(current) => Some(current.min(cost)),
            })
    }

    /// Stores a bound formula on a category, replacing any namesake.
    pub(crate) fn save_formula(
        &mut self,
        category: &str,
        formula: CollisionFormula,
    ) -> Result<(), FormulaChangeError> {
        let id = self
            .id_of(category)
            .ok_or(FormulaChangeError::UnknownCategory)?;
        let def = &mut self.defs[usize::from(id.get())];
        match def
            .formulas
            .iter()
            .position(|existing| existing.name() == formula.name())
        {
            Some(index) => def.formulas[index] = formula,
            None => def.formulas.push(formula),
        }
        Ok(())
    }

    /// Removes a named formula from a category.
    pub(crate) fn drop_formula(
        &mut self,
        category: &str,
        name: &str,
    ) -> Result<(), FormulaChangeError> {
        let id = self
            .id_of(category)
            .ok_or(FormulaChangeError::UnknownCategory)?;
        let def = &mut self.defs[usize::from(id.get())];
        match def
            .formulas
            .iter()
            .position(|existing| existing.name() == name)
        {
            Some(index) => {
                let _ = def.formulas.remove(index);
                Ok(())
            }
            None => Err(FormulaChangeError::MissingFormula),
        }
    }
}
