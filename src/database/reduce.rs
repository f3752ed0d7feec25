//! Reduction of a database to a chemical subsystem.

use super::Database;
use crate::error::{CalphadError, Result};
use crate::symbolic::Expression;
use std::collections::BTreeSet;
use tracing::debug;

/// Parameter and symbol counts before and after a reduction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReductionSummary {
    pub parameters_before: usize,
    pub parameters_after: usize,
    pub symbols_before: usize,
    pub symbols_after: usize,
}

/// True if any of `species_elements` lies outside `elements`.
pub fn not_subsystem(species_elements: &BTreeSet<String>, elements: &BTreeSet<String>) -> bool {
    !species_elements.is_subset(elements)
}

/// Remove every parameter that references an element outside `elements`, then
/// drop the symbols no surviving parameter uses.
///
/// A symbol counts as used when a surviving parameter refers to it directly or
/// through other symbols. `None` leaves the database untouched.
///
/// This mutates `dbf` in place; call it on an exclusively owned copy only.
pub fn reduce_database(dbf: &mut Database, elements: Option<&[String]>) -> ReductionSummary {
    let parameters_before = dbf.parameters().len();
    let symbols_before = dbf.symbols().len();

    if let Some(elements) = elements {
        let elements: BTreeSet<String> = elements.iter().map(|e| e.to_uppercase()).collect();

        let keep: Vec<bool> = dbf
            .parameters()
            .iter()
            .map(|p| {
                let species_elements: BTreeSet<String> = p
                    .species()
                    .flat_map(|s| dbf.species_elements(s))
                    .collect();
                !not_subsystem(&species_elements, &elements)
            })
            .collect();
        let mut keep = keep.into_iter();
        dbf.parameters_mut().retain(|_| keep.next().unwrap_or(false));

        let used = referenced_symbols(dbf);
        dbf.symbols_mut().retain(|name, _| used.contains(name));
    }

    let summary = ReductionSummary {
        parameters_before,
        parameters_after: dbf.parameters().len(),
        symbols_before,
        symbols_after: dbf.symbols().len(),
    };
    debug!(?summary, "database reduction");
    summary
}

/// Symbols reachable from the parameters' expressions through the symbol table
fn referenced_symbols(dbf: &Database) -> BTreeSet<String> {
    let mut used = BTreeSet::new();
    let mut pending: Vec<String> = dbf
        .parameters()
        .iter()
        .flat_map(|p| p.parameter.variables())
        .collect();

    while let Some(name) = pending.pop() {
        if let Some(expr) = dbf.symbol(&name) {
            if used.insert(name) {
                pending.extend(expr.variables());
            }
        }
    }
    used
}

/// An exclusively owned, mutable copy of a database.
///
/// Context assembly copies the caller's database into a `WorkingDatabase`,
/// reduces it and rewrites fit symbols, then hands the finished [`Database`] to
/// the error context. The caller's database is never touched.
#[derive(Debug)]
pub struct WorkingDatabase {
    dbf: Database,
}

impl WorkingDatabase {
    /// Deep-copy `dbf`
    pub fn copy_of(dbf: &Database) -> Self {
        Self { dbf: dbf.clone() }
    }

    pub fn database(&self) -> &Database {
        &self.dbf
    }

    /// See [`reduce_database`]
    pub fn reduce(&mut self, elements: Option<&[String]>) -> ReductionSummary {
        reduce_database(&mut self.dbf, elements)
    }

    /// Replace each piecewise symbol among `symbols` by its first branch.
    ///
    /// Later branches are discarded. Returns the names that were rewritten.
    pub fn collapse_piecewise(&mut self, symbols: &[String]) -> Result<Vec<String>> {
        let mut replaced = Vec::new();
        for name in symbols {
            let value = self
                .dbf
                .symbol(name)
                .ok_or_else(|| CalphadError::SymbolNotFound(name.clone()))?;
            if let Expression::Piecewise(pw) = value {
                let first = pw.first_branch().cloned().ok_or_else(|| {
                    CalphadError::Configuration(format!(
                        "piecewise symbol {} has no branches",
                        name
                    ))
                })?;
                debug!("Replacing {} in database", name);
                self.dbf.set_symbol(name, first);
                replaced.push(name.clone());
            }
        }
        Ok(replaced)
    }

    pub fn into_database(self) -> Database {
        self.dbf
    }
}
