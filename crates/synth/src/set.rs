//! Building the complete routine set of a declaration.

use indexmap::IndexMap;
use opforge_declare::OperationDecl;
use opforge_expand::expand;
use opforge_foundation::Result;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::ir::Routine;
use crate::lower::synthesize;

/// Every routine generated for one declaration, keyed by routine name in
/// expansion order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutineSet {
    pub operation: String,
    pub routines: IndexMap<String, Routine>,
}

impl RoutineSet {
    pub fn get(&self, name: &str) -> Option<&Routine> {
        self.routines.get(name)
    }

    pub fn len(&self) -> usize {
        self.routines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routines.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Routine> {
        self.routines.values()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.routines.keys().map(String::as_str)
    }

    /// Range-splitting entry points only.
    pub fn parallel(&self) -> impl Iterator<Item = &Routine> {
        self.iter().filter(|r| r.parallel.is_some())
    }
}

/// Expand and synthesize a declaration.
///
/// All-or-nothing: the first failing routine aborts the declaration and no
/// partial set is returned.
#[instrument(skip_all, fields(operation = decl.name()))]
pub fn build(decl: &OperationDecl) -> Result<RoutineSet> {
    let expanded = expand(decl)?;
    let mut routines = IndexMap::with_capacity(expanded.len());
    for specialized in expanded.values() {
        let routine = synthesize(specialized)?;
        routines.insert(routine.name.clone(), routine);
    }
    debug!(routines = routines.len(), "built routine set");
    Ok(RoutineSet {
        operation: decl.name().to_string(),
        routines,
    })
}
