//! Specialized routine identities.

use indexmap::IndexMap;
use indexmap::map::Entry;
use opforge_declare::OperationDecl;
use opforge_foundation::{AddressMode, BuildError, ElementType, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, instrument, trace};

use crate::binding::{Binding, enumerate};

/// Unique identity of a specialized routine.
///
/// Two routines are the same routine exactly when they share the
/// declaration, every slot type, every slot mode, and the parallelism
/// choice.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoutineKey {
    pub operation: String,
    pub type_param: Option<ElementType>,
    pub types: Vec<ElementType>,
    pub modes: Vec<AddressMode>,
    pub parallel: bool,
}

impl RoutineKey {
    pub fn new(operation: &str, binding: &Binding, parallel: bool) -> Self {
        Self {
            operation: operation.to_string(),
            type_param: binding.type_param,
            types: binding.slots.iter().map(|b| b.ty).collect(),
            modes: binding.slots.iter().map(|b| b.mode).collect(),
            parallel,
        }
    }

    /// Routine symbol, e.g. `min_F32_ARR_SCA_ARR` or `sqrt_F64_ARR_ARR_mt`.
    pub fn name(&self) -> String {
        let mut name = self.operation.clone();
        if let Some(ty) = self.type_param {
            name.push('_');
            name.push_str(ty.name());
        }
        for mode in &self.modes {
            name.push('_');
            name.push_str(mode.name());
        }
        if self.parallel {
            name.push_str("_mt");
        }
        name
    }
}

impl fmt::Display for RoutineKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

/// One fully bound generation artifact, not yet synthesized.
#[derive(Debug, Clone)]
pub struct SpecializedRoutine<'d> {
    pub decl: &'d OperationDecl,
    pub key: RoutineKey,
    pub binding: Binding,
}

impl SpecializedRoutine<'_> {
    pub fn name(&self) -> String {
        self.key.name()
    }
}

/// Expand a declaration into its specialized routines.
///
/// Each legal binding yields a serial routine. Parallel-safe declarations
/// add a range-splitting variant for every binding whose loop bound is an
/// array, since splitting needs an index range to partition.
#[instrument(skip_all, fields(operation = decl.name()))]
pub fn expand(decl: &OperationDecl) -> Result<IndexMap<RoutineKey, SpecializedRoutine<'_>>> {
    let resolved = decl.resolved();
    let mut routines = IndexMap::new();

    for binding in enumerate(decl) {
        let splittable = resolved.parallel && binding.loop_bound(resolved).is_some();
        let variants: &[bool] = if splittable { &[false, true] } else { &[false] };

        for &parallel in variants {
            let key = RoutineKey::new(decl.name(), &binding, parallel);
            match routines.entry(key) {
                Entry::Occupied(entry) => {
                    return Err(BuildError::illegal(
                        decl.name(),
                        resolved.output().map_or("res", |s| s.name.as_str()),
                        format!("duplicate routine {}", entry.key()),
                    ));
                }
                Entry::Vacant(entry) => {
                    trace!(routine = %entry.key(), "expanded");
                    let key = entry.key().clone();
                    entry.insert(SpecializedRoutine {
                        decl,
                        key,
                        binding: binding.clone(),
                    });
                }
            }
        }
    }

    debug!(routines = routines.len(), "expansion complete");
    Ok(routines)
}
