//! Operation registry.
//!
//! Declarations register themselves into [`OPERATIONS`] with
//! [`linkme::distributed_slice`]; at link time every registration in every
//! linked crate is collected, so operations can be declared anywhere
//! (including downstream crates) and still be found by name.
//!
//! # Example Registration
//!
//! ```ignore
//! use opforge_catalog::{OPERATIONS, OperationEntry};
//! use opforge_catalog::linkme::distributed_slice;
//!
//! #[distributed_slice(OPERATIONS)]
//! static NEGATE: OperationEntry = OperationEntry {
//!     name: "negate",
//!     category: "math",
//!     doc: "Elementwise negation",
//!     declare: declare_negate,
//! };
//! ```

use indexmap::IndexMap;
use linkme::distributed_slice;
use opforge_declare::OperationDecl;
use opforge_foundation::{BuildError, Result};
use opforge_synth::{RoutineSet, build};
use rayon::prelude::*;
use tracing::{info, instrument, warn};

/// Constructor for one declaration.
pub type DeclareFn = fn() -> Result<OperationDecl>;

/// Descriptor for a registered operation.
pub struct OperationEntry {
    /// Operation name; prefix of every routine it generates
    pub name: &'static str,
    /// Category tag (e.g. "math", "array", "string")
    pub category: &'static str,
    pub doc: &'static str,
    /// Builds and composes the declaration
    pub declare: DeclareFn,
}

/// Distributed slice collecting every operation registration.
#[distributed_slice]
pub static OPERATIONS: [OperationEntry];

/// All registered operation names, sorted.
pub fn all_names() -> Vec<&'static str> {
    let mut names: Vec<_> = OPERATIONS.iter().map(|op| op.name).collect();
    names.sort_unstable();
    names
}

/// Look up an operation by name
pub fn get(name: &str) -> Option<&'static OperationEntry> {
    OPERATIONS.iter().find(|op| op.name == name)
}

/// Check if an operation name is registered
pub fn is_known(name: &str) -> bool {
    get(name).is_some()
}

/// Compose the declaration of a registered operation.
pub fn declare(name: &str) -> Option<Result<OperationDecl>> {
    get(name).map(|op| (op.declare)())
}

/// Outcome of building many declarations.
///
/// A failure is fatal to its own declaration only; every other declaration
/// still builds.
#[derive(Debug, Default)]
pub struct BuildReport {
    /// Routine sets keyed by operation name, sorted by name
    pub built: IndexMap<&'static str, RoutineSet>,
    pub failed: Vec<BuildError>,
}

impl BuildReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn routine_count(&self) -> usize {
        self.built.values().map(RoutineSet::len).sum()
    }
}

/// Build every registered operation.
pub fn build_all() -> BuildReport {
    build_where(|_| true)
}

/// Build the registered operations accepted by `filter`, in parallel.
#[instrument(skip_all)]
pub fn build_where(filter: impl Fn(&OperationEntry) -> bool + Sync) -> BuildReport {
    let mut entries: Vec<&'static OperationEntry> =
        OPERATIONS.iter().filter(|op| filter(*op)).collect();
    entries.sort_unstable_by_key(|op| op.name);

    let results: Vec<(&'static str, Result<RoutineSet>)> = entries
        .par_iter()
        .map(|op| (op.name, (op.declare)().and_then(|decl| build(&decl))))
        .collect();

    let mut report = BuildReport::default();
    for (name, result) in results {
        match result {
            Ok(set) => {
                report.built.insert(name, set);
            }
            Err(err) => {
                warn!(operation = name, error = %err, "declaration failed");
                report.failed.push(err);
            }
        }
    }
    info!(
        operations = report.built.len(),
        routines = report.routine_count(),
        failed = report.failed.len(),
        "catalog built"
    );
    report
}
