//! Commands behind the `opforge` binary.

use opforge_catalog::{BuildReport, OPERATIONS, build_where};
use opforge_foundation::BuildError;
use opforge_synth::RoutineSet;
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

use crate::options::BuildOptions;

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("unknown operation `{0}`")]
    UnknownOperation(String),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error("failed to serialize routines: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// One registered operation, as listed.
#[derive(Debug, Clone, Serialize)]
pub struct OperationSummary {
    pub name: &'static str,
    pub category: &'static str,
    pub doc: &'static str,
    pub capabilities: Vec<String>,
}

/// Every registered operation with its declared capabilities, sorted by
/// name.
pub fn list() -> Result<Vec<OperationSummary>, ToolError> {
    let mut entries: Vec<_> = OPERATIONS.iter().collect();
    entries.sort_unstable_by_key(|op| op.name);
    entries
        .into_iter()
        .map(|op| -> Result<OperationSummary, ToolError> {
            let decl = (op.declare)()?;
            Ok(OperationSummary {
                name: op.name,
                category: op.category,
                doc: op.doc,
                capabilities: decl.capabilities().iter().map(ToString::to_string).collect(),
            })
        })
        .collect()
}

/// Build the routine set of one operation.
pub fn expand(name: &str) -> Result<RoutineSet, ToolError> {
    let decl = opforge_catalog::declare(name)
        .ok_or_else(|| ToolError::UnknownOperation(name.to_string()))??;
    let set = opforge_synth::build(&decl)?;
    debug!(operation = name, routines = set.len(), "expanded");
    Ok(set)
}

/// Build every operation accepted by `options`.
pub fn build(options: &BuildOptions) -> BuildReport {
    let mut report = build_where(|op| options.accepts(op.name));
    if !options.parallel_variants {
        for set in report.built.values_mut() {
            set.routines.retain(|_, routine| routine.parallel.is_none());
        }
    }
    report
}

/// Write the built routine sets as pretty-printed JSON.
pub fn write_json(path: &Path, report: &BuildReport) -> Result<(), ToolError> {
    let json = serde_json::to_string_pretty(&report.built)?;
    std::fs::write(path, json).map_err(|source| ToolError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    info!(path = %path.display(), operations = report.built.len(), "wrote routine IR");
    Ok(())
}
