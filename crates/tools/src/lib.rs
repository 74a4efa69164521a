//! opforge Tools
//!
//! Logging setup, build options, and the commands behind the `opforge`
//! binary.

pub mod commands;
pub mod options;

pub use commands::{OperationSummary, ToolError, build, expand, list, write_json};
pub use options::BuildOptions;

use tracing_subscriber::{EnvFilter, fmt};

/// Initialize logging with a default filter.
///
/// Use `RUST_LOG` environment variable to override the default filter.
/// Default is `info`, with `debug` for the tools themselves.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,opforge_tools=debug"));

    fmt().with_env_filter(filter).with_target(false).init();
}
