//! opforge Reference Evaluator
//!
//! Executes synthesized routine IR over typed operands, standing in for the
//! virtual machine that would call the generated routines. It supplies the
//! three external contracts a routine relies on:
//!
//! - the capacity-growth primitive ([`CapacityGrowth`])
//! - the block-comparator family ([`compare_blocks`])
//! - the opaque execution token ([`ExecToken`])
//!
//! [`Executor::run`] evaluates single-threaded; [`Executor::run_parallel`]
//! evaluates a parallel entry point over contiguous slices with rayon.

pub mod compare;
pub mod error;
pub mod eval;
pub mod memory;
pub mod parallel;
pub mod value;

pub use compare::compare_blocks;
pub use error::{ExecError, Result};
pub use eval::Executor;
pub use memory::{CapacityGrowth, ExecToken, GrowthCall, Operand, RecordingGrowth, Resizable};
pub use parallel::{ParallelConfig, split_ranges};
pub use value::Value;
