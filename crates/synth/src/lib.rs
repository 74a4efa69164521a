//! opforge Synthesis
//!
//! Lowers expanded routines into structured, fully typed IR: iteration,
//! reduction, membership scans, capacity growth, and predicate fusion
//! wrapped around each declaration's unit computation.
//!
//! [`build`] runs expansion and synthesis for one declaration and returns
//! its complete [`RoutineSet`].

pub mod ir;
pub mod lower;
pub mod set;
mod substitute;

pub use ir::{
    ACCUMULATOR, Bound, Cost, Cursor, Loop, MatchTest, Origin, Param, ParallelPlan, Routine, Scan,
    Size, Step, Stmt, TExpr, TRUTH,
};
pub use lower::synthesize;
pub use opforge_declare::{BinaryOp, Intrinsic, Literal, UnaryOp};
pub use set::{RoutineSet, build};
