//! opforge Expansion Engine
//!
//! Turns one composed declaration into the complete set of specialized
//! routines: every legal (type, addressing mode) combination, plus
//! range-splitting variants for parallel-safe declarations.

pub mod binding;
pub mod routine;

pub use binding::{Binding, SlotBinding, enumerate};
pub use routine::{RoutineKey, SpecializedRoutine, expand};
