//! opforge Declarations
//!
//! Declarative description of virtual instructions: operand slots, unit
//! computations, and the capability composition that resolves their
//! defaults.

pub mod compose;
pub mod declaration;
pub mod operand;
pub mod unit;

pub use compose::{PREDICATE_SLOT, ResolvedDefaults, compose};
pub use declaration::{DeclBuilder, OperationDecl};
pub use operand::{OperandDecl, ResolvedSlot, SlotMode, SlotRole, SlotType};
pub use unit::{BinaryOp, Expr, Intrinsic, Literal, Stmt, TypeToken, UnaryOp, UnitComputation};
