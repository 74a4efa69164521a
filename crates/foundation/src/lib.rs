//! opforge Foundation
//!
//! Closed catalogs shared by every stage of the specialization engine:
//! element types, addressing modes, capabilities, and the construction-time
//! error type.

pub mod capability;
pub mod error;
pub mod mode;
pub mod types;

pub use capability::{
    AddressingPolicy, Arity, Capability, CombineOp, Constraint, Contribution, Hint, ResultPolicy,
};
pub use error::{BuildError, Result};
pub use mode::{AddressMode, Mutability, SizeExpr, SlotId};
pub use types::{ElementType, TypeSet, UnknownName};
