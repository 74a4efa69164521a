//! Evaluator errors.
//!
//! A routine's own runtime failures (an index out of bounds, say) are
//! reported only through its predicate operand. The errors here cover
//! misuse of the evaluator: operands that do not match the routine
//! signature, integer division by zero, reads past the end of a lockstep
//! operand, or a missing capacity-growth primitive.
//!
//! # Error Categories
//!
//! - **Signature errors**: [`ExecError::OperandCount`], [`ExecError::OperandShape`]
//! - **Access errors**: [`ExecError::OutOfRange`], [`ExecError::NoCursor`]
//! - **Arithmetic errors**: [`ExecError::DivisionByZero`], [`ExecError::InvalidStride`]
//! - **Primitive errors**: [`ExecError::MissingGrowth`], [`ExecError::GrowthShortfall`],
//!   [`ExecError::UnsupportedComparator`], [`ExecError::BlockLength`]

use opforge_foundation::{AddressMode, ElementType};
use thiserror::Error;

/// Evaluator result type alias.
pub type Result<T> = std::result::Result<T, ExecError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExecError {
    #[error("routine `{routine}` takes {expected} operands, got {found}")]
    OperandCount {
        routine: String,
        expected: usize,
        found: usize,
    },

    /// An operand's addressing differs from the routine parameter.
    #[error("operand `{slot}` must be {expected}, got {found}")]
    OperandShape {
        slot: String,
        expected: AddressMode,
        found: AddressMode,
    },

    /// A non-wrapping cursor walked past the end of its operand.
    #[error("operand `{slot}` has {len} elements, index {index} requested")]
    OutOfRange {
        slot: String,
        index: usize,
        len: usize,
    },

    /// An array operand was read outside any walk over it.
    #[error("operand `{slot}` is an array but no cursor is active")]
    NoCursor { slot: String },

    #[error("integer division by zero in {ty}")]
    DivisionByZero { ty: ElementType },

    #[error("membership stride must be positive, got {0}")]
    InvalidStride(u64),

    #[error("routine `{0}` grows its result but no capacity-growth primitive was supplied")]
    MissingGrowth(String),

    /// The capacity-growth primitive returned less room than requested.
    #[error("capacity growth for `{slot}` asked for {desired} elements, got {capacity}")]
    GrowthShortfall {
        slot: String,
        desired: usize,
        capacity: usize,
    },

    #[error("no block comparator is keyed by {0}")]
    UnsupportedComparator(ElementType),

    #[error("block comparator needs equal-length blocks, got {0} and {1}")]
    BlockLength(usize, usize),

    #[error("routine `{0}` has no parallel entry point")]
    NotParallel(String),

    #[error("unknown local `{0}`")]
    UnknownLocal(String),
}
