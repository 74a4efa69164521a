//! Structured routine IR.
//!
//! Synthesis produces this representation instead of source text so the
//! scaffolding (iteration, membership scans, growth, predicate fusion) can be
//! inspected and executed directly. Every expression node carries its
//! concrete element type; no type token survives synthesis.
//!
//! # Shape Overview
//!
//! | Result policy | Body |
//! |---------------|------|
//! | elementwise | `Loop { cursors, unit }` |
//! | reduction | `Let acc = init; Loop { Set acc = step }; Store res = acc` |
//! | growable | `Grow; Loop { append at old length }; AdvanceLength` |
//! | membership | `If stride == 1 { Scan(elementwise) } else { Scan(block) }` |

use opforge_declare::{BinaryOp, Intrinsic, Literal, UnaryOp};
use opforge_expand::RoutineKey;
use opforge_foundation::{AddressMode, CombineOp, ElementType, Mutability, SlotId};
use serde::{Deserialize, Serialize};

/// Type of truth values produced by comparisons and read from predicates.
pub const TRUTH: ElementType = ElementType::S32;

/// Local name holding a reduction accumulator.
pub const ACCUMULATOR: &str = "acc";

/// A synthesized, fully bound routine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Routine {
    pub name: String,
    pub key: RoutineKey,
    /// Surfaced operands in fixed slot order; the predicate (if any) is last
    pub params: Vec<Param>,
    pub body: Vec<Stmt>,
    /// Present on range-splitting entry points
    pub parallel: Option<ParallelPlan>,
    pub cost: Cost,
}

impl Routine {
    pub fn param(&self, slot: SlotId) -> Option<&Param> {
        self.params.get(slot.position())
    }

    pub fn param_named(&self, name: &str) -> Option<&Param> {
        self.params.iter().find(|p| p.name == name)
    }

    /// Visit every statement, depth first.
    pub fn walk(&self, visit: &mut impl FnMut(&Stmt)) {
        fn go(stmts: &[Stmt], visit: &mut impl FnMut(&Stmt)) {
            for stmt in stmts {
                visit(stmt);
                match stmt {
                    Stmt::Loop(lp) => go(&lp.body, visit),
                    Stmt::If {
                        then, otherwise, ..
                    } => {
                        go(then, visit);
                        go(otherwise, visit);
                    }
                    _ => {}
                }
            }
        }
        go(&self.body, visit);
    }
}

/// One operand at the routine boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Param {
    pub slot: SlotId,
    pub name: String,
    pub ty: ElementType,
    pub mode: AddressMode,
    pub mutability: Mutability,
    /// Element count; always `Literal(1)` for scalars and constants
    pub size: Size,
    pub error_flag: bool,
}

/// Resolved element count.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Size {
    Literal(u32),
    CountOf(SlotId),
}

/// Advisory cost metadata. Never affects routine shape.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cost {
    pub slow: bool,
}

/// How a parallel entry point partitions work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParallelPlan {
    /// Slot whose index range is split into disjoint contiguous slices
    pub split: SlotId,
    /// Slices are aligned to this many elements
    pub stride: Step,
    /// Merges partial accumulators of a reduction, in slice order
    pub combine: Option<CombineOp>,
    /// Output length is data dependent; worker outputs are concatenated in
    /// slice order
    pub ordered: bool,
}

/// Structured statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Stmt {
    Let {
        local: String,
        ty: ElementType,
        value: TExpr,
    },
    Set {
        local: String,
        value: TExpr,
    },
    /// Write the current element (or one component) of a written slot
    Store {
        slot: SlotId,
        component: Option<u8>,
        value: TExpr,
    },
    /// Set a predicate slot to false when `when` holds; never sets it true
    ClearFlag {
        slot: SlotId,
        when: TExpr,
    },
    Loop(Loop),
    If {
        cond: TExpr,
        then: Vec<Stmt>,
        otherwise: Vec<Stmt>,
    },
    Scan(Scan),
    /// Request capacity for `length(result) + incoming` elements
    Grow {
        result: SlotId,
        storage: SlotId,
        incoming: Size,
    },
    /// Add `by` to the stored length of a resizable slot
    AdvanceLength {
        result: SlotId,
        by: Size,
    },
}

/// Counted walk over element cursors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Loop {
    pub bound: Bound,
    pub cursors: Vec<Cursor>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Bound {
    /// Single pass; every operand is scalar
    Once,
    Count(Size),
}

/// A walked pointer over one array or resizable slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cursor {
    pub slot: SlotId,
    pub origin: Origin,
    /// Restart at the first element when the slot is shorter than the bound
    pub wrap: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Origin {
    /// Element zero
    Start,
    /// The stored length of a resizable slot, read before the loop
    Length(SlotId),
}

/// Nested membership walk.
///
/// The outer walk covers `primary` and the inner walk covers `secondary`.
/// Every primary element (or block) with a match in `secondary` is appended
/// to `output`, preserving primary order and multiplicity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scan {
    pub primary: SlotId,
    pub secondary: SlotId,
    pub output: SlotId,
    pub stride: Step,
    pub test: MatchTest,
}

/// Element step of a walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Step {
    Unit,
    /// Data-dependent stride read from a scalar slot at runtime
    Slot(SlotId),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MatchTest {
    /// Truth expression over the current primary and secondary elements
    Elementwise(TExpr),
    /// Block comparator of the given signed type returns zero
    Block { comparator: ElementType },
}

/// Typed expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TExpr {
    Load {
        slot: SlotId,
        component: Option<u8>,
        ty: ElementType,
    },
    Local {
        name: String,
        ty: ElementType,
    },
    Const {
        value: Literal,
        ty: ElementType,
    },
    Binary {
        op: BinaryOp,
        /// Type both operands are evaluated at
        operand_ty: ElementType,
        ty: ElementType,
        lhs: Box<TExpr>,
        rhs: Box<TExpr>,
    },
    Unary {
        op: UnaryOp,
        ty: ElementType,
        operand: Box<TExpr>,
    },
    Call {
        intrinsic: Intrinsic,
        ty: ElementType,
        args: Vec<TExpr>,
    },
    Select {
        ty: ElementType,
        cond: Box<TExpr>,
        then: Box<TExpr>,
        otherwise: Box<TExpr>,
    },
    Cast {
        ty: ElementType,
        value: Box<TExpr>,
    },
}

impl TExpr {
    pub fn ty(&self) -> ElementType {
        match self {
            Self::Load { ty, .. }
            | Self::Local { ty, .. }
            | Self::Const { ty, .. }
            | Self::Binary { ty, .. }
            | Self::Unary { ty, .. }
            | Self::Call { ty, .. }
            | Self::Select { ty, .. }
            | Self::Cast { ty, .. } => *ty,
        }
    }

    pub fn load(slot: SlotId, ty: ElementType) -> Self {
        Self::Load {
            slot,
            component: None,
            ty,
        }
    }
}
