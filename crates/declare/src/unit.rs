//! Unit computations.
//!
//! A unit computation is the per-element body of an operation, independent of
//! iteration strategy. It references operand slots by symbolic name and names
//! types through [`TypeToken`]s, which the synthesizer binds to concrete
//! element types for each specialized routine.
//!
//! Three shapes exist, one per family of result policy:
//!
//! - [`UnitComputation::Statements`] - elementwise and growable operations
//! - [`UnitComputation::Fold`] - reductions (`acc = step(acc, element)`)
//! - [`UnitComputation::Match`] - membership tests between two elements
//!
//! # Example
//!
//! ```
//! use opforge_declare::unit::{Expr, Stmt, UnitComputation};
//!
//! // res = (op1 < op2) ? op1 : op2
//! let body = UnitComputation::Statements(vec![Stmt::store(
//!     "res",
//!     Expr::select(
//!         Expr::lt(Expr::slot("op1"), Expr::slot("op2")),
//!         Expr::slot("op1"),
//!         Expr::slot("op2"),
//!     ),
//! )]);
//! assert_eq!(body.referenced_slots(), vec!["op1", "op2", "res"]);
//! ```

use opforge_foundation::ElementType;
use serde::{Deserialize, Serialize};

/// A type named inside a unit computation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeToken {
    /// The concrete type bound to a slot
    Of(String),
    /// The signed counterpart of a slot's type
    SignedOf(String),
    /// The component type of a slot's type (float width for complex)
    ComponentOf(String),
    /// A type that never varies
    Fixed(ElementType),
}

impl TypeToken {
    /// Slot named by this token, if any.
    pub fn slot(&self) -> Option<&str> {
        match self {
            Self::Of(s) | Self::SignedOf(s) | Self::ComponentOf(s) => Some(s),
            Self::Fixed(_) => None,
        }
    }
}

/// Untyped literal; its type comes from context at substitution.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    Int(i64),
    Float(f64),
    Bool(bool),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    And,
    Or,
}

impl BinaryOp {
    /// Produces a truth value rather than an operand-typed value.
    pub const fn is_comparison(self) -> bool {
        matches!(
            self,
            Self::Lt | Self::Le | Self::Gt | Self::Ge | Self::Eq | Self::Ne
        )
    }

    /// Needs a total order on its operands.
    pub const fn is_ordering(self) -> bool {
        matches!(self, Self::Lt | Self::Le | Self::Gt | Self::Ge)
    }

    pub const fn is_logical(self) -> bool {
        matches!(self, Self::And | Self::Or)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOp {
    Neg,
    Not,
}

/// Type-parameterized intrinsic functions.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Intrinsic {
    Sqrt,
    Abs,
}

impl Intrinsic {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Sqrt => "sqrt",
            Self::Abs => "abs",
        }
    }
}

/// Unit-computation expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    /// Current element of a slot
    Slot(String),
    /// One component of the current element of a slot
    Component(String, u8),
    /// A local introduced by [`Stmt::Let`]
    Local(String),
    /// The reduction accumulator (only inside [`UnitComputation::Fold`])
    Acc,
    Literal(Literal),
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Call {
        intrinsic: Intrinsic,
        ty: TypeToken,
        args: Vec<Expr>,
    },
    Select {
        cond: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
    Cast {
        ty: TypeToken,
        value: Box<Expr>,
    },
}

impl Expr {
    pub fn slot(name: impl Into<String>) -> Self {
        Self::Slot(name.into())
    }

    pub fn component(name: impl Into<String>, index: u8) -> Self {
        Self::Component(name.into(), index)
    }

    pub fn local(name: impl Into<String>) -> Self {
        Self::Local(name.into())
    }

    pub fn int(value: i64) -> Self {
        Self::Literal(Literal::Int(value))
    }

    pub fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Self {
        Self::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    pub fn add(lhs: Expr, rhs: Expr) -> Self {
        Self::binary(BinaryOp::Add, lhs, rhs)
    }

    pub fn sub(lhs: Expr, rhs: Expr) -> Self {
        Self::binary(BinaryOp::Sub, lhs, rhs)
    }

    pub fn mul(lhs: Expr, rhs: Expr) -> Self {
        Self::binary(BinaryOp::Mul, lhs, rhs)
    }

    pub fn div(lhs: Expr, rhs: Expr) -> Self {
        Self::binary(BinaryOp::Div, lhs, rhs)
    }

    pub fn lt(lhs: Expr, rhs: Expr) -> Self {
        Self::binary(BinaryOp::Lt, lhs, rhs)
    }

    pub fn eq(lhs: Expr, rhs: Expr) -> Self {
        Self::binary(BinaryOp::Eq, lhs, rhs)
    }

    pub fn not(operand: Expr) -> Self {
        Self::Unary {
            op: UnaryOp::Not,
            operand: Box::new(operand),
        }
    }

    pub fn call(intrinsic: Intrinsic, ty: TypeToken, args: Vec<Expr>) -> Self {
        Self::Call {
            intrinsic,
            ty,
            args,
        }
    }

    pub fn select(cond: Expr, then: Expr, otherwise: Expr) -> Self {
        Self::Select {
            cond: Box::new(cond),
            then: Box::new(then),
            otherwise: Box::new(otherwise),
        }
    }

    fn collect_slots<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Self::Slot(s) | Self::Component(s, _) => out.push(s),
            Self::Local(_) | Self::Acc | Self::Literal(_) => {}
            Self::Binary { lhs, rhs, .. } => {
                lhs.collect_slots(out);
                rhs.collect_slots(out);
            }
            Self::Unary { operand, .. } => operand.collect_slots(out),
            Self::Call { ty, args, .. } => {
                out.extend(ty.slot());
                for arg in args {
                    arg.collect_slots(out);
                }
            }
            Self::Select {
                cond,
                then,
                otherwise,
            } => {
                cond.collect_slots(out);
                then.collect_slots(out);
                otherwise.collect_slots(out);
            }
            Self::Cast { ty, value } => {
                out.extend(ty.slot());
                value.collect_slots(out);
            }
        }
    }
}

/// Unit-computation statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Stmt {
    /// Introduce a typed local
    Let {
        name: String,
        ty: TypeToken,
        value: Expr,
    },
    /// Write the current element of an output slot
    Store { slot: String, value: Expr },
    /// Write one component of the current element of an output slot
    StoreComponent {
        slot: String,
        index: u8,
        value: Expr,
    },
    /// Downgrade a predicate slot to false when `when` holds.
    ///
    /// No statement sets a predicate back to true.
    Fail { slot: String, when: Expr },
}

impl Stmt {
    pub fn let_(name: impl Into<String>, ty: TypeToken, value: Expr) -> Self {
        Self::Let {
            name: name.into(),
            ty,
            value,
        }
    }

    pub fn store(slot: impl Into<String>, value: Expr) -> Self {
        Self::Store {
            slot: slot.into(),
            value,
        }
    }

    pub fn store_component(slot: impl Into<String>, index: u8, value: Expr) -> Self {
        Self::StoreComponent {
            slot: slot.into(),
            index,
            value,
        }
    }

    pub fn fail(slot: impl Into<String>, when: Expr) -> Self {
        Self::Fail {
            slot: slot.into(),
            when,
        }
    }

    fn collect_slots<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Self::Let { ty, value, .. } => {
                out.extend(ty.slot());
                value.collect_slots(out);
            }
            Self::Store { slot, value } | Self::StoreComponent { slot, value, .. } => {
                value.collect_slots(out);
                out.push(slot);
            }
            Self::Fail { slot, when } => {
                when.collect_slots(out);
                out.push(slot);
            }
        }
    }
}

/// The per-element body of an operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum UnitComputation {
    /// Straight-line statements run once per element
    Statements(Vec<Stmt>),
    /// `acc = init; for each element: acc = step`
    Fold { init: Literal, step: Expr },
    /// Truth value comparing one primary element against one secondary element
    Match(Expr),
}

impl UnitComputation {
    /// Short name of the shape, used in diagnostics.
    pub const fn shape(&self) -> &'static str {
        match self {
            Self::Statements(_) => "statements",
            Self::Fold { .. } => "fold",
            Self::Match(_) => "match",
        }
    }

    /// Every slot name referenced, deduplicated, in first-use order.
    pub fn referenced_slots(&self) -> Vec<&str> {
        let mut out = Vec::new();
        match self {
            Self::Statements(stmts) => {
                for stmt in stmts {
                    stmt.collect_slots(&mut out);
                }
            }
            Self::Fold { step, .. } => step.collect_slots(&mut out),
            Self::Match(expr) => expr.collect_slots(&mut out),
        }
        let mut seen = Vec::with_capacity(out.len());
        for name in out {
            if !seen.contains(&name) {
                seen.push(name);
            }
        }
        seen
    }
}
