//! Elementwise arithmetic.

use linkme::distributed_slice;
use opforge_declare::{Expr, Intrinsic, OperationDecl, Stmt, TypeToken, UnitComputation};
use opforge_foundation::{Capability, Result};

use crate::registry::{OPERATIONS, OperationEntry};

/// `res = op1 < op2 ? op1 : op2`
pub fn declare_min() -> Result<OperationDecl> {
    OperationDecl::builder("min")
        .capabilities([
            Capability::MultipleAddressMode,
            Capability::BinaryOperator,
            Capability::Multithreaded,
        ])
        .unit(UnitComputation::Statements(vec![Stmt::store(
            "res",
            Expr::select(
                Expr::lt(Expr::slot("op1"), Expr::slot("op2")),
                Expr::slot("op1"),
                Expr::slot("op2"),
            ),
        )]))
        .build()
}

pub fn declare_sqrt() -> Result<OperationDecl> {
    OperationDecl::builder("sqrt")
        .capabilities([
            Capability::MultipleAddressMode,
            Capability::UnaryOperator,
            Capability::FloatingPointOnly,
            Capability::Multithreaded,
        ])
        .unit(UnitComputation::Statements(vec![Stmt::store(
            "res",
            Expr::call(
                Intrinsic::Sqrt,
                TypeToken::Of("op1".into()),
                vec![Expr::slot("op1")],
            ),
        )]))
        .build()
}

#[distributed_slice(OPERATIONS)]
static MIN: OperationEntry = OperationEntry {
    name: "min",
    category: "math",
    doc: "Elementwise minimum of two operands",
    declare: declare_min,
};

#[distributed_slice(OPERATIONS)]
static SQRT: OperationEntry = OperationEntry {
    name: "sqrt",
    category: "math",
    doc: "Elementwise square root over floating-point types",
    declare: declare_sqrt,
};
