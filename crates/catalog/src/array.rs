//! Whole-array operations: reductions and membership.

use linkme::distributed_slice;
use opforge_declare::{Expr, Literal, OperandDecl, OperationDecl, UnitComputation};
use opforge_foundation::{AddressMode, Capability, ElementType, Result};

use crate::registry::{OPERATIONS, OperationEntry};

/// Sum of every element of `op1`, accumulated left to right at the element
/// width.
pub fn declare_array_sum() -> Result<OperationDecl> {
    OperationDecl::builder("array_sum")
        .capabilities([
            Capability::MultipleAddressMode,
            Capability::UnaryOperator,
            Capability::UnitResult,
        ])
        .unit(UnitComputation::Fold {
            init: Literal::Int(0),
            step: Expr::add(Expr::Acc, Expr::slot("op1")),
        })
        .build()
}

/// Elements (or `op3`-wide blocks) of `op1` that also occur in `op2`.
pub fn declare_array_intersect() -> Result<OperationDecl> {
    OperationDecl::builder("array_intersect")
        .capabilities([
            Capability::ArrayAddressMode,
            Capability::TernaryOperator,
            Capability::ArrayComparison,
        ])
        .operand(
            OperandDecl::new("op3")
                .fixed(ElementType::U32)
                .mode(AddressMode::Scalar),
        )
        .unit(UnitComputation::Match(Expr::eq(
            Expr::slot("op1"),
            Expr::slot("op2"),
        )))
        .build()
}

#[distributed_slice(OPERATIONS)]
static ARRAY_SUM: OperationEntry = OperationEntry {
    name: "array_sum",
    category: "array",
    doc: "Sum of all elements",
    declare: declare_array_sum,
};

#[distributed_slice(OPERATIONS)]
static ARRAY_INTERSECT: OperationEntry = OperationEntry {
    name: "array_intersect",
    category: "array",
    doc: "Elements or blocks of the first array present in the second",
    declare: declare_array_intersect,
};
