//! Bounds-checked index arithmetic.

use linkme::distributed_slice;
use opforge_declare::{Expr, OperandDecl, OperationDecl, Stmt, UnitComputation};
use opforge_foundation::{Capability, ElementType, Result};

use crate::registry::{OPERATIONS, OperationEntry};

/// `res = op1 + op3`, clearing the predicate unless `op1 < op2`.
///
/// The offset index and the bounds verdict come out of one invocation.
pub fn declare_bound_check_less_than_predicate_add() -> Result<OperationDecl> {
    let mut builder = OperationDecl::builder("bound_check_less_than_predicate_add").capabilities([
        Capability::ScalarAddressMode,
        Capability::TernaryOperator,
        Capability::MayEmitError,
    ]);
    for slot in ["op1", "op2", "op3", "res"] {
        builder = builder.operand(OperandDecl::new(slot).fixed(ElementType::U32));
    }
    builder
        .unit(UnitComputation::Statements(vec![
            Stmt::store("res", Expr::add(Expr::slot("op1"), Expr::slot("op3"))),
            Stmt::fail(
                "pred",
                Expr::not(Expr::lt(Expr::slot("op1"), Expr::slot("op2"))),
            ),
        ]))
        .build()
}

#[distributed_slice(OPERATIONS)]
static BOUND_CHECK_LESS_THAN_PREDICATE_ADD: OperationEntry = OperationEntry {
    name: "bound_check_less_than_predicate_add",
    category: "bounds",
    doc: "Offset an index and flag it when it exceeds the dimension",
    declare: declare_bound_check_less_than_predicate_add,
};

#[cfg(test)]
mod tests {
    use super::*;
    use opforge_synth::{Stmt as IrStmt, build};

    #[test]
    fn test_single_fused_routine() {
        let set = build(&declare_bound_check_less_than_predicate_add().unwrap()).unwrap();
        assert_eq!(set.len(), 1);
        let routine = set
            .get("bound_check_less_than_predicate_add_SCA_SCA_SCA_SCA_SCA")
            .unwrap();
        assert!(routine.params.last().unwrap().error_flag);

        let mut stores = 0;
        let mut clears = 0;
        routine.walk(&mut |stmt| match stmt {
            IrStmt::Store { .. } => stores += 1,
            IrStmt::ClearFlag { .. } => clears += 1,
            _ => {}
        });
        assert_eq!((stores, clears), (1, 1));
    }
}
