//! Byte-string operations.

use linkme::distributed_slice;
use opforge_declare::{Expr, OperandDecl, OperationDecl, Stmt, UnitComputation};
use opforge_foundation::{AddressMode, Capability, ElementType, Result};

use crate::registry::{OPERATIONS, OperationEntry};

/// Append `op1` to the resizable byte string `res`.
///
/// `op2` is the storage handle forwarded to the capacity-growth primitive.
pub fn declare_concat_string() -> Result<OperationDecl> {
    OperationDecl::builder("concat_string")
        .capabilities([
            Capability::MultipleAddressMode,
            Capability::BinaryOperator,
            Capability::ResizeResult,
        ])
        .operand(OperandDecl::new("op1").fixed(ElementType::U08))
        .operand(
            OperandDecl::new("op2")
                .fixed(ElementType::U32)
                .mode(AddressMode::Constant),
        )
        .operand(OperandDecl::new("res").fixed(ElementType::U08))
        .unit(UnitComputation::Statements(vec![Stmt::store(
            "res",
            Expr::slot("op1"),
        )]))
        .build()
}

#[distributed_slice(OPERATIONS)]
static CONCAT_STRING: OperationEntry = OperationEntry {
    name: "concat_string",
    category: "string",
    doc: "Append bytes to a growable string",
    declare: declare_concat_string,
};

#[cfg(test)]
mod tests {
    use super::*;
    use opforge_synth::{Size, Stmt, build};
    use opforge_foundation::SlotId;

    #[test]
    fn test_concat_routines() {
        let set = build(&declare_concat_string().unwrap()).unwrap();
        let names: Vec<_> = set.names().collect();
        assert_eq!(names, vec!["concat_string_SCA_CON_DYN", "concat_string_ARR_CON_DYN"]);

        let scalar = set.get("concat_string_SCA_CON_DYN").unwrap();
        assert_eq!(
            scalar.body[0],
            Stmt::Grow {
                result: SlotId(3),
                storage: SlotId(2),
                incoming: Size::Literal(1),
            }
        );
    }
}
