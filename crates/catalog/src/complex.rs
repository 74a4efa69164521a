//! Complex arithmetic.

use linkme::distributed_slice;
use opforge_declare::{Expr, OperandDecl, OperationDecl, Stmt, TypeToken, UnitComputation};
use opforge_foundation::{Capability, Result, TypeSet};

use crate::registry::{OPERATIONS, OperationEntry};

/// `res = op1 / op2` over complex numbers, computed per component:
///
/// ```text
/// re = (a*c + b*d) / (c*c + d*d)
/// im = (b*c - a*d) / (c*c + d*d)
/// ```
pub fn declare_complex_divide() -> Result<OperationDecl> {
    let part = |slot: &str| TypeToken::ComponentOf(slot.to_string());
    let (a, b) = (Expr::component("op1", 0), Expr::component("op1", 1));
    let (c, d) = (Expr::component("op2", 0), Expr::component("op2", 1));

    let mut builder = OperationDecl::builder("complex_divide").capabilities([
        Capability::ArrayAddressMode,
        Capability::BinaryOperator,
        Capability::FloatingPointOnly,
        Capability::FixedOperandSize,
        Capability::Slow,
        Capability::Multithreaded,
    ]);
    for slot in ["op1", "op2", "res"] {
        builder = builder.operand(OperandDecl::new(slot).generic(TypeSet::COMPLEX));
    }
    builder
        .unit(UnitComputation::Statements(vec![
            Stmt::let_(
                "denom",
                part("res"),
                Expr::add(Expr::mul(c.clone(), c.clone()), Expr::mul(d.clone(), d.clone())),
            ),
            Stmt::store_component(
                "res",
                0,
                Expr::div(
                    Expr::add(Expr::mul(a.clone(), c.clone()), Expr::mul(b.clone(), d.clone())),
                    Expr::local("denom"),
                ),
            ),
            Stmt::store_component(
                "res",
                1,
                Expr::div(
                    Expr::sub(Expr::mul(b, c), Expr::mul(a, d)),
                    Expr::local("denom"),
                ),
            ),
        ]))
        .build()
}

#[distributed_slice(OPERATIONS)]
static COMPLEX_DIVIDE: OperationEntry = OperationEntry {
    name: "complex_divide",
    category: "complex",
    doc: "Elementwise complex division",
    declare: declare_complex_divide,
};

#[cfg(test)]
mod tests {
    use super::*;
    use opforge_synth::build;

    #[test]
    fn test_complex_divide_routines() {
        let decl = declare_complex_divide().unwrap();
        assert_eq!(decl.resolved().type_domain, TypeSet::COMPLEX);
        let set = build(&decl).unwrap();
        let names: Vec<_> = set.names().collect();
        assert_eq!(
            names,
            vec![
                "complex_divide_C64_ARR_ARR_ARR",
                "complex_divide_C64_ARR_ARR_ARR_mt",
                "complex_divide_C128_ARR_ARR_ARR",
                "complex_divide_C128_ARR_ARR_ARR_mt",
            ]
        );
        assert!(set.iter().all(|r| r.cost.slow));
    }
}
