//! End-to-end properties of the declare → expand → synthesize → execute
//! pipeline, checked against the standard catalog.

use opforge_declare::{Expr, Literal, OperandDecl, OperationDecl, Stmt, UnitComputation};
use opforge_exec::{Operand, ParallelConfig, RecordingGrowth, Resizable, Value};
use opforge_foundation::{BuildError, Capability, CombineOp, ElementType, TypeSet};
use opforge_tests::{Harness, array, float_array, sample_operands, scalar, values};

fn slices() -> ParallelConfig {
    ParallelConfig {
        workers: 3,
        min_slice: 1,
    }
}

fn parallel_sum() -> OperationDecl {
    OperationDecl::builder("psum")
        .capabilities([
            Capability::ArrayAddressMode,
            Capability::UnaryOperator,
            Capability::UnitResult,
            Capability::Multithreaded,
            Capability::Combine(CombineOp::Add),
        ])
        .unit(UnitComputation::Fold {
            init: Literal::Int(0),
            step: Expr::add(Expr::Acc, Expr::slot("op1")),
        })
        .build()
        .unwrap()
}

fn parallel_intersect() -> OperationDecl {
    OperationDecl::builder("isect")
        .capabilities([
            Capability::ArrayAddressMode,
            Capability::TernaryOperator,
            Capability::ArrayComparison,
            Capability::Multithreaded,
        ])
        .operand(OperandDecl::new("op1").fixed(ElementType::S32))
        .operand(OperandDecl::new("op2").fixed(ElementType::S32))
        .operand(OperandDecl::new("res").fixed(ElementType::S32))
        .unit(UnitComputation::Match(Expr::eq(
            Expr::slot("op1"),
            Expr::slot("op2"),
        )))
        .build()
        .unwrap()
}

fn parallel_bound_check() -> OperationDecl {
    let mut builder = OperationDecl::builder("bchk").capabilities([
        Capability::ArrayAddressMode,
        Capability::TernaryOperator,
        Capability::MayEmitError,
        Capability::Multithreaded,
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
        .unwrap()
}

// === Composition ===

/// Same declaration → identical defaults and identical routine sets.
#[test]
fn test_composition_is_deterministic() {
    let first = opforge_catalog::declare("min").unwrap().unwrap();
    let second = opforge_catalog::declare("min").unwrap().unwrap();
    assert_eq!(first.resolved(), second.resolved());

    let a = opforge_synth::build(&first).unwrap();
    let b = opforge_synth::build(&second).unwrap();
    assert_eq!(a.names().collect::<Vec<_>>(), b.names().collect::<Vec<_>>());
    assert_eq!(a.routines, b.routines);
}

#[test]
fn test_float_only_conflict_names_slot() {
    let err = OperationDecl::builder("bad_hypot")
        .capabilities([Capability::BinaryOperator, Capability::FloatingPointOnly])
        .operand(OperandDecl::new("op2").fixed(ElementType::U32))
        .unit(UnitComputation::Statements(vec![]))
        .build()
        .unwrap_err();
    assert!(matches!(err, BuildError::CapabilityConflict { .. }));
    assert_eq!(err.operation(), "bad_hypot");
    assert_eq!(err.slot(), "op2");
}

// === Expansion ===

#[test]
fn test_restricted_domain_routine_count() {
    let domain: TypeSet = [ElementType::U32, ElementType::F32].into_iter().collect();
    let decl = OperationDecl::builder("copy")
        .capabilities([Capability::MultipleAddressMode, Capability::UnaryOperator])
        .operand(OperandDecl::new("op1").generic(domain))
        .unit(UnitComputation::Statements(vec![Stmt::store(
            "res",
            Expr::slot("op1"),
        )]))
        .build()
        .unwrap();
    let harness = Harness::from_decl(&decl);
    assert_eq!(harness.set().len(), 8);
    for ty in ["U32", "F32"] {
        for modes in ["SCA_SCA", "SCA_ARR", "ARR_SCA", "ARR_ARR"] {
            let name = format!("copy_{ty}_{modes}");
            assert!(harness.set().get(&name).is_some(), "missing {name}");
        }
    }
}

#[test]
fn test_catalog_names_are_unique() {
    let report = opforge_catalog::build_all();
    assert!(report.is_clean(), "{:?}", report.failed);

    let mut names: Vec<&str> = report
        .built
        .values()
        .flat_map(|set| set.names())
        .collect();
    let total = names.len();
    names.sort_unstable();
    names.dedup();
    assert_eq!(names.len(), total);
    assert_eq!(total, report.routine_count());
}

// === Execution ===

#[test]
fn test_intersection_keeps_primary_multiplicity() {
    let harness = Harness::for_operation("array_intersect");
    let out = harness.run(
        "array_intersect_S32_ARR_ARR_SCA_ARR",
        vec![
            array(ElementType::S32, &[1, 2, 2, 3]),
            array(ElementType::S32, &[2, 3, 3]),
            scalar(ElementType::U32, 1),
            Operand::Array(Vec::new()),
        ],
    );
    assert_eq!(out[3], array(ElementType::S32, &[2, 2, 3]));
}

#[test]
fn test_intersection_by_blocks() {
    let harness = Harness::for_operation("array_intersect");
    let out = harness.run(
        "array_intersect_S32_ARR_ARR_SCA_ARR",
        vec![
            array(ElementType::S32, &[1, 2, 3, 4, 5, 6]),
            array(ElementType::S32, &[5, 6, 1, 2]),
            scalar(ElementType::U32, 2),
            Operand::Array(Vec::new()),
        ],
    );
    assert_eq!(out[3], array(ElementType::S32, &[1, 2, 5, 6]));
}

#[test]
fn test_growth_accumulates_length() {
    let harness = Harness::for_operation("concat_string");
    let name = "concat_string_ARR_CON_DYN";
    let mut growth = RecordingGrowth::new();
    let mut operands = vec![
        array(ElementType::U08, &[1, 2, 3]),
        Operand::Constant(Value::UInt(3)),
        Operand::Resizable(Resizable::new()),
    ];

    harness.run_with_growth(name, &mut operands, &mut growth);
    operands[0] = array(ElementType::U08, &[4, 5, 6, 7]);
    harness.run_with_growth(name, &mut operands, &mut growth);

    assert_eq!(growth.desired_sizes(), vec![3, 7]);
    let Operand::Resizable(result) = &operands[2] else {
        panic!("result is not resizable");
    };
    assert_eq!(result.length, 7);
    assert_eq!(
        result.values(),
        values(ElementType::U08, &[1, 2, 3, 4, 5, 6, 7]).as_slice()
    );
}

#[test]
fn test_bounds_check_fuses_offset_and_verdict() {
    let harness = Harness::for_operation("bound_check_less_than_predicate_add");
    let name = "bound_check_less_than_predicate_add_SCA_SCA_SCA_SCA_SCA";
    let operands = |index, dim, offset| {
        vec![
            scalar(ElementType::U32, index),
            scalar(ElementType::U32, dim),
            scalar(ElementType::U32, offset),
            scalar(ElementType::U32, 0),
            Operand::Scalar(Value::TRUE),
        ]
    };

    let out = harness.run(name, operands(5, 3, 10));
    assert_eq!(out[3], scalar(ElementType::U32, 15));
    assert!(!out[4].scalar().unwrap().is_truthy());

    let out = harness.run(name, operands(2, 3, 10));
    assert_eq!(out[3], scalar(ElementType::U32, 12));
    assert!(out[4].scalar().unwrap().is_truthy());
}

#[test]
fn test_reduction_is_left_to_right_at_element_width() {
    let harness = Harness::for_operation("array_sum");
    let out = harness.run(
        "array_sum_F32_ARR_SCA",
        vec![
            float_array(ElementType::F32, &[1e8, 1.0, -1e8, 1.0]),
            Operand::Scalar(Value::Float(0.0)),
        ],
    );
    assert_eq!(out[1], Operand::Scalar(Value::Float(1.0)));
}

// === Parallel entry points ===

/// Every parallel routine in the catalog matches its serial counterpart
/// exactly.
#[test]
fn test_parallel_matches_serial() {
    let mut checked = 0;
    for operation in opforge_catalog::all_names() {
        let harness = Harness::for_operation(operation);
        let parallel: Vec<_> = harness.set().parallel().map(|r| r.name.clone()).collect();
        checked += parallel.len();

        for name in parallel {
            let serial = name.trim_end_matches("_mt");
            let operands = sample_operands(harness.routine(&name), 37);
            let expected = harness.run(serial, operands.clone());
            let actual = harness.run_parallel(&name, operands, &slices());
            assert_eq!(actual, expected, "{name} diverges from {serial}");
        }
    }
    assert!(checked > 0);
}

#[test]
fn test_parallel_reduction_combines_partials() {
    let harness = Harness::from_decl(&parallel_sum());
    let input: Vec<i64> = (1..=100).collect();
    let operands = vec![array(ElementType::S32, &input), scalar(ElementType::S32, 0)];

    let serial = harness.run("psum_S32_ARR_SCA", operands.clone());
    let parallel = harness.run_parallel("psum_S32_ARR_SCA_mt", operands, &slices());
    assert_eq!(serial[1], scalar(ElementType::S32, 5050));
    assert_eq!(parallel[1], serial[1]);

    let floats: Vec<f64> = (0..50).map(|i| i as f64 * 0.25).collect();
    let operands = vec![
        float_array(ElementType::F64, &floats),
        Operand::Scalar(Value::Float(0.0)),
    ];
    let serial = harness.run("psum_F64_ARR_SCA", operands.clone());
    let parallel = harness.run_parallel("psum_F64_ARR_SCA_mt", operands, &slices());
    let (s, p) = (serial[1].scalar().unwrap(), parallel[1].scalar().unwrap());
    assert!((s.as_f64() - p.as_f64()).abs() < 1e-9);
}

/// Membership slices are concatenated in primary order, for unit and block
/// strides alike.
#[test]
fn test_parallel_intersection_concatenates_slices() {
    let harness = Harness::from_decl(&parallel_intersect());
    let primary = [1, 2, 2, 3, 5, 2, 9, 9, 3, 4];
    let cases: [(i64, &[i64], &[i64]); 2] = [
        (1, &[2, 3, 9], &[2, 2, 3, 2, 9, 9, 3]),
        (2, &[2, 3, 9, 9], &[2, 3, 9, 9]),
    ];

    for (stride, secondary, expected) in cases {
        let operands = vec![
            array(ElementType::S32, &primary),
            array(ElementType::S32, secondary),
            scalar(ElementType::U32, stride),
            Operand::Array(Vec::new()),
        ];
        let serial = harness.run("isect_ARR_ARR_SCA_ARR", operands.clone());
        let parallel = harness.run_parallel("isect_ARR_ARR_SCA_ARR_mt", operands, &slices());
        assert_eq!(serial[3], array(ElementType::S32, expected), "stride {stride}");
        assert_eq!(parallel, serial, "stride {stride}");
    }
}

/// A predicate cleared by a single slice is cleared after the merge.
#[test]
fn test_parallel_predicate_cleared_by_one_slice() {
    let harness = Harness::from_decl(&parallel_bound_check());
    let operands = |index: &[i64]| {
        vec![
            array(ElementType::U32, index),
            array(ElementType::U32, &[9; 9]),
            array(ElementType::U32, &[1; 9]),
            array(ElementType::U32, &[0; 9]),
            Operand::Scalar(Value::TRUE),
        ]
    };

    // only the last of three slices sees an out-of-bounds index
    let failing = [0, 1, 2, 3, 4, 5, 6, 12, 8];
    let serial = harness.run("bchk_ARR_ARR_ARR_ARR_SCA", operands(&failing));
    let parallel = harness.run_parallel(
        "bchk_ARR_ARR_ARR_ARR_SCA_mt",
        operands(&failing),
        &slices(),
    );
    assert_eq!(
        serial[3],
        array(ElementType::U32, &[1, 2, 3, 4, 5, 6, 7, 13, 9])
    );
    assert_eq!(serial[4], Operand::Scalar(Value::FALSE));
    assert_eq!(parallel, serial);

    let passing = [0, 1, 2, 3, 4, 5, 6, 7, 8];
    let parallel = harness.run_parallel(
        "bchk_ARR_ARR_ARR_ARR_SCA_mt",
        operands(&passing),
        &slices(),
    );
    assert_eq!(parallel[4], Operand::Scalar(Value::TRUE));
}
