//! Routine lowering.
//!
//! Wraps a type-substituted unit computation in the scaffolding its result
//! policy and binding call for:
//!
//! - **Iteration**: a counted loop bounded by the first array input (else
//!   the first array output), with one cursor per array operand. Shorter
//!   inputs wrap around unless the declaration is fixed-size; a binding with
//!   no array operand runs a single pass.
//! - **Reduction**: an accumulator initialized before the loop, folded per
//!   element, stored once after it.
//! - **Membership**: a nested scan with two strategies selected at runtime by
//!   the stride operand: unit stride compares elements with the unit
//!   computation, wider strides compare whole blocks with the signed block
//!   comparator of the element type.
//! - **Growth**: a capacity request before any write, appends starting at
//!   the previous length, and a length update afterwards.
//! - **Predicate fusion**: `Fail` statements become flag-clearing statements
//!   inside the loop; nothing ever sets the flag back to true.

use opforge_declare::{
    BinaryOp, Expr, Literal, ResolvedDefaults, ResolvedSlot, SlotRole, Stmt as UnitStmt,
    UnitComputation,
};
use opforge_expand::{Binding, SpecializedRoutine};
use opforge_foundation::{
    AddressMode, BuildError, Mutability, Result, ResultPolicy, SizeExpr, SlotId,
};
use tracing::trace;

use crate::ir::{
    ACCUMULATOR, Bound, Cost, Cursor, Loop, MatchTest, Origin, Param, ParallelPlan, Routine, Scan,
    Size, Step, Stmt, TExpr, TRUTH,
};
use crate::substitute::Scope;

/// Synthesize one specialized routine.
///
/// Fails when the unit computation references unknown slots or locals, a
/// size expression names an unknown slot, or the binding cannot be lowered
/// (for example a membership result bound to a scalar).
pub fn synthesize(routine: &SpecializedRoutine<'_>) -> Result<Routine> {
    let decl = routine.decl;
    let resolved = decl.resolved();
    let binding = &routine.binding;
    let params = params(decl.name(), resolved, binding)?;

    let bound_slot = binding.loop_bound(resolved);
    let bound = match bound_slot {
        Some(slot) => Bound::Count(params[slot.position()].size.clone()),
        None => Bound::Once,
    };

    let lowering = Lowering {
        operation: decl.name(),
        resolved,
        binding,
        params: &params,
        bound_slot,
        bound,
    };

    let body = match (resolved.result, decl.unit()) {
        (ResultPolicy::Elementwise, UnitComputation::Statements(stmts)) => {
            lowering.elementwise(stmts)?
        }
        (ResultPolicy::Reduction, UnitComputation::Fold { init, step }) => {
            lowering.reduction(*init, step)?
        }
        (ResultPolicy::Growable, UnitComputation::Statements(stmts)) => lowering.growable(stmts)?,
        (ResultPolicy::Membership, UnitComputation::Match(test)) => lowering.membership(test)?,
        (result, unit) => {
            return Err(lowering.illegal(
                lowering.output_name(),
                format!("{:?} result cannot lower a {} body", result, unit.shape()),
            ));
        }
    };

    let parallel = if routine.key.parallel {
        Some(lowering.parallel_plan()?)
    } else {
        None
    };

    trace!(routine = %routine.key, statements = body.len(), "synthesized");
    Ok(Routine {
        name: routine.name(),
        key: routine.key.clone(),
        params,
        body,
        parallel,
        cost: Cost {
            slow: resolved.slow,
        },
    })
}

fn params(operation: &str, resolved: &ResolvedDefaults, binding: &Binding) -> Result<Vec<Param>> {
    resolved
        .slots
        .iter()
        .map(|slot| {
            let bound = binding
                .get(slot.id)
                .ok_or_else(|| BuildError::illegal(operation, &slot.name, "slot has no binding"))?;
            let declared = resolve_size(operation, resolved, slot)?;
            Ok(Param {
                slot: slot.id,
                name: slot.name.clone(),
                ty: bound.ty,
                mode: bound.mode,
                mutability: slot.mutability,
                size: if bound.mode.is_sequence() {
                    declared
                } else {
                    Size::Literal(1)
                },
                error_flag: slot.is_error_flag(),
            })
        })
        .collect()
}

fn resolve_size(operation: &str, resolved: &ResolvedDefaults, slot: &ResolvedSlot) -> Result<Size> {
    match &slot.size {
        SizeExpr::Literal(n) => Ok(Size::Literal(*n)),
        SizeExpr::CountOf(name) => resolved
            .slot(name)
            .map(|target| Size::CountOf(target.id))
            .ok_or_else(|| {
                BuildError::resolution(
                    operation,
                    &slot.name,
                    format!("size references unknown slot `{}`", name),
                )
            }),
    }
}

struct Lowering<'a> {
    operation: &'a str,
    resolved: &'a ResolvedDefaults,
    binding: &'a Binding,
    params: &'a [Param],
    bound_slot: Option<SlotId>,
    bound: Bound,
}

impl<'a> Lowering<'a> {
    fn illegal(&self, slot: &str, message: impl Into<String>) -> BuildError {
        BuildError::illegal(self.operation, slot, message)
    }

    fn output_name(&self) -> &'a str {
        self.resolved.output().map_or("res", |s| s.name.as_str())
    }

    fn scope(&self) -> Scope<'a> {
        Scope::new(self.operation, self.resolved, self.binding)
    }

    fn param(&self, slot: &ResolvedSlot) -> &'a Param {
        &self.params[slot.id.position()]
    }

    fn output(&self) -> Result<&'a Param> {
        self.resolved
            .output()
            .map(|slot| self.param(slot))
            .ok_or_else(|| self.illegal("res", "declaration has no output slot"))
    }

    fn data_inputs(&self) -> impl Iterator<Item = &'a ResolvedSlot> + use<'a> {
        self.resolved
            .inputs()
            .filter(|slot| slot.role == SlotRole::Data)
    }

    fn role(&self, role: SlotRole) -> Option<&'a ResolvedSlot> {
        self.resolved.slots.iter().find(|slot| slot.role == role)
    }

    /// One cursor per array operand. Inputs other than the loop bound wrap
    /// when `wrap` is set.
    fn cursors(&self, wrap: bool) -> Vec<Cursor> {
        self.params
            .iter()
            .filter(|p| p.mode == AddressMode::Array)
            .map(|p| Cursor {
                slot: p.slot,
                origin: Origin::Start,
                wrap: wrap
                    && p.mutability == Mutability::Input
                    && Some(p.slot) != self.bound_slot,
            })
            .collect()
    }

    fn elementwise(&self, stmts: &[UnitStmt]) -> Result<Vec<Stmt>> {
        let body = self.scope().stmts(stmts)?;
        Ok(vec![Stmt::Loop(Loop {
            bound: self.bound.clone(),
            cursors: self.cursors(!self.resolved.fixed_size),
            body,
        })])
    }

    fn reduction(&self, init: Literal, step: &Expr) -> Result<Vec<Stmt>> {
        let output = self.output()?;
        let ty = output.ty;
        let mut scope = self.scope().with_accumulator(ty);
        let step = scope.expr(step, Some(ty))?;
        if step.ty() != ty {
            return Err(self.illegal(
                &output.name,
                format!("fold step yields {}, accumulator is {}", step.ty(), ty),
            ));
        }

        let accumulator = TExpr::Local {
            name: ACCUMULATOR.to_string(),
            ty,
        };
        Ok(vec![
            Stmt::Let {
                local: ACCUMULATOR.to_string(),
                ty,
                value: TExpr::Const { value: init, ty },
            },
            Stmt::Loop(Loop {
                bound: self.bound.clone(),
                cursors: self.cursors(!self.resolved.fixed_size),
                body: vec![Stmt::Set {
                    local: ACCUMULATOR.to_string(),
                    value: step,
                }],
            }),
            Stmt::Store {
                slot: output.slot,
                component: None,
                value: accumulator,
            },
        ])
    }

    fn growable(&self, stmts: &[UnitStmt]) -> Result<Vec<Stmt>> {
        let output = self.output()?;
        let storage = self
            .role(SlotRole::Storage)
            .ok_or_else(|| self.illegal(&output.name, "growable result has no storage handle"))?;
        let source = self
            .data_inputs()
            .next()
            .map(|slot| self.param(slot))
            .ok_or_else(|| self.illegal(&output.name, "growable result has no data input"))?;
        let incoming = source.size.clone();

        let body = self.scope().stmts(stmts)?;
        let mut cursors = self.cursors(true);
        cursors.push(Cursor {
            slot: output.slot,
            origin: Origin::Length(output.slot),
            wrap: false,
        });

        Ok(vec![
            Stmt::Grow {
                result: output.slot,
                storage: storage.id,
                incoming: incoming.clone(),
            },
            Stmt::Loop(Loop {
                bound: Bound::Count(incoming.clone()),
                cursors,
                body,
            }),
            Stmt::AdvanceLength {
                result: output.slot,
                by: incoming,
            },
        ])
    }

    fn membership(&self, test: &Expr) -> Result<Vec<Stmt>> {
        let output = self.output()?;
        if output.mode != AddressMode::Array {
            return Err(self.illegal(
                &output.name,
                format!("membership output must be ARR, bound to {}", output.mode),
            ));
        }

        let mut inputs = self.data_inputs().map(|slot| self.param(slot));
        let (Some(primary), Some(secondary)) = (inputs.next(), inputs.next()) else {
            return Err(self.illegal(&output.name, "membership needs two data inputs"));
        };
        let stride = self
            .role(SlotRole::Stride)
            .map(|slot| self.param(slot))
            .ok_or_else(|| self.illegal(&output.name, "membership needs a stride operand"))?;
        if !stride.ty.is_integer() || stride.mode != AddressMode::Scalar {
            return Err(self.illegal(
                &stride.name,
                format!("stride must be an integer scalar, found {} {}", stride.ty, stride.mode),
            ));
        }

        let comparator = primary.ty.signed_counterpart();
        if !comparator.has_block_comparator() {
            return Err(self.illegal(
                &primary.name,
                format!("no block comparator for {}", primary.ty),
            ));
        }

        let test = self.scope().truth(test)?;
        let scan = |step: Step, test: MatchTest| {
            Stmt::Scan(Scan {
                primary: primary.slot,
                secondary: secondary.slot,
                output: output.slot,
                stride: step,
                test,
            })
        };

        Ok(vec![Stmt::If {
            cond: TExpr::Binary {
                op: BinaryOp::Eq,
                operand_ty: stride.ty,
                ty: TRUTH,
                lhs: Box::new(TExpr::load(stride.slot, stride.ty)),
                rhs: Box::new(TExpr::Const {
                    value: Literal::Int(1),
                    ty: stride.ty,
                }),
            },
            then: vec![scan(Step::Unit, MatchTest::Elementwise(test))],
            otherwise: vec![scan(Step::Slot(stride.slot), MatchTest::Block { comparator })],
        }])
    }

    fn parallel_plan(&self) -> Result<ParallelPlan> {
        if self.resolved.result == ResultPolicy::Membership {
            let primary = self
                .data_inputs()
                .next()
                .map(|slot| self.param(slot))
                .ok_or_else(|| {
                    self.illegal(self.output_name(), "membership needs a primary input")
                })?;
            let stride = self
                .role(SlotRole::Stride)
                .ok_or_else(|| {
                    self.illegal(self.output_name(), "membership needs a stride operand")
                })?;
            if primary.mode != AddressMode::Array {
                return Err(self.illegal(
                    &primary.name,
                    "parallel membership splits the primary array",
                ));
            }
            return Ok(ParallelPlan {
                split: primary.slot,
                stride: Step::Slot(stride.id),
                combine: None,
                ordered: true,
            });
        }

        let split = self.bound_slot.ok_or_else(|| {
            self.illegal(
                self.output_name(),
                "parallel entry point needs an array loop bound",
            )
        })?;
        Ok(ParallelPlan {
            split,
            stride: Step::Unit,
            combine: self.resolved.combine,
            ordered: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opforge_declare::{OperandDecl, OperationDecl};
    use opforge_expand::expand;
    use opforge_foundation::{Capability, CombineOp, ElementType};

    fn synthesize_all(decl: &OperationDecl) -> Vec<Routine> {
        expand(decl)
            .unwrap()
            .values()
            .map(|r| synthesize(r).unwrap())
            .collect()
    }

    fn find<'r>(routines: &'r [Routine], name: &str) -> &'r Routine {
        routines
            .iter()
            .find(|r| r.name == name)
            .unwrap_or_else(|| panic!("missing routine {}", name))
    }

    fn min_decl() -> OperationDecl {
        OperationDecl::builder("min")
            .capabilities([
                Capability::MultipleAddressMode,
                Capability::BinaryOperator,
                Capability::Multithreaded,
            ])
            .unit(UnitComputation::Statements(vec![UnitStmt::store(
                "res",
                Expr::select(
                    Expr::lt(Expr::slot("op1"), Expr::slot("op2")),
                    Expr::slot("op1"),
                    Expr::slot("op2"),
                ),
            )]))
            .build()
            .unwrap()
    }

    #[test]
    fn test_elementwise_cursors_and_wrap() {
        let routines = synthesize_all(&min_decl());
        let routine = find(&routines, "min_S16_ARR_ARR_ARR");
        let Stmt::Loop(lp) = &routine.body[0] else {
            panic!("expected loop");
        };
        assert_eq!(lp.bound, Bound::Count(Size::CountOf(SlotId(1))));
        let wraps: Vec<_> = lp.cursors.iter().map(|c| (c.slot, c.wrap)).collect();
        assert_eq!(
            wraps,
            vec![(SlotId(1), false), (SlotId(2), true), (SlotId(3), false)]
        );
    }

    #[test]
    fn test_all_scalar_runs_once() {
        let routines = synthesize_all(&min_decl());
        let routine = find(&routines, "min_U08_SCA_SCA_SCA");
        let Stmt::Loop(lp) = &routine.body[0] else {
            panic!("expected loop");
        };
        assert_eq!(lp.bound, Bound::Once);
        assert!(lp.cursors.is_empty());
        assert!(routine.parallel.is_none());
    }

    #[test]
    fn test_scalar_input_array_output_bound_by_output() {
        let routines = synthesize_all(&min_decl());
        let routine = find(&routines, "min_F32_SCA_SCA_ARR_mt");
        let plan = routine.parallel.as_ref().unwrap();
        assert_eq!(plan.split, SlotId(3));
        assert!(!plan.ordered);
    }

    #[test]
    fn test_reduction_shape() {
        let decl = OperationDecl::builder("sum")
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
            .unwrap();
        let routines = synthesize_all(&decl);
        let routine = find(&routines, "sum_F64_ARR_SCA_mt");
        assert!(matches!(
            routine.body[0],
            Stmt::Let { ref local, ty: ElementType::F64, .. } if local == ACCUMULATOR
        ));
        assert!(matches!(routine.body[1], Stmt::Loop(_)));
        assert!(matches!(routine.body[2], Stmt::Store { slot: SlotId(2), .. }));
        assert_eq!(
            routine.parallel.as_ref().unwrap().combine,
            Some(CombineOp::Add)
        );
    }

    #[test]
    fn test_growable_shape() {
        let decl = OperationDecl::builder("concat")
            .capabilities([
                Capability::ArrayAddressMode,
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
            .unit(UnitComputation::Statements(vec![UnitStmt::store(
                "res",
                Expr::slot("op1"),
            )]))
            .build()
            .unwrap();
        let routines = synthesize_all(&decl);
        assert_eq!(routines.len(), 1);
        let routine = &routines[0];
        assert_eq!(routine.name, "concat_ARR_CON_DYN");
        assert_eq!(
            routine.body[0],
            Stmt::Grow {
                result: SlotId(3),
                storage: SlotId(2),
                incoming: Size::CountOf(SlotId(1)),
            }
        );
        let Stmt::Loop(lp) = &routine.body[1] else {
            panic!("expected loop");
        };
        assert_eq!(lp.cursors.last().unwrap().origin, Origin::Length(SlotId(3)));
        assert!(matches!(routine.body[2], Stmt::AdvanceLength { .. }));
    }

    #[test]
    fn test_membership_strategies() {
        let decl = OperationDecl::builder("intersect")
            .capabilities([
                Capability::ArrayAddressMode,
                Capability::TernaryOperator,
                Capability::ArrayComparison,
            ])
            .unit(UnitComputation::Match(Expr::eq(
                Expr::slot("op1"),
                Expr::slot("op2"),
            )))
            .build()
            .unwrap();
        let routines = synthesize_all(&decl);
        let routine = find(&routines, "intersect_U32_ARR_ARR_SCA_ARR");
        let Stmt::If {
            then, otherwise, ..
        } = &routine.body[0]
        else {
            panic!("expected stride dispatch");
        };
        assert!(matches!(
            &then[0],
            Stmt::Scan(Scan {
                stride: Step::Unit,
                test: MatchTest::Elementwise(_),
                ..
            })
        ));
        assert!(matches!(
            &otherwise[0],
            Stmt::Scan(Scan {
                stride: Step::Slot(SlotId(3)),
                test: MatchTest::Block {
                    comparator: ElementType::S32
                },
                ..
            })
        ));
    }

    #[test]
    fn test_membership_output_must_be_array() {
        let decl = OperationDecl::builder("intersect")
            .capabilities([
                Capability::ArrayAddressMode,
                Capability::TernaryOperator,
                Capability::ArrayComparison,
            ])
            .operand(OperandDecl::new("res").mode(AddressMode::Resizable))
            .unit(UnitComputation::Match(Expr::eq(
                Expr::slot("op1"),
                Expr::slot("op2"),
            )))
            .build()
            .unwrap();
        for routine in expand(&decl).unwrap().values() {
            let err = synthesize(routine).unwrap_err();
            assert!(matches!(err, BuildError::IllegalCombination { .. }));
            assert_eq!(err.slot(), "res");
        }
    }

    #[test]
    fn test_unknown_size_reference() {
        let decl = OperationDecl::builder("copy")
            .capabilities([Capability::ArrayAddressMode, Capability::UnaryOperator])
            .operand(OperandDecl::new("res").size(SizeExpr::count_of("op9")))
            .unit(UnitComputation::Statements(vec![UnitStmt::store(
                "res",
                Expr::slot("op1"),
            )]))
            .build()
            .unwrap();
        let routine = expand(&decl).unwrap().into_values().next().unwrap();
        let err = synthesize(&routine).unwrap_err();
        assert!(matches!(err, BuildError::Resolution { .. }));
        assert_eq!(err.slot(), "res");
    }

    #[test]
    fn test_slow_hint_is_metadata_only() {
        let body = UnitComputation::Statements(vec![UnitStmt::store("res", Expr::slot("op1"))]);
        let plain = OperationDecl::builder("copy")
            .capabilities([Capability::ArrayAddressMode, Capability::UnaryOperator])
            .unit(body.clone())
            .build()
            .unwrap();
        let slow = OperationDecl::builder("copy")
            .capabilities([
                Capability::ArrayAddressMode,
                Capability::UnaryOperator,
                Capability::Slow,
            ])
            .unit(body)
            .build()
            .unwrap();
        let a = synthesize_all(&plain);
        let b = synthesize_all(&slow);
        assert_eq!(a.len(), b.len());
        for (a, b) in a.iter().zip(&b) {
            assert_eq!(a.body, b.body);
            assert!(!a.cost.slow);
            assert!(b.cost.slow);
        }
    }
}
