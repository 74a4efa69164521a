//! Integration test harness for opforge.
//!
//! Builds routine sets from declarations (registered or ad hoc) and runs
//! them through the reference executor: Declare → Expand → Synthesize →
//! Execute → Verify.

use opforge_declare::OperationDecl;
use opforge_exec::{CapacityGrowth, Executor, Operand, ParallelConfig, Resizable, Value};
use opforge_foundation::{AddressMode, ElementType};
use opforge_synth::{Literal, Routine, RoutineSet};

/// Test harness over one operation's routine set.
pub struct Harness {
    set: RoutineSet,
}

impl Harness {
    /// Build the routine set of a registered operation.
    ///
    /// # Panics
    ///
    /// Panics if the operation is not registered or fails to build.
    pub fn for_operation(name: &str) -> Self {
        let decl = opforge_catalog::declare(name)
            .unwrap_or_else(|| panic!("operation `{name}` is not registered"))
            .unwrap_or_else(|e| panic!("failed to declare `{name}`: {e}"));
        Self::from_decl(&decl)
    }

    /// Build the routine set of an ad hoc declaration.
    ///
    /// # Panics
    ///
    /// Panics if synthesis fails.
    pub fn from_decl(decl: &OperationDecl) -> Self {
        let set = opforge_synth::build(decl)
            .unwrap_or_else(|e| panic!("failed to build `{}`: {e}", decl.name()));
        Self { set }
    }

    pub fn set(&self) -> &RoutineSet {
        &self.set
    }

    /// # Panics
    ///
    /// Panics if no routine has this name.
    pub fn routine(&self, name: &str) -> &Routine {
        self.set
            .get(name)
            .unwrap_or_else(|| panic!("no routine named `{name}` in `{}`", self.set.operation))
    }

    /// Run a routine serially and return the operands afterwards.
    pub fn run(&self, name: &str, mut operands: Vec<Operand>) -> Vec<Operand> {
        Executor::new(self.routine(name))
            .run(&mut operands)
            .unwrap_or_else(|e| panic!("`{name}` failed: {e}"));
        operands
    }

    /// Run a routine with a capacity-growth primitive attached.
    pub fn run_with_growth(
        &self,
        name: &str,
        operands: &mut [Operand],
        growth: &mut dyn CapacityGrowth,
    ) {
        Executor::new(self.routine(name))
            .with_growth(growth)
            .run(operands)
            .unwrap_or_else(|e| panic!("`{name}` failed: {e}"));
    }

    /// Run a routine's parallel entry point.
    pub fn run_parallel(
        &self,
        name: &str,
        mut operands: Vec<Operand>,
        config: &ParallelConfig,
    ) -> Vec<Operand> {
        Executor::new(self.routine(name))
            .run_parallel(&mut operands, config)
            .unwrap_or_else(|e| panic!("`{name}` failed in parallel: {e}"));
        operands
    }
}

pub fn values(ty: ElementType, raw: &[i64]) -> Vec<Value> {
    raw.iter()
        .map(|&v| Value::from_literal(Literal::Int(v), ty))
        .collect()
}

pub fn array(ty: ElementType, raw: &[i64]) -> Operand {
    Operand::Array(values(ty, raw))
}

pub fn float_array(ty: ElementType, raw: &[f64]) -> Operand {
    Operand::Array(
        raw.iter()
            .map(|&v| Value::from_literal(Literal::Float(v), ty))
            .collect(),
    )
}

pub fn scalar(ty: ElementType, raw: i64) -> Operand {
    Operand::Scalar(Value::from_literal(Literal::Int(raw), ty))
}

/// Deterministic non-zero sample for element `index` of slot `slot`.
pub fn sample(ty: ElementType, slot: usize, index: usize) -> Value {
    let base = ((index * 7 + slot * 3) % 11 + 1) as f64;
    if ty.is_complex() {
        Value::Complex(base, 0.5 * (slot + 1) as f64).cast(ty)
    } else {
        Value::Float(base).cast(ty)
    }
}

/// Operands matching every parameter of `routine`, with arrays of `len`
/// elements and the predicate set.
pub fn sample_operands(routine: &Routine, len: usize) -> Vec<Operand> {
    routine
        .params
        .iter()
        .enumerate()
        .map(|(slot, param)| {
            if param.error_flag {
                return Operand::Scalar(Value::TRUE);
            }
            match param.mode {
                AddressMode::Scalar => Operand::Scalar(sample(param.ty, slot, 0)),
                AddressMode::Constant => Operand::Constant(sample(param.ty, slot, 0)),
                AddressMode::Array => {
                    Operand::Array((0..len).map(|i| sample(param.ty, slot, i)).collect())
                }
                AddressMode::Resizable => Operand::Resizable(Resizable::new()),
            }
        })
        .collect()
}
