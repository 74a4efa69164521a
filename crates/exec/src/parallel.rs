//! Range-splitting execution of parallel entry points.
//!
//! The primary index range is cut into disjoint contiguous slices aligned to
//! the routine's stride. Each slice runs on rayon against a private copy of
//! the operands, so workers never share a written location. Results are
//! merged back in slice order:
//!
//! | Output | Merge |
//! |--------|-------|
//! | elementwise array | each slice's index range copied back |
//! | elementwise scalar | value from the last slice |
//! | reduction | partials folded left to right with the combine step |
//! | membership | slice outputs concatenated |
//! | predicate | cleared if any slice cleared it |

use opforge_synth::{ParallelPlan, Routine, Step};
use rayon::prelude::*;
use std::ops::Range;
use tracing::debug;

use crate::error::{ExecError, Result};
use crate::eval::{Executor, Machine, check_signature};
use crate::memory::Operand;
use crate::value::Value;

/// Configuration for range-splitting execution.
#[derive(Debug, Clone, Copy)]
pub struct ParallelConfig {
    /// Maximum number of slices
    pub workers: usize,
    /// Smallest slice worth splitting off, in elements
    pub min_slice: usize,
}

impl ParallelConfig {
    pub fn new(workers: usize) -> Self {
        Self {
            workers,
            ..Self::default()
        }
    }
}

impl Default for ParallelConfig {
    fn default() -> Self {
        Self {
            workers: rayon::current_num_threads(),
            min_slice: 64,
        }
    }
}

/// Split `0..total` into at most `config.workers` contiguous ranges whose
/// boundaries fall on multiples of `align`.
pub fn split_ranges(total: usize, align: usize, config: &ParallelConfig) -> Vec<Range<usize>> {
    let align = align.max(1);
    let units = total.div_ceil(align);
    if units == 0 {
        return Vec::new();
    }
    let min_units = config.min_slice.max(1).div_ceil(align);
    let slices = config.workers.max(1).min(units.div_ceil(min_units)).max(1);
    let per = units.div_ceil(slices);
    (0..slices)
        .map(|k| (k * per * align).min(total)..((k + 1) * per * align).min(total))
        .filter(|range| !range.is_empty())
        .collect()
}

impl Executor<'_> {
    /// Run the routine's parallel entry point.
    ///
    /// Produces the same operands as [`Executor::run`] would, up to the
    /// reassociation a reduction's combine step allows.
    pub fn run_parallel(&self, operands: &mut [Operand], config: &ParallelConfig) -> Result<()> {
        let routine = self.routine;
        let token = self.token;
        let plan = routine
            .parallel
            .as_ref()
            .ok_or_else(|| ExecError::NotParallel(routine.name.clone()))?;
        check_signature(routine, operands)?;

        let total = operands[plan.split.position()].count();
        let align = match plan.stride {
            Step::Unit => 1,
            Step::Slot(slot) => {
                let stride = operands[slot.position()]
                    .scalar()
                    .map_or(0, Value::as_index);
                if stride == 0 {
                    return Err(ExecError::InvalidStride(stride));
                }
                stride as usize
            }
        };

        let ranges = split_ranges(total, align, config);
        debug!(routine = %routine.name, total, align, slices = ranges.len(), "parallel split");
        if ranges.len() <= 1 {
            return Machine::new(routine, operands, None, token).run();
        }

        let snapshot: &[Operand] = operands;
        let frames = ranges
            .par_iter()
            .map(|range| {
                let mut frame = snapshot.to_vec();
                Machine::new(routine, &mut frame, None, token)
                    .with_window(range.clone())
                    .run()?;
                Ok(frame)
            })
            .collect::<Result<Vec<_>>>()?;

        merge(routine, plan, operands, &ranges, &frames)
    }
}

fn merge(
    routine: &Routine,
    plan: &ParallelPlan,
    operands: &mut [Operand],
    ranges: &[Range<usize>],
    frames: &[Vec<Operand>],
) -> Result<()> {
    for param in routine.params.iter().filter(|p| p.mutability.is_written()) {
        let position = param.slot.position();
        let slices = frames.iter().map(|frame| &frame[position]);

        if param.error_flag {
            let cleared = slices
                .filter_map(Operand::scalar)
                .any(|flag| !flag.is_truthy());
            if cleared {
                operands[position] = Operand::Scalar(Value::FALSE);
            }
            continue;
        }

        match &mut operands[position] {
            Operand::Scalar(value) => {
                let partials: Vec<Value> = slices.filter_map(Operand::scalar).collect();
                *value = match plan.combine {
                    Some(op) => {
                        let mut partials = partials.into_iter();
                        let first = partials.next().unwrap_or(*value);
                        partials.try_fold(first, |acc, next| {
                            Value::combine(op, param.ty, acc, next)
                        })?
                    }
                    None => partials.last().copied().unwrap_or(*value),
                };
            }
            Operand::Array(values) if plan.ordered => {
                *values = slices.flat_map(|slice| slice.values().iter().copied()).collect();
            }
            Operand::Array(values) => {
                for (range, slice) in ranges.iter().zip(slices) {
                    let Operand::Array(source) = slice else {
                        continue;
                    };
                    let end = range.end.min(values.len()).min(source.len());
                    let start = range.start.min(end);
                    values[start..end].copy_from_slice(&source[start..end]);
                }
            }
            Operand::Constant(_) | Operand::Resizable(_) => {}
        }
    }
    Ok(())
}
