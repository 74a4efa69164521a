//! Serial evaluation of routine IR.
//!
//! [`Executor`] walks a synthesized [`Routine`] over caller-supplied
//! [`Operand`]s. It is the stand-in for the virtual machine that would
//! otherwise call the generated routines, and follows the routine contract
//! exactly: operands in slot order, arrays walked by cursors, scalars
//! broadcast, the predicate written only to clear it.

use opforge_foundation::{AddressMode, SlotId};
use opforge_synth::{
    Bound, Loop, MatchTest, Origin, Param, Routine, Scan, Size, Step, Stmt, TExpr, UnaryOp,
};
use std::ops::Range;
use tracing::{debug, trace};

use crate::compare::compare_blocks;
use crate::error::{ExecError, Result};
use crate::memory::{CapacityGrowth, ExecToken, Operand};
use crate::value::Value;

/// Runs one routine.
pub struct Executor<'r> {
    pub(crate) routine: &'r Routine,
    pub(crate) token: ExecToken,
    growth: Option<&'r mut dyn CapacityGrowth>,
}

impl<'r> Executor<'r> {
    pub fn new(routine: &'r Routine) -> Self {
        Self {
            routine,
            token: ExecToken::default(),
            growth: None,
        }
    }

    /// Supply the capacity-growth primitive used by growable results.
    pub fn with_growth(mut self, growth: &'r mut dyn CapacityGrowth) -> Self {
        self.growth = Some(growth);
        self
    }

    pub fn with_token(mut self, token: ExecToken) -> Self {
        self.token = token;
        self
    }

    pub fn routine(&self) -> &'r Routine {
        self.routine
    }

    /// Run the routine single-threaded over `operands`.
    pub fn run(&mut self, operands: &mut [Operand]) -> Result<()> {
        check_signature(self.routine, operands)?;
        debug!(routine = %self.routine.name, "run");
        let growth = self.growth.as_deref_mut();
        Machine::new(self.routine, operands, growth, self.token).run()
    }
}

/// Verify operand count and addressing against the routine parameters.
pub(crate) fn check_signature(routine: &Routine, operands: &[Operand]) -> Result<()> {
    if operands.len() != routine.params.len() {
        return Err(ExecError::OperandCount {
            routine: routine.name.clone(),
            expected: routine.params.len(),
            found: operands.len(),
        });
    }
    for (param, operand) in routine.params.iter().zip(operands) {
        if operand.mode() != param.mode {
            return Err(ExecError::OperandShape {
                slot: param.name.clone(),
                expected: param.mode,
                found: operand.mode(),
            });
        }
    }
    Ok(())
}

/// Evaluation state of one invocation (or one parallel slice of one).
pub(crate) struct Machine<'a, 'g> {
    routine: &'a Routine,
    operands: &'a mut [Operand],
    growth: Option<&'a mut (dyn CapacityGrowth + 'g)>,
    token: ExecToken,
    locals: Vec<(String, Value)>,
    /// Current element index per slot, set by active cursors
    positions: Vec<Option<usize>>,
    /// Index range of the outermost walk, for parallel slices
    window: Option<Range<usize>>,
}

impl<'a, 'g> Machine<'a, 'g> {
    pub(crate) fn new(
        routine: &'a Routine,
        operands: &'a mut [Operand],
        growth: Option<&'a mut (dyn CapacityGrowth + 'g)>,
        token: ExecToken,
    ) -> Self {
        Self {
            routine,
            positions: vec![None; operands.len()],
            operands,
            growth,
            token,
            locals: Vec::new(),
            window: None,
        }
    }

    pub(crate) fn with_window(mut self, window: Range<usize>) -> Self {
        self.window = Some(window);
        self
    }

    pub(crate) fn run(mut self) -> Result<()> {
        let routine = self.routine;
        self.block(&routine.body)
    }

    fn param(&self, slot: SlotId) -> &'a Param {
        &self.routine.params[slot.position()]
    }

    fn block(&mut self, stmts: &[Stmt]) -> Result<()> {
        for stmt in stmts {
            self.stmt(stmt)?;
        }
        Ok(())
    }

    fn stmt(&mut self, stmt: &Stmt) -> Result<()> {
        match stmt {
            Stmt::Let { local, ty, value } => {
                let value = self.eval(value)?.cast(*ty);
                match self.locals.iter_mut().find(|(name, _)| name == local) {
                    Some(slot) => slot.1 = value,
                    None => self.locals.push((local.clone(), value)),
                }
            }
            Stmt::Set { local, value } => {
                let value = self.eval(value)?;
                let slot = self
                    .locals
                    .iter_mut()
                    .find(|(name, _)| name == local)
                    .ok_or_else(|| ExecError::UnknownLocal(local.clone()))?;
                slot.1 = value;
            }
            Stmt::Store {
                slot,
                component,
                value,
            } => {
                let value = self.eval(value)?;
                self.store(*slot, *component, value)?;
            }
            Stmt::ClearFlag { slot, when } => {
                if self.eval(when)?.is_truthy() {
                    trace!(slot = %slot, "predicate cleared");
                    self.operands[slot.position()] = Operand::Scalar(Value::FALSE);
                }
            }
            Stmt::Loop(lp) => self.walk(lp)?,
            Stmt::If {
                cond,
                then,
                otherwise,
            } => {
                if self.eval(cond)?.is_truthy() {
                    self.block(then)?;
                } else {
                    self.block(otherwise)?;
                }
            }
            Stmt::Scan(scan) => self.scan(scan)?,
            Stmt::Grow {
                result,
                storage,
                incoming,
            } => self.grow(*result, *storage, incoming)?,
            Stmt::AdvanceLength { result, by } => {
                let by = self.size(by);
                let param = self.param(*result);
                match &mut self.operands[result.position()] {
                    Operand::Resizable(r) => r.length += by,
                    other => {
                        return Err(ExecError::OperandShape {
                            slot: param.name.clone(),
                            expected: param.mode,
                            found: other.mode(),
                        });
                    }
                }
            }
        }
        Ok(())
    }

    fn size(&self, size: &Size) -> usize {
        match size {
            Size::Literal(n) => *n as usize,
            Size::CountOf(slot) => self.operands[slot.position()].count(),
        }
    }

    fn walk(&mut self, lp: &Loop) -> Result<()> {
        let count = match &lp.bound {
            Bound::Once => 1,
            Bound::Count(size) => self.size(size),
        };
        let range = match self.window.take() {
            Some(window) => window.start.min(count)..window.end.min(count),
            None => 0..count,
        };

        let cursors: Vec<(usize, usize, Option<usize>)> = lp
            .cursors
            .iter()
            .map(|cursor| {
                let position = cursor.slot.position();
                let base = match cursor.origin {
                    Origin::Start => 0,
                    Origin::Length(slot) => self.operands[slot.position()].count(),
                };
                let wrap = cursor
                    .wrap
                    .then(|| self.operands[position].count());
                (position, base, wrap)
            })
            .collect();

        for index in range {
            for &(position, base, wrap) in &cursors {
                self.positions[position] = Some(match wrap {
                    Some(len) if len > 0 => index % len,
                    _ => base + index,
                });
            }
            self.block(&lp.body)?;
        }
        for &(position, _, _) in &cursors {
            self.positions[position] = None;
        }
        Ok(())
    }

    fn scan(&mut self, scan: &Scan) -> Result<()> {
        let step = match scan.stride {
            Step::Unit => 1,
            Step::Slot(slot) => {
                let stride = self.scalar(slot)?.as_index();
                if stride == 0 {
                    return Err(ExecError::InvalidStride(stride));
                }
                stride as usize
            }
        };

        let primary_ty = self.param(scan.primary).ty;
        let primary: Vec<Value> = self.operands[scan.primary.position()]
            .values()
            .iter()
            .map(|v| v.cast(primary_ty))
            .collect();
        let secondary_ty = self.param(scan.secondary).ty;
        let secondary: Vec<Value> = self.operands[scan.secondary.position()]
            .values()
            .iter()
            .map(|v| v.cast(secondary_ty))
            .collect();

        let range = self.window.take().unwrap_or(0..primary.len());
        let end = range.end.min(primary.len());
        let mut matches = Vec::new();
        let mut start = range.start;
        while start + step <= end {
            let found = match &scan.test {
                MatchTest::Elementwise(test) => {
                    let mut found = false;
                    for j in 0..secondary.len() {
                        self.positions[scan.primary.position()] = Some(start);
                        self.positions[scan.secondary.position()] = Some(j);
                        if self.eval(test)?.is_truthy() {
                            found = true;
                            break;
                        }
                    }
                    found
                }
                MatchTest::Block { comparator } => {
                    let block = &primary[start..start + step];
                    let mut found = false;
                    for candidate in secondary.chunks_exact(step) {
                        if compare_blocks(*comparator, block, candidate)? == 0 {
                            found = true;
                            break;
                        }
                    }
                    found
                }
            };
            if found {
                matches.extend_from_slice(&primary[start..start + step]);
            }
            start += step;
        }
        self.positions[scan.primary.position()] = None;
        self.positions[scan.secondary.position()] = None;

        trace!(matches = matches.len(), step, "scan complete");
        let output = self.param(scan.output);
        match &mut self.operands[scan.output.position()] {
            Operand::Array(values) => *values = matches,
            other => {
                return Err(ExecError::OperandShape {
                    slot: output.name.clone(),
                    expected: output.mode,
                    found: other.mode(),
                });
            }
        }
        Ok(())
    }

    fn grow(&mut self, result: SlotId, storage: SlotId, incoming: &Size) -> Result<()> {
        let incoming = self.size(incoming);
        let handle = self.scalar(storage)?;
        let param = self.param(result);
        let routine = self.routine;
        let Some(growth) = self.growth.as_deref_mut() else {
            return Err(ExecError::MissingGrowth(routine.name.clone()));
        };
        let target = match &mut self.operands[result.position()] {
            Operand::Resizable(target) => target,
            other => {
                return Err(ExecError::OperandShape {
                    slot: param.name.clone(),
                    expected: param.mode,
                    found: other.mode(),
                });
            }
        };
        let desired = target.length + incoming;
        growth.grow(self.token, handle, target, desired)?;
        if target.capacity() < desired {
            return Err(ExecError::GrowthShortfall {
                slot: param.name.clone(),
                desired,
                capacity: target.capacity(),
            });
        }
        Ok(())
    }

    fn scalar(&self, slot: SlotId) -> Result<Value> {
        let param = self.param(slot);
        let operand = &self.operands[slot.position()];
        operand.scalar().ok_or_else(|| ExecError::OperandShape {
            slot: param.name.clone(),
            expected: param.mode,
            found: operand.mode(),
        })
    }

    fn position(&self, slot: SlotId, len: usize) -> Result<usize> {
        let param = self.param(slot);
        let index = self.positions[slot.position()].ok_or_else(|| ExecError::NoCursor {
            slot: param.name.clone(),
        })?;
        if index >= len {
            return Err(ExecError::OutOfRange {
                slot: param.name.clone(),
                index,
                len,
            });
        }
        Ok(index)
    }

    fn load(&self, slot: SlotId) -> Result<Value> {
        let value = match &self.operands[slot.position()] {
            Operand::Scalar(v) | Operand::Constant(v) => *v,
            Operand::Array(values) => values[self.position(slot, values.len())?],
            Operand::Resizable(r) => r.data[self.position(slot, r.data.len())?],
        };
        Ok(value.cast(self.param(slot).ty))
    }

    fn store(&mut self, slot: SlotId, component: Option<u8>, value: Value) -> Result<()> {
        let ty = self.param(slot).ty;
        let merge = |old: Value| match component {
            Some(index) => old
                .cast(ty)
                .with_component(index, value.cast(ty.component_type()))
                .cast(ty),
            None => value.cast(ty),
        };

        let index = match &self.operands[slot.position()] {
            Operand::Array(values) => Some(self.position(slot, values.len())?),
            Operand::Resizable(r) => Some(self.position(slot, r.data.len())?),
            Operand::Scalar(_) => None,
            Operand::Constant(_) => {
                let param = self.param(slot);
                return Err(ExecError::OperandShape {
                    slot: param.name.clone(),
                    expected: param.mode,
                    found: AddressMode::Constant,
                });
            }
        };

        match (&mut self.operands[slot.position()], index) {
            (Operand::Scalar(v), _) => *v = merge(*v),
            (Operand::Array(values), Some(i)) => values[i] = merge(values[i]),
            (Operand::Resizable(r), Some(i)) => r.data[i] = merge(r.data[i]),
            _ => {}
        }
        Ok(())
    }

    fn eval(&self, expr: &TExpr) -> Result<Value> {
        Ok(match expr {
            TExpr::Load {
                slot, component, ty,
            } => {
                let value = self.load(*slot)?;
                match component {
                    Some(index) => value.component(*index).cast(*ty),
                    None => value,
                }
            }
            TExpr::Local { name, .. } => self
                .locals
                .iter()
                .rev()
                .find(|(local, _)| local == name)
                .map(|(_, value)| *value)
                .ok_or_else(|| ExecError::UnknownLocal(name.clone()))?,
            TExpr::Const { value, ty } => Value::from_literal(*value, *ty),
            TExpr::Binary {
                op,
                operand_ty,
                lhs,
                rhs,
                ..
            } => Value::binary(*op, *operand_ty, self.eval(lhs)?, self.eval(rhs)?)?,
            TExpr::Unary { op, ty, operand } => {
                let value = self.eval(operand)?;
                match op {
                    UnaryOp::Neg => value.negate(*ty),
                    UnaryOp::Not => Value::truth(!value.is_truthy()),
                }
            }
            TExpr::Call {
                intrinsic,
                ty,
                args,
            } => {
                let args = args
                    .iter()
                    .map(|arg| self.eval(arg))
                    .collect::<Result<Vec<_>>>()?;
                Value::intrinsic(*intrinsic, *ty, &args)
            }
            TExpr::Select {
                ty,
                cond,
                then,
                otherwise,
            } => {
                let chosen = if self.eval(cond)?.is_truthy() {
                    then
                } else {
                    otherwise
                };
                self.eval(chosen)?.cast(*ty)
            }
            TExpr::Cast { ty, value } => self.eval(value)?.cast(*ty),
        })
    }
}
