//! Type substitution for unit computations.
//!
//! Binds every symbolic slot reference and type token in a unit computation
//! to the concrete types of one [`Binding`], producing typed IR. Literals take
//! the type their context expects; an unconstrained integer literal is `S32`
//! and an unconstrained float literal is `F64`.

use opforge_declare::{
    BinaryOp, Expr, Intrinsic, Literal, ResolvedDefaults, ResolvedSlot, SlotRole, Stmt, TypeToken,
    UnaryOp,
};
use opforge_expand::Binding;
use opforge_foundation::{BuildError, ElementType, Result, SlotId};

use crate::ir::{self, TExpr, TRUTH};

/// Typing scope for one routine.
pub(crate) struct Scope<'a> {
    operation: &'a str,
    resolved: &'a ResolvedDefaults,
    binding: &'a Binding,
    locals: Vec<(String, ElementType)>,
    accumulator: Option<ElementType>,
}

impl<'a> Scope<'a> {
    pub(crate) fn new(
        operation: &'a str,
        resolved: &'a ResolvedDefaults,
        binding: &'a Binding,
    ) -> Self {
        Self {
            operation,
            resolved,
            binding,
            locals: Vec::new(),
            accumulator: None,
        }
    }

    /// Enable [`Expr::Acc`] with the given accumulator type.
    pub(crate) fn with_accumulator(mut self, ty: ElementType) -> Self {
        self.accumulator = Some(ty);
        self
    }

    fn output_name(&self) -> &'a str {
        self.resolved.output().map_or("res", |s| s.name.as_str())
    }

    fn illegal(&self, slot: &str, message: impl Into<String>) -> BuildError {
        BuildError::illegal(self.operation, slot, message)
    }

    fn resolve(&self, name: &str) -> Result<&'a ResolvedSlot> {
        self.resolved.slot(name).ok_or_else(|| {
            BuildError::resolution(
                self.operation,
                name,
                "unit computation references an unknown slot",
            )
        })
    }

    /// Slot id and bound element type.
    pub(crate) fn slot(&self, name: &str) -> Result<(SlotId, ElementType)> {
        let slot = self.resolve(name)?;
        let ty = self
            .binding
            .ty(slot.id)
            .ok_or_else(|| self.illegal(name, "slot has no binding"))?;
        Ok((slot.id, ty))
    }

    pub(crate) fn token(&self, token: &TypeToken) -> Result<ElementType> {
        match token {
            TypeToken::Fixed(ty) => Ok(*ty),
            TypeToken::Of(name) => self.slot(name).map(|(_, ty)| ty),
            TypeToken::SignedOf(name) => self.slot(name).map(|(_, ty)| ty.signed_counterpart()),
            TypeToken::ComponentOf(name) => self.slot(name).map(|(_, ty)| ty.component_type()),
        }
    }

    pub(crate) fn stmts(&mut self, stmts: &[Stmt]) -> Result<Vec<ir::Stmt>> {
        stmts.iter().map(|s| self.stmt(s)).collect()
    }

    fn stmt(&mut self, stmt: &Stmt) -> Result<ir::Stmt> {
        match stmt {
            Stmt::Let { name, ty, value } => {
                let ty = self.token(ty)?;
                let value = self.expr(value, Some(ty))?;
                self.expect_type(name, &value, ty)?;
                self.locals.push((name.clone(), ty));
                Ok(ir::Stmt::Let {
                    local: name.clone(),
                    ty,
                    value,
                })
            }
            Stmt::Store { slot, value } => {
                let (id, ty) = self.written_slot(slot)?;
                let value = self.expr(value, Some(ty))?;
                self.expect_type(slot, &value, ty)?;
                Ok(ir::Stmt::Store {
                    slot: id,
                    component: None,
                    value,
                })
            }
            Stmt::StoreComponent { slot, index, value } => {
                let (id, ty) = self.written_slot(slot)?;
                self.check_component(slot, ty, *index)?;
                let component_ty = ty.component_type();
                let value = self.expr(value, Some(component_ty))?;
                self.expect_type(slot, &value, component_ty)?;
                Ok(ir::Stmt::Store {
                    slot: id,
                    component: Some(*index),
                    value,
                })
            }
            Stmt::Fail { slot, when } => {
                let resolved = self.resolve(slot)?;
                if resolved.role != SlotRole::Predicate {
                    return Err(self.illegal(slot, "only the predicate slot can be downgraded"));
                }
                let when = self.truth(when)?;
                Ok(ir::Stmt::ClearFlag {
                    slot: resolved.id,
                    when,
                })
            }
        }
    }

    fn written_slot(&self, name: &str) -> Result<(SlotId, ElementType)> {
        let slot = self.resolve(name)?;
        if !slot.mutability.is_written() {
            return Err(self.illegal(name, "unit computation stores into an input slot"));
        }
        if slot.role == SlotRole::Predicate {
            return Err(self.illegal(name, "predicate slots are only written by Fail"));
        }
        self.slot(name)
    }

    fn check_component(&self, slot: &str, ty: ElementType, index: u8) -> Result<()> {
        if usize::from(index) >= ty.components() {
            return Err(self.illegal(
                slot,
                format!("component {} out of range for {}", index, ty),
            ));
        }
        Ok(())
    }

    fn expect_type(&self, slot: &str, value: &TExpr, ty: ElementType) -> Result<()> {
        if value.ty() != ty {
            return Err(self.illegal(
                slot,
                format!("expected a {} value, found {}", ty, value.ty()),
            ));
        }
        Ok(())
    }

    /// Type an expression used as a condition.
    pub(crate) fn truth(&mut self, expr: &Expr) -> Result<TExpr> {
        let value = self.expr(expr, Some(TRUTH))?;
        if !value.ty().is_integer() {
            return Err(self.illegal(
                self.output_name(),
                format!("condition must be an integer truth value, found {}", value.ty()),
            ));
        }
        Ok(value)
    }

    pub(crate) fn expr(&mut self, expr: &Expr, expected: Option<ElementType>) -> Result<TExpr> {
        match expr {
            Expr::Slot(name) => {
                let (slot, ty) = self.slot(name)?;
                Ok(TExpr::load(slot, ty))
            }
            Expr::Component(name, index) => {
                let (slot, ty) = self.slot(name)?;
                self.check_component(name, ty, *index)?;
                Ok(TExpr::Load {
                    slot,
                    component: Some(*index),
                    ty: ty.component_type(),
                })
            }
            Expr::Local(name) => {
                let ty = self
                    .locals
                    .iter()
                    .rev()
                    .find(|(local, _)| local == name)
                    .map(|(_, ty)| *ty)
                    .ok_or_else(|| {
                        BuildError::resolution(
                            self.operation,
                            name,
                            "unit computation references an unknown local",
                        )
                    })?;
                Ok(TExpr::Local {
                    name: name.clone(),
                    ty,
                })
            }
            Expr::Acc => {
                let ty = self.accumulator.ok_or_else(|| {
                    self.illegal(self.output_name(), "accumulator used outside a fold")
                })?;
                Ok(TExpr::Local {
                    name: ir::ACCUMULATOR.to_string(),
                    ty,
                })
            }
            Expr::Literal(value) => Ok(TExpr::Const {
                value: *value,
                ty: expected.unwrap_or(match value {
                    Literal::Float(_) => ElementType::F64,
                    Literal::Int(_) | Literal::Bool(_) => ElementType::S32,
                }),
            }),
            Expr::Binary { op, lhs, rhs } => self.binary(*op, lhs, rhs, expected),
            Expr::Unary { op, operand } => match op {
                UnaryOp::Neg => {
                    let operand = self.expr(operand, expected)?;
                    Ok(TExpr::Unary {
                        op: *op,
                        ty: operand.ty(),
                        operand: Box::new(operand),
                    })
                }
                UnaryOp::Not => {
                    let operand = self.truth(operand)?;
                    Ok(TExpr::Unary {
                        op: *op,
                        ty: TRUTH,
                        operand: Box::new(operand),
                    })
                }
            },
            Expr::Call {
                intrinsic,
                ty,
                args,
            } => {
                let ty = self.token(ty)?;
                let supported = match intrinsic {
                    Intrinsic::Sqrt => ty.is_float() || ty.is_complex(),
                    Intrinsic::Abs => !ty.is_complex(),
                };
                if !supported {
                    return Err(self.illegal(
                        self.output_name(),
                        format!("{} has no {} variant", intrinsic.name(), ty),
                    ));
                }
                let args = args
                    .iter()
                    .map(|arg| {
                        let arg = self.expr(arg, Some(ty))?;
                        self.expect_type(self.output_name(), &arg, ty)?;
                        Ok(arg)
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok(TExpr::Call {
                    intrinsic: *intrinsic,
                    ty,
                    args,
                })
            }
            Expr::Select {
                cond,
                then,
                otherwise,
            } => {
                let cond = self.truth(cond)?;
                let (then, otherwise) = self.pair(then, otherwise, expected)?;
                Ok(TExpr::Select {
                    ty: then.ty(),
                    cond: Box::new(cond),
                    then: Box::new(then),
                    otherwise: Box::new(otherwise),
                })
            }
            Expr::Cast { ty, value } => {
                let ty = self.token(ty)?;
                let value = self.expr(value, None)?;
                if value.ty().is_complex() != ty.is_complex() {
                    return Err(self.illegal(
                        self.output_name(),
                        format!("cannot cast {} to {}", value.ty(), ty),
                    ));
                }
                Ok(TExpr::Cast {
                    ty,
                    value: Box::new(value),
                })
            }
        }
    }

    fn binary(
        &mut self,
        op: BinaryOp,
        lhs: &Expr,
        rhs: &Expr,
        expected: Option<ElementType>,
    ) -> Result<TExpr> {
        if op.is_logical() {
            let lhs = self.truth(lhs)?;
            let rhs = self.truth(rhs)?;
            return Ok(TExpr::Binary {
                op,
                operand_ty: TRUTH,
                ty: TRUTH,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            });
        }

        let hint = if op.is_comparison() { None } else { expected };
        let (lhs, rhs) = self.pair(lhs, rhs, hint)?;
        let operand_ty = lhs.ty();
        if op.is_ordering() && operand_ty.is_complex() {
            return Err(self.illegal(
                self.output_name(),
                format!("{} has no ordering", operand_ty),
            ));
        }
        Ok(TExpr::Binary {
            op,
            operand_ty,
            ty: if op.is_comparison() { TRUTH } else { operand_ty },
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        })
    }

    /// Type two operands that must agree; a literal side takes the other
    /// side's type.
    fn pair(
        &mut self,
        lhs: &Expr,
        rhs: &Expr,
        expected: Option<ElementType>,
    ) -> Result<(TExpr, TExpr)> {
        let (lhs, rhs) = if matches!(lhs, Expr::Literal(_)) && !matches!(rhs, Expr::Literal(_)) {
            let rhs = self.expr(rhs, expected)?;
            let lhs = self.expr(lhs, Some(rhs.ty()))?;
            (lhs, rhs)
        } else {
            let lhs = self.expr(lhs, expected)?;
            let rhs = self.expr(rhs, Some(lhs.ty()))?;
            (lhs, rhs)
        };
        if lhs.ty() != rhs.ty() {
            return Err(self.illegal(
                self.output_name(),
                format!("operand types disagree: {} vs {}", lhs.ty(), rhs.ty()),
            ));
        }
        Ok((lhs, rhs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opforge_declare::{OperandDecl, OperationDecl, UnitComputation};
    use opforge_expand::enumerate;
    use opforge_foundation::Capability;

    fn decl(caps: &[Capability], overrides: Vec<OperandDecl>) -> OperationDecl {
        let mut builder = OperationDecl::builder("scratch").capabilities(caps.iter().copied());
        for o in overrides {
            builder = builder.operand(o);
        }
        builder
            .unit(UnitComputation::Statements(vec![]))
            .build()
            .unwrap()
    }

    #[test]
    fn test_literal_takes_operand_type() {
        let decl = decl(&[Capability::UnaryOperator], vec![]);
        let binding = enumerate(&decl)
            .into_iter()
            .find(|b| b.type_param == Some(ElementType::U16))
            .unwrap();
        let mut scope = Scope::new("scratch", decl.resolved(), &binding);

        let typed = scope
            .expr(&Expr::add(Expr::int(1), Expr::slot("op1")), None)
            .unwrap();
        match typed {
            TExpr::Binary { lhs, ty, .. } => {
                assert_eq!(ty, ElementType::U16);
                assert_eq!(lhs.ty(), ElementType::U16);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_comparison_yields_truth() {
        let decl = decl(&[Capability::BinaryOperator], vec![]);
        let binding = enumerate(&decl)
            .into_iter()
            .find(|b| b.type_param == Some(ElementType::F32))
            .unwrap();
        let mut scope = Scope::new("scratch", decl.resolved(), &binding);
        let typed = scope
            .expr(&Expr::lt(Expr::slot("op1"), Expr::slot("op2")), None)
            .unwrap();
        assert_eq!(typed.ty(), TRUTH);
    }

    #[test]
    fn test_unknown_slot_is_resolution_error() {
        let decl = decl(&[Capability::UnaryOperator], vec![]);
        let binding = &enumerate(&decl)[0];
        let mut scope = Scope::new("scratch", decl.resolved(), binding);
        let err = scope.expr(&Expr::slot("op4"), None).unwrap_err();
        assert!(matches!(err, BuildError::Resolution { .. }));
        assert_eq!(err.slot(), "op4");
    }

    #[test]
    fn test_store_into_input_is_illegal() {
        let decl = decl(&[Capability::UnaryOperator], vec![]);
        let binding = &enumerate(&decl)[0];
        let mut scope = Scope::new("scratch", decl.resolved(), binding);
        let err = scope
            .stmts(&[Stmt::store("op1", Expr::int(0))])
            .unwrap_err();
        assert!(matches!(err, BuildError::IllegalCombination { .. }));
    }

    #[test]
    fn test_component_types() {
        let decl = decl(
            &[Capability::BinaryOperator],
            vec![
                OperandDecl::new("op1").fixed(ElementType::C128),
                OperandDecl::new("op2").fixed(ElementType::C128),
                OperandDecl::new("res").fixed(ElementType::C128),
            ],
        );
        let binding = &enumerate(&decl)[0];
        let mut scope = Scope::new("scratch", decl.resolved(), binding);
        let re = scope.expr(&Expr::component("op1", 0), None).unwrap();
        assert_eq!(re.ty(), ElementType::F64);
        assert_eq!(
            scope.token(&TypeToken::ComponentOf("res".into())).unwrap(),
            ElementType::F64
        );
        let err = scope.expr(&Expr::component("op1", 2), None).unwrap_err();
        assert!(matches!(err, BuildError::IllegalCombination { .. }));
    }

    #[test]
    fn test_signed_counterpart_token() {
        let decl = decl(
            &[Capability::UnaryOperator],
            vec![OperandDecl::new("op1").fixed(ElementType::U64)],
        );
        let binding = enumerate(&decl).into_iter().find(|b| b.type_param.is_some()).unwrap();
        let scope = Scope::new("scratch", decl.resolved(), &binding);
        assert_eq!(
            scope.token(&TypeToken::SignedOf("op1".into())).unwrap(),
            ElementType::S64
        );
    }
}
