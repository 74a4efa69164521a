//! Operation declarations.
//!
//! One [`OperationDecl`] exists per virtual instruction. Construction runs
//! capability composition immediately, so a declaration that exists is
//! already known to be conflict-free; expansion and synthesis never see an
//! unresolved one.
//!
//! ```
//! use opforge_declare::{OperationDecl, Expr, Intrinsic, Stmt, TypeToken, UnitComputation};
//! use opforge_foundation::Capability;
//!
//! let sqrt = OperationDecl::builder("sqrt")
//!     .capabilities([
//!         Capability::MultipleAddressMode,
//!         Capability::UnaryOperator,
//!         Capability::FloatingPointOnly,
//!         Capability::Multithreaded,
//!     ])
//!     .unit(UnitComputation::Statements(vec![Stmt::store(
//!         "res",
//!         Expr::call(Intrinsic::Sqrt, TypeToken::Of("res".into()), vec![Expr::slot("op1")]),
//!     )]))
//!     .build()
//!     .unwrap();
//! assert_eq!(sqrt.resolved().slots.len(), 2);
//! ```

use opforge_foundation::{BuildError, Capability, Result};

use crate::compose::{ResolvedDefaults, compose};
use crate::operand::OperandDecl;
use crate::unit::UnitComputation;

/// An immutable, composed operation declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationDecl {
    name: String,
    capabilities: Vec<Capability>,
    overrides: Vec<OperandDecl>,
    unit: UnitComputation,
    resolved: ResolvedDefaults,
}

impl OperationDecl {
    pub fn builder(name: impl Into<String>) -> DeclBuilder {
        DeclBuilder {
            name: name.into(),
            capabilities: Vec::new(),
            overrides: Vec::new(),
            unit: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Capabilities in declaration (merge) order.
    pub fn capabilities(&self) -> &[Capability] {
        &self.capabilities
    }

    pub fn overrides(&self) -> &[OperandDecl] {
        &self.overrides
    }

    pub fn unit(&self) -> &UnitComputation {
        &self.unit
    }

    pub fn resolved(&self) -> &ResolvedDefaults {
        &self.resolved
    }

    /// Re-run composition from the declared parts.
    pub fn recompose(&self) -> Result<ResolvedDefaults> {
        compose(&self.name, &self.capabilities, &self.overrides, &self.unit)
    }
}

/// Builder for [`OperationDecl`].
#[derive(Debug, Clone)]
pub struct DeclBuilder {
    name: String,
    capabilities: Vec<Capability>,
    overrides: Vec<OperandDecl>,
    unit: Option<UnitComputation>,
}

impl DeclBuilder {
    pub fn capability(mut self, capability: Capability) -> Self {
        self.capabilities.push(capability);
        self
    }

    pub fn capabilities(mut self, capabilities: impl IntoIterator<Item = Capability>) -> Self {
        self.capabilities.extend(capabilities);
        self
    }

    pub fn operand(mut self, operand: OperandDecl) -> Self {
        self.overrides.push(operand);
        self
    }

    pub fn unit(mut self, unit: UnitComputation) -> Self {
        self.unit = Some(unit);
        self
    }

    /// Compose and freeze the declaration.
    pub fn build(self) -> Result<OperationDecl> {
        let unit = self.unit.ok_or_else(|| {
            BuildError::illegal(&self.name, "res", "declaration has no unit computation")
        })?;
        let resolved = compose(&self.name, &self.capabilities, &self.overrides, &unit)?;
        Ok(OperationDecl {
            name: self.name,
            capabilities: self.capabilities,
            overrides: self.overrides,
            unit,
            resolved,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unit::{Expr, Stmt};

    #[test]
    fn test_missing_unit_is_illegal() {
        let err = OperationDecl::builder("empty")
            .capability(Capability::UnaryOperator)
            .build()
            .unwrap_err();
        assert!(matches!(err, BuildError::IllegalCombination { .. }));
        assert_eq!(err.operation(), "empty");
    }

    #[test]
    fn test_recompose_matches_construction() {
        let decl = OperationDecl::builder("neg")
            .capabilities([Capability::ArrayAddressMode, Capability::UnaryOperator])
            .unit(UnitComputation::Statements(vec![Stmt::store(
                "res",
                Expr::sub(Expr::int(0), Expr::slot("op1")),
            )]))
            .build()
            .unwrap();
        assert_eq!(&decl.recompose().unwrap(), decl.resolved());
        assert_eq!(decl.capabilities().len(), 2);
    }
}
