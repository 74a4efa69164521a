//! Operand slot declarations.
//!
//! A declaration fixes its slot list through arity and error-policy
//! capabilities; [`OperandDecl`] records are explicit per-slot overrides keyed
//! by slot name. After composition every slot is a [`ResolvedSlot`] with all
//! attributes filled in.

use opforge_foundation::{AddressMode, ElementType, Mutability, SizeExpr, SlotId, TypeSet};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Declared type of a slot.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SlotType {
    /// Always this type
    Fixed(ElementType),
    /// Bound to the declaration's type parameter, restricted to this set
    Generic(TypeSet),
}

impl SlotType {
    /// Generic over every primitive (non-complex) type.
    pub const fn generic() -> Self {
        Self::Generic(TypeSet::PRIMITIVE)
    }

    pub const fn is_generic(self) -> bool {
        matches!(self, Self::Generic(_))
    }
}

impl fmt::Display for SlotType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(ty) => write!(f, "{}", ty),
            Self::Generic(set) => write!(f, "T in {}", set),
        }
    }
}

/// Explicit override of one slot's attributes.
///
/// Unset fields fall back to the capability defaults; set fields always win.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OperandDecl {
    pub name: String,
    pub ty: Option<SlotType>,
    pub mode: Option<AddressMode>,
    pub size: Option<SizeExpr>,
    pub mutability: Option<Mutability>,
}

impl OperandDecl {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn fixed(mut self, ty: ElementType) -> Self {
        self.ty = Some(SlotType::Fixed(ty));
        self
    }

    pub fn generic(mut self, domain: TypeSet) -> Self {
        self.ty = Some(SlotType::Generic(domain));
        self
    }

    pub fn mode(mut self, mode: AddressMode) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn size(mut self, size: SizeExpr) -> Self {
        self.size = Some(size);
        self
    }

    pub fn mutability(mut self, mutability: Mutability) -> Self {
        self.mutability = Some(mutability);
        self
    }
}

/// Addressing of a resolved slot before expansion.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SlotMode {
    /// Fixed by policy, result shape, or explicit override
    Pinned(AddressMode),
    /// Ranges over [`AddressMode::VARYING`] during expansion
    Varying,
}

/// Part a slot plays in the routine scaffolding.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SlotRole {
    /// Ordinary data operand
    Data,
    /// Runtime block stride of a membership operation
    Stride,
    /// Storage handle forwarded to the capacity-growth primitive
    Storage,
    /// Monotone failure predicate
    Predicate,
}

/// A slot with every attribute resolved.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResolvedSlot {
    pub id: SlotId,
    pub name: String,
    pub ty: SlotType,
    pub mode: SlotMode,
    pub size: SizeExpr,
    pub mutability: Mutability,
    pub role: SlotRole,
}

impl ResolvedSlot {
    pub fn is_input(&self) -> bool {
        self.mutability == Mutability::Input
    }

    pub fn is_error_flag(&self) -> bool {
        self.role == SlotRole::Predicate
    }

    /// Modes this slot takes during expansion.
    pub fn candidate_modes(&self) -> &'static [AddressMode] {
        match self.mode {
            SlotMode::Pinned(AddressMode::Scalar) => &[AddressMode::Scalar],
            SlotMode::Pinned(AddressMode::Array) => &[AddressMode::Array],
            SlotMode::Pinned(AddressMode::Constant) => &[AddressMode::Constant],
            SlotMode::Pinned(AddressMode::Resizable) => &[AddressMode::Resizable],
            SlotMode::Varying => &AddressMode::VARYING,
        }
    }
}
