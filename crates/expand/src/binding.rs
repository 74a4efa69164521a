//! Binding enumeration.
//!
//! A [`Binding`] assigns one concrete element type and one concrete
//! addressing mode to every slot of a declaration. [`enumerate`] is a pure
//! function from a composed declaration to the finite list of legal bindings:
//!
//! - fixed slots contribute a singleton type
//! - generic slots share the declaration's type parameter, which ranges over
//!   the resolved type domain
//! - CONSTANT slots keep their declared type and never enter type enumeration
//! - pinned slots contribute a singleton mode; varying slots range over
//!   scalar and array, and the cross product is taken
//!
//! Bindings come out ordered by type parameter (catalog order), then by
//! slot modes with the last slot varying fastest.

use opforge_declare::{OperationDecl, ResolvedDefaults, SlotType};
use opforge_foundation::{AddressMode, ElementType, SlotId};
use serde::{Deserialize, Serialize};

/// Concrete type and mode of one slot.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SlotBinding {
    pub slot: SlotId,
    pub ty: ElementType,
    pub mode: AddressMode,
}

/// One legal (type, mode) combination for a declaration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Binding {
    /// Value of the shared type parameter, if any slot is generic
    pub type_param: Option<ElementType>,
    /// One entry per slot, in slot order
    pub slots: Vec<SlotBinding>,
}

impl Binding {
    pub fn get(&self, slot: SlotId) -> Option<&SlotBinding> {
        self.slots.get(slot.position())
    }

    pub fn mode(&self, slot: SlotId) -> Option<AddressMode> {
        self.get(slot).map(|b| b.mode)
    }

    pub fn ty(&self, slot: SlotId) -> Option<ElementType> {
        self.get(slot).map(|b| b.ty)
    }

    /// Slot whose element count bounds the iteration.
    ///
    /// The first array input; failing that the first array output; `None`
    /// when every slot is scalar and the routine runs a single pass.
    pub fn loop_bound(&self, resolved: &ResolvedDefaults) -> Option<SlotId> {
        let array = |written: bool| {
            resolved
                .slots
                .iter()
                .filter(|s| s.mutability.is_written() == written)
                .find(|s| self.mode(s.id) == Some(AddressMode::Array))
                .map(|s| s.id)
        };
        array(false).or_else(|| array(true))
    }
}

/// Enumerate every legal binding of a declaration.
pub fn enumerate(decl: &OperationDecl) -> Vec<Binding> {
    let resolved = decl.resolved();

    let type_params: Vec<Option<ElementType>> = if resolved.has_generic_slots() {
        resolved.type_domain.iter().map(Some).collect()
    } else {
        vec![None]
    };

    let mut bindings = Vec::new();
    for type_param in type_params {
        let mut partial: Vec<Vec<SlotBinding>> = vec![Vec::with_capacity(resolved.slots.len())];
        for slot in &resolved.slots {
            let ty = match (slot.ty, type_param) {
                (SlotType::Fixed(ty), _) => ty,
                (SlotType::Generic(_), Some(param)) => param,
                (SlotType::Generic(_), None) => unreachable!("generic slot without type parameter"),
            };
            let modes = slot.candidate_modes();
            partial = partial
                .into_iter()
                .flat_map(|prefix| {
                    modes.iter().map(move |mode| {
                        let mut next = prefix.clone();
                        next.push(SlotBinding {
                            slot: slot.id,
                            ty,
                            mode: *mode,
                        });
                        next
                    })
                })
                .collect();
        }
        bindings.extend(partial.into_iter().map(|slots| Binding { type_param, slots }));
    }
    bindings
}

#[cfg(test)]
mod tests {
    use super::*;
    use opforge_declare::{Expr, OperandDecl, Stmt, UnitComputation};
    use opforge_foundation::{Capability, TypeSet};
    use std::collections::HashSet;

    fn restricted_unary() -> OperationDecl {
        let domain: TypeSet = [ElementType::U32, ElementType::F32].into_iter().collect();
        OperationDecl::builder("copy")
            .capabilities([Capability::MultipleAddressMode, Capability::UnaryOperator])
            .operand(OperandDecl::new("op1").generic(domain))
            .unit(UnitComputation::Statements(vec![Stmt::store(
                "res",
                Expr::slot("op1"),
            )]))
            .build()
            .unwrap()
    }

    #[test]
    fn test_cross_product_count() {
        let bindings = enumerate(&restricted_unary());
        assert_eq!(bindings.len(), 8);
        let unique: HashSet<_> = bindings.iter().collect();
        assert_eq!(unique.len(), 8);
    }

    #[test]
    fn test_order_last_slot_fastest() {
        let bindings = enumerate(&restricted_unary());
        let modes: Vec<_> = bindings[..4]
            .iter()
            .map(|b| (b.slots[0].mode, b.slots[1].mode))
            .collect();
        assert_eq!(
            modes,
            vec![
                (AddressMode::Scalar, AddressMode::Scalar),
                (AddressMode::Scalar, AddressMode::Array),
                (AddressMode::Array, AddressMode::Scalar),
                (AddressMode::Array, AddressMode::Array),
            ]
        );
        assert!(bindings[..4].iter().all(|b| b.type_param == Some(ElementType::U32)));
        assert!(bindings[4..].iter().all(|b| b.type_param == Some(ElementType::F32)));
    }

    #[test]
    fn test_fixed_and_constant_slots_are_singletons() {
        let decl = OperationDecl::builder("concat")
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
            .unwrap();

        let bindings = enumerate(&decl);
        assert_eq!(bindings.len(), 2);
        for b in &bindings {
            assert_eq!(b.type_param, None);
            assert_eq!(b.slots[1].mode, AddressMode::Constant);
            assert_eq!(b.slots[2].mode, AddressMode::Resizable);
        }
    }

    #[test]
    fn test_loop_bound_prefers_array_input() {
        let decl = restricted_unary();
        let resolved = decl.resolved();
        let bindings = enumerate(&decl);
        // (SCA, SCA), (SCA, ARR), (ARR, SCA), (ARR, ARR)
        assert_eq!(bindings[0].loop_bound(resolved), None);
        assert_eq!(bindings[1].loop_bound(resolved), Some(SlotId(2)));
        assert_eq!(bindings[2].loop_bound(resolved), Some(SlotId(1)));
        assert_eq!(bindings[3].loop_bound(resolved), Some(SlotId(1)));
    }
}
