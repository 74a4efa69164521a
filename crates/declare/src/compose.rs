//! Capability composition.
//!
//! Merges a declaration's ordered capability list into one immutable
//! [`ResolvedDefaults`] record.
//!
//! # Merge Rules
//!
//! 1. Capabilities are folded left to right; a later capability overrides an
//!    earlier one on the same axis (arity, addressing, result, combine step).
//! 2. Constraints, hints, and the error policy accumulate.
//! 3. Slot defaults are derived from the merged policies, then explicit
//!    per-slot overrides from the declaration are applied. Overrides always
//!    win.
//! 4. The resulting record is checked for conflicts and illegal shapes. Any
//!    failure is a [`BuildError`] naming the declaration and the offending
//!    slot.
//!
//! # Slot Layout
//!
//! | Slots | Names | Source |
//! |-------|-------|--------|
//! | inputs | `op1..opN` | arity |
//! | outputs | `res` (or `res1..resM`) | arity |
//! | predicate | `pred` (trailing) | `MayEmitError` |
//!
//! Composition is a pure function: the same inputs always produce an equal
//! record.

use opforge_foundation::{
    AddressMode, AddressingPolicy, Arity, BuildError, Capability, CombineOp, Constraint,
    ElementType, Hint, Mutability, Result, ResultPolicy, SizeExpr, SlotId, TypeSet,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::operand::{OperandDecl, ResolvedSlot, SlotMode, SlotRole, SlotType};
use crate::unit::UnitComputation;

/// Name of the trailing predicate slot added by `MayEmitError`.
pub const PREDICATE_SLOT: &str = "pred";

/// Effective defaults of one declaration after composition.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResolvedDefaults {
    pub arity: Arity,
    pub addressing: AddressingPolicy,
    pub result: ResultPolicy,
    /// Generic slots exclude integers
    pub float_only: bool,
    /// Array operands are sized by the primary input
    pub fixed_size: bool,
    /// A parallel entry point is generated beside the serial routine
    pub parallel: bool,
    /// Advisory cost metadata
    pub slow: bool,
    pub combine: Option<CombineOp>,
    pub error_flag: bool,
    /// Domain of the shared type parameter; empty when no slot is generic
    pub type_domain: TypeSet,
    pub slots: Vec<ResolvedSlot>,
}

impl ResolvedDefaults {
    pub fn slot(&self, name: &str) -> Option<&ResolvedSlot> {
        self.slots.iter().find(|s| s.name == name)
    }

    pub fn slot_by_id(&self, id: SlotId) -> Option<&ResolvedSlot> {
        self.slots.get(id.position())
    }

    pub fn inputs(&self) -> impl Iterator<Item = &ResolvedSlot> {
        self.slots.iter().filter(|s| s.is_input())
    }

    /// First input slot; drives the loop bound and parallel split.
    pub fn primary(&self) -> Option<&ResolvedSlot> {
        self.inputs().next()
    }

    /// The result slot (first written, non-predicate slot).
    pub fn output(&self) -> Option<&ResolvedSlot> {
        self.slots
            .iter()
            .find(|s| s.mutability.is_written() && s.role != SlotRole::Predicate)
    }

    pub fn has_generic_slots(&self) -> bool {
        self.slots.iter().any(|s| s.ty.is_generic())
    }
}

/// Capability-level settings after the left-to-right fold.
#[derive(Debug, Default)]
struct Merged {
    arity: Option<Arity>,
    addressing: Option<AddressingPolicy>,
    result: Option<ResultPolicy>,
    float_only: bool,
    fixed_size: bool,
    parallel: bool,
    slow: bool,
    error_flag: bool,
    combine: Option<CombineOp>,
}

fn merge(capabilities: &[Capability]) -> Merged {
    let mut merged = Merged::default();
    for cap in capabilities {
        let c = cap.contribution();
        if c.arity.is_some() {
            merged.arity = c.arity;
        }
        if c.addressing.is_some() {
            merged.addressing = c.addressing;
        }
        if c.result.is_some() {
            merged.result = c.result;
        }
        if c.combine.is_some() {
            merged.combine = c.combine;
        }
        match c.constraint {
            Some(Constraint::FloatOnly) => merged.float_only = true,
            Some(Constraint::FixedSize) => merged.fixed_size = true,
            None => {}
        }
        match c.hint {
            Some(Hint::Parallel) => merged.parallel = true,
            Some(Hint::Slow) => merged.slow = true,
            None => {}
        }
        merged.error_flag |= c.error_flag;
        trace!(capability = %cap, "merged capability");
    }
    merged
}

fn output_names(count: u8) -> Vec<String> {
    if count == 1 {
        vec!["res".to_string()]
    } else {
        (1..=count).map(|i| format!("res{}", i)).collect()
    }
}

/// Compose capabilities, overrides, and body shape into resolved defaults.
pub fn compose(
    operation: &str,
    capabilities: &[Capability],
    overrides: &[OperandDecl],
    unit: &UnitComputation,
) -> Result<ResolvedDefaults> {
    let merged = merge(capabilities);

    let arity = merged
        .arity
        .ok_or_else(|| BuildError::illegal(operation, "op1", "no arity capability declared"))?;
    let addressing = merged.addressing.unwrap_or(AddressingPolicy::AllScalar);
    let result = merged.result.unwrap_or(ResultPolicy::Elementwise);

    let mut slots = default_slots(arity, addressing, result, merged.error_flag);

    for decl in overrides {
        let slot = slots
            .iter_mut()
            .find(|s| s.name == decl.name)
            .ok_or_else(|| {
                BuildError::resolution(operation, &decl.name, "override names no slot")
            })?;
        apply_override(slot, decl);
    }

    for slot in &mut slots {
        if overrides
            .iter()
            .any(|o| o.name == slot.name && o.size.is_some())
        {
            continue;
        }
        slot.size = default_size(slot, merged.fixed_size);
    }

    if result == ResultPolicy::Growable {
        let storage = slots
            .iter_mut()
            .find(|s| s.is_input() && s.mode == SlotMode::Pinned(AddressMode::Constant))
            .ok_or_else(|| {
                BuildError::illegal(
                    operation,
                    "res",
                    "ResizeResult needs a CON storage-handle input",
                )
            })?;
        storage.role = SlotRole::Storage;
    }

    let resolved = ResolvedDefaults {
        arity,
        addressing,
        result,
        float_only: merged.float_only,
        fixed_size: merged.fixed_size,
        parallel: merged.parallel,
        slow: merged.slow,
        combine: merged.combine,
        error_flag: merged.error_flag,
        type_domain: type_domain(operation, &slots, merged.float_only)?,
        slots,
    };

    check_conflicts(operation, &resolved)?;
    check_pinned_modes(operation, &resolved)?;
    check_shape(operation, &resolved, unit)?;

    debug!(
        operation,
        ?arity,
        ?addressing,
        ?result,
        slots = resolved.slots.len(),
        domain = %resolved.type_domain,
        "composed capabilities"
    );
    Ok(resolved)
}

fn default_slots(
    arity: Arity,
    addressing: AddressingPolicy,
    result: ResultPolicy,
    error_flag: bool,
) -> Vec<ResolvedSlot> {
    let policy_mode = match addressing {
        AddressingPolicy::AllArray => SlotMode::Pinned(AddressMode::Array),
        AddressingPolicy::AllScalar => SlotMode::Pinned(AddressMode::Scalar),
        AddressingPolicy::Multiple => SlotMode::Varying,
    };

    let mut slots = Vec::new();
    for i in 0..arity.inputs {
        let stride = result == ResultPolicy::Membership && i == 2;
        slots.push(ResolvedSlot {
            id: SlotId::from_position(slots.len()),
            name: format!("op{}", i + 1),
            ty: if stride {
                SlotType::Fixed(ElementType::U32)
            } else {
                SlotType::generic()
            },
            mode: if stride {
                SlotMode::Pinned(AddressMode::Scalar)
            } else {
                policy_mode
            },
            size: SizeExpr::Literal(1),
            mutability: Mutability::Input,
            role: if stride { SlotRole::Stride } else { SlotRole::Data },
        });
    }

    for name in output_names(arity.outputs) {
        let (mode, mutability) = match result {
            ResultPolicy::Reduction => (SlotMode::Pinned(AddressMode::Scalar), Mutability::Output),
            ResultPolicy::Growable => (SlotMode::Pinned(AddressMode::Resizable), Mutability::InOut),
            ResultPolicy::Elementwise | ResultPolicy::Membership => {
                (policy_mode, Mutability::Output)
            }
        };
        slots.push(ResolvedSlot {
            id: SlotId::from_position(slots.len()),
            name,
            ty: SlotType::generic(),
            mode,
            size: SizeExpr::Literal(1),
            mutability,
            role: SlotRole::Data,
        });
    }

    if error_flag {
        slots.push(ResolvedSlot {
            id: SlotId::from_position(slots.len()),
            name: PREDICATE_SLOT.to_string(),
            ty: SlotType::Fixed(ElementType::S32),
            mode: SlotMode::Pinned(AddressMode::Scalar),
            size: SizeExpr::Literal(1),
            mutability: Mutability::InOut,
            role: SlotRole::Predicate,
        });
    }

    slots
}

fn apply_override(slot: &mut ResolvedSlot, decl: &OperandDecl) {
    if let Some(ty) = decl.ty {
        slot.ty = ty;
    }
    if let Some(mode) = decl.mode {
        slot.mode = SlotMode::Pinned(mode);
    }
    if let Some(size) = &decl.size {
        slot.size = size.clone();
    }
    if let Some(mutability) = decl.mutability {
        slot.mutability = mutability;
    }
}

fn default_size(slot: &ResolvedSlot, fixed_size: bool) -> SizeExpr {
    match slot.mode {
        SlotMode::Pinned(AddressMode::Scalar | AddressMode::Constant) => SizeExpr::Literal(1),
        SlotMode::Pinned(AddressMode::Resizable) => SizeExpr::count_of(&slot.name),
        SlotMode::Pinned(AddressMode::Array) | SlotMode::Varying => {
            if fixed_size {
                SizeExpr::count_of("op1")
            } else {
                SizeExpr::count_of(&slot.name)
            }
        }
    }
}

fn type_domain(operation: &str, slots: &[ResolvedSlot], float_only: bool) -> Result<TypeSet> {
    let mut domain = TypeSet::all();
    let mut first_generic = None;
    for slot in slots {
        if let SlotType::Generic(set) = slot.ty {
            if slot.mode == SlotMode::Pinned(AddressMode::Constant) {
                return Err(BuildError::illegal(
                    operation,
                    &slot.name,
                    "CON slots never enter type enumeration and must declare a fixed type",
                ));
            }
            domain = domain.intersection(set);
            if first_generic.is_none() {
                first_generic = Some(slot.name.as_str());
            }
        }
    }

    let Some(first) = first_generic else {
        return Ok(TypeSet::empty());
    };

    if float_only {
        domain = domain.difference(TypeSet::INTEGER);
    }
    if domain.is_empty() {
        return Err(BuildError::illegal(
            operation,
            first,
            "no catalog type satisfies the slot domains and constraints",
        ));
    }
    Ok(domain)
}

fn check_conflicts(operation: &str, resolved: &ResolvedDefaults) -> Result<()> {
    let output = resolved.output().map_or("res", |s| s.name.as_str());

    if resolved.float_only {
        for slot in &resolved.slots {
            if slot.role != SlotRole::Data {
                continue;
            }
            if let SlotType::Fixed(ty) = slot.ty {
                if ty.is_integer() {
                    return Err(BuildError::conflict(
                        operation,
                        &slot.name,
                        format!("FloatingPointOnly excludes fixed integer type {}", ty),
                    ));
                }
            }
        }
    }

    match resolved.result {
        ResultPolicy::Growable if resolved.parallel => {
            return Err(BuildError::conflict(
                operation,
                output,
                "Multithreaded cannot split concurrent growth of shared storage (ResizeResult)",
            ));
        }
        ResultPolicy::Growable if resolved.fixed_size => {
            return Err(BuildError::conflict(
                operation,
                output,
                "FixedOperandSize forbids the resizable output of ResizeResult",
            ));
        }
        ResultPolicy::Reduction if resolved.parallel && resolved.combine.is_none() => {
            return Err(BuildError::conflict(
                operation,
                output,
                "Multithreaded reduction (UnitResult) needs a Combine step for partials",
            ));
        }
        ResultPolicy::Membership if resolved.addressing == AddressingPolicy::AllScalar => {
            let primary = resolved.primary().map_or("op1", |s| s.name.as_str());
            return Err(BuildError::conflict(
                operation,
                primary,
                "ArrayComparison needs array operands, ScalarAddressMode forbids them",
            ));
        }
        _ => {}
    }

    if resolved.combine.is_some() && resolved.result != ResultPolicy::Reduction {
        return Err(BuildError::conflict(
            operation,
            output,
            "Combine applies only to UnitResult reductions",
        ));
    }

    Ok(())
}

/// Overrides may not move a slot off the mode its role or the result
/// policy fixes.
fn check_pinned_modes(operation: &str, resolved: &ResolvedDefaults) -> Result<()> {
    for slot in &resolved.slots {
        let required = match slot.role {
            SlotRole::Predicate | SlotRole::Stride => AddressMode::Scalar,
            SlotRole::Data if !slot.is_input() => match resolved.result {
                ResultPolicy::Reduction => AddressMode::Scalar,
                ResultPolicy::Growable => AddressMode::Resizable,
                ResultPolicy::Elementwise | ResultPolicy::Membership => continue,
            },
            SlotRole::Data | SlotRole::Storage => continue,
        };
        if slot.mode != SlotMode::Pinned(required) {
            return Err(BuildError::illegal(
                operation,
                &slot.name,
                format!("{:?} slot must be {}", slot.role, required),
            ));
        }
    }
    Ok(())
}

fn check_shape(operation: &str, resolved: &ResolvedDefaults, unit: &UnitComputation) -> Result<()> {
    let output = resolved.output().map_or("res", |s| s.name.as_str());

    let expected = match resolved.result {
        ResultPolicy::Elementwise | ResultPolicy::Growable => "statements",
        ResultPolicy::Reduction => "fold",
        ResultPolicy::Membership => "match",
    };
    if unit.shape() != expected {
        return Err(BuildError::illegal(
            operation,
            output,
            format!(
                "{:?} result needs a {} body, found {}",
                resolved.result,
                expected,
                unit.shape()
            ),
        ));
    }

    if resolved.arity.outputs != 1 && resolved.result != ResultPolicy::Elementwise {
        return Err(BuildError::illegal(
            operation,
            output,
            format!("{:?} result needs exactly one output", resolved.result),
        ));
    }

    if resolved.result == ResultPolicy::Membership && resolved.arity.inputs < 3 {
        return Err(BuildError::illegal(
            operation,
            output,
            "ArrayComparison needs primary, secondary, and stride inputs",
        ));
    }

    Ok(())
}
