//! Capabilities: named, composable bundles of operation defaults.
//!
//! An operation declaration lists capabilities in order. Each capability
//! contributes defaults along one or more axes (arity, addressing policy,
//! result policy, type constraints, execution hints, error policy, combine
//! step). Composition in `opforge-declare` merges the contributions left to
//! right; this module only describes what each capability contributes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::types::UnknownName;

/// Number of input and output slots fixed by an arity capability.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Arity {
    pub inputs: u8,
    pub outputs: u8,
}

impl Arity {
    pub const fn new(inputs: u8, outputs: u8) -> Self {
        Self { inputs, outputs }
    }
}

/// How slot addressing modes are chosen during expansion.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum AddressingPolicy {
    /// Every slot is an array
    AllArray,
    /// Every slot is a scalar
    AllScalar,
    /// Each slot ranges independently over scalar and array (broadcast)
    Multiple,
}

/// Shape of the routine's result.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum ResultPolicy {
    /// One output element per iteration
    Elementwise,
    /// Full-count accumulation into a scalar output
    Reduction,
    /// Output appended to resizable storage
    Growable,
    /// Primary elements found in a secondary array, in primary order
    Membership,
}

/// Type constraint asserted by a capability.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Constraint {
    /// Generic slots exclude integer types
    FloatOnly,
    /// Array operands are sized by the primary input; no resizable operands
    FixedSize,
}

/// Execution hint attached to generated routines.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Hint {
    /// Safe to split over disjoint index ranges
    Parallel,
    /// Advisory cost metadata; never changes routine shape
    Slow,
}

/// Binary step that merges two partial accumulators.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum CombineOp {
    Add,
    Mul,
    Min,
    Max,
}

impl CombineOp {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Mul => "mul",
            Self::Min => "min",
            Self::Max => "max",
        }
    }
}

/// A named capability.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Capability {
    // === Arity ===
    UnaryOperator,
    BinaryOperator,
    TernaryOperator,
    QuaternaryOperator,

    // === Addressing ===
    ScalarAddressMode,
    ArrayAddressMode,
    MultipleAddressMode,

    // === Result ===
    UnitResult,
    ResizeResult,
    ArrayComparison,

    // === Constraints ===
    FloatingPointOnly,
    FixedOperandSize,

    // === Hints ===
    Multithreaded,
    Slow,

    // === Error policy ===
    MayEmitError,

    // === Reduction combine step ===
    Combine(CombineOp),
}

/// Defaults contributed by a single capability.
///
/// `None` means the capability does not touch that axis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Contribution {
    pub arity: Option<Arity>,
    pub addressing: Option<AddressingPolicy>,
    pub result: Option<ResultPolicy>,
    pub constraint: Option<Constraint>,
    pub hint: Option<Hint>,
    pub error_flag: bool,
    pub combine: Option<CombineOp>,
}

impl Capability {
    /// Every payload-free capability, in declaration order.
    pub const NAMED: [Capability; 15] = [
        Self::UnaryOperator,
        Self::BinaryOperator,
        Self::TernaryOperator,
        Self::QuaternaryOperator,
        Self::ScalarAddressMode,
        Self::ArrayAddressMode,
        Self::MultipleAddressMode,
        Self::UnitResult,
        Self::ResizeResult,
        Self::ArrayComparison,
        Self::FloatingPointOnly,
        Self::FixedOperandSize,
        Self::Multithreaded,
        Self::Slow,
        Self::MayEmitError,
    ];

    /// Get the capability name as a static string.
    ///
    /// `Combine` is rendered with its step by [`fmt::Display`].
    pub const fn name(self) -> &'static str {
        match self {
            Self::UnaryOperator => "UnaryOperator",
            Self::BinaryOperator => "BinaryOperator",
            Self::TernaryOperator => "TernaryOperator",
            Self::QuaternaryOperator => "QuaternaryOperator",
            Self::ScalarAddressMode => "ScalarAddressMode",
            Self::ArrayAddressMode => "ArrayAddressMode",
            Self::MultipleAddressMode => "MultipleAddressMode",
            Self::UnitResult => "UnitResult",
            Self::ResizeResult => "ResizeResult",
            Self::ArrayComparison => "ArrayComparison",
            Self::FloatingPointOnly => "FloatingPointOnly",
            Self::FixedOperandSize => "FixedOperandSize",
            Self::Multithreaded => "Multithreaded",
            Self::Slow => "Slow",
            Self::MayEmitError => "MayEmitError",
            Self::Combine(_) => "Combine",
        }
    }

    /// Defaults this capability contributes to composition.
    pub const fn contribution(self) -> Contribution {
        const NONE: Contribution = Contribution {
            arity: None,
            addressing: None,
            result: None,
            constraint: None,
            hint: None,
            error_flag: false,
            combine: None,
        };
        match self {
            Self::UnaryOperator => Contribution {
                arity: Some(Arity::new(1, 1)),
                ..NONE
            },
            Self::BinaryOperator => Contribution {
                arity: Some(Arity::new(2, 1)),
                ..NONE
            },
            Self::TernaryOperator => Contribution {
                arity: Some(Arity::new(3, 1)),
                ..NONE
            },
            Self::QuaternaryOperator => Contribution {
                arity: Some(Arity::new(4, 1)),
                ..NONE
            },
            Self::ScalarAddressMode => Contribution {
                addressing: Some(AddressingPolicy::AllScalar),
                ..NONE
            },
            Self::ArrayAddressMode => Contribution {
                addressing: Some(AddressingPolicy::AllArray),
                ..NONE
            },
            Self::MultipleAddressMode => Contribution {
                addressing: Some(AddressingPolicy::Multiple),
                ..NONE
            },
            Self::UnitResult => Contribution {
                result: Some(ResultPolicy::Reduction),
                ..NONE
            },
            Self::ResizeResult => Contribution {
                result: Some(ResultPolicy::Growable),
                ..NONE
            },
            Self::ArrayComparison => Contribution {
                result: Some(ResultPolicy::Membership),
                ..NONE
            },
            Self::FloatingPointOnly => Contribution {
                constraint: Some(Constraint::FloatOnly),
                ..NONE
            },
            Self::FixedOperandSize => Contribution {
                constraint: Some(Constraint::FixedSize),
                ..NONE
            },
            Self::Multithreaded => Contribution {
                hint: Some(Hint::Parallel),
                ..NONE
            },
            Self::Slow => Contribution {
                hint: Some(Hint::Slow),
                ..NONE
            },
            Self::MayEmitError => Contribution {
                error_flag: true,
                ..NONE
            },
            Self::Combine(op) => Contribution {
                combine: Some(op),
                ..NONE
            },
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Combine(op) => write!(f, "Combine({})", op.name()),
            other => f.write_str(other.name()),
        }
    }
}

impl FromStr for Capability {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unknown = || UnknownName {
            axis: "capability",
            name: s.to_string(),
        };

        if let Some(step) = s
            .strip_prefix("Combine(")
            .and_then(|rest| rest.strip_suffix(')'))
        {
            let op = match step {
                "add" => CombineOp::Add,
                "mul" => CombineOp::Mul,
                "min" => CombineOp::Min,
                "max" => CombineOp::Max,
                _ => return Err(unknown()),
            };
            return Ok(Self::Combine(op));
        }

        Self::NAMED
            .into_iter()
            .find(|cap| cap.name() == s)
            .ok_or_else(unknown)
    }
}
