//! Operand addressing axes.
//!
//! Every operand slot of a specialized routine is bound to exactly one
//! [`AddressMode`]. The mode decides how the slot surfaces at the routine
//! boundary:
//!
//! | Mode | Mnemonic | Surface |
//! |------|----------|---------|
//! | [`AddressMode::Scalar`] | `SCA` | one value, reused across iterations |
//! | [`AddressMode::Array`] | `ARR` | base pointer + element count |
//! | [`AddressMode::Constant`] | `CON` | plain literal, never data dependent |
//! | [`AddressMode::Resizable`] | `DYN` | base pointer + externally owned length cell |

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::types::UnknownName;

/// How an operand's data is laid out.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum AddressMode {
    Scalar,
    Array,
    Constant,
    Resizable,
}

impl AddressMode {
    /// Every recognized mode.
    pub const ALL: [AddressMode; 4] = [
        Self::Scalar,
        Self::Array,
        Self::Constant,
        Self::Resizable,
    ];

    /// Modes a slot ranges over when the addressing policy lets it vary.
    pub const VARYING: [AddressMode; 2] = [Self::Scalar, Self::Array];

    /// Get the mnemonic as a static string.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Scalar => "SCA",
            Self::Array => "ARR",
            Self::Constant => "CON",
            Self::Resizable => "DYN",
        }
    }

    /// Whether the slot surfaces as base pointer + count.
    pub const fn is_sequence(self) -> bool {
        matches!(self, Self::Array | Self::Resizable)
    }
}

impl fmt::Display for AddressMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

impl FromStr for AddressMode {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|mode| mode.name() == s)
            .ok_or_else(|| UnknownName {
                axis: "addressing mode",
                name: s.to_string(),
            })
    }
}

/// Data direction of an operand slot.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Mutability {
    Input,
    Output,
    /// Read and written by the routine (predicate operands, growable results)
    InOut,
}

impl Mutability {
    pub const fn is_written(self) -> bool {
        !matches!(self, Self::Input)
    }
}

/// 1-based positional index of an operand slot.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct SlotId(pub u8);

impl SlotId {
    /// Zero-based position in a slot list.
    pub const fn position(self) -> usize {
        (self.0 as usize).saturating_sub(1)
    }

    pub const fn from_position(position: usize) -> Self {
        Self(position as u8 + 1)
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Element count of an operand, as declared.
///
/// Counts are either literal or taken from another slot's runtime count.
/// References are symbolic until synthesis resolves them to a [`SlotId`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SizeExpr {
    Literal(u32),
    CountOf(String),
}

impl SizeExpr {
    pub fn count_of(slot: impl Into<String>) -> Self {
        Self::CountOf(slot.into())
    }
}

impl fmt::Display for SizeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(n) => write!(f, "{}", n),
            Self::CountOf(slot) => write!(f, "{}_count", slot),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_mnemonics_round_trip() {
        for mode in AddressMode::ALL {
            assert_eq!(mode.name().parse::<AddressMode>(), Ok(mode));
        }
        assert!("VAR".parse::<AddressMode>().is_err());
    }

    #[test]
    fn test_slot_positions() {
        assert_eq!(SlotId(1).position(), 0);
        assert_eq!(SlotId::from_position(3), SlotId(4));
    }

    #[test]
    fn test_size_display() {
        assert_eq!(SizeExpr::count_of("op1").to_string(), "op1_count");
        assert_eq!(SizeExpr::Literal(2).to_string(), "2");
    }
}
