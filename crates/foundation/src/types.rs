//! Element type catalog.
//!
//! The VM supports a closed set of element types: fixed-width signed and
//! unsigned integers, single and double precision floats, and two-component
//! complex numbers built from either float width. The catalog never grows at
//! runtime; every specialized routine binds its generic type parameter to one
//! of these entries.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Element type of an operand.
///
/// Names follow the VM's mnemonic convention: `S` for signed, `U` for
/// unsigned, `F` for float, `C` for complex, followed by the total width in
/// bits.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[repr(u8)]
pub enum ElementType {
    S08 = 0,
    U08 = 1,
    S16 = 2,
    U16 = 3,
    S32 = 4,
    U32 = 5,
    S64 = 6,
    U64 = 7,
    F32 = 8,
    F64 = 9,
    /// Complex number with `F32` components
    C64 = 10,
    /// Complex number with `F64` components
    C128 = 11,
}

impl ElementType {
    /// Total number of catalog entries
    pub const COUNT: usize = 12;

    /// Every catalog entry in discriminant order.
    pub const ALL: [ElementType; Self::COUNT] = [
        Self::S08,
        Self::U08,
        Self::S16,
        Self::U16,
        Self::S32,
        Self::U32,
        Self::S64,
        Self::U64,
        Self::F32,
        Self::F64,
        Self::C64,
        Self::C128,
    ];

    /// Get the mnemonic name as a static string.
    pub const fn name(self) -> &'static str {
        match self {
            Self::S08 => "S08",
            Self::U08 => "U08",
            Self::S16 => "S16",
            Self::U16 => "U16",
            Self::S32 => "S32",
            Self::U32 => "U32",
            Self::S64 => "S64",
            Self::U64 => "U64",
            Self::F32 => "F32",
            Self::F64 => "F64",
            Self::C64 => "C64",
            Self::C128 => "C128",
        }
    }

    /// Native scalar type used for one component of this element.
    pub const fn native_name(self) -> &'static str {
        match self {
            Self::S08 => "i8",
            Self::U08 => "u8",
            Self::S16 => "i16",
            Self::U16 => "u16",
            Self::S32 => "i32",
            Self::U32 => "u32",
            Self::S64 => "i64",
            Self::U64 => "u64",
            Self::F32 | Self::C64 => "f32",
            Self::F64 | Self::C128 => "f64",
        }
    }

    /// Width in bits of a single component.
    pub const fn component_width(self) -> u32 {
        match self {
            Self::S08 | Self::U08 => 8,
            Self::S16 | Self::U16 => 16,
            Self::S32 | Self::U32 | Self::F32 | Self::C64 => 32,
            Self::S64 | Self::U64 | Self::F64 | Self::C128 => 64,
        }
    }

    /// Number of scalar components in one element (2 for complex).
    pub const fn components(self) -> usize {
        if self.is_complex() { 2 } else { 1 }
    }

    pub const fn is_integer(self) -> bool {
        (self as u8) < (Self::F32 as u8)
    }

    pub const fn is_signed(self) -> bool {
        matches!(self, Self::S08 | Self::S16 | Self::S32 | Self::S64)
    }

    pub const fn is_unsigned(self) -> bool {
        matches!(self, Self::U08 | Self::U16 | Self::U32 | Self::U64)
    }

    /// Real floating point (not complex).
    pub const fn is_float(self) -> bool {
        matches!(self, Self::F32 | Self::F64)
    }

    pub const fn is_complex(self) -> bool {
        matches!(self, Self::C64 | Self::C128)
    }

    /// Type of a single component: the float width for complex types,
    /// the type itself otherwise.
    pub const fn component_type(self) -> Self {
        match self {
            Self::C64 => Self::F32,
            Self::C128 => Self::F64,
            other => other,
        }
    }

    /// Signed type of the same width.
    ///
    /// Strict-order comparisons and the block comparator family are keyed by
    /// signed types; floats and signed integers map to themselves.
    pub const fn signed_counterpart(self) -> Self {
        match self {
            Self::U08 => Self::S08,
            Self::U16 => Self::S16,
            Self::U32 => Self::S32,
            Self::U64 => Self::S64,
            other => other,
        }
    }

    /// Whether this type keys a member of the block comparator family.
    pub const fn has_block_comparator(self) -> bool {
        self.is_signed() || self.is_float()
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

/// Error returned when parsing an unrecognized axis name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized {axis} `{name}`")]
pub struct UnknownName {
    /// Which configuration axis was being parsed
    pub axis: &'static str,
    /// The rejected input
    pub name: String,
}

impl FromStr for ElementType {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|ty| ty.name() == s)
            .ok_or_else(|| UnknownName {
                axis: "element type",
                name: s.to_string(),
            })
    }
}

/// Bitset of element types (compact representation).
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct TypeSet(u16);

impl TypeSet {
    /// Signed and unsigned integers.
    pub const INTEGER: Self = Self(0b0000_1111_1111);
    /// Real floats.
    pub const FLOAT: Self = Self(0b0011_0000_0000);
    /// Complex types.
    pub const COMPLEX: Self = Self(0b1100_0000_0000);
    /// Every non-compound type; the default domain of a generic slot.
    pub const PRIMITIVE: Self = Self(Self::INTEGER.0 | Self::FLOAT.0);

    /// Create an empty type set.
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Create a type set containing the whole catalog.
    pub const fn all() -> Self {
        Self((1 << ElementType::COUNT) - 1)
    }

    /// Create a type set with a single type.
    pub const fn single(ty: ElementType) -> Self {
        Self(1 << ty as u16)
    }

    /// Add a type to this set.
    pub const fn with(self, ty: ElementType) -> Self {
        Self(self.0 | (1 << ty as u16))
    }

    /// Remove a type from this set.
    pub const fn without(self, ty: ElementType) -> Self {
        Self(self.0 & !(1 << ty as u16))
    }

    /// Check if this set contains a type.
    pub const fn contains(self, ty: ElementType) -> bool {
        (self.0 & (1 << ty as u16)) != 0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    pub const fn intersection(self, other: Self) -> Self {
        Self(self.0 & other.0)
    }

    /// Remove every member of `other` from this set.
    pub const fn difference(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }

    /// Iterate members in catalog order.
    pub fn iter(self) -> impl Iterator<Item = ElementType> {
        ElementType::ALL
            .into_iter()
            .filter(move |ty| self.contains(*ty))
    }
}

impl FromIterator<ElementType> for TypeSet {
    fn from_iter<I: IntoIterator<Item = ElementType>>(iter: I) -> Self {
        iter.into_iter().fold(Self::empty(), Self::with)
    }
}

impl fmt::Display for TypeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, ty) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", ty)?;
        }
        f.write_str("}")
    }
}
