//! Element values with width-faithful arithmetic.
//!
//! A [`Value`] holds one element in a representation wide enough for every
//! member of its type family. Every arithmetic result is narrowed back to
//! the element type it was computed at: integers wrap at their width and
//! `F32`/`C64` components are rounded to single precision after each step.

use opforge_foundation::{CombineOp, ElementType};
use opforge_synth::{BinaryOp, Intrinsic, Literal};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::error::{ExecError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Signed integers
    Int(i64),
    /// Unsigned integers
    UInt(u64),
    /// Real floats
    Float(f64),
    /// `(re, im)`
    Complex(f64, f64),
}

impl Default for Value {
    fn default() -> Self {
        Self::Int(0)
    }
}

fn wrap_signed(value: i64, bits: u32) -> i64 {
    let shift = 64 - bits;
    (value << shift) >> shift
}

fn wrap_unsigned(value: u64, bits: u32) -> u64 {
    if bits == 64 {
        value
    } else {
        value & ((1u64 << bits) - 1)
    }
}

fn round_float(value: f64, ty: ElementType) -> f64 {
    if ty.component_width() == 32 {
        value as f32 as f64
    } else {
        value
    }
}

impl Value {
    pub const TRUE: Self = Self::Int(1);
    pub const FALSE: Self = Self::Int(0);

    pub fn zero(ty: ElementType) -> Self {
        Self::from_literal(Literal::Int(0), ty)
    }

    pub fn from_literal(literal: Literal, ty: ElementType) -> Self {
        let raw = match literal {
            Literal::Int(i) => Self::Int(i),
            Literal::Float(f) => Self::Float(f),
            Literal::Bool(b) => Self::Int(i64::from(b)),
        };
        raw.cast(ty)
    }

    /// Convert into the representation of `ty`, narrowing to its width.
    pub fn cast(self, ty: ElementType) -> Self {
        if ty.is_complex() {
            let (re, im) = match self {
                Self::Complex(re, im) => (re, im),
                other => (other.as_f64(), 0.0),
            };
            return Self::Complex(round_float(re, ty), round_float(im, ty));
        }
        if ty.is_float() {
            return Self::Float(round_float(self.as_f64(), ty));
        }
        let bits = ty.component_width();
        let raw = match self {
            Self::Int(i) => i as u64,
            Self::UInt(u) => u,
            Self::Float(f) => float_to_bits(f, ty),
            Self::Complex(re, _) => float_to_bits(re, ty),
        };
        if ty.is_signed() {
            Self::Int(wrap_signed(raw as i64, bits))
        } else {
            Self::UInt(wrap_unsigned(raw, bits))
        }
    }

    /// Real part (or the value itself) as a float.
    pub fn as_f64(self) -> f64 {
        match self {
            Self::Int(i) => i as f64,
            Self::UInt(u) => u as f64,
            Self::Float(f) => f,
            Self::Complex(re, _) => re,
        }
    }

    /// Non-negative integer view, used for counts and strides.
    pub fn as_index(self) -> u64 {
        match self {
            Self::Int(i) => i.max(0) as u64,
            Self::UInt(u) => u,
            Self::Float(f) => f.max(0.0) as u64,
            Self::Complex(re, _) => re.max(0.0) as u64,
        }
    }

    pub fn is_truthy(self) -> bool {
        match self {
            Self::Int(i) => i != 0,
            Self::UInt(u) => u != 0,
            Self::Float(f) => f != 0.0,
            Self::Complex(re, im) => re != 0.0 || im != 0.0,
        }
    }

    pub fn truth(holds: bool) -> Self {
        if holds { Self::TRUE } else { Self::FALSE }
    }

    /// One component of a complex value; the value itself for index 0 of
    /// a real value.
    pub fn component(self, index: u8) -> Self {
        match (self, index) {
            (Self::Complex(re, _), 0) => Self::Float(re),
            (Self::Complex(_, im), _) => Self::Float(im),
            (other, _) => other,
        }
    }

    pub fn with_component(self, index: u8, part: Self) -> Self {
        match self {
            Self::Complex(re, im) => {
                if index == 0 {
                    Self::Complex(part.as_f64(), im)
                } else {
                    Self::Complex(re, part.as_f64())
                }
            }
            _ => part,
        }
    }

    /// Compare two values already cast to `ty`.
    pub fn compare(self, other: Self, ty: ElementType) -> Option<Ordering> {
        match (self.cast(ty), other.cast(ty)) {
            (Self::Int(a), Self::Int(b)) => Some(a.cmp(&b)),
            (Self::UInt(a), Self::UInt(b)) => Some(a.cmp(&b)),
            (Self::Float(a), Self::Float(b)) => a.partial_cmp(&b),
            (Self::Complex(ar, ai), Self::Complex(br, bi)) => {
                (ar == br && ai == bi).then_some(Ordering::Equal)
            }
            _ => None,
        }
    }

    /// Apply a binary operator with both operands evaluated at `ty`.
    pub fn binary(op: BinaryOp, ty: ElementType, lhs: Self, rhs: Self) -> Result<Self> {
        if op.is_logical() {
            let (a, b) = (lhs.is_truthy(), rhs.is_truthy());
            return Ok(Self::truth(match op {
                BinaryOp::And => a && b,
                _ => a || b,
            }));
        }
        if op.is_comparison() {
            let ord = lhs.compare(rhs, ty);
            let holds = match op {
                BinaryOp::Lt => ord == Some(Ordering::Less),
                BinaryOp::Le => matches!(ord, Some(Ordering::Less | Ordering::Equal)),
                BinaryOp::Gt => ord == Some(Ordering::Greater),
                BinaryOp::Ge => matches!(ord, Some(Ordering::Greater | Ordering::Equal)),
                BinaryOp::Eq => ord == Some(Ordering::Equal),
                _ => ord != Some(Ordering::Equal),
            };
            return Ok(Self::truth(holds));
        }

        let value = match (lhs.cast(ty), rhs.cast(ty)) {
            (Self::Int(a), Self::Int(b)) => Self::Int(match op {
                BinaryOp::Add => a.wrapping_add(b),
                BinaryOp::Sub => a.wrapping_sub(b),
                BinaryOp::Mul => a.wrapping_mul(b),
                _ => {
                    if b == 0 {
                        return Err(ExecError::DivisionByZero { ty });
                    }
                    a.wrapping_div(b)
                }
            }),
            (Self::UInt(a), Self::UInt(b)) => Self::UInt(match op {
                BinaryOp::Add => a.wrapping_add(b),
                BinaryOp::Sub => a.wrapping_sub(b),
                BinaryOp::Mul => a.wrapping_mul(b),
                _ => a
                    .checked_div(b)
                    .ok_or(ExecError::DivisionByZero { ty })?,
            }),
            (Self::Float(a), Self::Float(b)) => Self::Float(match op {
                BinaryOp::Add => a + b,
                BinaryOp::Sub => a - b,
                BinaryOp::Mul => a * b,
                _ => a / b,
            }),
            (Self::Complex(ar, ai), Self::Complex(br, bi)) => match op {
                BinaryOp::Add => Self::Complex(ar + br, ai + bi),
                BinaryOp::Sub => Self::Complex(ar - br, ai - bi),
                BinaryOp::Mul => Self::Complex(ar * br - ai * bi, ar * bi + ai * br),
                _ => {
                    let denom = br * br + bi * bi;
                    Self::Complex((ar * br + ai * bi) / denom, (ai * br - ar * bi) / denom)
                }
            },
            (a, _) => a,
        };
        Ok(value.cast(ty))
    }

    pub fn negate(self, ty: ElementType) -> Self {
        match self.cast(ty) {
            Self::Int(i) => Self::Int(i.wrapping_neg()),
            Self::UInt(u) => Self::UInt(u.wrapping_neg()),
            Self::Float(f) => Self::Float(-f),
            Self::Complex(re, im) => Self::Complex(-re, -im),
        }
        .cast(ty)
    }

    pub fn intrinsic(intrinsic: Intrinsic, ty: ElementType, args: &[Self]) -> Self {
        let arg = args.first().copied().unwrap_or_default().cast(ty);
        let value = match (intrinsic, arg) {
            (Intrinsic::Sqrt, Self::Complex(re, im)) => {
                let modulus = re.hypot(im);
                let real = ((modulus + re) / 2.0).sqrt();
                let imag = ((modulus - re) / 2.0).sqrt().copysign(im);
                Self::Complex(real, imag)
            }
            (Intrinsic::Sqrt, other) => Self::Float(other.as_f64().sqrt()),
            (Intrinsic::Abs, Self::Int(i)) => Self::Int(i.wrapping_abs()),
            (Intrinsic::Abs, Self::Float(f)) => Self::Float(f.abs()),
            (Intrinsic::Abs, other) => other,
        };
        value.cast(ty)
    }

    /// Merge two partial accumulators.
    pub fn combine(op: CombineOp, ty: ElementType, lhs: Self, rhs: Self) -> Result<Self> {
        match op {
            CombineOp::Add => Self::binary(BinaryOp::Add, ty, lhs, rhs),
            CombineOp::Mul => Self::binary(BinaryOp::Mul, ty, lhs, rhs),
            CombineOp::Min => Ok(match lhs.compare(rhs, ty) {
                Some(Ordering::Greater) => rhs.cast(ty),
                _ => lhs.cast(ty),
            }),
            CombineOp::Max => Ok(match lhs.compare(rhs, ty) {
                Some(Ordering::Less) => rhs.cast(ty),
                _ => lhs.cast(ty),
            }),
        }
    }
}

/// Saturating float-to-integer conversion into the raw bit pattern that
/// [`Value::cast`] then narrows.
fn float_to_bits(value: f64, ty: ElementType) -> u64 {
    if ty.is_signed() {
        value as i64 as u64
    } else {
        value as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_wraps_at_width() {
        let v = Value::binary(BinaryOp::Add, ElementType::U08, Value::UInt(250), Value::UInt(10))
            .unwrap();
        assert_eq!(v, Value::UInt(4));
        let v = Value::binary(BinaryOp::Add, ElementType::S08, Value::Int(127), Value::Int(1))
            .unwrap();
        assert_eq!(v, Value::Int(-128));
    }

    #[test]
    fn test_f32_rounds_each_step() {
        let big = Value::Float(1.0e8);
        let v = Value::binary(BinaryOp::Add, ElementType::F32, big, Value::Float(1.0)).unwrap();
        assert_eq!(v, Value::Float(1.0e8));
        let v = Value::binary(BinaryOp::Add, ElementType::F64, big, Value::Float(1.0)).unwrap();
        assert_eq!(v, Value::Float(100_000_001.0));
    }

    #[test]
    fn test_unsigned_order_is_unsigned() {
        let big = Value::UInt(u32::MAX as u64);
        let lt = Value::binary(BinaryOp::Lt, ElementType::U32, Value::UInt(1), big).unwrap();
        assert_eq!(lt, Value::TRUE);
    }

    #[test]
    fn test_integer_division_by_zero() {
        let err = Value::binary(BinaryOp::Div, ElementType::S32, Value::Int(1), Value::Int(0))
            .unwrap_err();
        assert_eq!(err, ExecError::DivisionByZero { ty: ElementType::S32 });
    }

    #[test]
    fn test_complex_division() {
        // (1 + 2i) / (3 + 4i) = 0.44 + 0.08i
        let v = Value::binary(
            BinaryOp::Div,
            ElementType::C128,
            Value::Complex(1.0, 2.0),
            Value::Complex(3.0, 4.0),
        )
        .unwrap();
        let Value::Complex(re, im) = v else {
            panic!("expected complex");
        };
        assert!((re - 0.44).abs() < 1e-12);
        assert!((im - 0.08).abs() < 1e-12);
    }

    #[test]
    fn test_cast_between_families() {
        assert_eq!(Value::Int(-1).cast(ElementType::U16), Value::UInt(0xFFFF));
        assert_eq!(Value::Float(3.9).cast(ElementType::S32), Value::Int(3));
        assert_eq!(Value::UInt(7).cast(ElementType::C64), Value::Complex(7.0, 0.0));
    }

    #[test]
    fn test_combine_min() {
        let v = Value::combine(CombineOp::Min, ElementType::S32, Value::Int(4), Value::Int(-2))
            .unwrap();
        assert_eq!(v, Value::Int(-2));
    }
}
