//! The block-comparator family.
//!
//! One comparator per signed numeric type (`S08`..`S64`, `F32`, `F64`).
//! Unsigned element types are compared through their signed counterpart of
//! the same width, so the bit patterns of both blocks are reinterpreted
//! rather than converted.

use opforge_foundation::ElementType;
use std::cmp::Ordering;

use crate::error::{ExecError, Result};
use crate::value::Value;

/// Compare two equal-length blocks under the order of `ty`.
///
/// Returns 0 when the blocks are equal, a negative value when `a` orders
/// first, and a positive value otherwise.
pub fn compare_blocks(ty: ElementType, a: &[Value], b: &[Value]) -> Result<i32> {
    if !ty.has_block_comparator() {
        return Err(ExecError::UnsupportedComparator(ty));
    }
    if a.len() != b.len() {
        return Err(ExecError::BlockLength(a.len(), b.len()));
    }
    for (x, y) in a.iter().zip(b) {
        match x.compare(*y, ty) {
            Some(Ordering::Equal) => continue,
            Some(Ordering::Less) => return Ok(-1),
            // unordered floats never compare equal
            Some(Ordering::Greater) | None => return Ok(1),
        }
    }
    Ok(0)
}
