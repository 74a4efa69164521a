//! Operands and the capacity-growth primitive.
//!
//! Operands are passed to a routine in fixed slot order. Arrays and
//! resizables surface as element storage plus a count, scalars as one value,
//! constants as a literal value.

use opforge_foundation::AddressMode;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::Result;
use crate::value::Value;

/// Storage of a resizable result.
///
/// `data.len()` is the allocated capacity; `length` counts the elements in
/// use. Only `data[..length]` is meaningful.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Resizable {
    pub data: Vec<Value>,
    pub length: usize,
}

impl Resizable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_values(values: Vec<Value>) -> Self {
        Self {
            length: values.len(),
            data: values,
        }
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// The elements in use.
    pub fn values(&self) -> &[Value] {
        &self.data[..self.length.min(self.data.len())]
    }
}

/// One routine argument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Operand {
    Scalar(Value),
    Array(Vec<Value>),
    Constant(Value),
    Resizable(Resizable),
}

impl Operand {
    pub fn mode(&self) -> AddressMode {
        match self {
            Self::Scalar(_) => AddressMode::Scalar,
            Self::Array(_) => AddressMode::Array,
            Self::Constant(_) => AddressMode::Constant,
            Self::Resizable(_) => AddressMode::Resizable,
        }
    }

    /// Element count: 1 for scalars and constants, the stored length for
    /// resizables.
    pub fn count(&self) -> usize {
        match self {
            Self::Scalar(_) | Self::Constant(_) => 1,
            Self::Array(values) => values.len(),
            Self::Resizable(r) => r.length,
        }
    }

    /// The value of a scalar or constant operand.
    pub fn scalar(&self) -> Option<Value> {
        match self {
            Self::Scalar(v) | Self::Constant(v) => Some(*v),
            _ => None,
        }
    }

    pub fn values(&self) -> &[Value] {
        match self {
            Self::Scalar(v) | Self::Constant(v) => std::slice::from_ref(v),
            Self::Array(values) => values,
            Self::Resizable(r) => r.values(),
        }
    }
}

/// Opaque execution-context token.
///
/// Forwarded unexamined to every call of the capacity-growth primitive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ExecToken(pub u64);

/// The capacity-growth primitive.
///
/// Ensures `storage` can hold at least `desired` elements, preserving its
/// first `length` elements. `handle` is the storage-handle operand of the
/// routine, passed through as given.
pub trait CapacityGrowth {
    fn grow(
        &mut self,
        token: ExecToken,
        handle: Value,
        storage: &mut Resizable,
        desired: usize,
    ) -> Result<()>;
}

/// One recorded growth request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GrowthCall {
    pub token: ExecToken,
    pub handle: Value,
    pub desired: usize,
}

/// Growth primitive that reallocates in place and records every call.
#[derive(Debug, Default)]
pub struct RecordingGrowth {
    pub calls: Vec<GrowthCall>,
}

impl RecordingGrowth {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn desired_sizes(&self) -> Vec<usize> {
        self.calls.iter().map(|c| c.desired).collect()
    }
}

impl CapacityGrowth for RecordingGrowth {
    fn grow(
        &mut self,
        token: ExecToken,
        handle: Value,
        storage: &mut Resizable,
        desired: usize,
    ) -> Result<()> {
        trace!(?handle, desired, capacity = storage.capacity(), "capacity growth");
        self.calls.push(GrowthCall {
            token,
            handle,
            desired,
        });
        if storage.data.len() < desired {
            storage.data.resize(desired, Value::default());
        }
        Ok(())
    }
}
